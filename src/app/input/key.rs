use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, MenuItem, Message, dialogs};

/// Key reference shown by the help overlay.
pub const HELP_ENTRIES: &[(&str, &str)] = &[
    ("n / a", "New task"),
    ("j / k, ↑ / ↓", "Move selection"),
    ("space", "Toggle completed"),
    ("enter / e", "Edit selected task"),
    ("d / del", "Delete selected task"),
    ("m", "Task menu"),
    ("/", "Search title and subject"),
    ("esc", "Close menu, dialog or search"),
    ("r", "Refresh now"),
    ("t", "Cycle theme"),
    ("?", "Toggle help"),
    ("q", "Quit"),
];

impl App {
    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.active_dialog.is_open() {
            if let Some(follow_up) = dialogs::handle_dialog_key(&mut self.active_dialog, key) {
                self.update(follow_up)?;
            }
            return Ok(());
        }

        if self.long_press.menu().is_some() {
            return self.handle_menu_key(key);
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('c') {
                self.update(Message::Quit)?;
            }
            return Ok(());
        }

        if self.search.focused {
            match key.code {
                KeyCode::Esc => self.search.escape(),
                KeyCode::Enter | KeyCode::Down => self.search.focused = false,
                KeyCode::Backspace => {
                    self.search.query.pop();
                }
                KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::ALT) => {
                    self.search.query.push(ch);
                }
                _ => {}
            }
            self.list_scroll = 0;
            return Ok(());
        }

        let selected = self.selected_task;
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('n') | KeyCode::Char('a') | KeyCode::Char('+') => {
                Some(Message::OpenNewTaskForm)
            }
            KeyCode::Char('r') => Some(Message::Refresh),
            KeyCode::Char('?') => Some(Message::ToggleHelp),
            KeyCode::Char('/') => Some(Message::FocusSearch),
            KeyCode::Char('t') => Some(Message::CycleTheme),
            KeyCode::Esc => Some(Message::ClearSearch),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::SelectDown),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::SelectUp),
            KeyCode::Char(' ') => selected.map(Message::ToggleTaskCompleted),
            KeyCode::Enter | KeyCode::Char('e') => selected.map(Message::OpenEditTaskForm),
            KeyCode::Delete | KeyCode::Char('d') => selected.map(Message::RequestDeleteTask),
            KeyCode::Char('m') => selected.map(Message::OpenTaskMenu),
            _ => None,
        };

        if let Some(message) = message {
            self.update(message)?;
        }
        Ok(())
    }

    fn handle_menu_key(&mut self, key: KeyEvent) -> Result<()> {
        let last = MenuItem::ALL.len() - 1;
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.long_press.close();
            }
            KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab => {
                self.menu_index = self.menu_index.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                self.menu_index = (self.menu_index + 1).min(last);
            }
            KeyCode::Enter => {
                let item = MenuItem::ALL[self.menu_index.min(last)];
                self.update(item.message())?;
            }
            KeyCode::Char('e') => self.update(Message::MenuEdit)?,
            KeyCode::Char('d') | KeyCode::Delete => self.update(Message::MenuDelete)?,
            _ => {}
        }
        Ok(())
    }
}
