use std::time::Instant;

use anyhow::Result;
use tuirealm::ratatui::layout::Rect;

use super::form::TaskFormState;
use super::{ActiveDialog, App, Message};

impl App {
    pub fn update(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Key(key) => self.handle_key(key)?,
            Message::Mouse(mouse) => self.handle_mouse_at(mouse, Instant::now())?,
            Message::Tick => self.tick_at(Instant::now()),
            Message::Resize(w, h) => {
                self.viewport = (w, h);
                self.interaction_map.clear();
                self.hovered_message = None;
                self.long_press.reset(Rect::new(0, 0, w, h));
            }
            Message::Quit => self.should_quit = true,
            Message::Refresh => self.refresh_now(),
            Message::ToggleHelp => {
                self.active_dialog = match self.active_dialog {
                    ActiveDialog::Help => ActiveDialog::None,
                    _ => ActiveDialog::Help,
                };
            }
            Message::CycleTheme => self.cycle_theme(),
            Message::FocusSearch => {
                self.long_press.close();
                self.search.focused = true;
            }
            Message::ClearSearch => {
                if self.long_press.menu().is_some() {
                    self.long_press.close();
                } else {
                    self.search.escape();
                }
            }
            Message::SelectUp => self.move_selection(-1),
            Message::SelectDown => self.move_selection(1),
            Message::SelectTask(id) => {
                self.search.focused = false;
                self.selected_task = Some(id);
            }
            Message::ToggleTaskCompleted(id) => {
                self.long_press.cancel_press();
                self.selected_task = Some(id);
                self.toggle_completed(id);
            }
            Message::OpenTaskMenu(id) => self.open_menu_centered(id),
            Message::MenuEdit => {
                if let Some((id, _)) = self.long_press.menu() {
                    self.long_press.close();
                    self.open_edit_form(id);
                }
            }
            Message::MenuDelete => {
                if let Some((id, _)) = self.long_press.menu() {
                    self.long_press.close();
                    self.request_delete(id);
                }
            }
            Message::OpenNewTaskForm => {
                self.long_press.close();
                self.search.focused = false;
                self.active_dialog = ActiveDialog::TaskForm(TaskFormState::create());
            }
            Message::OpenEditTaskForm(id) => {
                self.long_press.close();
                self.open_edit_form(id);
            }
            Message::FocusFormField(field) => {
                if let ActiveDialog::TaskForm(form) = &mut self.active_dialog {
                    if form.focused_field == field {
                        form.cycle_choice(true);
                    } else {
                        form.focused_field = field;
                    }
                }
            }
            Message::SubmitTaskForm => self.submit_form(),
            Message::RequestDeleteTask(id) => {
                self.long_press.close();
                self.request_delete(id);
            }
            Message::ConfirmDeleteTask => {
                if let ActiveDialog::ConfirmDelete(state) = &self.active_dialog {
                    let id = state.task_id;
                    self.active_dialog = ActiveDialog::None;
                    self.delete_task(id);
                }
            }
            Message::DismissDialog => {
                self.active_dialog = ActiveDialog::None;
            }
        }

        // A modal owns the pointer: no pending press or menu survives under it.
        if self.active_dialog.is_open() {
            self.long_press.close();
        }
        self.drain_store_events();
        Ok(())
    }

    /// Fires a pending long press and applies finished store calls.
    pub fn tick_at(&mut self, now: Instant) {
        if self.active_dialog.is_open() {
            self.long_press.close();
        } else if let Some(id) = self.long_press.fire(now) {
            self.on_menu_opened(id);
        }
        self.drain_store_events();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Days;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
    use uuid::Uuid;

    use super::*;
    use crate::app::form::TaskFormField;
    use crate::app::today;
    use crate::haptics::CountingHaptics;
    use crate::settings::Settings;
    use crate::store::{Backend, MemoryTaskStore};
    use crate::types::{Student, Subject, TaskDraft};

    fn quiet_settings() -> Settings {
        Settings {
            poll_interval_ms: 0,
            ..Settings::default()
        }
    }

    fn draft(title: &str, due_in: u64) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            subject: Subject::Science,
            due_date: today().checked_add_days(Days::new(due_in)),
            student: Student::Hadia,
            notes: None,
        }
    }

    async fn app_with(tasks: Vec<crate::types::Task>) -> (App, Arc<MemoryTaskStore>, CountingHaptics) {
        let store = Arc::new(MemoryTaskStore::with_tasks(tasks));
        let haptics = CountingHaptics::default();
        let mut app = App::new(
            Backend::memory(Arc::clone(&store)),
            quiet_settings(),
            Box::new(haptics.clone()),
        );
        settle(&mut app).await;
        (app, store, haptics)
    }

    async fn settle(app: &mut App) {
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            app.drain_store_events();
        }
    }

    fn key(code: KeyCode) -> Message {
        Message::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[tokio::test]
    async fn test_initial_fetch_populates_board() {
        let (app, store, _) = app_with(vec![draft("Lab report", 3).into_task(Uuid::new_v4())]).await;
        assert_eq!(app.tasks.len(), 1);
        assert!(app.last_synced.is_some());
        assert!(!app.loading);
        assert_eq!(store.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_toggle_failure_rolls_back() {
        let task = draft("Lab report", 3).into_task(Uuid::new_v4());
        let id = task.id;
        let (mut app, store, _) = app_with(vec![task]).await;

        store.set_failing(true);
        app.update(Message::ToggleTaskCompleted(id)).expect("update");
        assert_eq!(app.tasks.get(id).map(|task| task.completed), Some(true));
        assert!(app.mutation_in_flight());

        settle(&mut app).await;
        assert_eq!(app.tasks.get(id).map(|task| task.completed), Some(false));
        assert!(!app.mutation_in_flight());
        assert!(app.footer_notice.as_deref().is_some_and(|n| n.starts_with("Could not update")));
    }

    #[tokio::test]
    async fn test_second_mutation_is_rejected_while_first_in_flight() {
        let first = draft("One", 1).into_task(Uuid::new_v4());
        let second = draft("Two", 2).into_task(Uuid::new_v4());
        let (first_id, second_id) = (first.id, second.id);
        let (mut app, store, _) = app_with(vec![first, second]).await;

        store.set_latency(Some(Duration::from_millis(100)));
        app.update(Message::ToggleTaskCompleted(first_id)).expect("update");
        app.update(Message::ToggleTaskCompleted(second_id)).expect("update");
        assert_eq!(app.tasks.get(second_id).map(|task| task.completed), Some(false));
        assert!(app.footer_notice.is_some());
    }

    #[tokio::test]
    async fn test_form_validation_never_reaches_store() {
        let (mut app, store, _) = app_with(Vec::new()).await;
        app.update(Message::OpenNewTaskForm).expect("update");
        app.update(Message::SubmitTaskForm).expect("update");

        let ActiveDialog::TaskForm(form) = &app.active_dialog else {
            panic!("form should stay open");
        };
        assert_eq!(form.error.as_deref(), Some("Title is required"));
        assert!(!app.mutation_in_flight());
        settle(&mut app).await;
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_keeps_form_open_with_input() {
        let (mut app, store, _) = app_with(Vec::new()).await;
        store.set_failing(true);
        app.update(Message::OpenNewTaskForm).expect("update");
        for ch in "Essay".chars() {
            app.update(key(KeyCode::Char(ch))).expect("update");
        }
        app.update(Message::SubmitTaskForm).expect("update");
        settle(&mut app).await;

        let ActiveDialog::TaskForm(form) = &app.active_dialog else {
            panic!("form should stay open");
        };
        assert_eq!(form.title, "Essay");
        assert!(!form.submitting);
        assert!(form.error.as_deref().is_some_and(|e| e.starts_with("Could not save")));
    }

    #[tokio::test]
    async fn test_edit_preserves_notes_and_refreshes() {
        let mut task = draft("Map work", 2).into_task(Uuid::new_v4());
        task.notes = Some("page 12".to_string());
        let id = task.id;
        let (mut app, store, _) = app_with(vec![task]).await;

        app.update(Message::OpenEditTaskForm(id)).expect("update");
        app.update(Message::FocusFormField(TaskFormField::Subject)).expect("update");
        app.update(Message::FocusFormField(TaskFormField::Subject)).expect("update");
        app.update(Message::SubmitTaskForm).expect("update");
        settle(&mut app).await;

        assert_eq!(app.active_dialog, ActiveDialog::None);
        let stored = store.snapshot().into_iter().find(|task| task.id == id).expect("task");
        assert_eq!(stored.subject, Subject::Ict);
        assert_eq!(stored.notes.as_deref(), Some("page 12"));
        assert_eq!(app.tasks.get(id).map(|task| task.subject), Some(Subject::Ict));
    }

    #[tokio::test]
    async fn test_delete_goes_through_confirmation() {
        let task = draft("Old quiz", 1).into_task(Uuid::new_v4());
        let id = task.id;
        let (mut app, store, _) = app_with(vec![task]).await;

        app.update(Message::RequestDeleteTask(id)).expect("update");
        assert!(matches!(app.active_dialog, ActiveDialog::ConfirmDelete(_)));
        app.update(Message::ConfirmDeleteTask).expect("update");
        assert!(app.tasks.is_empty());
        settle(&mut app).await;
        assert!(store.snapshot().is_empty());
        assert!(app.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_long_press_on_card_opens_menu_and_pulses() {
        let task = draft("Poem", 4).into_task(Uuid::new_v4());
        let id = task.id;
        let (mut app, _, haptics) = app_with(vec![task]).await;
        app.interaction_map
            .register_task(tuirealm::ratatui::layout::Rect::new(0, 3, 40, 3), Message::SelectTask(id));

        let t0 = Instant::now();
        app.handle_mouse_at(mouse(MouseEventKind::Down(MouseButton::Left), 5, 4), t0)
            .expect("mouse");
        assert_eq!(app.long_press.pressing_task(), Some(id));
        app.tick_at(t0 + Duration::from_millis(600));

        assert_eq!(app.long_press.menu().map(|(task_id, _)| task_id), Some(id));
        assert_eq!(haptics.count(), 1);

        app.update(key(KeyCode::Esc)).expect("update");
        assert!(app.long_press.is_idle());
        assert_eq!(app.listener_registry().active(), 0);
    }

    #[tokio::test]
    async fn test_opening_help_mid_press_cancels_the_press() {
        let task = draft("Poem", 4).into_task(Uuid::new_v4());
        let id = task.id;
        let (mut app, _, haptics) = app_with(vec![task]).await;
        app.interaction_map
            .register_task(tuirealm::ratatui::layout::Rect::new(0, 3, 40, 3), Message::SelectTask(id));

        let t0 = Instant::now();
        app.handle_mouse_at(mouse(MouseEventKind::Down(MouseButton::Left), 5, 4), t0)
            .expect("mouse");
        assert_eq!(app.listener_registry().active(), 3);

        app.update(key(KeyCode::Char('?'))).expect("update");
        assert!(matches!(app.active_dialog, ActiveDialog::Help));
        assert!(app.long_press.is_idle());
        assert_eq!(app.listener_registry().active(), 0);

        app.tick_at(t0 + Duration::from_millis(600));
        assert!(app.long_press.menu().is_none());
        assert_eq!(haptics.count(), 0);

        app.update(key(KeyCode::Esc)).expect("update");
        assert!(!app.active_dialog.is_open());
        assert!(app.long_press.is_idle());
    }

    #[tokio::test]
    async fn test_short_click_selects_card() {
        let task = draft("Poem", 4).into_task(Uuid::new_v4());
        let id = task.id;
        let (mut app, _, haptics) = app_with(vec![task]).await;
        app.interaction_map
            .register_task(tuirealm::ratatui::layout::Rect::new(0, 3, 40, 3), Message::SelectTask(id));

        let t0 = Instant::now();
        app.handle_mouse_at(mouse(MouseEventKind::Down(MouseButton::Left), 5, 4), t0)
            .expect("mouse");
        app.handle_mouse_at(
            mouse(MouseEventKind::Up(MouseButton::Left), 5, 4),
            t0 + Duration::from_millis(120),
        )
        .expect("mouse");

        assert_eq!(app.selected_task, Some(id));
        assert!(app.long_press.menu().is_none());
        assert_eq!(haptics.count(), 0);
    }

    #[tokio::test]
    async fn test_menu_edit_opens_prefilled_form() {
        let task = draft("Poem", 4).into_task(Uuid::new_v4());
        let id = task.id;
        let (mut app, _, _) = app_with(vec![task]).await;

        app.update(Message::OpenTaskMenu(id)).expect("update");
        app.update(key(KeyCode::Enter)).expect("update");

        let ActiveDialog::TaskForm(form) = &app.active_dialog else {
            panic!("edit form should open");
        };
        assert_eq!(form.editing_id(), Some(id));
        assert_eq!(form.title, "Poem");
        assert_eq!(app.listener_registry().active(), 0);
    }

    #[tokio::test]
    async fn test_search_filters_visible_cards() {
        let (mut app, _, _) = app_with(vec![
            draft("Lab report", 1).into_task(Uuid::new_v4()),
            TaskDraft {
                subject: Subject::Math,
                ..draft("Worksheet", 2)
            }
            .into_task(Uuid::new_v4()),
        ])
        .await;

        app.update(key(KeyCode::Char('/'))).expect("update");
        for ch in "MATH".chars() {
            app.update(key(KeyCode::Char(ch))).expect("update");
        }
        let cards = app.visible_cards(today());
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].title, "Worksheet");

        app.update(key(KeyCode::Esc)).expect("update");
        app.update(key(KeyCode::Esc)).expect("update");
        assert_eq!(app.visible_cards(today()).len(), 2);
    }

    #[tokio::test]
    async fn test_resize_cancels_gesture() {
        let task = draft("Poem", 4).into_task(Uuid::new_v4());
        let id = task.id;
        let (mut app, _, _) = app_with(vec![task]).await;
        app.update(Message::OpenTaskMenu(id)).expect("update");
        assert_eq!(app.listener_registry().active(), 2);

        app.update(Message::Resize(100, 30)).expect("update");
        assert_eq!(app.viewport, (100, 30));
        assert_eq!(app.listener_registry().active(), 0);
    }
}
