//! Key handling while a dialog is open.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::form::{TaskFormField, TaskFormState};
use super::messages::Message;
use super::state::{ActiveDialog, ConfirmCancelField};

/// Handle key events when a dialog is active. Returns a follow-up message
/// for anything that needs more than the dialog's own state.
pub fn handle_dialog_key(dialog: &mut ActiveDialog, key: KeyEvent) -> Option<Message> {
    let mut follow_up: Option<Message> = None;

    match dialog {
        ActiveDialog::TaskForm(state) => {
            handle_task_form_key(state, key, &mut follow_up);
        }
        ActiveDialog::ConfirmDelete(state) => {
            handle_confirm_cancel_dialog_key(
                &mut state.focused_field,
                key,
                Message::ConfirmDeleteTask,
                Message::DismissDialog,
                &mut follow_up,
            );
        }
        ActiveDialog::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Enter) {
                *dialog = ActiveDialog::None;
            }
        }
        ActiveDialog::None => {}
    }

    follow_up
}

fn handle_task_form_key(
    state: &mut TaskFormState,
    key: KeyEvent,
    follow_up: &mut Option<Message>,
) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('s') {
            *follow_up = Some(Message::SubmitTaskForm);
        }
        return;
    }

    match key.code {
        KeyCode::Esc => {
            *follow_up = Some(Message::DismissDialog);
        }
        KeyCode::Tab | KeyCode::Down => {
            state.focused_field = state.focused_field.step(1);
        }
        KeyCode::BackTab | KeyCode::Up => {
            state.focused_field = state.focused_field.step(-1);
        }
        KeyCode::Left => state.cycle_choice(false),
        KeyCode::Right => state.cycle_choice(true),
        KeyCode::Char(' ') if !state.focused_field.is_text() => {
            if matches!(
                state.focused_field,
                TaskFormField::Subject | TaskFormField::Student
            ) {
                state.cycle_choice(true);
            }
        }
        KeyCode::Backspace => {
            if let Some(input) = state.focused_input() {
                input.pop();
            }
        }
        KeyCode::Enter => {
            *follow_up = Some(match state.focused_field {
                TaskFormField::Cancel => Message::DismissDialog,
                _ => Message::SubmitTaskForm,
            });
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::ALT) => {
            if let Some(input) = state.focused_input() {
                input.push(ch);
                state.error = None;
            }
        }
        _ => {}
    }
}

fn toggle_confirm_cancel_field(field: &mut ConfirmCancelField) {
    *field = match *field {
        ConfirmCancelField::Confirm => ConfirmCancelField::Cancel,
        ConfirmCancelField::Cancel => ConfirmCancelField::Confirm,
    };
}

fn handle_confirm_cancel_dialog_key(
    focused_field: &mut ConfirmCancelField,
    key: KeyEvent,
    confirm_message: Message,
    cancel_message: Message,
    follow_up: &mut Option<Message>,
) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('n') => {
            *follow_up = Some(cancel_message);
        }
        KeyCode::Char('y') => {
            *follow_up = Some(confirm_message);
        }
        KeyCode::Left
        | KeyCode::Char('h')
        | KeyCode::Up
        | KeyCode::Char('k')
        | KeyCode::Right
        | KeyCode::Char('l')
        | KeyCode::Down
        | KeyCode::Char('j')
        | KeyCode::Tab
        | KeyCode::BackTab => {
            toggle_confirm_cancel_field(focused_field);
        }
        KeyCode::Enter => {
            *follow_up = Some(match focused_field {
                ConfirmCancelField::Confirm => confirm_message,
                ConfirmCancelField::Cancel => cancel_message,
            });
        }
        _ => {}
    }
}
