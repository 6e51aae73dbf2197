//! Modal and search state for the board.

use uuid::Uuid;

use super::form::TaskFormState;
use super::messages::Message;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConfirmCancelField {
    Confirm,
    Cancel,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConfirmDeleteState {
    pub task_id: Uuid,
    pub task_title: String,
    pub focused_field: ConfirmCancelField,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ActiveDialog {
    None,
    TaskForm(TaskFormState),
    ConfirmDelete(ConfirmDeleteState),
    Help,
}

impl ActiveDialog {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Actions offered by the per-task context menu, top to bottom.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MenuItem {
    Edit,
    Delete,
}

impl MenuItem {
    pub const ALL: [Self; 2] = [Self::Edit, Self::Delete];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Edit => "Edit",
            Self::Delete => "Delete",
        }
    }

    pub fn message(self) -> Message {
        match self {
            Self::Edit => Message::MenuEdit,
            Self::Delete => Message::MenuDelete,
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub focused: bool,
}

impl SearchState {
    /// Esc while typing only drops focus; a second Esc clears the query.
    pub fn escape(&mut self) {
        if self.focused {
            self.focused = false;
        } else {
            self.query.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_escape_unfocuses_then_clears() {
        let mut search = SearchState {
            query: "math".to_string(),
            focused: true,
        };
        search.escape();
        assert_eq!(search.query, "math");
        assert!(!search.focused);
        search.escape();
        assert!(search.query.is_empty());
    }
}
