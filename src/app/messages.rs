use crossterm::event::{KeyEvent, MouseEvent};
use uuid::Uuid;

use super::form::TaskFormField;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Message {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Tick,
    Resize(u16, u16),
    Quit,
    Refresh,
    ToggleHelp,
    CycleTheme,
    FocusSearch,
    ClearSearch,
    SelectUp,
    SelectDown,
    SelectTask(Uuid),
    ToggleTaskCompleted(Uuid),
    OpenTaskMenu(Uuid),
    MenuEdit,
    MenuDelete,
    OpenNewTaskForm,
    OpenEditTaskForm(Uuid),
    FocusFormField(TaskFormField),
    SubmitTaskForm,
    RequestDeleteTask(Uuid),
    ConfirmDeleteTask,
    DismissDialog,
}
