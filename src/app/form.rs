//! Create/edit form state and validation.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{Student, Subject, Task, TaskDraft};

pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TaskFormField {
    Title,
    Subject,
    DueDate,
    Student,
    Submit,
    Cancel,
}

impl TaskFormField {
    pub const ORDER: [Self; 6] = [
        Self::Title,
        Self::Subject,
        Self::DueDate,
        Self::Student,
        Self::Submit,
        Self::Cancel,
    ];

    pub fn step(self, delta: isize) -> Self {
        let len = Self::ORDER.len() as isize;
        let index = Self::ORDER.iter().position(|field| *field == self).unwrap_or(0) as isize;
        Self::ORDER[(index + delta).rem_euclid(len) as usize]
    }

    pub const fn is_text(self) -> bool {
        matches!(self, Self::Title | Self::DueDate)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormMode {
    Create,
    Edit {
        id: Uuid,
        original_due: Option<NaiveDate>,
        notes: Option<String>,
    },
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FormError {
    #[error("Title is required")]
    EmptyTitle,
    #[error("Due date must look like YYYY-MM-DD")]
    InvalidDate,
    #[error("Due date cannot be before today")]
    DateInPast,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TaskFormState {
    pub mode: FormMode,
    pub title: String,
    pub subject: Subject,
    pub due_input: String,
    pub student: Student,
    pub focused_field: TaskFormField,
    pub error: Option<String>,
    pub submitting: bool,
}

impl TaskFormState {
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            title: String::new(),
            subject: Subject::Math,
            due_input: String::new(),
            student: Student::default(),
            focused_field: TaskFormField::Title,
            error: None,
            submitting: false,
        }
    }

    pub fn edit(task: &Task) -> Self {
        Self {
            mode: FormMode::Edit {
                id: task.id,
                original_due: task.due_date,
                notes: task.notes.clone(),
            },
            title: task.title.clone(),
            subject: task.subject,
            due_input: task
                .due_date
                .map(|date| date.format(DUE_DATE_FORMAT).to_string())
                .unwrap_or_default(),
            student: task.student,
            focused_field: TaskFormField::Title,
            error: None,
            submitting: false,
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.mode, FormMode::Edit { .. })
    }

    pub fn editing_id(&self) -> Option<Uuid> {
        match self.mode {
            FormMode::Edit { id, .. } => Some(id),
            FormMode::Create => None,
        }
    }

    pub fn focused_input(&mut self) -> Option<&mut String> {
        match self.focused_field {
            TaskFormField::Title => Some(&mut self.title),
            TaskFormField::DueDate => Some(&mut self.due_input),
            _ => None,
        }
    }

    pub fn cycle_choice(&mut self, forward: bool) {
        match self.focused_field {
            TaskFormField::Subject => {
                self.subject = if forward {
                    self.subject.next()
                } else {
                    self.subject.previous()
                };
            }
            TaskFormField::Student => {
                self.student = if forward {
                    self.student.next()
                } else {
                    self.student.previous()
                };
            }
            TaskFormField::Submit => self.focused_field = TaskFormField::Cancel,
            TaskFormField::Cancel => self.focused_field = TaskFormField::Submit,
            TaskFormField::Title | TaskFormField::DueDate => {}
        }
    }

    /// Checks the input against `today` and builds the payload. Notes from
    /// the edited task ride along untouched.
    pub fn validate(&self, today: NaiveDate) -> Result<TaskDraft, FormError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FormError::EmptyTitle);
        }

        let due_date = match self.due_input.trim() {
            "" => None,
            raw => Some(
                NaiveDate::parse_from_str(raw, DUE_DATE_FORMAT)
                    .map_err(|_| FormError::InvalidDate)?,
            ),
        };

        let (original_due, notes) = match &self.mode {
            FormMode::Create => (None, None),
            FormMode::Edit {
                original_due,
                notes,
                ..
            } => (*original_due, notes.clone()),
        };
        if let Some(due) = due_date
            && due < today
            && due_date != original_due
        {
            return Err(FormError::DateInPast);
        }

        Ok(TaskDraft {
            title: title.to_string(),
            subject: self.subject,
            due_date,
            student: self.student,
            notes,
        })
    }
}
