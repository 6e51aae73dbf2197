//! Display-ready projection of the task list.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::matching::filter_tasks;
use crate::types::{Student, Subject, Task};
use crate::urgency::Urgency;

use super::App;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TaskCardView {
    pub id: Uuid,
    pub title: String,
    pub subject: Subject,
    pub student: Student,
    pub due_date: Option<NaiveDate>,
    pub urgency: Urgency,
    pub completed: bool,
    pub selected: bool,
}

impl TaskCardView {
    pub fn from_task(task: &Task, today: NaiveDate, selected: bool) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            subject: task.subject,
            student: task.student,
            due_date: task.due_date,
            urgency: Urgency::classify(task.due_date, today),
            completed: task.completed,
            selected,
        }
    }

    /// `2026-10-16 (Tomorrow)`, or just the placeholder when undated.
    pub fn due_text(&self) -> String {
        match self.due_date {
            Some(date) => format!("{} {}", date.format("%Y-%m-%d"), self.urgency.label()),
            None => self.urgency.label(),
        }
    }
}

impl App {
    /// Cards matching the search query, in store order.
    pub fn visible_cards(&self, today: NaiveDate) -> Vec<TaskCardView> {
        filter_tasks(self.tasks.tasks(), &self.search.query)
            .into_iter()
            .map(|task| TaskCardView::from_task(task, today, self.selected_task == Some(task.id)))
            .collect()
    }

    pub(crate) fn visible_ids(&self) -> Vec<Uuid> {
        filter_tasks(self.tasks.tasks(), &self.search.query)
            .into_iter()
            .map(|task| task.id)
            .collect()
    }

    /// Moves the selection through the visible cards, wrapping at neither end.
    pub(crate) fn move_selection(&mut self, delta: isize) {
        let ids = self.visible_ids();
        if ids.is_empty() {
            self.selected_task = None;
            return;
        }
        let next = match self
            .selected_task
            .and_then(|id| ids.iter().position(|candidate| *candidate == id))
        {
            Some(index) => (index as isize + delta).clamp(0, ids.len() as isize - 1) as usize,
            None if delta < 0 => ids.len() - 1,
            None => 0,
        };
        self.selected_task = Some(ids[next]);
    }
}
