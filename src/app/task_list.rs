use uuid::Uuid;

use crate::types::Task;

/// The board's cached copy of the store.
///
/// Written only by fetch results and by local optimistic edits. Every write
/// bumps `version`; fetches additionally bump `generation`, which is what an
/// optimistic rollback checks against.
#[derive(Debug, Default, Clone)]
pub struct TaskList {
    tasks: Vec<Task>,
    version: u64,
    generation: u64,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum OptimisticEdit {
    Toggled,
    Hidden { index: usize },
}

/// Receipt for an optimistic edit, carrying the row as it was before.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OptimisticToken {
    pub version: u64,
    generation: u64,
    prior: Task,
    edit: OptimisticEdit,
}

impl OptimisticToken {
    pub fn task_id(&self) -> Uuid {
        self.prior.id
    }
}

impl TaskList {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.generation += 1;
        self.version += 1;
    }

    pub fn toggle_completed(&mut self, id: Uuid) -> Option<(OptimisticToken, bool)> {
        let task = self.tasks.iter_mut().find(|task| task.id == id)?;
        let prior = task.clone();
        task.completed = !task.completed;
        let completed = task.completed;
        Some((self.issue(prior, OptimisticEdit::Toggled), completed))
    }

    pub fn hide(&mut self, id: Uuid) -> Option<OptimisticToken> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        let prior = self.tasks.remove(index);
        Some(self.issue(prior, OptimisticEdit::Hidden { index }))
    }

    /// Restores the row captured by `token`. Returns false when a fetch has
    /// replaced the list since the edit.
    pub fn rollback(&mut self, token: OptimisticToken) -> bool {
        if token.generation != self.generation {
            return false;
        }

        match token.edit {
            OptimisticEdit::Toggled => {
                let Some(task) = self.tasks.iter_mut().find(|task| task.id == token.prior.id)
                else {
                    return false;
                };
                *task = token.prior;
            }
            OptimisticEdit::Hidden { index } => {
                if self.get(token.prior.id).is_some() {
                    return false;
                }
                let index = index.min(self.tasks.len());
                self.tasks.insert(index, token.prior);
            }
        }
        self.version += 1;
        true
    }

    fn issue(&mut self, prior: Task, edit: OptimisticEdit) -> OptimisticToken {
        self.version += 1;
        OptimisticToken {
            version: self.version,
            generation: self.generation,
            prior,
            edit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Student, Subject, TaskDraft};

    fn task(title: &str) -> Task {
        TaskDraft {
            title: title.to_string(),
            subject: Subject::History,
            due_date: None,
            student: Student::Mahveen,
            notes: None,
        }
        .into_task(Uuid::new_v4())
    }

    fn list(titles: &[&str]) -> TaskList {
        let mut list = TaskList::default();
        list.replace(titles.iter().map(|title| task(title)).collect());
        list
    }

    #[test]
    fn test_every_write_bumps_version() {
        let mut list = list(&["a", "b"]);
        let start = list.version();
        let id = list.tasks()[0].id;

        let (token, completed) = list.toggle_completed(id).expect("task exists");
        assert!(completed);
        assert_eq!(token.version, start + 1);
        assert_eq!(list.version(), start + 1);

        list.replace(Vec::new());
        assert_eq!(list.version(), start + 2);
    }

    #[test]
    fn test_toggle_rollback_restores_prior_state() {
        let mut list = list(&["a"]);
        let id = list.tasks()[0].id;
        let (token, _) = list.toggle_completed(id).expect("task exists");
        assert!(list.get(id).is_some_and(|task| task.completed));

        assert!(list.rollback(token));
        assert!(list.get(id).is_some_and(|task| !task.completed));
    }

    #[test]
    fn test_hide_rollback_reinserts_at_original_position() {
        let mut list = list(&["a", "b", "c"]);
        let id = list.tasks()[1].id;
        let token = list.hide(id).expect("task exists");
        assert_eq!(list.len(), 2);
        assert_eq!(token.task_id(), id);

        assert!(list.rollback(token));
        let titles: Vec<&str> = list.tasks().iter().map(|task| task.title.as_str()).collect();
        assert_eq!(titles, ["a", "b", "c"]);
    }

    #[test]
    fn test_rollback_skipped_after_newer_fetch() {
        let mut list = list(&["a", "b"]);
        let id = list.tasks()[0].id;
        let token = list.hide(id).expect("task exists");

        let fresh = list.tasks().to_vec();
        list.replace(fresh);

        assert!(!list.rollback(token));
        assert!(list.get(id).is_none());
    }

    #[test]
    fn test_missing_task_yields_no_token() {
        let mut list = list(&["a"]);
        assert!(list.toggle_completed(Uuid::new_v4()).is_none());
        assert!(list.hide(Uuid::new_v4()).is_none());
    }
}
