use crate::types::Task;

/// Case-insensitive substring match over title and subject. Only the empty
/// query matches everything; whitespace is part of the needle.
pub fn matches_query(task: &Task, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    task.title.to_lowercase().contains(&needle)
        || task.subject.as_str().to_lowercase().contains(&needle)
}

pub fn filter_tasks<'a>(tasks: &'a [Task], query: &str) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| matches_query(task, query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Student, Subject, TaskDraft};
    use uuid::Uuid;

    fn task(title: &str, subject: Subject) -> Task {
        TaskDraft {
            title: title.to_string(),
            subject,
            due_date: None,
            student: Student::Muhammad,
            notes: None,
        }
        .into_task(Uuid::new_v4())
    }

    #[test]
    fn test_empty_query_shows_everything() {
        let tasks = vec![task("Essay", Subject::English), task("Sums", Subject::Math)];
        assert_eq!(filter_tasks(&tasks, "").len(), 2);
    }

    #[test]
    fn test_whitespace_is_part_of_the_query() {
        let tasks = vec![task("Algebra HW", Subject::Math), task("Essay", Subject::English)];
        let titles = |query: &str| {
            filter_tasks(&tasks, query)
                .into_iter()
                .map(|task| task.title.clone())
                .collect::<Vec<_>>()
        };

        assert_eq!(titles(" "), ["Algebra HW"]);
        assert_eq!(titles("a h"), ["Algebra HW"]);
        assert!(titles("   ").is_empty());
        assert!(titles("hw ").is_empty());
        assert!(titles("essay ").is_empty());
    }

    #[test]
    fn test_query_matches_title_or_subject_ignoring_case() {
        let tasks = vec![
            task("Essay draft", Subject::English),
            task("Fractions", Subject::Math),
            task("Typing", Subject::Ict),
        ];

        let titles = |query: &str| {
            filter_tasks(&tasks, query)
                .into_iter()
                .map(|task| task.title.clone())
                .collect::<Vec<_>>()
        };

        assert_eq!(titles("ESSAY"), ["Essay draft"]);
        assert_eq!(titles("math"), ["Fractions"]);
        assert_eq!(titles("ict"), ["Typing"]);
        assert_eq!(titles("t"), ["Essay draft", "Fractions", "Typing"]);
        assert!(titles("chemistry").is_empty());
    }

    #[test]
    fn test_visible_set_is_exactly_the_matching_subset() {
        let tasks: Vec<Task> = Subject::ALL
            .iter()
            .enumerate()
            .map(|(index, subject)| task(&format!("Task {index}"), *subject))
            .collect();

        for query in ["", "s", "Geo", "task 3", "zz", " ", "   ", "task ", " 3", "geo "] {
            let visible = filter_tasks(&tasks, query);
            let expected = tasks
                .iter()
                .filter(|task| {
                    let q = query.to_lowercase();
                    task.title.to_lowercase().contains(&q)
                        || task.subject.as_str().to_lowercase().contains(&q)
                })
                .count();
            assert_eq!(visible.len(), expected, "query {query:?}");
        }
    }
}
