use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::{Value, json};
use tracing::{error, info};
use uuid::Uuid;

use crate::app::form::TaskFormState;
use crate::matching::filter_tasks;
use crate::store::{StoreError, TaskStore};
use crate::types::{Student, Subject, Task, TaskPatch};
use crate::urgency::Urgency;

const SCHEMA_VERSION: &str = "cli.v1";

#[derive(Debug, Clone, Subcommand)]
pub enum RootCommand {
    /// List tasks ordered by due date.
    List(ListArgs),
    /// Add a task.
    Add(AddArgs),
    /// Mark a task as completed (or not, with --undo).
    Done(DoneArgs),
    /// Delete a task.
    Delete(DeleteArgs),
    /// Rewrite rows that still use legacy student codes or stale colors.
    Migrate(MigrateArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Case-insensitive filter on title and subject.
    #[arg(long, value_name = "QUERY")]
    pub search: Option<String>,

    /// Hide completed tasks.
    #[arg(long)]
    pub pending: bool,
}

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    #[arg(long, value_name = "TEXT")]
    pub title: String,

    #[arg(long, value_name = "SUBJECT", default_value = "Math")]
    pub subject: String,

    /// Due date as YYYY-MM-DD; today or later.
    #[arg(long, value_name = "DATE")]
    pub due: Option<String>,

    #[arg(long, value_name = "NAME", default_value = "Muhammad")]
    pub student: String,
}

#[derive(Debug, Clone, Args)]
pub struct DoneArgs {
    /// Full task id or a unique prefix.
    #[arg(long, value_name = "TASK_ID")]
    pub id: String,

    #[arg(long)]
    pub undo: bool,
}

#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: String,
}

#[derive(Debug, Clone, Args)]
pub struct MigrateArgs {
    /// Report what would change without writing.
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(
    store: Arc<dyn TaskStore>,
    command: RootCommand,
    today: NaiveDate,
    json_output: bool,
    quiet: bool,
) -> i32 {
    match execute(store.as_ref(), command, today).await {
        Ok(output) => {
            print_success(output, json_output, quiet);
            0
        }
        Err(err) => {
            print_error(&err, json_output);
            err.exit_code
        }
    }
}

struct CommandOutput {
    command: &'static str,
    data: Value,
    text: String,
}

#[derive(Debug)]
struct CliError {
    exit_code: i32,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

type CliResult<T> = Result<T, CliError>;

async fn execute(
    store: &dyn TaskStore,
    command: RootCommand,
    today: NaiveDate,
) -> CliResult<CommandOutput> {
    match command {
        RootCommand::List(args) => task_list(store, args, today).await,
        RootCommand::Add(args) => task_add(store, args, today).await,
        RootCommand::Done(args) => task_done(store, args, today).await,
        RootCommand::Delete(args) => task_delete(store, args).await,
        RootCommand::Migrate(args) => task_migrate(store, args).await,
    }
}

async fn task_list(store: &dyn TaskStore, args: ListArgs, today: NaiveDate) -> CliResult<CommandOutput> {
    let tasks = store.list().await.map_err(store_error)?;
    let query = args.search.unwrap_or_default();
    let visible: Vec<&Task> = filter_tasks(&tasks, &query)
        .into_iter()
        .filter(|task| !args.pending || !task.completed)
        .collect();

    let data = json!({
        "tasks": visible.iter().map(|task| task_json(task, today)).collect::<Vec<_>>(),
        "total": visible.len(),
    });

    Ok(CommandOutput {
        command: "list",
        data,
        text: render_task_list_text(&visible, today),
    })
}

fn render_task_list_text(tasks: &[&Task], today: NaiveDate) -> String {
    if tasks.is_empty() {
        return "No tasks.".to_string();
    }

    let rows = tasks
        .iter()
        .map(|task| {
            let urgency = Urgency::classify(task.due_date, today);
            let due = match task.due_date {
                Some(date) => format!("{date} {}", urgency.label()),
                None => urgency.label(),
            };
            vec![
                if task.completed { "[x]" } else { "[ ]" }.to_string(),
                task.id.as_simple().to_string()[..8].to_string(),
                task.title.clone(),
                task.subject.to_string(),
                task.student.to_string(),
                due,
            ]
        })
        .collect::<Vec<_>>();

    render_text_table(&["", "ID", "TITLE", "SUBJECT", "STUDENT", "DUE"], &rows)
}

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();

    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let pad = width.saturating_sub(cell.chars().count());
                format!("{cell}{}", " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_row(headers.to_vec())];
    lines.extend(
        rows.iter()
            .map(|row| format_row(row.iter().map(String::as_str).collect())),
    );
    lines.join("\n")
}

async fn task_add(store: &dyn TaskStore, args: AddArgs, today: NaiveDate) -> CliResult<CommandOutput> {
    let subject = Subject::from_str(&args.subject).map_err(|()| {
        usage_error(
            "INVALID_SUBJECT",
            format!(
                "unknown subject '{}'; expected one of {}",
                args.subject,
                Subject::ALL.map(Subject::as_str).join(", ")
            ),
        )
    })?;
    let student = Student::from_str(&args.student).map_err(|()| {
        usage_error(
            "INVALID_STUDENT",
            format!(
                "unknown student '{}'; expected one of {}",
                args.student,
                Student::ALL.map(Student::name).join(", ")
            ),
        )
    })?;

    let mut form = TaskFormState::create();
    form.title = args.title;
    form.subject = subject;
    form.student = student;
    form.due_input = args.due.unwrap_or_default();
    let draft = form
        .validate(today)
        .map_err(|err| usage_error("INVALID_TASK", err.to_string()))?;

    let created = store
        .create(&draft.into_task(Uuid::new_v4()))
        .await
        .map_err(store_error)?;
    info!(task_id = %created.id, "task added from cli");

    Ok(CommandOutput {
        command: "add",
        text: format!("Added '{}' ({})", created.title, created.id),
        data: json!({ "task": task_json(&created, today) }),
    })
}

async fn task_done(store: &dyn TaskStore, args: DoneArgs, today: NaiveDate) -> CliResult<CommandOutput> {
    let id = resolve_task_id_selector(store, &args.id).await?;
    let updated = store
        .update(id, &TaskPatch::completed(!args.undo))
        .await
        .map_err(store_error)?;

    let state = if updated.completed { "completed" } else { "pending" };
    Ok(CommandOutput {
        command: "done",
        text: format!("'{}' marked {state}", updated.title),
        data: json!({ "task": task_json(&updated, today) }),
    })
}

async fn task_delete(store: &dyn TaskStore, args: DeleteArgs) -> CliResult<CommandOutput> {
    let id = resolve_task_id_selector(store, &args.id).await?;
    store.delete(id).await.map_err(store_error)?;

    Ok(CommandOutput {
        command: "delete",
        text: format!("Deleted {id}"),
        data: json!({ "deleted": id.to_string() }),
    })
}

async fn task_migrate(store: &dyn TaskStore, args: MigrateArgs) -> CliResult<CommandOutput> {
    let tasks = store.list().await.map_err(store_error)?;
    let pending: Vec<&Task> = tasks.iter().filter(|task| task.needs_migration).collect();

    let mut migrated = Vec::new();
    if !args.dry_run {
        for task in &pending {
            let patch = TaskPatch {
                student: Some(task.student),
                color: Some(task.student.palette().base.hex()),
                ..TaskPatch::default()
            };
            store.update(task.id, &patch).await.map_err(store_error)?;
            migrated.push(task.id.to_string());
        }
    }

    let text = match (pending.len(), args.dry_run) {
        (0, _) => "Nothing to migrate.".to_string(),
        (count, true) => format!("{count} task(s) would be migrated"),
        (count, false) => format!("Migrated {count} task(s)"),
    };
    Ok(CommandOutput {
        command: "migrate",
        text,
        data: json!({
            "dry_run": args.dry_run,
            "pending": pending.iter().map(|task| task.id.to_string()).collect::<Vec<_>>(),
            "migrated": migrated,
        }),
    })
}

/// Accepts a full UUID or a unique prefix of one.
async fn resolve_task_id_selector(store: &dyn TaskStore, selector: &str) -> CliResult<Uuid> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return Err(usage_error("TASK_ID_REQUIRED", "task id cannot be empty"));
    }

    if let Ok(parsed) = Uuid::parse_str(trimmed) {
        return Ok(parsed);
    }

    let needle = trimmed.to_ascii_lowercase();
    let tasks = store.list().await.map_err(store_error)?;
    let matches = tasks
        .iter()
        .filter(|task| {
            task.id.to_string().starts_with(&needle)
                || task.id.as_simple().to_string().starts_with(&needle)
        })
        .map(|task| task.id)
        .collect::<Vec<_>>();

    match matches.as_slice() {
        [single] => Ok(*single),
        [] => Err(not_found_error(
            "TASK_NOT_FOUND",
            format!("task '{selector}' not found"),
        )),
        many => Err(CliError {
            exit_code: 4,
            code: "TASK_ID_AMBIGUOUS",
            message: format!(
                "task id prefix '{selector}' matches {} tasks; use a longer id",
                many.len()
            ),
            details: Some(json!({
                "matches": many.iter().map(Uuid::to_string).collect::<Vec<_>>()
            })),
        }),
    }
}

fn task_json(task: &Task, today: NaiveDate) -> Value {
    let urgency = Urgency::classify(task.due_date, today);
    json!({
        "id": task.id.to_string(),
        "title": task.title,
        "subject": task.subject.as_str(),
        "student": task.student.name(),
        "color": task.student.palette().base.hex(),
        "due_date": task.due_date.map(|date| date.to_string()),
        "urgency": urgency.kind(),
        "label": urgency.label(),
        "completed": task.completed,
        "notes": task.notes,
    })
}

fn usage_error(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 2,
        code,
        message: message.into(),
        details: None,
    }
}

fn not_found_error(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 3,
        code,
        message: message.into(),
        details: None,
    }
}

fn store_error(err: StoreError) -> CliError {
    let exit_code = match err {
        StoreError::NotFound(_) => 3,
        StoreError::Config(_) => 2,
        _ => 5,
    };
    let details = match &err {
        StoreError::Status { status, body } => Some(json!({ "status": status, "body": body })),
        _ => None,
    };
    CliError {
        exit_code,
        code: err.code(),
        message: err.to_string(),
        details,
    }
}

fn print_success(output: CommandOutput, json_output: bool, quiet: bool) {
    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "command": output.command,
            "data": output.data
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => println!("{value}"),
            Err(_) => println!("{}", payload),
        }
        return;
    }

    if quiet {
        return;
    }

    if output.text.is_empty() {
        println!("ok");
    } else {
        println!("{}", output.text);
    }
}

fn print_error(err: &CliError, json_output: bool) {
    error!(
        code = err.code,
        message = %err.message,
        details = ?err.details,
        "cli command failed"
    );

    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "error": {
                "code": err.code,
                "message": err.message,
                "details": err.details
            }
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => eprintln!("{value}"),
            Err(_) => eprintln!("{}", payload),
        }
        return;
    }

    eprintln!("error[{}]: {}", err.code, err.message);
}
