use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// A single homework item as stored in the `tasks` collection.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(try_from = "TaskRow")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub subject: Subject,
    pub due_date: Option<NaiveDate>,
    pub student: Student,
    pub color: String,
    pub completed: bool,
    pub notes: Option<String>,
    /// Set when the stored row used a legacy student code or a stale color.
    /// Never written back.
    #[serde(skip_serializing)]
    pub needs_migration: bool,
}

/// Loosely typed row as it arrives from the store.
#[derive(Debug, Clone, Deserialize)]
struct TaskRow {
    id: Uuid,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    student: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    completed: Option<bool>,
    #[serde(default)]
    notes: Option<String>,
}

impl TryFrom<TaskRow> for Task {
    type Error = String;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let title = row
            .title
            .filter(|title| !title.trim().is_empty())
            .ok_or_else(|| format!("task {}: missing title", row.id))?;
        let subject_raw = row.subject.unwrap_or_default();
        let subject = Subject::from_str(&subject_raw)
            .map_err(|()| format!("task {}: unknown subject '{subject_raw}'", row.id))?;
        let student_raw = row.student.unwrap_or_default();
        let (student, legacy_code) = Student::from_stored(&student_raw)
            .ok_or_else(|| format!("task {}: unknown student '{student_raw}'", row.id))?;

        let due_date = match row.due_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let parsed = parse_due_date(raw);
                if parsed.is_none() {
                    warn!(task_id = %row.id, due_date = raw, "ignoring unparseable due date");
                }
                parsed
            }
        };

        let color = row.color.unwrap_or_default();
        let stale_color = !color.eq_ignore_ascii_case(&student.palette().base.hex());

        Ok(Self {
            id: row.id,
            title,
            subject,
            due_date,
            student,
            color,
            completed: row.completed.unwrap_or(false),
            notes: row.notes,
            needs_migration: legacy_code || stale_color,
        })
    }
}

/// Truncates a stored due date to its calendar day.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and naive `YYYY-MM-DDTHH:MM:SS`
/// values. Timestamps keep the calendar date they were written with, without
/// any timezone conversion, so every caller agrees on the same day.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(timestamp.date());
        }
    }
    None
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub enum Subject {
    Math,
    English,
    Urdu,
    Islamiat,
    History,
    Geography,
    Science,
    #[serde(rename = "ICT")]
    Ict,
}

impl Subject {
    pub const ALL: [Self; 8] = [
        Self::Math,
        Self::English,
        Self::Urdu,
        Self::Islamiat,
        Self::History,
        Self::Geography,
        Self::Science,
        Self::Ict,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Math => "Math",
            Self::English => "English",
            Self::Urdu => "Urdu",
            Self::Islamiat => "Islamiat",
            Self::History => "History",
            Self::Geography => "Geography",
            Self::Science => "Science",
            Self::Ict => "ICT",
        }
    }

    pub const fn icon(self) -> &'static str {
        match self {
            Self::Math => "🔢",
            Self::English => "📖",
            Self::Urdu => "🇵🇰",
            Self::Islamiat => "🕌",
            Self::History => "📜",
            Self::Geography => "🌍",
            Self::Science => "🧪",
            Self::Ict => "💻",
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|subject| subject.as_str().eq_ignore_ascii_case(value))
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
pub enum Student {
    #[default]
    Muhammad,
    Mahveen,
    Hadia,
}

impl Student {
    pub const ALL: [Self; 3] = [Self::Muhammad, Self::Mahveen, Self::Hadia];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Muhammad => "Muhammad",
            Self::Mahveen => "Mahveen",
            Self::Hadia => "Hadia",
        }
    }

    pub const fn legacy_code(self) -> &'static str {
        match self {
            Self::Muhammad => "MHM",
            Self::Mahveen => "MAH",
            Self::Hadia => "HAD",
        }
    }

    /// Resolves a stored student value. The flag is true when the row used one
    /// of the legacy short codes.
    pub fn from_stored(value: &str) -> Option<(Self, bool)> {
        let value = value.trim();
        Self::ALL.into_iter().find_map(|student| {
            if student.name().eq_ignore_ascii_case(value) {
                Some((student, false))
            } else if student.legacy_code().eq_ignore_ascii_case(value) {
                Some((student, true))
            } else {
                None
            }
        })
    }

    pub fn palette(self) -> &'static StudentColor {
        &STUDENT_PALETTE[self as usize]
    }

    pub fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self as usize + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Student {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_stored(value).map(|(student, _)| student).ok_or(())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn from_hex(value: u32) -> Self {
        Self((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Moves each channel `amount` of the way toward white.
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        let step = |channel: u8| {
            let channel = f32::from(channel);
            (channel + (255.0 - channel) * amount).round() as u8
        };
        Self(step(self.0), step(self.1), step(self.2))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct StudentColor {
    pub base: Rgb,
    pub shade: Rgb,
}

const CHIP_SHADE_AMOUNT: f32 = 0.4;

static STUDENT_PALETTE: LazyLock<[StudentColor; 3]> = LazyLock::new(|| {
    [0x16a34a, 0x7c3aed, 0xf97316].map(|hex| {
        let base = Rgb::from_hex(hex);
        StudentColor {
            base,
            shade: base.lighten(CHIP_SHADE_AMOUNT),
        }
    })
});

/// Form payload before an id is attached.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub subject: Subject,
    pub due_date: Option<NaiveDate>,
    pub student: Student,
    pub notes: Option<String>,
}

impl TaskDraft {
    pub fn into_task(self, id: Uuid) -> Task {
        Task {
            id,
            color: self.student.palette().base.hex(),
            title: self.title,
            subject: self.subject,
            due_date: self.due_date,
            student: self.student,
            completed: false,
            notes: self.notes,
            needs_migration: false,
        }
    }

    pub fn into_patch(self) -> TaskPatch {
        TaskPatch {
            color: Some(self.student.palette().base.hex()),
            title: Some(self.title),
            subject: Some(self.subject),
            due_date: Some(self.due_date),
            student: Some(self.student),
            completed: None,
            notes: self.notes.map(Some),
        }
    }
}

/// Partial update; `None` fields are left untouched by the store.
#[derive(Debug, Clone, Default, Serialize, Eq, PartialEq)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<Student>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(subject) = self.subject {
            task.subject = subject;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(student) = self.student {
            task.student = student;
        }
        if let Some(color) = &self.color {
            task.color = color.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(notes) = &self.notes {
            task.notes = notes.clone();
        }
    }
}
