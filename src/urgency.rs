//! Due-date urgency classification.
//!
//! All arithmetic happens on calendar dates; a stored timestamp has already
//! been truncated to its day by the time it reaches this module.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Urgency {
    NoDate,
    Overdue { days: u32 },
    DueToday,
    DueTomorrow,
    Upcoming { days: u32 },
}

impl Urgency {
    pub fn classify(due: Option<NaiveDate>, today: NaiveDate) -> Self {
        let Some(due) = due else {
            return Self::NoDate;
        };

        let diff = due.signed_duration_since(today).num_days();
        let days = u32::try_from(diff.unsigned_abs()).unwrap_or(u32::MAX);
        match diff {
            d if d < 0 => Self::Overdue { days },
            0 => Self::DueToday,
            1 => Self::DueTomorrow,
            _ => Self::Upcoming { days },
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::NoDate => "—".to_string(),
            Self::Overdue { days } => format!("({days} {} overdue)", plural_days(days)),
            Self::DueToday => "(Today)".to_string(),
            Self::DueTomorrow => "(Tomorrow)".to_string(),
            Self::Upcoming { days } => format!("({days} {} left)", plural_days(days)),
        }
    }

    pub const fn indicator(self) -> Option<&'static str> {
        match self {
            Self::Overdue { .. } => Some("⚠"),
            Self::DueTomorrow => Some("🚨"),
            Self::DueToday => Some("❓"),
            Self::NoDate | Self::Upcoming { .. } => None,
        }
    }

    /// Stable machine-readable name, used by the CLI's JSON output.
    pub const fn kind(self) -> &'static str {
        match self {
            Self::NoDate => "no_date",
            Self::Overdue { .. } => "overdue",
            Self::DueToday => "today",
            Self::DueTomorrow => "tomorrow",
            Self::Upcoming { .. } => "upcoming",
        }
    }
}

fn plural_days(days: u32) -> &'static str {
    if days == 1 { "day" } else { "days" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_every_past_date_is_overdue_by_its_distance() {
        let today = date(2026, 3, 1);
        for back in 1..=400_u32 {
            let due = today - chrono::Duration::days(i64::from(back));
            assert_eq!(
                Urgency::classify(Some(due), today),
                Urgency::Overdue { days: back }
            );
        }
    }

    #[test]
    fn test_next_calendar_day_is_tomorrow_across_month_and_year_edges() {
        for today in [date(2026, 1, 31), date(2026, 12, 31), date(2028, 2, 28)] {
            let tomorrow = today.succ_opt().expect("next day exists");
            assert_eq!(
                Urgency::classify(Some(tomorrow), today),
                Urgency::DueTomorrow
            );
        }
    }

    #[test]
    fn test_today_and_upcoming() {
        let today = date(2026, 10, 15);
        assert_eq!(Urgency::classify(Some(today), today), Urgency::DueToday);
        assert_eq!(
            Urgency::classify(Some(date(2026, 10, 20)), today),
            Urgency::Upcoming { days: 5 }
        );
    }

    #[test]
    fn test_missing_date_has_no_indicator() {
        let urgency = Urgency::classify(None, date(2026, 10, 15));
        assert_eq!(urgency, Urgency::NoDate);
        assert_eq!(urgency.indicator(), None);
        assert_eq!(urgency.label(), "—");
    }

    #[test]
    fn test_labels_pluralize() {
        assert_eq!(Urgency::Overdue { days: 1 }.label(), "(1 day overdue)");
        assert_eq!(Urgency::Overdue { days: 3 }.label(), "(3 days overdue)");
        assert_eq!(Urgency::Upcoming { days: 2 }.label(), "(2 days left)");
        assert_eq!(Urgency::DueToday.label(), "(Today)");
        assert_eq!(Urgency::DueTomorrow.label(), "(Tomorrow)");
    }

    #[test]
    fn test_indicators() {
        assert_eq!(Urgency::Overdue { days: 9 }.indicator(), Some("⚠"));
        assert_eq!(Urgency::DueTomorrow.indicator(), Some("🚨"));
        assert_eq!(Urgency::DueToday.indicator(), Some("❓"));
        assert_eq!(Urgency::Upcoming { days: 4 }.indicator(), None);
    }
}
