//! Module keys
//!
//! A module key is the free-text label stored on `Task.module_name` that
//! groups a user's tasks by month, week of month and subject:
//!
//! ```text
//! March-Week2-jane_doe-Algebra
//! ```
//!
//! The username part is normalized so it never contains a `-`, which lets
//! [`parse_module_key`] rejoin hyphenated subjects. Labels that don't follow
//! the format are kept as [`ModuleKey::Legacy`] (too few parts) or
//! [`ModuleKey::Invalid`] (right shape, bad month/week).
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use teamtask_shared::module_key::{build_module_key, parse_module_key, ModuleKey};
//!
//! let date = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
//! let key = build_module_key(date, "Jane Doe", "Algebra");
//! assert_eq!(key, "March-Week3-jane_doe-Algebra");
//!
//! match parse_module_key(&key) {
//!     ModuleKey::Parsed { week, username, subject, .. } => {
//!         assert_eq!(week, 3);
//!         assert_eq!(username, "jane_doe");
//!         assert_eq!(subject, "Algebra");
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use chrono::{Datelike, Month, NaiveDate};
use serde::{Serialize, Serializer};

const SEPARATOR: char = '-';
const WEEK_PREFIX: &str = "Week";
const MIN_PARTS: usize = 4;

/// Why a label with the module-key shape could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModuleKeyError {
    #[error("module label is empty")]
    Empty,

    #[error("unknown month '{0}'")]
    UnknownMonth(String),

    #[error("invalid week '{0}', expected Week1 to Week6")]
    InvalidWeek(String),
}

impl Serialize for ModuleKeyError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A parsed `Task.module_name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleKey {
    Parsed {
        #[serde(serialize_with = "serialize_month")]
        month: Month,
        week: u32,
        username: String,
        subject: String,
    },

    /// Fewer than four parts; shown as an uncategorized group
    Legacy { label: String },

    Invalid {
        label: String,
        reason: ModuleKeyError,
    },
}

fn serialize_month<S: Serializer>(month: &Month, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(month.name())
}

impl ModuleKey {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ModuleKey::Parsed { .. })
    }

    /// The canonical label: rebuilt for parsed keys, verbatim otherwise
    pub fn label(&self) -> String {
        match self {
            ModuleKey::Parsed {
                month,
                week,
                username,
                subject,
            } => format_key(*month, *week, username, subject),
            ModuleKey::Legacy { label } | ModuleKey::Invalid { label, .. } => label.clone(),
        }
    }
}

impl std::fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Week of the month containing `date`, 1 to 6
///
/// Weeks start on Monday; week 1 is the (possibly partial) week holding the
/// 1st.
pub fn week_of_month(date: NaiveDate) -> u32 {
    let first_weekday = date
        .with_day(1)
        .map_or(1, |first| first.weekday().number_from_monday());

    (date.day() + first_weekday - 1).div_ceil(7)
}

/// Lowercases, turns whitespace into `_` and drops anything outside `[a-z0-9_]`
pub fn normalize_username(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

fn format_key(month: Month, week: u32, username: &str, subject: &str) -> String {
    format!(
        "{}{SEPARATOR}{WEEK_PREFIX}{}{SEPARATOR}{}{SEPARATOR}{}",
        month.name(),
        week,
        username,
        subject
    )
}

fn month_of(date: NaiveDate) -> Month {
    // `month()` is always 1..=12
    Month::try_from(date.month() as u8).unwrap_or(Month::January)
}

/// Builds `{Month}-Week{N}-{username}-{subject}` for a task dated `date`
///
/// The subject is used as given.
pub fn build_module_key(date: NaiveDate, display_name: &str, subject: &str) -> String {
    format_key(
        month_of(date),
        week_of_month(date),
        &normalize_username(display_name),
        subject,
    )
}

fn parse_month(token: &str) -> Result<Month, ModuleKeyError> {
    (1..=12u8)
        .filter_map(|n| Month::try_from(n).ok())
        .find(|m| m.name().eq_ignore_ascii_case(token))
        .ok_or_else(|| ModuleKeyError::UnknownMonth(token.to_string()))
}

fn parse_week(token: &str) -> Result<u32, ModuleKeyError> {
    token
        .strip_prefix(WEEK_PREFIX)
        .and_then(|n| n.parse::<u32>().ok())
        .filter(|n| (1..=6).contains(n))
        .ok_or_else(|| ModuleKeyError::InvalidWeek(token.to_string()))
}

/// Parses a `Task.module_name` label
///
/// Everything after the third separator is the subject, so hyphenated
/// subjects survive.
pub fn parse_module_key(label: &str) -> ModuleKey {
    if label.trim().is_empty() {
        return ModuleKey::Invalid {
            label: String::new(),
            reason: ModuleKeyError::Empty,
        };
    }

    let parts: Vec<&str> = label.split(SEPARATOR).collect();
    if parts.len() < MIN_PARTS {
        return ModuleKey::Legacy {
            label: label.to_string(),
        };
    }

    let parsed = parse_month(parts[0]).and_then(|month| Ok((month, parse_week(parts[1])?)));

    match parsed {
        Ok((month, week)) => ModuleKey::Parsed {
            month,
            week,
            username: parts[2].to_string(),
            subject: parts[3..].join("-"),
        },
        Err(reason) => ModuleKey::Invalid {
            label: label.to_string(),
            reason,
        },
    }
}

impl From<&str> for ModuleKey {
    fn from(label: &str) -> Self {
        parse_module_key(label)
    }
}
