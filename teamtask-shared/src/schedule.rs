//! Time-slot schedules
//!
//! A task can be planned as a set of time slots across one or more days.
//! [`Schedule`] is the structured view of those slots (grouped by day, sorted,
//! with hour totals) and [`render_html`] turns it into the HTML stored as the
//! task description.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("a schedule needs at least one time slot")]
    Empty,

    #[error("time slot on {date} ends at {end} which is not after its start {start}")]
    InvalidRange {
        date: NaiveDate,
        start: String,
        end: String,
    },
}

/// `HH:MM` (also accepts `HH:MM:SS`)
mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|_| D::Error::custom(format!("invalid time '{}', expected HH:MM", raw)))
    }
}

/// One planned block of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: NaiveDate,

    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,

    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TimeSlot {
    pub fn hours(&self) -> f64 {
        (self.end_time - self.start_time).num_minutes() as f64 / 60.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleDay {
    pub date: NaiveDate,

    /// Sorted by start time
    pub slots: Vec<TimeSlot>,
    pub hours: f64,
}

/// Slots grouped by day in ascending date order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    pub days: Vec<ScheduleDay>,
    pub total_hours: f64,
}

impl Schedule {
    pub fn from_slots(slots: Vec<TimeSlot>) -> Result<Self, ScheduleError> {
        if slots.is_empty() {
            return Err(ScheduleError::Empty);
        }

        let mut by_date: BTreeMap<NaiveDate, Vec<TimeSlot>> = BTreeMap::new();
        for slot in slots {
            if slot.end_time <= slot.start_time {
                return Err(ScheduleError::InvalidRange {
                    date: slot.date,
                    start: slot.start_time.format(hhmm::FORMAT).to_string(),
                    end: slot.end_time.format(hhmm::FORMAT).to_string(),
                });
            }
            by_date.entry(slot.date).or_default().push(slot);
        }

        let days: Vec<ScheduleDay> = by_date
            .into_iter()
            .map(|(date, mut slots)| {
                slots.sort_by_key(|s| (s.start_time, s.end_time));
                let hours = slots.iter().map(TimeSlot::hours).sum();
                ScheduleDay { date, slots, hours }
            })
            .collect();

        let total_hours = days.iter().map(|d| d.hours).sum();

        Ok(Self { days, total_hours })
    }

    pub fn slot_count(&self) -> usize {
        self.days.iter().map(|d| d.slots.len()).sum()
    }
}

/// Escapes text for use in HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `2.5`, `3`, `0.75`
fn format_hours(hours: f64) -> String {
    let formatted = format!("{:.2}", hours);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Renders a schedule as a nested HTML list
pub fn render_html(schedule: &Schedule) -> String {
    let mut html = String::from("<ul class=\"schedule\">");

    for day in &schedule.days {
        html.push_str(&format!(
            "<li><strong>{}</strong> ({}h)<ul>",
            day.date.format("%A, %B %-d, %Y"),
            format_hours(day.hours)
        ));

        for slot in &day.slots {
            html.push_str(&format!(
                "<li>{}-{}",
                slot.start_time.format(hhmm::FORMAT),
                slot.end_time.format(hhmm::FORMAT)
            ));
            if let Some(note) = slot.note.as_deref().filter(|n| !n.trim().is_empty()) {
                html.push_str(": ");
                html.push_str(&escape_html(note));
            }
            html.push_str("</li>");
        }

        html.push_str("</ul></li>");
    }

    html.push_str(&format!(
        "</ul><p class=\"schedule-total\">Total: {}h</p>",
        format_hours(schedule.total_hours)
    ));
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(day: u32, start: &str, end: &str, note: Option<&str>) -> TimeSlot {
        TimeSlot {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            start_time: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
            end_time: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
            note: note.map(str::to_string),
        }
    }

    #[test]
    fn test_groups_and_sorts_slots() {
        let schedule = Schedule::from_slots(vec![
            slot(5, "14:00", "15:30", None),
            slot(4, "13:00", "14:00", None),
            slot(4, "09:00", "11:30", Some("standup + review")),
        ])
        .unwrap();

        assert_eq!(schedule.days.len(), 2);
        assert_eq!(schedule.days[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(schedule.days[0].slots[0].start_time.format("%H:%M").to_string(), "09:00");
        assert_eq!(schedule.days[0].hours, 3.5);
        assert_eq!(schedule.days[1].hours, 1.5);
        assert_eq!(schedule.total_hours, 5.0);
        assert_eq!(schedule.slot_count(), 3);
    }

    #[test]
    fn test_rejects_empty_and_inverted_slots() {
        assert_eq!(Schedule::from_slots(vec![]), Err(ScheduleError::Empty));

        let err = Schedule::from_slots(vec![slot(4, "10:00", "10:00", None)]).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidRange { .. }));
        assert!(err.to_string().contains("10:00"));
    }

    #[test]
    fn test_render_html_escapes_notes() {
        let schedule = Schedule::from_slots(vec![slot(
            4,
            "09:00",
            "10:15",
            Some("<script>alert('x')</script> & more"),
        )])
        .unwrap();

        let html = render_html(&schedule);
        assert!(html.starts_with("<ul class=\"schedule\">"));
        assert!(html.contains("<strong>Monday, March 4, 2024</strong> (1.25h)"));
        assert!(html.contains("<li>09:00-10:15: &lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more</li>"));
        assert!(!html.contains("<script>"));
        assert!(html.ends_with("Total: 1.25h</p>"));
    }

    #[test]
    fn test_time_slot_json() {
        let slot: TimeSlot = serde_json::from_str(
            r#"{"date":"2024-03-04","start_time":"09:00","end_time":"17:30"}"#,
        )
        .unwrap();
        assert_eq!(slot.hours(), 8.5);
        assert!(slot.note.is_none());

        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(json["start_time"], "09:00");

        assert!(serde_json::from_str::<TimeSlot>(
            r#"{"date":"2024-03-04","start_time":"9am","end_time":"17:30"}"#
        )
        .is_err());
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(3.0), "3");
        assert_eq!(format_hours(2.5), "2.5");
        assert_eq!(format_hours(0.75), "0.75");
    }
}
