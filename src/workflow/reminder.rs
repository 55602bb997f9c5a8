// SPDX-License-Identifier: MIT

//! Reminder scheduling over shift working hours
//!
//! A doctype's [`DocumentShift`] declares its working day (start, end and a
//! break) and a list of rules, each granting a number of working hours to
//! documents matching its condition. A reminder is due once those hours of
//! working time have passed, skipping breaks, nights and holidays.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashSet};

use super::condition;
use super::document::DocumentRecord;
use super::transitions::next_roles;
use super::types::{Timestamp, Transition};
use crate::error::{Result, StateChangeError};

/// How far ahead `reminder_due_at` looks before giving up
pub const MAX_SCHEDULE_DAYS: usize = 3660;

/// Working day of a shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftHours {
    #[serde(with = "shift_time")]
    pub start_time: NaiveTime,
    #[serde(with = "shift_time")]
    pub end_time: NaiveTime,
    #[serde(with = "shift_time")]
    pub break_start_time: NaiveTime,
    #[serde(with = "shift_time")]
    pub break_end_time: NaiveTime,
}

impl ShiftHours {
    /// The two working windows of `date`: before and after the break
    fn windows(&self, date: NaiveDate) -> [(NaiveDateTime, NaiveDateTime); 2] {
        let start = date.and_time(self.start_time);
        let end = date.and_time(self.end_time);
        [
            (start, date.and_time(self.break_start_time).min(end)),
            (date.and_time(self.break_end_time).max(start), end),
        ]
    }
}

/// Grants `total_time` working hours to documents matching `condition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftRule {
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub total_time: f64,
}

/// Shift definition of one doctype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentShift {
    #[serde(default)]
    pub doctype_name: String,
    #[serde(flatten)]
    pub hours: ShiftHours,
    #[serde(default)]
    pub shift_details: Vec<ShiftRule>,
}

impl DocumentShift {
    /// Hours of the first rule whose condition holds for `doc`
    pub fn required_hours(&self, doc: &DocumentRecord) -> Option<f64> {
        self.shift_details
            .iter()
            .find(|rule| condition::holds(rule.condition.as_deref(), doc))
            .map(|rule| rule.total_time)
    }

    /// When a reminder raised at `from` for `doc` falls due
    pub fn schedule(
        &self,
        doc: &DocumentRecord,
        from: Timestamp,
        holidays: &Holidays,
    ) -> Result<Timestamp> {
        let hours = self
            .required_hours(doc)
            .filter(|h| *h > 0.0)
            .ok_or_else(|| {
                StateChangeError::Schedule(format!(
                    "no shift rule of '{}' grants working hours to this document",
                    self.doctype_name
                ))
            })?;

        reminder_due_at(from.as_naive(), hours, &self.hours, |d| holidays.contains(d))
            .map(Timestamp::from)
            .ok_or_else(|| {
                StateChangeError::Schedule(format!(
                    "{} working hours do not fit within {} days",
                    hours, MAX_SCHEDULE_DAYS
                ))
            })
    }
}

/// Moment `hours` of working time after `from`
///
/// Time before the shift starts, during the break, after it ends and on
/// holidays does not count. `None` when the shift has no working time within
/// [`MAX_SCHEDULE_DAYS`] or `hours` is not a finite number.
pub fn reminder_due_at(
    from: NaiveDateTime,
    hours: f64,
    shift: &ShiftHours,
    is_holiday: impl Fn(NaiveDate) -> bool,
) -> Option<NaiveDateTime> {
    if !hours.is_finite() {
        return None;
    }
    if hours <= 0.0 {
        return Some(from);
    }

    let mut remaining = Duration::try_milliseconds((hours * 3_600_000.0).round() as i64)?;
    let mut current = from;

    for _ in 0..MAX_SCHEDULE_DAYS {
        let date = current.date();
        if !is_holiday(date) {
            for (open, close) in shift.windows(date) {
                let begin = current.max(open);
                if begin >= close {
                    continue;
                }
                let available = close - begin;
                if available >= remaining {
                    return Some(begin + remaining);
                }
                remaining -= available;
                current = close;
            }
        }
        current = date.succ_opt()?.and_time(shift.start_time);
    }

    None
}

/// Who to remind about a document, and when
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderPlan {
    pub workflow_state: String,
    pub roles: BTreeSet<String>,
    pub due_at: Timestamp,
}

/// Plan the reminder for `doc` raised at `from`: the roles able to move it on
/// from its current state, and when they should hear about it
pub fn plan_reminder(
    shift: &DocumentShift,
    doc: &DocumentRecord,
    transitions: &[Transition],
    from: Timestamp,
    holidays: &Holidays,
) -> Result<ReminderPlan> {
    let workflow_state = doc.current_state();
    let roles = next_roles(&workflow_state, transitions, doc);
    if roles.is_empty() {
        return Err(StateChangeError::Schedule(format!(
            "no valid next role found from state '{}'",
            workflow_state
        )));
    }

    let due_at = shift.schedule(doc, from, holidays)?;
    Ok(ReminderPlan {
        workflow_state,
        roles,
        due_at,
    })
}

/// Non-working dates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Holidays(HashSet<NaiveDate>);

impl Holidays {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self(dates.into_iter().collect())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }
}

impl Serialize for Holidays {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut dates: Vec<&NaiveDate> = self.0.iter().collect();
        dates.sort();
        serializer.collect_seq(dates.into_iter().map(|d| d.format("%Y-%m-%d").to_string()))
    }
}

impl<'de> Deserialize<'de> for Holidays {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d"))
            .collect::<std::result::Result<HashSet<_>, _>>()
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// `HH:MM:SS` shift times, as the host stores them
mod shift_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.trim();
        NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map_err(serde::de::Error::custom)
    }
}
