//! Recurrence rules
//!
//! Campaigns carry their cadence as a compact rule string, e.g.
//! "FREQ=WEEKLY;BYDAY=MO,WE;BYHOUR=9;BYMINUTE=30". A `RecurrenceSpec`
//! compiles to that string; the scheduler parses it back and asks whether
//! an occurrence falls inside the current tick window.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use courier_common::types::Frequency;
use std::collections::HashSet;
use thiserror::Error;

/// Rule parse failure
#[derive(Error, Debug)]
pub enum RecurrenceError {
    #[error("invalid recurrence rule: {0}")]
    InvalidRule(String),
}

/// User-facing recurrence description, compiled to a rule string
#[derive(Debug, Clone)]
pub struct RecurrenceSpec {
    pub frequency: Frequency,
    /// Weekdays the campaign fires on (weekly frequency)
    pub days: Vec<Weekday>,
    /// Time of day, UTC
    pub time: NaiveTime,
}

impl RecurrenceSpec {
    /// Compile to the rule string stored on the campaign
    pub fn compile(&self) -> String {
        let mut parts = vec![format!("FREQ={}", self.frequency)];

        if self.frequency == Frequency::Weekly {
            let days: Vec<&str> = self.days.iter().map(|d| day_code(*d)).collect();
            parts.push(format!("BYDAY={}", days.join(",")));
        }

        parts.push(format!("BYHOUR={}", self.time.format("%H")));
        parts.push(format!("BYMINUTE={}", self.time.format("%M")));
        parts.join(";")
    }
}

fn day_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn parse_day(code: &str) -> Option<Weekday> {
    match code {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

/// A parsed, evaluatable recurrence rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    frequency: Frequency,
    days: HashSet<Weekday>,
    hour: u32,
    minute: u32,
}

impl RecurrenceRule {
    /// Parse a rule string
    pub fn parse(rule: &str) -> Result<Self, RecurrenceError> {
        let mut frequency = None;
        let mut days = HashSet::new();
        let mut hour = None;
        let mut minute = None;

        for part in rule.split(';').filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| RecurrenceError::InvalidRule(format!("bad segment: {part}")))?;

            match key {
                "FREQ" => {
                    frequency = Some(match value {
                        "DAILY" => Frequency::Daily,
                        "WEEKLY" => Frequency::Weekly,
                        other => {
                            return Err(RecurrenceError::InvalidRule(format!(
                                "unsupported frequency: {other}"
                            )))
                        }
                    });
                }
                "BYDAY" => {
                    for code in value.split(',') {
                        let day = parse_day(code).ok_or_else(|| {
                            RecurrenceError::InvalidRule(format!("unknown weekday: {code}"))
                        })?;
                        days.insert(day);
                    }
                }
                "BYHOUR" => {
                    hour = Some(value.parse::<u32>().map_err(|_| {
                        RecurrenceError::InvalidRule(format!("bad hour: {value}"))
                    })?);
                }
                "BYMINUTE" => {
                    minute = Some(value.parse::<u32>().map_err(|_| {
                        RecurrenceError::InvalidRule(format!("bad minute: {value}"))
                    })?);
                }
                other => {
                    return Err(RecurrenceError::InvalidRule(format!(
                        "unknown segment: {other}"
                    )))
                }
            }
        }

        let frequency =
            frequency.ok_or_else(|| RecurrenceError::InvalidRule("missing FREQ".to_string()))?;
        let hour = hour.ok_or_else(|| RecurrenceError::InvalidRule("missing BYHOUR".to_string()))?;
        let minute =
            minute.ok_or_else(|| RecurrenceError::InvalidRule("missing BYMINUTE".to_string()))?;

        if hour > 23 || minute > 59 {
            return Err(RecurrenceError::InvalidRule(format!(
                "time out of range: {hour}:{minute}"
            )));
        }
        if frequency == Frequency::Weekly && days.is_empty() {
            return Err(RecurrenceError::InvalidRule(
                "weekly rule requires BYDAY".to_string(),
            ));
        }

        Ok(Self {
            frequency,
            days,
            hour,
            minute,
        })
    }

    /// Whether the rule yields at least one occurrence in `(start, end]`
    pub fn occurs_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if end <= start {
            return false;
        }

        let mut date = start.date_naive();
        let last = end.date_naive();

        while date <= last {
            let matches_day = match self.frequency {
                Frequency::Daily => true,
                Frequency::Weekly => self.days.contains(&date.weekday()),
            };

            if matches_day {
                if let Some(candidate) = date
                    .and_hms_opt(self.hour, self.minute, 0)
                    .map(|naive| Utc.from_utc_datetime(&naive))
                {
                    if candidate > start && candidate <= end {
                        return true;
                    }
                }
            }

            date += Duration::days(1);
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_compile_weekly_spec() {
        let spec = RecurrenceSpec {
            frequency: Frequency::Weekly,
            days: vec![Weekday::Mon, Weekday::Wed],
            time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        };
        assert_eq!(spec.compile(), "FREQ=WEEKLY;BYDAY=MO,WE;BYHOUR=09;BYMINUTE=30");
    }

    #[test]
    fn test_compile_parse_roundtrip() {
        let spec = RecurrenceSpec {
            frequency: Frequency::Daily,
            days: Vec::new(),
            time: NaiveTime::from_hms_opt(14, 5, 0).unwrap(),
        };
        let rule = RecurrenceRule::parse(&spec.compile()).unwrap();
        // 2024-06-03 is a Monday
        assert!(rule.occurs_between(utc("2024-06-03T14:04:30Z"), utc("2024-06-03T14:05:30Z")));
    }

    #[test]
    fn test_weekly_rule_fires_once_in_minute_window() {
        let rule = RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=MO,WE;BYHOUR=9;BYMINUTE=30").unwrap();

        // Monday 09:30 falls inside the surrounding minute window
        assert!(rule.occurs_between(utc("2024-06-03T09:29:30Z"), utc("2024-06-03T09:30:30Z")));
        // Same window on Tuesday: no occurrence
        assert!(!rule.occurs_between(utc("2024-06-04T09:29:30Z"), utc("2024-06-04T09:30:30Z")));
        // Monday but a different minute: no occurrence
        assert!(!rule.occurs_between(utc("2024-06-03T09:30:30Z"), utc("2024-06-03T09:31:30Z")));
    }

    #[test]
    fn test_window_bounds_are_half_open() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;BYHOUR=12;BYMINUTE=0").unwrap();

        // Occurrence exactly at the window end is included
        assert!(rule.occurs_between(utc("2024-06-03T11:59:00Z"), utc("2024-06-03T12:00:00Z")));
        // Occurrence exactly at the window start is excluded
        assert!(!rule.occurs_between(utc("2024-06-03T12:00:00Z"), utc("2024-06-03T12:01:00Z")));
    }

    #[test]
    fn test_window_spanning_midnight() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;BYHOUR=0;BYMINUTE=0").unwrap();
        assert!(rule.occurs_between(utc("2024-06-03T23:59:30Z"), utc("2024-06-04T00:00:30Z")));
    }

    #[test]
    fn test_parse_rejects_malformed_rules() {
        assert!(RecurrenceRule::parse("FREQ=MONTHLY;BYHOUR=9;BYMINUTE=0").is_err());
        assert!(RecurrenceRule::parse("FREQ=WEEKLY;BYHOUR=9;BYMINUTE=0").is_err());
        assert!(RecurrenceRule::parse("FREQ=DAILY;BYHOUR=25;BYMINUTE=0").is_err());
        assert!(RecurrenceRule::parse("FREQ=DAILY;BYDAY=XX;BYHOUR=9;BYMINUTE=0").is_err());
        assert!(RecurrenceRule::parse("garbage").is_err());
    }
}
