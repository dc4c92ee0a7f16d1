// File: src/model/event.rs
// Candidate and final event types, plus the local assembler that builds
// candidates from a message with the field extractors.
use crate::model::analyzer::TextAnalyzer;
use crate::model::extract::{self, ExtractInput};
use crate::model::message::Message;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// 24-hour form used by records.
pub const TIME_FORMAT: &str = "%H:%M";
/// 12-hour form emitted by the local extractor.
pub const LOCAL_TIME_FORMAT: &str = "%I:%M %p";

/// Provisional fields before validation. Values are kept as text; the
/// normalizer is responsible for parsing them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCandidate {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub venue: Option<String>,
    pub registration_link: Option<String>,
}

impl EventCandidate {
    /// Title, date and time are all present and non-blank.
    pub fn is_complete(&self) -> bool {
        [&self.title, &self.date, &self.time]
            .iter()
            .all(|f| f.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// A validated event. Dates serialize as `YYYY-MM-DD`, times as 24-hour `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub registration_link: String,
}

impl EventRecord {
    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn time_string(&self) -> String {
        self.time.format(TIME_FORMAT).to_string()
    }

    /// Back to the loose shape, e.g. to feed a record through the normalizer again.
    pub fn to_candidate(&self) -> EventCandidate {
        EventCandidate {
            title: Some(self.title.clone()),
            date: Some(self.date_string()),
            time: Some(self.time_string()),
            venue: Some(self.venue.clone()),
            registration_link: Some(self.registration_link.clone()),
        }
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} at {}", self.title, self.date_string(), self.time_string())?;
        if !self.venue.is_empty() {
            write!(f, " @ {}", self.venue)?;
        }
        Ok(())
    }
}

mod hhmm {
    use super::TIME_FORMAT;
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format(TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

/// Runs the four field extractors over one message.
///
/// Returns `None` as soon as the date, the time or the title cannot be found;
/// venue and link are optional.
pub fn assemble_local(
    message: &Message,
    analyzer: &dyn TextAnalyzer,
    now: NaiveDateTime,
) -> Option<EventCandidate> {
    let annotation = analyzer.annotate(&message.body);
    let input = ExtractInput {
        text: &message.body,
        annotation: &annotation,
        now,
        posted_at: Some(message.timestamp),
    };

    let schedule = extract::extract_schedule(&input)?;
    let (Some(date), Some(time)) = (schedule.date, schedule.time) else {
        log::debug!("No complete date/time in message at {}", message.timestamp);
        return None;
    };
    let title = extract::extract_title(&input)?;

    Some(EventCandidate {
        title: Some(title),
        date: Some(date.format(DATE_FORMAT).to_string()),
        time: Some(time.format(LOCAL_TIME_FORMAT).to_string()),
        venue: extract::extract_venue(&input),
        registration_link: extract::extract_registration_link(&input),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::analyzer::RuleAnalyzer;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn message(body: &str) -> Message {
        Message {
            timestamp: at(2025, 4, 21, 13, 30),
            sender: None,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_assembles_candidate_in_local_format() {
        let c = assemble_local(
            &message("Quiz Nite register now forms.gle/abc venue: XYZ Hall"),
            &RuleAnalyzer,
            at(2025, 4, 21, 14, 0),
        )
        .unwrap();
        assert_eq!(c.title.as_deref(), Some("Quiz Nite"));
        assert_eq!(c.date.as_deref(), Some("2025-04-21"));
        assert_eq!(c.time.as_deref(), Some("01:30 PM"));
        assert_eq!(c.venue.as_deref(), Some("XYZ Hall"));
        assert_eq!(c.registration_link.as_deref(), Some("https://forms.gle/abc"));
        assert!(c.is_complete());
    }

    #[test]
    fn test_missing_time_or_title_short_circuits() {
        let now = at(2025, 4, 21, 14, 0);
        assert_eq!(
            assemble_local(&message("Quiz at XYZ Hall on 25th April"), &RuleAnalyzer, now),
            None
        );
        assert_eq!(
            assemble_local(&message("Party at XYZ Hall on 25th April, 7 pm"), &RuleAnalyzer, now),
            None
        );
    }

    #[test]
    fn test_record_serializes_with_short_time() {
        let record = EventRecord {
            title: "Quiz Nite".into(),
            date: NaiveDate::from_ymd_opt(2025, 4, 21).unwrap(),
            time: NaiveTime::from_hms_opt(13, 30, 0).unwrap(),
            venue: String::new(),
            registration_link: String::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2025-04-21");
        assert_eq!(json["time"], "13:30");
        assert_eq!(json["venue"], "");

        let back: EventRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
