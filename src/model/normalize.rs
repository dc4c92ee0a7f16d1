// File: src/model/normalize.rs
// Brings local and remote extraction output onto one record schema.
use crate::model::event::{DATE_FORMAT, EventCandidate, EventRecord, TIME_FORMAT};
use crate::model::fuzzy;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};

pub const DEFAULT_TIME: &str = "09:00";

/// Canonical field name for a (lower-cased) key, or `None` for keys the schema does not know.
pub fn canonical_key(key: &str) -> Option<&'static str> {
    match key {
        "title" | "name" | "event" | "event_name" | "quiz" => Some("title"),
        "date" => Some("date"),
        "time" => Some("time"),
        "venue" | "location" | "place" => Some("venue"),
        "registration_link" | "reg_link" | "form_link" | "link" | "registration"
        | "registration_url" | "url" => Some("registration_link"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    today: NaiveDate,
    default_time: NaiveTime,
}

impl Normalizer {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            today: now.date(),
            default_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn with_default_time(mut self, time: NaiveTime) -> Self {
        self.default_time = time;
        self
    }

    /// Maps arbitrary key spellings onto the candidate fields. Unknown keys
    /// are dropped; when two keys map to the same field the first non-empty one wins.
    pub fn canonicalize(&self, raw: &Map<String, Value>) -> EventCandidate {
        let mut candidate = EventCandidate::default();
        for (key, value) in raw {
            let Some(field) = canonical_key(&key.trim().to_lowercase()) else {
                log::debug!("Dropping unknown field '{}'", key);
                continue;
            };
            let Some(text) = value_text(value) else {
                continue;
            };
            let slot = match field {
                "title" => &mut candidate.title,
                "date" => &mut candidate.date,
                "time" => &mut candidate.time,
                "venue" => &mut candidate.venue,
                _ => &mut candidate.registration_link,
            };
            if slot.as_deref().is_none_or(str::is_empty) {
                *slot = Some(text);
            }
        }
        candidate
    }

    /// Validates a candidate and canonicalises its date and time.
    ///
    /// Records without a title, date or time are dropped. A date or time
    /// that is present but unreadable is replaced by today / the default time.
    pub fn normalize(&self, candidate: &EventCandidate) -> Option<EventRecord> {
        if !candidate.is_complete() {
            log::debug!("Dropping incomplete candidate {:?}", candidate);
            return None;
        }
        let text = |f: &Option<String>| f.as_deref().map(str::trim).unwrap_or_default().to_string();
        Some(EventRecord {
            title: text(&candidate.title),
            date: self.normalize_date(candidate.date.as_deref().unwrap_or_default()),
            time: self.normalize_time(candidate.time.as_deref().unwrap_or_default()),
            venue: text(&candidate.venue),
            registration_link: text(&candidate.registration_link),
        })
    }

    pub fn normalize_map(&self, raw: &Map<String, Value>) -> Option<EventRecord> {
        self.normalize(&self.canonicalize(raw))
    }

    pub fn normalize_date(&self, raw: &str) -> NaiveDate {
        self.parse_date(raw).unwrap_or_else(|| {
            log::debug!("Unreadable date '{}', using {}", raw, self.today);
            self.today
        })
    }

    pub fn normalize_time(&self, raw: &str) -> NaiveTime {
        parse_time(raw).unwrap_or_else(|| {
            log::debug!("Unreadable time '{}', using default", raw);
            self.default_time
        })
    }

    fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        let s = raw.trim();
        // Two fields and no year: read as MM-DD of the current year.
        let fields: Vec<&str> = s.split(['-', '/']).collect();
        if fields.len() == 2 {
            let month = fields[0].trim().parse().ok()?;
            let day = fields[1].trim().parse().ok()?;
            return NaiveDate::from_ymd_opt(self.today.year(), month, day);
        }
        [DATE_FORMAT, "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
            .or_else(|| fuzzy::find_date(s, self.today.and_time(NaiveTime::MIN)))
    }
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let s = raw.trim();
    [TIME_FORMAT, "%H:%M:%S", "%I:%M %p", "%I:%M%p"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        .or_else(|| fuzzy::parse_time_string(s))
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
