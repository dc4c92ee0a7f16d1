// File: ./src/calendar.rs
// Calendar export. Events are appended to an iCalendar file as VEVENTs,
// skipping ones that already exist with the same title and start time.
use crate::client::RawRecord;
use crate::model::{EventRecord, Normalizer};
use crate::model::event::DATE_FORMAT;
use crate::model::normalize::parse_time;
use crate::storage::LocalStorage;
use anyhow::{Context, Result, anyhow};
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use icalendar::{Calendar, CalendarComponent, Component, Event, EventLike};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const ICS_DATETIME: &str = "%Y%m%dT%H%M%S";

/// Where exported events go.
pub trait CalendarSink {
    /// An event with the same trimmed title starts within `window` of `start`.
    fn contains(&self, title: &str, start: NaiveDateTime, window: Duration) -> bool;
    fn add(&mut self, record: &EventRecord, duration: Duration) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub duration: Duration,
    pub duplicate_window: Duration,
    /// Add every record without the duplicate check.
    pub force: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            duration: Duration::minutes(60),
            duplicate_window: Duration::minutes(1),
            force: false,
        }
    }
}

impl ExportOptions {
    pub fn from_config(cfg: &crate::config::CalendarConfig, force: bool) -> Self {
        Self {
            duration: Duration::minutes(i64::from(cfg.event_duration_mins.max(1))),
            duplicate_window: Duration::minutes(i64::from(cfg.duplicate_window_mins.max(1))),
            force,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub added: usize,
    pub duplicates: usize,
}

/// Adds `records` to `sink` in order and flushes once at the end.
pub fn export(
    sink: &mut dyn CalendarSink,
    records: &[EventRecord],
    options: &ExportOptions,
) -> Result<ExportSummary> {
    let mut summary = ExportSummary::default();
    for record in records {
        if !options.force && sink.contains(&record.title, record.start(), options.duplicate_window) {
            log::info!("Skipping duplicate event: {} at {}", record.title.trim(), record.start());
            summary.duplicates += 1;
            continue;
        }
        sink.add(record, options.duration)?;
        summary.added += 1;
    }
    sink.flush()?;
    Ok(summary)
}

/// Turns loosely shaped records into exportable ones.
///
/// Date and time must be readable as `YYYY-MM-DD` and a clock time; records
/// that are not are logged and skipped. The second value is the skip count.
pub fn records_for_export(raw: &[RawRecord], normalizer: &Normalizer) -> (Vec<EventRecord>, usize) {
    let mut skipped = 0;
    let records = raw
        .iter()
        .filter_map(|map| {
            let candidate = normalizer.canonicalize(map);
            let date_ok = candidate
                .date
                .as_deref()
                .is_some_and(|d| NaiveDate::parse_from_str(d.trim(), DATE_FORMAT).is_ok());
            let time_ok = candidate.time.as_deref().and_then(parse_time).is_some();
            let record = if date_ok && time_ok {
                normalizer.normalize(&candidate)
            } else {
                None
            };
            if record.is_none() {
                log::warn!(
                    "Skipping event {:?}: missing title or unreadable date/time",
                    candidate.title.as_deref().unwrap_or_default()
                );
                skipped += 1;
            }
            record
        })
        .collect();
    (records, skipped)
}

/// Title and start of an event already in the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Existing {
    title: String,
    start: NaiveDateTime,
}

/// An `.ics` file on disk. Existing components are kept as they are.
#[derive(Debug)]
pub struct IcsCalendar {
    path: PathBuf,
    calendar: Calendar,
    existing: Vec<Existing>,
    dirty: bool,
}

impl IcsCalendar {
    /// Opens `path`, or starts an empty calendar when the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let calendar = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read calendar {:?}", path))?;
            if raw.trim().is_empty() {
                Calendar::new()
            } else {
                raw.parse::<Calendar>()
                    .map_err(|e| anyhow!("Failed to parse calendar {:?}: {}", path, e))?
            }
        } else {
            Calendar::new()
        };

        let existing = calendar
            .components
            .iter()
            .filter_map(|c| match c {
                CalendarComponent::Event(e) => Some(e),
                _ => None,
            })
            .filter_map(|e| {
                let start = e
                    .properties()
                    .get("DTSTART")
                    .and_then(|p| parse_ics_datetime(p.value()))?;
                Some(Existing {
                    title: e.get_summary().unwrap_or_default().trim().to_string(),
                    start,
                })
            })
            .collect::<Vec<_>>();
        log::debug!("{} existing events in {:?}", existing.len(), path);

        Ok(Self {
            path: path.to_path_buf(),
            calendar,
            existing,
            dirty: false,
        })
    }

    pub fn len(&self) -> usize {
        self.existing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.existing.is_empty()
    }
}

impl CalendarSink for IcsCalendar {
    fn contains(&self, title: &str, start: NaiveDateTime, window: Duration) -> bool {
        let title = title.trim();
        self.existing
            .iter()
            .any(|e| e.title == title && e.start >= start && e.start < start + window)
    }

    fn add(&mut self, record: &EventRecord, duration: Duration) -> Result<()> {
        let start = record.start();
        let end = start + duration;

        let mut event = Event::new();
        event.uid(&Uuid::new_v4().to_string());
        event.summary(record.title.trim());
        event.timestamp(Utc::now());
        event.add_property("DTSTART", start.format(ICS_DATETIME).to_string());
        event.add_property("DTEND", end.format(ICS_DATETIME).to_string());
        if !record.venue.is_empty() {
            event.location(&record.venue);
        }
        let description = describe(record);
        if !description.is_empty() {
            event.description(&description);
        }
        self.calendar.push(event.done());

        self.existing.push(Existing {
            title: record.title.trim().to_string(),
            start,
        });
        self.dirty = true;
        log::debug!("Added event: {}", record);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let ics = self.calendar.to_string();
        LocalStorage::with_lock(&self.path, || {
            LocalStorage::atomic_write(&self.path, &ics)
                .with_context(|| format!("Failed to write calendar {:?}", self.path))
        })?;
        self.dirty = false;
        Ok(())
    }
}

fn describe(record: &EventRecord) -> String {
    let mut lines = Vec::new();
    if !record.venue.is_empty() {
        lines.push(format!("Venue: {}", record.venue));
    }
    if !record.registration_link.is_empty() {
        lines.push(format!("Registration Link: {}", record.registration_link));
    }
    lines.join("\n")
}

/// Floating, UTC (`Z`) and all-day DTSTART values.
fn parse_ics_datetime(val: &str) -> Option<NaiveDateTime> {
    let val = val.trim();
    if val.len() == 8 {
        return NaiveDate::parse_from_str(val, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0));
    }
    NaiveDateTime::parse_from_str(val.trim_end_matches('Z'), ICS_DATETIME).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AppContext, TestContext};
    use chrono::NaiveTime;
    use serde_json::json;

    fn record(title: &str, h: u32, m: u32) -> EventRecord {
        EventRecord {
            title: title.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 4, 26).unwrap(),
            time: NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            venue: "Hindu College".to_string(),
            registration_link: "https://forms.gle/abc".to_string(),
        }
    }

    #[test]
    fn test_parse_ics_datetime_forms() {
        let expected = NaiveDate::from_ymd_opt(2025, 4, 26)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        assert_eq!(parse_ics_datetime("20250426T180000"), Some(expected));
        assert_eq!(parse_ics_datetime("20250426T180000Z"), Some(expected));
        assert_eq!(
            parse_ics_datetime("20250426"),
            NaiveDate::from_ymd_opt(2025, 4, 26).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_ics_datetime("tomorrow"), None);
    }

    #[test]
    fn test_description_lists_venue_and_link() {
        assert_eq!(
            describe(&record("Quiz", 18, 0)),
            "Venue: Hindu College\nRegistration Link: https://forms.gle/abc"
        );
        let mut bare = record("Quiz", 18, 0);
        bare.venue.clear();
        bare.registration_link.clear();
        assert_eq!(describe(&bare), "");
    }

    #[test]
    fn test_export_skips_duplicates_across_runs() {
        let ctx = TestContext::new();
        let path = ctx.get_data_dir().unwrap().join("quiz.ics");
        let records = vec![record("Quiz Nite", 18, 0), record("  Quiz Nite ", 18, 0)];

        let mut cal = IcsCalendar::open(&path).unwrap();
        assert!(cal.is_empty());
        let summary = export(&mut cal, &records, &ExportOptions::default()).unwrap();
        assert_eq!(summary, ExportSummary { added: 1, duplicates: 1 });

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("BEGIN:VEVENT"));
        assert!(raw.contains("DTSTART:20250426T180000"));
        assert!(raw.contains("DTEND:20250426T190000"));

        // Reopened from disk: same event is a duplicate, a minute later is not.
        let mut cal = IcsCalendar::open(&path).unwrap();
        assert_eq!(cal.len(), 1);
        let later = vec![record("Quiz Nite", 18, 0), record("Quiz Nite", 18, 1)];
        let summary = export(&mut cal, &later, &ExportOptions::default()).unwrap();
        assert_eq!(summary, ExportSummary { added: 1, duplicates: 1 });

        let forced = ExportOptions {
            force: true,
            ..ExportOptions::default()
        };
        let summary = export(&mut cal, &later, &forced).unwrap();
        assert_eq!(summary, ExportSummary { added: 2, duplicates: 0 });
        assert_eq!(IcsCalendar::open(&path).unwrap().len(), 4);
    }

    #[test]
    fn test_records_for_export_requires_readable_date_and_time() {
        let now = NaiveDate::from_ymd_opt(2025, 4, 21)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let raw: Vec<RawRecord> = [
            json!({"name": "Quiz Nite", "date": "2025-04-26", "time": "18:00", "place": "XYZ Hall"}),
            json!({"title": "Later Quiz", "date": "next week", "time": "18:00"}),
            json!({"title": "No Time Quiz", "date": "2025-04-26"}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();

        let (records, skipped) = records_for_export(&raw, &Normalizer::new(now));
        assert_eq!(skipped, 2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Quiz Nite");
        assert_eq!(records[0].venue, "XYZ Hall");
    }
}
