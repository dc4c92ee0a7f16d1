// File: src/model/message.rs
// Splits an exported chat transcript into timestamped messages.
use chrono::{Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// `DD/MM/YYYY, HH:MM - rest`
static TIMESTAMP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4}),\s(\d{1,2}):(\d{2})\s-\s(.*)$").unwrap()
});

/// Bodies containing any of these are export artefacts, not real messages.
const PLACEHOLDER_MARKERS: &[&str] = &["<media omitted>", "this message was deleted"];

pub const DEFAULT_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Time of the first line of the message.
    pub timestamp: NaiveDateTime,
    pub sender: Option<String>,
    pub body: String,
}

impl Message {
    pub fn is_placeholder(&self) -> bool {
        let lower = self.body.to_lowercase();
        PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m))
    }
}

/// A recognised message-starting line, borrowing from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampLine<'a> {
    pub timestamp: NaiveDateTime,
    /// Everything after the `" - "` separator, sender included.
    pub rest: &'a str,
}

impl<'a> TimestampLine<'a> {
    /// Splits `"Alice: hello"` into the sender and the body.
    ///
    /// System lines ("Messages and calls are end-to-end encrypted") have no
    /// sender and are returned whole.
    pub fn split_sender(&self) -> (Option<&'a str>, &'a str) {
        match self.rest.split_once(": ") {
            Some((sender, body)) if !sender.is_empty() && !sender.contains("://") => {
                (Some(sender.trim()), body)
            }
            _ => (None, self.rest),
        }
    }
}

/// Recognises a chat export timestamp prefix. Malformed or impossible
/// dates are plain text, never an error.
pub fn parse_timestamp_line(line: &str) -> Option<TimestampLine<'_>> {
    let caps = TIMESTAMP_LINE.captures(line.trim_end_matches('\r'))?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let date = NaiveDate::from_ymd_opt(field(3)? as i32, field(2)?, field(1)?)?;
    let timestamp = date.and_hms_opt(field(4)?, field(5)?, 0)?;
    let rest = caps.get(6)?.as_str();
    Some(TimestampLine { timestamp, rest })
}

#[derive(Debug, Default)]
enum SegmenterState {
    #[default]
    Idle,
    Accumulating(Message),
}

/// Line-driven state machine that groups continuation lines under the
/// timestamp line that precedes them.
///
/// Messages older than the retention window are skipped together with
/// their continuation lines.
#[derive(Debug)]
pub struct Segmenter {
    cutoff: NaiveDateTime,
    state: SegmenterState,
    stale_dropped: usize,
}

impl Segmenter {
    pub fn new(now: NaiveDateTime, retention_days: i64) -> Self {
        Self {
            cutoff: now - Duration::days(retention_days),
            state: SegmenterState::Idle,
            stale_dropped: 0,
        }
    }

    /// Feeds one line. Returns the previous message once a new timestamp line finalizes it.
    pub fn feed(&mut self, line: &str) -> Option<Message> {
        let Some(ts) = parse_timestamp_line(line) else {
            if let SegmenterState::Accumulating(msg) = &mut self.state {
                let line = line.trim_end_matches('\r');
                if !line.trim().is_empty() {
                    if !msg.body.is_empty() {
                        msg.body.push('\n');
                    }
                    msg.body.push_str(line);
                }
            }
            return None;
        };

        let finished = self.take_current();
        if ts.timestamp < self.cutoff {
            log::debug!("Skipping stale message from {}", ts.timestamp);
            self.stale_dropped += 1;
            self.state = SegmenterState::Idle;
        } else {
            let (sender, body) = ts.split_sender();
            self.state = SegmenterState::Accumulating(Message {
                timestamp: ts.timestamp,
                sender: sender.map(str::to_string),
                body: body.trim_end().to_string(),
            });
        }
        finished
    }

    /// Ends the input, returning the message still being accumulated.
    pub fn finish(&mut self) -> Option<Message> {
        self.take_current()
    }

    pub fn stale_dropped(&self) -> usize {
        self.stale_dropped
    }

    fn take_current(&mut self) -> Option<Message> {
        match std::mem::take(&mut self.state) {
            SegmenterState::Accumulating(msg) => Some(msg),
            SegmenterState::Idle => None,
        }
    }
}

/// Segments a whole transcript and drops media / deleted-message placeholders.
pub fn segment(transcript: &str, now: NaiveDateTime, retention_days: i64) -> Vec<Message> {
    let mut segmenter = Segmenter::new(now, retention_days);
    let mut messages = Vec::new();
    for line in transcript.lines() {
        messages.extend(segmenter.feed(line));
    }
    messages.extend(segmenter.finish());

    let total = messages.len();
    messages.retain(|m| !m.is_placeholder());
    log::debug!(
        "Segmented {} messages ({} stale, {} placeholders)",
        total,
        segmenter.stale_dropped(),
        total - messages.len()
    );
    messages
}
