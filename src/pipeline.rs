// File: ./src/pipeline.rs
// Run orchestration: transcript -> messages -> announcements -> records.
//
// A run captures a single `now` and hands it to every stage. Local extraction
// is synchronous; remote extraction fans out with a bounded number of
// requests in flight and a per-message timeout.
use crate::client::{RawRecord, RemoteExtractor};
use crate::config::Config;
use crate::model::message::DEFAULT_RETENTION_DAYS;
use crate::model::{
    EventRecord, Message, Normalizer, TextAnalyzer, assemble_local, is_quiz_announcement, segment,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub retention_days: i64,
    pub default_time: NaiveTime,
    /// Ignore announcements posted before this date.
    pub since: Option<NaiveDate>,
    pub remote_timeout: Duration,
    pub remote_concurrency: usize,
    /// Only send messages to the remote extractor when local extraction found an event.
    pub selective: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            default_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            since: None,
            remote_timeout: Duration::from_secs(30),
            remote_concurrency: 4,
            selective: false,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retention_days: config.retention_days,
            default_time: config.fallback_time(),
            since: None,
            remote_timeout: Duration::from_secs(config.remote.timeout_secs.max(1)),
            remote_concurrency: config.remote.concurrency.max(1),
            selective: config.remote.selective,
        }
    }
}

/// A classified message and what the local extractor made of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub message: Message,
    pub local: Option<EventRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Messages left after segmentation (stale and placeholder messages excluded).
    pub messages: usize,
    pub announcements: Vec<Announcement>,
    pub local_events: Vec<EventRecord>,
    pub remote_events: Vec<EventRecord>,
    /// Messages for which the remote extractor failed or timed out.
    pub remote_failures: usize,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    analyzer: Arc<dyn TextAnalyzer>,
    remote: Option<Arc<dyn RemoteExtractor>>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(analyzer: Arc<dyn TextAnalyzer>) -> Self {
        Self {
            analyzer,
            remote: None,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteExtractor>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn normalizer(&self, now: NaiveDateTime) -> Normalizer {
        Normalizer::new(now).with_default_time(self.options.default_time)
    }

    /// Segments, classifies and runs the local extractor. No IO.
    pub fn run_local(&self, transcript: &str, now: NaiveDateTime) -> RunReport {
        let messages = segment(transcript, now, self.options.retention_days);
        let normalizer = self.normalizer(now);

        let announcements: Vec<Announcement> = messages
            .iter()
            .filter(|m| {
                self.options
                    .since
                    .is_none_or(|since| m.timestamp.date() >= since)
            })
            .filter(|m| is_quiz_announcement(m, self.analyzer.as_ref()))
            .map(|m| Announcement {
                local: assemble_local(m, self.analyzer.as_ref(), now)
                    .and_then(|c| normalizer.normalize(&c)),
                message: m.clone(),
            })
            .collect();

        let local_events: Vec<EventRecord> = announcements
            .iter()
            .filter_map(|a| a.local.clone())
            .collect();
        log::info!(
            "{} messages, {} announcements, {} local events",
            messages.len(),
            announcements.len(),
            local_events.len()
        );

        RunReport {
            messages: messages.len(),
            announcements,
            local_events,
            remote_events: Vec::new(),
            remote_failures: 0,
        }
    }

    /// Full run: local extraction, then the remote extractor when one is configured.
    pub async fn run(&self, transcript: &str, now: NaiveDateTime) -> RunReport {
        let mut report = self.run_local(transcript, now);
        let Some(remote) = self.remote.clone() else {
            return report;
        };

        let selected: Vec<&Message> = report
            .announcements
            .iter()
            .filter(|a| !self.options.selective || a.local.is_some())
            .map(|a| &a.message)
            .collect();
        let (events, failures) = self.extract_remote(remote, &selected, now).await;
        log::info!(
            "{} remote events from {} messages ({} failed)",
            events.len(),
            selected.len(),
            failures
        );
        report.remote_events = events;
        report.remote_failures = failures;
        report
    }

    async fn extract_remote(
        &self,
        remote: Arc<dyn RemoteExtractor>,
        messages: &[&Message],
        now: NaiveDateTime,
    ) -> (Vec<EventRecord>, usize) {
        let today = now.date();
        let limit = self.options.remote_timeout;

        let futures = messages.iter().enumerate().map(|(idx, msg)| {
            let remote = remote.clone();
            let body = msg.body.clone();
            let posted = msg.timestamp;
            async move {
                let outcome = match tokio::time::timeout(limit, remote.extract(&body, today)).await
                {
                    Ok(Ok(records)) => Some(records),
                    Ok(Err(e)) => {
                        log::warn!("Remote extraction failed for message at {}: {:#}", posted, e);
                        None
                    }
                    Err(_) => {
                        log::warn!(
                            "Remote extraction timed out after {:?} for message at {}",
                            limit,
                            posted
                        );
                        None
                    }
                };
                (idx, outcome)
            }
        });

        let mut results: Vec<(usize, Option<Vec<RawRecord>>)> = stream::iter(futures)
            .buffer_unordered(self.options.remote_concurrency.max(1))
            .collect()
            .await;
        results.sort_by_key(|(idx, _)| *idx);

        let normalizer = self.normalizer(now);
        let mut events = Vec::new();
        let mut failures = 0;
        for (_, outcome) in results {
            match outcome {
                Some(records) => {
                    events.extend(records.iter().filter_map(|r| normalizer.normalize_map(r)))
                }
                None => failures += 1,
            }
        }
        (events, failures)
    }
}
