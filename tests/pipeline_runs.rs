// End-to-end runs over small transcripts, with a fixed "now".
use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use quizscout::client::{RawRecord, RemoteExtractor};
use quizscout::model::{EventRecord, RuleAnalyzer, segment};
use quizscout::pipeline::{Pipeline, PipelineOptions};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 4, 21)
        .unwrap()
        .and_hms_opt(14, 0, 0)
        .unwrap()
}

fn pipeline() -> Pipeline {
    Pipeline::new(Arc::new(RuleAnalyzer))
}

#[test]
fn test_announcement_with_venue_and_registration_link() {
    let transcript =
        "21/04/2025, 13:30 - Alice: Quiz Nite register now forms.gle/abc venue: XYZ Hall";
    let report = pipeline().run_local(transcript, now());

    assert_eq!(report.messages, 1);
    assert_eq!(
        report.local_events,
        vec![EventRecord {
            title: "Quiz Nite".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 4, 21).unwrap(),
            time: NaiveTime::from_hms_opt(13, 30, 0).unwrap(),
            venue: "XYZ Hall".to_string(),
            registration_link: "https://forms.gle/abc".to_string(),
        }]
    );
}

#[test]
fn test_stale_message_is_dropped_with_its_continuation_lines() {
    let transcript = "\
01/03/2025, 10:00 - Bob: Quiz Nite register now forms.gle/old venue: Old Hall
More details: prizes worth Rs. 5000
20/04/2025, 09:15 - Carol: see you all tomorrow";
    let messages = segment(transcript, now(), 30);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].body, "see you all tomorrow");

    let report = pipeline().run_local(transcript, now());
    assert!(report.local_events.is_empty());
}

#[test]
fn test_media_placeholder_yields_no_message() {
    let transcript = "21/04/2025, 10:00 - Dave: <Media omitted>";
    assert!(segment(transcript, now(), 30).is_empty());
    assert_eq!(pipeline().run_local(transcript, now()).messages, 0);
}

#[test]
fn test_date_without_time_yields_no_record() {
    let transcript =
        "21/04/2025, 10:00 - Bob: Quiz at XYZ Hall on 25th April, register at forms.gle/xyz";
    let report = pipeline().run_local(transcript, now());
    assert_eq!(report.announcements.len(), 1);
    assert_eq!(report.announcements[0].local, None);
    assert!(report.local_events.is_empty());
}

#[test]
fn test_missing_venue_is_an_empty_string() {
    let transcript = "21/04/2025, 13:30 - Alice: quiz nite register now forms.gle/abc";
    let report = pipeline().run_local(transcript, now());
    assert_eq!(report.local_events.len(), 1);
    assert_eq!(report.local_events[0].venue, "");
    assert_eq!(report.local_events[0].registration_link, "https://forms.gle/abc");
}

#[test]
fn test_time_of_day_without_a_date_is_kept() {
    let transcript = "21/04/2025, 13:30 - Alice: Quiz Nite at 6 pm, register now forms.gle/abc venue: XYZ Hall";
    let report = pipeline().run_local(transcript, now());
    assert_eq!(report.announcements.len(), 1);
    assert_eq!(
        report.local_events,
        vec![EventRecord {
            title: "Quiz Nite".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 4, 21).unwrap(),
            time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            venue: "XYZ Hall".to_string(),
            registration_link: "https://forms.gle/abc".to_string(),
        }]
    );
}

#[test]
fn test_modal_may_does_not_replace_the_announced_date() {
    let transcript = "21/04/2025, 13:30 - Alice: Teams of 2 may register for the Literary Quiz on 10th May 2025 at 5 pm";
    let report = pipeline().run_local(transcript, now());
    assert_eq!(
        report.local_events,
        vec![EventRecord {
            title: "Literary Quiz".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
            time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            venue: String::new(),
            registration_link: String::new(),
        }]
    );
}

#[test]
fn test_one_message_per_fresh_timestamp_line() {
    let mut transcript = String::new();
    for day in 1..=20u32 {
        transcript.push_str(&format!(
            "{:02}/04/2025, 1{}:00 - User{}: message {}\n",
            day,
            day % 10,
            day,
            day
        ));
        if day % 3 == 0 {
            transcript.push_str("a continuation line\n\n");
        }
    }
    transcript.push_str("05/02/2025, 08:00 - Old: too old\nstill too old\n");
    transcript.push_str("21/04/2025, 11:00 - Eve: This message was deleted\n");

    let messages = segment(&transcript, now(), 30);
    assert_eq!(messages.len(), 20);
    assert!(messages.iter().all(|m| !m.body.contains("too old")));
    assert_eq!(messages[2].body, "message 3\na continuation line");
}

/// Canned remote results keyed by a substring of the message.
#[derive(Debug, Default)]
struct FakeRemote {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl RemoteExtractor for FakeRemote {
    async fn extract(&self, text: &str, today: NaiveDate) -> Result<Vec<RawRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(today, now().date());
        if text.contains("Slow") {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        if text.contains("Broken") {
            return Err(anyhow!("503 Service Unavailable"));
        }
        let value = json!([{
            "event_name": "Remote Quiz",
            "date": "04-26",
            "time": "6:00 PM",
            "location": "Main Hall",
            "url": "https://forms.gle/remote",
            "organiser": "ignored"
        }]);
        Ok(value
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_object().cloned())
            .collect())
    }
}

const MIXED: &str = "\
21/04/2025, 10:00 - Alice: Quiz Nite register now forms.gle/abc venue: XYZ Hall
21/04/2025, 10:05 - Bob: Broken Quiz register now forms.gle/def venue: Old Hall
21/04/2025, 10:10 - Carol: Slow Quiz register now forms.gle/ghi venue: New Hall
21/04/2025, 10:15 - Dave: lunch anyone?";

#[tokio::test]
async fn test_remote_failures_do_not_abort_the_run() {
    let remote = Arc::new(FakeRemote::default());
    let report = pipeline()
        .with_remote(remote.clone())
        .with_options(PipelineOptions {
            remote_timeout: Duration::from_millis(200),
            ..PipelineOptions::default()
        })
        .run(MIXED, now())
        .await;

    assert_eq!(report.messages, 4);
    assert_eq!(report.announcements.len(), 3);
    assert_eq!(report.local_events.len(), 3);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.remote_failures, 2);
    assert_eq!(
        report.remote_events,
        vec![EventRecord {
            title: "Remote Quiz".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 4, 26).unwrap(),
            time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            venue: "Main Hall".to_string(),
            registration_link: "https://forms.gle/remote".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_selective_remote_only_sees_locally_found_events() {
    let transcript = "\
21/04/2025, 10:00 - Alice: Quiz Nite register now forms.gle/abc venue: XYZ Hall
21/04/2025, 10:05 - Bob: Quiz at XYZ Hall on 25th April, register at forms.gle/xyz";
    let remote = Arc::new(FakeRemote::default());
    let report = pipeline()
        .with_remote(remote.clone())
        .with_options(PipelineOptions {
            selective: true,
            ..PipelineOptions::default()
        })
        .run(transcript, now())
        .await;

    assert_eq!(report.announcements.len(), 2);
    assert_eq!(report.local_events.len(), 1);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.remote_events.len(), 1);
}
