// Saved events exported to an .ics file, the way `quizscout export` does it.
use chrono::{NaiveDate, NaiveDateTime};
use quizscout::calendar::{self, ExportOptions, ExportSummary, IcsCalendar};
use quizscout::context::{AppContext, TestContext};
use quizscout::model::{Normalizer, RuleAnalyzer};
use quizscout::pipeline::Pipeline;
use quizscout::storage::LocalStorage;
use std::fs;
use std::sync::Arc;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 4, 21)
        .unwrap()
        .and_hms_opt(14, 0, 0)
        .unwrap()
}

const TRANSCRIPT: &str = "\
21/04/2025, 13:30 - Alice: Quiz Nite register now forms.gle/abc venue: XYZ Hall
21/04/2025, 13:45 - Bob: wow nice
21/04/2025, 13:50 - Carol: Trivia Quiz register here forms.gle/def venue: Main Hall";

#[test]
fn test_parse_save_and_export_twice() {
    let ctx = TestContext::new();
    let report = Pipeline::new(Arc::new(RuleAnalyzer)).run_local(TRANSCRIPT, now());
    assert_eq!(report.local_events.len(), 2);

    let events_path = LocalStorage::save_local_events(&ctx, &report.local_events).unwrap();
    let ics_path = ctx.get_data_dir().unwrap().join("quizzes.ics");

    let export = || {
        let raw = LocalStorage::load_raw(&events_path).unwrap();
        let (records, skipped) = calendar::records_for_export(&raw, &Normalizer::new(now()));
        assert_eq!(skipped, 0);
        let mut sink = IcsCalendar::open(&ics_path).unwrap();
        calendar::export(&mut sink, &records, &ExportOptions::default()).unwrap()
    };

    assert_eq!(export(), ExportSummary { added: 2, duplicates: 0 });
    assert_eq!(export(), ExportSummary { added: 0, duplicates: 2 });

    let ics = fs::read_to_string(&ics_path).unwrap();
    assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
    assert!(ics.contains("SUMMARY:Quiz Nite"));
    assert!(ics.contains("LOCATION:XYZ Hall"));
    assert!(ics.contains("DTSTART:20250421T133000"));
    assert!(ics.contains("DTEND:20250421T143000"));
}

#[test]
fn test_export_accepts_hand_edited_files() {
    let ctx = TestContext::new();
    let events_path = ctx.get_data_dir().unwrap().join("edited.json");
    fs::write(
        &events_path,
        r#"[
  {"event": "राजनीति मंथन Quiz", "date": "2025-05-02", "time": "10:00 AM", "place": "Seminar Room"},
  {"title": "Broken date", "date": "someday", "time": "10:00"},
  {"title": "", "date": "2025-05-03", "time": "11:00"}
]"#,
    )
    .unwrap();

    let raw = LocalStorage::load_raw(&events_path).unwrap();
    let (records, skipped) = calendar::records_for_export(&raw, &Normalizer::new(now()));
    assert_eq!(skipped, 2);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "राजनीति मंथन Quiz");
    assert_eq!(records[0].time_string(), "10:00");

    let ics_path = ctx.get_data_dir().unwrap().join("out.ics");
    let mut sink = IcsCalendar::open(&ics_path).unwrap();
    let options = ExportOptions {
        force: true,
        ..ExportOptions::default()
    };
    let summary = calendar::export(&mut sink, &records, &options).unwrap();
    assert_eq!(summary.added, 1);
    assert!(fs::read_to_string(&ics_path).unwrap().contains("Seminar Room"));
}
