// File: src/model/fuzzy.rs
// Lenient date / time recognition for free-form announcement text.
//
// Every function here returns `Option`; nothing in this module fails loudly.
// Missing pieces are filled from the reference `now` the caller passes in
// (current year for year-less dates, today for time-only mentions).

use crate::model::lexicon::month_number;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::cmp::Reverse;
use std::ops::Range;

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})\b").unwrap());

static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{2,4})\b").unwrap());

// A year-less "7/10" is usually a score; it only counts after a word that introduces a date.
static NUMERIC_DATE_NO_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:on|by|till|until|before|from|dated|date|deadline)(?:\s*:\s*|\s+)(\d{1,2})/(\d{1,2})\b",
    )
    .unwrap()
});

// Groups: day, ordinal, "of", month, year.
static DAY_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)?\s*(of\s+)?([a-z]{3,9})\.?,?(?:\s+(\d{4}))?\b")
        .unwrap()
});

// Groups: month, day, ordinal, year.
static MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2})(st|nd|rd|th)?\b,?(?:\s+(\d{4})\b)?").unwrap()
});

static RELATIVE_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(day after tomorrow|today|tonight|tomorrow|tmrw|tmr)\b").unwrap()
});

static WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(this|next|coming)\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
    )
    .unwrap()
});

static TIME_AMPM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:[:.](\d{2}))?\s*([ap])\.?\s?m\b\.?").unwrap()
});

static TIME_24H: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").unwrap());

static TIME_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(noon|midday|midnight)\b").unwrap());

/// A date with an optional time of day, as recovered from a text fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMoment {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    /// False when the date was defaulted to "today" because only a time was found.
    pub explicit_date: bool,
}

impl FuzzyMoment {
    /// Whether this moment lies strictly after `now`.
    ///
    /// A date without a time counts as the whole day starting at midnight,
    /// so "today" is never in the future.
    pub fn is_after(&self, now: NaiveDateTime) -> bool {
        let t = self.time.unwrap_or(NaiveTime::MIN);
        self.date.and_time(t) > now
    }

    pub fn as_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(NaiveTime::MIN))
    }
}

/// Parses the first date-like and the first time-like mention in `text`.
pub fn parse_fuzzy(text: &str, now: NaiveDateTime) -> Option<FuzzyMoment> {
    let date = find_date(text, now);
    let time = find_time(text);
    match (date, time) {
        (None, None) => None,
        (Some(date), time) => Some(FuzzyMoment {
            date,
            time,
            explicit_date: true,
        }),
        (None, Some(t)) => Some(FuzzyMoment {
            date: now.date(),
            time: Some(t),
            explicit_date: false,
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Time,
}

/// Byte ranges of every date-like and time-like mention, left to right, without overlaps.
pub fn temporal_spans(text: &str) -> Vec<(Range<usize>, TemporalKind)> {
    let mut spans = Vec::new();
    for re in [&*ISO_DATE, &*NUMERIC_DATE, &*RELATIVE_DAY, &*WEEKDAY] {
        spans.extend(re.find_iter(text).map(|m| (m.range(), TemporalKind::Date)));
    }
    spans.extend(
        NUMERIC_DATE_NO_YEAR
            .captures_iter(text)
            .filter_map(|c| Some((c.get(1)?.start()..c.get(2)?.end(), TemporalKind::Date))),
    );
    spans.extend(
        DAY_MONTH
            .captures_iter(text)
            .filter(|c| day_month(c).is_some())
            .chain(MONTH_DAY.captures_iter(text).filter(|c| month_day(c).is_some()))
            .filter_map(|c| c.get(0))
            .map(|m| (m.range(), TemporalKind::Date)),
    );
    for re in [&*TIME_AMPM, &*TIME_24H, &*TIME_WORD] {
        spans.extend(re.find_iter(text).map(|m| (m.range(), TemporalKind::Time)));
    }

    spans.sort_by_key(|(r, _)| (r.start, Reverse(r.end)));
    let mut kept: Vec<(Range<usize>, TemporalKind)> = Vec::new();
    for (range, kind) in spans {
        if let Some((last, _)) = kept.last()
            && range.start < last.end
        {
            continue;
        }
        kept.push((range, kind));
    }
    kept
}

/// Finds the first recognisable calendar date in `text`.
pub fn find_date(text: &str, now: NaiveDateTime) -> Option<NaiveDate> {
    let year = now.year();
    let today = now.date();

    if let Some(d) = ISO_DATE.captures_iter(text).find_map(|c| {
        NaiveDate::from_ymd_opt(num(&c, 1)? as i32, num(&c, 2)?, num(&c, 3)?)
    }) {
        return Some(d);
    }
    if let Some(d) = NUMERIC_DATE
        .captures_iter(text)
        .find_map(|c| day_first(num(&c, 1)?, num(&c, 2)?, full_year(num(&c, 3)?)))
    {
        return Some(d);
    }
    if let Some(d) = DAY_MONTH.captures_iter(text).find_map(|c| {
        let month = day_month(&c)?;
        let y = c.get(5).map_or(Some(year), |m| m.as_str().parse().ok())?;
        NaiveDate::from_ymd_opt(y, month, num(&c, 1)?)
    }) {
        return Some(d);
    }
    if let Some(d) = MONTH_DAY.captures_iter(text).find_map(|c| {
        let month = month_day(&c)?;
        let y = c.get(4).map_or(Some(year), |m| m.as_str().parse().ok())?;
        NaiveDate::from_ymd_opt(y, month, num(&c, 2)?)
    }) {
        return Some(d);
    }
    if let Some(d) = NUMERIC_DATE_NO_YEAR
        .captures_iter(text)
        .find_map(|c| day_first(num(&c, 1)?, num(&c, 2)?, year))
    {
        return Some(d);
    }
    if let Some(c) = RELATIVE_DAY.captures(text) {
        let offset = match c[1].to_lowercase().as_str() {
            "today" | "tonight" => 0,
            "day after tomorrow" => 2,
            _ => 1,
        };
        return Some(today + Duration::days(offset));
    }
    if let Some(c) = WEEKDAY.captures(text) {
        let target = parse_weekday(&c[2])?;
        let strictly_after = c
            .get(1)
            .is_some_and(|m| m.as_str().eq_ignore_ascii_case("next"));
        return Some(upcoming_weekday(today, target, !strictly_after));
    }
    None
}

/// Finds the first recognisable time of day in `text`.
pub fn find_time(text: &str) -> Option<NaiveTime> {
    if let Some(t) = TIME_AMPM.captures_iter(text).find_map(|c| {
        let h = num(&c, 1)?;
        let m = c.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        let is_pm = c[3].eq_ignore_ascii_case("p");
        twelve_hour(h, m, is_pm)
    }) {
        return Some(t);
    }
    if let Some(t) = TIME_24H
        .captures_iter(text)
        .find_map(|c| NaiveTime::from_hms_opt(num(&c, 1)?, num(&c, 2)?, 0))
    {
        return Some(t);
    }
    TIME_WORD.captures(text).map(|c| {
        if c[1].eq_ignore_ascii_case("midnight") {
            NaiveTime::MIN
        } else {
            NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
        }
    })
}

/// Parses a single compact time token: "5pm", "5:30pm", "17:30".
pub fn parse_time_string(s: &str) -> Option<NaiveTime> {
    let lower = s.trim().to_lowercase().replace('.', "");
    let lower = lower.replace(' ', "");

    let parse_12h = |s: &str, is_pm: bool| -> Option<NaiveTime> {
        let (h, m) = if let Some((h_str, m_str)) = s.split_once(':') {
            (h_str.parse::<u32>().ok()?, m_str.parse::<u32>().ok()?)
        } else {
            (s.parse::<u32>().ok()?, 0)
        };
        twelve_hour(h, m, is_pm)
    };

    if let Some(stripped) = lower.strip_suffix("am") {
        return parse_12h(stripped, false);
    }
    if let Some(stripped) = lower.strip_suffix("pm") {
        return parse_12h(stripped, true);
    }

    if let Some((h_str, m_str)) = lower.split_once(':') {
        let h = h_str.parse::<u32>().ok()?;
        let m = m_str.parse::<u32>().ok()?;
        return NaiveTime::from_hms_opt(h, m, 0);
    }

    None
}

fn twelve_hour(h: u32, m: u32, is_pm: bool) -> Option<NaiveTime> {
    if !(1..=12).contains(&h) || m > 59 {
        return None;
    }
    let h_24 = if h == 12 {
        if is_pm { 12 } else { 0 }
    } else if is_pm {
        h + 12
    } else {
        h
    };
    NaiveTime::from_hms_opt(h_24, m, 0)
}

/// Numeric dates are read day-first, the way chat exports in this domain write them.
/// When that is impossible (e.g. `04/25/2025`) the month-first reading is tried.
fn day_first(a: u32, b: u32, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, b, a).or_else(|| NaiveDate::from_ymd_opt(year, a, b))
}

fn day_month(c: &Captures<'_>) -> Option<u32> {
    let backed = c.get(2).is_some() || c.get(3).is_some() || c.get(5).is_some();
    textual_month(c.get(4)?.as_str(), backed)
}

fn month_day(c: &Captures<'_>) -> Option<u32> {
    let backed = c.get(3).is_some() || c.get(4).is_some();
    textual_month(c.get(1)?.as_str(), backed)
}

/// Lower-case "may" is the modal verb ("2 may register") unless an ordinal,
/// "of" or a year says otherwise.
fn textual_month(word: &str, backed: bool) -> Option<u32> {
    if word == "may" && !backed {
        return None;
    }
    month_number(word)
}

fn full_year(y: u32) -> i32 {
    if y < 100 { 2000 + y as i32 } else { y as i32 }
}

fn num(c: &Captures<'_>, idx: usize) -> Option<u32> {
    c.get(idx)?.as_str().parse().ok()
}

pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.to_lowercase().as_str() {
        "mo" | "mon" | "monday" => Some(Weekday::Mon),
        "tu" | "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "we" | "wed" | "wednesday" => Some(Weekday::Wed),
        "th" | "thu" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fr" | "fri" | "friday" => Some(Weekday::Fri),
        "sa" | "sat" | "saturday" => Some(Weekday::Sat),
        "su" | "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// The next `target` weekday on or after `from` (strictly after when `include_today` is false).
pub fn upcoming_weekday(from: NaiveDate, target: Weekday, include_today: bool) -> NaiveDate {
    let mut d = if include_today {
        from
    } else {
        from + Duration::days(1)
    };
    while d.weekday() != target {
        d += Duration::days(1);
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        // A Wednesday.
        NaiveDate::from_ymd_opt(2025, 4, 16)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_textual_dates_with_and_without_year() {
        let d = find_date("Join us on 21st April 2025!", now()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 4, 21).unwrap());

        let d = find_date("happening April 26th", now()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 4, 26).unwrap());

        // "5 members" must not be read as a month.
        assert_eq!(find_date("only 5 members per team", now()), None);
    }

    #[test]
    fn test_modal_may_is_not_a_month() {
        let text = "Teams of 2 may register for the Literary Quiz on 10th May 2025 at 5 pm";
        assert_eq!(
            find_date(text, now()),
            NaiveDate::from_ymd_opt(2025, 5, 10)
        );
        let dates: Vec<&str> = temporal_spans(text)
            .into_iter()
            .filter(|(_, k)| *k == TemporalKind::Date)
            .map(|(r, _)| &text[r])
            .collect();
        assert_eq!(dates, vec!["10th May 2025"]);

        assert_eq!(find_date("2 may join late", now()), None);
        assert_eq!(find_date("on 2 May", now()), NaiveDate::from_ymd_opt(2025, 5, 2));
        assert_eq!(find_date("the 2nd of may", now()), NaiveDate::from_ymd_opt(2025, 5, 2));
        assert_eq!(find_date("may 3rd", now()), NaiveDate::from_ymd_opt(2025, 5, 3));
    }

    #[test]
    fn test_bare_fraction_is_a_score_not_a_date() {
        assert_eq!(find_date("I scored 7/10 in the last round", now()), None);
        assert!(temporal_spans("I scored 7/10").is_empty());

        assert_eq!(find_date("register by 25/4", now()), NaiveDate::from_ymd_opt(2025, 4, 25));
        let text = "Deadline: 25/4, hurry";
        let spans = temporal_spans(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(&text[spans[0].0.clone()], "25/4");
    }

    #[test]
    fn test_numeric_dates_are_day_first() {
        let d = find_date("on 05/06/2025", now()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 6, 5).unwrap());

        // Impossible day-first reading falls back to month-first.
        let d = find_date("on 04/25/2025", now()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 4, 25).unwrap());

        let d = find_date("2025-12-01", now()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
    }

    #[test]
    fn test_relative_days_and_weekdays() {
        assert_eq!(
            find_date("quiz tomorrow", now()),
            Some(NaiveDate::from_ymd_opt(2025, 4, 17).unwrap())
        );
        assert_eq!(
            find_date("this Saturday", now()),
            Some(NaiveDate::from_ymd_opt(2025, 4, 19).unwrap())
        );
        // "next" on the same weekday skips today.
        assert_eq!(
            find_date("next wednesday", now()),
            Some(NaiveDate::from_ymd_opt(2025, 4, 23).unwrap())
        );
    }

    #[test]
    fn test_times() {
        assert_eq!(find_time("at 5 pm sharp"), NaiveTime::from_hms_opt(17, 0, 0));
        assert_eq!(find_time("from 10:30 a.m."), NaiveTime::from_hms_opt(10, 30, 0));
        assert_eq!(find_time("reporting 13:45"), NaiveTime::from_hms_opt(13, 45, 0));
        assert_eq!(find_time("12am"), NaiveTime::from_hms_opt(0, 0, 0));
        assert_eq!(find_time("at noon"), NaiveTime::from_hms_opt(12, 0, 0));
        assert_eq!(find_time("5 amazing prizes"), None);
        assert_eq!(parse_time_string("5:30PM"), NaiveTime::from_hms_opt(17, 30, 0));
        assert_eq!(parse_time_string("13 pm"), None);
    }

    #[test]
    fn test_temporal_spans_do_not_overlap() {
        let text = "Quiz on 21st April 2025 at 5 pm, reporting 16:30. 3 members per team";
        let spans = temporal_spans(text);
        let found: Vec<(&str, TemporalKind)> =
            spans.iter().map(|(r, k)| (&text[r.clone()], *k)).collect();
        assert_eq!(
            found,
            vec![
                ("21st April 2025", TemporalKind::Date),
                ("5 pm", TemporalKind::Time),
                ("16:30", TemporalKind::Time),
            ]
        );
    }

    #[test]
    fn test_parse_fuzzy_defaults_date_to_today_for_time_only() {
        let m = parse_fuzzy("at 6 pm", now()).unwrap();
        assert_eq!(m.date, now().date());
        assert!(!m.explicit_date);
        assert!(m.is_after(now()));

        let m = parse_fuzzy("today", now()).unwrap();
        assert!(!m.is_after(now()));
        assert_eq!(parse_fuzzy("no dates here", now()), None);
    }
}
