// File: src/model/extract.rs
// Field extractors. Each field is an ordered list of strategies; the first
// strategy that yields a value wins and later ones are not consulted.
use crate::model::analyzer::{Annotation, Entity, EntityLabel, PartOfSpeech, Token};
use crate::model::fuzzy::{self, FuzzyMoment};
use crate::model::lexicon::{self, contains};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// What every strategy gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct ExtractInput<'a> {
    pub text: &'a str,
    pub annotation: &'a Annotation,
    /// Reference time for the whole run.
    pub now: NaiveDateTime,
    /// When the message was posted, if it came from a transcript.
    pub posted_at: Option<NaiveDateTime>,
}

pub struct Strategy<T> {
    pub name: &'static str,
    pub run: fn(&ExtractInput<'_>) -> Option<T>,
}

/// Runs `strategies` in order and returns the first hit.
pub fn first_match<T>(field: &str, strategies: &[Strategy<T>], input: &ExtractInput<'_>) -> Option<T> {
    for strategy in strategies {
        if let Some(value) = (strategy.run)(input) {
            log::debug!("{} found by '{}' strategy", field, strategy.name);
            return Some(value);
        }
    }
    log::debug!("{} not found", field);
    None
}

/// A date and/or a time of day. Either half may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl Schedule {
    fn from_parts(date: Option<NaiveDate>, time: Option<NaiveTime>) -> Option<Self> {
        (date.is_some() || time.is_some()).then_some(Self { date, time })
    }
}

// --- Date / time ---

pub const DATE_TIME_STRATEGIES: &[Strategy<Schedule>] = &[
    Strategy {
        name: "entities",
        run: schedule_from_entities,
    },
    Strategy {
        name: "patterns",
        run: schedule_from_patterns,
    },
    Strategy {
        name: "timestamp",
        run: schedule_from_timestamp,
    },
];

pub fn extract_schedule(input: &ExtractInput<'_>) -> Option<Schedule> {
    first_match("date/time", DATE_TIME_STRATEGIES, input)
}

/// Earliest future moment among the annotated DATE / TIME mentions.
/// Each date is paired with the closest time mention.
fn schedule_from_entities(input: &ExtractInput<'_>) -> Option<Schedule> {
    let dates: Vec<&Entity> = input.annotation.entities_labelled(EntityLabel::Date).collect();
    let times: Vec<&Entity> = input.annotation.entities_labelled(EntityLabel::Time).collect();

    let mut moments: Vec<FuzzyMoment> = if dates.is_empty() {
        times
            .iter()
            .filter_map(|t| fuzzy::parse_fuzzy(&t.text, input.now))
            .collect()
    } else {
        dates
            .iter()
            .filter_map(|d| {
                let date = fuzzy::find_date(&d.text, input.now)?;
                let time = fuzzy::find_time(&d.text).or_else(|| {
                    times
                        .iter()
                        .min_by_key(|t| token_gap(d, t))
                        .and_then(|t| fuzzy::find_time(&t.text))
                });
                Some(FuzzyMoment {
                    date,
                    time,
                    explicit_date: true,
                })
            })
            .collect()
    };

    moments.retain(|m| m.is_after(input.now));
    moments.sort_by_key(FuzzyMoment::as_datetime);
    let earliest = moments.first()?;
    Some(Schedule {
        date: Some(earliest.date),
        time: earliest.time,
    })
}

fn token_gap(a: &Entity, b: &Entity) -> usize {
    if a.tokens.end <= b.tokens.start {
        b.tokens.start - a.tokens.end
    } else {
        a.tokens.start.saturating_sub(b.tokens.end)
    }
}

/// First date pattern and first time pattern found anywhere in the text.
fn schedule_from_patterns(input: &ExtractInput<'_>) -> Option<Schedule> {
    Schedule::from_parts(
        fuzzy::find_date(input.text, input.now),
        fuzzy::find_time(input.text),
    )
}

/// A message that mentions no date or time at all is dated by its own timestamp.
fn schedule_from_timestamp(input: &ExtractInput<'_>) -> Option<Schedule> {
    let posted = input.posted_at?;
    if !fuzzy::temporal_spans(input.text).is_empty() {
        return None;
    }
    Some(Schedule {
        date: Some(posted.date()),
        time: Some(posted.time()),
    })
}

// --- Title ---

static TITLE_FALLBACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:quiz|test|exam|competition|event)\s+[A-Za-z0-9\s]+").unwrap()
});

pub const TITLE_STRATEGIES: &[Strategy<String>] = &[
    Strategy {
        name: "tokens",
        run: title_from_tokens,
    },
    Strategy {
        name: "pattern",
        run: title_from_pattern,
    },
];

pub fn extract_title(input: &ExtractInput<'_>) -> Option<String> {
    first_match("title", TITLE_STRATEGIES, input)
}

const TITLE_CONTEXT: usize = 3;

/// The first title keyword plus up to three nouns / proper nouns / adjectives
/// on each side, within the same line and sentence.
fn title_from_tokens(input: &ExtractInput<'_>) -> Option<String> {
    let tokens = &input.annotation.tokens;
    let i = tokens
        .iter()
        .position(|t| contains(lexicon::TITLE_KEYWORDS, &t.lemma))?;

    let describes = |t: &&Token| {
        matches!(
            t.pos,
            PartOfSpeech::Noun | PartOfSpeech::Propn | PartOfSpeech::Adj
        ) && !is_temporal(t)
            && !contains(lexicon::FIELD_LABELS, &t.lower())
    };
    let (from, to) = title_window(input.text, tokens, i);
    let before = tokens[from..i].iter().filter(describes);
    let after = tokens[i + 1..to].iter().filter(describes);

    let words: Vec<&str> = before
        .chain(std::iter::once(&tokens[i]))
        .chain(after)
        .map(|t| t.text.as_str())
        .collect();
    Some(words.join(" "))
}

/// Token bounds `[from, to)` around `i`, stopping at a line break or a sentence end.
fn title_window(text: &str, tokens: &[Token], i: usize) -> (usize, usize) {
    let breaks = |a: &Token, b: &Token| {
        matches!(a.text.as_str(), "." | "!" | "?") || text[a.end..b.start].contains('\n')
    };
    let mut from = i;
    while from > 0 && i - from < TITLE_CONTEXT && !breaks(&tokens[from - 1], &tokens[from]) {
        from -= 1;
    }
    let mut to = i + 1;
    while to < tokens.len() && to - i <= TITLE_CONTEXT && !breaks(&tokens[to - 1], &tokens[to]) {
        to += 1;
    }
    (from, to)
}

fn title_from_pattern(input: &ExtractInput<'_>) -> Option<String> {
    let m = TITLE_FALLBACK.find(input.text)?;
    let title = collapse_whitespace(m.as_str());
    (!title.is_empty()).then_some(title)
}

// --- Venue ---

static VENUE_STOP_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:{})\b",
        lexicon::VENUE_STOP_WORDS.join("|")
    ))
    .unwrap()
});

static VENUE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)\bvenue\s*[:\-]\s*([^.\n]+)",
        r"(?im)\blocation\s*[:\-]\s*([^.\n]+)",
        r"(?im)\bat\s+([^.\n]+?)(?:\s+(?:on|at|from)\s+\d|$)",
        r"(?im)\bin\s+([^.\n]+?)(?:\s+(?:on|at|from)\s+\d|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

pub const VENUE_STRATEGIES: &[Strategy<String>] = &[
    Strategy {
        name: "tokens",
        run: venue_from_tokens,
    },
    Strategy {
        name: "patterns",
        run: venue_from_patterns,
    },
];

pub fn extract_venue(input: &ExtractInput<'_>) -> Option<String> {
    first_match("venue", VENUE_STRATEGIES, input)
}

const VENUE_CONTEXT: usize = 3;
const MIN_VENUE_CHARS: usize = 4;

fn is_temporal(t: &Token) -> bool {
    matches!(
        t.entity,
        Some(EntityLabel::Date | EntityLabel::Time | EntityLabel::Money)
    )
}

fn is_name_part(t: &Token) -> bool {
    t.is_proper() && !is_temporal(t)
}

/// Longest proper-noun span, either standalone or grown around a venue word.
fn venue_from_tokens(input: &ExtractInput<'_>) -> Option<String> {
    let tokens = &input.annotation.tokens;
    let mut candidates: Vec<String> = Vec::new();

    let mut run: Vec<&str> = Vec::new();
    for t in tokens {
        if is_name_part(t) {
            run.push(&t.text);
        } else if !run.is_empty() {
            candidates.push(run.join(" "));
            run.clear();
        }
    }
    if !run.is_empty() {
        candidates.push(run.join(" "));
    }

    for (i, t) in tokens.iter().enumerate() {
        if !contains(lexicon::VENUE_INDICATORS, &t.lower()) {
            continue;
        }
        let mut start = i;
        while start > 0 && i - start < VENUE_CONTEXT && is_name_part(&tokens[start - 1]) {
            start -= 1;
        }
        let mut end = i + 1;
        while end < tokens.len()
            && end - i <= VENUE_CONTEXT
            && (is_name_part(&tokens[end]) || tokens[end].pos == PartOfSpeech::Num)
            && !is_temporal(&tokens[end])
        {
            end += 1;
        }
        let span: Vec<&str> = tokens[start..end].iter().map(|t| t.text.as_str()).collect();
        candidates.push(span.join(" "));
    }

    candidates
        .iter()
        .map(|c| collapse_whitespace(&VENUE_STOP_WORDS.replace_all(c, "")))
        .filter(|c| c.chars().count() >= MIN_VENUE_CHARS)
        .fold(None, |best: Option<String>, c| match best {
            Some(b) if b.chars().count() >= c.chars().count() => Some(b),
            _ => Some(c),
        })
}

/// Labelled venues, then "at ..." / "in ..." phrases.
fn venue_from_patterns(input: &ExtractInput<'_>) -> Option<String> {
    VENUE_PATTERNS.iter().find_map(|re| {
        re.captures_iter(input.text).find_map(|c| {
            let venue = c
                .get(1)?
                .as_str()
                .trim()
                .trim_end_matches([',', ';', '!', ':']);
            // "at 5 pm" is a time, not a place.
            let starts_with_digit = venue.chars().next().is_some_and(|ch| ch.is_ascii_digit());
            (!venue.is_empty() && !starts_with_digit).then(|| venue.to_string())
        })
    })
}

// --- Registration link ---

static SHORT_FORM_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:https?://)?forms\.gle/[A-Za-z0-9_-]+").unwrap());

static GENERIC_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.)?[A-Za-z0-9-]+(?:\.[A-Za-z]{2,})+(?:/\S*)?").unwrap()
});

pub const LINK_STRATEGIES: &[Strategy<String>] = &[
    Strategy {
        name: "short form link",
        run: short_form_link,
    },
    Strategy {
        name: "url",
        run: generic_url,
    },
];

pub fn extract_registration_link(input: &ExtractInput<'_>) -> Option<String> {
    first_match("registration link", LINK_STRATEGIES, input)
}

/// `forms.gle/...` with or without a scheme, always returned as https.
fn short_form_link(input: &ExtractInput<'_>) -> Option<String> {
    let m = SHORT_FORM_LINK.find(input.text)?.as_str();
    let path = m
        .split_once("://")
        .map_or(m, |(_, rest)| rest);
    Some(format!("https://{}", path))
}

fn generic_url(input: &ExtractInput<'_>) -> Option<String> {
    let m = GENERIC_URL.find(input.text)?.as_str();
    Some(m.trim_end_matches(['.', ',', ';', ')', '!', '?']).to_string())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
