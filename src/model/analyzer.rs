// File: src/model/analyzer.rs
/*! Token-level annotation of message text.

The classifier and the annotation-based extraction strategies only ever see
an [`Annotation`]: a token sequence carrying part-of-speech tags, lemmas and
optional named-entity labels. Where those annotations come from is hidden
behind the [`TextAnalyzer`] trait, so a statistical tagger can be plugged in
and tests can hand-build annotations.

[`RuleAnalyzer`] is the built-in implementation. It is deterministic and
lexicon driven: casing and closed word classes give the part of speech,
the date/time recognizer in `fuzzy` gives DATE and TIME spans, currency
patterns give MONEY, and capitalised runs around facility or organisation
words give FAC / ORG / GPE.
*/

use crate::model::fuzzy::{TemporalKind, temporal_spans};
use crate::model::lexicon::{self, contains};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::ops::Range;
use strum::{Display, EnumString};

/// Universal part-of-speech tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum PartOfSpeech {
    Noun,
    Propn,
    Verb,
    Aux,
    Adj,
    Adv,
    Intj,
    Adp,
    Det,
    Pron,
    Cconj,
    Num,
    Punct,
    Sym,
    X,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum EntityLabel {
    Date,
    Time,
    Money,
    /// Countries, cities, states.
    Gpe,
    /// Buildings, venues, facilities.
    Fac,
    Org,
}

impl EntityLabel {
    pub fn is_location(self) -> bool {
        matches!(self, EntityLabel::Gpe | EntityLabel::Fac)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Position in the token sequence.
    pub index: usize,
    pub text: String,
    pub lemma: String,
    pub pos: PartOfSpeech,
    pub entity: Option<EntityLabel>,
    pub is_stop: bool,
    /// Byte offsets into the annotated text.
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn lower(&self) -> String {
        self.text.to_lowercase()
    }

    pub fn is_punct(&self) -> bool {
        matches!(self.pos, PartOfSpeech::Punct | PartOfSpeech::Sym)
    }

    pub fn is_proper(&self) -> bool {
        self.pos == PartOfSpeech::Propn
            || matches!(
                self.entity,
                Some(EntityLabel::Org | EntityLabel::Gpe | EntityLabel::Fac)
            )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub label: EntityLabel,
    pub text: String,
    /// Token range, end exclusive.
    pub tokens: Range<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    pub tokens: Vec<Token>,
    pub entities: Vec<Entity>,
}

impl Annotation {
    pub fn has_entity(&self, pred: impl Fn(EntityLabel) -> bool) -> bool {
        self.entities.iter().any(|e| pred(e.label))
    }

    pub fn entities_labelled(&self, label: EntityLabel) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.label == label)
    }
}

/// Anything able to turn raw message text into an [`Annotation`].
///
/// Implementations must be deterministic for a given input and never fail;
/// text they cannot make sense of simply yields fewer tags.
pub trait TextAnalyzer: Send + Sync + fmt::Debug {
    fn annotate(&self, text: &str) -> Annotation;
}

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"https?://\S+",
        r"|(?:www\.)?[A-Za-z0-9][A-Za-z0-9\-]*(?:\.[A-Za-z0-9\-]+)+/\S*",
        r"|\d{1,2}(?:st|nd|rd|th)\b",
        r"|\d+(?:[:/.,\-]\d+)*",
        r"|\w+(?:['’]\w+)*",
        r"|[^\s\w]",
    ))
    .unwrap()
});

static MONEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?:₹|\$|€|£|\brs\.?|\binr)\s?\d+(?:,\d+)*(?:\.\d+)?(?:\s?(?:k|lakhs?|/-))?",
        r"|\b\d+(?:,\d+)*(?:\.\d+)?\s?(?:rupees|inr|/-|lakhs?\b)",
    ))
    .unwrap()
});

const LINK_TRAILING: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '"', '\''];

/// Lexicon and pattern based analyzer. Cheap to construct and share.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleAnalyzer;

impl RuleAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn tokenize(text: &str) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();
        for m in TOKEN.find_iter(text) {
            let raw = m.as_str();
            let is_link = raw.contains('/') && raw.chars().any(|c| c.is_alphabetic());
            if !is_link {
                Self::push(&mut tokens, raw, m.start(), false);
                continue;
            }
            let link = raw.trim_end_matches(LINK_TRAILING);
            Self::push(&mut tokens, link, m.start(), true);
            // Sentence punctuation glued to the end of a link.
            let mut offset = m.start() + link.len();
            for c in raw[link.len()..].chars() {
                let mut buf = [0u8; 4];
                Self::push(&mut tokens, c.encode_utf8(&mut buf), offset, false);
                offset += c.len_utf8();
            }
        }
        tokens
    }

    fn push(tokens: &mut Vec<Token>, raw: &str, start: usize, is_link: bool) {
        if raw.is_empty() {
            return;
        }
        let lower = raw.to_lowercase();
        let prev_pos = tokens.last().map(|t| t.pos);
        let (pos, lemma) = if is_link {
            (PartOfSpeech::X, lower.clone())
        } else {
            (tag(raw, &lower, prev_pos), lemmatize(&lower))
        };
        tokens.push(Token {
            index: tokens.len(),
            text: raw.to_string(),
            is_stop: is_stop_word(&lower),
            lemma,
            pos,
            entity: None,
            start,
            end: start + raw.len(),
        });
    }

    fn span_entities(text: &str, tokens: &[Token]) -> Vec<Entity> {
        let mut spans: Vec<(Range<usize>, EntityLabel)> = Vec::new();
        for (range, kind) in temporal_spans(text) {
            let label = match kind {
                TemporalKind::Date => EntityLabel::Date,
                TemporalKind::Time => EntityLabel::Time,
            };
            // "Saturday, 21st April" is one mention, not two.
            if let Some((last, last_label)) = spans.last_mut()
                && *last_label == label
                && label == EntityLabel::Date
                && text[last.end..range.start]
                    .chars()
                    .all(|c| c.is_whitespace() || c == ',')
            {
                last.end = range.end;
                continue;
            }
            spans.push((range, label));
        }
        for m in MONEY.find_iter(text) {
            let overlaps = spans
                .iter()
                .any(|(r, _)| m.start() < r.end && r.start < m.end());
            if !overlaps {
                spans.push((m.range(), EntityLabel::Money));
            }
        }

        spans
            .into_iter()
            .filter_map(|(range, label)| {
                let first = tokens.iter().position(|t| t.end > range.start)?;
                let last = tokens.iter().rposition(|t| t.start < range.end)?;
                (first <= last).then(|| Entity {
                    label,
                    text: text[range].trim().to_string(),
                    tokens: first..last + 1,
                })
            })
            .collect()
    }

    /// Second look at capitalised words once their neighbours are known.
    ///
    /// A sentence-initial capital is only a name when the next word is one too
    /// or is a place/organisation word ("Hindu College"). Names glued to an
    /// event word ("Literary Quiz", "Quiz Nite") name the event, not a place.
    fn refine_proper_nouns(text: &str, tokens: &mut [Token]) {
        let tagged: Vec<PartOfSpeech> = tokens.iter().map(|t| t.pos).collect();
        for i in 0..tokens.len() {
            if tagged[i] != PartOfSpeech::Propn || !starts_sentence(text, tokens, i) {
                continue;
            }
            let named = is_indicator(&tokens[i])
                || tokens
                    .get(i + 1)
                    .is_some_and(|n| tagged[i + 1] == PartOfSpeech::Propn || is_indicator(n));
            if !named {
                tokens[i].pos = PartOfSpeech::Noun;
            }
        }

        let mut i = 0;
        while i < tokens.len() {
            if tokens[i].pos != PartOfSpeech::Propn {
                i += 1;
                continue;
            }
            let start = i;
            while i < tokens.len() && tokens[i].pos == PartOfSpeech::Propn {
                i += 1;
            }
            let glued = (start > 0 && is_event_word(&tokens[start - 1]))
                || tokens.get(i).is_some_and(is_event_word);
            if glued && !tokens[start..i].iter().any(is_indicator) {
                for t in &mut tokens[start..i] {
                    t.pos = PartOfSpeech::Noun;
                }
            }
        }
    }

    /// FAC / ORG / GPE entities from runs of capitalised tokens.
    fn run_entities(text: &str, tokens: &[Token], taken: &[bool]) -> Vec<Entity> {
        let mut entities = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            if taken[i] || tokens[i].pos != PartOfSpeech::Propn {
                // Single lower-case place names ("online", "delhi").
                if !taken[i] && contains(lexicon::PLACE_NAMES, &tokens[i].lower()) {
                    entities.push(Entity {
                        label: EntityLabel::Gpe,
                        text: tokens[i].text.clone(),
                        tokens: i..i + 1,
                    });
                }
                i += 1;
                continue;
            }
            let start = i;
            let mut end = i + 1;
            while end < tokens.len() && !taken[end] {
                let t = &tokens[end];
                let joins = (t.lower() == "of" || t.text == "&")
                    && tokens
                        .get(end + 1)
                        .is_some_and(|n| n.pos == PartOfSpeech::Propn);
                if t.pos == PartOfSpeech::Propn || joins {
                    end += 1;
                } else {
                    break;
                }
            }
            let run = &tokens[start..end];
            let lowers: Vec<String> = run.iter().map(|t| t.lower()).collect();
            let run_text = text[run[0].start..run[run.len() - 1].end].to_string();
            let label = if lowers
                .iter()
                .any(|w| contains(lexicon::VENUE_INDICATORS, w))
            {
                Some(EntityLabel::Fac)
            } else if lowers.iter().any(|w| contains(lexicon::ORG_INDICATORS, w)) {
                Some(EntityLabel::Org)
            } else if contains(lexicon::PLACE_NAMES, &run_text.to_lowercase()) {
                Some(EntityLabel::Gpe)
            } else {
                None
            };
            if let Some(label) = label {
                entities.push(Entity {
                    label,
                    text: run_text,
                    tokens: start..end,
                });
            }
            i = end;
        }
        entities
    }
}

impl TextAnalyzer for RuleAnalyzer {
    fn annotate(&self, text: &str) -> Annotation {
        let mut tokens = Self::tokenize(text);
        Self::refine_proper_nouns(text, &mut tokens);
        let mut entities = Self::span_entities(text, &tokens);

        let mut taken = vec![false; tokens.len()];
        for e in &entities {
            for flag in &mut taken[e.tokens.clone()] {
                *flag = true;
            }
        }
        entities.extend(Self::run_entities(text, &tokens, &taken));
        entities.sort_by_key(|e| e.tokens.start);

        for e in &entities {
            for t in &mut tokens[e.tokens.clone()] {
                t.entity.get_or_insert(e.label);
            }
        }
        Annotation { tokens, entities }
    }
}

fn starts_sentence(text: &str, tokens: &[Token], i: usize) -> bool {
    let Some(prev) = i.checked_sub(1).map(|p| &tokens[p]) else {
        return true;
    };
    matches!(prev.text.as_str(), "." | "!" | "?") || text[prev.end..tokens[i].start].contains('\n')
}

fn is_indicator(t: &Token) -> bool {
    let lower = t.lower();
    contains(lexicon::VENUE_INDICATORS, &lower) || contains(lexicon::ORG_INDICATORS, &lower)
}

fn is_event_word(t: &Token) -> bool {
    t.pos == PartOfSpeech::Noun && contains(lexicon::TITLE_KEYWORDS, &t.lemma)
}

fn is_stop_word(lower: &str) -> bool {
    [
        lexicon::DETERMINERS,
        lexicon::ADPOSITIONS,
        lexicon::PRONOUNS,
        lexicon::CONJUNCTIONS,
        lexicon::AUXILIARIES,
        lexicon::ADVERBS,
    ]
    .iter()
    .any(|list| contains(list, lower))
}

fn tag(raw: &str, lower: &str, prev: Option<PartOfSpeech>) -> PartOfSpeech {
    let Some(first) = raw.chars().next() else {
        return PartOfSpeech::X;
    };
    if !first.is_alphanumeric() {
        return if matches!(first, '₹' | '$' | '€' | '£' | '&' | '@' | '#' | '%') {
            PartOfSpeech::Sym
        } else {
            PartOfSpeech::Punct
        };
    }
    if first.is_ascii_digit() {
        return PartOfSpeech::Num;
    }
    // "5 pm" / "10 am": the meridiem is a noun, not the auxiliary "am".
    if (lower == "am" || lower == "pm") && prev == Some(PartOfSpeech::Num) {
        return PartOfSpeech::Noun;
    }

    let closed = [
        (lexicon::DETERMINERS, PartOfSpeech::Det),
        (lexicon::ADPOSITIONS, PartOfSpeech::Adp),
        (lexicon::PRONOUNS, PartOfSpeech::Pron),
        (lexicon::CONJUNCTIONS, PartOfSpeech::Cconj),
        (lexicon::AUXILIARIES, PartOfSpeech::Aux),
        (lexicon::ADVERBS, PartOfSpeech::Adv),
        (lexicon::INTERJECTIONS, PartOfSpeech::Intj),
        (lexicon::FIELD_LABELS, PartOfSpeech::Noun),
    ];
    if let Some((_, pos)) = closed.iter().find(|(list, _)| contains(list, lower)) {
        return *pos;
    }

    let lemma = lemmatize(lower);
    if contains(lexicon::VERBS, &lemma) {
        return PartOfSpeech::Verb;
    }

    let is_cased = raw.chars().any(|c| c.is_uppercase() || c.is_lowercase());
    if first.is_uppercase() {
        // Event vocabulary stays a common noun even when capitalised ("Quiz Nite"),
        // organisation words stay proper so "Quiz Society" still yields an ORG.
        let vocabulary = contains(lexicon::QUIZ_KEYWORDS, &lemma)
            || contains(lexicon::TITLE_KEYWORDS, &lemma);
        if vocabulary && !contains(lexicon::ORG_INDICATORS, &lemma) {
            return PartOfSpeech::Noun;
        }
        return PartOfSpeech::Propn;
    }
    if contains(lexicon::ADJECTIVES, lower) {
        return PartOfSpeech::Adj;
    }
    if is_cased && lower.len() > 4 && lower.ends_with("ly") {
        return PartOfSpeech::Adv;
    }
    PartOfSpeech::Noun
}

/// Reduces a lower-cased word to a dictionary form. Suffix rules only fire
/// when they land on a known verb, or for regular plurals.
pub fn lemmatize(lower: &str) -> String {
    if let Some((_, lemma)) = lexicon::IRREGULAR_LEMMAS.iter().find(|(w, _)| *w == lower) {
        return (*lemma).to_string();
    }
    if contains(lexicon::VERBS, lower) {
        return lower.to_string();
    }
    for suffix in ["ing", "ed", "es", "s"] {
        if let Some(stem) = lower.strip_suffix(suffix) {
            if suffix != "s" {
                if contains(lexicon::VERBS, stem) {
                    return stem.to_string();
                }
                let with_e = format!("{}e", stem);
                if contains(lexicon::VERBS, &with_e) {
                    return with_e;
                }
            } else if contains(lexicon::VERBS, stem) {
                return stem.to_string();
            }
        }
    }
    if let Some(stem) = lower.strip_suffix("ies")
        && stem.len() > 1
    {
        return format!("{}y", stem);
    }
    for suffix in ["sses", "xes", "ches", "shes"] {
        if lower.ends_with(suffix) {
            return lower[..lower.len() - 2].to_string();
        }
    }
    if lower.len() > 3
        && lower.ends_with('s')
        && !lower.ends_with("ss")
        && !lower.ends_with("us")
        && !lower.ends_with("is")
    {
        return lower[..lower.len() - 1].to_string();
    }
    lower.to_string()
}
