// File: src/model/classifier.rs
// Decides whether a message announces a quiz or competition.
use crate::model::analyzer::{Annotation, EntityLabel, PartOfSpeech, TextAnalyzer};
use crate::model::lexicon::{self, contains};
use crate::model::message::Message;
use std::collections::HashSet;

/// Everything the acceptance rule looks at, gathered in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalBundle {
    pub has_date: bool,
    pub has_location: bool,
    pub has_money: bool,
    pub has_registration: bool,
    pub has_time_of_day: bool,
    /// Distinct quiz-vocabulary lemmas.
    pub keyword_hits: usize,
}

impl SignalBundle {
    /// Signals carried by the text alone.
    pub fn from_annotation(text: &str, annotation: &Annotation) -> Self {
        let lower = text.to_lowercase();
        let mut keywords = HashSet::new();
        let mut has_registration = mentions_registration_phrase(&lower);
        let mut has_time_of_day = annotation.has_entity(|l| l == EntityLabel::Time);

        for token in &annotation.tokens {
            let word = token.lower();
            if !token.is_stop && !token.is_punct() && contains(lexicon::QUIZ_KEYWORDS, &token.lemma)
            {
                keywords.insert(token.lemma.as_str());
            }
            if contains(lexicon::REGISTRATION_WORDS, &word) {
                has_registration = true;
            }
            // "I am" is not a time of day.
            if contains(lexicon::TIME_OF_DAY_WORDS, &word) && token.pos != PartOfSpeech::Aux {
                has_time_of_day = true;
            }
        }

        Self {
            has_date: annotation.has_entity(|l| l == EntityLabel::Date),
            has_location: annotation.has_entity(EntityLabel::is_location),
            has_money: annotation.has_entity(|l| l == EntityLabel::Money),
            has_registration,
            has_time_of_day,
            keyword_hits: keywords.len(),
        }
    }

    /// The acceptance rule: one weak signal is never enough, two that co-occur are.
    pub fn accepts(&self) -> bool {
        let date = self.has_date;
        (date && self.has_location)
            || (date && self.has_money)
            || (date && self.has_registration)
            || (date && self.keyword_hits >= 2)
            || (date && self.has_time_of_day && self.keyword_hits >= 1)
    }
}

fn mentions_registration_phrase(lower: &str) -> bool {
    lexicon::REGISTRATION_PHRASES.iter().any(|p| lower.contains(p))
}

/// Signals for a chat message.
///
/// A message whose body names no date is dated by its own timestamp, the
/// same anchor the date/time extractor uses for a bare time of day.
pub fn signals(message: &Message, annotation: &Annotation) -> SignalBundle {
    SignalBundle {
        has_date: true,
        ..SignalBundle::from_annotation(&message.body, annotation)
    }
}

pub fn is_quiz_announcement(message: &Message, analyzer: &dyn TextAnalyzer) -> bool {
    let annotation = analyzer.annotate(&message.body);
    let bundle = signals(message, &annotation);
    let accepted = bundle.accepts();
    log::debug!(
        "Message at {} {}: {:?}",
        message.timestamp,
        if accepted { "accepted" } else { "rejected" },
        bundle
    );
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::analyzer::RuleAnalyzer;
    use chrono::NaiveDate;

    fn message(body: &str) -> Message {
        Message {
            timestamp: NaiveDate::from_ymd_opt(2025, 4, 18)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            sender: Some("Alice".to_string()),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_a_date_alone_is_not_enough() {
        let only_date = SignalBundle {
            has_date: true,
            ..Default::default()
        };
        assert!(!only_date.accepts());

        let one_keyword = SignalBundle {
            has_date: true,
            keyword_hits: 1,
            ..Default::default()
        };
        assert!(!one_keyword.accepts());

        let with_time = SignalBundle {
            has_time_of_day: true,
            ..one_keyword
        };
        assert!(with_time.accepts());

        let no_date = SignalBundle {
            has_location: true,
            has_money: true,
            has_registration: true,
            keyword_hits: 5,
            ..Default::default()
        };
        assert!(!no_date.accepts());
    }

    #[test]
    fn test_each_pair_accepts_only_with_a_date() {
        let pairs = [
            SignalBundle {
                has_location: true,
                ..Default::default()
            },
            SignalBundle {
                has_money: true,
                ..Default::default()
            },
            SignalBundle {
                has_registration: true,
                ..Default::default()
            },
            SignalBundle {
                keyword_hits: 2,
                ..Default::default()
            },
            SignalBundle {
                has_time_of_day: true,
                keyword_hits: 1,
                ..Default::default()
            },
        ];
        for without_date in pairs {
            assert!(!without_date.accepts(), "{:?}", without_date);
            let dated = SignalBundle {
                has_date: true,
                ..without_date
            };
            assert!(dated.accepts(), "{:?}", dated);
        }

        // The time of day alone does not complete a pair.
        let time_only = SignalBundle {
            has_date: true,
            has_time_of_day: true,
            ..Default::default()
        };
        assert!(!time_only.accepts());
    }

    #[test]
    fn test_time_of_day_dates_the_message_by_its_timestamp() {
        let analyzer = RuleAnalyzer;
        let plain = message("Quiz Nite register now forms.gle/abc venue: XYZ Hall");
        let timed = message("Quiz Nite at 6 pm, register now forms.gle/abc venue: XYZ Hall");
        assert!(is_quiz_announcement(&plain, &analyzer));
        assert!(is_quiz_announcement(&timed, &analyzer));

        let bundle = signals(&timed, &analyzer.annotate(&timed.body));
        assert!(bundle.has_date);
        assert!(bundle.has_time_of_day);
        assert!(bundle.has_location);
    }

    #[test]
    fn test_signals_from_text() {
        let body = "Annual Quiz on 25th April at Hindu College. Prizes worth Rs 5000, register now!";
        let annotation = RuleAnalyzer.annotate(body);
        let bundle = SignalBundle::from_annotation(body, &annotation);
        assert!(bundle.has_date);
        assert!(bundle.has_location);
        assert!(bundle.has_money);
        assert!(bundle.has_registration);
        // quiz, prize, register
        assert_eq!(bundle.keyword_hits, 3);
        assert!(bundle.accepts());
    }

    #[test]
    fn test_classifies_messages() {
        let analyzer = RuleAnalyzer;
        assert!(is_quiz_announcement(
            &message("Quiz Nite register now forms.gle/abc venue: XYZ Hall"),
            &analyzer
        ));
        assert!(!is_quiz_announcement(&message("see you all tomorrow"), &analyzer));
        assert!(!is_quiz_announcement(
            &message("lol the quiz yesterday was brutal"),
            &analyzer
        ));
        // A time of day and nothing else.
        assert!(!is_quiz_announcement(&message("I am leaving at 5 pm"), &analyzer));
    }
}
