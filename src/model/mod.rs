// File: ./src/model/mod.rs
pub mod analyzer;
pub mod classifier;
pub mod event;
pub mod extract;
pub mod fuzzy;
pub mod lexicon;
pub mod message;
pub mod normalize;

pub use analyzer::{Annotation, Entity, EntityLabel, PartOfSpeech, RuleAnalyzer, TextAnalyzer, Token};
pub use classifier::{SignalBundle, is_quiz_announcement};
pub use event::{EventCandidate, EventRecord, assemble_local};
pub use message::{Message, Segmenter, parse_timestamp_line, segment};
pub use normalize::Normalizer;
