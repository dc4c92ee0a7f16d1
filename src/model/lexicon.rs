// File: src/model/lexicon.rs
// Fixed vocabularies shared by the analyzer, the classifier and the extractors.

/// Lemmas that signal a quiz / competition announcement.
pub const QUIZ_KEYWORDS: &[&str] = &[
    "quiz",
    "register",
    "participate",
    "event",
    "announce",
    "competition",
    "contest",
    "team",
    "participant",
    "venue",
    "prize",
    "winner",
    "certificate",
    "guideline",
    "rule",
    "society",
    "fest",
    "festival",
    "championship",
];

/// Surface forms that mark a registration call-to-action.
pub const REGISTRATION_WORDS: &[&str] = &[
    "registration",
    "register",
    "signup",
    "sign-up",
    "reg",
    "reg.",
    "enroll",
    "enrol",
];

/// Multi-word registration phrases, matched against the lower-cased text.
pub const REGISTRATION_PHRASES: &[&str] = &["sign up", "register now", "register here"];

/// Tokens that point at a time of day.
pub const TIME_OF_DAY_WORDS: &[&str] = &[
    "am",
    "pm",
    "a.m.",
    "p.m.",
    "morning",
    "afternoon",
    "evening",
    "night",
    "noon",
    "midnight",
];

/// Words after which a title span is built.
pub const TITLE_KEYWORDS: &[&str] = &["quiz", "test", "exam", "competition", "event"];

/// Words that usually sit inside a venue name.
pub const VENUE_INDICATORS: &[&str] = &[
    "college",
    "university",
    "institute",
    "school",
    "academy",
    "campus",
    "department",
    "faculty",
    "hall",
    "auditorium",
    "building",
    "block",
    "room",
    "lab",
    "laboratory",
    "center",
    "centre",
    "theatre",
    "theater",
    "library",
    "cafe",
    "stadium",
];

/// Words that turn a capitalised run into an organisation.
pub const ORG_INDICATORS: &[&str] = &[
    "society",
    "club",
    "association",
    "committee",
    "council",
    "foundation",
    "cell",
    "forum",
];

/// A small gazetteer of places that commonly show up in announcements.
pub const PLACE_NAMES: &[&str] = &[
    "delhi",
    "new delhi",
    "mumbai",
    "kolkata",
    "chennai",
    "bengaluru",
    "bangalore",
    "hyderabad",
    "pune",
    "ahmedabad",
    "jaipur",
    "lucknow",
    "chandigarh",
    "noida",
    "gurugram",
    "gurgaon",
    "london",
    "online",
];

/// Stop words stripped out of venue candidates.
pub const VENUE_STOP_WORDS: &[&str] = &["the", "a", "an", "at", "in", "on", "of", "for", "and", "or"];

/// Greetings and exclamations that open a message.
pub const INTERJECTIONS: &[&str] = &[
    "hello", "hi", "hey", "hii", "hiya", "greetings", "congrats", "congratulations", "thanks",
    "wow", "oh", "ok", "okay", "yay",
];

/// Words used as field labels ("Venue: ...", "Date - ..."). Never part of a name.
pub const FIELD_LABELS: &[&str] = &[
    "venue", "location", "place", "date", "time", "timing", "timings", "deadline", "link",
];

pub const DETERMINERS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "every", "all", "some", "any", "each", "no",
];

pub const ADPOSITIONS: &[&str] = &[
    "at", "in", "on", "of", "for", "from", "to", "by", "with", "near", "before", "after", "till",
    "until", "about", "via", "into", "over", "under", "between", "during",
];

pub const PRONOUNS: &[&str] = &[
    "i", "you", "he", "she", "we", "they", "it", "me", "us", "them", "him", "her", "our", "your",
    "their", "my", "his", "its", "everyone", "anyone", "someone",
];

pub const CONJUNCTIONS: &[&str] = &["and", "or", "but", "so", "nor", "yet", "if", "because"];

pub const ADVERBS: &[&str] = &[
    "now", "soon", "here", "there", "very", "also", "just", "only", "not", "again", "already",
    "please", "asap", "too", "then",
];

pub const AUXILIARIES: &[&str] = &[
    "is", "are", "was", "were", "be", "been", "being", "am", "will", "shall", "can", "could",
    "would", "should", "may", "might", "must", "do", "does", "did", "has", "have", "had",
];

/// Base forms recognised as verbs. Inflected forms are reduced to these by the lemmatizer.
pub const VERBS: &[&str] = &[
    "register", "participate", "join", "come", "attend", "announce", "organise", "organize",
    "host", "conduct", "win", "fill", "apply", "submit", "bring", "send", "share", "check",
    "contact", "reach", "invite", "welcome", "visit", "click", "note", "start", "begin", "hold",
    "go", "see", "let", "get", "make", "take", "enroll", "enrol", "play", "compete",
];

pub const ADJECTIVES: &[&str] = &[
    "annual", "national", "open", "grand", "inter", "intra", "final", "general", "online",
    "offline", "mega", "big", "free", "new", "first", "second", "third", "last", "next", "great",
    "exciting", "special", "official", "cultural", "literary", "solo", "senior", "junior",
];

/// Irregular plurals and forms the suffix rules would get wrong.
pub const IRREGULAR_LEMMAS: &[(&str, &str)] = &[
    ("quizzes", "quiz"),
    ("festivities", "festival"),
    ("won", "win"),
    ("came", "come"),
    ("held", "hold"),
    ("began", "begin"),
    ("went", "go"),
    ("took", "take"),
    ("made", "make"),
];

pub const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

/// Resolves a full or abbreviated month name ("Apr", "Sept", "April") to its number.
pub fn month_number(word: &str) -> Option<u32> {
    let lower = word.trim_end_matches('.').to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    if lower == "sept" {
        return Some(9);
    }
    MONTHS
        .iter()
        .find(|(name, _)| *name == lower || (lower.len() == 3 && name.starts_with(&lower)))
        .map(|(_, n)| *n)
}

pub fn contains(list: &[&str], word: &str) -> bool {
    list.contains(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_number_accepts_short_and_long_names() {
        assert_eq!(month_number("April"), Some(4));
        assert_eq!(month_number("apr"), Some(4));
        assert_eq!(month_number("Sept"), Some(9));
        assert_eq!(month_number("Dec."), Some(12));
        assert_eq!(month_number("ma"), None);
        assert_eq!(month_number("Monday"), None);
    }
}
