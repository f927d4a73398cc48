//! Script detection for Korean/English text
//!
//! Classifies text by counting Hangul and Latin letters. Korean is the
//! default language of the indexed corpus; English is the alternate.

use serde::{Deserialize, Serialize};

/// Script classification of a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Script {
    /// Only Hangul letters
    Korean,
    /// Only Latin letters
    English,
    /// Both Hangul and Latin letters
    Mixed,
    /// No letters at all (digits, punctuation, empty)
    Unknown,
}

/// Language a profile or query is predominantly written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    Korean,
    English,
}

impl Language {
    /// The corpus default language
    pub const DEFAULT: Language = Language::Korean;

    pub fn is_default(self) -> bool {
        self == Self::DEFAULT
    }

    pub fn other(self) -> Language {
        match self {
            Language::Korean => Language::English,
            Language::English => Language::Korean,
        }
    }
}

/// Letter counts by script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptCounts {
    pub hangul: usize,
    pub latin: usize,
}

impl ScriptCounts {
    pub fn of(text: &str) -> Self {
        let mut counts = Self::default();
        for c in text.chars() {
            if is_hangul(c) {
                counts.hangul += 1;
            } else if c.is_ascii_alphabetic() {
                counts.latin += 1;
            }
        }
        counts
    }

    pub fn add(&mut self, other: ScriptCounts) {
        self.hangul += other.hangul;
        self.latin += other.latin;
    }

    pub fn script(&self) -> Script {
        match (self.hangul > 0, self.latin > 0) {
            (true, true) => Script::Mixed,
            (true, false) => Script::Korean,
            (false, true) => Script::English,
            (false, false) => Script::Unknown,
        }
    }

    /// Majority language; ties and letterless text fall back to the default
    pub fn dominant(&self) -> Language {
        if self.latin > self.hangul {
            Language::English
        } else {
            Language::DEFAULT
        }
    }
}

/// Whether `c` is a Hangul syllable or jamo
pub fn is_hangul(c: char) -> bool {
    matches!(c,
        '\u{AC00}'..='\u{D7A3}'
        | '\u{1100}'..='\u{11FF}'
        | '\u{3130}'..='\u{318F}')
}

pub fn contains_hangul(text: &str) -> bool {
    text.chars().any(is_hangul)
}

/// Classify text as Korean-only, English-only, mixed or unknown
pub fn detect_script(text: &str) -> Script {
    ScriptCounts::of(text).script()
}

/// Language of a single piece of text
///
/// Returns `None` for text without letters so callers can decide whether it
/// counts as "different" from another language.
pub fn detect_language(text: &str) -> Option<Language> {
    let counts = ScriptCounts::of(text);
    match counts.script() {
        Script::Unknown => None,
        _ => Some(counts.dominant()),
    }
}

/// Dominant language across several texts, weighted by letter count
pub fn dominant_language<'a>(texts: impl IntoIterator<Item = &'a str>) -> Language {
    let mut total = ScriptCounts::default();
    for text in texts {
        total.add(ScriptCounts::of(text));
    }
    total.dominant()
}
