//! Dictionary-backed Hangul analyzer
//!
//! Loads a morpheme dictionary in one of two line formats:
//! - `surface<TAB>TAG`
//! - mecab-ko-dic CSV: `surface,left_id,right_id,cost,TAG,...`
//!
//! Tags follow the Sejong tag set (`NNG`, `VV`, `JKS`, `EF`, ...). Words are
//! segmented by longest dictionary match; whatever the dictionary cannot
//! cover is handed to [`RuleBasedAnalyzer`].

use super::analyzer::{
    AnalyzerError, Morpheme, MorphologicalAnalyzer, PartOfSpeech, RuleBasedAnalyzer,
};
use crate::language::is_hangul;
use ahash::AHashMap;
use std::path::Path;
use tracing::debug;

pub struct DictionaryAnalyzer {
    entries: AHashMap<String, PartOfSpeech>,
    /// Longest entry, in chars
    max_entry_chars: usize,
    fallback: RuleBasedAnalyzer,
}

impl DictionaryAnalyzer {
    /// Load a dictionary file; blocking
    pub fn load(path: &Path) -> Result<Self, AnalyzerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalyzerError::InitializationError(format!(
                "Failed to read dictionary {:?}: {}",
                path, e
            ))
        })?;
        let analyzer = Self::parse(&content)?;
        debug!(
            "Loaded {} dictionary entries from {:?}",
            analyzer.entries.len(),
            path
        );
        Ok(analyzer)
    }

    pub fn parse(content: &str) -> Result<Self, AnalyzerError> {
        let mut entries = AHashMap::new();
        let mut max_entry_chars = 0;

        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (surface, tag) = split_entry(line).ok_or_else(|| {
                AnalyzerError::InitializationError(format!(
                    "Malformed dictionary entry on line {}: {}",
                    i + 1,
                    line
                ))
            })?;

            max_entry_chars = max_entry_chars.max(surface.chars().count());
            // First tag wins for surfaces listed twice
            entries
                .entry(surface.to_string())
                .or_insert_with(|| pos_for_tag(tag));
        }

        if entries.is_empty() {
            return Err(AnalyzerError::InitializationError(
                "Dictionary has no entries".to_string(),
            ));
        }

        Ok(Self {
            entries,
            max_entry_chars,
            fallback: RuleBasedAnalyzer::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn analyze_word(&self, word: &str, out: &mut Vec<Morpheme>) {
        let chars: Vec<(usize, char)> = word.char_indices().collect();
        let mut start = 0;

        while start < chars.len() {
            let longest = (start + 1..=chars.len().min(start + self.max_entry_chars))
                .rev()
                .find_map(|end| {
                    let from = chars[start].0;
                    let to = chars.get(end).map_or(word.len(), |(i, _)| *i);
                    let piece = &word[from..to];
                    self.entries.get(piece).map(|pos| (end, piece, *pos))
                });

            match longest {
                Some((end, piece, pos)) => {
                    out.push(Morpheme {
                        surface: piece.to_string(),
                        pos,
                    });
                    start = end;
                }
                None => {
                    out.extend(self.fallback.analyze(&word[chars[start].0..]));
                    return;
                }
            }
        }
    }
}

impl MorphologicalAnalyzer for DictionaryAnalyzer {
    fn analyze(&self, text: &str) -> Vec<Morpheme> {
        let mut morphemes = Vec::new();

        for raw in text.split_whitespace() {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
            if word.is_empty() {
                continue;
            }
            if word.chars().all(is_hangul) {
                self.analyze_word(word, &mut morphemes);
            } else {
                morphemes.extend(self.fallback.analyze(word));
            }
        }

        morphemes
    }

    fn name(&self) -> &str {
        "dictionary-hangul"
    }
}

fn split_entry(line: &str) -> Option<(&str, &str)> {
    let (surface, tag) = if let Some((surface, rest)) = line.split_once('\t') {
        (surface, rest.split('\t').next()?)
    } else {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 5 {
            return None;
        }
        (fields[0], fields[4])
    };

    let (surface, tag) = (surface.trim(), tag.trim());
    if surface.is_empty() || tag.is_empty() {
        None
    } else {
        Some((surface, tag))
    }
}

fn pos_for_tag(tag: &str) -> PartOfSpeech {
    // Compound tags ("VV+EP") are classified by their first part
    let head = tag.split('+').next().unwrap_or(tag);
    match head {
        t if t.starts_with("NN") || t == "NR" || t == "NP" || t == "SL" || t == "SH" => {
            PartOfSpeech::Noun
        }
        "VV" | "VX" | "XSV" => PartOfSpeech::Verb,
        "VA" | "VCP" | "VCN" | "XSA" => PartOfSpeech::Adjective,
        t if t.starts_with('J') => PartOfSpeech::Particle,
        t if t.starts_with('E') => PartOfSpeech::Ending,
        _ => PartOfSpeech::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DICT: &str = "\
# surface\ttag
클라우드\tNNG
인프라\tNNG
구축\tNNG
를\tJKO
을\tJKO
하\tXSV
는\tETM
운영,1780,3534,2949,NNG,*,T,운영,*,*,*,*
";

    fn tagged(analyzer: &DictionaryAnalyzer, text: &str) -> Vec<(String, PartOfSpeech)> {
        analyzer
            .analyze(text)
            .into_iter()
            .map(|m| (m.surface, m.pos))
            .collect()
    }

    #[test]
    fn test_longest_match_segmentation() {
        let analyzer = DictionaryAnalyzer::parse(DICT).unwrap();
        assert_eq!(analyzer.len(), 8);

        assert_eq!(
            tagged(&analyzer, "클라우드인프라를 구축하는"),
            vec![
                ("클라우드".to_string(), PartOfSpeech::Noun),
                ("인프라".to_string(), PartOfSpeech::Noun),
                ("를".to_string(), PartOfSpeech::Particle),
                ("구축".to_string(), PartOfSpeech::Noun),
                ("하".to_string(), PartOfSpeech::Verb),
                ("는".to_string(), PartOfSpeech::Ending),
            ]
        );
    }

    #[test]
    fn test_csv_entries_and_unknown_tail() {
        let analyzer = DictionaryAnalyzer::parse(DICT).unwrap();

        // "운영" from the CSV row; "방안을" is not in the dictionary
        let morphemes = tagged(&analyzer, "운영 방안을");
        assert_eq!(morphemes[0], ("운영".to_string(), PartOfSpeech::Noun));
        assert!(morphemes.contains(&("방안".to_string(), PartOfSpeech::Noun)));
    }

    #[test]
    fn test_rejects_bad_dictionaries() {
        assert!(DictionaryAnalyzer::parse("# only comments\n\n").is_err());

        let err = DictionaryAnalyzer::parse("클라우드\tNNG\n인프라,NNG\n")
            .err()
            .unwrap();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(DICT.as_bytes()).unwrap();

        let analyzer = DictionaryAnalyzer::load(file.path()).unwrap();
        assert!(!analyzer.is_empty());
        assert!(DictionaryAnalyzer::load(Path::new("/nonexistent/ko.dic")).is_err());
    }
}
