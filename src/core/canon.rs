//! Contestant name canonicalization against a class roster.

use unicode_normalization::UnicodeNormalization;

/// Minimum similarity for a fuzzy roster match.
pub const FUZZY_CUTOFF: f64 = 0.88;

const STRAIGHT_QUOTE: char = '\'';
const CURLY_QUOTE: char = '\u{2019}';

/// NFKC-normalizes and trims a raw name.
pub fn normalize_name(raw: &str) -> String {
    raw.nfkc().collect::<String>().trim().to_string()
}

/// Maps free-text spellings onto the names of one weight-class roster.
#[derive(Debug, Clone, Default)]
pub struct NameCanonicalizer {
    names: Vec<String>,
}

impl NameCanonicalizer {
    /// Builds a canonicalizer over roster names. Order of `names` does not matter.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    /// Resolves `raw` to a roster name, or returns it normalized as a new identity.
    pub fn canonicalize(&self, raw: &str) -> String {
        let normalized = normalize_name(raw);
        if normalized.is_empty() || self.names.is_empty() {
            return normalized;
        }

        if self.names.binary_search(&normalized).is_ok() {
            return normalized;
        }

        let lowered = normalized.to_lowercase();
        if let Some(name) = self.names.iter().find(|n| n.to_lowercase() == lowered) {
            return name.clone();
        }

        for (from, to) in [(CURLY_QUOTE, STRAIGHT_QUOTE), (STRAIGHT_QUOTE, CURLY_QUOTE)] {
            let swapped = normalized.replace(from, &to.to_string());
            if swapped != normalized && self.names.binary_search(&swapped).is_ok() {
                return swapped;
            }
        }

        self.closest(&normalized).unwrap_or(normalized)
    }

    fn closest(&self, normalized: &str) -> Option<String> {
        let mut best: Option<(&String, f64)> = None;
        for name in &self.names {
            let score = strsim::normalized_damerau_levenshtein(normalized, name);
            if score < FUZZY_CUTOFF {
                continue;
            }
            // strictly greater keeps the first name in sort order on ties
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((name, score));
            }
        }
        best.map(|(name, _)| name.clone())
    }
}

/// Canonicalizes one name against a roster slice.
pub fn canonicalize_name<S: AsRef<str>>(raw: &str, roster: &[S]) -> String {
    NameCanonicalizer::new(roster).canonicalize(raw)
}
