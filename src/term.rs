use crate::stem::Stemmer;

/// Joins sorted stems into a term key.
pub const KEY_SEPARATOR: &str = ",";

/// Leads every literal key. Stems never start with it, so a literal term
/// and a word term can not end up under the same key.
pub const LITERAL_MARKER: char = '=';

/// Canonical identifier for a taught term.
///
/// Word terms are keyed by their sorted, deduplicated stems so matching
/// ignores word order. Terms without any word-like token fall back to the
/// lowercased literal text, behind [`LITERAL_MARKER`], and have size 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermKey {
    pub key: String,
    pub stems: Vec<String>,
}

impl TermKey {
    pub fn derive(stemmer: &dyn Stemmer, term: &str) -> Self {
        let stems = sorted_stems(stemmer, term);
        if stems.is_empty() {
            Self {
                key: format!("{LITERAL_MARKER}{}", term.trim().to_lowercase()),
                stems,
            }
        } else {
            Self {
                key: stems.join(KEY_SEPARATOR),
                stems,
            }
        }
    }

    pub fn size(&self) -> usize {
        self.stems.len()
    }
}

/// The text a literal key matches on, or `None` for a stem key.
pub fn literal_text(key: &str) -> Option<&str> {
    key.strip_prefix(LITERAL_MARKER)
}

/// Lowercase, stem, sort and dedup. Keys and match input must both go
/// through here so their n-grams line up.
pub fn sorted_stems(stemmer: &dyn Stemmer, text: &str) -> Vec<String> {
    let mut stems = stemmer.tokenize_and_stem(&text.to_lowercase());
    stems.sort();
    stems.dedup();
    stems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stem::PorterStemmer;

    #[test]
    fn word_terms_are_sorted_stems() {
        let stemmer = PorterStemmer::new();
        let key = TermKey::derive(&stemmer, "Good Morning");
        assert_eq!(key.key, "good,morn");
        assert_eq!(key.size(), 2);

        let reversed = TermKey::derive(&stemmer, "morning good");
        assert_eq!(reversed, key);
    }

    #[test]
    fn repeated_words_collapse() {
        let stemmer = PorterStemmer::new();
        let key = TermKey::derive(&stemmer, "cats cat CATS");
        assert_eq!(key.key, "cat");
        assert_eq!(key.stems, vec!["cat"]);
    }

    #[test]
    fn non_word_terms_use_literal_text() {
        let stemmer = PorterStemmer::new();
        let key = TermKey::derive(&stemmer, " :-D ");
        assert_eq!(key.key, "=:-d");
        assert_eq!(key.size(), 0);
        assert_eq!(literal_text(&key.key), Some(":-d"));
    }

    #[test]
    fn literal_and_word_keys_never_collide() {
        let stemmer = PorterStemmer::new();
        // "on" is a stop word, so it is taught literally; "ons" stems to "on".
        let literal = TermKey::derive(&stemmer, "on");
        let word = TermKey::derive(&stemmer, "ons");
        assert_eq!(literal.size(), 0);
        assert_eq!(word.key, "on");
        assert_ne!(literal.key, word.key);
        assert_eq!(literal_text(&word.key), None);
    }
}
