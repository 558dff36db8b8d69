use rust_stemmers::Algorithm;

/// Turns raw text into an ordered sequence of normalized stems.
pub trait Stemmer: Send + Sync {
    fn tokenize_and_stem(&self, text: &str) -> Vec<String>;
}

/// English stemmer: word tokenizer, stop-word filter, Snowball English stems.
pub struct PorterStemmer {
    inner: rust_stemmers::Stemmer,
}

impl PorterStemmer {
    pub fn new() -> Self {
        Self {
            inner: rust_stemmers::Stemmer::create(Algorithm::English),
        }
    }
}

impl Default for PorterStemmer {
    fn default() -> Self {
        Self::new()
    }
}

impl Stemmer for PorterStemmer {
    fn tokenize_and_stem(&self, text: &str) -> Vec<String> {
        tokenize(text)
            .filter(|token| !is_stop_word(token))
            .map(|token| self.inner.stem(&token).into_owned())
            .collect()
    }
}

/// Split on anything that is not a word character and lowercase the pieces.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

// Sorted for binary search.
const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "all", "also", "am", "an", "and", "another", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "came", "can", "cannot", "come", "could", "did", "do", "does", "doing", "during",
    "each", "few", "for", "from", "further", "get", "got", "had", "has", "have", "he", "her",
    "here", "him", "himself", "his", "how", "if", "in", "into", "is", "it", "its", "itself",
    "like", "make", "many", "me", "might", "more", "most", "much", "must", "my", "myself",
    "never", "now", "of", "on", "only", "or", "other", "our", "ours", "ourselves", "out",
    "over", "own", "said", "same", "see", "should", "since", "so", "some", "still", "such",
    "take", "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "way", "we", "well", "were", "what", "when", "where", "which", "while", "who",
    "whom", "why", "with", "would", "you", "your", "yours", "yourself",
];

/// Stop words plus every single ASCII letter, digit, and underscore.
pub fn is_stop_word(token: &str) -> bool {
    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() || c == '_' {
            return true;
        }
    }
    STOP_WORDS.binary_search(&token).is_ok()
}
