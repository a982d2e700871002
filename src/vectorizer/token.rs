use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Lightweight English stopwords.
pub const EN_STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "am", "was", "were", "to", "for", "of", "and", "or", "in", "on",
    "at", "how", "what",
];

/// Lightweight Russian stopwords.
pub const RU_STOPWORDS: &[&str] = &["и", "в", "на", "с", "по", "о", "что", "как", "это", "для", "к", "из"];

/// Which stopword set the normalizer drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopwordMode {
    /// Russian set when the text contains Cyrillic, English set otherwise
    #[default]
    Detect,
    /// English and Russian sets together
    Union,
    /// keep every token
    Keep,
}

impl StopwordMode {
    fn is_stopword(&self, token: &str, cyrillic: bool) -> bool {
        match self {
            StopwordMode::Detect if cyrillic => RU_STOPWORDS.contains(&token),
            StopwordMode::Detect => EN_STOPWORDS.contains(&token),
            StopwordMode::Union => EN_STOPWORDS.contains(&token) || RU_STOPWORDS.contains(&token),
            StopwordMode::Keep => false,
        }
    }
}

/// true if any character is a Cyrillic letter
pub fn contains_cyrillic(text: &str) -> bool {
    text.chars()
        .any(|c| matches!(c, '\u{0400}'..='\u{04FF}') && c.is_alphabetic())
}

/// Lowercase and split on every non-alphanumeric character.
/// Works for any script `char::is_alphanumeric` knows about.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| !tok.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokenize and drop stopwords.
///
/// Build and query must go through the same `mode`; artifacts record the
/// mode they were built with for that reason.
pub fn normalize(text: &str, mode: StopwordMode) -> Vec<String> {
    let cyrillic = mode == StopwordMode::Detect && contains_cyrillic(text);
    tokenize(text)
        .into_iter()
        .filter(|tok| !mode.is_stopword(tok, cyrillic))
        .collect()
}

/// Token occurrence counts for one pattern or query.
/// Tokens keep the order of their first occurrence.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TokenFrequency {
    #[serde(with = "indexmap::map::serde_seq")]
    token_count: IndexMap<String, u32>,
    total_token_count: u64,
}

impl TokenFrequency {
    pub fn new() -> Self {
        TokenFrequency {
            token_count: IndexMap::new(),
            total_token_count: 0,
        }
    }

    /// Count every token of `tokens`.
    pub fn from_tokens<T>(tokens: &[T]) -> Self
    where
        T: AsRef<str>,
    {
        let mut freq = Self::new();
        freq.add_tokens(tokens);
        freq
    }

    #[inline]
    pub fn add_token(&mut self, token: &str) -> &mut Self {
        let count = self.token_count.entry(token.to_string()).or_insert(0);
        *count += 1;
        self.total_token_count += 1;
        self
    }

    #[inline]
    pub fn add_tokens<T>(&mut self, tokens: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        for token in tokens {
            self.add_token(token.as_ref());
        }
        self
    }

    /// total number of tokens added, duplicates included
    #[inline]
    pub fn token_sum(&self) -> u64 {
        self.total_token_count
    }

    /// `(token, count)` in first-occurrence order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.token_count.iter().map(|(tok, &count)| (tok.as_str(), count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_punctuation_and_lowercases() {
        assert_eq!(tokenize("Hello, World! v2.0"), vec!["hello", "world", "v2", "0"]);
        assert!(tokenize("").is_empty());
        assert!(tokenize(" ?! ").is_empty());
    }

    #[test]
    fn normalize_drops_english_stopwords() {
        let tokens = normalize("How to train the model?", StopwordMode::Detect);
        assert_eq!(tokens, vec!["train", "model"]);
    }

    #[test]
    fn normalize_handles_cyrillic() {
        let tokens = normalize("Как запустить бота и что это?", StopwordMode::Detect);
        assert_eq!(tokens, vec!["запустить", "бота"]);
    }

    #[test]
    fn detect_mode_keeps_english_stopwords_in_cyrillic_text() {
        // Cyrillic text switches to the Russian set only
        let tokens = normalize("the бот", StopwordMode::Detect);
        assert_eq!(tokens, vec!["the", "бот"]);
        let tokens = normalize("the бот", StopwordMode::Union);
        assert_eq!(tokens, vec!["бот"]);
    }

    #[test]
    fn keep_mode_retains_everything() {
        let tokens = normalize("what is it", StopwordMode::Keep);
        assert_eq!(tokens, vec!["what", "is", "it"]);
    }

    #[test]
    fn normalize_is_deterministic() {
        let text = "What is BM25, and how does Okapi weighting work? Что такое BM25?";
        for mode in [StopwordMode::Detect, StopwordMode::Union, StopwordMode::Keep] {
            assert_eq!(normalize(text, mode), normalize(text, mode));
        }
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(normalize("", StopwordMode::Detect).is_empty());
        assert!(normalize("the a an", StopwordMode::Detect).is_empty());
    }

    #[test]
    fn token_frequency_counts_duplicates() {
        let freq = TokenFrequency::from_tokens(&["rust", "fast", "rust"]);
        assert_eq!(freq.token_sum(), 3);
        assert_eq!(freq.iter().collect::<Vec<_>>(), vec![("rust", 2), ("fast", 1)]);
    }
}
