use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::utils::math::vector::SpVec;
use crate::vectorizer::token::TokenFrequency;

/// Token dimension sample.
/// Maps each distinct token to a stable column, assigned in order of first
/// occurrence across the corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    tokens: IndexSet<String>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self { tokens: IndexSet::new() }
    }

    /// Collect the distinct tokens of every document, in order.
    pub fn from_docs(docs: &[TokenFrequency]) -> Self {
        let mut vocab = Self::new();
        for doc in docs {
            for (token, _) in doc.iter() {
                vocab.insert(token);
            }
        }
        vocab
    }

    /// Insert a token, returning its column.
    pub fn insert(&mut self, token: &str) -> usize {
        match self.tokens.get_index_of(token) {
            Some(idx) => idx,
            None => self.tokens.insert_full(token.to_string()).0,
        }
    }

    #[inline]
    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.tokens.get_index_of(token)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Raw count vector of `freq` over this vocabulary.
    /// Tokens outside the vocabulary are ignored.
    pub fn counts(&self, freq: &TokenFrequency) -> SpVec<u32> {
        SpVec::from_pairs(
            freq.iter()
                .filter_map(|(token, count)| self.index_of(token).map(|idx| (idx, count))),
        )
    }

    /// Tokens sorted alphabetically (inspection output).
    pub fn sorted_tokens(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.tokens.iter().map(String::as_str).collect();
        tokens.sort_unstable();
        tokens
    }
}

/// Number of documents containing each column.
pub fn doc_freqs(vectors: &[SpVec<u32>], dims: usize) -> Vec<u64> {
    let mut df = vec![0u64; dims];
    for vec in vectors {
        for (idx, _) in vec.raw_iter() {
            df[idx] += 1;
        }
    }
    df
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_follow_first_occurrence() {
        let docs = vec![
            TokenFrequency::from_tokens(&["train", "model"]),
            TokenFrequency::from_tokens(&["start", "model", "chatbot"]),
        ];
        let vocab = Vocabulary::from_docs(&docs);
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.index_of("train"), Some(0));
        assert_eq!(vocab.index_of("model"), Some(1));
        assert_eq!(vocab.index_of("chatbot"), Some(3));
        assert_eq!(vocab.index_of("start"), Some(2));
        assert_eq!(vocab.sorted_tokens(), vec!["chatbot", "model", "start", "train"]);
    }

    #[test]
    fn counts_skip_unknown_tokens_and_feed_doc_freqs() {
        let docs = vec![
            TokenFrequency::from_tokens(&["a1", "b1", "a1"]),
            TokenFrequency::from_tokens(&["b1"]),
        ];
        let vocab = Vocabulary::from_docs(&docs);
        let vectors: Vec<SpVec<u32>> = docs.iter().map(|d| vocab.counts(d)).collect();
        assert_eq!(vectors[0].get(0), Some(2));

        let query = TokenFrequency::from_tokens(&["zz", "b1"]);
        let q = vocab.counts(&query);
        assert_eq!(q.raw_iter().collect::<Vec<_>>(), vec![(1, 1)]);

        assert_eq!(doc_freqs(&vectors, vocab.len()), vec![1, 2]);
    }
}
