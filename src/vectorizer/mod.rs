pub mod corpus;
pub mod evaluate;
pub mod serde;
pub mod tfidf;
pub mod token;
pub mod vocabulary;

use std::fmt;
use std::str::FromStr;

use ::serde::{Deserialize, Serialize};
use indexmap::IndexSet;
use tracing::info;

use crate::config::{Bm25Params, RetrievalConfig};
use crate::error::{Error, Result};
use crate::utils::math::vector::SpVec;
use crate::vectorizer::corpus::Corpus;
use crate::vectorizer::tfidf::{tfidf_vec, IdfEngine, SmoothIdf};
use crate::vectorizer::token::{normalize, StopwordMode, TokenFrequency};
use crate::vectorizer::vocabulary::{doc_freqs, Vocabulary};

/// Retrieval method.
/// The set is closed; build and score dispatch on it with a `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    /// cosine over idf-weighted, unit-length term vectors
    Tfidf,
    /// cosine over raw term counts
    Bow,
    /// Okapi BM25 relevance, unbounded above
    Bm25,
    /// Jaccard overlap of token sets
    Boolean,
}

impl RetrievalMethod {
    /// Every method, in name order.
    pub const ALL: [RetrievalMethod; 4] = [
        RetrievalMethod::Bm25,
        RetrievalMethod::Boolean,
        RetrievalMethod::Bow,
        RetrievalMethod::Tfidf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMethod::Tfidf => "tfidf",
            RetrievalMethod::Bow => "bow",
            RetrievalMethod::Bm25 => "bm25",
            RetrievalMethod::Boolean => "boolean",
        }
    }

    /// true if scores are bounded to [0, 1]
    pub fn is_normalized(&self) -> bool {
        !matches!(self, RetrievalMethod::Bm25)
    }
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tfidf" => Ok(RetrievalMethod::Tfidf),
            "bow" => Ok(RetrievalMethod::Bow),
            "bm25" => Ok(RetrievalMethod::Bm25),
            "boolean" => Ok(RetrievalMethod::Boolean),
            _ => Err(Error::UnknownMethod(s.to_string())),
        }
    }
}

/// TF-IDF statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfIdfIndex {
    pub vocabulary: Vocabulary,
    /// idf per vocabulary column
    pub idf: Vec<f64>,
    /// unit-length weighted vector per record
    pub vectors: Vec<SpVec<f64>>,
}

/// Bag-of-Words statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowIndex {
    pub vocabulary: Vocabulary,
    /// raw count vector per record
    pub vectors: Vec<SpVec<u32>>,
}

/// BM25 statistics. Weighting happens at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bm25Index {
    pub vocabulary: Vocabulary,
    pub term_freqs: Vec<SpVec<u32>>,
    /// token count per record
    pub doc_lengths: Vec<u64>,
    pub avg_doc_length: f64,
    /// documents containing each vocabulary column
    pub doc_freqs: Vec<u64>,
    pub doc_num: u64,
    pub params: Bm25Params,
}

/// Boolean statistics: distinct tokens per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanIndex {
    pub token_sets: Vec<IndexSet<String>>,
}

/// Method-specific statistics of an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MethodIndex {
    Tfidf(TfIdfIndex),
    Bow(BowIndex),
    Bm25(Bm25Index),
    Boolean(BooleanIndex),
}

impl MethodIndex {
    pub fn method(&self) -> RetrievalMethod {
        match self {
            MethodIndex::Tfidf(_) => RetrievalMethod::Tfidf,
            MethodIndex::Bow(_) => RetrievalMethod::Bow,
            MethodIndex::Bm25(_) => RetrievalMethod::Bm25,
            MethodIndex::Boolean(_) => RetrievalMethod::Boolean,
        }
    }

    /// number of per-record entries held
    pub fn doc_num(&self) -> usize {
        match self {
            MethodIndex::Tfidf(index) => index.vectors.len(),
            MethodIndex::Bow(index) => index.vectors.len(),
            MethodIndex::Bm25(index) => index.term_freqs.len(),
            MethodIndex::Boolean(index) => index.token_sets.len(),
        }
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        match self {
            MethodIndex::Tfidf(index) => Some(&index.vocabulary),
            MethodIndex::Bow(index) => Some(&index.vocabulary),
            MethodIndex::Bm25(index) => Some(&index.vocabulary),
            MethodIndex::Boolean(_) => None,
        }
    }
}

/// Built retrieval index.
///
/// Holds the aligned corpus, the method statistics and the normalization
/// settings used at build time. Read-only once built; rebuild to change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexArtifact {
    pub format_version: u32,
    pub method: RetrievalMethod,
    /// default threshold chosen at training time
    pub threshold: f64,
    /// stopword handling shared by build and query
    pub stopwords: StopwordMode,
    pub corpus: Corpus,
    pub index: MethodIndex,
}

impl IndexArtifact {
    #[inline]
    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    /// Normalize text exactly as the patterns were normalized.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        normalize(text, self.stopwords)
    }

    /// Config equivalent to the one this artifact was built with.
    pub fn config(&self) -> RetrievalConfig {
        let bm25 = match &self.index {
            MethodIndex::Bm25(index) => index.params,
            _ => Bm25Params::default(),
        };
        RetrievalConfig {
            threshold: self.threshold,
            bm25,
            stopwords: self.stopwords,
        }
    }

    /// All vocabulary tokens sorted, or the distinct tokens for Boolean.
    pub fn words(&self) -> Vec<String> {
        match &self.index {
            MethodIndex::Boolean(index) => {
                let mut words: Vec<String> = index.token_sets.iter().flatten().cloned().collect();
                words.sort_unstable();
                words.dedup();
                words
            }
            other => other
                .vocabulary()
                .map(|v| v.sorted_tokens().into_iter().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }
}

/// Build an index artifact for `method` over `corpus`.
///
/// Fails with `EmptyCorpus` when there is nothing to index. The artifact is
/// returned fully built or not at all.
pub fn build(corpus: &Corpus, method: RetrievalMethod, config: &RetrievalConfig) -> Result<IndexArtifact> {
    if corpus.is_empty() {
        return Err(Error::EmptyCorpus);
    }
    config.validate()?;

    let docs: Vec<TokenFrequency> = corpus
        .iter()
        .map(|record| TokenFrequency::from_tokens(&normalize(&record.pattern, config.stopwords)))
        .collect();
    let doc_num = docs.len() as u64;

    let index = match method {
        RetrievalMethod::Tfidf => {
            let vocabulary = Vocabulary::from_docs(&docs);
            let counts: Vec<SpVec<u32>> = docs.iter().map(|d| vocabulary.counts(d)).collect();
            let idf = SmoothIdf::idf_vec(&doc_freqs(&counts, vocabulary.len()), doc_num);
            let vectors = counts.iter().map(|c| tfidf_vec(c, &idf)).collect();
            MethodIndex::Tfidf(TfIdfIndex { vocabulary, idf, vectors })
        }
        RetrievalMethod::Bow => {
            let vocabulary = Vocabulary::from_docs(&docs);
            let vectors = docs.iter().map(|d| vocabulary.counts(d)).collect();
            MethodIndex::Bow(BowIndex { vocabulary, vectors })
        }
        RetrievalMethod::Bm25 => {
            let vocabulary = Vocabulary::from_docs(&docs);
            let term_freqs: Vec<SpVec<u32>> = docs.iter().map(|d| vocabulary.counts(d)).collect();
            let doc_lengths: Vec<u64> = docs.iter().map(TokenFrequency::token_sum).collect();
            let avg_doc_length = doc_lengths.iter().sum::<u64>() as f64 / doc_num as f64;
            let doc_freqs = doc_freqs(&term_freqs, vocabulary.len());
            MethodIndex::Bm25(Bm25Index {
                vocabulary,
                term_freqs,
                doc_lengths,
                avg_doc_length,
                doc_freqs,
                doc_num,
                params: config.bm25,
            })
        }
        RetrievalMethod::Boolean => {
            let token_sets = docs
                .iter()
                .map(|d| d.iter().map(|(token, _)| token.to_string()).collect())
                .collect();
            MethodIndex::Boolean(BooleanIndex { token_sets })
        }
    };

    info!(
        method = %method,
        records = corpus.len(),
        vocabulary = index.vocabulary().map_or(0, Vocabulary::len),
        "index built"
    );

    Ok(IndexArtifact {
        format_version: serde::FORMAT_VERSION,
        method,
        threshold: config.threshold,
        stopwords: config.stopwords,
        corpus: corpus.clone(),
        index,
    })
}
