/// This crate is the retrieval core of an FAQ chatbot.
/// It matches a user question against stored example questions with one of
/// four methods (TF-IDF, Bag-of-Words, BM25, Boolean) and answers with the
/// best record's response, or a fallback when nothing scores high enough.
pub mod chat;
pub mod config;
pub mod error;
pub mod utils;
pub mod vectorizer;

/// Error type shared by every fallible operation, and its `Result` alias.
pub use error::{Error, Result};

/// Retrieval settings
/// Threshold, BM25 constants and stopword handling. Passed explicitly into
/// `build`; the built artifact remembers them.
///
/// `AppConfig` wraps it with the paths used by the command line front end
/// and is loaded with Figment (defaults, `faq.toml`, `FAQ_*` environment).
pub use config::{validate_threshold, AppConfig, Bm25Params, RetrievalConfig, DEFAULT_THRESHOLD};

/// Index Artifact
/// The built, read-only index for one method.
/// It holds:
/// - The records, in index order
/// - The method statistics (vectors, idf, lengths, token sets)
/// - The normalization settings used at build time
///
/// # Serialization
/// Supported through CBOR (`save` / `load`), validated on load.
pub use vectorizer::{build, IndexArtifact, RetrievalMethod};

/// Corpus and Record
/// A `Record` is one (pattern, answer, tag) triple with an optional topic and
/// source url. A `Corpus` keeps them in order; the position is the record
/// index every method refers to.
pub use vectorizer::corpus::{Corpus, Record};

/// Text normalization shared by build and query.
pub use vectorizer::token::{normalize, StopwordMode, TokenFrequency};

/// Scoring
/// `score` returns the best `MatchResult`, `scores` every per-record score.
/// Ties go to the lowest record index.
pub use vectorizer::evaluate::scoring::{score, scores, MatchResult};

/// Fallback Policy and the chat query interface
pub use vectorizer::evaluate::fallback::{decide, respond, respond_in_topic, Decision, Response, FALLBACK_MESSAGE};

/// Leave-one-pattern-out evaluation
pub use vectorizer::evaluate::holdout::{
    evaluate, evaluate_artifacts, evaluate_methods, write_csv, EvalResult, HoldoutStrategy,
};
