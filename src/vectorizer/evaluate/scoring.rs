use indexmap::IndexSet;

use crate::error::{Error, Result};
use crate::vectorizer::corpus::Record;
use crate::vectorizer::tfidf::{bm25_term, tfidf_vec, Bm25Idf, IdfEngine};
use crate::vectorizer::token::TokenFrequency;
use crate::vectorizer::{Bm25Index, BooleanIndex, BowIndex, IndexArtifact, MethodIndex, RetrievalMethod, TfIdfIndex};

/// Best record for one query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult<'a> {
    /// position of the record in the artifact corpus
    pub index: usize,
    pub record: &'a Record,
    pub score: f64,
    pub method: RetrievalMethod,
}

/// Score `query` against every record and return the best one.
///
/// Ties go to the lowest record index. Fails with `EmptyIndex` when the
/// artifact holds no records, which only happens for externally loaded
/// artifacts.
pub fn score<'a>(artifact: &'a IndexArtifact, query: &str) -> Result<MatchResult<'a>> {
    if artifact.is_empty() {
        return Err(Error::EmptyIndex);
    }
    let tokens = artifact.normalize(query);
    let scores = scores(artifact, &tokens);
    let (index, score) = best_match(&scores).ok_or(Error::EmptyIndex)?;
    let record = artifact.corpus.get(index).ok_or(Error::EmptyIndex)?;
    Ok(MatchResult {
        index,
        record,
        score,
        method: artifact.method,
    })
}

/// Per-record scores for already-normalized query tokens, aligned with the
/// artifact corpus.
pub fn scores<T>(artifact: &IndexArtifact, tokens: &[T]) -> Vec<f64>
where
    T: AsRef<str>,
{
    let query = TokenFrequency::from_tokens(tokens);
    match &artifact.index {
        MethodIndex::Tfidf(index) => scoring_tfidf(index, &query),
        MethodIndex::Bow(index) => scoring_bow(index, &query),
        MethodIndex::Bm25(index) => scoring_bm25(index, &query),
        MethodIndex::Boolean(index) => scoring_boolean(index, &query),
    }
}

/// Highest score, earliest index on ties. NaN never wins.
pub fn best_match(scores: &[f64]) -> Option<(usize, f64)> {
    best_match_where(scores, |_| true)
}

/// Like `best_match`, restricted to indices accepted by `keep`.
pub fn best_match_where<F>(scores: &[f64], keep: F) -> Option<(usize, f64)>
where
    F: Fn(usize) -> bool,
{
    let mut best: Option<(usize, f64)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if score.is_nan() || !keep(idx) {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best
}

/// Cosine similarity, reduced to a dot product since both sides are unit length.
fn scoring_tfidf(index: &TfIdfIndex, query: &TokenFrequency) -> Vec<f64> {
    let q = tfidf_vec(&index.vocabulary.counts(query), &index.idf);
    index
        .vectors
        .iter()
        .map(|doc| if q.is_empty() { 0.0 } else { q.dot(doc).clamp(0.0, 1.0) })
        .collect()
}

/// Cosine similarity over raw counts.
fn scoring_bow(index: &BowIndex, query: &TokenFrequency) -> Vec<f64> {
    let q = index.vocabulary.counts(query);
    index.vectors.iter().map(|doc| q.cosine(doc)).collect()
}

/// Okapi BM25. A token repeated in the query contributes once per occurrence.
fn scoring_bm25(index: &Bm25Index, query: &TokenFrequency) -> Vec<f64> {
    if index.avg_doc_length <= 0.0 {
        return vec![0.0; index.term_freqs.len()];
    }
    // (column, idf, query count) for the query tokens the corpus knows about
    let terms: Vec<(usize, f64, f64)> = query
        .iter()
        .filter_map(|(token, qf)| {
            let col = index.vocabulary.index_of(token)?;
            let df = index.doc_freqs.get(col).copied().unwrap_or(0);
            Some((col, Bm25Idf::idf(index.doc_num, df), qf as f64))
        })
        .collect();

    index
        .term_freqs
        .iter()
        .zip(index.doc_lengths.iter())
        .map(|(tf_vec, &doc_len)| {
            terms
                .iter()
                .filter_map(|&(col, idf, qf)| {
                    let tf = tf_vec.get(col)?;
                    Some(qf * bm25_term(tf as f64, idf, doc_len as f64, index.avg_doc_length, &index.params))
                })
                .sum::<f64>()
        })
        .collect()
}

/// Jaccard similarity |Q ∩ D| / |Q ∪ D|.
fn scoring_boolean(index: &BooleanIndex, query: &TokenFrequency) -> Vec<f64> {
    let q: IndexSet<&str> = query.iter().map(|(token, _)| token).collect();
    index
        .token_sets
        .iter()
        .map(|doc| {
            let shared = q.iter().filter(|token| doc.contains(**token)).count();
            let union = q.len() + doc.len() - shared;
            if union == 0 {
                0.0
            } else {
                shared as f64 / union as f64
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::vectorizer::build;
    use crate::vectorizer::corpus::Corpus;

    fn faq() -> Corpus {
        Corpus::from_records(vec![
            Record::new("how to train model", "Run training script", "run_training"),
            Record::new("how to start chatbot", "Run chat script", "start_chat"),
            Record::new("what is python programming", "A language", "python"),
            Record::new("weather forecast tomorrow rain", "Check the forecast", "weather"),
            Record::new("python programming tutorial for beginners", "Try the docs", "python"),
        ])
    }

    fn build_all(corpus: &Corpus) -> Vec<IndexArtifact> {
        RetrievalMethod::ALL
            .iter()
            .map(|m| build(corpus, *m, &RetrievalConfig::default()).unwrap())
            .collect()
    }

    #[test]
    fn bow_prefers_shared_tokens() {
        let corpus = Corpus::from_records(faq().records()[..2].to_vec());
        let artifact = build(&corpus, RetrievalMethod::Bow, &RetrievalConfig::default()).unwrap();
        let tokens = artifact.normalize("how do I train the model");
        let s = scores(&artifact, &tokens);
        assert!(s[0] > s[1]);
        assert_eq!(s[1], 0.0);

        let best = score(&artifact, "how do I train the model").unwrap();
        assert_eq!(best.index, 0);
        assert_eq!(best.record.answer, "Run training script");
        assert_eq!(best.method, RetrievalMethod::Bow);
    }

    #[test]
    fn score_ranges_hold_for_every_method() {
        let corpus = faq();
        let queries = [
            "python",
            "python python programming",
            "will it rain tomorrow",
            "train chatbot model python weather",
            "nothing matches here",
            "",
        ];
        for artifact in build_all(&corpus) {
            for q in queries {
                let tokens = artifact.normalize(q);
                for s in scores(&artifact, &tokens) {
                    assert!(s >= 0.0, "{} gave {s} for {q:?}", artifact.method);
                    if artifact.method.is_normalized() {
                        assert!(s <= 1.0, "{} gave {s} for {q:?}", artifact.method);
                    }
                }
            }
        }
    }

    #[test]
    fn self_match_dominates() {
        let corpus = faq();
        for artifact in build_all(&corpus) {
            for (i, record) in corpus.iter().enumerate() {
                let tokens = artifact.normalize(&record.pattern);
                let s = scores(&artifact, &tokens);
                let best = score(&artifact, &record.pattern).unwrap();
                assert_eq!(best.index, i, "{} on {:?}", artifact.method, record.pattern);
                assert!(s.iter().all(|other| *other <= s[i]));
            }
        }
    }

    #[test]
    fn identical_token_sets_tie_to_lowest_index() {
        let corpus = Corpus::from_records(vec![
            Record::new("reset my password", "first", "a"),
            Record::new("password reset my", "second", "b"),
            Record::new("delete my account", "third", "c"),
        ]);
        for artifact in build_all(&corpus) {
            let best = score(&artifact, "reset password").unwrap();
            assert_eq!(best.index, 0, "{}", artifact.method);
            assert_eq!(best.record.answer, "first");
        }
    }

    #[test]
    fn unseen_query_scores_zero() {
        let corpus = faq();
        for artifact in build_all(&corpus) {
            let best = score(&artifact, "zzz qqq").unwrap();
            assert_eq!(best.score, 0.0, "{}", artifact.method);
            assert_eq!(best.index, 0);
        }
    }

    #[test]
    fn tfidf_identical_text_scores_one() {
        let artifact = build(&faq(), RetrievalMethod::Tfidf, &RetrievalConfig::default()).unwrap();
        let best = score(&artifact, "what is python programming").unwrap();
        assert!((best.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn boolean_is_jaccard() {
        let corpus = Corpus::from_records(vec![Record::new("train model fast", "a", "t")]);
        let artifact = build(&corpus, RetrievalMethod::Boolean, &RetrievalConfig::default()).unwrap();
        // {train, model, slow} vs {train, model, fast}: 2 / 4
        let s = scores(&artifact, &["train", "model", "slow"]);
        assert_eq!(s, vec![0.5]);
        let s: Vec<f64> = scores::<&str>(&artifact, &[]);
        assert_eq!(s, vec![0.0]);
    }

    #[test]
    fn bm25_matches_hand_computation() {
        let corpus = Corpus::from_records(vec![
            Record::new("train model", "a", "t"),
            Record::new("start chatbot now", "b", "s"),
        ]);
        let config = RetrievalConfig::default();
        let artifact = build(&corpus, RetrievalMethod::Bm25, &config).unwrap();
        let s = scores(&artifact, &["train"]);

        let (k1, b) = (config.bm25.k1, config.bm25.b);
        let idf = ((2.0f64 - 1.0 + 0.5) / (1.0 + 0.5) + 1.0).ln();
        let avg = 2.5;
        let expected = idf * (1.0 * (k1 + 1.0)) / (1.0 + k1 * (1.0 - b + b * 2.0 / avg));
        assert!((s[0] - expected).abs() < 1e-12);
        assert_eq!(s[1], 0.0);

        // repeated query tokens count per occurrence
        let twice = scores(&artifact, &["train", "train"]);
        assert!((twice[0] - 2.0 * expected).abs() < 1e-12);
    }

    #[test]
    fn best_match_where_skips_excluded_and_nan() {
        let s = [0.9, f64::NAN, 0.9, 0.3];
        assert_eq!(best_match(&s), Some((0, 0.9)));
        assert_eq!(best_match_where(&s, |i| i != 0), Some((2, 0.9)));
        assert_eq!(best_match_where(&s, |i| i == 1), None);
        assert_eq!(best_match(&[]), None);
    }

    #[test]
    fn empty_artifact_is_an_error() {
        let mut artifact = build(&faq(), RetrievalMethod::Boolean, &RetrievalConfig::default()).unwrap();
        artifact.corpus = Corpus::new();
        artifact.index = MethodIndex::Boolean(BooleanIndex { token_sets: Vec::new() });
        assert!(matches!(score(&artifact, "python"), Err(Error::EmptyIndex)));
    }
}
