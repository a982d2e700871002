use crate::config::Bm25Params;
use crate::utils::math::vector::SpVec;

/// IDF calculation engine.
///
/// TF-IDF and BM25 weight rare tokens with different IDF curves; each
/// implementation supplies one. `idf` must never be negative.
pub trait IdfEngine {
    /// * `doc_num` - number of documents in the corpus
    /// * `doc_freq` - number of documents containing the token
    fn idf(doc_num: u64, doc_freq: u64) -> f64;

    fn idf_vec(doc_freqs: &[u64], doc_num: u64) -> Vec<f64> {
        doc_freqs.iter().map(|&df| Self::idf(doc_num, df)).collect()
    }
}

/// Smoothed IDF used by TF-IDF.
/// idf = ln((N + 1) / (df + 1)) + 1, always >= 1
#[derive(Debug)]
pub struct SmoothIdf;

impl IdfEngine for SmoothIdf {
    #[inline]
    fn idf(doc_num: u64, doc_freq: u64) -> f64 {
        ((doc_num as f64 + 1.0) / (doc_freq as f64 + 1.0)).ln() + 1.0
    }
}

/// Okapi BM25 IDF.
/// idf = ln((N - df + 0.5) / (df + 0.5) + 1), clipped at 0
#[derive(Debug)]
pub struct Bm25Idf;

impl IdfEngine for Bm25Idf {
    #[inline]
    fn idf(doc_num: u64, doc_freq: u64) -> f64 {
        let n = doc_num as f64;
        let df = doc_freq as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln().max(0.0)
    }
}

/// Weight raw counts by `idf` and scale to unit length, so cosine similarity
/// between two such vectors is a plain dot product.
pub fn tfidf_vec(counts: &SpVec<u32>, idf: &[f64]) -> SpVec<f64> {
    let weighted = SpVec::from_pairs(
        counts
            .raw_iter()
            .map(|(idx, tf)| (idx, tf as f64 * idf.get(idx).copied().unwrap_or(0.0))),
    );
    weighted.l2_normalized()
}

/// BM25 contribution of one token present in a document.
///
/// idf × tf(k1 + 1) / (tf + k1(1 − b + b·len/avg_len))
#[inline]
pub fn bm25_term(tf: f64, idf: f64, doc_len: f64, avg_doc_len: f64, params: &Bm25Params) -> f64 {
    let Bm25Params { k1, b } = *params;
    let denom = tf + k1 * (1.0 - b + b * (doc_len / avg_doc_len));
    if denom <= 0.0 {
        return 0.0;
    }
    idf * (tf * (k1 + 1.0)) / denom
}
