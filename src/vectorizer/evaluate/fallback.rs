use crate::error::{Error, Result};
use crate::vectorizer::evaluate::scoring::{best_match_where, scores};
use crate::vectorizer::IndexArtifact;

/// Reply used when nothing clears the threshold.
pub const FALLBACK_MESSAGE: &str = "I am not sure about that yet. Please rephrase your question.";

/// Outcome of the fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// surface the matched record's answer
    Answer,
    /// reply with the fixed fallback message
    Fallback,
}

impl Decision {
    #[inline]
    pub fn is_answer(&self) -> bool {
        matches!(self, Decision::Answer)
    }
}

/// Answer when `score >= threshold`, fall back otherwise (NaN included).
#[inline]
pub fn decide(score: f64, threshold: f64) -> Decision {
    if score >= threshold {
        Decision::Answer
    } else {
        Decision::Fallback
    }
}

/// Reply for the chat front end.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub answer: String,
    pub score: f64,
    pub source_url: Option<String>,
    /// index of the matched record, `None` for a fallback
    pub matched: Option<usize>,
}

impl Response {
    fn fallback(score: f64) -> Self {
        Self {
            answer: FALLBACK_MESSAGE.to_string(),
            score,
            source_url: None,
            matched: None,
        }
    }

    #[inline]
    pub fn is_fallback(&self) -> bool {
        self.matched.is_none()
    }
}

/// Answer `query` from the whole corpus.
pub fn respond(artifact: &IndexArtifact, query: &str, threshold: f64) -> Result<Response> {
    respond_in_topic(artifact, query, threshold, None)
}

/// Answer `query` using only records whose topic key equals `topic`.
/// `None` searches every record.
///
/// A query that normalizes to nothing, or a topic with no records, yields
/// the fallback with score 0.
pub fn respond_in_topic(artifact: &IndexArtifact, query: &str, threshold: f64, topic: Option<&str>) -> Result<Response> {
    if artifact.is_empty() {
        return Err(Error::EmptyIndex);
    }
    let tokens = artifact.normalize(query);
    if tokens.is_empty() {
        return Ok(Response::fallback(0.0));
    }

    let scores = scores(artifact, &tokens);
    let records = artifact.corpus.records();
    let best = best_match_where(&scores, |idx| match topic {
        Some(topic) => records[idx].topic_key() == topic,
        None => true,
    });
    let Some((index, score)) = best else {
        return Ok(Response::fallback(0.0));
    };

    match decide(score, threshold) {
        Decision::Answer => {
            let record = &records[index];
            Ok(Response {
                answer: record.answer.clone(),
                score,
                source_url: record.source_url.clone().filter(|url| !url.is_empty()),
                matched: Some(index),
            })
        }
        Decision::Fallback => Ok(Response::fallback(score)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::vectorizer::corpus::{Corpus, Record};
    use crate::vectorizer::{build, RetrievalMethod};

    fn artifact(method: RetrievalMethod) -> IndexArtifact {
        let corpus = Corpus::from_records(vec![
            Record::new("what is python", "A programming language", "web_technology")
                .with_topic("technology")
                .with_source_url("https://www.python.org"),
            Record::new("who won the football match", "The home team", "web_sports").with_topic("sports"),
            Record::new("is python good for sports analytics", "Yes", "web_sports").with_topic("sports"),
        ]);
        build(&corpus, method, &RetrievalConfig::default()).unwrap()
    }

    #[test]
    fn threshold_is_inclusive() {
        let threshold = 0.25;
        assert_eq!(decide(threshold, threshold), Decision::Answer);
        assert_eq!(decide(threshold - 1e-9, threshold), Decision::Fallback);
        assert_eq!(decide(f64::NAN, threshold), Decision::Fallback);
        assert!(decide(1.0, threshold).is_answer());
    }

    #[test]
    fn respond_returns_answer_and_source() {
        let artifact = artifact(RetrievalMethod::Tfidf);
        let reply = respond(&artifact, "What is Python?", 0.25).unwrap();
        assert_eq!(reply.answer, "A programming language");
        assert_eq!(reply.source_url.as_deref(), Some("https://www.python.org"));
        assert_eq!(reply.matched, Some(0));
        assert!(reply.score >= 0.25);
    }

    #[test]
    fn low_scores_fall_back() {
        let artifact = artifact(RetrievalMethod::Boolean);
        let reply = respond(&artifact, "python weather tomorrow rain snow", 0.9).unwrap();
        assert!(reply.is_fallback());
        assert_eq!(reply.answer, FALLBACK_MESSAGE);
        assert_eq!(reply.source_url, None);
        assert!(reply.score > 0.0);
    }

    #[test]
    fn empty_query_falls_back_with_zero_score() {
        let artifact = artifact(RetrievalMethod::Bm25);
        let reply = respond(&artifact, "the a what?", 0.0).unwrap();
        assert!(reply.is_fallback());
        assert_eq!(reply.score, 0.0);
    }

    #[test]
    fn topic_filter_restricts_candidates() {
        let artifact = artifact(RetrievalMethod::Bow);
        let reply = respond_in_topic(&artifact, "python", 0.1, Some("sports")).unwrap();
        assert_eq!(reply.matched, Some(2));

        let reply = respond_in_topic(&artifact, "python", 0.1, Some("cooking")).unwrap();
        assert!(reply.is_fallback());
        assert_eq!(reply.score, 0.0);
    }
}
