use std::fmt;
use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{validate_threshold, RetrievalConfig};
use crate::error::Result;
use crate::vectorizer::corpus::Corpus;
use crate::vectorizer::evaluate::fallback::decide;
use crate::vectorizer::evaluate::scoring::{best_match, best_match_where, scores};
use crate::vectorizer::{build, IndexArtifact, RetrievalMethod};

/// How the held-out pattern is kept out of the ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HoldoutStrategy {
    /// Statistics come from the full corpus; records sharing the held-out
    /// pattern are skipped when ranking.
    #[default]
    ExcludeAtScoring,
    /// A fresh artifact is built without the held-out pattern for every query.
    Rebuild,
}

/// Ranking result for one held-out record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldoutOutcome {
    /// index of the held-out record
    pub record: usize,
    /// best remaining record and its score, `None` when nothing remains
    pub best: Option<(usize, f64)>,
    /// best remaining record carries the held-out tag
    pub tag_match: bool,
}

/// Query every record with its own pattern, excluding each record with the
/// identical pattern text. Records whose pattern normalizes to nothing are
/// skipped.
pub fn holdout_outcomes(artifact: &IndexArtifact, strategy: HoldoutStrategy) -> Result<Vec<HoldoutOutcome>> {
    let records = artifact.corpus.records();
    let config = artifact.config();

    (0..records.len())
        .into_par_iter()
        .filter_map(|i| {
            let held = &records[i];
            let tokens = artifact.normalize(&held.pattern);
            if tokens.is_empty() {
                debug!(record = i, "skipping pattern without tokens");
                return None;
            }
            let best = match strategy {
                HoldoutStrategy::ExcludeAtScoring => {
                    let scores = scores(artifact, &tokens);
                    Ok(best_match_where(&scores, |j| records[j].pattern != held.pattern))
                }
                HoldoutStrategy::Rebuild => rebuild_without(artifact, &config, i, &tokens),
            };
            Some(best.map(|best| HoldoutOutcome {
                record: i,
                best,
                tag_match: best.is_some_and(|(j, _)| records[j].tag == held.tag),
            }))
        })
        .collect()
}

/// Best match for record `held` over an artifact rebuilt from the other
/// patterns, with indices mapped back to the full corpus.
fn rebuild_without(
    artifact: &IndexArtifact,
    config: &RetrievalConfig,
    held: usize,
    tokens: &[String],
) -> Result<Option<(usize, f64)>> {
    let records = artifact.corpus.records();
    let pattern = &records[held].pattern;
    let kept: Vec<usize> = (0..records.len()).filter(|&j| records[j].pattern != *pattern).collect();
    if kept.is_empty() {
        return Ok(None);
    }
    let rest: Corpus = kept.iter().map(|&j| records[j].clone()).collect();
    let reduced = build(&rest, artifact.method, config)?;
    let scores = scores(&reduced, tokens);
    Ok(best_match(&scores).map(|(j, score)| (kept[j], score)))
}

/// Leave-one-pattern-out summary for one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalResult {
    pub method: RetrievalMethod,
    pub total: usize,
    pub correct: usize,
    pub fallbacks: usize,
}

impl EvalResult {
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.total)
    }

    pub fn fallback_rate(&self) -> f64 {
        ratio(self.fallbacks, self.total)
    }
}

/// Column titles matching the `Display` rows of `EvalResult`.
pub const TABLE_HEADER: &str = "Method   Total   Correct   Accuracy   FallbackRate";

/// One table row, ratios shown as percentages with two decimals.
impl fmt::Display for EvalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<8} {:>5}   {:>7}   {:>8}   {:>12}",
            self.method.as_str(),
            self.total,
            self.correct,
            percent(self.accuracy()),
            percent(self.fallback_rate())
        )
    }
}

fn percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

#[inline]
fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Leave-one-pattern-out evaluation of a built artifact.
///
/// An outcome counts as correct when its score clears `threshold` and the
/// matched tag equals the held-out tag. Below the threshold, or with no
/// remaining candidate, it counts as a fallback.
pub fn evaluate(artifact: &IndexArtifact, threshold: f64, strategy: HoldoutStrategy) -> Result<EvalResult> {
    let outcomes = holdout_outcomes(artifact, strategy)?;
    let mut result = EvalResult {
        method: artifact.method,
        total: outcomes.len(),
        correct: 0,
        fallbacks: 0,
    };
    for outcome in &outcomes {
        match outcome.best {
            Some((_, score)) if decide(score, threshold).is_answer() => {
                if outcome.tag_match {
                    result.correct += 1;
                }
            }
            _ => result.fallbacks += 1,
        }
    }
    info!(
        method = %result.method,
        total = result.total,
        correct = result.correct,
        accuracy = result.accuracy(),
        fallback_rate = result.fallback_rate(),
        "evaluation finished"
    );
    Ok(result)
}

/// Build and evaluate several methods over the same corpus in parallel.
/// Results come back in the order of `methods`.
pub fn evaluate_methods(
    corpus: &Corpus,
    methods: &[RetrievalMethod],
    config: &RetrievalConfig,
    strategy: HoldoutStrategy,
) -> Result<Vec<EvalResult>> {
    methods
        .par_iter()
        .map(|&method| {
            let artifact = build(corpus, method, config)?;
            evaluate(&artifact, config.threshold, strategy)
        })
        .collect()
}

/// Evaluate already built artifacts in parallel, each against `threshold`
/// when given and against the threshold stored at build time otherwise.
/// Results come back in the order of `artifacts`.
pub fn evaluate_artifacts(
    artifacts: &[IndexArtifact],
    threshold: Option<f64>,
    strategy: HoldoutStrategy,
) -> Result<Vec<EvalResult>> {
    if let Some(threshold) = threshold {
        validate_threshold(threshold)?;
    }
    artifacts
        .par_iter()
        .map(|artifact| evaluate(artifact, threshold.unwrap_or(artifact.threshold), strategy))
        .collect()
}

/// Write results as CSV with ratios rounded to six decimals.
pub fn write_csv<P: AsRef<Path>>(results: &[EvalResult], path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["method", "total", "correct", "accuracy", "fallback_rate"])?;
    for result in results {
        writer.write_record([
            result.method.to_string(),
            result.total.to_string(),
            result.correct.to_string(),
            format!("{:.6}", result.accuracy()),
            format!("{:.6}", result.fallback_rate()),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = results.len(), "evaluation csv written");
    Ok(())
}
