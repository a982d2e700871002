//! Retrieval configuration.
//!
//! `RetrievalConfig` is passed explicitly into build, score and evaluate
//! calls. `AppConfig` wraps it with the paths the binary needs and is loaded
//! through Figment: defaults, then an optional TOML file, then `FAQ_*`
//! environment variables (nested keys split on `__`).

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::vectorizer::token::StopwordMode;

/// Minimum score to surface a matched answer.
pub const DEFAULT_THRESHOLD: f64 = 0.25;

/// BM25 tuning constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    /// term frequency saturation
    pub k1: f64,
    /// document length normalization
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

impl Bm25Params {
    /// `k1 >= 0` and `b` within [0, 1]; anything else can push scores below zero.
    pub fn validate(&self) -> Result<()> {
        if !(self.k1.is_finite() && self.k1 >= 0.0) {
            return Err(Error::InvalidConfig(format!("bm25.k1 must be >= 0, got {}", self.k1)));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(Error::InvalidConfig(format!("bm25.b must be within [0, 1], got {}", self.b)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub threshold: f64,
    pub bm25: Bm25Params,
    pub stopwords: StopwordMode,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            bm25: Bm25Params::default(),
            stopwords: StopwordMode::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.threshold)?;
        self.bm25.validate()
    }
}

/// A threshold must be a finite number.
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !threshold.is_finite() {
        return Err(Error::InvalidConfig(format!("threshold must be finite, got {}", threshold)));
    }
    Ok(())
}

/// Settings for the command line front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// directory holding `intents.json`
    pub data_dir: PathBuf,
    /// where artifacts are written and read
    pub models_dir: PathBuf,
    /// extra Q/A CSV files or directories, relative to the working directory
    pub qa_sources: Vec<PathBuf>,
    pub retrieval: RetrievalConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            models_dir: PathBuf::from("models"),
            qa_sources: vec![PathBuf::from("data/web_faq.csv"), PathBuf::from("data/topics")],
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default config file name looked up in the working directory.
    pub const FILE_NAME: &'static str = "faq.toml";

    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.map_or_else(|| PathBuf::from(Self::FILE_NAME), Path::to_path_buf);
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("FAQ_").split("__"))
    }

    /// Merge all sources and validate the retrieval section.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: AppConfig = Self::figment(path).extract()?;
        config.retrieval.validate()?;
        Ok(config)
    }

    pub fn intents_path(&self) -> PathBuf {
        self.data_dir.join("intents.json")
    }
}
