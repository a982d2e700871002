pub mod fallback;
pub mod holdout;
pub mod scoring;
