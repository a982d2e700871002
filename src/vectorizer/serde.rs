use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use num::Num;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::utils::math::vector::SpVec;
use crate::vectorizer::vocabulary::Vocabulary;
use crate::vectorizer::{IndexArtifact, MethodIndex, RetrievalMethod};

/// Bumped whenever the artifact layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// Sorted distinct tags, written next to the artifacts.
pub const CLASSES_FILE: &str = "classes.json";
/// Sorted vocabulary, written next to the artifacts.
pub const WORDS_FILE: &str = "words.json";

impl IndexArtifact {
    /// File name used for a method's artifact inside the models directory.
    pub fn file_name(method: RetrievalMethod) -> String {
        format!("faq_index_{}.cbor", method)
    }

    /// Path of the artifact for `method` under `dir`.
    pub fn path_in<P: AsRef<Path>>(dir: P, method: RetrievalMethod) -> PathBuf {
        dir.as_ref().join(Self::file_name(method))
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        Ok(serde_cbor::to_vec(self)?)
    }

    /// Decode and validate an artifact.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let artifact: IndexArtifact = serde_cbor::from_slice(bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Write the artifact to `path`, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_cbor::to_writer(&mut writer, self)?;
        writer.flush()?;
        info!(path = %path.display(), method = %self.method, records = self.len(), "artifact saved");
        Ok(())
    }

    /// Read and validate an artifact from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let artifact: IndexArtifact = serde_cbor::from_reader(reader)?;
        artifact.validate()?;
        info!(path = %path.display(), method = %artifact.method, records = artifact.len(), "artifact loaded");
        Ok(artifact)
    }

    /// Consistency checks for an artifact that did not come from `build`.
    ///
    /// An artifact without records passes; scoring it reports `EmptyIndex`.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "format version {} is not supported (expected {})",
                self.format_version, FORMAT_VERSION
            )));
        }
        if self.method != self.index.method() {
            return Err(corrupt(format!(
                "artifact says {} but holds {} statistics",
                self.method,
                self.index.method()
            )));
        }
        if !self.threshold.is_finite() {
            return Err(corrupt(format!("threshold {} is not finite", self.threshold)));
        }
        let records = self.corpus.len();
        if self.index.doc_num() != records {
            return Err(corrupt(format!(
                "{} records but {} index entries",
                records,
                self.index.doc_num()
            )));
        }

        match &self.index {
            MethodIndex::Tfidf(index) => {
                if index.idf.len() != index.vocabulary.len() {
                    return Err(corrupt("idf length differs from vocabulary size"));
                }
                if let Some(bad) = index.idf.iter().find(|idf| !(idf.is_finite() && **idf >= 0.0)) {
                    return Err(corrupt(format!("idf entry {} is not a finite non-negative weight", bad)));
                }
                check_vectors(&index.vectors, &index.vocabulary)?;
            }
            MethodIndex::Bow(index) => check_vectors(&index.vectors, &index.vocabulary)?,
            MethodIndex::Bm25(index) => {
                if index.doc_lengths.len() != records || index.doc_num as usize != records {
                    return Err(corrupt("document lengths are not aligned with records"));
                }
                if index.doc_freqs.len() != index.vocabulary.len() {
                    return Err(corrupt("document frequencies differ from vocabulary size"));
                }
                if !index.avg_doc_length.is_finite() {
                    return Err(corrupt("average document length is not finite"));
                }
                index
                    .params
                    .validate()
                    .map_err(|err| corrupt(format!("bm25 parameters out of range: {}", err)))?;
                check_vectors(&index.term_freqs, &index.vocabulary)?;
            }
            MethodIndex::Boolean(_) => {}
        }
        debug!(method = %self.method, records, "artifact validated");
        Ok(())
    }
}

fn corrupt(msg: impl Into<String>) -> Error {
    Error::Corrupt(msg.into())
}

fn check_vectors<N>(vectors: &[SpVec<N>], vocabulary: &Vocabulary) -> Result<()>
where
    N: Num + Copy,
{
    for (i, vec) in vectors.iter().enumerate() {
        if !vec.is_well_formed() {
            return Err(corrupt(format!("vector {} is malformed", i)));
        }
        if vec.max_index().is_some_and(|max| max >= vocabulary.len()) {
            return Err(corrupt(format!("vector {} points outside the vocabulary", i)));
        }
    }
    Ok(())
}

/// Write `classes.json` and `words.json` for `artifact` into `dir`.
pub fn write_inspection_files<P: AsRef<Path>>(artifact: &IndexArtifact, dir: P) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let classes = artifact.corpus.tags();
    let words = artifact.words();
    serde_json::to_writer_pretty(BufWriter::new(File::create(dir.join(CLASSES_FILE))?), &classes)?;
    serde_json::to_writer_pretty(BufWriter::new(File::create(dir.join(WORDS_FILE))?), &words)?;
    debug!(dir = %dir.display(), classes = classes.len(), words = words.len(), "inspection files written");
    Ok(())
}
