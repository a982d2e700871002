//! Corpus loading from intents JSON and Q/A CSV files.
//!
//! Rows that cannot produce a valid record (no pattern, no answer, or a
//! pattern that normalizes to nothing) are skipped here, so the core only
//! ever sees well-formed records.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::vectorizer::corpus::{Corpus, Record};
use crate::vectorizer::token::{normalize, StopwordMode};

#[derive(Debug, Deserialize)]
struct IntentsFile {
    #[serde(default)]
    intents: Vec<Intent>,
}

#[derive(Debug, Deserialize)]
struct Intent {
    tag: String,
    #[serde(default)]
    patterns: Vec<String>,
    #[serde(default)]
    responses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QaRow {
    #[serde(default)]
    question: String,
    #[serde(default)]
    answer: String,
    #[serde(default)]
    topic: String,
    #[serde(default)]
    source_url: String,
}

fn indexable(pattern: &str, stopwords: StopwordMode) -> bool {
    !normalize(pattern, stopwords).is_empty()
}

/// Parse an intents document.
/// Emits one record per pattern × response; the tag doubles as topic.
pub fn parse_intents(json: &str, stopwords: StopwordMode) -> Result<Vec<Record>> {
    let file: IntentsFile = serde_json::from_str(json)?;
    let mut records = Vec::new();
    for intent in file.intents {
        let responses: Vec<&str> = intent
            .responses
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .collect();
        if responses.is_empty() {
            debug!(tag = %intent.tag, "intent without responses skipped");
            continue;
        }
        for pattern in &intent.patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() || !indexable(pattern, stopwords) {
                continue;
            }
            for answer in &responses {
                records.push(Record::new(pattern, *answer, intent.tag.clone()).with_topic(intent.tag.clone()));
            }
        }
    }
    Ok(records)
}

pub fn load_intents(path: &Path, stopwords: StopwordMode) -> Result<Vec<Record>> {
    let json = fs::read_to_string(path)?;
    let records = parse_intents(&json, stopwords)?;
    info!(path = %path.display(), records = records.len(), "loaded intents");
    Ok(records)
}

/// Read Q/A rows with `question, answer, topic, source_url` headers.
/// Empty topics become `general`, tags are `web_<topic>`.
pub fn read_qa_csv<R: Read>(reader: R, stopwords: StopwordMode) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in reader.deserialize::<QaRow>() {
        let row = row?;
        if row.question.is_empty() || row.answer.is_empty() || !indexable(&row.question, stopwords) {
            continue;
        }
        let topic = if row.topic.is_empty() { "general".to_string() } else { row.topic };
        let mut record = Record::new(row.question, row.answer, format!("web_{topic}")).with_topic(topic);
        if !row.source_url.is_empty() {
            record = record.with_source_url(row.source_url);
        }
        records.push(record);
    }
    Ok(records)
}

/// Load one CSV source. A directory means every `*.csv` inside it, sorted
/// by name. Missing paths contribute nothing.
pub fn load_qa_rows(path: &Path, stopwords: StopwordMode) -> Result<Vec<Record>> {
    if !path.exists() {
        debug!(path = %path.display(), "Q/A source not found, skipping");
        return Ok(Vec::new());
    }

    let files: Vec<PathBuf> = if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut records = Vec::new();
    for file in files {
        let rows = read_qa_csv(fs::File::open(&file)?, stopwords)?;
        debug!(path = %file.display(), rows = rows.len(), "loaded Q/A csv");
        records.extend(rows);
    }
    Ok(records)
}

/// Intents first, then every CSV source in the given order.
pub fn load_corpus(intents_path: &Path, qa_sources: &[PathBuf], stopwords: StopwordMode) -> Result<Corpus> {
    let mut corpus = Corpus::from_records(load_intents(intents_path, stopwords)?);
    let intents = corpus.len();
    for source in qa_sources {
        corpus.extend(load_qa_rows(source, stopwords)?);
    }
    info!(records = corpus.len(), from_csv = corpus.len() - intents, "corpus ready");
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTENTS: &str = r#"{
        "intents": [
            {"tag": "greeting", "patterns": ["Hi there", "Hello"], "responses": ["Hello!", "Hi!"]},
            {"tag": "empty", "patterns": ["Anything"], "responses": []},
            {"tag": "stop", "patterns": ["the a an", "what is python"], "responses": ["A language"]}
        ]
    }"#;

    #[test]
    fn intents_expand_pattern_by_response() {
        let records = parse_intents(INTENTS, StopwordMode::Detect).unwrap();
        let pairs: Vec<(&str, &str)> = records.iter().map(|r| (r.pattern.as_str(), r.answer.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("Hi there", "Hello!"),
                ("Hi there", "Hi!"),
                ("Hello", "Hello!"),
                ("Hello", "Hi!"),
                ("what is python", "A language"),
            ]
        );
        assert!(records.iter().all(|r| r.topic.as_deref() == Some(r.tag.as_str())));
    }

    #[test]
    fn malformed_intents_are_an_error() {
        assert!(parse_intents("{ not json", StopwordMode::Detect).is_err());
    }

    #[test]
    fn csv_rows_are_validated() {
        let data = "question,answer,topic,source_url\n\
                    What is Python?,A programming language,technology,https://python.org\n\
                    ,missing question,news,\n\
                    Who won?,,sports,\n\
                    Is it raining?,Check the forecast,,\n";
        let records = read_qa_csv(data.as_bytes(), StopwordMode::Detect).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tag, "web_technology");
        assert_eq!(records[0].source_url.as_deref(), Some("https://python.org"));
        assert_eq!(records[1].tag, "web_general");
        assert_eq!(records[1].topic.as_deref(), Some("general"));
        assert_eq!(records[1].source_url, None);
    }

    #[test]
    fn directory_sources_are_read_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "question,answer,topic\nsecond question,B,b\n").unwrap();
        fs::write(dir.path().join("a.csv"), "question,answer,topic\nfirst question,A,a\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let records = load_qa_rows(dir.path(), StopwordMode::Detect).unwrap();
        let answers: Vec<&str> = records.iter().map(|r| r.answer.as_str()).collect();
        assert_eq!(answers, vec!["A", "B"]);

        let missing = load_qa_rows(&dir.path().join("nope"), StopwordMode::Detect).unwrap();
        assert!(missing.is_empty());
    }
}
