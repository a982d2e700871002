pub mod loader;

use serde::{Deserialize, Serialize};

/// One retrievable question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// stored example question
    pub pattern: String,
    /// response text
    pub answer: String,
    /// intent identifier, only used to judge evaluation correctness
    pub tag: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl Record {
    pub fn new(pattern: impl Into<String>, answer: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            answer: answer.into(),
            tag: tag.into(),
            topic: None,
            source_url: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Filter key for this record: the topic when set, the tag otherwise.
    pub fn topic_key(&self) -> String {
        topic_key(self.topic.as_deref().unwrap_or(&self.tag))
    }
}

/// Normalize a topic or tag into a filter key.
/// `"web_Machine Learning"` becomes `"machine_learning"`.
pub fn topic_key(raw: &str) -> String {
    let cleaned = raw.trim().to_lowercase();
    let cleaned = cleaned.strip_prefix("web_").unwrap_or(&cleaned);
    cleaned.replace(' ', "_")
}

/// Human readable label for a topic key: `"machine_learning"` -> `"Machine Learning"`.
pub fn topic_label(key: &str) -> String {
    let key = key.strip_prefix("web_").unwrap_or(key);
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Ordered collection of records.
/// Positions are the record indices used by every index variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    records: Vec<Record>,
}

impl Corpus {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn extend<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = Record>,
    {
        self.records.extend(records);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Sorted distinct tags.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.records.iter().map(|r| r.tag.clone()).collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// Sorted distinct topic keys.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .records
            .iter()
            .map(Record::topic_key)
            .filter(|t| !t.is_empty())
            .collect();
        topics.sort();
        topics.dedup();
        topics
    }

    /// Distinct patterns per topic key, in corpus order, topics sorted.
    pub fn patterns_by_topic(&self) -> Vec<(String, Vec<&str>)> {
        let mut grouped: Vec<(String, Vec<&str>)> = Vec::new();
        for record in &self.records {
            let key = record.topic_key();
            let pattern = record.pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            match grouped.iter_mut().find(|(topic, _)| *topic == key) {
                Some((_, patterns)) => {
                    if !patterns.contains(&pattern) {
                        patterns.push(pattern);
                    }
                }
                None => grouped.push((key, vec![pattern])),
            }
        }
        grouped.sort_by(|a, b| a.0.cmp(&b.0));
        grouped
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<Record> for Corpus {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Self::from_records(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_key_strips_web_prefix() {
        assert_eq!(topic_key("web_Machine Learning"), "machine_learning");
        assert_eq!(topic_key("  Sports "), "sports");
        assert_eq!(topic_label("machine_learning"), "Machine Learning");
        assert_eq!(topic_label("web_food"), "Food");
    }

    #[test]
    fn record_topic_prefers_explicit_topic() {
        let r = Record::new("q", "a", "web_news");
        assert_eq!(r.topic_key(), "news");
        let r = r.with_topic("Health");
        assert_eq!(r.topic_key(), "health");
    }

    #[test]
    fn corpus_lists_topics_and_patterns() {
        let corpus: Corpus = vec![
            Record::new("what is rust", "a language", "web_tech"),
            Record::new("what is rust", "a systems language", "web_tech"),
            Record::new("who won", "nobody", "web_sports"),
            Record::new("is rust fast", "yes", "web_tech"),
        ]
        .into_iter()
        .collect();

        assert_eq!(corpus.topics(), vec!["sports", "tech"]);
        assert_eq!(corpus.tags(), vec!["web_sports", "web_tech"]);
        let grouped = corpus.patterns_by_topic();
        assert_eq!(grouped[0], ("sports".to_string(), vec!["who won"]));
        assert_eq!(grouped[1], ("tech".to_string(), vec!["what is rust", "is rust fast"]));
    }
}
