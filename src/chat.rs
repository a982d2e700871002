//! Terminal chat session: command parsing and the topic filter.
//!
//! The session owns one artifact and answers free text through
//! `respond_in_topic`. Lines starting with `/` are commands.

use tracing::debug;

use crate::config::validate_threshold;
use crate::error::Result;
use crate::vectorizer::corpus::{topic_key, topic_label};
use crate::vectorizer::evaluate::fallback::{respond_in_topic, Response};
use crate::vectorizer::IndexArtifact;

pub const HELP_TEXT: &str = "\
Commands:
  /help            show this message
  /topics          list available topics
  /topic <name>    restrict answers to one topic
  /topic all       search every topic again
  /list            show known questions per topic
  /clear           clear the screen
  /quit            leave (also: quit, exit, bye)";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Topics,
    /// `/topic` with its argument, `None` to show the current topic
    Topic(Option<String>),
    List,
    Clear,
    Quit,
    /// free text question
    Ask(String),
    /// blank line
    Empty,
    /// unrecognized `/` command
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if matches!(line.to_lowercase().as_str(), "quit" | "exit" | "bye") {
        return Command::Quit;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Ask(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name.to_lowercase().as_str() {
        "help" | "h" | "?" => Command::Help,
        "topics" => Command::Topics,
        "topic" => Command::Topic((!arg.is_empty()).then(|| arg.to_string())),
        "list" => Command::List,
        "clear" => Command::Clear,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

/// Result of a `/topic` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicSwitch {
    /// filter removed
    All,
    /// filter set to this topic key
    Switched(String),
    /// no record carries this topic, filter unchanged
    Unknown(String),
}

#[derive(Debug)]
pub struct ChatSession {
    artifact: IndexArtifact,
    threshold: f64,
    topic: Option<String>,
}

impl ChatSession {
    /// Fails with `InvalidConfig` for a non-finite threshold.
    pub fn new(artifact: IndexArtifact, threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        Ok(Self {
            artifact,
            threshold,
            topic: None,
        })
    }

    pub fn artifact(&self) -> &IndexArtifact {
        &self.artifact
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Active topic key, `None` when searching everything.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Sorted topic keys present in the corpus.
    pub fn available_topics(&self) -> Vec<String> {
        self.artifact.corpus.topics()
    }

    /// Topic labels for display, `"machine_learning"` shown as `"Machine Learning"`.
    pub fn topic_labels(&self) -> Vec<String> {
        self.available_topics().iter().map(|key| topic_label(key)).collect()
    }

    /// Accepts a key or a label in any case; `"all"` clears the filter.
    pub fn set_topic(&mut self, name: &str) -> TopicSwitch {
        let key = topic_key(name);
        if key.is_empty() || key == "all" {
            self.topic = None;
            return TopicSwitch::All;
        }
        if self.available_topics().contains(&key) {
            debug!(topic = %key, "topic filter set");
            self.topic = Some(key.clone());
            TopicSwitch::Switched(key)
        } else {
            TopicSwitch::Unknown(key)
        }
    }

    /// Answer a question within the active topic.
    pub fn ask(&self, query: &str) -> Result<Response> {
        respond_in_topic(&self.artifact, query, self.threshold, self.topic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::vectorizer::corpus::{Corpus, Record};
    use crate::vectorizer::evaluate::fallback::FALLBACK_MESSAGE;
    use crate::vectorizer::{build, RetrievalMethod};

    fn session() -> ChatSession {
        let corpus = Corpus::from_records(vec![
            Record::new("what is machine learning", "Learning from data", "web_machine_learning")
                .with_topic("Machine Learning"),
            Record::new("best football team", "Depends who you ask", "web_sports").with_topic("sports"),
            Record::new("machine for sports training", "A treadmill", "web_sports").with_topic("sports"),
        ]);
        let artifact = build(&corpus, RetrievalMethod::Tfidf, &RetrievalConfig::default()).unwrap();
        ChatSession::new(artifact, 0.25).unwrap()
    }

    #[test]
    fn parses_commands_and_questions() {
        assert_eq!(parse_command("  "), Command::Empty);
        assert_eq!(parse_command("/help"), Command::Help);
        assert_eq!(parse_command("/TOPICS"), Command::Topics);
        assert_eq!(parse_command("/topic  Machine Learning "), Command::Topic(Some("Machine Learning".into())));
        assert_eq!(parse_command("/topic"), Command::Topic(None));
        assert_eq!(parse_command("/list"), Command::List);
        assert_eq!(parse_command("/clear"), Command::Clear);
        assert_eq!(parse_command("/quit"), Command::Quit);
        assert_eq!(parse_command("Bye"), Command::Quit);
        assert_eq!(parse_command("exit"), Command::Quit);
        assert_eq!(parse_command("/dance"), Command::Unknown("/dance".into()));
        assert_eq!(parse_command(" what is python? "), Command::Ask("what is python?".into()));
    }

    #[test]
    fn non_finite_threshold_is_rejected() {
        let artifact = session().artifact().clone();
        assert!(matches!(
            ChatSession::new(artifact.clone(), f64::NAN),
            Err(crate::error::Error::InvalidConfig(_))
        ));
        let session = ChatSession::new(artifact, 0.4).unwrap();
        assert_eq!(session.threshold(), 0.4);
    }

    #[test]
    fn topics_accept_labels_and_keys() {
        let mut session = session();
        assert_eq!(session.available_topics(), vec!["machine_learning", "sports"]);
        assert_eq!(session.topic_labels(), vec!["Machine Learning", "Sports"]);

        assert_eq!(session.set_topic("Machine Learning"), TopicSwitch::Switched("machine_learning".into()));
        assert_eq!(session.topic(), Some("machine_learning"));
        assert_eq!(session.set_topic("cooking"), TopicSwitch::Unknown("cooking".into()));
        assert_eq!(session.topic(), Some("machine_learning"));
        assert_eq!(session.set_topic("ALL"), TopicSwitch::All);
        assert_eq!(session.topic(), None);
    }

    #[test]
    fn asking_respects_the_topic_filter() {
        let mut session = session();
        let reply = session.ask("what is machine learning").unwrap();
        assert_eq!(reply.answer, "Learning from data");

        session.set_topic("sports");
        let reply = session.ask("machine").unwrap();
        assert_eq!(reply.answer, "A treadmill");

        let reply = session.ask("quantum physics").unwrap();
        assert_eq!(reply.answer, FALLBACK_MESSAGE);
    }
}
