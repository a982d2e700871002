//! # faq-retriever
//!
//! Command line front end for the FAQ retrieval engine.
//!
//! Usage:
//!   faq-retriever train --method tfidf          # build and save an artifact
//!   faq-retriever chat --method bm25            # interactive terminal chat
//!   faq-retriever ask --method bow how do I train the model
//!   faq-retriever eval --method all --out reports/eval.csv
//!   faq-retriever eval --from-data                # build from the corpus instead of loading artifacts

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faq_retriever::chat::{parse_command, ChatSession, Command, TopicSwitch, HELP_TEXT};
use faq_retriever::vectorizer::corpus::loader::load_corpus;
use faq_retriever::vectorizer::corpus::{topic_label, Corpus};
use faq_retriever::vectorizer::serde::write_inspection_files;
use faq_retriever::vectorizer::evaluate::holdout::TABLE_HEADER;
use faq_retriever::{
    build, evaluate_artifacts, evaluate_methods, respond, validate_threshold, write_csv, AppConfig, EvalResult,
    HoldoutStrategy, IndexArtifact, Response, RetrievalMethod,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "faq-retriever", version, about = "Retrieval-based FAQ chatbot")]
struct Cli {
    /// Config file (defaults to ./faq.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and save the index artifact for a method (or `all`)
    Train {
        #[arg(short, long, default_value = "tfidf")]
        method: String,
        /// Threshold stored in the artifact
        #[arg(short, long)]
        threshold: Option<f64>,
        /// Q/A CSV file or directory, replaces the configured sources
        #[arg(long = "qa-source")]
        qa_sources: Vec<PathBuf>,
    },
    /// Interactive chat in the terminal
    Chat {
        #[arg(short, long, default_value = "tfidf")]
        method: String,
        /// Overrides the threshold stored in the artifact
        #[arg(short, long)]
        threshold: Option<f64>,
        /// Start with a topic filter
        #[arg(long)]
        topic: Option<String>,
    },
    /// Answer a single question and exit
    Ask {
        #[arg(short, long, default_value = "tfidf")]
        method: String,
        #[arg(short, long)]
        threshold: Option<f64>,
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Leave-one-pattern-out evaluation of the trained artifacts
    Eval {
        #[arg(short, long, default_value = "all")]
        method: String,
        /// Overrides the threshold stored in each artifact
        #[arg(short, long)]
        threshold: Option<f64>,
        /// Build from the corpus with the configured settings instead of
        /// loading the trained artifacts
        #[arg(long)]
        from_data: bool,
        /// Write the results as CSV
        #[arg(long)]
        out: Option<PathBuf>,
        /// Rebuild the index without each held-out pattern
        #[arg(long, alias = "retrain")]
        rebuild: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "faq_retriever=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Train {
            method,
            threshold,
            qa_sources,
        } => {
            if let Some(t) = threshold {
                validate_threshold(t)?;
                config.retrieval.threshold = t;
            }
            if !qa_sources.is_empty() {
                config.qa_sources = qa_sources;
            }
            train(&config, &parse_methods(&method)?)
        }
        Commands::Chat {
            method,
            threshold,
            topic,
        } => chat(&config, method.parse()?, threshold, topic.as_deref()),
        Commands::Ask {
            method,
            threshold,
            query,
        } => {
            if let Some(t) = threshold {
                validate_threshold(t)?;
            }
            let artifact = load_artifact(&config, method.parse()?)?;
            let threshold = threshold.unwrap_or(artifact.threshold);
            let reply = respond(&artifact, &query.join(" "), threshold)?;
            print_reply(&reply);
            Ok(())
        }
        Commands::Eval {
            method,
            threshold,
            from_data,
            out,
            rebuild,
        } => {
            let strategy = if rebuild {
                HoldoutStrategy::Rebuild
            } else {
                HoldoutStrategy::ExcludeAtScoring
            };
            let methods = parse_methods(&method)?;
            let results = if from_data {
                if let Some(t) = threshold {
                    config.retrieval.threshold = t;
                }
                eval_from_data(&config, &methods, strategy)?
            } else {
                eval_artifacts(&config, &methods, threshold, strategy)?
            };
            report_eval(&results, out)
        }
    }
}

/// `all` expands to every method.
fn parse_methods(arg: &str) -> Result<Vec<RetrievalMethod>> {
    if arg.trim().eq_ignore_ascii_case("all") {
        return Ok(RetrievalMethod::ALL.to_vec());
    }
    Ok(vec![arg.parse()?])
}

fn load_training_corpus(config: &AppConfig) -> Result<Corpus> {
    let intents = config.intents_path();
    load_corpus(&intents, &config.qa_sources, config.retrieval.stopwords)
        .with_context(|| format!("failed to load corpus from {}", intents.display()))
}

fn train(config: &AppConfig, methods: &[RetrievalMethod]) -> Result<()> {
    config.retrieval.validate()?;
    let corpus = load_training_corpus(config)?;
    for &method in methods {
        let artifact = build(&corpus, method, &config.retrieval)?;
        let path = IndexArtifact::path_in(&config.models_dir, method);
        artifact.save(&path)?;
        write_inspection_files(&artifact, &config.models_dir)?;
        println!(
            "Trained {} index: {} records, {} topics -> {}",
            method,
            artifact.len(),
            artifact.corpus.topics().len(),
            path.display()
        );
    }
    println!("Artifacts saved to: {}", config.models_dir.display());
    Ok(())
}

fn load_artifact(config: &AppConfig, method: RetrievalMethod) -> Result<IndexArtifact> {
    let path = IndexArtifact::path_in(&config.models_dir, method);
    IndexArtifact::load(&path).with_context(|| {
        format!(
            "cannot load {}, run `faq-retriever train --method {}` first",
            path.display(),
            method
        )
    })
}

/// Evaluate the saved artifacts, each against its own threshold unless
/// `threshold` overrides it.
fn eval_artifacts(
    config: &AppConfig,
    methods: &[RetrievalMethod],
    threshold: Option<f64>,
    strategy: HoldoutStrategy,
) -> Result<Vec<EvalResult>> {
    let artifacts = methods
        .iter()
        .map(|&method| load_artifact(config, method))
        .collect::<Result<Vec<_>>>()?;
    info!(methods = methods.len(), ?strategy, "evaluating trained artifacts");
    Ok(evaluate_artifacts(&artifacts, threshold, strategy)?)
}

fn eval_from_data(config: &AppConfig, methods: &[RetrievalMethod], strategy: HoldoutStrategy) -> Result<Vec<EvalResult>> {
    config.retrieval.validate()?;
    let corpus = load_training_corpus(config)?;
    info!(methods = methods.len(), ?strategy, "evaluating fresh builds");
    Ok(evaluate_methods(&corpus, methods, &config.retrieval, strategy)?)
}

fn report_eval(results: &[EvalResult], out: Option<PathBuf>) -> Result<()> {
    println!("{TABLE_HEADER}");
    println!("{}", "-".repeat(TABLE_HEADER.len()));
    for r in results {
        println!("{r}");
    }
    if let Some(path) = out {
        write_csv(results, &path)?;
        println!("Saved CSV: {}", path.display());
    }
    Ok(())
}

fn print_reply(reply: &Response) {
    println!("Bot » {}", reply.answer);
    match &reply.source_url {
        Some(url) => println!("      (score {:.3}, source: {})", reply.score, url),
        None => println!("      (score {:.3})", reply.score),
    }
}

fn chat(config: &AppConfig, method: RetrievalMethod, threshold: Option<f64>, topic: Option<&str>) -> Result<()> {
    let artifact = load_artifact(config, method)?;
    let threshold = threshold.unwrap_or(artifact.threshold);
    let mut session = ChatSession::new(artifact, threshold)?;

    println!("FAQ Chatbot ({method}, threshold {})", session.threshold());
    println!("Type /help to see commands.");
    if let Some(name) = topic {
        report_topic(session.set_topic(name));
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("You » ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            println!();
            break;
        };
        match parse_command(&line?) {
            Command::Empty => {}
            Command::Quit => {
                println!("Bot » Goodbye!");
                break;
            }
            Command::Help => println!("{HELP_TEXT}"),
            Command::Topics => {
                let labels = session.topic_labels();
                println!("Topics: all | {}", labels.join(" | "));
            }
            Command::Topic(None) => match session.topic() {
                Some(key) => println!("Active topic: {}", topic_label(key)),
                None => println!("Active topic: all"),
            },
            Command::Topic(Some(name)) => report_topic(session.set_topic(&name)),
            Command::List => {
                for (key, patterns) in session.artifact().corpus.patterns_by_topic() {
                    println!("- {} ({} questions)", topic_label(&key), patterns.len());
                    for sample in patterns.iter().take(3) {
                        println!("    • {sample}");
                    }
                }
            }
            Command::Clear => {
                print!("\x1B[2J\x1B[1;1H");
            }
            Command::Unknown(cmd) => println!("Unknown command {cmd}. Type /help."),
            Command::Ask(query) => match session.ask(&query) {
                Ok(reply) => print_reply(&reply),
                Err(err) => warn!(%err, "query failed"),
            },
        }
    }
    Ok(())
}

fn report_topic(switch: TopicSwitch) {
    match switch {
        TopicSwitch::All => println!("Topic filter cleared, searching all topics."),
        TopicSwitch::Switched(key) => println!("Topic set to {}.", topic_label(&key)),
        TopicSwitch::Unknown(key) => println!("Unknown topic '{key}'. Use /topics to see the list."),
    }
}
