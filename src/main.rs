//! gqr - command-line front end for the geo query router
//!
//! # Commands
//! - `route`: route one query (from `--query` or a JSON request on stdin), print the decision
//! - `corpus`: route a JSON corpus in parallel and check expected capabilities
//! - `check-config`: load and validate the vocabulary, print a summary
//!
//! # Output
//! Decisions and reports go to stdout as JSON. Logs (`RUST_LOG`) and `--explain` tables go to
//! stderr.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use geo_query_router::router::{REJECTED, UNKNOWN};
use geo_query_router::vocabulary::DomainVocabulary;
use geo_query_router::{
    ConfigurationError, IntentEngine, RouteRequest, RouteTarget, RouteTrace, RoutingDecision,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Directory under the platform config dir holding a user vocabulary
const CONFIG_DIR: &str = "geo-query-router";

/// Vocabulary file name inside CONFIG_DIR
const VOCABULARY_FILE: &str = "domain-vocabulary.json";

/// Exit code when a corpus run has failing expectations
const EXIT_CORPUS_FAILURES: i32 = 2;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
enum CliError {
    #[error("Failed to read stdin: {0}")]
    StdinRead(#[from] io::Error),

    #[error("Failed to parse input JSON: {0}")]
    InputParse(#[from] serde_json::Error),

    #[error("Failed to read corpus from {path}: {source}")]
    CorpusRead { path: PathBuf, source: io::Error },

    #[error("Invalid vocabulary: {0}")]
    Config(#[from] ConfigurationError),

    #[error("Nothing to do: pass a corpus file or --predefined")]
    EmptyCorpus,
}

// ============================================================================
// Command Line
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "gqr",
    about = "Route business questions to analysis capabilities",
    version
)]
struct Cli {
    /// Vocabulary artifact to load instead of the user or built-in one
    #[arg(long, global = true)]
    vocabulary: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Route a single query (default command)
    Route(RouteArgs),
    /// Route every query in a corpus and check expectations
    Corpus(CorpusArgs),
    /// Validate the vocabulary and print a summary
    CheckConfig,
}

#[derive(Args, Debug, Default)]
struct RouteArgs {
    /// Query text; when omitted a JSON request is read from stdin
    #[arg(long, short)]
    query: Option<String>,

    /// Previous conversation turn used to resolve follow-up questions
    #[arg(long)]
    context: Option<String>,

    /// Print the scored candidate table to stderr
    #[arg(long)]
    explain: bool,

    /// Pretty-print the JSON decision
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct CorpusArgs {
    /// JSON array of {query, expected?, conversationContext?}
    file: Option<PathBuf>,

    /// Also check every predefined query routes to its capability
    #[arg(long)]
    predefined: bool,
}

// ============================================================================
// Corpus Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CorpusEntry {
    query: String,

    /// Capability id, UNKNOWN or REJECTED
    #[serde(default)]
    expected: Option<String>,

    #[serde(default)]
    conversation_context: Option<String>,

    /// Required confidence, used for predefined checks
    #[serde(skip)]
    expected_confidence: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CorpusReport {
    generated_at: String,
    vocabulary_version: String,
    total: usize,
    checked: usize,
    passed: usize,
    routed: usize,
    unknown: usize,
    rejected: usize,
    failures: Vec<CorpusFailure>,
}

impl CorpusReport {
    fn exit_code(&self) -> i32 {
        if self.failures.is_empty() {
            0
        } else {
            EXIT_CORPUS_FAILURES
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CorpusFailure {
    query: String,
    expected: String,
    actual: String,
    confidence: f64,
    reason: String,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    // Initialize tracing if RUST_LOG is set
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Error: {}", e);
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32, CliError> {
    let cli = Cli::parse();
    let vocabulary = load_vocabulary(cli.vocabulary.as_deref())?;

    match cli
        .command
        .unwrap_or_else(|| Command::Route(RouteArgs::default()))
    {
        Command::Route(args) => run_route(IntentEngine::new(vocabulary), args),
        Command::Corpus(args) => run_corpus(IntentEngine::new(vocabulary), args),
        Command::CheckConfig => {
            print_summary(&vocabulary);
            Ok(0)
        }
    }
}

// ============================================================================
// Vocabulary Resolution
// ============================================================================

/// Path of the user-level vocabulary override
fn user_vocabulary_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(VOCABULARY_FILE))
}

/// Explicit path, then user config, then the built-in artifact
fn load_vocabulary(explicit: Option<&Path>) -> Result<DomainVocabulary, ConfigurationError> {
    if let Some(path) = explicit {
        debug!("Loading vocabulary from {:?}", path);
        return DomainVocabulary::from_path(path);
    }

    match user_vocabulary_path() {
        Some(path) if path.exists() => {
            debug!("Loading user vocabulary from {:?}", path);
            DomainVocabulary::from_path(&path)
        }
        Some(path) => {
            debug!("No user vocabulary at {:?}, using built-in", path);
            DomainVocabulary::builtin()
        }
        None => {
            warn!("Config directory not found, using built-in vocabulary");
            DomainVocabulary::builtin()
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_route(engine: IntentEngine, args: RouteArgs) -> Result<i32, CliError> {
    let request = match args.query {
        Some(query) => RouteRequest {
            query,
            conversation_context: args.context,
        },
        None => {
            let mut input_json = String::new();
            io::stdin().read_to_string(&mut input_json)?;
            debug!("Received input: {}", input_json);

            let mut request: RouteRequest = serde_json::from_str(&input_json)?;
            if args.context.is_some() {
                request.conversation_context = args.context;
            }
            request
        }
    };

    info!(
        "Routing query: {}",
        request.query.chars().take(50).collect::<String>()
    );

    let trace = engine.trace(&request);
    if args.explain {
        print_explanation(&trace, engine.vocabulary());
    }

    let payload = trace.decision.to_payload();
    let output = if args.pretty {
        serde_json::to_string_pretty(&payload)?
    } else {
        serde_json::to_string(&payload)?
    };
    println!("{}", output);

    Ok(0)
}

fn run_corpus(engine: IntentEngine, args: CorpusArgs) -> Result<i32, CliError> {
    let mut entries: Vec<CorpusEntry> = match &args.file {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|e| CliError::CorpusRead {
                path: path.clone(),
                source: e,
            })?;
            serde_json::from_str(&content)?
        }
        None => Vec::new(),
    };

    if args.predefined {
        let predefined = engine.vocabulary().predefined();
        entries.extend(predefined.iter().map(|(query, capability)| CorpusEntry {
            query: query.to_string(),
            expected: Some(capability.to_string()),
            conversation_context: None,
            expected_confidence: Some(predefined.confidence()),
        }));
    }

    if entries.is_empty() {
        return Err(CliError::EmptyCorpus);
    }

    // The engine is immutable, so every worker shares it without locking.
    let decisions: Vec<_> = entries
        .par_iter()
        .map(|entry| {
            engine.route_request(&RouteRequest {
                query: entry.query.clone(),
                conversation_context: entry.conversation_context.clone(),
            })
        })
        .collect();

    let report = build_report(&entries, &decisions, engine.vocabulary().version());

    let status = format!("{}/{} passed", report.passed, report.checked);
    if report.failures.is_empty() {
        info!("Corpus: {}", status.green());
    } else {
        warn!("Corpus: {}", status.red());
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(report.exit_code())
}

/// Tally decisions against the corpus expectations, pairing entries and decisions by index
fn build_report(
    entries: &[CorpusEntry],
    decisions: &[RoutingDecision],
    vocabulary_version: &str,
) -> CorpusReport {
    let mut report = CorpusReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        vocabulary_version: vocabulary_version.to_string(),
        total: entries.len(),
        checked: 0,
        passed: 0,
        routed: 0,
        unknown: 0,
        rejected: 0,
        failures: Vec::new(),
    };

    for (entry, decision) in entries.iter().zip(decisions) {
        match decision.target {
            RouteTarget::Capability(_) => report.routed += 1,
            RouteTarget::Unknown => report.unknown += 1,
            RouteTarget::Rejected { .. } => report.rejected += 1,
        }

        let Some(expected) = &entry.expected else {
            continue;
        };
        report.checked += 1;

        let target_ok = decision.capability_id() == expected.as_str();
        let confidence_ok = entry
            .expected_confidence
            .map_or(true, |c| decision.confidence == c);
        if target_ok && confidence_ok {
            report.passed += 1;
        } else {
            report.failures.push(CorpusFailure {
                query: entry.query.clone(),
                expected: expected.clone(),
                actual: decision.capability_id().to_string(),
                confidence: decision.confidence,
                reason: decision.reason.clone(),
            });
        }
    }

    report
}

// ============================================================================
// Human-Readable Output
// ============================================================================

fn print_summary(vocabulary: &DomainVocabulary) {
    println!(
        "{} v{} {}",
        "vocabulary".bold(),
        vocabulary.version(),
        "OK".green().bold()
    );
    if let Some(generated) = vocabulary.generated() {
        println!("  generated:   {}", generated.to_rfc3339());
    }
    let scoring = vocabulary.scoring();
    println!(
        "  scoring:     k={} predefined={} alternates={}",
        scoring.saturation_k, scoring.predefined_confidence, scoring.max_alternates
    );
    println!("  terms:       {}", vocabulary.domain_terms().len());
    println!("  synonyms:    {}", vocabulary.synonyms().len());
    println!("  predefined:  {}", vocabulary.predefined().len());
    println!(
        "  categories:  {}",
        vocabulary
            .scope()
            .categories()
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  capabilities: {}", vocabulary.capabilities().len());
    for capability in vocabulary.capabilities() {
        println!(
            "    {:<28} threshold {:.2}  +{} -{}",
            capability.id.cyan(),
            capability.confidence_threshold,
            capability.boost_terms.len(),
            capability.penalty_terms.len()
        );
    }
}

fn print_explanation(trace: &RouteTrace, vocabulary: &DomainVocabulary) {
    eprintln!("{} {}", "normalized:".bold(), trace.normalized);
    if trace.scored_text != trace.normalized {
        eprintln!("{} {}", "scored:".bold(), trace.scored_text);
    }
    if !trace.expansions.is_empty() {
        eprintln!("{} {}", "expanded:".bold(), trace.expansions.join(", "));
    }
    eprintln!(
        "{} {:.2}  {} {:?}",
        "domain:".bold(),
        trace.domain_relevance,
        "stage:".bold(),
        trace.stage
    );

    for (candidate, capability) in trace.candidates.iter().zip(vocabulary.capabilities()) {
        if candidate.matched_boost_terms.is_empty() && candidate.matched_penalty_terms.is_empty() {
            continue;
        }
        let confidence = format!("{:.3}", candidate.normalized_confidence);
        let confidence = if candidate.normalized_confidence >= capability.confidence_threshold {
            confidence.green()
        } else if candidate.normalized_confidence > 0.0 {
            confidence.yellow()
        } else {
            confidence.red()
        };
        eprintln!(
            "  {:<28} {} / {:.2}  raw {:+.2}  +[{}] -[{}]",
            candidate.capability_id,
            confidence,
            capability.confidence_threshold,
            candidate.raw_score,
            candidate.matched_boost_terms.join(", "),
            candidate.matched_penalty_terms.join(", ")
        );
    }

    let target = match &trace.decision.target {
        RouteTarget::Capability(id) => id.green().bold(),
        RouteTarget::Unknown => UNKNOWN.yellow().bold(),
        RouteTarget::Rejected { .. } => REJECTED.red().bold(),
    };
    eprintln!("{} {} - {}", "=>".bold(), target, trace.decision.reason);
    if let Some(message) = trace.decision.target.user_message() {
        eprintln!("   {}", message.dimmed());
    }
}

// ============================================================================
// Tests
// ============================================================================
