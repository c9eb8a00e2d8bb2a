use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use prospect_actions::{CompanyRow, ContactRow, build_enrichment_workflow, register_enrichment_actions};
use prospect_api::{OrganicResult, SearchError, SearchProvider, SerpApiClient};
use prospect_engine::{ActionRegistry, JsonLinesSink, MemorySink, OutputSink, RunControl, execute, load_file};
use prospect_types::{ExecutorConfig, FailurePolicy, ProspectConfig, RunSummary, WorkflowDescriptor, parse_duration};
use prospect_util::{load_config, load_config_from};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Run declarative company and contact enrichment workflows.
#[derive(Parser, Debug)]
#[command(name = "prospect", version, about)]
struct Cli {
    /// Configuration file (defaults to $PROSPECT_CONFIG_PATH or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate a workflow descriptor without running it
    Validate {
        /// Path to the workflow JSON/YAML
        file: PathBuf,
    },
    /// Run a workflow descriptor
    Run {
        /// Path to the workflow JSON/YAML
        file: PathBuf,
        #[command(flatten)]
        options: RunOptions,
    },
    /// Enrich company and contact lists in one run
    Enrich {
        /// JSON array of `{"company": ...}` rows; other columns are copied into the records
        #[arg(long)]
        companies: Option<PathBuf>,
        /// JSON array of `{"name": ..., "company": ...}` rows; other columns are copied into the records
        #[arg(long)]
        contacts: Option<PathBuf>,
        #[command(flatten)]
        options: RunOptions,
    },
}

#[derive(Args, Debug, Default)]
struct RunOptions {
    /// Write one JSON line per entity record to this file
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Append to the output file instead of truncating it
    #[arg(long)]
    append: bool,

    /// What to do when a step fails
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Handler invocations per step before giving up on transient errors
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Pause between retries, e.g. `500ms`, `2s`, `1m`
    #[arg(long, value_parser = parse_backoff)]
    backoff: Option<Duration>,

    /// Also write the run summary to this file
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum PolicyArg {
    Halt,
    Continue,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Halt => FailurePolicy::HaltOnFailure,
            PolicyArg::Continue => FailurePolicy::ContinueOnFailure,
        }
    }
}

impl RunOptions {
    /// Layers command-line overrides on top of the configured executor settings.
    fn executor_config(&self, base: &ExecutorConfig) -> Result<ExecutorConfig> {
        let mut config = base.clone();
        if let Some(policy) = self.policy {
            config.failure_policy = policy.into();
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if let Some(backoff) = self.backoff {
            config.retry_backoff = backoff;
        }
        config.validate()?;
        Ok(config)
    }

    fn open_sink(&self) -> Result<Box<dyn OutputSink + Send>> {
        let Some(path) = &self.output else {
            return Ok(Box::new(MemorySink::new()));
        };
        let sink = if self.append {
            JsonLinesSink::append(path)
        } else {
            JsonLinesSink::create(path)
        }
        .with_context(|| format!("open output file {}", path.display()))?;
        Ok(Box::new(sink))
    }
}

fn parse_backoff(raw: &str) -> Result<Duration, String> {
    parse_duration(raw).ok_or_else(|| format!("invalid duration '{raw}' (expected e.g. 500ms, 2s, 1m)"))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    if let Err(error) = dotenvy::dotenv() {
        // A missing .env file is the common case.
        if !error.not_found() {
            eprintln!("warning: could not read .env: {error}");
        }
    }
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
    .context("load configuration")?;

    match cli.command {
        Command::Validate { file } => validate(&file),
        Command::Run { file, options } => {
            let descriptor = load_file(&file).with_context(|| format!("load workflow {}", file.display()))?;
            let registry = action_registry(&config, false)?;
            run(descriptor, registry, &options, &config).await
        }
        Command::Enrich {
            companies,
            contacts,
            options,
        } => {
            let companies: Vec<CompanyRow> = read_rows(companies.as_deref())?;
            let contacts: Vec<ContactRow> = read_rows(contacts.as_deref())?;
            if companies.is_empty() && contacts.is_empty() {
                return Err(anyhow!("nothing to enrich; pass --companies and/or --contacts"));
            }
            let descriptor = build_enrichment_workflow(&companies, &contacts);
            let registry = action_registry(&config, true)?;
            run(descriptor, registry, &options, &config).await
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn validate(file: &Path) -> Result<ExitCode> {
    let descriptor = load_file(file).with_context(|| format!("load workflow {}", file.display()))?;
    let registry = action_registry(&ProspectConfig::default(), false)?;
    let unknown: Vec<&str> = descriptor
        .steps
        .iter()
        .map(|step| step.action.as_str())
        .filter(|action| !registry.contains(action))
        .collect();
    for action in &unknown {
        warn!(action = %action, "action is not built in; the step will fail unless a handler is registered");
    }
    let report = serde_json::json!({
        "workflow": descriptor.name(),
        "steps": descriptor.steps.len(),
        "valid": true,
        "unknown_actions": unknown,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}

/// Builds the registry of built-in actions.
///
/// Without an API key the search-backed actions stay registered but fail
/// permanently, so workflows that do not search still run.
fn action_registry(config: &ProspectConfig, require_search: bool) -> Result<ActionRegistry> {
    let search: Arc<dyn SearchProvider> = match SerpApiClient::from_env(&config.search) {
        Ok(client) => Arc::new(client),
        Err(error) if require_search => return Err(error.context("configure web search")),
        Err(error) => {
            debug!(error = %error, "web search unavailable");
            Arc::new(UnavailableSearch(error.to_string()))
        }
    };
    let mut registry = ActionRegistry::new();
    register_enrichment_actions(&mut registry, search, &config.search, &config.designation_overrides);
    Ok(registry)
}

/// Stand-in provider used when the search client cannot be configured.
struct UnavailableSearch(String);

impl SearchProvider for UnavailableSearch {
    fn search(&self, _query: &str, _limit: u32) -> Result<Vec<OrganicResult>, SearchError> {
        Err(SearchError::Provider(format!("web search unavailable: {}", self.0)))
    }
}

async fn run(descriptor: WorkflowDescriptor, registry: ActionRegistry, options: &RunOptions, config: &ProspectConfig) -> Result<ExitCode> {
    let executor_config = options.executor_config(&config.executor)?;
    let mut sink = options.open_sink()?;

    let control = RunControl::new();
    let interrupt = control.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current step");
            interrupt.cancel();
        }
    });

    let summary = tokio::task::spawn_blocking(move || execute(&descriptor, &registry, sink.as_mut(), &executor_config, &control))
        .await
        .context("workflow executor task failed")?;

    report(&summary, options.summary.as_deref())?;
    Ok(if summary.is_complete() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn report(summary: &RunSummary, summary_path: Option<&Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(summary)?;
    if let Some(path) = summary_path {
        fs::write(path, &rendered).with_context(|| format!("write summary {}", path.display()))?;
        info!(path = %path.display(), "run summary written");
    }
    println!("{rendered}");
    Ok(())
}

fn read_rows<T: serde::de::DeserializeOwned>(path: Option<&Path>) -> Result<Vec<T>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let content = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parse rows in {}", path.display()))
}
