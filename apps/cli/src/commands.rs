//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use execintel_core::pipeline::{ArticleSource, FilingKind, Orchestrator};
use execintel_core::{HttpCompletion, TemplateRegistry};
use execintel_search::SearchClient;
use execintel_shared::{
    AppConfig, PipelineConfig, config_file_path, init_config, load_config, validate_api_keys,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ExecIntel — executive intelligence profiles from the open web.
#[derive(Parser)]
#[command(
    name = "execintel",
    version,
    about = "Discover a company's executives and build enriched intelligence profiles.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Discover the current executives of a company.
    Discover {
        /// Company name or a direct leadership-page URL.
        input: String,
    },

    /// Discover and enrich executives into a full profile.
    Profile {
        /// Company name or a direct leadership-page URL.
        input: String,

        /// Enrich only the first N discovered executives (default: all).
        #[arg(long)]
        top: Option<usize>,
    },

    /// Find and summarize news articles on a topic.
    News {
        /// Company name.
        company: String,

        /// Meeting or research topic to search articles for.
        #[arg(short, long)]
        topic: String,

        /// Number of articles to summarize.
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Summarize a financial filing.
    Filing {
        /// Company name.
        company: String,

        /// Filing kind.
        #[arg(short, long, value_enum)]
        kind: FilingArg,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Filing kinds accepted on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum FilingArg {
    /// Annual 10-K filing.
    #[value(name = "10k")]
    TenK,
    /// Latest quarterly earnings report.
    Quarterly,
}

impl From<FilingArg> for FilingKind {
    fn from(arg: FilingArg) -> Self {
        match arg {
            FilingArg::TenK => FilingKind::TenK,
            FilingArg::Quarterly => FilingKind::Quarterly,
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => {
            "warn,execintel_cli=info,execintel_core=info,execintel_fetch=info,\
             execintel_search=info,execintel_text=info,execintel_shared=info"
        }
        1 => {
            "info,execintel_cli=debug,execintel_core=debug,execintel_fetch=debug,\
             execintel_search=debug,execintel_text=debug,execintel_shared=debug"
        }
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Discover { input } => cmd_discover(&input).await,
        Command::Profile { input, top } => cmd_profile(&input, top).await,
        Command::News {
            company,
            topic,
            count,
        } => cmd_news(&company, &topic, count).await,
        Command::Filing { company, kind } => cmd_filing(&company, kind.into()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Build the orchestrator from the loaded config.
fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator> {
    validate_api_keys(config)?;

    let registry = Arc::new(TemplateRegistry::builtin()?);
    let backend = Arc::new(HttpCompletion::new(&config.llm)?);
    let search = SearchClient::new(&config.search)?;

    Ok(Orchestrator::new(
        registry,
        backend,
        search,
        PipelineConfig::from(config),
    )?)
}

/// Spinner shown while a pipeline operation runs.
fn spinner(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("valid progress template"),
    );
    bar.set_message(message);
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_discover(input: &str) -> Result<()> {
    let config = load_config()?;
    let orchestrator = build_orchestrator(&config)?;

    let bar = spinner("discovering executives...");
    let outcome = orchestrator.discover_executives(input).await;
    bar.finish_and_clear();

    info!(
        executives = outcome.executives.len(),
        source_url = %outcome.source_url,
        "discovery finished"
    );
    print_json(&outcome)
}

async fn cmd_profile(input: &str, top: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let orchestrator = build_orchestrator(&config)?;

    let bar = spinner("discovering executives...");
    let discovery = orchestrator.discover_executives(input).await;
    bar.finish_and_clear();

    if discovery.executives.is_empty() {
        println!("No executives found for '{input}'.");
        return Ok(());
    }

    let mut selected = discovery.executives;
    if let Some(n) = top {
        selected.truncate(n);
    }
    for exec in &mut selected {
        exec.selected = true;
        exec.company_name = input.to_string();
    }

    let bar = spinner("enriching executives...");
    let enriched = orchestrator.enrich_executives(selected, input).await;
    bar.finish_and_clear();

    print_json(&serde_json::json!({
        "source_url": discovery.source_url,
        "executives": enriched.executives,
        "references_checked": enriched.references_checked,
        "references_dropped": enriched.references_dropped,
    }))
}

async fn cmd_news(company: &str, topic: &str, count: Option<usize>) -> Result<()> {
    let mut config = load_config()?;
    if let Some(count) = count {
        config.defaults.article_count = count;
    }
    let orchestrator = build_orchestrator(&config)?;

    let bar = spinner("searching and summarizing articles...");
    let outcome = orchestrator
        .summarize_articles(ArticleSource::Search {
            company: company.to_string(),
            topic: topic.to_string(),
        })
        .await;
    bar.finish_and_clear();

    print_json(&outcome)
}

async fn cmd_filing(company: &str, kind: FilingKind) -> Result<()> {
    let config = load_config()?;
    let orchestrator = build_orchestrator(&config)?;

    let bar = spinner("summarizing filing...");
    let outcome = orchestrator.summarize_financials(company, kind).await;
    bar.finish_and_clear();

    if outcome.summary.is_empty() {
        println!("No {kind} filing summary could be produced for '{company}'.");
    } else {
        println!("{}", outcome.summary);
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Created config file at {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    println!("# {}", config_file_path()?.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
