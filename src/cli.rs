//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvMarketAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_store::MemoryStore;
use crate::adapters::mlp_policy_adapter::MlpPolicy;
use crate::adapters::ollama_adapter::OllamaAdapter;
use crate::adapters::training_data::load_training_data;
use crate::adapters::yahoo_adapter::{YahooAdapter, DEFAULT_BASE_URL};
use crate::domain::chat::{ChatRequest, ChatService};
use crate::domain::config_validation::{
    validate_config, DEFAULT_LLM_MODEL, DEFAULT_LLM_TIMEOUT_SECS, DEFAULT_LLM_URL,
    DEFAULT_LOG_FILTER, DEFAULT_MARKET_PROVIDER, DEFAULT_MARKET_TIMEOUT_SECS,
};
use crate::domain::error::AdvisorError;
use crate::domain::extraction::DEFAULT_WINDOW_DAYS;
use crate::domain::inference::InferenceEngine;
use crate::domain::market_data::MarketDataFetcher;
use crate::domain::observation::INITIAL_AMOUNT;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::pipeline::Advisor;
use crate::domain::universe::parse_tickers;
use crate::domain::watchlist::{analyze_watchlist, watchlist_entries};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketData;
use crate::ports::store_port::{ConversationStore, WatchlistStore};
use crate::ports::text_port::TextGenerator;

#[derive(Parser, Debug)]
#[command(name = "tickerwise", about = "Conversational stock advisor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask a free-text question and print the JSON response
    Ask {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the time window instead of extracting it from the text
        #[arg(short, long)]
        days: Option<u32>,
        /// Record the exchange under this user's conversation history
        #[arg(short, long)]
        user: Option<String>,
        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<i64>,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// List the tickers the policy was trained on
    Universe {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the latest quote for a ticker
    Quote {
        #[arg(short, long)]
        config: PathBuf,
        ticker: String,
    },
    /// Print daily price history as CSV
    History {
        #[arg(short, long)]
        config: PathBuf,
        ticker: String,
        #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
        days: u32,
    },
    /// Manage and analyse a user's watchlist
    Watchlist {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        user: String,
        #[command(subcommand)]
        action: WatchlistCommand,
    },
    /// Validate configuration and check that the policy loads
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum WatchlistCommand {
    Add { ticker: String },
    Remove { ticker: String },
    /// Members with their latest quotes
    List,
    /// Run the policy over every supported member
    Analyze,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Ask {
            config,
            days,
            user,
            conversation,
            text,
        } => run_ask(&config, days, user, conversation, &text.join(" ")),
        Command::Universe { config, limit } => run_universe(&config, limit),
        Command::Quote { config, ticker } => run_quote(&config, &ticker),
        Command::History {
            config,
            ticker,
            days,
        } => run_history(&config, &ticker, days),
        Command::Watchlist {
            config,
            user,
            action,
        } => run_watchlist(&config, &user, action),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Install the global subscriber on stderr. `RUST_LOG` wins over the
/// configured `[logging] filter`, which wins over `info`.
pub fn init_tracing(config: Option<&dyn ConfigPort>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let configured = config
            .map(|c| c.get_string_or("logging", "filter", DEFAULT_LOG_FILTER))
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        EnvFilter::try_new(configured).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    });
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load, log-enable and validate the config file.
pub fn load_config(path: &Path) -> Result<FileConfigAdapter, AdvisorError> {
    let config = FileConfigAdapter::from_file(path)?;
    init_tracing(Some(&config));
    validate_config(&config)?;
    info!(path = %path.display(), "config loaded");
    Ok(config)
}

fn runtime() -> Result<Runtime, AdvisorError> {
    Ok(Runtime::new()?)
}

fn timeout_secs(config: &dyn ConfigPort, section: &str, default: i64) -> Duration {
    Duration::from_secs(config.get_int(section, "timeout_secs", default).max(1) as u64)
}

fn required_path(config: &dyn ConfigPort, section: &str, key: &str) -> Result<PathBuf, AdvisorError> {
    config
        .get_string(section, key)
        .map(PathBuf::from)
        .ok_or_else(|| AdvisorError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

pub fn build_market(config: &dyn ConfigPort) -> Result<MarketDataFetcher, AdvisorError> {
    let timeout = timeout_secs(config, "market", DEFAULT_MARKET_TIMEOUT_SECS);
    let provider = config
        .get_string_or("market", "provider", DEFAULT_MARKET_PROVIDER)
        .to_lowercase();
    let source: Arc<dyn MarketData> = match provider.as_str() {
        "csv" => Arc::new(CsvMarketAdapter::new(required_path(config, "market", "csv_dir")?)),
        "yahoo" => {
            let base_url = config.get_string_or("market", "base_url", DEFAULT_BASE_URL);
            Arc::new(YahooAdapter::new(&base_url, timeout)?)
        }
        other => {
            return Err(AdvisorError::ConfigInvalid {
                section: "market".to_string(),
                key: "provider".to_string(),
                reason: format!("unknown provider '{}'", other),
            });
        }
    };
    info!(provider = %provider, timeout_secs = timeout.as_secs(), "market data source ready");
    Ok(MarketDataFetcher::new(source, timeout))
}

pub fn build_text(config: &dyn ConfigPort) -> Result<Arc<dyn TextGenerator>, AdvisorError> {
    let url = config.get_string_or("llm", "url", DEFAULT_LLM_URL);
    let model = config.get_string_or("llm", "model", DEFAULT_LLM_MODEL);
    let timeout = timeout_secs(config, "llm", DEFAULT_LLM_TIMEOUT_SECS);
    Ok(Arc::new(OllamaAdapter::new(&url, &model, timeout)?))
}

/// Load the training data and policy artifact. Never fails: a broken
/// artifact yields an unavailable engine.
pub fn load_engine(config: &dyn ConfigPort) -> InferenceEngine {
    InferenceEngine::load(|| {
        let training = load_training_data(&required_path(config, "policy", "training_data_path")?)?;
        let policy = MlpPolicy::from_file(&required_path(config, "policy", "model_path")?)?;
        let initial_amount = config.get_double("policy", "initial_amount", INITIAL_AMOUNT);
        InferenceEngine::ready(
            training.universe,
            training.baseline,
            Arc::new(policy),
            initial_amount,
        )
    })
}

pub fn build_advisor(config: &dyn ConfigPort) -> Result<Advisor, AdvisorError> {
    let engine = Arc::new(load_engine(config));
    let default_window =
        config.get_int("pipeline", "default_window_days", i64::from(DEFAULT_WINDOW_DAYS)) as u32;
    Ok(Advisor::new(
        engine,
        build_market(config)?,
        build_text(config)?,
        default_window,
    ))
}

/// Conversation and watchlist stores. SQLite when a path is configured,
/// otherwise a process-local store.
pub fn open_stores(
    config: &dyn ConfigPort,
) -> Result<(Arc<dyn ConversationStore>, Arc<dyn WatchlistStore>), AdvisorError> {
    #[cfg(feature = "sqlite")]
    if config.get_string("sqlite", "path").is_some() {
        let store = Arc::new(crate::adapters::sqlite_adapter::SqliteStore::from_config(config)?);
        let conversations: Arc<dyn ConversationStore> = store.clone();
        let watchlists: Arc<dyn WatchlistStore> = store;
        return Ok((conversations, watchlists));
    }

    #[cfg(not(feature = "sqlite"))]
    let _ = config;

    warn!("no persistent store configured; history and watchlists last for this process only");
    let store = Arc::new(MemoryStore::new());
    let conversations: Arc<dyn ConversationStore> = store.clone();
    let watchlists: Arc<dyn WatchlistStore> = store;
    Ok((conversations, watchlists))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AdvisorError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| AdvisorError::Io(e.into()))?;
    println!("{}", text);
    Ok(())
}

fn single_ticker(input: &str) -> Result<String, AdvisorError> {
    let tickers = parse_tickers(input).map_err(|e| AdvisorError::ResolutionFailure {
        reason: e.to_string(),
    })?;
    match tickers.as_slice() {
        [one] => Ok(one.clone()),
        _ => Err(AdvisorError::ResolutionFailure {
            reason: format!("expected one ticker, got '{}'", input),
        }),
    }
}

/// Render bars as `date,open,high,low,close,volume` CSV.
pub fn history_csv(bars: &[OhlcvBar]) -> Result<String, AdvisorError> {
    let csv_err = |e: csv::Error| AdvisorError::Io(std::io::Error::other(e));
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["date", "open", "high", "low", "close", "volume"])
        .map_err(csv_err)?;
    for bar in bars {
        wtr.write_record([
            bar.date.format("%Y-%m-%d").to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])
        .map_err(csv_err)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AdvisorError::Io(std::io::Error::other(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| AdvisorError::Io(std::io::Error::other(e)))
}

fn run_ask(
    config_path: &Path,
    days: Option<u32>,
    user: Option<String>,
    conversation_id: Option<i64>,
    message: &str,
) -> Result<(), AdvisorError> {
    let config = load_config(config_path)?;
    let advisor = Arc::new(build_advisor(&config)?);
    let (conversations, watchlists) = open_stores(&config)?;
    let service = ChatService::new(advisor, conversations, watchlists);

    let request = ChatRequest {
        user,
        message: message.to_string(),
        conversation_id,
        window_override: days,
    };
    let reply = runtime()?.block_on(service.handle(request));
    print_json(&reply)
}

fn run_universe(config_path: &Path, limit: Option<usize>) -> Result<(), AdvisorError> {
    let config = load_config(config_path)?;
    let engine = load_engine(&config);
    let state = engine.state()?;
    let tickers = state.universe.tickers();
    let shown = limit.unwrap_or(tickers.len()).min(tickers.len());
    for ticker in &tickers[..shown] {
        println!("{}", ticker);
    }
    eprintln!("{} of {} supported tickers", shown, tickers.len());
    Ok(())
}

fn run_quote(config_path: &Path, ticker: &str) -> Result<(), AdvisorError> {
    let config = load_config(config_path)?;
    let ticker = single_ticker(ticker)?;
    let market = build_market(&config)?;
    let quote = runtime()?.block_on(market.quote(&ticker))?;
    print_json(&quote)
}

fn run_history(config_path: &Path, ticker: &str, days: u32) -> Result<(), AdvisorError> {
    let config = load_config(config_path)?;
    let ticker = single_ticker(ticker)?;
    let market = build_market(&config)?;
    let bars = runtime()?.block_on(market.series(&ticker, days))?;
    print!("{}", history_csv(&bars)?);
    Ok(())
}

fn run_watchlist(
    config_path: &Path,
    user: &str,
    action: WatchlistCommand,
) -> Result<(), AdvisorError> {
    let config = load_config(config_path)?;
    let (_, watchlists) = open_stores(&config)?;
    let rt = runtime()?;

    match action {
        WatchlistCommand::Add { ticker } => {
            let ticker = single_ticker(&ticker)?;
            rt.block_on(watchlists.add(user, &ticker))?;
            eprintln!("Added {} to {}'s watchlist", ticker, user);
        }
        WatchlistCommand::Remove { ticker } => {
            let ticker = single_ticker(&ticker)?;
            if rt.block_on(watchlists.remove(user, &ticker))? {
                eprintln!("Removed {} from {}'s watchlist", ticker, user);
            } else {
                eprintln!("{} was not on {}'s watchlist", ticker, user);
            }
        }
        WatchlistCommand::List => {
            let tickers = rt.block_on(watchlists.list(user))?;
            let market = build_market(&config)?;
            let entries = rt.block_on(watchlist_entries(&market, &tickers));
            print_json(&entries)?;
        }
        WatchlistCommand::Analyze => {
            let tickers = rt.block_on(watchlists.list(user))?;
            let advisor = build_advisor(&config)?;
            let response = rt.block_on(analyze_watchlist(&advisor, &tickers));
            print_json(&response)?;
        }
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), AdvisorError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;
    eprintln!("Config validated successfully");

    let engine = load_engine(&config);
    let state = engine.state()?;
    eprintln!(
        "Policy ready: {} assets, observation length {}",
        state.universe.len(),
        state.policy.observation_dim()
    );
    Ok(())
}
