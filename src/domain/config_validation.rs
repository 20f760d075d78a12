//! Configuration validation.
//!
//! Validates every section before the pipeline is built and reports the
//! first violation as `ConfigMissing` or `ConfigInvalid`.

use crate::domain::error::AdvisorError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_MARKET_PROVIDER: &str = "yahoo";
pub const DEFAULT_MARKET_TIMEOUT_SECS: i64 = 15;
pub const DEFAULT_LLM_URL: &str = "http://localhost:11434";
pub const DEFAULT_LLM_MODEL: &str = "gemma3";
pub const DEFAULT_LLM_TIMEOUT_SECS: i64 = 60;
pub const DEFAULT_SQLITE_POOL_SIZE: i64 = 4;
pub const DEFAULT_LOG_FILTER: &str = "info";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), AdvisorError> {
    validate_policy(config)?;
    validate_market(config)?;
    validate_llm(config)?;
    validate_pipeline(config)?;
    validate_sqlite(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> AdvisorError {
    AdvisorError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, AdvisorError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(AdvisorError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<(), AdvisorError> {
    if config.get_int(section, key, default) <= 0 {
        return Err(invalid(section, key, format!("{} must be positive", key)));
    }
    Ok(())
}

fn validate_policy(config: &dyn ConfigPort) -> Result<(), AdvisorError> {
    require(config, "policy", "model_path")?;
    require(config, "policy", "training_data_path")?;
    let amount = config.get_double(
        "policy",
        "initial_amount",
        crate::domain::observation::INITIAL_AMOUNT,
    );
    if !amount.is_finite() || amount <= 0.0 {
        return Err(invalid("policy", "initial_amount", "initial_amount must be positive"));
    }
    Ok(())
}

fn validate_market(config: &dyn ConfigPort) -> Result<(), AdvisorError> {
    let provider = config
        .get_string_or("market", "provider", DEFAULT_MARKET_PROVIDER)
        .to_lowercase();
    match provider.as_str() {
        "yahoo" => {}
        "csv" => {
            require(config, "market", "csv_dir")?;
        }
        other => {
            return Err(invalid(
                "market",
                "provider",
                format!("unknown provider '{}', expected yahoo or csv", other),
            ));
        }
    }
    positive_int(config, "market", "timeout_secs", DEFAULT_MARKET_TIMEOUT_SECS)
}

fn validate_llm(config: &dyn ConfigPort) -> Result<(), AdvisorError> {
    let url = config.get_string_or("llm", "url", DEFAULT_LLM_URL);
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(invalid("llm", "url", "url must start with http:// or https://"));
    }
    if config.get_string_or("llm", "model", DEFAULT_LLM_MODEL).trim().is_empty() {
        return Err(invalid("llm", "model", "model must not be empty"));
    }
    positive_int(config, "llm", "timeout_secs", DEFAULT_LLM_TIMEOUT_SECS)
}

fn validate_pipeline(config: &dyn ConfigPort) -> Result<(), AdvisorError> {
    positive_int(
        config,
        "pipeline",
        "default_window_days",
        crate::domain::extraction::DEFAULT_WINDOW_DAYS as i64,
    )
}

fn validate_sqlite(config: &dyn ConfigPort) -> Result<(), AdvisorError> {
    positive_int(config, "sqlite", "pool_size", DEFAULT_SQLITE_POOL_SIZE)
}

fn validate_logging(config: &dyn ConfigPort) -> Result<(), AdvisorError> {
    let filter = config.get_string_or("logging", "filter", DEFAULT_LOG_FILTER);
    tracing_subscriber::EnvFilter::try_new(&filter)
        .map(|_| ())
        .map_err(|e| invalid("logging", "filter", e.to_string()))
}
