//! Domain error types.

/// Top-level error type for tickerwise.
///
/// Every external call site converts its transport failure or timeout into
/// one of these variants before it propagates, so the orchestrator can
/// recover at the smallest scope that keeps partial results.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("could not resolve request: {reason}")]
    ResolutionFailure { reason: String },

    #[error("no data for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("inference unavailable: {reason}")]
    InferenceUnavailable { reason: String },

    #[error("malformed narrative for {ticker}: {reason}")]
    NarrativeMalformed { ticker: String, reason: String },

    #[error("observation has {actual} values, policy expects {expected}")]
    ObservationShape { expected: usize, actual: usize },

    #[error("ticker {0} is not part of the asset universe")]
    UnknownTicker(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("http error: {reason}")]
    Http { reason: String },

    #[error("policy artifact error in {path}: {reason}")]
    Artifact { path: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("store error: {reason}")]
    Store { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AdvisorError {
    pub fn data_unavailable(ticker: &str, reason: impl Into<String>) -> Self {
        AdvisorError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn narrative_malformed(ticker: &str, reason: impl Into<String>) -> Self {
        AdvisorError::NarrativeMalformed {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        AdvisorError::Timeout {
            operation: operation.into(),
            seconds,
        }
    }
}

impl From<reqwest::Error> for AdvisorError {
    fn from(err: reqwest::Error) -> Self {
        AdvisorError::Http {
            reason: err.to_string(),
        }
    }
}

impl AdvisorError {
    /// Process exit status for a command that failed with this error.
    pub fn exit_status(&self) -> u8 {
        match self {
            AdvisorError::Io(_)
            | AdvisorError::Http { .. }
            | AdvisorError::Timeout { .. }
            | AdvisorError::ResolutionFailure { .. }
            | AdvisorError::NarrativeMalformed { .. } => 1,
            AdvisorError::ConfigParse { .. }
            | AdvisorError::ConfigMissing { .. }
            | AdvisorError::ConfigInvalid { .. } => 2,
            AdvisorError::Store { .. } => 3,
            AdvisorError::InferenceUnavailable { .. }
            | AdvisorError::Artifact { .. }
            | AdvisorError::ObservationShape { .. } => 4,
            AdvisorError::DataUnavailable { .. } | AdvisorError::UnknownTicker(_) => 5,
        }
    }
}

impl From<&AdvisorError> for std::process::ExitCode {
    fn from(err: &AdvisorError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
