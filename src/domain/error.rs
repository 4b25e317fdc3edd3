//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for tradeflow.
#[derive(Debug, thiserror::Error)]
pub enum TradeflowError {
    #[error("a trade record already exists for {date}")]
    DuplicateTrade { date: NaiveDate },

    #[error("a record with id {id} already exists")]
    DuplicateId { id: String },

    #[error("record {id} not found")]
    RecordNotFound { id: String },

    #[error("no settings configured; run setup first")]
    SettingsMissing,

    #[error("invalid settings: {field} {reason}")]
    InvalidSettings { field: String, reason: String },

    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("{action} needs confirmation; pass --yes")]
    ConfirmationRequired { action: &'static str },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

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

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradeflowError {
    pub fn invalid_record(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }

    pub fn invalid_settings(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSettings {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the caller's input rather than the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            TradeflowError::DuplicateTrade { .. }
                | TradeflowError::DuplicateId { .. }
                | TradeflowError::RecordNotFound { .. }
                | TradeflowError::SettingsMissing
                | TradeflowError::InvalidSettings { .. }
                | TradeflowError::InvalidRecord { .. }
                | TradeflowError::ConfirmationRequired { .. }
        )
    }
}

impl From<&TradeflowError> for std::process::ExitCode {
    fn from(err: &TradeflowError) -> Self {
        let code: u8 = match err {
            TradeflowError::Io(_) | TradeflowError::Serialization(_) => 1,
            TradeflowError::ConfigParse { .. }
            | TradeflowError::ConfigMissing { .. }
            | TradeflowError::ConfigInvalid { .. } => 2,
            TradeflowError::Storage { .. }
            | TradeflowError::Database { .. }
            | TradeflowError::DatabaseQuery { .. } => 3,
            TradeflowError::InvalidSettings { .. }
            | TradeflowError::InvalidRecord { .. }
            | TradeflowError::ConfirmationRequired { .. } => 4,
            TradeflowError::DuplicateTrade { .. }
            | TradeflowError::DuplicateId { .. }
            | TradeflowError::RecordNotFound { .. }
            | TradeflowError::SettingsMissing => 5,
        };
        std::process::ExitCode::from(code)
    }
}
