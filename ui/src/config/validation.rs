use super::app::AppConfig;

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid page_size: {configured} (min: {min_limit}, max: {max_limit})")]
    PageSize {
        configured: u32,
        min_limit: u32,
        max_limit: u32,
    },
    #[error("Invalid operation_timeout_secs: {configured} (min: 1, max: {limit})")]
    OperationTimeout { configured: u64, limit: u64 },
    #[error("Invalid receive_wait_secs: {configured} (limit: {limit})")]
    ReceiveWait { configured: u64, limit: u64 },
    #[error("Invalid peek_scan_limit: {configured} (min: 1, max: {limit})")]
    PeekScanLimit { configured: u32, limit: u32 },
    #[error("Invalid logging.level: {configured}")]
    LogLevel { configured: String },
}

impl ConfigValidationError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigValidationError::PageSize {
                configured,
                min_limit,
                max_limit,
            } => {
                format!(
                    "Page size out of range!\n\n\
                    Your configured value: {configured}\n\
                    Valid range: {min_limit} - {max_limit}\n\n\
                    Please update page_size in config.toml to a value between {min_limit} and {max_limit}."
                )
            }
            ConfigValidationError::OperationTimeout { configured, limit } => {
                format!(
                    "Operation timeout out of range!\n\n\
                    Your configured value: {configured} seconds\n\
                    Valid range: 1 - {limit} seconds\n\n\
                    Please update operation_timeout_secs in config.toml."
                )
            }
            ConfigValidationError::ReceiveWait { configured, limit } => {
                format!(
                    "Receive wait too high!\n\n\
                    Your configured value: {configured} seconds\n\
                    Recommended maximum: {limit} seconds\n\n\
                    Please update receive_wait_secs in config.toml."
                )
            }
            ConfigValidationError::PeekScanLimit { configured, limit } => {
                format!(
                    "Peek scan limit out of range!\n\n\
                    Your configured value: {configured}\n\
                    Valid range: 1 - {limit}\n\n\
                    Please update peek_scan_limit in config.toml."
                )
            }
            ConfigValidationError::LogLevel { configured } => {
                format!(
                    "Unknown log level '{configured}'!\n\n\
                    Valid levels: trace, debug, info, warn, error\n\n\
                    Please update [logging] level in config.toml."
                )
            }
        }
    }
}

/// Configuration loading result
pub enum ConfigLoadResult {
    Success(Box<AppConfig>),
    LoadError(String),
    DeserializeError(String),
}
