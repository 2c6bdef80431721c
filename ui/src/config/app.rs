use super::{LoggingConfig, azure::ServicebusConfig, limits::*, validation::ConfigValidationError};
use busview_server::connection_session::SessionOptions;
use busview_server::connection_session::options::{
    DEFAULT_OPERATION_TIMEOUT, DEFAULT_PAGE_SIZE, DEFAULT_PEEK_SCAN_LIMIT, DEFAULT_RECEIVE_WAIT,
};
use serde::Deserialize;
use std::time::Duration;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main application configuration
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    page_size: Option<u32>,
    peek_scan_limit: Option<u32>,
    receive_wait_secs: Option<u64>,
    operation_timeout_secs: Option<u64>,

    #[serde(default)]
    servicebus: ServicebusConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl AppConfig {
    /// Validate the configuration against defined limits
    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        let page_size = self.page_size();
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            errors.push(ConfigValidationError::PageSize {
                configured: page_size,
                min_limit: MIN_PAGE_SIZE,
                max_limit: MAX_PAGE_SIZE,
            });
        }

        let timeout = self.operation_timeout_secs();
        if timeout == 0 || timeout > MAX_OPERATION_TIMEOUT_SECS {
            errors.push(ConfigValidationError::OperationTimeout {
                configured: timeout,
                limit: MAX_OPERATION_TIMEOUT_SECS,
            });
        }

        if self.receive_wait_secs() > MAX_RECEIVE_WAIT_SECS {
            errors.push(ConfigValidationError::ReceiveWait {
                configured: self.receive_wait_secs(),
                limit: MAX_RECEIVE_WAIT_SECS,
            });
        }

        let scan = self.peek_scan_limit();
        if scan == 0 || scan > MAX_PEEK_SCAN_LIMIT {
            errors.push(ConfigValidationError::PeekScanLimit {
                configured: scan,
                limit: MAX_PEEK_SCAN_LIMIT,
            });
        }

        let level = self.logging.level().to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ConfigValidationError::LogLevel {
                configured: self.logging.level().to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Override the configured page size, used by the `--page-size` flag
    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = Some(page_size);
    }

    pub fn peek_scan_limit(&self) -> u32 {
        self.peek_scan_limit.unwrap_or(DEFAULT_PEEK_SCAN_LIMIT)
    }

    pub fn receive_wait_secs(&self) -> u64 {
        self.receive_wait_secs
            .unwrap_or(DEFAULT_RECEIVE_WAIT.as_secs())
    }

    pub fn operation_timeout_secs(&self) -> u64 {
        self.operation_timeout_secs
            .unwrap_or(DEFAULT_OPERATION_TIMEOUT.as_secs())
    }

    pub fn servicebus(&self) -> &ServicebusConfig {
        &self.servicebus
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Session tuning derived from the validated configuration
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::default()
            .with_default_page_size(self.page_size())
            .with_peek_scan_limit(self.peek_scan_limit())
            .with_receive_wait(Duration::from_secs(self.receive_wait_secs()))
            .with_operation_timeout(Duration::from_secs(self.operation_timeout_secs()))
    }
}
