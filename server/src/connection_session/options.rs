use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_PEEK_SCAN_LIMIT: u32 = 100;
pub const DEFAULT_RECEIVE_WAIT: Duration = Duration::from_secs(5);
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning knobs for a [`ConnectionSession`](super::ConnectionSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Upper bound for any single broker call
    pub operation_timeout: Duration,
    /// How long `receive_one` waits for a message to arrive
    pub receive_wait: Duration,
    /// Messages examined by `peek_by_message_id`
    pub peek_scan_limit: u32,
    /// Page size used by `peek_default`
    pub default_page_size: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            receive_wait: DEFAULT_RECEIVE_WAIT,
            peek_scan_limit: DEFAULT_PEEK_SCAN_LIMIT,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SessionOptions {
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_receive_wait(mut self, wait: Duration) -> Self {
        self.receive_wait = wait;
        self
    }

    pub fn with_peek_scan_limit(mut self, limit: u32) -> Self {
        self.peek_scan_limit = limit;
        self
    }

    pub fn with_default_page_size(mut self, page_size: u32) -> Self {
        self.default_page_size = page_size;
        self
    }
}

/// Inputs to [`ConnectionSession::connect`](super::ConnectionSession::connect).
///
/// Blank optional values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectRequest {
    pub connection_string: String,
    pub admin_connection_string: Option<String>,
    pub entity_name: Option<String>,
    pub subscription_name: Option<String>,
}

impl ConnectRequest {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            ..Default::default()
        }
    }

    pub fn with_admin(mut self, admin_connection_string: impl Into<String>) -> Self {
        self.admin_connection_string = Some(admin_connection_string.into());
        self
    }

    pub fn with_entity(mut self, entity_name: impl Into<String>) -> Self {
        self.entity_name = Some(entity_name.into());
        self
    }

    pub fn with_subscription(mut self, subscription_name: impl Into<String>) -> Self {
        self.subscription_name = Some(subscription_name.into());
        self
    }
}

/// Trimmed value, or `None` when blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
