//! Bounds enforced on `config.toml` values before a session is built.

/// Smallest accepted page size
pub const MIN_PAGE_SIZE: u32 = 1;

/// Largest accepted page size
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Maximum reasonable timeout for a single broker call (10 minutes)
pub const MAX_OPERATION_TIMEOUT_SECS: u64 = 600;

/// Maximum time a receive waits for a message to arrive
pub const MAX_RECEIVE_WAIT_SECS: u64 = 300;

/// Maximum number of messages scanned by a lookup by id
pub const MAX_PEEK_SCAN_LIMIT: u32 = 5000;
