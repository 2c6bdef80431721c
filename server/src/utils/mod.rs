//! # Utilities
//!
//! Small helpers used across the crate.
//!
//! - [`connection_string`] - host and credential extraction from connection strings
//! - [`duration`] - ISO-8601 duration parsing and compact rendering
//! - [`env`] - validated environment variable access
//!
//! ```no_run
//! use server::utils::{ConnectionStringParser, EnvUtils};
//!
//! let raw = EnvUtils::get_optional_var("CONNECTION_STRING")
//!     .unwrap_or_else(|| "Endpoint=sb://localhost;UseDevelopmentEmulator=true;".to_string());
//! let host = ConnectionStringParser::extract_host(&raw)?;
//! ```

pub mod connection_string;
pub mod duration;
pub mod env;

pub use connection_string::{ConnectionStringError, ConnectionStringParser, ConnectionStringParts};
pub use env::{EnvUtils, EnvVarError};
