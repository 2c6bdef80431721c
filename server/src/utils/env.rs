//! Validated access to environment variables.
//!
//! Values are trimmed; a variable holding only whitespace is treated the same
//! as an unset one by [`EnvUtils::get_optional_var`].

use thiserror::Error;

/// Connection string for the data plane.
pub const CONNECTION_STRING_VAR: &str = "CONNECTION_STRING";
/// Connection string with manage rights, enables administrative mode.
pub const ROOT_CONNECTION_STRING_VAR: &str = "ROOT_CONNECTION_STRING";

#[derive(Debug, Error)]
pub enum EnvVarError {
    #[error(
        "Environment variable '{name}' not found. Please set this variable in your .env file or environment."
    )]
    NotFound { name: String },

    #[error(
        "Environment variable '{name}' contains invalid UTF-8 characters. Please check the value."
    )]
    InvalidUtf8 { name: String },

    #[error("Environment variable '{name}' is empty. Please provide a valid value.")]
    Empty { name: String },
}

/// Environment lookups used when resolving connection settings.
///
/// ```no_run
/// use server::utils::EnvUtils;
/// use server::utils::env::ROOT_CONNECTION_STRING_VAR;
///
/// let admin = EnvUtils::get_optional_var(ROOT_CONNECTION_STRING_VAR);
/// ```
pub struct EnvUtils;

impl EnvUtils {
    pub fn has_non_empty_var(name: &str) -> bool {
        std::env::var(name)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }

    /// Read `name`, trimmed.
    ///
    /// # Errors
    ///
    /// [`EnvVarError::NotFound`] when unset, [`EnvVarError::Empty`] when blank
    /// and [`EnvVarError::InvalidUtf8`] when the value is not valid UTF-8.
    pub fn get_validated_var(name: &str) -> Result<String, EnvVarError> {
        let name_owned = || name.to_string();
        match std::env::var(name) {
            Ok(value) if value.trim().is_empty() => Err(EnvVarError::Empty { name: name_owned() }),
            Ok(value) => Ok(value.trim().to_string()),
            Err(std::env::VarError::NotPresent) => Err(EnvVarError::NotFound { name: name_owned() }),
            Err(std::env::VarError::NotUnicode(_)) => {
                Err(EnvVarError::InvalidUtf8 { name: name_owned() })
            }
        }
    }

    pub fn get_optional_var(name: &str) -> Option<String> {
        Self::get_validated_var(name).ok()
    }
}
