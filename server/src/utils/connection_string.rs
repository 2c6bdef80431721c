use thiserror::Error;

const ENDPOINT_PREFIX: &str = "Endpoint=sb://";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionStringError {
    #[error(
        "Connection string is empty or only contains whitespace. Please provide a valid Service Bus connection string."
    )]
    Empty,

    #[error(
        "Connection string must start with 'Endpoint=sb://'. Expected format: 'Endpoint=sb://your-namespace.servicebus.windows.net/;SharedAccessKeyName=...;SharedAccessKey=...'"
    )]
    MissingEndpoint,

    #[error("Connection string endpoint does not name a host")]
    EmptyHost,

    #[error("Connection string is missing the '{0}' parameter")]
    MissingComponent(&'static str),
}

/// The pieces of a shared-access-key connection string the crate needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStringParts {
    pub host: String,
    pub shared_access_key_name: Option<String>,
    pub shared_access_key: Option<String>,
    pub use_development_emulator: bool,
}

impl ConnectionStringParts {
    /// Key name and key, or the name of the first missing component.
    pub fn credentials(&self) -> Result<(&str, &str), ConnectionStringError> {
        let name = self
            .shared_access_key_name
            .as_deref()
            .ok_or(ConnectionStringError::MissingComponent("SharedAccessKeyName"))?;
        let key = self
            .shared_access_key
            .as_deref()
            .ok_or(ConnectionStringError::MissingComponent("SharedAccessKey"))?;
        Ok((name, key))
    }
}

/// Utility functions for parsing Service Bus connection strings
pub struct ConnectionStringParser;

impl ConnectionStringParser {
    /// Extract the namespace host from a connection string.
    ///
    /// The string must start with `Endpoint=sb://` (any letter case). The host
    /// runs from the end of that prefix to the first `;`, or to the end of the
    /// string when there is none, with trailing `/` removed.
    ///
    /// # Errors
    /// * [`ConnectionStringError::Empty`] for blank input
    /// * [`ConnectionStringError::MissingEndpoint`] when the prefix is absent
    /// * [`ConnectionStringError::EmptyHost`] when nothing is left after trimming
    pub fn extract_host(connection_string: &str) -> Result<String, ConnectionStringError> {
        let trimmed = connection_string.trim();
        if trimmed.is_empty() {
            return Err(ConnectionStringError::Empty);
        }

        let rest = trimmed
            .get(..ENDPOINT_PREFIX.len())
            .filter(|head| head.eq_ignore_ascii_case(ENDPOINT_PREFIX))
            .map(|_| &trimmed[ENDPOINT_PREFIX.len()..])
            .ok_or(ConnectionStringError::MissingEndpoint)?;

        let host = rest
            .split(';')
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');

        if host.is_empty() {
            return Err(ConnectionStringError::EmptyHost);
        }
        Ok(host.to_string())
    }

    /// Parse the host together with the shared access key components.
    pub fn parse(connection_string: &str) -> Result<ConnectionStringParts, ConnectionStringError> {
        let host = Self::extract_host(connection_string)?;
        let mut parts = ConnectionStringParts {
            host,
            shared_access_key_name: None,
            shared_access_key: None,
            use_development_emulator: false,
        };

        for segment in connection_string.trim().split(';') {
            let Some((key, value)) = segment.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "sharedaccesskeyname" if !value.is_empty() => {
                    parts.shared_access_key_name = Some(value.to_string())
                }
                "sharedaccesskey" if !value.is_empty() => {
                    parts.shared_access_key = Some(value.to_string())
                }
                "usedevelopmentemulator" => {
                    parts.use_development_emulator = value.eq_ignore_ascii_case("true")
                }
                _ => {}
            }
        }

        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};

    #[test]
    fn test_extract_host_variants() {
        assert_eq!(
            assert_ok!(ConnectionStringParser::extract_host(
                "Endpoint=sb://ns.servicebus.windows.net/;SharedAccessKeyName=a;SharedAccessKey=b"
            )),
            "ns.servicebus.windows.net"
        );
        assert_eq!(
            assert_ok!(ConnectionStringParser::extract_host("endpoint=SB://localhost")),
            "localhost"
        );
        assert_eq!(
            assert_ok!(ConnectionStringParser::extract_host("Endpoint=sb://host//;x=y")),
            "host"
        );
    }

    #[test]
    fn test_extract_host_failures() {
        assert_eq!(
            assert_err!(ConnectionStringParser::extract_host("   ")),
            ConnectionStringError::Empty
        );
        assert_eq!(
            assert_err!(ConnectionStringParser::extract_host(
                "SharedAccessKeyName=a;Endpoint=sb://host/"
            )),
            ConnectionStringError::MissingEndpoint
        );
        assert_eq!(
            assert_err!(ConnectionStringParser::extract_host("Endpoint=sb:///;")),
            ConnectionStringError::EmptyHost
        );
        assert_eq!(
            assert_err!(ConnectionStringParser::extract_host("Endpoint=sb")),
            ConnectionStringError::MissingEndpoint
        );
    }

    #[test]
    fn test_parse_emulator_string() {
        let parts = assert_ok!(ConnectionStringParser::parse(
            "Endpoint=sb://localhost;SharedAccessKeyName=RootManageSharedAccessKey;SharedAccessKey=SAS_KEY_VALUE;UseDevelopmentEmulator=true;"
        ));
        assert_eq!(parts.host, "localhost");
        assert!(parts.use_development_emulator);
        assert_eq!(
            assert_ok!(parts.credentials()),
            ("RootManageSharedAccessKey", "SAS_KEY_VALUE")
        );
    }

    #[test]
    fn test_credentials_report_missing_key() {
        let parts = assert_ok!(ConnectionStringParser::parse(
            "Endpoint=sb://ns/;SharedAccessKeyName=reader"
        ));
        assert_eq!(
            assert_err!(parts.credentials()),
            ConnectionStringError::MissingComponent("SharedAccessKey")
        );
    }
}
