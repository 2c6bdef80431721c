use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Generator for Shared Access Signature tokens scoped to one resource URI.
///
/// The signature is HMAC-SHA256 over `<url-encoded uri>\n<expiry>` keyed with
/// the raw shared access key text.
///
/// ```no_run
/// use server::broker::azure::sas_token::SasTokenGenerator;
///
/// let generator = SasTokenGenerator::new("https://my-namespace.servicebus.windows.net/");
/// let token = generator.generate("RootManageSharedAccessKey", "key", chrono::Duration::hours(1))?;
/// ```
#[derive(Debug, Clone)]
pub struct SasTokenGenerator {
    resource_uri: String,
}

impl SasTokenGenerator {
    pub fn new(resource_uri: impl Into<String>) -> Self {
        Self {
            resource_uri: resource_uri.into(),
        }
    }

    /// # Errors
    ///
    /// Returns the HMAC error text if the key cannot be used for signing.
    pub fn generate(&self, key_name: &str, key: &str, validity: Duration) -> Result<String, String> {
        let expiry = (Utc::now() + validity).timestamp();
        let encoded_uri = urlencoding::encode(&self.resource_uri.to_lowercase()).into_owned();
        let string_to_sign = format!("{encoded_uri}\n{expiry}");

        let mut mac = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|e| format!("Failed to create HMAC: {e}"))?;
        mac.update(string_to_sign.as_bytes());
        let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        Ok(format!(
            "SharedAccessSignature sr={}&sig={}&se={}&skn={}",
            encoded_uri,
            urlencoding::encode(&signature),
            expiry,
            key_name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::assert_ok;

    #[test]
    fn test_token_layout() {
        let generator = SasTokenGenerator::new("https://NS.servicebus.windows.net/");
        let token = assert_ok!(generator.generate("reader", "secret", Duration::minutes(5)));

        assert!(token.starts_with(
            "SharedAccessSignature sr=https%3A%2F%2Fns.servicebus.windows.net%2F&sig="
        ));
        assert!(token.ends_with("&skn=reader"));
        assert!(token.contains("&se="));
    }
}
