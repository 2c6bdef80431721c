//! Management-plane client for listing entities and reading their properties.
//!
//! Requests go to the namespace's Atom endpoint and are authorized with a
//! short-lived SAS token generated from the admin connection string.

use crate::broker::azure::atom::{self, Entry, InvalidField};
use crate::broker::azure::sas_token::SasTokenGenerator;
use crate::broker::{AdminClient, BrokerError, BrokerResult};
use crate::model::{EntityDescriptor, EntityProperties};
use crate::utils::ConnectionStringParts;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

const API_VERSION: &str = "2021-05";
const PAGE_SIZE: usize = 100;
const TOKEN_VALIDITY_MINUTES: i64 = 20;

#[derive(Debug, Error)]
pub enum ManagementApiError {
    #[error("Admin connection string is incomplete: {0}")]
    Credentials(String),

    #[error("Failed to sign management request: {0}")]
    Signing(String),

    #[error("Management request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Management endpoint returned HTTP {status} for {url}: {body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to parse management response from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("Field {field} has unexpected value '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("{0} does not exist")]
    NotFound(String),
}

impl From<InvalidField> for ManagementApiError {
    fn from(err: InvalidField) -> Self {
        ManagementApiError::InvalidField {
            field: err.field,
            value: err.value,
        }
    }
}

impl From<ManagementApiError> for BrokerError {
    fn from(err: ManagementApiError) -> Self {
        let message = err.to_string();
        match err {
            ManagementApiError::Credentials(_) | ManagementApiError::Signing(_) => {
                BrokerError::authentication(message)
            }
            ManagementApiError::Http { status, .. } if status == 401 || status == 403 => {
                BrokerError::authentication(message)
            }
            ManagementApiError::Http { status: 404, .. } | ManagementApiError::NotFound(_) => {
                BrokerError::not_found(message)
            }
            ManagementApiError::Request { .. } => BrokerError::connection(message),
            _ => BrokerError::other(message),
        }
    }
}

/// Atom endpoint client for one namespace.
#[derive(Clone)]
#[cfg_attr(test, derive(Debug))]
pub struct ManagementClient {
    http: reqwest::Client,
    base_url: String,
    key_name: String,
    key: String,
    signer: SasTokenGenerator,
}

impl ManagementClient {
    /// Build a client from parsed admin connection string parts.
    ///
    /// # Errors
    ///
    /// Fails when the key name or key is missing.
    pub fn new(http: reqwest::Client, parts: &ConnectionStringParts) -> Result<Self, ManagementApiError> {
        let (key_name, key) = parts
            .credentials()
            .map_err(|e| ManagementApiError::Credentials(e.to_string()))?;
        let scheme = if parts.use_development_emulator {
            "http"
        } else {
            "https"
        };
        let base_url = format!("{scheme}://{}", parts.host);

        Ok(Self {
            http,
            signer: SasTokenGenerator::new(format!("{base_url}/")),
            base_url,
            key_name: key_name.to_string(),
            key: key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, url: &str) -> Result<String, ManagementApiError> {
        let token = self
            .signer
            .generate(
                &self.key_name,
                &self.key,
                chrono::Duration::minutes(TOKEN_VALIDITY_MINUTES),
            )
            .map_err(ManagementApiError::Signing)?;

        let response = self
            .http
            .get(url)
            .header("Authorization", token)
            .send()
            .await
            .map_err(|e| ManagementApiError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ManagementApiError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if status != StatusCode::OK {
            return Err(ManagementApiError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Walk a listing with `$skip`/`$top` until a short page comes back.
    async fn list_all(&self, path: &str) -> Result<Vec<String>, ManagementApiError> {
        let mut names = Vec::new();
        let mut skip = 0;

        loop {
            let url = format!(
                "{}/{path}?$skip={skip}&$top={PAGE_SIZE}&api-version={API_VERSION}",
                self.base_url
            );
            let body = self.get(&url).await?;
            let feed = atom::parse_feed(&body).map_err(|e| ManagementApiError::Parse {
                url: url.clone(),
                reason: e.to_string(),
            })?;

            let count = feed.entries.len();
            names.extend(feed.entries.into_iter().map(|entry| entry.title.value));
            log::debug!("Listed {count} entities from {path} (skip {skip})");

            if count < PAGE_SIZE {
                return Ok(names);
            }
            skip += count;
        }
    }

    async fn get_entry(&self, path: &str, label: String) -> Result<Entry, ManagementApiError> {
        let url = format!("{}/{path}?api-version={API_VERSION}", self.base_url);
        let body = match self.get(&url).await {
            Err(ManagementApiError::Http { status: 404, .. }) => {
                return Err(ManagementApiError::NotFound(label));
            }
            other => other?,
        };

        // An unknown entity comes back as an empty feed rather than a 404.
        match atom::parse_entry(&body) {
            Ok(entry) if entry.content.is_some() => Ok(entry),
            _ => match atom::parse_feed(&body) {
                Ok(feed) if feed.entries.is_empty() => Err(ManagementApiError::NotFound(label)),
                Ok(feed) => feed
                    .entries
                    .into_iter()
                    .next()
                    .ok_or(ManagementApiError::NotFound(label)),
                Err(e) => Err(ManagementApiError::Parse {
                    url,
                    reason: e.to_string(),
                }),
            },
        }
    }

    async fn entity_properties(
        &self,
        entity: &EntityDescriptor,
    ) -> Result<EntityProperties, ManagementApiError> {
        let label = entity.to_string();
        let missing = || ManagementApiError::NotFound(entity.to_string());

        match entity {
            EntityDescriptor::Queue { name } => {
                let entry = self.get_entry(&encode(name), label).await?;
                let description = entry.content.and_then(|c| c.queue).ok_or_else(missing)?;
                Ok(description.into_properties(name)?)
            }
            EntityDescriptor::Topic { name } => {
                let entry = self.get_entry(&encode(name), label).await?;
                let description = entry.content.and_then(|c| c.topic).ok_or_else(missing)?;
                Ok(description.into_properties(name)?)
            }
            EntityDescriptor::Subscription { name, topic_name } => {
                let path = format!("{}/Subscriptions/{}", encode(topic_name), encode(name));
                let entry = self.get_entry(&path, label).await?;
                let description = entry
                    .content
                    .and_then(|c| c.subscription)
                    .ok_or_else(missing)?;
                Ok(description.into_properties(name, topic_name)?)
            }
        }
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[async_trait]
impl AdminClient for ManagementClient {
    async fn list_queues(&self) -> BrokerResult<Vec<String>> {
        Ok(self.list_all("$Resources/Queues").await?)
    }

    async fn list_topics(&self) -> BrokerResult<Vec<String>> {
        Ok(self.list_all("$Resources/Topics").await?)
    }

    async fn list_subscriptions(&self, topic_name: &str) -> BrokerResult<Vec<String>> {
        let path = format!("{}/Subscriptions", encode(topic_name));
        Ok(self.list_all(&path).await?)
    }

    async fn get_entity_properties(
        &self,
        entity: &EntityDescriptor,
    ) -> BrokerResult<EntityProperties> {
        Ok(self.entity_properties(entity).await?)
    }
}
