//! # Azure Service Bus
//!
//! [`AzureConnector`] opens data-plane connections with `azservicebus` and
//! management clients against the namespace's HTTPS endpoint.
//!
//! ```no_run
//! use server::broker::azure::AzureConnector;
//! use server::connection_session::{ConnectRequest, ConnectionSession};
//! use std::sync::Arc;
//!
//! async fn example(connection_string: &str) -> Result<(), Box<dyn std::error::Error>> {
//!     let session = ConnectionSession::new(Arc::new(AzureConnector::new()));
//!     session
//!         .connect(ConnectRequest::new(connection_string).with_entity("orders"))
//!         .await?;
//!     let page = session.peek(10).await?;
//!     println!("{} messages, more: {}", page.len(), page.has_more);
//!     Ok(())
//! }
//! ```

use crate::broker::{
    AdminClient, BrokerConnection, BrokerConnector, BrokerError, BrokerResult, EntityReceiver,
    EntitySender,
};
use crate::utils::ConnectionStringParser;
use async_trait::async_trait;
use azservicebus::core::BasicRetryPolicy;
use azservicebus::{
    ServiceBusClient, ServiceBusClientOptions, ServiceBusReceiverOptions, ServiceBusSenderOptions,
};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod atom;
pub mod consumer;
pub mod conversion;
pub mod management;
pub mod producer;
pub mod sas_token;

pub use consumer::Consumer;
pub use management::{ManagementApiError, ManagementClient};
pub use producer::Producer;

/// Map an SDK failure onto a [`BrokerError`], keeping the SDK text.
pub(crate) fn classify_sdk_error(context: &str, error: impl Display) -> BrokerError {
    let message = format!("{context}: {error}");
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("notfound") || lowered.contains("not found") || lowered.contains("could not be found") {
        BrokerError::not_found(message)
    } else if lowered.contains("unauthorized") || lowered.contains("authorization") {
        BrokerError::authentication(message)
    } else if lowered.contains("timeout") || lowered.contains("timed out") {
        BrokerError::timeout(message)
    } else {
        BrokerError::connection(message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AzureConnector {
    http: reqwest::Client,
}

impl AzureConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BrokerConnector for AzureConnector {
    async fn open_connection(
        &self,
        connection_string: &str,
    ) -> BrokerResult<Arc<dyn BrokerConnection>> {
        let client: ServiceBusClient<BasicRetryPolicy> =
            ServiceBusClient::new_from_connection_string(
                connection_string,
                ServiceBusClientOptions::default(),
            )
            .await
            .map_err(|e| classify_sdk_error("Failed to create Service Bus client", e))?;

        log::debug!("Service Bus client created");
        Ok(Arc::new(AzureConnection {
            client: Arc::new(Mutex::new(Some(client))),
        }))
    }

    async fn open_admin_connection(
        &self,
        admin_connection_string: &str,
    ) -> BrokerResult<Arc<dyn AdminClient>> {
        let parts = ConnectionStringParser::parse(admin_connection_string)
            .map_err(|e| BrokerError::authentication(e.to_string()))?;
        let client = ManagementClient::new(self.http.clone(), &parts)?;
        Ok(Arc::new(client))
    }
}

/// Data-plane connection backed by one `ServiceBusClient`.
pub struct AzureConnection {
    client: Arc<Mutex<Option<ServiceBusClient<BasicRetryPolicy>>>>,
}

#[async_trait]
impl BrokerConnection for AzureConnection {
    async fn open_receiver(
        &self,
        entity_name: &str,
        subscription_name: Option<&str>,
    ) -> BrokerResult<Box<dyn EntityReceiver>> {
        let mut guard = self.client.lock().await;
        let client = guard
            .as_mut()
            .ok_or_else(|| BrokerError::connection("Service Bus client already disposed"))?;

        let receiver = match subscription_name {
            Some(subscription) => client
                .create_receiver_for_subscription(
                    entity_name.to_string(),
                    subscription.to_string(),
                    ServiceBusReceiverOptions::default(),
                )
                .await
                .map_err(|e| classify_sdk_error("Receiver error", e))?,
            None => client
                .create_receiver_for_queue(
                    entity_name.to_string(),
                    ServiceBusReceiverOptions::default(),
                )
                .await
                .map_err(|e| classify_sdk_error("Receiver error", e))?,
        };

        Ok(Box::new(Consumer::new(receiver)))
    }

    async fn open_sender(&self, entity_name: &str) -> BrokerResult<Box<dyn EntitySender>> {
        let mut guard = self.client.lock().await;
        let client = guard
            .as_mut()
            .ok_or_else(|| BrokerError::connection("Service Bus client already disposed"))?;

        let sender = client
            .create_sender(entity_name.to_string(), ServiceBusSenderOptions::default())
            .await
            .map_err(|e| classify_sdk_error("Sender error", e))?;

        Ok(Box::new(Producer::new(sender)))
    }

    async fn close(&self) -> BrokerResult<()> {
        let mut guard = self.client.lock().await;
        if let Some(client) = guard.take() {
            client
                .dispose()
                .await
                .map_err(|e| classify_sdk_error("Failed to dispose Service Bus client", e))?;
            log::debug!("Service Bus client disposed");
        }
        Ok(())
    }
}
