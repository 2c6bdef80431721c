//! # Broker Seam
//!
//! The session talks to a message broker only through the traits in this
//! module. Two implementations ship with the crate:
//!
//! - [`azure`] - Azure Service Bus, data plane through `azservicebus` and the
//!   management plane through the namespace's HTTPS endpoint
//! - [`memory`] - an in-process broker used by tests and the console's demo mode
//!
//! Handle lifetimes follow the session's usage: a [`BrokerConnection`] lives
//! from connect to disconnect, while every [`EntityReceiver`] and
//! [`EntitySender`] is opened for a single operation and closed right after.

use crate::model::{EntityDescriptor, EntityProperties, MessageDetail, OutgoingMessage};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub mod azure;
pub mod errors;
pub mod memory;

pub use errors::{BrokerError, BrokerErrorKind, BrokerResult};

/// Opens connections to a namespace.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Open the data-plane connection used for peek, receive and send.
    async fn open_connection(
        &self,
        connection_string: &str,
    ) -> BrokerResult<Arc<dyn BrokerConnection>>;

    /// Open a management-plane client from a connection string with manage rights.
    async fn open_admin_connection(
        &self,
        admin_connection_string: &str,
    ) -> BrokerResult<Arc<dyn AdminClient>>;
}

/// A live data-plane connection.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Open a receiver on a queue, or on a subscription of `entity_name` when
    /// `subscription_name` is given.
    async fn open_receiver(
        &self,
        entity_name: &str,
        subscription_name: Option<&str>,
    ) -> BrokerResult<Box<dyn EntityReceiver>>;

    /// Open a sender on a queue or topic.
    async fn open_sender(&self, entity_name: &str) -> BrokerResult<Box<dyn EntitySender>>;

    /// Release the connection. Closing twice is not an error.
    async fn close(&self) -> BrokerResult<()>;
}

/// Management-plane operations.
#[async_trait]
pub trait AdminClient: Send + Sync {
    async fn list_queues(&self) -> BrokerResult<Vec<String>>;

    async fn list_topics(&self) -> BrokerResult<Vec<String>>;

    async fn list_subscriptions(&self, topic_name: &str) -> BrokerResult<Vec<String>>;

    /// Fails with [`BrokerErrorKind::NotFound`] when the entity does not exist.
    async fn get_entity_properties(
        &self,
        entity: &EntityDescriptor,
    ) -> BrokerResult<EntityProperties>;
}

/// A message received under a lock, waiting to be completed.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub detail: MessageDetail,
    /// Receiver-local handle identifying the lock.
    pub lock_token: u64,
}

/// A receiver scoped to one entity.
#[async_trait]
pub trait EntityReceiver: Send {
    /// Read up to `max_count` messages without locking or removing them.
    async fn peek(&mut self, max_count: u32) -> BrokerResult<Vec<MessageDetail>>;

    /// Wait up to `max_wait` for one message. `None` when nothing arrived.
    async fn receive_one(&mut self, max_wait: Duration) -> BrokerResult<Option<Delivery>>;

    /// Settle a delivery so the broker removes the message.
    async fn complete(&mut self, delivery: &Delivery) -> BrokerResult<()>;

    async fn close(&mut self) -> BrokerResult<()>;
}

/// A sender scoped to one queue or topic.
#[async_trait]
pub trait EntitySender: Send {
    async fn send(&mut self, message: OutgoingMessage) -> BrokerResult<()>;

    async fn close(&mut self) -> BrokerResult<()>;
}
