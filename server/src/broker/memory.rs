//! In-process broker.
//!
//! Holds queues and topics in memory and implements every broker trait, so a
//! [`ConnectionSession`](crate::connection_session::ConnectionSession) can run
//! without a namespace. Messages sent to a topic are copied to each of its
//! subscriptions. Received messages stay locked until completed; locks still
//! held when their receiver closes are released back to the entity.
//!
//! Failures and latency can be injected per [`FailurePoint`], and
//! [`HandleStats`] counts every handle opened and closed.

use crate::broker::{
    AdminClient, BrokerConnection, BrokerConnector, BrokerError, BrokerResult, Delivery,
    EntityReceiver, EntitySender,
};
use crate::model::{
    EntityDescriptor, EntityProperties, MessageDetail, OutgoingMessage, QueueProperties,
    SubscriptionProperties, TopicProperties,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

const DEFAULT_LOCK_DURATION: Duration = Duration::from_secs(60);
const DEFAULT_TIME_TO_LIVE: Duration = Duration::from_secs(14 * 24 * 60 * 60);
const DEFAULT_DUPLICATE_WINDOW: Duration = Duration::from_secs(10 * 60);
const DEFAULT_MAX_DELIVERY_COUNT: u32 = 10;

/// Broker calls that can be made to fail or stall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    OpenConnection,
    OpenAdminConnection,
    CloseConnection,
    ListQueues,
    ListTopics,
    ListSubscriptions,
    GetEntityProperties,
    OpenReceiver,
    OpenSender,
    Peek,
    Receive,
    Complete,
    Send,
    CloseReceiver,
    CloseSender,
}

/// Counters of handles opened and closed over the broker's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleStats {
    pub connections_opened: usize,
    pub connections_closed: usize,
    pub admin_clients_opened: usize,
    pub receivers_opened: usize,
    pub receivers_closed: usize,
    pub senders_opened: usize,
    pub senders_closed: usize,
    pub messages_completed: usize,
}

impl HandleStats {
    pub fn open_connections(&self) -> usize {
        self.connections_opened - self.connections_closed
    }

    pub fn open_receivers(&self) -> usize {
        self.receivers_opened - self.receivers_closed
    }

    pub fn open_senders(&self) -> usize {
        self.senders_opened - self.senders_closed
    }
}

#[derive(Debug, Clone)]
struct StoredMessage {
    detail: MessageDetail,
    locked_by: Option<u64>,
}

#[derive(Debug, Default)]
struct Store {
    messages: Vec<StoredMessage>,
}

impl Store {
    fn push(&mut self, detail: MessageDetail) {
        self.messages.push(StoredMessage {
            detail,
            locked_by: None,
        });
    }

    fn release(&mut self, token: u64) {
        for message in &mut self.messages {
            if message.locked_by == Some(token) {
                message.locked_by = None;
            }
        }
    }
}

#[derive(Debug)]
struct Topic {
    name: String,
    subscriptions: Vec<(String, Store)>,
}

#[derive(Debug, Default)]
struct BrokerState {
    queues: Vec<(String, Store)>,
    topics: Vec<Topic>,
    next_sequence: i64,
    next_lock_token: u64,
    failures: HashMap<FailurePoint, BrokerError>,
    delays: HashMap<FailurePoint, Duration>,
    stats: HandleStats,
}

impl BrokerState {
    fn topic_mut(&mut self, name: &str) -> Option<&mut Topic> {
        self.topics.iter_mut().find(|t| t.name == name)
    }

    fn store_mut(&mut self, entity_name: &str, subscription: Option<&str>) -> BrokerResult<&mut Store> {
        match subscription {
            None => self
                .queues
                .iter_mut()
                .find(|(name, _)| name == entity_name)
                .map(|(_, store)| store)
                .ok_or_else(|| BrokerError::not_found(format!("Queue '{entity_name}' does not exist"))),
            Some(subscription) => self
                .topic_mut(entity_name)
                .and_then(|topic| {
                    topic
                        .subscriptions
                        .iter_mut()
                        .find(|(name, _)| name == subscription)
                })
                .map(|(_, store)| store)
                .ok_or_else(|| {
                    BrokerError::not_found(format!(
                        "Subscription '{subscription}' on topic '{entity_name}' does not exist"
                    ))
                }),
        }
    }

    fn publish(&mut self, entity_name: &str, message: OutgoingMessage) -> BrokerResult<i64> {
        self.next_sequence += 1;
        let sequence = self.next_sequence;
        let detail = MessageDetail::new(
            message.message_id,
            sequence,
            message.body,
            message.content_type.as_deref(),
            Utc::now(),
        )
        .with_properties(message.application_properties);

        if let Some((_, store)) = self.queues.iter_mut().find(|(name, _)| name == entity_name) {
            store.push(detail);
            return Ok(sequence);
        }
        if let Some(topic) = self.topic_mut(entity_name) {
            for (_, store) in &mut topic.subscriptions {
                store.push(detail.clone());
            }
            return Ok(sequence);
        }
        Err(BrokerError::not_found(format!(
            "Entity '{entity_name}' does not exist"
        )))
    }
}

/// Shared handle to an in-memory namespace. Clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_queue(&self, name: impl Into<String>) {
        let name = name.into();
        let mut state = self.state.lock().await;
        if !state.queues.iter().any(|(existing, _)| *existing == name) {
            state.queues.push((name, Store::default()));
        }
    }

    pub async fn add_topic(&self, name: impl Into<String>) {
        let name = name.into();
        let mut state = self.state.lock().await;
        if state.topic_mut(&name).is_none() {
            state.topics.push(Topic {
                name,
                subscriptions: Vec::new(),
            });
        }
    }

    /// Adds a subscription, creating its topic when needed.
    pub async fn add_subscription(&self, topic_name: impl Into<String>, name: impl Into<String>) {
        let topic_name = topic_name.into();
        let name = name.into();
        self.add_topic(topic_name.clone()).await;

        let mut state = self.state.lock().await;
        if let Some(topic) = state.topic_mut(&topic_name) {
            if !topic.subscriptions.iter().any(|(existing, _)| *existing == name) {
                topic.subscriptions.push((name, Store::default()));
            }
        }
    }

    /// Publishes a plain-text message with a generated id and returns the id.
    pub async fn publish(&self, entity_name: &str, body: impl Into<String>) -> BrokerResult<String> {
        let message_id = uuid::Uuid::new_v4().to_string();
        self.publish_message(
            entity_name,
            OutgoingMessage {
                message_id: message_id.clone(),
                body: body.into(),
                content_type: None,
                application_properties: Default::default(),
            },
        )
        .await?;
        Ok(message_id)
    }

    pub async fn publish_message(
        &self,
        entity_name: &str,
        message: OutgoingMessage,
    ) -> BrokerResult<()> {
        self.state.lock().await.publish(entity_name, message)?;
        Ok(())
    }

    /// Messages currently held by a queue or subscription, locked or not.
    pub async fn message_count(&self, entity_name: &str, subscription: Option<&str>) -> usize {
        let mut state = self.state.lock().await;
        state
            .store_mut(entity_name, subscription)
            .map(|store| store.messages.len())
            .unwrap_or(0)
    }

    /// Makes every call at `point` fail with `error` until cleared.
    pub async fn fail_on(&self, point: FailurePoint, error: BrokerError) {
        self.state.lock().await.failures.insert(point, error);
    }

    /// Makes every call at `point` wait for `delay` first.
    pub async fn delay_on(&self, point: FailurePoint, delay: Duration) {
        self.state.lock().await.delays.insert(point, delay);
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.failures.clear();
        state.delays.clear();
    }

    pub async fn stats(&self) -> HandleStats {
        self.state.lock().await.stats
    }

    async fn checkpoint(&self, point: FailurePoint) -> BrokerResult<()> {
        let (delay, failure) = {
            let state = self.state.lock().await;
            (
                state.delays.get(&point).copied(),
                state.failures.get(&point).cloned(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn default_properties(entity: &EntityDescriptor) -> EntityProperties {
        match entity {
            EntityDescriptor::Queue { name } => EntityProperties::Queue(QueueProperties {
                name: name.clone(),
                lock_duration: DEFAULT_LOCK_DURATION,
                max_delivery_count: DEFAULT_MAX_DELIVERY_COUNT,
                default_message_time_to_live: DEFAULT_TIME_TO_LIVE,
                requires_duplicate_detection: false,
                duplicate_detection_history_time_window: DEFAULT_DUPLICATE_WINDOW,
                dead_lettering_on_message_expiration: false,
                enable_batched_operations: true,
                requires_session: false,
                enable_partitioning: false,
                auto_delete_on_idle: Duration::MAX,
            }),
            EntityDescriptor::Topic { name } => EntityProperties::Topic(TopicProperties {
                name: name.clone(),
                default_message_time_to_live: DEFAULT_TIME_TO_LIVE,
                requires_duplicate_detection: false,
                duplicate_detection_history_time_window: DEFAULT_DUPLICATE_WINDOW,
                enable_batched_operations: true,
                enable_partitioning: false,
                auto_delete_on_idle: Duration::MAX,
            }),
            EntityDescriptor::Subscription { name, topic_name } => {
                EntityProperties::Subscription(SubscriptionProperties {
                    name: name.clone(),
                    topic_name: topic_name.clone(),
                    lock_duration: DEFAULT_LOCK_DURATION,
                    max_delivery_count: DEFAULT_MAX_DELIVERY_COUNT,
                    default_message_time_to_live: DEFAULT_TIME_TO_LIVE,
                    dead_lettering_on_message_expiration: false,
                    requires_session: false,
                    enable_batched_operations: true,
                    auto_delete_on_idle: Duration::MAX,
                })
            }
        }
    }
}

#[async_trait]
impl BrokerConnector for InMemoryBroker {
    async fn open_connection(
        &self,
        _connection_string: &str,
    ) -> BrokerResult<Arc<dyn BrokerConnection>> {
        self.checkpoint(FailurePoint::OpenConnection).await?;
        self.state.lock().await.stats.connections_opened += 1;
        Ok(Arc::new(MemoryConnection {
            broker: self.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    async fn open_admin_connection(
        &self,
        _admin_connection_string: &str,
    ) -> BrokerResult<Arc<dyn AdminClient>> {
        self.checkpoint(FailurePoint::OpenAdminConnection).await?;
        self.state.lock().await.stats.admin_clients_opened += 1;
        Ok(Arc::new(MemoryAdmin {
            broker: self.clone(),
        }))
    }
}

struct MemoryConnection {
    broker: InMemoryBroker,
    closed: AtomicBool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> BrokerResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrokerError::connection("Connection already closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl BrokerConnection for MemoryConnection {
    async fn open_receiver(
        &self,
        entity_name: &str,
        subscription_name: Option<&str>,
    ) -> BrokerResult<Box<dyn EntityReceiver>> {
        self.ensure_open()?;
        self.broker.checkpoint(FailurePoint::OpenReceiver).await?;

        let mut state = self.broker.state.lock().await;
        state.store_mut(entity_name, subscription_name)?;
        state.stats.receivers_opened += 1;

        Ok(Box::new(MemoryReceiver {
            broker: self.broker.clone(),
            entity_name: entity_name.to_string(),
            subscription_name: subscription_name.map(str::to_string),
            held_locks: Vec::new(),
            closed: false,
        }))
    }

    async fn open_sender(&self, entity_name: &str) -> BrokerResult<Box<dyn EntitySender>> {
        self.ensure_open()?;
        self.broker.checkpoint(FailurePoint::OpenSender).await?;

        let mut state = self.broker.state.lock().await;
        let exists = state.queues.iter().any(|(name, _)| name == entity_name)
            || state.topic_mut(entity_name).is_some();
        if !exists {
            return Err(BrokerError::not_found(format!(
                "Entity '{entity_name}' does not exist"
            )));
        }
        state.stats.senders_opened += 1;

        Ok(Box::new(MemorySender {
            broker: self.broker.clone(),
            entity_name: entity_name.to_string(),
            closed: false,
        }))
    }

    async fn close(&self) -> BrokerResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.broker.state.lock().await.stats.connections_closed += 1;
        self.broker.checkpoint(FailurePoint::CloseConnection).await
    }
}

struct MemoryReceiver {
    broker: InMemoryBroker,
    entity_name: String,
    subscription_name: Option<String>,
    held_locks: Vec<u64>,
    closed: bool,
}

#[async_trait]
impl EntityReceiver for MemoryReceiver {
    async fn peek(&mut self, max_count: u32) -> BrokerResult<Vec<MessageDetail>> {
        self.broker.checkpoint(FailurePoint::Peek).await?;
        let mut state = self.broker.state.lock().await;
        let store = state.store_mut(&self.entity_name, self.subscription_name.as_deref())?;
        Ok(store
            .messages
            .iter()
            .take(max_count as usize)
            .map(|m| m.detail.clone())
            .collect())
    }

    /// Returns immediately; the in-memory broker never has messages in flight.
    async fn receive_one(&mut self, _max_wait: Duration) -> BrokerResult<Option<Delivery>> {
        self.broker.checkpoint(FailurePoint::Receive).await?;
        let mut state = self.broker.state.lock().await;
        state.next_lock_token += 1;
        let token = state.next_lock_token;

        let store = state.store_mut(&self.entity_name, self.subscription_name.as_deref())?;
        let Some(message) = store.messages.iter_mut().find(|m| m.locked_by.is_none()) else {
            return Ok(None);
        };
        message.locked_by = Some(token);
        self.held_locks.push(token);

        Ok(Some(Delivery {
            detail: message.detail.clone(),
            lock_token: token,
        }))
    }

    async fn complete(&mut self, delivery: &Delivery) -> BrokerResult<()> {
        self.broker.checkpoint(FailurePoint::Complete).await?;
        let mut state = self.broker.state.lock().await;
        let store = state.store_mut(&self.entity_name, self.subscription_name.as_deref())?;
        let position = store
            .messages
            .iter()
            .position(|m| m.locked_by == Some(delivery.lock_token))
            .ok_or_else(|| {
                BrokerError::other(format!(
                    "Lock for message '{}' is no longer held",
                    delivery.detail.id
                ))
            })?;
        store.messages.remove(position);
        state.stats.messages_completed += 1;
        self.held_locks.retain(|token| *token != delivery.lock_token);
        Ok(())
    }

    async fn close(&mut self) -> BrokerResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        {
            let mut state = self.broker.state.lock().await;
            if let Ok(store) = state.store_mut(&self.entity_name, self.subscription_name.as_deref()) {
                for token in self.held_locks.drain(..) {
                    store.release(token);
                }
            }
            state.stats.receivers_closed += 1;
        }
        self.broker.checkpoint(FailurePoint::CloseReceiver).await
    }
}

struct MemorySender {
    broker: InMemoryBroker,
    entity_name: String,
    closed: bool,
}

#[async_trait]
impl EntitySender for MemorySender {
    async fn send(&mut self, message: OutgoingMessage) -> BrokerResult<()> {
        self.broker.checkpoint(FailurePoint::Send).await?;
        self.broker.state.lock().await.publish(&self.entity_name, message)?;
        Ok(())
    }

    async fn close(&mut self) -> BrokerResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.broker.state.lock().await.stats.senders_closed += 1;
        self.broker.checkpoint(FailurePoint::CloseSender).await
    }
}

struct MemoryAdmin {
    broker: InMemoryBroker,
}

#[async_trait]
impl AdminClient for MemoryAdmin {
    async fn list_queues(&self) -> BrokerResult<Vec<String>> {
        self.broker.checkpoint(FailurePoint::ListQueues).await?;
        let state = self.broker.state.lock().await;
        Ok(state.queues.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn list_topics(&self) -> BrokerResult<Vec<String>> {
        self.broker.checkpoint(FailurePoint::ListTopics).await?;
        let state = self.broker.state.lock().await;
        Ok(state.topics.iter().map(|t| t.name.clone()).collect())
    }

    async fn list_subscriptions(&self, topic_name: &str) -> BrokerResult<Vec<String>> {
        self.broker.checkpoint(FailurePoint::ListSubscriptions).await?;
        let mut state = self.broker.state.lock().await;
        let topic = state
            .topic_mut(topic_name)
            .ok_or_else(|| BrokerError::not_found(format!("Topic '{topic_name}' does not exist")))?;
        Ok(topic.subscriptions.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn get_entity_properties(
        &self,
        entity: &EntityDescriptor,
    ) -> BrokerResult<EntityProperties> {
        self.broker.checkpoint(FailurePoint::GetEntityProperties).await?;
        let mut state = self.broker.state.lock().await;
        let exists = match entity {
            EntityDescriptor::Queue { name } => state.store_mut(name, None).is_ok(),
            EntityDescriptor::Topic { name } => state.topic_mut(name).is_some(),
            EntityDescriptor::Subscription { name, topic_name } => {
                state.store_mut(topic_name, Some(name)).is_ok()
            }
        };
        if !exists {
            return Err(BrokerError::not_found(format!("{entity} does not exist")));
        }
        Ok(InMemoryBroker::default_properties(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_none, assert_ok, assert_some};

    async fn connection(broker: &InMemoryBroker) -> Arc<dyn BrokerConnection> {
        assert_ok!(broker.open_connection("Endpoint=sb://memory/").await)
    }

    #[tokio::test]
    async fn test_topic_fans_out_to_subscriptions() {
        let broker = InMemoryBroker::new();
        broker.add_subscription("events", "audit").await;
        broker.add_subscription("events", "billing").await;

        assert_ok!(broker.publish("events", "hello").await);

        assert_eq!(broker.message_count("events", Some("audit")).await, 1);
        assert_eq!(broker.message_count("events", Some("billing")).await, 1);
    }

    #[tokio::test]
    async fn test_uncompleted_lock_is_released_on_close() {
        let broker = InMemoryBroker::new();
        broker.add_queue("orders").await;
        assert_ok!(broker.publish("orders", "first").await);
        let connection = connection(&broker).await;

        let mut receiver = assert_ok!(connection.open_receiver("orders", None).await);
        assert_some!(assert_ok!(receiver.receive_one(Duration::ZERO).await));
        assert_none!(assert_ok!(receiver.receive_one(Duration::ZERO).await));
        assert_ok!(receiver.close().await);

        let mut receiver = assert_ok!(connection.open_receiver("orders", None).await);
        let delivery = assert_some!(assert_ok!(receiver.receive_one(Duration::ZERO).await));
        assert_eq!(delivery.detail.body, "first");
        assert_ok!(receiver.complete(&delivery).await);
        assert_ok!(receiver.close().await);

        assert_eq!(broker.message_count("orders", None).await, 0);
        let stats = broker.stats().await;
        assert_eq!(stats.open_receivers(), 0);
        assert_eq!(stats.messages_completed, 1);
    }

    #[tokio::test]
    async fn test_injected_failure_surfaces() {
        let broker = InMemoryBroker::new();
        broker.add_queue("orders").await;
        broker
            .fail_on(FailurePoint::Peek, BrokerError::connection("link detached"))
            .await;
        let connection = connection(&broker).await;
        let mut receiver = assert_ok!(connection.open_receiver("orders", None).await);

        let error = receiver.peek(5).await.unwrap_err();
        assert_eq!(error, BrokerError::connection("link detached"));

        broker.clear_failures().await;
        assert_ok!(receiver.peek(5).await);
    }

    #[tokio::test]
    async fn test_connection_close_is_idempotent() {
        let broker = InMemoryBroker::new();
        let connection = connection(&broker).await;
        assert_ok!(connection.close().await);
        assert_ok!(connection.close().await);
        assert_eq!(broker.stats().await.open_connections(), 0);
        assert!(connection.open_sender("orders").await.is_err());
    }
}
