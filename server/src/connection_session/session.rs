use crate::broker::{
    AdminClient, BrokerConnection, BrokerConnector, EntityReceiver, EntitySender,
};
use crate::connection_session::call_guard::CallGuard;
use crate::connection_session::errors::{SessionError, SessionResult};
use crate::connection_session::inventory::{collect_inventory, seed_inventory};
use crate::connection_session::options::{ConnectRequest, SessionOptions, non_blank};
use crate::connection_session::pagination::{PagePlan, find_by_id};
use crate::model::{EntityDescriptor, EntityProperties, MessageDetail, MessagePage, OutgoingMessage};
use crate::utils::ConnectionStringParser;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// The entity peek, receive and send currently operate on.
///
/// For a subscription, `entity_name` is the parent topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEntity {
    pub entity_name: String,
    pub subscription_name: Option<String>,
}

#[derive(Default)]
struct SessionState {
    connection: Option<Arc<dyn BrokerConnection>>,
    admin: Option<Arc<dyn AdminClient>>,
    host: String,
    active_entity_name: String,
    active_subscription_name: Option<String>,
    available_entities: Vec<EntityDescriptor>,
}

impl SessionState {
    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn active_entity(&self) -> Option<ActiveEntity> {
        if self.active_entity_name.is_empty() {
            return None;
        }
        Some(ActiveEntity {
            entity_name: self.active_entity_name.clone(),
            subscription_name: self.active_subscription_name.clone(),
        })
    }
}

/// A single logical connection to a broker namespace.
///
/// The session starts disconnected. [`connect`](Self::connect) opens the
/// connection and builds the entity inventory; [`select_entity`](Self::select_entity)
/// chooses what [`peek`](Self::peek), [`receive_one`](Self::receive_one) and
/// [`send`](Self::send) work on; [`disconnect`](Self::disconnect) releases
/// everything and returns to the initial state.
///
/// State transitions hold the state lock for their whole duration. Message
/// operations copy the connection handle and the active entity under the lock
/// and release it before calling the broker, so they never observe a half
/// applied selection. Each of them opens its own receiver or sender and
/// closes it before returning, on success and on failure.
///
/// # Examples
///
/// ```no_run
/// use server::broker::memory::InMemoryBroker;
/// use server::connection_session::{ConnectRequest, ConnectionSession};
/// use server::model::EntityDescriptor;
/// use std::sync::Arc;
///
/// async fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let broker = InMemoryBroker::new();
///     broker.add_subscription("events", "audit").await;
///
///     let session = ConnectionSession::new(Arc::new(broker));
///     session
///         .connect(ConnectRequest::new("Endpoint=sb://localhost;").with_entity("events").with_subscription("audit"))
///         .await?;
///     session.send("{\"hello\":1}", Some("application/json"), Vec::new()).await?;
///     let page = session.peek(10).await?;
///     assert_eq!(page.len(), 1);
///     session.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct ConnectionSession {
    connector: Arc<dyn BrokerConnector>,
    options: SessionOptions,
    guard: CallGuard,
    state: Mutex<SessionState>,
}

impl ConnectionSession {
    pub fn new(connector: Arc<dyn BrokerConnector>) -> Self {
        Self::with_options(connector, SessionOptions::default())
    }

    pub fn with_options(connector: Arc<dyn BrokerConnector>, options: SessionOptions) -> Self {
        Self {
            connector,
            guard: CallGuard::new(options.operation_timeout, CancellationToken::new()),
            options,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Token that aborts in-flight and later broker calls once cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.guard.token().clone()
    }

    /// Open a connection and build the entity inventory.
    ///
    /// Without an admin connection string the inventory is the entity named in
    /// the request (a queue, or a topic and subscription). With one, the whole
    /// namespace is listed instead.
    ///
    /// Nothing is committed until every broker call has succeeded; on failure
    /// the session stays disconnected and any opened connection is closed.
    ///
    /// # Errors
    ///
    /// * [`SessionError::AlreadyConnected`] when a connection is open
    /// * [`SessionError::InvalidConnectionString`] when no host can be extracted
    /// * [`SessionError::MissingEntityName`] without admin credentials and entity,
    ///   or with a subscription but no entity
    /// * broker, timeout and cancellation errors from opening or listing
    pub async fn connect(&self, request: ConnectRequest) -> SessionResult<()> {
        let mut state = self.state.lock().await;
        if state.is_connected() {
            return Err(SessionError::AlreadyConnected);
        }

        let host = ConnectionStringParser::extract_host(&request.connection_string)?;
        let admin_connection_string = non_blank(request.admin_connection_string.as_deref());
        let entity_name = non_blank(request.entity_name.as_deref());
        let subscription_name = non_blank(request.subscription_name.as_deref());

        if let Some(admin) = admin_connection_string {
            ConnectionStringParser::extract_host(admin)?;
        }
        if entity_name.is_none() && (admin_connection_string.is_none() || subscription_name.is_some()) {
            return Err(SessionError::MissingEntityName);
        }

        log::info!("Connecting to {host}");
        let connection = self
            .guard
            .run(
                "open_connection",
                self.connector.open_connection(&request.connection_string),
            )
            .await?;

        let (admin, available_entities) = match admin_connection_string {
            None => {
                // entity presence checked above
                let entity_name = entity_name.unwrap_or_default();
                (None, seed_inventory(entity_name, subscription_name))
            }
            Some(admin_connection_string) => {
                match self.open_admin_and_list(admin_connection_string).await {
                    Ok((admin, entities)) => (Some(admin), entities),
                    Err(e) => {
                        log::warn!("Administrative connect to {host} failed: {e}");
                        self.release_connection(connection).await;
                        return Err(e);
                    }
                }
            }
        };

        log::info!(
            "Connected to {host} ({} entities, administrative: {})",
            available_entities.len(),
            admin.is_some()
        );

        *state = SessionState {
            connection: Some(connection),
            admin,
            host,
            active_entity_name: entity_name.unwrap_or_default().to_string(),
            active_subscription_name: subscription_name.map(str::to_string),
            available_entities,
        };
        Ok(())
    }

    async fn open_admin_and_list(
        &self,
        admin_connection_string: &str,
    ) -> SessionResult<(Arc<dyn AdminClient>, Vec<EntityDescriptor>)> {
        let admin = self
            .guard
            .run(
                "open_admin_connection",
                self.connector.open_admin_connection(admin_connection_string),
            )
            .await?;
        let entities = collect_inventory(admin.as_ref(), &self.guard).await?;
        Ok((admin, entities))
    }

    async fn release_connection(&self, connection: Arc<dyn BrokerConnection>) {
        if let Err(e) = self.guard.run_cleanup("close_connection", connection.close()).await {
            log::warn!("Failed to close broker connection: {e}");
        }
    }

    /// Release the connection and clear all session fields.
    ///
    /// A failure to close the underlying handle is logged; the session is
    /// reset regardless.
    pub async fn disconnect(&self) -> SessionResult<()> {
        let mut state = self.state.lock().await;
        let connection = state.connection.take().ok_or(SessionError::NotConnected)?;
        let host = std::mem::take(&mut state.host);

        self.release_connection(connection).await;
        *state = SessionState::default();

        log::info!("Disconnected from {host}");
        Ok(())
    }

    /// Make `entity` the target of subsequent message operations.
    ///
    /// Queues clear any subscription; subscriptions set the parent topic as the
    /// entity name. The connection is not touched.
    pub async fn select_entity(&self, entity: &EntityDescriptor) -> SessionResult<()> {
        let mut state = self.state.lock().await;
        if !state.is_connected() {
            return Err(SessionError::NotConnected);
        }

        match entity {
            EntityDescriptor::Queue { name } => {
                state.active_entity_name = name.clone();
                state.active_subscription_name = None;
            }
            EntityDescriptor::Subscription { name, topic_name } => {
                state.active_entity_name = topic_name.clone();
                state.active_subscription_name = Some(name.clone());
            }
            EntityDescriptor::Topic { name } => {
                return Err(SessionError::TopicNotSelectable(name.clone()));
            }
        }

        log::debug!("Selected {entity}");
        Ok(())
    }

    /// Re-list the namespace. Keeps the current list when not administrative,
    /// and when any listing call fails.
    pub async fn refresh_entities(&self) -> SessionResult<()> {
        let mut state = self.state.lock().await;
        if !state.is_connected() {
            return Err(SessionError::NotConnected);
        }
        let Some(admin) = state.admin.clone() else {
            log::debug!("Skipping entity refresh without administrative access");
            return Ok(());
        };

        let entities = collect_inventory(admin.as_ref(), &self.guard).await?;
        state.available_entities = entities;
        Ok(())
    }

    /// Fetch a live snapshot of an entity's configuration.
    pub async fn entity_properties(
        &self,
        entity: &EntityDescriptor,
    ) -> SessionResult<EntityProperties> {
        let admin = {
            let state = self.state.lock().await;
            if !state.is_connected() {
                return Err(SessionError::NotConnected);
            }
            state
                .admin
                .clone()
                .ok_or(SessionError::AdministrationUnavailable)?
        };

        self.guard
            .run("get_entity_properties", admin.get_entity_properties(entity))
            .await
            .map_err(|e| match e {
                SessionError::Broker(broker) if broker.is_not_found() => {
                    SessionError::EntityNotFound(entity.to_string())
                }
                other => other,
            })
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.is_connected()
    }

    pub async fn host(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.is_connected().then(|| state.host.clone())
    }

    pub async fn is_administrative(&self) -> bool {
        self.state.lock().await.admin.is_some()
    }

    /// Whether entity properties can be fetched in this session.
    pub async fn is_management_api_available(&self) -> bool {
        self.is_administrative().await
    }

    pub async fn active_entity(&self) -> Option<ActiveEntity> {
        self.state.lock().await.active_entity()
    }

    pub async fn available_entities(&self) -> Vec<EntityDescriptor> {
        self.state.lock().await.available_entities.clone()
    }

    async fn snapshot(&self) -> SessionResult<(Arc<dyn BrokerConnection>, Option<ActiveEntity>)> {
        let state = self.state.lock().await;
        let connection = state.connection.clone().ok_or(SessionError::NotConnected)?;
        Ok((connection, state.active_entity()))
    }

    async fn open_receiver(
        &self,
        connection: &dyn BrokerConnection,
        target: &ActiveEntity,
    ) -> SessionResult<Box<dyn EntityReceiver>> {
        self.guard
            .run(
                "open_receiver",
                connection.open_receiver(&target.entity_name, target.subscription_name.as_deref()),
            )
            .await
    }

    async fn close_receiver(&self, mut receiver: Box<dyn EntityReceiver>) {
        if let Err(e) = self.guard.run_cleanup("close_receiver", receiver.close()).await {
            log::warn!("Failed to close receiver: {e}");
        }
    }

    async fn close_sender(&self, mut sender: Box<dyn EntitySender>) {
        if let Err(e) = self.guard.run_cleanup("close_sender", sender.close()).await {
            log::warn!("Failed to close sender: {e}");
        }
    }

    async fn peek_window(&self, count: u32) -> SessionResult<Option<Vec<MessageDetail>>> {
        let (connection, target) = self.snapshot().await?;
        let Some(target) = target else {
            return Ok(None);
        };

        let mut receiver = self.open_receiver(connection.as_ref(), &target).await?;
        let result = self.guard.run("peek", receiver.peek(count)).await;
        self.close_receiver(receiver).await;
        result.map(Some)
    }

    /// Read up to `max_messages` from the active entity without removing them.
    ///
    /// `has_more` reports whether at least one further message existed.
    /// With no active entity the page is empty.
    pub async fn peek(&self, max_messages: u32) -> SessionResult<MessagePage> {
        let plan = PagePlan::new(max_messages);
        let page = match self.peek_window(plan.fetch_count()).await? {
            Some(fetched) => plan.into_page(fetched),
            None => MessagePage::empty(),
        };
        log::debug!("Peeked {} messages (more: {})", page.len(), page.has_more);
        Ok(page)
    }

    /// [`peek`](Self::peek) with the configured default page size.
    pub async fn peek_default(&self) -> SessionResult<MessagePage> {
        self.peek(self.options.default_page_size).await
    }

    /// Look for a message id among the first `peek_scan_limit` messages.
    ///
    /// Messages beyond that window are not seen.
    pub async fn peek_by_message_id(&self, message_id: &str) -> SessionResult<Option<MessageDetail>> {
        let window = self.peek_window(self.options.peek_scan_limit).await?;
        Ok(window.and_then(|messages| find_by_id(messages, message_id)))
    }

    /// Receive one message from the active entity and complete it.
    ///
    /// Waits up to the configured receive wait. `None` when nothing arrived or
    /// no entity is active.
    ///
    /// # Errors
    ///
    /// [`SessionError::MessageCompleteFailed`] when the message was fetched but
    /// could not be acknowledged. It is not retried and may be delivered again.
    pub async fn receive_one(&self) -> SessionResult<Option<MessageDetail>> {
        let (connection, target) = self.snapshot().await?;
        let Some(target) = target else {
            return Ok(None);
        };

        let mut receiver = self.open_receiver(connection.as_ref(), &target).await?;
        let wait = self.options.receive_wait;
        let result: SessionResult<Option<MessageDetail>> = async {
            let delivery = self
                .guard
                .run_for(
                    wait.saturating_add(self.options.operation_timeout),
                    "receive",
                    receiver.receive_one(wait),
                )
                .await?;
            let Some(delivery) = delivery else {
                return Ok(None);
            };

            self.guard
                .run("complete", receiver.complete(&delivery))
                .await
                .map_err(|e| SessionError::MessageCompleteFailed {
                    message_id: delivery.detail.id.clone(),
                    reason: e.to_string(),
                })?;
            Ok(Some(delivery.detail))
        }
        .await;
        self.close_receiver(receiver).await;

        if let Ok(Some(message)) = &result {
            log::info!("Received and completed message {}", message.id);
        }
        result
    }

    /// Publish one message to the active entity, or to the parent topic when a
    /// subscription is active. Properties with empty keys are dropped.
    ///
    /// Returns the generated message id.
    pub async fn send(
        &self,
        body: &str,
        content_type: Option<&str>,
        properties: impl IntoIterator<Item = (String, Value)>,
    ) -> SessionResult<String> {
        let application_properties: BTreeMap<String, Value> = properties
            .into_iter()
            .filter(|(key, _)| !key.is_empty())
            .collect();

        let (connection, target) = self.snapshot().await?;
        let target = target.ok_or(SessionError::MissingEntityName)?;
        let message_id = uuid::Uuid::new_v4().to_string();
        let message = OutgoingMessage {
            message_id: message_id.clone(),
            body: body.to_string(),
            content_type: non_blank(content_type).map(str::to_string),
            application_properties,
        };

        let mut sender = self
            .guard
            .run("open_sender", connection.open_sender(&target.entity_name))
            .await?;
        let result = self.guard.run("send", sender.send(message)).await;
        self.close_sender(sender).await;
        result?;

        log::info!("Sent message {message_id} to {}", target.entity_name);
        Ok(message_id)
    }
}
