//! # Console
//!
//! Line-oriented front-end over a [`ConnectionSession`]. Each input line is
//! parsed into a [`Command`], executed, and rendered as text. Failures are
//! rendered as `<kind>: <message>`.

use crate::error::{AppError, AppResult};
use busview_server::connection_session::{ConnectRequest, ConnectionSession};

pub mod commands;
pub mod format;

pub use commands::{Command, ConnectArgs, parse_line};

/// Content type used for messages sent from the console
pub const SEND_CONTENT_TYPE: &str = "application/json";

/// What the REPL should do after a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue(String),
    Quit,
}

pub struct Console {
    session: ConnectionSession,
    defaults: ConnectRequest,
}

impl Console {
    /// `defaults` fills whatever a `connect` command leaves out.
    pub fn new(session: ConnectionSession, defaults: ConnectRequest) -> Self {
        Self { session, defaults }
    }

    pub fn session(&self) -> &ConnectionSession {
        &self.session
    }

    /// Parse and run one line. Never fails: errors become output.
    pub async fn handle_line(&self, line: &str) -> Flow {
        let result = match parse_line(line) {
            Ok(Some(command)) => self.execute(command).await,
            Ok(None) => Ok(Flow::Continue(String::new())),
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            log::debug!("Command failed: {e}");
            Flow::Continue(e.report())
        })
    }

    pub async fn execute(&self, command: Command) -> AppResult<Flow> {
        let output = match command {
            Command::Connect(args) => self.connect(args).await?,
            Command::Disconnect => {
                self.session.disconnect().await?;
                "Disconnected".to_string()
            }
            Command::Status => self.status().await,
            Command::Entities => {
                let active = self.session.active_entity().await;
                format::entity_list(&self.session.available_entities().await, active.as_ref())
            }
            Command::Refresh => {
                self.session.refresh_entities().await?;
                if self.session.is_administrative().await {
                    format!(
                        "Refreshed {} entities",
                        self.session.available_entities().await.len()
                    )
                } else {
                    "Entity list is fixed without an admin connection".to_string()
                }
            }
            Command::Select(entity) => {
                self.session.select_entity(&entity).await?;
                format!("Selected {entity}")
            }
            Command::Props(entity) => {
                let properties = self.session.entity_properties(&entity).await?;
                format::properties(&properties)
            }
            Command::Peek(count) => {
                let page = match count {
                    Some(count) => self.session.peek(count).await?,
                    None => self.session.peek_default().await?,
                };
                format::page(&page)
            }
            Command::Find(id) => match self.session.peek_by_message_id(&id).await? {
                Some(detail) => format::message(&detail),
                None => format!("Message {id} not found"),
            },
            Command::Receive => match self.session.receive_one().await? {
                Some(detail) => format::message(&detail),
                None => "No message available".to_string(),
            },
            Command::Send { body, properties } => {
                if body.trim().is_empty() {
                    return Err(AppError::EmptyBody);
                }
                let id = self
                    .session
                    .send(&body, Some(SEND_CONTENT_TYPE), properties)
                    .await?;
                format!("Sent message {id}")
            }
            Command::Help(text) => text,
            Command::Quit => return Ok(Flow::Quit),
        };
        Ok(Flow::Continue(output))
    }

    fn connect_request(&self, args: ConnectArgs) -> ConnectRequest {
        let defaults = &self.defaults;
        ConnectRequest {
            connection_string: args
                .connection_string
                .unwrap_or_else(|| defaults.connection_string.clone()),
            admin_connection_string: args
                .admin_connection_string
                .or_else(|| defaults.admin_connection_string.clone()),
            entity_name: args.entity_name.or_else(|| defaults.entity_name.clone()),
            subscription_name: args
                .subscription_name
                .or_else(|| defaults.subscription_name.clone()),
        }
    }

    async fn connect(&self, args: ConnectArgs) -> AppResult<String> {
        self.session.connect(self.connect_request(args)).await?;

        let host = self.session.host().await.unwrap_or_default();
        let entities = self.session.available_entities().await.len();
        let mode = if self.session.is_administrative().await {
            "administrative"
        } else {
            "entity"
        };
        Ok(format!("Connected to {host} ({mode} mode, {entities} entities)"))
    }

    async fn status(&self) -> String {
        let Some(host) = self.session.host().await else {
            return "Not connected".to_string();
        };

        let active = self
            .session
            .active_entity()
            .await
            .map(|a| format::active_entity(&a))
            .unwrap_or_else(|| "none".to_string());
        [
            format!("host: {host}"),
            format!("administrative: {}", self.session.is_administrative().await),
            format!("active entity: {active}"),
            format!(
                "entities: {}",
                self.session.available_entities().await.len()
            ),
        ]
        .join("\n")
    }
}
