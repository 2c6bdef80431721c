//! # Model
//!
//! Plain data types shared by the session, the broker adapters and callers.
//!
//! - [`EntityDescriptor`] names a queue, topic or subscription on a namespace
//! - [`EntityProperties`] is a read-only snapshot of an entity's configuration
//! - [`MessageDetail`], [`MessagePage`] and [`OutgoingMessage`] carry message
//!   content in and out of the broker

pub mod entity;
pub mod message;
pub mod properties;

pub use entity::{EntityDescriptor, EntityKind, EntityKindError};
pub use message::{DEFAULT_CONTENT_TYPE, MessageDetail, MessagePage, MessageSummary, OutgoingMessage};
pub use properties::{EntityProperties, QueueProperties, SubscriptionProperties, TopicProperties};
