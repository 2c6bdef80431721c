//! # busview server library
//!
//! Core of the busview console: a connection session over a message broker
//! namespace that lists entities, peeks and receives messages, and publishes
//! test messages.
//!
//! ## Modules
//!
//! - [`connection_session`] - the session state machine and its errors
//! - [`broker`] - the broker seam with Azure Service Bus and in-memory implementations
//! - [`model`] - entity descriptors, properties and message types
//! - [`utils`] - connection string, duration and environment helpers

pub mod broker;
pub mod connection_session;
pub mod model;
pub mod utils;
