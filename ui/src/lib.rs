//! # busview
//!
//! Interactive console for inspecting Service Bus namespaces: connect, browse
//! queues, topics and subscriptions, peek, receive and send messages.

pub mod config;
pub mod console;
pub mod demo;
pub mod error;
pub mod logger;
