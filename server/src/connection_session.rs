//! # Connection Session
//!
//! [`ConnectionSession`] is the state machine at the centre of the crate. It
//! owns at most one broker connection, tracks which queue or subscription is
//! active, keeps the inventory of entities available for selection, and
//! scopes peek, receive and send to the active entity.
//!
//! ## States
//!
//! - **Disconnected** - initial state; every field empty
//! - **Connected** - entered by a successful `connect`, left by `disconnect`
//!
//! ## Failure policy
//!
//! Preconditions are checked before any broker call. Broker calls are never
//! retried, each one is bounded by [`SessionOptions::operation_timeout`] and
//! the session's cancellation token, and state only changes after the calls
//! a transition depends on have succeeded.

mod call_guard;
pub mod errors;
mod inventory;
pub mod options;
mod pagination;
pub mod session;

pub use errors::{SessionError, SessionResult};
pub use options::{ConnectRequest, SessionOptions};
pub use session::{ActiveEntity, ConnectionSession};
