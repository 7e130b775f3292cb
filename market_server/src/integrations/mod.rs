//! Best-effort side effects driven by engine events.
//!
//! Nothing in this module can fail a negotiation or an order transition: hook errors are logged and dropped.

pub mod notifications;
pub mod threads;

pub use notifications::{create_event_handlers, EVENT_BUFFER_SIZE};
