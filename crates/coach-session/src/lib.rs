//! Session-scoped conversation memory and the chat handler built on it.

pub mod session;
pub mod store;
pub mod handler;

pub use session::*;
pub use store::{SessionGuard, SessionLimits, SessionSlot, SessionStore, SessionSummary};
pub use handler::ChatHandler;
