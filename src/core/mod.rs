// src/core/mod.rs
//! HTTP adapters, session persistence and listener plumbing shared by the workflow

pub mod bounded;
pub mod identity_client;
pub mod listeners;
pub mod service_client;
pub mod session_store;

pub use bounded::bounded;
pub use identity_client::SupabaseAuth;
pub use listeners::{ListenerRegistry, Subscription};
pub use service_client::{MatchBackend, RegistrationAck, ServiceClient};
pub use session_store::{SessionStore, StoredSession};
