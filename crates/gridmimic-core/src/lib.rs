//! Core logic for the gridmimic protocol test harness
//!
//! This crate holds the stateful heart of the harness: the session controller
//! that drives one login-to-logout lifetime against a server under test, the
//! canonical encounter log that downstream tooling diffs across runs, the
//! presence tracker that deduplicates entity sightings, and the dialect probe
//! that classifies wire-level string framing in inbound chat payloads.
//!
//! The network session client itself is consumed only through the
//! [`SessionClient`] trait; this crate never touches the wire.

pub mod client;
pub mod dialect;
pub mod encounter;
pub mod errors;
pub mod mock;
pub mod presence;
pub mod session;
pub mod types;

pub use client::{
    AvatarSighting, EventReceiver, EventSender, LoginFailure, ProtocolEvent, SessionClient,
};
pub use dialect::{classify, ChatDialect};
pub use encounter::EncounterLog;
pub use errors::{HarnessError, Result};
pub use presence::PresenceTracker;
pub use session::{SessionController, SessionDirective};
pub use types::{
    AgentIdentity, BehaviorMode, Credentials, EntityKind, SessionState, ShapeDescriptor, Vector3,
};
