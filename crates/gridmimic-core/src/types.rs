//! Shared types for the gridmimic harness

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::HarnessError;

// ----------------------------------------------------------------------------
// Session State
// ----------------------------------------------------------------------------

/// Lifecycle states of the single harness session
///
/// Owned exclusively by the session controller. `Connected -> Disconnected`
/// may also happen passively when the client reports loss of connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session; login is legal only from here
    Disconnected,
    /// Login call in flight
    Connecting,
    /// Login succeeded, session live
    Connected,
    /// Logout delegated, fire-and-forget; completion drops to Disconnected
    LoggingOut,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "Disconnected",
            SessionState::Connecting => "Connecting",
            SessionState::Connected => "Connected",
            SessionState::LoggingOut => "LoggingOut",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Behavior Mode
// ----------------------------------------------------------------------------

/// Scripted deviation from standard client conduct, chosen once at startup
///
/// Governs the controller's post-login behavior; read-only for the life of
/// the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorMode {
    /// No special action
    #[default]
    Standard,
    /// Exit hard immediately after login success, leaving the session
    /// half-open from the server's point of view
    Ghost,
    /// Stay connected but suppress outbound liveness signaling, then idle
    /// so the server's reaping timeout can be observed
    Wallflower,
    /// Substitute an invalid credential before the login call is made
    Rejection,
    /// Send automatic chat once connected
    Chatter,
}

impl BehaviorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorMode::Standard => "standard",
            BehaviorMode::Ghost => "ghost",
            BehaviorMode::Wallflower => "wallflower",
            BehaviorMode::Rejection => "rejection",
            BehaviorMode::Chatter => "chatter",
        }
    }
}

impl FromStr for BehaviorMode {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(BehaviorMode::Standard),
            "ghost" => Ok(BehaviorMode::Ghost),
            "wallflower" => Ok(BehaviorMode::Wallflower),
            "rejection" => Ok(BehaviorMode::Rejection),
            "chatter" => Ok(BehaviorMode::Chatter),
            other => Err(HarnessError::Config(format!(
                "unknown behavior mode: {other} (expected standard, ghost, wallflower, rejection or chatter)"
            ))),
        }
    }
}

impl fmt::Display for BehaviorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Identity and Credentials
// ----------------------------------------------------------------------------

/// Login credentials for one session attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl Credentials {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            password: password.into(),
        }
    }
}

/// Agent identity as confirmed by the server at login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    /// Display name, "First Last"
    pub name: String,
    /// Server-assigned agent UUID
    pub agent_id: Uuid,
}

// ----------------------------------------------------------------------------
// World Primitives
// ----------------------------------------------------------------------------

/// Region-local position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Componentwise offset, used when rezzing relative to the agent
    pub fn offset(&self, dx: f32, dy: f32, dz: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}, {}>", self.x, self.y, self.z)
    }
}

/// Kind of a sighted remote entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Avatar,
    Thing,
}

impl EntityKind {
    /// Map the protocol's avatar flag onto a sighting kind
    pub fn from_avatar_flag(is_avatar: bool) -> Self {
        if is_avatar {
            EntityKind::Avatar
        } else {
            EntityKind::Thing
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Avatar => "Avatar",
            EntityKind::Thing => "Thing",
        }
    }
}

/// Shape requested for a spawned object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeDescriptor {
    #[default]
    Cube,
    Sphere,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behavior_mode_parses_case_insensitively() {
        assert_eq!("ghost".parse::<BehaviorMode>().unwrap(), BehaviorMode::Ghost);
        assert_eq!(
            "WALLFLOWER".parse::<BehaviorMode>().unwrap(),
            BehaviorMode::Wallflower
        );
        assert_eq!(
            "Standard".parse::<BehaviorMode>().unwrap(),
            BehaviorMode::Standard
        );
    }

    #[test]
    fn behavior_mode_rejects_unknown_names() {
        let err = "poltergeist".parse::<BehaviorMode>().unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn vector3_display_matches_trace_format() {
        let v = Vector3::new(128.0, 64.5, 21.0);
        assert_eq!(v.to_string(), "<128, 64.5, 21>");
    }

    #[test]
    fn session_state_names_are_stable() {
        assert_eq!(SessionState::Disconnected.as_str(), "Disconnected");
        assert_eq!(SessionState::LoggingOut.as_str(), "LoggingOut");
    }
}
