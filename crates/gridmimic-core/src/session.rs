//! Session controller
//!
//! Owns the single active session: translates high-level intents into
//! session-client calls, dispatches inbound protocol events, and emits an
//! encounter record for every state transition and externally observable
//! action. Two activation sources call in here concurrently (the
//! interpreter's foreground loop and the client's event delivery task), so
//! session state and the seen-entity set live in one mutex domain.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::{AvatarSighting, EventReceiver, ProtocolEvent, SessionClient};
use crate::dialect;
use crate::encounter::EncounterLog;
use crate::errors::{HarnessError, Result};
use crate::presence::PresenceTracker;
use crate::types::{
    AgentIdentity, BehaviorMode, Credentials, EntityKind, SessionState, ShapeDescriptor, Vector3,
};

/// Password substituted by rejection mode before the login call is made
const REJECTION_PASSWORD: &str = "badpassword";

// ----------------------------------------------------------------------------
// Directives and Shared State
// ----------------------------------------------------------------------------

/// What the surrounding process must do after an operation
///
/// Ghost mode deliberately leaves the session half-open from the server's
/// point of view; the controller cannot call `process::exit` itself and stay
/// testable, so it hands the decision up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDirective {
    Continue,
    /// Terminate the process immediately, no logout
    Terminate,
}

/// State guarded by the session's single mutex domain
struct SessionShared {
    state: SessionState,
    identity: Option<AgentIdentity>,
    presence: PresenceTracker,
    /// Behavior mode applied at most once per connection
    mode_applied: bool,
}

// ----------------------------------------------------------------------------
// Session Controller
// ----------------------------------------------------------------------------

pub struct SessionController {
    client: Arc<dyn SessionClient>,
    log: Arc<EncounterLog>,
    mode: BehaviorMode,
    chatter_text: String,
    shared: Mutex<SessionShared>,
}

impl SessionController {
    pub fn new(
        client: Arc<dyn SessionClient>,
        log: Arc<EncounterLog>,
        mode: BehaviorMode,
        chatter_text: impl Into<String>,
    ) -> Self {
        Self {
            client,
            log,
            mode,
            chatter_text: chatter_text.into(),
            shared: Mutex::new(SessionShared {
                state: SessionState::Disconnected,
                identity: None,
                presence: PresenceTracker::new(),
                mode_applied: false,
            }),
        }
    }

    fn shared(&self) -> MutexGuard<'_, SessionShared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> SessionState {
        self.shared().state
    }

    pub fn behavior_mode(&self) -> BehaviorMode {
        self.mode
    }

    fn require_connected(&self) -> Result<()> {
        if self.shared().state == SessionState::Connected {
            Ok(())
        } else {
            Err(HarnessError::NotConnected)
        }
    }

    // ------------------------------------------------------------------
    // Login / Logout
    // ------------------------------------------------------------------

    /// Attempt login; legal only from `Disconnected`
    ///
    /// Login failure is not an error: it is reported through a
    /// `Login / Fail` record and the session stays usable for another
    /// attempt. Ghost mode returns [`SessionDirective::Terminate`] right
    /// after the success record.
    pub async fn login(
        &self,
        first_name: &str,
        last_name: &str,
        password: &str,
        endpoint: &str,
    ) -> Result<SessionDirective> {
        {
            let mut shared = self.shared();
            if shared.state != SessionState::Disconnected {
                return Err(HarnessError::InvalidState {
                    required: SessionState::Disconnected,
                    actual: shared.state,
                });
            }
            shared.state = SessionState::Connecting;
        }

        let mut credentials = Credentials::new(first_name, last_name, password);
        if self.mode == BehaviorMode::Rejection {
            credentials.password = REJECTION_PASSWORD.to_string();
        }

        match self.client.login(&credentials, endpoint).await {
            Ok(identity) => {
                {
                    let mut shared = self.shared();
                    shared.state = SessionState::Connected;
                    shared.identity = Some(identity.clone());
                }
                self.log
                    .emit("Login", "Success", &format!("Agent: {}", identity.agent_id));

                if self.mode == BehaviorMode::Ghost {
                    self.log
                        .emit("Behavior", "Ghost", "Vanishing immediately...");
                    return Ok(SessionDirective::Terminate);
                }
                Ok(SessionDirective::Continue)
            }
            Err(failure) => {
                self.shared().state = SessionState::Disconnected;
                self.log.emit("Login", "Fail", &failure.reason);
                Ok(SessionDirective::Continue)
            }
        }
    }

    /// Graceful session close, fire-and-forget
    ///
    /// The drop to `Disconnected` happens when the client reports the
    /// disconnect; the harness never blocks on server acknowledgment.
    pub async fn logout(&self) -> Result<()> {
        self.require_connected()?;
        self.shared().state = SessionState::LoggingOut;
        self.log
            .emit("Logout", "Initiate", "Director requested logout");
        self.client.logout().await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Connected Actions
    // ------------------------------------------------------------------

    /// Send chat on the public channel
    pub async fn chat(&self, text: &str) -> Result<()> {
        self.require_connected()?;
        self.log.emit("Action", "Chat", &format!("Msg: {text}"));
        self.client.send_chat(text, 0).await
    }

    /// Request an object spawn just above the agent
    pub async fn rez(&self) -> Result<()> {
        self.require_connected()?;
        self.log.emit("Behavior", "Rez", "Creating Object...");
        let position = self.client.self_position().offset(0.0, 0.0, 2.0);
        self.client
            .request_spawn_object(ShapeDescriptor::Cube, position, Vector3::splat(0.5))
            .await
    }

    /// Teleport-style absolute position set within the current sim
    pub async fn teleport_to(&self, position: Vector3) -> Result<()> {
        self.require_connected()?;
        let sim_name = self.client.current_sim().ok_or(HarnessError::NotConnected)?;
        self.log.emit(
            "Action",
            "Teleport",
            &format!("Dest: {},{},{}", position.x, position.y, position.z),
        );
        self.client.teleport(&sim_name, position).await
    }

    /// Non-teleport movement toward coordinates
    pub async fn auto_pilot_to(&self, position: Vector3) -> Result<()> {
        self.require_connected()?;
        self.log.emit(
            "Action",
            "Move",
            &format!("Dest: {},{},{}", position.x, position.y, position.z),
        );
        self.client.auto_pilot_to(position).await
    }

    // ------------------------------------------------------------------
    // Introspection (for the interpreter)
    // ------------------------------------------------------------------

    pub fn identity(&self) -> Result<AgentIdentity> {
        self.require_connected()?;
        self.shared()
            .identity
            .clone()
            .ok_or(HarnessError::NotConnected)
    }

    pub fn location(&self) -> Result<(String, Vector3)> {
        self.require_connected()?;
        let sim_name = self.client.current_sim().ok_or(HarnessError::NotConnected)?;
        Ok((sim_name, self.client.self_position()))
    }

    pub fn self_position(&self) -> Result<Vector3> {
        self.require_connected()?;
        Ok(self.client.self_position())
    }

    pub fn visible_avatars(&self) -> Result<Vec<AvatarSighting>> {
        self.require_connected()?;
        Ok(self.client.visible_avatars())
    }

    /// (avatars, things) currently believed visible
    pub fn sighting_counts(&self) -> Result<(usize, usize)> {
        self.require_connected()?;
        Ok(self.shared().presence.counts())
    }

    // ------------------------------------------------------------------
    // Protocol Event Dispatch
    // ------------------------------------------------------------------

    /// Drain protocol events from a subscription until the channel closes
    pub async fn run_event_pump(self: Arc<Self>, mut events: EventReceiver) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        tracing::debug!("protocol event channel closed");
    }

    /// Dispatch one inbound protocol event
    ///
    /// Runs on the client's delivery task, concurrently with interpreter
    /// commands.
    pub async fn handle_event(&self, event: ProtocolEvent) {
        match event {
            ProtocolEvent::LoginProgress { status, message } => {
                self.log
                    .emit("Login", &format!("Progress {status}"), &message);
            }
            ProtocolEvent::SimConnected { sim_name, endpoint } => {
                self.log.emit(
                    "UDP",
                    "Connected",
                    &format!("Sim: {sim_name}, IP: {endpoint}"),
                );
                self.apply_behavior_mode().await;
            }
            ProtocolEvent::RegionHandshake { region_name, flags } => {
                self.log.emit(
                    "Territory",
                    "Impression",
                    &format!("Region: {region_name}, Flags: {flags}"),
                );
            }
            ProtocolEvent::ChatReceived {
                from_name,
                raw_message,
                reliable,
                zerocoded,
            } => {
                self.log.emit(
                    "Packet",
                    "ChatDialectInbound",
                    &dialect::framing_summary(&raw_message, reliable, zerocoded),
                );
                self.log.emit(
                    "Chat",
                    "Heard",
                    &format!("From: {from_name}, Msg: {}", dialect::decode_text(&raw_message)),
                );
            }
            ProtocolEvent::ObjectUpdate { local_id, is_avatar } => {
                let mut shared = self.shared();
                shared
                    .presence
                    .on_update(local_id, EntityKind::from_avatar_flag(is_avatar), &self.log);
            }
            ProtocolEvent::ObjectKilled { local_id } => {
                let mut shared = self.shared();
                shared.presence.on_removed(local_id, &self.log);
            }
            ProtocolEvent::AlertMessage { message } => {
                self.log.emit("Alert", "Received", &message);
            }
            ProtocolEvent::Disconnected { reason } => {
                {
                    let mut shared = self.shared();
                    shared.state = SessionState::Disconnected;
                    shared.identity = None;
                    shared.presence.clear();
                    shared.mode_applied = false;
                }
                self.log.emit("UDP", "Disconnected", &reason);
            }
        }
    }

    /// Apply the configured behavior mode, once per connection
    ///
    /// Runs on the connection-established notification rather than on login
    /// success, because the low-level session-established signal may arrive
    /// asynchronously after the login call returns. Ghost and rejection are
    /// handled elsewhere (ghost right after login success, rejection before
    /// the login call).
    async fn apply_behavior_mode(&self) {
        {
            let mut shared = self.shared();
            if shared.mode_applied {
                return;
            }
            shared.mode_applied = true;
        }

        match self.mode {
            BehaviorMode::Wallflower => {
                self.log.emit(
                    "Behavior",
                    "Wallflower",
                    "Disabling Agent Updates (Heartbeat)",
                );
                self.client.set_liveness_enabled(false);
            }
            BehaviorMode::Chatter => {
                self.log
                    .emit("Behavior", "Chatter", &format!("Msg: {}", self.chatter_text));
                if let Err(e) = self.client.send_chat(&self.chatter_text, 0).await {
                    tracing::warn!("chatter auto-chat failed: {e}");
                }
            }
            BehaviorMode::Standard | BehaviorMode::Ghost | BehaviorMode::Rejection => {}
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
