//! Contract for the network session client
//!
//! The harness never implements the wire protocol itself; it drives whatever
//! client links in through this trait and observes the world through the
//! protocol events the client delivers. Event delivery happens on the
//! client's own task, concurrently with the interpreter's foreground loop.

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::errors::Result;
use crate::types::{AgentIdentity, Credentials, ShapeDescriptor, Vector3};

// ----------------------------------------------------------------------------
// Protocol Events
// ----------------------------------------------------------------------------

/// Inbound protocol notifications the harness subscribes to
///
/// Payloads are kept to the fields the encounter trace needs; everything
/// else the wire carries is the client's business.
#[derive(Debug, Clone)]
pub enum ProtocolEvent {
    /// Login handshake progress report
    LoginProgress { status: String, message: String },
    /// Low-level session established with a simulator
    SimConnected { sim_name: String, endpoint: String },
    /// Region handshake received
    RegionHandshake { region_name: String, flags: u64 },
    /// Chat delivered by the simulator, raw bytes as framed on the wire
    ChatReceived {
        from_name: String,
        raw_message: Vec<u8>,
        reliable: bool,
        zerocoded: bool,
    },
    /// An entity entered the interest list
    ObjectUpdate { local_id: u32, is_avatar: bool },
    /// An entity was removed from the scene
    ObjectKilled { local_id: u32 },
    /// Server alert text
    AlertMessage { message: String },
    /// Connection lost or closed; observed passively
    Disconnected { reason: String },
}

pub type EventSender = mpsc::UnboundedSender<ProtocolEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ProtocolEvent>;

// ----------------------------------------------------------------------------
// Login Outcome and Sightings
// ----------------------------------------------------------------------------

/// Server-supplied login rejection
#[derive(Debug, Clone)]
pub struct LoginFailure {
    pub reason: String,
}

/// One avatar currently visible to the client
#[derive(Debug, Clone)]
pub struct AvatarSighting {
    pub name: String,
    pub agent_id: Uuid,
    pub local_id: u32,
}

// ----------------------------------------------------------------------------
// Session Client Trait
// ----------------------------------------------------------------------------

/// Capability surface of the network session client
///
/// `login` is synchronous from the caller's perspective: it returns only
/// once success or failure is known. Everything observed after that arrives
/// through the event subscription.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Attempt login; blocks until the server accepts or rejects
    async fn login(
        &self,
        credentials: &Credentials,
        endpoint: &str,
    ) -> std::result::Result<AgentIdentity, LoginFailure>;

    /// Fire-and-forget session close; completion surfaces as a
    /// [`ProtocolEvent::Disconnected`]
    async fn logout(&self);

    fn is_connected(&self) -> bool;

    async fn send_chat(&self, text: &str, channel: i32) -> Result<()>;

    async fn request_spawn_object(
        &self,
        shape: ShapeDescriptor,
        position: Vector3,
        scale: Vector3,
    ) -> Result<()>;

    async fn teleport(&self, sim_name: &str, position: Vector3) -> Result<()>;

    async fn auto_pilot_to(&self, position: Vector3) -> Result<()>;

    /// Enable or suppress outbound periodic liveness signaling (agent
    /// updates and pings); wallflower mode turns this off
    fn set_liveness_enabled(&self, enabled: bool);

    /// Register a subscription; all protocol events are delivered to every
    /// subscriber in arrival order
    fn subscribe(&self) -> EventReceiver;

    /// Name of the currently connected simulator, if any
    fn current_sim(&self) -> Option<String>;

    /// Agent position within the current region
    fn self_position(&self) -> Vector3;

    /// Avatars currently on the client's interest list
    fn visible_avatars(&self) -> Vec<AvatarSighting>;
}
