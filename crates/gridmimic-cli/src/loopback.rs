//! Deterministic in-process session client
//!
//! Stands in for a real wire client during dry runs and in the integration
//! tests: accepts any credentials except the canonical bad password, plays
//! back a fixed connection sequence, echoes outbound chat as inbound chat
//! with a configurable wire framing, and seeds a small scene so the presence
//! tracker has something to see. No bytes ever leave the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use gridmimic_core::client::{
    AvatarSighting, EventReceiver, EventSender, LoginFailure, ProtocolEvent, SessionClient,
};
use gridmimic_core::{
    AgentIdentity, ChatDialect, Credentials, Result, ShapeDescriptor, Vector3,
};

/// Password the loopback grid always rejects
const BAD_PASSWORD: &str = "badpassword";
/// Server reason attached to a rejected login
const REJECTION_REASON: &str =
    "Could not authenticate your avatar. Please check your username and password";

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Tunables for the loopback grid
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    pub sim_name: String,
    pub sim_endpoint: String,
    /// Wire framing used when echoing chat back at the harness
    pub echo_dialect: ChatDialect,
    /// Seed one avatar and two objects after connecting
    pub seed_scene: bool,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            sim_name: "Loopback Region".to_string(),
            sim_endpoint: "127.0.0.1:9000".to_string(),
            echo_dialect: ChatDialect::NullTerminated,
            seed_scene: true,
        }
    }
}

// ----------------------------------------------------------------------------
// Loopback Client
// ----------------------------------------------------------------------------

pub struct LoopbackClient {
    config: LoopbackConfig,
    connected: AtomicBool,
    liveness_enabled: AtomicBool,
    position: Mutex<Vector3>,
    resident: AvatarSighting,
    subscribers: Mutex<Vec<EventSender>>,
}

impl LoopbackClient {
    pub fn new(config: LoopbackConfig) -> Self {
        Self {
            config,
            connected: AtomicBool::new(false),
            liveness_enabled: AtomicBool::new(true),
            position: Mutex::new(Vector3::new(128.0, 128.0, 21.0)),
            resident: AvatarSighting {
                name: "Loopback Resident".to_string(),
                agent_id: Uuid::new_v4(),
                local_id: 1,
            },
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn liveness_enabled(&self) -> bool {
        self.liveness_enabled.load(Ordering::SeqCst)
    }

    fn broadcast(&self, event: ProtocolEvent) {
        let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        for sender in subscribers.iter() {
            let _ = sender.send(event.clone());
        }
    }

    /// Frame a chat string the way the configured dialect would put it on
    /// the wire
    fn frame_chat(&self, text: &str) -> Vec<u8> {
        let mut raw = text.as_bytes().to_vec();
        if self.config.echo_dialect == ChatDialect::NullTerminated && !raw.is_empty() {
            raw.push(0x00);
        }
        raw
    }

    fn play_connection_sequence(&self) {
        self.broadcast(ProtocolEvent::SimConnected {
            sim_name: self.config.sim_name.clone(),
            endpoint: self.config.sim_endpoint.clone(),
        });
        self.broadcast(ProtocolEvent::RegionHandshake {
            region_name: self.config.sim_name.clone(),
            flags: 0,
        });
        if self.config.seed_scene {
            self.broadcast(ProtocolEvent::ObjectUpdate {
                local_id: self.resident.local_id,
                is_avatar: true,
            });
            self.broadcast(ProtocolEvent::ObjectUpdate {
                local_id: 2,
                is_avatar: false,
            });
            self.broadcast(ProtocolEvent::ObjectUpdate {
                local_id: 3,
                is_avatar: false,
            });
        }
    }
}

#[async_trait]
impl SessionClient for LoopbackClient {
    async fn login(
        &self,
        credentials: &Credentials,
        _endpoint: &str,
    ) -> std::result::Result<AgentIdentity, LoginFailure> {
        self.broadcast(ProtocolEvent::LoginProgress {
            status: "ConnectingToLogin".to_string(),
            message: "Contacting login server".to_string(),
        });

        if credentials.password == BAD_PASSWORD {
            self.broadcast(ProtocolEvent::LoginProgress {
                status: "Failed".to_string(),
                message: REJECTION_REASON.to_string(),
            });
            return Err(LoginFailure {
                reason: REJECTION_REASON.to_string(),
            });
        }

        self.broadcast(ProtocolEvent::LoginProgress {
            status: "Success".to_string(),
            message: "Welcome to the loopback grid".to_string(),
        });
        self.connected.store(true, Ordering::SeqCst);
        self.play_connection_sequence();

        Ok(AgentIdentity {
            name: format!("{} {}", credentials.first_name, credentials.last_name),
            agent_id: Uuid::new_v4(),
        })
    }

    async fn logout(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.broadcast(ProtocolEvent::ObjectKilled {
            local_id: self.resident.local_id,
        });
        self.broadcast(ProtocolEvent::Disconnected {
            reason: "client initiated logout".to_string(),
        });
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_chat(&self, text: &str, _channel: i32) -> Result<()> {
        // The grid echoes everything said on the public channel.
        self.broadcast(ProtocolEvent::ChatReceived {
            from_name: self.resident.name.clone(),
            raw_message: self.frame_chat(text),
            reliable: true,
            zerocoded: false,
        });
        Ok(())
    }

    async fn request_spawn_object(
        &self,
        _shape: ShapeDescriptor,
        _position: Vector3,
        _scale: Vector3,
    ) -> Result<()> {
        // The spawned object appears as a fresh entity.
        self.broadcast(ProtocolEvent::ObjectUpdate {
            local_id: 100,
            is_avatar: false,
        });
        Ok(())
    }

    async fn teleport(&self, _sim_name: &str, position: Vector3) -> Result<()> {
        *self.position.lock().unwrap_or_else(|e| e.into_inner()) = position;
        Ok(())
    }

    async fn auto_pilot_to(&self, position: Vector3) -> Result<()> {
        *self.position.lock().unwrap_or_else(|e| e.into_inner()) = position;
        Ok(())
    }

    fn set_liveness_enabled(&self, enabled: bool) {
        self.liveness_enabled.store(enabled, Ordering::SeqCst);
    }

    fn subscribe(&self) -> EventReceiver {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sender);
        receiver
    }

    fn current_sim(&self) -> Option<String> {
        self.is_connected().then(|| self.config.sim_name.clone())
    }

    fn self_position(&self) -> Vector3 {
        *self.position.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn visible_avatars(&self) -> Vec<AvatarSighting> {
        if self.is_connected() && self.config.seed_scene {
            vec![self.resident.clone()]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("Test", "User", "password")
    }

    #[tokio::test]
    async fn accepts_good_credentials_and_plays_connection_sequence() {
        let client = LoopbackClient::new(LoopbackConfig::default());
        let mut events = client.subscribe();

        let identity = client.login(&creds(), "http://localhost:9000/").await.unwrap();
        assert_eq!(identity.name, "Test User");
        assert!(client.is_connected());

        // Progress, progress, connected, handshake, then the seeded scene.
        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(std::mem::discriminant(&event));
            if kinds.len() > 10 {
                break;
            }
        }
        assert_eq!(kinds.len(), 7);
    }

    #[tokio::test]
    async fn rejects_the_bad_password() {
        let client = LoopbackClient::new(LoopbackConfig::default());
        let failure = client
            .login(&Credentials::new("Test", "User", "badpassword"), "http://localhost:9000/")
            .await
            .unwrap_err();
        assert!(failure.reason.contains("Could not authenticate"));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn chat_echo_carries_the_configured_framing() {
        let client = LoopbackClient::new(LoopbackConfig::default());
        let mut events = client.subscribe();
        client.send_chat("hi", 0).await.unwrap();

        match events.try_recv().unwrap() {
            ProtocolEvent::ChatReceived { raw_message, .. } => {
                assert_eq!(raw_message, vec![0x68, 0x69, 0x00]);
            }
            other => panic!("unexpected event {other:?}"),
        }

        let clean = LoopbackClient::new(LoopbackConfig {
            echo_dialect: ChatDialect::ExplicitLength,
            ..LoopbackConfig::default()
        });
        let mut events = clean.subscribe();
        clean.send_chat("hi", 0).await.unwrap();
        match events.try_recv().unwrap() {
            ProtocolEvent::ChatReceived { raw_message, .. } => {
                assert_eq!(raw_message, b"hi".to_vec());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
