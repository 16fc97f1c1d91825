//! Scripted in-memory session client and log capture for the test suites
//!
//! [`ScriptedClient`] records every call made against it and lets a test
//! inject protocol events by hand, so controller and interpreter behavior
//! can be asserted without any transport. [`MemoryWriter`] captures
//! encounter records emitted during a test.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::client::{
    AvatarSighting, EventReceiver, EventSender, LoginFailure, ProtocolEvent, SessionClient,
};
use crate::errors::Result;
use crate::types::{AgentIdentity, Credentials, ShapeDescriptor, Vector3};

// ----------------------------------------------------------------------------
// Log Capture
// ----------------------------------------------------------------------------

/// `Write` implementation backed by a shared in-memory buffer
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, as UTF-8
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Captured output split into lines
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Signals (`sig` fields) of captured encounter records, in order
    pub fn signals(&self) -> Vec<String> {
        self.lines()
            .iter()
            .filter_map(|line| {
                let rest = line.split("\"sig\": \"").nth(1)?;
                Some(rest.split('"').next()?.to_string())
            })
            .collect()
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Scripted Client
// ----------------------------------------------------------------------------

/// Calls recorded by the scripted client, for assertion in tests
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    Login {
        first_name: String,
        password: String,
        endpoint: String,
    },
    Logout,
    Chat {
        text: String,
        channel: i32,
    },
    SpawnObject {
        shape: ShapeDescriptor,
        position: Vector3,
        scale: Vector3,
    },
    Teleport {
        sim_name: String,
        position: Vector3,
    },
    AutoPilot {
        position: Vector3,
    },
    SetLiveness {
        enabled: bool,
    },
}

/// In-memory [`SessionClient`] with a scripted login outcome
pub struct ScriptedClient {
    reject_reason: Option<String>,
    connected: AtomicBool,
    liveness_enabled: AtomicBool,
    sim_name: Mutex<Option<String>>,
    position: Mutex<Vector3>,
    avatars: Mutex<Vec<AvatarSighting>>,
    subscribers: Mutex<Vec<EventSender>>,
    calls: Mutex<Vec<ClientCall>>,
}

impl ScriptedClient {
    /// Client that accepts any credentials
    pub fn accepting() -> Self {
        Self::with_outcome(None)
    }

    /// Client that rejects every login with the given server reason
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self::with_outcome(Some(reason.into()))
    }

    fn with_outcome(reject_reason: Option<String>) -> Self {
        Self {
            reject_reason,
            connected: AtomicBool::new(false),
            liveness_enabled: AtomicBool::new(true),
            sim_name: Mutex::new(None),
            position: Mutex::new(Vector3::new(128.0, 128.0, 21.0)),
            avatars: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Deliver a protocol event to every subscriber, as the network client's
    /// delivery thread would
    pub fn push_event(&self, event: ProtocolEvent) {
        let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        for sender in subscribers.iter() {
            let _ = sender.send(event.clone());
        }
    }

    /// Snapshot of every call recorded so far
    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn liveness_enabled(&self) -> bool {
        self.liveness_enabled.load(Ordering::SeqCst)
    }

    pub fn set_visible_avatars(&self, avatars: Vec<AvatarSighting>) {
        *self.avatars.lock().unwrap_or_else(|e| e.into_inner()) = avatars;
    }

    fn record(&self, call: ClientCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

#[async_trait]
impl SessionClient for ScriptedClient {
    async fn login(
        &self,
        credentials: &Credentials,
        endpoint: &str,
    ) -> std::result::Result<AgentIdentity, LoginFailure> {
        self.record(ClientCall::Login {
            first_name: credentials.first_name.clone(),
            password: credentials.password.clone(),
            endpoint: endpoint.to_string(),
        });

        if let Some(reason) = &self.reject_reason {
            return Err(LoginFailure {
                reason: reason.clone(),
            });
        }

        self.connected.store(true, Ordering::SeqCst);
        *self.sim_name.lock().unwrap_or_else(|e| e.into_inner()) =
            Some("Scripted Region".to_string());
        Ok(AgentIdentity {
            name: format!("{} {}", credentials.first_name, credentials.last_name),
            agent_id: Uuid::new_v4(),
        })
    }

    async fn logout(&self) {
        self.record(ClientCall::Logout);
        self.connected.store(false, Ordering::SeqCst);
        self.push_event(ProtocolEvent::Disconnected {
            reason: "client initiated logout".to_string(),
        });
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_chat(&self, text: &str, channel: i32) -> Result<()> {
        self.record(ClientCall::Chat {
            text: text.to_string(),
            channel,
        });
        Ok(())
    }

    async fn request_spawn_object(
        &self,
        shape: ShapeDescriptor,
        position: Vector3,
        scale: Vector3,
    ) -> Result<()> {
        self.record(ClientCall::SpawnObject {
            shape,
            position,
            scale,
        });
        Ok(())
    }

    async fn teleport(&self, sim_name: &str, position: Vector3) -> Result<()> {
        self.record(ClientCall::Teleport {
            sim_name: sim_name.to_string(),
            position,
        });
        *self.position.lock().unwrap_or_else(|e| e.into_inner()) = position;
        Ok(())
    }

    async fn auto_pilot_to(&self, position: Vector3) -> Result<()> {
        self.record(ClientCall::AutoPilot { position });
        Ok(())
    }

    fn set_liveness_enabled(&self, enabled: bool) {
        self.record(ClientCall::SetLiveness { enabled });
        self.liveness_enabled.store(enabled, Ordering::SeqCst);
    }

    fn subscribe(&self) -> EventReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sender);
        receiver
    }

    fn current_sim(&self) -> Option<String> {
        if !self.is_connected() {
            return None;
        }
        self.sim_name
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn self_position(&self) -> Vector3 {
        *self.position.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn visible_avatars(&self) -> Vec<AvatarSighting> {
        self.avatars
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_client_records_calls_in_order() {
        let client = ScriptedClient::accepting();
        let creds = Credentials::new("Test", "User", "password");

        client.login(&creds, "http://localhost:9000/").await.unwrap();
        client.send_chat("hello", 0).await.unwrap();
        client.logout().await;

        let calls = client.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], ClientCall::Login { .. }));
        assert!(matches!(calls[2], ClientCall::Logout));
    }

    #[tokio::test]
    async fn events_reach_every_subscriber() {
        let client = ScriptedClient::accepting();
        let mut first = client.subscribe();
        let mut second = client.subscribe();

        client.push_event(ProtocolEvent::AlertMessage {
            message: "maintenance".to_string(),
        });

        assert!(matches!(
            first.recv().await,
            Some(ProtocolEvent::AlertMessage { .. })
        ));
        assert!(matches!(
            second.recv().await,
            Some(ProtocolEvent::AlertMessage { .. })
        ));
    }
}
