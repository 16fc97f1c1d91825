//! Line-oriented command interpreter
//!
//! Reads one command per line from an interactive terminal or a piped
//! script and dispatches it against the session controller. Strictly
//! sequential: one command is fully processed before the next line is read.
//! Unknown commands and malformed arguments produce a local diagnostic and
//! change nothing. End-of-input ends the loop without forcing a logout;
//! scripts that want a clean close must say LOGOUT before EOF.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use gridmimic_core::{
    EncounterLog, HarnessError, SessionController, SessionDirective, Vector3,
};

use crate::error::Result;

const BANNER: &str = "gridmimic REPL. Commands: LOGIN, CHAT, REZ, SLEEP, WAIT, WHOAMI, WHO, \
    WHERE, WHEN, SUBJECTIVE_WHY, SUBJECTIVE_BECAUSE, SUBJECTIVE_LOOK, SUBJECTIVE_GOTO, POS, \
    LOGOUT, EXIT";

/// How the read loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplOutcome {
    /// EXIT command or end-of-input; the process may shut down normally
    Completed,
    /// Ghost mode demands immediate hard termination, no logout
    TerminateRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopControl {
    Continue,
    Exit,
    Terminate,
}

// ----------------------------------------------------------------------------
// Command Interpreter
// ----------------------------------------------------------------------------

pub struct CommandInterpreter {
    controller: Arc<SessionController>,
    log: Arc<EncounterLog>,
    default_uri: String,
    /// Free-form "why" annotation scripts attach to a trace
    because: String,
}

impl CommandInterpreter {
    pub fn new(
        controller: Arc<SessionController>,
        log: Arc<EncounterLog>,
        default_uri: impl Into<String>,
    ) -> Self {
        Self {
            controller,
            log,
            default_uri: default_uri.into(),
            because: String::new(),
        }
    }

    /// Arm the run-time ceiling: when it elapses the process exits hard,
    /// logged first, no logout attempted
    pub fn arm_runtime_ceiling(
        log: Arc<EncounterLog>,
        timeout_secs: u64,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(timeout_secs)).await;
            log.emit("System", "Timeout", "Max run time reached.");
            std::process::exit(0);
        })
    }

    /// Run the blocking read-dispatch loop until EXIT or end-of-input
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> Result<ReplOutcome> {
        println!("{BANNER}");

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            match self.dispatch(line.trim()).await {
                LoopControl::Continue => {}
                LoopControl::Exit => return Ok(ReplOutcome::Completed),
                LoopControl::Terminate => return Ok(ReplOutcome::TerminateRequested),
            }
        }
        Ok(ReplOutcome::Completed)
    }

    async fn dispatch(&mut self, line: &str) -> LoopControl {
        if line.is_empty() {
            return LoopControl::Continue;
        }

        self.log.emit("DEBUG", "Stdin", &format!("Read: '{line}'"));

        let (verb, remainder) = match line.split_once(' ') {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_uppercase().as_str() {
            "LOGIN" => return self.cmd_login(remainder).await,
            "CHAT" => self.report(self.controller.chat(remainder).await),
            "REZ" => self.report(self.controller.rez().await),
            "SLEEP" => self.cmd_sleep(remainder).await,
            "WAIT" => self.cmd_wait(remainder).await,
            "WHOAMI" => self.cmd_whoami(),
            "WHO" => self.cmd_who(),
            "WHERE" => self.cmd_where(),
            "WHEN" => self.cmd_when(),
            "SUBJECTIVE_BECAUSE" => {
                self.because = remainder.to_string();
                self.log.emit("Cognition", "Because", "Updated");
            }
            "SUBJECTIVE_WHY" => {
                self.log.emit("Cognition", "Why", &self.because);
            }
            "SUBJECTIVE_LOOK" => self.cmd_look(),
            "SUBJECTIVE_GOTO" => self.cmd_goto(remainder).await,
            "POS" => self.cmd_pos(remainder).await,
            "LOGOUT" => self.report(self.controller.logout().await),
            "EXIT" => {
                self.log.emit("Exit", "REPL", "Director requested exit");
                return LoopControl::Exit;
            }
            _ => println!("Unknown command: {verb}"),
        }

        LoopControl::Continue
    }

    /// Print the local diagnostic for a recoverable failure; nothing is
    /// emitted to the trace
    fn report(&self, result: gridmimic_core::Result<()>) {
        match result {
            Ok(()) => {}
            Err(HarnessError::NotConnected) => println!("Not connected."),
            Err(e) if e.is_recoverable() => println!("{e}"),
            Err(e) => println!("Error: {e}"),
        }
    }

    // ------------------------------------------------------------------
    // Command Handlers
    // ------------------------------------------------------------------

    async fn cmd_login(&self, remainder: &str) -> LoopControl {
        let args: Vec<&str> = remainder.split_whitespace().collect();
        if args.len() < 3 {
            println!("Usage: LOGIN First Last Pass [URI]");
            return LoopControl::Continue;
        }
        let uri = args.get(3).copied().unwrap_or(self.default_uri.as_str());

        match self.controller.login(args[0], args[1], args[2], uri).await {
            Ok(SessionDirective::Terminate) => LoopControl::Terminate,
            Ok(SessionDirective::Continue) => LoopControl::Continue,
            Err(e) => {
                println!("{e}");
                LoopControl::Continue
            }
        }
    }

    async fn cmd_sleep(&self, remainder: &str) {
        match remainder.parse::<f64>() {
            Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => {
                tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
                self.log
                    .emit("System", "Sleep", &format!("Slept {seconds}s"));
            }
            _ => println!("Usage: SLEEP float_seconds"),
        }
    }

    async fn cmd_wait(&self, remainder: &str) {
        match remainder.parse::<u64>() {
            Ok(millis) => tokio::time::sleep(Duration::from_millis(millis)).await,
            Err(_) => println!("Usage: WAIT milliseconds"),
        }
    }

    fn cmd_whoami(&self) {
        match self.controller.identity() {
            Ok(identity) => self.log.emit(
                "Self",
                "Identity",
                &format!("Name: {}, UUID: {}", identity.name, identity.agent_id),
            ),
            Err(_) => println!("Not connected."),
        }
    }

    fn cmd_who(&self) {
        match self.controller.visible_avatars() {
            Ok(avatars) => {
                for avatar in avatars {
                    self.log.emit(
                        "Sight",
                        "Avatar",
                        &format!(
                            "Name: {}, UUID: {}, LocalID: {}",
                            avatar.name, avatar.agent_id, avatar.local_id
                        ),
                    );
                }
            }
            Err(_) => println!("Not connected."),
        }
    }

    fn cmd_where(&self) {
        match self.controller.location() {
            Ok((sim_name, position)) => self.log.emit(
                "Navigation",
                "Location",
                &format!("Sim: {sim_name}, Pos: {position}"),
            ),
            Err(_) => println!("Not connected."),
        }
    }

    fn cmd_when(&self) {
        self.log.emit(
            "Chronology",
            "Time",
            &format!(
                "GridTime: {}",
                Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
            ),
        );
    }

    fn cmd_look(&self) {
        match self.controller.sighting_counts() {
            Ok((avatars, things)) => self.log.emit(
                "Sight",
                "Observation",
                &format!("Avatars: {avatars}, Primitives: {things}"),
            ),
            Err(_) => println!("Not connected."),
        }
    }

    async fn cmd_goto(&self, remainder: &str) {
        let current = match self.controller.self_position() {
            Ok(position) => position,
            Err(_) => {
                println!("Not connected.");
                return;
            }
        };

        let coords: Vec<&str> = remainder.split(',').map(str::trim).collect();
        let parsed = (
            coords.first().and_then(|c| c.parse::<f32>().ok()),
            coords.get(1).and_then(|c| c.parse::<f32>().ok()),
        );
        let (Some(x), Some(y)) = parsed else {
            println!("Usage: SUBJECTIVE_GOTO x,y[,z]");
            return;
        };
        // Altitude holds unless the script says otherwise.
        let z = match coords.get(2) {
            Some(c) => match c.parse::<f32>() {
                Ok(z) => z,
                Err(_) => {
                    println!("Usage: SUBJECTIVE_GOTO x,y[,z]");
                    return;
                }
            },
            None => current.z,
        };

        self.report(self.controller.auto_pilot_to(Vector3::new(x, y, z)).await);
    }

    async fn cmd_pos(&self, remainder: &str) {
        let coords: Vec<&str> = remainder.split(',').map(str::trim).collect();
        let parsed: Option<(f32, f32, f32)> = match coords.as_slice() {
            [x, y, z] => match (x.parse(), y.parse(), z.parse()) {
                (Ok(x), Ok(y), Ok(z)) => Some((x, y, z)),
                _ => None,
            },
            _ => None,
        };
        let Some((x, y, z)) = parsed else {
            println!("Usage: POS x,y,z");
            return;
        };

        self.report(self.controller.teleport_to(Vector3::new(x, y, z)).await);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
