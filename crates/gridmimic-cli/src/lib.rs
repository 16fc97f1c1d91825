//! gridmimic harness binary internals
//!
//! Wires the core session machinery to a process: clap argument parsing,
//! layered TOML configuration, the line-oriented command interpreter, and a
//! deterministic loopback session client for dry runs.

pub mod cli;
pub mod config;
pub mod error;
pub mod loopback;
pub mod repl;

pub use cli::Cli;
pub use config::{HarnessConfig, ResolvedConfig};
pub use error::{CliError, Result};
pub use loopback::{LoopbackClient, LoopbackConfig};
pub use repl::{CommandInterpreter, ReplOutcome};
