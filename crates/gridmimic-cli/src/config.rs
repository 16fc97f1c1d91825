//! Harness configuration
//!
//! Process-wide configuration is read once at startup and immutable
//! thereafter. Layering order, lowest priority first: built-in defaults,
//! TOML config file, environment fallbacks (`MIMIC_ENCOUNTER_LOG`,
//! `TAG_UA`), command-line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use gridmimic_core::BehaviorMode;

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// Environment fallback for the encounter file sink path
pub const ENCOUNTER_LOG_ENV: &str = "MIMIC_ENCOUNTER_LOG";
/// Environment fallback for the user-agent tag
pub const UA_TAG_ENV: &str = "TAG_UA";

// ----------------------------------------------------------------------------
// File Configuration
// ----------------------------------------------------------------------------

/// On-disk configuration file contents (all sections optional)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub session: SessionConfig,
    pub behavior: BehaviorConfig,
    pub output: OutputConfig,
}

/// Credentials and endpoint for the one-shot auto-login path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub uri: String,
    /// Log in before entering the REPL even without credential flags
    pub auto_login: bool,
    /// Run-time ceiling in seconds; absent means unlimited
    pub timeout_secs: Option<u64>,
}

/// Scripted-behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// standard, ghost, wallflower, rejection or chatter
    pub mode: String,
    /// Wallflower idle time waiting for the server to reap the session
    pub wallflower_dwell_secs: u64,
    /// Text sent automatically in chatter mode
    pub chatter_text: String,
}

/// Encounter-record output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Append-only file sink; absent disables the file sink silently
    pub encounter_log: Option<PathBuf>,
    /// Optional user-agent tag injected into every record
    pub ua_tag: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password: "password".to_string(),
            uri: "http://localhost:9000/".to_string(),
            auto_login: false,
            timeout_secs: None,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            mode: "standard".to_string(),
            // Server reap timeouts commonly default to 60s; leave headroom.
            wallflower_dwell_secs: 90,
            chatter_text: "Hello from the harness".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&contents)?)
    }
}

// ----------------------------------------------------------------------------
// Resolved Configuration
// ----------------------------------------------------------------------------

/// Fully resolved, validated process configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub uri: String,
    pub auto_login: bool,
    pub mode: BehaviorMode,
    pub timeout_secs: Option<u64>,
    pub wallflower_dwell_secs: u64,
    pub chatter_text: String,
    pub encounter_log: Option<PathBuf>,
    pub ua_tag: Option<String>,
    pub verbose: bool,
}

impl ResolvedConfig {
    /// Merge defaults, config file, environment fallbacks and CLI flags
    ///
    /// Any validation failure here is fatal: the process must exit non-zero
    /// before a session is created.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => HarnessConfig::load_from_file(path)?,
            None => HarnessConfig::default(),
        };

        let mode_name = cli
            .mode
            .clone()
            .unwrap_or_else(|| file.behavior.mode.clone());
        let mode: BehaviorMode = mode_name.parse().map_err(|e| CliError::Config(format!("{e}")))?;

        // Presence of any credential flag selects the one-shot path.
        let auto_login = cli.first_name.is_some()
            || cli.last_name.is_some()
            || cli.password.is_some()
            || cli.uri.is_some()
            || file.session.auto_login;

        let encounter_log = cli
            .encounter_log
            .clone()
            .or_else(|| env_path(ENCOUNTER_LOG_ENV))
            .or(file.output.encounter_log);

        let ua_tag = cli
            .ua_tag
            .clone()
            .or_else(|| env_nonempty(UA_TAG_ENV))
            .or(file.output.ua_tag)
            .filter(|t| !t.is_empty());

        Ok(Self {
            first_name: cli.first_name.clone().unwrap_or(file.session.first_name),
            last_name: cli.last_name.clone().unwrap_or(file.session.last_name),
            password: cli.password.clone().unwrap_or(file.session.password),
            uri: cli.uri.clone().unwrap_or(file.session.uri),
            auto_login,
            mode,
            timeout_secs: cli.timeout.or(file.session.timeout_secs),
            wallflower_dwell_secs: cli.dwell.unwrap_or(file.behavior.wallflower_dwell_secs),
            chatter_text: cli
                .chatter_text
                .clone()
                .unwrap_or(file.behavior.chatter_text),
            encounter_log,
            ua_tag,
            verbose: cli.verbose,
        })
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_path(name: &str) -> Option<PathBuf> {
    env_nonempty(name).map(PathBuf::from)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["gridmimic"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn defaults_select_interactive_standard_mode() {
        let resolved = ResolvedConfig::resolve(&cli(&[])).unwrap();
        assert_eq!(resolved.mode, BehaviorMode::Standard);
        assert!(!resolved.auto_login);
        assert_eq!(resolved.uri, "http://localhost:9000/");
        assert_eq!(resolved.wallflower_dwell_secs, 90);
        assert!(resolved.timeout_secs.is_none());
    }

    #[test]
    fn credential_flag_triggers_auto_login() {
        let resolved = ResolvedConfig::resolve(&cli(&["--firstname", "Probe"])).unwrap();
        assert!(resolved.auto_login);
        assert_eq!(resolved.first_name, "Probe");
        // Unspecified fields keep their defaults.
        assert_eq!(resolved.last_name, "User");
    }

    #[test]
    fn bad_mode_is_a_fatal_config_error() {
        let err = ResolvedConfig::resolve(&cli(&["--mode", "poltergeist"])).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn file_values_sit_under_cli_overrides() {
        let dir = std::env::temp_dir().join("gridmimic-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("harness-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"
[session]
first_name = "Fromfile"
timeout_secs = 30

[behavior]
mode = "chatter"
chatter_text = "flooding"

[output]
ua_tag = "file-tag"
"#,
        )
        .unwrap();

        let resolved = ResolvedConfig::resolve(&cli(&[
            "--config",
            path.to_str().unwrap(),
            "--mode",
            "ghost",
        ]))
        .unwrap();

        // CLI wins over file; file wins over defaults.
        assert_eq!(resolved.mode, BehaviorMode::Ghost);
        assert_eq!(resolved.first_name, "Fromfile");
        assert_eq!(resolved.chatter_text, "flooding");
        assert_eq!(resolved.timeout_secs, Some(30));
        assert_eq!(resolved.ua_tag.as_deref(), Some("file-tag"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn empty_ua_tag_is_treated_as_absent() {
        let resolved = ResolvedConfig::resolve(&cli(&["--ua-tag", ""])).unwrap();
        assert!(resolved.ua_tag.is_none());
    }
}
