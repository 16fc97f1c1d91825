//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::Parser;

/// Scripted differential test harness for a virtual-world protocol client
///
/// With no credential flags the harness starts straight into the command
/// REPL; supplying any of `--firstname`, `--lastname`, `--password` or
/// `--uri` triggers an automatic login first (the legacy one-shot path).
#[derive(Parser, Debug)]
#[command(name = "gridmimic", author, version, about, long_about = None)]
pub struct Cli {
    /// First name of the agent
    #[arg(long = "firstname", visible_alias = "user")]
    pub first_name: Option<String>,

    /// Last name of the agent
    #[arg(long = "lastname")]
    pub last_name: Option<String>,

    /// Password of the agent
    #[arg(long)]
    pub password: Option<String>,

    /// Login URI of the grid under test
    #[arg(long)]
    pub uri: Option<String>,

    /// Behavior mode: standard, ghost, wallflower, rejection, chatter
    #[arg(long)]
    pub mode: Option<String>,

    /// Maximum run time in seconds; on expiry the process exits hard
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Append encounter records to this file in addition to stdout
    /// (falls back to MIMIC_ENCOUNTER_LOG)
    #[arg(long)]
    pub encounter_log: Option<PathBuf>,

    /// User-agent tag injected into every encounter record
    /// (falls back to TAG_UA)
    #[arg(long)]
    pub ua_tag: Option<String>,

    /// Seconds to idle in wallflower mode waiting for the server to reap us
    #[arg(long)]
    pub dwell: Option<u64>,

    /// Text sent automatically in chatter mode
    #[arg(long)]
    pub chatter_text: Option<String>,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose harness diagnostics
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_one_shot_flags() {
        let cli = Cli::parse_from([
            "gridmimic",
            "--firstname",
            "Test",
            "--lastname",
            "User",
            "--password",
            "password",
            "--uri",
            "http://localhost:9000/",
            "--mode",
            "wallflower",
            "--timeout",
            "120",
        ]);
        assert_eq!(cli.first_name.as_deref(), Some("Test"));
        assert_eq!(cli.mode.as_deref(), Some("wallflower"));
        assert_eq!(cli.timeout, Some(120));
    }

    #[test]
    fn user_alias_maps_to_firstname() {
        let cli = Cli::parse_from(["gridmimic", "--user", "Test"]);
        assert_eq!(cli.first_name.as_deref(), Some("Test"));
    }
}
