//! Canonical encounter-record emission
//!
//! Every observed or performed action in a harness run becomes one structured
//! line ("encounter") that downstream tooling diffs against expected traces:
//!
//! ```text
//! { "at": "<UTC-ISO8601-ms>", ["ua": "<tag>",] "via": "<actor>", "sys": "<system>", "sig": "<signal>", "val": "<payload>" }
//! ```
//!
//! Field order is fixed and `ua` appears only when a user-agent tag is
//! configured. The format is deliberately NOT strict JSON: only the quote
//! delimiter in the payload is escaped, nothing else. Consumers must not
//! expect payloads to round-trip through a strict JSON parser.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};

/// Fixed tag identifying the harness as the originating side of a record
pub const DEFAULT_ACTOR: &str = "Visitant";

// ----------------------------------------------------------------------------
// Encounter Log
// ----------------------------------------------------------------------------

/// Renders encounter records and writes them to a console sink plus an
/// optional append-only file sink
///
/// `emit` never fails: the console sink is the source of truth and file
/// failures are swallowed. Each record is rendered first and written with a
/// single call per sink under a lock, so concurrent emitters may interleave
/// whole records but never parts of one.
pub struct EncounterLog {
    actor: String,
    ua_tag: Option<String>,
    console: Mutex<Box<dyn Write + Send>>,
    file: Option<Mutex<File>>,
}

impl EncounterLog {
    /// Create a log writing to stdout, with an optional append-only file sink
    ///
    /// A file path that cannot be opened disables the file sink; it never
    /// fails the harness.
    pub fn new(actor: impl Into<String>, ua_tag: Option<String>, file_path: Option<&Path>) -> Self {
        let file = file_path.and_then(|path| match open_append(path) {
            Ok(f) => Some(Mutex::new(f)),
            Err(e) => {
                tracing::warn!("encounter file sink disabled ({}): {e}", path.display());
                None
            }
        });

        Self {
            actor: actor.into(),
            ua_tag: ua_tag.filter(|t| !t.is_empty()),
            console: Mutex::new(Box::new(io::stdout())),
            file,
        }
    }

    /// Create a log with a caller-supplied console writer
    ///
    /// Used by the test suites to capture emitted records.
    pub fn with_console_writer(
        actor: impl Into<String>,
        ua_tag: Option<String>,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            actor: actor.into(),
            ua_tag: ua_tag.filter(|t| !t.is_empty()),
            console: Mutex::new(writer),
            file: None,
        }
    }

    /// Emit one encounter record
    ///
    /// Never returns an error; sink failures are absorbed.
    pub fn emit(&self, system: &str, signal: &str, payload: &str) {
        let line = self.render(system, signal, payload);

        if let Ok(mut console) = self.console.lock() {
            let _ = writeln!(console, "{line}");
            let _ = console.flush();
        }

        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "{line}");
            }
        }
    }

    /// Render the canonical line for one record
    fn render(&self, system: &str, signal: &str, payload: &str) -> String {
        let at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let ua_part = match &self.ua_tag {
            Some(tag) => format!("\"ua\": \"{tag}\", "),
            None => String::new(),
        };
        format!(
            "{{ \"at\": \"{at}\", {ua_part}\"via\": \"{actor}\", \"sys\": \"{system}\", \"sig\": \"{signal}\", \"val\": \"{val}\" }}",
            actor = self.actor,
            val = escape_quotes(payload),
        )
    }
}

/// Escape the one character that would break the record: the quote delimiter
///
/// No other escaping is attempted; see the module docs.
fn escape_quotes(payload: &str) -> String {
    payload.replace('"', "\\\"")
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemoryWriter;

    #[test]
    fn record_has_fixed_field_order() {
        let writer = MemoryWriter::new();
        let log = EncounterLog::with_console_writer(DEFAULT_ACTOR, None, Box::new(writer.clone()));

        log.emit("Login", "Success", "Agent: abc");

        let lines = writer.lines();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert!(line.starts_with("{ \"at\": \""));
        assert!(line.ends_with("\"via\": \"Visitant\", \"sys\": \"Login\", \"sig\": \"Success\", \"val\": \"Agent: abc\" }"));
        // Millisecond-precision UTC timestamp
        let at = line.split('"').nth(3).unwrap();
        assert!(at.ends_with('Z'));
        assert!(at.contains('.'), "expected fractional seconds in {at}");
    }

    #[test]
    fn ua_tag_present_only_when_configured() {
        let tagged = MemoryWriter::new();
        let log = EncounterLog::with_console_writer(
            DEFAULT_ACTOR,
            Some("obsv-7".to_string()),
            Box::new(tagged.clone()),
        );
        log.emit("Chat", "Heard", "");
        assert!(tagged.lines()[0].contains("\"ua\": \"obsv-7\", \"via\""));

        let empty_tag = MemoryWriter::new();
        let log = EncounterLog::with_console_writer(
            DEFAULT_ACTOR,
            Some(String::new()),
            Box::new(empty_tag.clone()),
        );
        log.emit("Chat", "Heard", "");
        assert!(!empty_tag.lines()[0].contains("\"ua\""));
    }

    #[test]
    fn payload_quotes_are_escaped_and_nothing_else() {
        let writer = MemoryWriter::new();
        let log = EncounterLog::with_console_writer(DEFAULT_ACTOR, None, Box::new(writer.clone()));

        log.emit("Chat", "Heard", r#"said "hello" \ back"#);

        let line = &writer.lines()[0];
        assert!(line.contains(r#"\"hello\""#));
        // Backslashes pass through untouched; this format is not strict JSON.
        assert!(line.contains(r"\ back"));
    }

    #[test]
    fn file_sink_appends_records() {
        let dir = std::env::temp_dir().join("gridmimic-encounter-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("encounter-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let log = EncounterLog::new(DEFAULT_ACTOR, None, Some(&path));
        log.emit("System", "Sleep", "Slept 1s");
        log.emit("Exit", "REPL", "Director requested exit");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("\"sig\": \"Sleep\""));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unopenable_file_sink_is_disabled_silently() {
        let bogus = Path::new("/nonexistent-dir/encounter.log");
        let log = EncounterLog::new(DEFAULT_ACTOR, None, Some(bogus));
        // Must not panic or error; console-only operation continues.
        log.emit("System", "Timeout", "Max run time reached.");
    }
}
