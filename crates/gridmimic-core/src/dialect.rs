//! Wire-framing dialect probe for inbound chat payloads
//!
//! Two server implementations claiming the same protocol can frame an
//! identical chat string differently: one includes an explicit NUL
//! terminator inside the length-delimited field, the other declares a length
//! that exactly matches the content. Decoded strings compare equal either
//! way, so the divergence only shows at the byte level, which is exactly
//! where a differential harness has to look.

// ----------------------------------------------------------------------------
// Classification
// ----------------------------------------------------------------------------

/// String-framing convention observed in a raw chat payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatDialect {
    /// Zero-length field
    Empty,
    /// Final byte is NUL: the sender shipped a terminator inside the field
    NullTerminated,
    /// Declared length exactly matches content, no terminator
    ExplicitLength,
}

impl ChatDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatDialect::Empty => "Empty",
            ChatDialect::NullTerminated => "NullTerminated",
            ChatDialect::ExplicitLength => "ExplicitLength",
        }
    }
}

/// Classify the termination style of a raw inbound payload
///
/// Pure and side-effect free; the caller emits the resulting
/// `Packet / ChatDialectInbound` record.
pub fn classify(raw: &[u8]) -> ChatDialect {
    match raw.last() {
        None => ChatDialect::Empty,
        Some(0x00) => ChatDialect::NullTerminated,
        Some(_) => ChatDialect::ExplicitLength,
    }
}

// ----------------------------------------------------------------------------
// Record Formatting Helpers
// ----------------------------------------------------------------------------

/// Ancillary framing metadata for the `ChatDialectInbound` record
///
/// `LastByte` is two uppercase hex digits, or `XX` for an empty payload.
pub fn framing_summary(raw: &[u8], reliable: bool, zerocoded: bool) -> String {
    let last_byte = match raw.last() {
        Some(b) => format!("{b:02X}"),
        None => "XX".to_string(),
    };
    format!(
        "Dialect:{}, Reliable:{}, Zerocoded:{}, RawLen:{}, LastByte:{}",
        classify(raw).as_str(),
        reliable,
        zerocoded,
        raw.len(),
        last_byte,
    )
}

/// Decode the payload for the human-readable `Chat / Heard` record,
/// dropping a trailing NUL when the dialect carries one
pub fn decode_text(raw: &[u8]) -> String {
    let content = match raw.last() {
        Some(0x00) => &raw[..raw.len() - 1],
        _ => raw,
    };
    String::from_utf8_lossy(content).into_owned()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
