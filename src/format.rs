//! Register value display formatting.
//!
//! Pure, stateless rendering of a stored 32-bit value for the host's
//! register table. Decimal shows the signed interpretation; hex and binary
//! show the raw bit pattern.

use std::str::FromStr;

use thiserror::Error;

/// How a register value is rendered.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DisplayMode {
    /// Signed decimal literal.
    #[default]
    Decimal,
    /// `0b`-prefixed unsigned bit pattern, zero-padded to at least 8 bits.
    Binary,
    /// `0x`-prefixed uppercase hex, no fixed width.
    Hex,
}

/// Display-mode name outside `decimal`/`binary`/`hex`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown display mode {0}")]
pub struct UnknownMode(pub String);

impl FromStr for DisplayMode {
    type Err = UnknownMode;

    /// Parses the host UI's mode names (`"decimal"`, `"binary"`, `"hex"`).
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "decimal" => Ok(DisplayMode::Decimal),
            "binary" => Ok(DisplayMode::Binary),
            "hex" => Ok(DisplayMode::Hex),
            _ => Err(UnknownMode(name.to_string())),
        }
    }
}

impl DisplayMode {
    /// Convenience around [`FromStr`] for callers that treat bad names as
    /// "keep the current mode".
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

/// Formats a register value in the requested mode.
///
/// The binary padding is a minimum width, not a mask: values wider than 8
/// significant bits render longer, never truncated.
pub fn format_value(value: i32, mode: DisplayMode) -> String {
    match mode {
        DisplayMode::Decimal => value.to_string(),
        DisplayMode::Binary => format!("0b{:08b}", value as u32),
        DisplayMode::Hex => format!("0x{:X}", value as u32),
    }
}
