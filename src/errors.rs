//! Decode and unknown-opcode error types.
//!
//! Every error is local to a single `step` call, deterministic for a given
//! source line, and leaves machine state untouched; the engine stays usable
//! after any of them.

use thiserror::Error;

/// Errors surfaced when decoding an executable line.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VmError {
    /// Mnemonic not present in the opcode table.
    #[error("unknown opcode {mnemonic}")]
    UnknownOpcode { mnemonic: String },
    /// Wrong number of operands for the opcode.
    #[error("{mnemonic} expects {expected} operand(s), got {actual}")]
    ArityMismatch {
        mnemonic: String,
        expected: usize,
        actual: usize,
    },
    /// Expected a register operand (`xN` or `0xN`) but got something else.
    #[error("expected register, got {token}")]
    ExpectedRegister { token: String },
    /// Register index out of range (only `x0`..`x7` exist).
    #[error("invalid register {token}")]
    InvalidRegister { token: String },
    /// Immediate operand is not a valid 32-bit integer literal.
    #[error("invalid immediate {token}")]
    InvalidImmediate { token: String },
}

impl VmError {
    /// `true` for malformed-line errors, `false` for unknown mnemonics.
    pub fn is_decode(&self) -> bool {
        !matches!(self, VmError::UnknownOpcode { .. })
    }

    /// The source token the error refers to.
    ///
    /// For arity errors this is the mnemonic in canonical (uppercase) form,
    /// so callers matching against source text must compare
    /// case-insensitively.
    pub fn token(&self) -> &str {
        match self {
            VmError::UnknownOpcode { mnemonic } | VmError::ArityMismatch { mnemonic, .. } => {
                mnemonic
            }
            VmError::ExpectedRegister { token }
            | VmError::InvalidRegister { token }
            | VmError::InvalidImmediate { token } => token,
        }
    }
}
