//! Line tokenization and instruction decoding.
//!
//! Converts one line of Z16 assembly source into a decoded [`Instr`]. Uses
//! [`for_each_opcode!`](crate::for_each_opcode) to generate the `Instr`
//! payload enum and `decode_line` with per-opcode arity checks.
//!
//! # Syntax
//!
//! ```text
//! MNEMONIC operand1, operand2  # optional comment
//! ```
//!
//! - Mnemonics are case-insensitive (`ADD`, `add`)
//! - Registers are written `xN` or `0xN` with `N` in `0..=7`
//! - Immediates are signed decimal, `0x` hex, or `0b` binary literals
//! - Comments start with `#` or `;` and run to the end of the line
//! - Operands are separated by runs of spaces, tabs, and/or commas
//!
//! Blank and comment-only lines are not executable: [`executable_lines`]
//! filters them out before the engine indexes lines by PC, so branch offsets
//! always count executable instructions. The decoder only splits text and
//! checks operand shape; operand *meaning* is fixed per opcode.

use crate::errors::VmError;
use crate::for_each_opcode;
use crate::isa::Opcode;

/// Number of architectural registers.
pub(crate) const REGISTER_COUNT: u8 = 8;

/// Strips a trailing `#` or `;` comment from a line.
fn strip_comment(line: &str) -> &str {
    match line.find(|c| c == '#' || c == ';') {
        Some(i) => &line[..i],
        None => line,
    }
}

/// A token and its 1-based column in the line it was split from.
///
/// The column lets decode diagnostics point at the offending token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub column: usize,
}

/// Splits one line into tokens.
///
/// Comments are discarded first; the remainder is split on runs of spaces,
/// tabs, and commas. Blank or comment-only lines produce no tokens.
pub fn tokenize(line: &str) -> Vec<Token<'_>> {
    let body = strip_comment(line);
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in body.char_indices() {
        let separator = c == ' ' || c == '\t' || c == ',';
        match (separator, start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                tokens.push(Token {
                    text: &body[s..i],
                    column: s + 1,
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(Token {
            text: &body[s..],
            column: s + 1,
        });
    }
    tokens
}

/// Returns the executable lines of a source text, in order.
///
/// An executable line is whatever remains after comment stripping and
/// trimming, so the result is exactly the sequence the PC indexes. The
/// engine re-derives this on every step rather than caching it; editing the
/// source between steps changes future fetches.
pub fn executable_lines(source: &str) -> Vec<&str> {
    source
        .lines()
        .map(|line| strip_comment(line).trim())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Maps an executable-line index back to its 0-based raw source line.
///
/// Used by the host editor to mark the currently executing line. Returns
/// `None` when `pc` is past the last executable line.
pub fn source_line_of(source: &str, pc: usize) -> Option<usize> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| !strip_comment(line).trim().is_empty())
        .nth(pc)
        .map(|(line_no, _)| line_no)
}

/// Parses a register token, accepting both `xN` and `0xN` spellings.
pub(crate) fn parse_reg(tok: &str) -> Result<u8, VmError> {
    let digits = tok
        .strip_prefix("0x")
        .or_else(|| tok.strip_prefix('x'))
        .ok_or_else(|| VmError::ExpectedRegister {
            token: tok.to_string(),
        })?;
    match digits.parse::<u8>() {
        Ok(idx) if idx < REGISTER_COUNT => Ok(idx),
        _ => Err(VmError::InvalidRegister {
            token: tok.to_string(),
        }),
    }
}

/// Parses an immediate literal into a wrapped 32-bit value.
///
/// Accepts signed decimal plus `0x` hex and `0b` binary forms; magnitudes up
/// to `u32::MAX` wrap into the i32 bit pattern, matching the machine's
/// wrapping arithmetic.
pub(crate) fn parse_imm(tok: &str) -> Result<i32, VmError> {
    let invalid = || VmError::InvalidImmediate {
        token: tok.to_string(),
    };
    let (negative, body) = match tok.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, tok),
    };
    let magnitude = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|_| invalid())?
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        u32::from_str_radix(bin, 2).map_err(|_| invalid())?
    } else {
        body.parse::<u32>().map_err(|_| invalid())?
    };
    let value = magnitude as i32;
    Ok(if negative { value.wrapping_neg() } else { value })
}

macro_rules! define_decoder {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        /// A decoded instruction: opcode plus typed operands.
        ///
        /// Ephemeral by design; the engine recomputes this from the current
        /// source text on every step and never stores it.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Instr {
            $(
                $(#[$doc])*
                $name { $( $field: define_decoder!(@ty $kind) ),* },
            )*
        }

        impl Instr {
            /// The opcode of this instruction.
            pub fn opcode(&self) -> Opcode {
                match self {
                    $( Instr::$name { .. } => Opcode::$name, )*
                }
            }
        }

        /// Decodes one tokenized executable line into an [`Instr`].
        ///
        /// The first token must be a known mnemonic and the remaining tokens
        /// must match the opcode's operand shape exactly.
        pub fn decode_line(tokens: &[Token<'_>]) -> Result<Instr, VmError> {
            let Some(first) = tokens.first() else {
                return Err(VmError::ArityMismatch {
                    mnemonic: "<missing mnemonic>".to_string(),
                    expected: 1,
                    actual: 0,
                });
            };
            let opcode = Opcode::from_mnemonic(first.text)?;
            match opcode {
                $(
                    Opcode::$name => {
                        const EXPECTED: usize = define_decoder!(@count $( $field ),*);
                        if tokens.len() != EXPECTED + 1 {
                            return Err(VmError::ArityMismatch {
                                mnemonic: opcode.mnemonic().to_string(),
                                expected: EXPECTED,
                                actual: tokens.len() - 1,
                            });
                        }
                        let mut operands = tokens.iter().skip(1);
                        Ok(Instr::$name {
                            $(
                                $field: define_decoder!(
                                    @parse $kind, operands.next().unwrap().text
                                )?,
                            )*
                        })
                    }
                )*
            }
        }
    };

    // ---------- operand types ----------
    (@ty Reg) => { u8 };
    (@ty Imm) => { i32 };

    // ---------- counting ----------
    (@count $( $x:ident ),* ) => {
        <[()]>::len(&[ $( define_decoder!(@unit $x) ),* ])
    };

    (@unit $x:ident) => { () };

    // ---------- operand parsing ----------
    (@parse Reg, $tok:expr) => { parse_reg($tok) };
    (@parse Imm, $tok:expr) => { parse_imm($tok) };
}

for_each_opcode!(define_decoder);
