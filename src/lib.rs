//! Z16 assembly simulator.
//!
//! Executes Z16 assembly source text against an in-memory machine state
//! (eight 32-bit registers plus a program counter). Source is re-parsed on
//! every step, so the host editor can change the program mid-session and the
//! next fetch sees the new text.
//!
//! # Architecture
//!
//! - **Registers**: 8 registers holding 32-bit two's-complement values;
//!   `x7` is the link register written by `JAL`/`JALR`
//! - **Program counter**: an index into the executable-line sequence
//!   (blank and comment lines are filtered out before indexing)
//! - **Execution model**: one instruction per `step` call; arithmetic wraps,
//!   branches and jumps move the PC in executable-instruction units
//! - **Traps**: `ECALL` emits a message to a host-owned [`output::TrapSink`]
//!
//! # Modules
//!
//! - [`decoder`]: Line tokenization, operand parsing, and instruction decoding
//! - [`engine`]: Machine state and per-opcode execution
//! - [`errors`]: Decode and unknown-opcode error types
//! - [`format`]: Register value display formatting
//! - [`isa`]: Instruction set definition and mnemonic mappings
//! - [`log`]: Leveled stderr logging for decode diagnostics
//! - [`output`]: Trap output sink trait and append-only log

pub mod decoder;
pub mod engine;
pub mod errors;
pub mod format;
pub mod isa;
pub mod log;
pub mod output;

pub use decoder::{Instr, Token};
pub use engine::{Engine, MachineState, LINK_REG, REG_COUNT};
pub use errors::VmError;
pub use format::{format_value, DisplayMode, UnknownMode};
pub use isa::Opcode;
pub use output::{OutputLog, TrapSink};
