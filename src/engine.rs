//! Machine state and per-opcode execution.
//!
//! The engine owns a [`MachineState`] and executes one instruction per
//! [`Engine::step`] call, re-deriving the executable-line list from the
//! current source text on every step. All arithmetic is wrapping 32-bit;
//! branch and jump offsets are counted in executable-instruction units.
//!
//! Decode failures are reported without touching machine state, so the
//! engine stays usable after the host fixes the offending line.

use std::fmt::Write;

use crate::decoder::{self, Instr, Token};
use crate::errors::VmError;
use crate::output::TrapSink;

/// Number of architectural registers.
pub const REG_COUNT: usize = 8;

/// Register written with the return address by `JAL`/`JALR`.
pub const LINK_REG: usize = 7;

/// Snapshot of the register file and program counter.
///
/// `pc` indexes the executable-line sequence, never raw source lines or
/// bytes. The caller stops stepping once `pc` reaches the executable-line
/// count; the engine itself enforces only `pc >= 0`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MachineState {
    /// 32-bit two's-complement register values, `x0`..`x7`.
    pub registers: [i32; REG_COUNT],
    /// Index of the next executable line.
    pub pc: usize,
}

/// The Z16 execution engine.
///
/// Single-threaded and synchronous; every operation completes in bounded
/// time (one instruction). The trap log is host-owned and passed in per
/// call, so `reset` never clears it.
#[derive(Debug, Default)]
pub struct Engine {
    state: MachineState,
}

impl Engine {
    /// Creates an engine with all registers zero and `pc = 0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only snapshot of the current machine state.
    pub fn state(&self) -> MachineState {
        self.state
    }

    /// Zeroes all registers and resets the PC.
    pub fn reset(&mut self) {
        self.state = MachineState::default();
    }

    /// Maps the current PC to its 0-based raw source line, for the host
    /// editor's current-line marker.
    pub fn current_line(&self, source: &str) -> Option<usize> {
        decoder::source_line_of(source, self.state.pc)
    }

    /// Executes the instruction at `pc` and returns the updated state.
    ///
    /// The executable-line list is re-derived from `source` on every call;
    /// edits between steps take effect on the next fetch. Stepping past the
    /// last executable line is a no-op, not an error. On a decode or
    /// unknown-opcode error the state is left unchanged.
    pub fn step<S: TrapSink>(
        &mut self,
        source: &str,
        sink: &mut S,
    ) -> Result<MachineState, VmError> {
        let lines = decoder::executable_lines(source);
        let Some(line) = lines.get(self.state.pc) else {
            return Ok(self.state);
        };
        let tokens = decoder::tokenize(line);
        let instr = match decoder::decode_line(&tokens) {
            Ok(instr) => instr,
            Err(err) => {
                crate::error!(
                    "{}",
                    render_diagnostic(self.current_line(source), line, &tokens, &err)
                );
                return Err(err);
            }
        };
        crate::info!(
            "executing {} at pc {}",
            instr.opcode().mnemonic(),
            self.state.pc
        );
        self.exec(instr, sink);
        Ok(self.state)
    }

    /// Resets the machine, then executes exactly one instruction.
    ///
    /// This matches the product's "Run" action, which does not loop to
    /// completion; continuous execution would be a separate operation.
    pub fn run_from_start<S: TrapSink>(
        &mut self,
        source: &str,
        sink: &mut S,
    ) -> Result<MachineState, VmError> {
        self.reset();
        self.step(source, sink)
    }

    /// Executes one decoded instruction.
    ///
    /// Infallible: register indices and immediates were validated during
    /// decoding, so execution can only mutate state and emit traps.
    fn exec<S: TrapSink>(&mut self, instr: Instr, sink: &mut S) {
        match instr {
            // Register-register ALU
            Instr::Add { rd, rs } => self.alu_rr(rd, rs, i32::wrapping_add),
            Instr::Sub { rd, rs } => self.alu_rr(rd, rs, i32::wrapping_sub),
            Instr::And { rd, rs } => self.alu_rr(rd, rs, |a, b| a & b),
            Instr::Or { rd, rs } => self.alu_rr(rd, rs, |a, b| a | b),
            Instr::Xor { rd, rs } => self.alu_rr(rd, rs, |a, b| a ^ b),
            Instr::Slt { rd, rs } => self.alu_rr(rd, rs, |a, b| (a < b) as i32),
            Instr::Sltu { rd, rs } => self.alu_rr(rd, rs, |a, b| ((a as u32) < b as u32) as i32),
            Instr::Sll { rd, rs } => self.alu_rr(rd, rs, shift_left),
            Instr::Srl { rd, rs } => self.alu_rr(rd, rs, shift_right_logical),
            Instr::Sra { rd, rs } => self.alu_rr(rd, rs, shift_right_arithmetic),
            Instr::Mv { rd, rs } => {
                self.set_reg(rd, self.reg(rs));
                self.advance();
            }
            // Register-immediate ALU
            Instr::Addi { rd, imm } => self.alu_ri(rd, imm, i32::wrapping_add),
            Instr::Andi { rd, imm } => self.alu_ri(rd, imm, |a, b| a & b),
            Instr::Ori { rd, imm } => self.alu_ri(rd, imm, |a, b| a | b),
            Instr::Xori { rd, imm } => self.alu_ri(rd, imm, |a, b| a ^ b),
            Instr::Slti { rd, imm } => self.alu_ri(rd, imm, |a, b| (a < b) as i32),
            Instr::Sltui { rd, imm } => self.alu_ri(rd, imm, |a, b| ((a as u32) < b as u32) as i32),
            Instr::Slli { rd, imm } => self.alu_ri(rd, imm, shift_left),
            Instr::Srli { rd, imm } => self.alu_ri(rd, imm, shift_right_logical),
            Instr::Srai { rd, imm } => self.alu_ri(rd, imm, shift_right_arithmetic),
            // Immediate loads
            Instr::Li { rd, imm } => {
                self.set_reg(rd, imm);
                self.advance();
            }
            Instr::Lui { rd, imm } => {
                self.set_reg(rd, imm.wrapping_shl(12));
                self.advance();
            }
            Instr::Auipc { rd, imm } => {
                let value = (self.state.pc as i32).wrapping_add(imm.wrapping_shl(12));
                self.set_reg(rd, value);
                self.advance();
            }
            // Conditional branches
            Instr::Beq { rd, rs, imm } => self.branch(self.reg(rd) == self.reg(rs), imm),
            Instr::Bne { rd, rs, imm } => self.branch(self.reg(rd) != self.reg(rs), imm),
            Instr::Blt { rd, rs, imm } => self.branch(self.reg(rd) < self.reg(rs), imm),
            Instr::Bge { rd, rs, imm } => self.branch(self.reg(rd) >= self.reg(rs), imm),
            Instr::Bltu { rd, rs, imm } => {
                self.branch((self.reg(rd) as u32) < self.reg(rs) as u32, imm)
            }
            Instr::Bgeu { rd, rs, imm } => {
                self.branch(self.reg(rd) as u32 >= self.reg(rs) as u32, imm)
            }
            Instr::Bz { rd, imm } => self.branch(self.reg(rd) == 0, imm),
            Instr::Bnz { rd, imm } => self.branch(self.reg(rd) != 0, imm),
            // Jumps
            Instr::J { imm } => self.jump_relative(imm),
            Instr::Jal { imm } => {
                self.set_reg(LINK_REG as u8, (self.state.pc as i32).wrapping_add(1));
                self.jump_relative(imm);
            }
            Instr::Jalr { rd, rs } => {
                let target = self.reg(rs);
                self.set_reg(rd, (self.state.pc as i32).wrapping_add(1));
                self.jump_absolute(target);
            }
            Instr::Jr { rs } => self.jump_absolute(self.reg(rs)),
            // Trap
            Instr::Ecall { rd } => {
                sink.emit(format!(
                    "ECALL at PC {}: x{} = {}",
                    self.state.pc,
                    rd,
                    self.reg(rd)
                ));
                self.advance();
            }
        }
    }

    fn reg(&self, idx: u8) -> i32 {
        self.state.registers[idx as usize]
    }

    fn set_reg(&mut self, idx: u8, value: i32) {
        self.state.registers[idx as usize] = value;
    }

    /// Default PC increment for non-branching instructions.
    fn advance(&mut self) {
        self.state.pc += 1;
    }

    fn alu_rr(&mut self, rd: u8, rs: u8, op: impl Fn(i32, i32) -> i32) {
        self.set_reg(rd, op(self.reg(rd), self.reg(rs)));
        self.advance();
    }

    fn alu_ri(&mut self, rd: u8, imm: i32, op: impl Fn(i32, i32) -> i32) {
        self.set_reg(rd, op(self.reg(rd), imm));
        self.advance();
    }

    /// Taken branches move the PC by the offset instead of the default
    /// increment; they are never double-incremented.
    fn branch(&mut self, taken: bool, offset: i32) {
        if taken {
            self.jump_relative(offset);
        } else {
            self.advance();
        }
    }

    fn jump_relative(&mut self, offset: i32) {
        let target = self.state.pc as i64 + offset as i64;
        // pc >= 0 invariant: backward overshoot clamps to the first line
        if target < 0 {
            crate::warn!("jump target {target} clamped to 0");
        }
        self.state.pc = target.max(0) as usize;
    }

    fn jump_absolute(&mut self, target: i32) {
        if target < 0 {
            crate::warn!("jump target {target} clamped to 0");
        }
        self.state.pc = i64::from(target).max(0) as usize;
    }
}

/// Logical left shift on the 32-bit pattern; amount taken mod 32.
fn shift_left(value: i32, amount: i32) -> i32 {
    (value as u32).wrapping_shl(amount as u32) as i32
}

/// Logical right shift (zero-filling).
fn shift_right_logical(value: i32, amount: i32) -> i32 {
    (value as u32).wrapping_shr(amount as u32) as i32
}

/// Arithmetic right shift (sign-preserving).
fn shift_right_arithmetic(value: i32, amount: i32) -> i32 {
    value.wrapping_shr(amount as u32)
}

/// Formats a compiler-style diagnostic for a decode failure, with a caret
/// under the offending token when it can be located in the line.
fn render_diagnostic(
    line_no: Option<usize>,
    line: &str,
    tokens: &[Token<'_>],
    err: &VmError,
) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {err}");
    match line_no {
        Some(n) => {
            let n = n + 1;
            let _ = writeln!(diag, " --> line {n}");
            let _ = writeln!(diag, "    |");
            let _ = writeln!(diag, "{n:>3} | {line}");
            // arity errors carry the canonical mnemonic, hence the
            // case-insensitive match
            let offending = tokens
                .iter()
                .find(|tok| tok.text.eq_ignore_ascii_case(err.token()));
            match offending {
                Some(tok) => {
                    let _ = write!(
                        diag,
                        "    | {}{}",
                        " ".repeat(tok.column - 1),
                        "^".repeat(tok.text.len())
                    );
                }
                None => {
                    let _ = write!(diag, "    |");
                }
            }
        }
        None => {
            let _ = write!(diag, " --> {line}");
        }
    }
    diag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputLog;

    fn step_n(source: &str, steps: usize) -> (Engine, OutputLog) {
        let mut engine = Engine::new();
        let mut log = OutputLog::new();
        for _ in 0..steps {
            engine.step(source, &mut log).expect("step failed");
        }
        (engine, log)
    }

    fn regs_after(source: &str, steps: usize) -> [i32; REG_COUNT] {
        step_n(source, steps).0.state().registers
    }

    fn pc_after(source: &str, steps: usize) -> usize {
        step_n(source, steps).0.state().pc
    }

    // ==================== ALU ====================

    #[test]
    fn add_and_increment() {
        let regs = regs_after("LI x0, 3\nLI x1, 4\nADD x0, x1", 3);
        assert_eq!(regs[0], 7);
        assert_eq!(pc_after("LI x0, 3\nLI x1, 4\nADD x0, x1", 3), 3);
    }

    #[test]
    fn add_wraps_mod_2_32() {
        let regs = regs_after("LI x0, 0x7FFFFFFF\nLI x1, 1\nADD x0, x1", 3);
        assert_eq!(regs[0], i32::MIN);
    }

    #[test]
    fn sub_wraps() {
        let regs = regs_after("LI x1, 1\nSUB x0, x1", 2);
        assert_eq!(regs[0], -1);
    }

    #[test]
    fn bitwise_ops() {
        let regs = regs_after(
            "LI x0, 0b1100\nLI x1, 0b1010\nMV x2, x0\nAND x2, x1\nMV x3, x0\nOR x3, x1\nXOR x0, x1",
            7,
        );
        assert_eq!(regs[2], 0b1000);
        assert_eq!(regs[3], 0b1110);
        assert_eq!(regs[0], 0b0110);
    }

    #[test]
    fn mv_copies() {
        let regs = regs_after("LI x3, 9\nMV x5, x3", 2);
        assert_eq!(regs[5], 9);
        assert_eq!(regs[3], 9);
    }

    #[test]
    fn immediate_alu_forms() {
        let regs = regs_after("LI x0, 10\nADDI x0, -3\nLI x1, 0b1111\nANDI x1, 0b0101", 4);
        assert_eq!(regs[0], 7);
        assert_eq!(regs[1], 0b0101);
    }

    #[test]
    fn addi_wraps() {
        let regs = regs_after("LI x0, 0x7FFFFFFF\nADDI x0, 1", 2);
        assert_eq!(regs[0], i32::MIN);
    }

    // ==================== Shifts ====================

    #[test]
    fn shift_left_logical() {
        let regs = regs_after("LI x0, 1\nLI x1, 4\nSLL x0, x1", 3);
        assert_eq!(regs[0], 16);
    }

    #[test]
    fn shift_right_logical_vs_arithmetic() {
        let regs = regs_after(
            "LI x0, -8\nLI x1, -8\nLI x2, 1\nSRL x0, x2\nSRA x1, x2",
            5,
        );
        assert_eq!(regs[0], ((-8i32 as u32) >> 1) as i32); // zero-filled
        assert_eq!(regs[1], -4); // sign-preserved
    }

    #[test]
    fn shift_amount_masked_to_five_bits() {
        // 33 mod 32 = 1
        let regs = regs_after("LI x0, 2\nLI x1, 33\nSLL x0, x1", 3);
        assert_eq!(regs[0], 4);
    }

    #[test]
    fn immediate_shifts() {
        let regs = regs_after("LI x0, 1\nSLLI x0, 8\nLI x1, -16\nSRAI x1, 2", 4);
        assert_eq!(regs[0], 256);
        assert_eq!(regs[1], -4);
    }

    // ==================== Signed vs unsigned ====================

    #[test]
    fn slt_and_sltu_disagree_on_all_ones() {
        // build 0xFFFFFFFF from LUI + ORI, compare against 1 both ways
        let source = "LUI x0, 0xFFFFF\n\
                      ORI x0, 0xFFF\n\
                      LI x1, 1\n\
                      MV x2, x0\n\
                      SLT x2, x1\n\
                      MV x3, x0\n\
                      SLTU x3, x1";
        let regs = regs_after(source, 7);
        assert_eq!(regs[0], -1); // bit pattern 0xFFFFFFFF
        assert_eq!(regs[2], 1); // -1 < 1 signed
        assert_eq!(regs[3], 0); // 0xFFFFFFFF > 1 unsigned
    }

    #[test]
    fn slti_and_sltui_disagree_on_all_ones() {
        let regs = regs_after("LI x0, -1\nSLTI x0, 1\nLI x1, -1\nSLTUI x1, 1", 4);
        assert_eq!(regs[0], 1);
        assert_eq!(regs[1], 0);
    }

    #[test]
    fn blt_and_bltu_disagree_on_all_ones() {
        // signed: -1 < 1, branch taken, skips the poison line
        let signed = "LI x0, -1\nLI x1, 1\nBLT x0, x1, 2\nLI x2, 99\nLI x3, 1";
        let regs = regs_after(signed, 4);
        assert_eq!(regs[2], 0);
        assert_eq!(regs[3], 1);

        // unsigned: 0xFFFFFFFF > 1, falls through into the poison line
        let unsigned = "LI x0, -1\nLI x1, 1\nBLTU x0, x1, 2\nLI x2, 99\nLI x3, 1";
        let regs = regs_after(unsigned, 4);
        assert_eq!(regs[2], 99);
    }

    #[test]
    fn bgeu_treats_all_ones_as_large() {
        let source = "LI x0, -1\nLI x1, 1\nBGEU x0, x1, 2\nLI x2, 99\nLI x3, 1";
        let regs = regs_after(source, 4);
        assert_eq!(regs[2], 0);
        assert_eq!(regs[3], 1);
    }

    // ==================== Loads ====================

    #[test]
    fn li_lui_auipc() {
        let regs = regs_after("LI x0, -42\nLUI x1, 3\nAUIPC x2, 1", 3);
        assert_eq!(regs[0], -42);
        assert_eq!(regs[1], 3 << 12);
        assert_eq!(regs[2], 2 + (1 << 12)); // pc was 2
    }

    #[test]
    fn lui_wraps_high_bits() {
        let regs = regs_after("LUI x0, 0xFFFFF", 1);
        assert_eq!(regs[0], 0xFFFFF000u32 as i32);
    }

    // ==================== Branches ====================

    #[test]
    fn branch_not_taken_increments_and_touches_nothing() {
        let source = "LI x0, 5\nLI x4, 2\nBEQ x0, x4, 2";
        let (engine, _) = step_n(source, 3);
        let state = engine.state();
        assert_eq!(state.pc, 3);
        assert_eq!(state.registers, [5, 0, 0, 0, 2, 0, 0, 0]);
    }

    #[test]
    fn branch_taken_moves_pc_by_offset() {
        let source = "LI x0, 2\nLI x4, 2\nBEQ x0, x4, 3";
        assert_eq!(pc_after(source, 3), 5);
    }

    #[test]
    fn branch_backward() {
        let source = "LI x0, 1\nADDI x0, 1\nBNZ x0, -1";
        // pc: 0 -> 1 -> 2 -> 1 (branch back to the ADDI)
        assert_eq!(pc_after(source, 3), 1);
        assert_eq!(regs_after(source, 4)[0], 3);
    }

    #[test]
    fn branch_backward_overshoot_clamps_to_zero() {
        let source = "LI x0, 1\nBNZ x0, -5";
        assert_eq!(pc_after(source, 2), 0);
    }

    #[test]
    fn bz_and_bnz() {
        assert_eq!(pc_after("BZ x0, 3", 1), 3); // x0 starts at zero
        assert_eq!(pc_after("LI x0, 1\nBZ x0, 3", 2), 2); // falls through
        assert_eq!(pc_after("LI x0, 1\nBNZ x0, 3", 2), 4);
    }

    #[test]
    fn branch_skips_poison_lines() {
        // taken branch skips one LI, the jump skips the other
        let source = "LI x0, 5\n\
                      LI x4, 2\n\
                      BNE x0, x4, 2\n\
                      LI x5, 100\n\
                      J 2\n\
                      LI x5, 200\n\
                      LI x3, 1";
        let (engine, _) = step_n(source, 5);
        let state = engine.state();
        assert_eq!(state.registers[5], 0);
        assert_eq!(state.registers[3], 1);
        assert_eq!(state.pc, 7);
    }

    #[test]
    fn beq_not_taken_falls_through_to_next_line() {
        let source = "LI x0, 5\nLI x4, 2\nBEQ x0, x4, 2\nLI x5, 100";
        assert_eq!(regs_after(source, 4)[5], 100);
    }

    // ==================== Jumps ====================

    #[test]
    fn jump_is_relative() {
        assert_eq!(pc_after("J 3", 1), 3);
        assert_eq!(pc_after("LI x0, 1\nJ 2", 2), 3);
    }

    #[test]
    fn jal_writes_link_register() {
        let (engine, _) = step_n("LI x0, 1\nJAL 2", 2);
        let state = engine.state();
        assert_eq!(state.registers[LINK_REG], 2); // pc was 1
        assert_eq!(state.pc, 3);
    }

    #[test]
    fn jal_then_jalr_returns_past_call_site() {
        // call/return round trip: pc ends at original_pc + 1
        let source = "JAL 2\n\
                      LI x0, 1\n\
                      JALR x6, x7";
        let (engine, _) = step_n(source, 2);
        let state = engine.state();
        assert_eq!(state.pc, 1);
        assert_eq!(state.registers[LINK_REG], 1);
        assert_eq!(state.registers[6], 3); // link written by JALR
    }

    #[test]
    fn jr_jumps_to_register_value() {
        let source = "LI x1, 3\nJR x1\nLI x0, 99\nLI x2, 7";
        let regs = regs_after(source, 3);
        assert_eq!(regs[0], 0);
        assert_eq!(regs[2], 7);
    }

    // ==================== Trap ====================

    #[test]
    fn ecall_emits_one_message_and_increments() {
        let source = "LI x2, 15\nECALL x2";
        let (engine, log) = step_n(source, 2);
        assert_eq!(log.messages(), ["ECALL at PC 1: x2 = 15"]);
        assert_eq!(engine.state().pc, 2);
    }

    #[test]
    fn ecall_emits_per_invocation() {
        let source = "LI x0, -1\nECALL x0\nECALL x0";
        let (_, log) = step_n(source, 3);
        assert_eq!(log.messages().len(), 2);
        assert!(log.messages()[0].contains("-1"));
    }

    // ==================== Worked programs ====================

    #[test]
    fn accumulate_scenario() {
        let source = "LI 0x0,5\nLI 0x1,10\nADD 0x2,0x0\nADD 0x2,0x1";
        let (engine, _) = step_n(source, 4);
        let state = engine.state();
        assert_eq!(state.registers, [5, 10, 15, 0, 0, 0, 0, 0]);
        assert_eq!(state.pc, 4);
    }

    // ==================== Lifecycle ====================

    #[test]
    fn step_past_end_is_noop() {
        let source = "LI x0, 1";
        let mut engine = Engine::new();
        let mut log = OutputLog::new();
        engine.step(source, &mut log).unwrap();
        let before = engine.state();
        let after = engine.step(source, &mut log).unwrap();
        assert_eq!(before, after);
        assert_eq!(after.pc, 1);
    }

    #[test]
    fn step_on_empty_source_is_noop() {
        let mut engine = Engine::new();
        let mut log = OutputLog::new();
        let state = engine.step("# only comments\n\n", &mut log).unwrap();
        assert_eq!(state, MachineState::default());
    }

    #[test]
    fn reset_is_idempotent() {
        let source = "LI x0, 5\nLI x1, 10\nADD x2, x0";
        let mut engine = Engine::new();
        let mut log = OutputLog::new();
        engine.reset();
        for _ in 0..3 {
            engine.step(source, &mut log).unwrap();
        }
        assert_ne!(engine.state(), MachineState::default());
        engine.reset();
        assert_eq!(engine.state(), MachineState::default());
    }

    #[test]
    fn reset_does_not_clear_host_log() {
        let mut engine = Engine::new();
        let mut log = OutputLog::new();
        engine.step("ECALL x0", &mut log).unwrap();
        engine.reset();
        assert_eq!(log.messages().len(), 1);
    }

    #[test]
    fn run_from_start_executes_exactly_one_instruction() {
        let source = "LI x0, 1\nLI x1, 2";
        let mut engine = Engine::new();
        let mut log = OutputLog::new();
        engine.step(source, &mut log).unwrap();
        engine.step(source, &mut log).unwrap();

        let state = engine.run_from_start(source, &mut log).unwrap();
        assert_eq!(state.pc, 1);
        assert_eq!(state.registers, [1, 0, 0, 0, 0, 0, 0, 0]);
    }

    // ==================== Errors ====================

    #[test]
    fn decode_error_leaves_state_unchanged() {
        let source = "LI x0, 5\nBOGUS x1";
        let mut engine = Engine::new();
        let mut log = OutputLog::new();
        engine.step(source, &mut log).unwrap();
        let before = engine.state();

        let err = engine.step(source, &mut log).unwrap_err();
        assert!(matches!(err, VmError::UnknownOpcode { .. }));
        assert_eq!(engine.state(), before);

        // repeated evaluation reproduces the same error
        assert_eq!(engine.step(source, &mut log).unwrap_err(), err);
    }

    #[test]
    fn engine_usable_after_fixing_source() {
        let broken = "ADD x0";
        let mut engine = Engine::new();
        let mut log = OutputLog::new();
        assert!(matches!(
            engine.step(broken, &mut log),
            Err(VmError::ArityMismatch { .. })
        ));

        let fixed = "LI x0, 7";
        let state = engine.step(fixed, &mut log).unwrap();
        assert_eq!(state.registers[0], 7);
        assert_eq!(state.pc, 1);
    }

    #[test]
    fn diagnostic_carets_the_offending_token() {
        let line = "LI x9, 1";
        let tokens = decoder::tokenize(line);
        let err = decoder::decode_line(&tokens).unwrap_err();
        let diag = render_diagnostic(Some(1), line, &tokens, &err);

        let mut lines = diag.lines();
        assert_eq!(lines.next(), Some("error: invalid register x9"));
        assert_eq!(lines.next(), Some(" --> line 2"));
        let code_line = diag.lines().nth(3).unwrap();
        let caret_line = diag.lines().nth(4).unwrap();
        assert!(code_line.ends_with("LI x9, 1"));
        // caret column lines up with the bad token
        assert_eq!(caret_line.find("^^"), code_line.find("x9"));
    }

    #[test]
    fn diagnostic_carets_mnemonic_on_arity_error() {
        let line = "add x1";
        let tokens = decoder::tokenize(line);
        let err = decoder::decode_line(&tokens).unwrap_err();
        let diag = render_diagnostic(Some(0), line, &tokens, &err);

        let code_line = diag.lines().nth(3).unwrap();
        let caret_line = diag.lines().nth(4).unwrap();
        assert_eq!(caret_line.find("^^^"), code_line.find("add"));
    }

    #[test]
    fn malformed_operand_is_error_without_side_effects() {
        let mut engine = Engine::new();
        let mut log = OutputLog::new();
        assert!(matches!(
            engine.step("LI x9, 1", &mut log),
            Err(VmError::InvalidRegister { .. })
        ));
        assert_eq!(engine.state(), MachineState::default());
    }

    // ==================== Live edit ====================

    #[test]
    fn editing_source_between_steps_changes_fetch() {
        let mut engine = Engine::new();
        let mut log = OutputLog::new();
        engine.step("LI x0, 1\nLI x1, 2", &mut log).unwrap();
        // the line at pc 1 is different now; the engine re-derives the
        // listing instead of using a frozen copy
        let state = engine.step("LI x0, 1\nLI x1, 42", &mut log).unwrap();
        assert_eq!(state.registers[1], 42);
    }

    #[test]
    fn current_line_tracks_pc_through_comments() {
        let source = "# setup\nLI x0, 1\n\nLI x1, 2";
        let mut engine = Engine::new();
        let mut log = OutputLog::new();
        assert_eq!(engine.current_line(source), Some(1));
        engine.step(source, &mut log).unwrap();
        assert_eq!(engine.current_line(source), Some(3));
        engine.step(source, &mut log).unwrap();
        assert_eq!(engine.current_line(source), None);
    }
}
