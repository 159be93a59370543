//! Instruction Set Architecture (ISA) definitions.
//!
//! Defines the Z16 instruction set. The [`for_each_opcode!`](crate::for_each_opcode)
//! macro holds the canonical opcode table and invokes a callback macro for
//! code generation, so multiple modules can generate instruction-related code
//! without duplicating the definitions.
//!
//! This module generates:
//! - The [`Opcode`] enum with mnemonic mappings
//! - [`Opcode::from_mnemonic`] for case-insensitive lookup
//!
//! See [`decoder`](super::decoder) for the decoding side (the [`Instr`]
//! payload enum and per-opcode operand parsing).
//!
//! [`Instr`]: super::decoder::Instr

use crate::errors::VmError;

/// Invokes a callback macro with the complete opcode table.
///
/// Each entry is `Variant = "MNEMONIC" => [field: Kind, ...]` where `Kind`
/// is `Reg` (register index) or `Imm` (signed 32-bit immediate). Two-operand
/// ALU forms use the destination as the first source (`rd ← rd OP rs`).
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Register-register ALU
            // =========================
            /// ADD rd, rs ; rd = rd + rs (wrapping)
            Add = "ADD" => [rd: Reg, rs: Reg],
            /// SUB rd, rs ; rd = rd - rs (wrapping)
            Sub = "SUB" => [rd: Reg, rs: Reg],
            /// AND rd, rs ; rd = rd & rs
            And = "AND" => [rd: Reg, rs: Reg],
            /// OR rd, rs ; rd = rd | rs
            Or = "OR" => [rd: Reg, rs: Reg],
            /// XOR rd, rs ; rd = rd ^ rs
            Xor = "XOR" => [rd: Reg, rs: Reg],
            /// SLT rd, rs ; rd = (rd < rs) signed, 0 or 1
            Slt = "SLT" => [rd: Reg, rs: Reg],
            /// SLTU rd, rs ; rd = (rd < rs) unsigned, 0 or 1
            Sltu = "SLTU" => [rd: Reg, rs: Reg],
            /// SLL rd, rs ; rd = rd << rs (logical)
            Sll = "SLL" => [rd: Reg, rs: Reg],
            /// SRL rd, rs ; rd = rd >> rs (logical)
            Srl = "SRL" => [rd: Reg, rs: Reg],
            /// SRA rd, rs ; rd = rd >> rs (arithmetic, sign-preserving)
            Sra = "SRA" => [rd: Reg, rs: Reg],
            /// MV rd, rs ; rd = rs
            Mv = "MV" => [rd: Reg, rs: Reg],
            // =========================
            // Register-immediate ALU
            // =========================
            /// ADDI rd, imm ; rd = rd + imm (wrapping)
            Addi = "ADDI" => [rd: Reg, imm: Imm],
            /// ANDI rd, imm ; rd = rd & imm
            Andi = "ANDI" => [rd: Reg, imm: Imm],
            /// ORI rd, imm ; rd = rd | imm
            Ori = "ORI" => [rd: Reg, imm: Imm],
            /// XORI rd, imm ; rd = rd ^ imm
            Xori = "XORI" => [rd: Reg, imm: Imm],
            /// SLTI rd, imm ; rd = (rd < imm) signed, 0 or 1
            Slti = "SLTI" => [rd: Reg, imm: Imm],
            /// SLTUI rd, imm ; rd = (rd < imm) unsigned, 0 or 1
            Sltui = "SLTUI" => [rd: Reg, imm: Imm],
            /// SLLI rd, imm ; rd = rd << imm (logical)
            Slli = "SLLI" => [rd: Reg, imm: Imm],
            /// SRLI rd, imm ; rd = rd >> imm (logical)
            Srli = "SRLI" => [rd: Reg, imm: Imm],
            /// SRAI rd, imm ; rd = rd >> imm (arithmetic)
            Srai = "SRAI" => [rd: Reg, imm: Imm],
            // =========================
            // Immediate loads
            // =========================
            /// LI rd, imm ; rd = imm
            Li = "LI" => [rd: Reg, imm: Imm],
            /// LUI rd, imm ; rd = imm << 12
            Lui = "LUI" => [rd: Reg, imm: Imm],
            /// AUIPC rd, imm ; rd = pc + (imm << 12) (wrapping)
            Auipc = "AUIPC" => [rd: Reg, imm: Imm],
            // =========================
            // Conditional branches
            // =========================
            /// BEQ rd, rs, imm ; if rd == rs then pc += imm
            Beq = "BEQ" => [rd: Reg, rs: Reg, imm: Imm],
            /// BNE rd, rs, imm ; if rd != rs then pc += imm
            Bne = "BNE" => [rd: Reg, rs: Reg, imm: Imm],
            /// BLT rd, rs, imm ; if rd < rs (signed) then pc += imm
            Blt = "BLT" => [rd: Reg, rs: Reg, imm: Imm],
            /// BGE rd, rs, imm ; if rd >= rs (signed) then pc += imm
            Bge = "BGE" => [rd: Reg, rs: Reg, imm: Imm],
            /// BLTU rd, rs, imm ; if rd < rs (unsigned) then pc += imm
            Bltu = "BLTU" => [rd: Reg, rs: Reg, imm: Imm],
            /// BGEU rd, rs, imm ; if rd >= rs (unsigned) then pc += imm
            Bgeu = "BGEU" => [rd: Reg, rs: Reg, imm: Imm],
            /// BZ rd, imm ; if rd == 0 then pc += imm
            Bz = "BZ" => [rd: Reg, imm: Imm],
            /// BNZ rd, imm ; if rd != 0 then pc += imm
            Bnz = "BNZ" => [rd: Reg, imm: Imm],
            // =========================
            // Jumps
            // =========================
            /// J imm ; pc += imm
            J = "J" => [imm: Imm],
            /// JAL imm ; x7 = pc + 1, pc += imm
            Jal = "JAL" => [imm: Imm],
            /// JALR rd, rs ; rd = pc + 1, pc = rs
            Jalr = "JALR" => [rd: Reg, rs: Reg],
            /// JR rs ; pc = rs
            Jr = "JR" => [rs: Reg],
            // =========================
            // Trap
            // =========================
            /// ECALL rd ; emit the value of rd to the trap log
            Ecall = "ECALL" => [rd: Reg],
        }
    };
}

macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        /// A Z16 opcode, one variant per mnemonic in the opcode table.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name,
            )*
        }

        impl Opcode {
            /// Returns the canonical (uppercase) assembly mnemonic.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Number of operand tokens this opcode expects after the mnemonic.
            pub const fn operand_count(&self) -> usize {
                match self {
                    $( Opcode::$name => define_opcodes!(@count $( $field ),*), )*
                }
            }

            /// Looks up an opcode by mnemonic, case-insensitively.
            ///
            /// Returns [`VmError::UnknownOpcode`] for mnemonics outside the table.
            pub fn from_mnemonic(name: &str) -> Result<Self, VmError> {
                match name.to_ascii_uppercase().as_str() {
                    $( $mnemonic => Ok(Opcode::$name), )*
                    _ => Err(VmError::UnknownOpcode {
                        mnemonic: name.to_string(),
                    }),
                }
            }
        }
    };

    // ---------- counting ----------
    (@count $( $x:ident ),* ) => {
        <[()]>::len(&[ $( define_opcodes!(@unit $x) ),* ])
    };

    (@unit $x:ident) => { () };
}

for_each_opcode!(define_opcodes);
