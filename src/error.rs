//! Error taxonomy (spec §7).
//!
//! There are exactly two kinds of termination: architectural (EBREAK, the
//! exit syscall) which is not an error at all, and a fatal decode/dispatch
//! fault, represented here. A fault clears the engine's running flag; it is
//! never retried, caught, or rolled back by the engine itself.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EngineFault {
    #[error("unknown opcode 0b{opcode:07b} in instruction 0x{instr:08x} at pc=0x{pc:08x}")]
    UnknownOpcode { pc: u32, instr: u32, opcode: u32 },

    #[error(
        "unknown funct3/funct7 combination (funct3={funct3}, funct7=0x{funct7:02x}) \
         in R-type instruction 0x{instr:08x} at pc=0x{pc:08x}"
    )]
    UnknownRType {
        pc: u32,
        instr: u32,
        funct3: u32,
        funct7: u32,
    },

    #[error("unknown funct3 {funct3} for OP-IMM instruction 0x{instr:08x} at pc=0x{pc:08x}")]
    UnknownOpImm { pc: u32, instr: u32, funct3: u32 },

    #[error("unknown funct3 {funct3} for load instruction 0x{instr:08x} at pc=0x{pc:08x}")]
    UnknownLoad { pc: u32, instr: u32, funct3: u32 },

    #[error("unknown funct3 {funct3} for store instruction 0x{instr:08x} at pc=0x{pc:08x}")]
    UnknownStore { pc: u32, instr: u32, funct3: u32 },

    #[error("unknown funct3 {funct3} for branch instruction 0x{instr:08x} at pc=0x{pc:08x}")]
    UnknownBranch { pc: u32, instr: u32, funct3: u32 },

    #[error("unrecognized SYSTEM encoding 0x{instr:08x} at pc=0x{pc:08x}")]
    UnknownSystem { pc: u32, instr: u32 },

    #[error("unrecognized syscall number {number} (x17) at pc=0x{pc:08x}")]
    UnknownSyscall { pc: u32, number: u32 },
}

impl EngineFault {
    /// The program counter of the instruction that caused the fault.
    pub fn pc(&self) -> u32 {
        match *self {
            EngineFault::UnknownOpcode { pc, .. }
            | EngineFault::UnknownRType { pc, .. }
            | EngineFault::UnknownOpImm { pc, .. }
            | EngineFault::UnknownLoad { pc, .. }
            | EngineFault::UnknownStore { pc, .. }
            | EngineFault::UnknownBranch { pc, .. }
            | EngineFault::UnknownSystem { pc, .. }
            | EngineFault::UnknownSyscall { pc, .. } => pc,
        }
    }
}
