//! Opcode and funct3/funct7 constants for the RV32IM subset this simulator
//! dispatches on. Mirrors the RISC-V base opcode map, trimmed to the
//! encodings spec.md lists in its dispatch table.

pub const OP_LUI: u32 = 0b011_0111;
pub const OP_AUIPC: u32 = 0b001_0111;
pub const OP_JAL: u32 = 0b110_1111;
pub const OP_JALR: u32 = 0b110_0111;
pub const OP_BRANCH: u32 = 0b110_0011;
pub const OP_LOAD: u32 = 0b000_0011;
pub const OP_STORE: u32 = 0b010_0011;
pub const OP_IMM: u32 = 0b001_0011;
pub const OP: u32 = 0b011_0011;
pub const OP_SYSTEM: u32 = 0b111_0011;

// Branches (opcode OP_BRANCH)
pub const FUNCT3_BEQ: u32 = 0b000;
pub const FUNCT3_BNE: u32 = 0b001;
pub const FUNCT3_BLT: u32 = 0b100;
pub const FUNCT3_BGE: u32 = 0b101;
pub const FUNCT3_BLTU: u32 = 0b110;
pub const FUNCT3_BGEU: u32 = 0b111;

// Loads (opcode OP_LOAD)
pub const FUNCT3_LB: u32 = 0b000;
pub const FUNCT3_LH: u32 = 0b001;
pub const FUNCT3_LW: u32 = 0b010;
pub const FUNCT3_LBU: u32 = 0b100;
pub const FUNCT3_LHU: u32 = 0b101;

// Stores (opcode OP_STORE)
pub const FUNCT3_SB: u32 = 0b000;
pub const FUNCT3_SH: u32 = 0b001;
pub const FUNCT3_SW: u32 = 0b010;

// OP-IMM (opcode OP_IMM)
pub const FUNCT3_ADDI: u32 = 0b000;
pub const FUNCT3_SLLI: u32 = 0b001;
pub const FUNCT3_SLTI: u32 = 0b010;
pub const FUNCT3_SLTIU: u32 = 0b011;
pub const FUNCT3_XORI: u32 = 0b100;
pub const FUNCT3_SRLI_SRAI: u32 = 0b101;
pub const FUNCT3_ORI: u32 = 0b110;
pub const FUNCT3_ANDI: u32 = 0b111;

pub const FUNCT7_BASE: u32 = 0x00;
pub const FUNCT7_ALT: u32 = 0x20; // SUB, SRA
pub const FUNCT7_MULDIV: u32 = 0x01; // RV32M R-type variants

// SYSTEM (opcode OP_SYSTEM)
pub const INSTR_ECALL: u32 = 0x0000_0073;
pub const INSTR_EBREAK: u32 = 0x0010_0073;
