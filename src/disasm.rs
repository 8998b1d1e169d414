//! Disassembler (spec component 3).
//!
//! Renders a single RV32IM instruction word as a canonical mnemonic string.
//! Unrecognized encodings fall back to `.word 0x........`. The symbol table
//! is accepted so jump/branch targets can be annotated with a function name
//! when one is known at that address; a conforming caller may pass `None`
//! and get plain hex targets.

use crate::fields::{bit30, funct3, funct7, opcode, rd, rs1, rs2, shamt};
use crate::imm::{imm_b, imm_i, imm_j, imm_s, imm_u};
use crate::opcodes::*;
use crate::symbols::SymbolTable;

fn reg(index: u8) -> String {
    format!("x{index}")
}

/// Render a target address as hex, appended with `<name>` if the symbol
/// table resolves it.
fn target(addr: u32, symbols: Option<&dyn SymbolTable>) -> String {
    match symbols.and_then(|s| s.name_at(addr)) {
        Some(name) => format!("0x{addr:x} <{name}>"),
        None => format!("0x{addr:x}"),
    }
}

fn r_type_mnemonic(f3: u32, f7: u32) -> Option<&'static str> {
    Some(match (f3, f7) {
        (0, FUNCT7_BASE) => "add",
        (0, FUNCT7_ALT) => "sub",
        (0, FUNCT7_MULDIV) => "mul",
        (1, FUNCT7_BASE) => "sll",
        (1, FUNCT7_MULDIV) => "mulh",
        (2, FUNCT7_BASE) => "slt",
        (2, FUNCT7_MULDIV) => "mulhsu",
        (3, FUNCT7_BASE) => "sltu",
        (3, FUNCT7_MULDIV) => "mulhu",
        (4, FUNCT7_BASE) => "xor",
        (4, FUNCT7_MULDIV) => "div",
        (5, FUNCT7_BASE) => "srl",
        (5, FUNCT7_ALT) => "sra",
        (5, FUNCT7_MULDIV) => "divu",
        (6, FUNCT7_BASE) => "or",
        (6, FUNCT7_MULDIV) => "rem",
        (7, FUNCT7_BASE) => "and",
        (7, FUNCT7_MULDIV) => "remu",
        _ => return None,
    })
}

fn op_imm_mnemonic(instr: u32, f3: u32) -> Option<&'static str> {
    Some(match f3 {
        FUNCT3_ADDI => "addi",
        FUNCT3_SLTI => "slti",
        FUNCT3_SLTIU => "sltiu",
        FUNCT3_XORI => "xori",
        FUNCT3_ORI => "ori",
        FUNCT3_ANDI => "andi",
        FUNCT3_SLLI => "slli",
        FUNCT3_SRLI_SRAI => {
            if bit30(instr) {
                "srai"
            } else {
                "srli"
            }
        }
        _ => return None,
    })
}

fn load_mnemonic(f3: u32) -> Option<&'static str> {
    Some(match f3 {
        FUNCT3_LB => "lb",
        FUNCT3_LH => "lh",
        FUNCT3_LW => "lw",
        FUNCT3_LBU => "lbu",
        FUNCT3_LHU => "lhu",
        _ => return None,
    })
}

fn store_mnemonic(f3: u32) -> Option<&'static str> {
    Some(match f3 {
        FUNCT3_SB => "sb",
        FUNCT3_SH => "sh",
        FUNCT3_SW => "sw",
        _ => return None,
    })
}

fn branch_mnemonic(f3: u32) -> Option<&'static str> {
    Some(match f3 {
        FUNCT3_BEQ => "beq",
        FUNCT3_BNE => "bne",
        FUNCT3_BLT => "blt",
        FUNCT3_BGE => "bge",
        FUNCT3_BLTU => "bltu",
        FUNCT3_BGEU => "bgeu",
        _ => return None,
    })
}

/// Render `instr`, fetched from `addr`, as a canonical one-line mnemonic.
/// `symbols` is consulted only to annotate branch/jump/JAL targets.
pub fn disassemble(addr: u32, instr: u32, symbols: Option<&dyn SymbolTable>) -> String {
    let op = opcode(instr);
    let f3 = funct3(instr);
    let f7 = funct7(instr);
    let d = rd(instr);
    let s1 = rs1(instr);
    let s2 = rs2(instr);

    match op {
        OP => match r_type_mnemonic(f3, f7) {
            Some(mnem) => format!("{mnem} {}, {}, {}", reg(d), reg(s1), reg(s2)),
            None => word(instr),
        },
        OP_IMM => match op_imm_mnemonic(instr, f3) {
            Some(mnem @ ("slli" | "srli" | "srai")) => {
                format!("{mnem} {}, {}, {}", reg(d), reg(s1), shamt(instr))
            }
            Some(mnem) => format!("{mnem} {}, {}, {}", reg(d), reg(s1), imm_i(instr)),
            None => word(instr),
        },
        OP_LOAD => match load_mnemonic(f3) {
            Some(mnem) => format!("{mnem} {}, {}({})", reg(d), imm_i(instr), reg(s1)),
            None => word(instr),
        },
        OP_STORE => match store_mnemonic(f3) {
            Some(mnem) => format!("{mnem} {}, {}({})", reg(s2), imm_s(instr), reg(s1)),
            None => word(instr),
        },
        OP_BRANCH => match branch_mnemonic(f3) {
            Some(mnem) => {
                let dest = addr.wrapping_add(imm_b(instr) as u32);
                format!("{mnem} {}, {}, {}", reg(s1), reg(s2), target(dest, symbols))
            }
            None => word(instr),
        },
        OP_LUI => format!("lui {}, 0x{:x}", reg(d), (imm_u(instr) as u32) >> 12),
        OP_AUIPC => format!("auipc {}, 0x{:x}", reg(d), (imm_u(instr) as u32) >> 12),
        OP_JAL => {
            let dest = addr.wrapping_add(imm_j(instr) as u32);
            format!("jal {}, {}", reg(d), target(dest, symbols))
        }
        OP_JALR => format!("jalr {}, {}, {}", reg(d), reg(s1), imm_i(instr)),
        OP_SYSTEM => match instr {
            INSTR_ECALL => "ecall".to_string(),
            INSTR_EBREAK => "ebreak".to_string(),
            _ => word(instr),
        },
        _ => word(instr),
    }
}

fn word(instr: u32) -> String {
    format!(".word 0x{instr:08x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_addi() {
        // addi x1, x0, 5
        assert_eq!(disassemble(0, 0x0050_0093, None), "addi x1, x0, 5");
    }

    #[test]
    fn renders_add() {
        // add x1, x2, x3
        let instr = (0u32 << 25) | (3 << 20) | (2 << 15) | (0 << 12) | (1 << 7) | OP;
        assert_eq!(disassemble(0, instr, None), "add x1, x2, x3");
    }

    #[test]
    fn renders_mul_variants_via_funct7_muldiv() {
        let instr = (FUNCT7_MULDIV << 25) | (3 << 20) | (2 << 15) | (0 << 12) | (1 << 7) | OP;
        assert_eq!(disassemble(0, instr, None), "mul x1, x2, x3");
    }

    #[test]
    fn renders_branch_target_as_absolute_address() {
        // beq x1, x2, -8, fetched at pc=8
        let raw_imm: u32 = (-8i32) as u32;
        let imm_12 = (raw_imm >> 12) & 1;
        let imm_11 = (raw_imm >> 11) & 1;
        let imm_10_5 = (raw_imm >> 5) & 0x3f;
        let imm_4_1 = (raw_imm >> 1) & 0xf;
        let instr = (imm_12 << 31)
            | (imm_10_5 << 25)
            | (2 << 20)
            | (1 << 15)
            | (0 << 12)
            | (imm_4_1 << 8)
            | (imm_11 << 7)
            | OP_BRANCH;
        assert_eq!(disassemble(8, instr, None), "beq x1, x2, 0x0");
    }

    #[test]
    fn renders_load_store_with_offset_paren_base() {
        // lw x5, 16(x1)
        let instr = (16u32 << 20) | (1 << 15) | (2 << 12) | (5 << 7) | OP_LOAD;
        assert_eq!(disassemble(0, instr, None), "lw x5, 16(x1)");
        // sw x2, -4(x1)
        let raw: u32 = (-4i32) as u32 & 0xfff;
        let instr = ((raw >> 5) << 25) | (2 << 20) | (1 << 15) | (2 << 12) | ((raw & 0x1f) << 7) | OP_STORE;
        assert_eq!(disassemble(0, instr, None), "sw x2, -4(x1)");
    }

    #[test]
    fn falls_back_to_word_on_unknown_encoding() {
        // opcode 0x7f is not a recognized RV32IM major opcode
        assert_eq!(disassemble(0, 0x0000_007f, None), ".word 0x0000007f");
    }

    #[test]
    fn renders_ecall_and_ebreak_bare() {
        assert_eq!(disassemble(0, INSTR_ECALL, None), "ecall");
        assert_eq!(disassemble(0, INSTR_EBREAK, None), "ebreak");
    }
}
