//! Execution engine (spec component 5): the fetch-decode-execute loop.
//!
//! `Engine` owns the register file, program counter, predictor bank and
//! retired-instruction count for a single simulation run. It is generic
//! over the [`Memory`] collaborator; nothing here allocates or frees that
//! memory. See spec §3/§4.5/§7 for the data model, dispatch table and error
//! taxonomy this module implements.

use std::io::Write;

use crate::disasm::disassemble;
use crate::error::EngineFault;
use crate::fields::{bit30, funct3, funct7, opcode, rd, rs1, rs2, shamt};
use crate::imm::{imm_b, imm_i, imm_j, imm_s, imm_u};
use crate::mulhi::{mulh, mulhsu, mulhu};
use crate::opcodes::*;
use crate::predictors::{PredictorBank, PredictorReport};
use crate::symbols::SymbolTable;
use crate::trace::{MemWrite, StoreWidth, TraceEvent};
use crate::Memory;

/// `x0..x31`. Index 0 is hardwired to zero: nothing in the register array
/// itself enforces that, it is restored at the end of every instruction by
/// the engine's main loop, matching the "rolled back" wording in spec §4.5.
#[derive(Debug, Clone)]
struct Registers([u32; 32]);

impl Registers {
    fn new() -> Self {
        Self([0; 32])
    }

    fn get(&self, index: u8) -> u32 {
        self.0[index as usize]
    }

    fn set(&mut self, index: u8, value: u32) {
        self.0[index as usize] = value;
    }
}

/// Host-side environment-call services (spec §6 "Environment-call ABI").
/// Abstracted behind a trait so tests can inject canned stdin and capture
/// stdout without touching the process's real standard streams.
pub trait HostIo {
    /// Returns the byte read, or `0xFFFF_FFFF` on EOF.
    fn getchar(&mut self) -> u32;
    fn putchar(&mut self, byte: u8);
}

/// The default [`HostIo`]: the process's real stdin/stdout.
#[derive(Debug, Default)]
pub struct StdIo;

impl HostIo for StdIo {
    fn getchar(&mut self) -> u32 {
        use std::io::Read;
        let mut byte = [0u8; 1];
        match std::io::stdin().read(&mut byte) {
            Ok(1) => u32::from(byte[0]),
            _ => 0xffff_ffff,
        }
    }

    fn putchar(&mut self, byte: u8) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(&[byte]);
        let _ = stdout.flush();
    }
}

/// Statistics returned by value when the engine stops, per spec §6.
#[derive(Debug, Clone)]
pub struct Stat {
    pub retired: u64,
    pub predictors: PredictorReport,
}

/// A single-threaded RV32IM core: register file, PC, predictor bank and
/// retired-instruction count. Exclusively owned; released when it is
/// dropped. Memory, the symbol table and the trace sink are all borrowed
/// for the duration of [`Engine::run`] rather than owned by the engine.
pub struct Engine {
    x: Registers,
    pc: u32,
    predictors: PredictorBank,
    retired: u64,
    running: bool,
    /// Set after dispatching JAL/JALR, consumed by the *next* step's trace
    /// line as its jump-target marker (spec §9 Open Questions: the marker
    /// is attached to the instruction after the jump, not the jump itself).
    next_is_jump_target: bool,
}

impl Engine {
    pub fn new(start_addr: u32) -> Self {
        Self {
            x: Registers::new(),
            pc: start_addr,
            predictors: PredictorBank::new(),
            retired: 0,
            running: true,
            next_is_jump_target: false,
        }
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn reg(&self, index: u8) -> u32 {
        self.x.get(index)
    }

    /// A snapshot of every predictor's accuracy so far, usable mid-run (for
    /// example, while single-stepping under a debugger front end).
    pub fn predictors_report(&self) -> PredictorReport {
        self.predictors.report()
    }

    /// Run until EBREAK, an exit syscall, or a fatal decode/dispatch fault.
    /// Returns the accumulated statistics either way; on a fault, `Err`
    /// additionally carries the fault that stopped the loop (the retired
    /// count in `Stat` still includes the offending instruction, per §7).
    pub fn run(
        &mut self,
        mem: &mut dyn Memory,
        io: &mut dyn HostIo,
        symbols: Option<&dyn SymbolTable>,
        mut trace_sink: Option<&mut dyn Write>,
    ) -> Result<Stat, (Stat, EngineFault)> {
        loop {
            match self.step(mem, io, symbols, trace_sink.as_deref_mut()) {
                Ok(()) => {
                    if !self.running {
                        return Ok(self.stat());
                    }
                }
                Err(fault) => return Err((self.stat(), fault)),
            }
        }
    }

    fn stat(&self) -> Stat {
        Stat {
            retired: self.retired,
            predictors: self.predictors.report(),
        }
    }

    /// Execute exactly one instruction. On success, `self.running` reflects
    /// whether the loop should continue (cleared by EBREAK or an exit
    /// syscall). On failure, `self.running` is also cleared and the fault
    /// is returned; the retired count has already been incremented for the
    /// faulting instruction.
    pub fn step(
        &mut self,
        mem: &mut dyn Memory,
        io: &mut dyn HostIo,
        symbols: Option<&dyn SymbolTable>,
        trace_sink: Option<&mut dyn Write>,
    ) -> Result<(), EngineFault> {
        let pc = self.pc;
        let instr = mem.rd_w(pc);
        self.retired += 1;

        let op = opcode(instr);
        let d = rd(instr);
        let f3 = funct3(instr);
        let f7 = funct7(instr);
        let s1 = rs1(instr);
        let s2 = rs2(instr);

        let mut next_pc = pc.wrapping_add(4);
        let reg_before = self.x.get(d);
        let mut mem_write = None;

        let dispatch_result = self.dispatch(
            pc, instr, op, d, f3, f7, s1, s2, mem, io, &mut next_pc, &mut mem_write,
        );

        if let Err(fault) = dispatch_result {
            self.running = false;
            return Err(fault);
        }

        if let Some(sink) = trace_sink {
            let asm = disassemble(pc, instr, symbols);
            let reg_after = self.x.get(d);
            let reg_write = if d != 0 && reg_after != reg_before {
                Some((d, reg_after))
            } else {
                None
            };
            let event = TraceEvent {
                seq: self.retired,
                jump_target: self.next_is_jump_target,
                pc,
                instr,
                asm,
                reg_write,
                mem_write,
            };
            let _ = event.write_to(sink);
        }

        self.next_is_jump_target = op == OP_JAL || op == OP_JALR;

        self.x.set(0, 0);
        self.pc = next_pc;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &mut self,
        pc: u32,
        instr: u32,
        op: u32,
        d: u8,
        f3: u32,
        f7: u32,
        s1: u8,
        s2: u8,
        mem: &mut dyn Memory,
        io: &mut dyn HostIo,
        next_pc: &mut u32,
        mem_write: &mut Option<MemWrite>,
    ) -> Result<(), EngineFault> {
        match op {
            OP => self.exec_r_type(pc, instr, d, f3, f7, s1, s2),
            OP_IMM => self.exec_op_imm(pc, instr, d, f3, s1),
            OP_LOAD => self.exec_load(pc, instr, d, f3, s1, mem),
            OP_STORE => self.exec_store(pc, instr, f3, s1, s2, mem, mem_write),
            OP_BRANCH => {
                self.exec_branch(pc, instr, f3, s1, s2, next_pc)?;
                Ok(())
            }
            OP_LUI => {
                self.x.set(d, imm_u(instr) as u32);
                Ok(())
            }
            OP_AUIPC => {
                self.x.set(d, pc.wrapping_add(imm_u(instr) as u32));
                Ok(())
            }
            OP_JAL => {
                self.x.set(d, pc.wrapping_add(4));
                *next_pc = pc.wrapping_add(imm_j(instr) as u32);
                Ok(())
            }
            OP_JALR => {
                let base = self.x.get(s1);
                let target = base.wrapping_add(imm_i(instr) as u32) & !1u32;
                self.x.set(d, pc.wrapping_add(4));
                *next_pc = target;
                Ok(())
            }
            OP_SYSTEM => self.exec_system(pc, instr, io),
            _ => Err(EngineFault::UnknownOpcode { pc, instr, opcode: op }),
        }
    }

    fn exec_r_type(
        &mut self,
        pc: u32,
        instr: u32,
        d: u8,
        f3: u32,
        f7: u32,
        s1: u8,
        s2: u8,
    ) -> Result<(), EngineFault> {
        let a = self.x.get(s1);
        let b = self.x.get(s2);
        let (ai, bi) = (a as i32, b as i32);

        let value = match (f3, f7) {
            (0, FUNCT7_BASE) => a.wrapping_add(b),
            (0, FUNCT7_ALT) => a.wrapping_sub(b),
            (0, FUNCT7_MULDIV) => a.wrapping_mul(b),
            (1, FUNCT7_BASE) => a.wrapping_shl(b & 0x1f),
            (1, FUNCT7_MULDIV) => mulh(a, b),
            (2, FUNCT7_BASE) => u32::from(ai < bi),
            (2, FUNCT7_MULDIV) => mulhsu(a, b),
            (3, FUNCT7_BASE) => u32::from(a < b),
            (3, FUNCT7_MULDIV) => mulhu(a, b),
            (4, FUNCT7_BASE) => a ^ b,
            (4, FUNCT7_MULDIV) => div_signed(a, b),
            (5, FUNCT7_BASE) => a.wrapping_shr(b & 0x1f),
            (5, FUNCT7_ALT) => ((ai).wrapping_shr(b & 0x1f)) as u32,
            (5, FUNCT7_MULDIV) => divu(a, b),
            (6, FUNCT7_BASE) => a | b,
            (6, FUNCT7_MULDIV) => rem_signed(a, b),
            (7, FUNCT7_BASE) => a & b,
            (7, FUNCT7_MULDIV) => remu(a, b),
            _ => {
                return Err(EngineFault::UnknownRType {
                    pc,
                    instr,
                    funct3: f3,
                    funct7: f7,
                })
            }
        };
        self.x.set(d, value);
        Ok(())
    }

    fn exec_op_imm(
        &mut self,
        pc: u32,
        instr: u32,
        d: u8,
        f3: u32,
        s1: u8,
    ) -> Result<(), EngineFault> {
        let a = self.x.get(s1);
        let imm = imm_i(instr) as u32;
        let value = match f3 {
            FUNCT3_ADDI => a.wrapping_add(imm),
            FUNCT3_SLTI => u32::from((a as i32) < (imm as i32)),
            FUNCT3_SLTIU => u32::from(a < imm),
            FUNCT3_XORI => a ^ imm,
            FUNCT3_ORI => a | imm,
            FUNCT3_ANDI => a & imm,
            FUNCT3_SLLI => a.wrapping_shl(shamt(instr)),
            FUNCT3_SRLI_SRAI => {
                if bit30(instr) {
                    ((a as i32).wrapping_shr(shamt(instr))) as u32
                } else {
                    a.wrapping_shr(shamt(instr))
                }
            }
            _ => {
                return Err(EngineFault::UnknownOpImm {
                    pc,
                    instr,
                    funct3: f3,
                })
            }
        };
        self.x.set(d, value);
        Ok(())
    }

    fn exec_load(
        &mut self,
        pc: u32,
        instr: u32,
        d: u8,
        f3: u32,
        s1: u8,
        mem: &mut dyn Memory,
    ) -> Result<(), EngineFault> {
        let addr = (self.x.get(s1) as i32).wrapping_add(imm_i(instr)) as u32;
        let value = match f3 {
            FUNCT3_LB => ((mem.rd_b(addr) as i8) as i32) as u32,
            FUNCT3_LH => ((mem.rd_h(addr) as i16) as i32) as u32,
            FUNCT3_LW => mem.rd_w(addr),
            FUNCT3_LBU => u32::from(mem.rd_b(addr)),
            FUNCT3_LHU => u32::from(mem.rd_h(addr)),
            _ => {
                return Err(EngineFault::UnknownLoad {
                    pc,
                    instr,
                    funct3: f3,
                })
            }
        };
        self.x.set(d, value);
        Ok(())
    }

    fn exec_store(
        &mut self,
        pc: u32,
        instr: u32,
        f3: u32,
        s1: u8,
        s2: u8,
        mem: &mut dyn Memory,
        mem_write: &mut Option<MemWrite>,
    ) -> Result<(), EngineFault> {
        let addr = (self.x.get(s1) as i32).wrapping_add(imm_s(instr)) as u32;
        let value = self.x.get(s2);
        match f3 {
            FUNCT3_SB => {
                mem.wr_b(addr, value as u8);
                *mem_write = Some(MemWrite {
                    addr,
                    value: u32::from(value as u8),
                    width: StoreWidth::Byte,
                });
            }
            FUNCT3_SH => {
                mem.wr_h(addr, value as u16);
                *mem_write = Some(MemWrite {
                    addr,
                    value: u32::from(value as u16),
                    width: StoreWidth::Half,
                });
            }
            FUNCT3_SW => {
                mem.wr_w(addr, value);
                *mem_write = Some(MemWrite {
                    addr,
                    value,
                    width: StoreWidth::Word,
                });
            }
            _ => {
                return Err(EngineFault::UnknownStore {
                    pc,
                    instr,
                    funct3: f3,
                })
            }
        }
        Ok(())
    }

    fn exec_branch(
        &mut self,
        pc: u32,
        instr: u32,
        f3: u32,
        s1: u8,
        s2: u8,
        next_pc: &mut u32,
    ) -> Result<(), EngineFault> {
        let a = self.x.get(s1);
        let b = self.x.get(s2);
        let (ai, bi) = (a as i32, b as i32);
        let condition = match f3 {
            FUNCT3_BEQ => a == b,
            FUNCT3_BNE => a != b,
            FUNCT3_BLT => ai < bi,
            FUNCT3_BGE => ai >= bi,
            FUNCT3_BLTU => a < b,
            FUNCT3_BGEU => a >= b,
            _ => {
                return Err(EngineFault::UnknownBranch {
                    pc,
                    instr,
                    funct3: f3,
                })
            }
        };
        let offset = imm_b(instr);
        let fallthrough = pc.wrapping_add(4);
        *next_pc = if condition {
            pc.wrapping_add(offset as u32)
        } else {
            fallthrough
        };
        // "Actual taken" is defined structurally by next_pc, not by the
        // branch condition: a branch whose target happens to equal the
        // fallthrough address (offset == 4) is not-taken for prediction
        // purposes even though its condition evaluated true (spec §4.4).
        let taken = *next_pc != fallthrough;
        self.predictors.observe(pc, offset, taken);
        Ok(())
    }

    fn exec_system(&mut self, pc: u32, instr: u32, io: &mut dyn HostIo) -> Result<(), EngineFault> {
        match instr {
            INSTR_ECALL => self.exec_ecall(pc, io),
            INSTR_EBREAK => {
                self.running = false;
                Ok(())
            }
            _ => Err(EngineFault::UnknownSystem { pc, instr }),
        }
    }

    fn exec_ecall(&mut self, pc: u32, io: &mut dyn HostIo) -> Result<(), EngineFault> {
        let number = self.x.get(17);
        match number {
            1 => {
                let byte = io.getchar();
                self.x.set(10, byte);
            }
            2 => {
                io.putchar(self.x.get(10) as u8);
                self.x.set(10, 0);
            }
            3 => self.running = false,
            4 => self.x.set(10, 0),
            5 => {
                let count = self.x.get(12);
                self.x.set(10, count);
            }
            6 => self.x.set(10, 0xffff_ffff),
            93 => self.running = false,
            other => return Err(EngineFault::UnknownSyscall { pc, number: other }),
        }
        Ok(())
    }
}

fn div_signed(a: u32, b: u32) -> u32 {
    if b == 0 {
        return 0xffff_ffff;
    }
    let (ai, bi) = (a as i32, b as i32);
    if ai == i32::MIN && bi == -1 {
        return 0x8000_0000;
    }
    ai.wrapping_div(bi) as u32
}

fn rem_signed(a: u32, b: u32) -> u32 {
    if b == 0 {
        return a;
    }
    let (ai, bi) = (a as i32, b as i32);
    if ai == i32::MIN && bi == -1 {
        return 0;
    }
    ai.wrapping_rem(bi) as u32
}

fn divu(a: u32, b: u32) -> u32 {
    if b == 0 {
        0xffff_ffff
    } else {
        a / b
    }
}

fn remu(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        a % b
    }
}

#[cfg(test)]
pub(crate) struct BufferIo {
    pub input: std::collections::VecDeque<u8>,
    pub output: Vec<u8>,
}

#[cfg(test)]
impl HostIo for BufferIo {
    fn getchar(&mut self) -> u32 {
        match self.input.pop_front() {
            Some(byte) => u32::from(byte),
            None => 0xffff_ffff,
        }
    }

    fn putchar(&mut self, byte: u8) {
        self.output.push(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FlatMemory;

    fn load_program(mem: &mut FlatMemory, words: &[u32]) {
        for (i, word) in words.iter().enumerate() {
            mem.wr_w((i * 4) as u32, *word);
        }
    }

    #[test]
    fn x0_is_always_zero_after_a_step() {
        let mut mem = FlatMemory::new();
        // addi x0, x0, 5 ; ebreak
        load_program(&mut mem, &[0x0050_0013, 0x0010_0073]);
        let mut engine = Engine::new(0);
        let mut io = StdIo;
        let _ = engine.run(&mut mem, &mut io, None, None);
        assert_eq!(engine.reg(0), 0);
    }

    #[test]
    fn addi_chain_scenario() {
        let mut mem = FlatMemory::new();
        load_program(
            &mut mem,
            &[0x0050_0093, 0x0010_8093, 0x0010_0073], // addi x1,x0,5; addi x1,x1,1; ebreak
        );
        let mut engine = Engine::new(0);
        let mut io = StdIo;
        let stat = engine.run(&mut mem, &mut io, None, None).unwrap();
        assert_eq!(engine.reg(1), 6);
        assert_eq!(stat.retired, 3);
    }

    #[test]
    fn divide_by_zero_scenario() {
        let mut mem = FlatMemory::new();
        // addi x1,x0,7; addi x2,x0,0; div x3,x1,x2; ebreak
        load_program(
            &mut mem,
            &[
                0x0070_0093,
                0x0000_0113,
                0x0220_c1b3,
                0x0010_0073,
            ],
        );
        let mut engine = Engine::new(0);
        let mut io = StdIo;
        engine.run(&mut mem, &mut io, None, None).unwrap();
        assert_eq!(engine.reg(3), 0xffff_ffff);
    }

    #[test]
    fn signed_overflow_on_div_scenario() {
        let mut mem = FlatMemory::new();
        // lui x1,0x80000; addi x2,x0,-1; div x3,x1,x2; rem x4,x1,x2; ebreak
        load_program(
            &mut mem,
            &[
                0x8000_00b7,
                0xfff0_0113,
                0x0220_c1b3,
                0x0220_e233,
                0x0010_0073,
            ],
        );
        let mut engine = Engine::new(0);
        let mut io = StdIo;
        engine.run(&mut mem, &mut io, None, None).unwrap();
        assert_eq!(engine.reg(3), 0x8000_0000);
        assert_eq!(engine.reg(4), 0);
    }

    #[test]
    fn store_load_round_trip_scenario() {
        let mut mem = FlatMemory::new();
        // x2 = 0xdeadbeef via lui+addi, the standard two-instruction idiom:
        // the addi's immediate is sign-extended, so when its low 12 bits
        // have the sign bit set the lui immediate must be pre-incremented
        // by 1 to compensate.
        let hi = 0xdeadbu32; // top 20 bits of 0xdeadbeef
        let lo: i32 = 0xeefu32 as i32 - 0x1000; // -0x111, the signed low 12 bits
        let lui_imm = hi.wrapping_add(1);
        let instr_lui = (lui_imm << 12) | (2 << 7) | OP_LUI;
        let instr_addi = (((lo as u32) & 0xfff) << 20) | (2 << 15) | (0 << 12) | (2 << 7) | OP_IMM;
        load_program(
            &mut mem,
            &[
                0x0000_10b7, // lui x1, 0x1       -> x1 = 0x1000 (base address)
                instr_lui,   // lui x2, lui_imm
                instr_addi,  // addi x2, x2, lo    -> x2 = 0xdeadbeef
                0x0020_a023, // sw x2, 0(x1)
                0x0000_a283, // lw x5, 0(x1)
                0x0010_0073, // ebreak
            ],
        );
        let mut engine = Engine::new(0);
        let mut io = StdIo;
        engine.run(&mut mem, &mut io, None, None).unwrap();
        assert_eq!(engine.reg(2), 0xdead_beef);
        assert_eq!(engine.reg(5), 0xdead_beef);
    }

    #[test]
    fn syscall_putchar_then_exit_scenario() {
        let mut mem = FlatMemory::new();
        // addi x17,x0,2; addi x10,x0,0x41; ecall; addi x17,x0,3; ecall
        load_program(
            &mut mem,
            &[
                0x0020_0893,
                0x0410_0513,
                0x0000_0073,
                0x0030_0893,
                0x0000_0073,
            ],
        );
        let mut engine = Engine::new(0);
        let mut io = BufferIo {
            input: Default::default(),
            output: Vec::new(),
        };
        let stat = engine.run(&mut mem, &mut io, None, None).unwrap();
        assert_eq!(io.output, vec![b'A']);
        assert!(stat.retired >= 5);
    }

    #[test]
    fn branch_taken_backward_predictor_scenario() {
        let mut mem = FlatMemory::new();
        // addi x1,x0,3; addi x2,x0,3; beq x1,x2,-8
        load_program(
            &mut mem,
            &[0x0030_0093, 0x0030_0113, 0xfe20_8ce3],
        );
        let mut engine = Engine::new(0);
        let mut io = StdIo;
        // 3 instructions per loop iteration, so 300 steps retires ~100
        // conditional branches.
        for _ in 0..300 {
            let result = engine.step(&mut mem, &mut io, None, None);
            assert!(result.is_ok());
        }
        let report = engine.predictors.report();
        assert!(report.never_taken.mispredicted >= 99);
        assert_eq!(report.btfnt.mispredicted, 0);
    }

    #[test]
    fn unknown_opcode_is_fatal_but_retired_count_includes_it() {
        let mut mem = FlatMemory::new();
        load_program(&mut mem, &[0x0000_007f]);
        let mut engine = Engine::new(0);
        let mut io = StdIo;
        let (stat, fault) = engine.run(&mut mem, &mut io, None, None).unwrap_err();
        assert_eq!(stat.retired, 1);
        assert!(matches!(fault, EngineFault::UnknownOpcode { .. }));
    }
}
