//! Trace emitter (spec component 6).
//!
//! When a sink is attached, the engine formats one line per retired
//! instruction. Trace construction (disassembly, register-change detection)
//! only happens when a sink is present, per spec §9's "trace emission cost"
//! note: with no sink, `Engine::step` skips building a [`TraceEvent`]
//! entirely.

use std::io::{self, Write};

/// Width of a store, used only to pick how many hex digits to print the
/// written value with.
#[derive(Debug, Clone, Copy)]
pub enum StoreWidth {
    Byte,
    Half,
    Word,
}

impl StoreWidth {
    fn hex_digits(self) -> usize {
        match self {
            StoreWidth::Byte => 2,
            StoreWidth::Half => 4,
            StoreWidth::Word => 8,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MemWrite {
    pub addr: u32,
    pub value: u32,
    pub width: StoreWidth,
}

/// Everything needed to render one trace line for a single retired
/// instruction.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    /// 1-based retired-instruction count.
    pub seq: u64,
    /// True iff the previous instruction was JAL or JALR.
    pub jump_target: bool,
    pub pc: u32,
    pub instr: u32,
    pub asm: String,
    /// Present iff rd != 0 and the write changed the register's value.
    pub reg_write: Option<(u8, u32)>,
    /// Present only for store instructions.
    pub mem_write: Option<MemWrite>,
}

impl TraceEvent {
    /// Render this event as the one line spec §4.6 describes:
    ///
    /// ```text
    /// <seq> <prefix> <pc:08x> : <instr:08x>   <asm:30>  [R[d] <- value] [M[addr] <- value]
    /// ```
    pub fn format(&self) -> String {
        let prefix = if self.jump_target { "=>" } else { "  " };
        let mut line = format!(
            "{seq} {prefix} {pc:08x} : {instr:08x}   {asm:<30}",
            seq = self.seq,
            pc = self.pc,
            instr = self.instr,
            asm = self.asm,
        );
        if let Some((rd, value)) = self.reg_write {
            line.push_str(&format!("  R[{rd}] <- {value:08x}"));
        }
        if let Some(mem) = self.mem_write {
            let digits = mem.width.hex_digits();
            line.push_str(&format!(
                "  M[{:08x}] <- {:0width$x}",
                mem.addr,
                mem.value,
                width = digits
            ));
        }
        line
    }

    pub fn write_to(&self, sink: &mut dyn Write) -> io::Result<()> {
        writeln!(sink, "{}", self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_plain_line_with_no_writes() {
        let ev = TraceEvent {
            seq: 1,
            jump_target: false,
            pc: 0,
            instr: 0x0050_0093,
            asm: "addi x1, x0, 5".to_string(),
            reg_write: None,
            mem_write: None,
        };
        assert!(ev.format().starts_with("1    00000000 : 00500093   addi x1, x0, 5"));
    }

    #[test]
    fn marks_jump_target_with_arrow_prefix() {
        let ev = TraceEvent {
            seq: 2,
            jump_target: true,
            pc: 4,
            instr: 0,
            asm: "addi x1, x1, 1".to_string(),
            reg_write: Some((1, 6)),
            mem_write: None,
        };
        assert!(ev.format().starts_with("2 => 00000004"));
        assert!(ev.format().contains("R[1] <- 00000006"));
    }

    #[test]
    fn renders_memory_write_hex_width_by_store_size() {
        let ev = TraceEvent {
            seq: 3,
            jump_target: false,
            pc: 0,
            instr: 0,
            asm: "sw x5, 0(x1)".to_string(),
            reg_write: None,
            mem_write: Some(MemWrite {
                addr: 0x1000,
                value: 0xdead_beef,
                width: StoreWidth::Word,
            }),
        };
        assert!(ev.format().contains("M[00001000] <- deadbeef"));
    }
}
