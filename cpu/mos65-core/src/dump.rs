//! Text renderings of processor state.

use crate::{CpuRegisters, StatusFlags, StopReason};
use std::fmt::{Display, Formatter, Write};

const HEX_DUMP_ROW_LEN: usize = 32;

impl Display for StatusFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let flags = [
            (self.negative, 'N'),
            (self.overflow, 'V'),
            (self.unused, '-'),
            (self.break_flag, 'B'),
            (self.decimal, 'D'),
            (self.interrupt_disable, 'I'),
            (self.zero, 'Z'),
            (self.carry, 'C'),
        ];

        for (set, letter) in flags {
            let c = if set || letter == '-' { letter } else { 'x' };
            f.write_char(c)?;
        }

        Ok(())
    }
}

impl Display for CpuRegisters {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "a={:02X} x={:02X} y={:02X} sp={:02X} pc={:04X} ps={} ({:02X})",
            self.accumulator,
            self.x,
            self.y,
            self.sp,
            self.pc,
            self.status,
            self.status.to_byte()
        )
    }
}

impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Break { address } => write!(f, "BRK at ${address:04X}"),
            Self::HaltAddress { address } => write!(f, "reached halt address ${address:04X}"),
            Self::InstructionLimit => f.write_str("instruction limit reached"),
        }
    }
}

/// Render `len` bytes starting at `start`, 32 per row, each row prefixed with its address.
///
/// Addresses wrap from $FFFF to $0000.
#[must_use]
pub fn hex_dump(memory: &[u8; crate::MEMORY_LEN], start: u16, len: usize) -> String {
    let mut out = String::new();

    for row_start in (0..len).step_by(HEX_DUMP_ROW_LEN) {
        let row_address = start.wrapping_add(row_start as u16);
        let _ = write!(out, "{row_address:04X}:");

        for offset in row_start..len.min(row_start + HEX_DUMP_ROW_LEN) {
            let address = start.wrapping_add(offset as u16);
            let _ = write!(out, " {:02X}", memory[address as usize]);
        }

        out.push('\n');
    }

    out
}
