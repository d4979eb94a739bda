//! Effective address computation for every addressing mode.

#[cfg(test)]
mod tests;

use crate::CpuState;
use crate::opcodes::AddressingMode;

/// Output of [`resolve`].
///
/// For `Implicit` there is no operand; `address` and `next_pc` are both the unchanged PC.
/// For `Immediate` the address is that of the operand byte itself.
/// For `Relative` the address is the branch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub address: u16,
    pub next_pc: u16,
}

/// Compute the effective address for `mode` from the operand bytes at PC, without modifying state.
#[must_use]
pub fn peek(mode: AddressingMode, state: &CpuState) -> Resolved {
    let registers = state.registers();
    let pc = registers.pc;
    let next_pc = pc.wrapping_add(mode.operand_len());

    let address = match mode {
        AddressingMode::Implicit | AddressingMode::Immediate => pc,
        AddressingMode::ZeroPage => state.read(pc).into(),
        AddressingMode::ZeroPageX => state.read(pc).wrapping_add(registers.x).into(),
        AddressingMode::ZeroPageY => state.read(pc).wrapping_add(registers.y).into(),
        AddressingMode::Absolute => state.read_u16(pc),
        AddressingMode::AbsoluteX => state.read_u16(pc).wrapping_add(registers.x.into()),
        AddressingMode::AbsoluteY => state.read_u16(pc).wrapping_add(registers.y.into()),
        AddressingMode::IndexedIndirectX => {
            let pointer = state.read(pc).wrapping_add(registers.x);
            state.read_zero_page_u16(pointer)
        }
        AddressingMode::IndirectIndexedY => {
            let pointer = state.read(pc);
            state.read_zero_page_u16(pointer).wrapping_add(registers.y.into())
        }
        AddressingMode::Indirect => {
            // NMOS bug: the pointer's high byte is fetched without carrying into the page
            let pointer = state.read_u16(pc);
            let [pointer_lsb, pointer_msb] = pointer.to_le_bytes();
            let msb_address = u16::from_le_bytes([pointer_lsb.wrapping_add(1), pointer_msb]);
            u16::from_le_bytes([state.read(pointer), state.read(msb_address)])
        }
        AddressingMode::Relative => {
            let offset = state.read(pc) as i8;
            next_pc.wrapping_add_signed(offset.into())
        }
    };

    Resolved { address, next_pc }
}

/// Consume the operand bytes for `mode` and return the effective address.
///
/// Must be called after the opcode byte has been consumed. On return PC points past the operand.
pub fn resolve(mode: AddressingMode, state: &mut CpuState) -> Resolved {
    let resolved = peek(mode, state);
    state.registers_mut().pc = resolved.next_pc;
    resolved
}
