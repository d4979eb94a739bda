use super::*;
use crate::CpuRegisters;
use test_log::test;

const PC: u16 = 0x0300;

fn state_with_operand(operand: &[u8], x: u8, y: u8) -> CpuState {
    let mut state = CpuState::new(CpuRegisters { x, y, ..CpuRegisters::new(PC) });
    state.write_bytes(PC, operand);
    state
}

fn resolve_at(mode: AddressingMode, state: &mut CpuState) -> u16 {
    let resolved = resolve(mode, state);
    assert_eq!(resolved.next_pc, PC + mode.operand_len(), "{mode:?}");
    resolved.address
}

#[test]
fn every_mode_consumes_exactly_its_operand() {
    for mode in AddressingMode::ALL {
        let mut state = state_with_operand(&[0x80, 0x12], 0x05, 0x07);
        state.write_bytes(0x0080, &[0x34, 0x12]);

        let before = state.clone();
        let peeked = peek(mode, &state);
        assert_eq!(state, before, "{mode:?}");

        let resolved = resolve(mode, &mut state);
        assert_eq!(resolved, peeked, "{mode:?}");
        assert_eq!(resolved.next_pc, PC + mode.operand_len(), "{mode:?}");
        assert_eq!(state.pc(), resolved.next_pc, "{mode:?}");
        assert_eq!(state.memory(), before.memory(), "{mode:?}");
    }
}

#[test]
fn implicit_and_immediate() {
    let mut state = state_with_operand(&[0xA9], 0, 0);
    let resolved = resolve(AddressingMode::Implicit, &mut state);
    assert_eq!(resolved, Resolved { address: PC, next_pc: PC });
    assert_eq!(state.pc(), PC);

    let resolved = resolve(AddressingMode::Immediate, &mut state);
    assert_eq!(resolved, Resolved { address: PC, next_pc: PC + 1 });
    assert_eq!(state.read(resolved.address), 0xA9);
}

#[test]
fn relative_targets() {
    let mut state = state_with_operand(&[0x10], 0, 0);
    assert_eq!(resolve_at(AddressingMode::Relative, &mut state), PC + 1 + 0x10);

    // -16
    let mut state = state_with_operand(&[0xF0], 0, 0);
    assert_eq!(resolve_at(AddressingMode::Relative, &mut state), PC + 1 - 16);

    // -2 branches back to the opcode byte
    let mut state = state_with_operand(&[0xFE], 0, 0);
    assert_eq!(resolve_at(AddressingMode::Relative, &mut state), PC - 1);
}

#[test]
fn indexed_modes() {
    let mut state = state_with_operand(&[0xF0, 0x12], 0x20, 0x30);
    assert_eq!(resolve_at(AddressingMode::ZeroPage, &mut state), 0x00F0);

    // Zero page indexing wraps within page 0
    let mut state = state_with_operand(&[0xF0, 0x12], 0x20, 0x30);
    assert_eq!(resolve_at(AddressingMode::ZeroPageX, &mut state), 0x0010);
    let mut state = state_with_operand(&[0xF0, 0x12], 0x20, 0x30);
    assert_eq!(resolve_at(AddressingMode::ZeroPageY, &mut state), 0x0020);

    let mut state = state_with_operand(&[0xF0, 0x12], 0x20, 0x30);
    assert_eq!(resolve_at(AddressingMode::Absolute, &mut state), 0x12F0);
    let mut state = state_with_operand(&[0xF0, 0x12], 0x20, 0x30);
    assert_eq!(resolve_at(AddressingMode::AbsoluteX, &mut state), 0x1310);
    let mut state = state_with_operand(&[0xF0, 0xFF], 0x20, 0x30);
    assert_eq!(resolve_at(AddressingMode::AbsoluteY, &mut state), 0x0020);
}

#[test]
fn indirect_modes() {
    let mut state = state_with_operand(&[0x40], 0x04, 0x10);
    state.write_bytes(0x0044, &[0x00, 0x20]);
    assert_eq!(resolve_at(AddressingMode::IndexedIndirectX, &mut state), 0x2000);

    let mut state = state_with_operand(&[0x40], 0x04, 0x10);
    state.write_bytes(0x0040, &[0xF8, 0x20]);
    assert_eq!(resolve_at(AddressingMode::IndirectIndexedY, &mut state), 0x2108);

    let mut state = state_with_operand(&[0x00, 0x40], 0, 0);
    state.write_bytes(0x4000, &[0x34, 0x12]);
    assert_eq!(resolve_at(AddressingMode::Indirect, &mut state), 0x1234);
}

#[test]
fn indirect_pointer_does_not_cross_pages() {
    let mut state = state_with_operand(&[0xFF, 0x40], 0, 0);
    state.write(0x40FF, 0x34);
    state.write(0x4000, 0x12);
    state.write(0x4100, 0x56);
    assert_eq!(resolve_at(AddressingMode::Indirect, &mut state), 0x1234);
}
