use super::*;
use crate::assembler::assemble;
use crate::symbols::SymbolTable;
use mos65_core::CpuState;
use test_log::test;

fn state_with(address: u16, bytes: &[u8]) -> CpuState {
    let mut state = CpuState::default();
    state.write_bytes(address, bytes);
    state
}

fn single(bytes: &[u8]) -> String {
    let state = state_with(0x0200, bytes);
    format_instruction(&Instruction::decode(state.memory(), 0x0200))
}

#[test]
fn assembled_immediate_load_round_trips_at_any_address() {
    for address in [0x0000, 0x0200, 0x10FF, 0xC000, 0xFFF0] {
        let mut state = CpuState::default();
        let mut symbols = SymbolTable::new();
        let assembly =
            assemble(&format!("org ${address:04X}\nlda #$FA"), 0, &mut state, &mut symbols);
        assert!(assembly.is_ok(), "{:?}", assembly.errors);

        let instructions = disassemble(state.memory(), address, 2);
        assert_eq!(instructions.len(), 1);
        assert_eq!(format_instruction(&instructions[0]), "lda #$FA");
        assert_eq!(instructions[0].address, address);
    }
}

#[test]
fn operand_formats() {
    assert_eq!(single(&[0xEA]), "nop");
    assert_eq!(single(&[0x0A]), "asl");
    assert_eq!(single(&[0xA2, 0x07]), "ldx #$07");
    assert_eq!(single(&[0xAD, 0x34, 0x12]), "lda $1234");
    assert_eq!(single(&[0xBD, 0x34, 0x12]), "lda $1234,X");
    assert_eq!(single(&[0xB9, 0x34, 0x12]), "lda $1234,Y");
    assert_eq!(single(&[0x85, 0x10]), "sta $10");
    assert_eq!(single(&[0x95, 0x10]), "sta $10,X");
    assert_eq!(single(&[0xB6, 0x10]), "ldx $10,Y");
    assert_eq!(single(&[0xA1, 0x20]), "lda ($20,X)");
    assert_eq!(single(&[0x91, 0x20]), "sta ($20),Y");
    assert_eq!(single(&[0x6C, 0xFF, 0x30]), "jmp ($30FF)");
}

#[test]
fn branch_operand_is_the_target() {
    // At $0200: BNE +4, BEQ -2
    assert_eq!(single(&[0xD0, 0x04]), "bne $0206,PC");
    assert_eq!(single(&[0xF0, 0xFE]), "beq $0200,PC");

    let state = state_with(0xFFF0, &[0x10, 0x7F]);
    assert_eq!(Instruction::decode(state.memory(), 0xFFF0).operand, 0x0071);
}

#[test]
fn listing_line_format() {
    let state = state_with(0x0200, &[0xA9, 0xFA, 0x8D, 0x00, 0x03, 0xEA]);
    let instructions = disassemble(state.memory(), 0x0200, 6);

    let lines: Vec<_> = instructions.iter().map(format_line).collect();
    assert_eq!(
        lines,
        [".0200  A9 FA     lda #$FA", ".0202  8D 00 03  sta $0300", ".0205  EA        nop"]
    );

    assert_eq!(
        listing(state.memory(), 0x0200, 6),
        ".0200  A9 FA     lda #$FA\n.0202  8D 00 03  sta $0300\n.0205  EA        nop\n"
    );
}

#[test]
fn invalid_opcode_is_one_byte() {
    let state = state_with(0x0200, &[0x02, 0xEA]);
    let instructions = disassemble(state.memory(), 0x0200, 2);

    assert_eq!(instructions.len(), 2);
    assert_eq!(instructions[0].descriptor, None);
    assert_eq!(instructions[0].bytes, [0x02]);
    assert_eq!(format_line(&instructions[0]), ".0200  02        ???");
    assert_eq!(format_instruction(&instructions[1]), "nop");
}

#[test]
fn walk_covers_instruction_starts_within_range() {
    // LDA $1234 straddles the end of a 2 byte window and is still listed whole
    let state = state_with(0x0200, &[0xEA, 0xAD, 0x34, 0x12, 0xEA]);
    let instructions = disassemble(state.memory(), 0x0200, 2);

    assert_eq!(instructions.len(), 2);
    assert_eq!(instructions[1].bytes, [0xAD, 0x34, 0x12]);
    assert_eq!(instructions[1].next_address(), 0x0204);

    assert!(disassemble(state.memory(), 0x0200, 0).is_empty());
}

#[test]
fn walk_wraps_at_end_of_memory() {
    let state = state_with(0xFFFF, &[0xA9, 0x42]);
    let instructions = disassemble(state.memory(), 0xFFFF, 1);

    assert_eq!(instructions[0].bytes, [0xA9, 0x42]);
    assert_eq!(instructions[0].next_address(), 0x0001);
}
