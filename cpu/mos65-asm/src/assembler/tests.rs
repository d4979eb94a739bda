use super::*;
use mos65_core::{CpuRegisters, RunLimits, StopReason};
use test_log::test;

fn assemble_source(source: &str) -> (CpuState, SymbolTable, Assembly) {
    let mut state = CpuState::default();
    let mut symbols = SymbolTable::new();
    let assembly = assemble(source, 0x0000, &mut state, &mut symbols);
    (state, symbols, assembly)
}

fn bytes_at(state: &CpuState, address: u16, len: usize) -> Vec<u8> {
    (0..len).map(|i| state.read(address.wrapping_add(i as u16))).collect()
}

fn assert_assembles(line: &str, expected: &[u8]) {
    let (state, _, assembly) = assemble_source(&format!("org $0200\n{line}"));
    assert!(assembly.is_ok(), "{line}: {:?}", assembly.errors);
    assert_eq!(assembly.segments, [Segment { start: 0x0200, len: expected.len() }], "{line}");
    assert_eq!(bytes_at(&state, 0x0200, expected.len()), expected, "{line}");
}

fn assert_error(line: &str, expected: AsmErrorKind) {
    let (state, _, assembly) = assemble_source(&format!("org $0200\n{line}"));
    assert_eq!(assembly.errors, [AsmError { line: 2, kind: expected }], "{line}");
    assert!(assembly.segments.is_empty(), "{line}");
    assert_eq!(bytes_at(&state, 0x0200, 3), [0, 0, 0], "{line}");
}

#[test]
fn immediate_and_implicit() {
    assert_assembles("lda #$FA", &[0xA9, 0xFA]);
    assert_assembles("LDX #10", &[0xA2, 0x0A]);
    assert_assembles("ldy #%1010", &[0xA0, 0x0A]);
    assert_assembles("nop", &[0xEA]);
    assert_assembles("  php   ; save flags", &[0x08]);
    assert_assembles("brk", &[0x00]);
}

#[test]
fn zero_page_is_chosen_for_small_literals() {
    assert_assembles("lda $10", &[0xA5, 0x10]);
    assert_assembles("lda $0010", &[0xA5, 0x10]);
    assert_assembles("lda $1234", &[0xAD, 0x34, 0x12]);
    assert_assembles("lda $10,x", &[0xB5, 0x10]);
    assert_assembles("lda $1234,X", &[0xBD, 0x34, 0x12]);
    assert_assembles("ldx $10,y", &[0xB6, 0x10]);
    assert_assembles("stx $10, y", &[0x96, 0x10]);

    // No zero page Y form for LDA
    assert_assembles("lda $10,y", &[0xB9, 0x10, 0x00]);

    // No zero page form for JMP
    assert_assembles("jmp $10", &[0x4C, 0x10, 0x00]);
}

#[test]
fn indirect_forms() {
    assert_assembles("lda ($10,x)", &[0xA1, 0x10]);
    assert_assembles("sta ($20),Y", &[0x91, 0x20]);
    assert_assembles("eor ($20), y", &[0x51, 0x20]);
    assert_assembles("jmp ($1234)", &[0x6C, 0x34, 0x12]);
}

#[test]
fn accumulator_shifts() {
    assert_assembles("asl", &[0x0A]);
    assert_assembles("asl a", &[0x0A]);
    assert_assembles("LSR A", &[0x4A]);
    assert_assembles("rol $10", &[0x26, 0x10]);
    assert_assembles("ror $1234,x", &[0x7E, 0x34, 0x12]);
}

#[test]
fn byte_directive() {
    assert_assembles("byte 1, $FF, %11", &[0x01, 0xFF, 0x03]);
    assert_assembles("BYTE $20", &[0x20]);
}

#[test]
fn branches() {
    assert_assembles("beq $0204", &[0xF0, 0x02]);
    assert_assembles("beq $0204,PC", &[0xF0, 0x02]);
    assert_assembles("bne $0200", &[0xD0, 0xFE]);
    assert_assembles("bpl $0281", &[0x10, 0x7F]);
    assert_assembles("bmi $0182", &[0x30, 0x80]);
}

#[test]
fn labels_and_forward_references() {
    let source = "\
org $0300
start: ldx #$03
loop   dex
       bne loop
       jmp done
       nop
done   rts
";
    let (state, symbols, assembly) = assemble_source(source);

    assert!(assembly.is_ok(), "{:?}", assembly.errors);
    assert_eq!(assembly.entry_point(), Some(0x0300));
    assert_eq!(
        bytes_at(&state, 0x0300, 10),
        [0xA2, 0x03, 0xCA, 0xD0, 0xFD, 0x4C, 0x09, 0x03, 0xEA, 0x60]
    );

    assert_eq!(symbols.get("start").map(|s| (s.address, s.global)), Some((0x0300, true)));
    assert_eq!(symbols.get("loop").map(|s| (s.address, s.global)), Some((0x0302, false)));
    assert_eq!(symbols.address("done"), Some(0x0309));
}

#[test]
fn forward_branch_and_byte_references() {
    let source = "\
org $00F0
  beq skip
  lda #$01
skip byte end
end nop
";
    let (state, symbols, assembly) = assemble_source(source);

    assert!(assembly.is_ok(), "{:?}", assembly.errors);
    assert_eq!(symbols.address("end"), Some(0x00F5));
    assert_eq!(bytes_at(&state, 0x00F0, 6), [0xF0, 0x02, 0xA9, 0x01, 0xF5, 0xEA]);
}

#[test]
fn forward_byte_reference_must_fit_in_a_byte() {
    let source = "\
org $0200
  beq skip
  lda #$01
skip byte end
end nop
";
    let (state, _, assembly) = assemble_source(source);

    assert_eq!(
        assembly.errors,
        [AsmError { line: 4, kind: AsmErrorKind::ValueOutOfRange { value: 0x0205 } }]
    );
    assert_eq!(bytes_at(&state, 0x0200, 4), [0xF0, 0x02, 0xA9, 0x01]);
}

#[test]
fn symbol_operands_use_absolute_form() {
    let source = "\
org $0010
value byte $42
org $0200
  lda value
  lda value,x
";
    let (state, _, assembly) = assemble_source(source);

    assert!(assembly.is_ok(), "{:?}", assembly.errors);
    assert_eq!(bytes_at(&state, 0x0200, 6), [0xAD, 0x10, 0x00, 0xBD, 0x10, 0x00]);
    assert_eq!(
        assembly.segments,
        [Segment { start: 0x0010, len: 1 }, Segment { start: 0x0200, len: 6 }]
    );
}

#[test]
fn label_on_its_own_line() {
    let (_, symbols, assembly) = assemble_source("org $0400\nhere\n  nop\nthere:\n");
    assert!(assembly.is_ok());
    assert_eq!(symbols.address("here"), Some(0x0400));
    assert_eq!(symbols.get("there").map(|s| (s.address, s.global)), Some((0x0401, true)));
}

#[test]
fn line_errors() {
    assert_error("foo bar", AsmErrorKind::UnknownMnemonic("bar".into()));
    assert_error("1abc nop", AsmErrorKind::UnknownMnemonic("1abc".into()));
    assert_error(
        "lda",
        AsmErrorKind::UnsupportedOperand { mnemonic: "lda".into(), operand: String::new() },
    );
    assert_error(
        "sta #$10",
        AsmErrorKind::UnsupportedOperand { mnemonic: "sta".into(), operand: "#$10".into() },
    );
    assert_error(
        "nop $10",
        AsmErrorKind::UnsupportedOperand { mnemonic: "nop".into(), operand: "$10".into() },
    );
    assert_error(
        "lda a",
        AsmErrorKind::UnsupportedOperand { mnemonic: "lda".into(), operand: "a".into() },
    );
    assert_error(
        "lda $10,pc",
        AsmErrorKind::UnsupportedOperand { mnemonic: "lda".into(), operand: "$10,pc".into() },
    );
    assert_error("lda #$100", AsmErrorKind::ValueOutOfRange { value: 0x100 });
    assert_error("jmp $10000", AsmErrorKind::ValueOutOfRange { value: 0x10000 });
    assert_error("stx $1234,y", AsmErrorKind::ValueOutOfRange { value: 0x1234 });
    assert_error("lda #$zz", AsmErrorKind::MalformedValue("$zz".into()));
    assert_error("byte 1,,2", AsmErrorKind::MalformedValue(String::new()));
    assert_error("beq $0300", AsmErrorKind::BranchOutOfRange { target: 0x0300 });
}

#[test]
fn failing_line_emits_nothing_and_assembly_continues() {
    let source = "\
org $0200
  lda #$01
bad lda #$100
bad nop
bad nop
  inx
";
    let (state, symbols, assembly) = assemble_source(source);

    assert_eq!(
        assembly.errors,
        [
            AsmError { line: 3, kind: AsmErrorKind::ValueOutOfRange { value: 0x100 } },
            AsmError { line: 5, kind: AsmErrorKind::DuplicateSymbol("bad".into()) },
        ]
    );
    assert_eq!(symbols.address("bad"), Some(0x0202));
    assert_eq!(bytes_at(&state, 0x0200, 5), [0xA9, 0x01, 0xEA, 0xE8, 0x00]);
    assert_eq!(assembly.segments, [Segment { start: 0x0200, len: 4 }]);
}

#[test]
fn undefined_symbols_leave_placeholders() {
    let source = "\
org $0200
  jmp nowhere
  lda #$01
  bne elsewhere
";
    let (state, _, assembly) = assemble_source(source);

    assert_eq!(
        assembly.errors,
        [
            AsmError { line: 2, kind: AsmErrorKind::UndefinedSymbol("nowhere".into()) },
            AsmError { line: 4, kind: AsmErrorKind::UndefinedSymbol("elsewhere".into()) },
        ]
    );
    assert_eq!(bytes_at(&state, 0x0200, 7), [0x4C, 0x00, 0x00, 0xA9, 0x01, 0xD0, 0x00]);
}

#[test]
fn forward_branch_out_of_range() {
    let mut source = String::from("org $0200\n  beq far\n");
    for _ in 0..200 {
        source.push_str("  nop\n");
    }
    source.push_str("far rts\n");

    let (_, _, assembly) = assemble_source(&source);
    assert_eq!(
        assembly.errors,
        [AsmError { line: 2, kind: AsmErrorKind::BranchOutOfRange { target: 0x02CA } }]
    );
}

#[test]
fn org_requires_defined_value() {
    let (_, _, assembly) = assemble_source("org later\nlater nop");
    assert_eq!(
        assembly.errors,
        [AsmError { line: 1, kind: AsmErrorKind::UndefinedSymbol("later".into()) }]
    );
}

#[test]
fn incremental_lines_track_address() {
    let mut state = CpuState::default();
    let mut symbols = SymbolTable::new();
    let mut assembler = Assembler::new(0x0100);

    assembler.assemble_line(1, "  jsr sub", &mut state, &mut symbols).unwrap();
    assert_eq!(assembler.address(), 0x0103);
    assert!(assembler.resolve_fixups(&mut state, &symbols).is_empty());
    assert_eq!(bytes_at(&state, 0x0100, 3), [0x20, 0x00, 0x00]);

    assembler.assemble_line(2, "sub rts", &mut state, &mut symbols).unwrap();
    assert!(assembler.resolve_fixups(&mut state, &symbols).is_empty());
    assert_eq!(bytes_at(&state, 0x0100, 4), [0x20, 0x03, 0x01, 0x60]);

    let assembly = assembler.finish(&mut state, &symbols);
    assert!(assembly.is_ok());
    assert_eq!(assembly.segments, [Segment { start: 0x0100, len: 4 }]);
}

#[test]
fn assembled_program_runs() {
    let source = "\
        org $0200
        ldx #$00
        lda #$00
        clc
loop    adc #$03
        inx
        cpx #$05
        bne loop
        sta $10
        jsr double
        brk
double  asl $10
        rts
";
    let mut state = CpuState::new(CpuRegisters::new(0x0200));
    let mut symbols = SymbolTable::new();
    let assembly = assemble(source, 0x0000, &mut state, &mut symbols);
    assert!(assembly.is_ok(), "{:?}", assembly.errors);

    let summary =
        state.run(RunLimits { max_instructions: Some(1000), ..RunLimits::default() }).unwrap();
    assert!(matches!(summary.reason, StopReason::Break { .. }));
    assert_eq!(state.registers().accumulator, 15);
    assert_eq!(state.read(0x0010), 30);
}
