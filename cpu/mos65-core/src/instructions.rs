
use crate::addressing::resolve;
use crate::opcodes::{AddressingMode, OpcodeDescriptor, Operation};
use crate::{CpuError, CpuState, Register, StatusFlags, StepOutcome};
use mos65_common::num::{GetBit, U16Ext};

fn is_read_mode(mode: AddressingMode) -> bool {
    matches!(
        mode,
        AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::IndexedIndirectX
            | AddressingMode::IndirectIndexedY
    )
}

fn is_write_mode(mode: AddressingMode) -> bool {
    mode != AddressingMode::Immediate && is_read_mode(mode)
}

// Whether the handler for `operation` knows how to resolve operands in `mode`
fn handles_mode(operation: Operation, mode: AddressingMode) -> bool {
    use Operation::*;

    match operation {
        Lda | Ldx | Ldy | Adc | Sbc | And | Ora | Eor | Cmp | Cpx | Cpy | Bit => is_read_mode(mode),
        Sta | Stx | Sty | Inc | Dec => is_write_mode(mode),
        Asl | Lsr | Rol | Ror => mode == AddressingMode::Implicit || is_write_mode(mode),
        Bcc | Bcs | Beq | Bmi | Bne | Bpl | Bvc | Bvs => mode == AddressingMode::Relative,
        Jmp => matches!(mode, AddressingMode::Absolute | AddressingMode::Indirect),
        Jsr => mode == AddressingMode::Absolute,
        Brk | Rti | Rts | Pha | Php | Pla | Plp | Tax | Tay | Tsx | Txa | Txs | Tya | Inx | Iny
        | Dex | Dey | Clc | Cld | Cli | Clv | Sec | Sed | Sei | Nop => {
            mode == AddressingMode::Implicit
        }
    }
}

/// Execute one decoded instruction whose opcode byte is at PC.
///
/// BRK is reported without being executed. Errors are raised before any state is modified.
pub(crate) fn execute(
    cpu: &mut CpuState,
    descriptor: OpcodeDescriptor,
) -> Result<StepOutcome, CpuError> {
    let OpcodeDescriptor { operation, mode, .. } = descriptor;

    if !handles_mode(operation, mode) {
        return Err(CpuError::UnimplementedAddressingMode {
            operation,
            mode,
            address: cpu.registers.pc,
        });
    }

    if operation == Operation::Brk {
        return Ok(StepOutcome::Break);
    }

    // Consume the opcode byte; operand bytes are consumed by the resolver
    cpu.registers.pc = cpu.registers.pc.wrapping_add(1);

    let status = cpu.registers.status;
    match operation {
        Operation::Lda => load(cpu, mode, Register::Accumulator),
        Operation::Ldx => load(cpu, mode, Register::X),
        Operation::Ldy => load(cpu, mode, Register::Y),
        Operation::Sta => store(cpu, mode, Register::Accumulator),
        Operation::Stx => store(cpu, mode, Register::X),
        Operation::Sty => store(cpu, mode, Register::Y),
        Operation::Tax => transfer(cpu, Register::Accumulator, Register::X),
        Operation::Tay => transfer(cpu, Register::Accumulator, Register::Y),
        Operation::Tsx => transfer(cpu, Register::StackPointer, Register::X),
        Operation::Txa => transfer(cpu, Register::X, Register::Accumulator),
        Operation::Txs => transfer(cpu, Register::X, Register::StackPointer),
        Operation::Tya => transfer(cpu, Register::Y, Register::Accumulator),
        Operation::Pha => cpu.push(cpu.registers.accumulator),
        Operation::Php => cpu.push(cpu.registers.status.to_byte()),
        Operation::Pla => {
            let value = cpu.pull();
            cpu.registers.accumulator = value;
            cpu.registers.status.set_negative_zero(value);
        }
        Operation::Plp => {
            let value = cpu.pull();
            cpu.registers.status = StatusFlags::from_byte(value);
        }
        Operation::Ora => accumulator_op(cpu, mode, or),
        Operation::And => accumulator_op(cpu, mode, and),
        Operation::Eor => accumulator_op(cpu, mode, xor),
        Operation::Adc => accumulator_op(cpu, mode, add),
        Operation::Sbc => accumulator_op(cpu, mode, subtract),
        Operation::Cmp => compare_register(cpu, mode, Register::Accumulator),
        Operation::Cpx => compare_register(cpu, mode, Register::X),
        Operation::Cpy => compare_register(cpu, mode, Register::Y),
        Operation::Bit => {
            let value = read_operand(cpu, mode);
            bit_test(cpu.registers.accumulator, value, &mut cpu.registers.status);
        }
        Operation::Asl => modify(cpu, mode, shift_left),
        Operation::Lsr => modify(cpu, mode, logical_shift_right),
        Operation::Rol => modify(cpu, mode, rotate_left),
        Operation::Ror => modify(cpu, mode, rotate_right),
        Operation::Inc => modify(cpu, mode, increment),
        Operation::Dec => modify(cpu, mode, decrement),
        Operation::Inx => modify_register(cpu, Register::X, increment),
        Operation::Iny => modify_register(cpu, Register::Y, increment),
        Operation::Dex => modify_register(cpu, Register::X, decrement),
        Operation::Dey => modify_register(cpu, Register::Y, decrement),
        Operation::Bcc => branch(cpu, mode, !status.carry),
        Operation::Bcs => branch(cpu, mode, status.carry),
        Operation::Beq => branch(cpu, mode, status.zero),
        Operation::Bmi => branch(cpu, mode, status.negative),
        Operation::Bne => branch(cpu, mode, !status.zero),
        Operation::Bpl => branch(cpu, mode, !status.negative),
        Operation::Bvc => branch(cpu, mode, !status.overflow),
        Operation::Bvs => branch(cpu, mode, status.overflow),
        Operation::Jmp => {
            let target = resolve(mode, cpu).address;
            cpu.registers.pc = target;
        }
        Operation::Jsr => jsr(cpu, mode),
        Operation::Rts => rts(cpu),
        Operation::Rti => rti(cpu),
        Operation::Clc => cpu.registers.status.carry = false,
        Operation::Cld => cpu.registers.status.decimal = false,
        Operation::Cli => cpu.registers.status.interrupt_disable = false,
        Operation::Clv => cpu.registers.status.overflow = false,
        Operation::Sec => cpu.registers.status.carry = true,
        Operation::Sed => cpu.registers.status.decimal = true,
        Operation::Sei => cpu.registers.status.interrupt_disable = true,
        Operation::Nop | Operation::Brk => {}
    }

    Ok(StepOutcome::Executed(descriptor))
}

fn read_operand(cpu: &mut CpuState, mode: AddressingMode) -> u8 {
    let address = resolve(mode, cpu).address;
    cpu.read(address)
}

// LDA, LDX, LDY
fn load(cpu: &mut CpuState, mode: AddressingMode, register: Register) {
    let value = read_operand(cpu, mode);
    cpu.registers.write(register, value);
    cpu.registers.status.set_negative_zero(value);
}

// STA, STX, STY
fn store(cpu: &mut CpuState, mode: AddressingMode, register: Register) {
    let address = resolve(mode, cpu).address;
    cpu.write(address, cpu.registers.read(register));
}

// TAX, TAY, TSX, TXA, TXS, TYA
fn transfer(cpu: &mut CpuState, from: Register, to: Register) {
    let value = cpu.registers.read(from);
    cpu.registers.write(to, value);

    if to != Register::StackPointer {
        cpu.registers.status.set_negative_zero(value);
    }
}

// ORA, AND, EOR, ADC, SBC
fn accumulator_op(
    cpu: &mut CpuState,
    mode: AddressingMode,
    op: fn(u8, u8, &mut StatusFlags) -> u8,
) {
    let value = read_operand(cpu, mode);
    cpu.registers.accumulator = op(cpu.registers.accumulator, value, &mut cpu.registers.status);
}

// CMP, CPX, CPY
fn compare_register(cpu: &mut CpuState, mode: AddressingMode, register: Register) {
    let value = read_operand(cpu, mode);
    compare(cpu.registers.read(register), value, &mut cpu.registers.status);
}

// ASL, LSR, ROL, ROR, INC, DEC; Implicit mode targets the accumulator
fn modify(cpu: &mut CpuState, mode: AddressingMode, op: fn(u8, &mut StatusFlags) -> u8) {
    if mode == AddressingMode::Implicit {
        modify_register(cpu, Register::Accumulator, op);
        return;
    }

    let address = resolve(mode, cpu).address;
    let value = op(cpu.read(address), &mut cpu.registers.status);
    cpu.write(address, value);
}

// INX, INY, DEX, DEY
fn modify_register(cpu: &mut CpuState, register: Register, op: fn(u8, &mut StatusFlags) -> u8) {
    let value = op(cpu.registers.read(register), &mut cpu.registers.status);
    cpu.registers.write(register, value);
}

// BCC, BCS, BEQ, BMI, BNE, BPL, BVC, BVS
fn branch(cpu: &mut CpuState, mode: AddressingMode, condition: bool) {
    let target = resolve(mode, cpu).address;
    if condition {
        cpu.registers.pc = target;
    }
}

// JSR (jump to subroutine)
fn jsr(cpu: &mut CpuState, mode: AddressingMode) {
    let resolved = resolve(mode, cpu);

    // Pushed value is the address of the last byte of the JSR instruction
    let return_address = resolved.next_pc.wrapping_sub(1);
    cpu.push(return_address.msb());
    cpu.push(return_address.lsb());

    cpu.registers.pc = resolved.address;
}

// RTS (return from subroutine)
fn rts(cpu: &mut CpuState) {
    let lsb = cpu.pull();
    let msb = cpu.pull();
    cpu.registers.pc = u16::from_le_bytes([lsb, msb]).wrapping_add(1);
}

// RTI (return from interrupt)
fn rti(cpu: &mut CpuState) {
    let status = cpu.pull();
    cpu.registers.status = StatusFlags::from_byte(status);

    let lsb = cpu.pull();
    let msb = cpu.pull();
    cpu.registers.pc = u16::from_le_bytes([lsb, msb]);
}

fn add(accumulator: u8, value: u8, flags: &mut StatusFlags) -> u8 {
    let sum = u16::from(accumulator) + u16::from(value) + u16::from(flags.carry);
    let result = sum as u8;

    // Operands share a sign and the result's sign differs
    let overflow = (accumulator ^ result) & (value ^ result) & 0x80 != 0;

    flags.set_negative_zero(result).set_overflow(overflow).set_carry(sum > 0xFF);

    result
}

fn subtract(accumulator: u8, value: u8, flags: &mut StatusFlags) -> u8 {
    // Carry flag is inverted in subtraction
    let borrow = u16::from(!flags.carry);
    let difference = u16::from(accumulator).wrapping_sub(u16::from(value)).wrapping_sub(borrow);
    let result = difference as u8;

    // Operands have different signs and the result's sign differs from the accumulator's
    let overflow = (accumulator ^ value) & (accumulator ^ result) & 0x80 != 0;

    flags
        .set_negative_zero(result)
        .set_overflow(overflow)
        .set_carry(u16::from(accumulator) >= u16::from(value) + borrow);

    result
}

fn and(accumulator: u8, value: u8, flags: &mut StatusFlags) -> u8 {
    let result = accumulator & value;
    flags.set_negative_zero(result);
    result
}

fn or(accumulator: u8, value: u8, flags: &mut StatusFlags) -> u8 {
    let result = accumulator | value;
    flags.set_negative_zero(result);
    result
}

fn xor(accumulator: u8, value: u8, flags: &mut StatusFlags) -> u8 {
    let result = accumulator ^ value;
    flags.set_negative_zero(result);
    result
}

// N and V are copied from operand bits 7 and 6
fn bit_test(accumulator: u8, value: u8, flags: &mut StatusFlags) {
    flags.set_negative_zero(value).set_zero(accumulator & value == 0).set_overflow(value.bit(6));
}

fn compare(register: u8, value: u8, flags: &mut StatusFlags) {
    let (difference, borrow) = register.overflowing_sub(value);
    flags.set_negative_zero(difference).set_carry(!borrow);
}

fn shift_left(value: u8, flags: &mut StatusFlags) -> u8 {
    let shifted = value << 1;
    flags.set_carry(value.bit(7)).set_negative_zero(shifted);
    shifted
}

fn logical_shift_right(value: u8, flags: &mut StatusFlags) -> u8 {
    let shifted = value >> 1;
    flags.set_carry(value.bit(0)).set_negative_zero(shifted);
    shifted
}

fn rotate_left(value: u8, flags: &mut StatusFlags) -> u8 {
    let rotated = (value << 1) | u8::from(flags.carry);
    flags.set_carry(value.bit(7)).set_negative_zero(rotated);
    rotated
}

fn rotate_right(value: u8, flags: &mut StatusFlags) -> u8 {
    let rotated = (value >> 1) | (u8::from(flags.carry) << 7);
    flags.set_carry(value.bit(0)).set_negative_zero(rotated);
    rotated
}

fn increment(value: u8, flags: &mut StatusFlags) -> u8 {
    let incremented = value.wrapping_add(1);
    flags.set_negative_zero(incremented);
    incremented
}

fn decrement(value: u8, flags: &mut StatusFlags) -> u8 {
    let decremented = value.wrapping_sub(1);
    flags.set_negative_zero(decremented);
    decremented
}
