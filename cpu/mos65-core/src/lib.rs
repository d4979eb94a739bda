pub mod addressing;
pub mod dump;
mod instructions;
pub mod opcodes;
pub mod serialize;


use crate::opcodes::{AddressingMode, OpcodeDescriptor, Operation};
use bincode::{Decode, Encode};
use mos65_common::boxedarray::BoxedByteArray;
use mos65_common::num::GetBit;
use thiserror::Error;

pub const MEMORY_LEN: usize = 0x10000;

/// The stack always lives in page 1 ($0100-$01FF).
pub const STACK_PAGE: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct StatusFlags {
    pub negative: bool,
    pub overflow: bool,
    pub unused: bool,
    pub break_flag: bool,
    pub decimal: bool,
    pub interrupt_disable: bool,
    pub zero: bool,
    pub carry: bool,
}

impl StatusFlags {
    /// Power-on flags: only the unused bit 5 is set.
    #[must_use]
    pub fn new() -> Self {
        Self::from_byte(0x20)
    }

    pub fn set_negative(&mut self, negative: bool) -> &mut Self {
        self.negative = negative;
        self
    }

    pub fn set_overflow(&mut self, overflow: bool) -> &mut Self {
        self.overflow = overflow;
        self
    }

    pub fn set_zero(&mut self, zero: bool) -> &mut Self {
        self.zero = zero;
        self
    }

    pub fn set_carry(&mut self, carry: bool) -> &mut Self {
        self.carry = carry;
        self
    }

    /// Update N and Z from a result value.
    pub fn set_negative_zero(&mut self, value: u8) -> &mut Self {
        self.set_negative(value.bit(7)).set_zero(value == 0)
    }

    #[must_use]
    pub fn to_byte(self) -> u8 {
        (u8::from(self.negative) << 7)
            | (u8::from(self.overflow) << 6)
            | (u8::from(self.unused) << 5)
            | (u8::from(self.break_flag) << 4)
            | (u8::from(self.decimal) << 3)
            | (u8::from(self.interrupt_disable) << 2)
            | (u8::from(self.zero) << 1)
            | u8::from(self.carry)
    }

    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        Self {
            negative: byte.bit(7),
            overflow: byte.bit(6),
            unused: byte.bit(5),
            break_flag: byte.bit(4),
            decimal: byte.bit(3),
            interrupt_disable: byte.bit(2),
            zero: byte.bit(1),
            carry: byte.bit(0),
        }
    }
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies one of the 8-bit registers that instructions move values between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Accumulator,
    X,
    Y,
    StackPointer,
}

impl Register {
    pub const ALL: [Self; 4] = [Self::Accumulator, Self::X, Self::Y, Self::StackPointer];
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct CpuRegisters {
    pub accumulator: u8,
    pub x: u8,
    pub y: u8,
    pub status: StatusFlags,
    pub pc: u16,
    pub sp: u8,
}

impl CpuRegisters {
    #[must_use]
    pub fn new(pc: u16) -> Self {
        Self { accumulator: 0, x: 0, y: 0, status: StatusFlags::new(), pc, sp: 0xFF }
    }

    #[inline]
    #[must_use]
    pub fn read(&self, register: Register) -> u8 {
        match register {
            Register::Accumulator => self.accumulator,
            Register::X => self.x,
            Register::Y => self.y,
            Register::StackPointer => self.sp,
        }
    }

    #[inline]
    pub fn write(&mut self, register: Register, value: u8) {
        match register {
            Register::Accumulator => self.accumulator = value,
            Register::X => self.x = value,
            Register::Y => self.y = value,
            Register::StackPointer => self.sp = value,
        }
    }
}

impl Default for CpuRegisters {
    fn default() -> Self {
        Self::new(0x0000)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("Invalid opcode ${opcode:02X} at ${address:04X}")]
    InvalidOpcode { opcode: u8, address: u16 },
    #[error(
        "Addressing mode {mode:?} is not implemented for '{operation}' (opcode at ${address:04X})"
    )]
    UnimplementedAddressingMode { operation: Operation, mode: AddressingMode, address: u16 },
}

/// Result of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Executed(OpcodeDescriptor),
    /// A BRK opcode was fetched. It is not executed; PC is left pointing at it.
    Break,
}

/// Conditions under which [`CpuState::run`] stops besides BRK and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunLimits {
    /// Stop before fetching an instruction at this address.
    pub halt_address: Option<u16>,
    /// Stop after executing this many instructions.
    pub max_instructions: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Break { address: u16 },
    HaltAddress { address: u16 },
    InstructionLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub reason: StopReason,
    pub instructions_executed: u64,
}

/// Complete processor state: registers plus the full 64KB address space.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct CpuState {
    registers: CpuRegisters,
    memory: BoxedByteArray<MEMORY_LEN>,
}

impl CpuState {
    #[must_use]
    pub fn new(registers: CpuRegisters) -> Self {
        Self { registers, memory: BoxedByteArray::new() }
    }

    #[inline]
    #[must_use]
    pub fn registers(&self) -> &CpuRegisters {
        &self.registers
    }

    #[inline]
    pub fn registers_mut(&mut self) -> &mut CpuRegisters {
        &mut self.registers
    }

    pub fn set_registers(&mut self, registers: CpuRegisters) {
        self.registers = registers;
    }

    #[inline]
    #[must_use]
    pub fn pc(&self) -> u16 {
        self.registers.pc
    }

    #[inline]
    #[must_use]
    pub fn memory(&self) -> &[u8; MEMORY_LEN] {
        &self.memory
    }

    #[inline]
    #[must_use]
    pub fn read(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    #[inline]
    pub fn write(&mut self, address: u16, value: u8) {
        self.memory[address as usize] = value;
    }

    /// Read a little-endian word. The high byte address wraps from $FFFF to $0000.
    #[inline]
    #[must_use]
    pub fn read_u16(&self, address: u16) -> u16 {
        u16::from_le_bytes([self.read(address), self.read(address.wrapping_add(1))])
    }

    /// Read a little-endian pointer from page 0; the high byte wraps within the zero page.
    #[inline]
    #[must_use]
    pub fn read_zero_page_u16(&self, address: u8) -> u16 {
        u16::from_le_bytes([self.read(address.into()), self.read(address.wrapping_add(1).into())])
    }

    /// Copy bytes into memory starting at `address`, wrapping at the end of the address space.
    pub fn write_bytes(&mut self, address: u16, bytes: &[u8]) {
        let mut address = address;
        for &byte in bytes {
            self.write(address, byte);
            address = address.wrapping_add(1);
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, value: u8) {
        let address = u16::from_be_bytes([STACK_PAGE, self.registers.sp]);
        self.write(address, value);
        self.registers.sp = self.registers.sp.wrapping_sub(1);
    }

    #[inline]
    pub(crate) fn pull(&mut self) -> u8 {
        self.registers.sp = self.registers.sp.wrapping_add(1);
        self.read(u16::from_be_bytes([STACK_PAGE, self.registers.sp]))
    }

    /// Fetch, decode, and execute one instruction.
    ///
    /// On error the PC is left pointing at the offending opcode and no other state is modified.
    ///
    /// # Errors
    ///
    /// Returns an error if the opcode is invalid or its handler cannot serve its addressing mode.
    pub fn step(&mut self) -> Result<StepOutcome, CpuError> {
        let address = self.registers.pc;
        let opcode = self.read(address);

        let Some(descriptor) = opcodes::lookup(opcode) else {
            log::debug!("Invalid opcode {opcode:02X} fetched at {address:04X}");
            return Err(CpuError::InvalidOpcode { opcode, address });
        };

        log::trace!("{address:04X}: {} ({opcode:02X})", descriptor.mnemonic);

        instructions::execute(self, descriptor)
    }

    /// Execute instructions until BRK, a run limit, or an error.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by [`Self::step`].
    pub fn run(&mut self, limits: RunLimits) -> Result<RunSummary, CpuError> {
        let mut instructions_executed = 0;

        let reason = loop {
            if limits.halt_address == Some(self.registers.pc) {
                break StopReason::HaltAddress { address: self.registers.pc };
            }

            if limits.max_instructions.is_some_and(|max| instructions_executed >= max) {
                break StopReason::InstructionLimit;
            }

            match self.step()? {
                StepOutcome::Executed(_) => instructions_executed += 1,
                StepOutcome::Break => break StopReason::Break { address: self.registers.pc },
            }
        };

        log::debug!(
            "Run stopped after {instructions_executed} instructions at {:04X}: {reason:?}",
            self.registers.pc
        );

        Ok(RunSummary { reason, instructions_executed })
    }
}

impl Default for CpuState {
    fn default() -> Self {
        Self::new(CpuRegisters::default())
    }
}
