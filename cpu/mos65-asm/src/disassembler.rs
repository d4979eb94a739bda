//! Listing-style disassembly of 6502 machine code.

#[cfg(test)]
mod tests;

use mos65_core::MEMORY_LEN;
use mos65_core::opcodes::{self, AddressingMode, OpcodeDescriptor};
use std::fmt::{Display, Formatter, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub address: u16,
    pub bytes: Vec<u8>,
    /// `None` for an invalid opcode, which occupies a single byte.
    pub descriptor: Option<OpcodeDescriptor>,
    /// Decoded operand value; for branches this is the absolute target address.
    pub operand: u16,
}

impl Instruction {
    #[must_use]
    pub fn decode(memory: &[u8; MEMORY_LEN], address: u16) -> Self {
        let read = |offset: u16| memory[address.wrapping_add(offset) as usize];

        let opcode = read(0);
        let Some(descriptor) = opcodes::lookup(opcode) else {
            return Self { address, bytes: vec![opcode], descriptor: None, operand: 0 };
        };

        let bytes: Vec<u8> = (0..descriptor.instruction_len()).map(read).collect();
        let operand = match descriptor.mode {
            AddressingMode::Implicit => 0,
            AddressingMode::Relative => {
                address.wrapping_add(2).wrapping_add_signed(i16::from(bytes[1] as i8))
            }
            _ if bytes.len() == 2 => bytes[1].into(),
            _ => u16::from_le_bytes([bytes[1], bytes[2]]),
        };

        Self { address, bytes, descriptor: Some(descriptor), operand }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Address of the following instruction.
    #[must_use]
    pub fn next_address(&self) -> u16 {
        self.address.wrapping_add(self.bytes.len() as u16)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Some(descriptor) = self.descriptor else {
            return f.write_str("???");
        };

        let mnemonic = descriptor.mnemonic;
        let operand = self.operand;
        match descriptor.mode {
            AddressingMode::Implicit => f.write_str(mnemonic),
            AddressingMode::Immediate => write!(f, "{mnemonic} #${operand:02X}"),
            AddressingMode::Absolute => write!(f, "{mnemonic} ${operand:04X}"),
            AddressingMode::AbsoluteX => write!(f, "{mnemonic} ${operand:04X},X"),
            AddressingMode::AbsoluteY => write!(f, "{mnemonic} ${operand:04X},Y"),
            AddressingMode::ZeroPage => write!(f, "{mnemonic} ${operand:02X}"),
            AddressingMode::ZeroPageX => write!(f, "{mnemonic} ${operand:02X},X"),
            AddressingMode::ZeroPageY => write!(f, "{mnemonic} ${operand:02X},Y"),
            AddressingMode::IndexedIndirectX => write!(f, "{mnemonic} (${operand:02X},X)"),
            AddressingMode::IndirectIndexedY => write!(f, "{mnemonic} (${operand:02X}),Y"),
            AddressingMode::Indirect => write!(f, "{mnemonic} (${operand:04X})"),
            AddressingMode::Relative => write!(f, "{mnemonic} ${operand:04X},PC"),
        }
    }
}

/// Decode instructions starting at `start` for as long as the instruction start lies within
/// `len` bytes of `start`. The final instruction may extend past that range.
#[must_use]
pub fn disassemble(memory: &[u8; MEMORY_LEN], start: u16, len: usize) -> Vec<Instruction> {
    let mut instructions = Vec::new();

    let mut offset = 0;
    while offset < len {
        let instruction = Instruction::decode(memory, start.wrapping_add(offset as u16));
        offset += instruction.len();
        instructions.push(instruction);
    }

    instructions
}

/// Mnemonic and operand, e.g. `lda #$FA`.
#[must_use]
pub fn format_instruction(instruction: &Instruction) -> String {
    instruction.to_string()
}

/// Full listing line: address and raw bytes padded to a 16 column field, then the instruction.
#[must_use]
pub fn format_line(instruction: &Instruction) -> String {
    let mut data = format!(".{:04X}  ", instruction.address);
    for byte in &instruction.bytes {
        let _ = write!(data, "{byte:02X} ");
    }

    format!("{data:<16} {instruction}")
}

#[must_use]
pub fn listing(memory: &[u8; MEMORY_LEN], start: u16, len: usize) -> String {
    disassemble(memory, start, len).iter().fold(String::new(), |mut out, instruction| {
        out.push_str(&format_line(instruction));
        out.push('\n');
        out
    })
}
