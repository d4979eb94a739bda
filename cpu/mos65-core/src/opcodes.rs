//! Static opcode table for the official NMOS 6502 instruction set.
//!
//! The table is plain data indexed by opcode byte. Entries that are `None` are invalid opcodes;
//! this includes every undocumented opcode.


use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Implicit,
    Immediate,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    IndexedIndirectX,
    IndirectIndexedY,
    Indirect,
    Relative,
}

impl AddressingMode {
    pub const ALL: [Self; 12] = [
        Self::Implicit,
        Self::Immediate,
        Self::Absolute,
        Self::AbsoluteX,
        Self::AbsoluteY,
        Self::ZeroPage,
        Self::ZeroPageX,
        Self::ZeroPageY,
        Self::IndexedIndirectX,
        Self::IndirectIndexedY,
        Self::Indirect,
        Self::Relative,
    ];

    /// Number of operand bytes that follow the opcode byte.
    #[inline]
    #[must_use]
    pub const fn operand_len(self) -> u16 {
        match self {
            Self::Implicit => 0,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::IndexedIndirectX
            | Self::IndirectIndexedY
            | Self::Relative => 1,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 2,
        }
    }
}

macro_rules! define_operations {
    ($($variant:ident => $mnemonic:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Operation {
            $($variant,)+
        }

        impl Operation {
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Lowercase assembler mnemonic.
            #[must_use]
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(Self::$variant => $mnemonic,)+
                }
            }

            /// Case-insensitive mnemonic lookup.
            #[must_use]
            pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
                $(
                    if mnemonic.eq_ignore_ascii_case($mnemonic) {
                        return Some(Self::$variant);
                    }
                )+
                None
            }
        }
    };
}

define_operations!(
    Adc => "adc",
    And => "and",
    Asl => "asl",
    Bcc => "bcc",
    Bcs => "bcs",
    Beq => "beq",
    Bit => "bit",
    Bmi => "bmi",
    Bne => "bne",
    Bpl => "bpl",
    Brk => "brk",
    Bvc => "bvc",
    Bvs => "bvs",
    Clc => "clc",
    Cld => "cld",
    Cli => "cli",
    Clv => "clv",
    Cmp => "cmp",
    Cpx => "cpx",
    Cpy => "cpy",
    Dec => "dec",
    Dex => "dex",
    Dey => "dey",
    Eor => "eor",
    Inc => "inc",
    Inx => "inx",
    Iny => "iny",
    Jmp => "jmp",
    Jsr => "jsr",
    Lda => "lda",
    Ldx => "ldx",
    Ldy => "ldy",
    Lsr => "lsr",
    Nop => "nop",
    Ora => "ora",
    Pha => "pha",
    Php => "php",
    Pla => "pla",
    Plp => "plp",
    Rol => "rol",
    Ror => "ror",
    Rti => "rti",
    Rts => "rts",
    Sbc => "sbc",
    Sec => "sec",
    Sed => "sed",
    Sei => "sei",
    Sta => "sta",
    Stx => "stx",
    Sty => "sty",
    Tax => "tax",
    Tay => "tay",
    Tsx => "tsx",
    Txa => "txa",
    Txs => "txs",
    Tya => "tya",
);

impl Operation {
    #[must_use]
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Self::Bcc
                | Self::Bcs
                | Self::Beq
                | Self::Bmi
                | Self::Bne
                | Self::Bpl
                | Self::Bvc
                | Self::Bvs
        )
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeDescriptor {
    pub opcode: u8,
    pub mode: AddressingMode,
    pub operation: Operation,
    pub mnemonic: &'static str,
}

impl OpcodeDescriptor {
    /// Total instruction length in bytes, including the opcode byte.
    #[inline]
    #[must_use]
    pub const fn instruction_len(self) -> u16 {
        1 + self.mode.operand_len()
    }
}

const OFFICIAL_OPCODES: &[(u8, Operation, AddressingMode)] = {
    use AddressingMode::*;
    use Operation::*;

    &[
        // Load / store
        (0xA9, Lda, Immediate),
        (0xA5, Lda, ZeroPage),
        (0xB5, Lda, ZeroPageX),
        (0xAD, Lda, Absolute),
        (0xBD, Lda, AbsoluteX),
        (0xB9, Lda, AbsoluteY),
        (0xA1, Lda, IndexedIndirectX),
        (0xB1, Lda, IndirectIndexedY),
        (0xA2, Ldx, Immediate),
        (0xA6, Ldx, ZeroPage),
        (0xB6, Ldx, ZeroPageY),
        (0xAE, Ldx, Absolute),
        (0xBE, Ldx, AbsoluteY),
        (0xA0, Ldy, Immediate),
        (0xA4, Ldy, ZeroPage),
        (0xB4, Ldy, ZeroPageX),
        (0xAC, Ldy, Absolute),
        (0xBC, Ldy, AbsoluteX),
        (0x85, Sta, ZeroPage),
        (0x95, Sta, ZeroPageX),
        (0x8D, Sta, Absolute),
        (0x9D, Sta, AbsoluteX),
        (0x99, Sta, AbsoluteY),
        (0x81, Sta, IndexedIndirectX),
        (0x91, Sta, IndirectIndexedY),
        (0x86, Stx, ZeroPage),
        (0x96, Stx, ZeroPageY),
        (0x8E, Stx, Absolute),
        (0x84, Sty, ZeroPage),
        (0x94, Sty, ZeroPageX),
        (0x8C, Sty, Absolute),
        // Register transfers
        (0xAA, Tax, Implicit),
        (0x8A, Txa, Implicit),
        (0xA8, Tay, Implicit),
        (0x98, Tya, Implicit),
        (0xBA, Tsx, Implicit),
        (0x9A, Txs, Implicit),
        // Stack
        (0x48, Pha, Implicit),
        (0x08, Php, Implicit),
        (0x68, Pla, Implicit),
        (0x28, Plp, Implicit),
        // Logic
        (0x09, Ora, Immediate),
        (0x05, Ora, ZeroPage),
        (0x15, Ora, ZeroPageX),
        (0x0D, Ora, Absolute),
        (0x1D, Ora, AbsoluteX),
        (0x19, Ora, AbsoluteY),
        (0x01, Ora, IndexedIndirectX),
        (0x11, Ora, IndirectIndexedY),
        (0x29, And, Immediate),
        (0x25, And, ZeroPage),
        (0x35, And, ZeroPageX),
        (0x2D, And, Absolute),
        (0x3D, And, AbsoluteX),
        (0x39, And, AbsoluteY),
        (0x21, And, IndexedIndirectX),
        (0x31, And, IndirectIndexedY),
        (0x49, Eor, Immediate),
        (0x45, Eor, ZeroPage),
        (0x55, Eor, ZeroPageX),
        (0x4D, Eor, Absolute),
        (0x5D, Eor, AbsoluteX),
        (0x59, Eor, AbsoluteY),
        (0x41, Eor, IndexedIndirectX),
        (0x51, Eor, IndirectIndexedY),
        (0x24, Bit, ZeroPage),
        (0x2C, Bit, Absolute),
        // Arithmetic
        (0x69, Adc, Immediate),
        (0x65, Adc, ZeroPage),
        (0x75, Adc, ZeroPageX),
        (0x6D, Adc, Absolute),
        (0x7D, Adc, AbsoluteX),
        (0x79, Adc, AbsoluteY),
        (0x61, Adc, IndexedIndirectX),
        (0x71, Adc, IndirectIndexedY),
        (0xE9, Sbc, Immediate),
        (0xE5, Sbc, ZeroPage),
        (0xF5, Sbc, ZeroPageX),
        (0xED, Sbc, Absolute),
        (0xFD, Sbc, AbsoluteX),
        (0xF9, Sbc, AbsoluteY),
        (0xE1, Sbc, IndexedIndirectX),
        (0xF1, Sbc, IndirectIndexedY),
        // Compare
        (0xC9, Cmp, Immediate),
        (0xC5, Cmp, ZeroPage),
        (0xD5, Cmp, ZeroPageX),
        (0xCD, Cmp, Absolute),
        (0xDD, Cmp, AbsoluteX),
        (0xD9, Cmp, AbsoluteY),
        (0xC1, Cmp, IndexedIndirectX),
        (0xD1, Cmp, IndirectIndexedY),
        (0xE0, Cpx, Immediate),
        (0xE4, Cpx, ZeroPage),
        (0xEC, Cpx, Absolute),
        (0xC0, Cpy, Immediate),
        (0xC4, Cpy, ZeroPage),
        (0xCC, Cpy, Absolute),
        // Increment / decrement
        (0xE6, Inc, ZeroPage),
        (0xF6, Inc, ZeroPageX),
        (0xEE, Inc, Absolute),
        (0xFE, Inc, AbsoluteX),
        (0xE8, Inx, Implicit),
        (0xC8, Iny, Implicit),
        (0xC6, Dec, ZeroPage),
        (0xD6, Dec, ZeroPageX),
        (0xCE, Dec, Absolute),
        (0xDE, Dec, AbsoluteX),
        (0xCA, Dex, Implicit),
        (0x88, Dey, Implicit),
        // Shifts; the Implicit forms operate on the accumulator
        (0x0A, Asl, Implicit),
        (0x06, Asl, ZeroPage),
        (0x16, Asl, ZeroPageX),
        (0x0E, Asl, Absolute),
        (0x1E, Asl, AbsoluteX),
        (0x4A, Lsr, Implicit),
        (0x46, Lsr, ZeroPage),
        (0x56, Lsr, ZeroPageX),
        (0x4E, Lsr, Absolute),
        (0x5E, Lsr, AbsoluteX),
        (0x2A, Rol, Implicit),
        (0x26, Rol, ZeroPage),
        (0x36, Rol, ZeroPageX),
        (0x2E, Rol, Absolute),
        (0x3E, Rol, AbsoluteX),
        (0x6A, Ror, Implicit),
        (0x66, Ror, ZeroPage),
        (0x76, Ror, ZeroPageX),
        (0x6E, Ror, Absolute),
        (0x7E, Ror, AbsoluteX),
        // Branches
        (0x10, Bpl, Relative),
        (0x30, Bmi, Relative),
        (0x50, Bvc, Relative),
        (0x70, Bvs, Relative),
        (0x90, Bcc, Relative),
        (0xB0, Bcs, Relative),
        (0xD0, Bne, Relative),
        (0xF0, Beq, Relative),
        // Jumps, calls, returns
        (0x4C, Jmp, Absolute),
        (0x6C, Jmp, Indirect),
        (0x20, Jsr, Absolute),
        (0x60, Rts, Implicit),
        (0x40, Rti, Implicit),
        (0x00, Brk, Implicit),
        // Flags
        (0x18, Clc, Implicit),
        (0x38, Sec, Implicit),
        (0x58, Cli, Implicit),
        (0x78, Sei, Implicit),
        (0xD8, Cld, Implicit),
        (0xF8, Sed, Implicit),
        (0xB8, Clv, Implicit),
        (0xEA, Nop, Implicit),
    ]
};

const fn build_opcode_table() -> [Option<OpcodeDescriptor>; 256] {
    let mut table = [None; 256];

    let mut i = 0;
    while i < OFFICIAL_OPCODES.len() {
        let (opcode, operation, mode) = OFFICIAL_OPCODES[i];
        table[opcode as usize] =
            Some(OpcodeDescriptor { opcode, mode, operation, mnemonic: operation.mnemonic() });
        i += 1;
    }

    table
}

pub static OPCODE_TABLE: [Option<OpcodeDescriptor>; 256] = build_opcode_table();

/// Look up the descriptor for an opcode byte. `None` means the opcode is invalid.
#[inline]
#[must_use]
pub fn lookup(opcode: u8) -> Option<OpcodeDescriptor> {
    OPCODE_TABLE[opcode as usize]
}

/// Reverse lookup used by the assembler.
#[must_use]
pub fn find_opcode(operation: Operation, mode: AddressingMode) -> Option<u8> {
    OPCODE_TABLE
        .iter()
        .flatten()
        .find(|descriptor| descriptor.operation == operation && descriptor.mode == mode)
        .map(|descriptor| descriptor.opcode)
}
