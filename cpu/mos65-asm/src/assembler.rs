//! Line-oriented 6502 assembler.
//!
//! Each line has the form `[label[:]] [mnemonic|directive [operand]] [; comment]`. Supported
//! directives are `org <address>` and `byte <value>[,<value>...]`. Values are written as `$hex`,
//! decimal, `%binary`, or a label name. Operands use the same syntax that the disassembler prints.
//!
//! Operands that name a label which is not yet defined are emitted as zero placeholders and
//! patched once the label is defined.

#[cfg(test)]
mod tests;

use crate::symbols::SymbolTable;
use mos65_core::CpuState;
use mos65_core::opcodes::{self, AddressingMode, Operation};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmErrorKind {
    #[error("unknown mnemonic '{0}'")]
    UnknownMnemonic(String),
    #[error("'{mnemonic}' does not accept operand '{operand}'")]
    UnsupportedOperand { mnemonic: String, operand: String },
    #[error("malformed value '{0}'")]
    MalformedValue(String),
    #[error("value ${value:X} is out of range")]
    ValueOutOfRange { value: u32 },
    #[error("symbol '{0}' is already defined")]
    DuplicateSymbol(String),
    #[error("symbol '{0}' is not defined")]
    UndefinedSymbol(String),
    #[error("branch target ${target:04X} is out of range")]
    BranchOutOfRange { target: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct AsmError {
    /// 1-based source line number
    pub line: usize,
    pub kind: AsmErrorKind,
}

/// A contiguous run of assembled bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: u16,
    pub len: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub segments: Vec<Segment>,
    pub errors: Vec<AsmError>,
}

impl Assembly {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Start of the first assembled segment.
    #[must_use]
    pub fn entry_point(&self) -> Option<u16> {
        self.segments.first().map(|segment| segment.start)
    }
}

static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
static VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\$([0-9A-Fa-f]+)|%([01]+)|([0-9]+)|([A-Za-z_][A-Za-z0-9_]*))$").unwrap()
});
static INDEXED_INDIRECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\((.+),x\)$").unwrap());
static INDIRECT_INDEXED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\((.+)\),y$").unwrap());
static INDIRECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\((.+)\)$").unwrap());
static INDEXED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(.+),(x|y|pc)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Literal(u32),
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    None,
    Accumulator,
    Immediate(Value),
    Direct(Value),
    IndexedX(Value),
    IndexedY(Value),
    // `$XXXX,PC`, as printed by the disassembler for branches
    ProgramCounter(Value),
    IndexedIndirectX(Value),
    IndirectIndexedY(Value),
    Indirect(Value),
}

#[derive(Debug)]
struct Label {
    name: String,
    global: bool,
}

#[derive(Debug)]
enum Body {
    Org(Value),
    Bytes(Vec<Value>),
    Instruction { operation: Operation, operand: Operand, operand_text: String },
}

#[derive(Debug, Default)]
struct Statement {
    label: Option<Label>,
    body: Option<Body>,
}

fn is_keyword(token: &str) -> bool {
    token.eq_ignore_ascii_case("org")
        || token.eq_ignore_ascii_case("byte")
        || Operation::from_mnemonic(token).is_some()
}

fn parse_value(text: &str) -> Result<Value, AsmErrorKind> {
    let malformed = || AsmErrorKind::MalformedValue(text.into());

    let captures = VALUE_RE.captures(text).ok_or_else(malformed)?;
    let parse = |digits: &str, radix| u32::from_str_radix(digits, radix).map_err(|_| malformed());

    if let Some(hex) = captures.get(1) {
        parse(hex.as_str(), 16).map(Value::Literal)
    } else if let Some(binary) = captures.get(2) {
        parse(binary.as_str(), 2).map(Value::Literal)
    } else if let Some(decimal) = captures.get(3) {
        parse(decimal.as_str(), 10).map(Value::Literal)
    } else if let Some(symbol) = captures.get(4) {
        Ok(Value::Symbol(symbol.as_str().into()))
    } else {
        Err(malformed())
    }
}

fn parse_operand(text: &str) -> Result<Operand, AsmErrorKind> {
    if text.is_empty() {
        return Ok(Operand::None);
    }

    if let Some(value) = text.strip_prefix('#') {
        return parse_value(value).map(Operand::Immediate);
    }

    if let Some(captures) = INDEXED_INDIRECT_RE.captures(text) {
        return parse_value(&captures[1]).map(Operand::IndexedIndirectX);
    }

    if let Some(captures) = INDIRECT_INDEXED_RE.captures(text) {
        return parse_value(&captures[1]).map(Operand::IndirectIndexedY);
    }

    if let Some(captures) = INDIRECT_RE.captures(text) {
        return parse_value(&captures[1]).map(Operand::Indirect);
    }

    if let Some(captures) = INDEXED_RE.captures(text) {
        let value = parse_value(&captures[1])?;
        let operand = match captures[2].to_ascii_lowercase().as_str() {
            "x" => Operand::IndexedX(value),
            "y" => Operand::IndexedY(value),
            _ => Operand::ProgramCounter(value),
        };
        return Ok(operand);
    }

    if text.eq_ignore_ascii_case("a") {
        return Ok(Operand::Accumulator);
    }

    parse_value(text).map(Operand::Direct)
}

fn parse_statement(text: &str) -> Result<Statement, AsmErrorKind> {
    let code = text.split(';').next().unwrap_or_default();
    let mut tokens = code.split_whitespace().peekable();

    let Some(&first) = tokens.peek() else {
        return Ok(Statement::default());
    };

    let label = if is_keyword(first) {
        None
    } else {
        tokens.next();

        let (name, global) = match first.strip_suffix(':') {
            Some(name) => (name, true),
            None => (first, false),
        };
        if !LABEL_RE.is_match(name) {
            return Err(AsmErrorKind::UnknownMnemonic(first.into()));
        }

        Some(Label { name: name.into(), global })
    };

    let Some(keyword) = tokens.next() else {
        return Ok(Statement { label, body: None });
    };

    // Operands may contain whitespace, e.g. `($10), y`
    let operand_text: String = tokens.collect();

    let body = if keyword.eq_ignore_ascii_case("org") {
        Body::Org(parse_value(&operand_text)?)
    } else if keyword.eq_ignore_ascii_case("byte") {
        let values = operand_text.split(',').map(parse_value).collect::<Result<_, _>>()?;
        Body::Bytes(values)
    } else {
        let operation = Operation::from_mnemonic(keyword)
            .ok_or_else(|| AsmErrorKind::UnknownMnemonic(keyword.into()))?;
        let operand = parse_operand(&operand_text)?;
        Body::Instruction { operation, operand, operand_text }
    };

    Ok(Statement { label, body: Some(body) })
}

enum Resolution {
    Known(u16),
    Pending(String),
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<u16>;

fn resolve_value(value: &Value, lookup: Lookup<'_>) -> Result<Resolution, AsmErrorKind> {
    match value {
        &Value::Literal(value) => u16::try_from(value)
            .map(Resolution::Known)
            .map_err(|_| AsmErrorKind::ValueOutOfRange { value }),
        Value::Symbol(name) => {
            Ok(lookup(name).map_or_else(|| Resolution::Pending(name.clone()), Resolution::Known))
        }
    }
}

fn byte_value(value: u16) -> Result<u8, AsmErrorKind> {
    u8::try_from(value).map_err(|_| AsmErrorKind::ValueOutOfRange { value: value.into() })
}

fn branch_offset(instruction_end: u16, target: u16) -> Result<u8, AsmErrorKind> {
    let offset = target.wrapping_sub(instruction_end) as i16;
    i8::try_from(offset)
        .map(|offset| offset as u8)
        .map_err(|_| AsmErrorKind::BranchOutOfRange { target })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixupKind {
    Byte,
    Word,
    Relative,
}

#[derive(Debug)]
struct Fixup {
    line: usize,
    address: u16,
    symbol: String,
    kind: FixupKind,
}

#[derive(Debug, Default)]
struct Emission {
    origin: Option<u16>,
    bytes: Vec<u8>,
    // (offset into bytes, symbol, kind)
    fixups: Vec<(u16, String, FixupKind)>,
}

impl Emission {
    fn push_value(
        &mut self,
        value: &Value,
        kind: FixupKind,
        instruction_end: u16,
        lookup: Lookup<'_>,
    ) -> Result<(), AsmErrorKind> {
        match resolve_value(value, lookup)? {
            Resolution::Known(value) => match kind {
                FixupKind::Byte => self.bytes.push(byte_value(value)?),
                FixupKind::Word => self.bytes.extend(value.to_le_bytes()),
                FixupKind::Relative => self.bytes.push(branch_offset(instruction_end, value)?),
            },
            Resolution::Pending(symbol) => {
                self.fixups.push((self.bytes.len() as u16, symbol, kind));
                let placeholder_len = if kind == FixupKind::Word { 2 } else { 1 };
                self.bytes.extend(std::iter::repeat_n(0, placeholder_len));
            }
        }

        Ok(())
    }
}

fn encode_instruction(
    operation: Operation,
    operand: &Operand,
    operand_text: &str,
    address: u16,
    lookup: Lookup<'_>,
) -> Result<Emission, AsmErrorKind> {
    let unsupported = || AsmErrorKind::UnsupportedOperand {
        mnemonic: operation.mnemonic().into(),
        operand: operand_text.into(),
    };
    let supports = |mode| opcodes::find_opcode(operation, mode).is_some();

    // Literals that fit in a byte select zero page; labels select absolute
    let choose = |zero_page, absolute, value: &Value| {
        let small_literal = matches!(value, &Value::Literal(v) if v <= 0xFF);
        if small_literal && supports(zero_page) {
            Ok(zero_page)
        } else if supports(absolute) {
            Ok(absolute)
        } else if supports(zero_page) {
            Ok(zero_page)
        } else {
            Err(unsupported())
        }
    };

    let (mode, value) = match operand {
        Operand::None if supports(AddressingMode::Implicit) => (AddressingMode::Implicit, None),
        Operand::Accumulator
            if matches!(
                operation,
                Operation::Asl | Operation::Lsr | Operation::Rol | Operation::Ror
            ) =>
        {
            (AddressingMode::Implicit, None)
        }
        Operand::Direct(value) | Operand::ProgramCounter(value) if operation.is_branch() => {
            (AddressingMode::Relative, Some(value))
        }
        Operand::Immediate(value) if supports(AddressingMode::Immediate) => {
            (AddressingMode::Immediate, Some(value))
        }
        Operand::Direct(value) => {
            (choose(AddressingMode::ZeroPage, AddressingMode::Absolute, value)?, Some(value))
        }
        Operand::IndexedX(value) => {
            (choose(AddressingMode::ZeroPageX, AddressingMode::AbsoluteX, value)?, Some(value))
        }
        Operand::IndexedY(value) => {
            (choose(AddressingMode::ZeroPageY, AddressingMode::AbsoluteY, value)?, Some(value))
        }
        Operand::IndexedIndirectX(value) if supports(AddressingMode::IndexedIndirectX) => {
            (AddressingMode::IndexedIndirectX, Some(value))
        }
        Operand::IndirectIndexedY(value) if supports(AddressingMode::IndirectIndexedY) => {
            (AddressingMode::IndirectIndexedY, Some(value))
        }
        Operand::Indirect(value) if supports(AddressingMode::Indirect) => {
            (AddressingMode::Indirect, Some(value))
        }
        _ => return Err(unsupported()),
    };

    let opcode = opcodes::find_opcode(operation, mode).ok_or_else(unsupported)?;

    let mut emission = Emission { bytes: vec![opcode], ..Emission::default() };
    if let Some(value) = value {
        let kind = match mode {
            AddressingMode::Relative => FixupKind::Relative,
            _ if mode.operand_len() == 1 => FixupKind::Byte,
            _ => FixupKind::Word,
        };
        let instruction_end = address.wrapping_add(1 + mode.operand_len());
        emission.push_value(value, kind, instruction_end, lookup)?;
    }

    Ok(emission)
}

/// Incremental assembler. Bytes go into the caller's memory and labels into the caller's symbol
/// table; the assembler itself only tracks the current address and unresolved references.
#[derive(Debug)]
pub struct Assembler {
    address: u16,
    segments: Vec<Segment>,
    fixups: Vec<Fixup>,
}

impl Assembler {
    #[must_use]
    pub fn new(origin: u16) -> Self {
        Self { address: origin, segments: Vec::new(), fixups: Vec::new() }
    }

    /// Address at which the next line will be assembled.
    #[must_use]
    pub fn address(&self) -> u16 {
        self.address
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Assemble one line. A line that fails emits nothing and defines no label.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not parse, redefines a symbol, or encodes an operand
    /// that does not fit the addressing mode. References to symbols not yet defined are not errors;
    /// they are recorded and patched by [`Assembler::resolve_fixups`].
    pub fn assemble_line(
        &mut self,
        line: usize,
        text: &str,
        state: &mut CpuState,
        symbols: &mut SymbolTable,
    ) -> Result<(), AsmError> {
        let error = |kind| AsmError { line, kind };

        let statement = parse_statement(text).map_err(error)?;

        let duplicate = statement.label.as_ref().filter(|label| symbols.get(&label.name).is_some());
        if let Some(label) = duplicate {
            return Err(error(AsmErrorKind::DuplicateSymbol(label.name.clone())));
        }

        let address = self.address;
        let pending_label = statement.label.as_ref().map(|label| label.name.as_str());
        let lookup = |name: &str| {
            if pending_label == Some(name) { Some(address) } else { symbols.address(name) }
        };

        let emission = match &statement.body {
            None => Emission::default(),
            Some(Body::Org(value)) => match resolve_value(value, &lookup).map_err(error)? {
                Resolution::Known(origin) => {
                    Emission { origin: Some(origin), ..Emission::default() }
                }
                Resolution::Pending(symbol) => {
                    return Err(error(AsmErrorKind::UndefinedSymbol(symbol)));
                }
            },
            Some(Body::Bytes(values)) => {
                let mut emission = Emission::default();
                for value in values {
                    emission.push_value(value, FixupKind::Byte, address, &lookup).map_err(error)?;
                }
                emission
            }
            Some(Body::Instruction { operation, operand, operand_text }) => {
                encode_instruction(*operation, operand, operand_text, address, &lookup)
                    .map_err(error)?
            }
        };

        if let Some(label) = statement.label {
            log::debug!("Defining '{}' as ${address:04X}", label.name);
            symbols.define(&label.name, address, label.global);
        }

        if let Some(origin) = emission.origin {
            log::debug!("Assembly address moved to ${origin:04X}");
            self.address = origin;
        }

        self.emit(line, emission, state);

        Ok(())
    }

    fn emit(&mut self, line: usize, emission: Emission, state: &mut CpuState) {
        let start = self.address;
        let len = emission.bytes.len();
        if len == 0 {
            return;
        }

        state.write_bytes(start, &emission.bytes);

        for (offset, symbol, kind) in emission.fixups {
            self.fixups.push(Fixup { line, address: start.wrapping_add(offset), symbol, kind });
        }

        match self.segments.last_mut() {
            Some(segment) if segment.start.wrapping_add(segment.len as u16) == start => {
                segment.len += len;
            }
            _ => self.segments.push(Segment { start, len }),
        }

        self.address = start.wrapping_add(len as u16);
    }

    /// Patch every pending reference whose label is now defined. References to labels that are
    /// still undefined stay pending.
    pub fn resolve_fixups(
        &mut self,
        state: &mut CpuState,
        symbols: &SymbolTable,
    ) -> Vec<AsmError> {
        let mut errors = Vec::new();

        self.fixups.retain(|fixup| {
            let Some(value) = symbols.address(&fixup.symbol) else {
                return true;
            };

            let patched = match fixup.kind {
                FixupKind::Byte => byte_value(value).map(|byte| state.write(fixup.address, byte)),
                FixupKind::Word => {
                    state.write_bytes(fixup.address, &value.to_le_bytes());
                    Ok(())
                }
                FixupKind::Relative => branch_offset(fixup.address.wrapping_add(1), value)
                    .map(|offset| state.write(fixup.address, offset)),
            };

            if let Err(kind) = patched {
                errors.push(AsmError { line: fixup.line, kind });
            }

            false
        });

        errors
    }

    /// Resolve remaining references; any label that is still undefined is reported as an error
    /// and its placeholder bytes are left in memory.
    #[must_use]
    pub fn finish(mut self, state: &mut CpuState, symbols: &SymbolTable) -> Assembly {
        let mut errors = self.resolve_fixups(state, symbols);
        errors.extend(self.fixups.drain(..).map(|fixup| AsmError {
            line: fixup.line,
            kind: AsmErrorKind::UndefinedSymbol(fixup.symbol),
        }));

        Assembly { segments: self.segments, errors }
    }
}

/// Assemble a complete source text starting at `origin`.
pub fn assemble(
    source: &str,
    origin: u16,
    state: &mut CpuState,
    symbols: &mut SymbolTable,
) -> Assembly {
    let mut assembler = Assembler::new(origin);
    let mut errors = Vec::new();

    for (i, text) in source.lines().enumerate() {
        if let Err(error) = assembler.assemble_line(i + 1, text, state, symbols) {
            log::debug!("{error}");
            errors.push(error);
        }
    }

    let mut assembly = assembler.finish(state, symbols);
    errors.append(&mut assembly.errors);
    errors.sort_by_key(|error| error.line);
    errors.dedup();
    assembly.errors = errors;

    assembly
}
