//! Text-level collaborators of the 6502 core: a line-oriented assembler with a symbol table,
//! a disassembler, and PRG image loading.

pub mod assembler;
pub mod disassembler;
pub mod loader;
pub mod symbols;
