//! Interactive loop: each input line is assembled at the current assembly address, and lines
//! starting with `!` control execution.


use crate::config::CliConfig;
use mos65_asm::assembler::Assembler;
use mos65_asm::disassembler::{self, Instruction};
use mos65_asm::symbols::SymbolTable;
use mos65_core::{CpuState, RunLimits, StepOutcome, StopReason};
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Step(u64),
    Run,
    Pc(u16),
    State,
    Disassemble { address: Option<u16>, len: Option<usize> },
    Symbols,
    Quit,
}

fn parse_command(text: &str) -> Result<Command, String> {
    let mut tokens = text.split_whitespace();
    let name = tokens.next().unwrap_or_default();
    let args: Vec<&str> = tokens.collect();

    let parse_count = |arg: &str| arg.parse().map_err(|_| format!("invalid count '{arg}'"));

    let command = match (name, args.as_slice()) {
        ("step", []) => Command::Step(1),
        ("step", [count]) => Command::Step(parse_count(count)?),
        ("run", []) => Command::Run,
        ("pc", [address]) => Command::Pc(crate::parse_address(address)?),
        ("state", []) => Command::State,
        ("dis", []) => Command::Disassemble { address: None, len: None },
        ("dis", [address]) => {
            Command::Disassemble { address: Some(crate::parse_address(address)?), len: None }
        }
        ("dis", [address, len]) => Command::Disassemble {
            address: Some(crate::parse_address(address)?),
            len: Some(len.parse().map_err(|_| format!("invalid length '{len}'"))?),
        },
        ("syms", []) => Command::Symbols,
        ("quit" | "q", []) => Command::Quit,
        _ => return Err(format!("unrecognized command '!{}'", text.trim())),
    };

    Ok(command)
}

struct Session {
    state: CpuState,
    symbols: SymbolTable,
    assembler: Assembler,
    limits: RunLimits,
    disassembly_len: usize,
}

impl Session {
    fn new(config: &CliConfig) -> Self {
        Self {
            state: CpuState::new(config.initial_registers(config.origin)),
            symbols: SymbolTable::new(),
            assembler: Assembler::new(config.origin),
            limits: config.run_limits(),
            disassembly_len: config.disassembly_len,
        }
    }

    fn assemble<W: Write>(&mut self, line: usize, text: &str, out: &mut W) -> anyhow::Result<()> {
        let emitted_before = emitted_len(&self.assembler);

        if let Err(err) =
            self.assembler.assemble_line(line, text, &mut self.state, &mut self.symbols)
        {
            writeln!(out, "{err}")?;
            return Ok(());
        }

        for err in self.assembler.resolve_fixups(&mut self.state, &self.symbols) {
            writeln!(out, "{err}")?;
        }

        let emitted = emitted_len(&self.assembler) - emitted_before;
        if emitted != 0 {
            let start = self.assembler.address().wrapping_sub(emitted as u16);
            write!(out, "{}", disassembler::listing(self.state.memory(), start, emitted))?;
        }

        Ok(())
    }

    fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> anyhow::Result<()> {
        match command {
            Command::Step(count) => {
                for _ in 0..count {
                    let pc = self.state.pc();
                    let instruction = Instruction::decode(self.state.memory(), pc);
                    match self.state.step() {
                        Ok(StepOutcome::Executed(_)) => {
                            writeln!(out, "{}", disassembler::format_line(&instruction))?;
                        }
                        Ok(StepOutcome::Break) => {
                            writeln!(out, "Stopped: {}", StopReason::Break { address: pc })?;
                            break;
                        }
                        Err(err) => {
                            writeln!(out, "Error: {err}")?;
                            break;
                        }
                    }
                }
                writeln!(out, "{}", self.state.registers())?;
            }
            Command::Run => {
                match self.state.run(self.limits) {
                    Ok(summary) => writeln!(
                        out,
                        "Stopped: {} after {} instructions",
                        summary.reason, summary.instructions_executed
                    )?,
                    Err(err) => writeln!(out, "Error: {err}")?,
                }
                writeln!(out, "{}", self.state.registers())?;
            }
            Command::Pc(address) => {
                self.state.registers_mut().pc = address;
            }
            Command::State => {
                writeln!(out, "{}", self.state.registers())?;
            }
            Command::Disassemble { address, len } => {
                let address = address.unwrap_or(self.state.pc());
                let len = len.unwrap_or(self.disassembly_len);
                write!(out, "{}", disassembler::listing(self.state.memory(), address, len))?;
            }
            Command::Symbols => {
                for symbol in self.symbols.iter() {
                    let suffix = if symbol.global { ":" } else { "" };
                    writeln!(out, "{}{suffix} = ${:04X}", symbol.name, symbol.address)?;
                }
            }
            Command::Quit => {}
        }

        Ok(())
    }

    fn finish<W: Write>(mut self, out: &mut W) -> anyhow::Result<()> {
        let assembly = self.assembler.finish(&mut self.state, &self.symbols);
        for err in &assembly.errors {
            writeln!(out, "{err}")?;
        }

        writeln!(out, "{}", self.state.registers())?;
        for segment in &assembly.segments {
            write!(
                out,
                "{}",
                disassembler::listing(self.state.memory(), segment.start, segment.len)
            )?;
        }

        Ok(())
    }
}

fn emitted_len(assembler: &Assembler) -> usize {
    assembler.segments().iter().map(|segment| segment.len).sum()
}

/// Read lines from `input` until end of input or `!quit`, then print the final processor state
/// and a listing of everything assembled.
///
/// # Errors
///
/// Returns an error only if reading `input` or writing `out` fails.
pub fn run<R: BufRead, W: Write>(config: &CliConfig, input: R, out: &mut W) -> anyhow::Result<()> {
    let mut session = Session::new(config);

    let mut lines = input.lines().enumerate();
    loop {
        write!(out, ".{:04X}: ", session.assembler.address())?;
        out.flush()?;

        let Some((i, line)) = lines.next() else {
            writeln!(out)?;
            break;
        };
        let line = line?;

        match line.trim().strip_prefix('!').map(parse_command) {
            Some(Ok(Command::Quit)) => break,
            Some(Ok(command)) => session.execute(command, out)?,
            Some(Err(err)) => writeln!(out, "{err}")?,
            None => session.assemble(i + 1, &line, out)?,
        }
    }

    session.finish(out)
}
