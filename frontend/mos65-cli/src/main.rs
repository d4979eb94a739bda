mod config;
mod repl;

use crate::config::CliConfig;
use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use env_logger::Env;
use mos65_asm::symbols::SymbolTable;
use mos65_asm::{assembler, disassembler, loader};
use mos65_core::{CpuState, RunLimits, dump, serialize};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
struct Args {
    /// TOML config file with initial registers, run limits and display settings
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a PRG image and run it until BRK, the halt address, or the instruction limit
    Run {
        /// PRG file path
        file_path: PathBuf,

        /// Start address (hex); defaults to the load address
        #[arg(long, value_parser = parse_address)]
        pc: Option<u16>,

        /// Stop before executing the instruction at this address (hex)
        #[arg(long, value_parser = parse_address)]
        halt: Option<u16>,

        /// Maximum number of instructions to execute, 0 for no limit
        #[arg(long)]
        max_instructions: Option<u64>,

        /// Write the final processor state to this file
        #[arg(long)]
        save_snapshot: Option<PathBuf>,

        /// Start from a saved processor state instead of power-on registers
        #[arg(long)]
        load_snapshot: Option<PathBuf>,
    },
    /// Assemble a source file and print the listing
    Asm {
        /// Assembly source file path
        file_path: PathBuf,

        /// Write the assembled bytes as a PRG image
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Run the program from its first assembled address
        #[arg(long)]
        run: bool,
    },
    /// Print the disassembly of a PRG image
    Disasm {
        /// PRG file path
        file_path: PathBuf,

        /// Number of bytes to disassemble; defaults to the image length
        #[arg(long)]
        len: Option<usize>,
    },
    /// Assemble and execute interactively, one line at a time
    Repl,
}

/// Parse a hex address, optionally prefixed with `$` or `0x`.
fn parse_address(text: &str) -> Result<u16, String> {
    let text = text.trim();
    let digits = text
        .strip_prefix('$')
        .or_else(|| text.strip_prefix("0x"))
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u16::from_str_radix(digits, 16).map_err(|_| format!("invalid address '{text}'"))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };

    match args.command {
        Command::Run { file_path, pc, halt, max_instructions, save_snapshot, load_snapshot } => {
            let mut limits = config.run_limits();
            if halt.is_some() {
                limits.halt_address = halt;
            }
            if let Some(max_instructions) = max_instructions {
                limits.max_instructions = (max_instructions != 0).then_some(max_instructions);
            }

            run_prg(
                &config,
                &file_path,
                pc,
                limits,
                load_snapshot.as_deref(),
                save_snapshot.as_deref(),
            )
        }
        Command::Asm { file_path, output, run } => {
            assemble_file(&config, &file_path, output.as_deref(), run)
        }
        Command::Disasm { file_path, len } => disassemble_prg(&file_path, len),
        Command::Repl => {
            let stdin = io::stdin();
            repl::run(&config, stdin.lock(), &mut io::stdout())
        }
    }
}

fn run_prg(
    config: &CliConfig,
    file_path: &Path,
    pc: Option<u16>,
    limits: RunLimits,
    load_snapshot: Option<&Path>,
    save_snapshot: Option<&Path>,
) -> anyhow::Result<()> {
    let mut state = match load_snapshot {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening snapshot {}", path.display()))?;
            serialize::load_snapshot(BufReader::new(file))
                .with_context(|| format!("loading snapshot {}", path.display()))?
        }
        None => CpuState::new(config.initial_registers(0x0000)),
    };

    let (address, len) = loader::load_prg(file_path, &mut state)
        .with_context(|| format!("loading {}", file_path.display()))?;
    log::info!("Loaded {len} bytes at ${address:04X} from {}", file_path.display());

    match (pc, load_snapshot) {
        (Some(pc), _) => state.registers_mut().pc = pc,
        (None, None) => state.registers_mut().pc = address,
        (None, Some(_)) => {}
    }

    let result = execute(config, &mut state, limits);

    if let Some(path) = save_snapshot {
        let file =
            File::create(path).with_context(|| format!("creating snapshot {}", path.display()))?;
        serialize::save_snapshot(&state, file)
            .with_context(|| format!("saving snapshot {}", path.display()))?;
        log::info!("Saved snapshot to {}", path.display());
    }

    result
}

fn assemble_file(
    config: &CliConfig,
    file_path: &Path,
    output: Option<&Path>,
    run: bool,
) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(file_path)
        .with_context(|| format!("reading {}", file_path.display()))?;

    let mut state = CpuState::new(config.initial_registers(config.origin));
    let mut symbols = SymbolTable::new();
    let assembly = assembler::assemble(&source, config.origin, &mut state, &mut symbols);

    for error in &assembly.errors {
        log::error!("{}: {error}", file_path.display());
    }

    for segment in &assembly.segments {
        print!("{}", disassembler::listing(state.memory(), segment.start, segment.len));
    }

    if !assembly.is_ok() {
        return Err(anyhow!("{} errors in {}", assembly.errors.len(), file_path.display()));
    }

    if let Some(path) = output {
        let (start, bytes) = image_bytes(&state, &assembly.segments);
        loader::write_prg(path, start, bytes)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Wrote {} bytes at ${start:04X} to {}", bytes.len(), path.display());
    }

    if run {
        let entry_point = assembly.entry_point().context("nothing was assembled")?;
        state.registers_mut().pc = entry_point;
        execute(config, &mut state, config.run_limits())?;
    }

    Ok(())
}

// Smallest contiguous memory range covering every segment
fn image_bytes<'a>(state: &'a CpuState, segments: &[assembler::Segment]) -> (u16, &'a [u8]) {
    let start = segments.iter().map(|segment| segment.start).min().unwrap_or(0);
    let end = segments
        .iter()
        .map(|segment| (segment.start as usize + segment.len).min(mos65_core::MEMORY_LEN))
        .max()
        .unwrap_or(start as usize);

    (start, &state.memory()[start as usize..end])
}

fn disassemble_prg(file_path: &Path, len: Option<usize>) -> anyhow::Result<()> {
    let mut state = CpuState::default();
    let (address, image_len) = loader::load_prg(file_path, &mut state)
        .with_context(|| format!("loading {}", file_path.display()))?;

    print!("{}", disassembler::listing(state.memory(), address, len.unwrap_or(image_len)));

    Ok(())
}

fn execute(config: &CliConfig, state: &mut CpuState, limits: RunLimits) -> anyhow::Result<()> {
    let result = state.run(limits);

    match &result {
        Ok(summary) => println!(
            "Stopped: {} after {} instructions",
            summary.reason, summary.instructions_executed
        ),
        Err(err) => println!("Error: {err}"),
    }

    println!("{}", state.registers());
    if config.dump_len != 0 {
        print!("{}", dump::hex_dump(state.memory(), config.dump_start, config.dump_len));
    }
    print!("{}", disassembler::listing(state.memory(), state.pc(), config.disassembly_len));

    result?;

    Ok(())
}
