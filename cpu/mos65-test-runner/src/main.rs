use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use mos65_core::opcodes::{self, Operation};
use mos65_core::{CpuRegisters, CpuState, STACK_PAGE, StatusFlags};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// Break and bit 5 are not real flags; hardware forces them when pushing
const PHANTOM_FLAGS_MASK: u8 = 0x30;
const PHP_OPCODE: u8 = 0x08;

#[derive(Debug, Clone, Deserialize)]
struct SystemState {
    pc: u16,
    s: u8,
    a: u8,
    x: u8,
    y: u8,
    p: u8,
    ram: Vec<(u16, u8)>,
}

#[derive(Debug, Clone, Deserialize)]
struct TestDescription {
    name: String,
    initial: SystemState,
    #[serde(rename = "final")]
    final_: SystemState,
}

#[derive(Debug, Parser)]
struct Args {
    /// Directory containing JSON tests
    #[arg(long, short = 'd')]
    dir_path: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut state = CpuState::default();

    let mut total_failures = 0;
    for descriptor in opcodes::OPCODE_TABLE.iter().flatten() {
        if descriptor.operation == Operation::Brk {
            continue;
        }

        let opcode = descriptor.opcode;
        let file_path = Path::new(&args.dir_path).join(format!("{opcode:02x}.json"));
        let file =
            File::open(&file_path).with_context(|| format!("opening {}", file_path.display()))?;
        let tests: Vec<TestDescription> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {}", file_path.display()))?;

        let is_decimal_arithmetic = matches!(descriptor.operation, Operation::Adc | Operation::Sbc);

        let mut failures = 0;
        let mut test_count = 0;
        for test in tests {
            if is_decimal_arithmetic && StatusFlags::from_byte(test.initial.p).decimal {
                continue;
            }

            test_count += 1;
            if !run_test(&mut state, opcode, &test) {
                failures += 1;
                log::debug!("Above failures in '{}'", test.name);
            }
        }

        if failures != 0 {
            log::error!("Failed {failures} out of {test_count} tests for opcode {opcode:02X}");
        }
        total_failures += failures;
    }

    log::info!("Finished with {total_failures} failures");

    Ok(())
}

fn run_test(state: &mut CpuState, opcode: u8, test: &TestDescription) -> bool {
    for &(address, value) in &test.initial.ram {
        state.write(address, value);
    }

    state.set_registers(CpuRegisters {
        accumulator: test.initial.a,
        x: test.initial.x,
        y: test.initial.y,
        status: StatusFlags::from_byte(test.initial.p),
        pc: test.initial.pc,
        sp: test.initial.s,
    });

    let passed = match state.step() {
        Ok(_) => check_state(state, opcode, &test.initial, &test.final_),
        Err(err) => {
            log::debug!("Step failed: {err}");
            false
        }
    };

    for &(address, _) in test.initial.ram.iter().chain(&test.final_.ram) {
        state.write(address, 0);
    }

    passed
}

fn check_state(
    state: &CpuState,
    opcode: u8,
    initial_state: &SystemState,
    final_state: &SystemState,
) -> bool {
    let mut passed = true;

    let php_stack_address = u16::from_le_bytes([initial_state.s, STACK_PAGE]);
    for &(address, expected_value) in &final_state.ram {
        let mut actual_value = state.read(address);
        let mut expected_value = expected_value;
        if opcode == PHP_OPCODE && address == php_stack_address {
            actual_value |= PHANTOM_FLAGS_MASK;
            expected_value |= PHANTOM_FLAGS_MASK;
        }

        if expected_value != actual_value {
            passed = false;
            log::debug!(
                "RAM[{address:04X}]: expected={expected_value:02X}, actual={actual_value:02X}"
            );
        }
    }

    let registers = state.registers();
    passed &= check_register("A", final_state.a, registers.accumulator);
    passed &= check_register("X", final_state.x, registers.x);
    passed &= check_register("Y", final_state.y, registers.y);
    passed &= check_register("S", final_state.s, registers.sp);
    passed &= check_register(
        "P",
        final_state.p | PHANTOM_FLAGS_MASK,
        registers.status.to_byte() | PHANTOM_FLAGS_MASK,
    );

    if final_state.pc != registers.pc {
        log::debug!("PC: expected={:04X} actual={:04X}", final_state.pc, registers.pc);
        passed = false;
    }

    passed
}

fn check_register(name: &str, expected: u8, actual: u8) -> bool {
    if expected != actual {
        log::debug!("{name}: expected={expected:02X}, actual={actual:02X}");
        false
    } else {
        true
    }
}
