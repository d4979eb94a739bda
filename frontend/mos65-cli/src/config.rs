use anyhow::Context;
use mos65_core::{CpuRegisters, RunLimits, StatusFlags};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistersConfig {
    #[serde(default)]
    pub a: u8,
    #[serde(default)]
    pub x: u8,
    #[serde(default)]
    pub y: u8,
    #[serde(default = "default_sp")]
    pub sp: u8,
    #[serde(default = "default_status")]
    pub status: u8,
}

fn default_sp() -> u8 {
    0xFF
}

fn default_status() -> u8 {
    StatusFlags::new().to_byte()
}

impl Default for RegistersConfig {
    fn default() -> Self {
        toml::from_str("").unwrap()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// 0 means no limit
    #[serde(default = "default_max_instructions")]
    pub max_instructions: u64,
    pub halt_address: Option<u16>,
    /// Initial assembly address for `asm` and `repl`
    #[serde(default = "default_origin")]
    pub origin: u16,
    #[serde(default)]
    pub dump_start: u16,
    /// Bytes of memory to hex dump after a run; 0 disables the dump
    #[serde(default)]
    pub dump_len: usize,
    #[serde(default = "default_disassembly_len")]
    pub disassembly_len: usize,
    #[serde(default)]
    pub registers: RegistersConfig,
}

fn default_max_instructions() -> u64 {
    1_000_000
}

fn default_origin() -> u16 {
    0x0200
}

fn default_disassembly_len() -> usize {
    32
}

impl Default for CliConfig {
    fn default() -> Self {
        toml::from_str("").unwrap()
    }
}

impl CliConfig {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid config.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&config_str)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    #[must_use]
    pub fn initial_registers(&self, pc: u16) -> CpuRegisters {
        CpuRegisters {
            accumulator: self.registers.a,
            x: self.registers.x,
            y: self.registers.y,
            status: StatusFlags::from_byte(self.registers.status),
            pc,
            sp: self.registers.sp,
        }
    }

    #[must_use]
    pub fn run_limits(&self) -> RunLimits {
        RunLimits {
            halt_address: self.halt_address,
            max_instructions: (self.max_instructions != 0).then_some(self.max_instructions),
        }
    }
}
