//! PRG images: a 2-byte little-endian load address followed by the raw bytes to load there.

use mos65_core::{CpuState, MEMORY_LEN};
use std::path::Path;
use std::{fs, io};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("image is shorter than its 2-byte load address header")]
    MissingHeader,
    #[error("I/O error reading image: {0}")]
    Io(#[from] io::Error),
    #[error("{len} bytes loaded at ${address:04X} run past the end of memory")]
    Overflow { address: u16, len: usize },
}

/// Load a PRG image from `path` into memory.
///
/// Memory is only modified if the whole image is valid. Returns the load address and the
/// number of payload bytes written.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is missing its header, or does not fit in
/// memory at its load address.
pub fn load_prg<P: AsRef<Path>>(path: P, state: &mut CpuState) -> Result<(u16, usize), LoadError> {
    let bytes = fs::read(path)?;
    load_prg_bytes(&bytes, state)
}

/// Same as [`load_prg`] over an in-memory image.
///
/// # Errors
///
/// Returns an error if the image is missing its header or does not fit in memory.
pub fn load_prg_bytes(bytes: &[u8], state: &mut CpuState) -> Result<(u16, usize), LoadError> {
    let [lsb, msb, payload @ ..] = bytes else {
        return Err(LoadError::MissingHeader);
    };

    let address = u16::from_le_bytes([*lsb, *msb]);
    if address as usize + payload.len() > MEMORY_LEN {
        return Err(LoadError::Overflow { address, len: payload.len() });
    }

    state.write_bytes(address, payload);

    log::debug!("Loaded {} bytes at ${address:04X}", payload.len());

    Ok((address, payload.len()))
}

/// Write `bytes` as a PRG image with load address `address`.
///
/// # Errors
///
/// Propagates any I/O error.
pub fn write_prg<P: AsRef<Path>>(path: P, address: u16, bytes: &[u8]) -> io::Result<()> {
    let mut image = Vec::with_capacity(2 + bytes.len());
    image.extend_from_slice(&address.to_le_bytes());
    image.extend_from_slice(bytes);
    fs::write(path, image)
}
