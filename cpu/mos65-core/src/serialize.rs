use crate::CpuState;
use bincode::config::{Fixint, LittleEndian};
use bincode::error::{DecodeError, EncodeError};
use std::io;
use std::io::{BufReader, BufWriter, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("error saving snapshot: {source}")]
    Serialization {
        #[from]
        source: EncodeError,
    },
    #[error("error loading snapshot: {source}")]
    Deserialization {
        #[from]
        source: DecodeError,
    },
    #[error("I/O error writing snapshot: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

const BINCODE_CONFIG: bincode::config::Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_little_endian().with_fixed_int_encoding();

/// Write the complete processor state (registers and all 64KB of memory).
///
/// # Errors
///
/// Returns an error if encoding fails or the writer returns an I/O error.
pub fn save_snapshot<W>(state: &CpuState, writer: W) -> Result<(), SnapshotError>
where
    W: io::Write,
{
    let mut writer = BufWriter::new(writer);

    bincode::encode_into_std_write(state, &mut writer, BINCODE_CONFIG)?;
    writer.flush()?;

    Ok(())
}

/// Read a processor state previously written by [`save_snapshot`].
///
/// # Errors
///
/// Returns an error if the data is truncated or malformed, or the reader returns an I/O error.
pub fn load_snapshot<R>(reader: R) -> Result<CpuState, SnapshotError>
where
    R: io::Read,
{
    let mut reader = BufReader::new(reader);

    let state = bincode::decode_from_std_read(&mut reader, BINCODE_CONFIG)?;

    Ok(state)
}
