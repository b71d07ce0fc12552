//! Anonymous pipe channel.
//!
//! Wire format: `min` then `max`, each a 4-byte little-endian `i32`, written
//! in one 8-byte write. Writes of this size are atomic on a pipe, so the
//! reader sees either the whole pair or a short read.

use std::io::{ErrorKind, PipeReader, PipeWriter, Read, Write};

use super::{ChannelKind, ResultReceiver, ResultSender};
use crate::aggregate::MinMax;
use crate::error::{Error, Result};

/// Size of one encoded result.
pub const PAIR_LEN: usize = 8;

pub fn encode_pair(result: MinMax) -> [u8; PAIR_LEN] {
    let mut bytes = [0u8; PAIR_LEN];
    bytes[..4].copy_from_slice(&result.min.to_le_bytes());
    bytes[4..].copy_from_slice(&result.max.to_le_bytes());
    bytes
}

pub fn decode_pair(bytes: [u8; PAIR_LEN]) -> MinMax {
    let [a, b, c, d, e, f, g, h] = bytes;
    MinMax::new(i32::from_le_bytes([a, b, c, d]), i32::from_le_bytes([e, f, g, h]))
}

/// Supervisor end of a pipe channel.
pub struct PipeReceiver {
    ordinal: usize,
    reader: Option<PipeReader>,
}

impl PipeReceiver {
    /// Create the pipe. The returned writer is meant for the worker's stdout.
    pub fn open(ordinal: usize) -> Result<(Self, PipeWriter)> {
        let (reader, writer) = std::io::pipe().map_err(|e| Error::ChannelSetup {
            ordinal,
            message: format!("pipe creation failed: {}", e),
        })?;

        Ok((
            Self {
                ordinal,
                reader: Some(reader),
            },
            writer,
        ))
    }
}

impl ResultReceiver for PipeReceiver {
    fn ordinal(&self) -> usize {
        self.ordinal
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Pipe
    }

    fn receive(&mut self) -> Option<MinMax> {
        // Reading closes the read end: there is at most one pair per channel.
        let mut reader = self.reader.take()?;
        let mut bytes = [0u8; PAIR_LEN];

        match reader.read_exact(&mut bytes) {
            Ok(()) => Some(decode_pair(bytes)),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                tracing::debug!(ordinal = self.ordinal, "pipe closed without a complete result");
                None
            }
            Err(e) => {
                tracing::warn!(ordinal = self.ordinal, "failed to read worker pipe: {}", e);
                None
            }
        }
    }

    fn cleanup(&mut self) -> Result<()> {
        self.reader = None;
        Ok(())
    }
}

/// Worker end of a pipe channel.
pub struct PipeSender<W: Write> {
    writer: W,
}

impl<W: Write> PipeSender<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ResultSender for PipeSender<W> {
    fn send(&mut self, result: MinMax) -> Result<()> {
        self.writer
            .write_all(&encode_pair(result))
            .map_err(|e| Error::Ipc(format!("Failed to write result to pipe: {}", e)))?;
        self.writer
            .flush()
            .map_err(|e| Error::Ipc(format!("Failed to flush result pipe: {}", e)))?;
        Ok(())
    }
}
