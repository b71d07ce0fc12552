//! IPC protocol between the supervisor and worker processes.
//!
//! The supervisor writes one length-prefixed rkyv message to the worker's
//! stdin: its [`WorkerAssignment`].
//! Format: 4-byte length (u32 LE) + rkyv-encoded message.

use std::io::{Read, Write};

use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest message accepted on the wire (1 GiB).
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024 * 1024;

/// Largest chunk a single assignment can carry, leaving headroom for the
/// assignment's other fields.
pub const MAX_CHUNK_LEN: usize = (MAX_MESSAGE_LEN - 4096) / std::mem::size_of::<i32>();

/// Where the worker delivers its result.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum Delivery {
    /// Write the encoded pair to stdout, which is the channel's pipe.
    Pipe,
    /// Write the pair as text to this file.
    File {
        /// Absolute path of the result file.
        path: String,
    },
}

/// Work sent from the supervisor to one worker process.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
pub struct WorkerAssignment {
    /// Position of the worker in spawn order.
    pub ordinal: u64,
    /// First array index of the chunk, inclusive.
    pub start: u64,
    /// Last array index of the chunk, inclusive.
    pub end: u64,
    /// The worker's own copy of the chunk.
    pub values: Vec<i32>,
    /// Result channel to deliver through.
    pub delivery: Delivery,
    /// Test hook: sleep this many milliseconds before delivering. Zero disables it.
    pub linger_ms: u64,
}

/// Write a message to a writer using length-prefixed rkyv encoding.
pub fn write_message<W: Write>(
    writer: &mut W,
    message: &impl for<'a> Serialize<
        rkyv::rancor::Strategy<
            rkyv::ser::Serializer<
                rkyv::util::AlignedVec,
                rkyv::ser::allocator::ArenaHandle<'a>,
                rkyv::ser::sharing::Share,
            >,
            rkyv::rancor::Error,
        >,
    >,
) -> Result<()> {
    let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(message)
        .map_err(|e| Error::Serialization(format!("Failed to encode IPC message: {}", e)))?;

    if bytes.len() > MAX_MESSAGE_LEN {
        return Err(Error::Ipc(format!(
            "IPC message too large: {} bytes",
            bytes.len()
        )));
    }

    let len = bytes.len() as u32;
    writer
        .write_all(&len.to_le_bytes())
        .map_err(|e| Error::Ipc(format!("Failed to write IPC message length: {}", e)))?;
    writer
        .write_all(&bytes)
        .map_err(|e| Error::Ipc(format!("Failed to write IPC message body: {}", e)))?;
    writer
        .flush()
        .map_err(|e| Error::Ipc(format!("Failed to flush IPC stream: {}", e)))?;

    Ok(())
}

/// Read a message from a reader using length-prefixed rkyv encoding.
///
/// # Safety
///
/// Uses unchecked deserialization. Only safe when reading from trusted
/// sources: a worker only ever reads what its own supervisor wrote.
pub fn read_message<R: Read, T>(reader: &mut R) -> Result<T>
where
    T: Archive,
    T::Archived: Deserialize<T, rkyv::rancor::Strategy<rkyv::de::Pool, rkyv::rancor::Error>>,
{
    let mut len_bytes = [0u8; 4];
    reader
        .read_exact(&mut len_bytes)
        .map_err(|e| Error::Ipc(format!("Failed to read IPC message length: {}", e)))?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > MAX_MESSAGE_LEN {
        return Err(Error::Ipc(format!("IPC message too large: {} bytes", len)));
    }

    // rkyv archives must be read from an aligned buffer.
    let mut bytes: AlignedVec = AlignedVec::with_capacity(len);
    bytes.resize(len, 0);
    reader
        .read_exact(&mut bytes)
        .map_err(|e| Error::Ipc(format!("Failed to read IPC message body: {}", e)))?;

    // SAFETY: the bytes come from our own supervisor process.
    let message = unsafe { rkyv::from_bytes_unchecked::<T, rkyv::rancor::Error>(&bytes) }
        .map_err(|e| Error::Serialization(format!("Failed to decode IPC message: {}", e)))?;

    Ok(message)
}
