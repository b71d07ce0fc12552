//! Splitting an array into per-worker chunks.

use std::ops::Range;

use serde::Serialize;

use crate::error::{Error, Result};

/// Inclusive index range of the array assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkRange {
    /// Position of the chunk (and its worker) in spawn order.
    pub ordinal: usize,
    /// First index, inclusive.
    pub start: usize,
    /// Last index, inclusive.
    pub end: usize,
}

impl ChunkRange {
    /// Number of elements in the chunk.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false; a chunk holds at least one element.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The chunk as a half-open range, for slicing.
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end + 1
    }
}

/// Split `size` elements into `workers` contiguous chunks.
///
/// Every chunk but the last holds `size / workers` elements; the last one
/// absorbs the remainder.
pub fn partition(size: usize, workers: usize) -> Result<Vec<ChunkRange>> {
    if size == 0 || workers == 0 {
        return Err(Error::InvalidConfiguration(format!(
            "cannot partition {} elements across {} workers",
            size, workers
        )));
    }
    if workers > size {
        return Err(Error::InvalidConfiguration(format!(
            "{} workers exceed {} elements",
            workers, size
        )));
    }

    let chunk_size = size / workers;
    let ranges = (0..workers)
        .map(|ordinal| {
            let start = ordinal * chunk_size;
            let end = if ordinal == workers - 1 {
                size - 1
            } else {
                (ordinal + 1) * chunk_size - 1
            };
            ChunkRange {
                ordinal,
                start,
                end,
            }
        })
        .collect();

    Ok(ranges)
}

/// Split `size` elements into `parts` half-open segments of near-equal length.
///
/// The first `size % parts` segments hold one extra element. Segments may be
/// empty when `parts > size`.
pub fn balanced_segments(size: usize, parts: usize) -> Vec<Range<usize>> {
    if parts == 0 {
        return Vec::new();
    }
    let base = size / parts;
    let remainder = size % parts;

    let mut segments = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let end = start + base + usize::from(i < remainder);
        segments.push(start..end);
        start = end;
    }
    segments
}
