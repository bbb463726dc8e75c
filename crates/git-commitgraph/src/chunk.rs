//! Chunk directory parsing for the file container.
//!
//! The directory has one `(u32 id, u64 offset)` entry per present chunk plus
//! a terminator with id zero whose offset marks the start of the trailing
//! checksum. Chunks are laid out back to back in directory order, so each
//! chunk's size is the distance to the next offset.

use std::ops::Range;

use crate::{GraphError, HEADER_SIZE, TOC_ENTRY_SIZE, TRAILER_SIZE};

/// Chunk identifiers (big-endian ASCII).
pub(crate) const CHUNK_OID_FANOUT: u32 = 0x4f49_4446; // "OIDF"
pub(crate) const CHUNK_OID_LOOKUP: u32 = 0x4f49_444c; // "OIDL"
pub(crate) const CHUNK_COMMIT_DATA: u32 = 0x4344_4154; // "CDAT"
pub(crate) const CHUNK_EXTRA_EDGES: u32 = 0x4544_4745; // "EDGE"

/// Parsed chunk directory: chunk id → byte range within the file.
#[derive(Debug)]
pub(crate) struct ChunkDirectory {
    entries: Vec<(u32, Range<usize>)>,
}

impl ChunkDirectory {
    /// Parse the directory of a file whose header declares `chunk_count`
    /// present chunks. Validates the terminator, monotonic offsets, bounds,
    /// and duplicate ids.
    pub(crate) fn parse(data: &[u8], chunk_count: usize) -> Result<Self, GraphError> {
        let toc_start = HEADER_SIZE;
        let toc_len = (chunk_count + 1) * TOC_ENTRY_SIZE;

        if data.len() < toc_start + toc_len + TRAILER_SIZE {
            return Err(GraphError::Malformed("truncated chunk directory".into()));
        }
        let payload_start = toc_start + toc_len;
        let payload_end = data.len() - TRAILER_SIZE;

        let mut raw: Vec<(u32, usize)> = Vec::with_capacity(chunk_count + 1);
        for i in 0..=chunk_count {
            let at = toc_start + i * TOC_ENTRY_SIZE;
            let id = u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
            let offset = u64::from_be_bytes([
                data[at + 4],
                data[at + 5],
                data[at + 6],
                data[at + 7],
                data[at + 8],
                data[at + 9],
                data[at + 10],
                data[at + 11],
            ]);
            let offset = usize::try_from(offset)
                .map_err(|_| GraphError::Malformed(format!("chunk offset {offset} out of range")))?;
            raw.push((id, offset));
        }

        // The terminator closes the chunk area at the checksum boundary.
        let (last_id, last_offset) = raw[chunk_count];
        if last_id != 0 {
            return Err(GraphError::Malformed(
                "chunk directory missing zero terminator".into(),
            ));
        }
        if last_offset != payload_end {
            return Err(GraphError::Malformed(format!(
                "chunk directory terminator points at {last_offset}, expected {payload_end}"
            )));
        }

        if chunk_count > 0 && raw[0].1 != payload_start {
            return Err(GraphError::Malformed(format!(
                "first chunk starts at {}, expected {payload_start}",
                raw[0].1
            )));
        }

        let mut entries = Vec::with_capacity(chunk_count);
        for i in 0..chunk_count {
            let (id, start) = raw[i];
            let (_, end) = raw[i + 1];
            if id == 0 {
                return Err(GraphError::Malformed(
                    "chunk id zero before directory terminator".into(),
                ));
            }
            if end < start {
                return Err(GraphError::Malformed(
                    "chunk directory offsets not monotonic".into(),
                ));
            }
            if entries.iter().any(|(seen, _)| *seen == id) {
                return Err(GraphError::Malformed(format!(
                    "duplicate chunk id {id:#010x}"
                )));
            }
            entries.push((id, start..end));
        }

        Ok(Self { entries })
    }

    /// Byte slice of the chunk with the given id, if present.
    pub(crate) fn slice<'a>(&self, data: &'a [u8], id: u32) -> Option<&'a [u8]> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, range)| &data[range.clone()])
    }

    /// Byte range of the chunk with the given id, if present.
    pub(crate) fn range_of(&self, id: u32) -> Option<Range<usize>> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, range)| range.clone())
    }
}
