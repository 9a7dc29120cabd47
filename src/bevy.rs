//! Bevies: bundles of compressed chunks persisted as two volume members.
//!
//! # Layout
//!
//! | Member | Name | Content |
//! | ------ | ---- | ------- |
//! | payload | `{stream_urn}/{NNNNNNNN}` | compressed chunk bodies, concatenated in chunk order, no framing |
//! | index | `{stream_urn}/{NNNNNNNN}/index` | packed u32 little-endian offsets of each chunk within the payload |
//!
//! `NNNNNNNN` is the bevy number as 8 zero-padded decimal digits. Both
//! members are immutable once closed.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{error, info};

use crate::error::{Error, Result};
use crate::volume::Volume;

/// Payload member name for bevy `number` of `stream_urn`.
pub fn bevy_urn(stream_urn: &str, number: u32) -> String {
    format!("{}/{:08}", stream_urn, number)
}

/// Index member name for bevy `number` of `stream_urn`.
pub fn bevy_index_urn(stream_urn: &str, number: u32) -> String {
    format!("{}/{:08}/index", stream_urn, number)
}

/// One bevy under construction on the write path.
pub struct BevyBuilder {
    body: Vec<u8>,
    index: Vec<u8>,
    chunk_count: u32,
    chunks_per_segment: u32,
}

impl BevyBuilder {
    pub fn new(chunks_per_segment: u32) -> Self {
        BevyBuilder {
            body: Vec::new(),
            index: Vec::new(),
            chunk_count: 0,
            chunks_per_segment,
        }
    }

    /// Record the chunk's offset in the index, then append its payload.
    pub fn append_chunk(&mut self, compressed: &[u8]) -> Result<()> {
        let offset = u32::try_from(self.body.len())
            .map_err(|_| Error::io("bevy body exceeds the 32 bit index range".to_string()))?;

        self.index.write_u32::<LittleEndian>(offset)?;
        self.body.extend_from_slice(compressed);
        self.chunk_count += 1;
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.chunk_count >= self.chunks_per_segment
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_count == 0
    }

    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    /// Persist the bevy as its two members and reset for the next one.
    /// Returns false when there was nothing to write. On failure the
    /// builder keeps its state so the caller may retry.
    pub fn flush(&mut self, volume: &Volume, payload_urn: &str, index_urn: &str) -> Result<bool> {
        if self.is_empty() {
            info!("bevy {} is empty", payload_urn);
            return Ok(false);
        }

        if let Err(e) = self.persist(volume, payload_urn, index_urn) {
            error!("unable to persist bevy {}: {}", payload_urn, e);
            return Err(e);
        }

        self.body.clear();
        self.index.clear();
        self.chunk_count = 0;
        Ok(true)
    }

    fn persist(&self, volume: &Volume, payload_urn: &str, index_urn: &str) -> Result<()> {
        use std::io::Write;

        let mut index = volume.create_member(index_urn)?;
        let mut payload = volume.create_member(payload_urn)?;

        index.write_all(&self.index)?;
        payload.write_all(&self.body)?;

        index.close()?;
        payload.close()?;
        Ok(())
    }
}

/// Parsed index member on the read path.
pub struct BevyIndex(Vec<u32>);

impl BevyIndex {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() % 4 != 0 {
            return Err(Error::io(format!(
                "index length {} is not a whole number of entries",
                data.len()
            )));
        }

        let mut cursor = data;
        let mut entries = Vec::with_capacity(data.len() / 4);
        while !cursor.is_empty() {
            entries.push(cursor.read_u32::<LittleEndian>()?);
        }
        Ok(BevyIndex(entries))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compressed extent (offset, length) of chunk `chunk_in_bevy` within a
    /// payload member of `payload_size` bytes. The last chunk consumes the
    /// payload to its end.
    pub fn extent(&self, chunk_in_bevy: usize, payload_size: u64) -> Result<(u64, usize)> {
        if self.0.is_empty() {
            error!("bevy index is empty");
            return Err(Error::io("empty bevy index".to_string()));
        }
        if chunk_in_bevy >= self.0.len() {
            error!(
                "bevy index too short: chunk {} beyond {} entries",
                chunk_in_bevy,
                self.0.len()
            );
            return Err(Error::io(format!(
                "chunk {} beyond index of {} entries",
                chunk_in_bevy,
                self.0.len()
            )));
        }

        let start = u64::from(self.0[chunk_in_bevy]);
        let end = if chunk_in_bevy == self.0.len() - 1 {
            payload_size
        } else {
            u64::from(self.0[chunk_in_bevy + 1])
        };

        if start >= end || end > payload_size {
            error!(
                "bevy index entry {} out of bounds: {}..{} of {}",
                chunk_in_bevy, start, end, payload_size
            );
            return Err(Error::io(format!(
                "index entry {} out of bounds",
                chunk_in_bevy
            )));
        }

        Ok((start, (end - start) as usize))
    }
}
