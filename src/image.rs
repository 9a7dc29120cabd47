//! The image stream: a logically contiguous byte sequence stored as fixed
//! size chunks, compressed one at a time and batched into numbered bevies
//! inside the containing volume.

use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;

use log::error;

use crate::bevy::{bevy_index_urn, bevy_urn, BevyBuilder, BevyIndex};
use crate::codec::Compression;
use crate::error::{Error, Result};
use crate::lexicon;
use crate::resolver::{Resolver, Value};

pub const DEFAULT_CHUNK_SIZE: u32 = 32 * 1024;
pub const DEFAULT_CHUNKS_PER_SEGMENT: u32 = 1024;

/// Stream parameters, fixed for the life of the stream.
#[derive(Debug, Clone, Copy)]
pub struct ImageOptions {
    pub chunk_size: u32,
    pub chunks_per_segment: u32,
    pub compression: Compression,
}

impl Default for ImageOptions {
    fn default() -> Self {
        ImageOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunks_per_segment: DEFAULT_CHUNKS_PER_SEGMENT,
            compression: Compression::Zlib,
        }
    }
}

pub struct ImageStream {
    resolver: Rc<Resolver>,
    urn: String,
    volume_urn: String,

    chunk_size: u32,
    chunks_per_segment: u32,
    compression: Compression,

    size: u64,
    // Position hint shared by reads and writes, always within [0, size].
    read_ptr: u64,

    write_buffer: Vec<u8>,
    bevy: BevyBuilder,
    bevy_number: u32,

    dirty: bool,
    finalized: bool,
}

impl ImageStream {
    /// Bind a fresh stream URN to a registered volume. The type and the
    /// containing-volume attributes are written immediately; the remaining
    /// parameters are persisted on flush.
    pub fn create(
        resolver: &Rc<Resolver>,
        urn: &str,
        volume_urn: &str,
        options: ImageOptions,
    ) -> Result<Self> {
        if options.chunk_size == 0 || options.chunks_per_segment == 0 {
            return Err(Error::InvalidArgument(
                "chunk geometry must be non-zero".to_string(),
            ));
        }

        let volume = resolver.volume(volume_urn)?;
        volume.borrow_mut().add_child(urn);

        resolver.set(
            urn,
            lexicon::RDF_TYPE,
            Value::Urn(lexicon::IMAGE_STREAM_TYPE.to_string()),
        )?;
        resolver.set(urn, lexicon::STORED, Value::Urn(volume_urn.to_string()))?;

        Ok(ImageStream {
            resolver: resolver.clone(),
            urn: urn.to_string(),
            volume_urn: volume_urn.to_string(),
            chunk_size: options.chunk_size,
            chunks_per_segment: options.chunks_per_segment,
            compression: options.compression,
            size: 0,
            read_ptr: 0,
            write_buffer: Vec::new(),
            bevy: BevyBuilder::new(options.chunks_per_segment),
            bevy_number: 0,
            dirty: false,
            finalized: false,
        })
    }

    /// Reconstruct a stream from its attributes alone. The containing
    /// volume is required; everything else falls back to defaults.
    pub fn open(resolver: &Rc<Resolver>, urn: &str) -> Result<Self> {
        let volume_urn = match resolver.get(urn, lexicon::STORED)? {
            Value::Urn(v) => v,
            Value::Integer(_) => {
                return Err(Error::io(format!("{} stored attribute is not a URN", urn)));
            }
        };

        let chunk_size = match resolver.get_opt(urn, lexicon::CHUNK_SIZE)? {
            Some(v) => integer_attr(urn, lexicon::CHUNK_SIZE, v)? as u32,
            None => DEFAULT_CHUNK_SIZE,
        };
        let chunks_per_segment = match resolver.get_opt(urn, lexicon::CHUNKS_PER_SEGMENT)? {
            Some(v) => integer_attr(urn, lexicon::CHUNKS_PER_SEGMENT, v)? as u32,
            None => DEFAULT_CHUNKS_PER_SEGMENT,
        };
        let size = match resolver.get_opt(urn, lexicon::STREAM_SIZE)? {
            Some(v) => integer_attr(urn, lexicon::STREAM_SIZE, v)?,
            None => 0,
        };

        let compression = match resolver.get_opt(urn, lexicon::COMPRESSION)? {
            Some(Value::Urn(c)) => Compression::from_urn(&c)?,
            Some(Value::Integer(_)) => {
                return Err(Error::io(format!(
                    "{} compression attribute is not a URN",
                    urn
                )));
            }
            None => Compression::Zlib,
        };

        if chunk_size == 0 || chunks_per_segment == 0 {
            return Err(Error::InvalidArgument(
                "chunk geometry must be non-zero".to_string(),
            ));
        }

        let total_chunks = size.div_ceil(u64::from(chunk_size));
        let bevy_number = total_chunks.div_ceil(u64::from(chunks_per_segment)) as u32;

        Ok(ImageStream {
            resolver: resolver.clone(),
            urn: urn.to_string(),
            volume_urn,
            chunk_size,
            chunks_per_segment,
            compression,
            size,
            read_ptr: 0,
            write_buffer: Vec::new(),
            bevy: BevyBuilder::new(chunks_per_segment),
            bevy_number,
            dirty: false,
            finalized: size > 0,
        })
    }

    pub fn urn(&self) -> &str {
        &self.urn
    }

    pub fn volume_urn(&self) -> &str {
        &self.volume_urn
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn tell(&self) -> u64 {
        self.read_ptr
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Position the cursor; clamped to the logical length.
    pub fn seek(&mut self, offset: u64) {
        self.read_ptr = offset.min(self.size);
    }

    /// Accept bytes at the current end of the stream. Full chunks are
    /// compressed and appended to the current bevy before the call
    /// returns; the remainder stays buffered until the next write or
    /// flush.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        if self.finalized {
            return Err(Error::InvalidArgument(format!(
                "{} is already finalized",
                self.urn
            )));
        }

        self.dirty = true;
        self.write_buffer.extend_from_slice(data);

        let chunk_size = self.chunk_size as usize;
        let mut offset = 0;
        while self.write_buffer.len() - offset >= chunk_size {
            let compressed = self
                .compression
                .compress(&self.write_buffer[offset..offset + chunk_size])?;
            self.append_compressed(&compressed)?;
            offset += chunk_size;
        }
        self.write_buffer.drain(..offset);

        self.read_ptr += data.len() as u64;
        if self.read_ptr > self.size {
            self.size = self.read_ptr;
        }
        Ok(data.len())
    }

    /// Persist the trailing short chunk and the current bevy, then commit
    /// the stream attributes. A clean stream is a no-op.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if !self.write_buffer.is_empty() {
            let compressed = self.compression.compress(&self.write_buffer)?;
            self.append_compressed(&compressed)?;
            self.write_buffer.clear();
        }
        self.flush_bevy()?;

        self.resolver.set(
            &self.urn,
            lexicon::RDF_TYPE,
            Value::Urn(lexicon::IMAGE_STREAM_TYPE.to_string()),
        )?;
        self.resolver.set(
            &self.urn,
            lexicon::STORED,
            Value::Urn(self.volume_urn.clone()),
        )?;
        self.resolver.set(
            &self.urn,
            lexicon::CHUNK_SIZE,
            Value::Integer(u64::from(self.chunk_size)),
        )?;
        self.resolver.set(
            &self.urn,
            lexicon::CHUNKS_PER_SEGMENT,
            Value::Integer(u64::from(self.chunks_per_segment)),
        )?;
        self.resolver
            .set(&self.urn, lexicon::STREAM_SIZE, Value::Integer(self.size))?;
        self.resolver.set(
            &self.urn,
            lexicon::COMPRESSION,
            Value::Urn(self.compression.urn().to_string()),
        )?;

        self.dirty = false;
        self.finalized = true;
        Ok(())
    }

    // Append one compressed chunk to the current bevy, flushing the bevy
    // when it reaches capacity.
    fn append_compressed(&mut self, compressed: &[u8]) -> Result<()> {
        self.bevy.append_chunk(compressed)?;
        if self.bevy.is_full() {
            self.flush_bevy()?;
        }
        Ok(())
    }

    fn flush_bevy(&mut self) -> Result<()> {
        let payload_urn = bevy_urn(&self.urn, self.bevy_number);
        let index_urn = bevy_index_urn(&self.urn, self.bevy_number);

        let volume = self.resolver.volume(&self.volume_urn)?;
        if self.bevy.flush(&volume.borrow(), &payload_urn, &index_urn)? {
            self.bevy_number += 1;
        }
        Ok(())
    }

    /// Read up to `length` bytes from the cursor, assembling them from
    /// however many bevies the range spans.
    pub fn read(&mut self, length: u64) -> Result<Vec<u8>> {
        if length > lexicon::MAX_READ_LEN {
            return Err(Error::InvalidArgument(format!(
                "read of {} exceeds the {} byte ceiling",
                length,
                lexicon::MAX_READ_LEN
            )));
        }

        let length = length.min(self.size - self.read_ptr);
        if length == 0 {
            return Ok(Vec::new());
        }

        let chunk_size = u64::from(self.chunk_size);
        let chunks_per_segment = u64::from(self.chunks_per_segment);
        let in_chunk_offset = (self.read_ptr % chunk_size) as usize;
        let mut chunk_id = self.read_ptr / chunk_size;
        let mut chunks_to_read = (in_chunk_offset as u64 + length).div_ceil(chunk_size);

        let mut assembled = Vec::with_capacity((chunks_to_read * chunk_size) as usize);

        let volume = self.resolver.volume(&self.volume_urn)?;
        let volume = volume.borrow();

        while chunks_to_read > 0 {
            let bevy_id = (chunk_id / chunks_per_segment) as u32;

            let mut index_member = volume.open_member(&bevy_index_urn(&self.urn, bevy_id))?;
            let mut payload = volume.open_member(&bevy_urn(&self.urn, bevy_id))?;

            let mut index_bytes = Vec::new();
            index_member.read_to_end(&mut index_bytes)?;
            let index = BevyIndex::parse(&index_bytes)?;

            // Drain every needed chunk that lives in this bevy.
            while chunks_to_read > 0 {
                let chunk_in_bevy = (chunk_id % chunks_per_segment) as usize;
                let (offset, compressed_len) = index.extent(chunk_in_bevy, payload.size())?;

                payload.seek(SeekFrom::Start(offset))?;
                let mut compressed = vec![0u8; compressed_len];
                payload.read_exact(&mut compressed)?;

                let chunk = self
                    .compression
                    .decompress(&compressed, self.chunk_size as usize)
                    .map_err(|e| {
                        error!("{}: unable to decompress chunk {}: {}", self.urn, chunk_id, e);
                        e
                    })?;
                assembled.extend_from_slice(&chunk);

                chunk_id += 1;
                chunks_to_read -= 1;

                if chunk_id % chunks_per_segment == 0 {
                    break; // next chunk lives in the following bevy
                }
            }
        }

        // Trim the assembly down to the requested window.
        assembled.drain(..in_chunk_offset);
        assembled.truncate(length as usize);
        self.read_ptr += length;

        Ok(assembled)
    }
}

fn integer_attr(subject: &str, property: &str, value: Value) -> Result<u64> {
    value
        .as_integer()
        .ok_or_else(|| Error::io(format!("{} on {} is not an integer", property, subject)))
}
