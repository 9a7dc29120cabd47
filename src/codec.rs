use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use log::error;

use crate::error::{Error, Result};
use crate::lexicon;

/// The closed set of chunk compression schemes, dispatched in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Stored,
    Zlib,
    Snappy,
}

impl Compression {
    pub fn from_urn(urn: &str) -> Result<Self> {
        match urn {
            lexicon::COMPRESSION_STORED => Ok(Compression::Stored),
            lexicon::COMPRESSION_DEFLATE => Ok(Compression::Zlib),
            lexicon::COMPRESSION_SNAPPY => Ok(Compression::Snappy),
            _ => {
                error!("compression scheme {} is not supported", urn);
                Err(Error::NotImplemented(urn.to_string()))
            }
        }
    }

    pub fn urn(&self) -> &'static str {
        match self {
            Compression::Stored => lexicon::COMPRESSION_STORED,
            Compression::Zlib => lexicon::COMPRESSION_DEFLATE,
            Compression::Snappy => lexicon::COMPRESSION_SNAPPY,
        }
    }

    // Acquisition is latency sensitive, so the zlib side trades ratio for
    // speed with level 1.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::Stored => Ok(data.to_vec()),
            Compression::Zlib => {
                let mut enc = ZlibEncoder::new(
                    Vec::with_capacity(data.len()),
                    flate2::Compression::new(1),
                );
                enc.write_all(data).map_err(|e| Error::Memory(e.to_string()))?;
                enc.finish().map_err(|e| Error::Memory(e.to_string()))
            }
            Compression::Snappy => snap::raw::Encoder::new()
                .compress_vec(data)
                .map_err(|e| Error::Codec(e.to_string())),
        }
    }

    /// Decode one chunk. `expected_len` is the chunk size, except for the
    /// final chunk of a stream which may decode shorter. Stored chunks are
    /// never padded, their natural length is preserved.
    pub fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        match self {
            Compression::Stored => Ok(data.to_vec()),
            Compression::Zlib => {
                let mut out = Vec::with_capacity(expected_len);
                ZlibDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(|e| Error::Codec(e.to_string()))?;
                Ok(out)
            }
            Compression::Snappy => snap::raw::Decoder::new()
                .decompress_vec(data)
                .map_err(|e| Error::Codec(e.to_string())),
        }
    }
}
