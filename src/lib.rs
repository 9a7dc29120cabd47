//! Chunked, compressed image streams stored inside an archival evidence
//! volume.
//!
//! An image stream presents a logically contiguous byte sequence (a disk
//! image, a memory capture) while physically storing it as fixed size
//! chunks, compressed one at a time and batched into numbered bevies. Each
//! bevy lands in the enclosing volume as two members: the concatenated
//! compressed chunks, and a packed array of little endian u32 offsets into
//! them. Stream parameters live in a process wide attribute resolver, so a
//! flushed stream can be reopened later from its URN alone.
//!
//! ```
//! use std::rc::Rc;
//! use raff4::{ImageOptions, ImageStream, Resolver, Volume};
//!
//! let resolver = Rc::new(Resolver::new()?);
//! resolver.register_volume(Volume::new("aff4://volume")?);
//!
//! let mut stream = ImageStream::create(
//!     &resolver,
//!     "aff4://volume/image",
//!     "aff4://volume",
//!     ImageOptions { chunk_size: 512, ..ImageOptions::default() },
//! )?;
//! stream.write(b"evidence bytes")?;
//! stream.flush()?;
//!
//! stream.seek(0);
//! assert_eq!(stream.read(8)?, b"evidence".to_vec());
//! # Ok::<(), raff4::Error>(())
//! ```

pub mod bevy;
pub mod codec;
pub mod error;
pub mod image;
pub mod lexicon;
pub mod resolver;
pub mod volume;

pub use crate::codec::Compression;
pub use crate::error::{Error, Result};
pub use crate::image::{ImageOptions, ImageStream};
pub use crate::resolver::{open_stream, Resolver, Value};
pub use crate::volume::Volume;
