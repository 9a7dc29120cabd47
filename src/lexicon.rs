//! Normative URNs for the attribute schema and the codec identities.

pub const AFF4_NS: &str = "http://aff4.org/Schema#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const IMAGE_STREAM_TYPE: &str = "http://aff4.org/Schema#ImageStream";

pub const STORED: &str = "http://aff4.org/Schema#stored";
pub const CHUNK_SIZE: &str = "http://aff4.org/Schema#chunk_size";
pub const CHUNKS_PER_SEGMENT: &str = "http://aff4.org/Schema#chunks_per_segment";
pub const STREAM_SIZE: &str = "http://aff4.org/Schema#stream_size";
pub const COMPRESSION: &str = "http://aff4.org/Schema#compression";

pub const COMPRESSION_STORED: &str = "http://aff4.org/Schema#compression/stored";
pub const COMPRESSION_DEFLATE: &str = "http://aff4.org/Schema#compression/deflate";
pub const COMPRESSION_SNAPPY: &str = "http://aff4.org/Schema#compression/snappy";

/// Largest single read the pipeline will serve.
pub const MAX_READ_LEN: u64 = 1024 * 1024 * 1024;
