use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("codec rejected chunk: {0}")]
    Codec(String),
    #[error("codec could not allocate: {0}")]
    Memory(String),
}

impl Error {
    // Structural corruption and bookkeeping failures surface as i/o errors.
    pub(crate) fn io(msg: String) -> Error {
        Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
    }
}
