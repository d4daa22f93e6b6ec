use std::sync::PoisonError;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
  /// Failure reported by the backing medium (create, seek, read, write, stat, remove).
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  /// Unsupported capacity or a capacity that disagrees with an existing store.
  #[error("configuration error: {0}")]
  Config(String),

  /// The backing medium holds something that is not a ring store.
  #[error("invalid data: {0}")]
  InvalidData(String),

  #[error("physical index {position} is out of range for a ring of {capacity} slots")]
  OutOfRange { position: u64, capacity: u64 },

  #[error("the ring has been closed")]
  Closed,

  #[error("lock poisoned by a panicked writer")]
  Poisoned,
}

impl Error {
  pub fn config(msg: impl Into<String>) -> Self {
    Error::Config(msg.into())
  }

  pub fn invalid_data(msg: impl Into<String>) -> Self {
    Error::InvalidData(msg.into())
  }
}

impl<T> From<PoisonError<T>> for Error {
  fn from(_: PoisonError<T>) -> Self {
    Error::Poisoned
  }
}
