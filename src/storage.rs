use crate::{Digest, Header, Position, Result};

pub mod file;
pub mod memory;

/// Random-access slot store of `2^B` digests plus the ring header.
///
/// Positions are trusted: the ring only passes addresses produced by its [`Layout`](crate::Layout).
pub trait Storage: Send {
  /// The persisted header, or `None` for a medium that has never been initialized.
  fn header(&mut self) -> Result<Option<Header>>;

  /// Sizes the medium for `2^header.bits` zeroed slots and writes the header.
  fn initialize(&mut self, header: &Header) -> Result<()>;

  fn put_header(&mut self, header: &Header) -> Result<()>;

  fn get(&mut self, position: Position) -> Result<Digest>;

  fn put(&mut self, position: Position, digest: &Digest) -> Result<()>;

  /// An independent read handle, usable while other readers hold their own.
  fn reader(&self) -> Result<Box<dyn Reader>>;

  /// Flushes everything written so far to the medium.
  fn sync(&mut self) -> Result<()>;
}

pub trait Reader: Send {
  fn read(&mut self, position: Position) -> Result<Digest>;
}
