use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::header::HEADER_SIZE;
use crate::index::pow2e;
use crate::storage::{Reader, Storage};
use crate::{Digest, Error, HASH_SIZE, Header, Position, Result};

/// Byte offset of slot `p`. The header occupies a 32-byte preamble in front of the slots.
#[inline]
pub fn slot_offset(position: Position) -> u64 {
  HEADER_SIZE as u64 + HASH_SIZE as u64 * position
}

/// Exact length of a store file for a `bits`-bit ring.
#[inline]
pub fn file_length(bits: u8) -> u64 {
  slot_offset(pow2e(bits))
}

/// Slot store over a fixed-length file, accessed with explicit seeks.
pub struct FileStorage {
  path: PathBuf,
  file: File,
}

impl FileStorage {
  /// Creates a new, empty file. Fails if the file already exists.
  pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let file = OpenOptions::new().read(true).write(true).create_new(true).open(&path)?;
    debug!(path = %path.display(), "created store file");
    Ok(FileStorage { path, file })
  }

  /// Opens an existing file for reading and writing.
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let file = OpenOptions::new().read(true).write(true).open(&path)?;
    debug!(path = %path.display(), "opened store file");
    Ok(FileStorage { path, file })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Closes the handle and removes the file.
  pub fn remove(self) -> Result<()> {
    let FileStorage { path, file } = self;
    drop(file);
    fs::remove_file(&path)?;
    debug!(path = %path.display(), "removed store file");
    Ok(())
  }
}

impl Storage for FileStorage {
  fn header(&mut self) -> Result<Option<Header>> {
    let length = self.file.metadata()?.len();
    if length == 0 {
      return Ok(None);
    }
    if length < HEADER_SIZE as u64 {
      return Err(Error::invalid_data(format!("{} is too short for a ring store: {length} bytes", self.path.display())));
    }
    self.file.seek(SeekFrom::Start(0))?;
    let header = Header::read(&mut self.file)?;
    let expected = file_length(header.bits);
    if length != expected {
      return Err(Error::invalid_data(format!(
        "{} has {length} bytes but a {}-bit ring needs {expected}",
        self.path.display(),
        header.bits
      )));
    }
    debug!(bits = header.bits, epoch = header.epoch, head = header.head, "read header");
    Ok(Some(header))
  }

  fn initialize(&mut self, header: &Header) -> Result<()> {
    // set_len zero-fills, so every slot starts as the empty sentinel
    self.file.set_len(0)?;
    self.file.set_len(file_length(header.bits))?;
    self.put_header(header)
  }

  fn put_header(&mut self, header: &Header) -> Result<()> {
    debug!(bits = header.bits, epoch = header.epoch, head = header.head, "write header");
    self.file.seek(SeekFrom::Start(0))?;
    self.file.write_all(&header.to_bytes())?;
    Ok(())
  }

  fn get(&mut self, position: Position) -> Result<Digest> {
    debug!(position, "get slot");
    let mut digest = [0u8; HASH_SIZE];
    self.file.seek(SeekFrom::Start(slot_offset(position)))?;
    self.file.read_exact(&mut digest)?;
    Ok(digest)
  }

  fn put(&mut self, position: Position, digest: &Digest) -> Result<()> {
    debug!(position, "put slot");
    self.file.seek(SeekFrom::Start(slot_offset(position)))?;
    self.file.write_all(digest)?;
    Ok(())
  }

  fn reader(&self) -> Result<Box<dyn Reader>> {
    let file = File::open(&self.path)?;
    Ok(Box::new(FileReader { file }))
  }

  fn sync(&mut self) -> Result<()> {
    self.file.flush()?;
    self.file.sync_all()?;
    Ok(())
  }
}

struct FileReader {
  file: File,
}

impl Reader for FileReader {
  fn read(&mut self, position: Position) -> Result<Digest> {
    let mut digest = [0u8; HASH_SIZE];
    self.file.seek(SeekFrom::Start(slot_offset(position)))?;
    self.file.read_exact(&mut digest)?;
    Ok(digest)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{HashAlgorithm, ZERO_DIGEST, digest_of};
  use tempfile::{NamedTempFile, tempdir};

  #[test]
  fn initialize_sizes_and_zero_fills() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ring.db");
    let mut storage = FileStorage::create(&path).unwrap();
    assert_eq!(None, storage.header().unwrap());

    let header = Header::new(4, HashAlgorithm::Sha256);
    storage.initialize(&header).unwrap();
    assert_eq!(32 * 17, fs::metadata(&path).unwrap().len());
    assert_eq!(Some(header), storage.header().unwrap());
    for p in 0..16 {
      assert_eq!(ZERO_DIGEST, storage.get(p).unwrap());
    }
  }

  #[test]
  fn slots_live_behind_the_header() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut storage = FileStorage::open(temp_file.path()).unwrap();
    let header = Header { bits: 3, epoch: 2, head: 5, algorithm: HashAlgorithm::Sha256 };
    storage.initialize(&header).unwrap();
    storage.put(0, &digest_of(0)).unwrap();
    storage.put(7, &digest_of(7)).unwrap();
    storage.sync().unwrap();

    let bytes = fs::read(temp_file.path()).unwrap();
    assert_eq!(header.to_bytes(), bytes[0..32]);
    assert_eq!(digest_of(0), bytes[32..64]);
    assert_eq!(digest_of(7), bytes[32 * 8..32 * 9]);

    let mut reader = storage.reader().unwrap();
    assert_eq!(digest_of(7), reader.read(7).unwrap());
    assert_eq!(ZERO_DIGEST, reader.read(6).unwrap());
  }

  #[test]
  fn reject_foreign_files() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(temp_file.path(), b"not a ring").unwrap();
    let mut storage = FileStorage::open(temp_file.path()).unwrap();
    assert!(matches!(storage.header(), Err(Error::InvalidData(_))));

    // a valid header followed by the wrong number of slots
    let mut bytes = Header::new(4, HashAlgorithm::Sha256).to_bytes().to_vec();
    bytes.extend_from_slice(&[0u8; 32 * 3]);
    fs::write(temp_file.path(), &bytes).unwrap();
    let mut storage = FileStorage::open(temp_file.path()).unwrap();
    assert!(matches!(storage.header(), Err(Error::InvalidData(_))));
  }

  #[test]
  fn create_refuses_existing_files() {
    let temp_file = NamedTempFile::new().unwrap();
    assert!(matches!(FileStorage::create(temp_file.path()), Err(Error::Io(_))));
  }

  #[test]
  fn remove_deletes_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ring.db");
    let storage = FileStorage::create(&path).unwrap();
    assert!(path.exists());
    storage.remove().unwrap();
    assert!(!path.exists());
  }
}
