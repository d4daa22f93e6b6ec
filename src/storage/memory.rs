use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::storage::{Reader, Storage};
use crate::{Digest, Header, Position, Result, ZERO_DIGEST};

#[derive(Default)]
struct Slots {
  header: Option<Header>,
  // empty slots are absent, so a 32-bit ring costs nothing until it fills
  slots: HashMap<Position, Digest>,
}

/// RAM-backed slot store. Clones share the same slots.
#[derive(Clone, Default)]
pub struct MemoryStorage {
  inner: Arc<RwLock<Slots>>,
}

struct MemoryReader {
  inner: Arc<RwLock<Slots>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of slots currently holding a non-empty digest.
  pub fn occupied(&self) -> Result<usize> {
    Ok(self.inner.read()?.slots.len())
  }
}

impl Storage for MemoryStorage {
  fn header(&mut self) -> Result<Option<Header>> {
    Ok(self.inner.read()?.header)
  }

  fn initialize(&mut self, header: &Header) -> Result<()> {
    let mut inner = self.inner.write()?;
    inner.slots.clear();
    inner.header = Some(*header);
    Ok(())
  }

  fn put_header(&mut self, header: &Header) -> Result<()> {
    self.inner.write()?.header = Some(*header);
    Ok(())
  }

  fn get(&mut self, position: Position) -> Result<Digest> {
    Ok(self.inner.read()?.slots.get(&position).copied().unwrap_or(ZERO_DIGEST))
  }

  fn put(&mut self, position: Position, digest: &Digest) -> Result<()> {
    let mut inner = self.inner.write()?;
    if *digest == ZERO_DIGEST {
      inner.slots.remove(&position);
    } else {
      inner.slots.insert(position, *digest);
    }
    Ok(())
  }

  fn reader(&self) -> Result<Box<dyn Reader>> {
    Ok(Box::new(MemoryReader { inner: self.inner.clone() }))
  }

  fn sync(&mut self) -> Result<()> {
    Ok(())
  }
}

impl Reader for MemoryReader {
  fn read(&mut self, position: Position) -> Result<Digest> {
    Ok(self.inner.read()?.slots.get(&position).copied().unwrap_or(ZERO_DIGEST))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{HashAlgorithm, digest_of};

  #[test]
  fn sparse_slots() {
    let mut storage = MemoryStorage::new();
    assert_eq!(None, storage.header().unwrap());
    storage.initialize(&Header::new(32, HashAlgorithm::Sha256)).unwrap();
    assert_eq!(0, storage.occupied().unwrap());

    storage.put(u32::MAX as u64, &digest_of(1)).unwrap();
    storage.put(3, &digest_of(2)).unwrap();
    assert_eq!(2, storage.occupied().unwrap());
    assert_eq!(digest_of(1), storage.get(u32::MAX as u64).unwrap());
    assert_eq!(ZERO_DIGEST, storage.get(4).unwrap());

    storage.put(3, &ZERO_DIGEST).unwrap();
    assert_eq!(1, storage.occupied().unwrap());
  }

  #[test]
  fn readers_observe_the_shared_slots() {
    let mut storage = MemoryStorage::new();
    storage.initialize(&Header::new(4, HashAlgorithm::Sha256)).unwrap();
    let mut reader = storage.reader().unwrap();
    assert_eq!(ZERO_DIGEST, reader.read(5).unwrap());
    storage.put(5, &digest_of(5)).unwrap();
    assert_eq!(digest_of(5), reader.read(5).unwrap());

    let clone = storage.clone();
    assert_eq!(1, clone.occupied().unwrap());
  }

  #[test]
  fn initialize_discards_previous_slots() {
    let mut storage = MemoryStorage::new();
    storage.initialize(&Header::new(4, HashAlgorithm::Sha256)).unwrap();
    storage.put(1, &digest_of(1)).unwrap();
    let header = Header { head: 3, ..Header::new(4, HashAlgorithm::Blake3) };
    storage.initialize(&header).unwrap();
    assert_eq!(0, storage.occupied().unwrap());
    assert_eq!(Some(header), storage.header().unwrap());
  }
}
