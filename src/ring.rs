use std::path::Path;
use std::sync::{Mutex, RwLock};

use tracing::{debug, info};

use crate::config::debug_enabled;
use crate::proof::{MerklePath, Sibling};
use crate::storage::{Reader, Storage};
use crate::{
  Config, Digest, Error, FileStorage, HashAlgorithm, Header, Layout, MemoryStorage, Position, Result, Slot, to_hex,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  Open,
  Closed,
}

struct Inner<S: Storage> {
  storage: S,
  header: Header,
  state: State,
}

impl<S: Storage> Inner<S> {
  fn ensure_open(&self) -> Result<()> {
    match self.state {
      State::Open => Ok(()),
      State::Closed => Err(Error::Closed),
    }
  }
}

/// Append-only Merkle log over a ring of `2^B` slots.
///
/// A single writer appends under the exclusive side of the lock; readers share the other side and each
/// read through a [`Reader`] of their own, so they never observe a half-written leaf. Read handles are
/// pooled and reused across lookups.
pub struct MerkleRing<S: Storage> {
  layout: Layout,
  algorithm: HashAlgorithm,
  verbose: bool,
  inner: RwLock<Inner<S>>,
  // read handles returned by finished lookups, reused by the next ones
  readers: Mutex<Vec<Box<dyn Reader>>>,
}

impl<S: Storage> MerkleRing<S> {
  /// Opens `storage` as a ring described by `config`, initializing it when it has never been used.
  /// An initialized storage must agree with the configured capacity and hash algorithm.
  pub fn new(config: Config, mut storage: S) -> Result<Self> {
    let layout = config.validate()?;
    let header = match storage.header()? {
      None => {
        let header = Header::new(config.capacity_bits, config.algorithm);
        storage.initialize(&header)?;
        info!(bits = header.bits, algorithm = %header.algorithm, "created ring");
        header
      }
      Some(header) => {
        if header.bits != config.capacity_bits {
          return Err(Error::config(format!(
            "existing ring has capacity_bits {}, but {} was requested",
            header.bits, config.capacity_bits
          )));
        }
        if header.algorithm != config.algorithm {
          return Err(Error::config(format!(
            "existing ring hashes with {}, but {} was requested",
            header.algorithm, config.algorithm
          )));
        }
        info!(bits = header.bits, epoch = header.epoch, head = header.head, "opened ring");
        header
      }
    };
    Ok(Self::assemble(layout, storage, header, config.debug))
  }

  /// Opens an already initialized storage with the parameters it was created with.
  pub fn open(mut storage: S) -> Result<Self> {
    let header = storage.header()?.ok_or_else(|| Error::invalid_data("storage has no ring header"))?;
    let layout = header.layout()?;
    info!(bits = header.bits, epoch = header.epoch, head = header.head, "opened ring");
    Ok(Self::assemble(layout, storage, header, debug_enabled()))
  }

  fn assemble(layout: Layout, storage: S, header: Header, verbose: bool) -> Self {
    let algorithm = header.algorithm;
    let inner = RwLock::new(Inner { storage, header, state: State::Open });
    MerkleRing { layout, algorithm, verbose, inner, readers: Mutex::new(Vec::new()) }
  }

  pub fn layout(&self) -> Layout {
    self.layout
  }

  pub fn bits(&self) -> u8 {
    self.layout.bits()
  }

  pub fn capacity(&self) -> u64 {
    self.layout.capacity()
  }

  pub fn algorithm(&self) -> HashAlgorithm {
    self.algorithm
  }

  pub fn header(&self) -> Result<Header> {
    Ok(self.inner.read()?.header)
  }

  /// Ring position the next append will fill.
  pub fn head(&self) -> Result<u64> {
    Ok(self.header()?.head)
  }

  /// Number of completed wrap-arounds.
  pub fn epoch(&self) -> Result<u32> {
    Ok(self.header()?.epoch)
  }

  /// `(epoch, head)` read together under one lock acquisition.
  pub fn position(&self) -> Result<(u32, u64)> {
    let header = self.header()?;
    Ok((header.epoch, header.head))
  }

  pub fn state(&self) -> Result<State> {
    Ok(self.inner.read()?.state)
  }

  /// Appends `digest` as the next leaf and rehashes its path to the root.
  ///
  /// Returns the logical index assigned to the entry, `epoch·2^B + head` as observed under the lock.
  /// On error neither `head` nor `epoch` advance; slots already rewritten along the path stay as they are
  /// until a later append over the same path recomputes them.
  pub fn append(&self, digest: &Digest) -> Result<u64> {
    let mut inner = self.inner.write()?;
    inner.ensure_open()?;

    let header = inner.header;
    let m = header.head;
    let leaf = self.layout.index_of(m, 0);
    debug!(m, leaf, digest = %to_hex(digest), "append");
    inner.storage.put(leaf, digest)?;

    for r in 1..self.layout.bits() {
      let p = self.layout.index_of(m, r);
      let hl = inner.storage.get(self.layout.left(p, r))?;
      let hr = inner.storage.get(self.layout.right(p))?;
      if let Some(parent) = self.algorithm.merge(&hl, &hr) {
        inner.storage.put(p, &parent)?;
      }
    }

    if self.verbose {
      debug!(m, path = ?self.layout.path(m), "rehashed path");
    }

    let next = header.advance();
    inner.storage.put_header(&next)?;
    inner.header = next;
    if next.epoch != header.epoch {
      debug!(epoch = next.epoch, "ring wrapped");
    }
    Ok(header.logical_index())
  }

  /// Digest stored at physical slot `position`.
  pub fn get(&self, position: Position) -> Result<Digest> {
    self.check_range(position)?;
    self.with_reader(|reader| reader.read(position))
  }

  pub fn slot(&self, position: Position) -> Result<Slot> {
    self.get(position).map(Slot::from_digest)
  }

  /// Leaf slot of logical index `n`. Only meaningful while `n` is inside the retention window.
  pub fn leaf(&self, n: u64) -> Result<Digest> {
    self.get(self.layout.index_of(n, 0))
  }

  /// Leaf of ring position `m` with the sibling of every level above it and the level `B-1` node the path
  /// ends in.
  pub fn path(&self, m: u64) -> Result<MerklePath> {
    let m = self.layout.ring_position(m);
    self.with_reader(|reader| {
      let leaf = reader.read(self.layout.index_of(m, 0))?;
      let mut siblings = Vec::with_capacity(self.layout.bits() as usize - 1);
      for r in 1..self.layout.bits() {
        let p = self.layout.index_of(m, r);
        let sibling = if self.layout.is_left_child(m, r) {
          Sibling::Right(reader.read(self.layout.right(p))?)
        } else {
          Sibling::Left(reader.read(self.layout.left(p, r))?)
        };
        siblings.push(sibling);
      }
      let top = reader.read(self.layout.index_of(m, self.layout.bits() - 1))?;
      Ok(MerklePath { position: m, leaf, siblings, top })
    })
  }

  /// Runs `f` under the shared lock with a pooled read handle, opening a new one only when all pooled
  /// handles are in use.
  fn with_reader<T>(&self, f: impl FnOnce(&mut dyn Reader) -> Result<T>) -> Result<T> {
    let inner = self.inner.read()?;
    inner.ensure_open()?;
    let pooled = self.readers.lock()?.pop();
    let mut reader = match pooled {
      Some(reader) => reader,
      None => inner.storage.reader()?,
    };
    let result = f(reader.as_mut());
    self.readers.lock()?.push(reader);
    result
  }

  /// Flushes the storage and stops accepting operations. Closing twice is not an error.
  pub fn close(&self) -> Result<()> {
    let mut inner = self.inner.write()?;
    if inner.state == State::Closed {
      return Ok(());
    }
    inner.storage.sync()?;
    self.readers.lock()?.clear();
    inner.state = State::Closed;
    info!(epoch = inner.header.epoch, head = inner.header.head, "closed ring");
    Ok(())
  }

  /// Gives the storage back, closing the ring first.
  pub fn into_storage(self) -> Result<S> {
    self.close()?;
    Ok(self.inner.into_inner()?.storage)
  }

  fn check_range(&self, position: Position) -> Result<()> {
    if position >= self.layout.capacity() {
      return Err(Error::OutOfRange { position, capacity: self.layout.capacity() });
    }
    Ok(())
  }
}

impl MerkleRing<MemoryStorage> {
  pub fn on_memory(capacity_bits: u8) -> Result<Self> {
    Self::new(Config::new(capacity_bits), MemoryStorage::new())
  }
}

impl MerkleRing<FileStorage> {
  /// Creates a ring in a new file. Fails if `path` already exists.
  pub fn create_on_file<P: AsRef<Path>>(path: P, config: Config) -> Result<Self> {
    config.validate()?;
    Self::new(config, FileStorage::create(path)?)
  }

  /// Opens the ring stored in an existing file.
  pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    Self::open(FileStorage::open(path)?)
  }

  /// Opens the file when it exists and creates it otherwise.
  pub fn open_or_create<P: AsRef<Path>>(path: P, config: Config) -> Result<Self> {
    if path.as_ref().exists() {
      Self::new(config, FileStorage::open(path)?)
    } else {
      Self::create_on_file(path, config)
    }
  }

  /// Closes the ring and removes its file.
  pub fn delete(self) -> Result<()> {
    let storage = self.into_storage()?;
    info!(path = %storage.path().display(), "deleting ring");
    storage.remove()
  }
}
