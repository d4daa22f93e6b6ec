//! A bounded, append-only Merkle log over a fixed-capacity ring of `2^B` slots.
//!
//! Leaves and interior nodes share one contiguous array. Slot addresses follow a depth-first post-order
//! traversal of an unbounded binary tree projected modulo `2^B`, so every append rewrites exactly `B`
//! slots on a single leaf-to-root path and the oldest entries are the ones overwritten on wrap-around.

use std::fmt::{Debug, Display};

pub mod config;
pub mod error;
pub mod hash;
pub mod header;
pub mod index;
pub mod logging;
pub mod proof;
pub mod ring;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use hash::HashAlgorithm;
pub use header::Header;
pub use index::Layout;
pub use proof::{MerklePath, Sibling};
pub use ring::MerkleRing;
pub use storage::file::FileStorage;
pub use storage::memory::MemoryStorage;
pub use storage::{Reader, Storage};

pub const HASH_SIZE: usize = 32;

/// An opaque 32-byte value: a caller-supplied leaf or the hash of two children.
pub type Digest = [u8; HASH_SIZE];

/// The all-zero digest marks a slot that no live leaf has written.
pub const ZERO_DIGEST: Digest = [0u8; HASH_SIZE];

/// Physical slot address in `[0, 2^B)`.
pub type Position = u64;

/// Typed view of a slot. On the medium an empty slot is still 32 zero bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Slot {
  Empty,
  Filled(Digest),
}

impl Slot {
  pub fn from_digest(digest: Digest) -> Self {
    if digest == ZERO_DIGEST { Slot::Empty } else { Slot::Filled(digest) }
  }

  pub fn digest(&self) -> Digest {
    match self {
      Slot::Empty => ZERO_DIGEST,
      Slot::Filled(digest) => *digest,
    }
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, Slot::Empty)
  }
}

impl Debug for Slot {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    Display::fmt(self, f)
  }
}

impl Display for Slot {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Slot::Empty => f.write_str("∅"),
      Slot::Filled(digest) => f.write_str(&to_hex(digest)),
    }
  }
}

pub fn to_hex(digest: &Digest) -> String {
  digest.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn splitmix64(x: u64) -> u64 {
  let mut z = x.wrapping_add(0x9e3779b97f4a7c15);
  z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
  z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
  z ^ (z >> 31)
}

/// Deterministic, never-zero digest for the `i`-th synthetic entry.
pub fn digest_of(i: u64) -> Digest {
  let mut digest = [0u8; HASH_SIZE];
  for (k, chunk) in digest.chunks_exact_mut(8).enumerate() {
    chunk.copy_from_slice(&splitmix64(i.wrapping_mul(4).wrapping_add(k as u64)).to_le_bytes());
  }
  digest[0] |= 1;
  digest
}
