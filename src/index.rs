use std::fmt::Display;

use crate::{Error, Position, Result};

pub const MIN_BITS: u8 = 1;
pub const MAX_BITS: u8 = 32;

/// `2^e` as a `u64`.
#[inline]
pub fn pow2e(e: u8) -> u64 {
  debug_assert!(e < 64);
  1u64 << e
}

/// Maps logical leaf positions and ring levels onto the `2^B` physical slots.
///
/// The physical order is the post-order traversal of an unbounded binary tree shifted by two and
/// projected modulo `2^B`:
///
/// ```text
///            level 2                 6+2
///                              ┌──────┴──────┐
///            level 1          2+2           5+2
///                           ┌──┴──┐       ┌──┴──┐
///            level 0       0+2   1+2     3+2   4+2
///            m             0     1       2     3
/// ```
///
/// A leaf's post-order offset is `Σ bit_k(m)·(2^(k+1) − 1)`, i.e. the sizes of the complete left
/// subtrees that precede it. Walking up from a leaf, the parent at level `i` is `2^i` slots ahead when
/// the leaf lies in its left subtree and the very next slot when it lies in the right one.
///
/// All functions here are total and pure; `m` is reduced to the ring before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
  bits: u8,
}

impl Layout {
  pub fn new(bits: u8) -> Result<Self> {
    if !(MIN_BITS..=MAX_BITS).contains(&bits) {
      return Err(Error::config(format!("capacity_bits must be in [{MIN_BITS}, {MAX_BITS}], but {bits}")));
    }
    Ok(Layout { bits })
  }

  #[inline]
  pub fn bits(&self) -> u8 {
    self.bits
  }

  /// Number of physical slots, `2^B`.
  #[inline]
  pub fn capacity(&self) -> u64 {
    pow2e(self.bits)
  }

  #[inline]
  fn mask(&self) -> u64 {
    self.capacity() - 1
  }

  /// Position of logical index `n` within the current ring.
  #[inline]
  pub fn ring_position(&self, n: u64) -> u64 {
    n & self.mask()
  }

  /// Physical slot of the leaf at ring position `m`.
  pub fn root_of(&self, m: u64) -> Position {
    let mut p = 0u64;
    for k in 0..self.bits {
      if (m >> k) & 1 != 0 {
        p += 2 * pow2e(k) - 1;
      }
    }
    (p + 2) & self.mask()
  }

  /// Walks `r` levels up from `p` along the path of leaf `m`.
  pub fn down(&self, mut p: Position, m: u64, r: u8) -> Position {
    for i in 1..=r {
      if (m >> (i - 1)) & 1 == 0 {
        p += pow2e(i);
      } else {
        p += 1;
      }
    }
    p & self.mask()
  }

  /// Physical slot of the node at ring level `r` on the path of leaf `m`.
  pub fn index_of(&self, m: u64, r: u8) -> Position {
    debug_assert!(r <= self.bits, "level {r} is above the root of a {}-bit ring", self.bits);
    let m = self.ring_position(m);
    self.down(self.root_of(m), m, r)
  }

  /// Left child of the interior node at slot `p` on level `r`.
  #[inline]
  pub fn left(&self, p: Position, r: u8) -> Position {
    let capacity = self.capacity();
    ((p & self.mask()) + 2 * capacity - pow2e(r)) % capacity
  }

  /// Right child of the interior node at slot `p`.
  #[inline]
  pub fn right(&self, p: Position) -> Position {
    let capacity = self.capacity();
    ((p & self.mask()) + 2 * capacity - 1) % capacity
  }

  /// The `B` slots an append at ring position `m` writes, from the leaf upwards.
  pub fn path(&self, m: u64) -> Vec<Position> {
    (0..self.bits).map(|r| self.index_of(m, r)).collect()
  }

  /// Whether leaf `m` lies in the left subtree of its ancestor at level `r ≥ 1`.
  #[inline]
  pub fn is_left_child(&self, m: u64, r: u8) -> bool {
    debug_assert!(r >= 1);
    (m >> (r - 1)) & 1 == 0
  }
}

impl Display for Layout {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Layout{{bits:{}, capacity:{}}}", self.bits, self.capacity())
  }
}
