use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::io::{Read, Write};

use crate::index::{Layout, pow2e};
use crate::{Error, HASH_SIZE, HashAlgorithm, Result};

pub const HEADER_SIZE: usize = HASH_SIZE;

/// Ring state persisted next to the slots.
///
/// Encoded big-endian into one 32-byte block:
///
/// ```text
/// bytes  0..  3 : reserved, byte 3 carries the hash algorithm tag (0 = SHA-256)
/// bytes  4..  7 : B      (u32)
/// bytes  8.. 11 : epoch  (u32)
/// bytes 12.. 19 : head   (u64)
/// bytes 20.. 31 : reserved (zero)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
  pub bits: u8,
  pub epoch: u32,
  pub head: u64,
  pub algorithm: HashAlgorithm,
}

impl Header {
  pub fn new(bits: u8, algorithm: HashAlgorithm) -> Self {
    Header { bits, epoch: 0, head: 0, algorithm }
  }

  pub fn layout(&self) -> Result<Layout> {
    Layout::new(self.bits)
  }

  /// Header after one more append; `head` wraps to 0 and bumps `epoch` when it reaches `2^B`.
  pub fn advance(&self) -> Header {
    let mut next = *self;
    next.head += 1;
    if next.head >= pow2e(self.bits) {
      next.head = 0;
      next.epoch = next.epoch.wrapping_add(1);
    }
    next
  }

  /// Unbounded logical index of the entry at `head`.
  pub fn logical_index(&self) -> u64 {
    ((self.epoch as u64) << self.bits) | self.head
  }

  pub fn write<W: Write>(&self, w: &mut W) -> Result<usize> {
    w.write_all(&self.to_bytes())?;
    Ok(HEADER_SIZE)
  }

  pub fn read<R: Read>(r: &mut R) -> Result<Self> {
    let mut reserved = [0u8; 4];
    r.read_exact(&mut reserved)?;
    let algorithm = HashAlgorithm::from_tag(reserved[3])?;
    let bits = r.read_u32::<BigEndian>()?;
    let epoch = r.read_u32::<BigEndian>()?;
    let head = r.read_u64::<BigEndian>()?;
    let mut tail = [0u8; 12];
    r.read_exact(&mut tail)?;

    let bits = u8::try_from(bits).map_err(|_| Error::invalid_data(format!("capacity bits out of range: {bits}")))?;
    let layout = Layout::new(bits).map_err(|_| Error::invalid_data(format!("capacity bits out of range: {bits}")))?;
    if head >= layout.capacity() {
      return Err(Error::invalid_data(format!("head {head} is beyond the ring capacity {}", layout.capacity())));
    }
    Ok(Header { bits, epoch, head, algorithm })
  }

  pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
    let mut buffer = [0u8; HEADER_SIZE];
    buffer[3] = self.algorithm.tag();
    BigEndian::write_u32(&mut buffer[4..8], self.bits as u32);
    BigEndian::write_u32(&mut buffer[8..12], self.epoch);
    BigEndian::write_u64(&mut buffer[12..20], self.head);
    buffer
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  #[test]
  fn big_endian_layout() {
    let header = Header { bits: 10, epoch: 0x01020304, head: 0x0a0b0c0d0e0f1011, algorithm: HashAlgorithm::Sha256 };
    let bytes = header.to_bytes();
    assert_eq!([0, 0, 0, 0], bytes[0..4]);
    assert_eq!([0, 0, 0, 10], bytes[4..8]);
    assert_eq!([1, 2, 3, 4], bytes[8..12]);
    assert_eq!([0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11], bytes[12..20]);
    assert!(bytes[20..].iter().all(|b| *b == 0));

    let blake = Header { algorithm: HashAlgorithm::Blake3, ..header };
    assert_eq!([0, 0, 0, 1], blake.to_bytes()[0..4]);
  }

  #[test]
  fn read_back() {
    let header = Header { bits: 8, epoch: 3, head: 244, algorithm: HashAlgorithm::Blake3 };
    let read = Header::read(&mut Cursor::new(header.to_bytes())).unwrap();
    assert_eq!(header, read);
  }

  #[test]
  fn write_emits_the_encoded_block() {
    let header = Header { bits: 32, epoch: u32::MAX, head: (1 << 32) - 1, algorithm: HashAlgorithm::Blake3 };
    let mut out = Vec::new();
    assert_eq!(HEADER_SIZE, header.write(&mut out).unwrap());
    assert_eq!(header.to_bytes().to_vec(), out);
    assert_eq!([0, 0, 0, 1, 0, 0, 0, 32, 0xff, 0xff, 0xff, 0xff], out[..12]);
    assert_eq!(header, Header::read(&mut Cursor::new(out)).unwrap());

    let mut short = [0u8; 16];
    assert!(matches!(header.write(&mut &mut short[..]), Err(Error::Io(_))));
  }

  #[test]
  fn reject_damaged_headers() {
    let mut bytes = Header::new(8, HashAlgorithm::Sha256).to_bytes();
    bytes[7] = 40;
    assert!(matches!(Header::read(&mut Cursor::new(bytes)), Err(Error::InvalidData(_))));

    let bytes = Header { bits: 4, epoch: 0, head: 16, algorithm: HashAlgorithm::Sha256 }.to_bytes();
    assert!(matches!(Header::read(&mut Cursor::new(bytes)), Err(Error::InvalidData(_))));

    let mut bytes = Header::new(4, HashAlgorithm::Sha256).to_bytes();
    bytes[3] = 7;
    assert!(matches!(Header::read(&mut Cursor::new(bytes)), Err(Error::InvalidData(_))));

    assert!(matches!(Header::read(&mut Cursor::new([0u8; 10])), Err(Error::Io(_))));
  }

  #[test]
  fn advance_wraps_at_capacity() {
    let mut header = Header::new(2, HashAlgorithm::Sha256);
    let mut seen = Vec::new();
    for _ in 0..9 {
      header = header.advance();
      seen.push((header.epoch, header.head));
    }
    assert_eq!(vec![(0, 1), (0, 2), (0, 3), (1, 0), (1, 1), (1, 2), (1, 3), (2, 0), (2, 1)], seen);
    assert_eq!(9, header.logical_index());
  }
}
