use std::fmt::Display;
use std::str::FromStr;

use sha2::{Digest as _, Sha256};

use crate::{Digest, Error, Result, ZERO_DIGEST};

/// Hash function for interior nodes. The tag is persisted in the store header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
  #[default]
  Sha256,
  Blake3,
}

impl HashAlgorithm {
  pub fn tag(&self) -> u8 {
    match self {
      HashAlgorithm::Sha256 => 0,
      HashAlgorithm::Blake3 => 1,
    }
  }

  pub fn from_tag(tag: u8) -> Result<Self> {
    match tag {
      0 => Ok(HashAlgorithm::Sha256),
      1 => Ok(HashAlgorithm::Blake3),
      _ => Err(Error::invalid_data(format!("unknown hash algorithm tag: {tag}"))),
    }
  }

  /// Digest of arbitrary bytes, for callers that build leaves from raw data.
  pub fn hash(&self, data: &[u8]) -> Digest {
    match self {
      HashAlgorithm::Sha256 => Sha256::digest(data).into(),
      HashAlgorithm::Blake3 => *blake3::hash(data).as_bytes(),
    }
  }

  /// `H(left ‖ right)`.
  pub fn combine(&self, left: &Digest, right: &Digest) -> Digest {
    match self {
      HashAlgorithm::Sha256 => {
        let mut hasher = Sha256::new();
        hasher.update(left);
        hasher.update(right);
        hasher.finalize().into()
      }
      HashAlgorithm::Blake3 => {
        let mut hasher = blake3::Hasher::new();
        hasher.update(left);
        hasher.update(right);
        *hasher.finalize().as_bytes()
      }
    }
  }

  /// Parent value under the child-emptiness rule. `None` means both children are empty and the parent
  /// slot is left as it is.
  pub fn merge(&self, left: &Digest, right: &Digest) -> Option<Digest> {
    match (*left == ZERO_DIGEST, *right == ZERO_DIGEST) {
      (true, true) => None,
      (true, false) => Some(*right),
      (false, true) => Some(*left),
      (false, false) => Some(self.combine(left, right)),
    }
  }
}

impl Display for HashAlgorithm {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      HashAlgorithm::Sha256 => "sha256",
      HashAlgorithm::Blake3 => "blake3",
    })
  }
}

impl FromStr for HashAlgorithm {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
      "blake3" => Ok(HashAlgorithm::Blake3),
      _ => Err(Error::config(format!("unsupported hash algorithm: {s}"))),
    }
  }
}
