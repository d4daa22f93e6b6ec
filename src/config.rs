use crate::index::Layout;
use crate::{HashAlgorithm, Result};

pub const DEBUG_ENV: &str = "MERKLE_DEBUG";

/// Construction-time options of a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  /// log₂ of the number of slots; fixes the ring size at `2^B` and the tree depth at `B`.
  pub capacity_bits: u8,
  pub algorithm: HashAlgorithm,
  /// Verbose tracing. Observability only, no effect on the stored data.
  pub debug: bool,
}

impl Config {
  pub fn new(capacity_bits: u8) -> Self {
    Config { capacity_bits, algorithm: HashAlgorithm::default(), debug: false }
  }

  /// Like [`Config::new`], with `debug` taken from `MERKLE_DEBUG=true`.
  pub fn from_env(capacity_bits: u8) -> Self {
    Config { debug: debug_enabled(), ..Self::new(capacity_bits) }
  }

  pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
    self.algorithm = algorithm;
    self
  }

  pub fn with_debug(mut self, debug: bool) -> Self {
    self.debug = debug;
    self
  }

  /// Layout of the configured ring; fails unless `capacity_bits` lies in `[1, 32]`.
  pub fn validate(&self) -> Result<Layout> {
    Layout::new(self.capacity_bits)
  }
}

pub fn debug_enabled() -> bool {
  std::env::var(DEBUG_ENV).map(|v| v == "true").unwrap_or(false)
}
