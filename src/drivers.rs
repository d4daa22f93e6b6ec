use std::fs::remove_file;
use std::time::{Duration, Instant};

use merkle_ring::{Config, Error, FileStorage, MemoryStorage, MerkleRing, Result, digest_of};

use crate::{Case, Driver};

pub struct MemoryAppendDriver {
  config: Config,
}

impl MemoryAppendDriver {
  pub fn new(config: Config) -> Self {
    MemoryAppendDriver { config }
  }
}

impl Driver<MerkleRing<MemoryStorage>, Duration> for MemoryAppendDriver {
  fn setup(&mut self, _case: &Case) -> Result<MerkleRing<MemoryStorage>> {
    MerkleRing::new(self.config, MemoryStorage::new())
  }

  #[inline(never)]
  fn run(&mut self, _case: &Case, ring: &mut MerkleRing<MemoryStorage>, n: u64) -> Result<Duration> {
    append(ring, n)
  }
}

pub struct FileAppendDriver {
  config: Config,
}

impl FileAppendDriver {
  pub fn new(config: Config) -> Self {
    FileAppendDriver { config }
  }
}

impl Driver<MerkleRing<FileStorage>, Duration> for FileAppendDriver {
  fn setup(&mut self, case: &Case) -> Result<MerkleRing<FileStorage>> {
    create(case, self.config, "ring-append.db")
  }

  #[inline(never)]
  fn run(&mut self, _case: &Case, ring: &mut MerkleRing<FileStorage>, n: u64) -> Result<Duration> {
    append(ring, n)
  }

  fn cleanup(&mut self, _case: &Case, ring: MerkleRing<FileStorage>) -> Result<()> {
    ring.delete()
  }
}

/// Reads back leaves that are still inside the retention window of a filled file ring. After the first
/// lookup the ring reuses its read handle, so each run times one seek and read.
pub struct FileLookupDriver {
  config: Config,
}

impl FileLookupDriver {
  pub fn new(config: Config) -> Self {
    FileLookupDriver { config }
  }
}

impl Driver<MerkleRing<FileStorage>, Duration> for FileLookupDriver {
  fn setup(&mut self, case: &Case) -> Result<MerkleRing<FileStorage>> {
    let ring = create(case, self.config, "ring-lookup.db")?;
    append(&ring, case.max_n)?;
    Ok(ring)
  }

  #[inline(never)]
  fn run(&mut self, _case: &Case, ring: &mut MerkleRing<FileStorage>, i: u64) -> Result<Duration> {
    let start = Instant::now();
    let digest = ring.leaf(i)?;
    let elapse = start.elapsed();
    if digest != digest_of(i) {
      return Err(Error::invalid_data(format!("entry {i} does not hold the digest appended for it")));
    }
    Ok(elapse)
  }

  fn cleanup(&mut self, _case: &Case, ring: MerkleRing<FileStorage>) -> Result<()> {
    ring.delete()
  }

  fn params(&self, case: &Case) -> Vec<u64> {
    // a quarter of the ring survives wrap-around untouched
    let window = retention_window(self.config.capacity_bits).min(case.max_n);
    (case.max_n - window..case.max_n).collect()
  }
}

fn retention_window(bits: u8) -> u64 {
  if bits < 2 { 1 } else { 1u64 << (bits - 2) }
}

fn create(case: &Case, config: Config, filename: &str) -> Result<MerkleRing<FileStorage>> {
  let path = case.file(filename);
  if path.exists() {
    remove_file(&path)?;
  }
  MerkleRing::create_on_file(&path, config)
}

fn append<S: merkle_ring::Storage>(ring: &MerkleRing<S>, n: u64) -> Result<Duration> {
  let start = Instant::now();
  for i in 0..n {
    ring.append(&digest_of(i))?;
  }
  Ok(start.elapsed())
}
