use merkle_ring::{Result, digest_of};
use std::fs::{File, OpenOptions, remove_file};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::{Case, Driver};

/// Baseline: the same digests written back to back into a plain file, no hashing.
pub struct AppendDriver {
  path: Option<PathBuf>,
}

impl AppendDriver {
  pub fn new() -> Self {
    AppendDriver { path: None }
  }
}

impl Driver<File, Duration> for AppendDriver {
  fn setup(&mut self, case: &Case) -> Result<File> {
    let path = case.file("seqfile.db");
    if path.exists() {
      remove_file(&path)?;
    }
    self.path = Some(path.clone());
    Ok(OpenOptions::new().create_new(true).write(true).open(&path)?)
  }

  #[inline(never)]
  fn run(&mut self, _case: &Case, file: &mut File, n: u64) -> Result<Duration> {
    let start = Instant::now();
    for i in 0..n {
      file.write_all(&digest_of(i))?;
    }
    file.flush()?;
    Ok(start.elapsed())
  }

  fn cleanup(&mut self, _case: &Case, file: File) -> Result<()> {
    drop(file);
    if let Some(path) = self.path.take() {
      remove_file(path)?;
    }
    Ok(())
  }
}
