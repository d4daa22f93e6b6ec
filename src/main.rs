use chrono::Local;
use clap::Parser;
use merkle_ring::{Config, HashAlgorithm, Result, logging};
use rand::seq::SliceRandom;
use std::cmp;
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::stat::{Stat, Unit};

mod drivers;
mod seqfile;
mod stat;

#[derive(Parser)]
#[command(name = "ring-bench")]
#[command(author, version, about = "Measures append and lookup times of the Merkle ring")]
struct Args {
  /// Number of entries appended in the largest case
  #[arg(default_value_t = 65536u64)]
  data_size: u64,

  /// log₂ of the ring capacity
  #[arg(short, long, default_value_t = 16u8)]
  bits: u8,

  /// Hash function for interior nodes
  #[arg(short, long, default_value_t = HashAlgorithm::Sha256)]
  algorithm: HashAlgorithm,

  /// Directory for working temporary files
  #[arg(short, long, default_value_t = std::env::temp_dir().to_string_lossy().into_owned())]
  dir: String,

  /// Directory the CSV reports are written to
  #[arg(short, long, default_value = ".")]
  output: String,

  #[arg(short, long, default_value_t = Local::now().format("%Y%m%d%H%M%S").to_string())]
  session: String,

  /// Remove working directories left by earlier sessions and exit
  #[arg(short, long, default_value_t = false)]
  clean: bool,
}

const WORK_PREFIX: &str = "ring_benchmark-";

fn main() -> Result<()> {
  logging::init();
  let args = Args::parse();
  let experiment = Experiment::new(&args)?;

  if args.clean {
    return experiment.clean();
  }

  let config = Config::from_env(args.bits).with_algorithm(args.algorithm);
  config.validate()?;
  info!(bits = config.capacity_bits, algorithm = %config.algorithm, data_size = args.data_size, "benchmark");

  experiment
    .case("append-seqfile-file")?
    .division(10)
    .measure_the_append_time_relative_to_the_amount_of_data(seqfile::AppendDriver::new())?;

  experiment
    .case("append-ring-memory")?
    .division(10)
    .measure_the_append_time_relative_to_the_amount_of_data(drivers::MemoryAppendDriver::new(config))?;

  experiment
    .case("append-ring-file")?
    .division(10)
    .measure_the_append_time_relative_to_the_amount_of_data(drivers::FileAppendDriver::new(config))?;

  experiment
    .case("lookup-ring-file")?
    .max_trials(200)
    .stability_threshold(0.5)
    .measure_the_lookup_time_relative_to_the_age_of_the_entry(drivers::FileLookupDriver::new(config))?;

  Ok(())
}

struct Experiment {
  session: String,
  dir: PathBuf,
  dir_report: PathBuf,
  data_size: u64,
}

pub struct Case {
  pub id: String,
  pub name: String,
  pub dir_work: PathBuf,
  pub dir_report: PathBuf,
  pub min_n: u64,
  pub max_n: u64,
  division: usize,
  stability_threshold: f64,
  min_trials: usize,
  max_trials: usize,
  max_duration: Duration,
}

impl Experiment {
  fn new(args: &Args) -> Result<Self> {
    let dir = PathBuf::from(&args.dir);
    let dir_report = PathBuf::from(&args.output);
    create_dir_all(&dir)?;
    create_dir_all(&dir_report)?;
    info!(dir = %dir.display(), "working directory");
    Ok(Self { session: args.session.clone(), dir, dir_report, data_size: args.data_size })
  }

  fn case(&self, id: &str) -> Result<Case> {
    let name = format!("{}-{id}", self.session);
    let dir_work = self.dir.join(format!("{WORK_PREFIX}{name}"));
    create_dir_all(&dir_work)?;
    Ok(Case {
      id: id.to_string(),
      name,
      dir_work,
      dir_report: self.dir_report.clone(),
      min_n: 1,
      max_n: self.data_size,
      division: 100,
      stability_threshold: 0.10,
      min_trials: 5,
      max_trials: 100,
      max_duration: Duration::from_secs(10 * 60),
    })
  }

  fn clean(&self) -> Result<()> {
    let mut total = 0u64;
    let mut count = 0;
    for entry in fs::read_dir(&self.dir)? {
      let entry = entry?;
      if entry.file_type()?.is_dir() && entry.file_name().to_string_lossy().starts_with(WORK_PREFIX) {
        let path = entry.path();
        let size = data_size(&path);
        info!(path = %path.display(), size, "removing");
        fs::remove_dir_all(&path)?;
        total += size;
        count += 1;
      }
    }
    info!(count, total, "removed working directories");
    Ok(())
  }
}

macro_rules! property_decl {
  ($name:ident, $type:ty) => {
    pub fn $name(mut self, $name: $type) -> Self {
      self.$name = $name;
      self
    }
  };
}

impl Case {
  property_decl!(division, usize);
  property_decl!(stability_threshold, f64);
  property_decl!(max_trials, usize);

  pub fn file(&self, filename: &str) -> PathBuf {
    self.dir_work.join(filename)
  }

  fn gauge(&self) -> Vec<u64> {
    linspace(self.min_n, self.max_n, self.division)
  }

  /// Time to append `n` entries into a fresh target, for `n` spread over `[min_n, max_n]`.
  pub fn measure_the_append_time_relative_to_the_amount_of_data<T, D>(&self, mut driver: D) -> Result<()>
  where
    D: Driver<T, Duration>,
  {
    println!("[{}]", self.id);
    let mut report = stat::Report::new(Unit::Milliseconds);
    let gauge = self.gauge();
    for (i, n) in gauge.iter().enumerate() {
      eprint!("  [{}/{}] n={n}: ", i + 1, gauge.len());
      let mut size = 0;
      let results = self.measure_until_stable(&mut || {
        let mut target = driver.setup(self)?;
        let elapse = driver.run(self, &mut target, *n)?;
        size = cmp::max(size, data_size(&self.dir_work));
        driver.cleanup(self, target)?;
        Ok(elapse.as_nanos() as f64 / 1000.0 / 1000.0)
      })?;
      let stat = report.append(*n, results);
      eprintln!("{stat}; {size} bytes");
    }
    self.save(&report, "N", "TIME")
  }

  /// Time to read back an entry appended `distance` appends ago.
  fn measure_the_lookup_time_relative_to_the_age_of_the_entry<T, D>(&self, mut driver: D) -> Result<()>
  where
    D: Driver<T, Duration>,
  {
    println!("[{}]", self.id);
    let mut target = driver.setup(self)?;
    let mut indices = driver.params(self);
    let mut rng = rand::rng();
    let mut report = stat::Report::new(Unit::Milliseconds);
    for count in 0..self.max_trials {
      if count >= cmp::max(2, self.min_trials) {
        let cv = report.max_cv();
        if !cv.is_nan() && cv <= self.stability_threshold {
          break;
        }
      }
      indices.shuffle(&mut rng);
      for i in indices.iter().copied() {
        let elapse = driver.run(self, &mut target, i)?;
        report.add(self.max_n - 1 - i, elapse.as_nanos() as f64 / 1000.0 / 1000.0);
      }
    }
    driver.cleanup(self, target)?;
    self.save(&report, "DISTANCE", "ACCESS TIME")
  }

  /// Repeats `f` until ±2σ of its results falls within `stability_threshold` of the mean, bounded by
  /// `min_trials`, `max_trials` and `max_duration`.
  fn measure_until_stable<F>(&self, f: &mut F) -> Result<Vec<f64>>
  where
    F: FnMut() -> Result<f64>,
  {
    let mut results = Vec::new();
    let start = Instant::now();
    while results.len() < self.min_trials
      || (results.len() < self.max_trials
        && start.elapsed() < self.max_duration
        && 2.0 * Stat::from_vec(Unit::Milliseconds, &results).cv() > self.stability_threshold)
    {
      results.push(f()?);
    }
    Ok(results)
  }

  fn save<X, Y>(&self, report: &stat::Report<X, Y>, x_label: &str, y_label: &str) -> Result<()>
  where
    X: std::fmt::Display + Copy + std::hash::Hash + Eq + Ord,
    Y: IntoFloat + std::fmt::Display,
  {
    let path = self.dir_report.join(format!("{}.csv", self.name));
    report.save_xy_to_csv(&path, x_label, y_label)?;
    println!("==> The results have been saved in: {}", path.to_string_lossy());
    if let Err(e) = fs::remove_dir_all(&self.dir_work) {
      warn!(dir = %self.dir_work.display(), error = %e, "cannot remove working directory");
    }
    Ok(())
  }
}

pub trait Driver<T, V> {
  fn setup(&mut self, case: &Case) -> Result<T>;
  fn run(&mut self, case: &Case, target: &mut T, param: u64) -> Result<V>;
  fn cleanup(&mut self, _case: &Case, _target: T) -> Result<()> {
    Ok(())
  }
  /// Parameters a lookup case iterates over.
  fn params(&self, case: &Case) -> Vec<u64> {
    (0..case.max_n).collect()
  }
}

pub trait IntoFloat: Copy {
  fn into_f64(self) -> f64;
}

impl IntoFloat for f64 {
  fn into_f64(self) -> f64 {
    self
  }
}

fn linspace(min: u64, max: u64, n: usize) -> Vec<u64> {
  if n <= 1 || max <= min {
    return vec![max];
  }
  let step = (max - min) as f64 / (n - 1) as f64;
  let mut values = (0..n).map(|i| (min as f64 + step * i as f64).round() as u64).collect::<Vec<_>>();
  values.dedup();
  values
}

fn data_size(path: &Path) -> u64 {
  if path.is_dir() {
    fs::read_dir(path).map(|entries| entries.flatten().map(|e| data_size(&e.path())).sum()).unwrap_or(0)
  } else {
    path.metadata().map(|m| m.len()).unwrap_or(0)
  }
}
