use crate::IntoFloat;
use merkle_ring::Result;
use std::collections::HashMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Stat {
  unit: Unit,
  pub count: usize,
  pub mean: f64,
  pub median: f64,
  pub std_dev: f64,
  pub min: f64,
  pub max: f64,
}

impl Stat {
  /// coefficient of variation, StdDev / Mean
  pub fn cv(&self) -> f64 {
    self.std_dev / self.mean
  }

  pub fn from_vec<T: IntoFloat>(unit: Unit, data: &[T]) -> Stat {
    if data.is_empty() {
      return Stat { unit, count: 0, mean: f64::NAN, median: f64::NAN, std_dev: f64::NAN, min: f64::NAN, max: f64::NAN };
    }
    let mut data = data.iter().map(|y| y.into_f64()).collect::<Vec<_>>();
    data.sort_by(|a, b| a.total_cmp(b));
    let count = data.len();
    let min = data[0];
    let max = data[count - 1];
    let mean = data.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 0 { (data[count / 2 - 1] + data[count / 2]) / 2.0 } else { data[count / 2] };
    let variance = data.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / count as f64;
    let std_dev = variance.sqrt();
    Stat { unit, count, mean, median, std_dev, min, max }
  }
}

impl Display for Stat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    // 2σ as a percentage of the mean
    let two_sigma_percent = if self.mean > 0.0 { (2.0 * self.std_dev / self.mean) * 100.0 } else { 0.0 };
    write!(
      f,
      "{}: {} ±{:.1}% [{}|{}|{}]",
      self.count,
      self.unit.format(self.mean),
      two_sigma_percent,
      self.unit.short(self.min),
      self.unit.short(self.median),
      self.unit.short(self.max)
    )
  }
}

#[derive(Debug, Clone, Copy)]
pub enum Unit {
  Milliseconds,
}

impl Unit {
  fn scaled_format(mut value: f64, scale: f64, unit: &str, prefixes: &[&str], precision: usize) -> String {
    let mut i = 0;
    while value >= scale && i + 1 < prefixes.len() {
      value /= scale;
      i += 1;
    }
    format!("{value:.precision$}{}{unit}", prefixes[i])
  }

  fn format(&self, value: f64) -> String {
    match self {
      Self::Milliseconds => Self::scaled_format(value * 1000.0 * 1000.0, 1000.0, "s", &["n", "μ", "m", ""], 2),
    }
  }

  fn short(&self, value: f64) -> String {
    match self {
      Self::Milliseconds => Self::scaled_format(value * 1000.0 * 1000.0, 1000.0, "", &["n", "μ", "m", ""], 0),
    }
  }
}

pub struct Report<X: Display + Copy + std::hash::Hash + Eq + Ord, Y: IntoFloat + Display> {
  unit: Unit,
  data_set: HashMap<X, Vec<Y>>,
}

impl<X: Display + Copy + std::hash::Hash + Eq + Ord, Y: IntoFloat + Display> Report<X, Y> {
  pub fn new(unit: Unit) -> Self {
    Report { unit, data_set: HashMap::new() }
  }

  pub fn add(&mut self, x: X, y: Y) -> Stat {
    self.append(x, vec![y])
  }

  pub fn append(&mut self, x: X, mut ys: Vec<Y>) -> Stat {
    let data = self.data_set.entry(x).or_default();
    data.append(&mut ys);
    Stat::from_vec(self.unit, data)
  }

  /// Largest coefficient of variation over all x; NaN while nothing has been measured.
  pub fn max_cv(&self) -> f64 {
    self.data_set.values().map(|ys| Stat::from_vec(self.unit, ys).cv()).fold(f64::NAN, f64::max)
  }

  pub fn save_xy_to_csv(&self, path: &Path, x_label: &str, y_label: &str) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{x_label},{y_label}")?;

    let mut xs = self.data_set.keys().copied().collect::<Vec<_>>();
    xs.sort_unstable();
    for x in xs {
      let ys = self.data_set[&x].iter().map(|y| y.to_string()).collect::<Vec<_>>();
      writeln!(writer, "{x},{}", ys.join(","))?;
    }
    writer.flush()?;
    Ok(())
  }
}
