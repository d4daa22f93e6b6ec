use tracing_subscriber::EnvFilter;

use crate::config::debug_enabled;

/// Installs a fmt subscriber on stderr. `RUST_LOG` wins when set; otherwise `MERKLE_DEBUG=true`
/// selects `debug` and anything else `info`. Calling it again is harmless.
pub fn init() {
  let default = if debug_enabled() { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Subscriber for unit tests, captured by the test harness.
#[cfg(test)]
pub fn init_for_test() {
  let default = if debug_enabled() { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}
