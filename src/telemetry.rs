//! Tracing subscriber setup for the binary.

use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "metal_factory=info,tower_http=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_FILTER`]. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    fmt().with_env_filter(filter).with_target(true).try_init().ok();
}
