//! Process-wide logging setup shared by the binaries.

/// Tracing subscriber configuration (filters, output format).
pub mod tracing;

pub use self::tracing::LogFormat;

/// Initialize structured logging from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
