use log::{log_enabled, trace, Level};

/// Initializes the logger with the `env_logger` crate.
///
/// The level comes from `RUST_LOG`, falling back to `default_filter` when it
/// is not set. Calling this more than once is harmless.
pub fn init_logger(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Traces raw device bytes as hex, for lines that could not be decoded.
pub fn log_line_hex(label: &str, bytes: &[u8]) {
    if log_enabled!(Level::Trace) {
        trace!("{label}: [{}] {}", bytes.len(), hex::encode(bytes));
    }
}
