// PIPEGOV LOGGING
// THIN MACROS OVER tracing. THE BINARY INSTALLS THE SUBSCRIBER,
// THE LIBRARY ONLY EMITS.

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { ::tracing::info!($($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { ::tracing::warn!($($arg)*) };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { ::tracing::debug!($($arg)*) };
}

// INSTALL THE FMT SUBSCRIBER. RUST_LOG WINS OVER --verbose.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    // A SECOND INIT (TESTS, RESTARTS) IS HARMLESS
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
