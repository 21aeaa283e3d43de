//! Logger setup.

use cadview_core::Options;

/// Installs `env_logger` with `filter` as the default; `RUST_LOG` overrides it.
///
/// Returns false if a logger was already installed.
pub fn init_logging(filter: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

/// [`init_logging`] with the filter from `options`.
pub fn init_logging_from(options: &Options) -> bool {
    init_logging(&options.log_filter)
}
