//! Tracing setup. All log output goes to stderr; stdout carries only
//! shell script lines meant for `eval`.

use tracing_subscriber::EnvFilter;

/// Filter directives, e.g. `APIMGR_LOG=debug`.
pub const LOG_ENV: &str = "APIMGR_LOG";

pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("apimgr=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .without_time()
        .try_init();
}
