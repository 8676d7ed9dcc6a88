//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Initializes logging once at startup. `RUST_LOG` wins over the verbosity
/// flag when set.
pub fn init_logging(verbose: u8) {
	let default_filter = match verbose {
		0 => "info",
		1 => "debug,hyper=info,reqwest=info",
		_ => "trace",
	};

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
	tracing_subscriber::fmt().with_env_filter(filter).init();
}
