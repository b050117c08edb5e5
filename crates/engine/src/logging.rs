//! Tracing subscriber setup.

use std::fs::OpenOptions;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::LogConfig;

/// Installs the global subscriber described by `config`.
///
/// With a log directory, output goes to `<dir>/cloak.<pid>.log` without
/// colors; otherwise to stderr. Returns false if the host process already
/// installed a subscriber, which is left in place.
pub fn init(config: &LogConfig) -> bool {
	let filter = || EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

	if let Some(dir) = &config.dir
		&& std::fs::create_dir_all(dir).is_ok()
	{
		let path = dir.join(format!("cloak.{}.log", std::process::id()));
		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
			let layer = tracing_subscriber::fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_target(true);
			let installed = tracing_subscriber::registry()
				.with(filter())
				.with(layer)
				.try_init()
				.is_ok();
			if installed {
				tracing::info!(path = %path.display(), "logging to file");
			}
			return installed;
		}
	}

	tracing_subscriber::registry()
		.with(filter())
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.try_init()
		.is_ok()
}
