//! Engine configuration.
//!
//! The launcher passes everything through the environment:
//!
//! | variable | meaning | default |
//! |----------|---------|---------|
//! | `CLOAK_PROFILES` | comma-separated profile names, applied in order | `core` |
//! | `CLOAK_LOG` | log filter (`info`, `debug`, or an `EnvFilter` directive) | `info` |
//! | `CLOAK_LOG_DIR` | write logs to `<dir>/cloak.<pid>.log` instead of stderr | unset |

use std::path::PathBuf;
use std::time::Duration;

use cloak_capability::WindowLevel;

use crate::interceptor::InterceptorSet;


pub const PROFILES_VAR: &str = "CLOAK_PROFILES";
pub const LOG_VAR: &str = "CLOAK_LOG";
pub const LOG_DIR_VAR: &str = "CLOAK_LOG_DIR";

pub const DEFAULT_PROFILE: &str = "core";
pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Where and how verbosely to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
	pub filter: String,
	pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
	fn default() -> Self {
		Self {
			filter: DEFAULT_LOG_FILTER.to_string(),
			dir: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
	/// Profiles to apply at initialization, in request order.
	pub profiles: Vec<String>,
	pub log: LogConfig,
	/// Period of the reinforcement timer.
	pub interval: Duration,
	/// Ceiling for adaptive backoff. When set, quiet timer passes double
	/// the period up to this value; any change drops it back to
	/// [`interval`](Self::interval).
	pub max_interval: Option<Duration>,
	/// Minimum time between two writes to the same window. Passes reaching a
	/// window sooner leave it alone.
	pub debounce: Option<Duration>,
	/// Level set through the window server in direct mode when no profile
	/// names one.
	pub window_level: WindowLevel,
	pub interceptors: InterceptorSet,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			profiles: vec![DEFAULT_PROFILE.to_string()],
			log: LogConfig::default(),
			interval: DEFAULT_INTERVAL,
			max_interval: None,
			debounce: None,
			window_level: WindowLevel::FLOATING,
			interceptors: InterceptorSet::all(),
		}
	}
}

impl EngineConfig {
	/// Reads the process environment.
	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Reads configuration through `lookup`; unset or blank values keep
	/// their defaults.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let mut config = Self::default();

		if let Some(raw) = lookup(PROFILES_VAR) {
			let profiles = parse_profiles(&raw);
			if !profiles.is_empty() {
				config.profiles = profiles;
			}
		}
		if let Some(filter) = lookup(LOG_VAR).map(|v| v.trim().to_string())
			&& !filter.is_empty()
		{
			config.log.filter = filter;
		}
		if let Some(dir) = lookup(LOG_DIR_VAR).filter(|v| !v.trim().is_empty()) {
			config.log.dir = Some(PathBuf::from(dir));
		}
		config
	}

	pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.profiles = profiles.into_iter().map(Into::into).collect();
		self
	}

	/// Sets the reinforcement period. Non-positive or non-finite values fall
	/// back to [`DEFAULT_INTERVAL`].
	pub fn with_interval_secs(mut self, secs: f64) -> Self {
		self.interval = interval_from_secs(secs);
		self
	}

	/// Enables adaptive backoff up to `max`. A ceiling at or below the base
	/// interval disables it.
	pub fn with_adaptive_interval(mut self, max: Duration) -> Self {
		self.max_interval = (max > self.interval).then_some(max);
		self
	}

	/// Sets the per-window debounce. Zero disables it.
	pub fn with_debounce(mut self, debounce: Duration) -> Self {
		self.debounce = (!debounce.is_zero()).then_some(debounce);
		self
	}

	pub fn with_window_level(mut self, level: WindowLevel) -> Self {
		self.window_level = level;
		self
	}

	pub fn with_interceptors(mut self, interceptors: InterceptorSet) -> Self {
		self.interceptors = interceptors;
		self
	}
}

/// Splits a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_profiles(raw: &str) -> Vec<String> {
	raw.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
		.collect()
}

fn interval_from_secs(secs: f64) -> Duration {
	if secs.is_finite() && secs > 0.0 {
		Duration::try_from_secs_f64(secs).unwrap_or(DEFAULT_INTERVAL)
	} else {
		DEFAULT_INTERVAL
	}
}
