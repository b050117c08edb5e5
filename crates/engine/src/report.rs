use std::fmt;

/// Outcome of one reinforcement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
	/// Windows processed.
	pub windows: usize,
	/// Windows seen for the first time.
	pub new_windows: usize,
	/// Windows that disappeared between discovery and processing.
	pub gone: usize,
	/// Windows skipped because they were written too recently.
	pub debounced: usize,
	/// Property writes that succeeded.
	pub applied: usize,
	/// Overrides skipped because the object does not expose the property.
	pub unsupported: usize,
	/// Property writes or direct calls the object refused.
	pub failures: usize,
	/// Direct window-server calls that succeeded.
	pub direct: usize,
	/// Direct calls that fell back to the declarative path.
	pub direct_unavailable: usize,
}

impl PassReport {
	pub fn merge(&mut self, other: PassReport) {
		self.windows += other.windows;
		self.new_windows += other.new_windows;
		self.gone += other.gone;
		self.debounced += other.debounced;
		self.applied += other.applied;
		self.unsupported += other.unsupported;
		self.failures += other.failures;
		self.direct += other.direct;
		self.direct_unavailable += other.direct_unavailable;
	}
}

impl fmt::Display for PassReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"windows={} new={} gone={} debounced={} applied={} unsupported={} failures={} direct={} direct_unavailable={}",
			self.windows,
			self.new_windows,
			self.gone,
			self.debounced,
			self.applied,
			self.unsupported,
			self.failures,
			self.direct,
			self.direct_unavailable,
		)
	}
}

/// Outcome of installing a set of profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
	/// Profiles in application order.
	pub profiles: Vec<String>,
	/// Operations rewired by this install.
	pub rewired: usize,
	/// Overrides skipped at install time: unknown names or properties the
	/// type does not expose.
	pub skipped: usize,
	/// True if direct window-server calls are active.
	pub direct_control: bool,
	/// The initial pass over existing objects.
	pub pass: PassReport,
}
