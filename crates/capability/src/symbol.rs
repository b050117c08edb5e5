use std::fmt;

/// Window-server functions the resolver knows how to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
	/// Connection-handle accessor. Every other call needs its result.
	DefaultConnection,
	SetWindowSharingState,
	GetWindowSharingState,
	SetWindowLevel,
	GetWindowLevel,
}

impl Symbol {
	pub const COUNT: usize = 5;

	pub const ALL: [Symbol; Self::COUNT] = [
		Self::DefaultConnection,
		Self::SetWindowSharingState,
		Self::GetWindowSharingState,
		Self::SetWindowLevel,
		Self::GetWindowLevel,
	];

	/// Exported name in the system graphics image.
	pub const fn name(self) -> &'static str {
		match self {
			Self::DefaultConnection => "CGSDefaultConnection",
			Self::SetWindowSharingState => "CGSSetWindowSharingState",
			Self::GetWindowSharingState => "CGSGetWindowSharingState",
			Self::SetWindowLevel => "CGSSetWindowLevel",
			Self::GetWindowLevel => "CGSGetWindowLevel",
		}
	}

	/// Only the connection accessor decides overall availability.
	pub const fn is_critical(self) -> bool {
		matches!(self, Self::DefaultConnection)
	}

	pub(crate) const fn index(self) -> usize {
		self as usize
	}
}

impl fmt::Display for Symbol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}
