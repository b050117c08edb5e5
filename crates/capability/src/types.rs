use std::fmt;

/// Window-server window number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// Handle returned by the connection accessor. Zero is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub i32);

impl ConnectionId {
	pub const fn is_valid(self) -> bool {
		self.0 != 0
	}
}

/// Raw status code of a window-server call. Zero means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
	pub const SUCCESS: Self = Self(0);
	/// `kCGErrorCannotComplete`, also used when a call cannot be issued.
	pub const CANNOT_COMPLETE: Self = Self(1004);

	pub const fn is_success(self) -> bool {
		self.0 == 0
	}

	pub(crate) fn into_result(self) -> Result<(), Status> {
		if self.is_success() { Ok(()) } else { Err(self) }
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// Who may read a window's contents for capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SharingState {
	/// Excluded from screen capture.
	None,
	ReadOnly,
	#[default]
	ReadWrite,
}

impl SharingState {
	pub const fn raw(self) -> i32 {
		match self {
			Self::None => 0,
			Self::ReadOnly => 1,
			Self::ReadWrite => 2,
		}
	}

	pub const fn from_raw(raw: i32) -> Option<Self> {
		match raw {
			0 => Some(Self::None),
			1 => Some(Self::ReadOnly),
			2 => Some(Self::ReadWrite),
			_ => None,
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::ReadOnly => "read-only",
			Self::ReadWrite => "read-write",
		}
	}
}

/// Stacking level of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct WindowLevel(pub i32);

impl WindowLevel {
	pub const NORMAL: Self = Self(0);
	pub const FLOATING: Self = Self(3);
	pub const MODAL_PANEL: Self = Self(8);
	pub const STATUS: Self = Self(25);
	pub const POP_UP_MENU: Self = Self(101);
	pub const SCREEN_SAVER: Self = Self(1000);
}

impl fmt::Display for WindowLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}
