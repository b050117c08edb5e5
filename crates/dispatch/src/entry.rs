use std::borrow::Cow;
use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroUsize;

/// Address of the code invoked for one operation.
///
/// Entry points are opaque to the interception core: they are compared,
/// stored and handed back to the host, never called directly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryPoint(NonZeroUsize);

impl EntryPoint {
	/// Wraps a raw address. Returns `None` for null.
	pub const fn from_addr(addr: usize) -> Option<Self> {
		match NonZeroUsize::new(addr) {
			Some(addr) => Some(Self(addr)),
			None => None,
		}
	}

	pub const fn from_nonzero(addr: NonZeroUsize) -> Self {
		Self(addr)
	}

	/// Wraps a raw pointer. Returns `None` for null.
	pub fn from_ptr<T>(ptr: *const T) -> Option<Self> {
		Self::from_addr(ptr as usize)
	}

	pub const fn addr(self) -> usize {
		self.0.get()
	}

	pub fn as_ptr(self) -> *const c_void {
		self.0.get() as *const c_void
	}
}

impl fmt::Debug for EntryPoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "EntryPoint({:#x})", self.0)
	}
}

impl fmt::Display for EntryPoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.0)
	}
}

/// Type encoding of an operation (argument and return layout).
///
/// The core never interprets the encoding; it is forwarded to the host when
/// a new operation is added to a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(Cow<'static, str>);

impl Signature {
	pub const fn from_static(encoding: &'static str) -> Self {
		Self(Cow::Borrowed(encoding))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<String> for Signature {
	fn from(encoding: String) -> Self {
		Self(Cow::Owned(encoding))
	}
}

impl From<&'static str> for Signature {
	fn from(encoding: &'static str) -> Self {
		Self::from_static(encoding)
	}
}

impl fmt::Display for Signature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// `(type, operation)` key of one indirection slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpKey {
	pub class: Box<str>,
	pub operation: Box<str>,
}

impl OpKey {
	pub fn new(class: &str, operation: &str) -> Self {
		Self {
			class: class.into(),
			operation: operation.into(),
		}
	}
}

impl fmt::Display for OpKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "-[{} {}]", self.class, self.operation)
	}
}
