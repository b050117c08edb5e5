use std::ffi::c_void;
use std::path::Path;
use std::ptr::NonNull;

use libloading::Library;

use crate::{CapabilityError, Result};

/// Where symbol addresses come from.
///
/// Implementations are queried at most once per symbol by the resolver, so
/// a lookup may be as expensive as a dynamic-loader query.
pub trait SymbolSource {
	fn lookup(&self, name: &str) -> Option<NonNull<c_void>>;
}

impl<S: SymbolSource + ?Sized> SymbolSource for &S {
	fn lookup(&self, name: &str) -> Option<NonNull<c_void>> {
		(**self).lookup(name)
	}
}

impl<S: SymbolSource + ?Sized> SymbolSource for Box<S> {
	fn lookup(&self, name: &str) -> Option<NonNull<c_void>> {
		(**self).lookup(name)
	}
}

/// A system library image opened through the dynamic loader.
///
/// A library that failed to open is still a valid source: every lookup
/// misses, which the resolver reports as "unavailable".
#[derive(Debug, Default)]
pub struct SystemLibrary {
	lib: Option<Library>,
}

impl SystemLibrary {
	pub const CORE_GRAPHICS: &'static str = "/System/Library/Frameworks/CoreGraphics.framework/CoreGraphics";

	/// Opens the library at `path`.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		// SAFETY: system framework images run no unsound initializers; the
		// library stays loaded for as long as `Self` lives.
		let lib = unsafe { Library::new(path) }.map_err(|e| CapabilityError::Library {
			path: path.display().to_string(),
			message: e.to_string(),
		})?;
		Ok(Self { lib: Some(lib) })
	}

	/// Opens the system graphics image, or an empty source if it is missing.
	pub fn core_graphics() -> Self {
		match Self::open(Self::CORE_GRAPHICS) {
			Ok(lib) => lib,
			Err(err) => {
				tracing::warn!(domain = "capability", error = %err, "system graphics image unavailable");
				Self::unavailable()
			}
		}
	}

	/// A source on which every lookup misses.
	pub const fn unavailable() -> Self {
		Self { lib: None }
	}

	pub fn is_open(&self) -> bool {
		self.lib.is_some()
	}
}

impl SymbolSource for SystemLibrary {
	fn lookup(&self, name: &str) -> Option<NonNull<c_void>> {
		let lib = self.lib.as_ref()?;
		// SAFETY: the symbol is read as an untyped address only; it is
		// transmuted to a function pointer by `Session` with the signature
		// the window server exports.
		let symbol = unsafe { lib.get::<*mut c_void>(name.as_bytes()) }.ok()?;
		NonNull::new(*symbol)
	}
}
