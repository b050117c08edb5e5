//! C entry points for the launcher.
//!
//! The launcher calls [`cloak_initialize`] once on the host's main thread,
//! then [`cloak_apply_profiles`] whenever it wants a different set of
//! profiles. Both return `false` on failure; the second also writes a
//! diagnostic naming the failed step into a caller buffer. Errors and panics
//! stop here and never unwind into the host.

use std::any::Any;
use std::ffi::{CStr, c_char};
use std::panic::{self, AssertUnwindSafe};

use cloak_capability::SymbolSource;

use crate::engine::Engine;
use crate::error::{EngineError, ErrorKind, Result, Step};
use crate::toolkit::Toolkit;


#[cfg(target_os = "macos")]
pub use exports::{cloak_apply_profiles, cloak_initialize};
#[cfg(target_os = "macos")]
pub(crate) use exports::with_engine;

/// Runs `f`, turning an error or a panic into a diagnostic string.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn guarded(entry: &'static str, f: impl FnOnce() -> Result<()>) -> std::result::Result<(), String> {
	match panic::catch_unwind(AssertUnwindSafe(f)) {
		Ok(Ok(())) => Ok(()),
		Ok(Err(err)) => {
			tracing::error!(domain = "ffi", entry, step = %err.step(), error = %err, "call failed");
			Err(err.to_string())
		}
		Err(payload) => {
			let message = panic_message(payload.as_ref());
			tracing::error!(domain = "ffi", entry, panic = message.as_str(), "call panicked");
			Err(EngineError::new(Step::Apply, ErrorKind::Panicked(message)).to_string())
		}
	}
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic payload".to_string()
	}
}

/// Stores `engine` in `slot`, then installs its configured profiles.
///
/// The engine stays in the slot when the install fails so a later
/// [`Engine::apply_profiles`] with corrected names can still succeed.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn adopt<T: Toolkit, S: SymbolSource>(slot: &mut Option<Engine<T, S>>, engine: Engine<T, S>) -> Result<()> {
	slot.insert(engine).install_configured().map(drop)
}

/// Reads `len` profile names from a C array.
///
/// Null entries, invalid UTF-8 and blank names are skipped with a warning.
///
/// # Safety
///
/// `names` is null or points to `len` pointers, each null or pointing to a
/// NUL-terminated string that stays valid for the call.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) unsafe fn read_names(names: *const *const c_char, len: usize) -> Vec<String> {
	if names.is_null() || len == 0 {
		return Vec::new();
	}
	// SAFETY: the caller guarantees `len` readable pointers at `names`.
	let entries = unsafe { std::slice::from_raw_parts(names, len) };
	entries
		.iter()
		.enumerate()
		.filter_map(|(index, &ptr)| {
			if ptr.is_null() {
				tracing::warn!(domain = "ffi", index, "null profile name skipped");
				return None;
			}
			// SAFETY: non-null entries are NUL-terminated per the contract.
			let Ok(name) = unsafe { CStr::from_ptr(ptr) }.to_str() else {
				tracing::warn!(domain = "ffi", index, "profile name is not UTF-8; skipped");
				return None;
			};
			let name = name.trim();
			(!name.is_empty()).then(|| name.to_string())
		})
		.collect()
}

/// Copies `message` into `buf` as a NUL-terminated string, truncated on a
/// character boundary to fit `cap` bytes.
///
/// # Safety
///
/// `buf` is null or valid for writes of `cap` bytes.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) unsafe fn write_error(buf: *mut c_char, cap: usize, message: &str) {
	if buf.is_null() || cap == 0 {
		return;
	}
	let mut end = message.len().min(cap - 1);
	while !message.is_char_boundary(end) {
		end -= 1;
	}
	// SAFETY: `end < cap` and the caller guarantees `cap` writable bytes.
	unsafe {
		std::ptr::copy_nonoverlapping(message.as_ptr(), buf.cast::<u8>(), end);
		*buf.add(end) = 0;
	}
}

#[cfg(target_os = "macos")]
mod exports {
	use std::cell::RefCell;
	use std::ffi::c_char;
	use std::sync::Arc;

	use cloak_capability::CapabilityResolver;
	use cloak_profiles::ProfileRegistry;

	use super::{adopt, guarded, read_names, write_error};
	use crate::config::EngineConfig;
	use crate::engine::Engine;
	use crate::error::{EngineError, ErrorKind, Result, Step};
	use crate::logging;
	use crate::toolkit::appkit::AppKit;

	thread_local! {
		static ENGINE: RefCell<Option<Engine<AppKit>>> = const { RefCell::new(None) };
	}

	/// Runs `f` against this thread's engine.
	///
	/// Fails with [`ErrorKind::Busy`] when called re-entrantly, which happens
	/// when a toolkit notification fires during an engine call.
	pub(crate) fn with_engine<R>(f: impl FnOnce(&mut Engine<AppKit>) -> R) -> Result<R> {
		ENGINE.with(|slot| {
			let mut slot = slot
				.try_borrow_mut()
				.map_err(|_| EngineError::new(Step::Apply, ErrorKind::Busy))?;
			let engine = slot
				.as_mut()
				.ok_or_else(|| EngineError::new(Step::Apply, ErrorKind::NotInitialized))?;
			Ok(f(engine))
		})
	}

	/// Brings up logging and the engine, then installs the profiles named in
	/// `CLOAK_PROFILES`. Calling it again is a successful no-op.
	///
	/// If that install fails the engine is kept, so the launcher can follow
	/// up with [`cloak_apply_profiles`].
	#[unsafe(no_mangle)]
	pub extern "C" fn cloak_initialize() -> bool {
		guarded("cloak_initialize", || {
			let config = EngineConfig::from_env();
			logging::init(&config.log);

			if ENGINE.with(|slot| slot.try_borrow().map_or(true, |engine| engine.is_some())) {
				tracing::info!(domain = "ffi", "already initialized");
				return Ok(());
			}

			let toolkit = AppKit::new().map_err(|err| EngineError::new(Step::Apply, err))?;
			let engine = Engine::connect(
				toolkit,
				CapabilityResolver::system(),
				Arc::new(ProfileRegistry::with_builtins()),
				config,
			);
			ENGINE.with(|slot| {
				let mut slot = slot
					.try_borrow_mut()
					.map_err(|_| EngineError::new(Step::Apply, ErrorKind::Busy))?;
				adopt(&mut *slot, engine)
			})
		})
		.is_ok()
	}

	/// Replaces the installed profiles with `names`.
	///
	/// # Safety
	///
	/// `names` is null or points to `len` pointers to NUL-terminated strings
	/// (null entries allowed). `err_buf` is null or valid for writes of
	/// `err_len` bytes.
	#[unsafe(no_mangle)]
	pub unsafe extern "C" fn cloak_apply_profiles(
		names: *const *const c_char,
		len: usize,
		err_buf: *mut c_char,
		err_len: usize,
	) -> bool {
		// SAFETY: forwarded from this function's contract.
		let names = unsafe { read_names(names, len) };
		let outcome = guarded("cloak_apply_profiles", || {
			with_engine(|engine| engine.apply_profiles(&names).map(drop))?
		});
		let message = outcome.as_ref().err().map_or("", String::as_str);
		// SAFETY: forwarded from this function's contract.
		unsafe { write_error(err_buf, err_len, message) };
		outcome.is_ok()
	}
}
