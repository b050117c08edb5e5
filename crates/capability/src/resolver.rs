use std::fmt;
use std::num::NonZeroUsize;

use parking_lot::Mutex;

use crate::{
	CapabilityError, ConnectionId, Result, SharingState, Status, Symbol, SymbolSource, SystemLibrary, WindowId,
	WindowLevel,
};


type ConnectionFn = unsafe extern "C" fn() -> i32;
type SetFn = unsafe extern "C" fn(i32, u32, i32) -> i32;
type GetFn = unsafe extern "C" fn(i32, u32, *mut i32) -> i32;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
	attempted: bool,
	entry: Option<NonZeroUsize>,
}

/// Resolved entry points, one slot per [`Symbol`].
#[derive(Debug, Default)]
struct FunctionTable {
	slots: [Slot; Symbol::COUNT],
}

/// Resolution state of one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Availability {
	NotAttempted,
	Missing,
	Resolved,
}

impl Availability {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::NotAttempted => "not-attempted",
			Self::Missing => "missing",
			Self::Resolved => "resolved",
		}
	}
}

/// Snapshot of per-symbol availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityReport {
	entries: [Availability; Symbol::COUNT],
}

impl CapabilityReport {
	pub fn get(&self, symbol: Symbol) -> Availability {
		self.entries[symbol.index()]
	}

	pub fn is_available(&self) -> bool {
		self.get(Symbol::DefaultConnection) == Availability::Resolved
	}

	pub fn iter(&self) -> impl Iterator<Item = (Symbol, Availability)> + '_ {
		Symbol::ALL.iter().map(|&symbol| (symbol, self.get(symbol)))
	}
}

impl fmt::Display for CapabilityReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, (symbol, availability)) in self.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{symbol}={}", availability.as_str())?;
		}
		Ok(())
	}
}

/// Typed access to resolved window-server calls for one operation.
///
/// Only handed out by [`CapabilityResolver::perform_operation`]. A call whose
/// symbol is not resolved fails with [`Status::CANNOT_COMPLETE`] instead of
/// jumping through a null pointer.
#[derive(Debug)]
pub struct Session {
	connection: ConnectionId,
	entries: [Option<NonZeroUsize>; Symbol::COUNT],
}

impl Session {
	pub fn connection(&self) -> ConnectionId {
		self.connection
	}

	fn entry(&self, symbol: Symbol) -> std::result::Result<usize, Status> {
		self.entries[symbol.index()]
			.map(NonZeroUsize::get)
			.ok_or(Status::CANNOT_COMPLETE)
	}

	fn set(&self, symbol: Symbol, window: WindowId, value: i32) -> std::result::Result<(), Status> {
		let addr = self.entry(symbol)?;
		// SAFETY: `addr` was resolved from the export named by `symbol`,
		// whose C signature is `(cid, wid, int) -> CGError`.
		let call = unsafe { std::mem::transmute::<usize, SetFn>(addr) };
		// SAFETY: plain integer arguments; the window server validates ids.
		Status(unsafe { call(self.connection.0, window.0, value) }).into_result()
	}

	fn get(&self, symbol: Symbol, window: WindowId) -> std::result::Result<i32, Status> {
		let addr = self.entry(symbol)?;
		// SAFETY: as in `set`, with the signature `(cid, wid, int *) -> CGError`.
		let call = unsafe { std::mem::transmute::<usize, GetFn>(addr) };
		let mut out = 0;
		// SAFETY: `out` is a valid, writable i32 for the duration of the call.
		Status(unsafe { call(self.connection.0, window.0, &mut out) }).into_result()?;
		Ok(out)
	}

	pub fn set_sharing_state(&self, window: WindowId, state: SharingState) -> std::result::Result<(), Status> {
		self.set(Symbol::SetWindowSharingState, window, state.raw())
	}

	pub fn sharing_state(&self, window: WindowId) -> std::result::Result<SharingState, Status> {
		let raw = self.get(Symbol::GetWindowSharingState, window)?;
		SharingState::from_raw(raw).ok_or(Status::CANNOT_COMPLETE)
	}

	pub fn set_window_level(&self, window: WindowId, level: WindowLevel) -> std::result::Result<(), Status> {
		self.set(Symbol::SetWindowLevel, window, level.0)
	}

	pub fn window_level(&self, window: WindowId) -> std::result::Result<WindowLevel, Status> {
		self.get(Symbol::GetWindowLevel, window).map(WindowLevel)
	}
}

/// Lazy, memoized resolver over a [`SymbolSource`].
///
/// The function table is behind a mutex: it is written once per symbol and
/// read from the main loop and, occasionally, from logging workers.
#[derive(Debug)]
pub struct CapabilityResolver<S = SystemLibrary> {
	source: S,
	table: Mutex<FunctionTable>,
}

impl CapabilityResolver<SystemLibrary> {
	/// Resolver over the system graphics image.
	pub fn system() -> Self {
		Self::new(SystemLibrary::core_graphics())
	}
}

impl<S: SymbolSource> CapabilityResolver<S> {
	pub fn new(source: S) -> Self {
		Self {
			source,
			table: Mutex::new(FunctionTable::default()),
		}
	}

	pub fn source(&self) -> &S {
		&self.source
	}

	/// Looks up `symbol` on first use and memoizes the outcome.
	fn resolve(&self, symbol: Symbol) -> Option<NonZeroUsize> {
		let mut table = self.table.lock();
		let slot = &mut table.slots[symbol.index()];
		if slot.attempted {
			return slot.entry;
		}

		slot.attempted = true;
		slot.entry = self.source.lookup(symbol.name()).map(|ptr| ptr.addr());
		match slot.entry {
			Some(addr) => tracing::trace!(domain = "capability", %symbol, addr = addr.get(), "resolved"),
			None => tracing::debug!(domain = "capability", %symbol, critical = symbol.is_critical(), "symbol missing"),
		}
		slot.entry
	}

	/// Resolves every known symbol and reports overall availability.
	///
	/// Only the connection accessor is required; the rest are optional and
	/// tracked individually.
	pub fn resolve_all(&self) -> bool {
		for symbol in Symbol::ALL {
			self.resolve(symbol);
		}
		let report = self.report();
		if report.is_available() {
			tracing::info!(domain = "capability", %report, "window-server functions resolved");
		} else {
			tracing::warn!(domain = "capability", %report, "window-server connection unavailable");
		}
		report.is_available()
	}

	pub fn is_available(&self) -> bool {
		self.resolve(Symbol::DefaultConnection).is_some()
	}

	pub fn can_set_sharing_state(&self) -> bool {
		self.is_available() && self.resolve(Symbol::SetWindowSharingState).is_some()
	}

	pub fn can_read_sharing_state(&self) -> bool {
		self.is_available() && self.resolve(Symbol::GetWindowSharingState).is_some()
	}

	pub fn can_set_window_level(&self) -> bool {
		self.is_available() && self.resolve(Symbol::SetWindowLevel).is_some()
	}

	pub fn can_read_window_level(&self) -> bool {
		self.is_available() && self.resolve(Symbol::GetWindowLevel).is_some()
	}

	/// Current availability without triggering any lookup.
	pub fn report(&self) -> CapabilityReport {
		let table = self.table.lock();
		CapabilityReport {
			entries: table.slots.map(|slot| match slot {
				Slot { attempted: false, .. } => Availability::NotAttempted,
				Slot { entry: Some(_), .. } => Availability::Resolved,
				Slot { entry: None, .. } => Availability::Missing,
			}),
		}
	}

	/// Runs one low-level call against `window`.
	///
	/// Checks that the connection accessor and every symbol in `required`
	/// resolve, acquires a connection and hands a [`Session`] to `call`. A
	/// non-zero status is logged with the window, the operation name and the
	/// code, and returned as [`CapabilityError::Failed`].
	pub fn perform_operation<T>(
		&self,
		operation: &'static str,
		window: WindowId,
		required: &[Symbol],
		call: impl FnOnce(&Session) -> std::result::Result<T, Status>,
	) -> Result<T> {
		let Some(connect) = self.resolve(Symbol::DefaultConnection) else {
			tracing::warn!(domain = "capability", operation, %window, "window-server connection unavailable");
			return Err(CapabilityError::Unavailable {
				operation,
				symbol: Symbol::DefaultConnection,
			});
		};
		if let Some(&symbol) = required.iter().find(|&&symbol| self.resolve(symbol).is_none()) {
			tracing::warn!(domain = "capability", operation, %window, %symbol, "required function unavailable");
			return Err(CapabilityError::Unavailable { operation, symbol });
		}

		// SAFETY: resolved from the connection accessor export, `() -> int`.
		let connect = unsafe { std::mem::transmute::<usize, ConnectionFn>(connect.get()) };
		// SAFETY: takes no arguments and returns the process's connection.
		let connection = ConnectionId(unsafe { connect() });
		if !connection.is_valid() {
			tracing::warn!(domain = "capability", operation, %window, "no window-server connection");
			return Err(CapabilityError::NoConnection { operation });
		}

		let session = Session {
			connection,
			entries: self.table.lock().slots.map(|slot| slot.entry),
		};
		match call(&session) {
			Ok(value) => {
				tracing::trace!(domain = "capability", operation, %window, "window-server call succeeded");
				Ok(value)
			}
			Err(status) => {
				tracing::warn!(domain = "capability", operation, %window, code = status.0, "window-server call failed");
				Err(CapabilityError::Failed {
					operation,
					window,
					status,
				})
			}
		}
	}

	pub fn set_sharing_state(&self, window: WindowId, state: SharingState) -> Result<()> {
		self.perform_operation("set_sharing_state", window, &[Symbol::SetWindowSharingState], |s| {
			s.set_sharing_state(window, state)
		})
	}

	pub fn sharing_state(&self, window: WindowId) -> Result<SharingState> {
		self.perform_operation("sharing_state", window, &[Symbol::GetWindowSharingState], |s| {
			s.sharing_state(window)
		})
	}

	pub fn set_window_level(&self, window: WindowId, level: WindowLevel) -> Result<()> {
		self.perform_operation("set_window_level", window, &[Symbol::SetWindowLevel], |s| {
			s.set_window_level(window, level)
		})
	}

	pub fn window_level(&self, window: WindowId) -> Result<WindowLevel> {
		self.perform_operation("window_level", window, &[Symbol::GetWindowLevel], |s| s.window_level(window))
	}
}
