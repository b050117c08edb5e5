//! Seam between the engine and the host windowing toolkit.
//!
//! The engine never owns toolkit objects. It enumerates windows, checks they
//! are still alive, writes properties through the toolkit's own accessors
//! and asks the toolkit for replacement accessors to splice into its
//! dispatch tables.

use std::fmt;
use std::time::{Duration, Instant};

use cloak_capability::WindowId;
use cloak_dispatch::{DispatchHost, EntryPoint};
use cloak_profiles::PropertyValue;
use thiserror::Error;

use crate::property::{Property, PropertySet};

#[cfg(target_os = "macos")]
pub mod appkit;
pub mod testing;

/// Opaque identity of a window object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.0)
	}
}

/// Object a property write is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
	Window(WindowHandle),
	Application,
}

/// Shape of a replacement accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
	/// Always returns the forced value.
	Getter,
	/// Coerces the incoming value to the forced value, then calls `original`.
	Setter { original: EntryPoint },
}

/// Handle of a repeating main-loop timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

bitflags::bitflags! {
	/// Lifecycle notifications the engine subscribes to.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct EventMask: u8 {
		const WINDOW_EXPOSED = 1 << 0;
		const WINDOW_BECAME_KEY = 1 << 1;
		const WINDOW_BECAME_MAIN = 1 << 2;
		const WINDOW_CREATED = 1 << 3;
		const APPLICATION_ACTIVATED = 1 << 4;
	}
}

/// Something the main loop hands to [`Engine::handle`](crate::Engine::handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
	/// The reinforcement timer fired.
	Tick(TimerId),
	WindowExposed(WindowHandle),
	WindowBecameKey(WindowHandle),
	WindowBecameMain(WindowHandle),
	WindowCreated(WindowHandle),
	ApplicationActivated,
}

impl Event {
	pub fn window(self) -> Option<WindowHandle> {
		match self {
			Self::WindowExposed(w) | Self::WindowBecameKey(w) | Self::WindowBecameMain(w) | Self::WindowCreated(w) => {
				Some(w)
			}
			Self::Tick(_) | Self::ApplicationActivated => None,
		}
	}

	/// Subscription bit that delivers this event. Empty for timer ticks.
	pub const fn mask(self) -> EventMask {
		match self {
			Self::Tick(_) => EventMask::empty(),
			Self::WindowExposed(_) => EventMask::WINDOW_EXPOSED,
			Self::WindowBecameKey(_) => EventMask::WINDOW_BECAME_KEY,
			Self::WindowBecameMain(_) => EventMask::WINDOW_BECAME_MAIN,
			Self::WindowCreated(_) => EventMask::WINDOW_CREATED,
			Self::ApplicationActivated => EventMask::APPLICATION_ACTIVATED,
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Tick(_) => "tick",
			Self::WindowExposed(_) => "window-exposed",
			Self::WindowBecameKey(_) => "window-became-key",
			Self::WindowBecameMain(_) => "window-became-main",
			Self::WindowCreated(_) => "window-created",
			Self::ApplicationActivated => "application-activated",
		}
	}
}

/// A single object refusing one property write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolkitError {
	#[error("object is gone")]
	Gone,
	#[error("{0} is not exposed")]
	Unsupported(&'static str),
	#[error("{property} rejected value {value}")]
	Rejected { property: &'static str, value: String },
	#[error("toolkit unavailable: {0}")]
	Unavailable(&'static str),
}

/// Host windowing toolkit.
///
/// Every method is called on the toolkit's main loop.
pub trait Toolkit {
	type Host: DispatchHost;

	/// Dispatch tables of the toolkit's object types.
	fn dispatch(&mut self) -> &mut Self::Host;

	/// Windows that currently exist.
	fn windows(&self) -> Vec<WindowHandle>;

	/// Returns true if `window` is still alive and an instance of `class`.
	fn is_kind_of(&self, window: WindowHandle, class: &str) -> bool;

	/// Concrete type name of a live window.
	fn window_class(&self, window: WindowHandle) -> Option<String>;

	/// Window-server number of a live window.
	fn window_number(&self, window: WindowHandle) -> Option<WindowId>;

	/// Properties instances of `class` respond to. Expensive; the engine
	/// caches the answer per type.
	fn supported_properties(&self, class: &str) -> PropertySet;

	/// Writes `value` through the object's own write accessor.
	fn write_property(&mut self, target: Target, property: Property, value: &PropertyValue) -> Result<(), ToolkitError>;

	/// Produces an entry point implementing `accessor` for `property`, fixed
	/// to `value`. `None` if the toolkit cannot express it.
	fn replacement(&mut self, property: Property, accessor: Accessor, value: &PropertyValue) -> Option<EntryPoint>;

	/// Starts delivering `events` to the engine. Returns false if the toolkit
	/// cannot observe them.
	fn subscribe(&mut self, events: EventMask) -> bool;

	fn unsubscribe(&mut self);

	/// Schedules a repeating [`Event::Tick`] on the main loop.
	fn schedule_repeating(&mut self, interval: Duration) -> Option<TimerId>;

	fn cancel_timer(&mut self, timer: TimerId);

	/// Current main-loop time.
	fn now(&self) -> Instant;
}
