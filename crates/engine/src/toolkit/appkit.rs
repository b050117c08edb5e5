//! AppKit through the Objective-C runtime.
//!
//! Replacement accessors are `extern "C"` trampolines, one per property,
//! that read their forced value from a process-wide slot. A write accessor
//! trampoline substitutes the forced value and jumps to the original it was
//! built with. Timer ticks and notifications reach the engine through a
//! small observer class registered at startup.

use std::ffi::{CStr, CString, c_char, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cloak_capability::WindowId;
use cloak_dispatch::EntryPoint;
use cloak_dispatch::objc::ObjcRuntime;
use cloak_profiles::{PropertyValue, ValueKind};

use crate::property::{APPLICATION_CLASS, Property, PropertySet, TargetKind};
use crate::toolkit::{Accessor, Event, EventMask, Target, TimerId, Toolkit, ToolkitError, WindowHandle};

type Id = *mut c_void;
type Sel = *const c_void;
type Class = *mut c_void;

#[link(name = "AppKit", kind = "framework")]
unsafe extern "C" {}

#[link(name = "objc")]
unsafe extern "C" {
	fn objc_getClass(name: *const c_char) -> Class;
	fn sel_registerName(name: *const c_char) -> Sel;
	fn objc_msgSend();
	fn objc_allocateClassPair(superclass: Class, name: *const c_char, extra: usize) -> Class;
	fn objc_registerClassPair(class: Class);
	fn class_addMethod(class: Class, name: Sel, imp: *const c_void, types: *const c_char) -> i8;
	fn class_respondsToSelector(class: Class, name: Sel) -> i8;
	fn object_getClass(object: Id) -> Class;
	fn class_getName(class: Class) -> *const c_char;
}

/// Sends `$sel` to `$obj` through a correctly typed `objc_msgSend`.
macro_rules! send {
	($ret:ty; $obj:expr, $sel:expr $(, $arg:expr => $ty:ty)* $(,)?) => {{
		// SAFETY: `objc_msgSend` must be called through a pointer typed like
		// the target method; the caller names that signature here.
		let f: unsafe extern "C" fn(Id, Sel $(, $ty)*) -> $ret =
			unsafe { std::mem::transmute(objc_msgSend as unsafe extern "C" fn()) };
		unsafe { f($obj, $sel $(, $arg)*) }
	}};
}

/// Forced value of each property, by catalogue index.
static FORCED: [AtomicU64; Property::ALL.len()] = [const { AtomicU64::new(0) }; Property::ALL.len()];
/// Captured original write accessor of each property, by catalogue index.
static ORIGINAL: [AtomicUsize; Property::ALL.len()] = [const { AtomicUsize::new(0) }; Property::ALL.len()];

extern "C" fn forced_bool<const I: usize>(_this: Id, _cmd: Sel) -> i8 {
	(FORCED[I].load(Ordering::Relaxed) != 0).into()
}

extern "C" fn forced_int<const I: usize>(_this: Id, _cmd: Sel) -> i64 {
	FORCED[I].load(Ordering::Relaxed) as i64
}

extern "C" fn forced_float<const I: usize>(_this: Id, _cmd: Sel) -> f64 {
	f64::from_bits(FORCED[I].load(Ordering::Relaxed))
}

extern "C" fn coerce_bool<const I: usize>(this: Id, cmd: Sel, _value: i8) {
	if let Some(original) = original::<unsafe extern "C" fn(Id, Sel, i8)>(I) {
		// SAFETY: the slot holds the captured setter of this exact signature.
		unsafe { original(this, cmd, forced_bool::<I>(this, cmd)) }
	}
}

extern "C" fn coerce_int<const I: usize>(this: Id, cmd: Sel, _value: i64) {
	if let Some(original) = original::<unsafe extern "C" fn(Id, Sel, i64)>(I) {
		// SAFETY: as in `coerce_bool`.
		unsafe { original(this, cmd, forced_int::<I>(this, cmd)) }
	}
}

extern "C" fn coerce_float<const I: usize>(this: Id, cmd: Sel, _value: f64) {
	if let Some(original) = original::<unsafe extern "C" fn(Id, Sel, f64)>(I) {
		// SAFETY: as in `coerce_bool`.
		unsafe { original(this, cmd, forced_float::<I>(this, cmd)) }
	}
}

fn original<F: Copy>(index: usize) -> Option<F> {
	let addr = ORIGINAL[index].load(Ordering::Acquire);
	// SAFETY: non-zero slots hold a function address; `F` is a function
	// pointer type of the same size.
	(addr != 0).then(|| unsafe { std::mem::transmute_copy::<usize, F>(&addr) })
}

macro_rules! trampolines {
	($($property:ident => $get:ident, $set:ident;)*) => {
		fn getter_entry(property: Property) -> usize {
			match property {
				$(Property::$property => $get::<{ Property::$property as usize }> as usize,)*
			}
		}

		fn setter_entry(property: Property) -> usize {
			match property {
				$(Property::$property => $set::<{ Property::$property as usize }> as usize,)*
			}
		}
	};
}

trampolines! {
	StyleMask => forced_int, coerce_int;
	CollectionBehavior => forced_int, coerce_int;
	Level => forced_int, coerce_int;
	HasShadow => forced_bool, coerce_bool;
	AlphaValue => forced_float, coerce_float;
	IgnoresMouseEvents => forced_bool, coerce_bool;
	AcceptsMouseMovedEvents => forced_bool, coerce_bool;
	CanBecomeKey => forced_bool, coerce_bool;
	CanBecomeMain => forced_bool, coerce_bool;
	SharingType => forced_int, coerce_int;
	ActivationPolicy => forced_int, coerce_int;
	PresentationOptions => forced_int, coerce_int;
}

/// Raw bits stored in [`FORCED`] for `value`.
fn forced_bits(property: Property, value: &PropertyValue) -> Option<u64> {
	match property.kind() {
		ValueKind::Bool => value.as_bool().map(u64::from),
		ValueKind::Float => value.as_float().map(f64::to_bits),
		ValueKind::Int | ValueKind::Enum | ValueKind::Str => value.as_int().map(|v| v as u64),
	}
}

fn selector(name: &str) -> Option<Sel> {
	let name = CString::new(name).ok()?;
	// SAFETY: selectors are interned by the runtime and live forever.
	let sel = unsafe { sel_registerName(name.as_ptr()) };
	(!sel.is_null()).then_some(sel)
}

fn class(name: &str) -> Option<Class> {
	let name = CString::new(name).ok()?;
	// SAFETY: `name` is NUL-terminated for the call.
	let class = unsafe { objc_getClass(name.as_ptr()) };
	(!class.is_null()).then_some(class)
}

fn nsstring(text: &CStr) -> Option<Id> {
	let string = send!(Id; class("NSString")?, selector("stringWithUTF8String:")?, text.as_ptr() => *const c_char);
	(!string.is_null()).then_some(string)
}

/// Hands `event` to the engine of this thread, if it is idle.
fn deliver(event: Event) {
	let outcome = panic::catch_unwind(AssertUnwindSafe(|| crate::ffi::with_engine(|engine| engine.handle(event))));
	match outcome {
		Ok(Ok(_)) => {}
		Ok(Err(err)) => tracing::trace!(domain = "appkit", event = event.as_str(), error = %err, "event dropped"),
		Err(_) => tracing::error!(domain = "appkit", event = event.as_str(), "event handler panicked"),
	}
}

extern "C" fn on_tick(_this: Id, _cmd: Sel, timer: Id) {
	deliver(Event::Tick(TimerId(timer as u64)));
}

fn notified_window(notification: Id) -> Option<WindowHandle> {
	let window = send!(Id; notification, selector("object")?);
	(!window.is_null()).then(|| WindowHandle(window as u64))
}

extern "C" fn on_exposed(_this: Id, _cmd: Sel, notification: Id) {
	if let Some(window) = notified_window(notification) {
		deliver(Event::WindowExposed(window));
	}
}

extern "C" fn on_became_key(_this: Id, _cmd: Sel, notification: Id) {
	if let Some(window) = notified_window(notification) {
		deliver(Event::WindowBecameKey(window));
	}
}

extern "C" fn on_became_main(_this: Id, _cmd: Sel, notification: Id) {
	if let Some(window) = notified_window(notification) {
		deliver(Event::WindowBecameMain(window));
	}
}

extern "C" fn on_activated(_this: Id, _cmd: Sel, _notification: Id) {
	deliver(Event::ApplicationActivated);
}

const OBSERVER_CLASS: &CStr = c"CloakObserver";

/// Observer methods and the notifications routed to them. AppKit has no
/// window-creation notification; new windows are picked up by the timer.
const OBSERVED: [(EventMask, &str, &CStr); 4] = [
	(EventMask::WINDOW_EXPOSED, "cloakWindowExposed:", c"NSWindowDidExposeNotification"),
	(EventMask::WINDOW_BECAME_KEY, "cloakWindowBecameKey:", c"NSWindowDidBecomeKeyNotification"),
	(EventMask::WINDOW_BECAME_MAIN, "cloakWindowBecameMain:", c"NSWindowDidBecomeMainNotification"),
	(EventMask::APPLICATION_ACTIVATED, "cloakApplicationActivated:", c"NSApplicationDidBecomeActiveNotification"),
];

fn observer_class() -> Option<Class> {
	static CLASS: OnceLock<usize> = OnceLock::new();
	let addr = *CLASS.get_or_init(|| register_observer_class().map_or(0, |c| c as usize));
	(addr != 0).then_some(addr as Class)
}

fn register_observer_class() -> Option<Class> {
	let superclass = class("NSObject")?;
	// SAFETY: the name is NUL-terminated; a null result means the name is taken.
	let observer = unsafe { objc_allocateClassPair(superclass, OBSERVER_CLASS.as_ptr(), 0) };
	if observer.is_null() {
		// Registered by an earlier copy of this library.
		return class("CloakObserver");
	}
	let methods: [(&str, usize); 5] = [
		("cloakTick:", on_tick as usize),
		("cloakWindowExposed:", on_exposed as usize),
		("cloakWindowBecameKey:", on_became_key as usize),
		("cloakWindowBecameMain:", on_became_main as usize),
		("cloakApplicationActivated:", on_activated as usize),
	];
	for (name, imp) in methods {
		// SAFETY: each function takes (self, _cmd, id) and returns void,
		// matching the encoding.
		unsafe { class_addMethod(observer, selector(name)?, imp as *const c_void, c"v24@0:8@16".as_ptr()) };
	}
	// SAFETY: `observer` was allocated above and is registered once.
	unsafe { objc_registerClassPair(observer) };
	Some(observer)
}

/// AppKit as a [`Toolkit`].
///
/// Must be created and used on the main thread.
#[derive(Debug)]
pub struct AppKit {
	runtime: ObjcRuntime,
	application: Id,
	observer: Id,
}

impl AppKit {
	pub fn new() -> Result<Self, ToolkitError> {
		let thread = class("NSThread").ok_or(ToolkitError::Unavailable("NSThread"))?;
		let is_main = selector("isMainThread").ok_or(ToolkitError::Unavailable("isMainThread"))?;
		if send!(i8; thread, is_main) == 0 {
			return Err(ToolkitError::Unavailable("not on the main thread"));
		}

		let app_class = class(APPLICATION_CLASS).ok_or(ToolkitError::Unavailable(APPLICATION_CLASS))?;
		let shared = selector("sharedApplication").ok_or(ToolkitError::Unavailable("sharedApplication"))?;
		let application = send!(Id; app_class, shared);
		if application.is_null() {
			return Err(ToolkitError::Unavailable("shared application"));
		}

		let observer_class = observer_class().ok_or(ToolkitError::Unavailable("observer class"))?;
		let new = selector("new").ok_or(ToolkitError::Unavailable("new"))?;
		let observer = send!(Id; observer_class, new);
		if observer.is_null() {
			return Err(ToolkitError::Unavailable("observer"));
		}

		tracing::debug!(domain = "appkit", "toolkit ready");
		Ok(Self {
			runtime: ObjcRuntime::new(),
			application,
			observer,
		})
	}

	/// Live window object for `window`.
	///
	/// Handles are only dereferenced after they are found in the
	/// application's current window list.
	fn live(&self, window: WindowHandle) -> Option<Id> {
		self.window_objects()
			.into_iter()
			.find(|object| *object as u64 == window.0)
	}

	fn window_objects(&self) -> Vec<Id> {
		let (Some(windows), Some(count), Some(at)) = (selector("windows"), selector("count"), selector("objectAtIndex:"))
		else {
			return Vec::new();
		};
		let array = send!(Id; self.application, windows);
		if array.is_null() {
			return Vec::new();
		}
		let len = send!(usize; array, count);
		(0..len)
			.map(|index| send!(Id; array, at, index => usize))
			.filter(|object| !object.is_null())
			.collect()
	}

	fn object(&self, target: Target) -> Option<Id> {
		match target {
			Target::Window(window) => self.live(window),
			Target::Application => Some(self.application),
		}
	}
}

impl Toolkit for AppKit {
	type Host = ObjcRuntime;

	fn dispatch(&mut self) -> &mut ObjcRuntime {
		&mut self.runtime
	}

	fn windows(&self) -> Vec<WindowHandle> {
		self.window_objects()
			.into_iter()
			.map(|object| WindowHandle(object as u64))
			.collect()
	}

	fn is_kind_of(&self, window: WindowHandle, class_name: &str) -> bool {
		let (Some(object), Some(target), Some(sel)) = (self.live(window), class(class_name), selector("isKindOfClass:")) else {
			return false;
		};
		send!(i8; object, sel, target => Class) != 0
	}

	fn window_class(&self, window: WindowHandle) -> Option<String> {
		let object = self.live(window)?;
		// SAFETY: `object` is a live window; class names are static strings.
		let name = unsafe { CStr::from_ptr(class_getName(object_getClass(object))) };
		Some(name.to_string_lossy().into_owned())
	}

	fn window_number(&self, window: WindowHandle) -> Option<WindowId> {
		let object = self.live(window)?;
		let number = send!(i64; object, selector("windowNumber")?);
		u32::try_from(number).ok().filter(|n| *n > 0).map(WindowId)
	}

	fn supported_properties(&self, class_name: &str) -> PropertySet {
		let Some(cls) = class(class_name) else {
			return PropertySet::empty();
		};
		let target = if class_name == APPLICATION_CLASS {
			TargetKind::Application
		} else {
			TargetKind::Window
		};
		let responds = |name: &str| {
			// SAFETY: `cls` is a live class and the selector is interned.
			selector(name).is_some_and(|sel| unsafe { class_respondsToSelector(cls, sel) } != 0)
		};
		Property::of(target)
			.filter(|p| responds(p.name()) && p.setter().is_none_or(|setter| responds(setter)))
			.collect()
	}

	fn write_property(&mut self, target: Target, property: Property, value: &PropertyValue) -> Result<(), ToolkitError> {
		let object = self.object(target).ok_or(ToolkitError::Gone)?;
		let setter = property
			.setter()
			.and_then(selector)
			.ok_or(ToolkitError::Unsupported(property.name()))?;
		let rejected = || ToolkitError::Rejected {
			property: property.name(),
			value: value.to_string(),
		};
		let bits = forced_bits(property, value).ok_or_else(rejected)?;
		match property.kind() {
			ValueKind::Bool => send!((); object, setter, i8::from(bits != 0) => i8),
			ValueKind::Float => send!((); object, setter, f64::from_bits(bits) => f64),
			_ => send!((); object, setter, bits as i64 => i64),
		}
		Ok(())
	}

	fn replacement(&mut self, property: Property, accessor: Accessor, value: &PropertyValue) -> Option<EntryPoint> {
		let index = property as usize;
		FORCED[index].store(forced_bits(property, value)?, Ordering::Relaxed);
		let entry = match accessor {
			Accessor::Getter => getter_entry(property),
			Accessor::Setter { original } => {
				ORIGINAL[index].store(original.addr(), Ordering::Release);
				setter_entry(property)
			}
		};
		EntryPoint::from_addr(entry)
	}

	fn subscribe(&mut self, events: EventMask) -> bool {
		let (Some(center_class), Some(default_center), Some(add)) = (
			class("NSNotificationCenter"),
			selector("defaultCenter"),
			selector("addObserver:selector:name:object:"),
		) else {
			return false;
		};
		let center = send!(Id; center_class, default_center);
		if center.is_null() {
			return false;
		}
		let mut subscribed = false;
		for (mask, method, name) in OBSERVED {
			if !events.contains(mask) {
				continue;
			}
			let (Some(method), Some(name)) = (selector(method), nsstring(name)) else {
				continue;
			};
			send!((); center, add, self.observer => Id, method => Sel, name => Id, std::ptr::null_mut() => Id);
			subscribed = true;
		}
		tracing::debug!(domain = "appkit", ?events, subscribed, "notifications subscribed");
		subscribed
	}

	fn unsubscribe(&mut self) {
		let (Some(center_class), Some(default_center), Some(remove)) =
			(class("NSNotificationCenter"), selector("defaultCenter"), selector("removeObserver:"))
		else {
			return;
		};
		let center = send!(Id; center_class, default_center);
		if !center.is_null() {
			send!((); center, remove, self.observer => Id);
		}
	}

	fn schedule_repeating(&mut self, interval: Duration) -> Option<TimerId> {
		let timer = send!(Id; class("NSTimer")?,
			selector("scheduledTimerWithTimeInterval:target:selector:userInfo:repeats:")?,
			interval.as_secs_f64() => f64,
			self.observer => Id,
			selector("cloakTick:")? => Sel,
			std::ptr::null_mut() => Id,
			1 => i8,
		);
		(!timer.is_null()).then(|| TimerId(timer as u64))
	}

	fn cancel_timer(&mut self, timer: TimerId) {
		// The run loop retains a scheduled timer until it is invalidated.
		if let Some(invalidate) = selector("invalidate") {
			send!((); timer.0 as Id, invalidate);
		}
	}

	fn now(&self) -> Instant {
		Instant::now()
	}
}

impl Drop for AppKit {
	fn drop(&mut self) {
		self.unsubscribe();
		if let Some(release) = selector("release") {
			send!((); self.observer, release);
		}
	}
}
