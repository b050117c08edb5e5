//! In-memory windowing toolkit.
//!
//! Objects, types and a dispatch table live in plain maps. Every accessor
//! call made through [`TestToolkit::get`] or [`TestToolkit::set`] goes
//! through the [`IndirectionTable`], so rewired operations behave exactly as
//! they would for a foreign caller.
//!
//! Notifications are queued only while subscribed. Nothing runs on its own:
//! [`TestToolkit::fire_timers`] queues a tick per scheduled timer and
//! [`run_until_idle`] plays the main loop, handing queued events to an
//! engine.
//!
//! ```
//! use cloak_engine::property::Property;
//! use cloak_engine::toolkit::Target;
//! use cloak_engine::toolkit::testing::TestToolkit;
//! use cloak_profiles::PropertyValue;
//!
//! let mut toolkit = TestToolkit::new();
//! let window = Target::Window(toolkit.open_window("NSWindow"));
//! toolkit.set(window, Property::Level, PropertyValue::Int(3)).unwrap();
//! assert_eq!(toolkit.get(window, Property::Level), Some(PropertyValue::Int(3)));
//! ```

use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use cloak_capability::{SymbolSource, WindowId};
use cloak_dispatch::{DispatchHost, EntryPoint, IndirectionTable};
use cloak_profiles::PropertyValue;
use rustc_hash::FxHashMap as HashMap;

use crate::property::{APPLICATION_CLASS, Property, PropertySet, TargetKind, WINDOW_CLASS};
use crate::engine::Engine;
use crate::report::PassReport;
use crate::toolkit::{Accessor, Event, EventMask, Target, TimerId, Toolkit, ToolkitError, WindowHandle};


/// Synthetic code behind an entry point.
#[derive(Debug, Clone)]
enum Behavior {
	/// Returns the stored value.
	Read(Property),
	/// Stores the incoming value.
	Store(Property),
	/// Returns a constant.
	Constant(PropertyValue),
	/// Replaces the incoming value, then runs `forward`.
	Coerce { value: PropertyValue, forward: EntryPoint },
}

#[derive(Debug, Clone)]
struct TestObject {
	class: String,
	number: WindowId,
	open: bool,
	values: HashMap<Property, PropertyValue>,
	rejects: PropertySet,
}

/// Initial value of a property on a fresh object.
pub fn default_value(property: Property) -> PropertyValue {
	match property {
		Property::StyleMask => PropertyValue::Int(15),
		Property::CollectionBehavior | Property::PresentationOptions => PropertyValue::Int(0),
		Property::Level => PropertyValue::Int(0),
		Property::HasShadow | Property::CanBecomeKey | Property::CanBecomeMain => PropertyValue::Bool(true),
		Property::AlphaValue => PropertyValue::Float(1.0),
		Property::IgnoresMouseEvents | Property::AcceptsMouseMovedEvents => PropertyValue::Bool(false),
		Property::SharingType => PropertyValue::enumeration("read-only", 1),
		Property::ActivationPolicy => PropertyValue::enumeration("regular", 0),
	}
}

/// In-memory [`Toolkit`].
#[derive(Debug)]
pub struct TestToolkit {
	table: IndirectionTable,
	behaviors: HashMap<EntryPoint, Behavior>,
	supported: HashMap<String, PropertySet>,
	windows: BTreeMap<WindowHandle, TestObject>,
	application: TestObject,
	next_addr: NonZeroUsize,
	next_window: u64,
	next_timer: u64,
	subscribed: Option<EventMask>,
	timers: BTreeMap<TimerId, Duration>,
	queue: VecDeque<Event>,
	queries: Cell<usize>,
	refuse_subscription: bool,
	refuse_timers: bool,
	refuse_replacements: usize,
	epoch: Instant,
	elapsed: Duration,
}

impl Default for TestToolkit {
	fn default() -> Self {
		Self::new()
	}
}

impl TestToolkit {
	/// Toolkit with `NSWindow`, `NSPanel` (a window subtype) and
	/// `NSApplication` exposing every controlled property.
	pub fn new() -> Self {
		let mut toolkit = Self {
			table: IndirectionTable::new(),
			behaviors: HashMap::default(),
			supported: HashMap::default(),
			windows: BTreeMap::new(),
			application: TestObject {
				class: APPLICATION_CLASS.to_string(),
				number: WindowId(0),
				open: true,
				values: HashMap::default(),
				rejects: PropertySet::empty(),
			},
			next_addr: NonZeroUsize::MIN.saturating_add(0xfff),
			next_window: 1,
			next_timer: 1,
			subscribed: None,
			timers: BTreeMap::new(),
			queue: VecDeque::new(),
			queries: Cell::new(0),
			refuse_subscription: false,
			refuse_timers: false,
			refuse_replacements: 0,
			epoch: Instant::now(),
			elapsed: Duration::ZERO,
		};
		toolkit.define_class(WINDOW_CLASS, None, PropertySet::WINDOW);
		toolkit.define_class("NSPanel", Some(WINDOW_CLASS), PropertySet::WINDOW);
		toolkit.define_class(APPLICATION_CLASS, None, PropertySet::APPLICATION);
		toolkit
	}

	/// Declares a type exposing `supported`.
	///
	/// Accessors are defined on the type itself only when it has no
	/// supertype; subtypes inherit them. A subtype may expose fewer
	/// properties than its supertype, as toolkit subclasses sometimes do.
	pub fn define_class(&mut self, class: &str, superclass: Option<&str>, supported: PropertySet) -> &mut Self {
		self.table.define_type(class, superclass);
		if superclass.is_none() {
			for property in supported.properties() {
				let read = self.alloc(Behavior::Read(property));
				self.table.define(class, property.name(), read, property.getter_signature());
				if let Some(setter) = property.setter() {
					let store = self.alloc(Behavior::Store(property));
					self.table.define(class, setter, store, property.setter_signature());
				}
			}
		}
		self.supported.insert(class.to_string(), supported);
		self
	}

	/// Creates a live window of `class` and announces it.
	pub fn open_window(&mut self, class: &str) -> WindowHandle {
		let handle = WindowHandle(self.next_window);
		self.next_window += 1;
		self.windows.insert(
			handle,
			TestObject {
				class: class.to_string(),
				number: WindowId(100 + handle.0 as u32),
				open: true,
				values: HashMap::default(),
				rejects: PropertySet::empty(),
			},
		);
		self.post(Event::WindowCreated(handle));
		handle
	}

	/// Deallocates a window. Its handle stays known but dead.
	pub fn close_window(&mut self, window: WindowHandle) {
		if let Some(object) = self.windows.get_mut(&window) {
			object.open = false;
		}
	}

	/// Makes every write of `property` to `window` fail.
	pub fn reject_writes(&mut self, window: WindowHandle, property: Property) {
		if let Some(object) = self.windows.get_mut(&window) {
			object.rejects |= property.as_set();
		}
	}

	/// Refuses the next event subscriptions.
	pub fn refuse_subscription(&mut self, refuse: bool) {
		self.refuse_subscription = refuse;
	}

	/// Makes timer scheduling fail.
	pub fn refuse_timers(&mut self, refuse: bool) {
		self.refuse_timers = refuse;
	}

	/// Makes the next `count` replacement requests fail.
	pub fn refuse_replacements(&mut self, count: usize) {
		self.refuse_replacements = count;
	}

	/// Moves the main-loop clock forward. Time stands still otherwise.
	pub fn advance(&mut self, by: Duration) {
		self.elapsed += by;
	}

	/// Reads `property` the way a foreign caller would.
	pub fn get(&self, target: Target, property: Property) -> Option<PropertyValue> {
		let object = self.object(target)?;
		let entry = self.table.implementation(&object.class, property.name())?;
		match self.behaviors.get(&entry)? {
			Behavior::Read(p) => Some(object.values.get(p).cloned().unwrap_or_else(|| default_value(*p))),
			Behavior::Constant(value) => Some(value.clone()),
			Behavior::Store(_) | Behavior::Coerce { .. } => None,
		}
	}

	/// Writes `property` the way a foreign caller would.
	pub fn set(&mut self, target: Target, property: Property, value: PropertyValue) -> Result<(), ToolkitError> {
		let setter = property.setter().ok_or(ToolkitError::Unsupported(property.name()))?;
		let class = self.object(target).ok_or(ToolkitError::Gone)?.class.clone();
		let mut entry = self
			.table
			.implementation(&class, setter)
			.ok_or(ToolkitError::Unsupported(property.name()))?;
		let mut value = value;
		// Bounded: coercions chain at most once per installed rewire.
		for _ in 0..=self.behaviors.len() {
			match self.behaviors.get(&entry) {
				Some(Behavior::Store(p)) => {
					let p = *p;
					let object = self.object_mut(target).ok_or(ToolkitError::Gone)?;
					object.values.insert(p, value);
					return Ok(());
				}
				Some(Behavior::Coerce { value: forced, forward }) => {
					value = forced.clone();
					entry = *forward;
				}
				_ => break,
			}
		}
		Err(ToolkitError::Rejected {
			property: property.name(),
			value: value.to_string(),
		})
	}

	/// Backing store value, bypassing dispatch. Models the target resetting
	/// its own state.
	pub fn stored(&self, target: Target, property: Property) -> Option<PropertyValue> {
		let object = self.object(target)?;
		Some(object.values.get(&property).cloned().unwrap_or_else(|| default_value(property)))
	}

	/// Overwrites the backing store, bypassing dispatch.
	pub fn set_stored(&mut self, target: Target, property: Property, value: PropertyValue) {
		if let Some(object) = self.object_mut(target) {
			object.values.insert(property, value);
		}
	}

	pub fn table(&self) -> &IndirectionTable {
		&self.table
	}

	/// Currently subscribed events.
	pub fn subscribed(&self) -> Option<EventMask> {
		self.subscribed
	}

	/// Queues `event` if the engine subscribed to it. Ticks are queued only
	/// for scheduled timers.
	pub fn post(&mut self, event: Event) -> bool {
		let wanted = match event {
			Event::Tick(timer) => self.timers.contains_key(&timer),
			other => self.subscribed.is_some_and(|mask| mask.contains(other.mask())),
		};
		if wanted {
			self.queue.push_back(event);
		}
		wanted
	}

	/// Queues one tick per scheduled timer.
	pub fn fire_timers(&mut self) {
		let timers: Vec<TimerId> = self.timers.keys().copied().collect();
		for timer in timers {
			self.post(Event::Tick(timer));
		}
	}

	pub fn pending(&self) -> usize {
		self.queue.len()
	}

	pub fn next_event(&mut self) -> Option<Event> {
		self.queue.pop_front()
	}

	/// Scheduled timers and their intervals.
	pub fn timers(&self) -> impl Iterator<Item = (TimerId, Duration)> + '_ {
		self.timers.iter().map(|(id, interval)| (*id, *interval))
	}

	/// Number of [`Toolkit::supported_properties`] calls so far.
	pub fn support_queries(&self) -> usize {
		self.queries.get()
	}

	fn alloc(&mut self, behavior: Behavior) -> EntryPoint {
		let entry = EntryPoint::from_nonzero(self.next_addr);
		self.next_addr = self.next_addr.saturating_add(0x10);
		self.behaviors.insert(entry, behavior);
		entry
	}

	fn object(&self, target: Target) -> Option<&TestObject> {
		match target {
			Target::Window(w) => self.windows.get(&w).filter(|o| o.open),
			Target::Application => Some(&self.application),
		}
	}

	fn object_mut(&mut self, target: Target) -> Option<&mut TestObject> {
		match target {
			Target::Window(w) => self.windows.get_mut(&w).filter(|o| o.open),
			Target::Application => Some(&mut self.application),
		}
	}
}

/// Hands queued events to `engine` until the queue is empty, merging the
/// pass reports.
pub fn run_until_idle<S: SymbolSource>(engine: &mut Engine<TestToolkit, S>) -> PassReport {
	let mut report = PassReport::default();
	while let Some(event) = engine.toolkit_mut().next_event() {
		if let Some(pass) = engine.handle(event) {
			report.merge(pass);
		}
	}
	report
}

impl Toolkit for TestToolkit {
	type Host = IndirectionTable;

	fn dispatch(&mut self) -> &mut IndirectionTable {
		&mut self.table
	}

	fn windows(&self) -> Vec<WindowHandle> {
		self.windows
			.iter()
			.filter(|(_, o)| o.open)
			.map(|(h, _)| *h)
			.collect()
	}

	fn is_kind_of(&self, window: WindowHandle, class: &str) -> bool {
		self.object(Target::Window(window))
			.is_some_and(|o| self.table.is_kind_of(&o.class, class))
	}

	fn window_class(&self, window: WindowHandle) -> Option<String> {
		self.object(Target::Window(window)).map(|o| o.class.clone())
	}

	fn window_number(&self, window: WindowHandle) -> Option<WindowId> {
		self.object(Target::Window(window)).map(|o| o.number)
	}

	fn supported_properties(&self, class: &str) -> PropertySet {
		self.queries.set(self.queries.get() + 1);
		self.supported.get(class).copied().unwrap_or_default()
	}

	fn write_property(&mut self, target: Target, property: Property, value: &PropertyValue) -> Result<(), ToolkitError> {
		let object = self.object(target).ok_or(ToolkitError::Gone)?;
		let supported = self.supported.get(&object.class).copied().unwrap_or_default();
		if !supported.contains(property.as_set()) {
			return Err(ToolkitError::Unsupported(property.name()));
		}
		if object.rejects.contains(property.as_set()) {
			return Err(ToolkitError::Rejected {
				property: property.name(),
				value: value.to_string(),
			});
		}
		debug_assert_eq!(
			matches!(target, Target::Application),
			property.target() == TargetKind::Application
		);
		self.set(target, property, value.clone())
	}

	fn replacement(&mut self, _property: Property, accessor: Accessor, value: &PropertyValue) -> Option<EntryPoint> {
		if self.refuse_replacements > 0 {
			self.refuse_replacements -= 1;
			return None;
		}
		let behavior = match accessor {
			Accessor::Getter => Behavior::Constant(value.clone()),
			Accessor::Setter { original } => Behavior::Coerce {
				value: value.clone(),
				forward: original,
			},
		};
		Some(self.alloc(behavior))
	}

	fn subscribe(&mut self, events: EventMask) -> bool {
		if self.refuse_subscription {
			return false;
		}
		self.subscribed = Some(events);
		true
	}

	fn unsubscribe(&mut self) {
		self.subscribed = None;
		self.queue.retain(|event| matches!(event, Event::Tick(_)));
	}

	fn schedule_repeating(&mut self, interval: Duration) -> Option<TimerId> {
		if self.refuse_timers {
			return None;
		}
		let id = TimerId(self.next_timer);
		self.next_timer += 1;
		self.timers.insert(id, interval);
		Some(id)
	}

	fn cancel_timer(&mut self, timer: TimerId) {
		self.timers.remove(&timer);
		self.queue.retain(|event| *event != Event::Tick(timer));
	}

	fn now(&self) -> Instant {
		self.epoch + self.elapsed
	}
}
