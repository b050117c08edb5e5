use std::collections::BTreeMap;
use std::time::Instant;

use cloak_capability::{CapabilityResolver, SymbolSource, SystemLibrary};
use cloak_dispatch::Interceptor;
use rustc_hash::FxHashMap as HashMap;

use crate::property::PropertySet;
use crate::toolkit::{Toolkit, WindowHandle};

/// Windows the engine has already processed at least once, with the time
/// of their last write.
///
/// Handles are recorded, never dereferenced: liveness is always re-checked
/// through the toolkit before an object is touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedWindowSet {
	windows: BTreeMap<WindowHandle, Instant>,
}

impl ProtectedWindowSet {
	/// Records a write to `window` at `at`. Returns true if the window was
	/// not known yet.
	pub fn insert(&mut self, window: WindowHandle, at: Instant) -> bool {
		self.windows.insert(window, at).is_none()
	}

	pub fn contains(&self, window: WindowHandle) -> bool {
		self.windows.contains_key(&window)
	}

	/// When overrides were last written to `window`.
	pub fn last_written(&self, window: WindowHandle) -> Option<Instant> {
		self.windows.get(&window).copied()
	}

	pub fn iter(&self) -> impl Iterator<Item = WindowHandle> + '_ {
		self.windows.keys().copied()
	}

	pub fn len(&self) -> usize {
		self.windows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.windows.is_empty()
	}

	pub(crate) fn clear(&mut self) {
		self.windows.clear();
	}
}

/// State shared by every engine operation.
///
/// Owns the original-entry-point registry, so it must live as long as any
/// rewire it installed.
#[derive(Debug)]
pub struct EngineContext<T: Toolkit, S: SymbolSource = SystemLibrary> {
	pub(crate) toolkit: T,
	pub(crate) dispatch: Interceptor,
	pub(crate) resolver: CapabilityResolver<S>,
	pub(crate) protected: ProtectedWindowSet,
	support: HashMap<String, PropertySet>,
}

impl<T: Toolkit, S: SymbolSource> EngineContext<T, S> {
	pub fn new(toolkit: T, resolver: CapabilityResolver<S>) -> Self {
		Self {
			toolkit,
			dispatch: Interceptor::new(),
			resolver,
			protected: ProtectedWindowSet::default(),
			support: HashMap::default(),
		}
	}

	pub fn toolkit(&self) -> &T {
		&self.toolkit
	}

	pub fn toolkit_mut(&mut self) -> &mut T {
		&mut self.toolkit
	}

	/// Registry of captured originals and installed rewires.
	pub fn interceptor(&self) -> &Interceptor {
		&self.dispatch
	}

	pub fn resolver(&self) -> &CapabilityResolver<S> {
		&self.resolver
	}

	pub fn protected(&self) -> &ProtectedWindowSet {
		&self.protected
	}

	/// Properties `class` exposes. Queried once per type, then cached.
	pub(crate) fn supported(&mut self, class: &str) -> PropertySet {
		if let Some(set) = self.support.get(class) {
			return *set;
		}
		let set = self.toolkit.supported_properties(class);
		tracing::debug!(domain = "engine", class, properties = ?set, "queried type");
		self.support.insert(class.to_string(), set);
		set
	}

	/// Undoes every rewire after a failed install.
	pub(crate) fn rollback(&mut self) {
		if let Err(err) = self.dispatch.restore_all(self.toolkit.dispatch()) {
			tracing::error!(domain = "engine", error = %err, "rollback incomplete");
		}
	}
}
