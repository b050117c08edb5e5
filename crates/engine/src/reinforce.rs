//! Reapplying overrides to live objects.
//!
//! Rewired accessors cover callers that ask an object for its state, but
//! the toolkit also pushes state to the window server on its own. Each pass
//! writes the forced values back through the objects' own accessors so the
//! server sees them too.

use cloak_capability::{SharingState, SymbolSource, WindowLevel};
use cloak_profiles::PropertyValue;

use crate::context::EngineContext;
use crate::engine::Installed;
use crate::interceptor::InterceptorSet;
use crate::property::{APPLICATION_CLASS, Property, PropertySet, TargetKind, WINDOW_CLASS};
use crate::report::PassReport;
use crate::toolkit::{Target, Toolkit, ToolkitError, WindowHandle};

impl<T: Toolkit, S: SymbolSource> EngineContext<T, S> {
	/// Applies the installed overrides to every live window and the
	/// application object.
	pub(crate) fn run_pass(&mut self, installed: &Installed) -> PassReport {
		let mut report = PassReport::default();
		if installed.interceptors.contains(InterceptorSet::WINDOW) {
			for window in self.toolkit.windows() {
				report.merge(self.apply_window(window, installed));
			}
		}
		report.merge(self.apply_application(installed));
		tracing::trace!(domain = "reinforce", %report, "pass complete");
		report
	}

	/// Applies the window overrides to one window.
	///
	/// A window that died between discovery and processing is counted as
	/// gone and left alone, as is one written less than the debounce
	/// interval ago.
	pub(crate) fn apply_window(&mut self, window: WindowHandle, installed: &Installed) -> PassReport {
		let mut report = PassReport::default();
		if !self.toolkit.is_kind_of(window, WINDOW_CLASS) {
			tracing::debug!(domain = "reinforce", %window, "window gone before processing");
			report.gone = 1;
			return report;
		}
		let now = self.toolkit.now();
		if let Some(debounce) = installed.debounce
			&& let Some(last) = self.protected.last_written(window)
			&& now.saturating_duration_since(last) < debounce
		{
			tracing::trace!(domain = "reinforce", %window, "written recently; debounced");
			report.debounced = 1;
			return report;
		}
		report.windows = 1;

		let class = self
			.toolkit
			.window_class(window)
			.unwrap_or_else(|| WINDOW_CLASS.to_string());
		let supported = self.supported(&class);
		let target = Target::Window(window);

		if let Some(properties) = installed.overrides.properties(WINDOW_CLASS) {
			for property in Property::of(TargetKind::Window) {
				if let Some(value) = properties.get(property.name()) {
					self.write(target, &class, supported, property, value, &mut report);
				}
			}
		}

		if installed.overrides.requests_direct_control() {
			self.apply_direct(window, &class, supported, installed, &mut report);
		}

		if self.protected.insert(window, now) {
			report.new_windows = 1;
			tracing::info!(domain = "reinforce", %window, class = class.as_str(), "window protected");
		}
		report
	}

	/// Applies the application overrides.
	pub(crate) fn apply_application(&mut self, installed: &Installed) -> PassReport {
		let mut report = PassReport::default();
		if !installed.interceptors.contains(InterceptorSet::APPLICATION) {
			return report;
		}
		let Some(properties) = installed.overrides.properties(APPLICATION_CLASS) else {
			return report;
		};
		let supported = self.supported(APPLICATION_CLASS);
		for property in Property::of(TargetKind::Application) {
			if let Some(value) = properties.get(property.name()) {
				self.write(Target::Application, APPLICATION_CLASS, supported, property, value, &mut report);
			}
		}
		report
	}

	/// Window-server calls that bypass the toolkit. Level first, sharing
	/// state last.
	fn apply_direct(
		&mut self,
		window: WindowHandle,
		class: &str,
		supported: PropertySet,
		installed: &Installed,
		report: &mut PassReport,
	) {
		let Some(number) = self.toolkit.window_number(window) else {
			return;
		};
		let target = Target::Window(window);

		let level = installed
			.overrides
			.get(WINDOW_CLASS, Property::Level.name())
			.and_then(PropertyValue::as_int)
			.and_then(|raw| i32::try_from(raw).ok())
			.map_or(installed.window_level, WindowLevel);
		if self.resolver.can_set_window_level() {
			match self.resolver.set_window_level(number, level) {
				Ok(()) => report.direct += 1,
				Err(err) => {
					tracing::warn!(domain = "reinforce", %window, error = %err, "direct level change failed");
					report.failures += 1;
				}
			}
		} else {
			report.direct_unavailable += 1;
			if installed.overrides.get(WINDOW_CLASS, Property::Level.name()).is_none() {
				let value = PropertyValue::Int(level.0.into());
				self.write(target, class, supported, Property::Level, &value, report);
			}
		}

		let sharing = installed
			.overrides
			.get(WINDOW_CLASS, Property::SharingType.name())
			.and_then(PropertyValue::as_int)
			.and_then(|raw| i32::try_from(raw).ok())
			.and_then(SharingState::from_raw)
			.unwrap_or(SharingState::None);
		if self.resolver.can_set_sharing_state() {
			match self.resolver.set_sharing_state(number, sharing) {
				Ok(()) => report.direct += 1,
				Err(err) => {
					tracing::warn!(domain = "reinforce", %window, error = %err, "direct sharing change failed");
					report.failures += 1;
				}
			}
		} else {
			report.direct_unavailable += 1;
			if installed.overrides.get(WINDOW_CLASS, Property::SharingType.name()).is_none() {
				let value = PropertyValue::enumeration(sharing.as_str(), sharing.raw().into());
				self.write(target, class, supported, Property::SharingType, &value, report);
			}
		}
	}

	fn write(
		&mut self,
		target: Target,
		class: &str,
		supported: PropertySet,
		property: Property,
		value: &PropertyValue,
		report: &mut PassReport,
	) {
		if !supported.contains(property.as_set()) {
			tracing::debug!(domain = "reinforce", class, property = property.name(), "property not exposed; skipped");
			report.unsupported += 1;
			return;
		}
		// Read-only properties are enforced by the rewired getter alone.
		if property.setter().is_none() {
			return;
		}
		match self.toolkit.write_property(target, property, value) {
			Ok(()) => report.applied += 1,
			Err(ToolkitError::Unsupported(_)) => {
				tracing::debug!(domain = "reinforce", class, property = property.name(), "write not supported; skipped");
				report.unsupported += 1;
			}
			Err(err) => {
				tracing::warn!(domain = "reinforce", class, property = property.name(), error = %err, "write failed");
				report.failures += 1;
			}
		}
	}
}
