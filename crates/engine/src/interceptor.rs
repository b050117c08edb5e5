//! Per-type interceptors.
//!
//! Each interceptor owns the accessors of one object type. Installing it
//! rewires the read accessor of every overridden property to return the
//! forced value, and the write accessor to coerce incoming values before
//! forwarding to the captured original.

use cloak_capability::SymbolSource;
use cloak_dispatch::{DispatchHost, EntryPoint, Rewire, Strategy};
use cloak_profiles::{MergedOverrides, PropertyValue};

use crate::context::EngineContext;
use crate::error::{EngineError, ErrorKind, Result, Step};
use crate::property::{Property, TargetKind};
use crate::report::ApplyReport;
use crate::toolkit::{Accessor, Toolkit};

#[cfg(test)]
mod tests;

bitflags::bitflags! {
	/// Interceptors enabled for an engine.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct InterceptorSet: u8 {
		const WINDOW = 1 << 0;
		const APPLICATION = 1 << 1;
	}
}

/// Interceptor for one object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectInterceptor {
	Window,
	Application,
}

impl ObjectInterceptor {
	pub const ALL: [ObjectInterceptor; 2] = [Self::Window, Self::Application];

	pub const fn name(self) -> &'static str {
		match self {
			Self::Window => "window",
			Self::Application => "application",
		}
	}

	/// Higher priorities install first.
	pub const fn priority(self) -> i32 {
		match self {
			Self::Window => 100,
			Self::Application => 50,
		}
	}

	pub const fn target(self) -> TargetKind {
		match self {
			Self::Window => TargetKind::Window,
			Self::Application => TargetKind::Application,
		}
	}

	pub const fn as_set(self) -> InterceptorSet {
		match self {
			Self::Window => InterceptorSet::WINDOW,
			Self::Application => InterceptorSet::APPLICATION,
		}
	}

	/// Interceptors in `set`, highest priority first.
	pub fn selected(set: InterceptorSet) -> Vec<ObjectInterceptor> {
		let mut selected: Vec<_> = Self::ALL.into_iter().filter(|i| set.contains(i.as_set())).collect();
		selected.sort_by_key(|i| std::cmp::Reverse(i.priority()));
		selected
	}

	/// Rewires the accessors of every overridden property of this type.
	///
	/// A type the toolkit does not know is skipped with a warning. A property
	/// the type does not expose is counted in `report.skipped`.
	pub(crate) fn install<T: Toolkit, S: SymbolSource>(
		self,
		ctx: &mut EngineContext<T, S>,
		overrides: &MergedOverrides,
		report: &mut ApplyReport,
	) -> Result<()> {
		let class = self.target().class();
		let Some(properties) = overrides.properties(class) else {
			tracing::debug!(domain = "engine", interceptor = self.name(), "no overrides");
			return Ok(());
		};

		if !ctx.toolkit.dispatch().contains_type(class) {
			tracing::warn!(domain = "engine", interceptor = self.name(), class, "type not found; interceptor skipped");
			return Ok(());
		}

		let supported = ctx.supported(class);
		for property in Property::of(self.target()) {
			let Some(value) = properties.get(property.name()) else {
				continue;
			};
			if !supported.contains(property.as_set()) {
				tracing::debug!(domain = "engine", class, property = property.name(), "property not exposed; skipped");
				report.skipped += 1;
				continue;
			}
			report.rewired += ctx.intercept_property(class, property, value)?;
		}

		tracing::info!(domain = "engine", interceptor = self.name(), class, "interceptor installed");
		Ok(())
	}
}

impl<T: Toolkit, S: SymbolSource> EngineContext<T, S> {
	/// Forces `property` on `class` to `value`. Returns the number of
	/// accessors newly rewired.
	pub(crate) fn intercept_property(&mut self, class: &str, property: Property, value: &PropertyValue) -> Result<usize> {
		let mut rewired = 0;

		if !self.dispatch.is_rewired(class, property.name()) {
			let entry = self.replacement(property, Accessor::Getter, value)?;
			let replacement_operation = format!("cloak_{}", property.name());
			let signature = property.getter_signature();
			self.dispatch
				.intercept(
					self.toolkit.dispatch(),
					&Rewire {
						class,
						operation: property.name(),
						replacement_operation: &replacement_operation,
						entry,
						signature: &signature,
						strategy: Strategy::Exchange,
					},
				)
				.map_err(EngineError::dispatch)?;
			rewired += 1;
		}

		if let Some(setter) = property.setter()
			&& !self.dispatch.is_rewired(class, setter)
		{
			// The coercing setter forwards to the original, so capture first.
			let original = self
				.dispatch
				.capture(&*self.toolkit.dispatch(), class, setter)
				.map_err(EngineError::dispatch)?;
			let entry = self.replacement(property, Accessor::Setter { original }, value)?;
			let replacement_operation = format!("cloak_{setter}");
			let signature = property.setter_signature();
			self.dispatch
				.intercept(
					self.toolkit.dispatch(),
					&Rewire {
						class,
						operation: setter,
						replacement_operation: &replacement_operation,
						entry,
						signature: &signature,
						strategy: Strategy::Exchange,
					},
				)
				.map_err(EngineError::dispatch)?;
			rewired += 1;
		}

		tracing::debug!(domain = "engine", class, property = property.name(), %value, "property forced");
		Ok(rewired)
	}

	/// Rebinds the original accessors of `property` on `class`.
	pub(crate) fn release_property(&mut self, class: &str, property: Property) -> Result<()> {
		if let Some(setter) = property.setter() {
			self.dispatch
				.restore(self.toolkit.dispatch(), class, setter)
				.map_err(|err| EngineError::new(Step::Rewire, err))?;
		}
		self.dispatch
			.restore(self.toolkit.dispatch(), class, property.name())
			.map_err(|err| EngineError::new(Step::Rewire, err))
	}

	fn replacement(&mut self, property: Property, accessor: Accessor, value: &PropertyValue) -> Result<EntryPoint> {
		self.toolkit.replacement(property, accessor, value).ok_or_else(|| {
			let operation = match accessor {
				Accessor::Getter => property.name(),
				Accessor::Setter { .. } => property.setter().unwrap_or(property.name()),
			};
			tracing::error!(domain = "engine", operation, "toolkit cannot express replacement");
			EngineError::new(
				Step::Rewire,
				ErrorKind::NoReplacement {
					operation: operation.to_string(),
				},
			)
		})
	}
}
