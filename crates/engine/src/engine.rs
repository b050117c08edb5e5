//! Profile installation and the reinforcement loop.

use std::sync::Arc;
use std::time::Duration;

use cloak_capability::{CapabilityResolver, SymbolSource, SystemLibrary, WindowLevel};
use cloak_profiles::{MergedOverrides, ProfileRegistry, PropertyValue};

use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::error::{EngineError, ErrorKind, Result, Step};
use crate::interceptor::{InterceptorSet, ObjectInterceptor};
use crate::property::{APPLICATION_CLASS, Property, TargetKind, WINDOW_CLASS};
use crate::report::{ApplyReport, PassReport};
use crate::toolkit::{Event, EventMask, TimerId, Toolkit};

#[cfg(test)]
mod tests;

/// What a successful install left running.
#[derive(Debug)]
pub(crate) struct Installed {
	pub(crate) overrides: MergedOverrides,
	pub(crate) interceptors: InterceptorSet,
	pub(crate) window_level: WindowLevel,
	pub(crate) debounce: Option<Duration>,
	timer: TimerId,
	interval: Duration,
	subscribed: bool,
}

/// Applies profiles to a toolkit and keeps them applied.
///
/// All methods must be called on the toolkit's main loop. The toolkit
/// delivers timer ticks and lifecycle notifications through
/// [`handle`](Self::handle).
#[derive(Debug)]
pub struct Engine<T: Toolkit, S: SymbolSource = SystemLibrary> {
	ctx: EngineContext<T, S>,
	registry: Arc<ProfileRegistry>,
	config: EngineConfig,
	installed: Option<Installed>,
	interaction: Option<bool>,
}

impl<T: Toolkit, S: SymbolSource> Engine<T, S> {
	pub fn new(toolkit: T, resolver: CapabilityResolver<S>, registry: Arc<ProfileRegistry>, config: EngineConfig) -> Self {
		Self {
			ctx: EngineContext::new(toolkit, resolver),
			registry,
			config,
			installed: None,
			interaction: None,
		}
	}

	/// Builds an engine and resolves the window-server symbols. Nothing is
	/// installed yet.
	pub fn connect(toolkit: T, resolver: CapabilityResolver<S>, registry: Arc<ProfileRegistry>, config: EngineConfig) -> Self {
		let engine = Self::new(toolkit, resolver, registry, config);
		let available = engine.ctx.resolver.resolve_all();
		tracing::info!(
			domain = "engine",
			available,
			capabilities = %engine.ctx.resolver.report(),
			"window server checked",
		);
		engine
	}

	/// [`connect`](Self::connect), then installs the configured profiles.
	pub fn initialize(
		toolkit: T,
		resolver: CapabilityResolver<S>,
		registry: Arc<ProfileRegistry>,
		config: EngineConfig,
	) -> Result<Self> {
		let mut engine = Self::connect(toolkit, resolver, registry, config);
		engine.install_configured()?;
		Ok(engine)
	}

	/// Installs the profiles named in the configuration.
	pub fn install_configured(&mut self) -> Result<ApplyReport> {
		let profiles = self.config.profiles.clone();
		let report = self.install(&profiles)?;
		tracing::info!(
			domain = "engine",
			profiles = ?report.profiles,
			rewired = report.rewired,
			direct = report.direct_control,
			"initialized",
		);
		Ok(report)
	}

	/// Installs the named profiles.
	///
	/// Names are resolved with their dependencies, merged, checked against
	/// the property catalogue and rewired. An initial pass then applies the
	/// result to every live object and reinforcement starts. Any failure
	/// rolls back the rewires made so far.
	///
	/// Installing while already installed is a no-op.
	pub fn install<N: AsRef<str>>(&mut self, names: &[N]) -> Result<ApplyReport> {
		if let Some(installed) = &self.installed {
			tracing::info!(domain = "engine", "already installed; ignoring");
			return Ok(ApplyReport {
				profiles: installed.overrides.applied().to_vec(),
				direct_control: installed.overrides.requests_direct_control(),
				..ApplyReport::default()
			});
		}
		let (overrides, report) = self.prepare(names)?;
		self.activate(overrides, report)
	}

	/// Stops reinforcement and restores every rewired operation.
	///
	/// A no-op when nothing is installed.
	pub fn uninstall(&mut self) -> Result<()> {
		let Some(installed) = self.installed.take() else {
			tracing::info!(domain = "engine", "not installed; nothing to undo");
			return Ok(());
		};

		self.ctx.toolkit.cancel_timer(installed.timer);
		if installed.subscribed {
			self.ctx.toolkit.unsubscribe();
		}
		let restored = self.ctx.dispatch.restore_all(self.ctx.toolkit.dispatch());
		self.ctx.protected.clear();

		match restored {
			Ok(()) => {
				tracing::info!(domain = "engine", "profiles uninstalled");
				Ok(())
			}
			Err(err) => {
				tracing::error!(domain = "engine", error = %err, "uninstall left rewires behind");
				Err(EngineError::new(Step::Rewire, err))
			}
		}
	}

	/// Replaces the installed profiles with `names`.
	///
	/// Names that fail to resolve or validate leave the current profiles in
	/// force.
	pub fn apply_profiles<N: AsRef<str>>(&mut self, names: &[N]) -> Result<ApplyReport> {
		let (overrides, report) = self.prepare(names)?;
		self.uninstall()?;
		self.activate(overrides, report)
	}

	/// Reacts to a timer tick or lifecycle notification.
	///
	/// Returns `None` when the event is not relevant to the installed state.
	pub fn handle(&mut self, event: Event) -> Option<PassReport> {
		let Some(installed) = &self.installed else {
			tracing::trace!(domain = "engine", event = event.as_str(), "not installed; event ignored");
			return None;
		};

		let report = match event {
			Event::Tick(timer) if timer == installed.timer => self.ctx.run_pass(installed),
			Event::Tick(timer) => {
				tracing::trace!(domain = "engine", ?timer, "stale timer");
				return None;
			}
			Event::ApplicationActivated => self.ctx.apply_application(installed),
			other => {
				let window = other.window()?;
				if !installed.interceptors.contains(InterceptorSet::WINDOW) {
					return None;
				}
				self.ctx.apply_window(window, installed)
			}
		};
		tracing::trace!(domain = "engine", event = event.as_str(), %report, "event handled");
		self.adapt_interval(&report, matches!(event, Event::Tick(_)));
		Some(report)
	}

	/// Runs a full pass immediately.
	pub fn reinforce(&mut self) -> Option<PassReport> {
		let installed = self.installed.as_ref()?;
		Some(self.ctx.run_pass(installed))
	}

	/// Current period of the reinforcement timer.
	pub fn interval(&self) -> Option<Duration> {
		self.installed.as_ref().map(|i| i.interval)
	}

	/// Lets windows take focus again, or forbids it.
	///
	/// Only meaningful in direct mode; otherwise the choice is stored and
	/// honored by the next direct-mode install. If rewiring fails, the
	/// previous value is forced again before the error is returned.
	pub fn set_window_interaction(&mut self, enabled: bool) -> Result<()> {
		let previous_choice = self.interaction.replace(enabled);
		let Some(installed) = &mut self.installed else {
			tracing::debug!(domain = "engine", enabled, "window interaction stored for next install");
			return Ok(());
		};
		if !installed.overrides.requests_direct_control() || !installed.interceptors.contains(InterceptorSet::WINDOW) {
			tracing::debug!(domain = "engine", enabled, "window interaction needs direct control; stored");
			return Ok(());
		}

		let value = PropertyValue::Bool(enabled);
		let supported = self.ctx.supported(WINDOW_CLASS);
		for property in [Property::CanBecomeKey, Property::CanBecomeMain] {
			if !supported.contains(property.as_set()) {
				continue;
			}
			let forced = self
				.ctx
				.release_property(WINDOW_CLASS, property)
				.and_then(|()| self.ctx.intercept_property(WINDOW_CLASS, property, &value));
			if let Err(err) = forced {
				if let Some(previous) = installed.overrides.get(WINDOW_CLASS, property.name())
					&& let Err(reforce) = self.ctx.intercept_property(WINDOW_CLASS, property, previous)
				{
					tracing::error!(
						domain = "engine",
						property = property.name(),
						error = %reforce,
						"previous value could not be forced again",
					);
				}
				tracing::warn!(domain = "engine", enabled, property = property.name(), error = %err, "window interaction unchanged");
				self.interaction = previous_choice;
				return Err(err);
			}
			installed.overrides.insert(WINDOW_CLASS, property.name(), value.clone());
		}
		tracing::info!(domain = "engine", enabled, "window interaction updated");
		Ok(())
	}

	pub fn window_interaction(&self) -> Option<bool> {
		self.interaction
	}

	pub fn is_installed(&self) -> bool {
		self.installed.is_some()
	}

	/// Overrides currently in force.
	pub fn overrides(&self) -> Option<&MergedOverrides> {
		self.installed.as_ref().map(|i| &i.overrides)
	}

	pub fn context(&self) -> &EngineContext<T, S> {
		&self.ctx
	}

	pub fn toolkit(&self) -> &T {
		&self.ctx.toolkit
	}

	pub fn toolkit_mut(&mut self) -> &mut T {
		&mut self.ctx.toolkit
	}

	pub fn registry(&self) -> &Arc<ProfileRegistry> {
		&self.registry
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Resolves `names` and checks the result without touching any state.
	fn prepare<N: AsRef<str>>(&self, names: &[N]) -> Result<(MergedOverrides, ApplyReport)> {
		let mut overrides = self
			.registry
			.merged_overrides(names)
			.map_err(|err| EngineError::new(Step::Resolution, err))?;
		let report = ApplyReport {
			profiles: overrides.applied().to_vec(),
			skipped: validate(&overrides)?,
			direct_control: overrides.requests_direct_control(),
			..ApplyReport::default()
		};

		if report.direct_control
			&& let Some(enabled) = self.interaction
		{
			for property in [Property::CanBecomeKey, Property::CanBecomeMain] {
				overrides.insert(WINDOW_CLASS, property.name(), PropertyValue::Bool(enabled));
			}
		}
		Ok((overrides, report))
	}

	/// Rewires, starts reinforcement and runs the first pass.
	fn activate(&mut self, overrides: MergedOverrides, mut report: ApplyReport) -> Result<ApplyReport> {
		for interceptor in ObjectInterceptor::selected(self.config.interceptors) {
			if let Err(err) = interceptor.install(&mut self.ctx, &overrides, &mut report) {
				tracing::error!(domain = "engine", interceptor = interceptor.name(), step = %err.step(), error = %err, "install failed");
				self.ctx.rollback();
				return Err(err);
			}
		}

		let events = self.events();
		let subscribed = self.ctx.toolkit.subscribe(events);
		if !subscribed {
			tracing::warn!(domain = "engine", "lifecycle events unavailable; relying on the timer");
		}
		let interval = self.config.interval;
		let Some(timer) = self.ctx.toolkit.schedule_repeating(interval) else {
			tracing::error!(domain = "engine", ?interval, "timer scheduling failed");
			if subscribed {
				self.ctx.toolkit.unsubscribe();
			}
			self.ctx.rollback();
			return Err(EngineError::new(Step::Apply, ErrorKind::Scheduling));
		};

		let installed = Installed {
			overrides,
			interceptors: self.config.interceptors,
			window_level: self.config.window_level,
			debounce: self.config.debounce,
			timer,
			interval,
			subscribed,
		};
		report.pass = self.ctx.run_pass(&installed);
		self.installed = Some(installed);

		tracing::info!(
			domain = "engine",
			profiles = ?report.profiles,
			rewired = report.rewired,
			skipped = report.skipped,
			pass = %report.pass,
			"profiles installed",
		);
		Ok(report)
	}

	/// Backs the timer off after a quiet tick and snaps it back to the base
	/// period once a pass sees windows come, go or fail.
	fn adapt_interval(&mut self, report: &PassReport, tick: bool) {
		let Some(max) = self.config.max_interval else {
			return;
		};
		let Some(installed) = &mut self.installed else {
			return;
		};
		let base = self.config.interval;
		let next = if report.new_windows > 0 || report.gone > 0 || report.failures > 0 {
			base
		} else if tick {
			installed.interval.saturating_mul(2).min(max.max(base))
		} else {
			return;
		};
		if next == installed.interval {
			return;
		}

		let Some(timer) = self.ctx.toolkit.schedule_repeating(next) else {
			tracing::warn!(domain = "engine", interval = ?next, "timer rescheduling failed; period unchanged");
			return;
		};
		self.ctx.toolkit.cancel_timer(installed.timer);
		tracing::debug!(domain = "engine", from = ?installed.interval, to = ?next, "reinforcement period adapted");
		installed.timer = timer;
		installed.interval = next;
	}

	fn events(&self) -> EventMask {
		let mut events = EventMask::empty();
		if self.config.interceptors.contains(InterceptorSet::WINDOW) {
			events |= EventMask::WINDOW_EXPOSED
				| EventMask::WINDOW_BECAME_KEY
				| EventMask::WINDOW_BECAME_MAIN
				| EventMask::WINDOW_CREATED;
		}
		if self.config.interceptors.contains(InterceptorSet::APPLICATION) {
			events |= EventMask::APPLICATION_ACTIVATED;
		}
		events
	}
}

/// Checks merged overrides against the property catalogue.
///
/// Unknown types and property names are logged and counted. A value of the
/// wrong kind for a known property fails the install.
fn validate(overrides: &MergedOverrides) -> Result<usize> {
	let mut skipped = 0;
	for (class, properties) in overrides.as_map() {
		let target = match class.as_str() {
			WINDOW_CLASS => TargetKind::Window,
			APPLICATION_CLASS => TargetKind::Application,
			_ => {
				tracing::warn!(domain = "engine", class = class.as_str(), "no interceptor for type; overrides ignored");
				skipped += properties.len();
				continue;
			}
		};
		for (name, value) in properties {
			match Property::from_name(name) {
				Some(property) if property.target() == target => {
					if !value.matches_kind(property.kind()) {
						tracing::error!(
							domain = "engine",
							class = class.as_str(),
							property = name.as_str(),
							expected = %property.kind(),
							found = %value.kind(),
							"override has the wrong kind",
						);
						return Err(EngineError::new(
							Step::Resolution,
							ErrorKind::InvalidValue {
								class: class.clone(),
								property: name.clone(),
								expected: property.kind(),
								found: value.kind(),
							},
						));
					}
				}
				_ => {
					tracing::warn!(
						domain = "engine",
						class = class.as_str(),
						property = name.as_str(),
						"unknown property; ignored",
					);
					skipped += 1;
				}
			}
		}
	}
	Ok(skipped)
}
