//! Lifecycle of an installed engine driven through the in-memory toolkit.

use std::sync::Arc;

use cloak_capability::{CapabilityResolver, SystemLibrary};
use cloak_engine::property::{APPLICATION_CLASS, Property, WINDOW_CLASS};
use cloak_engine::toolkit::testing::{TestToolkit, run_until_idle};
use cloak_engine::toolkit::{Event, Target};
use cloak_engine::{Engine, EngineConfig};
use cloak_profiles::{ProfileRegistry, PropertyValue, builtins};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn engine(toolkit: TestToolkit) -> Engine<TestToolkit> {
	Engine::new(
		toolkit,
		CapabilityResolver::new(SystemLibrary::unavailable()),
		Arc::new(ProfileRegistry::with_builtins()),
		EngineConfig::default(),
	)
}

fn sharing_none() -> PropertyValue {
	PropertyValue::enumeration("none", 0)
}

#[test]
fn test_windows_opened_after_install_are_protected() {
	let mut toolkit = TestToolkit::new();
	let early = toolkit.open_window(WINDOW_CLASS);
	let mut engine = engine(toolkit);
	// Creation events from before the install were never subscribed to.
	assert_eq!(engine.toolkit().pending(), 0);

	engine.install(&[builtins::CORE]).unwrap();
	assert!(engine.context().protected().contains(early));

	let late = engine.toolkit_mut().open_window("NSPanel");
	assert_eq!(engine.toolkit().pending(), 1);
	let report = run_until_idle(&mut engine);
	assert_eq!(report.new_windows, 1);
	assert!(engine.context().protected().contains(late));
	assert_eq!(
		engine.toolkit().stored(Target::Window(late), Property::SharingType),
		Some(sharing_none())
	);
	assert_eq!(engine.context().protected().len(), 2);
}

#[test]
fn test_closed_windows_drop_out_of_passes() {
	let mut toolkit = TestToolkit::new();
	let kept = toolkit.open_window(WINDOW_CLASS);
	let closed = toolkit.open_window(WINDOW_CLASS);
	let mut engine = engine(toolkit);
	engine.install(&[builtins::INVISIBLE]).unwrap();

	engine.toolkit_mut().close_window(closed);
	engine.toolkit_mut().fire_timers();
	let report = run_until_idle(&mut engine);
	assert_eq!(report.windows, 1);
	assert_eq!(report.new_windows, 0);
	assert_eq!(
		engine.toolkit().get(Target::Window(kept), Property::SharingType),
		Some(sharing_none())
	);
	assert_eq!(engine.toolkit().get(Target::Window(closed), Property::SharingType), None);
}

#[test]
fn test_uninstall_stops_events_and_restores_accessors() {
	let mut toolkit = TestToolkit::new();
	let window = toolkit.open_window(WINDOW_CLASS);
	let mut engine = engine(toolkit);
	engine.install(&[builtins::CORE]).unwrap();

	engine.uninstall().unwrap();
	assert!(!engine.is_installed());
	assert!(engine.context().interceptor().is_empty());
	assert!(engine.context().protected().is_empty());
	assert_eq!(engine.toolkit().subscribed(), None);
	assert_eq!(engine.toolkit().timers().count(), 0);

	engine.toolkit_mut().open_window(WINDOW_CLASS);
	engine.toolkit_mut().fire_timers();
	assert_eq!(engine.toolkit().pending(), 0);

	// Unforced writes reach the object again.
	let target = Target::Window(window);
	engine
		.toolkit_mut()
		.set(target, Property::HasShadow, PropertyValue::Bool(true))
		.unwrap();
	assert_eq!(engine.toolkit().get(target, Property::HasShadow), Some(PropertyValue::Bool(true)));
}

#[test]
fn test_application_activation_reapplies_application_overrides() {
	let mut engine = engine(TestToolkit::new());
	engine.install(&[builtins::STEALTH]).unwrap();

	engine.toolkit_mut().set_stored(
		Target::Application,
		Property::ActivationPolicy,
		PropertyValue::enumeration("regular", 0),
	);
	assert!(engine.toolkit_mut().post(Event::ApplicationActivated));
	let report = run_until_idle(&mut engine);
	assert_eq!(report.windows, 0);
	assert_eq!(report.applied, 1);
	assert_eq!(
		engine.toolkit().stored(Target::Application, Property::ActivationPolicy),
		Some(PropertyValue::enumeration("accessory", 1))
	);
	assert!(engine.context().interceptor().is_rewired(APPLICATION_CLASS, "activationPolicy"));
}

#[derive(Debug, Clone)]
enum Reset {
	Sharing(usize, i64),
	Shadow(usize, bool),
	Alpha(usize, f64),
}

fn arb_reset() -> impl Strategy<Value = Reset> {
	prop_oneof![
		(0..3usize, 0..3i64).prop_map(|(w, raw)| Reset::Sharing(w, raw)),
		(0..3usize, any::<bool>()).prop_map(|(w, on)| Reset::Shadow(w, on)),
		(0..3usize, 0.0..1.0f64).prop_map(|(w, alpha)| Reset::Alpha(w, alpha)),
	]
}

proptest! {
	/// Whatever the toolkit resets behind the engine's back, one tick puts
	/// every forced value back.
	#[test]
	fn prop_tick_restores_forced_values(resets in prop::collection::vec(arb_reset(), 0..24)) {
		let mut toolkit = TestToolkit::new();
		let windows: Vec<_> = (0..3).map(|_| toolkit.open_window(WINDOW_CLASS)).collect();
		let mut engine = engine(toolkit);
		engine.install(&[builtins::INVISIBLE]).unwrap();

		for reset in &resets {
			let (index, property, value) = match *reset {
				Reset::Sharing(w, raw) => (w, Property::SharingType, PropertyValue::enumeration("other", raw)),
				Reset::Shadow(w, on) => (w, Property::HasShadow, PropertyValue::Bool(on)),
				Reset::Alpha(w, alpha) => (w, Property::AlphaValue, PropertyValue::Float(alpha)),
			};
			engine.toolkit_mut().set_stored(Target::Window(windows[index]), property, value);
		}

		engine.toolkit_mut().fire_timers();
		let report = run_until_idle(&mut engine);
		prop_assert_eq!(report.windows, 3);
		prop_assert_eq!(report.failures, 0);

		for &window in &windows {
			let target = Target::Window(window);
			prop_assert_eq!(engine.toolkit().stored(target, Property::SharingType), Some(sharing_none()));
			prop_assert_eq!(engine.toolkit().stored(target, Property::HasShadow), Some(PropertyValue::Bool(false)));
			prop_assert_eq!(engine.toolkit().get(target, Property::SharingType), Some(sharing_none()));
		}
	}
}
