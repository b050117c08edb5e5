use cloak_capability::SystemLibrary;
use cloak_dispatch::DispatchHost;
use cloak_profiles::{Profile, ProfileError, builtins};
use pretty_assertions::assert_eq;

use super::*;
use crate::property::PropertySet;
use crate::toolkit::testing::{TestToolkit, run_until_idle};
use crate::toolkit::{Target, WindowHandle};

fn engine_with(toolkit: TestToolkit, registry: ProfileRegistry, config: EngineConfig) -> Engine<TestToolkit> {
	Engine::new(
		toolkit,
		CapabilityResolver::new(SystemLibrary::unavailable()),
		Arc::new(registry),
		config,
	)
}

fn engine(toolkit: TestToolkit) -> Engine<TestToolkit> {
	engine_with(toolkit, ProfileRegistry::with_builtins(), EngineConfig::default())
}

fn sharing_none() -> PropertyValue {
	PropertyValue::enumeration("none", 0)
}

fn install_err(engine: &mut Engine<TestToolkit>, names: &[&str]) -> EngineError {
	match engine.install(names) {
		Ok(report) => panic!("install succeeded: {report:?}"),
		Err(err) => err,
	}
}

fn window(engine: &Engine<TestToolkit>, handle: WindowHandle, property: Property) -> Option<PropertyValue> {
	engine.toolkit().get(Target::Window(handle), property)
}

#[test]
fn test_core_install_rewires_and_applies() {
	let mut toolkit = TestToolkit::new();
	let first = toolkit.open_window(WINDOW_CLASS);
	let second = toolkit.open_window("NSPanel");
	let mut engine = engine(toolkit);

	let report = engine.install(&[builtins::CORE]).unwrap();
	assert_eq!(report.profiles, ["invisible", "core"]);
	assert_eq!(report.rewired, 8);
	assert_eq!(report.skipped, 0);
	assert!(!report.direct_control);
	assert_eq!(report.pass.windows, 2);
	assert_eq!(report.pass.new_windows, 2);
	assert_eq!(report.pass.failures, 0);

	for handle in [first, second] {
		assert_eq!(window(&engine, handle, Property::SharingType), Some(sharing_none()));
		assert_eq!(window(&engine, handle, Property::HasShadow), Some(PropertyValue::Bool(false)));
		assert_eq!(
			engine.toolkit().stored(Target::Window(handle), Property::SharingType),
			Some(sharing_none())
		);
	}
	assert_eq!(
		engine
			.toolkit()
			.get(Target::Application, Property::ActivationPolicy)
			.and_then(|v| v.as_int()),
		Some(1)
	);
	assert!(engine.context().protected().contains(first));
	assert_eq!(engine.toolkit().timers().count(), 1);
	assert_eq!(engine.toolkit().subscribed(), Some(EventMask::all()));
}

#[test]
fn test_second_install_is_a_noop() {
	let mut engine = engine(TestToolkit::new());
	engine.install(&[builtins::CORE]).unwrap();
	let rewired = engine.context().interceptor().rewired().count();

	let again = engine.install(&[builtins::CLICK_THROUGH]).unwrap();
	assert_eq!(again.rewired, 0);
	assert_eq!(again.profiles, ["invisible", "core"]);
	assert_eq!(engine.context().interceptor().rewired().count(), rewired);
	assert_eq!(engine.toolkit().timers().count(), 1);
}

#[test]
fn test_uninstall_restores_original_behavior() {
	let mut toolkit = TestToolkit::new();
	let handle = toolkit.open_window(WINDOW_CLASS);
	let before = toolkit.table().clone();
	let mut engine = engine(toolkit);

	engine.install(&[builtins::UNFOCUSABLE]).unwrap();
	assert_eq!(window(&engine, handle, Property::CanBecomeKey), Some(PropertyValue::Bool(false)));

	engine.uninstall().unwrap();
	assert_eq!(window(&engine, handle, Property::CanBecomeKey), Some(PropertyValue::Bool(true)));
	assert!(engine.context().interceptor().is_empty());
	assert!(engine.context().protected().is_empty());
	assert_eq!(engine.toolkit().timers().count(), 0);
	assert_eq!(engine.toolkit().subscribed(), None);
	for operation in ["canBecomeKeyWindow", "canBecomeMainWindow", "sharingType", "setSharingType:"] {
		assert_eq!(
			engine.toolkit().table().implementation(WINDOW_CLASS, operation),
			before.implementation(WINDOW_CLASS, operation),
			"{operation}"
		);
	}
}

#[test]
fn test_uninstall_before_install_is_a_noop() {
	let mut engine = engine(TestToolkit::new());
	engine.uninstall().unwrap();
	assert!(!engine.is_installed());
	assert_eq!(engine.handle(Event::ApplicationActivated), None);
}

#[test]
fn test_tick_reapplies_after_external_reset() {
	let mut toolkit = TestToolkit::new();
	let handle = toolkit.open_window(WINDOW_CLASS);
	let mut engine = engine(toolkit);
	engine.install(&[builtins::INVISIBLE]).unwrap();

	let target = Target::Window(handle);
	engine
		.toolkit_mut()
		.set_stored(target, Property::SharingType, PropertyValue::enumeration("read-write", 2));
	engine.toolkit_mut().fire_timers();
	let pass = run_until_idle(&mut engine);

	assert_eq!(pass.windows, 1);
	assert_eq!(pass.new_windows, 0);
	assert_eq!(engine.toolkit().stored(target, Property::SharingType), Some(sharing_none()));
}

#[test]
fn test_new_window_is_protected_on_creation() {
	let mut engine = engine(TestToolkit::new());
	engine.install(&[builtins::INVISIBLE]).unwrap();

	let handle = engine.toolkit_mut().open_window("NSPanel");
	let pass = run_until_idle(&mut engine);

	assert_eq!(pass.new_windows, 1);
	assert_eq!(pass.applied, 2);
	assert_eq!(
		engine.toolkit().stored(Target::Window(handle), Property::SharingType),
		Some(sharing_none())
	);
	assert!(engine.context().protected().contains(handle));
}

#[test]
fn test_window_gone_before_processing_is_skipped() {
	let mut toolkit = TestToolkit::new();
	let handle = toolkit.open_window(WINDOW_CLASS);
	let mut engine = engine(toolkit);
	engine.install(&[builtins::INVISIBLE]).unwrap();

	engine.toolkit_mut().close_window(handle);
	let pass = engine.handle(Event::WindowExposed(handle)).unwrap();
	assert_eq!(pass.gone, 1);
	assert_eq!(pass.windows, 0);
	assert_eq!(pass.failures, 0);
}

#[test]
fn test_unexposed_property_is_skipped_without_failure() {
	let mut toolkit = TestToolkit::new();
	toolkit.define_class("NSMinimalPanel", Some(WINDOW_CLASS), PropertySet::WINDOW - PropertySet::SHARING_TYPE);
	let minimal = toolkit.open_window("NSMinimalPanel");
	let regular = toolkit.open_window(WINDOW_CLASS);
	let mut engine = engine(toolkit);

	let report = engine.install(&[builtins::INVISIBLE]).unwrap();
	assert_eq!(report.pass.windows, 2);
	assert_eq!(report.pass.unsupported, 1);
	assert_eq!(report.pass.failures, 0);
	assert_eq!(report.pass.applied, 3);
	assert_eq!(
		engine.toolkit().stored(Target::Window(minimal), Property::HasShadow),
		Some(PropertyValue::Bool(false))
	);
	assert_eq!(
		engine.toolkit().stored(Target::Window(regular), Property::SharingType),
		Some(sharing_none())
	);
}

#[test]
fn test_rejected_write_does_not_stop_the_pass() {
	let mut toolkit = TestToolkit::new();
	let stubborn = toolkit.open_window(WINDOW_CLASS);
	let other = toolkit.open_window(WINDOW_CLASS);
	toolkit.reject_writes(stubborn, Property::HasShadow);
	let mut engine = engine(toolkit);

	let report = engine.install(&[builtins::INVISIBLE]).unwrap();
	assert_eq!(report.pass.failures, 1);
	assert_eq!(report.pass.windows, 2);
	assert_eq!(
		engine.toolkit().stored(Target::Window(stubborn), Property::SharingType),
		Some(sharing_none())
	);
	assert_eq!(
		engine.toolkit().stored(Target::Window(other), Property::HasShadow),
		Some(PropertyValue::Bool(false))
	);
}

#[test]
fn test_unknown_profile_fails_resolution_without_rewiring() {
	let mut engine = engine(TestToolkit::new());
	let err = install_err(&mut engine, &["core", "ghost"]);
	assert_eq!(err.step(), Step::Resolution);
	assert!(matches!(
		err.kind(),
		ErrorKind::Profile(ProfileError::UnknownProfile { name, .. }) if name == "ghost"
	));
	assert!(engine.context().interceptor().is_empty());
	assert!(!engine.is_installed());
	assert_eq!(engine.toolkit().timers().count(), 0);
}

#[test]
fn test_cycle_fails_resolution() {
	let registry = ProfileRegistry::new();
	registry
		.register(Profile::builder("a").depends_on("b").build().unwrap())
		.unwrap();
	registry
		.register(Profile::builder("b").depends_on("a").build().unwrap())
		.unwrap();
	let mut engine = engine_with(TestToolkit::new(), registry, EngineConfig::default());

	let err = install_err(&mut engine, &["a"]);
	assert_eq!(err.step(), Step::Resolution);
	assert!(matches!(err.kind(), ErrorKind::Profile(ProfileError::Cycle { .. })));
	assert!(engine.context().interceptor().is_empty());
}

#[test]
fn test_wrong_value_kind_fails_resolution() {
	let registry = ProfileRegistry::new();
	registry
		.register(
			Profile::builder("odd")
				.set(WINDOW_CLASS, "hasShadow", PropertyValue::Int(3))
				.build()
				.unwrap(),
		)
		.unwrap();
	let mut engine = engine_with(TestToolkit::new(), registry, EngineConfig::default());

	let err = install_err(&mut engine, &["odd"]);
	assert_eq!(err.step(), Step::Resolution);
	assert!(matches!(err.kind(), ErrorKind::InvalidValue { property, .. } if property == "hasShadow"));
	assert!(err.to_string().starts_with("resolution failed:"), "{err}");
}

#[test]
fn test_unknown_names_are_skipped() {
	let registry = ProfileRegistry::new();
	registry
		.register(
			Profile::builder("mixed")
				.set(WINDOW_CLASS, "hasShadow", false)
				.set(WINDOW_CLASS, "frameAutosaveName", "main")
				.set("NSMenu", "hidden", true)
				.set(APPLICATION_CLASS, "level", 3)
				.build()
				.unwrap(),
		)
		.unwrap();
	let mut engine = engine_with(TestToolkit::new(), registry, EngineConfig::default());

	let report = engine.install(&["mixed"]).unwrap();
	assert_eq!(report.skipped, 3);
	assert_eq!(report.rewired, 2);
}

#[test]
fn test_later_profile_wins_conflicts() {
	let registry = ProfileRegistry::with_builtins();
	registry
		.register(
			Profile::builder("shadowed")
				.set(WINDOW_CLASS, "hasShadow", true)
				.build()
				.unwrap(),
		)
		.unwrap();
	let mut toolkit = TestToolkit::new();
	let handle = toolkit.open_window(WINDOW_CLASS);
	let mut engine = engine_with(toolkit, registry, EngineConfig::default());

	engine.install(&[builtins::INVISIBLE, "shadowed"]).unwrap();
	assert_eq!(window(&engine, handle, Property::HasShadow), Some(PropertyValue::Bool(true)));
	assert_eq!(window(&engine, handle, Property::SharingType), Some(sharing_none()));
}

#[test]
fn test_timer_failure_rolls_back() {
	let mut toolkit = TestToolkit::new();
	toolkit.refuse_timers(true);
	let before = toolkit.table().clone();
	let mut engine = engine(toolkit);

	let err = install_err(&mut engine, &[builtins::CORE]);
	assert_eq!(err.step(), Step::Apply);
	assert!(matches!(err.kind(), ErrorKind::Scheduling));
	assert!(engine.context().interceptor().is_empty());
	assert_eq!(engine.toolkit().subscribed(), None);
	assert_eq!(
		engine.toolkit().table().implementation(WINDOW_CLASS, "sharingType"),
		before.implementation(WINDOW_CLASS, "sharingType")
	);
}

#[test]
fn test_refused_subscription_falls_back_to_timer() {
	let mut toolkit = TestToolkit::new();
	toolkit.refuse_subscription(true);
	let mut engine = engine(toolkit);
	engine.install(&[builtins::INVISIBLE]).unwrap();

	let handle = engine.toolkit_mut().open_window(WINDOW_CLASS);
	assert_eq!(engine.toolkit().pending(), 0);
	engine.toolkit_mut().fire_timers();
	let pass = run_until_idle(&mut engine);
	assert_eq!(pass.new_windows, 1);
	assert!(engine.context().protected().contains(handle));
}

#[test]
fn test_apply_profiles_replaces_the_installed_set() {
	let mut toolkit = TestToolkit::new();
	let handle = toolkit.open_window(WINDOW_CLASS);
	let mut engine = engine(toolkit);
	engine.install(&[builtins::INVISIBLE]).unwrap();

	let report = engine.apply_profiles(&[builtins::UNFOCUSABLE]).unwrap();
	assert_eq!(report.profiles, ["unfocusable"]);
	assert_eq!(window(&engine, handle, Property::SharingType), Some(PropertyValue::enumeration("none", 0)));
	assert_eq!(window(&engine, handle, Property::CanBecomeKey), Some(PropertyValue::Bool(false)));
	assert!(!engine.context().interceptor().is_rewired(WINDOW_CLASS, "sharingType"));
	assert_eq!(engine.toolkit().timers().count(), 1);
}

#[test]
fn test_stale_tick_is_ignored() {
	let mut engine = engine(TestToolkit::new());
	engine.install(&[builtins::INVISIBLE]).unwrap();
	let (old, _) = engine.toolkit().timers().next().unwrap();
	engine.apply_profiles(&[builtins::INVISIBLE]).unwrap();
	assert_eq!(engine.handle(Event::Tick(old)), None);
}

#[test]
fn test_window_interceptor_only() {
	let config = EngineConfig::default().with_interceptors(InterceptorSet::WINDOW);
	let mut engine = engine_with(TestToolkit::new(), ProfileRegistry::with_builtins(), config);

	let report = engine.install(&[builtins::CORE]).unwrap();
	assert_eq!(report.rewired, 4);
	assert!(!engine.context().interceptor().is_rewired(APPLICATION_CLASS, "activationPolicy"));
	assert_eq!(
		engine.toolkit().subscribed(),
		Some(EventMask::all() - EventMask::APPLICATION_ACTIVATED)
	);
	assert_eq!(engine.handle(Event::ApplicationActivated), Some(PassReport::default()));
}

#[test]
fn test_supported_properties_are_queried_once_per_type() {
	let mut toolkit = TestToolkit::new();
	toolkit.open_window(WINDOW_CLASS);
	toolkit.open_window("NSPanel");
	let mut engine = engine(toolkit);
	engine.install(&[builtins::CORE]).unwrap();
	let queries = engine.toolkit().support_queries();

	engine.toolkit_mut().fire_timers();
	run_until_idle(&mut engine);
	engine.reinforce();
	assert_eq!(engine.toolkit().support_queries(), queries);
	assert_eq!(queries, 3);
}

#[test]
fn test_direct_control_without_window_server_falls_back() {
	let mut toolkit = TestToolkit::new();
	let handle = toolkit.open_window(WINDOW_CLASS);
	let mut engine = engine(toolkit);

	let report = engine.install(&[builtins::DIRECT_CONTROL]).unwrap();
	assert!(report.direct_control);
	assert_eq!(report.pass.direct, 0);
	assert_eq!(report.pass.direct_unavailable, 2);
	assert_eq!(window(&engine, handle, Property::Level), Some(PropertyValue::Int(3)));
	assert_eq!(
		engine.toolkit().stored(Target::Window(handle), Property::SharingType),
		Some(sharing_none())
	);
}

#[test]
fn test_window_interaction_toggle_in_direct_mode() {
	let mut toolkit = TestToolkit::new();
	let handle = toolkit.open_window(WINDOW_CLASS);
	let mut engine = engine(toolkit);
	engine.install(&[builtins::DIRECT_CONTROL]).unwrap();
	assert_eq!(window(&engine, handle, Property::CanBecomeKey), Some(PropertyValue::Bool(true)));

	engine.set_window_interaction(false).unwrap();
	assert_eq!(window(&engine, handle, Property::CanBecomeKey), Some(PropertyValue::Bool(false)));
	assert_eq!(window(&engine, handle, Property::CanBecomeMain), Some(PropertyValue::Bool(false)));

	engine.set_window_interaction(true).unwrap();
	assert_eq!(window(&engine, handle, Property::CanBecomeKey), Some(PropertyValue::Bool(true)));
	assert_eq!(
		engine.overrides().and_then(|o| o.get(WINDOW_CLASS, "canBecomeKeyWindow")),
		Some(&PropertyValue::Bool(true))
	);

	engine.uninstall().unwrap();
	assert!(engine.context().interceptor().is_empty());
}

#[test]
fn test_window_interaction_is_stored_outside_direct_mode() {
	let mut toolkit = TestToolkit::new();
	let handle = toolkit.open_window(WINDOW_CLASS);
	let mut engine = engine(toolkit);
	engine.install(&[builtins::INVISIBLE]).unwrap();

	engine.set_window_interaction(false).unwrap();
	assert_eq!(engine.window_interaction(), Some(false));
	assert_eq!(window(&engine, handle, Property::CanBecomeKey), Some(PropertyValue::Bool(true)));

	engine.apply_profiles(&[builtins::DIRECT_CONTROL]).unwrap();
	assert_eq!(window(&engine, handle, Property::CanBecomeKey), Some(PropertyValue::Bool(false)));
}

#[test]
fn test_initialize_installs_configured_profiles() {
	let mut toolkit = TestToolkit::new();
	let handle = toolkit.open_window(WINDOW_CLASS);
	let config = EngineConfig::default().with_profiles(["stealth", "invisible"]);
	let engine = match Engine::initialize(
		toolkit,
		CapabilityResolver::new(SystemLibrary::unavailable()),
		Arc::new(ProfileRegistry::with_builtins()),
		config,
	) {
		Ok(engine) => engine,
		Err(err) => panic!("initialize failed: {err}"),
	};

	assert!(engine.is_installed());
	assert_eq!(
		engine.overrides().map(|o| o.applied().to_vec()),
		Some(vec!["stealth".to_string(), "invisible".to_string()])
	);
	assert_eq!(window(&engine, handle, Property::SharingType), Some(sharing_none()));
	assert!(!engine.context().resolver().is_available());
}

#[test]
fn test_bad_profile_list_keeps_current_protection() {
	let registry = ProfileRegistry::with_builtins();
	registry
		.register(
			Profile::builder("odd")
				.set(WINDOW_CLASS, "hasShadow", PropertyValue::Int(3))
				.build()
				.unwrap(),
		)
		.unwrap();
	let mut toolkit = TestToolkit::new();
	let handle = toolkit.open_window(WINDOW_CLASS);
	let mut engine = engine_with(toolkit, registry, EngineConfig::default());
	engine.install(&[builtins::CORE]).unwrap();
	let rewired = engine.context().interceptor().rewired().count();

	for names in [&["no-such-profile"][..], &[builtins::CORE, "odd"][..]] {
		let err = match engine.apply_profiles(names) {
			Ok(report) => panic!("apply_profiles succeeded: {report:?}"),
			Err(err) => err,
		};
		assert_eq!(err.step(), Step::Resolution);
	}

	assert!(engine.is_installed());
	assert_eq!(engine.context().interceptor().rewired().count(), rewired);
	assert_eq!(engine.toolkit().timers().count(), 1);
	assert_eq!(window(&engine, handle, Property::SharingType), Some(sharing_none()));

	let target = Target::Window(handle);
	engine
		.toolkit_mut()
		.set_stored(target, Property::SharingType, PropertyValue::enumeration("read-write", 2));
	engine.toolkit_mut().fire_timers();
	run_until_idle(&mut engine);
	assert_eq!(engine.toolkit().stored(target, Property::SharingType), Some(sharing_none()));
}

#[test]
fn test_debounce_skips_recently_written_windows() {
	let mut toolkit = TestToolkit::new();
	let handle = toolkit.open_window(WINDOW_CLASS);
	let config = EngineConfig::default().with_debounce(Duration::from_millis(500));
	let mut engine = engine_with(toolkit, ProfileRegistry::with_builtins(), config);
	engine.install(&[builtins::INVISIBLE]).unwrap();

	let target = Target::Window(handle);
	engine
		.toolkit_mut()
		.set_stored(target, Property::HasShadow, PropertyValue::Bool(true));
	assert!(engine.toolkit_mut().post(Event::WindowBecameKey(handle)));
	let pass = run_until_idle(&mut engine);
	assert_eq!(pass.debounced, 1);
	assert_eq!(pass.windows, 0);
	assert_eq!(engine.toolkit().stored(target, Property::HasShadow), Some(PropertyValue::Bool(true)));

	engine.toolkit_mut().advance(Duration::from_millis(500));
	engine.toolkit_mut().fire_timers();
	let pass = run_until_idle(&mut engine);
	assert_eq!(pass.debounced, 0);
	assert_eq!(pass.windows, 1);
	assert_eq!(engine.toolkit().stored(target, Property::HasShadow), Some(PropertyValue::Bool(false)));

	// Never written, so never held back.
	let fresh = engine.toolkit_mut().open_window(WINDOW_CLASS);
	let pass = run_until_idle(&mut engine);
	assert_eq!(pass.new_windows, 1);
	assert_eq!(pass.debounced, 0);
	assert_eq!(window(&engine, fresh, Property::HasShadow), Some(PropertyValue::Bool(false)));
}

#[test]
fn test_adaptive_interval_backs_off_and_resets() {
	let mut toolkit = TestToolkit::new();
	toolkit.open_window(WINDOW_CLASS);
	let config = EngineConfig::default().with_adaptive_interval(Duration::from_secs(4));
	let mut engine = engine_with(toolkit, ProfileRegistry::with_builtins(), config);
	engine.install(&[builtins::INVISIBLE]).unwrap();
	assert_eq!(engine.interval(), Some(Duration::from_secs(1)));

	for secs in [2, 4, 4] {
		engine.toolkit_mut().fire_timers();
		run_until_idle(&mut engine);
		let period = Duration::from_secs(secs);
		assert_eq!(engine.interval(), Some(period));
		let intervals: Vec<Duration> = engine.toolkit().timers().map(|(_, interval)| interval).collect();
		assert_eq!(intervals, [period]);
	}

	engine.toolkit_mut().open_window(WINDOW_CLASS);
	run_until_idle(&mut engine);
	assert_eq!(engine.interval(), Some(Duration::from_secs(1)));
	assert_eq!(engine.toolkit().timers().count(), 1);
}

#[test]
fn test_fixed_interval_without_ceiling() {
	let mut engine = engine(TestToolkit::new());
	engine.install(&[builtins::INVISIBLE]).unwrap();
	let before: Vec<TimerId> = engine.toolkit().timers().map(|(id, _)| id).collect();

	for _ in 0..3 {
		engine.toolkit_mut().fire_timers();
		run_until_idle(&mut engine);
	}
	assert_eq!(engine.interval(), Some(Duration::from_secs(1)));
	let after: Vec<TimerId> = engine.toolkit().timers().map(|(id, _)| id).collect();
	assert_eq!(after, before);
}

#[test]
fn test_failed_interaction_toggle_keeps_previous_forcing() {
	let mut toolkit = TestToolkit::new();
	let handle = toolkit.open_window(WINDOW_CLASS);
	let mut engine = engine(toolkit);
	engine.set_window_interaction(false).unwrap();
	engine.install(&[builtins::DIRECT_CONTROL]).unwrap();
	assert_eq!(window(&engine, handle, Property::CanBecomeKey), Some(PropertyValue::Bool(false)));

	engine.toolkit_mut().refuse_replacements(1);
	let err = match engine.set_window_interaction(true) {
		Ok(()) => panic!("toggle succeeded"),
		Err(err) => err,
	};
	assert_eq!(err.step(), Step::Rewire);
	assert!(matches!(err.kind(), ErrorKind::NoReplacement { .. }));

	assert_eq!(engine.window_interaction(), Some(false));
	assert!(engine.context().interceptor().is_rewired(WINDOW_CLASS, "canBecomeKeyWindow"));
	assert_eq!(window(&engine, handle, Property::CanBecomeKey), Some(PropertyValue::Bool(false)));
	assert_eq!(window(&engine, handle, Property::CanBecomeMain), Some(PropertyValue::Bool(false)));
	assert_eq!(
		engine.overrides().and_then(|o| o.get(WINDOW_CLASS, "canBecomeKeyWindow")),
		Some(&PropertyValue::Bool(false))
	);
}
