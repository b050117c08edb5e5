use cloak_capability::{CapabilityResolver, SystemLibrary};
use cloak_profiles::{MergedOverrides, Profile};
use std::sync::Arc;

use super::*;
use crate::property::{APPLICATION_CLASS, PropertySet, WINDOW_CLASS};
use crate::toolkit::Target;
use crate::toolkit::testing::TestToolkit;

fn context(toolkit: TestToolkit) -> EngineContext<TestToolkit> {
	EngineContext::new(toolkit, CapabilityResolver::new(SystemLibrary::unavailable()))
}

fn overrides(profile: Profile) -> MergedOverrides {
	MergedOverrides::from_profiles(&[Arc::new(profile)])
}

#[test]
fn test_selection_is_ordered_by_priority() {
	assert_eq!(
		ObjectInterceptor::selected(InterceptorSet::all()),
		[ObjectInterceptor::Window, ObjectInterceptor::Application]
	);
	assert_eq!(
		ObjectInterceptor::selected(InterceptorSet::APPLICATION),
		[ObjectInterceptor::Application]
	);
	assert!(ObjectInterceptor::selected(InterceptorSet::empty()).is_empty());
}

#[test]
fn test_install_rewires_getter_and_setter() {
	let mut toolkit = TestToolkit::new();
	let window = Target::Window(toolkit.open_window(WINDOW_CLASS));
	let mut ctx = context(toolkit);
	let merged = overrides(
		Profile::builder("alpha")
			.set(WINDOW_CLASS, "alphaValue", 0.5)
			.build()
			.unwrap(),
	);
	let mut report = ApplyReport::default();

	ObjectInterceptor::Window.install(&mut ctx, &merged, &mut report).unwrap();
	assert_eq!(report.rewired, 2);
	assert!(ctx.interceptor().is_rewired(WINDOW_CLASS, "alphaValue"));
	assert!(ctx.interceptor().is_rewired(WINDOW_CLASS, "setAlphaValue:"));

	ctx.toolkit_mut()
		.set(window, Property::AlphaValue, PropertyValue::Float(1.0))
		.unwrap();
	assert_eq!(ctx.toolkit().stored(window, Property::AlphaValue), Some(PropertyValue::Float(0.5)));
	assert_eq!(ctx.toolkit().get(window, Property::AlphaValue), Some(PropertyValue::Float(0.5)));
}

#[test]
fn test_install_skips_properties_the_type_lacks() {
	let mut toolkit = TestToolkit::new();
	toolkit.define_class(APPLICATION_CLASS, None, PropertySet::ACTIVATION_POLICY);
	let mut ctx = context(toolkit);
	let merged = overrides(
		Profile::builder("app")
			.set(APPLICATION_CLASS, "activationPolicy", PropertyValue::enumeration("accessory", 1))
			.set(APPLICATION_CLASS, "presentationOptions", 5)
			.build()
			.unwrap(),
	);
	let mut report = ApplyReport::default();

	ObjectInterceptor::Application.install(&mut ctx, &merged, &mut report).unwrap();
	assert_eq!(report.rewired, 2);
	assert_eq!(report.skipped, 1);
	assert!(!ctx.interceptor().is_rewired(APPLICATION_CLASS, "presentationOptions"));
}

#[test]
fn test_install_without_overrides_touches_nothing() {
	let mut ctx = context(TestToolkit::new());
	let mut report = ApplyReport::default();
	ObjectInterceptor::Application
		.install(&mut ctx, &MergedOverrides::default(), &mut report)
		.unwrap();
	assert_eq!(report, ApplyReport::default());
	assert!(ctx.interceptor().is_empty());
	assert_eq!(ctx.toolkit().support_queries(), 0);
}

#[test]
fn test_release_then_force_again_uses_the_new_value() {
	let mut toolkit = TestToolkit::new();
	let window = Target::Window(toolkit.open_window(WINDOW_CLASS));
	let mut ctx = context(toolkit);

	assert_eq!(ctx.intercept_property(WINDOW_CLASS, Property::Level, &PropertyValue::Int(3)).unwrap(), 2);
	assert_eq!(ctx.intercept_property(WINDOW_CLASS, Property::Level, &PropertyValue::Int(3)).unwrap(), 0);
	ctx.release_property(WINDOW_CLASS, Property::Level).unwrap();
	assert_eq!(ctx.toolkit().get(window, Property::Level), Some(PropertyValue::Int(0)));

	ctx.intercept_property(WINDOW_CLASS, Property::Level, &PropertyValue::Int(25)).unwrap();
	assert_eq!(ctx.toolkit().get(window, Property::Level), Some(PropertyValue::Int(25)));
	ctx.toolkit_mut().set(window, Property::Level, PropertyValue::Int(0)).unwrap();
	assert_eq!(ctx.toolkit().stored(window, Property::Level), Some(PropertyValue::Int(25)));
}
