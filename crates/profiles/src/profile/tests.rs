use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_builder_collects_overrides() {
	let profile = Profile::builder("overlay")
		.description("floating overlay")
		.depends_on("core")
		.depends_on("core")
		.set("NSWindow", "level", 3)
		.set("NSWindow", "hasShadow", false)
		.set("NSWindow", "level", 5)
		.build()
		.unwrap();

	assert_eq!(profile.name(), "overlay");
	assert_eq!(profile.dependencies(), ["core"]);
	assert_eq!(profile.get("NSWindow", "level"), Some(&PropertyValue::Int(5)));
	assert_eq!(profile.override_count(), 2);
	assert!(!profile.requests_direct_control());
}

#[test]
fn test_builder_rejects_empty_name() {
	assert!(matches!(Profile::builder("  ").build(), Err(ProfileError::EmptyName)));
}

#[test]
fn test_builder_rejects_self_dependency() {
	let err = Profile::builder("loop").depends_on("loop").build().unwrap_err();
	assert!(matches!(err, ProfileError::SelfDependency(name) if name == "loop"));
}

#[test]
fn test_from_toml() {
	let profile = Profile::from_toml(
		r#"
		name = "overlay"
		description = "Floating, capture-excluded overlay"
		depends = ["core"]
		direct_control = true

		[overrides.NSWindow]
		level = 3
		alphaValue = 0.9
		hasShadow = false
		sharingType = { name = "none", raw = 0 }

		[overrides.NSApplication]
		activationPolicy = { name = "accessory", raw = 1 }
		"#,
	)
	.unwrap();

	assert_eq!(profile.dependencies(), ["core"]);
	assert!(profile.requests_direct_control());
	assert_eq!(profile.get("NSWindow", "level"), Some(&PropertyValue::Int(3)));
	assert_eq!(profile.get("NSWindow", "alphaValue"), Some(&PropertyValue::Float(0.9)));
	assert_eq!(profile.get("NSWindow", "hasShadow"), Some(&PropertyValue::Bool(false)));
	assert_eq!(
		profile.get("NSWindow", "sharingType"),
		Some(&PropertyValue::enumeration("none", 0))
	);
	assert_eq!(
		profile.get("NSApplication", "activationPolicy").and_then(PropertyValue::as_int),
		Some(1)
	);
}

#[test]
fn test_from_toml_validates() {
	assert!(matches!(
		Profile::from_toml("name = \"a\"\ndepends = [\"a\"]"),
		Err(ProfileError::SelfDependency(_))
	));
	assert!(matches!(Profile::from_toml("description = \"no name\""), Err(ProfileError::Parse(_))));
	assert!(matches!(
		Profile::from_toml("name = \"a\"\nunknown = 1"),
		Err(ProfileError::Parse(_))
	));
}

#[test]
fn test_value_kind_matching() {
	use crate::ValueKind;

	assert!(PropertyValue::Int(1).matches_kind(ValueKind::Enum));
	assert!(PropertyValue::Int(1).matches_kind(ValueKind::Float));
	assert!(PropertyValue::enumeration("none", 0).matches_kind(ValueKind::Int));
	assert!(!PropertyValue::Bool(true).matches_kind(ValueKind::Int));
	assert!(!PropertyValue::Float(1.0).matches_kind(ValueKind::Int));
	assert_eq!(PropertyValue::from("x").kind(), ValueKind::Str);
}
