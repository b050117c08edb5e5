use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{ProfileError, PropertyValue, Result};

#[cfg(test)]
mod tests;

/// Property name to forced value, for one target type.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Target type name to its property overrides.
pub type OverrideMap = BTreeMap<String, PropertyMap>;

/// A named, immutable bundle of property overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
	name: String,
	description: String,
	overrides: OverrideMap,
	dependencies: Vec<String>,
	direct_control: bool,
}

impl Profile {
	pub fn builder(name: impl Into<String>) -> ProfileBuilder {
		ProfileBuilder {
			profile: Profile {
				name: name.into(),
				description: String::new(),
				overrides: OverrideMap::new(),
				dependencies: Vec::new(),
				direct_control: false,
			},
		}
	}

	/// Parses a profile from a TOML document.
	///
	/// ```toml
	/// name = "overlay"
	/// description = "Floating, capture-excluded overlay"
	/// depends = ["core"]
	/// direct_control = true
	///
	/// [overrides.NSWindow]
	/// level = 3
	/// hasShadow = false
	/// sharingType = { name = "none", raw = 0 }
	/// ```
	pub fn from_toml(source: &str) -> Result<Self> {
		let doc: ProfileDocument = toml::from_str(source)?;
		let mut builder = Profile::builder(doc.name)
			.description(doc.description)
			.direct_control(doc.direct_control);
		for dependency in doc.depends {
			builder = builder.depends_on(dependency);
		}
		for (class, properties) in doc.overrides {
			for (property, value) in properties {
				builder = builder.set(class.as_str(), property, value);
			}
		}
		builder.build()
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn description(&self) -> &str {
		&self.description
	}

	pub fn overrides(&self) -> &OverrideMap {
		&self.overrides
	}

	/// Forced value for `property` on `class`, from this profile alone.
	pub fn get(&self, class: &str, property: &str) -> Option<&PropertyValue> {
		self.overrides.get(class)?.get(property)
	}

	/// Dependencies in declaration order.
	pub fn dependencies(&self) -> &[String] {
		&self.dependencies
	}

	/// True if the profile asks for direct window-server calls on top of
	/// the declarative overrides.
	pub fn requests_direct_control(&self) -> bool {
		self.direct_control
	}

	/// Number of `(type, property)` pairs this profile sets.
	pub fn override_count(&self) -> usize {
		self.overrides.values().map(BTreeMap::len).sum()
	}
}

/// Builder for [`Profile`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
	profile: Profile,
}

impl ProfileBuilder {
	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.profile.description = description.into();
		self
	}

	/// Adds a dependency. Repeated names are kept once.
	pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
		let dependency = dependency.into();
		if !self.profile.dependencies.contains(&dependency) {
			self.profile.dependencies.push(dependency);
		}
		self
	}

	/// Forces `property` on `class` to `value`. A later call for the same
	/// pair replaces the earlier value.
	pub fn set(mut self, class: impl Into<String>, property: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
		self.profile
			.overrides
			.entry(class.into())
			.or_default()
			.insert(property.into(), value.into());
		self
	}

	pub fn direct_control(mut self, enabled: bool) -> Self {
		self.profile.direct_control = enabled;
		self
	}

	pub fn build(self) -> Result<Profile> {
		let profile = self.profile;
		if profile.name.trim().is_empty() {
			return Err(ProfileError::EmptyName);
		}
		if profile.dependencies.iter().any(|d| *d == profile.name) {
			return Err(ProfileError::SelfDependency(profile.name));
		}
		Ok(profile)
	}

	/// Skips validation; for profiles whose shape is fixed in code.
	pub(crate) fn finish(self) -> Profile {
		self.profile
	}
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileDocument {
	name: String,
	#[serde(default)]
	description: String,
	#[serde(default, alias = "dependencies")]
	depends: Vec<String>,
	#[serde(default)]
	direct_control: bool,
	#[serde(default)]
	overrides: OverrideMap,
}
