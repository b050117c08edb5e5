use std::sync::Arc;

use crate::{OverrideMap, Profile, PropertyMap, PropertyValue};

/// Final type → property → value mapping of an applied profile list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedOverrides {
	map: OverrideMap,
	applied: Vec<String>,
	direct_control: bool,
}

impl MergedOverrides {
	/// Folds `profiles` in order; a later entry for the same
	/// `(type, property)` pair replaces an earlier one.
	pub fn from_profiles<'a>(profiles: impl IntoIterator<Item = &'a Arc<Profile>>) -> Self {
		let mut merged = Self::default();
		for profile in profiles {
			for (class, properties) in profile.overrides() {
				let target = merged.map.entry(class.clone()).or_default();
				for (property, value) in properties {
					if let Some(previous) = target.insert(property.clone(), value.clone())
						&& previous != *value
					{
						tracing::debug!(
							domain = "profiles",
							profile = profile.name(),
							class = class.as_str(),
							property = property.as_str(),
							%previous,
							%value,
							"override replaced",
						);
					}
				}
			}
			merged.direct_control |= profile.requests_direct_control();
			merged.applied.push(profile.name().to_string());
		}
		merged
	}

	/// Layers one value on top of the merged result and returns the value it
	/// replaced.
	pub fn insert(
		&mut self,
		class: impl Into<String>,
		property: impl Into<String>,
		value: PropertyValue,
	) -> Option<PropertyValue> {
		self.map.entry(class.into()).or_default().insert(property.into(), value)
	}

	pub fn get(&self, class: &str, property: &str) -> Option<&PropertyValue> {
		self.map.get(class)?.get(property)
	}

	/// Overrides for one target type.
	pub fn properties(&self, class: &str) -> Option<&PropertyMap> {
		self.map.get(class)
	}

	pub fn classes(&self) -> impl Iterator<Item = &str> {
		self.map.keys().map(String::as_str)
	}

	pub fn as_map(&self) -> &OverrideMap {
		&self.map
	}

	/// Profile names in application order.
	pub fn applied(&self) -> &[String] {
		&self.applied
	}

	/// True if any applied profile asked for direct window-server calls.
	pub fn requests_direct_control(&self) -> bool {
		self.direct_control
	}

	pub fn is_empty(&self) -> bool {
		self.map.values().all(PropertyMap::is_empty)
	}

	pub fn len(&self) -> usize {
		self.map.values().map(PropertyMap::len).sum()
	}
}
