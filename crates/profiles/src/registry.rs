use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap as HashMap;

use crate::{MergedOverrides, Profile, ProfileError, Result, builtins};


#[derive(Debug, Clone, Default)]
struct RegistrySnapshot {
	by_name: HashMap<Box<str>, Arc<Profile>>,
	/// Registration order.
	items: Vec<Arc<Profile>>,
}

/// Registry of named profiles.
///
/// Reads load an immutable snapshot and never block. Registration publishes
/// a new snapshot with compare-and-swap, so concurrent registrations cannot
/// lose each other's profiles.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
	snap: ArcSwap<RegistrySnapshot>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
	Visiting,
	Done,
}

impl ProfileRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry holding the built-in profiles.
	pub fn with_builtins() -> Self {
		let registry = Self::new();
		for profile in builtins::all() {
			if let Err(err) = registry.register(profile) {
				tracing::error!(domain = "profiles", error = %err, "built-in profile rejected");
			}
		}
		registry
	}

	/// Registers `profile`. A name that is already taken is a hard error.
	pub fn register(&self, profile: Profile) -> Result<Arc<Profile>> {
		let profile = Arc::new(profile);
		loop {
			let cur = self.snap.load_full();
			if cur.by_name.contains_key(profile.name()) {
				tracing::error!(domain = "profiles", profile = profile.name(), "duplicate profile name");
				return Err(ProfileError::Duplicate(profile.name().to_string()));
			}

			let mut next = (*cur).clone();
			next.by_name.insert(profile.name().into(), profile.clone());
			next.items.push(profile.clone());

			let prev = self.snap.compare_and_swap(&cur, Arc::new(next));
			if Arc::ptr_eq(&prev, &cur) {
				tracing::debug!(
					domain = "profiles",
					profile = profile.name(),
					dependencies = ?profile.dependencies(),
					overrides = profile.override_count(),
					"registered profile",
				);
				return Ok(profile);
			}
		}
	}

	pub fn get(&self, name: &str) -> Option<Arc<Profile>> {
		self.snap.load().by_name.get(name).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.snap.load().by_name.contains_key(name)
	}

	/// Registered names in registration order.
	pub fn names(&self) -> Vec<String> {
		self.snap.load().items.iter().map(|p| p.name().to_string()).collect()
	}

	pub fn len(&self) -> usize {
		self.snap.load().items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Orders the requested profiles and their transitive dependencies so
	/// that every profile comes after all of its dependencies.
	///
	/// Requested profiles keep their relative order when unrelated, and each
	/// profile appears once. Unknown names and cycles are errors; nothing is
	/// returned for a request that contains either.
	pub fn resolve_application_order<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<Profile>>> {
		let snap = self.snap.load_full();
		let mut marks: HashMap<Box<str>, Mark> = HashMap::default();
		let mut stack: Vec<String> = Vec::new();
		let mut order = Vec::new();

		for name in names {
			visit(&snap, name.as_ref(), None, &mut marks, &mut stack, &mut order).inspect_err(|err| {
				tracing::error!(domain = "profiles", requested = name.as_ref(), error = %err, "profile resolution failed");
			})?;
		}

		tracing::debug!(
			domain = "profiles",
			order = ?order.iter().map(|p: &Arc<Profile>| p.name()).collect::<Vec<_>>(),
			"resolved application order",
		);
		Ok(order)
	}

	/// Resolves `names` and merges their overrides, last applied wins.
	pub fn merged_overrides<S: AsRef<str>>(&self, names: &[S]) -> Result<MergedOverrides> {
		let order = self.resolve_application_order(names)?;
		Ok(MergedOverrides::from_profiles(&order))
	}
}

fn visit(
	snap: &RegistrySnapshot,
	name: &str,
	required_by: Option<&str>,
	marks: &mut HashMap<Box<str>, Mark>,
	stack: &mut Vec<String>,
	order: &mut Vec<Arc<Profile>>,
) -> Result<()> {
	match marks.get(name) {
		Some(Mark::Done) => return Ok(()),
		Some(Mark::Visiting) => {
			let start = stack.iter().position(|n| n == name).unwrap_or(0);
			let mut path = stack[start..].to_vec();
			path.push(name.to_string());
			return Err(ProfileError::Cycle { path });
		}
		None => {}
	}

	let Some(profile) = snap.by_name.get(name) else {
		return Err(ProfileError::UnknownProfile {
			name: name.to_string(),
			required_by: required_by.map(str::to_string),
		});
	};

	marks.insert(name.into(), Mark::Visiting);
	stack.push(name.to_string());
	for dependency in profile.dependencies() {
		visit(snap, dependency, Some(name), marks, stack, order)?;
	}
	stack.pop();
	marks.insert(name.into(), Mark::Done);
	order.push(profile.clone());
	Ok(())
}
