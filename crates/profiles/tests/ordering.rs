//! Ordering and merge laws over arbitrary dependency graphs.

use cloak_profiles::{Profile, ProfileError, ProfileRegistry};
use proptest::prelude::*;

const MAX: usize = 8;

fn name(i: usize) -> String {
	format!("p{i}")
}

/// Registers `n` profiles where `pi` may depend on any `pj` with `j < i`.
fn acyclic(n: usize, edges: &[Vec<bool>]) -> ProfileRegistry {
	let registry = ProfileRegistry::new();
	for i in 0..n {
		let mut builder = Profile::builder(name(i)).set("T", format!("P{}", i % 3), i as i64);
		for j in (0..i).filter(|&j| edges[i][j]) {
			builder = builder.depends_on(name(j));
		}
		registry.register(builder.build().expect("valid profile")).expect("unique name");
	}
	registry
}

fn graph() -> impl Strategy<Value = (usize, Vec<Vec<bool>>, Vec<usize>)> {
	(1..=MAX).prop_flat_map(|n| {
		(
			Just(n),
			prop::collection::vec(prop::collection::vec(any::<bool>(), MAX), MAX),
			prop::collection::vec(0..n, 1..6),
		)
	})
}

proptest! {
	#[test]
	fn order_respects_transitive_dependencies((n, edges, requested) in graph()) {
		let registry = acyclic(n, &edges);
		let requested: Vec<String> = requested.into_iter().map(name).collect();
		let order = registry.resolve_application_order(&requested).expect("acyclic");
		let position = |p: &str| order.iter().position(|q| q.name() == p);

		for (i, profile) in order.iter().enumerate() {
			prop_assert_eq!(position(profile.name()), Some(i), "each profile appears once");
			for dependency in profile.dependencies() {
				let at = position(dependency);
				prop_assert!(at.is_some_and(|at| at < i), "{} before {}", dependency, profile.name());
			}
		}
		for name in &requested {
			prop_assert!(position(name).is_some());
		}
	}

	#[test]
	fn cycles_are_rejected(
		(n, edges, _) in graph(),
		len in 1..4usize,
		entry in 0..4usize,
	) {
		let registry = acyclic(n, &edges);
		for k in 0..len {
			let profile = Profile::builder(format!("c{k}"))
				.depends_on(format!("c{}", (k + 1) % len))
				.depends_on(name(0))
				.set("T", "P0", 99)
				.build();
			// A one-element cycle is a self-dependency, rejected at build time.
			if len == 1 {
				prop_assert!(matches!(profile, Err(ProfileError::SelfDependency(_))));
				return Ok(());
			}
			registry.register(profile.expect("valid profile")).expect("unique name");
		}

		let requested = [name(0), format!("c{}", entry % len)];
		let err = registry.resolve_application_order(&requested).unwrap_err();
		let is_cycle = matches!(err, ProfileError::Cycle { .. });
		prop_assert!(is_cycle);
		prop_assert!(registry.merged_overrides(&requested).is_err());
	}

	#[test]
	fn merge_is_idempotent((n, edges, requested) in graph()) {
		let registry = acyclic(n, &edges);
		let requested: Vec<String> = requested.into_iter().map(name).collect();
		let once = registry.merged_overrides(&requested).expect("acyclic");
		let again = registry.merged_overrides(&requested).expect("acyclic");
		prop_assert_eq!(&once, &again);

		let doubled: Vec<String> = requested.iter().chain(&requested).cloned().collect();
		let doubled = registry.merged_overrides(&doubled).expect("acyclic");
		prop_assert_eq!(once.as_map(), doubled.as_map());
	}
}
