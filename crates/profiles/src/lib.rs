//! Declarative override profiles.
//!
//! A [`Profile`] maps a target type name to a map of property name to the
//! [`PropertyValue`] the engine should force. Profiles name their
//! dependencies; the [`ProfileRegistry`] orders a requested set so every
//! dependency is applied before its dependents and merges the result with
//! last-applied-wins semantics.
//!
//! Profiles that are unrelated by dependency keep their requested order, so
//! when two of them set the same property the one requested later wins.

pub mod builtins;
mod error;
mod merge;
mod profile;
mod registry;
mod value;

pub use error::{ProfileError, Result};
pub use merge::MergedOverrides;
pub use profile::{OverrideMap, Profile, ProfileBuilder, PropertyMap};
pub use registry::ProfileRegistry;
pub use value::{PropertyValue, ValueKind};
