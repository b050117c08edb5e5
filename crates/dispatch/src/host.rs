use crate::{EntryPoint, Signature};

/// Adapter between the interception core and a concrete object system.
///
/// Lookups follow the host's inheritance rules: an operation defined on a
/// supertype is visible from its subtypes. Mutations of an inherited slot
/// affect every type that shares it, as they do in a live object model.
pub trait DispatchHost {
	/// Returns true if the host knows a type with this name.
	fn contains_type(&self, class: &str) -> bool;

	/// Returns the entry point currently bound to `operation` on `class`.
	fn implementation(&self, class: &str, operation: &str) -> Option<EntryPoint>;

	/// Adds a new operation to `class` itself.
	///
	/// Returns false when `class` already defines `operation`. Overriding an
	/// inherited operation is allowed.
	fn add_operation(&mut self, class: &str, operation: &str, entry: EntryPoint, signature: &Signature) -> bool;

	/// Rebinds `operation` and returns the entry point it replaced.
	fn set_implementation(&mut self, class: &str, operation: &str, entry: EntryPoint) -> Option<EntryPoint>;

	/// Swaps the entry points bound to two operations of `class`.
	fn exchange(&mut self, class: &str, first: &str, second: &str) -> bool;
}

impl<H: DispatchHost + ?Sized> DispatchHost for &mut H {
	fn contains_type(&self, class: &str) -> bool {
		(**self).contains_type(class)
	}

	fn implementation(&self, class: &str, operation: &str) -> Option<EntryPoint> {
		(**self).implementation(class, operation)
	}

	fn add_operation(&mut self, class: &str, operation: &str, entry: EntryPoint, signature: &Signature) -> bool {
		(**self).add_operation(class, operation, entry, signature)
	}

	fn set_implementation(&mut self, class: &str, operation: &str, entry: EntryPoint) -> Option<EntryPoint> {
		(**self).set_implementation(class, operation, entry)
	}

	fn exchange(&mut self, class: &str, first: &str, second: &str) -> bool {
		(**self).exchange(class, first, second)
	}
}
