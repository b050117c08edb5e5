use rustc_hash::FxHashMap as HashMap;

use crate::{DispatchHost, EntryPoint, Signature};


/// Owned per-type indirection table.
///
/// Maps every `(type, operation)` pair to its current entry point. Types may
/// name a supertype; lookups walk the chain the way a live object model
/// does, and mutations land on the slot that owns the operation.
#[derive(Debug, Clone, Default)]
pub struct IndirectionTable {
	types: HashMap<Box<str>, TypeSlots>,
}

#[derive(Debug, Clone, Default)]
struct TypeSlots {
	superclass: Option<Box<str>>,
	slots: HashMap<Box<str>, Slot>,
}

#[derive(Debug, Clone)]
struct Slot {
	entry: EntryPoint,
	signature: Signature,
}

impl IndirectionTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Declares a type, optionally deriving from `superclass`.
	///
	/// Redeclaring a type keeps its slots and updates the supertype.
	pub fn define_type(&mut self, class: &str, superclass: Option<&str>) -> &mut Self {
		let entry = self.types.entry(class.into()).or_default();
		entry.superclass = superclass.map(Into::into);
		self
	}

	/// Binds `operation` on `class` itself, declaring the type if needed.
	///
	/// Returns the entry point previously bound on `class` (not inherited).
	pub fn define(&mut self, class: &str, operation: &str, entry: EntryPoint, signature: Signature) -> Option<EntryPoint> {
		self.types
			.entry(class.into())
			.or_default()
			.slots
			.insert(operation.into(), Slot { entry, signature })
			.map(|slot| slot.entry)
	}

	pub fn superclass(&self, class: &str) -> Option<&str> {
		self.types.get(class)?.superclass.as_deref()
	}

	/// Returns true if `class` is `ancestor` or derives from it.
	pub fn is_kind_of(&self, class: &str, ancestor: &str) -> bool {
		let mut current = Some(class);
		for _ in 0..=self.types.len() {
			match current {
				Some(name) if name == ancestor => return true,
				Some(name) => current = self.superclass(name),
				None => return false,
			}
		}
		false
	}

	/// Returns true if `class` itself (not a supertype) binds `operation`.
	pub fn defines(&self, class: &str, operation: &str) -> bool {
		self.types
			.get(class)
			.is_some_and(|ty| ty.slots.contains_key(operation))
	}

	pub fn signature(&self, class: &str, operation: &str) -> Option<&Signature> {
		let owner = self.owner(class, operation)?;
		self.types.get(&*owner)?.slots.get(operation).map(|slot| &slot.signature)
	}

	/// Number of declared types.
	pub fn type_count(&self) -> usize {
		self.types.len()
	}

	/// Finds the type in `class`'s chain that binds `operation`.
	fn owner(&self, class: &str, operation: &str) -> Option<Box<str>> {
		let (mut name, mut ty) = self.types.get_key_value(class)?;
		// Bounded walk: a malformed chain must not spin forever.
		for _ in 0..=self.types.len() {
			if ty.slots.contains_key(operation) {
				return Some(name.clone());
			}
			let parent = ty.superclass.as_deref()?;
			(name, ty) = self.types.get_key_value(parent)?;
		}
		None
	}

	fn slot_mut(&mut self, class: &str, operation: &str) -> Option<&mut Slot> {
		let owner = self.owner(class, operation)?;
		self.types.get_mut(&*owner)?.slots.get_mut(operation)
	}
}

impl DispatchHost for IndirectionTable {
	fn contains_type(&self, class: &str) -> bool {
		self.types.contains_key(class)
	}

	fn implementation(&self, class: &str, operation: &str) -> Option<EntryPoint> {
		let owner = self.owner(class, operation)?;
		self.types.get(&*owner)?.slots.get(operation).map(|slot| slot.entry)
	}

	fn add_operation(&mut self, class: &str, operation: &str, entry: EntryPoint, signature: &Signature) -> bool {
		let Some(ty) = self.types.get_mut(class) else {
			return false;
		};
		if ty.slots.contains_key(operation) {
			return false;
		}
		ty.slots.insert(
			operation.into(),
			Slot {
				entry,
				signature: signature.clone(),
			},
		);
		true
	}

	fn set_implementation(&mut self, class: &str, operation: &str, entry: EntryPoint) -> Option<EntryPoint> {
		let slot = self.slot_mut(class, operation)?;
		Some(std::mem::replace(&mut slot.entry, entry))
	}

	fn exchange(&mut self, class: &str, first: &str, second: &str) -> bool {
		let (Some(a), Some(b)) = (self.implementation(class, first), self.implementation(class, second)) else {
			return false;
		};
		self.set_implementation(class, first, b);
		self.set_implementation(class, second, a);
		true
	}
}
