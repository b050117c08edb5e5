//! Catalogue of the properties the engine controls.

use cloak_dispatch::Signature;
use cloak_profiles::ValueKind;


pub const WINDOW_CLASS: &str = "NSWindow";
pub const APPLICATION_CLASS: &str = "NSApplication";

/// Which object a property lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
	Window,
	Application,
}

impl TargetKind {
	pub const fn class(self) -> &'static str {
		match self {
			Self::Window => WINDOW_CLASS,
			Self::Application => APPLICATION_CLASS,
		}
	}
}

/// A controlled property.
///
/// Variants are declared in application order. Some toolkit versions ignore
/// the capture-exclusion setting unless the visual style is already final,
/// so [`SharingType`](Self::SharingType) comes last among window properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Property {
	StyleMask,
	CollectionBehavior,
	Level,
	HasShadow,
	AlphaValue,
	IgnoresMouseEvents,
	AcceptsMouseMovedEvents,
	CanBecomeKey,
	CanBecomeMain,
	SharingType,
	ActivationPolicy,
	PresentationOptions,
}

bitflags::bitflags! {
	/// Set of properties an object type exposes.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct PropertySet: u32 {
		const STYLE_MASK = 1 << 0;
		const COLLECTION_BEHAVIOR = 1 << 1;
		const LEVEL = 1 << 2;
		const HAS_SHADOW = 1 << 3;
		const ALPHA_VALUE = 1 << 4;
		const IGNORES_MOUSE_EVENTS = 1 << 5;
		const ACCEPTS_MOUSE_MOVED_EVENTS = 1 << 6;
		const CAN_BECOME_KEY = 1 << 7;
		const CAN_BECOME_MAIN = 1 << 8;
		const SHARING_TYPE = 1 << 9;
		const ACTIVATION_POLICY = 1 << 10;
		const PRESENTATION_OPTIONS = 1 << 11;

		const WINDOW = Self::STYLE_MASK.bits()
			| Self::COLLECTION_BEHAVIOR.bits()
			| Self::LEVEL.bits()
			| Self::HAS_SHADOW.bits()
			| Self::ALPHA_VALUE.bits()
			| Self::IGNORES_MOUSE_EVENTS.bits()
			| Self::ACCEPTS_MOUSE_MOVED_EVENTS.bits()
			| Self::CAN_BECOME_KEY.bits()
			| Self::CAN_BECOME_MAIN.bits()
			| Self::SHARING_TYPE.bits();
		const APPLICATION = Self::ACTIVATION_POLICY.bits() | Self::PRESENTATION_OPTIONS.bits();
	}
}

impl Property {
	/// Every property in application order.
	pub const ALL: [Property; 12] = [
		Self::StyleMask,
		Self::CollectionBehavior,
		Self::Level,
		Self::HasShadow,
		Self::AlphaValue,
		Self::IgnoresMouseEvents,
		Self::AcceptsMouseMovedEvents,
		Self::CanBecomeKey,
		Self::CanBecomeMain,
		Self::SharingType,
		Self::ActivationPolicy,
		Self::PresentationOptions,
	];

	/// Properties of `target`, in application order.
	pub fn of(target: TargetKind) -> impl Iterator<Item = Property> {
		Self::ALL.into_iter().filter(move |p| p.target() == target)
	}

	/// Toolkit name of the read accessor; also the key used in profiles.
	pub const fn name(self) -> &'static str {
		match self {
			Self::StyleMask => "styleMask",
			Self::CollectionBehavior => "collectionBehavior",
			Self::Level => "level",
			Self::HasShadow => "hasShadow",
			Self::AlphaValue => "alphaValue",
			Self::IgnoresMouseEvents => "ignoresMouseEvents",
			Self::AcceptsMouseMovedEvents => "acceptsMouseMovedEvents",
			Self::CanBecomeKey => "canBecomeKeyWindow",
			Self::CanBecomeMain => "canBecomeMainWindow",
			Self::SharingType => "sharingType",
			Self::ActivationPolicy => "activationPolicy",
			Self::PresentationOptions => "presentationOptions",
		}
	}

	/// Toolkit name of the write accessor. `None` for read-only getters.
	pub const fn setter(self) -> Option<&'static str> {
		Some(match self {
			Self::StyleMask => "setStyleMask:",
			Self::CollectionBehavior => "setCollectionBehavior:",
			Self::Level => "setLevel:",
			Self::HasShadow => "setHasShadow:",
			Self::AlphaValue => "setAlphaValue:",
			Self::IgnoresMouseEvents => "setIgnoresMouseEvents:",
			Self::AcceptsMouseMovedEvents => "setAcceptsMouseMovedEvents:",
			Self::CanBecomeKey | Self::CanBecomeMain => return None,
			Self::SharingType => "setSharingType:",
			Self::ActivationPolicy => "setActivationPolicy:",
			Self::PresentationOptions => "setPresentationOptions:",
		})
	}

	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|p| p.name() == name)
	}

	pub const fn target(self) -> TargetKind {
		match self {
			Self::ActivationPolicy | Self::PresentationOptions => TargetKind::Application,
			_ => TargetKind::Window,
		}
	}

	pub const fn kind(self) -> ValueKind {
		match self {
			Self::HasShadow
			| Self::IgnoresMouseEvents
			| Self::AcceptsMouseMovedEvents
			| Self::CanBecomeKey
			| Self::CanBecomeMain => ValueKind::Bool,
			Self::StyleMask | Self::CollectionBehavior | Self::Level | Self::PresentationOptions => ValueKind::Int,
			Self::AlphaValue => ValueKind::Float,
			Self::SharingType | Self::ActivationPolicy => ValueKind::Enum,
		}
	}

	pub const fn as_set(self) -> PropertySet {
		PropertySet::from_bits_retain(1 << self as u32)
	}

	/// Type encoding of the read accessor.
	pub const fn getter_signature(self) -> Signature {
		Signature::from_static(match self.kind() {
			ValueKind::Bool => "c16@0:8",
			ValueKind::Float => "d16@0:8",
			ValueKind::Int | ValueKind::Enum | ValueKind::Str => "q16@0:8",
		})
	}

	/// Type encoding of the write accessor.
	pub const fn setter_signature(self) -> Signature {
		Signature::from_static(match self.kind() {
			ValueKind::Bool => "v20@0:8c16",
			ValueKind::Float => "v24@0:8d16",
			ValueKind::Int | ValueKind::Enum | ValueKind::Str => "v24@0:8q16",
		})
	}
}

impl From<Property> for PropertySet {
	fn from(property: Property) -> Self {
		property.as_set()
	}
}

impl FromIterator<Property> for PropertySet {
	fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
		iter.into_iter().fold(PropertySet::empty(), |set, p| set | p.as_set())
	}
}

impl PropertySet {
	/// Properties in the set, in application order.
	pub fn properties(self) -> impl Iterator<Item = Property> {
		Property::ALL.into_iter().filter(move |p| self.contains(p.as_set()))
	}
}
