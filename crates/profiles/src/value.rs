use std::fmt;

use serde::{Deserialize, Serialize};

/// Shape of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
	Bool,
	Int,
	Float,
	Str,
	Enum,
}

impl ValueKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Bool => "bool",
			Self::Int => "int",
			Self::Float => "float",
			Self::Str => "string",
			Self::Enum => "enum",
		}
	}
}

impl fmt::Display for ValueKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A forced property value.
///
/// In TOML documents booleans, integers, floats and strings map to their
/// own variants, and `{ name = "...", raw = N }` tables map to [`Enum`].
///
/// [`Enum`]: PropertyValue::Enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(String),
	/// Symbolic toolkit constant with its raw value.
	Enum { name: String, raw: i64 },
}

impl PropertyValue {
	pub fn enumeration(name: impl Into<String>, raw: i64) -> Self {
		Self::Enum { name: name.into(), raw }
	}

	pub fn kind(&self) -> ValueKind {
		match self {
			Self::Bool(_) => ValueKind::Bool,
			Self::Int(_) => ValueKind::Int,
			Self::Float(_) => ValueKind::Float,
			Self::Str(_) => ValueKind::Str,
			Self::Enum { .. } => ValueKind::Enum,
		}
	}

	/// Returns true if this value can be written to a property of `kind`.
	///
	/// Integers are accepted where an enum is expected (the raw value), and
	/// where a float is expected.
	pub fn matches_kind(&self, kind: ValueKind) -> bool {
		matches!(
			(self, kind),
			(Self::Bool(_), ValueKind::Bool)
				| (Self::Int(_), ValueKind::Int | ValueKind::Enum | ValueKind::Float)
				| (Self::Float(_), ValueKind::Float)
				| (Self::Str(_), ValueKind::Str)
				| (Self::Enum { .. }, ValueKind::Enum | ValueKind::Int)
		)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(v) => Some(*v),
			_ => None,
		}
	}

	/// Integer view; enums yield their raw value.
	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(v) => Some(*v),
			Self::Enum { raw, .. } => Some(*raw),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f64> {
		match self {
			Self::Float(v) => Some(*v),
			Self::Int(v) => Some(*v as f64),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(v) => Some(v),
			Self::Enum { name, .. } => Some(name),
			_ => None,
		}
	}
}

impl fmt::Display for PropertyValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Bool(v) => v.fmt(f),
			Self::Int(v) => v.fmt(f),
			Self::Float(v) => v.fmt(f),
			Self::Str(v) => write!(f, "{v:?}"),
			Self::Enum { name, raw } => write!(f, "{name}({raw})"),
		}
	}
}

impl From<bool> for PropertyValue {
	fn from(v: bool) -> Self {
		Self::Bool(v)
	}
}

impl From<i32> for PropertyValue {
	fn from(v: i32) -> Self {
		Self::Int(v.into())
	}
}

impl From<i64> for PropertyValue {
	fn from(v: i64) -> Self {
		Self::Int(v)
	}
}

impl From<f64> for PropertyValue {
	fn from(v: f64) -> Self {
		Self::Float(v)
	}
}

impl From<String> for PropertyValue {
	fn from(v: String) -> Self {
		Self::Str(v)
	}
}

impl From<&str> for PropertyValue {
	fn from(v: &str) -> Self {
		Self::Str(v.to_string())
	}
}
