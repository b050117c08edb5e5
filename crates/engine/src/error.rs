use std::fmt;

use cloak_capability::CapabilityError;
use cloak_dispatch::DispatchError;
use cloak_profiles::{ProfileError, ValueKind};
use thiserror::Error;

use crate::toolkit::ToolkitError;

/// Stage of profile application that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
	/// Resolving profile names and validating their overrides.
	Resolution,
	/// Capturing original entry points.
	Capture,
	/// Registering replacements and rewiring dispatch.
	Rewire,
	/// Applying state to live objects and starting reinforcement.
	Apply,
}

impl Step {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Resolution => "resolution",
			Self::Capture => "capture",
			Self::Rewire => "rewire",
			Self::Apply => "apply",
		}
	}
}

impl fmt::Display for Step {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Error)]
pub enum ErrorKind {
	#[error(transparent)]
	Profile(#[from] ProfileError),
	#[error(transparent)]
	Dispatch(#[from] DispatchError),
	#[error(transparent)]
	Capability(#[from] CapabilityError),
	#[error(transparent)]
	Toolkit(#[from] ToolkitError),
	#[error("{class}.{property} expects {expected}, profile sets {found}")]
	InvalidValue {
		class: String,
		property: String,
		expected: ValueKind,
		found: ValueKind,
	},
	#[error("toolkit has no replacement for {operation}")]
	NoReplacement { operation: String },
	#[error("could not schedule the reinforcement timer")]
	Scheduling,
	#[error("engine is not initialized")]
	NotInitialized,
	#[error("engine is busy handling another call")]
	Busy,
	#[error("engine panicked: {0}")]
	Panicked(String),
}

/// Failure of an engine operation, tagged with the step it happened in.
#[derive(Debug, Error)]
#[error("{step} failed: {kind}")]
pub struct EngineError {
	step: Step,
	#[source]
	kind: ErrorKind,
}

impl EngineError {
	pub fn new(step: Step, kind: impl Into<ErrorKind>) -> Self {
		Self {
			step,
			kind: kind.into(),
		}
	}

	pub fn step(&self) -> Step {
		self.step
	}

	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}

	/// Maps a dispatch failure onto the step it belongs to.
	pub(crate) fn dispatch(err: DispatchError) -> Self {
		let step = match err {
			DispatchError::TypeNotFound { .. } | DispatchError::OperationNotFound { .. } => Step::Capture,
			_ => Step::Rewire,
		};
		Self::new(step, err)
	}
}

pub type Result<T> = std::result::Result<T, EngineError>;
