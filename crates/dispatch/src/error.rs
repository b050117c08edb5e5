use thiserror::Error;

use crate::Strategy;

/// Failures reported by the interception core.
///
/// None of these abort the process; callers decide whether a failure is
/// fatal for the operation they were attempting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
	/// The host has no type with this name.
	#[error("type not found: {class}")]
	TypeNotFound { class: String },

	/// The type exists but does not respond to the operation.
	#[error("operation not found: -[{class} {operation}]")]
	OperationNotFound { class: String, operation: String },

	/// An operation with this identifier is already defined on the type.
	#[error("operation already exists: -[{class} {operation}]")]
	AlreadyExists { class: String, operation: String },

	/// Rewire was requested before the original entry point was captured.
	#[error("original entry point not captured: -[{class} {operation}]")]
	NotCaptured { class: String, operation: String },

	/// The strategy is declared but has no implementation.
	#[error("rewiring strategy not implemented: {0:?}")]
	NotImplemented(Strategy),

	/// The host refused to mutate its dispatch table.
	#[error("host rejected {action} for -[{class} {operation}]")]
	HostRejected {
		action: &'static str,
		class: String,
		operation: String,
	},
}

/// Result type for interception operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
