use thiserror::Error;

use crate::{Status, Symbol, WindowId};

/// Capability failures. All of them are recoverable: callers fall back to a
/// documented mechanism or report the feature as unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
	#[error("failed to open {path}: {message}")]
	Library { path: String, message: String },
	#[error("{operation}: {symbol} is unavailable")]
	Unavailable { operation: &'static str, symbol: Symbol },
	#[error("{operation}: no window-server connection")]
	NoConnection { operation: &'static str },
	#[error("{operation} failed for window {window} with status {status}")]
	Failed {
		operation: &'static str,
		window: WindowId,
		status: Status,
	},
}

pub type Result<T> = std::result::Result<T, CapabilityError>;
