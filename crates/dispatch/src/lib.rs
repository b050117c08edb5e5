//! Runtime method interception.
//!
//! This crate rewires the code invoked when instances of a type receive a
//! named operation, while keeping the previous behavior reachable.
//!
//! # Mental Model
//!
//! A host object system is reached through the [`DispatchHost`] adapter. It
//! exposes one indirection slot per `(type, operation)` pair. The
//! [`Interceptor`] owns the registry of captured originals and drives every
//! rewire in a fixed sequence:
//!
//! 1. **Capture:** the original entry point is looked up and stored. It is
//!    write-once; later captures return the stored value.
//! 2. **Register:** the replacement is added to the type under its own
//!    operation identifier.
//! 3. **Rewire:** the slots are exchanged or overwritten.
//!
//! Rewiring before capturing loses the only reference to the original
//! behavior, so [`Interceptor::rewire`] refuses to run for an operation that
//! has no captured original.
//!
//! # Hosts
//!
//! | Host | Role |
//! |------|------|
//! | [`IndirectionTable`] | Owned in-memory table; reference model and test host. |
//! | `objc::ObjcRuntime` | Objective-C runtime adapter (macOS only). |

mod entry;
mod error;
mod host;
mod interceptor;
#[cfg(target_os = "macos")]
pub mod objc;
mod table;

pub use entry::{EntryPoint, OpKey, Signature};
pub use error::{DispatchError, Result};
pub use host::DispatchHost;
pub use interceptor::{Interceptor, OperationRewire, Rewire, Strategy};
pub use table::IndirectionTable;
