//! Capability resolver for undocumented window-server functions.
//!
//! The functions this crate reaches for are private, unversioned and come and
//! go between OS releases. Each one is looked up by name from the system
//! graphics image the first time it is needed and treated as individually
//! optional:
//!
//! * a failed lookup is remembered and never retried;
//! * a successful lookup is cached for the process lifetime;
//! * the resolver as a whole is "available" iff the connection accessor
//!   ([`Symbol::DefaultConnection`]) resolves.
//!
//! Callers never see raw pointers. Every low-level call goes through
//! [`CapabilityResolver::perform_operation`], which checks availability,
//! acquires a connection, runs the call through a typed [`Session`] and
//! turns the status code into a [`Result`].

mod error;
mod resolver;
mod source;
mod symbol;
mod types;

pub use error::{CapabilityError, Result};
pub use resolver::{Availability, CapabilityReport, CapabilityResolver, Session};
pub use source::{SymbolSource, SystemLibrary};
pub use symbol::Symbol;
pub use types::{ConnectionId, SharingState, Status, WindowId, WindowLevel};
