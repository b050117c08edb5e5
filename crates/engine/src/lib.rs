//! Screen-capture exclusion for a host process's windows.
//!
//! The engine is loaded into a running GUI process. It resolves a set of
//! named profiles into per-type property overrides, rewires the toolkit's
//! accessors so every reader sees the forced values, and then keeps writing
//! those values back to live objects because the toolkit resets some of
//! them on its own.
//!
//! # Flow
//!
//! 1. [`Engine::initialize`] checks the window server through
//!    [`cloak_capability`] and installs the profiles named in
//!    [`EngineConfig`].
//! 2. [`Engine::install`] resolves and merges profiles, validates the
//!    result against the [`property`] catalogue and runs each
//!    [`ObjectInterceptor`] in priority order.
//! 3. The toolkit delivers timer ticks and lifecycle notifications to
//!    [`Engine::handle`], which reapplies overrides to the affected objects.
//!
//! Everything runs on the toolkit's main loop. The [`toolkit::Toolkit`]
//! trait is the only seam to the host; [`toolkit::testing::TestToolkit`]
//! implements it in memory.

pub mod config;
mod context;
mod engine;
mod error;
pub mod ffi;
mod interceptor;
pub mod logging;
pub mod property;
mod reinforce;
mod report;
pub mod toolkit;

pub use config::{EngineConfig, LogConfig};
pub use context::{EngineContext, ProtectedWindowSet};
pub use engine::Engine;
pub use error::{EngineError, ErrorKind, Result, Step};
pub use interceptor::{InterceptorSet, ObjectInterceptor};
pub use report::{ApplyReport, PassReport};
