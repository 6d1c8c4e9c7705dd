//! pulse-runtime — function resolution and execution.
//!
//! A user function is a named entry point inside a set of Rhai script
//! sources. This crate locates those sources (a zip package downloaded from
//! a URI, or a module deployed under a well-known local name), binds the
//! entry point under an explicit [`BindingPolicy`], and exposes the result
//! to the host as a [`Handler`] — one uniform callable, invoked once per
//! tick with the current record and the persistent execution context.
//!
//! # Architecture
//!
//! ```text
//! FunctionResolver
//!   ├── RemotePackageSource (download → unpack → discover → bind)
//!   └── LocalModuleSource   (<module-dir>/usermodule.rhai → bind)
//!         │
//!         └──► ScriptHandler (shared Engine + compiled AST + entry name)
//! ```
//!
//! The window engine is registered on the shared [`rhai::Engine`] as host
//! functions, so deployed scripts call into it instead of re-implementing
//! the aggregation logic.

pub mod engine;
pub mod error;
pub mod handler;
pub mod resolver;
pub mod source;

pub use engine::build_engine;
pub use error::{HandlerError, ResolveError};
pub use handler::{Handler, ScriptHandler};
pub use resolver::FunctionResolver;
pub use source::{
    BindingPolicy, FunctionSource, LocalModuleSource, RemotePackageSource, WELL_KNOWN_MODULE,
};
