//! Error types for function resolution and invocation.

use thiserror::Error;

/// Errors from a function source or the resolver chain. Any of these inside
/// a tier means "try the next tier"; out of the resolver as a whole they are
/// startup-fatal.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("package download failed: {0}")]
    Download(String),

    #[error("package archive could not be unpacked: {0}")]
    Unpack(String),

    #[error("package contains no script sources")]
    NoSources,

    #[error("module {0} not found")]
    ModuleMissing(String),

    #[error("script compilation failed: {0}")]
    Compile(String),

    #[error("entry point `{0}` not defined by any discovered source")]
    EntryPointMissing(String),

    #[error("no function source yielded a callable")]
    Exhausted,
}

/// Errors from invoking a bound handler. All of them are contained by the
/// execution loop: logged, no output that tick, loop continues.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler evaluation failed: {0}")]
    Eval(String),

    #[error("handler returned {0}, not an object map")]
    NotAMap(&'static str),

    #[error("handler state did not round-trip: {0}")]
    State(String),
}
