//! The resolver chain.

use tracing::{info, warn};

use crate::error::ResolveError;
use crate::handler::Handler;
use crate::source::FunctionSource;

/// Tries each configured [`FunctionSource`] in order and returns the first
/// bound callable. Tier failures are logged and fall through; exhausting
/// the chain is an error the host treats as startup-fatal.
pub struct FunctionResolver {
    sources: Vec<Box<dyn FunctionSource>>,
}

impl FunctionResolver {
    pub fn new(sources: Vec<Box<dyn FunctionSource>>) -> Self {
        Self { sources }
    }

    pub async fn resolve(&self) -> Result<Box<dyn Handler>, ResolveError> {
        for source in &self.sources {
            info!(source = %source.describe(), "attempting function source");
            match source.resolve().await {
                Ok(handler) => {
                    info!(source = %source.describe(), "function bound");
                    return Ok(handler);
                }
                Err(err) => {
                    warn!(source = %source.describe(), error = %err, "function source failed, falling through");
                }
            }
        }
        Err(ResolveError::Exhausted)
    }
}
