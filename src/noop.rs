use std::error::Error;
use std::sync::Arc;

use crate::backend::{Core, Entry, Field, Severity};

/// A backend core that accepts nothing and writes nothing.
///
/// Useful for measuring the overhead of the bridge itself without any
/// output, and for wiring a handler in tests that don't care about
/// persistence.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCore;

impl Core for NoopCore {
    fn enabled(&self, _level: Severity) -> bool {
        false
    }

    fn with(&self, _fields: Vec<Field>) -> Arc<dyn Core> {
        Arc::new(NoopCore)
    }

    fn write(&self, _entry: &Entry, _fields: &[Field]) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
