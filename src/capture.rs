use std::error::Error;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{Core, Entry, Field, Severity};

/// One write observed by a [`CaptureCore`].
#[derive(Debug, Clone)]
pub struct CapturedEntry {
    pub entry: Entry,
    /// Fields bound through `with` derivations, outermost first.
    pub bound: Vec<Field>,
    /// Fields submitted with this write.
    pub fields: Vec<Field>,
}

/// In-memory spy core: gates on a severity threshold and records every
/// completed write in order.
///
/// `with`-derived children keep appending into the same shared log, so a
/// test can hold the root and observe writes made through any derived
/// logger. An entry shows up only after the backend write returned, which
/// makes write-versus-hook ordering observable.
pub struct CaptureCore {
    threshold: Severity,
    bound: Vec<Field>,
    written: Arc<Mutex<Vec<CapturedEntry>>>,
}

impl CaptureCore {
    /// Spy accepting entries at `threshold` and above.
    pub fn new(threshold: Severity) -> Arc<CaptureCore> {
        Arc::new(CaptureCore {
            threshold,
            bound: Vec::new(),
            written: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Snapshot of every write observed so far, in completion order.
    pub fn entries(&self) -> Vec<CapturedEntry> {
        self.written.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.written.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.lock().is_empty()
    }
}

impl Core for CaptureCore {
    fn enabled(&self, level: Severity) -> bool {
        level >= self.threshold
    }

    fn with(&self, fields: Vec<Field>) -> Arc<dyn Core> {
        let mut bound = self.bound.clone();
        bound.extend(fields);
        Arc::new(CaptureCore {
            threshold: self.threshold,
            bound,
            written: Arc::clone(&self.written),
        })
    }

    fn write(&self, entry: &Entry, fields: &[Field]) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.written.lock().push(CapturedEntry {
            entry: entry.clone(),
            bound: self.bound.clone(),
            fields: fields.to_vec(),
        });
        Ok(())
    }
}
