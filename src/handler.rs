use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::{Caller, CheckWriteHook, Entry, Logger, Severity};
use crate::fields::append_attr;
use crate::level::{map_level, Level};
use crate::pool::{FieldBuffer, FrameScratch, ScratchPool};
use crate::record::{Attr, Record};

/// Cooperative cancellation handle supplied by the logging caller.
///
/// Only the pre-check at the top of [`BridgeHandler::handle`] honors it;
/// once processing starts the write runs to completion. Writes are short
/// and synchronous, and a log line must not be abandoned half-written.
pub trait Context: Send + Sync {
    /// Non-blocking cancellation check.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Context that never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancelled;

impl Context for NeverCancelled {}

/// Flag-backed context for callers that cancel from another thread.
#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
}

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Context for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Errors surfaced by handler construction and [`Handler::handle`].
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    /// No backend logger was supplied to the factory.
    #[error("no backend logger supplied")]
    MissingLogger,

    /// The caller's context was already cancelled at entry; nothing was
    /// written.
    #[error("log call cancelled before any write")]
    Cancelled,
}

/// Capability set the front-end expects from a structured log handler.
pub trait Handler: Send + Sync {
    /// Whether a record at `level` would actually be emitted.
    fn enabled(&self, level: Level) -> bool;

    /// Convert and forward one record.
    fn handle(&self, ctx: &dyn Context, record: &Record) -> Result<(), BridgeError>;

    /// Derived handler with `attrs` bound to every subsequent record.
    fn with_attrs(&self, attrs: Vec<Attr>) -> Box<dyn Handler>;

    /// Derived handler scoped under the group `name`.
    fn with_group(&self, name: &str) -> Box<dyn Handler>;
}

/// Bridge from front-end records to a backend [`Logger`].
///
/// A single handler is safe for concurrent use: each call checks its own
/// scratch buffers out of the shared pools and holds them exclusively until
/// the write completes. Derivation (`with_attrs`, `with_group`) is
/// copy-on-derive — the new handler wraps a derived backend logger and
/// shares its parent's pools, and the original stays valid and unchanged.
#[derive(Clone)]
pub struct BridgeHandler {
    logger: Logger,
    frame_pool: Arc<ScratchPool<FrameScratch>>,
    field_pool: Arc<ScratchPool<FieldBuffer>>,
}

impl std::fmt::Debug for BridgeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeHandler").finish_non_exhaustive()
    }
}

impl BridgeHandler {
    /// Build a handler around `logger`.
    ///
    /// **Returns**
    /// - `Err(BridgeError::MissingLogger)` when no logger is supplied; the
    ///   failure is construction-time, never deferred to the first log call.
    pub fn new(logger: impl Into<Option<Logger>>) -> Result<BridgeHandler, BridgeError> {
        let logger = logger.into().ok_or(BridgeError::MissingLogger)?;
        Ok(BridgeHandler {
            logger,
            frame_pool: Arc::new(ScratchPool::new(FrameScratch::new)),
            field_pool: Arc::new(ScratchPool::new(FieldBuffer::new)),
        })
    }

    /// Pure delegation to the backend gate; no allocation.
    pub fn enabled(&self, level: Level) -> bool {
        self.logger.core().enabled(map_level(level))
    }

    /// Convert one record and hand it to the backend.
    ///
    /// Pipeline: cancellation pre-check, pooled call-site resolution, level
    /// translation, backend gate, then flattening the attribute tree into a
    /// pooled field buffer and writing. A suppressed entry returns `Ok`
    /// without writing.
    ///
    /// At [`Level::PANIC`] the abort hook is registered on the write-token
    /// so the process aborts immediately after the entry reaches the sink;
    /// fatal-tier termination comes attached from the backend gate itself.
    /// Both are specified side effects, not error paths.
    pub fn handle(&self, ctx: &dyn Context, record: &Record) -> Result<(), BridgeError> {
        if ctx.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }

        let caller = self.resolve_caller(record.call_site);
        let severity = map_level(record.level);

        let entry = Entry {
            level: severity,
            time: record.time,
            logger_name: self.logger.name().to_string(),
            message: record.message.clone(),
            caller,
            stack: String::new(),
        };

        let Some(checked) = self.logger.core().check(entry) else {
            return Ok(());
        };
        let checked = if severity == Severity::Panic {
            checked.after(CheckWriteHook::Panic)
        } else {
            checked
        };

        let mut buf = self.field_pool.acquire();
        buf.fields.clear();
        for attr in record.attrs() {
            append_attr(&mut buf.fields, attr, "");
        }
        checked.write(&buf.fields);
        Ok(())
    }

    /// Handler whose backend logger has `attrs` permanently bound.
    ///
    /// The attributes are flattened once, into a fresh buffer with an empty
    /// prefix, and pushed down into a derived backend logger. The receiver
    /// is untouched and keeps writing without them.
    pub fn with_attrs(&self, attrs: Vec<Attr>) -> BridgeHandler {
        let mut fields = Vec::with_capacity(attrs.len());
        for attr in &attrs {
            append_attr(&mut fields, attr, "");
        }
        BridgeHandler {
            logger: self.logger.with(fields),
            frame_pool: Arc::clone(&self.frame_pool),
            field_pool: Arc::clone(&self.field_pool),
        }
    }

    /// Handler writing under the backend's namespaced child logger `name`.
    pub fn with_group(&self, name: &str) -> BridgeHandler {
        BridgeHandler {
            logger: self.logger.named(name),
            frame_pool: Arc::clone(&self.frame_pool),
            field_pool: Arc::clone(&self.field_pool),
        }
    }

    /// Resolve the record's call-site through a pooled single-slot scratch.
    /// An absent or unresolvable site degrades to the zero frame; logging
    /// proceeds with blank caller info.
    fn resolve_caller(&self, site: Option<&'static Location<'static>>) -> Caller {
        let mut scratch = self.frame_pool.acquire();
        scratch.site[0] = site;
        match scratch.site[0] {
            Some(loc) => Caller::new(loc.file(), loc.line()),
            None => Caller::default(),
        }
    }
}

impl Handler for BridgeHandler {
    fn enabled(&self, level: Level) -> bool {
        BridgeHandler::enabled(self, level)
    }

    fn handle(&self, ctx: &dyn Context, record: &Record) -> Result<(), BridgeError> {
        BridgeHandler::handle(self, ctx, record)
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Box<dyn Handler> {
        Box::new(BridgeHandler::with_attrs(self, attrs))
    }

    fn with_group(&self, name: &str) -> Box<dyn Handler> {
        Box::new(BridgeHandler::with_group(self, name))
    }
}
