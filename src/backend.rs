use std::error::Error;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

/// Backend severities, ordered from least to most severe.
///
/// The two topmost tiers terminate the process after the entry is written:
/// `Panic` aborts with a panic carrying the message, `Fatal` exits
/// immediately without cleanup. `DPanic` is the backend's
/// enriched-diagnostic tier; what it does beyond writing is backend policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    DPanic,
    Panic,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::DPanic => "dpanic",
            Severity::Panic => "panic",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type tag selecting which payload slot of a [`Field`] is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Duration,
    Float64,
    Int64,
    String,
    Time,
    Uint64,
    Stringer,
    Error,
    Reflect,
}

/// Payload carried in a field's opaque slot.
///
/// For `Time` fields this is the originating UTC offset, so downstream
/// formatting can reconstruct the wall-clock representation. For the three
/// arbitrary-value tags it is the original value behind the capability it
/// was tagged with.
#[derive(Clone)]
pub enum OpaquePayload {
    Display(Arc<dyn fmt::Display + Send + Sync>),
    Error(Arc<dyn Error + Send + Sync>),
    Debug(Arc<dyn fmt::Debug + Send + Sync>),
    Offset(FixedOffset),
}

impl fmt::Debug for OpaquePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpaquePayload::Display(v) => write!(f, "Display({})", v),
            OpaquePayload::Error(v) => write!(f, "Error({})", v),
            OpaquePayload::Debug(v) => write!(f, "Debug({:?})", v),
            OpaquePayload::Offset(v) => write!(f, "Offset({:?})", v),
        }
    }
}

/// Flat typed key/value pair consumed by the backend.
///
/// Exactly one of `integer`, `string`, `opaque` is meaningful for a given
/// [`FieldType`]; the others hold zero-value filler.
#[derive(Debug, Clone)]
pub struct Field {
    pub key: String,
    pub ty: FieldType,
    pub integer: i64,
    pub string: String,
    pub opaque: Option<OpaquePayload>,
}

/// Resolved call-site attached to an [`Entry`]. The zero value means the
/// call-site could not be resolved; the entry is still written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caller {
    pub defined: bool,
    pub file: &'static str,
    pub line: u32,
}

impl Caller {
    pub fn new(file: &'static str, line: u32) -> Caller {
        Caller { defined: true, file, line }
    }
}

/// One logical log event as the backend understands it.
#[derive(Debug, Clone)]
pub struct Entry {
    pub level: Severity,
    pub time: DateTime<Utc>,
    pub logger_name: String,
    pub message: String,
    pub caller: Caller,
    pub stack: String,
}

/// Side effect fired immediately after a checked entry is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckWriteHook {
    Noop,
    Panic,
    Fatal,
}

/// Minimal capability set every backend core implements.
///
/// Cores are shared behind `Arc<dyn Core>`; `with` derives a child core with
/// extra fields permanently bound, leaving the receiver untouched.
pub trait Core: Send + Sync {
    /// Whether an entry at `level` would pass this core's gate.
    fn enabled(&self, level: Severity) -> bool;

    /// Child core with `fields` bound to every future entry.
    fn with(&self, fields: Vec<Field>) -> Arc<dyn Core>;

    /// Write one gated entry with its fields.
    fn write(&self, entry: &Entry, fields: &[Field]) -> Result<(), Box<dyn Error + Send + Sync>>;
}

impl dyn Core {
    /// Backend gate: `None` when the severity check rejects the entry,
    /// otherwise a write-token. Fatal-tier entries come back with the
    /// process-exit hook already attached; that termination is the
    /// backend's own contract, not the caller's.
    pub fn check(&self, entry: Entry) -> Option<CheckedEntry<'_>> {
        if !self.enabled(entry.level) {
            return None;
        }
        let after = if entry.level == Severity::Fatal {
            CheckWriteHook::Fatal
        } else {
            CheckWriteHook::Noop
        };
        Some(CheckedEntry { core: self, entry, after })
    }
}

/// Write-token: proof that an entry passed the backend gate and is ready to
/// be written. Consumed by [`CheckedEntry::write`].
pub struct CheckedEntry<'a> {
    core: &'a dyn Core,
    entry: Entry,
    after: CheckWriteHook,
}

impl<'a> CheckedEntry<'a> {
    /// Replace the after-write side effect.
    pub fn after(mut self, hook: CheckWriteHook) -> CheckedEntry<'a> {
        self.after = hook;
        self
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn hook(&self) -> CheckWriteHook {
        self.after
    }

    /// Perform the write, then fire the hook.
    ///
    /// Write failures are reported on stderr and never propagated: logging
    /// must not become fatal for the caller. Termination hooks run strictly
    /// after the write call returns, so the entry reaches the sink before
    /// the process dies.
    pub fn write(self, fields: &[Field]) {
        if let Err(err) = self.core.write(&self.entry, fields) {
            eprintln!("log backend write failed: {}", err);
        }
        match self.after {
            CheckWriteHook::Noop => {}
            CheckWriteHook::Panic => panic!("{}", self.entry.message),
            CheckWriteHook::Fatal => std::process::exit(1),
        }
    }
}

/// Immutable handle to a backend core plus a dot-joined logger name.
///
/// All derivation is copy-on-derive: `with` and `named` return new handles
/// and leave the receiver usable as before. Cloning is cheap.
#[derive(Clone)]
pub struct Logger {
    core: Arc<dyn Core>,
    name: String,
}

impl Logger {
    pub fn new(core: Arc<dyn Core>) -> Logger {
        Logger { core, name: String::new() }
    }

    /// Child logger with `fields` bound to every future entry.
    pub fn with(&self, fields: Vec<Field>) -> Logger {
        Logger { core: self.core.with(fields), name: self.name.clone() }
    }

    /// Namespaced child logger. Empty segments leave the name unchanged.
    pub fn named(&self, name: &str) -> Logger {
        if name.is_empty() {
            return self.clone();
        }
        let name = if self.name.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.name, name)
        };
        Logger { core: Arc::clone(&self.core), name }
    }

    pub fn core(&self) -> &Arc<dyn Core> {
        &self.core
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("name", &self.name).finish_non_exhaustive()
    }
}
