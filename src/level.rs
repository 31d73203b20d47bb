use std::fmt;

use crate::backend::Severity;

/// Severity level attached to front-end records.
///
/// Ordered integer-like, so callers can define their own levels between or
/// above the provided constants. Three extended levels sit above [`Level::ERROR`]
/// and trigger backend termination paths after the entry is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(pub i16);

impl Level {
    pub const DEBUG: Level = Level(-4);
    pub const INFO: Level = Level(0);
    pub const WARN: Level = Level(4);
    pub const ERROR: Level = Level(8);
    /// Writes, then takes the backend's enriched-diagnostic death path.
    pub const DPANIC: Level = Level(9);
    /// Writes, then unconditionally aborts the process.
    pub const PANIC: Level = Level(10);
    /// Writes, then terminates the process immediately, skipping cleanup.
    pub const FATAL: Level = Level(11);
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match level_name(*self) {
            Some(name) => f.write_str(name),
            None => write!(f, "LEVEL({})", self.0),
        }
    }
}

/// Human-readable name for the seven predefined levels.
pub fn level_name(level: Level) -> Option<&'static str> {
    match level {
        Level::DEBUG => Some("DEBUG"),
        Level::INFO => Some("INFO"),
        Level::WARN => Some("WARN"),
        Level::ERROR => Some("ERROR"),
        Level::DPANIC => Some("DPANIC"),
        Level::PANIC => Some("PANIC"),
        Level::FATAL => Some("FATAL"),
        _ => None,
    }
}

/// Translate a front-end level into the backend severity.
///
/// The table is exact-match: only the predefined constants are recognized.
/// Anything else lands on [`Severity::Error`] so unknown or future levels
/// stay visible in output instead of being dropped, at the cost of possibly
/// misclassifying their severity.
pub fn map_level(level: Level) -> Severity {
    match level {
        Level::DEBUG => Severity::Debug,
        Level::INFO => Severity::Info,
        Level::WARN => Severity::Warn,
        Level::ERROR => Severity::Error,
        Level::DPANIC => Severity::DPanic,
        Level::PANIC => Severity::Panic,
        Level::FATAL => Severity::Fatal,
        _ => Severity::Error,
    }
}
