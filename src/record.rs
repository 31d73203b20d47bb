use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};

use crate::level::Level;

/// Typed value carried by an [`Attr`].
///
/// `Group` is the one recursive shape in the model: a named or unnamed
/// ordered collection of child attributes, nestable to arbitrary depth.
/// `Deferred` defers construction of a value until the record is actually
/// handled; it is resolved during flattening, never mapped directly.
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Duration(Duration),
    Float64(f64),
    Int64(i64),
    String(String),
    Time(DateTime<FixedOffset>),
    Uint64(u64),
    Any(AnyValue),
    Group(Vec<Attr>),
    Deferred(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Duration(v) => f.debug_tuple("Duration").field(v).finish(),
            Value::Float64(v) => f.debug_tuple("Float64").field(v).finish(),
            Value::Int64(v) => f.debug_tuple("Int64").field(v).finish(),
            Value::String(v) => f.debug_tuple("String").field(v).finish(),
            Value::Time(v) => f.debug_tuple("Time").field(v).finish(),
            Value::Uint64(v) => f.debug_tuple("Uint64").field(v).finish(),
            Value::Any(v) => f.debug_tuple("Any").field(v).finish(),
            Value::Group(v) => f.debug_tuple("Group").field(v).finish(),
            Value::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Arbitrary value with its capability resolved up front.
///
/// The closed set mirrors what the backend can do with an opaque value:
/// render it to a string, treat it as an error description, or fall back to
/// the reflective debug representation.
#[derive(Clone)]
pub enum AnyValue {
    Display(Arc<dyn fmt::Display + Send + Sync>),
    Error(Arc<dyn std::error::Error + Send + Sync>),
    Opaque(Arc<dyn fmt::Debug + Send + Sync>),
}

impl AnyValue {
    pub fn display(value: impl fmt::Display + Send + Sync + 'static) -> AnyValue {
        AnyValue::Display(Arc::new(value))
    }

    pub fn error(value: impl std::error::Error + Send + Sync + 'static) -> AnyValue {
        AnyValue::Error(Arc::new(value))
    }

    pub fn opaque(value: impl fmt::Debug + Send + Sync + 'static) -> AnyValue {
        AnyValue::Opaque(Arc::new(value))
    }
}

impl fmt::Debug for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyValue::Display(v) => write!(f, "{}", v),
            AnyValue::Error(v) => write!(f, "{}", v),
            AnyValue::Opaque(v) => v.fmt(f),
        }
    }
}

/// Key/value pair attached to a [`Record`].
#[derive(Debug, Clone)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: Value) -> Attr {
        Attr { key: key.into(), value }
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Attr {
        Attr::new(key, Value::Bool(value))
    }

    pub fn duration(key: impl Into<String>, value: Duration) -> Attr {
        Attr::new(key, Value::Duration(value))
    }

    pub fn float64(key: impl Into<String>, value: f64) -> Attr {
        Attr::new(key, Value::Float64(value))
    }

    pub fn int64(key: impl Into<String>, value: i64) -> Attr {
        Attr::new(key, Value::Int64(value))
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Attr {
        Attr::new(key, Value::String(value.into()))
    }

    pub fn time(key: impl Into<String>, value: DateTime<FixedOffset>) -> Attr {
        Attr::new(key, Value::Time(value))
    }

    pub fn uint64(key: impl Into<String>, value: u64) -> Attr {
        Attr::new(key, Value::Uint64(value))
    }

    pub fn any(key: impl Into<String>, value: AnyValue) -> Attr {
        Attr::new(key, Value::Any(value))
    }

    /// Named group; an empty key makes the group contribute no prefix
    /// segment when flattened.
    pub fn group(key: impl Into<String>, children: Vec<Attr>) -> Attr {
        Attr::new(key, Value::Group(children))
    }

    pub fn deferred(key: impl Into<String>, thunk: impl Fn() -> Value + Send + Sync + 'static) -> Attr {
        Attr::new(key, Value::Deferred(Arc::new(thunk)))
    }
}

/// One structured log event produced by the front-end.
///
/// Immutable once constructed; builder methods consume and return the
/// record. The call-site is the raw location token captured where the log
/// call was made, possibly absent.
#[derive(Debug, Clone)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub message: String,
    pub level: Level,
    pub call_site: Option<&'static Location<'static>>,
    attrs: Vec<Attr>,
}

impl Record {
    pub fn new(level: Level, message: impl Into<String>) -> Record {
        Record {
            time: Utc::now(),
            message: message.into(),
            level,
            call_site: None,
            attrs: Vec::new(),
        }
    }

    /// Capture the caller's location as this record's call-site.
    #[track_caller]
    pub fn with_call_site(mut self) -> Record {
        self.call_site = Some(Location::caller());
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Record {
        self.time = time;
        self
    }

    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Record {
        self.attrs.extend(attrs);
        self
    }

    /// Ordered attribute iterator.
    pub fn attrs(&self) -> impl Iterator<Item = &Attr> {
        self.attrs.iter()
    }
}
