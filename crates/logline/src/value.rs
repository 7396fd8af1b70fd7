//! Log arguments.
//!
//! [`LogValue`] is the argument model for extra values attached to a log
//! line. Objects are shared handles ([`ObjectRef`]) so argument graphs can be
//! built incrementally and may even refer back to themselves; serialization
//! detects such cycles and emits [`CIRCULAR_PLACEHOLDER`] instead of
//! recursing.

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::{Map, Number, Value};
use time::OffsetDateTime;

use crate::format::iso_timestamp;

/// Emitted in place of an object that is already being serialized.
pub const CIRCULAR_PLACEHOLDER: &str = "[Circular]";

/// A single log argument.
#[derive(Debug, Clone)]
pub enum LogValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<LogValue>),
    Object(ObjectRef),
    Error(ErrorValue),
    Date(OffsetDateTime),
    /// A value that could not be represented; holds a type tag.
    Opaque(String),
}

/// Shared, mutable, insertion-ordered map of log values.
#[derive(Clone, Default)]
pub struct ObjectRef(Arc<RwLock<Vec<(String, LogValue)>>>);

impl ObjectRef {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<LogValue>) {
        let key = key.into();
        let value = value.into();
        let Ok(mut entries) = self.0.write() else {
            return;
        };
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => entries.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<LogValue> {
        let entries = self.0.read().ok()?;
        entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().map(|e| e.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both handles point at the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for ObjectRef {
    // Entries may contain this object again.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// An error flattened to name, message and an optional cause chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl ErrorValue {
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Capture a Rust error; the source chain becomes the stack.
    #[must_use]
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {cause}"));
            source = cause.source();
        }

        Self {
            name: "Error".to_string(),
            message: err.to_string(),
            stack: if causes.is_empty() {
                None
            } else {
                Some(causes.join("\n"))
            },
        }
    }
}

impl LogValue {
    /// Serialize any `Serialize` value; failures become an opaque placeholder.
    #[must_use]
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => Self::from(json),
            Err(_) => Self::Opaque(short_type_name::<T>().to_string()),
        }
    }

    /// Build an object argument from key/value pairs.
    #[must_use]
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<LogValue>,
    {
        let object = ObjectRef::new();
        for (k, v) in entries {
            object.insert(k, v);
        }
        Self::Object(object)
    }

    #[must_use]
    pub fn error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::Error(ErrorValue::from_error(err))
    }

    #[must_use]
    pub fn is_plain_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// JSON form with cycle detection. Errors become `{name, message, stack}`
    /// and dates ISO-8601 strings.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut path = Vec::new();
        self.to_json_inner(&mut path)
    }

    fn to_json_inner(&self, path: &mut Vec<usize>) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => {
                Value::Array(items.iter().map(|v| v.to_json_inner(path)).collect())
            }
            Self::Object(object) => {
                let addr = object.addr();
                if path.contains(&addr) {
                    return Value::String(CIRCULAR_PLACEHOLDER.to_string());
                }
                let Ok(entries) = object.0.read() else {
                    return Value::String(opaque_placeholder("Object"));
                };
                path.push(addr);
                let map: Map<String, Value> = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_inner(path)))
                    .collect();
                path.pop();
                Value::Object(map)
            }
            Self::Error(err) => {
                let mut map = Map::new();
                map.insert("name".into(), Value::String(err.name.clone()));
                map.insert("message".into(), Value::String(err.message.clone()));
                map.insert(
                    "stack".into(),
                    err.stack.clone().map_or(Value::Null, Value::String),
                );
                Value::Object(map)
            }
            Self::Date(date) => Value::String(iso_timestamp(*date)),
            Self::Opaque(tag) => Value::String(opaque_placeholder(tag)),
        }
    }

    /// Inline text form used by the human-readable formatter.
    #[must_use]
    pub fn display_inline(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
            Self::Error(err) => err.message.clone(),
            Self::Date(date) => iso_timestamp(*date),
            Self::Opaque(tag) => opaque_placeholder(tag),
            Self::Array(_) | Self::Object(_) => safe_json_stringify(self),
        }
    }
}

/// Serialize to a JSON string. Never fails: cycles become
/// [`CIRCULAR_PLACEHOLDER`] and anything unserializable an `[Object: tag]`
/// placeholder.
#[must_use]
pub fn safe_json_stringify(value: &LogValue) -> String {
    serde_json::to_string(&value.to_json()).unwrap_or_else(|_| opaque_placeholder("Object"))
}

pub(crate) fn opaque_placeholder(tag: &str) -> String {
    format!("[Object: {tag}]")
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl From<Value> for LogValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::object(map),
        }
    }
}

impl From<&str> for LogValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for LogValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for LogValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for LogValue {
                fn from(value: $ty) -> Self {
                    Self::Number(Number::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f64> for LogValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<ErrorValue> for LogValue {
    fn from(value: ErrorValue) -> Self {
        Self::Error(value)
    }
}

impl From<OffsetDateTime> for LogValue {
    fn from(value: OffsetDateTime) -> Self {
        Self::Date(value)
    }
}

impl From<ObjectRef> for LogValue {
    fn from(value: ObjectRef) -> Self {
        Self::Object(value)
    }
}

impl From<Vec<LogValue>> for LogValue {
    fn from(value: Vec<LogValue>) -> Self {
        Self::Array(value)
    }
}

impl<T: Into<LogValue>> From<Option<T>> for LogValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
