//! Logged statements and the parameter values bound to them.

use std::fmt;
use std::time::Duration;

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::source::QuerySource;

/// Bound parameter values of one statement, in binding order.
pub type Params = SmallVec<[ParamValue; 8]>;

/// Parameter type descriptors, parallel to [`Params`].
pub type ParamTypes = SmallVec<[ParamType; 8]>;

/// Fractional milliseconds of a duration.
#[inline]
pub fn duration_ms(elapsed: Duration) -> f64 {
    elapsed.as_nanos() as f64 / 1_000_000.0
}

/// An owned parameter value captured at the time a statement was issued.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParamValue {
    /// NULL value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (i64)
    Integer(i64),
    /// Real value (f64)
    Real(f64),
    /// Text value
    Text(CompactString),
    /// Blob value
    Blob(Vec<u8>),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => f.write_str("NULL"),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Integer(i) => write!(f, "{i}"),
            ParamValue::Real(r) => write!(f, "{r}"),
            ParamValue::Text(s) => write!(f, "'{s}'"),
            ParamValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

macro_rules! param_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    ParamValue::Integer(i64::from(value))
                }
            }
        )*
    };
}

param_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Real(f64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Real(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(CompactString::from(value))
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(CompactString::from(value))
    }
}

impl From<&[u8]> for ParamValue {
    fn from(value: &[u8]) -> Self {
        ParamValue::Blob(value.to_vec())
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(value: Vec<u8>) -> Self {
        ParamValue::Blob(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

#[cfg(feature = "rusqlite")]
impl rusqlite::ToSql for ParamValue {
    fn to_sql(&self) -> ::rusqlite::Result<::rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value, ValueRef};

        Ok(match self {
            ParamValue::Null => ToSqlOutput::Owned(Value::Null),
            ParamValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            ParamValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            ParamValue::Real(r) => ToSqlOutput::Owned(Value::Real(*r)),
            ParamValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            ParamValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b.as_ref())),
        })
    }
}

/// Driver-specific name of a parameter's type, e.g. `"integer"` or `"text"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ParamType(pub CompactString);

impl ParamType {
    pub fn new(name: &str) -> Self {
        Self(CompactString::from(name))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ParamType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded statement execution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct QueryLogEntry {
    pub sql: String,
    pub params: Option<Params>,
    pub types: Option<ParamTypes>,
    /// Zero until the matching `stop_query`.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "executionMS", serialize_with = "serialize_ms")
    )]
    pub execution: Duration,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "querySource", skip_serializing_if = "Option::is_none")
    )]
    pub query_source: Option<QuerySource>,
}

impl QueryLogEntry {
    pub fn new(sql: &str, params: Option<&[ParamValue]>, types: Option<&[ParamType]>) -> Self {
        Self {
            sql: sql.to_owned(),
            params: params.map(|p| p.iter().cloned().collect()),
            types: types.map(|t| t.iter().cloned().collect()),
            execution: Duration::ZERO,
            query_source: None,
        }
    }

    pub fn with_source(mut self, source: QuerySource) -> Self {
        self.query_source = Some(source);
        self
    }

    /// Elapsed execution time in fractional milliseconds.
    pub fn execution_ms(&self) -> f64 {
        duration_ms(self.execution)
    }
}

#[cfg(feature = "serde")]
fn serialize_ms<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration_ms(*elapsed))
}
