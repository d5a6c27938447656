// used for the statement execution bridge
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};

// used for timestamp scalars coming back from the database
use chrono::NaiveDateTime;

// used to print out readable forms of a value
use std::fmt;
// used to indicate that values need to be hashable
use std::hash::{BuildHasherDefault, Hash, Hasher};

use seahash::SeaHasher;
use serde::{Serialize, Serializer};

use crate::error::{Result, RowfoldError};

// All string-keyed maps in the crate (parameter sets, raw rows, record fields)
// hash with seahash rather than the default SipHash.
pub type ColumnHasher = BuildHasherDefault<SeaHasher>;

// ------------- Value -------------
/// A single scalar as it travels between the caller, the assembled query and
/// the raw result rows. Equality and hashing are total: reals compare by bit
/// pattern so values can serve as set members and identity keys.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
    /// Reads a driver column into a `Value`. BLOB columns have no scalar
    /// counterpart here and are rejected.
    pub fn from_sql_ref(column: &str, value: ValueRef<'_>) -> Result<Self> {
        Ok(match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(r) => Self::Real(r),
            ValueRef::Text(t) => Self::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(_) => {
                return Err(RowfoldError::Coercion {
                    column: column.to_string(),
                    message: "BLOB columns are not supported".to_string(),
                });
            }
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (_, _) => false,
        }
    }
}
impl Eq for Value {}
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => 0u8.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Real(r) => r.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
            Self::Boolean(b) => b.hash(state),
            Self::Timestamp(t) => t.hash(state),
        }
    }
}
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Timestamp(t) => write!(f, "{}", t.format(Self::TIMESTAMP_FORMAT)),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}
impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Self::Real(r)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}
impl From<NaiveDateTime> for Value {
    fn from(t: NaiveDateTime) -> Self {
        Self::Timestamp(t)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Self::Integer(i) => ToSqlOutput::from(*i),
            Self::Real(r) => ToSqlOutput::from(*r),
            Self::Text(s) => ToSqlOutput::from(s.as_str()),
            Self::Boolean(b) => ToSqlOutput::from(*b),
            Self::Timestamp(t) => ToSqlOutput::from(t.format(Self::TIMESTAMP_FORMAT).to_string()),
        })
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Real(r) => serializer.serialize_f64(*r),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Timestamp(t) => {
                serializer.serialize_str(&t.format(Self::TIMESTAMP_FORMAT).to_string())
            }
        }
    }
}

// ------------- ScalarType -------------
/// Declared type of a record scalar or CSV-list element. Coercion follows the
/// loose conventions of tabular drivers: integers stand in for booleans,
/// text for numbers, and NULL passes through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScalarType {
    Integer,
    Real,
    Text,
    Boolean,
    Timestamp,
}

impl ScalarType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
        }
    }

    /// Coerces a raw row value into this declared type.
    pub fn coerce(self, column: &str, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let coerced = match (self, value) {
            (Self::Integer, Value::Integer(i)) => Some(Value::Integer(*i)),
            (Self::Integer, Value::Boolean(b)) => Some(Value::Integer(i64::from(*b))),
            // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
            (Self::Integer, Value::Real(r))
                if r.fract() == 0.0 && *r >= i64::MIN as f64 && *r < i64::MAX as f64 =>
            {
                Some(Value::Integer(*r as i64))
            }
            (Self::Integer, Value::Text(s)) => s.parse::<i64>().ok().map(Value::Integer),
            (Self::Real, Value::Real(r)) => Some(Value::Real(*r)),
            (Self::Real, Value::Integer(i)) => Some(Value::Real(*i as f64)),
            (Self::Real, Value::Text(s)) => s.parse::<f64>().ok().map(Value::Real),
            (Self::Text, Value::Text(s)) => Some(Value::Text(s.clone())),
            (Self::Text, Value::Integer(i)) => Some(Value::Text(i.to_string())),
            (Self::Text, Value::Real(r)) => Some(Value::Text(r.to_string())),
            (Self::Text, Value::Boolean(b)) => Some(Value::Text(b.to_string())),
            (Self::Boolean, Value::Boolean(b)) => Some(Value::Boolean(*b)),
            (Self::Boolean, Value::Integer(0)) => Some(Value::Boolean(false)),
            (Self::Boolean, Value::Integer(1)) => Some(Value::Boolean(true)),
            (Self::Boolean, Value::Text(s)) => parse_boolean(s),
            (Self::Timestamp, Value::Timestamp(t)) => Some(Value::Timestamp(*t)),
            (Self::Timestamp, Value::Text(s)) => parse_timestamp(s),
            (_, _) => None,
        };
        coerced.ok_or_else(|| RowfoldError::Coercion {
            column: column.to_string(),
            message: format!("'{}' is not a valid {}", value, self.name()),
        })
    }

    /// Coerces one CSV token. Tokens arrive exactly as split, untrimmed.
    pub fn coerce_token(self, column: &str, token: &str) -> Result<Value> {
        self.coerce(column, &Value::Text(token.to_string()))
    }
}

fn parse_boolean(s: &str) -> Option<Value> {
    match s {
        "true" | "1" => Some(Value::Boolean(true)),
        "false" | "0" => Some(Value::Boolean(false)),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<Value> {
    NaiveDateTime::parse_from_str(s, Value::TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(Value::Timestamp)
}
