//! Dynamic values.
//!
//! `Value` is the type that flows between the data boundary, the reactive
//! runtime and the expression evaluator. It mirrors the JSON data model with
//! two extensions:
//!
//! - `Undefined`, distinct from `Null`, so "no such member" reads stay
//!   distinguishable from an explicit null in the data.
//! - Containers are tracked handles ([`ReactiveObject`], [`ReactiveList`])
//!   rather than plain maps/vectors, so reads and writes through them
//!   participate in dependency tracking.
//!
//! Plain data enters as `serde_json::Value` and is converted at the boundary;
//! nested containers stay in raw JSON form until first read (see [`Slot`]).

use std::fmt;

use serde::{Serialize, Serializer};

use crate::reactive::{ReactiveList, ReactiveObject};

/// A dynamic value: a JSON scalar, `Undefined`, or a tracked container.
///
/// Cloning is cheap: container variants clone a shared handle, not the data.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Object(ReactiveObject),
    List(ReactiveList),
}

impl Value {
    /// Name of this value's type, as used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::List(_) => "list",
        }
    }

    /// Truthiness with template-friendly semantics: `false`, `0`, `NaN`,
    /// empty strings, `null` and `undefined` are false; containers are true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) | Value::List(_) => true,
        }
    }

    /// Numeric coercion. Strings parse (empty string is 0), `null` is 0,
    /// `undefined` and containers are NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Object(_) | Value::List(_) => f64::NAN,
        }
    }

    /// Identity-flavoured equality, used to suppress no-op writes.
    ///
    /// NaN equals NaN here (a write of NaN over NaN must not notify), and
    /// containers compare by handle identity, never structurally.
    pub fn value_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.id() == b.id(),
            (Value::List(a), Value::List(b)) => a.id() == b.id(),
            _ => false,
        }
    }

    /// Loose equality for the `==` / `!=` expression operators.
    ///
    /// `null` and `undefined` equal each other; mixed scalar comparisons
    /// coerce to numbers; containers compare by identity.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Object(_) | Value::List(_), _) | (_, Value::Object(_) | Value::List(_)) => {
                self.value_eq(other)
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (
                Value::Bool(_) | Value::Number(_) | Value::Str(_),
                Value::Bool(_) | Value::Number(_) | Value::Str(_),
            ) => self.to_number() == other.to_number(),
            _ => false,
        }
    }

    /// Ordering for `<`, `<=`, `>`, `>=`. Two strings order
    /// lexicographically; anything else coerces to numbers. `None` when a
    /// side coerces to NaN (all comparisons against it are false).
    pub fn compare(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => self.to_number().partial_cmp(&other.to_number()),
        }
    }

    /// The `+` operator: concatenation when either side is a string,
    /// numeric addition otherwise.
    pub fn add(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Value::Str(format!("{self}{other}")),
            _ => Value::Number(self.to_number() + other.to_number()),
        }
    }

    /// Snapshot this value as plain JSON. Reads are untracked: taking a
    /// snapshot must not register dependencies. `Undefined` flattens to
    /// JSON null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Object(object) => object.to_json(),
            Value::List(list) => list.to_json(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.value_eq(other)
    }
}

impl fmt::Display for Value {
    /// Template rendering: `undefined`/`null` print empty, integral numbers
    /// print without a fractional part, lists join their items with commas.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined | Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() <= 9_007_199_254_740_992.0 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Str(s) => f.write_str(s),
            Value::Object(_) => f.write_str("[object]"),
            Value::List(list) => {
                for (i, item) in list.to_vec_untracked().iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b:?}"),
            Value::Number(n) => write!(f, "{n:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Object(object) => write!(f, "Object(#{})", object.id().raw()),
            Value::List(list) => write!(f, "List(#{})", list.id().raw()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<serde_json::Value> for Value {
    /// Conversion is the wrapping boundary: containers become tracked
    /// handles. Only the top level is wrapped eagerly; children wrap lazily
    /// on first read.
    fn from(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => Value::List(ReactiveList::from_raw(items)),
            serde_json::Value::Object(map) => Value::Object(ReactiveObject::from_raw(map)),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<ReactiveObject> for Value {
    fn from(object: ReactiveObject) -> Self {
        Value::Object(object)
    }
}

impl From<ReactiveList> for Value {
    fn from(list: ReactiveList) -> Self {
        Value::List(list)
    }
}

/// Storage cell inside a tracked container.
///
/// Children start `Raw` (plain JSON, exactly as they arrived) and are
/// promoted to `Live` on first read, so deep reactivity is paid for on
/// demand. Once promoted, repeated reads return the same wrapper identity.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Raw(serde_json::Value),
    Live(Value),
}

impl Slot {
    /// Promote to a live value in place and return it.
    pub(crate) fn live(&mut self) -> &Value {
        if let Slot::Raw(raw) = self {
            let raw = std::mem::replace(raw, serde_json::Value::Null);
            *self = Slot::Live(Value::from(raw));
        }
        match self {
            Slot::Live(value) => value,
            Slot::Raw(_) => unreachable!("slot was just promoted"),
        }
    }

    /// Snapshot without promoting.
    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Slot::Raw(raw) => raw.clone(),
            Slot::Live(value) => value.to_json(),
        }
    }
}
