//! The value model shared by every stage of the pipeline.

use std::fmt;

/// A matched command line value.
///
/// The value can be a string, a boolean, a count or other integer, a float
/// (from defaults only) or a heterogeneous list of values.
///
/// The various `as_{bool,count,str,vec}` methods provide convenient access
/// to values without destructuring manually.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A positional or option argument.
    Str(String),

    /// A boolean value from a flag that has no argument.
    ///
    /// The presence of a flag means `true`; flags that were never seen and
    /// have no fallback are absent from the output map entirely.
    Bool(bool),

    /// The number of occurrences of a repeated flag or command.
    Int(i64),

    /// A numeric value (only ever produced by deserialization helpers).
    Float(f64),

    /// A list of values.
    ///
    /// Lists may be heterogeneous; a repeated option that slurps the rest of
    /// the command line holds its tokens here verbatim.
    List(Vec<Value>),
}

impl Value {
    /// Returns the value as a bool.
    ///
    /// Counts are `false` if `0` and `true` otherwise. Strings are `true`
    /// when non-empty. Lists are `true` when non-empty.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Str(ref s) => !s.is_empty(),
            Value::Bool(b) => b,
            Value::Int(n) => n != 0,
            Value::Float(f) => f != 0.0,
            Value::List(ref vs) => !vs.is_empty(),
        }
    }

    /// Returns the value as a count of the number of times it occurred.
    ///
    /// Booleans are `1` if `true` and `0` otherwise. Strings are `1` when
    /// non-empty. Lists correspond to their length.
    pub fn as_count(&self) -> i64 {
        match *self {
            Value::Str(ref s) => {
                if s.is_empty() {
                    0
                } else {
                    1
                }
            }
            Value::Bool(b) => {
                if b {
                    1
                } else {
                    0
                }
            }
            Value::Int(n) => n,
            Value::Float(f) => f as i64,
            Value::List(ref vs) => vs.len() as i64,
        }
    }

    /// Returns the value as a string.
    ///
    /// All values return an empty string except for a non-empty `Str`.
    pub fn as_str(&self) -> &str {
        match *self {
            Value::Str(ref s) => s,
            _ => "",
        }
    }

    /// Returns the value as a list of strings.
    ///
    /// Booleans and counts correspond to an empty list. A string corresponds
    /// to a list of length `1`. Non-string list elements render as `""`.
    pub fn as_vec(&self) -> Vec<&str> {
        match *self {
            Value::Str(ref s) => vec![s],
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => vec![],
            Value::List(ref vs) => vs.iter().map(Value::as_str).collect(),
        }
    }

    pub(crate) fn is_bool(&self) -> bool {
        matches!(*self, Value::Bool(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Value::Str(ref s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::List(ref vs) => {
                write!(f, "[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Where a value came from.
///
/// When several sources provide a value for the same key, the one with the
/// maximum origin wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
    /// No source at all (filtered out before the output map is built).
    Empty,
    /// A `[default: ...]` tag in an option description.
    Default,
    /// An `[env: VAR]` tag resolved against the environment.
    Environment,
    /// The command line itself.
    Argv,
}

/// A value annotated with its origin.
#[derive(Clone, Debug, PartialEq)]
pub struct RichValue {
    pub origin: Origin,
    pub value: Value,
}

impl RichValue {
    pub fn new(origin: Origin, value: Value) -> RichValue {
        RichValue { origin, value }
    }

    /// A value read off the command line.
    pub fn from_argv(value: Value) -> RichValue {
        RichValue::new(Origin::Argv, value)
    }
}

#[cfg(test)]
mod tests {
    use super::{Origin, Value};

    #[test]
    fn origin_precedence_is_total() {
        assert!(Origin::Empty < Origin::Default);
        assert!(Origin::Default < Origin::Environment);
        assert!(Origin::Environment < Origin::Argv);
    }

    #[test]
    fn count_accessor() {
        assert_eq!(Value::Bool(true).as_count(), 1);
        assert_eq!(Value::Int(3).as_count(), 3);
        assert_eq!(
            Value::List(vec![Value::Bool(true), Value::Bool(true)]).as_count(),
            2
        );
        assert_eq!(Value::Str("".into()).as_count(), 0);
    }
}
