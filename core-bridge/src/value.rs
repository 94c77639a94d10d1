//! Argument kind normalization.
//!
//! Script callers collapse every numeric width into one JSON number, so the
//! kinds used for method resolution collapse them as well. Values themselves
//! are never converted here; only their kinds are.

use serde_json::Value;
use std::fmt;

/// Kind of an argument or handler parameter.
///
/// The numeric widths exist so parameter types can describe themselves
/// precisely; [`ValueKind::normalized`] erases them before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt64,
    Float32,
    Float64,
    /// Canonical numeric kind
    Number,
    Boolean,
    String,
    Object,
    Array,
    Null,
}

impl ValueKind {
    /// Kind of a JSON value as received from the script side.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(n) if n.is_i64() => ValueKind::Int64,
            Value::Number(n) if n.is_u64() => ValueKind::UInt64,
            Value::Number(_) => ValueKind::Float64,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Erases numeric width. Idempotent.
    pub fn normalized(self) -> Self {
        if self.is_numeric() {
            ValueKind::Number
        } else {
            self
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueKind::Int8
                | ValueKind::Int16
                | ValueKind::Int32
                | ValueKind::Int64
                | ValueKind::UInt64
                | ValueKind::Float32
                | ValueKind::Float64
                | ValueKind::Number
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Int8 => "int8",
            ValueKind::Int16 => "int16",
            ValueKind::Int32 => "int32",
            ValueKind::Int64 => "int64",
            ValueKind::UInt64 => "uint64",
            ValueKind::Float32 => "float32",
            ValueKind::Float64 => "float64",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::String => "string",
            ValueKind::Object => "object",
            ValueKind::Array => "array",
            ValueKind::Null => "null",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces the canonical kind list used to resolve a call.
pub fn normalize_args(args: &[Value]) -> Vec<ValueKind> {
    args.iter().map(|v| ValueKind::of(v).normalized()).collect()
}

/// Renders a kind list as `(number, string)` for diagnostics.
pub fn format_signature(kinds: &[ValueKind]) -> String {
    let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
    format!("({})", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALL_KINDS: [ValueKind; 13] = [
        ValueKind::Int8,
        ValueKind::Int16,
        ValueKind::Int32,
        ValueKind::Int64,
        ValueKind::UInt64,
        ValueKind::Float32,
        ValueKind::Float64,
        ValueKind::Number,
        ValueKind::Boolean,
        ValueKind::String,
        ValueKind::Object,
        ValueKind::Array,
        ValueKind::Null,
    ];

    #[test]
    fn test_numeric_widths_erase_to_number() {
        for kind in ALL_KINDS.iter().filter(|k| k.is_numeric()) {
            assert_eq!(kind.normalized(), ValueKind::Float64.normalized());
        }
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for kind in ALL_KINDS {
            assert_eq!(kind.normalized().normalized(), kind.normalized());
        }
    }

    #[test]
    fn test_non_numeric_kinds_are_kept() {
        assert_eq!(ValueKind::Boolean.normalized(), ValueKind::Boolean);
        assert_eq!(ValueKind::String.normalized(), ValueKind::String);
        assert_eq!(ValueKind::Object.normalized(), ValueKind::Object);
        assert_eq!(ValueKind::Array.normalized(), ValueKind::Array);
    }

    #[test]
    fn test_kind_of_json_values() {
        assert_eq!(ValueKind::of(&json!(-3)), ValueKind::Int64);
        assert_eq!(ValueKind::of(&json!(u64::MAX)), ValueKind::UInt64);
        assert_eq!(ValueKind::of(&json!(1.5)), ValueKind::Float64);
        assert_eq!(ValueKind::of(&json!(true)), ValueKind::Boolean);
        assert_eq!(ValueKind::of(&json!({"a": 1})), ValueKind::Object);
        assert_eq!(ValueKind::of(&json!(null)), ValueKind::Null);
    }

    #[test]
    fn test_normalize_args() {
        let args = vec![json!(1), json!(2.5), json!("x"), json!([1]), json!(false)];
        assert_eq!(
            normalize_args(&args),
            vec![
                ValueKind::Number,
                ValueKind::Number,
                ValueKind::String,
                ValueKind::Array,
                ValueKind::Boolean,
            ]
        );
        assert_eq!(
            format_signature(&normalize_args(&args)),
            "(number, number, string, array, boolean)"
        );
    }
}
