//! # Method Table
//!
//! Explicit registration of the operations a handler set exposes.
//!
//! ## Overview
//!
//! Each entry maps an operation name and a parameter tuple to a closure. The
//! parameter tuple describes its own signature through [`FromArgs`], so
//! resolution is a table lookup over normalized argument kinds:
//!
//! - arity must match exactly
//! - each argument kind must be compatible with its parameter
//! - the first matching registration wins
//!
//! Handlers receive the original JSON values decoded into their parameter
//! types, never the normalized kinds.

use crate::context::Invocation;
use crate::value::ValueKind;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Opaque structured argument.
pub type JsonObject = serde_json::Map<String, Value>;

/// An object argument decoded into a typed structure via serde.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// A single handler parameter type.
pub trait Param: Sized {
    /// Kind declared by this parameter.
    const KIND: ValueKind;

    /// Whether an argument of the given normalized kind can bind here.
    fn accepts(kind: ValueKind) -> bool {
        kind.normalized() == Self::KIND.normalized()
    }

    fn describe() -> String {
        Self::KIND.normalized().to_string()
    }

    fn from_value(value: &Value) -> Result<Self, String>;
}

fn expected(kind: &str, value: &Value) -> String {
    format!("expected {}, got {}", kind, ValueKind::of(value).normalized())
}

fn number(value: &Value) -> Result<f64, String> {
    value.as_f64().ok_or_else(|| expected("number", value))
}

impl Param for f64 {
    const KIND: ValueKind = ValueKind::Float64;

    fn from_value(value: &Value) -> Result<Self, String> {
        number(value)
    }
}

impl Param for f32 {
    const KIND: ValueKind = ValueKind::Float32;

    fn from_value(value: &Value) -> Result<Self, String> {
        number(value).map(|n| n as f32)
    }
}

// Integer parameters truncate toward zero, as script numbers carry no width.
impl Param for i32 {
    const KIND: ValueKind = ValueKind::Int32;

    fn from_value(value: &Value) -> Result<Self, String> {
        let n = number(value)?.trunc();
        if n < i32::MIN as f64 || n > i32::MAX as f64 {
            return Err(format!("{} does not fit in int32", n));
        }
        Ok(n as i32)
    }
}

impl Param for i64 {
    const KIND: ValueKind = ValueKind::Int64;

    fn from_value(value: &Value) -> Result<Self, String> {
        if let Some(n) = value.as_i64() {
            return Ok(n);
        }
        let n = number(value)?.trunc();
        // i64::MAX rounds up to 2^63 as f64, one past the largest i64.
        if !n.is_finite() || n < i64::MIN as f64 || n >= i64::MAX as f64 {
            return Err(format!("{} does not fit in int64", n));
        }
        Ok(n as i64)
    }
}

impl Param for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    fn from_value(value: &Value) -> Result<Self, String> {
        value.as_bool().ok_or_else(|| expected("boolean", value))
    }
}

impl Param for String {
    const KIND: ValueKind = ValueKind::String;

    fn from_value(value: &Value) -> Result<Self, String> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| expected("string", value))
    }
}

impl Param for JsonObject {
    const KIND: ValueKind = ValueKind::Object;

    fn from_value(value: &Value) -> Result<Self, String> {
        value
            .as_object()
            .cloned()
            .ok_or_else(|| expected("object", value))
    }
}

impl Param for Vec<Value> {
    const KIND: ValueKind = ValueKind::Array;

    fn from_value(value: &Value) -> Result<Self, String> {
        value
            .as_array()
            .cloned()
            .ok_or_else(|| expected("array", value))
    }
}

impl<T: DeserializeOwned> Param for Json<T> {
    const KIND: ValueKind = ValueKind::Object;

    fn from_value(value: &Value) -> Result<Self, String> {
        if !value.is_object() {
            return Err(expected("object", value));
        }
        serde_json::from_value(value.clone())
            .map(Json)
            .map_err(|e| e.to_string())
    }
}

/// Nullable parameter: binds `T` or `null`.
impl<T: Param> Param for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn accepts(kind: ValueKind) -> bool {
        kind == ValueKind::Null || T::accepts(kind)
    }

    fn describe() -> String {
        format!("{}?", T::describe())
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Failure to decode one argument of a resolved call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgError {
    pub index: usize,
    pub reason: String,
}

/// A full parameter list, implemented for tuples of [`Param`].
pub trait FromArgs: Sized {
    fn arity() -> usize;

    fn signature() -> String;

    fn accepts(kinds: &[ValueKind]) -> bool;

    fn from_args(args: &[Value]) -> Result<Self, ArgError>;
}

macro_rules! impl_from_args {
    ($count:expr; $($name:ident : $idx:tt),*) => {
        impl<$($name: Param),*> FromArgs for ($($name,)*) {
            fn arity() -> usize {
                $count
            }

            fn signature() -> String {
                let parts: Vec<String> = vec![$($name::describe()),*];
                format!("({})", parts.join(", "))
            }

            #[allow(unused_variables)]
            fn accepts(kinds: &[ValueKind]) -> bool {
                kinds.len() == $count $(&& $name::accepts(kinds[$idx]))*
            }

            #[allow(unused_variables)]
            fn from_args(args: &[Value]) -> Result<Self, ArgError> {
                if args.len() != $count {
                    return Err(ArgError {
                        index: args.len().min($count),
                        reason: format!("expected {} arguments, got {}", $count, args.len()),
                    });
                }
                Ok(($(
                    $name::from_value(&args[$idx])
                        .map_err(|reason| ArgError { index: $idx, reason })?,
                )*))
            }
        }
    };
}

impl_from_args!(0;);
impl_from_args!(1; A: 0);
impl_from_args!(2; A: 0, B: 1);
impl_from_args!(3; A: 0, B: 1, C: 2);
impl_from_args!(4; A: 0, B: 1, C: 2, D: 3);
impl_from_args!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_from_args!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_from_args!(7; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_from_args!(8; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

/// Outcome of running a resolved entry.
pub(crate) enum CallOutcome {
    Completed(anyhow::Result<()>),
    BadArgument(ArgError),
}

type Thunk<H> = Box<dyn Fn(&mut H, &Invocation<'_>, &[Value]) -> CallOutcome + Send + Sync>;

pub struct MethodEntry<H> {
    signature: String,
    accepts: fn(&[ValueKind]) -> bool,
    thunk: Thunk<H>,
}

impl<H> MethodEntry<H> {
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub(crate) fn call(&self, handler: &mut H, call: &Invocation<'_>, args: &[Value]) -> CallOutcome {
        (self.thunk)(handler, call, args)
    }
}

impl<H> fmt::Debug for MethodEntry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("signature", &self.signature)
            .finish()
    }
}

/// Registration table of one handler set type.
pub struct MethodTable<H> {
    entries: HashMap<String, Vec<MethodEntry<H>>>,
}

impl<H> Default for MethodTable<H> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<H> fmt::Debug for MethodTable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTable")
            .field("signatures", &self.signatures())
            .finish()
    }
}

impl<H> MethodTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name` with the signature of `A`.
    ///
    /// Overloads are tried in registration order. Registering the same name
    /// and signature twice replaces the earlier entry.
    pub fn register<A, F>(&mut self, name: &str, handler: F) -> &mut Self
    where
        H: 'static,
        A: FromArgs + 'static,
        F: Fn(&mut H, &Invocation<'_>, A) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let entry = MethodEntry {
            signature: A::signature(),
            accepts: A::accepts,
            thunk: Box::new(move |target: &mut H, call: &Invocation<'_>, args: &[Value]| {
                match A::from_args(args) {
                    Ok(decoded) => CallOutcome::Completed(handler(target, call, decoded)),
                    Err(e) => CallOutcome::BadArgument(e),
                }
            }),
        };

        let overloads = self.entries.entry(name.to_string()).or_default();
        match overloads
            .iter_mut()
            .find(|existing| existing.signature == entry.signature)
        {
            Some(existing) => {
                warn!(
                    method = name,
                    signature = %entry.signature,
                    "Replacing handler registered with identical signature"
                );
                *existing = entry;
            }
            None => overloads.push(entry),
        }
        self
    }

    /// Finds the first entry whose signature accepts the normalized kinds.
    pub fn resolve(&self, name: &str, kinds: &[ValueKind]) -> Option<&MethodEntry<H>> {
        self.entries
            .get(name)?
            .iter()
            .find(|entry| (entry.accepts)(kinds))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All registered signatures as `name(kind, ...)`, sorted.
    pub fn signatures(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .entries
            .iter()
            .flat_map(|(name, overloads)| {
                overloads
                    .iter()
                    .map(move |entry| format!("{}{}", name, entry.signature))
            })
            .collect();
        all.sort();
        all
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::normalize_args;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    #[test]
    fn test_signature_rendering() {
        assert_eq!(<()>::signature(), "()");
        assert_eq!(
            <(f64, bool, String, JsonObject)>::signature(),
            "(number, boolean, string, object)"
        );
        assert_eq!(<(Option<i32>,)>::signature(), "(number?)");
    }

    #[test]
    fn test_numeric_params_accept_any_width() {
        let kinds = normalize_args(&[json!(1), json!(2.5)]);
        assert!(<(i32, f64)>::accepts(&kinds));
        assert!(<(f32, i64)>::accepts(&kinds));
        assert!(!<(i32,)>::accepts(&kinds));
        assert!(!<(String, f64)>::accepts(&kinds));
    }

    #[test]
    fn test_decode_values() {
        let args = vec![json!(7.9), json!(true), json!("s"), json!({"ok": true})];
        let (n, b, s, o) = <(i32, bool, String, JsonObject)>::from_args(&args).unwrap();
        assert_eq!(n, 7);
        assert!(b);
        assert_eq!(s, "s");
        assert_eq!(o.get("ok"), Some(&json!(true)));
    }

    #[test]
    fn test_option_param_accepts_null() {
        let kinds = normalize_args(&[json!(null)]);
        assert!(<(Option<String>,)>::accepts(&kinds));
        let (value,) = <(Option<String>,)>::from_args(&[json!(null)]).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_json_param_decodes_struct() {
        #[derive(Deserialize)]
        struct Options {
            ok: bool,
        }

        let (Json(options),) = <(Json<Options>,)>::from_args(&[json!({"ok": true})]).unwrap();
        assert!(options.ok);

        let err = <(Json<Options>,)>::from_args(&[json!({"ok": "yes"})])
            .err()
            .unwrap();
        assert_eq!(err.index, 0);
    }

    #[test]
    fn test_int64_rejects_two_to_the_63() {
        let err = <(i64,)>::from_args(&[json!(9223372036854775808u64)]).err().unwrap();
        assert_eq!(err.index, 0);
        assert!(err.reason.contains("int64"));

        let (n,) = <(i64,)>::from_args(&[json!(i64::MAX)]).unwrap();
        assert_eq!(n, i64::MAX);
    }

    #[test]
    fn test_int32_out_of_range() {
        let err = <(i32,)>::from_args(&[json!(1e12)]).err().unwrap();
        assert!(err.reason.contains("int32"));
    }

    #[test]
    fn test_resolution_by_arity_and_kind() {
        let mut table: MethodTable<Recorder> = MethodTable::new();
        table
            .register("m", |r: &mut Recorder, _call, (n,): (f64,)| {
                r.calls.push(format!("number {}", n));
                Ok(())
            })
            .register("m", |r: &mut Recorder, _call, (s,): (String,)| {
                r.calls.push(format!("string {}", s));
                Ok(())
            });

        assert_eq!(table.len(), 2);
        assert!(table.resolve("m", &normalize_args(&[json!(1)])).is_some());
        assert!(table.resolve("m", &normalize_args(&[json!("x")])).is_some());
        assert!(table.resolve("m", &normalize_args(&[json!(true)])).is_none());
        assert!(table.resolve("m", &[]).is_none());
        assert!(table.resolve("other", &[]).is_none());
    }

    #[test]
    fn test_identical_signature_replaces_entry() {
        let mut table: MethodTable<Recorder> = MethodTable::new();
        table.register("m", |_: &mut Recorder, _call, (): ()| Ok(()));
        table.register("m", |_: &mut Recorder, _call, (): ()| Ok(()));
        assert_eq!(table.len(), 1);
        assert_eq!(table.signatures(), vec!["m()".to_string()]);
    }
}
