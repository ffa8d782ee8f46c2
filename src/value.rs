//! Script values produced while evaluating view programs.

use crate::interpreter::{Interpreter, Scope};
use crate::ir::FunctionDef;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type PropertyMap = IndexMap<String, Value>;
pub type NativeCall = dyn Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, Exception>;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<PropertyMap>>),
    Function(Rc<Function>),
}

pub enum Function {
    Closure {
        def: Rc<FunctionDef>,
        env: Scope,
    },
    Native {
        name: String,
        call: Rc<NativeCall>,
        /// Static members, e.g. `Array.isArray`.
        statics: PropertyMap,
    },
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Closure { def, .. } => def.name.as_deref().unwrap_or(""),
            Function::Native { name, .. } => name,
        }
    }
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::String(Rc::from(s))
    }

    /// One single-unit string per UTF-16 code unit of `s`, the way string
    /// indexing sees it. Unpaired surrogates decode as U+FFFD.
    pub fn string_units(s: &str) -> Vec<Value> {
        s.encode_utf16()
            .map(|unit| Value::string(&String::from_utf16_lossy(&[unit])))
            .collect()
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(map: PropertyMap) -> Self {
        Value::Object(Rc::new(RefCell::new(map)))
    }

    pub fn native<F>(name: &str, call: F) -> Self
    where
        F: Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, Exception> + 'static,
    {
        Self::native_with_statics(name, call, PropertyMap::new())
    }

    pub fn native_with_statics<F>(name: &str, call: F, statics: PropertyMap) -> Self
    where
        F: Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, Exception> + 'static,
    {
        Value::Function(Rc::new(Function::Native {
            name: name.to_string(),
            call: Rc::new(call),
            statics,
        }))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

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
            Value::String(s) => string_to_number(s),
            Value::Array(items) => {
                let items = items.borrow();
                match items.len() {
                    0 => 0.0,
                    1 => items[0].to_number(),
                    _ => f64::NAN,
                }
            }
            _ => f64::NAN,
        }
    }

    /// `ToString` as the script sees it.
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.to_string(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(|v| {
                    if v.is_nullish() {
                        String::new()
                    } else {
                        v.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(map) => {
                let map = map.borrow();
                match (map.get("name"), map.get("message")) {
                    (Some(Value::String(name)), Some(message)) if name.ends_with("Error") => {
                        format!("{}: {}", name, message.to_js_string())
                    }
                    _ => "[object Object]".to_string(),
                }
            }
            Value::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::String(_))
            | (Value::String(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            (Value::Array(_) | Value::Object(_), Value::String(s))
            | (Value::String(s), Value::Array(_) | Value::Object(_)) => {
                let object = if matches!(self, Value::String(_)) { other } else { self };
                object.to_js_string() == **s
            }
            _ => self.strict_equals(other),
        }
    }

    /// SameValueZero, used by `includes`.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // JSON INTEROP
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::string(s),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// `JSON.stringify` semantics: functions and `undefined` are dropped from
    /// objects and become `null` inside arrays. Returns `None` at top level
    /// for values JSON cannot represent.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        self.to_json_inner(0)
    }

    fn to_json_inner(&self, depth: usize) -> Option<serde_json::Value> {
        // Cyclic graphs stop here instead of overflowing the stack.
        if depth > 512 {
            return Some(serde_json::Value::Null);
        }
        match self {
            Value::Undefined | Value::Function(_) => None,
            Value::Null => Some(serde_json::Value::Null),
            Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Value::Number(n) => Some(number_to_json(*n)),
            Value::String(s) => Some(serde_json::Value::String(s.to_string())),
            Value::Array(items) => Some(serde_json::Value::Array(
                items
                    .borrow()
                    .iter()
                    .map(|v| v.to_json_inner(depth + 1).unwrap_or(serde_json::Value::Null))
                    .collect(),
            )),
            Value::Object(map) => Some(serde_json::Value::Object(
                map.borrow()
                    .iter()
                    .filter_map(|(k, v)| v.to_json_inner(depth + 1).map(|j| (k.clone(), j)))
                    .collect(),
            )),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Function(func) => write!(f, "[Function {}]", func.name()),
            Value::Array(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Object(map) => f.debug_map().entries(map.borrow().iter()).finish(),
            other => f.write_str(&other.to_js_string()),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Longest string the evaluator will build, in UTF-16 code units.
pub const MAX_STRING_LENGTH: usize = 1 << 29;

/// Fails with `RangeError` when a result of `len` code units would be too long.
pub fn check_string_length(len: f64) -> Result<(), Exception> {
    if len > MAX_STRING_LENGTH as f64 {
        return Err(Exception::range_error("Invalid string length"));
    }
    Ok(())
}

pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        let sign = if n < 0.0 { "-" } else { "" };
        format!("{}{}", sign, format_finite(n.abs()))
    }
}

/// Number-to-string for a positive finite value: the shortest digits that
/// round-trip, laid out in plain notation for exponents in `-7..21` and in
/// `d.ddde+N` notation otherwise.
fn format_finite(n: f64) -> String {
    let scientific = format!("{:e}", n);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    // Position of the decimal point relative to the first digit.
    let point = exponent.parse::<i32>().unwrap_or(0) + 1;

    if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let e = point - 1;
        let sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, e.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, e.abs())
        }
    }
}

pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => {
            f64::NAN
        }
        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXCEPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// A value thrown by the script, or an error raised by the evaluator on its behalf.
#[derive(Clone, Debug)]
pub struct Exception {
    pub value: Value,
}

impl Exception {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn error(name: &str, message: impl Into<String>) -> Self {
        Self::new(error_object(name, &message.into()))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::error("TypeError", message)
    }

    pub fn reference_error(message: impl Into<String>) -> Self {
        Self::error("ReferenceError", message)
    }

    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::error("SyntaxError", message)
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        Self::error("RangeError", message)
    }

    /// The `message` of an error object, or the thrown value as a string.
    pub fn message(&self) -> String {
        if let Value::Object(map) = &self.value {
            if let Some(message) = map.borrow().get("message") {
                return message.to_js_string();
            }
        }
        self.value.to_js_string()
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

pub fn error_object(name: &str, message: &str) -> Value {
    let mut map = PropertyMap::new();
    map.insert("name".to_string(), Value::string(name));
    map.insert("message".to_string(), Value::string(message));
    Value::object(map)
}
