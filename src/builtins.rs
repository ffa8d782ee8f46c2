//! Intrinsics available to view programs.
//!
//! Only deterministic facilities are installed: there is no `Math.random`,
//! no `Date`, and no I/O. Prototype methods are resolved by name from the
//! receiver's kind, see [`array_method`], [`string_method`],
//! [`number_method`] and [`object_method`].

use crate::interpreter::{array_index, compare, dense_array_length, to_int32, Interpreter, Scope};
use crate::value::{
    check_string_length, error_object, number_to_string, Exception, PropertyMap, Value,
};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

type NativeResult = Result<Value, Exception>;

pub fn install(scope: &Scope) {
    let globals: Vec<(&str, Value)> = vec![
        ("undefined", Value::Undefined),
        ("NaN", Value::Number(f64::NAN)),
        ("Infinity", Value::Number(f64::INFINITY)),
        ("Math", math_object()),
        ("JSON", json_object()),
        ("String", string_constructor()),
        ("Number", number_constructor()),
        ("Boolean", Value::native("Boolean", |_, _, args| Ok(Value::Bool(arg(args, 0).truthy())))),
        ("Array", array_constructor()),
        ("Object", object_constructor()),
        ("parseInt", Value::native("parseInt", |_, _, args| Ok(parse_int(args)))),
        ("parseFloat", Value::native("parseFloat", |_, _, args| Ok(parse_float(args)))),
        (
            "isNaN",
            Value::native("isNaN", |_, _, args| Ok(Value::Bool(arg(args, 0).to_number().is_nan()))),
        ),
        (
            "isFinite",
            Value::native("isFinite", |_, _, args| {
                Ok(Value::Bool(arg(args, 0).to_number().is_finite()))
            }),
        ),
    ];
    for (name, value) in globals {
        scope.declare(name, value, false);
    }
    for name in ["Error", "TypeError", "RangeError", "SyntaxError", "ReferenceError"] {
        scope.declare(name, error_constructor(name), false);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn statics(entries: Vec<(&str, Value)>) -> PropertyMap {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Resolves a relative index argument (`slice`, `at`, ...) against `len`.
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = value.to_number();
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(len)
    }
}

fn this_array(this: &Value, method: &str) -> Result<Rc<RefCell<Vec<Value>>>, Exception> {
    match this {
        Value::Array(items) => Ok(Rc::clone(items)),
        other => Err(Exception::type_error(format!(
            "Array.prototype.{} called on {}",
            method,
            other.to_js_string()
        ))),
    }
}

/// Strings index by UTF-16 code unit.
fn this_units(this: &Value) -> Vec<u16> {
    this.to_js_string().encode_utf16().collect()
}

fn units_to_value(units: &[u16]) -> Value {
    Value::string(&String::from_utf16_lossy(units))
}

fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn require_function(value: &Value, what: &str) -> Result<(), Exception> {
    match value {
        Value::Function(_) => Ok(()),
        other => Err(Exception::type_error(format!(
            "{} is not a function",
            if what.is_empty() {
                other.to_js_string()
            } else {
                what.to_string()
            }
        ))),
    }
}

/// Calls an array callback with `(item, index, array)`.
fn visit(
    interp: &mut Interpreter,
    callback: &Value,
    item: &Value,
    index: usize,
    array: &Value,
) -> NativeResult {
    interp.call(
        callback,
        Value::Undefined,
        vec![item.clone(), Value::Number(index as f64), array.clone()],
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// GLOBAL OBJECTS
// ═══════════════════════════════════════════════════════════════════════════════

fn math_object() -> Value {
    fn unary(name: &str, f: fn(f64) -> f64) -> (String, Value) {
        (
            name.to_string(),
            Value::native(name, move |_, _, args| Ok(Value::Number(f(arg(args, 0).to_number())))),
        )
    }

    let mut map: PropertyMap = [
        unary("abs", f64::abs),
        unary("floor", f64::floor),
        unary("ceil", f64::ceil),
        unary("sqrt", f64::sqrt),
        unary("trunc", f64::trunc),
        unary("log", f64::ln),
        // JS rounds halves towards +Infinity.
        unary("round", |n| (n + 0.5).floor()),
        unary("sign", |n| {
            if n.is_nan() || n == 0.0 {
                n
            } else {
                n.signum()
            }
        }),
    ]
    .into_iter()
    .collect();

    map.insert(
        "pow".to_string(),
        Value::native("pow", |_, _, args| {
            Ok(Value::Number(arg(args, 0).to_number().powf(arg(args, 1).to_number())))
        }),
    );
    map.insert(
        "min".to_string(),
        Value::native("min", |_, _, args| {
            Ok(Value::Number(args.iter().map(Value::to_number).fold(
                f64::INFINITY,
                |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.min(n) },
            )))
        }),
    );
    map.insert(
        "max".to_string(),
        Value::native("max", |_, _, args| {
            Ok(Value::Number(args.iter().map(Value::to_number).fold(
                f64::NEG_INFINITY,
                |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(n) },
            )))
        }),
    );
    map.insert("PI".to_string(), Value::Number(std::f64::consts::PI));
    map.insert("E".to_string(), Value::Number(std::f64::consts::E));
    Value::object(map)
}

fn json_object() -> Value {
    let stringify = Value::native("stringify", |_, _, args| {
        let Some(json) = arg(args, 0).to_json() else {
            return Ok(Value::Undefined);
        };
        let indent = match arg(args, 2) {
            Value::Number(n) if n >= 1.0 => " ".repeat((n as usize).min(10)),
            Value::String(s) => s.chars().take(10).collect(),
            _ => String::new(),
        };
        let text = if indent.is_empty() {
            serde_json::to_string(&json)
        } else {
            let mut out = Vec::new();
            let written = {
                let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
                let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
                serde::Serialize::serialize(&json, &mut serializer)
            };
            written.map(|_| String::from_utf8_lossy(&out).into_owned())
        };
        text.map(|s| Value::string(&s))
            .map_err(|e| Exception::type_error(e.to_string()))
    });
    let parse = Value::native("parse", |_, _, args| {
        serde_json::from_str::<serde_json::Value>(&arg(args, 0).to_js_string())
            .map(|json| Value::from_json(&json))
            .map_err(|e| Exception::syntax_error(format!("Unexpected token in JSON: {}", e)))
    });
    Value::object(statics(vec![("stringify", stringify), ("parse", parse)]))
}

fn string_constructor() -> Value {
    Value::native("String", |_, _, args| {
        Ok(match args.first() {
            None => Value::string(""),
            Some(value) => Value::string(&value.to_js_string()),
        })
    })
}

fn number_constructor() -> Value {
    let is_finite = Value::native("isFinite", |_, _, args| {
        Ok(Value::Bool(matches!(arg(args, 0), Value::Number(n) if n.is_finite())))
    });
    let is_integer = Value::native("isInteger", |_, _, args| {
        Ok(Value::Bool(
            matches!(arg(args, 0), Value::Number(n) if n.is_finite() && n.fract() == 0.0),
        ))
    });
    Value::native_with_statics(
        "Number",
        |_, _, args| {
            Ok(Value::Number(match args.first() {
                None => 0.0,
                Some(value) => value.to_number(),
            }))
        },
        statics(vec![
            ("isFinite", is_finite),
            ("isInteger", is_integer),
            ("parseFloat", Value::native("parseFloat", |_, _, args| Ok(parse_float(args)))),
            ("parseInt", Value::native("parseInt", |_, _, args| Ok(parse_int(args)))),
            ("MAX_SAFE_INTEGER", Value::Number(9_007_199_254_740_991.0)),
        ]),
    )
}

fn array_constructor() -> Value {
    let is_array = Value::native("isArray", |_, _, args| {
        Ok(Value::Bool(matches!(arg(args, 0), Value::Array(_))))
    });
    let from = Value::native("from", |interp, _, args| {
        let source = arg(args, 0);
        let items = match &source {
            Value::Object(map) => {
                let len = map.borrow().get("length").map(Value::to_number).unwrap_or(0.0);
                let len = if len.is_nan() || len <= 0.0 { 0.0 } else { len.trunc() };
                vec![Value::Undefined; dense_array_length(len)?]
            }
            other => interp.iterate(other)?,
        };
        let mapper = arg(args, 1);
        if matches!(mapper, Value::Undefined) {
            return Ok(Value::array(items));
        }
        require_function(&mapper, "")?;
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            out.push(interp.call(
                &mapper,
                Value::Undefined,
                vec![item.clone(), Value::Number(i as f64)],
            )?);
        }
        Ok(Value::array(out))
    });
    let of = Value::native("of", |_, _, args| Ok(Value::array(args.to_vec())));
    Value::native_with_statics(
        "Array",
        |_, _, args| match args {
            [Value::Number(n)] => Ok(Value::array(vec![Value::Undefined; dense_array_length(*n)?])),
            _ => Ok(Value::array(args.to_vec())),
        },
        statics(vec![("isArray", is_array), ("from", from), ("of", of)]),
    )
}

fn own_entries(value: &Value) -> Vec<(String, Value)> {
    match value {
        Value::Object(map) => map
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        Value::Array(items) => items
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        Value::String(s) => Value::string_units(s)
            .into_iter()
            .enumerate()
            .map(|(i, unit)| (i.to_string(), unit))
            .collect(),
        _ => Vec::new(),
    }
}

fn object_constructor() -> Value {
    fn require_object(value: &Value) -> Result<(), Exception> {
        if value.is_nullish() {
            return Err(Exception::type_error(
                "Cannot convert undefined or null to object",
            ));
        }
        Ok(())
    }

    let keys = Value::native("keys", |_, _, args| {
        let target = arg(args, 0);
        require_object(&target)?;
        Ok(Value::array(
            own_entries(&target)
                .into_iter()
                .map(|(k, _)| Value::string(&k))
                .collect(),
        ))
    });
    let values = Value::native("values", |_, _, args| {
        let target = arg(args, 0);
        require_object(&target)?;
        Ok(Value::array(own_entries(&target).into_iter().map(|(_, v)| v).collect()))
    });
    let entries = Value::native("entries", |_, _, args| {
        let target = arg(args, 0);
        require_object(&target)?;
        Ok(Value::array(
            own_entries(&target)
                .into_iter()
                .map(|(k, v)| Value::array(vec![Value::string(&k), v]))
                .collect(),
        ))
    });
    let assign = Value::native("assign", |interp, _, args| {
        let target = arg(args, 0);
        require_object(&target)?;
        for source in args.iter().skip(1) {
            for (k, v) in own_entries(source) {
                interp.set_property(&target, &k, v)?;
            }
        }
        Ok(target)
    });
    let from_entries = Value::native("fromEntries", |interp, _, args| {
        let mut map = PropertyMap::new();
        for entry in interp.iterate(&arg(args, 0))? {
            let key = interp.get_property(&entry, "0")?;
            let value = interp.get_property(&entry, "1")?;
            map.insert(crate::interpreter::to_property_key(&key), value);
        }
        Ok(Value::object(map))
    });
    let freeze = Value::native("freeze", |_, _, args| Ok(arg(args, 0)));
    Value::native_with_statics(
        "Object",
        |_, _, args| {
            Ok(match arg(args, 0) {
                Value::Undefined | Value::Null => Value::object(PropertyMap::new()),
                other => other,
            })
        },
        statics(vec![
            ("keys", keys),
            ("values", values),
            ("entries", entries),
            ("assign", assign),
            ("fromEntries", from_entries),
            ("freeze", freeze),
        ]),
    )
}

fn error_constructor(name: &'static str) -> Value {
    Value::native(name, move |_, _, args| {
        let message = match arg(args, 0) {
            Value::Undefined => String::new(),
            other => other.to_js_string(),
        };
        Ok(error_object(name, &message))
    })
}

fn parse_int(args: &[Value]) -> Value {
    let text = arg(args, 0).to_js_string();
    let mut s = text.trim();
    let mut sign = 1.0;
    if let Some(rest) = s.strip_prefix('-') {
        sign = -1.0;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    let mut radix = match arg(args, 1) {
        Value::Undefined => 0,
        other => to_int32(other.to_number()),
    };
    if radix == 0 || radix == 16 {
        if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            s = rest;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return Value::Number(f64::NAN);
    }
    let digits: Vec<u32> = s
        .chars()
        .map_while(|c| c.to_digit(radix as u32))
        .collect();
    if digits.is_empty() {
        return Value::Number(f64::NAN);
    }
    let value = digits
        .iter()
        .fold(0.0, |acc, d| acc * radix as f64 + *d as f64);
    Value::Number(sign * value)
}

fn parse_float(args: &[Value]) -> Value {
    let text = arg(args, 0).to_js_string();
    let s = text.trim_start();
    for prefix in ["Infinity", "+Infinity"] {
        if s.starts_with(prefix) {
            return Value::Number(f64::INFINITY);
        }
    }
    if s.starts_with("-Infinity") {
        return Value::Number(f64::NEG_INFINITY);
    }
    // Longest prefix that parses as a decimal literal.
    let candidate: String = s
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        .collect();
    (1..=candidate.len())
        .rev()
        .find_map(|end| candidate[..end].parse::<f64>().ok())
        .map(Value::Number)
        .unwrap_or(Value::Number(f64::NAN))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ARRAY METHODS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn array_method(name: &str) -> Option<Value> {
    let method = match name {
        "map" => Value::native("map", |interp, this, args| {
            let items = this_array(this, "map")?.borrow().clone();
            let callback = arg(args, 0);
            require_function(&callback, "")?;
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(visit(interp, &callback, item, i, this)?);
            }
            Ok(Value::array(out))
        }),
        "filter" => Value::native("filter", |interp, this, args| {
            let items = this_array(this, "filter")?.borrow().clone();
            let callback = arg(args, 0);
            require_function(&callback, "")?;
            let mut out = Vec::new();
            for (i, item) in items.iter().enumerate() {
                if visit(interp, &callback, item, i, this)?.truthy() {
                    out.push(item.clone());
                }
            }
            Ok(Value::array(out))
        }),
        "forEach" => Value::native("forEach", |interp, this, args| {
            let items = this_array(this, "forEach")?.borrow().clone();
            let callback = arg(args, 0);
            require_function(&callback, "")?;
            for (i, item) in items.iter().enumerate() {
                visit(interp, &callback, item, i, this)?;
            }
            Ok(Value::Undefined)
        }),
        "reduce" => Value::native("reduce", |interp, this, args| {
            let items = this_array(this, "reduce")?.borrow().clone();
            let callback = arg(args, 0);
            require_function(&callback, "")?;
            let mut iter = items.iter().enumerate();
            let mut acc = match args.get(1) {
                Some(initial) => initial.clone(),
                None => match iter.next() {
                    Some((_, first)) => first.clone(),
                    None => {
                        return Err(Exception::type_error(
                            "Reduce of empty array with no initial value",
                        ))
                    }
                },
            };
            for (i, item) in iter {
                acc = interp.call(
                    &callback,
                    Value::Undefined,
                    vec![acc, item.clone(), Value::Number(i as f64), this.clone()],
                )?;
            }
            Ok(acc)
        }),
        "find" | "findIndex" => {
            let want_index = name == "findIndex";
            Value::native(name, move |interp, this, args| {
                let items = this_array(this, "find")?.borrow().clone();
                let callback = arg(args, 0);
                require_function(&callback, "")?;
                for (i, item) in items.iter().enumerate() {
                    if visit(interp, &callback, item, i, this)?.truthy() {
                        return Ok(if want_index {
                            Value::Number(i as f64)
                        } else {
                            item.clone()
                        });
                    }
                }
                Ok(if want_index {
                    Value::Number(-1.0)
                } else {
                    Value::Undefined
                })
            })
        }
        "some" | "every" => {
            let every = name == "every";
            Value::native(name, move |interp, this, args| {
                let items = this_array(this, "some")?.borrow().clone();
                let callback = arg(args, 0);
                require_function(&callback, "")?;
                for (i, item) in items.iter().enumerate() {
                    let hit = visit(interp, &callback, item, i, this)?.truthy();
                    if hit != every {
                        return Ok(Value::Bool(!every));
                    }
                }
                Ok(Value::Bool(every))
            })
        }
        "join" => Value::native("join", |_, this, args| {
            let items = this_array(this, "join")?;
            let separator = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                other => other.to_js_string(),
            };
            let parts: Vec<String> = items
                .borrow()
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
                .collect();
            let separators = parts.len().saturating_sub(1) * separator.encode_utf16().count();
            let total: usize = parts.iter().map(|p| p.encode_utf16().count()).sum();
            check_string_length((total + separators) as f64)?;
            Ok(Value::string(&parts.join(&separator)))
        }),
        "slice" => Value::native("slice", |_, this, args| {
            let items = this_array(this, "slice")?;
            let items = items.borrow();
            let start = relative_index(&arg(args, 0), items.len(), 0);
            let end = relative_index(&arg(args, 1), items.len(), items.len());
            Ok(Value::array(items.get(start..end.max(start)).unwrap_or_default().to_vec()))
        }),
        "concat" => Value::native("concat", |_, this, args| {
            let mut out = this_array(this, "concat")?.borrow().clone();
            for value in args {
                match value {
                    Value::Array(items) => out.extend(items.borrow().iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Ok(Value::array(out))
        }),
        "includes" => Value::native("includes", |_, this, args| {
            let needle = arg(args, 0);
            let items = this_array(this, "includes")?;
            let found = items.borrow().iter().any(|v| v.same_value_zero(&needle));
            Ok(Value::Bool(found))
        }),
        "indexOf" => Value::native("indexOf", |_, this, args| {
            let needle = arg(args, 0);
            let items = this_array(this, "indexOf")?;
            let position = items.borrow().iter().position(|v| v.strict_equals(&needle));
            Ok(Value::Number(position.map(|i| i as f64).unwrap_or(-1.0)))
        }),
        "flat" => Value::native("flat", |_, this, args| {
            let depth = match arg(args, 0) {
                Value::Undefined => 1,
                other => other.to_number().max(0.0) as usize,
            };
            let items = this_array(this, "flat")?.borrow().clone();
            Ok(Value::array(flatten(items, depth)))
        }),
        "flatMap" => Value::native("flatMap", |interp, this, args| {
            let items = this_array(this, "flatMap")?.borrow().clone();
            let callback = arg(args, 0);
            require_function(&callback, "")?;
            let mut mapped = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                mapped.push(visit(interp, &callback, item, i, this)?);
            }
            Ok(Value::array(flatten(mapped, 1)))
        }),
        "push" => Value::native("push", |_, this, args| {
            let items = this_array(this, "push")?;
            let mut items = items.borrow_mut();
            items.extend(args.iter().cloned());
            Ok(Value::Number(items.len() as f64))
        }),
        "pop" => Value::native("pop", |_, this, _| {
            let items = this_array(this, "pop")?;
            let popped = items.borrow_mut().pop();
            Ok(popped.unwrap_or_default())
        }),
        "shift" => Value::native("shift", |_, this, _| {
            let items = this_array(this, "shift")?;
            let mut items = items.borrow_mut();
            Ok(if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            })
        }),
        "reverse" => Value::native("reverse", |_, this, _| {
            this_array(this, "reverse")?.borrow_mut().reverse();
            Ok(this.clone())
        }),
        "sort" => Value::native("sort", |interp, this, args| {
            let items = this_array(this, "sort")?;
            let snapshot = items.borrow().clone();
            let comparator = arg(args, 0);
            let sorted = merge_sort(snapshot, &mut |a, b| {
                // `undefined` always sorts last.
                match (a, b) {
                    (Value::Undefined, Value::Undefined) => return Ok(Ordering::Equal),
                    (Value::Undefined, _) => return Ok(Ordering::Greater),
                    (_, Value::Undefined) => return Ok(Ordering::Less),
                    _ => {}
                }
                if matches!(comparator, Value::Undefined) {
                    return Ok(a.to_js_string().cmp(&b.to_js_string()));
                }
                let n = interp
                    .call(&comparator, Value::Undefined, vec![a.clone(), b.clone()])?
                    .to_number();
                Ok(n.partial_cmp(&0.0).unwrap_or(Ordering::Equal))
            })?;
            *items.borrow_mut() = sorted;
            Ok(this.clone())
        }),
        "at" => Value::native("at", |_, this, args| {
            let items = this_array(this, "at")?;
            let items = items.borrow();
            let n = arg(args, 0).to_number();
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            let index = if n < 0.0 { items.len() as f64 + n } else { n };
            Ok(if index < 0.0 {
                Value::Undefined
            } else {
                items.get(index as usize).cloned().unwrap_or_default()
            })
        }),
        "toString" => Value::native("toString", |_, this, _| Ok(Value::string(&this.to_js_string()))),
        _ => return None,
    };
    Some(method)
}

fn flatten(items: Vec<Value>, depth: usize) -> Vec<Value> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Array(inner) if depth > 0 => {
                let inner = inner.borrow().clone();
                out.extend(flatten(inner, depth - 1));
            }
            other => out.push(other),
        }
    }
    out
}

type Comparator<'a> = dyn FnMut(&Value, &Value) -> Result<Ordering, Exception> + 'a;

/// Stable merge sort whose comparator may throw.
fn merge_sort(items: Vec<Value>, cmp: &mut Comparator<'_>) -> Result<Vec<Value>, Exception> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(left, cmp)?;
    let right = merge_sort(right, cmp)?;

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        if cmp(a, b)? == Ordering::Greater {
            out.extend(right.next());
        } else {
            out.extend(left.next());
        }
    }
    out.extend(left);
    out.extend(right);
    Ok(out)
}

// ═══════════════════════════════════════════════════════════════════════════════
// STRING METHODS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn string_method(name: &str) -> Option<Value> {
    let method = match name {
        "toUpperCase" => Value::native(name, |_, this, _| {
            Ok(Value::string(&this.to_js_string().to_uppercase()))
        }),
        "toLowerCase" => Value::native(name, |_, this, _| {
            Ok(Value::string(&this.to_js_string().to_lowercase()))
        }),
        "trim" => Value::native(name, |_, this, _| Ok(Value::string(this.to_js_string().trim()))),
        "trimStart" => Value::native(name, |_, this, _| {
            Ok(Value::string(this.to_js_string().trim_start()))
        }),
        "trimEnd" => Value::native(name, |_, this, _| {
            Ok(Value::string(this.to_js_string().trim_end()))
        }),
        "toString" | "valueOf" => Value::native(name, |_, this, _| Ok(this.clone())),
        "split" => Value::native(name, |_, this, args| {
            let text = this.to_js_string();
            let limit = match arg(args, 1) {
                Value::Undefined => usize::MAX,
                other => other.to_number().max(0.0) as usize,
            };
            let parts: Vec<Value> = match arg(args, 0) {
                Value::Undefined => vec![Value::string(&text)],
                separator => {
                    let separator = separator.to_js_string();
                    if separator.is_empty() {
                        Value::string_units(&text)
                    } else {
                        text.split(separator.as_str()).map(Value::string).collect()
                    }
                }
            };
            Ok(Value::array(parts.into_iter().take(limit).collect()))
        }),
        "startsWith" | "endsWith" | "includes" => {
            let kind = name.to_string();
            Value::native(name, move |_, this, args| {
                let text = this.to_js_string();
                let needle = arg(args, 0).to_js_string();
                Ok(Value::Bool(match kind.as_str() {
                    "startsWith" => text.starts_with(&needle),
                    "endsWith" => text.ends_with(&needle),
                    _ => text.contains(&needle),
                }))
            })
        }
        "indexOf" => Value::native(name, |_, this, args| {
            let units = this_units(this);
            let needle: Vec<u16> = arg(args, 0).to_js_string().encode_utf16().collect();
            let from = relative_index(&arg(args, 1), units.len(), 0);
            Ok(Value::Number(
                find_units(&units, &needle, from)
                    .map(|i| i as f64)
                    .unwrap_or(-1.0),
            ))
        }),
        "slice" => Value::native(name, |_, this, args| {
            let units = this_units(this);
            let start = relative_index(&arg(args, 0), units.len(), 0);
            let end = relative_index(&arg(args, 1), units.len(), units.len());
            Ok(units_to_value(units.get(start..end.max(start)).unwrap_or_default()))
        }),
        "substring" => Value::native(name, |_, this, args| {
            let units = this_units(this);
            let clamp = |value: Value, default: usize| match value {
                Value::Undefined => default,
                other => {
                    let n = other.to_number();
                    if n.is_nan() || n < 0.0 {
                        0
                    } else {
                        (n as usize).min(units.len())
                    }
                }
            };
            let a = clamp(arg(args, 0), 0);
            let b = clamp(arg(args, 1), units.len());
            Ok(units_to_value(&units[a.min(b)..a.max(b)]))
        }),
        "padStart" | "padEnd" => {
            let at_start = name == "padStart";
            Value::native(name, move |_, this, args| {
                let units = this_units(this);
                let target = arg(args, 0).to_number();
                let filler: Vec<u16> = match arg(args, 1) {
                    Value::Undefined => vec![u16::from(b' ')],
                    other => other.to_js_string().encode_utf16().collect(),
                };
                if !(target > units.len() as f64) || filler.is_empty() {
                    return Ok(units_to_value(&units));
                }
                check_string_length(target)?;
                let padding: Vec<u16> = filler
                    .iter()
                    .cycle()
                    .take(target as usize - units.len())
                    .copied()
                    .collect();
                let (head, tail) = if at_start {
                    (padding, units)
                } else {
                    (units, padding)
                };
                Ok(units_to_value(&[head, tail].concat()))
            })
        }
        "replace" | "replaceAll" => {
            let all = name == "replaceAll";
            Value::native(name, move |interp, this, args| {
                let text = this.to_js_string();
                let pattern = arg(args, 0).to_js_string();
                let replacement = arg(args, 1);
                let mut out = String::new();
                let mut rest = text.as_str();
                let mut offset = 0;
                while let Some(found) = rest.find(pattern.as_str()) {
                    out.push_str(&rest[..found]);
                    let position = text[..offset + found].encode_utf16().count();
                    let substitute = match &replacement {
                        Value::Function(_) => interp
                            .call(
                                &replacement,
                                Value::Undefined,
                                vec![
                                    Value::string(&pattern),
                                    Value::Number(position as f64),
                                    Value::string(&text),
                                ],
                            )?
                            .to_js_string(),
                        other => other.to_js_string(),
                    };
                    out.push_str(&substitute);
                    let advance = found + pattern.len();
                    offset += advance;
                    rest = &rest[advance..];
                    if !all {
                        break;
                    }
                    if pattern.is_empty() {
                        let Some(c) = rest.chars().next() else {
                            break;
                        };
                        out.push(c);
                        offset += c.len_utf8();
                        rest = &rest[c.len_utf8()..];
                    }
                }
                out.push_str(rest);
                Ok(Value::string(&out))
            })
        }
        "charAt" => Value::native(name, |_, this, args| {
            let units = this_units(this);
            let index = arg(args, 0).to_number();
            let index = if index.is_nan() { 0.0 } else { index.trunc() };
            Ok(if index < 0.0 {
                Value::string("")
            } else {
                units
                    .get(index as usize)
                    .map(|unit| units_to_value(&[*unit]))
                    .unwrap_or_else(|| Value::string(""))
            })
        }),
        "at" => Value::native(name, |_, this, args| {
            let units = this_units(this);
            let n = arg(args, 0).to_number();
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            let index = if n < 0.0 { units.len() as f64 + n } else { n };
            Ok(if index < 0.0 {
                Value::Undefined
            } else {
                units
                    .get(index as usize)
                    .map(|unit| units_to_value(&[*unit]))
                    .unwrap_or_default()
            })
        }),
        "repeat" => Value::native(name, |_, this, args| {
            let count = arg(args, 0).to_number();
            if count < 0.0 || count.is_infinite() {
                return Err(Exception::range_error(format!(
                    "Invalid count value: {}",
                    number_to_string(count)
                )));
            }
            let count = if count.is_nan() { 0.0 } else { count.trunc() };
            let text = this.to_js_string();
            check_string_length(count * text.encode_utf16().count() as f64)?;
            Ok(Value::string(&text.repeat(count as usize)))
        }),
        "concat" => Value::native(name, |_, this, args| {
            let mut out = this.to_js_string();
            for value in args {
                out.push_str(&value.to_js_string());
            }
            Ok(Value::string(&out))
        }),
        "localeCompare" => Value::native(name, |_, this, args| {
            let ordering = compare(this, &Value::string(&arg(args, 0).to_js_string()));
            Ok(Value::Number(match ordering {
                Some(Ordering::Less) => -1.0,
                Some(Ordering::Greater) => 1.0,
                _ => 0.0,
            }))
        }),
        _ => return None,
    };
    Some(method)
}

// ═══════════════════════════════════════════════════════════════════════════════
// NUMBER & OBJECT METHODS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn number_method(name: &str) -> Option<Value> {
    let method = match name {
        "toFixed" => Value::native(name, |_, this, args| {
            let digits = arg(args, 0).to_number();
            let digits = if digits.is_nan() { 0.0 } else { digits };
            if !(0.0..=100.0).contains(&digits) {
                return Err(Exception::range_error(
                    "toFixed() digits argument must be between 0 and 100",
                ));
            }
            let n = this.to_number();
            Ok(Value::string(&if n.is_finite() {
                format!("{:.*}", digits as usize, n)
            } else {
                number_to_string(n)
            }))
        }),
        "toString" => Value::native(name, |_, this, args| {
            let n = this.to_number();
            let radix = match arg(args, 0) {
                Value::Undefined => 10,
                other => to_int32(other.to_number()),
            };
            if !(2..=36).contains(&radix) {
                return Err(Exception::range_error(
                    "toString() radix must be between 2 and 36",
                ));
            }
            if radix == 10 || !n.is_finite() || n.fract() != 0.0 {
                return Ok(Value::string(&number_to_string(n)));
            }
            Ok(Value::string(&integer_to_radix(n, radix as u32)))
        }),
        "toLocaleString" => Value::native(name, |_, this, _| {
            Ok(Value::string(&group_thousands(this.to_number())))
        }),
        "valueOf" => Value::native(name, |_, this, _| Ok(this.clone())),
        _ => return None,
    };
    Some(method)
}

fn integer_to_radix(n: f64, radix: u32) -> String {
    let negative = n < 0.0;
    let mut value = n.abs() as u64;
    let mut digits = Vec::new();
    loop {
        let digit = (value % radix as u64) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        value /= radix as u64;
        if value == 0 {
            break;
        }
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// en-US style grouping with at most three fraction digits.
fn group_thousands(n: f64) -> String {
    if !n.is_finite() {
        return number_to_string(n);
    }
    let rounded = format!("{:.3}", n.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');
    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if n < 0.0 && (int_part != "0" || !frac_part.is_empty()) {
        "-"
    } else {
        ""
    };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

pub fn object_method(name: &str) -> Option<Value> {
    let method = match name {
        "hasOwnProperty" => Value::native(name, |_, this, args| {
            let key = crate::interpreter::to_property_key(&arg(args, 0));
            Ok(Value::Bool(match this {
                Value::Object(map) => map.borrow().contains_key(&key),
                Value::Array(items) => {
                    array_index(&key).is_some_and(|i| i < items.borrow().len())
                }
                _ => false,
            }))
        }),
        "toString" => Value::native(name, |_, this, _| Ok(Value::string(&this.to_js_string()))),
        "valueOf" => Value::native(name, |_, this, _| Ok(this.clone())),
        _ => return None,
    };
    Some(method)
}

