//! Built-in globals, namespaces and methods available to expressions.

use crate::error::{ExprError, Result};
use crate::interpreter::{get_property, Arg, Callable, Interpreter};
use crate::value::{self, number, strict_eq, to_js_string, to_number, truthy, type_of};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Upper bound, in bytes, on any string a program builds
const MAX_STRING_LENGTH: usize = 1 << 20;

/// Upper bound on the length of any array a program builds
const MAX_ARRAY_LENGTH: usize = 1 << 20;

pub(crate) fn ensure_string_length(len: usize) -> Result<()> {
    if len > MAX_STRING_LENGTH {
        return Err(ExprError::runtime("Invalid string length"));
    }
    Ok(())
}

pub(crate) fn ensure_array_length(len: usize) -> Result<()> {
    if len > MAX_ARRAY_LENGTH {
        return Err(ExprError::runtime("Invalid array length"));
    }
    Ok(())
}

const NAMESPACES: &[&str] = &["Math", "JSON", "Object", "Array", "Number"];

pub(crate) fn is_namespace(name: &str) -> bool {
    NAMESPACES.contains(&name)
}

pub(crate) fn namespace_constant(namespace: &str, name: &str) -> Option<Value> {
    let n = match (namespace, name) {
        ("Math", "PI") => std::f64::consts::PI,
        ("Math", "E") => std::f64::consts::E,
        ("Number", "MAX_SAFE_INTEGER") => 9_007_199_254_740_991.0,
        ("Number", "MIN_SAFE_INTEGER") => -9_007_199_254_740_991.0,
        ("Number", "EPSILON") => f64::EPSILON,
        _ => return None,
    };
    serde_json::Number::from_f64(n).map(Value::Number)
}

/// Array methods that modify their receiver
pub(crate) fn is_mutating(method: &str) -> bool {
    matches!(
        method,
        "push" | "pop" | "shift" | "unshift" | "reverse" | "sort"
    )
}

/// Items of an iterable value (arrays and strings)
pub(crate) fn iterate(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        other => Err(ExprError::runtime(format!(
            "{} is not iterable",
            describe(&other)
        ))),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        other => type_of(other),
    }
}

fn arg(args: &[Arg], index: usize) -> Value {
    args.get(index).map(Arg::value).unwrap_or(Value::Null)
}

fn callback(args: &[Arg], method: &str) -> Result<Callable> {
    match args.first() {
        Some(Arg::Func(callable)) => Ok(callable.clone()),
        Some(Arg::Value(value)) => Err(ExprError::runtime(format!(
            "{} is not a function (in {})",
            to_js_string(value),
            method
        ))),
        None => Err(ExprError::runtime(format!(
            "undefined is not a function (in {})",
            method
        ))),
    }
}

/// Integer conversion used for indices and counts; NaN becomes 0
fn integer(value: &Value) -> f64 {
    let n = to_number(value);
    if n.is_nan() {
        0.0
    } else {
        n.trunc()
    }
}

/// Resolve a possibly negative index against a length, clamped to `0..=len`
fn relative_index(value: &Value, len: usize) -> usize {
    let n = integer(value);
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

fn slice_bounds(args: &[Arg], len: usize) -> (usize, usize) {
    let start = relative_index(&arg(args, 0), len);
    let end = match args.get(1).map(Arg::value) {
        None | Some(Value::Null) => len,
        Some(end) => relative_index(&end, len),
    };
    (start, end.max(start))
}

fn at_index(value: &Value, len: usize) -> Option<usize> {
    let n = integer(value);
    let index = if n < 0.0 { len as f64 + n } else { n };
    if index < 0.0 || index >= len as f64 {
        None
    } else {
        Some(index as usize)
    }
}

// ---------------------------------------------------------------------------
// globals
// ---------------------------------------------------------------------------

pub(crate) fn call_global(name: &str, args: Vec<Arg>) -> Result<Value> {
    match name {
        "String" => Ok(Value::String(match args.first() {
            Some(a) => to_js_string(&a.value()),
            None => String::new(),
        })),
        "Number" => Ok(match args.first() {
            Some(a) => number(to_number(&a.value())),
            None => Value::from(0),
        }),
        "Boolean" => Ok(Value::Bool(truthy(&arg(&args, 0)))),
        "parseInt" => Ok(number(parse_int(
            &to_js_string(&arg(&args, 0)),
            args.get(1).map(|a| integer(&a.value()) as u32),
        ))),
        "parseFloat" => Ok(number(parse_float(&to_js_string(&arg(&args, 0))))),
        "isNaN" => Ok(Value::Bool(to_number(&arg(&args, 0)).is_nan())),
        "isFinite" => Ok(Value::Bool(to_number(&arg(&args, 0)).is_finite())),
        other => Err(ExprError::runtime(format!("{} is not defined", other))),
    }
}

fn parse_int(text: &str, radix: Option<u32>) -> f64 {
    let mut s = text.trim();
    let mut sign = 1.0;
    if let Some(rest) = s.strip_prefix('-') {
        sign = -1.0;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    let radix = match radix {
        None | Some(0) => None,
        Some(r) if (2..=36).contains(&r) => Some(r),
        Some(_) => return f64::NAN,
    };
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"));
    let radix = match (radix, hex) {
        (None | Some(16), Some(rest)) => {
            s = rest;
            16
        }
        (Some(r), _) => r,
        (None, None) => 10,
    };

    let mut result = 0.0;
    let mut digits = 0;
    for c in s.chars() {
        match c.to_digit(radix) {
            Some(d) => {
                result = result * radix as f64 + d as f64;
                digits += 1;
            }
            None => break,
        }
    }
    if digits == 0 {
        f64::NAN
    } else {
        sign * result
    }
}

/// Longest numeric prefix of a string
fn parse_float(text: &str) -> f64 {
    let s = text.trim_start();
    let unsigned = s.trim_start_matches(['+', '-']);
    if unsigned.starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let mut valid = 0;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => {
                seen_digit = true;
                valid = end + 1;
            }
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => {
                seen_exp = true;
                if matches!(bytes.get(end + 1), Some(b'+' | b'-')) {
                    end += 1;
                }
            }
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return f64::NAN;
    }
    s[..valid].parse::<f64>().unwrap_or(f64::NAN)
}

// ---------------------------------------------------------------------------
// namespaces
// ---------------------------------------------------------------------------

pub(crate) fn call_static(
    interp: &mut Interpreter,
    namespace: &str,
    name: &str,
    args: Vec<Arg>,
) -> Result<Value> {
    match namespace {
        "Math" => math(name, &args),
        "JSON" => json(name, &args),
        "Object" => object(name, &args),
        "Array" => array_static(interp, name, &args),
        "Number" => number_static(name, &args),
        _ => Err(not_a_function(namespace, name)),
    }
}

fn not_a_function(receiver: &str, name: &str) -> ExprError {
    ExprError::runtime(format!("{}.{} is not a function", receiver, name))
}

fn math(name: &str, args: &[Arg]) -> Result<Value> {
    let x = to_number(&arg(args, 0));
    let result = match name {
        // JavaScript rounds half up, toward positive infinity
        "round" => (x + 0.5).floor(),
        "floor" => x.floor(),
        "ceil" => x.ceil(),
        "abs" => x.abs(),
        "trunc" => x.trunc(),
        "sign" => {
            if x.is_nan() || x == 0.0 {
                x
            } else {
                x.signum()
            }
        }
        "sqrt" => x.sqrt(),
        "cbrt" => x.cbrt(),
        "log" => x.ln(),
        "log10" => x.log10(),
        "exp" => x.exp(),
        "pow" => x.powf(to_number(&arg(args, 1))),
        "min" | "max" => {
            let mut acc = if name == "min" {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            };
            for a in args {
                let n = to_number(&a.value());
                if n.is_nan() {
                    return Ok(Value::Null);
                }
                acc = if name == "min" { acc.min(n) } else { acc.max(n) };
            }
            acc
        }
        _ => return Err(not_a_function("Math", name)),
    };
    Ok(number(result))
}

fn json(name: &str, args: &[Arg]) -> Result<Value> {
    match name {
        "stringify" => {
            let value = arg(args, 0);
            let pretty = args.get(2).map(|a| truthy(&a.value())).unwrap_or(false);
            let text = if pretty {
                serde_json::to_string_pretty(&value)
            } else {
                serde_json::to_string(&value)
            };
            text.map(Value::String)
                .map_err(|e| ExprError::runtime(e.to_string()))
        }
        "parse" => {
            let text = to_js_string(&arg(args, 0));
            serde_json::from_str(&text)
                .map_err(|e| ExprError::runtime(format!("Unexpected token in JSON: {}", e)))
        }
        _ => Err(not_a_function("JSON", name)),
    }
}

fn entries_of(value: &Value) -> Result<Vec<(String, Value)>> {
    match value {
        Value::Null => Err(ExprError::runtime(
            "Cannot convert undefined or null to object",
        )),
        Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Value::Array(items) => Ok(items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect()),
        Value::String(s) => Ok(s
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Value::String(c.to_string())))
            .collect()),
        Value::Bool(_) | Value::Number(_) => Ok(Vec::new()),
    }
}

fn object(name: &str, args: &[Arg]) -> Result<Value> {
    match name {
        "keys" => Ok(Value::Array(
            entries_of(&arg(args, 0))?
                .into_iter()
                .map(|(k, _)| Value::String(k))
                .collect(),
        )),
        "values" => Ok(Value::Array(
            entries_of(&arg(args, 0))?
                .into_iter()
                .map(|(_, v)| v)
                .collect(),
        )),
        "entries" => Ok(Value::Array(
            entries_of(&arg(args, 0))?
                .into_iter()
                .map(|(k, v)| Value::Array(vec![Value::String(k), v]))
                .collect(),
        )),
        "assign" => {
            let mut target = match arg(args, 0) {
                Value::Object(map) => map,
                Value::Null => {
                    return Err(ExprError::runtime(
                        "Cannot convert undefined or null to object",
                    ))
                }
                _ => Map::new(),
            };
            for source in args.iter().skip(1) {
                let source = source.value();
                if !source.is_null() {
                    target.extend(entries_of(&source)?);
                }
            }
            Ok(Value::Object(target))
        }
        "fromEntries" => {
            let mut map = Map::new();
            for entry in iterate(arg(args, 0))? {
                let key = get_property(&entry, &Value::from(0))?;
                let value = get_property(&entry, &Value::from(1))?;
                map.insert(to_js_string(&key), value);
            }
            Ok(Value::Object(map))
        }
        _ => Err(not_a_function("Object", name)),
    }
}

fn array_static(interp: &mut Interpreter, name: &str, args: &[Arg]) -> Result<Value> {
    match name {
        "isArray" => Ok(Value::Bool(arg(args, 0).is_array())),
        "of" => Ok(Value::Array(args.iter().map(Arg::value).collect())),
        "from" => {
            let source = arg(args, 0);
            let items = match &source {
                Value::Object(map) => {
                    let len = map.get("length").map(integer).unwrap_or(0.0).max(0.0);
                    ensure_array_length(len as usize)?;
                    (0..len as usize)
                        .map(|i| map.get(&i.to_string()).cloned().unwrap_or(Value::Null))
                        .collect()
                }
                Value::Array(_) | Value::String(_) => iterate(source.clone())?,
                _ => Vec::new(),
            };
            match args.get(1) {
                Some(Arg::Func(mapper)) => {
                    let mut out = Vec::with_capacity(items.len());
                    for (i, item) in items.into_iter().enumerate() {
                        out.push(interp.call(mapper, vec![item, Value::from(i)])?);
                    }
                    Ok(Value::Array(out))
                }
                _ => Ok(Value::Array(items)),
            }
        }
        _ => Err(not_a_function("Array", name)),
    }
}

fn number_static(name: &str, args: &[Arg]) -> Result<Value> {
    let value = arg(args, 0);
    match name {
        "isInteger" => Ok(Value::Bool(
            value.as_f64().map(|n| n.fract() == 0.0).unwrap_or(false),
        )),
        "isFinite" => Ok(Value::Bool(value.is_number())),
        // NaN only exists as null here
        "isNaN" => Ok(Value::Bool(value.is_null())),
        "parseInt" => call_global("parseInt", args.to_vec()),
        "parseFloat" => call_global("parseFloat", args.to_vec()),
        _ => Err(not_a_function("Number", name)),
    }
}

// ---------------------------------------------------------------------------
// methods
// ---------------------------------------------------------------------------

pub(crate) fn call_method(
    interp: &mut Interpreter,
    receiver: &mut Value,
    name: &str,
    args: Vec<Arg>,
) -> Result<Value> {
    match receiver {
        Value::Array(items) => array_method(interp, items, name, &args),
        Value::String(s) => string_method(s, name, &args),
        Value::Number(n) => {
            let n = n.as_f64().unwrap_or(f64::NAN);
            number_method(n, name, &args)
        }
        Value::Null => Err(ExprError::runtime(format!(
            "Cannot read properties of null (reading '{}')",
            name
        ))),
        Value::Object(map) => match name {
            "hasOwnProperty" => Ok(Value::Bool(
                map.contains_key(&to_js_string(&arg(&args, 0))),
            )),
            "toString" => Ok(Value::String("[object Object]".to_string())),
            _ => Err(not_a_function("object", name)),
        },
        Value::Bool(b) => match name {
            "toString" => Ok(Value::String(b.to_string())),
            _ => Err(not_a_function("boolean", name)),
        },
    }
}

fn array_method(
    interp: &mut Interpreter,
    items: &mut Vec<Value>,
    name: &str,
    args: &[Arg],
) -> Result<Value> {
    match name {
        "map" => {
            let f = callback(args, name)?;
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(interp.call(&f, vec![item.clone(), Value::from(i)])?);
            }
            Ok(Value::Array(out))
        }
        "filter" => {
            let f = callback(args, name)?;
            let mut out = Vec::new();
            for (i, item) in items.iter().enumerate() {
                if truthy(&interp.call(&f, vec![item.clone(), Value::from(i)])?) {
                    out.push(item.clone());
                }
            }
            Ok(Value::Array(out))
        }
        "find" | "findIndex" => {
            let f = callback(args, name)?;
            for (i, item) in items.iter().enumerate() {
                if truthy(&interp.call(&f, vec![item.clone(), Value::from(i)])?) {
                    return Ok(if name == "find" {
                        item.clone()
                    } else {
                        Value::from(i)
                    });
                }
            }
            Ok(if name == "find" {
                Value::Null
            } else {
                Value::from(-1)
            })
        }
        "some" | "every" => {
            let f = callback(args, name)?;
            let want = name == "some";
            for (i, item) in items.iter().enumerate() {
                if truthy(&interp.call(&f, vec![item.clone(), Value::from(i)])?) == want {
                    return Ok(Value::Bool(want));
                }
            }
            Ok(Value::Bool(!want))
        }
        "forEach" => {
            let f = callback(args, name)?;
            for (i, item) in items.iter().enumerate() {
                interp.call(&f, vec![item.clone(), Value::from(i)])?;
            }
            Ok(Value::Null)
        }
        "reduce" => {
            let f = callback(args, name)?;
            let mut iter = items.iter().enumerate();
            let mut acc = match args.get(1) {
                Some(initial) => initial.value(),
                None => match iter.next() {
                    Some((_, first)) => first.clone(),
                    None => {
                        return Err(ExprError::runtime(
                            "Reduce of empty array with no initial value",
                        ))
                    }
                },
            };
            for (i, item) in iter {
                acc = interp.call(&f, vec![acc, item.clone(), Value::from(i)])?;
            }
            Ok(acc)
        }
        "includes" => {
            let needle = arg(args, 0);
            Ok(Value::Bool(items.iter().any(|item| strict_eq(item, &needle))))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            Ok(items
                .iter()
                .position(|item| strict_eq(item, &needle))
                .map(Value::from)
                .unwrap_or_else(|| Value::from(-1)))
        }
        "join" | "toString" => {
            let separator = match args.first().map(Arg::value) {
                None | Some(Value::Null) => ",".to_string(),
                Some(sep) => to_js_string(&sep),
            };
            let mut out = String::new();
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(&separator);
                }
                if !item.is_null() {
                    out.push_str(&to_js_string(item));
                }
                ensure_string_length(out.len())?;
            }
            Ok(Value::String(out))
        }
        "slice" => {
            let (start, end) = slice_bounds(args, items.len());
            Ok(Value::Array(items[start..end].to_vec()))
        }
        "concat" => {
            let mut out = items.clone();
            for a in args {
                match a.value() {
                    Value::Array(more) => {
                        ensure_array_length(out.len() + more.len())?;
                        out.extend(more);
                    }
                    other => out.push(other),
                }
            }
            ensure_array_length(out.len())?;
            Ok(Value::Array(out))
        }
        "flat" => {
            let depth = match args.first().map(Arg::value) {
                None | Some(Value::Null) => 1,
                Some(d) => integer(&d).max(0.0) as usize,
            };
            let mut out = Vec::new();
            flatten(items.iter().cloned(), depth, &mut out)?;
            Ok(Value::Array(out))
        }
        "flatMap" => {
            let f = callback(args, name)?;
            let mut out = Vec::new();
            for (i, item) in items.iter().enumerate() {
                match interp.call(&f, vec![item.clone(), Value::from(i)])? {
                    Value::Array(more) => {
                        ensure_array_length(out.len() + more.len())?;
                        out.extend(more);
                    }
                    other => out.push(other),
                }
            }
            ensure_array_length(out.len())?;
            Ok(Value::Array(out))
        }
        "at" => Ok(at_index(&arg(args, 0), items.len())
            .map(|i| items[i].clone())
            .unwrap_or(Value::Null)),
        "push" => {
            ensure_array_length(items.len() + args.len())?;
            items.extend(args.iter().map(Arg::value));
            Ok(Value::from(items.len()))
        }
        "pop" => Ok(items.pop().unwrap_or(Value::Null)),
        "shift" => Ok(if items.is_empty() {
            Value::Null
        } else {
            items.remove(0)
        }),
        "unshift" => {
            ensure_array_length(items.len() + args.len())?;
            let front: Vec<Value> = args.iter().map(Arg::value).collect();
            items.splice(0..0, front);
            Ok(Value::from(items.len()))
        }
        "reverse" => {
            items.reverse();
            Ok(Value::Array(items.clone()))
        }
        "sort" => {
            let taken = std::mem::take(items);
            let sorted = match args.first() {
                Some(Arg::Func(f)) => {
                    let f = f.clone();
                    merge_sort(taken, &mut |a: &Value, b: &Value| {
                        let n = to_number(&interp.call(&f, vec![a.clone(), b.clone()])?);
                        Ok(if n > 0.0 {
                            Ordering::Greater
                        } else if n < 0.0 {
                            Ordering::Less
                        } else {
                            Ordering::Equal
                        })
                    })?
                }
                _ => merge_sort(taken, &mut |a: &Value, b: &Value| Ok(to_js_string(a).cmp(&to_js_string(b))))?,
            };
            *items = sorted;
            Ok(Value::Array(items.clone()))
        }
        _ => Err(not_a_function("array", name)),
    }
}

fn flatten(items: impl Iterator<Item = Value>, depth: usize, out: &mut Vec<Value>) -> Result<()> {
    for item in items {
        match item {
            Value::Array(inner) if depth > 0 => flatten(inner.into_iter(), depth - 1, out)?,
            other => {
                out.push(other);
                ensure_array_length(out.len())?;
            }
        }
    }
    Ok(())
}

type Comparator<'a> = dyn FnMut(&Value, &Value) -> Result<Ordering> + 'a;

/// Stable merge sort whose comparator may fail
fn merge_sort(mut items: Vec<Value>, cmp: &mut Comparator<'_>) -> Result<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, cmp)?;
    let right = merge_sort(right, cmp)?;

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp(l, r)? == Ordering::Greater,
            _ => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        out.extend(next);
    }
    out.extend(left);
    out.extend(right);
    Ok(out)
}

fn string_method(s: &str, name: &str, args: &[Arg]) -> Result<Value> {
    let text = |v: String| -> Result<Value> {
        ensure_string_length(v.len())?;
        Ok(Value::String(v))
    };
    match name {
        "toUpperCase" => text(s.to_uppercase()),
        "toLowerCase" => text(s.to_lowercase()),
        "trim" => text(s.trim().to_string()),
        "trimStart" => text(s.trim_start().to_string()),
        "trimEnd" => text(s.trim_end().to_string()),
        "toString" => text(s.to_string()),
        "split" => {
            let parts: Vec<Value> = match args.first().map(Arg::value) {
                None | Some(Value::Null) => vec![Value::String(s.to_string())],
                Some(sep) => {
                    let sep = to_js_string(&sep);
                    if sep.is_empty() {
                        s.chars().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str())
                            .map(|p| Value::String(p.to_string()))
                            .collect()
                    }
                }
            };
            let limit = match args.get(1).map(Arg::value) {
                None | Some(Value::Null) => parts.len(),
                Some(l) => integer(&l).max(0.0) as usize,
            };
            Ok(Value::Array(parts.into_iter().take(limit).collect()))
        }
        "includes" => Ok(Value::Bool(s.contains(&to_js_string(&arg(args, 0))))),
        "startsWith" => Ok(Value::Bool(s.starts_with(&to_js_string(&arg(args, 0))))),
        "endsWith" => Ok(Value::Bool(s.ends_with(&to_js_string(&arg(args, 0))))),
        "indexOf" => {
            let needle = to_js_string(&arg(args, 0));
            Ok(match s.find(&needle) {
                Some(byte) => Value::from(s[..byte].chars().count()),
                None => Value::from(-1),
            })
        }
        "slice" => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(args, chars.len());
            text(chars[start..end].iter().collect())
        }
        "substring" => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as f64;
            let clamp = |v: &Value| integer(v).clamp(0.0, len) as usize;
            let start = clamp(&arg(args, 0));
            let end = match args.get(1).map(Arg::value) {
                None | Some(Value::Null) => chars.len(),
                Some(end) => clamp(&end),
            };
            let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
            text(chars[lo..hi].iter().collect())
        }
        "replace" => {
            let pattern = to_js_string(&arg(args, 0));
            let replacement = to_js_string(&arg(args, 1));
            ensure_string_length(s.len() + replacement.len())?;
            text(s.replacen(&pattern, &replacement, 1))
        }
        "replaceAll" => {
            let pattern = to_js_string(&arg(args, 0));
            let replacement = to_js_string(&arg(args, 1));
            if pattern.is_empty() {
                return Err(ExprError::runtime(
                    "replaceAll requires a non-empty search string",
                ));
            }
            let matches = s.matches(pattern.as_str()).count();
            ensure_string_length(s.len() + matches.saturating_mul(replacement.len()))?;
            text(s.replace(&pattern, &replacement))
        }
        "padStart" | "padEnd" => {
            let target = integer(&arg(args, 0)).max(0.0);
            ensure_string_length(target as usize)?;
            let fill = match args.get(1).map(Arg::value) {
                None | Some(Value::Null) => " ".to_string(),
                Some(f) => to_js_string(&f),
            };
            let len = s.chars().count();
            let missing = (target as usize).saturating_sub(len);
            if missing == 0 || fill.is_empty() {
                return text(s.to_string());
            }
            let pad: String = fill.chars().cycle().take(missing).collect();
            text(if name == "padStart" {
                format!("{}{}", pad, s)
            } else {
                format!("{}{}", s, pad)
            })
        }
        "repeat" => {
            let count = to_number(&arg(args, 0));
            let count = if count.is_nan() { 0.0 } else { count.trunc() };
            if count < 0.0 || !count.is_finite() {
                return Err(ExprError::runtime("Invalid count value"));
            }
            ensure_string_length((count * s.len() as f64) as usize)?;
            text(s.repeat(count as usize))
        }
        "charAt" => {
            let index = integer(&arg(args, 0));
            let c = if index < 0.0 {
                None
            } else {
                s.chars().nth(index as usize)
            };
            text(c.map(String::from).unwrap_or_default())
        }
        "at" => {
            let chars: Vec<char> = s.chars().collect();
            Ok(at_index(&arg(args, 0), chars.len())
                .map(|i| Value::String(chars[i].to_string()))
                .unwrap_or(Value::Null))
        }
        "concat" => {
            let mut out = s.to_string();
            for a in args {
                out.push_str(&to_js_string(&a.value()));
                ensure_string_length(out.len())?;
            }
            text(out)
        }
        _ => Err(not_a_function("string", name)),
    }
}

fn number_method(n: f64, name: &str, args: &[Arg]) -> Result<Value> {
    match name {
        "toFixed" => {
            let digits = integer(&arg(args, 0));
            if !(0.0..=100.0).contains(&digits) {
                return Err(ExprError::runtime(
                    "toFixed() digits argument must be between 0 and 100",
                ));
            }
            Ok(Value::String(format!("{:.*}", digits as usize, n)))
        }
        "toString" => Ok(Value::String(value::number_to_string(n))),
        _ => Err(not_a_function("number", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42px", None), 42.0);
        assert_eq!(parse_int("  -17", None), -17.0);
        assert_eq!(parse_int("0x1f", None), 31.0);
        assert_eq!(parse_int("ff", Some(16)), 255.0);
        assert!(parse_int("abc", None).is_nan());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("3.5kg"), 3.5);
        assert_eq!(parse_float("-1e3x"), -1000.0);
        assert_eq!(parse_float("1."), 1.0);
        assert!(parse_float("e5").is_nan());
    }

    #[test]
    fn test_merge_sort_is_stable() {
        let items = vec![
            serde_json::json!({"k": 1, "id": "a"}),
            serde_json::json!({"k": 0, "id": "b"}),
            serde_json::json!({"k": 1, "id": "c"}),
        ];
        let sorted = merge_sort(items, &mut |a: &Value, b: &Value| {
            Ok(to_number(&a["k"])
                .partial_cmp(&to_number(&b["k"]))
                .unwrap_or(Ordering::Equal))
        })
        .unwrap();
        let ids: Vec<&str> = sorted.iter().filter_map(|v| v["id"].as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_relative_index() {
        assert_eq!(relative_index(&Value::from(-1), 5), 4);
        assert_eq!(relative_index(&Value::from(-10), 5), 0);
        assert_eq!(relative_index(&Value::from(10), 5), 5);
        assert_eq!(at_index(&Value::from(-1), 3), Some(2));
        assert_eq!(at_index(&Value::from(3), 3), None);
    }
}
