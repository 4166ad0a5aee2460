// Copyright 2023 RisingWave Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The built-in function library.
//!
//! Functions are declared as data: a name mapped to a signature (one
//! admissible-type set per positional argument, plus an optional variadic
//! tail) and an evaluator. The interpreter evaluates the argument
//! expressions, then arity and types are validated here before the
//! evaluator runs, so evaluators may assume their contract.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, Local, Months, SecondsFormat};
use serde_json::Number;

use crate::ast::Ast;
use crate::error::{Error, Result};
use crate::interpreter::Interpreter;
use crate::value::{Map, Value};

/// A type that a function argument may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgType {
    Any,
    Number,
    String,
    Array,
    ArrayOfNumber,
    ArrayOfString,
    Object,
    Expref,
}

impl ArgType {
    fn matches(self, value: &Value) -> bool {
        match self {
            ArgType::Any => !matches!(value, Value::Expref(_)),
            ArgType::Number => matches!(value, Value::Number(_)),
            ArgType::String => matches!(value, Value::String(_)),
            ArgType::Array => matches!(value, Value::Array(_)),
            ArgType::ArrayOfNumber => match value {
                Value::Array(a) => a.iter().all(|v| matches!(v, Value::Number(_))),
                _ => false,
            },
            ArgType::ArrayOfString => match value {
                Value::Array(a) => a.iter().all(|v| matches!(v, Value::String(_))),
                _ => false,
            },
            ArgType::Object => matches!(value, Value::Object(_)),
            ArgType::Expref => matches!(value, Value::Expref(_)),
        }
    }

    fn name(self) -> &'static str {
        match self {
            ArgType::Any => "any value",
            ArgType::Number => "number",
            ArgType::String => "string",
            ArgType::Array => "array",
            ArgType::ArrayOfNumber => "array of numbers",
            ArgType::ArrayOfString => "array of strings",
            ArgType::Object => "object",
            ArgType::Expref => "expression",
        }
    }
}

/// One type set per positional argument; `variadic` admits any number of
/// extra arguments matching the given set.
struct Signature {
    inputs: &'static [&'static [ArgType]],
    variadic: Option<&'static [ArgType]>,
}

impl Signature {
    fn validate(&self, name: &str, args: &[Value]) -> Result<()> {
        let arity_ok = match self.variadic {
            Some(_) => args.len() >= self.inputs.len(),
            None => args.len() == self.inputs.len(),
        };
        if !arity_ok {
            let suffix = if self.variadic.is_some() { " or more" } else { "" };
            return Err(Error::InvalidArity(
                format!(
                    "{name}() expects {}{suffix} arguments, got {}",
                    self.inputs.len(),
                    args.len()
                )
                .into(),
            ));
        }
        for (i, value) in args.iter().enumerate() {
            let spec = match self.inputs.get(i) {
                Some(spec) => *spec,
                None => self.variadic.expect("arity validated"),
            };
            if !spec.iter().any(|t| t.matches(value)) {
                let expected = spec
                    .iter()
                    .map(|t| t.name())
                    .collect::<Vec<_>>()
                    .join(" or ");
                return Err(Error::InvalidType(
                    format!(
                        "{name}() argument {} must be {expected}, got {}",
                        i + 1,
                        value.type_name()
                    )
                    .into(),
                ));
            }
        }
        Ok(())
    }
}

type Handler = fn(&Interpreter<'_>, &[Value]) -> Result<Value>;

struct Function {
    signature: Signature,
    handler: Handler,
}

/// Looks up and invokes a built-in function with already-evaluated
/// arguments.
pub(crate) fn call(interp: &Interpreter<'_>, name: &str, args: &[Value]) -> Result<Value> {
    let Some(function) = registry().get(name) else {
        return Err(Error::UnknownFunction(name.into()));
    };
    function.signature.validate(name, args)?;
    (function.handler)(interp, args)
}

fn registry() -> &'static HashMap<&'static str, Function> {
    static REGISTRY: OnceLock<HashMap<&'static str, Function>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        use ArgType::*;
        let mut map = HashMap::new();
        let mut add = |name: &'static str,
                       inputs: &'static [&'static [ArgType]],
                       variadic: Option<&'static [ArgType]>,
                       handler: Handler| {
            map.insert(
                name,
                Function {
                    signature: Signature { inputs, variadic },
                    handler,
                },
            );
        };

        add("abs", &[&[Number]], None, fn_abs);
        add("avg", &[&[ArrayOfNumber]], None, fn_avg);
        add("ceil", &[&[Number]], None, fn_ceil);
        add("contains", &[&[Array, String], &[Any]], None, fn_contains);
        add("ends_with", &[&[String], &[String]], None, fn_ends_with);
        add("floor", &[&[Number]], None, fn_floor);
        add("join", &[&[String], &[ArrayOfString]], None, fn_join);
        add("keys", &[&[Object]], None, fn_keys);
        add("length", &[&[String, Array, Object]], None, fn_length);
        add("map", &[&[Expref], &[Array]], None, fn_map);
        add("max", &[&[ArrayOfNumber, ArrayOfString]], None, fn_max);
        add("max_by", &[&[Array], &[Expref]], None, fn_max_by);
        add("merge", &[&[Object]], Some(&[Object]), fn_merge);
        add("min", &[&[ArrayOfNumber, ArrayOfString]], None, fn_min);
        add("min_by", &[&[Array], &[Expref]], None, fn_min_by);
        add("not_null", &[&[Any]], Some(&[Any]), fn_not_null);
        add("reverse", &[&[Array, String]], None, fn_reverse);
        add("sort", &[&[ArrayOfNumber, ArrayOfString]], None, fn_sort);
        add("sort_by", &[&[Array], &[Expref]], None, fn_sort_by);
        add("starts_with", &[&[String], &[String]], None, fn_starts_with);
        add("sum", &[&[ArrayOfNumber]], None, fn_sum);
        add("to_array", &[&[Any]], None, fn_to_array);
        add("to_number", &[&[Any]], None, fn_to_number);
        add("to_string", &[&[Any]], None, fn_to_string);
        add("type", &[&[Any]], None, fn_type);
        add("values", &[&[Object]], None, fn_values);

        add("current_datetime", &[], None, fn_current_datetime);
        add("seconds_ago", &[&[Number]], None, |_, a| shift_seconds(a, -1));
        add("seconds_from_now", &[&[Number]], None, |_, a| shift_seconds(a, 1));
        add("minutes_ago", &[&[Number]], None, |_, a| shift_seconds(a, -60));
        add("minutes_from_now", &[&[Number]], None, |_, a| shift_seconds(a, 60));
        add("hours_ago", &[&[Number]], None, |_, a| shift_seconds(a, -3600));
        add("hours_from_now", &[&[Number]], None, |_, a| shift_seconds(a, 3600));
        add("days_ago", &[&[Number]], None, |_, a| shift_seconds(a, -86400));
        add("days_from_now", &[&[Number]], None, |_, a| shift_seconds(a, 86400));
        add("weeks_ago", &[&[Number]], None, |_, a| shift_seconds(a, -604800));
        add("weeks_from_now", &[&[Number]], None, |_, a| shift_seconds(a, 604800));
        add("months_ago", &[&[Number]], None, |_, a| shift_months(a, -1));
        add("months_from_now", &[&[Number]], None, |_, a| shift_months(a, 1));
        add("years_ago", &[&[Number]], None, |_, a| shift_months(a, -12));
        add("years_from_now", &[&[Number]], None, |_, a| shift_months(a, 12));

        map
    })
}

/// Extension methods for `Number`.
trait NumberExt: Sized {
    fn abs(&self) -> Self;
    fn ceil(&self) -> Self;
    fn floor(&self) -> Self;
}

impl NumberExt for Number {
    fn abs(&self) -> Self {
        if let Some(n) = self.as_i64() {
            Number::from(n.saturating_abs())
        } else if let Some(n) = self.as_f64() {
            Number::from_f64(n.abs()).unwrap_or_else(|| Number::from(0))
        } else {
            self.clone()
        }
    }

    fn ceil(&self) -> Self {
        if self.is_f64() {
            Number::from(self.as_f64().unwrap_or(0.0).ceil() as i64)
        } else {
            self.clone()
        }
    }

    fn floor(&self) -> Self {
        if self.is_f64() {
            Number::from(self.as_f64().unwrap_or(0.0).floor() as i64)
        } else {
            self.clone()
        }
    }
}

fn fn_abs(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let Value::Number(n) = &args[0] else { unreachable!() };
    Ok(Value::Number(n.abs()))
}

fn fn_ceil(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let Value::Number(n) = &args[0] else { unreachable!() };
    Ok(Value::Number(n.ceil()))
}

fn fn_floor(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let Value::Number(n) = &args[0] else { unreachable!() };
    Ok(Value::Number(n.floor()))
}

fn fn_avg(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let Value::Array(array) = &args[0] else { unreachable!() };
    if array.is_empty() {
        return Ok(Value::Null);
    }
    let sum: f64 = array.iter().filter_map(Value::as_f64).sum();
    Ok(Value::from_f64(sum / array.len() as f64))
}

fn fn_sum(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let Value::Array(array) = &args[0] else { unreachable!() };
    let sum: f64 = array.iter().filter_map(Value::as_f64).sum();
    Ok(Value::from_f64(sum))
}

fn fn_contains(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let found = match (&args[0], &args[1]) {
        (Value::Array(haystack), needle) => haystack.iter().any(|v| v == needle),
        (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
        // A non-string needle never occurs in a string.
        (Value::String(_), _) => false,
        _ => unreachable!(),
    };
    Ok(Value::Bool(found))
}

fn fn_starts_with(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let (Value::String(s), Value::String(prefix)) = (&args[0], &args[1]) else { unreachable!() };
    Ok(Value::Bool(s.starts_with(prefix.as_str())))
}

fn fn_ends_with(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let (Value::String(s), Value::String(suffix)) = (&args[0], &args[1]) else { unreachable!() };
    Ok(Value::Bool(s.ends_with(suffix.as_str())))
}

fn fn_join(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let (Value::String(glue), Value::Array(parts)) = (&args[0], &args[1]) else { unreachable!() };
    let parts: Vec<&str> = parts.iter().filter_map(Value::as_str).collect();
    Ok(Value::String(parts.join(glue)))
}

fn fn_keys(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let Value::Object(object) = &args[0] else { unreachable!() };
    Ok(Value::Array(
        object.keys().map(|k| Value::String(k.clone())).collect(),
    ))
}

fn fn_values(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let Value::Object(object) = &args[0] else { unreachable!() };
    Ok(Value::Array(object.values().cloned().collect()))
}

fn fn_length(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(a) => a.len(),
        Value::Object(o) => o.len(),
        _ => unreachable!(),
    };
    Ok(Value::Number(Number::from(len as u64)))
}

fn fn_map(interp: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let (Value::Expref(expr), Value::Array(array)) = (&args[0], &args[1]) else { unreachable!() };
    let mut mapped = Vec::with_capacity(array.len());
    for element in array {
        // Unlike a projection, `map` keeps null results.
        mapped.push(interp.eval(expr, element)?);
    }
    Ok(Value::Array(mapped))
}

fn fn_reverse(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    Ok(match &args[0] {
        Value::Array(a) => Value::Array(a.iter().rev().cloned().collect()),
        Value::String(s) => Value::String(s.chars().rev().collect()),
        _ => unreachable!(),
    })
}

fn fn_merge(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let mut merged = Map::new();
    for arg in args {
        let Value::Object(object) = arg else { unreachable!() };
        for (k, v) in object {
            merged.insert(k.clone(), v.clone());
        }
    }
    Ok(Value::Object(merged))
}

fn fn_not_null(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    Ok(args
        .iter()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null))
}

fn fn_to_array(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    Ok(match &args[0] {
        Value::Array(_) => args[0].clone(),
        other => Value::Array(vec![other.clone()]),
    })
}

fn fn_to_number(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    Ok(match &args[0] {
        Value::Number(_) => args[0].clone(),
        Value::String(s) => match s.parse::<f64>() {
            Ok(n) => Value::from_f64(n),
            Err(_) => Value::Null,
        },
        _ => Value::Null,
    })
}

fn fn_to_string(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    Ok(match &args[0] {
        Value::String(_) => args[0].clone(),
        other => Value::String(other.to_string()),
    })
}

fn fn_type(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    Ok(Value::String(args[0].type_name().to_owned()))
}

fn fn_max(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    extreme(&args[0], Ordering::Greater)
}

fn fn_min(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    extreme(&args[0], Ordering::Less)
}

/// Returns the element comparing as `wanted` against all others. The
/// signature guarantees an all-number or all-string array.
fn extreme(arg: &Value, wanted: Ordering) -> Result<Value> {
    let Value::Array(array) = arg else { unreachable!() };
    let mut best: Option<&Value> = None;
    for candidate in array {
        best = Some(match best {
            None => candidate,
            Some(best) if compare_values(candidate, best) == wanted => candidate,
            Some(best) => best,
        });
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => Ordering::Equal,
        },
    }
}

/// A comparable key produced by a `_by` expression.
enum SortKey {
    Num(f64),
    Str(String),
}

impl SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Num(a), SortKey::Num(b)) => a.total_cmp(b),
            (SortKey::Str(a), SortKey::Str(b)) => a.cmp(b),
            // Mixed kinds are rejected before comparison.
            _ => Ordering::Equal,
        }
    }
}

/// Applies the key expression to every element. All keys must be numbers
/// or all strings, otherwise the call is an invalid-type error.
fn sort_keys(
    interp: &Interpreter<'_>,
    name: &str,
    array: &[Value],
    expr: &Ast,
) -> Result<Vec<SortKey>> {
    let mut keys = Vec::with_capacity(array.len());
    for element in array {
        let key = interp.eval(expr, element)?;
        let key = match key {
            Value::Number(n) => SortKey::Num(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => SortKey::Str(s),
            other => {
                return Err(Error::InvalidType(
                    format!(
                        "{name}() key must be a number or a string, got {}",
                        other.type_name()
                    )
                    .into(),
                ));
            }
        };
        if let Some(first) = keys.first() {
            if std::mem::discriminant::<SortKey>(first) != std::mem::discriminant(&key) {
                return Err(Error::InvalidType(
                    format!("{name}() keys must all be numbers or all strings").into(),
                ));
            }
        }
        keys.push(key);
    }
    Ok(keys)
}

fn extreme_by(
    interp: &Interpreter<'_>,
    name: &str,
    args: &[Value],
    wanted: Ordering,
) -> Result<Value> {
    let (Value::Array(array), Value::Expref(expr)) = (&args[0], &args[1]) else { unreachable!() };
    let keys = sort_keys(interp, name, array, expr)?;
    let mut best: Option<usize> = None;
    for (i, key) in keys.iter().enumerate() {
        best = Some(match best {
            None => i,
            Some(b) if key.cmp(&keys[b]) == wanted => i,
            Some(b) => b,
        });
    }
    Ok(best.map(|i| array[i].clone()).unwrap_or(Value::Null))
}

fn fn_max_by(interp: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    extreme_by(interp, "max_by", args, Ordering::Greater)
}

fn fn_min_by(interp: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    extreme_by(interp, "min_by", args, Ordering::Less)
}

fn fn_sort(_: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let Value::Array(array) = &args[0] else { unreachable!() };
    let mut sorted = array.clone();
    sorted.sort_by(compare_values);
    Ok(Value::Array(sorted))
}

fn fn_sort_by(interp: &Interpreter<'_>, args: &[Value]) -> Result<Value> {
    let (Value::Array(array), Value::Expref(expr)) = (&args[0], &args[1]) else { unreachable!() };
    let keys = sort_keys(interp, "sort_by", array, expr)?;
    let mut order: Vec<usize> = (0..array.len()).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    Ok(Value::Array(order.into_iter().map(|i| array[i].clone()).collect()))
}

fn format_datetime(dt: DateTime<Local>) -> Value {
    Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, false))
}

fn fn_current_datetime(_: &Interpreter<'_>, _: &[Value]) -> Result<Value> {
    Ok(format_datetime(Local::now()))
}

/// Now shifted by the first argument times `factor` seconds.
fn shift_seconds(args: &[Value], factor: i64) -> Result<Value> {
    let Value::Number(n) = &args[0] else { unreachable!() };
    let seconds = (n.as_f64().unwrap_or(0.0) * factor as f64) as i64;
    let delta = Duration::try_seconds(seconds)
        .ok_or_else(|| Error::InvalidValue("datetime offset out of range".into()))?;
    Local::now()
        .checked_add_signed(delta)
        .map(format_datetime)
        .ok_or_else(|| Error::InvalidValue("datetime out of range".into()))
}

/// Now shifted by whole calendar months, clamping the day of month to the
/// length of the target month and preserving the time of day.
fn shift_months(args: &[Value], factor: i64) -> Result<Value> {
    let Value::Number(n) = &args[0] else { unreachable!() };
    let count = (n.as_f64().unwrap_or(0.0) as i64)
        .checked_mul(factor)
        .ok_or_else(|| Error::InvalidValue("datetime offset out of range".into()))?;
    let months = Months::new(
        u32::try_from(count.unsigned_abs())
            .map_err(|_| Error::InvalidValue("datetime offset out of range".into()))?,
    );
    let now = Local::now();
    let shifted = if count >= 0 {
        now.checked_add_months(months)
    } else {
        now.checked_sub_months(months)
    };
    shifted
        .map(format_datetime)
        .ok_or_else(|| Error::InvalidValue("datetime out of range".into()))
}
