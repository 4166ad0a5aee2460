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

//! The tree interpreter.
//!
//! Evaluation walks the AST with a *current* value; the document root is
//! tracked separately for `$`. Absence during navigation (a missing key,
//! an out-of-range index, a type mismatch in a subexpression) is never an
//! error: it yields null. Errors are reserved for function contract
//! violations and semantically invalid values.

use crate::ast::{Ast, Comparator, Slice};
use crate::error::{Error, Result};
use crate::functions;
use crate::value::{Map, Value};

/// Evaluation context.
pub(crate) struct Interpreter<'a> {
    /// The document root referenced by `$`.
    root: &'a Value,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(root: &'a Value) -> Self {
        Interpreter { root }
    }

    pub(crate) fn eval(&self, node: &Ast, current: &Value) -> Result<Value> {
        match node {
            Ast::Identity => Ok(current.clone()),
            Ast::Root => Ok(self.root.clone()),
            Ast::Field { name } => Ok(match current.as_object() {
                Some(object) => object.get(name).cloned().unwrap_or(Value::Null),
                None => Value::Null,
            }),
            Ast::Index { index } => Ok(match current.as_array() {
                Some(array) => index_array(array, *index),
                None => Value::Null,
            }),
            Ast::Literal { value } => Ok(value.clone()),
            Ast::Subexpression { lhs, rhs } => {
                let value = self.eval(lhs, current)?;
                if value.is_null() {
                    Ok(Value::Null)
                } else {
                    self.eval(rhs, &value)
                }
            }
            Ast::Comparison { op, lhs, rhs } => {
                let left = self.eval(lhs, current)?;
                let right = self.eval(rhs, current)?;
                Ok(compare(*op, &left, &right))
            }
            Ast::And { lhs, rhs } => {
                let left = self.eval(lhs, current)?;
                if !left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(rhs, current)
                }
            }
            Ast::Or { lhs, rhs } => {
                let left = self.eval(lhs, current)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(rhs, current)
                }
            }
            Ast::Not { expr } => {
                let value = self.eval(expr, current)?;
                Ok(Value::Bool(!value.is_truthy()))
            }
            Ast::Pipe { lhs, rhs } => {
                let value = self.eval(lhs, current)?;
                self.eval(rhs, &value)
            }
            Ast::Flatten { expr } => {
                let value = self.eval(expr, current)?;
                let Value::Array(array) = value else {
                    return Ok(Value::Null);
                };
                let mut flat = Vec::with_capacity(array.len());
                for element in array {
                    match element {
                        Value::Array(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                Ok(Value::Array(flat))
            }
            Ast::Projection { lhs, rhs } => {
                let value = self.eval(lhs, current)?;
                let Value::Array(array) = value else {
                    return Ok(Value::Null);
                };
                self.project(array, rhs)
            }
            Ast::ObjectProjection { lhs, rhs } => {
                let value = self.eval(lhs, current)?;
                let Value::Object(object) = value else {
                    return Ok(Value::Null);
                };
                self.project(object.into_values().collect(), rhs)
            }
            Ast::SliceProjection { lhs, slice, rhs } => {
                let value = self.eval(lhs, current)?;
                let Value::Array(array) = value else {
                    return Ok(Value::Null);
                };
                let step = slice.step.unwrap_or(1);
                if step == 0 {
                    return Err(Error::InvalidValue("slice step cannot be 0".into()));
                }
                self.project(slice_array(&array, slice, step), rhs)
            }
            Ast::FilterProjection {
                lhs,
                predicate,
                rhs,
            } => {
                let value = self.eval(lhs, current)?;
                let Value::Array(array) = value else {
                    return Ok(Value::Null);
                };
                let mut kept = Vec::new();
                for element in array {
                    if self.eval(predicate, &element)?.is_truthy() {
                        kept.push(element);
                    }
                }
                self.project(kept, rhs)
            }
            Ast::MultiSelectList { elements } => {
                if current.is_null() {
                    return Ok(Value::Null);
                }
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element, current)?);
                }
                Ok(Value::Array(values))
            }
            Ast::MultiSelectHash { entries } => {
                if current.is_null() {
                    return Ok(Value::Null);
                }
                let mut object = Map::new();
                for (key, expr) in entries {
                    object.insert(key.clone(), self.eval(expr, current)?);
                }
                Ok(Value::Object(object))
            }
            Ast::Function { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, current)?);
                }
                functions::call(self, name, &values)
            }
            Ast::Expref { expr } => Ok(Value::Expref(expr.clone())),
        }
    }

    /// Applies the projection body to each element, dropping nulls.
    fn project(&self, elements: Vec<Value>, rhs: &Ast) -> Result<Value> {
        let mut collected = Vec::with_capacity(elements.len());
        for element in elements {
            let value = self.eval(rhs, &element)?;
            if !value.is_null() {
                collected.push(value);
            }
        }
        Ok(Value::Array(collected))
    }
}

fn index_array(array: &[Value], index: i64) -> Value {
    let len = array.len() as i64;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        array[index as usize].clone()
    } else {
        Value::Null
    }
}

/// `==`/`!=` use deep structural equality. Ordered comparisons are defined
/// on two numbers (by value) and on two strings (lexicographic, which
/// orders ISO-8601 timestamps chronologically); anything else yields null.
fn compare(op: Comparator, left: &Value, right: &Value) -> Value {
    let ordering = match (left, right) {
        (Value::String(l), Value::String(r)) => l.cmp(r),
        _ => match op {
            Comparator::Eq => return Value::Bool(left == right),
            Comparator::Ne => return Value::Bool(left != right),
            _ => {
                let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else {
                    return Value::Null;
                };
                return Value::Bool(match op {
                    Comparator::Lt => l < r,
                    Comparator::Le => l <= r,
                    Comparator::Gt => l > r,
                    _ => l >= r,
                });
            }
        },
    };
    Value::Bool(match op {
        Comparator::Eq => ordering.is_eq(),
        Comparator::Ne => !ordering.is_eq(),
        Comparator::Lt => ordering.is_lt(),
        Comparator::Le => ordering.is_le(),
        Comparator::Gt => ordering.is_gt(),
        Comparator::Ge => ordering.is_ge(),
    })
}

/// Bounds default by step sign; explicit bounds are normalized against the
/// length and clamped, negative values counting from the end.
fn slice_array(array: &[Value], slice: &Slice, step: i64) -> Vec<Value> {
    let len = array.len() as i64;
    let adjust = |bound: i64| -> i64 {
        if bound < 0 {
            let bound = bound + len;
            if bound < 0 {
                if step < 0 {
                    -1
                } else {
                    0
                }
            } else {
                bound
            }
        } else if bound >= len {
            if step < 0 {
                len - 1
            } else {
                len
            }
        } else {
            bound
        }
    };
    let start = match slice.start {
        Some(s) => adjust(s),
        None if step < 0 => len - 1,
        None => 0,
    };
    let stop = match slice.stop {
        Some(s) => adjust(s),
        None if step < 0 => -1,
        None => len,
    };
    let mut out = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < stop {
            out.push(array[i as usize].clone());
            i += step;
        }
    } else {
        while i > stop {
            out.push(array[i as usize].clone());
            i += step;
        }
    }
    out
}
