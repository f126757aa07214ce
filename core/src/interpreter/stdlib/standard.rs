//! Standard library
//!
//! Conversions (`STRING`, `NUMBER`, `BOOL`), aggregations over arrays
//! (`COUNT`, `MIN`, `MAX`, `SUM`, `FIRST`, `LAST`, `CONCAT`) and the clock
//! (`now`, `today`). Imported last, so host libraries can shadow any of these.

use futures::future::{self, FutureExt, LocalBoxFuture};
use tracing::trace;

use super::{CallContext, Library};
use crate::interpreter::errors::EvalResult;
use crate::interpreter::types::Value;

/* ===================== Standard Function Types ===================== */

/// Standard library function identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFunction {
    String,
    Number,
    Bool,
    Count,
    Min,
    Max,
    Sum,
    First,
    Last,
    Concat,
    Now,
    Today,
}

impl StandardFunction {
    pub fn from_name(name: &str) -> Option<StandardFunction> {
        Some(match name {
            "STRING" => StandardFunction::String,
            "NUMBER" => StandardFunction::Number,
            "BOOL" => StandardFunction::Bool,
            "COUNT" => StandardFunction::Count,
            "MIN" => StandardFunction::Min,
            "MAX" => StandardFunction::Max,
            "SUM" => StandardFunction::Sum,
            "FIRST" => StandardFunction::First,
            "LAST" => StandardFunction::Last,
            "CONCAT" => StandardFunction::Concat,
            "now" => StandardFunction::Now,
            "today" => StandardFunction::Today,
            _ => return None,
        })
    }
}

/* ===================== Dispatcher ===================== */

/// Call a standard function with evaluated arguments
pub fn call_standard(
    function: StandardFunction,
    cx: CallContext<'_>,
    args: &[Value],
) -> EvalResult<Value> {
    let first = args.first().cloned().unwrap_or(Value::Empty);
    match function {
        StandardFunction::String => Ok(string(&first)),
        StandardFunction::Number => Ok(number(&first)),
        StandardFunction::Bool => Ok(boolean(&first)),
        StandardFunction::Count => Ok(Value::Number(items(&first).len() as f64)),
        StandardFunction::Min => extreme(&items(&first), |order| order > 0.0),
        StandardFunction::Max => extreme(&items(&first), |order| order < 0.0),
        StandardFunction::Sum => sum(&items(&first)),
        StandardFunction::First => Ok(items(&first).first().cloned().unwrap_or(Value::Empty)),
        StandardFunction::Last => Ok(items(&first).last().cloned().unwrap_or(Value::Empty)),
        StandardFunction::Concat => concat(&items(&first)),
        StandardFunction::Now => Ok(Value::DateTime(cx.clock.now()?)),
        StandardFunction::Today => Ok(Value::Date(cx.clock.today()?)),
    }
}

/// Elements of an array argument; anything else counts as no elements
fn items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.borrow().clone(),
        _ => Vec::new(),
    }
}

fn string(value: &Value) -> Value {
    let text = value.to_text();
    if text.is_empty() {
        Value::Empty
    } else {
        Value::string(text)
    }
}

fn number(value: &Value) -> Value {
    if let Value::Number(n) = value {
        return Value::Number(*n);
    }
    leading_number(&value.to_text()).map_or(Value::Empty, Value::Number)
}

/// Longest numeric prefix of `text`, ignoring leading whitespace
fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !matches!(c, '0'..='9' | '+' | '-' | '.' | 'e' | 'E'))
        .unwrap_or(text.len());
    let candidate = &text[..end];
    (1..=candidate.len())
        .rev()
        .find_map(|len| candidate[..len].parse::<f64>().ok())
}

fn boolean(value: &Value) -> Value {
    match value {
        Value::String(s) if &**s == "false" => Value::Bool(false),
        Value::Number(n) if *n == 0.0 => Value::Bool(false),
        other => Value::Bool(other.is_truthy()),
    }
}

/// Keep the element for which `replace(init compare next)` never held
fn extreme(items: &[Value], replace: impl Fn(f64) -> bool) -> EvalResult<Value> {
    let Some((init, rest)) = items.split_first() else {
        return Ok(Value::Empty);
    };
    let mut best = init.clone();
    for next in rest {
        if let Value::Number(order) = best.compare(next)? {
            if replace(order) {
                best = next.clone();
            }
        }
    }
    Ok(best)
}

fn sum(items: &[Value]) -> EvalResult<Value> {
    let Some((init, rest)) = items.split_first() else {
        return Ok(Value::Empty);
    };
    rest.iter()
        .try_fold(init.clone(), |total, next| total.add(next))
}

fn concat(items: &[Value]) -> EvalResult<Value> {
    let Some((init, rest)) = items.split_first() else {
        return Ok(Value::string(""));
    };
    rest.iter()
        .try_fold(string(init), |text, next| text.add(next))
}

/* ===================== Library ===================== */

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLibrary;

impl Library for StandardLibrary {
    fn name(&self) -> &str {
        "standard"
    }

    fn has(&self, function: &str) -> bool {
        StandardFunction::from_name(function).is_some()
    }

    fn call<'a>(
        &'a self,
        cx: CallContext<'a>,
        function: &'a str,
        args: Vec<Value>,
    ) -> LocalBoxFuture<'a, EvalResult<Value>> {
        trace!(function, args = args.len(), "standard call");
        let result = match StandardFunction::from_name(function) {
            Some(standard) => call_standard(standard, cx, &args),
            None => Ok(Value::Empty),
        };
        future::ready(result).boxed_local()
    }
}
