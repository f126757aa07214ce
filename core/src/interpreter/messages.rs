//! Message handlers for runtime values
//!
//! `Value::send` dispatches a selector to the handler of the receiver's
//! variant. Messages that need the evaluator (closure calls, array iteration,
//! scope resolution) are answered by `Runtime::send` before falling back here.

use std::cmp::Ordering;

use indexmap::IndexMap;

use super::dates::{DateTimeValue, DateValue};
use super::errors::{EvalError, EvalResult};
use super::types::{Selector, Shared, Value};

impl Value {
    /// Send a message that needs no evaluator.
    ///
    /// `Empty` answers everything with itself (and `isEmpty` with true);
    /// other receivers fail with `MessageNotFound` for selectors they don't
    /// handle.
    pub fn send(&self, selector: &Selector, args: &[Value]) -> EvalResult<Value> {
        // Nothing orders against a missing value, whichever side it is on
        if *selector == Selector::Compare && matches!(args.first(), None | Some(Value::Empty)) {
            return Ok(Value::Empty);
        }

        let handled = match self {
            Value::Empty => {
                return Ok(match selector {
                    Selector::IsEmpty => Value::Bool(true),
                    _ => Value::Empty,
                })
            }
            Value::Number(n) => number(*n, selector, args)?,
            Value::String(s) => string(s, selector, args)?,
            Value::Bool(b) => boolean(*b, selector, args)?,
            Value::Array(items) => array(items, selector, args)?,
            Value::Object(members) => object(members, selector, args)?,
            Value::Date(date) => date_message(date, selector, args)?,
            Value::DateTime(instant) => datetime_message(instant, selector, args)?,
            Value::Data(view) => match selector {
                Selector::Get => Some(view.get(&arg(args, 0).to_text())),
                Selector::Set => Some(view.set(&arg(args, 0).to_text(), arg(args, 1))),
                Selector::Has => Some(Value::Bool(view.has(&arg(args, 0).to_text()))),
                Selector::IsEmpty => Some(Value::Bool(view.is_empty())),
                _ => None,
            },
            Value::Closure(_) | Value::Scope(_) => None,
        };

        handled.ok_or_else(|| EvalError::MessageNotFound {
            selector: selector.name().to_string(),
            receiver: self.type_name(),
        })
    }

    /// Three-way comparison through the `compare` message
    pub fn compare(&self, other: &Value) -> EvalResult<Value> {
        self.send(&Selector::Compare, std::slice::from_ref(other))
    }

    /// Addition through the `add` message
    pub fn add(&self, other: &Value) -> EvalResult<Value> {
        self.send(&Selector::Add, std::slice::from_ref(other))
    }
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Empty)
}

fn ordering(order: Ordering) -> Value {
    Value::Number(match order {
        Ordering::Less => -1.0,
        Ordering::Equal => 0.0,
        Ordering::Greater => 1.0,
    })
}

/// NaN compares as "less", like an unordered pair would under `==` then `>`
fn compare_numbers(a: f64, b: f64) -> Value {
    ordering(a.partial_cmp(&b).unwrap_or(Ordering::Less))
}

/* ===================== Number ===================== */

fn number(n: f64, selector: &Selector, args: &[Value]) -> EvalResult<Option<Value>> {
    let rhs = arg(args, 0);
    let result = match (selector, &rhs) {
        (Selector::Add, Value::Number(m)) => Value::Number(n + m),
        (Selector::Add, Value::String(s)) => Value::string(format!("{}{}", Value::Number(n), s)),
        (Selector::Sub, Value::Number(m)) => Value::Number(n - m),
        (Selector::Mul, Value::Number(m)) => Value::Number(n * m),
        (Selector::Div, Value::Number(m)) => Value::Number(n / m),
        (Selector::Compare, Value::Number(m)) => compare_numbers(n, *m),
        (Selector::Add | Selector::Sub | Selector::Mul | Selector::Div | Selector::Compare, _) => {
            return Err(EvalError::mismatch(
                operation_name(selector),
                "Number",
                rhs.type_name(),
            ))
        }
        (Selector::Neg, _) => Value::Number(-n),
        (Selector::IsEmpty, _) => Value::Bool(false),
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn operation_name(selector: &Selector) -> &'static str {
    match selector {
        Selector::Add => "add",
        Selector::Sub => "subtract",
        Selector::Mul => "multiply",
        Selector::Div => "divide",
        _ => "compare",
    }
}

/* ===================== String ===================== */

fn string(s: &str, selector: &Selector, args: &[Value]) -> EvalResult<Option<Value>> {
    let result = match selector {
        Selector::Add => Value::string(format!("{}{}", s, arg(args, 0).to_text())),
        Selector::Compare => ordering(s.cmp(arg(args, 0).to_text().as_str())),
        Selector::IsEmpty => Value::Bool(s.is_empty()),
        Selector::ToUpper => Value::string(s.to_uppercase()),
        Selector::ToLower => Value::string(s.to_lowercase()),
        Selector::Length => Value::Number(s.chars().count() as f64),
        _ => return Ok(None),
    };
    Ok(Some(result))
}

/* ===================== Bool ===================== */

fn boolean(b: bool, selector: &Selector, args: &[Value]) -> EvalResult<Option<Value>> {
    let result = match selector {
        Selector::And => Value::Bool(b && arg(args, 0).is_truthy()),
        Selector::Or => Value::Bool(b || arg(args, 0).is_truthy()),
        Selector::Neg => Value::Bool(!b),
        Selector::IsEmpty => Value::Bool(false),
        Selector::Compare => match arg(args, 0) {
            Value::Bool(other) => ordering(b.cmp(&other)),
            other => return Err(EvalError::mismatch("compare", "Bool", other.type_name())),
        },
        _ => return Ok(None),
    };
    Ok(Some(result))
}

/* ===================== Array ===================== */

/// Furthest a set may write past the end of an array
const MAX_ARRAY_GAP: usize = 10_000;

/// Index from a whole, non-negative number (or its text)
fn index_of(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn array(items: &Shared<Vec<Value>>, selector: &Selector, args: &[Value]) -> EvalResult<Option<Value>> {
    let result = match selector {
        Selector::Get => index_of(&arg(args, 0))
            .and_then(|index| items.borrow().get(index).cloned())
            .unwrap_or(Value::Empty),
        Selector::Set => {
            let key = arg(args, 0);
            let mut items = items.borrow_mut();
            let index = index_of(&key)
                .filter(|index| index - items.len().min(*index) <= MAX_ARRAY_GAP)
                .ok_or_else(|| EvalError::mismatch("index", "Array", key.type_name()))?;
            let value = arg(args, 1);
            if index >= items.len() {
                items.resize(index.saturating_add(1), Value::Empty);
            }
            items[index] = value.clone();
            value
        }
        Selector::Length => Value::Number(items.borrow().len() as f64),
        Selector::IsEmpty => Value::Bool(items.borrow().is_empty()),
        _ => return Ok(None),
    };
    Ok(Some(result))
}

/* ===================== Object ===================== */

fn object(
    members: &Shared<IndexMap<String, Value>>,
    selector: &Selector,
    args: &[Value],
) -> EvalResult<Option<Value>> {
    let result = match selector {
        Selector::Get => members
            .borrow()
            .get(&arg(args, 0).to_text())
            .cloned()
            .unwrap_or(Value::Empty),
        Selector::Set => {
            let value = arg(args, 1);
            members
                .borrow_mut()
                .insert(arg(args, 0).to_text(), value.clone());
            value
        }
        Selector::Has => Value::Bool(members.borrow().contains_key(&arg(args, 0).to_text())),
        Selector::Length => Value::Number(members.borrow().len() as f64),
        Selector::IsEmpty => Value::Bool(members.borrow().is_empty()),
        _ => return Ok(None),
    };
    Ok(Some(result))
}

/* ===================== Date / DateTime ===================== */

fn date_message(date: &DateValue, selector: &Selector, args: &[Value]) -> EvalResult<Option<Value>> {
    let rhs = arg(args, 0);
    let result = match (selector, &rhs) {
        (Selector::Add, Value::Number(n)) => Value::Date(date.add_days(*n)?),
        (Selector::Sub, Value::Number(n)) => Value::Date(date.add_days(-n)?),
        (Selector::Sub, Value::Date(other)) => Value::Number(date.days_since(other.day())),
        (Selector::Sub, Value::DateTime(other)) => {
            Value::Number(date.days_since(other.date().day()))
        }
        (Selector::Add | Selector::Sub, _) => Value::Empty,
        (Selector::Compare, Value::Date(other)) => ordering(date.day().cmp(&other.day())),
        (Selector::Compare, Value::DateTime(other)) => {
            ordering(date.day().cmp(&other.date().day()))
        }
        (Selector::Compare, Value::String(text)) => ordering(date.to_string().as_str().cmp(text)),
        (Selector::Compare, _) => {
            return Err(EvalError::mismatch("compare", "Date", rhs.type_name()))
        }
        (Selector::Start, _) => Value::DateTime(date.start()),
        (Selector::End, _) => Value::DateTime(date.end()),
        (Selector::IsEmpty, _) => Value::Bool(false),
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn datetime_message(
    instant: &DateTimeValue,
    selector: &Selector,
    args: &[Value],
) -> EvalResult<Option<Value>> {
    let rhs = arg(args, 0);
    let day = instant.date();
    let result = match (selector, &rhs) {
        (Selector::Add, Value::Number(n)) => Value::DateTime(instant.add_days(*n)?),
        (Selector::Sub, Value::Number(n)) => Value::DateTime(instant.add_days(-n)?),
        (Selector::Sub, Value::DateTime(other)) => Value::Number(day.days_since(other.date().day())),
        (Selector::Sub, Value::Date(other)) => Value::Number(day.days_since(other.day())),
        (Selector::Add | Selector::Sub, _) => Value::Empty,
        (Selector::Compare, Value::DateTime(other)) => {
            ordering(instant.instant().cmp(&other.instant()))
        }
        (Selector::Compare, Value::Date(other)) => ordering(day.day().cmp(&other.day())),
        (Selector::Compare, Value::String(text)) => {
            ordering(instant.to_string().as_str().cmp(text))
        }
        (Selector::Compare, _) => {
            return Err(EvalError::mismatch("compare", "DateTime", rhs.type_name()))
        }
        (Selector::Date, _) => Value::Date(day),
        (Selector::IsEmpty, _) => Value::Bool(false),
        _ => return Ok(None),
    };
    Ok(Some(result))
}
