//! Runtime value types

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Number, Value as JsonValue};

use super::ast::Instruction;
use crate::interpreter::data_view::DataView;
use crate::interpreter::dates::{DateTimeValue, DateValue};
use crate::interpreter::scope::ScopeId;

/// Shared, interior-mutable storage for arrays and objects.
///
/// Values are confined to a single run on a single thread, so `Rc<RefCell>`
/// is enough. Borrows are never held across an await point.
pub type Shared<T> = Rc<RefCell<T>>;

/// Runtime value type
#[derive(Debug, Clone)]
pub enum Value {
    /// Missing data; answers every message with itself
    Empty,
    Number(f64),
    String(Rc<str>),
    Bool(bool),
    Array(Shared<Vec<Value>>),
    Object(Shared<IndexMap<String, Value>>),
    Date(DateValue),
    DateTime(DateTimeValue),
    Closure(Closure),
    /// Live projection into the host context
    Data(DataView),
    /// The environment itself, target of unqualified get/set/call sends
    Scope(ScopeId),
}

/// A callable value: parameter names, a body and the scope it was defined in
#[derive(Debug, Clone)]
pub struct Closure {
    pub params: Arc<[String]>,
    pub body: Arc<Instruction>,
    pub scope: ScopeId,
}

impl Value {
    pub fn string(text: impl Into<Rc<str>>) -> Value {
        Value::String(text.into())
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(members: IndexMap<String, Value>) -> Value {
        Value::Object(Rc::new(RefCell::new(members)))
    }

    /// Name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "Empty",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Bool(_) => "Bool",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::Closure(_) => "Closure",
            Value::Data(_) => "Data",
            Value::Scope(_) => "Scope",
        }
    }

    pub fn is_empty_value(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Boolean-ness of the native value
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Empty => false,
            Value::Bool(b) => *b,
            Value::Number(n) => {
                let rounded = round_to_cents(*n);
                rounded != 0.0 && !rounded.is_nan()
            }
            Value::String(s) => !s.is_empty(),
            Value::Data(view) => !view.is_null(),
            Value::Array(_)
            | Value::Object(_)
            | Value::Date(_)
            | Value::DateTime(_)
            | Value::Closure(_)
            | Value::Scope(_) => true,
        }
    }

    /// Textual representation used for concatenation, `STRING` and keys
    pub fn to_text(&self) -> String {
        match self {
            Value::Empty | Value::Closure(_) | Value::Scope(_) => String::new(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Date(date) => date.to_string(),
            Value::DateTime(instant) => instant.to_string(),
            Value::Array(_) | Value::Object(_) | Value::Data(_) => self.to_native().to_string(),
        }
    }

    /// Convert to the host representation.
    ///
    /// This is the only place numbers are rounded. An array or object that
    /// contains itself renders the inner occurrence as `null`.
    pub fn to_native(&self) -> JsonValue {
        self.native(&mut Vec::new())
    }

    fn native(&self, open: &mut Vec<*const ()>) -> JsonValue {
        let address = match self {
            Value::Array(items) => Rc::as_ptr(items) as *const (),
            Value::Object(members) => Rc::as_ptr(members) as *const (),
            _ => std::ptr::null(),
        };
        if !address.is_null() {
            if open.contains(&address) {
                return JsonValue::Null;
            }
            open.push(address);
        }

        let native = match self {
            Value::Empty | Value::Closure(_) | Value::Scope(_) => JsonValue::Null,
            Value::Number(n) => number_to_native(*n),
            Value::String(s) => JsonValue::String(s.to_string()),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Array(items) => {
                JsonValue::Array(items.borrow().iter().map(|item| item.native(open)).collect())
            }
            Value::Object(members) => JsonValue::Object(
                members
                    .borrow()
                    .iter()
                    .map(|(name, value)| (name.clone(), value.native(open)))
                    .collect(),
            ),
            Value::Date(date) => JsonValue::String(date.to_string()),
            Value::DateTime(instant) => JsonValue::String(instant.to_string()),
            Value::Data(view) => view.to_native(),
        };

        if !address.is_null() {
            open.pop();
        }
        native
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/* ===================== Number Rendering ===================== */

/// Round half up to two decimals
pub fn round_to_cents(n: f64) -> f64 {
    (n * 100.0 + 0.5).floor() / 100.0
}

fn number_to_native(n: f64) -> JsonValue {
    let rounded = round_to_cents(n);
    if rounded.fract() == 0.0 && rounded.abs() < 9.0e15 {
        return JsonValue::from(rounded as i64);
    }
    Number::from_f64(rounded)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn format_number(n: f64) -> String {
    let rounded = round_to_cents(n);
    if rounded.fract() == 0.0 && rounded.abs() < 9.0e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}
