//! Control flow result of evaluating an instruction

use super::values::Value;

/// Tri-state evaluation result
///
/// `Break` is not an error: it travels up through blocks, conditionals and
/// closure calls until the nearest array iteration consumes it.
#[derive(Debug, Clone)]
pub enum Flow {
    /// Evaluation completed without producing a value
    Continue,
    Value(Value),
    Break,
}

impl Flow {
    /// Value produced, `Empty` for `Continue` and `Break`
    pub fn into_value(self) -> Value {
        match self {
            Flow::Value(value) => value,
            Flow::Continue | Flow::Break => Value::Empty,
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Flow::Break)
    }
}

impl From<Value> for Flow {
    fn from(value: Value) -> Self {
        Flow::Value(value)
    }
}

/// Unwrap a `Flow` into a value, returning early from the enclosing
/// evaluation when it carries a `Break`.
macro_rules! value {
    ($flow:expr) => {
        match $flow {
            $crate::interpreter::types::Flow::Value(value) => value,
            $crate::interpreter::types::Flow::Continue => {
                $crate::interpreter::types::Value::Empty
            }
            $crate::interpreter::types::Flow::Break => {
                return Ok($crate::interpreter::types::Flow::Break)
            }
        }
    };
}

pub(crate) use value;
