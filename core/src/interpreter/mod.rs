//! Rule language interpreter
//!
//! A generic parse tree is compiled by the builder into an `Instruction`
//! tree; a `Program` evaluates it against a host JSON context and yields one
//! `Value`, converted to JSON with `Value::to_native`.
//!
//! ```no_run
//! use serde_json::json;
//! use verdict::interpreter::Program;
//!
//! # async fn demo() -> verdict::interpreter::Result<()> {
//! let program = Program::compile(&json!({
//!     "type": "Math",
//!     "init": { "type": "Number", "value": 2 },
//!     "list": [{ "operator": "*", "value": { "type": "Number", "value": 3 } }]
//! }))?;
//! assert_eq!(program.eval(None).await?, json!(6));
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod data_view;
pub mod dates;
pub mod errors;
pub mod evaluate;
mod messages;
pub mod program;
pub mod scope;
pub mod stdlib;
pub mod types;

#[cfg(test)]
mod tests;

pub use builder::{build, compile, Node};
pub use data_view::{DataModel, DataView};
pub use dates::{Clock, DateTimeValue, DateValue};
pub use errors::{BuildError, Error, EvalError, EvalResult, Result};
pub use evaluate::Runtime;
pub use program::{Program, ProgramConfig};
pub use scope::{ScopeId, Scopes};
pub use stdlib::{CallContext, FunctionTable, Library, StandardLibrary};
pub use types::{Flow, Instruction, Selector, Value};
