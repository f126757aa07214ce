//! Type definitions for the interpreter
//!
//! - Instruction tree (Instruction, Operand, Member)
//! - Runtime values (Value, Closure)
//! - Message selectors (Selector)
//! - Control flow (Flow)

pub mod ast;
pub mod control;
pub mod message;
pub mod values;

pub use ast::{Instruction, Member, Operand};
pub use control::Flow;
pub use message::Selector;
pub use values::{Closure, Shared, Value};
