//! Error types for building and evaluating programs
//!
//! Build errors are raised by the AST builder before any evaluation starts.
//! Evaluation errors abort the whole run and surface from `Program::run`.

use thiserror::Error;

/* ===================== Build Errors ===================== */

/// Malformed generic tree
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("Can't find instruction `{0}`")]
    UnknownInstruction(String),

    #[error("Instruction `{instruction}` doesn't have property `{field}`")]
    UnknownField { instruction: String, field: String },

    #[error("Instruction `{instruction}` is missing property `{field}`")]
    MissingField { instruction: String, field: String },

    #[error("Property `{field}` of instruction `{instruction}` must be {expected}")]
    InvalidField {
        instruction: String,
        field: String,
        expected: &'static str,
    },

    #[error("Program root must be an instruction or a list of instructions")]
    NotAnInstruction,
}

/* ===================== Evaluation Errors ===================== */

/// Fatal evaluation failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Variable `{0}` is already declared")]
    DuplicateDeclaration(String),

    #[error("Variable `{0}` is not declared")]
    UndeclaredVariable(String),

    #[error("Method `{0}` not found")]
    MethodNotFound(String),

    #[error("Unknown message `{selector}` on type {receiver}")]
    MessageNotFound {
        selector: String,
        receiver: &'static str,
    },

    #[error("Type mismatch: cannot {operation} {left} and {right}")]
    TypeMismatch {
        operation: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("Unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("Invalid date `{0}`")]
    InvalidDate(String),
}

impl EvalError {
    pub(crate) fn mismatch(operation: &'static str, left: &'static str, right: &'static str) -> Self {
        EvalError::TypeMismatch {
            operation,
            left,
            right,
        }
    }
}

/* ===================== Top-level Error ===================== */

/// Any failure surfaced to the host
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Result of a single evaluation step
pub type EvalResult<T> = std::result::Result<T, EvalError>;
