//! Function libraries
//!
//! A library is a named, stateless table of host functions. Scopes import
//! libraries in order and the first library that knows a name answers the
//! call. Calls return a local boxed future so host functions may suspend.

pub mod standard;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::{self, FutureExt, LocalBoxFuture};

use super::dates::Clock;
use super::errors::{EvalError, EvalResult};
use super::types::Value;

pub use standard::{StandardFunction, StandardLibrary};

/// Run-level context handed to library functions
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    pub clock: &'a Clock,
}

/// A table of host functions callable from scripts
pub trait Library: Send + Sync {
    fn name(&self) -> &str;

    fn has(&self, function: &str) -> bool;

    fn call<'a>(
        &'a self,
        cx: CallContext<'a>,
        function: &'a str,
        args: Vec<Value>,
    ) -> LocalBoxFuture<'a, EvalResult<Value>>;
}

/* ===================== Function Table ===================== */

type HostFunction = Arc<dyn Fn(CallContext<'_>, Vec<Value>) -> EvalResult<Value> + Send + Sync>;

/// Library built from named host closures
#[derive(Clone)]
pub struct FunctionTable {
    name: String,
    functions: HashMap<String, HostFunction>,
}

impl FunctionTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: HashMap::new(),
        }
    }

    /// Register (or replace) a function
    pub fn register<F>(&mut self, function: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(CallContext<'_>, Vec<Value>) -> EvalResult<Value> + Send + Sync + 'static,
    {
        self.functions.insert(function.into(), Arc::new(f));
        self
    }

    pub fn with<F>(mut self, function: impl Into<String>, f: F) -> Self
    where
        F: Fn(CallContext<'_>, Vec<Value>) -> EvalResult<Value> + Send + Sync + 'static,
    {
        self.register(function, f);
        self
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionTable")
            .field("name", &self.name)
            .field("functions", &names)
            .finish()
    }
}

impl Library for FunctionTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn has(&self, function: &str) -> bool {
        self.functions.contains_key(function)
    }

    fn call<'a>(
        &'a self,
        cx: CallContext<'a>,
        function: &'a str,
        args: Vec<Value>,
    ) -> LocalBoxFuture<'a, EvalResult<Value>> {
        let result = match self.functions.get(function) {
            Some(f) => f(cx, args),
            None => Err(EvalError::MethodNotFound(function.to_string())),
        };
        future::ready(result).boxed_local()
    }
}
