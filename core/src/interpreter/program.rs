//! Compiled programs
//!
//! A `Program` is an instruction tree plus the configuration and libraries
//! it runs with. It holds no run state: every run builds a fresh scope arena,
//! so one program can be run any number of times, from any thread.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use super::builder;
use super::data_view::DataModel;
use super::dates::Clock;
use super::errors::Result;
use super::evaluate::Runtime;
use super::stdlib::{Library, StandardLibrary};
use super::types::{Instruction, Value};

/// Clock override and timezone tag for runs of a program
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    /// ISO instant returned by `now()`; the first ten characters are `today()`
    pub clock: Option<String>,
    pub timezone: Option<String>,
}

pub struct Program {
    root: Instruction,
    config: ProgramConfig,
    libraries: Vec<Arc<dyn Library>>,
}

impl Program {
    pub fn new(root: Instruction) -> Self {
        Self {
            root,
            config: ProgramConfig::default(),
            libraries: Vec::new(),
        }
    }

    /// Build a program from a generic parse tree
    pub fn compile(tree: &JsonValue) -> Result<Self> {
        Ok(Self::new(builder::compile(tree)?))
    }

    pub fn with_config(mut self, config: ProgramConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: impl Into<String>) -> Self {
        self.config.clock = Some(clock.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.config.timezone = Some(timezone.into());
        self
    }

    /// Import a host library; it is consulted before the standard library,
    /// and before libraries added after it
    pub fn with_library(mut self, library: impl Library + 'static) -> Self {
        self.libraries.push(Arc::new(library));
        self
    }

    pub fn root(&self) -> &Instruction {
        &self.root
    }

    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    /// Run against an optional host context
    pub async fn run(&self, context: Option<JsonValue>) -> Result<Value> {
        let model = DataModel::new(context.unwrap_or(JsonValue::Null));
        self.run_with_model(&model).await
    }

    /// Run against a host document the caller keeps; script writes are
    /// visible through `DataModel::snapshot` afterwards
    pub async fn run_with_model(&self, model: &DataModel) -> Result<Value> {
        let clock = Clock::new(self.config.clock.clone(), self.config.timezone.clone());
        let runtime = Runtime::new(clock);
        let scopes = runtime.scopes();

        let root = scopes.root(Some(model.view()));
        for library in &self.libraries {
            scopes.import(root, library.clone());
        }
        scopes.import(root, Arc::new(StandardLibrary));

        debug!(
            kind = self.root.kind(),
            libraries = self.libraries.len() + 1,
            "running program"
        );
        let flow = runtime.evaluate(&self.root, root).await?;
        debug!(scopes = scopes.len(), stopped = flow.is_break(), "program finished");

        Ok(flow.into_value())
    }

    /// Run and convert the result to its native form
    pub async fn eval(&self, context: Option<JsonValue>) -> Result<JsonValue> {
        Ok(self.run(context).await?.to_native())
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let libraries: Vec<_> = self.libraries.iter().map(|library| library.name()).collect();
        f.debug_struct("Program")
            .field("root", &self.root.kind())
            .field("config", &self.config)
            .field("libraries", &libraries)
            .finish()
    }
}
