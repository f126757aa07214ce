//! Instruction tree
//!
//! One variant per language construct. Instructions are immutable once built
//! and hold structural data only; bodies that closures capture are kept
//! behind `Arc` so a compiled program can be shared across runs.
//!
//! # Adding an Instruction
//!
//! 1. Add the variant to `Instruction`
//! 2. Add a row to `SCHEMAS` naming its generic-tree type and fields
//! 3. Add its arm to `Runtime::evaluate`
//!
//! The builder itself never changes.

use std::sync::Arc;

use crate::interpreter::builder::Fields;
use crate::interpreter::errors::BuildError;

/// Typed AST node with an evaluation contract
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Block {
        lines: Vec<Instruction>,
    },
    Number {
        value: f64,
    },
    String {
        value: String,
    },
    Bool {
        value: bool,
    },
    Date {
        value: String,
    },
    DateTime {
        value: String,
    },
    Nest {
        value: Box<Instruction>,
    },
    Negation {
        value: Box<Instruction>,
    },
    When {
        test: Box<Instruction>,
        ok: Box<Instruction>,
        fail: Box<Instruction>,
    },
    If {
        test: Box<Instruction>,
        ok: Box<Instruction>,
        fail: Option<Box<Instruction>>,
    },
    Array {
        list: Vec<Instruction>,
    },
    Math {
        init: Box<Instruction>,
        list: Vec<Operand>,
    },
    And {
        init: Box<Instruction>,
        list: Vec<Operand>,
    },
    Or {
        init: Box<Instruction>,
        list: Vec<Operand>,
    },
    Compare {
        a: Box<Instruction>,
        b: Box<Instruction>,
        operator: String,
    },
    Variable {
        name: String,
        value: Box<Instruction>,
    },
    Assignment {
        id: String,
        value: Box<Instruction>,
    },
    Return {
        value: Option<Box<Instruction>>,
    },
    Break,
    Object {
        members: Vec<Member>,
    },
    Scope,
    Get {
        args: Vec<Instruction>,
    },
    Set {
        args: Vec<Instruction>,
    },
    Call {
        args: Vec<Instruction>,
    },
    For {
        iterator: String,
        list: Box<Instruction>,
        block: Arc<Instruction>,
    },
    Generator {
        from: Box<Instruction>,
        to: Box<Instruction>,
    },
    Function {
        name: String,
        args: Arc<[String]>,
        block: Arc<Instruction>,
    },
    /// Runs `block` for every match of `name` in the current scope's data
    /// view. Only the root and each-match scopes carry a view, so inside a
    /// function or loop body there is nothing to search.
    Each {
        name: String,
        block: Box<Instruction>,
    },
    /// Back-tick title; `value` is kept but never evaluated
    Translate {
        title: String,
        value: Option<Box<Instruction>>,
    },
}

/// `operator value` pair of a fold
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub operator: String,
    pub value: Instruction,
}

/// `name: value` pair of an object literal
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub value: Instruction,
}

impl Instruction {
    /// Generic-tree type name of this instruction
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::Block { .. } => "Block",
            Instruction::Number { .. } => "Number",
            Instruction::String { .. } => "String",
            Instruction::Bool { value: true } => "True",
            Instruction::Bool { value: false } => "False",
            Instruction::Date { .. } => "Date",
            Instruction::DateTime { .. } => "DateTime",
            Instruction::Nest { .. } => "Nest",
            Instruction::Negation { .. } => "Negation",
            Instruction::When { .. } => "When",
            Instruction::If { .. } => "If",
            Instruction::Array { .. } => "Array",
            Instruction::Math { .. } => "Math",
            Instruction::And { .. } => "And",
            Instruction::Or { .. } => "Or",
            Instruction::Compare { .. } => "Compare",
            Instruction::Variable { .. } => "Variable",
            Instruction::Assignment { .. } => "Assignment",
            Instruction::Return { .. } => "Return",
            Instruction::Break => "Break",
            Instruction::Object { .. } => "Object",
            Instruction::Scope => "Scope",
            Instruction::Get { .. } => "Get",
            Instruction::Set { .. } => "Set",
            Instruction::Call { .. } => "Call",
            Instruction::For { .. } => "For",
            Instruction::Generator { .. } => "Generator",
            Instruction::Function { .. } => "Function",
            Instruction::Each { .. } => "Each",
            Instruction::Translate { .. } => "Translate",
        }
    }

    /// Number of nodes in this subtree
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|child| child.size()).sum::<usize>()
    }

    fn children(&self) -> Vec<&Instruction> {
        match self {
            Instruction::Block { lines: list }
            | Instruction::Array { list }
            | Instruction::Get { args: list }
            | Instruction::Set { args: list }
            | Instruction::Call { args: list } => list.iter().collect(),
            Instruction::Nest { value }
            | Instruction::Negation { value }
            | Instruction::Variable { value, .. }
            | Instruction::Assignment { value, .. } => vec![&**value],
            Instruction::When { test, ok, fail } => vec![&**test, &**ok, &**fail],
            Instruction::If { test, ok, fail } => {
                let mut children = vec![&**test, &**ok];
                children.extend(fail.as_deref());
                children
            }
            Instruction::Math { init, list }
            | Instruction::And { init, list }
            | Instruction::Or { init, list } => std::iter::once(&**init)
                .chain(list.iter().map(|operand| &operand.value))
                .collect(),
            Instruction::Compare { a, b, .. } => vec![&**a, &**b],
            Instruction::Return { value } => value.as_deref().into_iter().collect(),
            Instruction::Object { members } => members.iter().map(|m| &m.value).collect(),
            Instruction::For { list, block, .. } => vec![&**list, &**block],
            Instruction::Generator { from, to } => vec![&**from, &**to],
            Instruction::Function { block, .. } => vec![&**block],
            Instruction::Each { block, .. } => vec![&**block],
            // The title argument is never evaluated, so it is not counted either
            Instruction::Translate { .. }
            | Instruction::Number { .. }
            | Instruction::String { .. }
            | Instruction::Bool { .. }
            | Instruction::Date { .. }
            | Instruction::DateTime { .. }
            | Instruction::Break
            | Instruction::Scope => vec![],
        }
    }

    /// Find the schema for a generic-tree type name, with or without the
    /// `Instruction` suffix
    pub(crate) fn schema(type_name: &str) -> Option<&'static Schema> {
        let bare = type_name.strip_suffix("Instruction").unwrap_or(type_name);
        SCHEMAS.iter().find(|schema| schema.name == bare)
    }
}

/* ===================== Schemas ===================== */

/// Shape of one generic-tree node type: its accepted fields and how to
/// construct the instruction from them once they are built
pub(crate) struct Schema {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub construct: fn(&mut Fields) -> Result<Instruction, BuildError>,
}

pub(crate) static SCHEMAS: &[Schema] = &[
    Schema {
        name: "Block",
        fields: &["lines"],
        construct: |f| Ok(Instruction::Block {
            lines: f.instructions("lines")?,
        }),
    },
    Schema {
        name: "Number",
        fields: &["value"],
        construct: |f| Ok(Instruction::Number {
            value: f.number("value")?,
        }),
    },
    Schema {
        name: "String",
        fields: &["value"],
        construct: |f| Ok(Instruction::String {
            value: f.text_or("value", "")?,
        }),
    },
    Schema {
        name: "True",
        fields: &[],
        construct: |_| Ok(Instruction::Bool { value: true }),
    },
    Schema {
        name: "False",
        fields: &[],
        construct: |_| Ok(Instruction::Bool { value: false }),
    },
    Schema {
        name: "Date",
        fields: &["value"],
        construct: |f| Ok(Instruction::Date {
            value: f.text("value")?,
        }),
    },
    Schema {
        name: "DateTime",
        fields: &["value"],
        construct: |f| Ok(Instruction::DateTime {
            value: f.text("value")?,
        }),
    },
    Schema {
        name: "Nest",
        fields: &["value"],
        construct: |f| Ok(Instruction::Nest {
            value: f.boxed("value")?,
        }),
    },
    Schema {
        name: "Negation",
        fields: &["value"],
        construct: |f| Ok(Instruction::Negation {
            value: f.boxed("value")?,
        }),
    },
    Schema {
        name: "When",
        fields: &["test", "ok", "fail"],
        construct: |f| Ok(Instruction::When {
            test: f.boxed("test")?,
            ok: f.boxed("ok")?,
            fail: f.boxed("fail")?,
        }),
    },
    Schema {
        name: "If",
        fields: &["test", "ok", "fail"],
        construct: |f| Ok(Instruction::If {
            test: f.boxed("test")?,
            ok: f.boxed("ok")?,
            fail: f.optional("fail")?,
        }),
    },
    Schema {
        name: "Array",
        fields: &["list"],
        construct: |f| Ok(Instruction::Array {
            list: f.instructions("list")?,
        }),
    },
    Schema {
        name: "Math",
        fields: &["init", "list"],
        construct: |f| Ok(Instruction::Math {
            init: f.boxed("init")?,
            list: f.operands("list")?,
        }),
    },
    Schema {
        name: "And",
        fields: &["init", "list"],
        construct: |f| Ok(Instruction::And {
            init: f.boxed("init")?,
            list: f.operands("list")?,
        }),
    },
    Schema {
        name: "Or",
        fields: &["init", "list"],
        construct: |f| Ok(Instruction::Or {
            init: f.boxed("init")?,
            list: f.operands("list")?,
        }),
    },
    Schema {
        name: "Compare",
        fields: &["a", "b", "operator"],
        construct: |f| Ok(Instruction::Compare {
            a: f.boxed("a")?,
            b: f.boxed("b")?,
            operator: f.text_or("operator", "==")?,
        }),
    },
    Schema {
        name: "Variable",
        fields: &["name", "value"],
        construct: |f| Ok(Instruction::Variable {
            name: f.text("name")?,
            value: f.boxed("value")?,
        }),
    },
    Schema {
        name: "Assignment",
        fields: &["id", "value"],
        construct: |f| Ok(Instruction::Assignment {
            id: f.text("id")?,
            value: f.boxed("value")?,
        }),
    },
    Schema {
        name: "Return",
        fields: &["value"],
        construct: |f| Ok(Instruction::Return {
            value: f.optional("value")?,
        }),
    },
    Schema {
        name: "Break",
        fields: &[],
        construct: |_| Ok(Instruction::Break),
    },
    Schema {
        name: "Object",
        fields: &["members"],
        construct: |f| Ok(Instruction::Object {
            members: f.members("members")?,
        }),
    },
    Schema {
        name: "Scope",
        fields: &[],
        construct: |_| Ok(Instruction::Scope),
    },
    Schema {
        name: "Get",
        fields: &["args"],
        construct: |f| Ok(Instruction::Get {
            args: f.instructions("args")?,
        }),
    },
    Schema {
        name: "Set",
        fields: &["args"],
        construct: |f| Ok(Instruction::Set {
            args: f.instructions("args")?,
        }),
    },
    Schema {
        name: "Call",
        fields: &["args"],
        construct: |f| Ok(Instruction::Call {
            args: f.instructions("args")?,
        }),
    },
    Schema {
        name: "For",
        fields: &["iterator", "list", "block"],
        construct: |f| Ok(Instruction::For {
            iterator: f.text("iterator")?,
            list: f.boxed("list")?,
            block: f.shared("block")?,
        }),
    },
    Schema {
        name: "Generator",
        fields: &["from", "to"],
        construct: |f| Ok(Instruction::Generator {
            from: f.boxed("from")?,
            to: f.boxed("to")?,
        }),
    },
    Schema {
        name: "Function",
        fields: &["name", "args", "block"],
        construct: |f| Ok(Instruction::Function {
            name: f.text("name")?,
            args: f.names("args")?.into(),
            block: f.shared("block")?,
        }),
    },
    Schema {
        name: "Each",
        fields: &["self", "block"],
        construct: |f| Ok(Instruction::Each {
            name: f.text("self")?,
            block: f.boxed("block")?,
        }),
    },
    Schema {
        name: "Translate",
        fields: &["title", "value"],
        construct: |f| Ok(Instruction::Translate {
            title: f.text_or("title", "")?,
            value: f.optional("value")?,
        }),
    },
];
