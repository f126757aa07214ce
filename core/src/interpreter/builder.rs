//! AST builder
//!
//! Turns the generic parse tree (JSON) into an `Instruction` tree. Objects
//! carrying a `type` field are looked up in the schema table next to
//! `Instruction`; every other field of such an object must be declared by
//! the schema. Fields are built recursively first and then handed to the
//! schema's constructor through `Fields`, which checks their shape.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::errors::BuildError;
use super::types::{Instruction, Member, Operand};

/// A built generic-tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<Node>),
    /// Object without a `type`, walked field by field
    Record(IndexMap<String, Node>),
    Instruction(Instruction),
}

/// Build any generic-tree node
pub fn build(node: &JsonValue) -> Result<Node, BuildError> {
    Ok(match node {
        JsonValue::Null => Node::Null,
        JsonValue::Bool(b) => Node::Bool(*b),
        JsonValue::Number(n) => n.as_f64().map_or(Node::Null, Node::Number),
        JsonValue::String(s) => Node::Text(s.clone()),
        JsonValue::Array(items) => Node::List(items.iter().map(build).collect::<Result<_, _>>()?),
        JsonValue::Object(object) => match object.get("type") {
            Some(kind) => Node::Instruction(build_instruction(kind, object)?),
            None => Node::Record(
                object
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), build(value)?)))
                    .collect::<Result<_, BuildError>>()?,
            ),
        },
    })
}

fn build_instruction(
    kind: &JsonValue,
    object: &serde_json::Map<String, JsonValue>,
) -> Result<Instruction, BuildError> {
    let type_name = match kind {
        JsonValue::String(name) => name.as_str(),
        other => return Err(BuildError::UnknownInstruction(other.to_string())),
    };
    let schema = Instruction::schema(type_name)
        .ok_or_else(|| BuildError::UnknownInstruction(type_name.to_string()))?;

    let mut values = IndexMap::new();
    for (key, value) in object {
        if key == "type" {
            continue;
        }
        if !schema.fields.contains(&key.as_str()) {
            return Err(BuildError::UnknownField {
                instruction: type_name.to_string(),
                field: key.clone(),
            });
        }
        values.insert(key.clone(), build(value)?);
    }

    (schema.construct)(&mut Fields {
        instruction: type_name.to_string(),
        values,
    })
}

/// Compile a program root: one instruction, or a list of instructions run
/// as a block
pub fn compile(tree: &JsonValue) -> Result<Instruction, BuildError> {
    let root = match build(tree)? {
        Node::Instruction(instruction) => instruction,
        Node::List(items) => Instruction::Block {
            lines: items
                .into_iter()
                .map(|item| match item {
                    Node::Instruction(instruction) => Ok(instruction),
                    _ => Err(BuildError::NotAnInstruction),
                })
                .collect::<Result<_, _>>()?,
        },
        _ => return Err(BuildError::NotAnInstruction),
    };
    debug!(kind = root.kind(), size = root.size(), "compiled program");
    Ok(root)
}

/* ===================== Field Extraction ===================== */

/// Built fields of one instruction, consumed by its schema constructor
pub(crate) struct Fields {
    instruction: String,
    values: IndexMap<String, Node>,
}

impl Fields {
    fn take(&mut self, field: &str) -> Option<Node> {
        match self.values.shift_remove(field) {
            Some(Node::Null) | None => None,
            Some(node) => Some(node),
        }
    }

    fn missing(&self, field: &str) -> BuildError {
        BuildError::MissingField {
            instruction: self.instruction.clone(),
            field: field.to_string(),
        }
    }

    fn invalid(&self, field: &str, expected: &'static str) -> BuildError {
        BuildError::InvalidField {
            instruction: self.instruction.clone(),
            field: field.to_string(),
            expected,
        }
    }

    fn require(&mut self, field: &str) -> Result<Node, BuildError> {
        self.take(field).ok_or_else(|| self.missing(field))
    }

    fn instruction_of(&self, field: &str, node: Node) -> Result<Instruction, BuildError> {
        match node {
            Node::Instruction(instruction) => Ok(instruction),
            _ => Err(self.invalid(field, "an instruction")),
        }
    }

    pub fn boxed(&mut self, field: &str) -> Result<Box<Instruction>, BuildError> {
        let node = self.require(field)?;
        self.instruction_of(field, node).map(Box::new)
    }

    pub fn shared(&mut self, field: &str) -> Result<Arc<Instruction>, BuildError> {
        let node = self.require(field)?;
        self.instruction_of(field, node).map(Arc::new)
    }

    /// Absent or null is `None`
    pub fn optional(&mut self, field: &str) -> Result<Option<Box<Instruction>>, BuildError> {
        match self.take(field) {
            Some(node) => self.instruction_of(field, node).map(|i| Some(Box::new(i))),
            None => Ok(None),
        }
    }

    /// List of instructions; absent is empty
    pub fn instructions(&mut self, field: &str) -> Result<Vec<Instruction>, BuildError> {
        match self.take(field) {
            None => Ok(Vec::new()),
            Some(Node::List(items)) => items
                .into_iter()
                .map(|item| match item {
                    Node::Instruction(instruction) => Ok(instruction),
                    _ => Err(self.invalid(field, "a list of instructions")),
                })
                .collect(),
            Some(_) => Err(self.invalid(field, "a list of instructions")),
        }
    }

    /// Number, or numeric text
    pub fn number(&mut self, field: &str) -> Result<f64, BuildError> {
        match self.require(field)? {
            Node::Number(n) => Ok(n),
            Node::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| self.invalid(field, "a number")),
            _ => Err(self.invalid(field, "a number")),
        }
    }

    pub fn text(&mut self, field: &str) -> Result<String, BuildError> {
        match self.require(field)? {
            Node::Text(text) => Ok(text),
            _ => Err(self.invalid(field, "a string")),
        }
    }

    pub fn text_or(&mut self, field: &str, default: &str) -> Result<String, BuildError> {
        match self.take(field) {
            None => Ok(default.to_string()),
            Some(Node::Text(text)) => Ok(text),
            Some(_) => Err(self.invalid(field, "a string")),
        }
    }

    /// List of names; absent is empty
    pub fn names(&mut self, field: &str) -> Result<Vec<String>, BuildError> {
        match self.take(field) {
            None => Ok(Vec::new()),
            Some(Node::List(items)) => items
                .into_iter()
                .map(|item| match item {
                    Node::Text(name) => Ok(name),
                    _ => Err(self.invalid(field, "a list of names")),
                })
                .collect(),
            Some(_) => Err(self.invalid(field, "a list of names")),
        }
    }

    /// `[{operator, value}]`; absent is empty
    pub fn operands(&mut self, field: &str) -> Result<Vec<Operand>, BuildError> {
        self.records(field, "a list of {operator, value}", "operator")?
            .into_iter()
            .map(|(operator, value)| Ok(Operand { operator, value }))
            .collect()
    }

    /// `[{name, value}]`; absent is empty
    pub fn members(&mut self, field: &str) -> Result<Vec<Member>, BuildError> {
        self.records(field, "a list of {name, value}", "name")?
            .into_iter()
            .map(|(name, value)| Ok(Member { name, value }))
            .collect()
    }

    /// Records pairing a text `key` with an instruction `value`
    fn records(
        &mut self,
        field: &str,
        expected: &'static str,
        key: &str,
    ) -> Result<Vec<(String, Instruction)>, BuildError> {
        let items = match self.take(field) {
            None => return Ok(Vec::new()),
            Some(Node::List(items)) => items,
            Some(_) => return Err(self.invalid(field, expected)),
        };
        items
            .into_iter()
            .map(|item| {
                let Node::Record(mut record) = item else {
                    return Err(self.invalid(field, expected));
                };
                match (record.shift_remove(key), record.shift_remove("value")) {
                    (Some(Node::Text(label)), Some(Node::Instruction(value))) => Ok((label, value)),
                    _ => Err(self.invalid(field, expected)),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builds_nested_instructions() {
        let tree = json!({
            "type": "Math",
            "init": { "type": "Number", "value": 1 },
            "list": [{ "operator": "+", "value": { "type": "NumberInstruction", "value": 2 } }]
        });
        let built = compile(&tree).unwrap();
        assert_eq!(
            built,
            Instruction::Math {
                init: Box::new(Instruction::Number { value: 1.0 }),
                list: vec![Operand {
                    operator: "+".to_string(),
                    value: Instruction::Number { value: 2.0 },
                }],
            }
        );
        assert_eq!(built.size(), 3);
    }

    #[test]
    fn test_primitives_and_records_pass_through() {
        let built = build(&json!({ "a": [1, "x", null, true] })).unwrap();
        let Node::Record(record) = built else {
            panic!("expected a record");
        };
        assert_eq!(
            record["a"],
            Node::List(vec![
                Node::Number(1.0),
                Node::Text("x".to_string()),
                Node::Null,
                Node::Bool(true),
            ])
        );
    }

    #[test]
    fn test_unknown_instruction() {
        let err = compile(&json!({ "type": "Loop" })).unwrap_err();
        assert_eq!(err, BuildError::UnknownInstruction("Loop".to_string()));
    }

    #[test]
    fn test_unknown_field() {
        let err = compile(&json!({ "type": "Number", "value": 1, "unit": "kg" })).unwrap_err();
        assert_eq!(
            err,
            BuildError::UnknownField {
                instruction: "Number".to_string(),
                field: "unit".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_and_invalid_fields() {
        let err = compile(&json!({ "type": "Nest" })).unwrap_err();
        assert!(matches!(err, BuildError::MissingField { ref field, .. } if field == "value"));

        let err = compile(&json!({ "type": "Nest", "value": 5 })).unwrap_err();
        assert!(matches!(
            err,
            BuildError::InvalidField { ref field, expected: "an instruction", .. } if field == "value"
        ));
    }

    #[test]
    fn test_list_root_becomes_block() {
        let built = compile(&json!([{ "type": "True" }, { "type": "Break" }])).unwrap();
        assert_eq!(
            built,
            Instruction::Block {
                lines: vec![Instruction::Bool { value: true }, Instruction::Break],
            }
        );
        assert_eq!(compile(&json!(5)).unwrap_err(), BuildError::NotAnInstruction);
        assert_eq!(compile(&json!([1])).unwrap_err(), BuildError::NotAnInstruction);
    }

    #[test]
    fn test_optional_fields() {
        let built = compile(&json!({
            "type": "If",
            "test": { "type": "True" },
            "ok": { "type": "Number", "value": 1 },
            "fail": null
        }))
        .unwrap();
        assert!(matches!(built, Instruction::If { fail: None, .. }));

        let built = compile(&json!({ "type": "Compare", "a": { "type": "True" }, "b": { "type": "False" } }))
            .unwrap();
        assert!(matches!(built, Instruction::Compare { ref operator, .. } if operator == "=="));
    }

    #[test]
    fn test_function_parameters() {
        let built = compile(&json!({
            "type": "Function",
            "name": "f",
            "args": ["a", "b"],
            "block": { "type": "Block", "lines": [] }
        }))
        .unwrap();
        let Instruction::Function { args, .. } = built else {
            panic!("expected a function");
        };
        assert_eq!(&*args, &["a".to_string(), "b".to_string()]);
    }
}
