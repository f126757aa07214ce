//! External data view
//!
//! Scripts read and write host-supplied JSON through `DataView`s. A view is a
//! shared handle on the whole host document plus a path to the node it
//! projects, so writes made by a script land in the document the host handed
//! over, and nested objects read from a view stay live.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value as JsonValue;

use super::types::Value;

/// Path segment type - either an integer index or a string key
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// Host document shared between the host and one run
#[derive(Debug, Clone)]
pub struct DataModel {
    document: Rc<RefCell<JsonValue>>,
}

impl DataModel {
    pub fn new(document: JsonValue) -> Self {
        Self {
            document: Rc::new(RefCell::new(document)),
        }
    }

    /// View on the document root
    pub fn view(&self) -> DataView {
        DataView {
            document: self.document.clone(),
            path: Vec::new(),
        }
    }

    /// Current state of the document, including script writes
    pub fn snapshot(&self) -> JsonValue {
        self.document.borrow().clone()
    }
}

/// Read/write projection over one node of a host document
#[derive(Debug, Clone)]
pub struct DataView {
    document: Rc<RefCell<JsonValue>>,
    path: Vec<PathSegment>,
}

impl DataView {
    fn child(&self, segment: PathSegment) -> DataView {
        let mut path = self.path.clone();
        path.push(segment);
        DataView {
            document: self.document.clone(),
            path,
        }
    }

    fn with_node<R>(&self, f: impl FnOnce(Option<&JsonValue>) -> R) -> R {
        let document = self.document.borrow();
        f(node_at_path(&document, &self.path))
    }

    pub fn is_null(&self) -> bool {
        self.with_node(|node| node.map_or(true, JsonValue::is_null))
    }

    /// Whether the projected node is an object holding `name`
    pub fn has(&self, name: &str) -> bool {
        self.with_node(|node| {
            node.and_then(JsonValue::as_object)
                .is_some_and(|object| object.contains_key(name))
        })
    }

    /// Read a member (or an element, when the node is an array and `name`
    /// is an index)
    pub fn get(&self, name: &str) -> Value {
        let segment = self.with_node(|node| match node {
            Some(JsonValue::Object(object)) if object.contains_key(name) => {
                Some(PathSegment::Key(name.to_string()))
            }
            Some(JsonValue::Array(items)) => name
                .parse::<usize>()
                .ok()
                .filter(|index| *index < items.len())
                .map(PathSegment::Index),
            _ => None,
        });
        match segment {
            Some(segment) => self.child(segment).project(),
            None => Value::Empty,
        }
    }

    /// Write a member, storing its native form.
    ///
    /// Returns `Empty` when the projected node is not an object.
    pub fn set(&self, name: &str, value: Value) -> Value {
        // Convert first: the value may itself be a view on this document
        let native = value.to_native();
        let mut document = self.document.borrow_mut();
        match node_at_path_mut(&mut document, &self.path) {
            Some(JsonValue::Object(object)) => {
                object.insert(name.to_string(), native);
                value
            }
            _ => Value::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.with_node(|node| match node {
            None | Some(JsonValue::Null) => true,
            Some(JsonValue::String(text)) => text.is_empty(),
            Some(JsonValue::Array(items)) => items.is_empty(),
            Some(JsonValue::Object(object)) => object.is_empty(),
            Some(_) => false,
        })
    }

    pub fn to_native(&self) -> JsonValue {
        self.with_node(|node| node.cloned().unwrap_or(JsonValue::Null))
    }

    /// Box the projected node as a runtime value.
    ///
    /// Objects stay live views, arrays become arrays of projected elements,
    /// `null` and `""` become `Empty`.
    pub fn project(&self) -> Value {
        enum Shape {
            Scalar(Value),
            Array(usize),
            Object,
        }

        let shape = self.with_node(|node| match node {
            None | Some(JsonValue::Null) => Shape::Scalar(Value::Empty),
            Some(JsonValue::String(text)) if text.is_empty() => Shape::Scalar(Value::Empty),
            Some(JsonValue::String(text)) => Shape::Scalar(Value::string(text.as_str())),
            Some(JsonValue::Number(n)) => {
                Shape::Scalar(n.as_f64().map_or(Value::Empty, Value::Number))
            }
            Some(JsonValue::Bool(b)) => Shape::Scalar(Value::Bool(*b)),
            Some(JsonValue::Array(items)) => Shape::Array(items.len()),
            Some(JsonValue::Object(_)) => Shape::Object,
        });

        match shape {
            Shape::Scalar(value) => value,
            Shape::Array(len) => Value::array(
                (0..len)
                    .map(|index| self.child(PathSegment::Index(index)).project())
                    .collect(),
            ),
            Shape::Object => Value::Data(self.clone()),
        }
    }

    /// Find the first place in the document that holds `name`.
    ///
    /// A direct hit projects to one view per element when the value is an
    /// array, otherwise to a single view. Without a direct hit, every array
    /// member is searched element by element, in key order, and the first
    /// non-empty result wins.
    pub fn search(&self, name: &str) -> Vec<DataView> {
        enum Hit {
            Direct(Option<usize>),
            Nested(Vec<(String, usize)>),
            Nothing,
        }

        let hit = self.with_node(|node| {
            let Some(JsonValue::Object(object)) = node else {
                return Hit::Nothing;
            };
            if let Some(value) = object.get(name) {
                return Hit::Direct(value.as_array().map(Vec::len));
            }
            Hit::Nested(
                object
                    .iter()
                    .filter_map(|(key, value)| {
                        value.as_array().map(|items| (key.clone(), items.len()))
                    })
                    .collect(),
            )
        });

        match hit {
            Hit::Nothing => Vec::new(),
            Hit::Direct(None) => vec![self.child(PathSegment::Key(name.to_string()))],
            Hit::Direct(Some(len)) => {
                let list = self.child(PathSegment::Key(name.to_string()));
                (0..len)
                    .map(|index| list.child(PathSegment::Index(index)))
                    .collect()
            }
            Hit::Nested(arrays) => {
                for (key, len) in arrays {
                    let list = self.child(PathSegment::Key(key));
                    for index in 0..len {
                        let found = list.child(PathSegment::Index(index)).search(name);
                        if !found.is_empty() {
                            return found;
                        }
                    }
                }
                Vec::new()
            }
        }
    }
}

/* ===================== Path Navigation ===================== */

fn node_at_path<'a>(root: &'a JsonValue, path: &[PathSegment]) -> Option<&'a JsonValue> {
    let mut current = root;
    for segment in path {
        current = match segment {
            PathSegment::Index(idx) => current.get(idx)?,
            PathSegment::Key(key) => current.get(key.as_str())?,
        };
    }
    Some(current)
}

fn node_at_path_mut<'a>(
    root: &'a mut JsonValue,
    path: &[PathSegment],
) -> Option<&'a mut JsonValue> {
    let mut current = root;
    for segment in path {
        current = match segment {
            PathSegment::Index(idx) => current.get_mut(idx)?,
            PathSegment::Key(key) => current.get_mut(key.as_str())?,
        };
    }
    Some(current)
}
