//! Scope chain
//!
//! Scopes of one run live in an arena owned by the runtime and are addressed
//! by `ScopeId`. A child keeps its parent's id; parents never point at their
//! children, so closures capturing a scope can't form reference cycles.
//!
//! Frames of finished calls, iterations and each-matches are released and
//! reused, unless a closure or scope value captured them. A captured frame
//! keeps its ancestors alive until the run ends.
//!
//! Only the frame a data view was attached to (the root, or an each-match)
//! can be searched by `each`; function and loop bodies have no view of
//! their own, so an `each` directly inside them finds nothing.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use super::data_view::DataView;
use super::errors::{EvalError, EvalResult};
use super::stdlib::Library;
use super::types::Value;

/// Handle on a scope in the run's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Default)]
struct ScopeFrame {
    variables: HashMap<String, Value>,
    libraries: Vec<Arc<dyn Library>>,
    view: Option<DataView>,
    parent: Option<ScopeId>,
    captured: bool,
}

/// What a call name resolved to
pub enum Callee {
    /// A closure variable; the runtime sends it `call`
    Closure(Value),
    Library(Arc<dyn Library>),
}

/// Arena of all scopes created during one run
#[derive(Default)]
pub struct Scopes {
    frames: RefCell<Vec<ScopeFrame>>,
    free: RefCell<Vec<ScopeId>>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope with no parent
    pub fn root(&self, view: Option<DataView>) -> ScopeId {
        self.push(ScopeFrame {
            view,
            ..ScopeFrame::default()
        })
    }

    /// Create a scope whose lookups fall back to `parent`
    pub fn child(&self, parent: ScopeId, view: Option<DataView>) -> ScopeId {
        self.push(ScopeFrame {
            view,
            parent: Some(parent),
            ..ScopeFrame::default()
        })
    }

    fn push(&self, frame: ScopeFrame) -> ScopeId {
        let mut frames = self.frames.borrow_mut();
        if let Some(id) = self.free.borrow_mut().pop() {
            frames[id.0] = frame;
            return id;
        }
        frames.push(frame);
        ScopeId(frames.len() - 1)
    }

    /// Keep `scope` and its ancestors for the rest of the run
    pub fn capture(&self, scope: ScopeId) {
        let mut frames = self.frames.borrow_mut();
        let mut current = Some(scope);
        while let Some(id) = current {
            let frame = &mut frames[id.0];
            if frame.captured {
                break;
            }
            frame.captured = true;
            current = frame.parent;
        }
    }

    /// Recycle a finished child scope. Roots and captured scopes stay.
    pub fn release(&self, scope: ScopeId) {
        let mut frames = self.frames.borrow_mut();
        let frame = &mut frames[scope.0];
        if frame.captured || frame.parent.is_none() {
            return;
        }
        *frame = ScopeFrame::default();
        self.free.borrow_mut().push(scope);
    }

    /// Number of live scopes
    pub fn len(&self) -> usize {
        self.frames.borrow().len() - self.free.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a library to the scope's import list
    pub fn import(&self, scope: ScopeId, library: Arc<dyn Library>) {
        self.frames.borrow_mut()[scope.0].libraries.push(library);
    }

    fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.frames.borrow()[scope.0].parent
    }

    fn view(&self, scope: ScopeId) -> Option<DataView> {
        self.frames.borrow()[scope.0].view.clone()
    }

    /* ===================== Variables ===================== */

    /// Declare in this scope only
    pub fn declare(&self, scope: ScopeId, name: &str, value: Value) -> EvalResult<Value> {
        let mut frames = self.frames.borrow_mut();
        let variables = &mut frames[scope.0].variables;
        if variables.contains_key(name) {
            return Err(EvalError::DuplicateDeclaration(name.to_string()));
        }
        trace!(name, scope = scope.0, "declare");
        variables.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Read a name: locals, then the data view, then the parent. Never fails.
    pub fn get(&self, scope: ScopeId, name: &str) -> Value {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(value) = self.frames.borrow()[id.0].variables.get(name) {
                return value.clone();
            }
            if let Some(view) = self.view(id) {
                if view.has(name) {
                    return view.get(name);
                }
            }
            current = self.parent(id);
        }
        Value::Empty
    }

    /// Overwrite the nearest binding of `name`.
    ///
    /// A data view only takes the write when it already holds the key.
    pub fn set(&self, scope: ScopeId, name: &str, value: Value) -> EvalResult<Value> {
        let mut current = Some(scope);
        while let Some(id) = current {
            {
                let mut frames = self.frames.borrow_mut();
                if let Some(slot) = frames[id.0].variables.get_mut(name) {
                    *slot = value.clone();
                    return Ok(value);
                }
            }
            if let Some(view) = self.view(id) {
                if view.has(name) {
                    return Ok(view.set(name, value));
                }
            }
            current = self.parent(id);
        }
        Err(EvalError::UndeclaredVariable(name.to_string()))
    }

    /// Resolve a call name: a local variable holding a closure, then the
    /// scope's libraries in import order, then the parent
    pub fn resolve_call(&self, scope: ScopeId, name: &str) -> EvalResult<Callee> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let frames = self.frames.borrow();
            let frame = &frames[id.0];
            if let Some(closure @ Value::Closure(_)) = frame.variables.get(name) {
                return Ok(Callee::Closure(closure.clone()));
            }
            if let Some(library) = frame.libraries.iter().find(|library| library.has(name)) {
                return Ok(Callee::Library(library.clone()));
            }
            current = frame.parent;
        }
        Err(EvalError::MethodNotFound(name.to_string()))
    }

    /// Matches for an each-block, from this scope's data view only
    pub fn search(&self, scope: ScopeId, name: &str) -> Vec<DataView> {
        self.view(scope)
            .map(|view| view.search(name))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::data_view::DataModel;
    use crate::interpreter::stdlib::FunctionTable;
    use crate::interpreter::types::{Closure, Instruction};
    use serde_json::json;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_declare_is_local_only() {
        let scopes = Scopes::new();
        let root = scopes.root(None);
        let child = scopes.child(root, None);

        scopes.declare(root, "a", num(1.0)).unwrap();
        scopes.declare(child, "a", num(2.0)).unwrap();
        assert_eq!(scopes.get(child, "a").to_native(), json!(2));
        assert_eq!(scopes.get(root, "a").to_native(), json!(1));

        let err = scopes.declare(root, "a", num(3.0)).unwrap_err();
        assert_eq!(err, EvalError::DuplicateDeclaration("a".to_string()));
    }

    #[test]
    fn test_get_walks_view_then_parent() {
        let model = DataModel::new(json!({ "a": "from view", "b": 5 }));
        let scopes = Scopes::new();
        let root = scopes.root(Some(model.view()));
        let child = scopes.child(root, None);

        scopes.declare(root, "a", Value::string("local")).unwrap();
        assert_eq!(scopes.get(child, "a").to_native(), json!("local"));
        assert_eq!(scopes.get(child, "b").to_native(), json!(5));
        assert!(scopes.get(child, "missing").is_empty_value());
    }

    #[test]
    fn test_set_reaches_parent_and_view() {
        let model = DataModel::new(json!({ "b": 5 }));
        let scopes = Scopes::new();
        let root = scopes.root(Some(model.view()));
        let child = scopes.child(root, None);

        scopes.declare(root, "a", num(1.0)).unwrap();
        scopes.set(child, "a", num(2.0)).unwrap();
        assert_eq!(scopes.get(root, "a").to_native(), json!(2));

        scopes.set(child, "b", num(6.0)).unwrap();
        assert_eq!(model.snapshot(), json!({ "b": 6 }));

        let err = scopes.set(child, "c", num(1.0)).unwrap_err();
        assert_eq!(err, EvalError::UndeclaredVariable("c".to_string()));
    }

    #[test]
    fn test_call_prefers_closures_then_libraries() {
        let scopes = Scopes::new();
        let root = scopes.root(None);
        let child = scopes.child(root, None);

        let mut table = FunctionTable::new("host");
        table.register("greet", |_, _| Ok(Value::string("hi")));
        scopes.import(root, Arc::new(table));

        assert!(matches!(
            scopes.resolve_call(child, "greet"),
            Ok(Callee::Library(_))
        ));

        scopes.declare(child, "greet", num(1.0)).unwrap();
        assert!(matches!(
            scopes.resolve_call(child, "greet"),
            Ok(Callee::Library(_))
        ));

        let closure = Value::Closure(Closure {
            params: Arc::from(Vec::new()),
            body: Arc::new(Instruction::Block { lines: Vec::new() }),
            scope: root,
        });
        scopes.declare(root, "greet", closure).unwrap();
        assert!(matches!(
            scopes.resolve_call(child, "greet"),
            Ok(Callee::Closure(Value::Closure(_)))
        ));

        assert!(matches!(
            scopes.resolve_call(child, "nope"),
            Err(EvalError::MethodNotFound(_))
        ));
    }

    #[test]
    fn test_released_scopes_are_reused() {
        let scopes = Scopes::new();
        let root = scopes.root(None);

        for _ in 0..1000 {
            let frame = scopes.child(root, None);
            scopes.declare(frame, "i", num(1.0)).unwrap();
            scopes.release(frame);
        }
        assert_eq!(scopes.len(), 1);

        let reused = scopes.child(root, None);
        assert!(scopes.get(reused, "i").is_empty_value());
    }

    #[test]
    fn test_captured_scopes_are_kept_with_their_ancestors() {
        let scopes = Scopes::new();
        let root = scopes.root(None);
        let outer = scopes.child(root, None);
        let inner = scopes.child(outer, None);
        scopes.declare(outer, "a", num(1.0)).unwrap();

        scopes.capture(inner);
        scopes.release(inner);
        scopes.release(outer);
        scopes.release(root);
        assert_eq!(scopes.len(), 3);
        assert_eq!(scopes.get(inner, "a").to_native(), json!(1));
    }
}
