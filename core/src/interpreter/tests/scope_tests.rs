//! Tests for declarations, assignment, name resolution and closures

use super::helpers::*;
use crate::interpreter::{compile, Clock, Error, EvalError, Runtime};
use serde_json::json;

/* ===================== Variables ===================== */

#[tokio::test]
async fn test_declare_and_read() {
    let tree = block(vec![var("g", num(2.0)), ret(var_ref("g"))]);
    assert_eq!(eval(tree).await, json!(2));
}

#[tokio::test]
async fn test_variables_in_expressions() {
    let tree = block(vec![
        var("a", num(5.0)),
        var("b", num(4.0)),
        var("c", math(var_ref("a"), vec![("*", var_ref("b"))])),
        ret(math(var_ref("c"), vec![("/", num(2.0))])),
    ]);
    assert_eq!(eval(tree).await, json!(10));
}

#[tokio::test]
async fn test_declaration_yields_its_value() {
    assert_eq!(eval(var("a", text("x"))).await, json!("x"));
}

#[tokio::test]
async fn test_duplicate_declaration_fails() {
    let tree = block(vec![var("a", num(1.0)), var("a", num(2.0))]);
    let err = eval_err(tree).await;
    assert_eq!(err, Error::Eval(EvalError::DuplicateDeclaration("a".to_string())));
}

#[tokio::test]
async fn test_undeclared_read_is_empty() {
    assert_eq!(eval(var_ref("nope")).await, json!(null));
}

#[tokio::test]
async fn test_undeclared_assignment_fails() {
    let err = eval_err(assign("nope", num(1.0))).await;
    assert_eq!(err, Error::Eval(EvalError::UndeclaredVariable("nope".to_string())));
}

#[tokio::test]
async fn test_assignment_yields_value() {
    let tree = block(vec![var("a", num(1.0)), assign("a", num(3.0))]);
    assert_eq!(eval(tree).await, json!(3));
}

#[tokio::test]
async fn test_set_through_scope_message() {
    let tree = block(vec![
        var("a", num(1.0)),
        set(scope(), text("a"), num(7.0)),
        var_ref("a"),
    ]);
    assert_eq!(eval(tree).await, json!(7));
}

/* ===================== Context ===================== */

#[tokio::test]
async fn test_reads_context() {
    let result = eval_with(var_ref("a"), json!({ "a": "test" })).await;
    assert_eq!(result, json!("test"));
}

#[tokio::test]
async fn test_locals_shadow_context() {
    let tree = block(vec![var("a", text("local")), var_ref("a")]);
    let result = eval_with(tree, json!({ "a": "context" })).await;
    assert_eq!(result, json!("local"));
}

#[tokio::test]
async fn test_assignment_writes_existing_context_keys() {
    let tree = assign("a", num(2.0));
    let (result, context) = eval_model(tree, json!({ "a": 1, "b": 1 })).await;
    assert_eq!(result, json!(2));
    assert_eq!(context, json!({ "a": 2, "b": 1 }));
}

#[tokio::test]
async fn test_nested_context_objects_stay_live() {
    let tree = block(vec![
        set(var_ref("Customer"), text("Name"), text("jane")),
        get(var_ref("Customer"), text("Name")),
    ]);
    let (result, context) = eval_model(tree, json!({ "Customer": { "Name": "john" } })).await;
    assert_eq!(result, json!("jane"));
    assert_eq!(context, json!({ "Customer": { "Name": "jane" } }));
}

/* ===================== Functions ===================== */

#[tokio::test]
async fn test_function_call() {
    let tree = block(vec![
        function("name", &["a"], block(vec![ret(call(var_ref("a"), "toUpper", vec![]))])),
        ret(call_fn("name", vec![text("b")])),
    ]);
    assert_eq!(eval(tree).await, json!("B"));
}

#[tokio::test]
async fn test_function_sees_defining_scope() {
    let tree = block(vec![
        var("z", text("a")),
        function("name", &["a"], block(vec![ret(math(var_ref("a"), vec![("+", var_ref("z"))]))])),
        ret(call_fn("name", vec![text("b")])),
    ]);
    assert_eq!(eval(tree).await, json!("ba"));
}

#[tokio::test]
async fn test_function_locals_do_not_leak() {
    let tree = block(vec![
        function("f", &[], block(vec![var("inner", num(1.0))])),
        call_fn("f", vec![]),
        var_ref("inner"),
    ]);
    assert_eq!(eval(tree).await, json!(null));
}

#[tokio::test]
async fn test_each_call_gets_fresh_locals() {
    let tree = block(vec![
        function("f", &["x"], block(vec![var("y", var_ref("x")), var_ref("y")])),
        call_fn("f", vec![num(1.0)]),
        call_fn("f", vec![num(2.0)]),
    ]);
    assert_eq!(eval(tree).await, json!(2));
}

#[tokio::test]
async fn test_function_updates_outer_variable() {
    let tree = block(vec![
        var("count", num(0.0)),
        function("bump", &[], assign("count", math(var_ref("count"), vec![("+", num(1.0))]))),
        call_fn("bump", vec![]),
        call_fn("bump", vec![]),
        var_ref("count"),
    ]);
    assert_eq!(eval(tree).await, json!(2));
}

#[tokio::test]
async fn test_missing_arguments_are_empty() {
    let tree = block(vec![
        function("f", &["a", "b"], call(var_ref("b"), "_isEmpty", vec![])),
        call_fn("f", vec![num(1.0)]),
    ]);
    assert_eq!(eval(tree).await, json!(true));
}

#[tokio::test]
async fn test_extra_arguments_are_ignored() {
    let tree = block(vec![
        function("f", &["a"], var_ref("a")),
        call_fn("f", vec![num(1.0), num(2.0)]),
    ]);
    assert_eq!(eval(tree).await, json!(1));
}

#[tokio::test]
async fn test_unknown_function() {
    let err = eval_err(call_fn("nope", vec![])).await;
    assert_eq!(err, Error::Eval(EvalError::MethodNotFound("nope".to_string())));
}

#[tokio::test]
async fn test_function_shadows_library() {
    let tree = block(vec![function("today", &[], text("mine")), call_fn("today", vec![])]);
    assert_eq!(eval(tree).await, json!("mine"));
}

#[tokio::test]
async fn test_non_closure_variable_does_not_hide_library() {
    let tree = block(vec![
        var("COUNT", num(5.0)),
        call_fn("COUNT", vec![array(vec![num(1.0), num(2.0)])]),
    ]);
    assert_eq!(eval(tree).await, json!(2));
}

#[tokio::test]
async fn test_returned_closure_keeps_its_scope() {
    let tree = block(vec![
        function(
            "make",
            &["x"],
            block(vec![function("inner", &[], block(vec![var_ref("x")])), var_ref("inner")]),
        ),
        function("other", &["y"], block(vec![var_ref("y")])),
        var("f", call_fn("make", vec![num(5.0)])),
        call_fn("other", vec![num(7.0)]),
        call_fn("f", vec![]),
    ]);
    assert_eq!(eval(tree).await, json!(5));
}

#[tokio::test]
async fn test_loop_and_call_scopes_are_recycled() {
    let tree = compile(&block(vec![
        function("id", &["v"], block(vec![var_ref("v")])),
        for_in(
            "i",
            range(1.0, 100_000.0),
            block(vec![var("j", call_fn("id", vec![var_ref("i")]))]),
        ),
    ]))
    .unwrap();

    let runtime = Runtime::new(Clock::new(None, None));
    let root = runtime.scopes().root(None);
    runtime.evaluate(&tree, root).await.unwrap();
    assert!(runtime.scopes().len() <= 3, "{} scopes alive", runtime.scopes().len());
}
