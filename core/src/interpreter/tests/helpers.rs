//! Test helpers for evaluation tests
//!
//! Builders for generic parse trees, plus runners that compile and evaluate
//! a tree with a fixed clock (`2000-10-10T10:10:10.000Z`) and timezone
//! (`Europe/London`).

use serde_json::{json, Value as JsonValue};

use crate::interpreter::{DataModel, Error, Program};

pub const CLOCK: &str = "2000-10-10T10:10:10.000Z";
pub const TIMEZONE: &str = "Europe/London";

/* ===================== Runners ===================== */

/// Compile a tree with the fixed clock and timezone
pub fn program(tree: JsonValue) -> Program {
    Program::compile(&tree)
        .expect("Compile failed")
        .with_clock(CLOCK)
        .with_timezone(TIMEZONE)
}

/// Run without a context and return the native result
pub async fn eval(tree: JsonValue) -> JsonValue {
    program(tree).eval(None).await.expect("Evaluation failed")
}

/// Run against a context and return the native result
pub async fn eval_with(tree: JsonValue, context: JsonValue) -> JsonValue {
    program(tree)
        .eval(Some(context))
        .await
        .expect("Evaluation failed")
}

/// Run against a context and return the result plus the context afterwards
pub async fn eval_model(tree: JsonValue, context: JsonValue) -> (JsonValue, JsonValue) {
    let model = DataModel::new(context);
    let result = program(tree)
        .run_with_model(&model)
        .await
        .expect("Evaluation failed");
    (result.to_native(), model.snapshot())
}

/// Run and return the error
pub async fn eval_err(tree: JsonValue) -> Error {
    program(tree)
        .eval(None)
        .await
        .expect_err("Evaluation should have failed")
}

/* ===================== Literals ===================== */

pub fn num(value: f64) -> JsonValue {
    json!({ "type": "Number", "value": value })
}

pub fn text(value: &str) -> JsonValue {
    json!({ "type": "String", "value": value })
}

pub fn boolean(value: bool) -> JsonValue {
    json!({ "type": if value { "True" } else { "False" } })
}

pub fn date(value: &str) -> JsonValue {
    json!({ "type": "Date", "value": value })
}

pub fn datetime(value: &str) -> JsonValue {
    json!({ "type": "DateTime", "value": value })
}

pub fn array(items: Vec<JsonValue>) -> JsonValue {
    json!({ "type": "Array", "list": items })
}

pub fn object(members: Vec<(&str, JsonValue)>) -> JsonValue {
    let members: Vec<_> = members
        .into_iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();
    json!({ "type": "Object", "members": members })
}

pub fn range(from: f64, to: f64) -> JsonValue {
    json!({ "type": "Generator", "from": num(from), "to": num(to) })
}

/* ===================== Expressions ===================== */

fn fold(kind: &str, init: JsonValue, rest: Vec<(&str, JsonValue)>) -> JsonValue {
    let list: Vec<_> = rest
        .into_iter()
        .map(|(operator, value)| json!({ "operator": operator, "value": value }))
        .collect();
    json!({ "type": kind, "init": init, "list": list })
}

pub fn math(init: JsonValue, rest: Vec<(&str, JsonValue)>) -> JsonValue {
    fold("Math", init, rest)
}

pub fn and(init: JsonValue, rest: Vec<JsonValue>) -> JsonValue {
    fold("And", init, rest.into_iter().map(|v| ("and", v)).collect())
}

pub fn or(init: JsonValue, rest: Vec<JsonValue>) -> JsonValue {
    fold("Or", init, rest.into_iter().map(|v| ("or", v)).collect())
}

pub fn compare(a: JsonValue, operator: &str, b: JsonValue) -> JsonValue {
    json!({ "type": "Compare", "a": a, "b": b, "operator": operator })
}

pub fn nest(value: JsonValue) -> JsonValue {
    json!({ "type": "Nest", "value": value })
}

pub fn neg(value: JsonValue) -> JsonValue {
    json!({ "type": "Negation", "value": value })
}

pub fn when(test: JsonValue, ok: JsonValue, fail: JsonValue) -> JsonValue {
    json!({ "type": "When", "test": test, "ok": ok, "fail": fail })
}

pub fn translate(title: &str) -> JsonValue {
    json!({ "type": "Translate", "title": title })
}

/* ===================== Message Sends ===================== */

pub fn scope() -> JsonValue {
    json!({ "type": "Scope" })
}

/// Read an unqualified name
pub fn var_ref(name: &str) -> JsonValue {
    get(scope(), text(name))
}

pub fn get(target: JsonValue, key: JsonValue) -> JsonValue {
    json!({ "type": "Get", "args": [target, key] })
}

pub fn set(target: JsonValue, key: JsonValue, value: JsonValue) -> JsonValue {
    json!({ "type": "Set", "args": [target, key, value] })
}

/// Send `name` to `target`: `target.name(args)`
pub fn call(target: JsonValue, name: &str, args: Vec<JsonValue>) -> JsonValue {
    let mut all = vec![target, text(name)];
    all.extend(args);
    json!({ "type": "Call", "args": all })
}

/// Call a free function: `name(args)`
pub fn call_fn(name: &str, args: Vec<JsonValue>) -> JsonValue {
    call(scope(), name, args)
}

/* ===================== Statements ===================== */

pub fn block(lines: Vec<JsonValue>) -> JsonValue {
    json!({ "type": "Block", "lines": lines })
}

pub fn var(name: &str, value: JsonValue) -> JsonValue {
    json!({ "type": "Variable", "name": name, "value": value })
}

pub fn assign(id: &str, value: JsonValue) -> JsonValue {
    json!({ "type": "Assignment", "id": id, "value": value })
}

pub fn ret(value: JsonValue) -> JsonValue {
    json!({ "type": "Return", "value": value })
}

pub fn brk() -> JsonValue {
    json!({ "type": "Break" })
}

pub fn if_then(test: JsonValue, ok: JsonValue, fail: Option<JsonValue>) -> JsonValue {
    match fail {
        Some(fail) => json!({ "type": "If", "test": test, "ok": ok, "fail": fail }),
        None => json!({ "type": "If", "test": test, "ok": ok }),
    }
}

pub fn for_in(iterator: &str, list: JsonValue, body: JsonValue) -> JsonValue {
    json!({ "type": "For", "iterator": iterator, "list": list, "block": body })
}

pub fn function(name: &str, args: &[&str], body: JsonValue) -> JsonValue {
    json!({ "type": "Function", "name": name, "args": args, "block": body })
}

pub fn each(name: &str, body: JsonValue) -> JsonValue {
    json!({ "type": "Each", "self": name, "block": body })
}
