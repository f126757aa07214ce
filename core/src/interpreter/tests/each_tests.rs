//! Tests for each-blocks over the host context

use super::helpers::*;
use serde_json::json;

fn model() -> serde_json::Value {
    json!({
        "Name": "john",
        "List": [
            { "Value": 10 },
            { "Value": 20 }
        ]
    })
}

#[tokio::test]
async fn test_each_sums_matches() {
    let tree = block(vec![
        var("sum", num(0.0)),
        each(
            "List",
            block(vec![assign("sum", math(var_ref("sum"), vec![("+", var_ref("Value"))]))]),
        ),
        ret(var_ref("sum")),
    ]);
    assert_eq!(eval_with(tree, model()).await, json!(30));
}

#[tokio::test]
async fn test_each_yields_last_result() {
    let tree = each("List", var_ref("Value"));
    assert_eq!(eval_with(tree, model()).await, json!(20));
}

#[tokio::test]
async fn test_each_without_matches_is_empty() {
    let tree = each("Missing", num(1.0));
    assert_eq!(eval_with(tree, model()).await, json!(null));
    assert_eq!(eval(each("List", num(1.0))).await, json!(null));
}

#[tokio::test]
async fn test_each_over_a_single_object() {
    let tree = each("Customer", var_ref("Name"));
    let context = json!({ "Customer": { "Name": "jane" } });
    assert_eq!(eval_with(tree, context).await, json!("jane"));
}

#[tokio::test]
async fn test_each_finds_nested_lists() {
    let context = json!({
        "Orders": [
            { "Id": 1, "Lines": [] },
            { "Id": 2, "Lines": [{ "Price": 5 }, { "Price": 7 }] }
        ]
    });
    let tree = block(vec![
        var("total", num(0.0)),
        each(
            "Lines",
            assign("total", math(var_ref("total"), vec![("+", var_ref("Price"))])),
        ),
        var_ref("total"),
    ]);
    assert_eq!(eval_with(tree, context).await, json!(12));
}

#[tokio::test]
async fn test_each_writes_back_into_context() {
    let tree = each(
        "List",
        assign("Value", math(var_ref("Value"), vec![("*", num(2.0))])),
    );
    let (_, context) = eval_model(tree, model()).await;
    assert_eq!(
        context,
        json!({
            "Name": "john",
            "List": [{ "Value": 20 }, { "Value": 40 }]
        })
    );
}

#[tokio::test]
async fn test_each_locals_are_per_match() {
    let tree = block(vec![
        each("List", var("doubled", math(var_ref("Value"), vec![("*", num(2.0))]))),
        var_ref("doubled"),
    ]);
    assert_eq!(eval_with(tree, model()).await, json!(null));
}

#[tokio::test]
async fn test_context_arrays_read_as_arrays() {
    let tree = call_fn("COUNT", vec![var_ref("List")]);
    assert_eq!(eval_with(tree, model()).await, json!(2));

    let tree = get(get(var_ref("List"), num(1.0)), text("Value"));
    assert_eq!(eval_with(tree, model()).await, json!(20));
}

#[tokio::test]
async fn test_each_inside_function_body_has_no_view() {
    let tree = block(vec![
        function("names", &[], block(vec![each("Name", var_ref("Name"))])),
        call_fn("names", vec![]),
    ]);
    assert_eq!(eval_with(tree, model()).await, json!(null));
}
