use js_expression_eval as jse;
use jse::{EvalError, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

fn eval_json(expr: &str, ctx: serde_json::Value) -> serde_json::Value {
    jse::eval_with(expr, ctx).unwrap().to_json()
}

fn items() -> serde_json::Value {
    json!({
        "items": [
            {"id": 1, "name": "apple", "price": 3},
            {"id": 2, "name": "pear", "price": 5},
            {"id": 3, "name": "plum", "price": 8}
        ],
        "nums": [1, 2, 3, 4],
        "title": "  Fruit Stand  ",
        "word": "Hello"
    })
}

#[test]
fn test_find() {
    assert_eq!(
        eval_json("items.find(x => x.id === 2)", items()),
        json!({"id": 2, "name": "pear", "price": 5})
    );
    assert_eq!(
        jse::eval_with("items.find(x => x.id === 9)", items()).unwrap(),
        Value::Undefined
    );
}

#[test]
fn test_filter_and_map() {
    assert_eq!(eval_json("nums.filter(n => n % 2 === 0)", items()), json!([2, 4]));
    assert_eq!(eval_json("items.map(x => x.name)", items()), json!(["apple", "pear", "plum"]));
    assert_eq!(
        eval_json("items.filter(x => x.price > 4).map(x => x.id)", items()),
        json!([2, 3])
    );
}

#[test]
fn test_callback_receives_index() {
    assert_eq!(eval_json("nums.map((n, i) => n * i)", items()), json!([0, 2, 6, 12]));
}

#[test]
fn test_some_and_every() {
    assert_eq!(eval_json("nums.some(n => n > 3)", items()), json!(true));
    assert_eq!(eval_json("nums.some(n => n > 4)", items()), json!(false));
    assert_eq!(eval_json("nums.every(n => n > 0)", items()), json!(true));
    assert_eq!(eval_json("items.every(x => x.price < 5)", items()), json!(false));
}

#[test]
fn test_includes_index_of_join() {
    assert_eq!(eval_json("nums.includes(3)", items()), json!(true));
    assert_eq!(eval_json("nums.indexOf(4)", items()), json!(3));
    assert_eq!(eval_json("nums.indexOf(7)", items()), json!(-1));
    assert_eq!(eval_json("nums.join('-')", items()), json!("1-2-3-4"));
    assert_eq!(eval_json("nums.join()", items()), json!("1,2,3,4"));
}

#[test]
fn test_methods_on_array_literals() {
    assert_eq!(jse::eval("[1, 2, 3].includes(2)").unwrap(), Value::Bool(true));
    assert_eq!(jse::eval("[1, 2, 3].map(x => x + 1).join('')").unwrap(), Value::from("234"));
}

#[test]
fn test_string_methods() {
    assert_eq!(eval_json("word.toUpperCase()", items()), json!("HELLO"));
    assert_eq!(eval_json("word.toLowerCase()", items()), json!("hello"));
    assert_eq!(eval_json("title.trim()", items()), json!("Fruit Stand"));
    assert_eq!(eval_json("word.startsWith('He')", items()), json!(true));
    assert_eq!(eval_json("word.endsWith('x')", items()), json!(false));
    assert_eq!(eval_json("word.includes('ell')", items()), json!(true));
}

#[test]
fn test_non_function_property_is_not_callable() {
    let err = jse::eval_with("box.includes(1)", json!({"box": {"includes": "a string"}})).unwrap_err();
    assert_eq!(err, EvalError::NotCallable("includes".into()));
}

#[test]
fn test_wrong_arity() {
    let err = jse::eval_with("word.toUpperCase(1)", items()).unwrap_err();
    assert!(matches!(err, EvalError::Runtime(_)));
}

#[test]
fn test_callback_must_be_function() {
    let err = jse::eval_with("nums.map(1)", items()).unwrap_err();
    assert!(matches!(err, EvalError::Runtime(_)));
}
