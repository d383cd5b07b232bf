use js_expression_eval as jse;
use jse::{Evaluator, Function, Value};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn eval(expr: &str) -> Value {
    jse::eval(expr).unwrap()
}

fn eval_in(expr: &str, ctx: &Value) -> Value {
    Evaluator::new().evaluate(expr, ctx).unwrap()
}

/// A callable that counts how many times it ran and returns `ret`.
fn counter(ret: Value) -> (Function, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let f = Function::new(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(ret.clone())
    });
    (f, calls)
}

#[test]
fn test_literal() {
    assert_eq!(eval("43.4"), Value::from(43.4));
    assert_eq!(eval("'hi'"), Value::from("hi"));
    assert_eq!(eval("null"), Value::Null);
}

#[test]
fn test_compound_returns_last() {
    assert_eq!(eval("1, 2, 3"), Value::from(3));
}

#[test]
fn test_compound_evaluates_every_child() {
    let (f, calls) = counter(Value::from(1));
    let ctx = Value::Undefined.with("f", f);
    assert_eq!(eval_in("f(), f(), 3", &ctx), Value::from(3));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_conditional() {
    assert_eq!(eval("true ? 1 : 2"), Value::from(1));
    assert_eq!(eval("false ? 1 : 2"), Value::from(2));
}

#[test]
fn test_conditional_skips_other_branch() {
    let (f, calls) = counter(Value::from(9));
    let ctx = Value::Undefined.with("sideEffect", f);
    assert_eq!(eval_in("true ? 1 : sideEffect()", &ctx), Value::from(1));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(eval_in("false ? 1 : sideEffect()", &ctx), Value::from(9));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_short_circuit() {
    let (f, calls) = counter(Value::Bool(true));
    let ctx = Value::Undefined.with("sideEffect", f);
    assert_eq!(eval_in("false && sideEffect()", &ctx), Value::Bool(false));
    assert_eq!(eval_in("1 || sideEffect()", &ctx), Value::from(1));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(eval_in("true && sideEffect()", &ctx), Value::Bool(true));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_short_circuit_skips_undefined_callee() {
    // The right side would fail with CalleeNotFound if it ran.
    assert_eq!(eval("false && missing()"), Value::Bool(false));
}

#[test]
fn test_array() {
    let res = eval("[1, 2, 3]");
    assert_eq!(res, Value::from(json!([1, 2, 3])));
    assert_eq!(res.property("2"), Some(Value::from(3)));
}

#[test]
fn test_call() {
    let ctx = Value::Undefined.with("a", Function::new(|_| Ok(Value::from(2))));
    assert_eq!(eval_in("a()", &ctx), Value::from(2));
}

#[test]
fn test_call_with_arg() {
    let ctx = Value::from(json!({"b": 3}))
        .with("a", Function::new(|args| Ok(Value::from(2.0 * args[0].to_number()))));
    assert_eq!(eval_in("a(b)", &ctx), Value::from(6));
}

#[test]
fn test_this() {
    let ctx = Value::from(json!({}));
    assert_eq!(eval_in("this", &ctx), ctx);
    assert_eq!(eval_in("this.a", &Value::from(json!({"a": 2}))), Value::from(2));
}

#[test]
fn test_this_call() {
    let ctx = Value::Function(Function::new(|_| Ok(Value::from(2))));
    assert_eq!(eval_in("this()", &ctx), Value::from(2));
}

#[test]
fn test_equality() {
    assert_eq!(eval("4 === 4"), Value::Bool(true));
}

#[test]
fn test_identifier() {
    assert_eq!(eval_in("a", &Value::from(json!({"a": 1}))), Value::from(1));
    assert_eq!(eval_in("zz", &Value::from(json!({"a": 1}))), Value::Undefined);
}

#[test]
fn test_math() {
    let res = eval_in("aa +3  -7 * 2.2", &Value::from(json!({"aa": -2})));
    assert!((res.to_number() + 14.4).abs() < 1e-7);
}

#[test]
fn test_bitwise() {
    assert_eq!(eval("4 & 7"), Value::from(4));
    assert_eq!(eval("4 << 1"), Value::from(8));
    assert_eq!(eval("-4 >>> 1"), Value::from(2_147_483_646.0));
    assert_eq!(eval("~5"), Value::from(-6));
}

#[test]
fn test_computed_member() {
    let ctx = Value::from(json!({"a": {"b": 2}, "c": "b"}));
    assert_eq!(eval_in("a[c]", &ctx), Value::from(2));
}

#[test]
fn test_dotted_member() {
    let ctx = Value::from(json!({"a": {"b": {"c": {"d": 3}}}}));
    assert_eq!(eval_in("a.b.c.d === 3", &ctx), Value::Bool(true));
}

#[test]
fn test_mixed_member() {
    let ctx = Value::from(json!({
        "a": {"b": {"c": 7}},
        "b": {"d": "e"},
        "c": "d",
        "d": {"e": "c"}
    }));
    assert_eq!(eval_in("a.b[d[b[c]]]", &ctx), Value::from(7));
}

#[test]
fn test_missing_path_is_undefined() {
    let ctx = Value::from(json!({"a": {"b": 1}}));
    assert_eq!(eval_in("a.x.y", &ctx), Value::Undefined);
}

#[test]
fn test_array_index_and_length() {
    let ctx = Value::from(json!({"items": [5, 6, 7]}));
    assert_eq!(eval_in("items[1]", &ctx), Value::from(6));
    assert_eq!(eval_in("items.length", &ctx), Value::from(3));
    assert_eq!(eval_in("[10, 20][0]", &ctx), Value::from(10));
}

#[test]
fn test_receiver_binding() {
    let ctx = Value::from(json!({"b": {}})).with(
        "b.c",
        Function::new(|args| {
            let v = args.first().cloned().unwrap_or_default();
            Ok(if v.is_truthy() { v } else { Value::from(3) })
        }),
    );
    assert_eq!(eval_in("b.c()", &ctx), Value::from(3));
    assert_eq!(eval_in("b.c(4)", &ctx), Value::from(4));
}

#[test]
fn test_method_sees_its_object() {
    let ctx = Value::from(json!({"user": {"name": "ada"}})).with(
        "user.greet",
        Function::method(|this, _| Ok(Value::from(format!("hi {}", this.property("name").unwrap_or_default())))),
    );
    assert_eq!(eval_in("user.greet()", &ctx), Value::from("hi ada"));
}

#[test]
fn test_direct_function_stays_unbound() {
    let ctx = Value::Undefined.with("f", Function::method(|this, _| Ok(this.clone())));
    assert_eq!(eval_in("f()", &ctx), Value::Undefined);
}

#[test]
fn test_chained_call_binds_to_result() {
    let ctx = Value::Undefined.with(
        "make",
        Function::new(|_| {
            Ok(Value::from(json!({"n": 41}))
                .with("next", Function::method(|this, _| Ok(Value::from(this.property("n").unwrap_or_default().to_number() + 1.0)))))
        }),
    );
    assert_eq!(eval_in("make().next()", &ctx), Value::from(42));
}

#[test]
fn test_arrow_function() {
    let ctx = Value::from(json!({"k": 10}));
    let add = eval_in("(a, b) => a + b + k", &ctx);
    let f = add.as_function().unwrap();
    assert_eq!(f.call(&[Value::from(1), Value::from(2)]).unwrap(), Value::from(13));
    // Missing arguments bind to undefined.
    assert!(f.call(&[Value::from(1)]).unwrap().to_number().is_nan());
}

#[test]
fn test_arrow_shadows_context() {
    let ctx = Value::from(json!({"x": 1, "items": [1, 2, 3]}));
    assert_eq!(eval_in("items.map(x => x * 2)", &ctx), Value::from(json!([2, 4, 6])));
    assert_eq!(eval_in("x", &ctx), Value::from(1));
}

#[test]
fn test_re_evaluation_is_stable() {
    let ev = Evaluator::new();
    let tree = ev.parse("a.b + c[0]").unwrap();
    let ctx = Value::from(json!({"a": {"b": 1}, "c": [2]}));
    let first = ev.evaluate_tree(&tree, &ctx).unwrap();
    for _ in 0..3 {
        assert_eq!(ev.evaluate_tree(&tree, &ctx).unwrap(), first);
    }
    let other = Value::from(json!({"a": {"b": 10}, "c": [20]}));
    assert_eq!(ev.evaluate_tree(&tree, &other).unwrap(), Value::from(30));
}

#[test]
fn test_json_context_helper() {
    assert_eq!(jse::eval_with("a + 1", json!({"a": 1})).unwrap(), Value::from(2));
}

#[test]
fn test_deeply_nested_expression() {
    let expr = format!("{}1{}", "(".repeat(500), ")".repeat(500));
    assert_eq!(eval(&expr), Value::from(1));
    let sum = vec!["1"; 2000].join(" + ");
    assert_eq!(eval(&sum), Value::from(2000));
}

#[test]
fn test_very_long_chain_evaluates_and_drops() {
    let ev = Evaluator::new();
    let tree = ev.parse(&vec!["1"; 200_000].join(" + ")).unwrap();
    assert_eq!(ev.evaluate_tree(&tree, &Value::Undefined).unwrap(), Value::from(200_000));
    let copy = tree.clone();
    drop(tree);
    assert_eq!(ev.evaluate_tree(&copy, &Value::Undefined).unwrap(), Value::from(200_000));
}

#[test]
fn test_arrow_with_very_long_body() {
    let body = vec!["x"; 100_000].join(" + ");
    let res = eval(&format!("[1, 2].map(x => {body})"));
    assert_eq!(res, Value::from(json!([100_000, 200_000])));
}

#[test]
fn test_chained_computed_key_uses_intermediate_value() {
    let ctx = Value::from(json!({"k": "outer"})).with(
        "make",
        Function::new(|_| Ok(Value::from(json!({"k": "inner", "inner": 1, "outer": 2})))),
    );
    assert_eq!(eval_in("make()[k]", &ctx), Value::from(1));
}

#[test]
fn test_index_keys_are_plain_digits() {
    let ctx = Value::from(json!({"items": [10, 20, 30]}));
    assert_eq!(eval_in("items['1']", &ctx), Value::from(20));
    assert_eq!(eval_in("items['+1']", &ctx), Value::Undefined);
    assert_eq!(eval_in("items[' 1']", &ctx), Value::Undefined);
    assert_eq!(eval_in("items['01']", &ctx), Value::Undefined);
}

#[test]
fn test_string_length_and_index_agree() {
    let ctx = Value::from(json!({"s": "a😀b"}));
    assert_eq!(eval_in("s.length", &ctx), Value::from(3));
    assert_eq!(eval_in("s[1]", &ctx), Value::from("😀"));
    assert_eq!(eval_in("s[2]", &ctx), Value::from("b"));
}
