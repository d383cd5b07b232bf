use js_expression_eval as jse;
use jse::{EvalError, Evaluator, Node, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_peval_resolves() {
    let ev = Evaluator::new();
    assert_eq!(ev.peval("4 === 4", Value::Undefined).await.unwrap(), Value::Bool(true));
}

#[tokio::test]
async fn test_peval_with_context() {
    let ev = Evaluator::new();
    let ctx = Value::from(json!({"a": {"b": 3}}));
    assert_eq!(ev.peval("a.b * 2", ctx).await.unwrap(), Value::from(6));
}

#[tokio::test]
async fn test_peval_rejects_parse_error() {
    let ev = Evaluator::new();
    let err = ev.peval("a ***", Value::Undefined).await.unwrap_err();
    assert!(matches!(err, EvalError::Parse(_)));
}

#[tokio::test]
async fn test_peval_rejects_evaluation_error() {
    let ev = Evaluator::new();
    let err = ev.peval("nothing()", Value::Undefined).await.unwrap_err();
    assert_eq!(err, EvalError::CalleeNotFound("nothing".into()));
}

#[tokio::test]
async fn test_peval_tree() {
    let ev = Evaluator::new();
    let tree = Node::binary("+", Node::literal(1), Node::identifier("x"));
    let ctx = Value::from(json!({"x": 41}));
    assert_eq!(ev.peval_tree(tree, ctx).await.unwrap(), Value::from(42));
}

#[tokio::test]
async fn test_changes_after_scheduling_are_visible() {
    let ev = Evaluator::new();
    let pending = tokio::spawn(ev.peval("2 + 3", Value::Undefined));
    ev.add_binary_op("+", |a, b| Value::from(a.to_number() * b.to_number()));
    assert_eq!(pending.await.unwrap().unwrap(), Value::from(6));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_many_concurrent_evaluations() {
    let ev = Evaluator::new();
    let handles: Vec<_> = (0..16)
        .map(|i| tokio::spawn(ev.peval("n * n", Value::from(json!({"n": i})))))
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap().unwrap(), Value::from((i * i) as f64));
    }
}
