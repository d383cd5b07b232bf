use js_expression_eval as jse;
use jse::node::{self, Node};
use jse::{EvalError, Evaluator, Value};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn eval_err(expr: &str) -> EvalError {
    jse::eval(expr).unwrap_err()
}

#[test]
fn test_unparsable_expression() {
    assert!(matches!(eval_err("a ***"), EvalError::Parse(_)));
    assert!(matches!(eval_err("(1 + 2"), EvalError::Parse(_)));
    assert!(matches!(eval_err("a ? b"), EvalError::Parse(_)));
    assert!(matches!(eval_err("'unterminated"), EvalError::Parse(_)));
}

#[test]
fn test_parse_error_message_has_position() {
    let EvalError::Parse(err) = eval_err("1 +") else {
        panic!("expected a parse error");
    };
    assert!(err.to_string().contains("at character"), "{err}");
}

#[test]
fn test_callee_not_found() {
    assert_eq!(eval_err("foo()"), EvalError::CalleeNotFound("foo".into()));
    assert_eq!(
        jse::eval_with("a.missing()", json!({"a": {}})).unwrap_err(),
        EvalError::CalleeNotFound("missing".into())
    );
    assert_eq!(eval_err("foo()").to_string(), "could not evaluate 'foo'");
}

#[test]
fn test_not_callable() {
    assert_eq!(
        jse::eval_with("a()", json!({"a": 1})).unwrap_err(),
        EvalError::NotCallable("a".into())
    );
}

#[test]
fn test_invalid_callee_type() {
    let tree = Node::call(Node::literal(1), vec![]);
    let err = Evaluator::new().evaluate_tree(&tree, &Value::Undefined).unwrap_err();
    assert_eq!(err, EvalError::InvalidCalleeType(node::LITERAL.into()));
}

#[test]
fn test_invalid_parameter_path() {
    assert_eq!(
        eval_err("(1 + 2).foo"),
        EvalError::InvalidParameterPathNodeType(node::BINARY.into())
    );
}

#[test]
fn test_arrow_params_must_be_identifiers() {
    let tree = Node::Arrow { params: vec![Node::literal(1)], body: Arc::new(Node::literal(2)) };
    let err = Evaluator::new().evaluate_tree(&tree, &Value::Undefined).unwrap_err();
    assert_eq!(err, EvalError::InvalidParameterPathNodeType(node::LITERAL.into()));
}

#[test]
fn test_member_without_property() {
    let tree = Node::Member {
        computed: false,
        object: Box::new(Node::identifier("a")),
        property: None,
    };
    let err = Evaluator::new().evaluate_tree(&tree, &Value::Undefined).unwrap_err();
    assert_eq!(err, EvalError::MissingProperty);
}

#[test]
fn test_unknown_node_type() {
    let tree = Node::Extension { tag: "Custom".into(), children: vec![], value: Value::Undefined };
    let err = Evaluator::new().evaluate_tree(&tree, &Value::Undefined).unwrap_err();
    assert_eq!(err, EvalError::UnknownNodeType("Custom".into()));
}

#[test]
fn test_unknown_operator_in_json_tree() {
    let tree: Node = serde_json::from_value(json!({
        "type": "BinaryExpression",
        "operator": "**",
        "left": {"type": "Literal", "value": 2, "raw": "2"},
        "right": {"type": "Literal", "value": 3, "raw": "3"}
    }))
    .unwrap();
    let err = Evaluator::new().evaluate_tree(&tree, &Value::Undefined).unwrap_err();
    assert_eq!(err, EvalError::UnknownOperator("**".into()));
}

#[test]
fn test_error_inside_arrow_propagates() {
    let err = jse::eval_with("items.map(x => x())", json!({"items": [1]})).unwrap_err();
    assert_eq!(err, EvalError::NotCallable("x".into()));
}
