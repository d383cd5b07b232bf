//! Default handlers for each node type.
//!
//! They are public so that a host replacing a handler can still delegate to
//! the stock behavior.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::context::Snapshot;
use crate::errors::{EvalError, Result};
use crate::node::Node;
use crate::operators::{undefined_binary, undefined_unary, BinaryFn, UnaryFn};
use crate::value::{Function, Value};
use crate::Evaluator;

fn mismatch(expected: &'static str, node: &Node) -> EvalError {
    EvalError::NodeTypeMismatch { expected, found: node.tag().to_string() }
}

impl Evaluator {
    pub fn evaluate_literal_node(&self, node: &Node, _context: &Value) -> Result<Value> {
        match node {
            Node::Literal { value, .. } => Ok(value.clone()),
            other => Err(mismatch("Literal", other)),
        }
    }

    pub fn evaluate_this_node(&self, _node: &Node, context: &Value) -> Result<Value> {
        Ok(context.clone())
    }

    /// Every child is evaluated; only the last value is kept.
    pub fn evaluate_compound_node(&self, node: &Node, context: &Value) -> Result<Value> {
        let Node::Compound { body } = node else {
            return Err(mismatch("Compound", node));
        };
        let mut last = Value::Undefined;
        for expr in body {
            last = self.evaluate_node(expr, context)?;
        }
        Ok(last)
    }

    pub fn evaluate_array_node(&self, node: &Node, context: &Value) -> Result<Value> {
        let Node::Array { elements } = node else {
            return Err(mismatch("Array", node));
        };
        let items = elements
            .iter()
            .map(|el| self.evaluate_node(el, context))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(items))
    }

    pub fn evaluate_unary_node(&self, node: &Node, context: &Value) -> Result<Value> {
        let Node::Unary { operator, argument, .. } = node else {
            return Err(mismatch("Unary", node));
        };
        let op = self.unary_operator(operator)?;
        let argument = self.evaluate_node(argument, context)?;
        Ok(op(&argument))
    }

    /// Shared by binary and logical nodes.
    ///
    /// Whichever functions are currently registered as `&&` and `||`
    /// short-circuit, whatever symbol the node uses to reach them.
    pub fn evaluate_binary_node(&self, node: &Node, context: &Value) -> Result<Value> {
        let (Node::Binary { operator, left, right } | Node::Logical { operator, left, right }) = node else {
            return Err(mismatch("Binary", node));
        };
        let op = self.binary_operator(operator)?;
        let left = self.evaluate_node(left, context)?;
        let short_circuit = {
            let operators = self.inner.operators.read();
            (operators.is_bound_to("&&", &op) && !left.is_truthy())
                || (operators.is_bound_to("||", &op) && left.is_truthy())
        };
        if short_circuit {
            trace!(operator = operator.as_str(), "short circuit");
            return Ok(left);
        }
        let right = self.evaluate_node(right, context)?;
        Ok(op(&left, &right))
    }

    /// Only the selected branch is evaluated.
    pub fn evaluate_conditional_node(&self, node: &Node, context: &Value) -> Result<Value> {
        let Node::Conditional { test, consequent, alternate } = node else {
            return Err(mismatch("Conditional", node));
        };
        if self.evaluate_node(test, context)?.is_truthy() {
            self.evaluate_node(consequent, context)
        } else {
            self.evaluate_node(alternate, context)
        }
    }

    pub fn evaluate_call_node(&self, node: &Node, context: &Value) -> Result<Value> {
        let Node::Call { callee, arguments } = node else {
            return Err(mismatch("Call", node));
        };
        if !matches!(**callee, Node::Member { .. } | Node::Identifier { .. } | Node::This {}) {
            return Err(EvalError::InvalidCalleeType(callee.tag().to_string()));
        }
        let target = self.evaluate_node(callee, context)?;
        if !target.is_truthy() {
            return Err(EvalError::CalleeNotFound(callee_name(callee)));
        }
        let Value::Function(function) = target else {
            return Err(EvalError::NotCallable(callee_name(callee)));
        };
        let args = arguments
            .iter()
            .map(|arg| self.evaluate_node(arg, context))
            .collect::<Result<Vec<_>>>()?;
        trace!(callee = %callee_name(callee), argc = args.len(), "call");
        function.call(&args)
    }

    /// Build a closure over a snapshot of `context`.
    ///
    /// Each call binds the parameters into a fresh copy of that snapshot.
    pub fn evaluate_arrow_node(&self, node: &Node, context: &Value) -> Result<Value> {
        let Node::Arrow { params, body } = node else {
            return Err(mismatch("Arrow", node));
        };
        let names = params
            .iter()
            .map(|p| {
                p.name()
                    .map(str::to_string)
                    .ok_or_else(|| EvalError::InvalidParameterPathNodeType(p.tag().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        let snapshot = Snapshot::capture(context);
        let body = Arc::clone(body);
        let evaluator = self.clone();
        let closure = Function::new(move |args| {
            let scope = snapshot.bind(&names, args);
            evaluator.evaluate_node(&body, &scope)
        });
        Ok(Value::Function(closure))
    }

    fn binary_operator(&self, symbol: &str) -> Result<BinaryFn> {
        if let Some(op) = self.inner.operators.read().binary(symbol) {
            return Ok(op);
        }
        if self.inner.options.strict_operators {
            return Err(EvalError::UnknownOperator(symbol.to_string()));
        }
        warn!(operator = symbol, "binary operator is not registered");
        Ok(undefined_binary())
    }

    fn unary_operator(&self, symbol: &str) -> Result<UnaryFn> {
        if let Some(op) = self.inner.operators.read().unary(symbol) {
            return Ok(op);
        }
        if self.inner.options.strict_operators {
            return Err(EvalError::UnknownOperator(symbol.to_string()));
        }
        warn!(operator = symbol, "unary operator is not registered");
        Ok(undefined_unary())
    }
}

/// Best-effort name for diagnostics: the identifier, or the member's property name.
fn callee_name(callee: &Node) -> String {
    match callee {
        Node::Identifier { name } => name.clone(),
        Node::Member { property: Some(property), .. } => match property.as_ref() {
            Node::Identifier { name } => name.clone(),
            other => other.tag().to_string(),
        },
        Node::This {} => "this".to_string(),
        other => other.tag().to_string(),
    }
}
