use std::mem;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

/// A parsed expression.
///
/// Serializes to the conventional JSON syntax tree, keyed by `"type"`, so trees
/// produced elsewhere can be deserialized and evaluated directly.
///
/// Trees may be far deeper than the native stack allows. Drop is iterative
/// and clone runs on a growable stack, so arbitrarily long chains are safe.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Literal {
        value: Value,
        #[serde(default)]
        raw: String,
    },
    Identifier {
        name: String,
    },
    #[serde(rename = "ThisExpression")]
    This {},
    #[serde(rename = "UnaryExpression")]
    Unary {
        operator: String,
        argument: Box<Node>,
        #[serde(default = "prefix_default")]
        prefix: bool,
    },
    #[serde(rename = "BinaryExpression")]
    Binary {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    #[serde(rename = "LogicalExpression")]
    Logical {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    #[serde(rename = "ConditionalExpression")]
    Conditional {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    #[serde(rename = "MemberExpression")]
    Member {
        computed: bool,
        object: Box<Node>,
        #[serde(default)]
        property: Option<Box<Node>>,
    },
    #[serde(rename = "CallExpression")]
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    #[serde(rename = "ArrowFunctionExpression")]
    Arrow {
        #[serde(default)]
        params: Vec<Node>,
        body: Arc<Node>,
    },
    #[serde(rename = "ArrayExpression")]
    Array {
        elements: Vec<Node>,
    },
    Compound {
        body: Vec<Node>,
    },
    /// A node kind the default grammar does not produce, evaluated by a handler
    /// registered for `tag`.
    #[serde(skip)]
    Extension {
        tag: String,
        children: Vec<Node>,
        value: Value,
    },
}

impl Clone for Node {
    fn clone(&self) -> Self {
        ensure_sufficient_stack(|| match self {
            Node::Literal { value, raw } => Node::Literal { value: value.clone(), raw: raw.clone() },
            Node::Identifier { name } => Node::Identifier { name: name.clone() },
            Node::This {} => Node::This {},
            Node::Unary { operator, argument, prefix } => Node::Unary {
                operator: operator.clone(),
                argument: argument.clone(),
                prefix: *prefix,
            },
            Node::Binary { operator, left, right } => Node::Binary {
                operator: operator.clone(),
                left: left.clone(),
                right: right.clone(),
            },
            Node::Logical { operator, left, right } => Node::Logical {
                operator: operator.clone(),
                left: left.clone(),
                right: right.clone(),
            },
            Node::Conditional { test, consequent, alternate } => Node::Conditional {
                test: test.clone(),
                consequent: consequent.clone(),
                alternate: alternate.clone(),
            },
            Node::Member { computed, object, property } => Node::Member {
                computed: *computed,
                object: object.clone(),
                property: property.clone(),
            },
            Node::Call { callee, arguments } => Node::Call {
                callee: callee.clone(),
                arguments: arguments.clone(),
            },
            Node::Arrow { params, body } => Node::Arrow {
                params: params.clone(),
                body: Arc::clone(body),
            },
            Node::Array { elements } => Node::Array { elements: elements.clone() },
            Node::Compound { body } => Node::Compound { body: body.clone() },
            Node::Extension { tag, children, value } => Node::Extension {
                tag: tag.clone(),
                children: children.clone(),
                value: value.clone(),
            },
        })
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}

impl Node {
    /// Move every child into `out`, leaving childless placeholders behind.
    fn detach_children(&mut self, out: &mut Vec<Node>) {
        fn detach(child: &mut Node, out: &mut Vec<Node>) {
            out.push(mem::replace(child, Node::This {}));
        }
        match self {
            Node::Literal { .. } | Node::Identifier { .. } | Node::This {} => {}
            Node::Unary { argument, .. } => detach(argument, out),
            Node::Binary { left, right, .. } | Node::Logical { left, right, .. } => {
                detach(left, out);
                detach(right, out);
            }
            Node::Conditional { test, consequent, alternate } => {
                detach(test, out);
                detach(consequent, out);
                detach(alternate, out);
            }
            Node::Member { object, property, .. } => {
                detach(object, out);
                if let Some(property) = property {
                    detach(property, out);
                }
            }
            Node::Call { callee, arguments } => {
                detach(callee, out);
                out.append(arguments);
            }
            Node::Arrow { params, body } => {
                out.append(params);
                // shared bodies are left to their last owner
                if let Some(body) = Arc::get_mut(body) {
                    detach(body, out);
                }
            }
            Node::Array { elements: children }
            | Node::Compound { body: children }
            | Node::Extension { children, .. } => out.append(children),
        }
    }
}

fn prefix_default() -> bool {
    true
}

pub const LITERAL: &str = "Literal";
pub const IDENTIFIER: &str = "Identifier";
pub const THIS: &str = "ThisExpression";
pub const UNARY: &str = "UnaryExpression";
pub const BINARY: &str = "BinaryExpression";
pub const LOGICAL: &str = "LogicalExpression";
pub const CONDITIONAL: &str = "ConditionalExpression";
pub const MEMBER: &str = "MemberExpression";
pub const CALL: &str = "CallExpression";
pub const ARROW: &str = "ArrowFunctionExpression";
pub const ARRAY: &str = "ArrayExpression";
pub const COMPOUND: &str = "Compound";

impl Node {
    /// Grammar tag used to find this node's handler.
    pub fn tag(&self) -> &str {
        match self {
            Node::Literal { .. } => LITERAL,
            Node::Identifier { .. } => IDENTIFIER,
            Node::This {} => THIS,
            Node::Unary { .. } => UNARY,
            Node::Binary { .. } => BINARY,
            Node::Logical { .. } => LOGICAL,
            Node::Conditional { .. } => CONDITIONAL,
            Node::Member { .. } => MEMBER,
            Node::Call { .. } => CALL,
            Node::Arrow { .. } => ARROW,
            Node::Array { .. } => ARRAY,
            Node::Compound { .. } => COMPOUND,
            Node::Extension { tag, .. } => tag,
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        let value = value.into();
        let raw = match &value {
            Value::String(s) => format!("{s:?}"),
            other => other.to_js_string(),
        };
        Node::Literal { value, raw }
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Node::Identifier { name: name.into() }
    }

    pub fn binary(operator: impl Into<String>, left: Node, right: Node) -> Self {
        let operator = operator.into();
        let (left, right) = (Box::new(left), Box::new(right));
        if operator == "||" || operator == "&&" {
            Node::Logical { operator, left, right }
        } else {
            Node::Binary { operator, left, right }
        }
    }

    pub fn unary(operator: impl Into<String>, argument: Node) -> Self {
        Node::Unary { operator: operator.into(), argument: Box::new(argument), prefix: true }
    }

    pub fn member(object: Node, property: Node, computed: bool) -> Self {
        Node::Member {
            computed,
            object: Box::new(object),
            property: Some(Box::new(property)),
        }
    }

    pub fn call(callee: Node, arguments: Vec<Node>) -> Self {
        Node::Call { callee: Box::new(callee), arguments }
    }

    /// Plain name carried by an identifier, if this is one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Identifier { name } => Some(name),
            _ => None,
        }
    }
}
