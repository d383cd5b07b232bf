use std::borrow::Cow;
use std::fmt;

use crate::errors::{EvalError, Result};
use crate::functions::ReceiverKind;
use crate::node::Node;
use crate::value::{Function, Value};
use crate::Evaluator;

/// Where a member or identifier lives inside a base value, e.g. `a.b[c]`.
///
/// The rendered string form is also tried as a single key before the
/// segments are walked, so a context key literally named `"a.b"` is found.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterPath {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    key: String,
    computed: bool,
}

impl ParameterPath {
    pub fn named(key: impl Into<String>) -> Self {
        Self { segments: vec![Segment { key: key.into(), computed: false }] }
    }

    pub fn computed(key: impl Into<String>) -> Self {
        Self { segments: vec![Segment { key: key.into(), computed: true }] }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path without its last segment, when one remains.
    pub fn parent(&self) -> Option<ParameterPath> {
        if self.segments.len() < 2 {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    fn extend(&mut self, other: ParameterPath) {
        self.segments.extend(other.segments);
    }
}

impl fmt::Display for ParameterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if seg.computed {
                write!(f, "[{}]", seg.key)?;
            } else if i == 0 {
                f.write_str(&seg.key)?;
            } else {
                write!(f, ".{}", seg.key)?;
            }
        }
        Ok(())
    }
}

/// Members off a call, array or arrow result are resolved against that
/// intermediate value instead of the context.
fn is_chained(object: &Node) -> bool {
    matches!(object, Node::Arrow { .. } | Node::Call { .. } | Node::Array { .. })
}

fn bind_receiver(function: Function, receiver: Value) -> Value {
    if function.receiver().is_some() {
        Value::Function(function)
    } else {
        Value::Function(function.bind(receiver))
    }
}

impl Evaluator {
    /// Evaluate a member or identifier node.
    ///
    /// Callables found through an intermediate object are bound to it, so
    /// `b.c()` runs `c` with `b` as its receiver. Callables stored directly
    /// under the looked-up key stay unbound.
    pub fn evaluate_member_node(&self, node: &Node, context: &Value) -> Result<Value> {
        if let Node::Member { object, .. } = node {
            if is_chained(object) {
                let base = self.evaluate_node(object, context)?;
                let path = self.property_path(node, &base)?;
                return Ok(match self.lookup(&base, &path) {
                    Value::Function(f) => bind_receiver(f, base),
                    other => other,
                });
            }
        }

        let path = self.get_parameter_path(node, context)?;
        let found = self.lookup(context, &path);
        let Value::Function(function) = found else {
            return Ok(found);
        };
        if is_direct_key(context, &path) {
            return Ok(Value::Function(function));
        }
        match path.parent() {
            Some(parent) => Ok(bind_receiver(function, self.lookup(context, &parent))),
            None => Ok(Value::Function(function)),
        }
    }

    /// Full access path of an identifier or member chain.
    pub fn get_parameter_path(&self, node: &Node, context: &Value) -> Result<ParameterPath> {
        match node {
            Node::Identifier { name } => Ok(ParameterPath::named(name.as_str())),
            Node::Member { object, .. } => {
                let mut path = match object.as_ref() {
                    Node::This {} => ParameterPath::default(),
                    Node::Identifier { .. } | Node::Member { .. } => {
                        self.get_parameter_path(object, context)?
                    }
                    other => {
                        return Err(EvalError::InvalidParameterPathNodeType(other.tag().to_string()))
                    }
                };
                path.extend(self.property_path(node, context)?);
                Ok(path)
            }
            other => Err(EvalError::InvalidParameterPathNodeType(other.tag().to_string())),
        }
    }

    /// The property part of a member node.
    ///
    /// Computed properties are evaluated against `context`; their value,
    /// converted to a string, becomes the key.
    pub fn property_path(&self, node: &Node, context: &Value) -> Result<ParameterPath> {
        let Node::Member { computed, property, .. } = node else {
            return Err(EvalError::InvalidParameterPathNodeType(node.tag().to_string()));
        };
        let property = property.as_deref().ok_or(EvalError::MissingProperty)?;
        if *computed {
            let key = self.evaluate_node(property, context)?;
            return Ok(ParameterPath::computed(key.to_js_string()));
        }
        match property {
            Node::Identifier { name } => Ok(ParameterPath::named(name.as_str())),
            Node::Member { .. } => self.get_parameter_path(property, context),
            other => Err(EvalError::InvalidParameterPathNodeType(other.tag().to_string())),
        }
    }

    /// Path-based get. Missing keys produce `undefined`.
    pub fn lookup(&self, base: &Value, path: &ParameterPath) -> Value {
        if path.is_empty() {
            return base.clone();
        }
        if let Some(found) = base.as_object().and_then(|map| map.get(&path.to_string())) {
            return found.clone();
        }
        let mut current = Cow::Borrowed(base);
        for key in path.keys() {
            let next = match current {
                Cow::Borrowed(value) => value
                    .property_ref(key)
                    .map(Cow::Borrowed)
                    .or_else(|| value.property(key).map(Cow::Owned))
                    .or_else(|| self.method(value, key).map(Cow::Owned)),
                Cow::Owned(value) => value
                    .property(key)
                    .or_else(|| self.method(&value, key))
                    .map(Cow::Owned),
            };
            match next {
                Some(value) => current = value,
                None => return Value::Undefined,
            }
        }
        current.into_owned()
    }

    fn method(&self, receiver: &Value, name: &str) -> Option<Value> {
        let kind = match receiver {
            Value::Array(_) => ReceiverKind::Array,
            Value::String(_) => ReceiverKind::String,
            _ => return None,
        };
        self.inner.registry.read().get(kind, name).map(Value::Function)
    }
}

fn is_direct_key(base: &Value, path: &ParameterPath) -> bool {
    base.as_object().is_some_and(|map| map.contains_key(&path.to_string()))
}
