pub mod errors;
pub mod context;
pub mod functions;  // built-in methods on arrays and strings
pub mod node;
pub mod operators;
pub mod options;
pub mod parser;
pub mod types;
pub mod value;
mod deferred;
mod handlers;
mod path;
mod stack;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

pub use errors::{EvalError, Result};
pub use functions::Registry;
pub use node::Node;
pub use operators::OperatorTable;
pub use options::EvalOptions;
pub use parser::{DefaultParser, ExpressionParser, ParseError};
pub use path::ParameterPath;
pub use types::{NodeHandler, NodeType, NodeTypeTable};
pub use value::{Function, Map, Value};

/// Evaluates expression trees against a context value.
///
/// The operator table, node type table, method registry and parser are owned
/// by the evaluator and may be changed at any time through the customization
/// methods. Cloning an evaluator yields a handle to the same tables, which is
/// how arrow functions and deferred evaluations see later changes.
#[derive(Clone)]
pub struct Evaluator {
    inner: Arc<Inner>,
}

struct Inner {
    operators: RwLock<OperatorTable>,
    types: RwLock<NodeTypeTable>,
    parser: RwLock<Arc<dyn ExpressionParser>>,
    registry: RwLock<Registry>,
    options: EvalOptions,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator").finish_non_exhaustive()
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_options(EvalOptions::default())
    }

    pub fn with_options(options: EvalOptions) -> Self {
        Self::with_parts(options, Registry::with_builtins())
    }

    /// Build an evaluator with a custom method registry.
    pub fn with_parts(options: EvalOptions, registry: Registry) -> Self {
        let inner = Inner {
            operators: RwLock::new(OperatorTable::default()),
            types: RwLock::new(NodeTypeTable::with_defaults()),
            parser: RwLock::new(default_parser()),
            registry: RwLock::new(registry),
            options,
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn options(&self) -> &EvalOptions {
        &self.inner.options
    }

    /// Parse `expression` with the active parser and evaluate it.
    pub fn evaluate(&self, expression: &str, context: &Value) -> Result<Value> {
        let tree = self.parse(expression)?;
        self.evaluate_tree(&tree, context)
    }

    pub fn evaluate_tree(&self, tree: &Node, context: &Value) -> Result<Value> {
        self.evaluate_node(tree, context)
    }

    pub fn parse(&self, expression: &str) -> Result<Node> {
        let parser = Arc::clone(&*self.inner.parser.read());
        Ok(parser.parse(expression)?)
    }

    /// Dispatch `node` to the handler registered for its tag.
    ///
    /// The handler is cloned out of the table first, so it may itself change
    /// the evaluator's tables.
    pub fn evaluate_node(&self, node: &Node, context: &Value) -> Result<Value> {
        let tag = node.tag();
        let handler = self
            .inner
            .types
            .read()
            .handler_for(tag)
            .ok_or_else(|| EvalError::UnknownNodeType(tag.to_string()))?;
        trace!(node = tag, "evaluate");
        stack::ensure_sufficient_stack(|| handler(self, node, context))
    }

    // customization

    pub fn add_binary_op<F>(&self, op: &str, f: F) -> &Self
    where
        F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    {
        debug!(op, "add binary operator");
        self.inner.operators.write().add_binary(op, f);
        self
    }

    pub fn remove_binary_op(&self, op: &str) -> &Self {
        debug!(op, "remove binary operator");
        self.inner.operators.write().remove_binary(op);
        self
    }

    /// Make `alias` evaluate with the function currently bound to `op`.
    pub fn alias_for_binary_op(&self, alias: &str, op: &str) -> Result<&Self> {
        debug!(alias, op, "alias binary operator");
        self.inner.operators.write().alias_binary(alias, op)?;
        Ok(self)
    }

    pub fn add_unary_op<F>(&self, op: &str, f: F) -> &Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        debug!(op, "add unary operator");
        self.inner.operators.write().add_unary(op, f);
        self
    }

    pub fn remove_unary_op(&self, op: &str) -> &Self {
        debug!(op, "remove unary operator");
        self.inner.operators.write().remove_unary(op);
        self
    }

    pub fn alias_for_unary_op(&self, alias: &str, op: &str) -> Result<&Self> {
        debug!(alias, op, "alias unary operator");
        self.inner.operators.write().alias_unary(alias, op)?;
        Ok(self)
    }

    /// Register `handler` for nodes tagged `tag`, under the name `key`.
    pub fn add_type<F>(&self, key: &str, tag: &str, handler: F) -> &Self
    where
        F: Fn(&Evaluator, &Node, &Value) -> Result<Value> + Send + Sync + 'static,
    {
        debug!(key, tag, "add node type");
        self.inner.types.write().insert(key, tag, handler);
        self
    }

    pub fn remove_type(&self, key: &str) -> &Self {
        debug!(key, "remove node type");
        self.inner.types.write().remove(key);
        self
    }

    pub fn get_type(&self, key: &str) -> Option<NodeType> {
        self.inner.types.read().get(key)
    }

    /// Add a method callable on arrays or strings.
    pub fn register_method<M: functions::Method + 'static>(&self, method: M) -> &Self {
        debug!(name = method.name(), "register method");
        self.inner.registry.write().register(method);
        self
    }

    pub fn get_parser(&self) -> Arc<dyn ExpressionParser> {
        Arc::clone(&*self.inner.parser.read())
    }

    pub fn set_parser(&self, parser: Arc<dyn ExpressionParser>) -> &Self {
        debug!("replace parser");
        *self.inner.parser.write() = parser;
        self
    }

    pub fn restore_parser(&self) -> &Self {
        debug!("restore default parser");
        *self.inner.parser.write() = default_parser();
        self
    }
}

fn default_parser() -> Arc<dyn ExpressionParser> {
    Arc::new(DefaultParser::default())
}

/// Convenience: evaluate with a fresh default evaluator and an undefined context.
pub fn eval(expr: &str) -> Result<Value> {
    Evaluator::new().evaluate(expr, &Value::Undefined)
}

/// Convenience: evaluate against a JSON context.
pub fn eval_with(expr: &str, context: serde_json::Value) -> Result<Value> {
    Evaluator::new().evaluate(expr, &Value::from(context))
}
