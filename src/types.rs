use std::fmt;
use std::sync::Arc;

use crate::errors::Result;
use crate::node::{self, Node};
use crate::value::Value;
use crate::Evaluator;

/// Evaluates one node. Handlers recurse through [`Evaluator::evaluate_node`].
pub type NodeHandler = Arc<dyn Fn(&Evaluator, &Node, &Value) -> Result<Value> + Send + Sync>;

/// A registered node type: the grammar tag it matches and the handler that evaluates it.
#[derive(Clone)]
pub struct NodeType {
    pub tag: String,
    pub handler: NodeHandler,
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType").field("tag", &self.tag).finish_non_exhaustive()
    }
}

/// Node types keyed by name (`"BINARY"`), kept in insertion order.
///
/// When several keys share a tag, the earliest registered one handles it.
#[derive(Clone, Default)]
pub struct NodeTypeTable {
    entries: Vec<(String, NodeType)>,
}

impl NodeTypeTable {
    pub fn with_defaults() -> Self {
        let mut table = Self::default();
        table.insert("LITERAL", node::LITERAL, Evaluator::evaluate_literal_node);
        table.insert("UNARY", node::UNARY, Evaluator::evaluate_unary_node);
        table.insert("BINARY", node::BINARY, Evaluator::evaluate_binary_node);
        table.insert("LOGICAL", node::LOGICAL, Evaluator::evaluate_binary_node);
        table.insert("CONDITIONAL", node::CONDITIONAL, Evaluator::evaluate_conditional_node);
        table.insert("MEMBER", node::MEMBER, Evaluator::evaluate_member_node);
        table.insert("IDENTIFIER", node::IDENTIFIER, Evaluator::evaluate_member_node);
        table.insert("THIS", node::THIS, Evaluator::evaluate_this_node);
        table.insert("CALL", node::CALL, Evaluator::evaluate_call_node);
        table.insert("ARROW", node::ARROW, Evaluator::evaluate_arrow_node);
        table.insert("ARRAY", node::ARRAY, Evaluator::evaluate_array_node);
        table.insert("COMPOUND", node::COMPOUND, Evaluator::evaluate_compound_node);
        table
    }

    pub fn insert<F>(&mut self, key: impl Into<String>, tag: impl Into<String>, handler: F)
    where
        F: Fn(&Evaluator, &Node, &Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert_type(key, NodeType { tag: tag.into(), handler: Arc::new(handler) });
    }

    /// Add or replace the entry for `key`. A replaced entry keeps its position.
    pub fn insert_type(&mut self, key: impl Into<String>, node_type: NodeType) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = node_type,
            None => self.entries.push((key, node_type)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<NodeType> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, key: &str) -> Option<NodeType> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, t)| t.clone())
    }

    pub fn handler_for(&self, tag: &str) -> Option<NodeHandler> {
        self.entries
            .iter()
            .find(|(_, t)| t.tag == tag)
            .map(|(_, t)| Arc::clone(&t.handler))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}
