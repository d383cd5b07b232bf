use std::future::Future;

use tracing::trace;

use crate::errors::Result;
use crate::node::Node;
use crate::value::Value;
use crate::Evaluator;

impl Evaluator {
    /// Evaluate `expression` on a later turn of the async scheduler.
    ///
    /// The returned future yields once before evaluating, so registry changes
    /// made after this call but before that turn are visible to the evaluation.
    /// Errors resolve the future instead of being returned here.
    pub fn peval(
        &self,
        expression: &str,
        context: Value,
    ) -> impl Future<Output = Result<Value>> + Send + 'static {
        let evaluator = self.clone();
        let expression = expression.to_string();
        async move {
            tokio::task::yield_now().await;
            trace!(expression = expression.as_str(), "deferred evaluate");
            evaluator.evaluate(&expression, &context)
        }
    }

    /// Deferred form of [`Evaluator::evaluate_tree`].
    pub fn peval_tree(
        &self,
        tree: Node,
        context: Value,
    ) -> impl Future<Output = Result<Value>> + Send + 'static {
        let evaluator = self.clone();
        async move {
            tokio::task::yield_now().await;
            evaluator.evaluate_tree(&tree, &context)
        }
    }
}
