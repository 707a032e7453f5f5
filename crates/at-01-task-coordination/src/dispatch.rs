//! Dispatch seam between event producers and the coordinator.
//!
//! Listeners and the API surface never import plugin modules; they name a
//! plugin by id and hand the input here. That keeps the "listener feeds
//! plugin, plugin serves listener's chain" relation acyclic.

use std::sync::Arc;

use async_trait::async_trait;
use shared_codec::Value;
use shared_types::OracleError;

use crate::context::TaskContext;
use crate::task::Task;

/// Anything that can run a task for a named plugin.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Resolve `plugin_id` and drive one task to a terminal state.
    async fn dispatch(&self, plugin_id: &str, input: Value) -> Result<Value, OracleError>;
}

/// The production dispatcher: registry lookup plus a [`Task`] run.
pub struct TaskRunner {
    context: Arc<TaskContext>,
}

impl TaskRunner {
    /// Build a runner over the shared context.
    pub fn new(context: Arc<TaskContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl TaskDispatcher for TaskRunner {
    async fn dispatch(&self, plugin_id: &str, input: Value) -> Result<Value, OracleError> {
        let plugin = self.context.registry.get(plugin_id)?;
        Task::new(Arc::clone(&self.context), plugin, input).start().await
    }
}
