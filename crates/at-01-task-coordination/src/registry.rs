//! # Plugin Registry
//!
//! Process-wide mapping from plugin id to handler. Populated at startup,
//! read-only afterwards: the runtime builds it, wraps it in an `Arc`, and
//! passes the handle down, so no lock is needed post-init.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use shared_types::OracleError;

use crate::handler::{ErasedPlugin, PluginHandler};
use crate::plugin::Plugin;

/// Name → handler lookup for all registered plugins.
#[derive(Default)]
pub struct PluginRegistry {
    handlers: HashMap<String, Arc<dyn PluginHandler>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a typed plugin. Duplicate ids are a startup error.
    pub fn register<P: Plugin>(&mut self, plugin: P) -> Result<(), OracleError> {
        self.register_handler(Arc::new(ErasedPlugin::new(plugin)))
    }

    /// Register an already-erased handler.
    pub fn register_handler(&mut self, handler: Arc<dyn PluginHandler>) -> Result<(), OracleError> {
        let id = handler.id().to_string();
        info!(plugin_id = %id, "Registering plugin");

        if self.handlers.contains_key(&id) {
            return Err(OracleError::config(format!(
                "Plugin id registered twice: {id}"
            )));
        }

        self.handlers.insert(id, handler);
        Ok(())
    }

    /// Look up a handler by id.
    pub fn get(&self, id: &str) -> Result<Arc<dyn PluginHandler>, OracleError> {
        self.handlers
            .get(id)
            .cloned()
            .ok_or_else(|| OracleError::NotFound {
                what: format!("plugin {id}"),
            })
    }

    /// Registered plugin ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handlers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{PeerPrepared, PluginMetadata};
    use async_trait::async_trait;
    use shared_codec::Value;

    struct NamedPlugin(&'static str);

    #[async_trait]
    impl Plugin for NamedPlugin {
        type Input = Value;
        type Prepared = Value;
        type Aggregated = Value;
        type Output = Value;

        fn metadata(&self) -> PluginMetadata {
            PluginMetadata::new(self.0)
        }

        async fn prepare(&self, input: Value) -> Result<Value, OracleError> {
            Ok(input)
        }

        async fn process(&self, _prepared: Vec<PeerPrepared<Value>>) -> Result<Value, OracleError> {
            Ok(Value::Null)
        }

        async fn validate(&self, aggregated: Value, _my: Value) -> Result<Value, OracleError> {
            Ok(aggregated)
        }

        async fn execute(&self, _aggregated: Value) -> Result<Value, OracleError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = PluginRegistry::new();
        registry.register(NamedPlugin("evm-forwarder")).unwrap();
        registry.register(NamedPlugin("balance-updater")).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("evm-forwarder").is_ok());
        assert_eq!(
            registry.ids(),
            vec!["balance-updater".to_string(), "evm-forwarder".to_string()]
        );
    }

    #[test]
    fn test_missing_plugin_is_not_found() {
        let registry = PluginRegistry::new();
        let err = registry.get("ghost").unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = PluginRegistry::new();
        registry.register(NamedPlugin("dup")).unwrap();
        let err = registry.register(NamedPlugin("dup")).unwrap_err();
        assert_eq!(err.kind(), "config_error");
    }
}
