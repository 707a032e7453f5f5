//! Object-safe erasure of the plugin contract.
//!
//! The registry stores plugins as `Arc<dyn PluginHandler>`, with every
//! phase speaking the codec value grammar. [`ErasedPlugin`] adapts any
//! typed [`Plugin`] by converting at the boundary.

use async_trait::async_trait;
use shared_codec::Value;
use shared_types::OracleError;

use crate::plugin::{Codable, PeerPrepared, Plugin};

/// A plugin with its types erased to the codec grammar.
#[async_trait]
pub trait PluginHandler: Send + Sync + std::fmt::Debug {
    /// The plugin's registered id.
    fn id(&self) -> &str;

    /// Phase 1: produce this node's preparation for `input`.
    async fn prepare(&self, input: Value) -> Result<Value, OracleError>;

    /// Phase 2: combine collected preparations. Primary only.
    async fn process(&self, prepared: Vec<PeerPrepared<Value>>) -> Result<Value, OracleError>;

    /// Phase 3: check the aggregate and append this node's signature.
    async fn validate(&self, aggregated: Value, my_prepared: Value) -> Result<Value, OracleError>;

    /// Phase 4: submit the final artifact. Primary only.
    async fn execute(&self, aggregated: Value) -> Result<Value, OracleError>;
}

/// Adapter erasing a typed [`Plugin`] to [`PluginHandler`].
pub struct ErasedPlugin<P: Plugin> {
    id: String,
    inner: P,
}

impl<P: Plugin> ErasedPlugin<P> {
    /// Wrap a typed plugin.
    pub fn new(inner: P) -> Self {
        Self {
            id: inner.metadata().id,
            inner,
        }
    }
}

impl<P: Plugin> std::fmt::Debug for ErasedPlugin<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErasedPlugin").field("id", &self.id).finish()
    }
}

#[async_trait]
impl<P: Plugin> PluginHandler for ErasedPlugin<P> {
    fn id(&self) -> &str {
        &self.id
    }

    async fn prepare(&self, input: Value) -> Result<Value, OracleError> {
        let input = P::Input::from_value(input)?;
        let prepared = self.inner.prepare(input).await?;
        Ok(prepared.into_value())
    }

    async fn process(&self, prepared: Vec<PeerPrepared<Value>>) -> Result<Value, OracleError> {
        let typed: Result<Vec<PeerPrepared<P::Prepared>>, OracleError> = prepared
            .into_iter()
            .map(|record| {
                Ok(PeerPrepared {
                    public_key: record.public_key,
                    prepared: P::Prepared::from_value(record.prepared)?,
                })
            })
            .collect();

        let aggregated = self.inner.process(typed?).await?;
        Ok(aggregated.into_value())
    }

    async fn validate(&self, aggregated: Value, my_prepared: Value) -> Result<Value, OracleError> {
        let aggregated = P::Aggregated::from_value(aggregated)?;
        let my_prepared = P::Prepared::from_value(my_prepared)?;
        let validated = self.inner.validate(aggregated, my_prepared).await?;
        Ok(validated.into_value())
    }

    async fn execute(&self, aggregated: Value) -> Result<Value, OracleError> {
        let aggregated = P::Aggregated::from_value(aggregated)?;
        let output = self.inner.execute(aggregated).await?;
        Ok(output.into_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginMetadata;
    use shared_crypto::NodeKeyPair;

    /// A plugin whose prepared form is a dict echoing the input.
    struct EchoPlugin;

    #[async_trait]
    impl Plugin for EchoPlugin {
        type Input = Value;
        type Prepared = Value;
        type Aggregated = Value;
        type Output = Value;

        fn metadata(&self) -> PluginMetadata {
            PluginMetadata::new("echo")
        }

        async fn prepare(&self, input: Value) -> Result<Value, OracleError> {
            Ok(Value::dict([("observed", input)]))
        }

        async fn process(&self, prepared: Vec<PeerPrepared<Value>>) -> Result<Value, OracleError> {
            Ok(Value::Int(prepared.len() as i64))
        }

        async fn validate(&self, aggregated: Value, _my: Value) -> Result<Value, OracleError> {
            Ok(aggregated)
        }

        async fn execute(&self, aggregated: Value) -> Result<Value, OracleError> {
            Ok(aggregated)
        }
    }

    #[tokio::test]
    async fn test_erased_phases_round_through_values() {
        let handler = ErasedPlugin::new(EchoPlugin);
        assert_eq!(handler.id(), "echo");

        let prepared = handler.prepare(Value::text("event")).await.unwrap();
        assert_eq!(
            prepared.get("observed").and_then(Value::as_text),
            Some("event")
        );

        let keypair = NodeKeyPair::generate();
        let aggregated = handler
            .process(vec![PeerPrepared {
                public_key: keypair.public_key(),
                prepared: prepared.clone(),
            }])
            .await
            .unwrap();
        assert_eq!(aggregated.as_int(), Some(1));

        let validated = handler.validate(aggregated, prepared).await.unwrap();
        let output = handler.execute(validated).await.unwrap();
        assert_eq!(output.as_int(), Some(1));
    }
}
