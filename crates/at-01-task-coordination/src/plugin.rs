//! The typed plugin contract.
//!
//! A plugin realizes one oracle workload (an event forwarder, a balance
//! updater, an account linker) as four phase methods over four associated
//! types. The coordinator never sees the concrete types; it drives plugins
//! through the erased [`crate::handler::PluginHandler`] form.

use async_trait::async_trait;
use shared_codec::Value;
use shared_crypto::NodePublicKey;
use shared_types::OracleError;

/// Identity of a registered plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    /// Unique plugin id; listeners and API callers dispatch by this name.
    pub id: String,
}

impl PluginMetadata {
    /// Build metadata for the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Conversion between a plugin's typed data and the codec value grammar.
///
/// The codec form is what crosses the wire and what signatures cover, so
/// the conversion must be total and deterministic.
pub trait Codable: Sized + Send + Sync {
    /// Convert into the codec grammar.
    fn into_value(self) -> Value;
    /// Reconstruct from the codec grammar.
    fn from_value(value: Value) -> Result<Self, OracleError>;
}

impl Codable for Value {
    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: Value) -> Result<Self, OracleError> {
        Ok(value)
    }
}

impl Codable for () {
    fn into_value(self) -> Value {
        Value::Null
    }

    fn from_value(_value: Value) -> Result<Self, OracleError> {
        Ok(())
    }
}

/// One peer's contribution to the Process phase.
#[derive(Debug, Clone)]
pub struct PeerPrepared<P> {
    /// The contributing node's identity key.
    pub public_key: NodePublicKey,
    /// Its prepared data.
    pub prepared: P,
}

/// A polymorphic oracle workload.
///
/// ## Determinism contract
///
/// The coordinator relies on three properties concrete plugins must hold:
///
/// - Two honest nodes receiving the same `Input` produce preparations
///   whose canonical encodings are byte-identical, so every node's
///   signature verifies under the same buffer.
/// - `process` is idempotent modulo signer-set ordering: re-running it on
///   the same prepare set yields a transaction the downstream chain
///   deduplicates (409).
/// - `validate` appends its signature to the aggregate, never replaces.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// The request payload a listener or API caller submits.
    type Input: Codable;
    /// The per-node preparation artifact.
    type Prepared: Codable + Clone;
    /// The combined artifact accumulating signatures through Validate.
    type Aggregated: Codable;
    /// The terminal result of Execute.
    type Output: Codable;

    /// Plugin identity.
    fn metadata(&self) -> PluginMetadata;

    /// Examine the input and produce this node's preparation.
    ///
    /// Pure with respect to the input except for read-only external
    /// queries. Return `permanent_error` for structurally invalid input
    /// peers would also reject.
    async fn prepare(&self, input: Self::Input) -> Result<Self::Prepared, OracleError>;

    /// Combine the collected preparations into one artifact. Primary only.
    ///
    /// Return `non_error` when the work turns out to be already done
    /// upstream; the task then completes without executing.
    async fn process(
        &self,
        prepared: Vec<PeerPrepared<Self::Prepared>>,
    ) -> Result<Self::Aggregated, OracleError>;

    /// Re-examine the aggregate against this node's own preparation and
    /// return it with this node's signature appended.
    async fn validate(
        &self,
        aggregated: Self::Aggregated,
        my_prepared: Self::Prepared,
    ) -> Result<Self::Aggregated, OracleError>;

    /// Submit the final artifact downstream. Primary only.
    ///
    /// Return `already_submitted` when the downstream chain answers 409;
    /// the coordinator counts that as success.
    async fn execute(&self, aggregated: Self::Aggregated) -> Result<Self::Output, OracleError>;
}
