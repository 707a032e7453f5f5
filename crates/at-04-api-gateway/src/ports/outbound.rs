//! Outbound ports for the gateway.

use async_trait::async_trait;
use shared_types::OracleError;

/// Source of the tracked-mint allow-list the webhook filters against.
///
/// The gateway caches the answer under the webhook's short TTL, so
/// implementations may hit the downstream chain per refresh.
#[async_trait]
pub trait MintDirectory: Send + Sync {
    /// Mints whose balance deltas should become tasks.
    async fn tracked_mints(&self) -> Result<Vec<String>, OracleError>;
}

/// Fixed allow-list, typically read from plugin settings at startup.
pub struct StaticMintDirectory {
    mints: Vec<String>,
}

impl StaticMintDirectory {
    /// Wrap a fixed mint list.
    pub fn new(mints: Vec<String>) -> Self {
        Self { mints }
    }
}

#[async_trait]
impl MintDirectory for StaticMintDirectory {
    async fn tracked_mints(&self) -> Result<Vec<String>, OracleError> {
        Ok(self.mints.clone())
    }
}
