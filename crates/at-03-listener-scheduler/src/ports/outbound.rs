//! Outbound ports: the calls a concrete listener needs from its source
//! chain and from the downstream ledger. Implementations wrap provider
//! RPC clients; tests use in-memory fakes.

use async_trait::async_trait;
use shared_codec::Value;
use shared_types::{EventId, OracleError};

/// One log-style event from a block-oriented source chain.
#[derive(Debug, Clone)]
pub struct SourceEvent {
    /// Height of the containing block.
    pub block_number: u64,
    /// Log index within the transaction.
    pub log_index: u64,
    /// Transaction hash.
    pub tx_hash: String,
    /// Decoded event payload.
    pub payload: Value,
}

impl SourceEvent {
    /// Stable dedup id for this event.
    pub fn event_id(&self) -> EventId {
        EventId::new(self.tx_hash.clone(), self.log_index)
    }
}

/// A block-oriented source chain (EVM style).
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Current head height.
    async fn head(&self) -> Result<u64, OracleError>;

    /// Events in the inclusive block range `[from, to]`.
    async fn events_in(&self, from: u64, to: u64) -> Result<Vec<SourceEvent>, OracleError>;
}

/// One program signature from a slot-oriented source chain.
#[derive(Debug, Clone)]
pub struct SlotSignature {
    /// Slot the transaction landed in.
    pub slot: u64,
    /// The transaction signature (the dedup key).
    pub signature: String,
    /// Decoded payload for dispatch.
    pub payload: Value,
}

/// A slot-oriented source chain (Solana style).
#[async_trait]
pub trait SlotSignatureSource: Send + Sync {
    /// Current head slot.
    async fn head_slot(&self) -> Result<u64, OracleError>;

    /// Signatures for the watched program strictly after `slot`.
    async fn signatures_since(&self, slot: u64) -> Result<Vec<SlotSignature>, OracleError>;
}

/// Queries against the downstream chain's own index, used for listener
/// cold starts.
#[async_trait]
pub trait ProcessedQuery: Send + Sync {
    /// The height/slot the downstream chain has indexed for `source`.
    async fn last_indexed_height(&self, source: &str) -> Result<u64, OracleError>;
}
