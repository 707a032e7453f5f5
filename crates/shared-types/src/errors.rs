//! # Error Taxonomy
//!
//! The tagged error kinds used at every boundary. Inner layers carry their
//! specific tag up to the task coordinator unchanged; exactly two
//! conversions exist in the whole system, and both live in the coordinator
//! (`permanent_error` at Prepare becomes vacuous success, and
//! `already_submitted` at Execute becomes success).

use shared_codec::CodecError;
use shared_crypto::CryptoError;
use thiserror::Error;

/// Tagged failure at any oracle boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// Arbitrary plugin-internal failure.
    #[error("Plugin failure: {context}")]
    Plugin { context: String },

    /// Plugin failed during the Prepare phase.
    #[error("Prepare failed: {context}")]
    Prepare { context: String },

    /// Plugin failed during the Process phase.
    #[error("Process failed: {context}")]
    Process { context: String },

    /// Plugin or boundary check failed during Validate.
    #[error("Validation failed: {context}")]
    Validation { context: String },

    /// Plugin failed during Execute.
    #[error("Execute failed: {context}")]
    Execute { context: String },

    /// The input is structurally un-processable; peers would reject it too.
    #[error("Permanently unprocessable input: {context}")]
    Permanent { context: String },

    /// Nothing to do (e.g. the event was already processed upstream).
    #[error("Nothing to do")]
    NonError,

    /// A deadline elapsed: the prepare fan-out window or a provider budget.
    #[error("Timed out: {context}")]
    Timeout { context: String },

    /// Too few prepares collected to meet quorum.
    #[error("Insufficient peers: collected {collected}, required {required}")]
    InsufficientPeers {
        /// Distinct public keys that contributed a prepare (self included).
        collected: usize,
        /// Configured quorum threshold.
        required: usize,
    },

    /// The rate limiter surfaced an underlying failure.
    #[error("Throttled call failed: {context}")]
    Throttle { context: String },

    /// A listener's dispatch mapping has no entry for this contract.
    #[error("Unsupported contract type: {contract_type}")]
    UnsupportedContractType {
        /// The unmapped contract discriminator.
        contract_type: String,
    },

    /// A registry lookup missed.
    #[error("Not found: {what}")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// The downstream chain reported the submission as a duplicate (409).
    #[error("Duplicate submission already accepted downstream")]
    AlreadySubmitted,

    /// A peer RPC failed below the protocol layer.
    #[error("Peer transport failure: {context}")]
    Transport { context: String },

    /// Invalid or unusable configuration.
    #[error("Configuration error: {context}")]
    Config { context: String },

    /// Canonical encoding or decoding failed.
    #[error("Codec failure: {0}")]
    Codec(#[from] CodecError),

    /// A cryptographic operation failed.
    #[error("Crypto failure: {0}")]
    Crypto(#[from] CryptoError),
}

impl OracleError {
    /// Stable snake_case tag for logs and HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::Plugin { .. } => "plugin_error",
            OracleError::Prepare { .. } => "prepare_error",
            OracleError::Process { .. } => "process_error",
            OracleError::Validation { .. } => "validation_error",
            OracleError::Execute { .. } => "execute_error",
            OracleError::Permanent { .. } => "permanent_error",
            OracleError::NonError => "non_error",
            OracleError::Timeout { .. } => "timeout",
            OracleError::InsufficientPeers { .. } => "insufficient_peers",
            OracleError::Throttle { .. } => "throttle_error",
            OracleError::UnsupportedContractType { .. } => "unsupported_contract_type",
            OracleError::NotFound { .. } => "not_found",
            OracleError::AlreadySubmitted => "already_submitted",
            OracleError::Transport { .. } => "transport_error",
            OracleError::Config { .. } => "config_error",
            OracleError::Codec(_) => "codec_error",
            OracleError::Crypto(_) => "crypto_error",
        }
    }

    /// Shorthand for a plugin failure with context.
    pub fn plugin(context: impl Into<String>) -> Self {
        OracleError::Plugin { context: context.into() }
    }

    /// Shorthand for a permanent failure with context.
    pub fn permanent(context: impl Into<String>) -> Self {
        OracleError::Permanent { context: context.into() }
    }

    /// Shorthand for a transport failure with context.
    pub fn transport(context: impl Into<String>) -> Self {
        OracleError::Transport { context: context.into() }
    }

    /// Shorthand for a config failure with context.
    pub fn config(context: impl Into<String>) -> Self {
        OracleError::Config { context: context.into() }
    }
}
