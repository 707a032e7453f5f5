//! # AT-02 Peer Protocol
//!
//! The RPC surface that glues task coordinators together:
//!
//! - [`server`] exposes `POST /task/prepare` and `POST /task/validate`;
//!   both are stateless, so any node can serve either.
//! - [`client`] implements the coordinator's outbound
//!   `PeerCoordination` port over HTTP.
//!
//! ## Wire Form
//!
//! Request bodies are the canonical binary codec, historically labelled
//! `content-type: application/json`. The label is wrong but load-bearing:
//! the client emits it for compatibility and the server never inspects
//! content types. Responses are real JSON with hex-encoded binary fields.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod server;
pub mod wire;

pub use client::HttpPeerClient;
pub use server::{peer_router, serve, PeerServerState};
pub use wire::{ErrorBody, PrepareRequest, PrepareResponseBody, ValidateRequest, ValidateResponseBody};
