//! # AT-01 Task Coordination
//!
//! The heart of the oracle network: the plugin contract, the process-wide
//! plugin registry, and the `Task` coordinator that drives a single request
//! through the four-phase protocol.
//!
//! # Protocol
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             Task                                 │
//! │                                                                  │
//! │  Prepare ──► local plugin.prepare + parallel peer fan-out        │
//! │     │        (raced against peerTimeoutMs, quorum checked)       │
//! │     ▼                                                            │
//! │  Process ──► plugin.process(records), primary only               │
//! │     │                                                            │
//! │     ▼                                                            │
//! │  Validate ─► local plugin.validate, then each contributing       │
//! │     │        peer's /task/validate in series, chaining the       │
//! │     │        aggregated artifact and its signatures              │
//! │     ▼                                                            │
//! │  Execute ──► plugin.execute, primary only, at most once          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two conversions exist and both live here: a `permanent_error` at
//! Prepare completes the task vacuously, and an `already_submitted`
//! (downstream 409) at Execute counts as success. A `non_error` from any
//! phase also completes the task without counting as a completion.
//!
//! Peer I/O goes through the [`ports::outbound::PeerCoordination`] port;
//! the peer-protocol crate provides the HTTP implementation. Listeners
//! reach this crate only through [`TaskDispatcher`], naming plugins by id.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod dispatch;
pub mod handler;
pub mod plugin;
pub mod ports;
pub mod records;
pub mod registry;
pub mod task;

pub use context::TaskContext;
pub use dispatch::{TaskDispatcher, TaskRunner};
pub use handler::{ErasedPlugin, PluginHandler};
pub use plugin::{Codable, PeerPrepared, Plugin, PluginMetadata};
pub use records::{PeerPrepareRecord, PRIMARY_MARKER};
pub use registry::PluginRegistry;
pub use task::Task;
