//! # AT-03 Listener Scheduler
//!
//! The runtime that drives work into the task coordinator from external
//! chain sources. Each registered listener gets a dedicated fiber that
//! re-fires it at whatever absolute timestamp its last run asked for; a
//! caught-up listener self-throttles, a backlogged one returns
//! "immediately".
//!
//! Concrete listeners observe sources through the outbound port traits in
//! [`ports`] and dispatch tasks through the registry-backed
//! `TaskDispatcher`, never by importing plugin code.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod listener;
pub mod ports;
pub mod scheduler;
pub mod slots;
pub mod window;

pub use listener::{now_ms, Listener};
pub use scheduler::ListenerScheduler;
pub use slots::SlotSignatureListener;
pub use window::BlockWindowListener;
