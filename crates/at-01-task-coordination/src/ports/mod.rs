//! Port definitions for the task coordinator.

pub mod outbound;
