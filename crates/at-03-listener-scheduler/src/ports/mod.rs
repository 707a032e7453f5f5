//! Port definitions for listeners.

pub mod outbound;
