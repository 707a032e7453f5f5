//! Port definitions for the gateway.

pub mod outbound;
