//! Observability layer.
//!
//! Canonical event names and field keys for the `tracing` events this crate
//! emits. The library never initializes a global subscriber; binaries and
//! tests own one-time `tracing_subscriber` setup at process boundaries.

pub mod events;
pub mod fields;
