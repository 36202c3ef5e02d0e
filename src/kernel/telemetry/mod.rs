//! Cue telemetry.
//!
//! # INVARIANT
//! Telemetry is a write-only side channel. Nothing in the registry, player or
//! sequencer reads it back to make a decision; it exists for the operator
//! status view and for verification.

pub mod event;
pub mod metrics;
pub mod recorder;
