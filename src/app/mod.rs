//! Consumer-facing surface of the pipeline.
//!
//! Settled events leave the deferred context through the [`ports`] trait.
//! Adapters on the other side decide what a settled edge means (log it,
//! notify someone, propagate state).

pub mod events;
pub mod ports;
