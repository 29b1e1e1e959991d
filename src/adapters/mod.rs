//! Adapters: concrete implementations of the port traits plus host
//! services (time) the pipeline runs on.

pub mod log_sink;
pub mod time;
