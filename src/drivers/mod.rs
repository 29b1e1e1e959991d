//! Input line drivers and task helpers.

pub mod sim_line;
pub mod task;
