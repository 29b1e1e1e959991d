//! Named thread spawning for the pipeline's timer and worker tasks.
//!
//! Wraps `std::thread::Builder` so every pipeline task gets a readable
//! name and an explicit stack size, and so a spawn failure becomes an
//! [`InitError`] instead of a panic. If spawning fails the closure, and
//! everything it captured, is dropped before this returns.

use std::thread::JoinHandle;

use log::{debug, error};

use crate::error::InitError;

/// Spawn `f` on a new thread named `name` with a `stack_kb` KiB stack.
pub fn spawn_task<T, F>(
    name: &'static str,
    stack_kb: usize,
    f: F,
) -> Result<JoinHandle<T>, InitError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    debug!("Spawning '{}' (stack={}KB)", name, stack_kb);

    let Some(stack_bytes) = stack_kb.checked_mul(1024) else {
        error!("spawn_task: '{}' stack of {}KB overflows", name, stack_kb);
        return Err(InitError::TaskSpawnFailed(name));
    };

    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_bytes)
        .spawn(f)
        .map_err(|e| {
            error!("spawn_task: '{}' failed: {}", name, e);
            InitError::TaskSpawnFailed(name)
        })
}
