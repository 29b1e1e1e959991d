//! Edge source handle and the process-wide source registry.
//!
//! An [`EdgeSource`] is acquired construct-or-fail: the source id is
//! claimed first, then the line's initial level is sampled. If sampling
//! fails the claim guard is dropped on the way out, so a failed
//! acquisition leaves nothing behind. Dropping an `EdgeSource` releases
//! its id.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::InputPin;
use log::{debug, warn};

use crate::error::InitError;

/// Maximum number of simultaneously registered sources.
pub const MAX_SOURCES: usize = 32;

static REGISTRY: Mutex<CriticalSectionRawMutex, RefCell<heapless::Vec<u32, MAX_SOURCES>>> =
    Mutex::new(RefCell::new(heapless::Vec::new()));

/// Whether `source_id` is currently owned by a live source.
pub fn is_claimed(source_id: u32) -> bool {
    REGISTRY.lock(|ids| ids.borrow().contains(&source_id))
}

/// RAII registration of one source id.
#[derive(Debug)]
pub struct SourceClaim {
    id: u32,
}

impl SourceClaim {
    pub fn claim(id: u32) -> Result<Self, InitError> {
        REGISTRY.lock(|ids| {
            let mut ids = ids.borrow_mut();
            if ids.contains(&id) {
                return Err(InitError::SourceBusy(id));
            }
            ids.push(id).map_err(|_| InitError::RegistryFull)
        })?;
        debug!("source {}: claimed", id);
        Ok(Self { id })
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

impl Drop for SourceClaim {
    fn drop(&mut self) {
        REGISTRY.lock(|ids| ids.borrow_mut().retain(|&claimed| claimed != self.id));
        debug!("source {}: released", self.id);
    }
}

/// One monitored input line, owned by a pipeline.
pub struct EdgeSource<P> {
    pin: P,
    claim: SourceClaim,
}

impl<P: InputPin> EdgeSource<P> {
    /// Claim `id` and sample the line. Returns the source and its level.
    pub fn acquire(id: u32, mut pin: P) -> Result<(Self, bool), InitError> {
        let claim = SourceClaim::claim(id)?;
        let level = pin.is_high().map_err(|e| {
            warn!("source {}: initial level read failed: {:?}", id, e);
            InitError::LevelReadFailed
        })?;
        Ok((Self { pin, claim }, level))
    }

    pub fn id(&self) -> u32 {
        self.claim.id()
    }

    /// Sample the current level (true = high).
    pub fn read_level(&mut self) -> Result<bool, P::Error> {
        self.pin.is_high()
    }
}
