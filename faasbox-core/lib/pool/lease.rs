use std::sync::Arc;

use crate::FaasboxResult;

use super::EnvironmentPool;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Exclusive use of one acquired slot. The slot is released when the lease is dropped, on every
/// exit path including cancellation of the task that holds it.
#[derive(Debug)]
pub struct SlotLease {
    pool: Arc<EnvironmentPool>,
    name: String,
    epoch: u64,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl SlotLease {
    pub(super) fn new(pool: Arc<EnvironmentPool>, name: String, epoch: u64) -> Self {
        Self { pool, name, epoch }
    }

    /// The leased slot's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Marks the slot as running a process.
    pub fn mark_executing(&self) -> FaasboxResult<()> {
        self.pool.mark_executing_epoch(&self.name, self.epoch)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Drop for SlotLease {
    fn drop(&mut self) {
        if let Err(e) = self.pool.release_epoch(&self.name, self.epoch) {
            tracing::warn!("failed to release slot {}: {}", self.name, e);
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
