//! Environment pool for execution slots.
//!
//! This module handles:
//! - A fixed set of named slots created once at startup
//! - A bounded availability queue holding exactly the names of idle slots
//! - Per-slot state transitions for acquisition, release and quarantine
//!
//! A slot's name is in the availability queue if and only if the slot is `Idle`. The slot map is
//! built once and never mutated, so lookups borrow it without locking; every transition takes only
//! the affected slot's own lock.

mod lease;
mod slot;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use lease::*;
pub use slot::*;

use slot::Enqueue;

use std::{collections::HashMap, sync::Arc, time::Duration};

use faasbox_utils::SLOT_NAME_PREFIX;
use serde::Serialize;
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        Mutex,
    },
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{FaasboxError, FaasboxResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A fixed-size, single-host pool of execution slots.
#[derive(Debug)]
pub struct EnvironmentPool {
    /// Slot names in creation order.
    names: Vec<String>,

    /// Every slot, keyed by name.
    slots: HashMap<String, Slot>,

    /// Sending half of the availability queue.
    queue_tx: mpsc::Sender<String>,

    /// Receiving half of the availability queue. Acquirers take turns holding it.
    queue_rx: Mutex<mpsc::Receiver<String>>,

    /// Cancelled by [`EnvironmentPool::shutdown`].
    closed: CancellationToken,
}

/// A point-in-time view of the pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    /// Every slot and its state.
    pub slots: Vec<SlotSnapshot>,

    /// Number of names currently in the availability queue.
    pub available: usize,
}

/// A point-in-time view of a single slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSnapshot {
    /// Slot name.
    pub name: String,

    /// Slot state.
    pub state: SlotState,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl EnvironmentPool {
    /// Creates a pool of `size` idle slots named `faasbox-runtime-<i>`, all queued as available.
    pub fn new(size: usize) -> FaasboxResult<Self> {
        let names = (0..size).map(slot_name).collect();
        Self::with_names(names)
    }

    /// Creates a pool from explicit slot names.
    pub fn with_names(names: Vec<String>) -> FaasboxResult<Self> {
        if names.is_empty() {
            return Err(FaasboxError::Validation(
                "pool must contain at least one slot".into(),
            ));
        }

        let mut slots = HashMap::with_capacity(names.len());
        for name in &names {
            if slots.insert(name.clone(), Slot::new(name.clone())).is_some() {
                return Err(FaasboxError::Validation(format!(
                    "duplicate slot name: {}",
                    name
                )));
            }
        }

        let (queue_tx, queue_rx) = mpsc::channel(names.len());
        for name in &names {
            // capacity equals the slot count, so every initial send fits
            let queued = slots
                .get(name)
                .map(|slot| slot.enqueue(|| queue_tx.try_send(name.clone()).is_ok()));
            if queued != Some(Enqueue::Queued) {
                return Err(FaasboxError::Validation(format!(
                    "could not queue slot {}",
                    name
                )));
            }
        }

        tracing::info!("created execution pool with {} slots", names.len());

        Ok(Self {
            names,
            slots,
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
            closed: CancellationToken::new(),
        })
    }

    /// Total number of slots. Fixed for the life of the pool.
    pub fn size(&self) -> usize {
        self.names.len()
    }

    /// Slot names in creation order.
    pub fn slot_names(&self) -> &[String] {
        &self.names
    }

    /// Looks up a slot by name.
    pub fn slot(&self, name: &str) -> FaasboxResult<&Slot> {
        self.slots
            .get(name)
            .ok_or_else(|| FaasboxError::UnknownSlot(name.to_string()))
    }

    /// The current state of `name`.
    pub fn state(&self, name: &str) -> FaasboxResult<SlotState> {
        Ok(self.slot(name)?.state())
    }

    /// Number of names currently in the availability queue.
    pub fn available(&self) -> usize {
        self.queue_tx.max_capacity() - self.queue_tx.capacity()
    }

    /// Waits up to `timeout` for an idle slot and moves it to `Acquired`.
    ///
    /// If the dequeued slot is no longer idle (it was quarantined after being queued) it is not
    /// queued again and [`FaasboxError::SlotStateConflict`] is returned. The caller may retry.
    pub async fn acquire(&self, timeout: Duration) -> FaasboxResult<String> {
        self.acquire_with_epoch(timeout).await.map(|(name, _)| name)
    }

    /// Waits for an idle slot like [`EnvironmentPool::acquire`] and wraps it in a lease that
    /// releases the slot when dropped.
    pub async fn acquire_lease(self: &Arc<Self>, timeout: Duration) -> FaasboxResult<SlotLease> {
        let (name, epoch) = self.acquire_with_epoch(timeout).await?;
        Ok(SlotLease::new(Arc::clone(self), name, epoch))
    }

    /// Moves `name` from `Acquired` or `Executing` back to `Idle` and queues it.
    ///
    /// Releasing a slot that is `Unhealthy` or `Rebuilding` is a no-op because the health
    /// supervisor owns it.
    pub fn release(&self, name: &str) -> FaasboxResult<()> {
        self.release_inner(name, None)
    }

    /// Moves an acquired slot to `Executing`.
    pub fn mark_executing(&self, name: &str) -> FaasboxResult<()> {
        self.mark_executing_inner(name, None)
    }

    /// Quarantines `name`: `Idle | Acquired | Executing -> Unhealthy`.
    ///
    /// Returns `false` when the slot is already quarantined or rebuilding.
    pub fn mark_unhealthy(&self, name: &str) -> FaasboxResult<bool> {
        let slot = self.slot(name)?;
        Ok(slot
            .transition(
                &[SlotState::Idle, SlotState::Acquired, SlotState::Executing],
                SlotState::Unhealthy,
                None,
            )
            .is_ok())
    }

    /// `Unhealthy -> Rebuilding`. Only one caller can win this transition.
    pub fn mark_rebuilding(&self, name: &str) -> FaasboxResult<bool> {
        let slot = self.slot(name)?;
        Ok(slot
            .transition(&[SlotState::Unhealthy], SlotState::Rebuilding, None)
            .is_ok())
    }

    /// `Rebuilding -> Idle`, without queueing the slot.
    pub fn finish_rebuild(&self, name: &str) -> FaasboxResult<bool> {
        let slot = self.slot(name)?;
        Ok(slot
            .transition(&[SlotState::Rebuilding], SlotState::Idle, None)
            .is_ok())
    }

    /// Queues an `Idle` slot without blocking. Returns whether the name was queued; a slot whose
    /// name is already in the queue is not queued twice.
    pub fn requeue(&self, name: &str) -> FaasboxResult<bool> {
        self.enqueue(name)
    }

    /// Removes `name` from the availability queue, preserving the order of the other names.
    ///
    /// Gives up if the queue cannot be claimed within `timeout` and returns `Ok(false)`; the
    /// slot then stays queued until an acquirer dequeues it and finds it not idle.
    pub async fn remove_from_queue(&self, name: &str, timeout: Duration) -> FaasboxResult<bool> {
        let mut rx = match time::timeout(timeout, self.queue_rx.lock()).await {
            Ok(rx) => rx,
            Err(_) => {
                tracing::warn!("timed out scanning availability queue for slot {}", name);
                return Ok(false);
            }
        };

        let mut kept = Vec::with_capacity(self.size());
        let mut removed = false;
        while let Ok(queued) = rx.try_recv() {
            if queued == name {
                removed = true;
            } else {
                kept.push(queued);
            }
        }

        if removed {
            self.slot(name)?.dequeued();
        }

        // kept names are still marked queued, so they are sent back directly
        for queued in kept {
            if self.send(&queued) {
                continue;
            }
            if let Some(slot) = self.slots.get(&queued) {
                slot.dequeued();
            }
        }

        Ok(removed)
    }

    /// Returns every slot's state and the queue length.
    pub fn snapshot(&self) -> PoolSnapshot {
        let slots = self
            .names
            .iter()
            .filter_map(|name| self.slots.get(name))
            .map(|slot| SlotSnapshot {
                name: slot.name().to_string(),
                state: slot.state(),
            })
            .collect();

        PoolSnapshot {
            slots,
            available: self.available(),
        }
    }

    /// Closes the pool. Pending and future acquisitions fail with [`FaasboxError::PoolClosed`].
    pub fn shutdown(&self) {
        if !self.closed.is_cancelled() {
            tracing::info!("closing execution pool");
            self.closed.cancel();
        }
    }

    /// Whether [`EnvironmentPool::shutdown`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    pub(crate) fn release_epoch(&self, name: &str, epoch: u64) -> FaasboxResult<()> {
        self.release_inner(name, Some(epoch))
    }

    pub(crate) fn mark_executing_epoch(&self, name: &str, epoch: u64) -> FaasboxResult<()> {
        self.mark_executing_inner(name, Some(epoch))
    }

    async fn acquire_with_epoch(&self, timeout: Duration) -> FaasboxResult<(String, u64)> {
        if self.is_closed() {
            return Err(FaasboxError::PoolClosed);
        }

        let dequeue = async {
            let mut rx = self.queue_rx.lock().await;
            rx.recv().await
        };

        let name = tokio::select! {
            _ = self.closed.cancelled() => return Err(FaasboxError::PoolClosed),
            dequeued = time::timeout(timeout, dequeue) => match dequeued {
                Ok(Some(name)) => name,
                Ok(None) => return Err(FaasboxError::PoolClosed),
                Err(_) => return Err(FaasboxError::AcquisitionTimeout(timeout)),
            },
        };

        let slot = self.slot(&name)?;
        match slot.acquire() {
            Ok(epoch) => {
                tracing::debug!("acquired slot {}", name);
                Ok((name, epoch))
            }
            Err(state) => {
                tracing::warn!("dequeued slot {} in state {}, dropping it", name, state);
                Err(FaasboxError::SlotStateConflict { slot: name, state })
            }
        }
    }

    fn release_inner(&self, name: &str, epoch: Option<u64>) -> FaasboxResult<()> {
        let slot = self.slot(name)?;
        match slot.transition(
            &[SlotState::Acquired, SlotState::Executing],
            SlotState::Idle,
            epoch,
        ) {
            Ok(_) => {
                tracing::debug!("released slot {}", name);
                self.enqueue(name)?;
            }
            Err(state @ (SlotState::Unhealthy | SlotState::Rebuilding)) => {
                tracing::debug!("slot {} is {}, leaving it to the health supervisor", name, state);
            }
            Err(state) => {
                tracing::debug!("ignoring stale release of slot {} in state {}", name, state);
            }
        }

        Ok(())
    }

    fn mark_executing_inner(&self, name: &str, epoch: Option<u64>) -> FaasboxResult<()> {
        let slot = self.slot(name)?;
        slot.transition(&[SlotState::Acquired], SlotState::Executing, epoch)
            .map(|_| ())
            .map_err(|state| FaasboxError::SlotStateConflict {
                slot: name.to_string(),
                state,
            })
    }

    fn enqueue(&self, name: &str) -> FaasboxResult<bool> {
        let queued = match self.slot(name)?.enqueue(|| self.send(name)) {
            Enqueue::Queued => true,
            Enqueue::AlreadyQueued => {
                tracing::debug!("slot {} is already queued", name);
                false
            }
            Enqueue::NotIdle(state) => {
                tracing::warn!("refusing to queue slot {} in state {}", name, state);
                false
            }
            Enqueue::Rejected => false,
        };

        Ok(queued)
    }

    fn send(&self, name: &str) -> bool {
        match self.queue_tx.try_send(name.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("availability queue full, dropping slot {}", name);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the name of the slot at `index`.
pub fn slot_name(index: usize) -> String {
    format!("{}-{}", SLOT_NAME_PREFIX, index)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
