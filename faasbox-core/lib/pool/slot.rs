use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use serde::Serialize;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The lifecycle state of a slot. Slots start `Idle` and cycle forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    /// Available and present in the availability queue.
    Idle,

    /// Handed to a caller that has not started its process yet.
    Acquired,

    /// Running a script.
    Executing,

    /// Quarantined by the health supervisor.
    Unhealthy,

    /// Being rebuilt by the health supervisor.
    Rebuilding,
}

/// One named execution environment.
///
/// All transitions go through the slot's own lock, so transitions on different slots never
/// contend and transitions on the same slot are totally ordered.
#[derive(Debug)]
pub struct Slot {
    name: String,
    inner: Mutex<SlotInner>,
}

#[derive(Debug)]
struct SlotInner {
    state: SlotState,

    /// Bumped on every `Idle -> Acquired`, so a stale holder cannot release a later holder's
    /// acquisition.
    epoch: u64,

    /// Whether the name currently sits in the availability queue.
    queued: bool,
}

/// The result of offering a slot to the availability queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Enqueue {
    /// The name was sent.
    Queued,

    /// A copy of the name is already queued.
    AlreadyQueued,

    /// Only idle slots are queued.
    NotIdle(SlotState),

    /// The queue refused the name.
    Rejected,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Slot {
    /// Creates an idle slot.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(SlotInner {
                state: SlotState::Idle,
                epoch: 0,
                queued: false,
            }),
        }
    }

    /// The slot's stable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current state.
    pub fn state(&self) -> SlotState {
        self.lock().state
    }

    /// `Idle -> Acquired` for a name just taken off the queue. Returns the new epoch, or the state
    /// that blocked the transition.
    pub(crate) fn acquire(&self) -> Result<u64, SlotState> {
        let mut inner = self.lock();
        inner.queued = false;
        if inner.state != SlotState::Idle {
            return Err(inner.state);
        }

        inner.state = SlotState::Acquired;
        inner.epoch += 1;
        Ok(inner.epoch)
    }

    /// Moves to `to` if the current state is one of `from` and, when given, the epoch matches.
    /// Returns the previous state, or the state that blocked the transition.
    pub(crate) fn transition(
        &self,
        from: &[SlotState],
        to: SlotState,
        epoch: Option<u64>,
    ) -> Result<SlotState, SlotState> {
        let mut inner = self.lock();
        if !from.contains(&inner.state) || epoch.is_some_and(|e| e != inner.epoch) {
            return Err(inner.state);
        }

        let previous = inner.state;
        inner.state = to;
        Ok(previous)
    }

    /// Sends the name with `send` if the slot is idle and not already queued.
    ///
    /// `send` runs under the slot's lock and must not block.
    pub(crate) fn enqueue(&self, send: impl FnOnce() -> bool) -> Enqueue {
        let mut inner = self.lock();
        if inner.state != SlotState::Idle {
            return Enqueue::NotIdle(inner.state);
        }
        if inner.queued {
            return Enqueue::AlreadyQueued;
        }
        if !send() {
            return Enqueue::Rejected;
        }

        inner.queued = true;
        Enqueue::Queued
    }

    /// Records that the name was taken off the queue without being acquired.
    pub(crate) fn dequeued(&self) {
        self.lock().queued = false;
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        // State is a plain enum, so a panic mid-update cannot leave it torn.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            SlotState::Idle => "idle",
            SlotState::Acquired => "acquired",
            SlotState::Executing => "executing",
            SlotState::Unhealthy => "unhealthy",
            SlotState::Rebuilding => "rebuilding",
        };
        f.write_str(state)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_acquire_bumps_epoch() {
        let slot = Slot::new("faasbox-runtime-0");
        assert_eq!(slot.acquire(), Ok(1));
        assert_eq!(slot.acquire(), Err(SlotState::Acquired));

        slot.transition(&[SlotState::Acquired], SlotState::Idle, Some(1))
            .unwrap();
        assert_eq!(slot.acquire(), Ok(2));
    }

    #[test]
    fn test_slot_transition_checks_epoch() {
        let slot = Slot::new("faasbox-runtime-0");
        let epoch = slot.acquire().unwrap();

        let stale = slot.transition(&[SlotState::Acquired], SlotState::Idle, Some(epoch + 1));
        assert_eq!(stale, Err(SlotState::Acquired));

        let current = slot.transition(&[SlotState::Acquired], SlotState::Idle, Some(epoch));
        assert_eq!(current, Ok(SlotState::Acquired));
        assert_eq!(slot.state(), SlotState::Idle);
    }

    #[test]
    fn test_slot_is_queued_at_most_once() {
        let slot = Slot::new("faasbox-runtime-0");
        assert_eq!(slot.enqueue(|| true), Enqueue::Queued);
        assert_eq!(slot.enqueue(|| true), Enqueue::AlreadyQueued);

        slot.dequeued();
        assert_eq!(slot.enqueue(|| false), Enqueue::Rejected);
        assert_eq!(slot.enqueue(|| true), Enqueue::Queued);

        slot.acquire().unwrap();
        assert_eq!(
            slot.enqueue(|| true),
            Enqueue::NotIdle(SlotState::Acquired)
        );
    }

    #[test]
    fn test_slot_state_display() {
        assert_eq!(SlotState::Rebuilding.to_string(), "rebuilding");
        assert_eq!(
            serde_json::to_string(&SlotState::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }
}
