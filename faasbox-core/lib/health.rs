//! Health supervision for pooled slots.
//!
//! This module handles:
//! - Periodic liveness and health probing of every slot
//! - Quarantining failing slots and pulling them out of the availability queue
//! - Rebuilding quarantined slots and returning them to circulation
//!
//! A slot whose rebuild fails goes back to `Idle` without being queued. The next tick probes it
//! again: if it still fails it is rebuilt again, and if it now passes it is queued.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use futures::future::join_all;
use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{
    backend::{ExecutionBackend, ProbeOutcome},
    config::HealthConfig,
    pool::{EnvironmentPool, SlotState},
    FaasboxResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Periodically probes every slot and rebuilds the ones that fail.
pub struct HealthSupervisor {
    pool: Arc<EnvironmentPool>,
    backend: Arc<dyn ExecutionBackend>,
    config: HealthConfig,

    /// Idle slots left out of the queue after a failed rebuild.
    orphaned: Mutex<HashSet<String>>,
}

/// What one tick did to one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotCheck {
    /// The probe passed.
    Healthy,

    /// The probe passed and a slot orphaned by an earlier failed rebuild was queued again.
    Restored,

    /// The probe failed but another caller already owns the slot's recovery.
    AlreadyHandled,

    /// The slot was quarantined, rebuilt and queued again.
    Rebuilt,

    /// The slot was quarantined but its rebuild failed.
    RebuildFailed(String),
}

/// The outcome of one tick, in slot order.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// One entry per slot.
    pub checks: Vec<(String, SlotCheck)>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl HealthSupervisor {
    /// Creates a supervisor for `pool` whose slots are backed by `backend`.
    pub fn new(
        pool: Arc<EnvironmentPool>,
        backend: Arc<dyn ExecutionBackend>,
        config: HealthConfig,
    ) -> Self {
        Self {
            pool,
            backend,
            config,
            orphaned: Mutex::new(HashSet::new()),
        }
    }

    /// Runs ticks every configured interval until `shutdown` is cancelled.
    ///
    /// The first tick happens one interval after spawning. A tick in progress when `shutdown`
    /// fires is allowed to finish.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.config.get_interval();
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

            tracing::info!("health supervisor started with period {:?}", period);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        let report = self.tick().await;
                        tracing::debug!("health tick finished: {:?}", report.checks);
                    }
                }
            }

            tracing::info!("health supervisor stopped");
        })
    }

    /// Probes every slot concurrently and recovers the failing ones. Returns once all are done.
    pub async fn tick(&self) -> TickReport {
        let names = self.pool.slot_names();
        let checks = join_all(names.iter().map(|name| self.check(name))).await;

        TickReport {
            checks: names.iter().cloned().zip(checks).collect(),
        }
    }

    async fn check(&self, name: &str) -> SlotCheck {
        let probe = self.backend.probe(name, self.config.get_probe_timeout()).await;

        let result = match probe {
            ProbeOutcome::Healthy => self.restore_if_orphaned(name),
            ProbeOutcome::Failing(reason) => {
                tracing::warn!("slot {} failed health probe: {}", name, reason);
                self.recover(name).await
            }
        };

        result.unwrap_or_else(|e| {
            tracing::error!("health check of slot {} failed: {}", name, e);
            SlotCheck::AlreadyHandled
        })
    }

    async fn recover(&self, name: &str) -> FaasboxResult<SlotCheck> {
        if !self.pool.mark_unhealthy(name)? {
            tracing::debug!("slot {} is already quarantined", name);
            return Ok(SlotCheck::AlreadyHandled);
        }

        if self
            .pool
            .remove_from_queue(name, self.config.get_queue_scan_timeout())
            .await?
        {
            tracing::debug!("removed slot {} from the availability queue", name);
        }

        if !self.pool.mark_rebuilding(name)? {
            return Ok(SlotCheck::AlreadyHandled);
        }

        tracing::info!("rebuilding slot {}", name);
        let rebuilt = self.backend.rebuild(name).await;
        self.pool.finish_rebuild(name)?;

        match rebuilt {
            Ok(()) => {
                self.orphans().remove(name);
                self.pool.requeue(name)?;
                tracing::info!("slot {} rebuilt and back in circulation", name);
                Ok(SlotCheck::Rebuilt)
            }
            Err(e) => {
                self.orphans().insert(name.to_string());
                tracing::error!("failed to rebuild slot {}: {}", name, e);
                Ok(SlotCheck::RebuildFailed(e.to_string()))
            }
        }
    }

    fn restore_if_orphaned(&self, name: &str) -> FaasboxResult<SlotCheck> {
        if !self.orphans().contains(name) || self.pool.state(name)? != SlotState::Idle {
            return Ok(SlotCheck::Healthy);
        }

        self.orphans().remove(name);
        self.pool.requeue(name)?;
        tracing::info!("slot {} recovered after a failed rebuild", name);
        Ok(SlotCheck::Restored)
    }

    fn orphans(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.orphaned.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        backend::HealthSignal,
        config::Language,
        launcher::Invocation,
        pool::slot_name,
        FaasboxError,
    };

    const SHORT: Duration = Duration::from_millis(50);

    #[test_log::test(tokio::test)]
    async fn test_healthy_slots_are_untouched() {
        let (pool, backend, supervisor) = helper::setup(2);

        let report = supervisor.tick().await;
        assert!(report.checks.iter().all(|(_, c)| *c == SlotCheck::Healthy));
        assert_eq!(backend.rebuilds.load(Ordering::SeqCst), 0);
        assert_eq!(pool.available(), 2);
    }

    #[test_log::test(tokio::test)]
    async fn test_failing_idle_slot_is_rebuilt_and_requeued() {
        let (pool, backend, supervisor) = helper::setup(2);
        let sick = slot_name(0);
        backend.set_running(&sick, false);

        let report = supervisor.tick().await;
        assert_eq!(report.checks[0], (sick.clone(), SlotCheck::Rebuilt));
        assert_eq!(report.checks[1].1, SlotCheck::Healthy);
        assert_eq!(backend.rebuilds.load(Ordering::SeqCst), 1);

        assert_eq!(pool.state(&sick).unwrap(), SlotState::Idle);
        assert_eq!(pool.available(), 2);
        helper::assert_accounting(&pool);

        // the rebuilt slot is handed out exactly once
        let first = pool.acquire(SHORT).await.unwrap();
        let second = pool.acquire(SHORT).await.unwrap();
        assert_ne!(first, second);
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_rebuild_keeps_slot_out_of_queue() {
        let (pool, backend, supervisor) = helper::setup(2);
        let sick = slot_name(1);
        backend.set_running(&sick, false);
        backend.fail_rebuild.store(true, Ordering::SeqCst);

        let report = supervisor.tick().await;
        assert!(matches!(report.checks[1].1, SlotCheck::RebuildFailed(_)));
        assert_eq!(pool.state(&sick).unwrap(), SlotState::Idle);
        assert_eq!(pool.available(), 1);

        let only = pool.acquire(SHORT).await.unwrap();
        assert_eq!(only, slot_name(0));
        assert!(matches!(
            pool.acquire(SHORT).await,
            Err(FaasboxError::AcquisitionTimeout(_))
        ));
        pool.release(&only).unwrap();

        // still broken: the next tick drives another rebuild
        backend.fail_rebuild.store(false, Ordering::SeqCst);
        let report = supervisor.tick().await;
        assert_eq!(report.checks[1].1, SlotCheck::Rebuilt);
        assert_eq!(pool.available(), 2);
        helper::assert_accounting(&pool);
    }

    #[test_log::test(tokio::test)]
    async fn test_orphaned_slot_that_recovers_is_requeued() {
        let (pool, backend, supervisor) = helper::setup(1);
        let name = slot_name(0);
        backend.set_running(&name, false);
        backend.fail_rebuild.store(true, Ordering::SeqCst);

        supervisor.tick().await;
        assert_eq!(pool.available(), 0);

        backend.set_running(&name, true);
        let report = supervisor.tick().await;
        assert_eq!(report.checks[0].1, SlotCheck::Restored);
        assert_eq!(pool.acquire(SHORT).await.unwrap(), name);
    }

    #[test_log::test(tokio::test)]
    async fn test_failing_acquired_slot_is_reclaimed() {
        let (pool, backend, supervisor) = helper::setup(1);
        let lease = pool.acquire_lease(SHORT).await.unwrap();
        let name = lease.name().to_string();
        backend.set_running(&name, false);

        let report = supervisor.tick().await;
        assert_eq!(report.checks[0].1, SlotCheck::Rebuilt);
        assert_eq!(pool.available(), 1);

        // the original holder's release no longer applies
        drop(lease);
        assert_eq!(pool.available(), 1);
        helper::assert_accounting(&pool);
    }

    #[test_log::test(tokio::test)]
    async fn test_concurrent_ticks_rebuild_once() {
        let (pool, backend, supervisor) = helper::setup(1);
        let name = slot_name(0);
        backend.set_running(&name, false);
        *backend.rebuild_delay.lock().unwrap() = Duration::from_millis(100);

        let (a, b) = tokio::join!(supervisor.tick(), supervisor.tick());
        let outcomes = [a.checks[0].1.clone(), b.checks[0].1.clone()];

        assert!(outcomes.contains(&SlotCheck::Rebuilt));
        assert!(outcomes.contains(&SlotCheck::AlreadyHandled));
        assert_eq!(backend.rebuilds.load(Ordering::SeqCst), 1);
        assert_eq!(pool.available(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_spawned_supervisor_stops_on_shutdown() {
        let pool = Arc::new(EnvironmentPool::new(1).unwrap());
        let backend = Arc::new(helper::FakeBackend::default());
        backend.set_running(&slot_name(0), false);

        let supervisor = Arc::new(HealthSupervisor::new(
            Arc::clone(&pool),
            backend.clone(),
            HealthConfig::builder()
                .interval(Duration::from_millis(20))
                .build(),
        ));

        let shutdown = CancellationToken::new();
        let handle = supervisor.spawn(shutdown.clone());

        time::sleep(Duration::from_millis(110)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(backend.rebuilds.load(Ordering::SeqCst) >= 1);
    }

    mod helper {
        use super::*;

        #[derive(Default)]
        pub struct FakeBackend {
            pub stopped: Mutex<HashMap<String, bool>>,
            pub fail_rebuild: AtomicBool,
            pub rebuilds: AtomicUsize,
            pub rebuild_delay: Mutex<Duration>,
        }

        impl FakeBackend {
            pub fn set_running(&self, slot: &str, running: bool) {
                self.stopped
                    .lock()
                    .unwrap()
                    .insert(slot.to_string(), !running);
            }
        }

        #[async_trait]
        impl ExecutionBackend for FakeBackend {
            fn name(&self) -> &'static str {
                "fake"
            }

            async fn initialize(&self, _slots: &[String]) -> FaasboxResult<()> {
                Ok(())
            }

            async fn is_running(&self, slot: &str) -> FaasboxResult<bool> {
                let stopped = self.stopped.lock().unwrap();
                Ok(!stopped.get(slot).copied().unwrap_or(false))
            }

            async fn health_signal(&self, _slot: &str) -> FaasboxResult<HealthSignal> {
                Ok(HealthSignal::NoHealthcheck)
            }

            async fn rebuild(&self, slot: &str) -> FaasboxResult<()> {
                let delay = *self.rebuild_delay.lock().unwrap();
                time::sleep(delay).await;
                self.rebuilds.fetch_add(1, Ordering::SeqCst);

                if self.fail_rebuild.load(Ordering::SeqCst) {
                    return Err(FaasboxError::Backend("image missing".into()));
                }
                self.set_running(slot, true);
                Ok(())
            }

            fn invocation(&self, _slot: &str, language: Language) -> FaasboxResult<Invocation> {
                Ok(Invocation::new(language.interpreter()))
            }

            async fn teardown(&self, _slots: &[String]) -> FaasboxResult<()> {
                Ok(())
            }
        }

        pub fn setup(
            size: usize,
        ) -> (Arc<EnvironmentPool>, Arc<FakeBackend>, HealthSupervisor) {
            let pool = Arc::new(EnvironmentPool::new(size).unwrap());
            let backend = Arc::new(FakeBackend::default());
            let supervisor = HealthSupervisor::new(
                Arc::clone(&pool),
                backend.clone(),
                HealthConfig::default(),
            );
            (pool, backend, supervisor)
        }

        pub fn assert_accounting(pool: &EnvironmentPool) {
            let snapshot = pool.snapshot();
            let busy = snapshot
                .slots
                .iter()
                .filter(|s| s.state != SlotState::Idle)
                .count();
            assert_eq!(snapshot.available + busy, pool.size());
        }
    }
}
