// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Task scheduler for timed operations

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

struct ScheduledTask {
    name: String,
    interval: Option<Duration>,
    handle: JoinHandle<()>,
}

/// Owns the engine's background tasks and their shared shutdown signal
pub struct Scheduler {
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<ScheduledTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            tasks: Vec::new(),
        }
    }

    /// Receiver that fires once when [`Scheduler::shutdown`] is called
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Run `task` on the blocking pool every `interval`, starting immediately.
    ///
    /// Each run is awaited before the next tick, and a tick that overruns delays
    /// the next one instead of bursting to catch up, so runs never overlap.
    pub fn spawn_periodic<F>(&mut self, name: &str, interval: Duration, task: F)
    where
        F: FnMut() + Send + 'static,
    {
        let mut shutdown = self.subscribe_shutdown();
        let task_name = name.to_string();
        let task = Arc::new(Mutex::new(task));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let task = task.clone();
                        let run = tokio::task::spawn_blocking(move || {
                            let mut task = task.lock();
                            (&mut *task)()
                        });
                        if let Err(e) = run.await {
                            warn!("Task '{}' run failed: {}", task_name, e);
                        }
                    }
                    _ = shutdown.recv() => {
                        debug!("Task '{}' shutting down", task_name);
                        break;
                    }
                }
            }
        });

        debug!("Scheduled task '{}' with interval {:?}", name, interval);
        self.tasks.push(ScheduledTask {
            name: name.to_string(),
            interval: Some(interval),
            handle,
        });
    }

    /// Spawn a long-running task that is handed the shutdown receiver
    pub fn spawn<F, Fut>(&mut self, name: &str, task: F)
    where
        F: FnOnce(broadcast::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task(self.subscribe_shutdown()));

        debug!("Spawned task '{}'", name);
        self.tasks.push(ScheduledTask {
            name: name.to_string(),
            interval: None,
            handle,
        });
    }

    /// Names and periods of the tasks currently owned
    pub fn tasks(&self) -> Vec<(&str, Option<Duration>)> {
        self.tasks
            .iter()
            .map(|t| (t.name.as_str(), t.interval))
            .collect()
    }

    /// Signal every task and wait for all of them to finish
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(());

        for task in self.tasks.drain(..) {
            if let Err(e) = task.handle.await {
                warn!("Task '{}' ended abnormally: {}", task.name, e);
            }
        }
        info!("All scheduled tasks stopped");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_periodic_task_runs_until_shutdown() {
        let mut scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = count.clone();
        scheduler.spawn_periodic("tick", Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(scheduler.tasks(), vec![("tick", Some(Duration::from_millis(10)))]);

        tokio::time::sleep(Duration::from_millis(60)).await;
        scheduler.shutdown().await;

        let after_shutdown = count.load(Ordering::SeqCst);
        assert!(after_shutdown >= 2);
        assert!(scheduler.tasks().is_empty());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_shutdown);
    }

    #[tokio::test]
    async fn test_periodic_task_runs_off_the_runtime_thread() {
        let mut scheduler = Scheduler::new();
        let runtime_thread = std::thread::current().id();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let threads = seen.clone();
        scheduler.spawn_periodic("io", Duration::from_millis(10), move || {
            threads.lock().push(std::thread::current().id());
            std::thread::sleep(Duration::from_millis(100));
        });

        // The current-thread runtime keeps its timers going while the task sleeps
        let started = std::time::Instant::now();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(started.elapsed() < Duration::from_millis(60));

        tokio::time::sleep(Duration::from_millis(40)).await;
        scheduler.shutdown().await;

        let seen = seen.lock();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|id| *id != runtime_thread));
    }

    #[tokio::test]
    async fn test_spawned_task_receives_shutdown() {
        let mut scheduler = Scheduler::new();
        let stopped = Arc::new(AtomicUsize::new(0));

        let flag = stopped.clone();
        scheduler.spawn("waiter", move |mut shutdown| async move {
            let _ = shutdown.recv().await;
            flag.store(1, Ordering::SeqCst);
        });

        scheduler.shutdown().await;
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }
}
