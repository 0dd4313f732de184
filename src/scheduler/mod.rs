/// Background scheduler
///
/// Runs named tasks on a fixed delay: the next run starts `interval` after
/// the previous run *finished*, so a slow run pushes the schedule back rather
/// than stacking runs. A task that fails or panics is logged and stays armed.
pub mod tasks;

pub use tasks::{schedule_default_tasks, AnalysisRefreshTask, CacheReprimeTask, CacheSweepTask, DiscoveryScanTask};

use crate::logger::{self, LogTag};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Graceful shutdown wait per task before it is aborted
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait ScheduledTask: Send + Sync {
    /// Unique task identifier
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<(), String>;
}

/// Point-in-time view of one scheduled task
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    pub id: String,
    pub name: String,
    pub interval_secs: f64,
    pub running: bool,
    pub runs: u64,
    pub failures: u64,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<u64>,
    pub last_error: Option<String>,
    pub next_due_at: Option<DateTime<Utc>>,
}

struct TaskEntry {
    status: Arc<RwLock<TaskStatus>>,
    cancel: Arc<Notify>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub struct Scheduler {
    tasks: Mutex<HashMap<String, TaskEntry>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `task` to run every `interval` (fixed delay)
    ///
    /// With `run_immediately` the first run starts now, otherwise after one
    /// interval. Names must be unique among armed tasks.
    pub fn schedule(
        &self,
        task: Arc<dyn ScheduledTask>,
        interval: Duration,
        run_immediately: bool,
    ) -> Result<Uuid, String> {
        let name = task.name().to_string();
        let mut tasks = self.tasks.lock();
        if tasks.contains_key(&name) {
            return Err(format!("Task '{}' is already scheduled", name));
        }

        let id = Uuid::new_v4();
        let first_due = if run_immediately { Duration::ZERO } else { interval };
        let status = Arc::new(RwLock::new(TaskStatus {
            id: id.to_string(),
            name: name.clone(),
            interval_secs: interval.as_secs_f64(),
            running: false,
            runs: 0,
            failures: 0,
            last_started_at: None,
            last_finished_at: None,
            last_duration_ms: None,
            last_error: None,
            next_due_at: Some(due_at(first_due)),
        }));
        let cancel = Arc::new(Notify::new());

        let handle = tokio::spawn(run_task_loop(
            task,
            interval,
            run_immediately,
            status.clone(),
            cancel.clone(),
        ));

        logger::info(
            LogTag::Scheduler,
            &format!("Scheduled '{}' every {}s", name, interval.as_secs()),
        );
        tasks.insert(name, TaskEntry { status, cancel, handle });
        Ok(id)
    }

    /// Stop re-arming `name`; a run in progress is allowed to finish
    pub fn cancel(&self, name: &str) -> bool {
        match self.tasks.lock().remove(name) {
            Some(entry) => {
                entry.cancel.notify_one();
                logger::info(LogTag::Scheduler, &format!("Cancelled '{}'", name));
                true
            }
            None => false,
        }
    }

    /// Cancel every task and wait for in-progress runs to finish
    pub async fn shutdown(&self) {
        let entries: Vec<(String, TaskEntry)> = self.tasks.lock().drain().collect();
        for (_, entry) in &entries {
            entry.cancel.notify_one();
        }

        for (name, entry) in entries {
            let abort = entry.handle.abort_handle();
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, entry.handle).await.is_err() {
                logger::warning(
                    LogTag::Scheduler,
                    &format!("'{}' did not stop within {}s, aborting", name, SHUTDOWN_TIMEOUT.as_secs()),
                );
                abort.abort();
            }
        }
        logger::info(LogTag::Scheduler, "Scheduler stopped");
    }

    pub fn statuses(&self) -> Vec<TaskStatus> {
        let mut statuses: Vec<TaskStatus> = self
            .tasks
            .lock()
            .values()
            .map(|entry| entry.status.read().clone())
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.tasks.lock().contains_key(name)
    }
}

fn due_at(delay: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero())
}

async fn run_task_loop(
    task: Arc<dyn ScheduledTask>,
    interval: Duration,
    run_immediately: bool,
    status: Arc<RwLock<TaskStatus>>,
    cancel: Arc<Notify>,
) {
    let name = task.name();

    if !run_immediately {
        tokio::select! {
            biased;
            _ = cancel.notified() => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    loop {
        {
            let mut s = status.write();
            s.running = true;
            s.last_started_at = Some(Utc::now());
            s.next_due_at = None;
        }
        logger::debug(LogTag::Scheduler, &format!("Running '{}'", name));

        let started = Instant::now();
        let outcome = AssertUnwindSafe(task.run()).catch_unwind().await;
        let elapsed = started.elapsed();

        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(_) => Some("task panicked".to_string()),
        };

        {
            let mut s = status.write();
            s.running = false;
            s.runs += 1;
            s.last_finished_at = Some(Utc::now());
            s.last_duration_ms = Some(elapsed.as_millis() as u64);
            s.next_due_at = Some(due_at(interval));
            if let Some(ref e) = error {
                s.failures += 1;
                s.last_error = Some(e.clone());
            }
        }

        match error {
            Some(e) => logger::error(
                LogTag::Scheduler,
                &format!("'{}' failed after {}ms: {}", name, elapsed.as_millis(), e),
            ),
            None => logger::debug(
                LogTag::Scheduler,
                &format!("'{}' completed in {}ms", name, elapsed.as_millis()),
            ),
        }

        tokio::select! {
            biased;
            _ = cancel.notified() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    logger::debug(LogTag::Scheduler, &format!("'{}' loop exited", name));
}
