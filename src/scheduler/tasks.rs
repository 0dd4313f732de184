/// Named background tasks
use super::{ScheduledTask, Scheduler};
use crate::config::SchedulerConfig;
use crate::gateway::Gateway;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Pulls the latest token profiles into `discovered_tokens`
pub struct DiscoveryScanTask {
    gateway: Arc<Gateway>,
}

impl DiscoveryScanTask {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ScheduledTask for DiscoveryScanTask {
    fn name(&self) -> &'static str {
        "discovery_scan"
    }

    async fn run(&self) -> Result<(), String> {
        self.gateway
            .run_discovery_scan()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Recomputes pool analysis for discovered tokens
pub struct AnalysisRefreshTask {
    gateway: Arc<Gateway>,
}

impl AnalysisRefreshTask {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ScheduledTask for AnalysisRefreshTask {
    fn name(&self) -> &'static str {
        "analysis_refresh"
    }

    async fn run(&self) -> Result<(), String> {
        self.gateway
            .run_analysis_refresh()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Keeps the hot listing keys warm
pub struct CacheReprimeTask {
    gateway: Arc<Gateway>,
}

impl CacheReprimeTask {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ScheduledTask for CacheReprimeTask {
    fn name(&self) -> &'static str {
        "cache_reprime"
    }

    async fn run(&self) -> Result<(), String> {
        self.gateway
            .reprime_hot_keys()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Physically removes expired cache entries
pub struct CacheSweepTask {
    gateway: Arc<Gateway>,
}

impl CacheSweepTask {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ScheduledTask for CacheSweepTask {
    fn name(&self) -> &'static str {
        "cache_sweep"
    }

    async fn run(&self) -> Result<(), String> {
        self.gateway
            .purge_expired_cache()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Arm the four standard tasks on the gateway's scheduler
///
/// Returns the number of tasks armed (0 when the scheduler is disabled).
pub fn schedule_default_tasks(gateway: &Arc<Gateway>, config: &SchedulerConfig) -> Result<usize, String> {
    if !config.enabled {
        logger::info(LogTag::Scheduler, "Scheduler disabled via configuration");
        return Ok(0);
    }

    let scheduler: &Scheduler = gateway.scheduler();
    let run_on_start = config.run_on_start;
    let tasks: Vec<(Arc<dyn ScheduledTask>, u64)> = vec![
        (
            Arc::new(DiscoveryScanTask::new(gateway.clone())),
            config.discovery_interval_secs,
        ),
        (
            Arc::new(AnalysisRefreshTask::new(gateway.clone())),
            config.analysis_interval_secs,
        ),
        (
            Arc::new(CacheReprimeTask::new(gateway.clone())),
            config.reprime_interval_secs,
        ),
        (
            Arc::new(CacheSweepTask::new(gateway.clone())),
            config.cache_sweep_interval_secs,
        ),
    ];

    let count = tasks.len();
    for (task, interval_secs) in tasks {
        scheduler.schedule(task, Duration::from_secs(interval_secs), run_on_start)?;
    }
    Ok(count)
}
