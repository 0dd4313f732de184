/// Rate-limited dispatch queues
///
/// Every provider gets one [`ProviderQueue`]: a FIFO of pending requests
/// drained by a single worker task. The worker runs one request at a time and
/// never starts the next one sooner than `min_interval` after the previous one
/// *started*, so bursts of callers are spread out instead of hitting the
/// provider together. Queues of different providers are independent.
///
/// A failing or panicking task only fails its own caller. Closing a queue
/// drains whatever is still pending without executing it; those callers get
/// [`QueueError::Cancelled`].
use crate::errors::QueueError;
use crate::logger::{self, LogTag};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use uuid::Uuid;

/// Per-provider queue settings
#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub provider: String,
    /// Minimum spacing between the starts of two consecutive calls
    pub min_interval: Duration,
    /// Per-call timeout; `None` lets calls run as long as they need
    pub call_timeout: Option<Duration>,
    /// Maximum pending requests, 0 = unbounded
    pub max_depth: usize,
}

impl QueueSettings {
    pub fn new(provider: &str, min_interval: Duration) -> Self {
        Self {
            provider: provider.to_string(),
            min_interval,
            call_timeout: None,
            max_depth: 0,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// A unit of work owned by the queue until it runs or is drained
struct QueuedRequest {
    id: Uuid,
    enqueued_at: Instant,
    execute: Job,
}

struct QueueShared {
    settings: QueueSettings,
    pending: AtomicUsize,
    processing: AtomicBool,
    executed: AtomicU64,
    panicked: AtomicU64,
    closed: AtomicBool,
    shutdown: Notify,
}

/// Point-in-time view of a provider queue
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub provider: String,
    pub pending: usize,
    pub processing: bool,
    pub executed: u64,
    pub panicked: u64,
    pub closed: bool,
    pub min_interval_ms: u64,
}

/// FIFO dispatch queue for a single provider
///
/// Must be created inside a tokio runtime: the worker task is spawned
/// immediately.
pub struct ProviderQueue {
    shared: Arc<QueueShared>,
    sender: mpsc::UnboundedSender<QueuedRequest>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ProviderQueue {
    pub fn new(settings: QueueSettings) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(QueueShared {
            settings,
            pending: AtomicUsize::new(0),
            processing: AtomicBool::new(false),
            executed: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        });

        logger::debug(
            LogTag::Queue,
            &format!(
                "Dispatch queue for {} ready: min interval {}ms, max depth {}",
                shared.settings.provider,
                shared.settings.min_interval.as_millis(),
                shared.settings.max_depth
            ),
        );

        let worker = tokio::spawn(run_worker(shared.clone(), receiver));

        Self {
            shared,
            sender,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn provider(&self) -> &str {
        &self.shared.settings.provider
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.shared.settings
    }

    /// Append `task` to the queue and wait for it to run
    ///
    /// `task` is only invoked once the request reaches the head of the queue.
    /// If the caller stops waiting, the task still runs in its turn.
    pub async fn enqueue<T, F, Fut>(&self, task: F) -> Result<T, QueueError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let provider = self.shared.settings.provider.clone();

        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed(provider));
        }

        let max_depth = self.shared.settings.max_depth;
        self.shared
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |depth| {
                if max_depth > 0 && depth >= max_depth {
                    None
                } else {
                    Some(depth + 1)
                }
            })
            .map_err(|depth| {
                logger::warning(
                    LogTag::Queue,
                    &format!("{} queue full, rejecting request ({} pending)", provider, depth),
                );
                QueueError::QueueFull {
                    provider: provider.clone(),
                    depth,
                }
            })?;

        let (reply_tx, reply_rx) = oneshot::channel::<Result<T, QueueError>>();
        let call_timeout = self.shared.settings.call_timeout;
        let timeout_provider = provider.clone();

        let execute: Job = Box::new(move || {
            async move {
                let outcome = match call_timeout {
                    Some(limit) => tokio::time::timeout(limit, task()).await.map_err(|_| {
                        QueueError::Timeout {
                            provider: timeout_provider,
                            timeout_ms: limit.as_millis() as u64,
                        }
                    }),
                    None => Ok(task().await),
                };
                let _ = reply_tx.send(outcome);
            }
            .boxed()
        });

        let request = QueuedRequest {
            id: Uuid::new_v4(),
            enqueued_at: Instant::now(),
            execute,
        };

        if self.sender.send(request).is_err() {
            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed(provider));
        }

        match reply_rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(QueueError::Cancelled(provider)),
        }
    }

    /// Stop accepting work and drain pending requests without executing them
    ///
    /// A request that is already running finishes normally.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        logger::info(
            LogTag::Queue,
            &format!("Closing {} dispatch queue", self.shared.settings.provider),
        );
        self.shared.shutdown.notify_one();
    }

    /// Close the queue and wait for the worker to exit
    pub async fn shutdown(&self) {
        self.close();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
    }

    pub fn status(&self) -> QueueStatus {
        let shared = &self.shared;
        QueueStatus {
            provider: shared.settings.provider.clone(),
            pending: shared.pending.load(Ordering::SeqCst),
            processing: shared.processing.load(Ordering::SeqCst),
            executed: shared.executed.load(Ordering::SeqCst),
            panicked: shared.panicked.load(Ordering::SeqCst),
            closed: shared.closed.load(Ordering::SeqCst),
            min_interval_ms: shared.settings.min_interval.as_millis() as u64,
        }
    }
}

async fn run_worker(shared: Arc<QueueShared>, mut receiver: mpsc::UnboundedReceiver<QueuedRequest>) {
    let provider = shared.settings.provider.clone();

    loop {
        // Idle
        let request = tokio::select! {
            biased;
            _ = shared.shutdown.notified() => break,
            next = receiver.recv() => match next {
                Some(request) => request,
                None => break,
            },
        };
        shared.pending.fetch_sub(1, Ordering::SeqCst);

        // Processing
        shared.processing.store(true, Ordering::SeqCst);
        let started = Instant::now();
        logger::debug(
            LogTag::Queue,
            &format!(
                "{} executing request {} (waited {}ms, {} still pending)",
                provider,
                request.id,
                started.duration_since(request.enqueued_at).as_millis(),
                shared.pending.load(Ordering::SeqCst)
            ),
        );

        if AssertUnwindSafe((request.execute)()).catch_unwind().await.is_err() {
            shared.panicked.fetch_add(1, Ordering::SeqCst);
            logger::error(
                LogTag::Queue,
                &format!("{} request {} panicked; queue continues", provider, request.id),
            );
        }
        shared.executed.fetch_add(1, Ordering::SeqCst);
        shared.processing.store(false, Ordering::SeqCst);

        // Delay: spacing is measured from the start of the call
        let next_allowed = started + shared.settings.min_interval;
        tokio::select! {
            biased;
            _ = shared.shutdown.notified() => break,
            _ = sleep_until(next_allowed) => {}
        }
    }

    receiver.close();
    let mut drained = 0usize;
    while let Ok(request) = receiver.try_recv() {
        shared.pending.fetch_sub(1, Ordering::SeqCst);
        drop(request);
        drained += 1;
    }

    logger::debug(
        LogTag::Queue,
        &format!("{} dispatch worker stopped ({} pending requests drained)", provider, drained),
    );
}

/// Registry of provider queues keyed by provider name
#[derive(Default)]
pub struct DispatchQueues {
    queues: RwLock<HashMap<String, Arc<ProviderQueue>>>,
}

impl DispatchQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or return the existing) queue for `settings.provider`
    pub fn register(&self, settings: QueueSettings) -> Arc<ProviderQueue> {
        let mut queues = self.queues.write();
        queues
            .entry(settings.provider.clone())
            .or_insert_with(|| Arc::new(ProviderQueue::new(settings)))
            .clone()
    }

    pub fn get(&self, provider: &str) -> Option<Arc<ProviderQueue>> {
        self.queues.read().get(provider).cloned()
    }

    pub async fn enqueue<T, F, Fut>(&self, provider: &str, task: F) -> Result<T, QueueError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let queue = self
            .get(provider)
            .ok_or_else(|| QueueError::UnknownProvider(provider.to_string()))?;
        queue.enqueue(task).await
    }

    pub fn statuses(&self) -> Vec<QueueStatus> {
        let mut statuses: Vec<QueueStatus> =
            self.queues.read().values().map(|q| q.status()).collect();
        statuses.sort_by(|a, b| a.provider.cmp(&b.provider));
        statuses
    }

    pub async fn shutdown_all(&self) {
        let queues: Vec<Arc<ProviderQueue>> = self.queues.read().values().cloned().collect();
        for queue in queues {
            queue.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn settings(min_interval_ms: u64) -> QueueSettings {
        QueueSettings::new("test", Duration::from_millis(min_interval_ms))
    }

    #[tokio::test]
    async fn test_fifo_order_and_spacing() {
        let queue = Arc::new(ProviderQueue::new(settings(100)));
        let starts = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..4u32 {
            let queue = queue.clone();
            let starts = starts.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue(move || async move {
                        starts.lock().push((i, Instant::now()));
                        i
                    })
                    .await
            }));
            // Give each enqueue time to land so submission order is deterministic
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap().unwrap(), i as u32);
        }

        let starts = starts.lock().clone();
        let order: Vec<u32> = starts.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        for pair in starts.windows(2) {
            assert!(pair[1].1.duration_since(pair[0].1) >= Duration::from_millis(100));
        }
    }

    #[tokio::test]
    async fn test_failing_task_does_not_poison_queue() {
        let queue = ProviderQueue::new(settings(10));

        let failed: Result<Result<u32, String>, QueueError> =
            queue.enqueue(|| async { Err("provider exploded".to_string()) }).await;
        assert_eq!(failed.unwrap(), Err("provider exploded".to_string()));

        let ok: Result<Result<u32, String>, QueueError> = queue.enqueue(|| async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), Ok(7));
    }

    #[tokio::test]
    async fn test_panicking_task_is_isolated() {
        let queue = ProviderQueue::new(settings(10));

        let panicked = queue
            .enqueue(|| async {
                let fail = true;
                if fail {
                    panic!("boom");
                }
                1u32
            })
            .await;
        assert_eq!(panicked, Err(QueueError::Cancelled("test".to_string())));

        assert_eq!(queue.enqueue(|| async { 2u32 }).await, Ok(2));
        assert_eq!(queue.status().panicked, 1);
    }

    #[tokio::test]
    async fn test_call_timeout_fails_only_that_caller() {
        let queue = ProviderQueue::new(settings(10).with_call_timeout(Duration::from_millis(50)));

        let slow = queue
            .enqueue(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                1u32
            })
            .await;
        assert!(matches!(slow, Err(QueueError::Timeout { timeout_ms: 50, .. })));

        assert_eq!(queue.enqueue(|| async { 2u32 }).await, Ok(2));
    }

    #[tokio::test]
    async fn test_max_depth_rejects_with_queue_full() {
        let queue = Arc::new(ProviderQueue::new(settings(200).with_max_depth(1)));

        // First request occupies the worker, second sits in the pending list
        let first = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.enqueue(|| async { 1u32 }).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.enqueue(|| async { 2u32 }).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let third = queue.enqueue(|| async { 3u32 }).await;
        assert!(matches!(third, Err(QueueError::QueueFull { depth: 1, .. })));

        assert_eq!(first.await.unwrap(), Ok(1));
        assert_eq!(second.await.unwrap(), Ok(2));
    }

    #[tokio::test]
    async fn test_close_drains_without_executing() {
        let queue = Arc::new(ProviderQueue::new(settings(300)));
        let executed = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let queue = queue.clone();
            let executed = executed.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue(move || async move {
                        executed.fetch_add(1, Ordering::SeqCst);
                    })
                    .await
            }));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        queue.shutdown().await;

        let results: Vec<Result<(), QueueError>> =
            futures::future::join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(executed.load(Ordering::SeqCst), 1);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results.iter().filter(|r| matches!(r, Err(QueueError::Cancelled(_)))).count(),
            2
        );
        assert_eq!(queue.enqueue(|| async {}).await, Err(QueueError::Closed("test".to_string())));
        assert_eq!(queue.status().pending, 0);
    }

    #[tokio::test]
    async fn test_providers_run_independently() {
        let queues = DispatchQueues::new();
        queues.register(QueueSettings::new("slow", Duration::from_millis(500)));
        queues.register(QueueSettings::new("fast", Duration::from_millis(0)));

        queues.enqueue("slow", || async {}).await.unwrap();
        let start = Instant::now();
        queues.enqueue("fast", || async {}).await.unwrap();
        queues.enqueue("fast", || async {}).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(250));

        let unknown = queues.enqueue("missing", || async {}).await;
        assert_eq!(unknown, Err(QueueError::UnknownProvider("missing".to_string())));
        assert_eq!(queues.statuses().len(), 2);
    }
}
