//! In-process event queue with a worker pool.
//!
//! Publishing an event enqueues one job per interested listener. Workers
//! share a single `mpsc` receiver, so jobs run concurrently and in no
//! particular order. A failing or timed-out job is re-enqueued after an
//! exponential backoff until the retry policy gives up, at which point it is
//! moved to the dead-letter list.
//!
//! Delivery is at-least-once for the lifetime of the process; nothing is
//! persisted.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use super::retry::RetryPolicy;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::events::{EventId, PracticeEvent};
use crate::domain::models::QueueConfig;
use crate::domain::ports::EventPublisher;

/// Asynchronous subscriber to practice events.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Stable name used in logs and dead letters.
    fn name(&self) -> &str;

    /// Whether this listener wants the event.
    fn handles(&self, event: &PracticeEvent) -> bool;

    /// Handle one delivery. An error asks the queue to redeliver.
    async fn handle(&self, event: &PracticeEvent) -> DomainResult<()>;
}

struct Job {
    event: Arc<PracticeEvent>,
    listener: Arc<dyn EventListener>,
    attempt: u32,
}

/// A job that exhausted its retries.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    pub event_id: EventId,
    pub event_type: &'static str,
    pub listener: String,
    pub attempts: u32,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub published: u64,
    pub processed: u64,
    pub retried: u64,
    pub dead_lettered: u64,
    pub pending: usize,
}

#[derive(Default)]
struct Counters {
    published: AtomicU64,
    processed: AtomicU64,
    retried: AtomicU64,
    dead_lettered: AtomicU64,
}

pub struct EventQueue {
    sender: mpsc::Sender<Job>,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    listeners: Arc<RwLock<Vec<Arc<dyn EventListener>>>>,
    config: QueueConfig,
    retry: RetryPolicy,
    running: Arc<AtomicBool>,
    closed: AtomicBool,
    pending: Arc<AtomicUsize>,
    counters: Arc<Counters>,
    dead_letters: Arc<Mutex<Vec<DeadLetter>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// How long an idle worker waits on the channel before rechecking the
/// running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

impl EventQueue {
    pub fn new(config: QueueConfig, retry: RetryPolicy) -> Self {
        let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            listeners: Arc::new(RwLock::new(Vec::new())),
            config,
            retry,
            running: Arc::new(AtomicBool::new(false)),
            closed: AtomicBool::new(false),
            pending: Arc::new(AtomicUsize::new(0)),
            counters: Arc::new(Counters::default()),
            dead_letters: Arc::new(Mutex::new(Vec::new())),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener. Only events published afterwards reach it.
    pub async fn register(&self, listener: Arc<dyn EventListener>) {
        tracing::debug!(listener = listener.name(), "registered event listener");
        self.listeners.write().await.push(listener);
    }

    /// Spawn the worker pool. Calling it on a running queue does nothing.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let worker_count = self.config.workers.max(1);
        let mut workers = self.workers.lock().await;
        for worker_id in 0..worker_count {
            let worker = Worker {
                id: worker_id,
                receiver: self.receiver.clone(),
                sender: self.sender.clone(),
                running: self.running.clone(),
                pending: self.pending.clone(),
                counters: self.counters.clone(),
                dead_letters: self.dead_letters.clone(),
                retry: self.retry.clone(),
                handler_timeout: Duration::from_millis(self.config.handler_timeout_ms),
            };
            workers.push(tokio::spawn(worker.run()));
        }
        tracing::info!(workers = worker_count, "event queue started");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Wait until every published job has succeeded or been dead-lettered.
    /// Returns `false` if `timeout` elapsed first.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.pending.load(Ordering::SeqCst) == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Stop accepting events, let in-flight work drain for up to `drain`,
    /// then stop the workers.
    pub async fn shutdown(&self, drain: Duration) {
        self.closed.store(true, Ordering::SeqCst);
        if !self.wait_idle(drain).await {
            tracing::warn!(
                pending = self.pending.load(Ordering::SeqCst),
                "event queue shut down with undelivered jobs"
            );
        }
        self.running.store(false, Ordering::SeqCst);

        let handles: Vec<_> = self.workers.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "event queue worker panicked");
            }
        }
        tracing::info!("event queue stopped");
    }

    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().await.clone()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            published: self.counters.published.load(Ordering::Relaxed),
            processed: self.counters.processed.load(Ordering::Relaxed),
            retried: self.counters.retried.load(Ordering::Relaxed),
            dead_lettered: self.counters.dead_lettered.load(Ordering::Relaxed),
            pending: self.pending.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl EventPublisher for EventQueue {
    async fn publish(&self, event: PracticeEvent) -> DomainResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DomainError::QueueClosed);
        }

        let listeners: Vec<_> = self
            .listeners
            .read()
            .await
            .iter()
            .filter(|l| l.handles(&event))
            .cloned()
            .collect();

        if listeners.is_empty() {
            tracing::debug!(event_id = %event.id, event_type = event.variant_name(), "no listener for event");
            return Ok(());
        }

        let event = Arc::new(event);
        self.counters.published.fetch_add(1, Ordering::Relaxed);
        for listener in listeners {
            self.pending.fetch_add(1, Ordering::SeqCst);
            let job = Job { event: event.clone(), listener, attempt: 0 };
            if self.sender.send(job).await.is_err() {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                return Err(DomainError::QueueClosed);
            }
        }

        tracing::debug!(event_id = %event.id, event_type = event.variant_name(), "event enqueued");
        Ok(())
    }
}

struct Worker {
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    sender: mpsc::Sender<Job>,
    running: Arc<AtomicBool>,
    pending: Arc<AtomicUsize>,
    counters: Arc<Counters>,
    dead_letters: Arc<Mutex<Vec<DeadLetter>>>,
    retry: RetryPolicy,
    handler_timeout: Duration,
}

impl Worker {
    async fn run(self) {
        while self.running.load(Ordering::SeqCst) {
            let job = {
                let mut receiver = self.receiver.lock().await;
                match tokio::time::timeout(POLL_INTERVAL, receiver.recv()).await {
                    Ok(Some(job)) => job,
                    Ok(None) => break,
                    // Timeout - loop to check running flag
                    Err(_) => continue,
                }
            };
            self.process(job).await;
        }
        tracing::debug!(worker = self.id, "event queue worker exiting");
    }

    async fn process(&self, mut job: Job) {
        let listener = job.listener.name().to_string();
        let error = match tokio::time::timeout(self.handler_timeout, job.listener.handle(&job.event)).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!("handler timed out after {}ms", self.handler_timeout.as_millis())),
        };

        let Some(error) = error else {
            self.counters.processed.fetch_add(1, Ordering::Relaxed);
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!(
                worker = self.id,
                event_id = %job.event.id,
                %listener,
                attempt = job.attempt,
                "listener succeeded"
            );
            return;
        };

        if self.retry.should_retry(job.attempt) {
            let backoff = self.retry.calculate_backoff(job.attempt);
            tracing::warn!(
                event_id = %job.event.id,
                %listener,
                attempt = job.attempt + 1,
                max_retries = self.retry.max_retries,
                backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                %error,
                "listener failed, scheduling retry"
            );
            self.counters.retried.fetch_add(1, Ordering::Relaxed);
            job.attempt += 1;

            let sender = self.sender.clone();
            let pending = self.pending.clone();
            tokio::spawn(async move {
                tokio::time::sleep(backoff).await;
                if sender.send(job).await.is_err() {
                    pending.fetch_sub(1, Ordering::SeqCst);
                    tracing::error!("event queue closed before a retry could be enqueued");
                }
            });
            return;
        }

        tracing::error!(
            event_id = %job.event.id,
            event_type = job.event.variant_name(),
            %listener,
            attempts = job.attempt + 1,
            %error,
            "listener failed permanently, dead-lettering job"
        );
        self.dead_letters.lock().await.push(DeadLetter {
            event_id: job.event.id,
            event_type: job.event.variant_name(),
            listener,
            attempts: job.attempt + 1,
            error,
            failed_at: Utc::now(),
        });
        self.counters.dead_lettered.fetch_add(1, Ordering::Relaxed);
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}
