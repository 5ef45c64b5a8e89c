//! Background delivery of booking notifications.
//!
//! [`NotificationDispatcher::start`] creates a bounded queue and a pool of
//! workers that drain it through an [`EmailProvider`]. The returned
//! [`NotificationDispatcher`] is the enqueue side and implements
//! [`Notifier`], so the booking workflow never waits on a mail server.
//!
//! # Overflow policy
//!
//! An enqueue waits at most [`DispatcherConfig::enqueue_timeout`] for a free
//! slot. If the queue is still full the message is dropped, a warning is
//! logged and `bookings.notifications.dropped` is incremented.
//!
//! # Delivery failures
//!
//! Transient failures are retried per [`DispatcherConfig::retry`]. When the
//! retries run out, or the failure is permanent, the message is logged and
//! discarded. Nothing is reported back to the visitor.

use crate::email::EmailProvider;
use crate::error::DeliveryError;
use crate::retry::{RetryPolicy, retry_with_predicate};
use bookings_core::{EnqueueOutcome, MailData, Notifier};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Queue and worker settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatcherConfig {
    /// Messages the queue holds before enqueues start waiting.
    pub capacity: usize,
    /// Concurrent delivery workers.
    pub workers: usize,
    /// Longest an enqueue waits for a free slot before dropping.
    pub enqueue_timeout: Duration,
    /// Backoff for transient delivery failures.
    pub retry: RetryPolicy,
}

impl DispatcherConfig {
    /// 100 slots, 2 workers, 50ms enqueue deadline, default retry policy.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            capacity: 100,
            workers: 2,
            enqueue_timeout: Duration::from_millis(50),
            retry: RetryPolicy::new(),
        }
    }

    /// Set the queue capacity. Zero is raised to one.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = if capacity == 0 { 1 } else { capacity };
        self
    }

    /// Set the worker count. Zero is raised to one.
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 { 1 } else { workers };
        self
    }

    /// Set the enqueue deadline.
    #[must_use]
    pub const fn with_enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.enqueue_timeout = timeout;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Enqueue side of the notification queue.
#[derive(Clone, Debug)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<MailData>,
    enqueue_timeout: Duration,
}

/// The running worker pool. Dropping it also stops the workers once the
/// queue is drained.
#[derive(Debug)]
pub struct DispatcherWorkers {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl NotificationDispatcher {
    /// Create the queue and spawn the workers on the current runtime.
    #[must_use]
    pub fn start<P: EmailProvider>(provider: P, config: DispatcherConfig) -> (Self, DispatcherWorkers) {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let provider = Arc::new(provider);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let handles = (0..config.workers.max(1))
            .map(|worker| {
                let span = tracing::info_span!("notification_worker", worker);
                tokio::spawn(
                    run_worker(
                        Arc::clone(&provider),
                        Arc::clone(&receiver),
                        shutdown_rx.clone(),
                        config.retry,
                    )
                    .instrument(span),
                )
            })
            .collect();

        tracing::info!(
            capacity = config.capacity,
            workers = config.workers,
            "Notification dispatcher started"
        );

        (
            Self {
                sender,
                enqueue_timeout: config.enqueue_timeout,
            },
            DispatcherWorkers { shutdown, handles },
        )
    }

    /// Free slots in the queue right now.
    #[must_use]
    pub fn available_capacity(&self) -> usize {
        self.sender.capacity()
    }

    /// Whether the workers have stopped accepting messages.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn push(&self, mail: MailData) -> EnqueueOutcome {
        match self.sender.send_timeout(mail, self.enqueue_timeout).await {
            Ok(()) => {
                metrics::counter!("bookings.notifications.enqueued").increment(1);
                EnqueueOutcome::Queued
            }
            Err(SendTimeoutError::Timeout(mail)) => {
                metrics::counter!("bookings.notifications.dropped").increment(1);
                tracing::warn!(
                    to = %mail.to,
                    subject = %mail.subject,
                    timeout = ?self.enqueue_timeout,
                    "Notification queue full, dropping message"
                );
                EnqueueOutcome::Dropped
            }
            Err(SendTimeoutError::Closed(mail)) => {
                metrics::counter!("bookings.notifications.dropped").increment(1);
                tracing::warn!(
                    to = %mail.to,
                    subject = %mail.subject,
                    "Notification workers stopped, dropping message"
                );
                EnqueueOutcome::Dropped
            }
        }
    }
}

impl Notifier for NotificationDispatcher {
    fn enqueue(&self, mail: MailData) -> Pin<Box<dyn Future<Output = EnqueueOutcome> + Send + '_>> {
        Box::pin(self.push(mail))
    }
}

impl DispatcherWorkers {
    /// Stop accepting messages, deliver what is already queued and wait for
    /// the workers to finish.
    ///
    /// Workers still running after `grace` are aborted. Returns `true` if
    /// every worker finished in time.
    pub async fn shutdown(self, grace: Duration) -> bool {
        let Self { shutdown, handles } = self;
        // Receivers only go away once every worker has exited.
        let _ = shutdown.send(true);

        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        if tokio::time::timeout(grace, futures::future::join_all(handles))
            .await
            .is_ok()
        {
            tracing::info!("Notification dispatcher drained");
            true
        } else {
            tracing::warn!(grace = ?grace, "Notification workers did not drain in time, aborting");
            for abort in aborts {
                abort.abort();
            }
            false
        }
    }
}

async fn run_worker<P: EmailProvider>(
    provider: Arc<P>,
    receiver: Arc<Mutex<mpsc::Receiver<MailData>>>,
    mut shutdown: watch::Receiver<bool>,
    retry: RetryPolicy,
) {
    while let Some(mail) = next_message(&receiver, &mut shutdown).await {
        deliver(provider.as_ref(), &mail, &retry).await;
    }
    tracing::debug!("Notification worker stopped");
}

/// Wait for the next message. After shutdown is signalled the queue is
/// closed and only already-buffered messages are returned.
async fn next_message(
    receiver: &Mutex<mpsc::Receiver<MailData>>,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<MailData> {
    let mut rx = receiver.lock().await;
    if !*shutdown.borrow() {
        tokio::select! {
            mail = rx.recv() => return mail,
            _ = shutdown.changed() => {}
        }
    }
    rx.close();
    rx.recv().await
}

async fn deliver<P: EmailProvider>(provider: &P, mail: &MailData, retry: &RetryPolicy) {
    let started = tokio::time::Instant::now();
    let outcome = retry_with_predicate(retry, || provider.send(mail), DeliveryError::is_transient).await;
    metrics::histogram!("bookings.notifications.delivery_duration_seconds")
        .record(started.elapsed().as_secs_f64());

    match outcome {
        Ok(()) => {
            metrics::counter!("bookings.notifications.delivered").increment(1);
            tracing::debug!(to = %mail.to, subject = %mail.subject, "Notification delivered");
        }
        Err(error) => {
            metrics::counter!("bookings.notifications.failed").increment(1);
            tracing::error!(
                to = %mail.to,
                subject = %mail.subject,
                error = %error,
                "Notification delivery failed"
            );
        }
    }
}
