//! In-memory email provider for tests.

use crate::email::EmailProvider;
use crate::error::{DeliveryError, Result};
use bookings_core::MailData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every message it is asked to send.
///
/// Can be told to fail the next N attempts with a transient error, to
/// reject everything permanently, or to take a while per send.
#[derive(Clone, Debug, Default)]
pub struct MockEmailProvider {
    sent: Arc<Mutex<Vec<MailData>>>,
    attempts: Arc<AtomicUsize>,
    transient_failures: Arc<AtomicUsize>,
    reject_all: Arc<AtomicBool>,
    latency: Option<Duration>,
}

impl MockEmailProvider {
    /// A provider that accepts everything immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every send.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next `count` sends with [`DeliveryError::Transport`].
    pub fn fail_next(&self, count: usize) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    /// Reject every send with [`DeliveryError::Build`] while `true`.
    pub fn set_reject_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    /// Messages delivered so far, in delivery order.
    #[must_use]
    pub fn sent(&self) -> Vec<MailData> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Send attempts so far, successful or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

impl EmailProvider for MockEmailProvider {
    async fn send(&self, mail: &MailData) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.reject_all.load(Ordering::SeqCst) {
            return Err(DeliveryError::Build("rejected by mock".to_string()));
        }
        if self.take_failure() {
            return Err(DeliveryError::Transport("mock transport failure".to_string()));
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail.clone());
        }
        Ok(())
    }
}
