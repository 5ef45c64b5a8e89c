//! A [`Notifier`] that records instead of delivering.

use bookings_core::{EnqueueOutcome, MailData, Notifier};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Records every queued message. Can be switched to drop everything, as a
/// saturated queue would.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    queued: Arc<Mutex<Vec<MailData>>>,
    saturated: Arc<AtomicBool>,
}

impl RecordingNotifier {
    /// Create a notifier that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// When `true`, every message is dropped.
    pub fn set_saturated(&self, saturated: bool) {
        self.saturated.store(saturated, Ordering::SeqCst);
    }

    /// Messages accepted so far, in order.
    #[must_use]
    pub fn queued(&self) -> Vec<MailData> {
        self.queued.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn enqueue(&self, mail: MailData) -> Pin<Box<dyn Future<Output = EnqueueOutcome> + Send + '_>> {
        Box::pin(async move {
            if self.saturated.load(Ordering::SeqCst) {
                return EnqueueOutcome::Dropped;
            }
            self.queued.lock().unwrap().push(mail);
            EnqueueOutcome::Queued
        })
    }
}
