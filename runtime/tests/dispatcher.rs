//! Queue, worker and overflow behaviour of the notification dispatcher.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use bookings_core::{BookingFlow, EnqueueOutcome, MailConfig, MailData, Notifier, SessionData};
use bookings_runtime::mocks::MockEmailProvider;
use bookings_runtime::{DispatcherConfig, NotificationDispatcher, RetryPolicy};
use bookings_testing::repository::GENERALS_QUARTERS;
use bookings_testing::{TestRepository, fixtures};
use std::sync::Arc;
use std::time::Duration;

const GRACE: Duration = Duration::from_secs(30);

fn mail(to: &str) -> MailData {
    MailData {
        to: to.to_string(),
        from: "me@here.com".into(),
        subject: "Room Reserved".into(),
        content: "<strong>Reservation Notification</strong>".into(),
        template: None,
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new()
        .with_max_retries(3)
        .with_initial_delay(Duration::from_millis(10))
}

#[tokio::test]
async fn queued_messages_are_delivered_before_shutdown_returns() {
    let provider = MockEmailProvider::new();
    let (dispatcher, workers) = NotificationDispatcher::start(provider.clone(), DispatcherConfig::default());

    assert_eq!(dispatcher.enqueue(mail("a@here.com")).await, EnqueueOutcome::Queued);
    assert_eq!(dispatcher.enqueue(mail("b@here.com")).await, EnqueueOutcome::Queued);
    assert!(workers.shutdown(GRACE).await);

    let mut delivered: Vec<_> = provider.sent().into_iter().map(|m| m.to).collect();
    delivered.sort();
    assert_eq!(delivered, ["a@here.com", "b@here.com"]);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let provider = MockEmailProvider::new();
    provider.fail_next(2);
    let config = DispatcherConfig::new().with_workers(1).with_retry(fast_retry());
    let (dispatcher, workers) = NotificationDispatcher::start(provider.clone(), config);

    dispatcher.enqueue(mail("a@here.com")).await;
    assert!(workers.shutdown(GRACE).await);

    assert_eq!(provider.attempts(), 3);
    assert_eq!(provider.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_drop_the_message() {
    let provider = MockEmailProvider::new();
    provider.fail_next(10);
    let config = DispatcherConfig::new()
        .with_workers(1)
        .with_retry(fast_retry().with_max_retries(1));
    let (dispatcher, workers) = NotificationDispatcher::start(provider.clone(), config);

    dispatcher.enqueue(mail("a@here.com")).await;
    assert!(workers.shutdown(GRACE).await);

    assert_eq!(provider.attempts(), 2);
    assert!(provider.sent().is_empty());
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
    let provider = MockEmailProvider::new();
    provider.set_reject_all(true);
    let config = DispatcherConfig::new().with_workers(1).with_retry(fast_retry());
    let (dispatcher, workers) = NotificationDispatcher::start(provider.clone(), config);

    dispatcher.enqueue(mail("a@here.com")).await;
    assert!(workers.shutdown(GRACE).await);

    assert_eq!(provider.attempts(), 1);
    assert!(provider.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn full_queue_drops_after_the_enqueue_deadline() {
    let provider = MockEmailProvider::new().with_latency(Duration::from_millis(200));
    let config = DispatcherConfig::new()
        .with_capacity(1)
        .with_workers(1)
        .with_enqueue_timeout(Duration::from_millis(10));
    let (dispatcher, workers) = NotificationDispatcher::start(provider.clone(), config);

    // The worker takes the first message and sits in the slow send, the
    // second fills the only slot and the third has nowhere to go.
    assert_eq!(dispatcher.enqueue(mail("a@here.com")).await, EnqueueOutcome::Queued);
    assert_eq!(dispatcher.enqueue(mail("b@here.com")).await, EnqueueOutcome::Queued);
    assert_eq!(dispatcher.enqueue(mail("c@here.com")).await, EnqueueOutcome::Dropped);

    assert!(workers.shutdown(GRACE).await);
    assert_eq!(provider.sent().len(), 2);
}

#[tokio::test]
async fn enqueue_after_shutdown_is_dropped() {
    let provider = MockEmailProvider::new();
    let (dispatcher, workers) = NotificationDispatcher::start(provider.clone(), DispatcherConfig::default());
    assert!(workers.shutdown(GRACE).await);

    assert!(dispatcher.is_closed());
    assert_eq!(dispatcher.enqueue(mail("late@here.com")).await, EnqueueOutcome::Dropped);
    assert!(provider.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_gives_up_on_workers_stuck_past_the_grace_period() {
    let provider = MockEmailProvider::new().with_latency(Duration::from_secs(60));
    let config = DispatcherConfig::new().with_workers(1);
    let (dispatcher, workers) = NotificationDispatcher::start(provider.clone(), config);

    dispatcher.enqueue(mail("a@here.com")).await;
    tokio::task::yield_now().await;

    assert!(!workers.shutdown(Duration::from_secs(1)).await);
    assert!(provider.sent().is_empty());
}

#[tokio::test]
async fn committed_booking_delivers_guest_and_owner_mail() {
    let provider = MockEmailProvider::new();
    let (dispatcher, workers) = NotificationDispatcher::start(provider.clone(), DispatcherConfig::default());
    let flow = BookingFlow::new(
        Arc::new(TestRepository::new()),
        Arc::new(dispatcher),
        MailConfig::default(),
    );

    let mut session = SessionData::default();
    flow.book_room(&mut session, GENERALS_QUARTERS, fixtures::START, fixtures::END)
        .unwrap();
    flow.submit_details(&mut session, fixtures::guest_form())
        .await
        .unwrap();
    drop(flow);
    assert!(workers.shutdown(GRACE).await);

    let sent = provider.sent();
    assert_eq!(sent.len(), 2);
    let guest = sent.iter().find(|m| m.to == "john@smith.com").unwrap();
    assert_eq!(guest.template.as_deref(), Some("basic.html"));
    assert!(guest.content.contains("General's Quarters"));
    assert!(sent.iter().any(|m| m.to == "owner@room.com"));
}
