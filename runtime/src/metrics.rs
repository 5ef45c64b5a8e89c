//! Prometheus export of the booking and notification counters.
//!
//! # Example
//!
//! ```rust,no_run
//! use bookings_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus scrape endpoint.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a server that will listen on `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the global recorder and start serving `/metrics`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or a
    /// recorder is already installed.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|e| MetricsError::Install(e.to_string()))?;
        register_metrics();

        tokio::spawn(async move {
            if let Err(e) = exporter.await {
                tracing::error!(error = ?e, "Metrics exporter stopped");
            }
        });

        tracing::info!(addr = %self.addr, "Metrics available at http://{}/metrics", self.addr);
        self.handle = Some(handle);
        Ok(())
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if the server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    describe_counter!("bookings.commit.succeeded", "Reservations committed");
    describe_counter!(
        "bookings.commit.failed",
        "Commit attempts that failed in storage"
    );
    describe_counter!(
        "bookings.storage.rollbacks",
        "Commit transactions rolled back, including lost booking races"
    );
    describe_counter!(
        "bookings.notifications.enqueued",
        "Notifications accepted by the delivery queue"
    );
    describe_counter!(
        "bookings.notifications.dropped",
        "Notifications dropped because the queue stayed full or was closed"
    );
    describe_counter!(
        "bookings.notifications.delivered",
        "Notifications handed to the mail transport"
    );
    describe_counter!(
        "bookings.notifications.failed",
        "Notifications abandoned after retries"
    );
    describe_histogram!(
        "bookings.notifications.delivery_duration_seconds",
        "Time from dequeue to final delivery outcome, retries included"
    );
}
