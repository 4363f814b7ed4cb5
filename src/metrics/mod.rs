//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Job status transitions and their latency
//! - Envelope publication
//! - Session tracking

use crate::entities::JobStatus;
use crate::error::{SchedulerError, SchedulerResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, register_int_gauge, Counter,
    CounterVec, Encoder, HistogramVec, IntGauge, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    pub static ref JOB_TRANSITIONS: CounterVec = register_counter_vec!(
        "tx_scheduler_job_transitions_total",
        "Total job status transitions by target status",
        &["status"]
    ).expect("job transitions metric");

    pub static ref JOB_LATENCY: HistogramVec = register_histogram_vec!(
        "tx_scheduler_job_status_latency_seconds",
        "Time spent by a job between two consecutive statuses",
        &["prev_status", "status"],
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    ).expect("job latency metric");

    pub static ref ENVELOPES_PUBLISHED: CounterVec = register_counter_vec!(
        "tx_scheduler_envelopes_published_total",
        "Total envelopes published by topic",
        &["topic"]
    ).expect("envelopes published metric");

    pub static ref PUBLISH_FAILURES: CounterVec = register_counter_vec!(
        "tx_scheduler_publish_failures_total",
        "Total failed envelope publications by topic",
        &["topic"]
    ).expect("publish failures metric");

    pub static ref ACTIVE_SESSIONS: IntGauge = register_int_gauge!(
        "tx_scheduler_active_sessions",
        "Number of jobs tracked by a session"
    ).expect("active sessions metric");

    pub static ref LISTENER_TICKS: Counter = register_counter!(
        "tx_scheduler_listener_ticks_total",
        "Total jobs listener ticks"
    ).expect("listener ticks metric");
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> SchedulerResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| SchedulerError::Internal(format!("cannot bind {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| SchedulerError::Internal(format!("metrics server: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

// Helper functions to record metrics

pub fn record_transition(prev: JobStatus, next: JobStatus, elapsed_secs: f64) {
    JOB_TRANSITIONS.with_label_values(&[next.as_str()]).inc();
    JOB_LATENCY
        .with_label_values(&[prev.as_str(), next.as_str()])
        .observe(elapsed_secs.max(0.0));
}

pub fn record_published(topic: &str) {
    ENVELOPES_PUBLISHED.with_label_values(&[topic]).inc();
}

pub fn record_publish_failure(topic: &str) {
    PUBLISH_FAILURES.with_label_values(&[topic]).inc();
}

pub fn record_active_sessions(count: usize) {
    ACTIVE_SESSIONS.set(count as i64);
}

pub fn record_listener_tick() {
    LISTENER_TICKS.inc();
}
