// najot-bot/src/metrics.rs

use prometheus::{Encoder, TextEncoder, Registry, IntCounter, IntCounterVec, IntGauge, Histogram};
use lazy_static::lazy_static;
use std::sync::OnceLock;
use axum::response::IntoResponse;
use axum::http::StatusCode;
use tracing::warn;

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
}

static REQ_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();
static REMOTE_CALLS: OnceLock<IntCounterVec> = OnceLock::new();
static ANSWERED_QUESTIONS: OnceLock<IntCounter> = OnceLock::new();
static ACTIVE_SESSIONS: OnceLock<IntGauge> = OnceLock::new();
static INDEX_BUILD_TIME: OnceLock<Histogram> = OnceLock::new();

pub fn init_metrics() {
    let req_counter = REQ_COUNTER.get_or_init(|| {
        IntCounterVec::new(
            prometheus::opts!("requests_total", "Total requests per route"),
            &["route", "status"],
        )
        .expect("static metric definition")
    });

    let remote_calls = REMOTE_CALLS.get_or_init(|| {
        IntCounterVec::new(
            prometheus::opts!("remote_calls_total", "Calls to the embedding and completion endpoints"),
            &["endpoint", "outcome"],
        )
        .expect("static metric definition")
    });

    let answered_questions = ANSWERED_QUESTIONS.get_or_init(|| {
        IntCounter::new("questions_answered_total", "Chat turns that produced an assistant reply")
            .expect("static metric definition")
    });

    let active_sessions = ACTIVE_SESSIONS.get_or_init(|| {
        IntGauge::new("active_sessions", "Chat sessions held in memory")
            .expect("static metric definition")
    });

    let index_build_time = INDEX_BUILD_TIME.get_or_init(|| {
        Histogram::with_opts(prometheus::HistogramOpts::new(
            "knowledge_base_build_seconds",
            "Time spent loading, chunking and embedding the source document",
        ))
        .expect("static metric definition")
    });

    REGISTRY.register(Box::new(req_counter.clone())).ok();
    REGISTRY.register(Box::new(remote_calls.clone())).ok();
    REGISTRY.register(Box::new(answered_questions.clone())).ok();
    REGISTRY.register(Box::new(active_sessions.clone())).ok();
    REGISTRY.register(Box::new(index_build_time.clone())).ok();
}

pub fn inc_request(route: &str, status: &str) {
    if let Some(counter) = REQ_COUNTER.get() {
        counter.with_label_values(&[route, status]).inc();
    }
}

pub fn inc_remote_call(endpoint: &str, outcome: &str) {
    if let Some(counter) = REMOTE_CALLS.get() {
        counter.with_label_values(&[endpoint, outcome]).inc();
    }
}

pub fn inc_answered_question() {
    if let Some(counter) = ANSWERED_QUESTIONS.get() {
        counter.inc();
    }
}

pub fn inc_sessions() {
    if let Some(gauge) = ACTIVE_SESSIONS.get() {
        gauge.inc();
    }
}

pub fn dec_sessions() {
    if let Some(gauge) = ACTIVE_SESSIONS.get() {
        gauge.dec();
    }
}

pub fn observe_index_build(duration: f64) {
    if let Some(histogram) = INDEX_BUILD_TIME.get() {
        histogram.observe(duration);
    }
}

pub async fn get_metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("metrics encoding failed: {}", e).into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        buffer,
    )
}
