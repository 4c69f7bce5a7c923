use std::time::Instant;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, TextEncoder,
};

use crate::models::DeliveryOutcome;

static RPC_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "online_relay_rpc_requests_total",
            "Total relay RPCs handled by online-relay-service",
        ),
        &["method", "code"],
    )
    .expect("failed to create online_relay_rpc_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register online_relay_rpc_requests_total");
    counter
});

static RPC_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "online_relay_rpc_duration_seconds",
            "Relay RPC latency for online-relay-service",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method"],
    )
    .expect("failed to create online_relay_rpc_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register online_relay_rpc_duration_seconds");
    histogram
});

static DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "online_relay_deliveries_total",
            "Per-connection delivery outcomes by relay method",
        ),
        &["method", "outcome"],
    )
    .expect("failed to create online_relay_deliveries_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register online_relay_deliveries_total");
    counter
});

/// Live gateway connections currently registered
pub static ONLINE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "online_relay_online_connections",
        "Live gateway connections in the registry",
    )
    .expect("failed to create online_relay_online_connections");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register online_relay_online_connections");
    gauge
});

pub fn record_delivery(method: &str, outcome: DeliveryOutcome) {
    DELIVERIES_TOTAL
        .with_label_values(&[method, outcome.as_str()])
        .inc();
}

/// Times one relay RPC and records it when completed
pub struct RpcTimer {
    method: &'static str,
    start: Instant,
}

impl RpcTimer {
    pub fn start(method: &'static str) -> Self {
        Self {
            method,
            start: Instant::now(),
        }
    }

    pub fn complete(self, code: &str) {
        RPC_REQUESTS_TOTAL
            .with_label_values(&[self.method, code])
            .inc();
        RPC_DURATION_SECONDS
            .with_label_values(&[self.method])
            .observe(self.start.elapsed().as_secs_f64());
    }
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
