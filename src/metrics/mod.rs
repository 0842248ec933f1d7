//! Prometheus collectors for leader discovery, exclusion and session state.
//!
//! Collectors live in the crate [`REGISTRY`]; autometrics output for the
//! annotated pool operations is appended by [`gather_metrics`].


use std::sync::Once;

use autometrics::prometheus_exporter;
use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;

lazy_static! {
    pub static ref LEADER_PROBES: IntCounterVec = IntCounterVec::new(
        Opts::new("leader_probes", "Leader probes by outcome"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref LEADER_FAILOVERS: IntCounter = IntCounter::new(
        "leader_failovers",
        "Resolutions that settled on a different leader than the one recorded"
    )
    .expect("metric can not be created");

    pub static ref EXCLUDED_RANKS: IntCounter =
        IntCounter::new("excluded_ranks", "Ranks removed from pool service membership")
            .expect("metric can not be created");

    pub static ref SESSION_TRANSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("session_transitions", "Session state transitions by target state"),
        &["state"]
    )
    .expect("metric can not be created");

    pub static ref POOL_CREATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("pool_creations", "Pool creation attempts by outcome"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

pub(crate) fn register_custom_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(LEADER_PROBES.clone()),
        Box::new(LEADER_FAILOVERS.clone()),
        Box::new(EXCLUDED_RANKS.clone()),
        Box::new(SESSION_TRANSITIONS.clone()),
        Box::new(POOL_CREATIONS.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            error!("collector can not be registered: {}", e);
        }
    }
}

/// Text exposition of every collector, autometrics included
pub fn gather_metrics() -> String {
    REGISTER.call_once(|| register_custom_metrics(&REGISTRY));

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    }
    let mut res = String::from_utf8(buffer).unwrap_or_else(|e| {
        error!("custom metrics could not be from_utf8'd: {}", e);
        String::default()
    });

    res.push_str(&prometheus_exporter::encode_http_response().into_body());
    res
}
