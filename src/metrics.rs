// Lock-free handler statistics using atomic counters
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use crate::error::{HandleError, Outcome};

static START_TIME: OnceLock<Instant> = OnceLock::new();

static CONNECTIONS_TOTAL: AtomicU64 = AtomicU64::new(0);
static PROCESSED: AtomicU64 = AtomicU64::new(0);
static PREFLIGHT: AtomicU64 = AtomicU64::new(0);
static UNAUTHORIZED: AtomicU64 = AtomicU64::new(0);
static IGNORED: AtomicU64 = AtomicU64::new(0);
static DISCONNECTED: AtomicU64 = AtomicU64::new(0);
static CONGESTED: AtomicU64 = AtomicU64::new(0);
static TIMEOUTS: AtomicU64 = AtomicU64::new(0);
static PROTOCOL_ERRORS: AtomicU64 = AtomicU64::new(0);
static IO_ERRORS: AtomicU64 = AtomicU64::new(0);
static BYTES_IN: AtomicU64 = AtomicU64::new(0);
static LATENCY_SUM_MS: AtomicU64 = AtomicU64::new(0);
static LATENCY_MAX_MS: AtomicU64 = AtomicU64::new(0);

pub fn init() {
    START_TIME.get_or_init(Instant::now);
}

#[inline]
pub fn inc_connections() { CONNECTIONS_TOTAL.fetch_add(1, Ordering::Relaxed); }

#[inline]
pub fn inc_ignored() { IGNORED.fetch_add(1, Ordering::Relaxed); }

#[inline]
pub fn add_bytes_in(n: u64) { BYTES_IN.fetch_add(n, Ordering::Relaxed); }

pub fn record_outcome(outcome: Outcome) {
    let counter = match outcome {
        Outcome::Processed => &PROCESSED,
        Outcome::Preflight => &PREFLIGHT,
        Outcome::Unauthorized => &UNAUTHORIZED,
        Outcome::Ignored => &IGNORED,
    };
    counter.fetch_add(1, Ordering::Relaxed);
}

pub fn record_failure(err: &HandleError) {
    let counter = match err {
        HandleError::ClientDisconnected => &DISCONNECTED,
        HandleError::BufferCongested => &CONGESTED,
        HandleError::Timeout => &TIMEOUTS,
        HandleError::Protocol(_) => &PROTOCOL_ERRORS,
        HandleError::Io(_) => &IO_ERRORS,
    };
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Time from first read to close, for every handled connection whether it
/// succeeded or failed. Ignored connections are not timed.
#[inline]
pub fn record_latency(ms: u64) {
    LATENCY_SUM_MS.fetch_add(ms, Ordering::Relaxed);
    let mut current = LATENCY_MAX_MS.load(Ordering::Relaxed);
    while ms > current {
        match LATENCY_MAX_MS.compare_exchange_weak(current, ms, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(c) => current = c,
        }
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub uptime_seconds: u64,
    pub connections_total: u64,
    pub processed: u64,
    pub preflight: u64,
    pub unauthorized: u64,
    pub ignored: u64,
    pub client_disconnected: u64,
    pub buffer_congested: u64,
    pub timeouts: u64,
    pub protocol_errors: u64,
    pub io_errors: u64,
    pub bytes_in: u64,
    pub latency_sum_ms: u64,
    pub latency_max_ms: u64,
}

impl Snapshot {
    /// Connections that ended with a response, failures excluded.
    pub fn completed(&self) -> u64 {
        self.processed + self.preflight + self.unauthorized
    }

    pub fn failed(&self) -> u64 {
        self.client_disconnected + self.buffer_congested + self.timeouts + self.protocol_errors + self.io_errors
    }
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        uptime_seconds: START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0),
        connections_total: CONNECTIONS_TOTAL.load(Ordering::Relaxed),
        processed: PROCESSED.load(Ordering::Relaxed),
        preflight: PREFLIGHT.load(Ordering::Relaxed),
        unauthorized: UNAUTHORIZED.load(Ordering::Relaxed),
        ignored: IGNORED.load(Ordering::Relaxed),
        client_disconnected: DISCONNECTED.load(Ordering::Relaxed),
        buffer_congested: CONGESTED.load(Ordering::Relaxed),
        timeouts: TIMEOUTS.load(Ordering::Relaxed),
        protocol_errors: PROTOCOL_ERRORS.load(Ordering::Relaxed),
        io_errors: IO_ERRORS.load(Ordering::Relaxed),
        bytes_in: BYTES_IN.load(Ordering::Relaxed),
        latency_sum_ms: LATENCY_SUM_MS.load(Ordering::Relaxed),
        latency_max_ms: LATENCY_MAX_MS.load(Ordering::Relaxed),
    }
}

pub fn snapshot_prometheus() -> String {
    let s = snapshot();
    format!(
        "# HELP slimhttp_uptime_seconds Server uptime\n\
         # TYPE slimhttp_uptime_seconds gauge\n\
         slimhttp_uptime_seconds {}\n\
         # HELP slimhttp_connections_total Connections handed to the handler\n\
         # TYPE slimhttp_connections_total counter\n\
         slimhttp_connections_total {}\n\
         # TYPE slimhttp_requests_processed counter\n\
         slimhttp_requests_processed {}\n\
         # TYPE slimhttp_requests_preflight counter\n\
         slimhttp_requests_preflight {}\n\
         # TYPE slimhttp_requests_unauthorized counter\n\
         slimhttp_requests_unauthorized {}\n\
         # TYPE slimhttp_connections_ignored counter\n\
         slimhttp_connections_ignored {}\n\
         # HELP slimhttp_failures_total Failed requests by reason\n\
         # TYPE slimhttp_failures_total counter\n\
         slimhttp_failures_total{{reason=\"client_disconnected\"}} {}\n\
         slimhttp_failures_total{{reason=\"buffer_congested\"}} {}\n\
         slimhttp_failures_total{{reason=\"timeout\"}} {}\n\
         slimhttp_failures_total{{reason=\"protocol_error\"}} {}\n\
         slimhttp_failures_total{{reason=\"io_error\"}} {}\n\
         # TYPE slimhttp_bytes_in counter\n\
         slimhttp_bytes_in {}\n\
         # TYPE slimhttp_latency_sum_ms counter\n\
         slimhttp_latency_sum_ms {}\n\
         # TYPE slimhttp_latency_max_ms gauge\n\
         slimhttp_latency_max_ms {}\n",
        s.uptime_seconds,
        s.connections_total,
        s.processed,
        s.preflight,
        s.unauthorized,
        s.ignored,
        s.client_disconnected,
        s.buffer_congested,
        s.timeouts,
        s.protocol_errors,
        s.io_errors,
        s.bytes_in,
        s.latency_sum_ms,
        s.latency_max_ms,
    )
}

pub fn snapshot_json() -> String {
    let s = snapshot();
    let timed = s.completed() + s.failed();
    let avg_lat = if timed > 0 { s.latency_sum_ms / timed } else { 0 };
    format!(
        r#"{{"uptime_seconds":{},"connections_total":{},"processed":{},"preflight":{},"unauthorized":{},"ignored":{},"client_disconnected":{},"buffer_congested":{},"timeouts":{},"protocol_errors":{},"io_errors":{},"bytes_in":{},"latency_avg_ms":{avg_lat},"latency_max_ms":{}}}"#,
        s.uptime_seconds,
        s.connections_total,
        s.processed,
        s.preflight,
        s.unauthorized,
        s.ignored,
        s.client_disconnected,
        s.buffer_congested,
        s.timeouts,
        s.protocol_errors,
        s.io_errors,
        s.bytes_in,
        s.latency_max_ms,
    )
}
