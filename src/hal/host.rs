// Host-side clock, stop signal and log-backed telemetry

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::debug;

use super::{Clock, RunGate, Telemetry};

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    started: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn reset(&mut self) {
        self.started = Instant::now();
    }

    fn elapsed_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Shared run flag: active until [`StopFlag::request_stop`] is called from any thread
#[derive(Debug, Clone)]
pub struct StopFlag {
    active: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn request_stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl Default for StopFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl RunGate for StopFlag {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Telemetry that ends up in the log: one debug event per update
#[derive(Debug, Default)]
pub struct TracingTelemetry {
    pending: Vec<(String, String)>,
}

impl TracingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Telemetry for TracingTelemetry {
    fn add_data(&mut self, key: &str, value: &dyn fmt::Display) {
        self.pending.push((key.to_string(), value.to_string()));
    }

    fn update(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let line = self
            .pending
            .drain(..)
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(", ");
        debug!(target: "telemetry", "{}", line);
    }
}
