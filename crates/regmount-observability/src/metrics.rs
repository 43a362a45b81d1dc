//! Mount metrics definitions.
//!
//! Instruments come from the global OpenTelemetry meter unless a meter is
//! passed explicitly; with no provider installed they are no-ops.

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Meter name used by [`MountMetrics::global`].
pub const METER_NAME: &str = "regmount";

/// Metrics handle carried by every mount handler.
#[derive(Clone)]
pub struct MountMetrics {
    pub operations_delegated: Counter<u64>,
    pub operations_degraded: Counter<u64>,
    pub operations_failed: Counter<u64>,
    pub transfer_bytes: Histogram<u64>,
}

impl MountMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            operations_delegated: meter
                .u64_counter("regmount.operations_delegated")
                .with_description("Operations served by a mounted registry")
                .init(),
            operations_degraded: meter
                .u64_counter("regmount.operations_degraded")
                .with_description("Secondary operations that fell back to an empty result")
                .init(),
            operations_failed: meter
                .u64_counter("regmount.operations_failed")
                .with_description("Operations whose mounted registry call failed")
                .init(),
            transfer_bytes: meter
                .u64_histogram("regmount.transfer_bytes")
                .with_description("Bytes streamed by dump, restore and cross-mount transfers")
                .init(),
        }
    }

    /// Instruments registered on the global meter provider.
    pub fn global() -> Self {
        Self::new(&global::meter(METER_NAME))
    }

    pub fn record_delegated(&self, mount: &str, op: &str) {
        self.operations_delegated.add(1, &labels(mount, op));
    }

    pub fn record_degraded(&self, mount: &str, op: &str) {
        self.operations_degraded.add(1, &labels(mount, op));
    }

    pub fn record_failed(&self, mount: &str, op: &str) {
        self.operations_failed.add(1, &labels(mount, op));
    }

    pub fn record_transfer(&self, mount: &str, op: &str, bytes: u64) {
        self.transfer_bytes.record(bytes, &labels(mount, op));
    }
}

impl std::fmt::Debug for MountMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountMetrics").finish_non_exhaustive()
    }
}

fn labels(mount: &str, op: &str) -> [KeyValue; 2] {
    [
        KeyValue::new("mount", mount.to_string()),
        KeyValue::new("op", op.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_provider_is_a_no_op() {
        let metrics = MountMetrics::global();
        metrics.record_delegated("/remote", "get");
        metrics.record_degraded("/remote", "get_tags");
        metrics.record_failed("/remote", "put");
        metrics.record_transfer("/remote", "dump", 128);
    }
}
