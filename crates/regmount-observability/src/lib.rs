//! # regmount-observability
//!
//! OpenTelemetry-based observability for RegMount.
//!
//! ## Built-in metrics
//! - `regmount.operations_delegated`: counter, tagged with mount + op
//! - `regmount.operations_degraded` : counter, secondary operations that
//!   returned an empty/zero result because the mount failed
//! - `regmount.operations_failed`   : counter, tagged with mount + op
//! - `regmount.transfer_bytes`      : histogram, dump/restore and
//!   cross-mount move/copy payload sizes
//!
//! ## Structured logging
//! JSON-structured or human-readable logs, level configurable per component.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::MountMetrics;
pub use tracing_setup::{init_tracing, LogConfig};
