//! Observability for logview
//!
//! - Structured JSON logging ([`Logger`])
//! - Typed lifecycle events ([`Event`])
//! - Per-view counters ([`ViewMetrics`])
//!
//! Observability is read-only: it never changes view behavior and never
//! fails an operation.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, ViewMetrics};

/// Log a lifecycle event with fields.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Error
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
