//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator, clients and CLI produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → tracing.rs (one span per action, keyed by action id)
//!
//! Consumers:
//!     → stderr log output
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Action ID flows through every log line of an action via its span
//! - Metrics are cheap (atomic increments) and no-ops without an exporter
//! - Keys, signatures of login challenges and auth tokens are never logged

pub mod logging;
pub mod metrics;
pub mod tracing;
