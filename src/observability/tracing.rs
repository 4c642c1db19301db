//! Per-action spans.
//!
//! Every orchestrated action runs inside a span carrying its action id, so
//! derive, setup, quote, submit and record events correlate in the logs.

use tracing::Span;
use uuid::Uuid;

pub fn action_span(action: &str, action_id: Uuid) -> Span {
    tracing::info_span!("action", kind = action, action_id = %action_id)
}
