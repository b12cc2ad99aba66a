//! Pure transformation stages of the reload.
//!
//! Each stage takes fully materialized input and returns its output dataset
//! in `session_id` order. Storage access lives in [`crate::storage`]; the
//! transaction that ties the stages together lives in [`crate::reload`].

use chrono::{DateTime, Utc};

pub mod effects;
pub mod merge;
pub mod sessions;

pub use effects::{rollup_effects, DEFAULT_DISCOUNT_EFFECT_TYPES};
pub use merge::{derive_metrics, merge_sessions, CLOSED_STATE};
pub use sessions::{classify_channel, deduplicate_sessions};

/// Errors from the transformation stages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// A derived amount does not fit in a `Decimal`.
    #[error("{column} overflowed for session {session_id}")]
    Overflow {
        session_id: String,
        column: &'static str,
    },
}

/// Ordering key for picking the latest version of a raw record.
///
/// Ingestion timestamp first; the engine row id breaks ties so the row
/// appended last wins.
pub(crate) fn recency(load_ts: DateTime<Utc>, row_id: i64) -> (DateTime<Utc>, i64) {
    (load_ts, row_id)
}
