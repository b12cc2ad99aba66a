//! Record types flowing through the pipeline.
//!
//! `Raw*` types mirror the append-only ingestion tables: every business
//! field is untyped, nullable text. The remaining types are the three
//! datasets the reload materializes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;

/// A raw checkout session row as landed by ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSession {
    /// Engine-assigned row id. Strictly increasing in append order.
    pub row_id: i64,
    pub session_id: String,
    pub created_at: Option<String>,
    pub state: Option<String>,
    pub total_usd: Option<String>,
    pub number_of_cart_items: Option<String>,
    pub store_integration_id: Option<String>,
    pub channel: Option<String>,
    pub source_file: Option<String>,
    pub load_ts: DateTime<Utc>,
}

/// A raw discount effect row as landed by ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEffect {
    /// Engine-assigned row id. Strictly increasing in append order.
    pub row_id: i64,
    pub effect_id: Option<String>,
    pub session_id: String,
    pub effect_type: Option<String>,
    pub value: Option<String>,
    pub source_file: Option<String>,
    pub load_ts: DateTime<Utc>,
}

/// Fields of a raw session before the store assigns a row id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRawSession {
    pub session_id: String,
    pub created_at: Option<String>,
    pub state: Option<String>,
    pub total_usd: Option<String>,
    pub number_of_cart_items: Option<String>,
    pub store_integration_id: Option<String>,
    pub channel: Option<String>,
    pub source_file: Option<String>,
}

/// Fields of a raw effect before the store assigns a row id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRawEffect {
    pub effect_id: Option<String>,
    pub session_id: String,
    pub effect_type: Option<String>,
    pub value: Option<String>,
    pub source_file: Option<String>,
}

/// Sales channel of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Online,
    Offline,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Online => "Online",
            Channel::Offline => "Offline",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored channel label is neither `Online` nor `Offline`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown channel: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Online" => Ok(Channel::Online),
            "Offline" => Ok(Channel::Offline),
            other => Err(UnknownChannel(other.to_string())),
        }
    }
}

/// One deduplicated, normalized session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSession {
    pub session_id: String,
    pub created_at: Option<NaiveDateTime>,
    pub state: Option<String>,
    pub total_usd: Option<Decimal>,
    pub number_of_cart_items: Option<i64>,
    pub store_integration_id: Option<String>,
    pub channel: Channel,
    pub source_load_ts: DateTime<Utc>,
}

/// Discount total for a session that has at least one effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectRollup {
    pub session_id: String,
    pub discount_amount_usd: Decimal,
    /// Lexicographically greatest effect type seen for the session.
    ///
    /// Chosen over every effect type, not only discount types. It carries no
    /// business meaning and should not be used to classify sessions.
    pub representative_effect_type: String,
    pub source_load_ts: DateTime<Utc>,
}

/// A canonical session joined with its discount and derived metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedSession {
    pub session_id: String,
    pub created_at: Option<NaiveDateTime>,
    pub state: Option<String>,
    pub total_usd: Option<Decimal>,
    pub number_of_cart_items: Option<i64>,
    pub store_integration_id: Option<String>,
    pub channel: Channel,
    pub discount_amount_usd: Decimal,
    pub net_revenue: Option<Decimal>,
    pub discount_depth: Option<Decimal>,
    pub source_load_ts: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_labels() {
        assert_eq!(Channel::Online.to_string(), "Online");
        assert_eq!("Offline".parse::<Channel>(), Ok(Channel::Offline));
        assert_eq!(
            "offline".parse::<Channel>(),
            Err(UnknownChannel("offline".to_string()))
        );
    }
}
