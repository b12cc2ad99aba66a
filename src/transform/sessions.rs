//! Session deduplication and channel classification.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::model::{CanonicalSession, Channel, RawSession};
use crate::normalize;

use super::recency;

/// Collapse raw sessions to the latest ingested row per `session_id`.
///
/// Returns one normalized session per distinct id, ordered by id.
pub fn deduplicate_sessions(raw: Vec<RawSession>) -> Vec<CanonicalSession> {
    let mut latest: BTreeMap<String, RawSession> = BTreeMap::new();

    for row in raw {
        match latest.entry(row.session_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get();
                if recency(row.load_ts, row.row_id) > recency(current.load_ts, current.row_id) {
                    slot.insert(row);
                }
            }
        }
    }

    latest.into_values().map(canonicalize).collect()
}

fn canonicalize(row: RawSession) -> CanonicalSession {
    let store_integration_id = normalize::text(row.store_integration_id.as_deref());
    let channel = classify_channel(row.channel.as_deref(), store_integration_id.as_deref());

    CanonicalSession {
        created_at: normalize::timestamp(row.created_at.as_deref()),
        state: normalize::lowercase_text(row.state.as_deref()),
        total_usd: normalize::decimal(row.total_usd.as_deref()),
        number_of_cart_items: normalize::integer(row.number_of_cart_items.as_deref()),
        store_integration_id,
        channel,
        source_load_ts: row.load_ts,
        session_id: row.session_id,
    }
}

/// Classify a session's sales channel.
///
/// An explicit raw channel wins: anything mentioning "store" is offline,
/// anything mentioning "ecom" is online. Otherwise a session without a store
/// is online and one with a store is offline. `store_integration_id` must
/// already be normalized.
pub fn classify_channel(raw_channel: Option<&str>, store_integration_id: Option<&str>) -> Channel {
    let raw_channel = raw_channel.map(str::to_lowercase).unwrap_or_default();

    if raw_channel.contains("store") {
        Channel::Offline
    } else if raw_channel.contains("ecom") {
        Channel::Online
    } else if store_integration_id.map_or(true, str::is_empty) {
        Channel::Online
    } else {
        Channel::Offline
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_738_400_000 + secs, 0).unwrap()
    }

    fn raw(row_id: i64, session_id: &str, load_ts: DateTime<Utc>) -> RawSession {
        RawSession {
            row_id,
            session_id: session_id.to_string(),
            created_at: None,
            state: None,
            total_usd: None,
            number_of_cart_items: None,
            store_integration_id: None,
            channel: None,
            source_file: None,
            load_ts,
        }
    }

    #[test]
    fn test_latest_ingested_row_wins() {
        let mut older = raw(1, "S1", at(0));
        older.created_at = Some(" 2025-02-01T10:00:00 UTC".to_string());
        let mut newer = raw(2, "S1", at(60));
        newer.created_at = Some("2025-02-01T10:05:00 UTC".to_string());

        // Append order must not matter, only the ingestion timestamp.
        let sessions = deduplicate_sessions(vec![newer, older]);

        assert_eq!(sessions.len(), 1);
        assert_eq!(
            sessions[0].created_at,
            NaiveDateTime::parse_from_str("2025-02-01 10:05:00", "%Y-%m-%d %H:%M:%S").ok()
        );
        assert_eq!(sessions[0].source_load_ts, at(60));
    }

    #[test]
    fn test_equal_load_ts_prefers_later_row() {
        let mut first = raw(7, "S1", at(0));
        first.state = Some("open".to_string());
        let mut second = raw(9, "S1", at(0));
        second.state = Some("closed".to_string());

        let sessions = deduplicate_sessions(vec![second.clone(), first.clone()]);
        assert_eq!(sessions[0].state.as_deref(), Some("closed"));

        let sessions = deduplicate_sessions(vec![first, second]);
        assert_eq!(sessions[0].state.as_deref(), Some("closed"));
    }

    #[test]
    fn test_one_row_per_session_in_id_order() {
        let sessions = deduplicate_sessions(vec![
            raw(1, "b", at(0)),
            raw(2, "a", at(0)),
            raw(3, "b", at(5)),
            raw(4, "c", at(1)),
        ]);

        let ids: Vec<_> = sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_fields_are_normalized() {
        let mut row = raw(1, "S1", at(0));
        row.state = Some("  Closed ".to_string());
        row.total_usd = Some("100.00".to_string());
        row.number_of_cart_items = Some("three".to_string());
        row.store_integration_id = Some("   ".to_string());

        let session = &deduplicate_sessions(vec![row])[0];
        assert_eq!(session.state.as_deref(), Some("closed"));
        assert_eq!(session.total_usd, Some(Decimal::new(10000, 2)));
        assert_eq!(session.number_of_cart_items, None);
        assert_eq!(session.store_integration_id, None);
        assert_eq!(session.channel, Channel::Online);
    }

    #[test]
    fn test_empty_input() {
        assert!(deduplicate_sessions(Vec::new()).is_empty());
    }

    #[test]
    fn test_channel_precedence() {
        assert_eq!(classify_channel(Some("In-Store"), None), Channel::Offline);
        // "store" is checked before "ecom"
        assert_eq!(classify_channel(Some("ecom-store"), None), Channel::Offline);
        assert_eq!(classify_channel(Some("ECOM-web"), Some("st-1")), Channel::Online);
        assert_eq!(classify_channel(Some("kiosk"), None), Channel::Online);
        assert_eq!(classify_channel(None, None), Channel::Online);
        assert_eq!(classify_channel(None, Some("st-1")), Channel::Offline);
        assert_eq!(classify_channel(Some(""), Some("st-1")), Channel::Offline);
    }
}
