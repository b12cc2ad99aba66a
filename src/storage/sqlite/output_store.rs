//! SQLite output datasets written by the reload.

use sea_query::{Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::INSERT_CHUNK_SIZE;
use crate::model::{CanonicalSession, Channel, EffectRollup, MergedSession};
use crate::storage::helpers::{
    format_created_at, format_load_ts, parse_created_at, parse_decimal, parse_load_ts,
    parse_optional_decimal,
};
use crate::storage::schema::{CanonicalSessions, EffectRollups, MergedSessions};
use crate::storage::Result;

/// The three datasets rebuilt by every reload.
///
/// Writes take a caller-owned connection so they can share one transaction.
/// Reads go through the pool and always see the last committed snapshot.
#[derive(Debug, Clone)]
pub struct OutputStore {
    pool: SqlitePool,
}

impl OutputStore {
    /// Create a new output store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All canonical sessions, ordered by `session_id`.
    pub async fn canonical_sessions(&self) -> Result<Vec<CanonicalSession>> {
        let mut conn = self.pool.acquire().await?;
        Self::read_canonical_sessions(&mut conn).await
    }

    /// All effect rollups, ordered by `session_id`.
    pub async fn effect_rollups(&self) -> Result<Vec<EffectRollup>> {
        let mut conn = self.pool.acquire().await?;
        Self::read_effect_rollups(&mut conn).await
    }

    /// All merged sessions, ordered by `session_id`.
    pub async fn merged_sessions(&self) -> Result<Vec<MergedSession>> {
        let mut conn = self.pool.acquire().await?;
        Self::read_merged_sessions(&mut conn).await
    }

    /// Delete every output row, dependents first.
    ///
    /// `merged_sessions` references `canonical_sessions`, so it has to go
    /// before its parent. Returns the number of rows removed.
    pub async fn clear(conn: &mut SqliteConnection) -> Result<u64> {
        let statements = [
            Query::delete()
                .from_table(MergedSessions::Table)
                .to_string(SqliteQueryBuilder),
            Query::delete()
                .from_table(EffectRollups::Table)
                .to_string(SqliteQueryBuilder),
            Query::delete()
                .from_table(CanonicalSessions::Table)
                .to_string(SqliteQueryBuilder),
        ];

        let mut removed = 0;
        for statement in &statements {
            removed += sqlx::query(statement).execute(&mut *conn).await?.rows_affected();
        }
        Ok(removed)
    }

    /// Insert canonical sessions. Returns the number of rows written.
    pub async fn write_canonical_sessions(
        conn: &mut SqliteConnection,
        sessions: &[CanonicalSession],
    ) -> Result<u64> {
        let mut written = 0;

        for chunk in sessions.chunks(INSERT_CHUNK_SIZE) {
            let mut stmt = Query::insert();
            stmt.into_table(CanonicalSessions::Table).columns([
                CanonicalSessions::SessionId,
                CanonicalSessions::CreatedAt,
                CanonicalSessions::State,
                CanonicalSessions::TotalUsd,
                CanonicalSessions::NumberOfCartItems,
                CanonicalSessions::StoreIntegrationId,
                CanonicalSessions::Channel,
                CanonicalSessions::SourceLoadTs,
            ]);
            for session in chunk {
                stmt.values_panic([
                    session.session_id.as_str().into(),
                    session.created_at.map(format_created_at).into(),
                    session.state.clone().into(),
                    session.total_usd.map(|d| d.to_string()).into(),
                    session.number_of_cart_items.into(),
                    session.store_integration_id.clone().into(),
                    session.channel.as_str().into(),
                    format_load_ts(session.source_load_ts).into(),
                ]);
            }

            let query = stmt.to_string(SqliteQueryBuilder);
            written += sqlx::query(&query).execute(&mut *conn).await?.rows_affected();
        }

        Ok(written)
    }

    /// Insert effect rollups. Returns the number of rows written.
    pub async fn write_effect_rollups(conn: &mut SqliteConnection, rollups: &[EffectRollup]) -> Result<u64> {
        let mut written = 0;

        for chunk in rollups.chunks(INSERT_CHUNK_SIZE) {
            let mut stmt = Query::insert();
            stmt.into_table(EffectRollups::Table).columns([
                EffectRollups::SessionId,
                EffectRollups::DiscountAmountUsd,
                EffectRollups::RepresentativeEffectType,
                EffectRollups::SourceLoadTs,
            ]);
            for rollup in chunk {
                stmt.values_panic([
                    rollup.session_id.as_str().into(),
                    rollup.discount_amount_usd.to_string().into(),
                    rollup.representative_effect_type.as_str().into(),
                    format_load_ts(rollup.source_load_ts).into(),
                ]);
            }

            let query = stmt.to_string(SqliteQueryBuilder);
            written += sqlx::query(&query).execute(&mut *conn).await?.rows_affected();
        }

        Ok(written)
    }

    /// Insert merged sessions with their derived metrics. Returns the number
    /// of rows written.
    pub async fn write_merged_sessions(conn: &mut SqliteConnection, merged: &[MergedSession]) -> Result<u64> {
        let mut written = 0;

        for chunk in merged.chunks(INSERT_CHUNK_SIZE) {
            let mut stmt = Query::insert();
            stmt.into_table(MergedSessions::Table).columns([
                MergedSessions::SessionId,
                MergedSessions::CreatedAt,
                MergedSessions::State,
                MergedSessions::TotalUsd,
                MergedSessions::NumberOfCartItems,
                MergedSessions::StoreIntegrationId,
                MergedSessions::Channel,
                MergedSessions::DiscountAmountUsd,
                MergedSessions::NetRevenue,
                MergedSessions::DiscountDepth,
                MergedSessions::SourceLoadTs,
            ]);
            for row in chunk {
                stmt.values_panic([
                    row.session_id.as_str().into(),
                    row.created_at.map(format_created_at).into(),
                    row.state.clone().into(),
                    row.total_usd.map(|d| d.to_string()).into(),
                    row.number_of_cart_items.into(),
                    row.store_integration_id.clone().into(),
                    row.channel.as_str().into(),
                    row.discount_amount_usd.to_string().into(),
                    row.net_revenue.map(|d| d.to_string()).into(),
                    row.discount_depth.map(|d| d.to_string()).into(),
                    format_load_ts(row.source_load_ts).into(),
                ]);
            }

            let query = stmt.to_string(SqliteQueryBuilder);
            written += sqlx::query(&query).execute(&mut *conn).await?.rows_affected();
        }

        Ok(written)
    }

    async fn read_canonical_sessions(conn: &mut SqliteConnection) -> Result<Vec<CanonicalSession>> {
        let query = Query::select()
            .columns([
                CanonicalSessions::SessionId,
                CanonicalSessions::CreatedAt,
                CanonicalSessions::State,
                CanonicalSessions::TotalUsd,
                CanonicalSessions::NumberOfCartItems,
                CanonicalSessions::StoreIntegrationId,
                CanonicalSessions::Channel,
                CanonicalSessions::SourceLoadTs,
            ])
            .from(CanonicalSessions::Table)
            .order_by(CanonicalSessions::SessionId, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let channel: String = row.try_get("channel")?;
            let source_load_ts: String = row.try_get("source_load_ts")?;
            sessions.push(CanonicalSession {
                session_id: row.try_get("session_id")?,
                created_at: parse_created_at("canonical_sessions.created_at", row.try_get("created_at")?)?,
                state: row.try_get("state")?,
                total_usd: parse_optional_decimal("canonical_sessions.total_usd", row.try_get("total_usd")?)?,
                number_of_cart_items: row.try_get("number_of_cart_items")?,
                store_integration_id: row.try_get("store_integration_id")?,
                channel: channel.parse::<Channel>()?,
                source_load_ts: parse_load_ts("canonical_sessions.source_load_ts", &source_load_ts)?,
            });
        }

        Ok(sessions)
    }

    async fn read_effect_rollups(conn: &mut SqliteConnection) -> Result<Vec<EffectRollup>> {
        let query = Query::select()
            .columns([
                EffectRollups::SessionId,
                EffectRollups::DiscountAmountUsd,
                EffectRollups::RepresentativeEffectType,
                EffectRollups::SourceLoadTs,
            ])
            .from(EffectRollups::Table)
            .order_by(EffectRollups::SessionId, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;

        let mut rollups = Vec::with_capacity(rows.len());
        for row in rows {
            let discount: String = row.try_get("discount_amount_usd")?;
            let source_load_ts: String = row.try_get("source_load_ts")?;
            rollups.push(EffectRollup {
                session_id: row.try_get("session_id")?,
                discount_amount_usd: parse_decimal("effect_rollups.discount_amount_usd", &discount)?,
                representative_effect_type: row.try_get("representative_effect_type")?,
                source_load_ts: parse_load_ts("effect_rollups.source_load_ts", &source_load_ts)?,
            });
        }

        Ok(rollups)
    }

    async fn read_merged_sessions(conn: &mut SqliteConnection) -> Result<Vec<MergedSession>> {
        let query = Query::select()
            .columns([
                MergedSessions::SessionId,
                MergedSessions::CreatedAt,
                MergedSessions::State,
                MergedSessions::TotalUsd,
                MergedSessions::NumberOfCartItems,
                MergedSessions::StoreIntegrationId,
                MergedSessions::Channel,
                MergedSessions::DiscountAmountUsd,
                MergedSessions::NetRevenue,
                MergedSessions::DiscountDepth,
                MergedSessions::SourceLoadTs,
            ])
            .from(MergedSessions::Table)
            .order_by(MergedSessions::SessionId, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;

        let mut merged = Vec::with_capacity(rows.len());
        for row in rows {
            let channel: String = row.try_get("channel")?;
            let discount: String = row.try_get("discount_amount_usd")?;
            let source_load_ts: String = row.try_get("source_load_ts")?;
            merged.push(MergedSession {
                session_id: row.try_get("session_id")?,
                created_at: parse_created_at("merged_sessions.created_at", row.try_get("created_at")?)?,
                state: row.try_get("state")?,
                total_usd: parse_optional_decimal("merged_sessions.total_usd", row.try_get("total_usd")?)?,
                number_of_cart_items: row.try_get("number_of_cart_items")?,
                store_integration_id: row.try_get("store_integration_id")?,
                channel: channel.parse::<Channel>()?,
                discount_amount_usd: parse_decimal("merged_sessions.discount_amount_usd", &discount)?,
                net_revenue: parse_optional_decimal("merged_sessions.net_revenue", row.try_get("net_revenue")?)?,
                discount_depth: parse_optional_decimal(
                    "merged_sessions.discount_depth",
                    row.try_get("discount_depth")?,
                )?,
                source_load_ts: parse_load_ts("merged_sessions.source_load_ts", &source_load_ts)?,
            });
        }

        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDateTime, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::{connect_in_memory, StorageError};

    fn canonical(id: &str) -> CanonicalSession {
        CanonicalSession {
            session_id: id.to_string(),
            created_at: NaiveDateTime::parse_from_str("2025-02-01 10:05:00", "%Y-%m-%d %H:%M:%S").ok(),
            state: Some("closed".to_string()),
            total_usd: Some(Decimal::new(10000, 2)),
            number_of_cart_items: Some(3),
            store_integration_id: None,
            channel: Channel::Online,
            source_load_ts: Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap(),
        }
    }

    fn merged(id: &str) -> MergedSession {
        let session = canonical(id);
        MergedSession {
            session_id: session.session_id,
            created_at: session.created_at,
            state: session.state,
            total_usd: session.total_usd,
            number_of_cart_items: session.number_of_cart_items,
            store_integration_id: Some("store-9".to_string()),
            channel: Channel::Offline,
            discount_amount_usd: Decimal::new(1000, 2),
            net_revenue: Some(Decimal::new(9000, 2)),
            discount_depth: None,
            source_load_ts: session.source_load_ts,
        }
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let pool = connect_in_memory().await.expect("failed to open storage");
        let store = OutputStore::new(pool.clone());
        let rollup = EffectRollup {
            session_id: "S1".to_string(),
            discount_amount_usd: Decimal::new(1000, 2),
            representative_effect_type: "setDiscountPerItem".to_string(),
            source_load_ts: Utc.with_ymd_and_hms(2025, 2, 1, 13, 0, 0).unwrap(),
        };

        {
            let mut conn = pool.acquire().await.expect("acquire failed");
            OutputStore::write_canonical_sessions(&mut conn, &[canonical("S2"), canonical("S1")])
                .await
                .expect("write failed");
            OutputStore::write_effect_rollups(&mut conn, &[rollup.clone()])
                .await
                .expect("write failed");
            OutputStore::write_merged_sessions(&mut conn, &[merged("S1")])
                .await
                .expect("write failed");
        }

        let sessions = store.canonical_sessions().await.expect("read failed");
        assert_eq!(sessions, vec![canonical("S1"), canonical("S2")]);
        assert_eq!(store.effect_rollups().await.expect("read failed"), vec![rollup]);
        assert_eq!(store.merged_sessions().await.expect("read failed"), vec![merged("S1")]);
    }

    #[tokio::test]
    async fn test_decimal_text_is_preserved() {
        let pool = connect_in_memory().await.expect("failed to open storage");
        {
            let mut conn = pool.acquire().await.expect("acquire failed");
            OutputStore::write_canonical_sessions(&mut conn, &[canonical("S1")])
                .await
                .expect("write failed");
            OutputStore::write_merged_sessions(&mut conn, &[merged("S1")])
                .await
                .expect("write failed");
        }

        let stored: (String, String) =
            sqlx::query_as("SELECT total_usd, net_revenue FROM merged_sessions WHERE session_id = 'S1'")
                .fetch_one(&pool)
                .await
                .expect("query failed");
        assert_eq!(stored, ("100.00".to_string(), "90.00".to_string()));
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let pool = connect_in_memory().await.expect("failed to open storage");
        let store = OutputStore::new(pool.clone());
        let mut conn = pool.acquire().await.expect("acquire failed");

        OutputStore::write_canonical_sessions(&mut conn, &[canonical("S1"), canonical("S2")])
            .await
            .expect("write failed");
        OutputStore::write_merged_sessions(&mut conn, &[merged("S1")])
            .await
            .expect("write failed");

        let removed = OutputStore::clear(&mut conn).await.expect("clear failed");
        assert_eq!(removed, 3);
        drop(conn);

        assert!(store.canonical_sessions().await.unwrap().is_empty());
        assert!(store.merged_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merged_row_requires_canonical_parent() {
        let pool = connect_in_memory().await.expect("failed to open storage");
        let mut conn = pool.acquire().await.expect("acquire failed");

        let err = OutputStore::write_merged_sessions(&mut conn, &[merged("orphan")])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));
        assert!(err.code().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_decimal_is_reported() {
        let pool = connect_in_memory().await.expect("failed to open storage");
        sqlx::query(
            "INSERT INTO effect_rollups (session_id, discount_amount_usd, representative_effect_type, source_load_ts)
             VALUES ('S1', 'lots', 'x', '2025-02-01T00:00:00.000000Z')",
        )
        .execute(&pool)
        .await
        .expect("insert failed");

        let err = OutputStore::new(pool).effect_rollups().await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::InvalidDecimal { column: "effect_rollups.discount_amount_usd", .. }
        ));
    }
}
