//! SQLite raw landing tables.

use chrono::{DateTime, Utc};
use sea_query::{Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use super::INSERT_CHUNK_SIZE;
use crate::model::{NewRawEffect, NewRawSession, RawEffect, RawSession};
use crate::storage::helpers::{format_load_ts, parse_load_ts};
use crate::storage::schema::{RawEffects, RawSessions};
use crate::storage::Result;

/// Append-only store for ingested session and effect rows.
#[derive(Debug, Clone)]
pub struct RawStore {
    pool: SqlitePool,
}

impl RawStore {
    /// Create a new raw store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one ingestion batch of sessions, all tagged with `load_ts`.
    ///
    /// The batch lands atomically. Returns the number of rows written.
    pub async fn append_sessions(&self, rows: &[NewRawSession], load_ts: DateTime<Utc>) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let load_ts = format_load_ts(load_ts);
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
            let mut stmt = Query::insert();
            stmt.into_table(RawSessions::Table).columns([
                RawSessions::SessionId,
                RawSessions::CreatedAt,
                RawSessions::State,
                RawSessions::TotalUsd,
                RawSessions::NumberOfCartItems,
                RawSessions::StoreIntegrationId,
                RawSessions::Channel,
                RawSessions::SourceFile,
                RawSessions::LoadTs,
            ]);
            for row in chunk {
                stmt.values_panic([
                    row.session_id.as_str().into(),
                    row.created_at.clone().into(),
                    row.state.clone().into(),
                    row.total_usd.clone().into(),
                    row.number_of_cart_items.clone().into(),
                    row.store_integration_id.clone().into(),
                    row.channel.clone().into(),
                    row.source_file.clone().into(),
                    load_ts.as_str().into(),
                ]);
            }

            let query = stmt.to_string(SqliteQueryBuilder);
            written += sqlx::query(&query).execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        debug!(rows = written, load_ts = %load_ts, "Appended raw sessions");
        Ok(written)
    }

    /// Append one ingestion batch of effects, all tagged with `load_ts`.
    pub async fn append_effects(&self, rows: &[NewRawEffect], load_ts: DateTime<Utc>) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let load_ts = format_load_ts(load_ts);
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
            let mut stmt = Query::insert();
            stmt.into_table(RawEffects::Table).columns([
                RawEffects::EffectId,
                RawEffects::SessionId,
                RawEffects::EffectType,
                RawEffects::Value,
                RawEffects::SourceFile,
                RawEffects::LoadTs,
            ]);
            for row in chunk {
                stmt.values_panic([
                    row.effect_id.clone().into(),
                    row.session_id.as_str().into(),
                    row.effect_type.clone().into(),
                    row.value.clone().into(),
                    row.source_file.clone().into(),
                    load_ts.as_str().into(),
                ]);
            }

            let query = stmt.to_string(SqliteQueryBuilder);
            written += sqlx::query(&query).execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        debug!(rows = written, load_ts = %load_ts, "Appended raw effects");
        Ok(written)
    }

    /// Read every raw session on an already-open connection.
    pub async fn load_sessions(conn: &mut SqliteConnection) -> Result<Vec<RawSession>> {
        let query = Query::select()
            .columns([
                RawSessions::Id,
                RawSessions::SessionId,
                RawSessions::CreatedAt,
                RawSessions::State,
                RawSessions::TotalUsd,
                RawSessions::NumberOfCartItems,
                RawSessions::StoreIntegrationId,
                RawSessions::Channel,
                RawSessions::SourceFile,
                RawSessions::LoadTs,
            ])
            .from(RawSessions::Table)
            .order_by(RawSessions::Id, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let load_ts: String = row.try_get("load_ts")?;
            sessions.push(RawSession {
                row_id: row.try_get("id")?,
                session_id: row.try_get("session_id")?,
                created_at: row.try_get("created_at")?,
                state: row.try_get("state")?,
                total_usd: row.try_get("total_usd")?,
                number_of_cart_items: row.try_get("number_of_cart_items")?,
                store_integration_id: row.try_get("store_integration_id")?,
                channel: row.try_get("channel")?,
                source_file: row.try_get("source_file")?,
                load_ts: parse_load_ts("raw_sessions.load_ts", &load_ts)?,
            });
        }

        Ok(sessions)
    }

    /// Read every raw effect on an already-open connection.
    pub async fn load_effects(conn: &mut SqliteConnection) -> Result<Vec<RawEffect>> {
        let query = Query::select()
            .columns([
                RawEffects::Id,
                RawEffects::EffectId,
                RawEffects::SessionId,
                RawEffects::EffectType,
                RawEffects::Value,
                RawEffects::SourceFile,
                RawEffects::LoadTs,
            ])
            .from(RawEffects::Table)
            .order_by(RawEffects::Id, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;

        let mut effects = Vec::with_capacity(rows.len());
        for row in rows {
            let load_ts: String = row.try_get("load_ts")?;
            effects.push(RawEffect {
                row_id: row.try_get("id")?,
                effect_id: row.try_get("effect_id")?,
                session_id: row.try_get("session_id")?,
                effect_type: row.try_get("effect_type")?,
                value: row.try_get("value")?,
                source_file: row.try_get("source_file")?,
                load_ts: parse_load_ts("raw_effects.load_ts", &load_ts)?,
            });
        }

        Ok(effects)
    }
}
