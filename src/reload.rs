//! Full reload of the output datasets.
//!
//! A reload reads every raw row, rebuilds `canonical_sessions`,
//! `effect_rollups` and `merged_sessions`, and swaps them in as one SQLite
//! transaction. Readers see either the previous snapshot or the new one.

use std::fmt;
use std::time::Instant;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::storage::{OutputStore, RawStore, StorageError};
use crate::transform::{deduplicate_sessions, merge_sessions, rollup_effects, TransformError};

/// Step of a reload, used to attribute failures and timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Begin,
    Clear,
    CanonicalSessions,
    EffectRollups,
    MergedSessions,
    Commit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Begin => "begin",
            Stage::Clear => "clear",
            Stage::CanonicalSessions => "canonical_sessions",
            Stage::EffectRollups => "effect_rollups",
            Stage::MergedSessions => "merged_sessions",
            Stage::Commit => "commit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed reload. Nothing from the failed run is visible afterwards.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("reload failed during {stage}: {source}")]
    Stage { stage: Stage, source: StorageError },

    #[error("reload failed during {stage}: {source}")]
    Transform { stage: Stage, source: TransformError },
}

impl ReloadError {
    /// Stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            ReloadError::Stage { stage, .. } | ReloadError::Transform { stage, .. } => *stage,
        }
    }

    /// Engine error code of the underlying failure, if any.
    pub fn code(&self) -> Option<String> {
        match self {
            ReloadError::Stage { source, .. } => source.code(),
            ReloadError::Transform { .. } => None,
        }
    }
}

fn transform_at(stage: Stage) -> impl FnOnce(TransformError) -> ReloadError {
    move |source| ReloadError::Transform { stage, source }
}

fn at_stage<E: Into<StorageError>>(stage: Stage) -> impl FnOnce(E) -> ReloadError {
    move |e| ReloadError::Stage {
        stage,
        source: e.into(),
    }
}

/// Runs the full reload as one unit of work.
///
/// Not safe to run concurrently with itself against the same database; a
/// second writer blocks on `BEGIN IMMEDIATE` until the busy timeout expires.
#[derive(Debug, Clone)]
pub struct ReloadController {
    pool: SqlitePool,
    discount_effect_types: Vec<String>,
}

impl ReloadController {
    /// Create a controller over `pool` applying the rules in `pipeline`.
    pub fn new(pool: SqlitePool, pipeline: &PipelineConfig) -> Self {
        Self {
            pool,
            discount_effect_types: pipeline.discount_effect_types.clone(),
        }
    }

    /// Rebuild all three output datasets from the raw tables.
    ///
    /// Per-stage row counts and timings are emitted as tracing events. On
    /// error the transaction is rolled back and the previous snapshot stays
    /// in place.
    pub async fn run(&self) -> Result<(), ReloadError> {
        let started = Instant::now();
        info!("reload_started");

        let mut conn = self.pool.acquire().await.map_err(at_stage(Stage::Begin))?;

        // BEGIN IMMEDIATE takes the write lock upfront so a concurrent run
        // fails on the busy timeout instead of deadlocking mid-reload.
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(at_stage(Stage::Begin))?;

        let result = match self.reload(&mut conn).await {
            Ok(counts) => match sqlx::query("COMMIT").execute(&mut *conn).await {
                Ok(_) => Ok(counts),
                Err(e) => Err(at_stage(Stage::Commit)(e)),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(counts) => {
                info!(
                    canonical_sessions = counts.canonical_sessions,
                    effect_rollups = counts.effect_rollups,
                    merged_sessions = counts.merged_sessions,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "reload_complete"
                );
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    warn!(error = %rollback, "Rollback after failed reload did not complete");
                }
                error!(
                    stage = %e.stage(),
                    code = e.code().as_deref().unwrap_or(""),
                    error = %e,
                    "reload_failed"
                );
                Err(e)
            }
        }
    }

    async fn reload(&self, conn: &mut SqliteConnection) -> Result<RowCounts, ReloadError> {
        let timer = Instant::now();
        let removed = OutputStore::clear(conn).await.map_err(at_stage(Stage::Clear))?;
        stage_complete(Stage::Clear, removed, timer);

        let timer = Instant::now();
        let raw_sessions = RawStore::load_sessions(conn)
            .await
            .map_err(at_stage(Stage::CanonicalSessions))?;
        let sessions = deduplicate_sessions(raw_sessions);
        let canonical_sessions = OutputStore::write_canonical_sessions(conn, &sessions)
            .await
            .map_err(at_stage(Stage::CanonicalSessions))?;
        stage_complete(Stage::CanonicalSessions, canonical_sessions, timer);

        let timer = Instant::now();
        let raw_effects = RawStore::load_effects(conn)
            .await
            .map_err(at_stage(Stage::EffectRollups))?;
        let rollups = rollup_effects(raw_effects, &self.discount_effect_types)
            .map_err(transform_at(Stage::EffectRollups))?;
        let effect_rollups = OutputStore::write_effect_rollups(conn, &rollups)
            .await
            .map_err(at_stage(Stage::EffectRollups))?;
        stage_complete(Stage::EffectRollups, effect_rollups, timer);

        let timer = Instant::now();
        let merged =
            merge_sessions(&sessions, &rollups).map_err(transform_at(Stage::MergedSessions))?;
        let merged_sessions = OutputStore::write_merged_sessions(conn, &merged)
            .await
            .map_err(at_stage(Stage::MergedSessions))?;
        stage_complete(Stage::MergedSessions, merged_sessions, timer);

        Ok(RowCounts {
            canonical_sessions,
            effect_rollups,
            merged_sessions,
        })
    }
}

struct RowCounts {
    canonical_sessions: u64,
    effect_rollups: u64,
    merged_sessions: u64,
}

fn stage_complete(stage: Stage, rows: u64, started: Instant) {
    info!(
        stage = %stage,
        rows,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "reload_stage_complete"
    );
}
