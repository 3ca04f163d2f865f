//! SQLite store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::warn;

use formpilot_protocols::{
    ExecutionRecord, FillMethod, LearningEntry, LearningStore, Recipe, RecipeStore, StoreError,
};

use crate::schema::init_schema;

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;

/// SQLite-backed recipe and learning store.
///
/// One connection serves both traits; stat updates are single atomic
/// UPDATE statements so concurrent attempts never lose increments.
pub struct SqliteStore {
    conn: Connection,
}

/// Raw recipe row; steps stay JSON text until decoded outside the
/// connection closure so corruption maps to a keyed error.
struct RecipeRow {
    platform_key: String,
    ats_type: String,
    steps_json: String,
    version: u32,
    recording_cost: f64,
    replay_cost: f64,
    times_used: u32,
    failure_count: u32,
    success_rate: f64,
    total_saved: f64,
    last_used: Option<String>,
    last_failure: Option<String>,
}

impl SqliteStore {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.call(|conn| init_schema(conn))
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(Self { conn })
    }

    /// Create a new file-backed database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.call(|conn| init_schema(conn))
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(Self { conn })
    }

    fn decode_row(row: RecipeRow) -> Result<Recipe, StoreError> {
        let steps = serde_json::from_str(&row.steps_json).map_err(|e| StoreError::Corrupt {
            key: row.platform_key.clone(),
            message: e.to_string(),
        })?;
        Ok(Recipe {
            platform_key: row.platform_key,
            ats_type: row.ats_type,
            steps,
            version: row.version,
            recording_cost: row.recording_cost,
            replay_cost: row.replay_cost,
            times_used: row.times_used,
            failure_count: row.failure_count,
            success_rate: row.success_rate,
            total_saved: row.total_saved,
            last_used: parse_timestamp(row.last_used.as_deref()),
            last_failure: parse_timestamp(row.last_failure.as_deref()),
        })
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn read_row(row: &rusqlite::Row<'_>) -> Result<RecipeRow, rusqlite::Error> {
    Ok(RecipeRow {
        platform_key: row.get(0)?,
        ats_type: row.get(1)?,
        steps_json: row.get(2)?,
        version: row.get(3)?,
        recording_cost: row.get(4)?,
        replay_cost: row.get(5)?,
        times_used: row.get(6)?,
        failure_count: row.get(7)?,
        success_rate: row.get(8)?,
        total_saved: row.get(9)?,
        last_used: row.get(10)?,
        last_failure: row.get(11)?,
    })
}

const RECIPE_COLUMNS: &str = "platform_key, ats_type, steps, version, recording_cost, \
     replay_cost, times_used, failure_count, success_rate, total_saved, last_used, last_failure";

fn method_text(method: FillMethod) -> &'static str {
    match method {
        FillMethod::Replay => "REPLAY",
        FillMethod::Record => "RECORD",
    }
}

#[async_trait]
impl RecipeStore for SqliteStore {
    async fn get(&self, platform_key: &str) -> Result<Option<Recipe>, StoreError> {
        let key = platform_key.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM recipes WHERE platform_key = ?1",
                    RECIPE_COLUMNS
                ))?;
                match stmt.query_row([&key], read_row) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        row.map(Self::decode_row).transpose()
    }

    async fn upsert(&self, recipe: &Recipe) -> Result<u32, StoreError> {
        let key = recipe.platform_key.clone();
        let ats_type = recipe.ats_type.clone();
        let steps_json =
            serde_json::to_string(&recipe.steps).map_err(|e| StoreError::Query(e.to_string()))?;
        let recording_cost = recipe.recording_cost;
        let replay_cost = recipe.replay_cost;
        let now = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let existing: Option<u32> = match tx.query_row(
                    "SELECT version FROM recipes WHERE platform_key = ?1",
                    [&key],
                    |row| row.get(0),
                ) {
                    Ok(v) => Some(v),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                };

                let version = match existing {
                    Some(v) => {
                        // Re-recording replaces the plan; usage stats survive.
                        tx.execute(
                            "UPDATE recipes SET ats_type = ?2, steps = ?3, version = ?4,
                             recording_cost = ?5, replay_cost = ?6, updated_at = ?7
                             WHERE platform_key = ?1",
                            params![key, ats_type, steps_json, v + 1, recording_cost, replay_cost, now],
                        )?;
                        v + 1
                    }
                    None => {
                        tx.execute(
                            "INSERT INTO recipes (platform_key, ats_type, steps, version,
                             recording_cost, replay_cost, created_at, updated_at)
                             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?6)",
                            params![key, ats_type, steps_json, recording_cost, replay_cost, now],
                        )?;
                        1
                    }
                };

                tx.commit()?;
                Ok(version)
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn record_execution(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let key = record.platform_key.clone();
        let success = record.success as i64;
        let method = method_text(record.method);
        let cost = record.cost;
        let error = record.error.clone();
        let timestamp = record.timestamp.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO executions (id, platform_key, success, method, cost, error, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![id, key, success, method, cost, error, timestamp],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn increment_stats(
        &self,
        platform_key: &str,
        success: bool,
        saved: f64,
    ) -> Result<(), StoreError> {
        let key = platform_key.to_string();
        let failure_delta: i64 = if success { 0 } else { 1 };
        let now = Utc::now().to_rfc3339();

        let updated = self
            .conn
            .call(move |conn| {
                // Single atomic statement; the right-hand sides all read the
                // pre-update row, so concurrent bumps serialize correctly.
                let updated = conn.execute(
                    "UPDATE recipes SET
                        times_used = times_used + 1,
                        failure_count = failure_count + ?2,
                        success_rate = CAST(times_used + 1 - failure_count - ?2 AS REAL)
                            / (times_used + 1),
                        total_saved = total_saved + ?3,
                        last_used = ?4,
                        last_failure = CASE WHEN ?2 = 0 THEN last_failure ELSE ?4 END,
                        updated_at = ?4
                     WHERE platform_key = ?1",
                    params![key, failure_delta, saved, now],
                )?;
                Ok(updated)
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        if updated == 0 {
            warn!(platform_key, "Stat increment matched no recipe");
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Recipe>, StoreError> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM recipes ORDER BY platform_key",
                    RECIPE_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], read_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        // A single corrupt row must not hide the rest of the report.
        let mut recipes = Vec::with_capacity(rows.len());
        for row in rows {
            let key = row.platform_key.clone();
            match Self::decode_row(row) {
                Ok(recipe) => recipes.push(recipe),
                Err(e) => warn!(platform_key = %key, "Skipping corrupt recipe: {}", e),
            }
        }
        Ok(recipes)
    }
}

#[async_trait]
impl LearningStore for SqliteStore {
    async fn record(&self, entry: &LearningEntry) -> Result<(), StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let url = entry.url.clone();
        let company = entry.company.clone();
        let fields =
            serde_json::to_string(&entry.fields).map_err(|e| StoreError::Query(e.to_string()))?;
        let responses = entry.responses.to_string();
        let issues = entry.issues.clone();
        let solution = entry.solution.clone();
        let timestamp = entry.timestamp.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO recovery_learnings
                     (id, url, company, fields, responses, issues, solution, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![id, url, company, fields, responses, issues, solution, timestamp],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }
}
