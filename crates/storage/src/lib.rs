use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{Record, RecordId, RecordValue},
    protocol::{RecordQuery, SortKey},
};

const RECORD_COLUMNS: &str =
    "record_id, record_type, created_at_micros, modified_at_micros, fields_json";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Creates a record, assigning its id and timestamps.
    pub async fn insert_record(
        &self,
        record_type: &str,
        fields: &BTreeMap<String, RecordValue>,
    ) -> Result<Record> {
        let record_id = RecordId::generate();
        let now = now_micros();
        let fields_json = serde_json::to_string(fields).context("failed to encode record fields")?;

        sqlx::query(
            "INSERT INTO records (record_id, record_type, created_at_micros, modified_at_micros, fields_json)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record_id.as_str())
        .bind(record_type)
        .bind(now)
        .bind(now)
        .bind(&fields_json)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert {record_type} record"))?;

        Ok(Record {
            record_type: record_type.to_string(),
            record_id: Some(record_id),
            created_at: Some(micros_to_datetime(now)?),
            modified_at: Some(micros_to_datetime(now)?),
            fields: fields.clone(),
        })
    }

    /// Replaces the fields of an existing record. `None` when no record has that id.
    pub async fn update_record_fields(
        &self,
        record_id: &RecordId,
        fields: &BTreeMap<String, RecordValue>,
    ) -> Result<Option<Record>> {
        let fields_json = serde_json::to_string(fields).context("failed to encode record fields")?;
        let row = sqlx::query(&format!(
            "UPDATE records SET fields_json = ?, modified_at_micros = ?
             WHERE record_id = ?
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(&fields_json)
        .bind(now_micros())
        .bind(record_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update record {record_id}"))?;

        row.as_ref().map(record_from_row).transpose()
    }

    pub async fn fetch_record(&self, record_id: &RecordId) -> Result<Option<Record>> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE record_id = ?"
        ))
        .bind(record_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to fetch record {record_id}"))?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Returns `false` when nothing was deleted.
    pub async fn delete_record(&self, record_id: &RecordId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM records WHERE record_id = ?")
            .bind(record_id.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete record {record_id}"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Records of one type, ordered by a server-assigned timestamp; insertion order breaks ties.
    pub async fn query_records(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        let column = match query.sort.key {
            SortKey::CreatedAt => "created_at_micros",
            SortKey::ModifiedAt => "modified_at_micros",
        };
        let direction = if query.sort.ascending { "ASC" } else { "DESC" };

        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM records
             WHERE record_type = ?
             ORDER BY {column} {direction}, seq {direction}
             LIMIT ?"
        ))
        .bind(&query.record_type)
        .bind(i64::from(query.effective_limit()))
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to query {} records", query.record_type))?;

        rows.iter()
            .map(|row| {
                record_from_row(row).map(|record| record.project(query.desired_keys.as_deref()))
            })
            .collect()
    }
}

fn record_from_row(row: &SqliteRow) -> Result<Record> {
    let record_id: String = row.try_get("record_id")?;
    let fields_json: String = row.try_get("fields_json")?;
    let fields: BTreeMap<String, RecordValue> = serde_json::from_str(&fields_json)
        .with_context(|| format!("corrupt fields for record {record_id}"))?;

    Ok(Record {
        record_type: row.try_get("record_type")?,
        created_at: Some(micros_to_datetime(row.try_get("created_at_micros")?)?),
        modified_at: Some(micros_to_datetime(row.try_get("modified_at_micros")?)?),
        record_id: Some(RecordId(record_id)),
        fields,
    })
}

fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

fn micros_to_datetime(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| anyhow!("timestamp out of range: {micros}"))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
