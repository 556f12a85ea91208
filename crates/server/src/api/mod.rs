use shared::{
    domain::{Record, RecordId},
    error::{ApiError, ErrorCode},
    protocol::RecordQuery,
};
use storage::Storage;
use tracing::debug;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

/// Creates the record when it carries no id, otherwise overwrites the stored record's fields.
pub async fn save_record(ctx: &ApiContext, record: Record) -> Result<Option<Record>, ApiError> {
    if record.record_type.trim().is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "record_type must not be empty",
        ));
    }

    match record.record_id {
        None => {
            let saved = ctx
                .storage
                .insert_record(&record.record_type, &record.fields)
                .await
                .map_err(internal)?;
            debug!(record_type = %saved.record_type, record_id = ?saved.record_id, "record created");
            Ok(Some(saved))
        }
        Some(record_id) => {
            let saved = ctx
                .storage
                .update_record_fields(&record_id, &record.fields)
                .await
                .map_err(internal)?
                .ok_or_else(|| not_found(&record_id))?;
            debug!(%record_id, "record updated");
            Ok(Some(saved))
        }
    }
}

pub async fn fetch_record(ctx: &ApiContext, record_id: &RecordId) -> Result<Record, ApiError> {
    ctx.storage
        .fetch_record(record_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(record_id))
}

pub async fn delete_record(ctx: &ApiContext, record_id: RecordId) -> Result<RecordId, ApiError> {
    let deleted = ctx
        .storage
        .delete_record(&record_id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found(&record_id));
    }
    debug!(%record_id, "record deleted");
    Ok(record_id)
}

pub async fn query_records(ctx: &ApiContext, query: &RecordQuery) -> Result<Vec<Record>, ApiError> {
    if query.record_type.trim().is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "record_type must not be empty",
        ));
    }
    ctx.storage.query_records(query).await.map_err(internal)
}

fn not_found(record_id: &RecordId) -> ApiError {
    ApiError::new(ErrorCode::NotFound, format!("record {record_id} not found"))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
