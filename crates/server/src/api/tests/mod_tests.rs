use super::*;
use shared::{
    domain::{RecordValue, ITEMS_RECORD_TYPE, TEXT_FIELD},
    protocol::SortDescriptor,
};

async fn setup() -> ApiContext {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    ApiContext { storage }
}

fn item_record(text: &str) -> Record {
    let mut record = Record::new(ITEMS_RECORD_TYPE);
    record.set_field(TEXT_FIELD, text);
    record
}

#[tokio::test]
async fn save_without_id_creates_record() {
    let ctx = setup().await;
    let saved = save_record(&ctx, item_record("buy milk"))
        .await
        .expect("save")
        .expect("record");

    assert!(saved.record_id.is_some());
    assert_eq!(saved.field(TEXT_FIELD), Some(&RecordValue::from("buy milk")));
}

#[tokio::test]
async fn save_with_id_overwrites_existing_fields() {
    let ctx = setup().await;
    let created = save_record(&ctx, item_record("draft"))
        .await
        .expect("save")
        .expect("record");

    let mut edited = created.clone();
    edited.set_field(TEXT_FIELD, "final");
    let updated = save_record(&ctx, edited)
        .await
        .expect("update")
        .expect("record");

    assert_eq!(updated.record_id, created.record_id);
    assert_eq!(updated.field(TEXT_FIELD), Some(&RecordValue::from("final")));
}

#[tokio::test]
async fn save_with_unknown_id_is_not_found() {
    let ctx = setup().await;
    let mut record = item_record("orphan");
    record.record_id = Some(RecordId::new("missing"));

    let err = save_record(&ctx, record).await.expect_err("not found");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn empty_record_type_is_rejected() {
    let ctx = setup().await;
    let err = save_record(&ctx, Record::new("  "))
        .await
        .expect_err("validation");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn fetch_and_delete_report_missing_records() {
    let ctx = setup().await;
    let missing = RecordId::new("missing");

    let err = fetch_record(&ctx, &missing).await.expect_err("fetch");
    assert_eq!(err.code, ErrorCode::NotFound);
    let err = delete_record(&ctx, missing).await.expect_err("delete");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn delete_returns_the_deleted_id() {
    let ctx = setup().await;
    let saved = save_record(&ctx, item_record("temporary"))
        .await
        .expect("save")
        .expect("record");
    let record_id = saved.record_id.expect("id");

    let deleted = delete_record(&ctx, record_id.clone())
        .await
        .expect("delete");
    assert_eq!(deleted, record_id);

    let query = RecordQuery {
        record_type: ITEMS_RECORD_TYPE.to_string(),
        sort: SortDescriptor::newest_first(),
        limit: 50,
        desired_keys: None,
    };
    let remaining = query_records(&ctx, &query).await.expect("query");
    assert!(remaining.is_empty());
}
