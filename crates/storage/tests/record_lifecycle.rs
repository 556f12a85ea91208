use std::collections::BTreeMap;

use shared::{
    domain::{RecordValue, ITEMS_RECORD_TYPE, TEXT_FIELD},
    protocol::{RecordQuery, SortDescriptor},
};
use storage::Storage;

#[tokio::test]
async fn saved_then_deleted_record_never_reappears_in_queries() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let fields = BTreeMap::from([(TEXT_FIELD.to_string(), RecordValue::from("buy milk"))]);

    let kept = storage
        .insert_record(ITEMS_RECORD_TYPE, &fields)
        .await
        .expect("insert kept");
    let doomed = storage
        .insert_record(ITEMS_RECORD_TYPE, &fields)
        .await
        .expect("insert doomed");
    let doomed_id = doomed.record_id.expect("doomed id");

    assert!(storage.delete_record(&doomed_id).await.expect("delete"));

    let query = RecordQuery {
        record_type: ITEMS_RECORD_TYPE.to_string(),
        sort: SortDescriptor::newest_first(),
        limit: 50,
        desired_keys: Some(vec![TEXT_FIELD.to_string()]),
    };
    let records = storage.query_records(&query).await.expect("query");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_id, kept.record_id);
    assert!(records
        .iter()
        .all(|record| record.record_id.as_ref() != Some(&doomed_id)));
}
