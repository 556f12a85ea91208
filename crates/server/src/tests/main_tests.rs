use super::*;
use axum::{body, http::Request};
use shared::domain::{Record, RecordValue, ITEMS_RECORD_TYPE, TEXT_FIELD};
use shared::protocol::SortDescriptor;
use tower::ServiceExt;

async fn test_app() -> Router {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    build_router(Arc::new(AppState {
        api: ApiContext { storage },
    }))
}

fn json_request(method: &str, uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("request")
}

async fn save_text(app: &Router, text: &str) -> Record {
    let mut record = Record::new(ITEMS_RECORD_TYPE);
    record.set_field(TEXT_FIELD, text);
    let request = json_request(
        "POST",
        "/records",
        serde_json::to_string(&SaveRecordRequest { record }).expect("json"),
    );
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let dto: SaveRecordResponse = serde_json::from_slice(&body).expect("json");
    dto.record.expect("saved record")
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let app = test_app().await;
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn save_fetch_and_delete_routes_work() {
    let app = test_app().await;
    let saved = save_text(&app, "buy milk").await;
    let record_id = saved.record_id.clone().expect("id");

    let fetch = Request::get(format!("/records/{record_id}"))
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(fetch).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let dto: FetchRecordResponse = serde_json::from_slice(&body).expect("json");
    assert_eq!(
        dto.record.expect("record").field(TEXT_FIELD),
        Some(&RecordValue::from("buy milk"))
    );

    let delete = Request::delete(format!("/records/{record_id}"))
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(delete).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let dto: DeleteRecordResponse = serde_json::from_slice(&body).expect("json");
    assert_eq!(dto.record_id, Some(record_id.clone()));

    let fetch_again = Request::get(format!("/records/{record_id}"))
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(fetch_again).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let err: ApiError = serde_json::from_slice(&body).expect("json");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn query_streams_json_lines_newest_first_then_done() {
    let app = test_app().await;
    for text in ["first", "second", "third"] {
        save_text(&app, text).await;
    }

    let query = RecordQuery {
        record_type: ITEMS_RECORD_TYPE.to_string(),
        sort: SortDescriptor::newest_first(),
        limit: 2,
        desired_keys: Some(vec![TEXT_FIELD.to_string()]),
    };
    let request = json_request(
        "POST",
        "/records/query",
        serde_json::to_string(&query).expect("json"),
    );
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE),
        Some(&HeaderValue::from_static("application/x-ndjson"))
    );

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let events: Vec<QueryEvent> = std::str::from_utf8(&body)
        .expect("utf8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("event"))
        .collect();

    assert_eq!(events.len(), 3);
    let texts: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            QueryEvent::Record { record } => record
                .field(TEXT_FIELD)
                .and_then(RecordValue::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["third".to_string(), "second".to_string()]);
    assert!(matches!(events.last(), Some(QueryEvent::Done)));
}

#[tokio::test]
async fn query_with_empty_type_is_bad_request() {
    let app = test_app().await;
    let request = json_request(
        "POST",
        "/records/query",
        serde_json::json!({
            "record_type": "",
            "sort": { "key": "created_at", "ascending": false },
            "limit": 50
        })
        .to_string(),
    );
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
