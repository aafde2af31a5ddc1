//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

const LEDGER_CSV: &str = "Date,Amount,Where?,What?,Category,Source\n\
\"Sat, 03 May 2025\",25.50,Cafe Luna,Lunch,Food,Credit Card\n\
\"Sat, 10 May 2025\",12.00,Corner Deli,Sandwich,Food,Cash\n\
\"Mon, 12 May 2025\",150.00,Airline,Flight,Travel,Credit Card\n\
\"Sun, 01 Jun 2025\",15.50,Uber,Ride,Travel,Cash\n\
\"Mon, 02 Jun 2025\",85.00,Target,Supplies,Essentials,Debit Card\n\
\"Thu, 05 Jun 2025\",22.00,Uber,Ride,Travel,Cash\n";

const TEST_KEY: &str = "test-key-123";

fn seeded_db() -> Database {
    let db = Database::in_memory().unwrap();
    db.ingest_csv("seed.csv", LEDGER_CSV.as_bytes()).unwrap();
    db
}

fn setup_test_app() -> Router {
    let config = ServerConfig {
        require_auth: false,
        allowed_origins: vec![],
        ..Default::default()
    };
    create_router(seeded_db(), TallyConfig::default(), config)
}

fn setup_auth_app() -> Router {
    let config = ServerConfig {
        require_auth: true,
        api_keys: vec![TEST_KEY.to_string()],
        ..Default::default()
    };
    create_router(seeded_db(), TallyConfig::default(), config)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn query_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/query")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn multipart_request(filename: &str, content: &str) -> Request<Body> {
    let boundary = "tally-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
         Content-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
        b = boundary,
        f = filename,
        c = content
    );
    Request::builder()
        .method("POST")
        .uri("/api/ingest")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

// ========== Health ==========

#[tokio::test]
async fn test_health() {
    let app = setup_auth_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["app"], "tally");
}

#[tokio::test]
async fn test_security_headers() {
    let app = setup_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
}

// ========== Auth ==========

#[tokio::test]
async fn test_query_requires_api_key() {
    let app = setup_auth_app();

    let response = app
        .oneshot(query_request(serde_json::json!({
            "question": "How much did I spend on Food in 2025-05?"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Authentication required");
}

#[tokio::test]
async fn test_wrong_api_key_rejected() {
    let app = setup_auth_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/ingests")
                .header("authorization", "Bearer wrong-key-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_api_key_accepted() {
    let app = setup_auth_app();

    let mut request = query_request(serde_json::json!({
        "question": "How much did I spend on Food in 2025-05?"
    }));
    request.headers_mut().insert(
        "authorization",
        format!("Bearer {}", TEST_KEY).parse().unwrap(),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_validate_api_key() {
    let keys = vec!["alpha".to_string(), "bravo-key".to_string()];
    assert!(validate_api_key("alpha", &keys));
    assert!(validate_api_key("bravo-key", &keys));
    assert!(!validate_api_key("alph", &keys));
    assert!(!validate_api_key("", &keys));
    assert!(!validate_api_key("alpha", &[]));
}

#[test]
fn test_parse_api_keys() {
    assert_eq!(parse_api_keys("k1"), vec!["k1"]);
    assert_eq!(parse_api_keys(" k1 , ,k2,"), vec!["k1", "k2"]);
    assert!(parse_api_keys("").is_empty());
}

// ========== Query ==========

#[tokio::test]
async fn test_query_category_total() {
    let app = setup_test_app();

    let response = app
        .oneshot(query_request(serde_json::json!({
            "question": "How much did I spend on Food in 2025-05?"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["numbers"]["expense_total"], "37.50");
    assert_eq!(json["numbers"]["count"], 2);
    assert_eq!(json["evidence"].as_array().unwrap().len(), 2);
    assert_eq!(json["clarifying_question"], serde_json::Value::Null);
    assert_eq!(json["trace"]["intent"], "category_total");
    assert_eq!(json["trace"]["resolved_month"], "2025-05");
    assert_eq!(
        json["trace"]["filters_used"],
        serde_json::json!({"month": "2025-05", "kind": "expense", "category": "Food"})
    );
    assert_eq!(json["trace"]["evidence_count_returned"], 2);
}

#[tokio::test]
async fn test_query_trace_shape() {
    let app = setup_test_app();

    let response = app
        .oneshot(query_request(serde_json::json!({
            "question": "top merchants",
            "month": "2025-06"
        })))
        .await
        .unwrap();

    let json = get_body_json(response).await;
    let trace = json["trace"].as_object().unwrap();
    for key in [
        "intent",
        "resolved_month",
        "called_functions",
        "parameters",
        "filters_used",
        "evidence_count_returned",
        "notes",
    ] {
        assert!(trace.contains_key(key), "trace missing {}", key);
    }
    assert_eq!(json["trace"]["parameters"]["month_source"], "request");
    assert_eq!(json["numbers"]["Target"], "85.00");
}

#[tokio::test]
async fn test_query_without_month() {
    let app = setup_test_app();

    let response = app
        .oneshot(query_request(serde_json::json!({
            "question": "How much did I spend?"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json["clarifying_question"]
        .as_str()
        .unwrap()
        .contains("YYYY-MM"));
    assert_eq!(json["trace"]["intent"], "unknown");
    assert_eq!(json["trace"]["resolved_month"], serde_json::Value::Null);
    assert_eq!(json["evidence"], serde_json::json!([]));
}

#[tokio::test]
async fn test_query_rejects_evidence_limit_out_of_range() {
    for limit in [0, 101] {
        let app = setup_test_app();
        let response = app
            .oneshot(query_request(serde_json::json!({
                "question": "How much did I spend in 2025-05?",
                "limit_evidence": limit
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = get_body_json(response).await;
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("limit_evidence"));
    }
}

#[tokio::test]
async fn test_query_without_limit_uses_configured_default() {
    let config = TallyConfig {
        default_evidence_limit: 1,
        ..TallyConfig::default()
    };
    let server = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = create_router(seeded_db(), config, server);

    let response = app
        .oneshot(query_request(serde_json::json!({
            "question": "How much did I spend in 2025-06?"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["evidence"].as_array().unwrap().len(), 1);
    assert_eq!(json["trace"]["evidence_count_returned"], 1);
}

#[tokio::test]
async fn test_query_invalid_month_is_clarified() {
    let app = setup_test_app();

    let response = app
        .oneshot(query_request(serde_json::json!({
            "question": "How much did I spend?",
            "month": "2025-5"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json["clarifying_question"]
        .as_str()
        .unwrap()
        .starts_with("Invalid month format '2025-5'"));
}

// ========== Summary ==========

#[tokio::test]
async fn test_monthly_summary() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/summary/monthly?month=2025-06&top_k=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["month"], "2025-06");
    assert_eq!(json["totals"]["expense_total"], "122.50");
    assert_eq!(json["totals"]["transaction_count"], 3);
    assert_eq!(json["top_merchants"].as_array().unwrap().len(), 1);
    assert_eq!(json["top_merchants"][0]["name"], "Target");
    assert_eq!(json["by_source"][0]["name"], "Debit Card");
}

#[tokio::test]
async fn test_monthly_summary_invalid_month() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/summary/monthly?month=2025-13")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("01-12"));
}

#[tokio::test]
async fn test_monthly_summary_top_k_out_of_range() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/summary/monthly?month=2025-06&top_k=21")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Ingest ==========

#[tokio::test]
async fn test_ingest_upload() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = create_router(db.clone(), TallyConfig::default(), config);

    let response = app
        .oneshot(multipart_request("ledger.csv", LEDGER_CSV))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["row_count"], 6);
    assert_eq!(json["date_range"]["min"], "2025-05-03");
    assert_eq!(json["date_range"]["max"], "2025-06-05");
    assert!(json["notes"].as_str().unwrap().contains("Sign convention"));

    let ingests = db.list_ingests(10).unwrap();
    assert_eq!(ingests.len(), 1);
    assert_eq!(ingests[0].filename, "ledger.csv");
}

#[tokio::test]
async fn test_ingest_missing_column() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = create_router(db.clone(), TallyConfig::default(), config);

    let response = app
        .clone()
        .oneshot(multipart_request(
            "bad.csv",
            "Date,Amount\n\"Sat, 03 May 2025\",25.50\n",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["row_count"], 0);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Missing required columns"));
    let ingest_id = json["ingest_id"].as_str().unwrap().to_string();

    // The failure is part of ingest history
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/ingests/{}", ingest_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "failed");
}

#[tokio::test]
async fn test_ingest_missing_file_field() {
    let app = setup_test_app();
    let boundary = "tally-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{b}--\r\n",
        b = boundary
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/ingest")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Missing file field");
}

#[tokio::test]
async fn test_list_ingests() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/ingests?limit=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let ingests = json.as_array().unwrap();
    assert_eq!(ingests.len(), 1);
    assert_eq!(ingests[0]["filename"], "seed.csv");
    assert_eq!(ingests[0]["status"], "success");
}

#[tokio::test]
async fn test_get_unknown_ingest() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/ingests/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
