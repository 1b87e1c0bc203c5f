//! Google Sheets recorder against a mock Sheets API and token endpoint.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support_intake::error::RecorderError;
use support_intake::recorder::sheets::ServiceAccountKey;
use support_intake::recorder::{
    LOG_HEADER, LogRow, Recorder, SheetsConfig, SheetsRecorder, verify_header,
};

const TEST_KEY: &str = include_str!("fixtures/test_service_account_key.pem");

fn recorder(server: &MockServer) -> SheetsRecorder {
    SheetsRecorder::new(SheetsConfig {
        key: ServiceAccountKey {
            client_email: "intake@test-project.iam.gserviceaccount.com".into(),
            private_key: SecretString::from(TEST_KEY),
            token_uri: format!("{}/token", server.uri()),
        },
        spreadsheet_id: "sheet-123".into(),
        sheet_name: "Sheet1".into(),
        api_base: server.uri(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn row(employee: &str) -> LogRow {
    LogRow {
        timestamp: "2026-03-01 09:30:00".into(),
        query: "I was charged twice".into(),
        department: "Billing".into(),
        sentiment: "Negative".into(),
        priority: "High".into(),
        assigned_employee: employee.into(),
        auto_response: "We are looking into it.".into(),
    }
}

#[tokio::test]
async fn reads_header_and_rows_with_one_token() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values/Sheet1!1:1"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "Sheet1!A1:G1",
            "values": [LOG_HEADER]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values/Sheet1!A:G"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "Sheet1!A1:G3",
            "values": [
                LOG_HEADER,
                row("Tanish").to_cells(),
                ["2026-03-01 10:00:00", "short row", "Sales"]
            ]
        })))
        .mount(&server)
        .await;

    let recorder = recorder(&server);
    verify_header(&recorder).await.unwrap();

    let rows = recorder.read_all_rows().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], row("Tanish"));
    assert_eq!(rows[1].department, "Sales");
    assert_eq!(rows[1].assigned_employee, "");
}

#[tokio::test]
async fn appends_one_raw_row() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/sheet-123/values/Sheet1!A:G:append"))
        .and(query_param("valueInputOption", "RAW"))
        .and(query_param("insertDataOption", "INSERT_ROWS"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({ "values": [row("Yash").to_cells()] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spreadsheetId": "sheet-123",
            "updates": { "updatedRows": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    recorder(&server).append_row(&row("Yash")).await.unwrap();
}

#[tokio::test]
async fn wrong_header_fails_verification() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values/Sheet1!1:1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [["Timestamp", "Query", "Dept"]]
        })))
        .mount(&server)
        .await;

    assert!(verify_header(&recorder(&server)).await.is_err());
}

#[tokio::test]
async fn rejected_token_exchange_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let err = recorder(&server).header().await.unwrap_err();
    assert!(matches!(err, RecorderError::Auth { .. }));
}

#[tokio::test]
async fn api_errors_carry_status() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/sheet-123/values/Sheet1!A:G:append"))
        .respond_with(ResponseTemplate::new(403).set_body_string("caller lacks permission"))
        .mount(&server)
        .await;

    let err = recorder(&server).append_row(&row("Tanish")).await.unwrap_err();
    assert!(matches!(err, RecorderError::Http { status: Some(403), .. }));
}
