//! HTTP surface: the form page, a JSON ticket endpoint and an operator
//! workload view.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::flow::{
    DeliveryReport, IntakeFlow, Recipient, SUCCESS_MESSAGE, Submission, user_message,
};
use super::page::{BannerKind, Page};
use crate::error::IntakeError;

/// Shared state for intake routes.
#[derive(Clone)]
pub struct IntakeRouteState {
    pub flow: Arc<IntakeFlow>,
}

/// JSON body returned for an accepted ticket.
#[derive(Debug, Serialize)]
struct TicketReceipt {
    status: &'static str,
    message: &'static str,
    submission_id: Uuid,
    notices: Vec<String>,
}

/// Build the intake routes.
pub fn intake_routes(state: IntakeRouteState) -> Router {
    Router::new()
        .route("/", get(form_page).post(submit_form))
        .route("/api/tickets", axum::routing::post(submit_json))
        .route("/api/workload", get(workload))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /
async fn form_page() -> Html<String> {
    Html(Page::default().render())
}

/// POST /
///
/// Form-encoded submission. Always answers 200 with the page; the banner
/// says what happened.
async fn submit_form(
    State(state): State<IntakeRouteState>,
    Form(submission): Form<Submission>,
) -> Html<String> {
    let page = match state.flow.submit(submission.clone()).await {
        Ok(outcome) => outcome.failed_deliveries().fold(
            Page::default().with_banner(BannerKind::Success, SUCCESS_MESSAGE),
            |page, report| page.with_banner(BannerKind::Error, delivery_notice(report)),
        ),
        Err(e) => {
            let kind = match e {
                IntakeError::Validation(_) => BannerKind::Warning,
                _ => BannerKind::Error,
            };
            Page {
                email: submission.email,
                query: submission.query,
                banners: Vec::new(),
            }
            .with_banner(kind, user_message(&e))
        }
    };
    Html(page.render())
}

/// POST /api/tickets
async fn submit_json(
    State(state): State<IntakeRouteState>,
    Json(submission): Json<Submission>,
) -> Response {
    match state.flow.submit(submission).await {
        Ok(outcome) => Json(TicketReceipt {
            status: "received",
            message: SUCCESS_MESSAGE,
            submission_id: outcome.submission_id,
            notices: outcome.failed_deliveries().map(delivery_notice).collect(),
        })
        .into_response(),
        Err(e) => {
            let status = match e {
                IntakeError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                IntakeError::ClassifierUnavailable { .. } => StatusCode::BAD_GATEWAY,
                IntakeError::Recorder(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(serde_json::json!({"error": user_message(&e)})),
            )
                .into_response()
        }
    }
}

/// GET /api/workload
async fn workload(State(state): State<IntakeRouteState>) -> impl IntoResponse {
    Json(state.flow.workload().await)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "support-intake"
    }))
}

/// What the submitter is told about a failed email. Staff addresses stay
/// private.
fn delivery_notice(report: &DeliveryReport) -> String {
    match report.recipient {
        Recipient::Assignee => "Email failed: our support team could not be notified.".to_string(),
        Recipient::Submitter => format!(
            "Email failed: the confirmation to {} could not be sent.",
            report.address
        ),
    }
}
