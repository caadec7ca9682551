//! Inbound webhook endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tracing::{debug, error};
use uuid::Uuid;

use crate::activity::ActivityBatch;
use crate::dispatch::Dispatcher;

/// Shared state for the webhook route.
#[derive(Clone)]
pub struct WebhookState {
    pub dispatcher: Arc<Dispatcher>,
}

/// POST handler: the connector delivers one activity or an array.
///
/// Success is an empty `202`; the completion carries no payload.
/// Dispatch errors (unknown strategy, bus rejection) are this
/// deployment's misconfiguration, reported as `500`.
async fn post_activities(
    State(state): State<WebhookState>,
    Json(batch): Json<ActivityBatch>,
) -> StatusCode {
    let batch_id = Uuid::new_v4();
    let activities = batch.into_vec();
    debug!(%batch_id, count = activities.len(), "webhook batch received");
    match state.dispatcher.handle_batch(activities).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            error!(%batch_id, error = %e, "webhook batch failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Build the webhook router on the configured route.
pub fn webhook_routes(route: &str, state: WebhookState) -> Router {
    Router::new()
        .route(route, post(post_activities))
        .with_state(state)
}
