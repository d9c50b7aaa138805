//! Webhook surface. Stripe and signature-provider callbacks are
//! acknowledged without processing until the real integrations land.

use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/stripe", post(stripe))
        .route("/webhooks/signature", post(signature))
}

#[derive(Debug, Serialize)]
struct WebhookAck {
    message: &'static str,
}

async fn stripe() -> Json<WebhookAck> {
    info!(event_name = "webhook.stripe.received", "stripe webhook acknowledged");
    Json(WebhookAck { message: "Stripe webhook processed" })
}

async fn signature() -> Json<WebhookAck> {
    info!(event_name = "webhook.signature.received", "signature webhook acknowledged");
    Json(WebhookAck { message: "Signature webhook processed" })
}
