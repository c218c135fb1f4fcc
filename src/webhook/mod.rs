//! Mutating Admission Webhook for image annotations
//!
//! The webhook intercepts create/update of any object the
//! MutatingWebhookConfiguration routes to it. Workloads with a pod template
//! get an annotation per container recording its image; everything else is
//! admitted unchanged.
//!
//! Decisions are pure functions of the admitted object, so the router carries
//! no state and requests may be served concurrently.

pub mod mutate;

use axum::{
    routing::{get, post},
    Router,
};

pub use mutate::{decide, mutate_handler, review, Decision, WebhookError};

/// Create the webhook router
///
/// - POST /mutate - Annotate container images
/// - GET /healthz - Liveness/readiness probe
pub fn webhook_router() -> Router {
    Router::new()
        .route("/mutate", post(mutate_handler))
        .route("/healthz", get(|| async { "ok" }))
}
