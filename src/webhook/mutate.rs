//! Image annotation mutation
//!
//! Handles AdmissionReview requests for any workload kind, adding image
//! annotations to objects that embed a pod template.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use json_patch::Patch;
use kube::core::{
    admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
    DynamicObject,
};
use tracing::{debug, error, info, warn};

use crate::annotation::{build_patch, encode_patch};
use crate::workload::Workload;

/// Error type for requests that never reach a decision
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The body is not an AdmissionReview
    #[error("invalid admission review: {0}")]
    InvalidReview(String),
}

impl From<JsonRejection> for WebhookError {
    fn from(rejection: JsonRejection) -> Self {
        WebhookError::InvalidReview(rejection.body_text())
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WebhookError::InvalidReview(_) => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

/// Admission decision for one object
#[derive(Debug)]
pub enum Decision {
    /// Admit unchanged
    Allow,
    /// Admit with the given annotation patch
    Patch(Patch),
    /// Refuse, with the reason
    Deny(String),
}

impl Decision {
    /// Turn the decision into a response for `request`
    ///
    /// A patch that cannot be attached degrades to a denial, never to an
    /// unpatched admission.
    pub fn into_response(self, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
        match self {
            Decision::Allow => AdmissionResponse::from(request),
            Decision::Deny(message) => AdmissionResponse::from(request).deny(message),
            Decision::Patch(patch) => match AdmissionResponse::from(request).with_patch(patch) {
                Ok(response) => response,
                Err(e) => {
                    error!(uid = %request.uid, error = %e, "Failed to serialize patch");
                    AdmissionResponse::from(request)
                        .deny(format!("patch serialization error: {e}"))
                }
            },
        }
    }
}

/// Decide what to do with one admitted object
///
/// - undecodable object: deny with the decode failure text
/// - no pod template: allow unchanged
/// - pod template: allow with the annotation patch
pub fn decide(object: &DynamicObject) -> Decision {
    let workload = match Workload::decode(object) {
        Ok(workload) => workload,
        Err(e) => {
            warn!(name = ?object.metadata.name, error = %e, "Failed to decode object");
            return Decision::Deny(e.detail().to_string());
        }
    };

    let Some(template) = workload.classify() else {
        debug!(
            name = ?workload.metadata().name,
            "Object has no pod template, allowing unchanged"
        );
        return Decision::Allow;
    };

    let patch = build_patch(&template, workload.annotations());
    match encode_patch(&patch) {
        Ok(bytes) => {
            debug!(patch = %String::from_utf8_lossy(&bytes), "patch");
            info!(
                kind = %workload.kind(),
                name = ?workload.metadata().name,
                patch_ops = patch.0.len(),
                "Annotating container images"
            );
            Decision::Patch(patch)
        }
        Err(e) => {
            error!(error = %e, "Failed to encode patch");
            Decision::Deny(e.detail().to_string())
        }
    }
}

/// Process a single admission request
pub fn review(request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
    let uid = &request.uid;
    debug!(uid = %uid, operation = ?request.operation, "received mutating request");

    let response = match &request.object {
        Some(object) => decide(object).into_response(request),
        None => {
            debug!(uid = %uid, "No object in request, allowing unchanged");
            AdmissionResponse::from(request)
        }
    };

    debug!(uid = %uid, response = ?response, "admissionResponse");
    response
}

/// Handle mutating admission review
///
/// The response always echoes the request `uid`. Bodies that are not an
/// AdmissionReview are rejected with 400 before any decision is made.
pub async fn mutate_handler(
    body: Result<Json<AdmissionReview<DynamicObject>>, JsonRejection>,
) -> Result<Json<AdmissionReview<DynamicObject>>, WebhookError> {
    let Json(body) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejecting malformed admission review");
        WebhookError::from(rejection)
    })?;

    let request: AdmissionRequest<DynamicObject> = match body.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Failed to parse admission request");
            return Ok(Json(AdmissionResponse::invalid(e.to_string()).into_review()));
        }
    };

    Ok(Json(review(&request).into_review()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: serde_json::Value) -> DynamicObject {
        serde_json::from_value(value).unwrap()
    }

    fn request(object: Option<serde_json::Value>) -> AdmissionRequest<DynamicObject> {
        serde_json::from_value(json!({
            "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
            "kind": {"group": "", "version": "v1", "kind": "Pod"},
            "resource": {"group": "", "version": "v1", "resource": "pods"},
            "name": "test-pod",
            "namespace": "test-namespace",
            "operation": "CREATE",
            "userInfo": {"username": "admin"},
            "object": object,
            "dryRun": false
        }))
        .unwrap()
    }

    fn encoded(decision: Decision) -> String {
        match decision {
            Decision::Patch(patch) => String::from_utf8(encode_patch(&patch).unwrap()).unwrap(),
            other => panic!("Expected a patch, got {:?}", other),
        }
    }

    #[test]
    fn test_webhook_error_display() {
        let err = WebhookError::InvalidReview("test error".to_string());
        assert!(err.to_string().contains("test error"));
        assert!(err.to_string().contains("invalid admission review"));
    }

    #[test]
    fn test_webhook_error_is_bad_request() {
        let response = WebhookError::InvalidReview("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // =========================================================================
    // Story Tests
    // =========================================================================

    /// Story: a Pod with a stale tag annotation is re-annotated
    #[test]
    fn story_pod_with_stale_annotation_is_patched() {
        let obj = object(json!({
            "kind": "Pod",
            "apiVersion": "v1",
            "metadata": {
                "name": "test-pod",
                "namespace": "test-namespace",
                "annotations": {"image.clabs.co/test-container": "nginx:1.13"}
            },
            "spec": {"containers": [{"name": "test-container", "image": "nginx:1.14"}]}
        }));

        assert_eq!(
            encoded(decide(&obj)),
            r#"[{"op":"add","path":"/metadata/annotations/image.clabs.co~1test-container","value":"nginx:1.14"}]"#
        );
    }

    /// Story: a Deployment keeps its externally pinned init container
    #[test]
    fn story_deployment_with_pinned_init_container() {
        let obj = object(json!({
            "kind": "Deployment",
            "apiVersion": "apps/v1",
            "metadata": {
                "name": "test-deployment",
                "namespace": "test-namespace",
                "annotations": {
                    "image.clabs.co/container-1": "nginx:1.13",
                    "image.clabs.co/init-container-1": "busybox:1.28"
                }
            },
            "spec": {
                "selector": {"matchLabels": {"app": "test"}},
                "template": {"spec": {
                    "containers": [{"name": "container-1", "image": "nginx:1.14"}],
                    "initContainers": [{
                        "name": "init-container-1",
                        "image": "busybox@sha256:01d754b407dd0ec69e52a224cbf35272c8ba6a3fdd9ef512560fd65111995305"
                    }]
                }}
            }
        }));

        assert_eq!(
            encoded(decide(&obj)),
            r#"[{"op":"add","path":"/metadata/annotations/image.clabs.co~1container-1","value":"nginx:1.14"}]"#
        );
    }

    /// Story: objects without a pod template pass through
    #[test]
    fn story_service_is_allowed_without_patch() {
        let obj = object(json!({
            "kind": "Service",
            "apiVersion": "v1",
            "metadata": {"name": "test-service", "namespace": "test-namespace"}
        }));

        assert!(matches!(decide(&obj), Decision::Allow));
    }

    /// Story: an object that cannot be decoded is denied with the reason
    #[test]
    fn story_undecodable_object_is_denied() {
        let obj = object(json!({
            "kind": "Job",
            "apiVersion": "batch/v1",
            "metadata": {"name": "broken"},
            "spec": {"template": {"spec": {"containers": [{"name": 42}]}}}
        }));

        match decide(&obj) {
            Decision::Deny(message) => {
                assert!(message.contains("invalid type"));
                assert!(!message.starts_with("decode error"));
            }
            other => panic!("Expected denial, got {:?}", other),
        }
    }

    /// Story: the response is addressed to the request and carries the verdict
    #[test]
    fn story_review_echoes_uid_and_verdict() {
        let allowed = review(&request(Some(json!({
            "kind": "ConfigMap",
            "apiVersion": "v1",
            "metadata": {"name": "settings"}
        }))));
        assert!(allowed.allowed);
        assert_eq!(allowed.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");

        let denied = review(&request(Some(json!({
            "kind": "Pod",
            "apiVersion": "v1",
            "metadata": {"name": "broken"},
            "spec": {"containers": {}}
        }))));
        assert!(!denied.allowed);
        assert_eq!(denied.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert!(!denied.result.message.is_empty());
    }

    /// Story: a request without an object (e.g. DELETE) is allowed unchanged
    #[test]
    fn story_request_without_object_is_allowed() {
        let response = review(&request(None));
        assert!(response.allowed);
    }

    /// Story: a patch decision is attached to an allowed response
    #[test]
    fn story_patch_decision_allows_with_patch() {
        let obj = object(json!({
            "kind": "Pod",
            "apiVersion": "v1",
            "metadata": {"name": "fresh"},
            "spec": {"containers": [{"name": "app", "image": "myapp:v1"}]}
        }));
        let req = request(None);

        let response = decide(&obj).into_response(&req);
        assert!(response.allowed);

        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["patchType"], "JSONPatch");
        assert!(wire.get("patch").is_some());
    }
}
