//! Image annotation patches
//!
//! Computes the JSON Patch that records each container's image under the
//! object's `metadata.annotations`. The patch is built fresh from the pod
//! template and the annotations the object already carries:
//!
//! 1. If the object has no annotations map, the patch first adds an empty one.
//! 2. Each container (regular, then init) gets an `add` for its key, unless
//!    the key is already annotated and the image is pinned to a digest.
//!
//! The digest rule leaves alone annotations written by a resolver that
//! swapped a tag for a digest; this webhook never resolves images itself.
//! A tag-form image is always re-added, even if the annotation already holds
//! the same value.

mod key;

pub use key::{AnnotationKey, ANNOTATION_PREFIX};

use std::collections::BTreeMap;

use json_patch::{AddOperation, Patch, PatchOperation};
use jsonptr::PointerBuf;
use serde_json::Value;

use crate::workload::{ContainerImageEntry, PodTemplate};
use crate::{Error, Result};

/// Separator introducing a content digest in an image reference
pub const DIGEST_SEPARATOR: char = '@';

/// Whether an image reference is pinned to a content digest
///
/// `nginx@sha256:...` is pinned, `nginx:1.14` is not.
pub fn is_digest_pinned(image: &str) -> bool {
    image.contains(DIGEST_SEPARATOR)
}

/// Build the annotation patch for a pod template
///
/// `current` is the object's annotation map, `None` when the object has none.
/// The result is deterministic for a given input.
pub fn build_patch(template: &PodTemplate, current: Option<&BTreeMap<String, String>>) -> Patch {
    let mut ops = Vec::with_capacity(template.containers().len() + 1);

    if current.is_none() {
        ops.push(PatchOperation::Add(AddOperation {
            path: PointerBuf::from_tokens(["metadata", "annotations"]),
            value: Value::Object(serde_json::Map::new()),
        }));
    }

    for container in template.containers() {
        let key = AnnotationKey::for_container(&container.name);
        if is_already_pinned(&key, container, current) {
            continue;
        }
        ops.push(PatchOperation::Add(AddOperation {
            path: key.pointer(),
            value: Value::String(container.image.clone()),
        }));
    }

    Patch(ops)
}

/// Encode a patch as JSON Patch bytes
pub fn encode_patch(patch: &Patch) -> Result<Vec<u8>> {
    serde_json::to_vec(patch).map_err(|e| Error::serialization(e.to_string()))
}

fn is_already_pinned(
    key: &AnnotationKey,
    container: &ContainerImageEntry,
    current: Option<&BTreeMap<String, String>>,
) -> bool {
    current.is_some_and(|annotations| key.is_present_in(annotations))
        && is_digest_pinned(&container.image)
}
