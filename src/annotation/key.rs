//! Annotation key scheme
//!
//! Both the skip check and the written patch path go through [`AnnotationKey`],
//! so the two can never disagree about where an image is recorded. Changing
//! [`ANNOTATION_PREFIX`] orphans every annotation written under the old one.

use std::collections::BTreeMap;
use std::fmt;

use jsonptr::PointerBuf;

/// Prefix shared by every image annotation
pub const ANNOTATION_PREFIX: &str = "image.clabs.co/";

/// Annotation key recording one container's image
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationKey(String);

impl AnnotationKey {
    /// Key for the container with the given name
    pub fn for_container(name: &str) -> Self {
        Self(format!("{ANNOTATION_PREFIX}{name}"))
    }

    /// The raw annotation key, as stored in `metadata.annotations`
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// JSON Pointer to this key under `/metadata/annotations`
    ///
    /// The key is a single pointer token, so its `/` is escaped as `~1`.
    pub fn pointer(&self) -> PointerBuf {
        PointerBuf::from_tokens(["metadata", "annotations", self.as_str()])
    }

    /// Whether the annotation map already has this key
    pub fn is_present_in(&self, annotations: &BTreeMap<String, String>) -> bool {
        annotations.contains_key(self.as_str())
    }
}

impl AsRef<str> for AnnotationKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for AnnotationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
