//! Workload classification
//!
//! Decodes the object carried by an admission request into one of the
//! Kubernetes kinds that embed a pod template, and extracts the container
//! images from that template:
//! - Pod: its own spec
//! - Deployment, StatefulSet, ReplicaSet, DaemonSet, Job: `spec.template.spec`
//! - CronJob: `spec.jobTemplate.spec.template.spec`
//!
//! Other built-in kinds classify to "no template" and are admitted unchanged.
//! Types that are not built in (see [`registry`]) cannot be decoded.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use kube::core::{DynamicObject, ObjectMeta};
use serde::de::DeserializeOwned;

use crate::{Error, Result};

pub mod registry;

// =============================================================================
// Kinds
// =============================================================================

/// The recognized workload shapes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    /// core/v1 Pod
    Pod,
    /// apps/v1 Deployment
    Deployment,
    /// apps/v1 StatefulSet
    StatefulSet,
    /// apps/v1 ReplicaSet
    ReplicaSet,
    /// apps/v1 DaemonSet
    DaemonSet,
    /// batch/v1 Job
    Job,
    /// batch/v1 CronJob
    CronJob,
    /// Any other kind, built-in or not
    Unrecognized,
}

impl WorkloadKind {
    /// Resolve a kind from the object's declared `apiVersion` and `kind`
    pub fn from_type(api_version: &str, kind: &str) -> Self {
        match (api_version, kind) {
            ("v1", "Pod") => Self::Pod,
            ("apps/v1", "Deployment") => Self::Deployment,
            ("apps/v1", "StatefulSet") => Self::StatefulSet,
            ("apps/v1", "ReplicaSet") => Self::ReplicaSet,
            ("apps/v1", "DaemonSet") => Self::DaemonSet,
            ("batch/v1", "Job") => Self::Job,
            ("batch/v1", "CronJob") => Self::CronJob,
            _ => Self::Unrecognized,
        }
    }

    /// Kind name as it appears in `kind`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "Pod",
            Self::Deployment => "Deployment",
            Self::StatefulSet => "StatefulSet",
            Self::ReplicaSet => "ReplicaSet",
            Self::DaemonSet => "DaemonSet",
            Self::Job => "Job",
            Self::CronJob => "CronJob",
            Self::Unrecognized => "Unrecognized",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Pod template
// =============================================================================

/// One container's image, in template order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerImageEntry {
    /// Container name
    pub name: String,
    /// Image reference as written in the pod spec (tag or digest form)
    pub image: String,
    /// Whether this is an init container
    pub is_init: bool,
}

impl ContainerImageEntry {
    /// Create a new entry
    pub fn new(name: impl Into<String>, image: impl Into<String>, is_init: bool) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            is_init,
        }
    }

    fn from_container(container: &Container, is_init: bool) -> Self {
        Self::new(
            container.name.clone(),
            container.image.clone().unwrap_or_default(),
            is_init,
        )
    }
}

/// The container images of a pod template
///
/// Regular containers come first, then init containers, each group in its
/// declared order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PodTemplate {
    containers: Vec<ContainerImageEntry>,
}

impl PodTemplate {
    /// Build a template from explicit entries, kept in the given order
    pub fn new(containers: Vec<ContainerImageEntry>) -> Self {
        Self { containers }
    }

    /// Extract the images of a pod spec
    pub fn from_pod_spec(spec: &PodSpec) -> Self {
        let regular = spec
            .containers
            .iter()
            .map(|c| ContainerImageEntry::from_container(c, false));
        let init = spec
            .init_containers
            .iter()
            .flatten()
            .map(|c| ContainerImageEntry::from_container(c, true));

        Self {
            containers: regular.chain(init).collect(),
        }
    }

    /// Entries in processing order
    pub fn containers(&self) -> &[ContainerImageEntry] {
        &self.containers
    }

    /// Whether the template has no containers at all
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

// =============================================================================
// Decoded workloads
// =============================================================================

/// An admission object decoded into its typed form
#[derive(Clone, Debug)]
pub enum Workload {
    /// A Pod
    Pod(Pod),
    /// A Deployment
    Deployment(Deployment),
    /// A StatefulSet
    StatefulSet(StatefulSet),
    /// A ReplicaSet
    ReplicaSet(ReplicaSet),
    /// A DaemonSet
    DaemonSet(DaemonSet),
    /// A Job
    Job(Job),
    /// A CronJob
    CronJob(CronJob),
    /// Any other built-in object, kept untyped
    Unrecognized(DynamicObject),
}

impl Workload {
    /// Decode an untyped admission object
    ///
    /// Fails when the object has no type information, when its type is not
    /// a registered built-in, or when a workload kind does not match its
    /// schema.
    pub fn decode(object: &DynamicObject) -> Result<Self> {
        let types = object
            .types
            .as_ref()
            .ok_or_else(|| Error::decode("object is missing apiVersion and kind"))?;

        let workload = match WorkloadKind::from_type(&types.api_version, &types.kind) {
            WorkloadKind::Pod => Self::Pod(into_typed(object)?),
            WorkloadKind::Deployment => Self::Deployment(into_typed(object)?),
            WorkloadKind::StatefulSet => Self::StatefulSet(into_typed(object)?),
            WorkloadKind::ReplicaSet => Self::ReplicaSet(into_typed(object)?),
            WorkloadKind::DaemonSet => Self::DaemonSet(into_typed(object)?),
            WorkloadKind::Job => Self::Job(into_typed(object)?),
            WorkloadKind::CronJob => Self::CronJob(into_typed(object)?),
            WorkloadKind::Unrecognized if registry::is_builtin(&types.api_version, &types.kind) => {
                Self::Unrecognized(object.clone())
            }
            WorkloadKind::Unrecognized => {
                return Err(Error::decode(format!(
                    "no kind \"{}\" is registered for version \"{}\"",
                    types.kind, types.api_version
                )))
            }
        };

        Ok(workload)
    }

    /// The kind of this workload
    pub fn kind(&self) -> WorkloadKind {
        match self {
            Self::Pod(_) => WorkloadKind::Pod,
            Self::Deployment(_) => WorkloadKind::Deployment,
            Self::StatefulSet(_) => WorkloadKind::StatefulSet,
            Self::ReplicaSet(_) => WorkloadKind::ReplicaSet,
            Self::DaemonSet(_) => WorkloadKind::DaemonSet,
            Self::Job(_) => WorkloadKind::Job,
            Self::CronJob(_) => WorkloadKind::CronJob,
            Self::Unrecognized(_) => WorkloadKind::Unrecognized,
        }
    }

    /// Object metadata
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Pod(o) => &o.metadata,
            Self::Deployment(o) => &o.metadata,
            Self::StatefulSet(o) => &o.metadata,
            Self::ReplicaSet(o) => &o.metadata,
            Self::DaemonSet(o) => &o.metadata,
            Self::Job(o) => &o.metadata,
            Self::CronJob(o) => &o.metadata,
            Self::Unrecognized(o) => &o.metadata,
        }
    }

    /// The object's current annotations
    ///
    /// `None` means the object has no annotations map at all, which is not
    /// the same as an empty one.
    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata().annotations.as_ref()
    }

    /// Extract the embedded pod template
    ///
    /// Returns `None` only for unrecognized kinds. A recognized kind whose
    /// template is missing yields an empty template.
    pub fn classify(&self) -> Option<PodTemplate> {
        let spec = match self {
            Self::Pod(pod) => pod.spec.as_ref(),
            Self::Deployment(d) => d.spec.as_ref().and_then(|s| s.template.spec.as_ref()),
            Self::StatefulSet(s) => s.spec.as_ref().and_then(|s| s.template.spec.as_ref()),
            Self::ReplicaSet(r) => r
                .spec
                .as_ref()
                .and_then(|s| s.template.as_ref())
                .and_then(|t| t.spec.as_ref()),
            Self::DaemonSet(d) => d.spec.as_ref().and_then(|s| s.template.spec.as_ref()),
            Self::Job(j) => j.spec.as_ref().and_then(|s| s.template.spec.as_ref()),
            Self::CronJob(c) => c
                .spec
                .as_ref()
                .and_then(|s| s.job_template.spec.as_ref())
                .and_then(|j| j.template.spec.as_ref()),
            Self::Unrecognized(_) => return None,
        };

        Some(spec.map(PodTemplate::from_pod_spec).unwrap_or_default())
    }
}

fn into_typed<K: DeserializeOwned>(object: &DynamicObject) -> Result<K> {
    let value = serde_json::to_value(object)?;
    serde_json::from_value(value).map_err(|e| Error::decode(e.to_string()))
}
