//! Pipeline descriptor types
//!
//! Structure shared between orchestrator (publishes) and runner (executes).

use serde::{Deserialize, Deserializer, Serialize};

/// Full pipeline descriptor submitted to the orchestrator
///
/// ```json
/// {
///   "pod": { "cpu": "1", "memory": "512Mi" },
///   "phases": { "build": [...], "artifacts": {...}, "finalize": [...] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDescriptor {
    /// Resource limits for the build pod
    pub pod: PodResources,
    /// Phase definitions delivered to the runner
    #[serde(default, deserialize_with = "null_as_default")]
    pub phases: Phases,
}

impl PipelineDescriptor {
    /// Parses a descriptor from its JSON text
    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }
}

/// CPU and memory limits in cluster quantity syntax (e.g. "500m", "512Mi")
///
/// Kept as raw strings here; the orchestrator validates them before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodResources {
    pub cpu: String,
    pub memory: String,
}

/// The three fixed phase slots
///
/// All slots are always present. Missing and `null` members deserialize to
/// empty values, and an empty phase still runs (as a no-op).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phases {
    /// Shell commands run in declared order
    #[serde(default, deserialize_with = "null_as_default")]
    pub build: Vec<String>,
    /// Upload target for files produced by the build
    #[serde(default, deserialize_with = "null_as_default")]
    pub artifacts: ArtifactsPhase,
    /// Shell commands run after artifacts are handled
    #[serde(default, deserialize_with = "null_as_default")]
    pub finalize: Vec<String>,
}

impl Phases {
    /// Parses the phase document as stored in the configuration object
    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }

    /// Serializes the phase document for the configuration object
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Total number of shell commands across build and finalize
    pub fn command_count(&self) -> usize {
        self.build.len() + self.finalize.len()
    }
}

/// Artifact upload source and destination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsPhase {
    #[serde(default, deserialize_with = "null_as_default")]
    pub local_target_dir: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub remote_target_dir: String,
}

/// Reads an explicit `null` the same as an absent member
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
