//! Domain types for the PipeLab simulation.
//!
//! The monitoring stage's `LoadState` carries its invariant bounds as
//! associated constants; the controller clamps every transition against
//! them. The remaining types describe the three other pipeline stages.

use serde::{Deserialize, Serialize};

// ── Monitoring ────────────────────────────────────────────────────

/// Simulated traffic and worker-pool state for the monitoring stage.
///
/// Mutated only by the load controller's `tick()` and
/// `toggle_load_spike()`; observers receive copies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadState {
    /// Request rate in simulated req/s, always within
    /// [`Self::LOAD_MIN`, `Self::LOAD_MAX`].
    pub load: f64,
    /// Worker pod count, always within
    /// [`Self::REPLICAS_MIN`, `Self::REPLICAS_MAX`].
    pub replicas: u32,
    /// Operator-controlled flag forcing upward load pressure. Doubles
    /// as the alert flag observers display.
    pub spike_active: bool,
}

impl LoadState {
    /// Traffic floor; calm ticks never drift below this.
    pub const LOAD_MIN: f64 = 10.0;
    /// Traffic ceiling; spike ticks saturate here.
    pub const LOAD_MAX: f64 = 100.0;
    /// Minimum pod count; scale-down stops at this floor.
    pub const REPLICAS_MIN: u32 = 2;
    /// Maximum pod count; scale-up stops at this ceiling.
    pub const REPLICAS_MAX: u32 = 8;
    /// Traffic level a fresh simulation starts at.
    pub const INITIAL_LOAD: f64 = 20.0;

    /// State of a freshly created or reset simulation.
    pub fn initial() -> Self {
        Self {
            load: Self::INITIAL_LOAD,
            replicas: Self::REPLICAS_MIN,
            spike_active: false,
        }
    }

    /// Whether both numeric fields sit within their declared bounds.
    pub fn in_bounds(&self) -> bool {
        (Self::LOAD_MIN..=Self::LOAD_MAX).contains(&self.load)
            && (Self::REPLICAS_MIN..=Self::REPLICAS_MAX).contains(&self.replicas)
    }
}

impl Default for LoadState {
    fn default() -> Self {
        Self::initial()
    }
}

// ── Pipeline stages ───────────────────────────────────────────────

/// The four stages an operator can switch between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Assisted development: a vulnerability finding and its fix.
    Ide,
    /// Container image audit and build.
    Build,
    /// Cluster resource-request configuration.
    Cluster,
    /// Production monitoring with the autoscaling simulation.
    Monitor,
}

/// Lifecycle of the image-build stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    /// Unoptimized Dockerfile, not yet audited.
    Draft,
    /// Audit ran; findings are pending.
    Auditing,
    /// Recommendations applied; ready to build.
    Optimized,
    /// Build in progress.
    Building,
    /// Build finished.
    Done,
}

/// Validation status of the cluster resource configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigStatus {
    /// Resource requests missing; the workload risks eviction.
    Warning,
    /// Requests set and validated.
    Ok,
}

/// CPU/memory requests for the simulated deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceRequests {
    /// CPU request in millicores, unset until configured.
    pub cpu_millis: Option<u32>,
    /// Memory request in MiB, unset until configured.
    pub memory_mib: Option<u32>,
}

/// Severity of an advisory finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A single advisory surfaced by a stage (vulnerability, image audit
/// finding, resource recommendation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub title: String,
    pub detail: String,
}

impl Finding {
    pub fn new(severity: Severity, title: &str, detail: &str) -> Self {
        Self {
            severity,
            title: title.to_string(),
            detail: detail.to_string(),
        }
    }
}
