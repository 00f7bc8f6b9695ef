//! Cluster configuration stage — resource-request recommendation.

use tracing::debug;

use pipelab_state::{ConfigStatus, Finding, ResourceRequests, Severity};

/// Recommended CPU request in millicores.
const RECOMMENDED_CPU_MILLIS: u32 = 250;
/// Recommended memory request in MiB.
const RECOMMENDED_MEMORY_MIB: u32 = 512;

/// State of the cluster-configuration stage: the simulated
/// deployment's resource requests and their validation status.
#[derive(Debug)]
pub struct ClusterConfig {
    requests: ResourceRequests,
    status: ConfigStatus,
}

impl ClusterConfig {
    /// Fresh stage: nothing set, status `Warning`.
    pub fn new() -> Self {
        Self {
            requests: ResourceRequests::default(),
            status: ConfigStatus::Warning,
        }
    }

    pub fn status(&self) -> ConfigStatus {
        self.status
    }

    pub fn requests(&self) -> ResourceRequests {
        self.requests
    }

    /// The pending recommendation, `None` once applied.
    pub fn recommendation(&self) -> Option<Finding> {
        match self.status {
            ConfigStatus::Warning => Some(Finding::new(
                Severity::Warning,
                "resource requests unset",
                "traffic history suggests explicit limits to avoid OOM kills",
            )),
            ConfigStatus::Ok => None,
        }
    }

    /// Install the recommended requests and mark the config valid.
    pub fn apply_recommended(&mut self) {
        self.requests = ResourceRequests {
            cpu_millis: Some(RECOMMENDED_CPU_MILLIS),
            memory_mib: Some(RECOMMENDED_MEMORY_MIB),
        };
        self.status = ConfigStatus::Ok;
        debug!(
            cpu_millis = RECOMMENDED_CPU_MILLIS,
            memory_mib = RECOMMENDED_MEMORY_MIB,
            "recommended resources applied"
        );
    }

    /// Back to the unset warning state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unset_with_warning() {
        let config = ClusterConfig::new();
        assert_eq!(config.status(), ConfigStatus::Warning);
        assert_eq!(config.requests(), ResourceRequests::default());
        assert!(config.recommendation().is_some());
    }

    #[test]
    fn apply_sets_requests_and_clears_warning() {
        let mut config = ClusterConfig::new();
        config.apply_recommended();

        assert_eq!(config.status(), ConfigStatus::Ok);
        let requests = config.requests();
        assert_eq!(requests.cpu_millis, Some(250));
        assert_eq!(requests.memory_mib, Some(512));
        assert!(config.recommendation().is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let mut config = ClusterConfig::new();
        config.apply_recommended();
        config.reset();

        assert_eq!(config.status(), ConfigStatus::Warning);
        assert_eq!(config.requests(), ResourceRequests::default());
    }
}
