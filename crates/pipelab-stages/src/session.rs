//! Operator session — stage navigation and timer lifecycle.
//!
//! Switching stages resets every stage's state, and the monitoring
//! stage's tick timer is started on entry and stopped on exit. The
//! stop runs before any reset so the tick task can never observe a
//! half-reset controller.

use std::time::Duration;

use tracing::{debug, info};

use pipelab_autoscale::{MonitorDriver, MonitorError};
use pipelab_state::{BuildPhase, StageId};

use crate::cluster::ClusterConfig;
use crate::image::{BuildError, ImageBuild};
use crate::review::CodeReview;

/// One operator's view of the pipeline: the active stage, each
/// stage's state, and the monitor driver whose timer is bound to the
/// monitoring stage's lifetime.
pub struct PipelineSession {
    active: StageId,
    review: CodeReview,
    build: ImageBuild,
    cluster: ClusterConfig,
    monitor: MonitorDriver,
    tick_interval: Duration,
}

impl PipelineSession {
    /// Session starting on the IDE stage; the monitor ticks at
    /// `tick_interval` whenever the monitoring stage is active.
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            active: StageId::Ide,
            review: CodeReview::new(),
            build: ImageBuild::new(),
            cluster: ClusterConfig::new(),
            monitor: MonitorDriver::new(),
            tick_interval,
        }
    }

    /// Session over a caller-built driver (custom jitter source).
    pub fn with_driver(tick_interval: Duration, monitor: MonitorDriver) -> Self {
        Self {
            monitor,
            ..Self::new(tick_interval)
        }
    }

    pub fn active_stage(&self) -> StageId {
        self.active
    }

    /// Switch to `stage`.
    ///
    /// Leaving the monitoring stage stops its timer before anything
    /// else; all stage state is then reset, and entering the
    /// monitoring stage starts a fresh timer. Re-selecting the
    /// monitoring stage counts as leave-then-enter.
    pub async fn select_stage(&mut self, stage: StageId) -> Result<(), MonitorError> {
        if self.active == StageId::Monitor {
            self.monitor.stop().await;
        }

        self.review.reset();
        self.build.reset();
        self.cluster.reset();
        self.monitor.reset();

        self.active = stage;
        debug!(stage = ?stage, "stage selected");

        if stage == StageId::Monitor {
            self.monitor.start(self.tick_interval)?;
        }
        Ok(())
    }

    /// Run the image build to completion, advancing progress every
    /// `step`. Requires the build stage's audit recommendations to be
    /// applied first.
    pub async fn run_build(&mut self, step: Duration) -> Result<(), BuildError> {
        self.build.start_build()?;
        while self.build.phase() == BuildPhase::Building {
            tokio::time::sleep(step).await;
            self.build.advance()?;
        }
        info!(size_mb = self.build.image_size_mb(), "image build complete");
        Ok(())
    }

    /// Stop the monitor timer if it is running. Called on teardown;
    /// safe to call any number of times.
    pub async fn shutdown(&mut self) {
        self.monitor.stop().await;
    }

    pub fn review(&self) -> &CodeReview {
        &self.review
    }

    pub fn review_mut(&mut self) -> &mut CodeReview {
        &mut self.review
    }

    pub fn build(&self) -> &ImageBuild {
        &self.build
    }

    pub fn build_mut(&mut self) -> &mut ImageBuild {
        &mut self.build
    }

    pub fn cluster(&self) -> &ClusterConfig {
        &self.cluster
    }

    pub fn cluster_mut(&mut self) -> &mut ClusterConfig {
        &mut self.cluster
    }

    pub fn monitor(&self) -> &MonitorDriver {
        &self.monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipelab_autoscale::{LoadController, UniformJitter};
    use pipelab_state::{ConfigStatus, LoadState};

    #[tokio::test]
    async fn entering_monitor_starts_the_timer() {
        let driver = MonitorDriver::with_controller(LoadController::with_jitter(Box::new(
            UniformJitter::seeded(11),
        )));
        let mut session = PipelineSession::with_driver(Duration::from_millis(10), driver);
        assert!(!session.monitor().is_running());

        session.select_stage(StageId::Monitor).await.unwrap();
        assert!(session.monitor().is_running());

        tokio::time::sleep(Duration::from_millis(60)).await;
        // Calm ticks jitter the load; bounds must hold throughout.
        assert!(session.monitor().snapshot().in_bounds());

        session.shutdown().await;
    }

    #[tokio::test]
    async fn leaving_monitor_stops_the_timer_and_resets() {
        let mut session = PipelineSession::new(Duration::from_millis(10));
        session.select_stage(StageId::Monitor).await.unwrap();
        session.monitor().toggle_load_spike();
        tokio::time::sleep(Duration::from_millis(50)).await;

        session.select_stage(StageId::Ide).await.unwrap();
        assert!(!session.monitor().is_running());
        assert_eq!(session.monitor().snapshot(), LoadState::initial());

        // No stray timer mutates state after the switch.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.monitor().snapshot(), LoadState::initial());
    }

    #[tokio::test]
    async fn reselecting_monitor_restarts_cleanly() {
        let mut session = PipelineSession::new(Duration::from_millis(10));
        session.select_stage(StageId::Monitor).await.unwrap();
        session.monitor().toggle_load_spike();
        tokio::time::sleep(Duration::from_millis(40)).await;

        // Leave-then-enter: state is back to initial and a fresh
        // timer is running.
        session.select_stage(StageId::Monitor).await.unwrap();
        assert!(session.monitor().is_running());
        assert!(!session.monitor().snapshot().spike_active);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn navigation_resets_other_stages() {
        let mut session = PipelineSession::new(Duration::from_millis(10));

        session.review_mut().apply_fix();
        session.cluster_mut().apply_recommended();
        session.build_mut().audit().unwrap();

        session.select_stage(StageId::Cluster).await.unwrap();
        assert!(!session.review().is_fixed());
        assert_eq!(session.cluster().status(), ConfigStatus::Warning);
        assert_eq!(session.build().phase(), BuildPhase::Draft);
    }

    #[tokio::test]
    async fn run_build_reaches_done() {
        let mut session = PipelineSession::new(Duration::from_millis(10));
        session.select_stage(StageId::Build).await.unwrap();

        session.build_mut().audit().unwrap();
        session.build_mut().apply_recommendations().unwrap();
        session.run_build(Duration::from_millis(1)).await.unwrap();

        assert_eq!(session.build().phase(), BuildPhase::Done);
        assert_eq!(session.build().image_size_mb(), 85);
    }

    #[tokio::test]
    async fn run_build_requires_applied_recommendations() {
        let mut session = PipelineSession::new(Duration::from_millis(10));
        session.select_stage(StageId::Build).await.unwrap();

        assert!(session.run_build(Duration::from_millis(1)).await.is_err());
    }
}
