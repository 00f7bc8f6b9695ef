//! Image build stage — Dockerfile audit and a stepped build.
//!
//! Phase machine: `Draft → Auditing → Optimized → Building → Done`.
//! Out-of-order operations are rejected rather than silently ignored,
//! so a driver bug surfaces as an error instead of a stuck phase.

use thiserror::Error;
use tracing::debug;

use pipelab_state::{BuildPhase, Finding, Severity};

/// Progress gained per build step.
const PROGRESS_STEP: u8 = 5;
/// Progress at which the build completes.
const PROGRESS_DONE: u8 = 100;

/// Estimated image size before optimization, in MB.
const DRAFT_IMAGE_MB: u32 = 1100;
/// Final image size after the optimized build, in MB.
const OPTIMIZED_IMAGE_MB: u32 = 85;

const DRAFT_DOCKERFILE: &str = "\
FROM node:latest
WORKDIR /app
COPY . .
RUN npm install
CMD [\"npm\", \"start\"]
";

const OPTIMIZED_DOCKERFILE: &str = "\
FROM node:18-alpine AS builder
WORKDIR /app
COPY package*.json ./
RUN npm ci
COPY . .
RUN npm run build

FROM node:18-alpine
WORKDIR /app
COPY --from=builder /app/dist ./dist
COPY package*.json ./
RUN npm ci --production
USER node
CMD [\"node\", \"dist/index.js\"]
";

/// Errors from operations issued in the wrong phase.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("operation requires phase {expected:?}, current phase is {actual:?}")]
    WrongPhase {
        expected: BuildPhase,
        actual: BuildPhase,
    },
}

/// State of the container-build stage.
#[derive(Debug)]
pub struct ImageBuild {
    phase: BuildPhase,
    progress: u8,
}

impl ImageBuild {
    pub fn new() -> Self {
        Self {
            phase: BuildPhase::Draft,
            progress: 0,
        }
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    /// Build progress, 0–100. Meaningful from `Building` onward.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// The Dockerfile as the operator currently sees it.
    pub fn dockerfile(&self) -> &'static str {
        match self.phase {
            BuildPhase::Draft | BuildPhase::Auditing => DRAFT_DOCKERFILE,
            _ => OPTIMIZED_DOCKERFILE,
        }
    }

    /// Audit findings, pending only while in `Auditing`.
    pub fn findings(&self) -> Vec<Finding> {
        if self.phase != BuildPhase::Auditing {
            return Vec::new();
        }
        vec![
            Finding::new(
                Severity::Critical,
                "heavy base image",
                "node:latest weighs ~1GB; use an alpine tag",
            ),
            Finding::new(
                Severity::Warning,
                "container runs as root",
                "add a non-root USER before CMD",
            ),
            Finding::new(
                Severity::Info,
                "source shipped to production",
                "split into a multi-stage build and copy only the dist output",
            ),
        ]
    }

    /// Reported image size in MB: the draft estimate until an
    /// optimized build has finished.
    pub fn image_size_mb(&self) -> u32 {
        match self.phase {
            BuildPhase::Done => OPTIMIZED_IMAGE_MB,
            _ => DRAFT_IMAGE_MB,
        }
    }

    /// Run the audit on the draft Dockerfile.
    pub fn audit(&mut self) -> Result<(), BuildError> {
        self.expect_phase(BuildPhase::Draft)?;
        self.phase = BuildPhase::Auditing;
        debug!("image audit started");
        Ok(())
    }

    /// Apply the audit recommendations, producing the optimized
    /// Dockerfile.
    pub fn apply_recommendations(&mut self) -> Result<(), BuildError> {
        self.expect_phase(BuildPhase::Auditing)?;
        self.phase = BuildPhase::Optimized;
        debug!("audit recommendations applied");
        Ok(())
    }

    /// Kick off the build; progress starts at zero.
    pub fn start_build(&mut self) -> Result<(), BuildError> {
        self.expect_phase(BuildPhase::Optimized)?;
        self.phase = BuildPhase::Building;
        self.progress = 0;
        debug!("image build started");
        Ok(())
    }

    /// Advance a running build by one step. On reaching 100 the phase
    /// flips to `Done`.
    pub fn advance(&mut self) -> Result<(), BuildError> {
        self.expect_phase(BuildPhase::Building)?;
        self.progress = (self.progress + PROGRESS_STEP).min(PROGRESS_DONE);
        if self.progress == PROGRESS_DONE {
            self.phase = BuildPhase::Done;
            debug!(size_mb = OPTIMIZED_IMAGE_MB, "image build finished");
        }
        Ok(())
    }

    /// Back to the unaudited draft.
    pub fn reset(&mut self) {
        self.phase = BuildPhase::Draft;
        self.progress = 0;
    }

    fn expect_phase(&self, expected: BuildPhase) -> Result<(), BuildError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(BuildError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }
}

impl Default for ImageBuild {
    fn default() -> Self {
        Self::new()
    }
}
