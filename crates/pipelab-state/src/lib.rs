//! pipelab-state — shared domain types for the PipeLab simulation.
//!
//! These types represent the state of the four pipeline stages: the
//! code-review toggle, the image-build phase machine, the cluster
//! resource configuration, and the monitoring stage's load/replica
//! state. All types are serializable so observers (the daemon's JSON
//! output, future dashboards) can emit them without conversion.
//!
//! Behavior lives in the component crates (`pipelab-autoscale`,
//! `pipelab-stages`); this crate holds only the data and the invariant
//! bounds that every mutation must respect.

pub mod types;

pub use types::*;
