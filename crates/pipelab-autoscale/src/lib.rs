//! pipelab-autoscale — the monitoring stage's scaling feedback loop.
//!
//! Models traffic against a simulated worker pool and adjusts the pod
//! count one step per tick. The policy is deliberately asymmetric:
//! scale-up is threshold-gated while a load spike is active, scale-down
//! runs on every calm tick until the floor.
//!
//! # Policy
//!
//! ```text
//! observed = load                       // pre-tick sample
//!
//! load update:
//!     spike:  load = min(load + 15, 100)
//!     calm:   load = clamp(load + uniform(-5, 5), 10, 100)
//!
//! replica update (reads `observed`, one tick behind):
//!     spike and observed > 80 and replicas < 8:  replicas += 1
//!     calm and replicas > 2:                     replicas -= 1
//! ```
//!
//! Replica decisions read the load sampled *before* the tick's load
//! update, reproducing the latency between a metrics sample and the
//! scheduler acting on it.
//!
//! [`MonitorDriver`] wraps a [`LoadController`] in a tokio tick task
//! with `start`/`stop` lifecycle and post-tick change listeners.

pub mod controller;
pub mod monitor;

pub use controller::{JitterSource, LoadController, UniformJitter};
pub use monitor::{ChangeListener, MonitorDriver, MonitorError};
