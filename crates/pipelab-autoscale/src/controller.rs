//! Load controller — owns the simulation state and applies the
//! scaling policy on each tick.
//!
//! The controller is synchronous and never fails: every numeric
//! transition is clamped against the bounds on [`LoadState`]. Calm-tick
//! jitter comes from a [`JitterSource`] so tests can pin the draw.

use pipelab_state::LoadState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Upward load pressure added per tick while a spike is active.
const SPIKE_STEP: f64 = 15.0;
/// Observed load above which a spike tick adds a replica.
const SCALE_UP_THRESHOLD: f64 = 80.0;
/// Half-width of the calm-traffic jitter range.
const JITTER_RANGE: f64 = 5.0;

/// Source of per-tick load jitter for calm traffic.
///
/// Implementations return a delta in simulated req/s. The default
/// [`UniformJitter`] draws uniformly from `[-5.0, 5.0]`; tests
/// substitute a fixed source to make the policy arithmetic exact.
pub trait JitterSource: Send {
    /// Next load delta to apply on a calm tick.
    fn next_delta(&mut self) -> f64;
}

/// Uniform jitter backed by `StdRng`.
pub struct UniformJitter {
    rng: StdRng,
}

impl UniformJitter {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded constructor for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl JitterSource for UniformJitter {
    fn next_delta(&mut self) -> f64 {
        self.rng.gen_range(-JITTER_RANGE..=JITTER_RANGE)
    }
}

/// Owns [`LoadState`] and advances it deterministically-in-policy on
/// each tick. State is mutated only through [`tick`](Self::tick),
/// [`toggle_load_spike`](Self::toggle_load_spike), and
/// [`reset`](Self::reset); observers get copies via
/// [`snapshot`](Self::snapshot).
pub struct LoadController {
    state: LoadState,
    jitter: Box<dyn JitterSource>,
}

impl LoadController {
    /// Controller with entropy-seeded jitter and the initial state.
    pub fn new() -> Self {
        Self::with_jitter(Box::new(UniformJitter::new()))
    }

    /// Controller with a caller-supplied jitter source.
    pub fn with_jitter(jitter: Box<dyn JitterSource>) -> Self {
        Self {
            state: LoadState::initial(),
            jitter,
        }
    }

    /// Advance the simulation by one tick: update the load, then make
    /// the replica decision against the load observed before this
    /// tick's update.
    pub fn tick(&mut self) {
        let observed = self.state.load;

        if self.state.spike_active {
            self.state.load = (self.state.load + SPIKE_STEP).min(LoadState::LOAD_MAX);
        } else {
            self.state.load = (self.state.load + self.jitter.next_delta())
                .clamp(LoadState::LOAD_MIN, LoadState::LOAD_MAX);
        }

        if self.state.spike_active
            && observed > SCALE_UP_THRESHOLD
            && self.state.replicas < LoadState::REPLICAS_MAX
        {
            self.state.replicas += 1;
            debug!(
                observed,
                replicas = self.state.replicas,
                "scaled up"
            );
        } else if !self.state.spike_active && self.state.replicas > LoadState::REPLICAS_MIN {
            self.state.replicas -= 1;
            debug!(replicas = self.state.replicas, "scaled down");
        }
    }

    /// Flip the spike flag. No other field is touched; subsequent
    /// ticks react to the new value.
    pub fn toggle_load_spike(&mut self) {
        self.state.spike_active = !self.state.spike_active;
        debug!(spike_active = self.state.spike_active, "spike toggled");
    }

    /// Restore the initial state exactly.
    pub fn reset(&mut self) {
        self.state = LoadState::initial();
        debug!("simulation reset");
    }

    /// Current state, by copy.
    pub fn snapshot(&self) -> LoadState {
        self.state
    }
}

impl Default for LoadController {
    fn default() -> Self {
        Self::new()
    }
}
