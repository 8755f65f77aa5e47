//! Outbound flow control for the crawl.
//!
//! Every `find_node` reply can fan out into several new queries, so an
//! unpaced crawl grows exponentially until the local socket drops packets.
//! [`FlowControl`] hands out one token per discovery query. Tokens are
//! refilled once per tick up to the current capacity, and the capacity ramps
//! from `initial` to `ceiling` by `step` each tick, then holds.
//!
//! ```
//! use dht_crawler::flow::{FlowConfig, FlowControl};
//!
//! let flow = FlowControl::new(FlowConfig {
//!     initial: 2,
//!     step: 2,
//!     ceiling: 4,
//!     tick_millis: 1000,
//! });
//!
//! assert!(flow.try_acquire());
//! assert!(flow.try_acquire());
//! assert!(!flow.try_acquire());
//!
//! flow.tick();
//! assert_eq!(flow.capacity(), 4);
//! assert_eq!(flow.available(), 4);
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::constants::{FLOW_CEILING, FLOW_INITIAL, FLOW_STEP, FLOW_TICK};

/// Ramp parameters for [`FlowControl`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Tokens available before the first tick.
    pub initial: usize,
    /// Capacity added per tick.
    pub step: usize,
    /// Capacity never grows past this.
    pub ceiling: usize,
    pub tick_millis: u64,
}

impl FlowConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            initial: FLOW_INITIAL,
            step: FLOW_STEP,
            ceiling: FLOW_CEILING,
            tick_millis: FLOW_TICK.as_millis() as u64,
        }
    }
}

struct FlowState {
    capacity: usize,
    tokens: usize,
}

/// Token supply gating outbound discovery queries.
///
/// The ramp task and the dispatch loop both touch the counters; all access
/// goes through the mutex.
pub struct FlowControl {
    config: FlowConfig,
    state: Mutex<FlowState>,
    refilled: Notify,
}

impl FlowControl {
    pub fn new(config: FlowConfig) -> Arc<Self> {
        let initial = config.initial.min(config.ceiling);
        Arc::new(Self {
            config,
            state: Mutex::new(FlowState {
                capacity: initial,
                tokens: initial,
            }),
            refilled: Notify::new(),
        })
    }

    /// Takes a token if one is available.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if state.tokens == 0 {
            return false;
        }
        state.tokens -= 1;
        true
    }

    /// Waits until a token is available and takes it.
    pub async fn wait_flow(&self) {
        loop {
            // Registered before the check so a refill in between is not lost.
            let refilled = self.refilled.notified();
            if self.try_acquire() {
                return;
            }
            refilled.await;
        }
    }

    /// Advances the ramp by one step and refills the tokens.
    pub fn tick(&self) {
        {
            let mut state = self.state.lock();
            let previous = state.capacity;
            state.capacity = (state.capacity + self.config.step).min(self.config.ceiling);
            state.tokens = state.capacity;

            if state.capacity == self.config.ceiling && previous < self.config.ceiling {
                info!(capacity = state.capacity, "flow control reached its ceiling");
            }
        }
        self.refilled.notify_waiters();
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    pub fn available(&self) -> usize {
        self.state.lock().tokens
    }

    /// Runs [`tick`](Self::tick) every `tick_millis` on its own task.
    pub fn spawn_ramp(self: &Arc<Self>) -> JoinHandle<()> {
        let flow = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(flow.config.tick());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            debug!(
                initial = flow.capacity(),
                ceiling = flow.config.ceiling,
                "flow control ramp started"
            );

            loop {
                ticker.tick().await;
                flow.tick();
            }
        })
    }
}
