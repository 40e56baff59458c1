//! Debounced foreground/background tracking.
//!
//! The host feeds OS lifecycle callbacks in; a short debounce window
//! swallows the pause/resume flicker of screen transitions so only real
//! background trips are announced. The tracker owns no threads or timers:
//! the host calls [`Foreground::poll`] once the window may have elapsed
//! (from its own timer, or simply on the next callback).

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::events::{EventBus, StateEvent};

const CHECK_DELAY: Duration = Duration::from_millis(500);

struct ForegroundState {
    foreground: bool,
    paused: bool,
    pending_check: Option<Instant>,
    activity_count: u32,
    outside_operation: bool,
}

pub struct Foreground {
    bus: Arc<dyn EventBus>,
    state: Mutex<ForegroundState>,
}

impl Foreground {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self {
            bus,
            state: Mutex::new(ForegroundState {
                foreground: false,
                paused: true,
                pending_check: None,
                activity_count: 0,
                outside_operation: false,
            }),
        }
    }

    pub fn is_foreground(&self) -> bool {
        self.state.lock().foreground
    }

    pub fn is_background(&self) -> bool {
        !self.is_foreground()
    }

    /// Mark that an external flow (a payment dialog, a share sheet) is
    /// about to pause the app and will return shortly; suppresses the
    /// background transition until cleared.
    pub fn set_outside_operation(&self, active: bool) {
        self.state.lock().outside_operation = active;
    }

    pub fn on_activity_created(&self) {
        self.state.lock().activity_count += 1;
    }

    pub fn on_activity_resumed(&self) {
        let mut state = self.state.lock();
        state.paused = false;
        state.pending_check = None;
        let was_background = !state.foreground;
        state.foreground = true;
        drop(state);

        if was_background {
            tracing::debug!("went foreground");
            self.bus.publish(StateEvent::AppToForeground);
        } else {
            tracing::debug!("still foreground");
        }
    }

    pub fn on_activity_paused(&self, now: Instant) {
        let mut state = self.state.lock();
        state.paused = true;
        state.pending_check = Some(now + CHECK_DELAY);
    }

    /// Commit a pending background transition once the debounce window has
    /// elapsed without a resume in between.
    pub fn poll(&self, now: Instant) {
        let mut state = self.state.lock();
        let Some(due) = state.pending_check else {
            return;
        };
        if now < due {
            return;
        }
        state.pending_check = None;

        if state.foreground && state.paused && !state.outside_operation {
            state.foreground = false;
            drop(state);
            tracing::debug!("went background");
            self.bus.publish(StateEvent::AppToBackground);
        } else {
            tracing::debug!("still foreground");
        }
    }

    /// The last screen went away without a pause cycle; treat as
    /// background immediately.
    pub fn on_activity_destroyed(&self) {
        let mut state = self.state.lock();
        state.activity_count = state.activity_count.saturating_sub(1);
        if state.activity_count == 0 && state.foreground {
            state.foreground = false;
            drop(state);
            tracing::debug!("destroyed while foreground");
            self.bus.publish(StateEvent::AppToBackground);
        }
    }
}
