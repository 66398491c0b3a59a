//! Repeating UI-thread timer that polls the transport.
//!
//! The timer task runs on the local set and only holds a `Weak` reference to
//! its target. Each start hands out a new generation; stopping bumps the
//! generation so a tick scheduled by an older timer is ignored even if the
//! task or its token is still around.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Receiver of timer ticks
pub trait Tick {
    fn tick(&mut self, token: &TickToken);
}

/// Identifies the timer instance that delivered a tick
#[derive(Clone, Debug)]
pub struct TickToken {
    generation: u64,
    current: Rc<Cell<u64>>,
}

impl TickToken {
    pub fn is_live(&self) -> bool {
        self.current.get() == self.generation
    }
}

enum DriverState {
    Inactive,
    Running { task: JoinHandle<()>, token: TickToken },
}

pub struct PollingDriver {
    generation: Rc<Cell<u64>>,
    state: DriverState,
}

impl PollingDriver {
    pub fn new() -> Self {
        Self {
            generation: Rc::new(Cell::new(0)),
            state: DriverState::Inactive,
        }
    }

    /// Start ticking `target`, replacing any running timer.
    ///
    /// Must be called from within a `LocalSet`.
    pub fn start<T: Tick + 'static>(&mut self, target: Weak<RefCell<T>>) {
        self.stop();

        let token = TickToken {
            generation: self.generation.get(),
            current: self.generation.clone(),
        };
        let task = tokio::task::spawn_local(run(target, token.clone()));
        self.state = DriverState::Running { task, token };
        tracing::trace!("Polling driver started");
    }

    pub fn stop(&mut self) {
        self.generation.set(self.generation.get().wrapping_add(1));
        if let DriverState::Running { task, .. } =
            std::mem::replace(&mut self.state, DriverState::Inactive)
        {
            task.abort();
            tracing::trace!("Polling driver stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, DriverState::Running { .. })
    }

    /// Token of the running timer, if any
    #[cfg(test)]
    pub fn token(&self) -> Option<TickToken> {
        match &self.state {
            DriverState::Running { token, .. } => Some(token.clone()),
            DriverState::Inactive => None,
        }
    }
}

impl Default for PollingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PollingDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<T: Tick>(target: Weak<RefCell<T>>, token: TickToken) {
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; the timer fires one period after start
    interval.tick().await;

    loop {
        interval.tick().await;
        if !token.is_live() {
            break;
        }
        let Some(target) = target.upgrade() else {
            break;
        };
        // Skip the tick rather than re-enter a target that is mid-operation
        let Ok(mut target) = target.try_borrow_mut() else {
            continue;
        };
        target.tick(&token);
    }
}
