//! Single-flight lazy value.
//!
//! [`SingleFlight`] holds an optional cached value. The first caller to find it
//! missing becomes the leader and builds it without holding the lock; callers
//! arriving while that build runs wait for its outcome instead of starting
//! their own.
//!
//! ```text
//!   caller A ──lock──> missing, no flight ──> leader: build() ──> publish ──> complete
//!   caller B ──lock──> flight in progress ──> wait ───────────────────────────> same result
//!   caller C ──lock──> cached ──> return
//! ```
//!
//! Invalidation bumps a generation counter and detaches the running flight.
//! A leader whose generation is stale still hands its result to the callers
//! that joined it, but does not publish it as the cached value.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::error;

use crate::error::{Result, SitemapError};

/// How a caller obtained its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRole {
    /// The value was already cached.
    Cached,
    /// This caller ran the build.
    Led,
    /// This caller waited for another caller's build.
    Joined,
}

/// One in-progress build whose outcome is shared by all waiters.
#[derive(Debug)]
pub struct Flight<T> {
    outcome: Mutex<Option<T>>,
    done: Condvar,
}

impl<T: Clone> Flight<T> {
    pub fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    /// Store the outcome and wake all waiters. Only the first call has effect.
    pub fn complete(&self, outcome: T) {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            *slot = Some(outcome);
        }
        self.done.notify_all();
    }

    /// Block until the outcome is available.
    pub fn wait(&self) -> T {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.done.wait(&mut slot);
        }
    }

    /// Check whether the outcome has been stored.
    pub fn is_complete(&self) -> bool {
        self.outcome.lock().is_some()
    }
}

impl<T: Clone> Default for Flight<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct FlightState<T> {
    current: Option<T>,
    in_flight: Option<Arc<Flight<Result<T>>>>,
    generation: u64,
}

/// A lazily built value with single-flight rebuilds.
#[derive(Debug)]
pub struct SingleFlight<T> {
    state: Mutex<FlightState<T>>,
}

impl<T: Clone> SingleFlight<T> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FlightState {
                current: None,
                in_flight: None,
                generation: 0,
            }),
        }
    }

    /// Return the cached value, building it with `build` if absent.
    ///
    /// A failed build is returned to the leader and every joined caller and is
    /// not cached. A panic inside `build` is reported as
    /// [`SitemapError::RebuildAborted`].
    pub fn get_or_build<F>(&self, build: F) -> Result<(T, FlightRole)>
    where
        F: FnOnce() -> Result<T>,
    {
        let (flight, generation) = {
            let mut state = self.state.lock();
            if let Some(value) = &state.current {
                return Ok((value.clone(), FlightRole::Cached));
            }
            if let Some(flight) = state.in_flight.clone() {
                drop(state);
                return flight.wait().map(|value| (value, FlightRole::Joined));
            }
            let flight = Arc::new(Flight::new());
            state.in_flight = Some(Arc::clone(&flight));
            (flight, state.generation)
        };

        let outcome = match panic::catch_unwind(AssertUnwindSafe(build)) {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Build panicked, waiting callers receive an error");
                Err(SitemapError::RebuildAborted)
            }
        };

        {
            let mut state = self.state.lock();
            if state
                .in_flight
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &flight))
            {
                state.in_flight = None;
            }
            if let Ok(value) = &outcome {
                if state.generation == generation {
                    state.current = Some(value.clone());
                }
            }
        }

        flight.complete(outcome.clone());
        outcome.map(|value| (value, FlightRole::Led))
    }

    /// The cached value, without building.
    pub fn current(&self) -> Option<T> {
        self.state.lock().current.clone()
    }

    /// Drop the cached value and detach any running build.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.current = None;
        state.in_flight = None;
        state.generation = state.generation.wrapping_add(1);
    }

    /// Check whether a build is running.
    pub fn is_building(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}
