use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    Idle,
    Fetching,
}

/// Two-state guard around incremental loads.
///
/// Proximity signals that arrive while a cycle is in flight are dropped, not
/// queued. The controller returns to `Idle` when the [`FetchGuard`] drops,
/// whatever the cycle yielded.
#[derive(Debug, Default)]
pub struct PaginationController {
    in_flight: AtomicUsize,
}

/// Held for the duration of one cycle.
#[derive(Debug)]
pub struct FetchGuard<'a> {
    controller: &'a PaginationController,
}

impl PaginationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PaginationState {
        if self.in_flight.load(Ordering::Acquire) == 0 {
            PaginationState::Idle
        } else {
            PaginationState::Fetching
        }
    }

    /// Handle a proximity signal. Starts a cycle only when idle and the first
    /// load has already produced items.
    pub fn try_begin(&self, store_has_items: bool) -> Option<FetchGuard<'_>> {
        if !store_has_items {
            debug!("Proximity signal before first load, ignoring");
            return None;
        }
        match self
            .in_flight
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Some(FetchGuard { controller: self }),
            Err(_) => {
                debug!("Cycle already in flight, dropping proximity signal");
                None
            }
        }
    }

    /// Start a cycle unconditionally (explicit reset/refresh).
    pub fn force_begin(&self) -> FetchGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        FetchGuard { controller: self }
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.controller.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
