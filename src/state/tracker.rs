//! Per-page state tracking for the crawl loop
//!
//! A [`PageTracker`] follows one results page through its states and rejects
//! transitions the state machine does not allow.

use crate::state::PageState;
use crate::SweepError;

/// Tracks the state of the results page currently in flight
#[derive(Debug, Clone)]
pub struct PageTracker {
    /// 1-based page number
    pub page: u32,
    state: PageState,
}

impl PageTracker {
    /// Starts tracking a page in the `Fetching` state
    pub fn start(page: u32) -> Self {
        Self {
            page,
            state: PageState::Fetching,
        }
    }

    /// Current state
    pub fn state(&self) -> PageState {
        self.state
    }

    /// Moves to `next`, rejecting transitions the page state machine forbids
    pub fn advance(&mut self, next: PageState) -> Result<(), SweepError> {
        if !self.state.can_transition_to(next) {
            return Err(SweepError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::trace!("Page {}: {} -> {}", self.page, self.state, next);
        self.state = next;
        Ok(())
    }
}
