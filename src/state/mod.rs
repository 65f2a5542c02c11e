//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: Tracks one results page through fetching, parsing and accumulating
//! - `PageTracker`: Enforces legal `PageState` transitions for the page in flight

mod page_state;
mod tracker;

// Re-export main types
pub use page_state::PageState;
pub use tracker::PageTracker;
