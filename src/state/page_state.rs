/// Page state definitions for tracking crawl progress
///
/// Every results page walks `Fetching -> Parsing -> Accumulating` and then
/// either moves on (`NextPage`), stops the crawl (`Done`), or is recorded as
/// `Failed` before the crawler moves on anyway.
use std::fmt;

/// Represents the current state of a results page in the crawl loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Page is being requested through the resilience layer
    Fetching,

    /// Body received, listing fragments are being extracted
    Parsing,

    /// Retained records are being appended to the result buffer
    Accumulating,

    // ===== Terminal States =====
    /// Page finished, the crawler advances to the following page
    NextPage,

    /// Crawl stops after this page
    Done,

    /// Page could not be fetched or yielded no fragments
    Failed,
}

impl PageState {
    /// Returns true if this is a terminal state for the page
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NextPage | Self::Done | Self::Failed)
    }

    /// Returns true if the page is still being worked on
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Fetching, Self::Parsing)
                | (Self::Fetching, Self::Failed)
                | (Self::Fetching, Self::Done)
                | (Self::Parsing, Self::Accumulating)
                | (Self::Parsing, Self::Failed)
                | (Self::Parsing, Self::Done)
                | (Self::Accumulating, Self::NextPage)
                | (Self::Accumulating, Self::Done)
        )
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Accumulating => "accumulating",
            Self::NextPage => "next_page",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
