/// Phases of one synchronization run
use std::fmt;

/// Represents where a run currently is
///
/// A run only moves forward: Crawling, then Extracting, then Reconciling,
/// then Done. There are no retries between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPhase {
    /// Walking the paginated listing
    Crawling,

    /// Fetching and extracting item pages
    Extracting,

    /// Diffing extracted items against the store
    Reconciling,

    /// Terminal
    Done,
}

impl SyncPhase {
    /// Returns true for the terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// The phase that follows this one, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Crawling => Some(Self::Extracting),
            Self::Extracting => Some(Self::Reconciling),
            Self::Reconciling => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// Returns true if a run may move from this phase to `to`
    pub fn can_transition_to(&self, to: SyncPhase) -> bool {
        self.next() == Some(to)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crawling => "crawling",
            Self::Extracting => "extracting",
            Self::Reconciling => "reconciling",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
