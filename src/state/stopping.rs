use super::StateError;

/// Outcome of feeding one listing item to the heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    StopSource,
}

/// Status returned up the crawl call chain
///
/// Every terminal variant still lets the caller flush crawl state before
/// unwinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    /// Keep paginating
    Continue,
    /// Enough consecutive already-seen items: no new content left
    StopSource,
    /// The per-source item cap was reached
    CapReached,
    /// No further page exists, or the listing could not be fetched
    Exhausted,
}

impl CrawlStatus {
    /// Returns true if traversal of the current source should end
    pub fn is_terminal(self) -> bool {
        !matches!(self, CrawlStatus::Continue)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CrawlStatus::Continue => "continue",
            CrawlStatus::StopSource => "stop_source",
            CrawlStatus::CapReached => "cap_reached",
            CrawlStatus::Exhausted => "exhausted",
        }
    }
}

impl From<Verdict> for CrawlStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Continue => CrawlStatus::Continue,
            Verdict::StopSource => CrawlStatus::StopSource,
        }
    }
}

/// Ends pagination after a run of consecutive already-seen items
///
/// Listings are newest-first but can interleave pinned older items, so a
/// single seen item is not enough evidence that the rest is stale.
#[derive(Debug, Clone)]
pub struct StoppingHeuristic {
    threshold: u32,
    consecutive_seen: u32,
}

impl StoppingHeuristic {
    /// Creates a heuristic; a threshold of zero is rejected
    pub fn new(threshold: u32) -> Result<Self, StateError> {
        if threshold < 1 {
            return Err(StateError::InvalidThreshold(threshold));
        }
        Ok(Self {
            threshold,
            consecutive_seen: 0,
        })
    }

    /// Records one item and reports whether the source should stop
    pub fn feed(&mut self, is_seen: bool) -> Verdict {
        if is_seen {
            self.consecutive_seen += 1;
        } else {
            self.consecutive_seen = 0;
        }

        if self.consecutive_seen >= self.threshold {
            Verdict::StopSource
        } else {
            Verdict::Continue
        }
    }

    /// Clears the counter before traversing a new source
    pub fn reset(&mut self) {
        self.consecutive_seen = 0;
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn consecutive_seen(&self) -> u32 {
        self.consecutive_seen
    }
}
