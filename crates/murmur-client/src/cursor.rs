/// Tracks the newest message so the view knows when to scroll to the bottom.
///
/// A scroll request is raised only when a snapshot is longer than the one
/// before it; re-deliveries of the same collection do not move the view.
#[derive(Debug, Default, Clone)]
pub struct LatestCursor {
    len: usize,
    seq: u64,
}

impl LatestCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot length. Returns the index to scroll to if it grew.
    pub fn observe(&mut self, len: usize) -> Option<usize> {
        let grew = len > self.len;
        self.len = len;
        if grew {
            self.seq += 1;
            Some(len - 1)
        } else {
            None
        }
    }

    pub fn latest_index(&self) -> Option<usize> {
        self.len.checked_sub(1)
    }

    /// Number of scroll requests raised so far.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}
