/// Tracks the resume point of incremental sync over one run: the latest
/// `endAt` of a tournament processed to completion. Only committed
/// tournaments move it, and it never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkTracker {
    previous: i64,
    committed_max: Option<i64>
}

impl WatermarkTracker {
    pub fn new(previous: i64) -> WatermarkTracker {
        WatermarkTracker {
            previous,
            committed_max: None
        }
    }

    pub fn record_success(&mut self, end_at: Option<i64>) {
        if let Some(end_at) = end_at {
            self.committed_max = Some(self.committed_max.map_or(end_at, |max| max.max(end_at)));
        }
    }

    /// The value to persist at the end of the run.
    pub fn next(&self) -> i64 {
        self.committed_max.map_or(self.previous, |max| max.max(self.previous))
    }

    pub fn advanced(&self) -> bool {
        self.next() > self.previous
    }
}
