/// Turns chunk callbacks into whole-percent progress updates.
///
/// Only increases are reported, so a job's progress events are strictly
/// increasing and capped at 100.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last: Option<u8>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Percent to publish for this chunk, if it moved forward
    pub fn observe(&mut self, downloaded: u64, total: Option<u64>) -> Option<u8> {
        let percent = percent_of(downloaded, total?)?;
        if self.last.is_some_and(|last| percent <= last) {
            return None;
        }
        self.last = Some(percent);
        Some(percent)
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }
}

/// `floor(downloaded / total * 100)`, `None` when the total is unknown
pub fn percent_of(downloaded: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let percent = (downloaded as u128 * 100 / total as u128).min(100);
    Some(percent as u8)
}
