//! Percentage computation and change detection for transcode progress.

/// Percentage of `duration_ms` covered by `position_ms`.
///
/// Returns 0 when either value is unknown or zero; otherwise
/// `floor(100 * position / duration)` clamped to 100, which absorbs encoder
/// timing overshoot near the end of the stream.
pub fn ratio(position_ms: Option<u64>, duration_ms: Option<u64>) -> u8 {
    match (position_ms, duration_ms) {
        (Some(position), Some(duration)) if position > 0 && duration > 0 => {
            let percent = (u128::from(position) * 100) / u128::from(duration);
            percent.min(100) as u8
        }
        _ => 0,
    }
}

/// Tracks the last percentage seen and reports only changes.
///
/// The tracker is edge-triggered: [`ProgressTracker::update`] yields a value
/// only when the recomputed percentage differs from the previous one. Late
/// or out-of-order positions are clamped by [`ratio`] and may move the value
/// backwards; they are not filtered.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    duration_ms: Option<u64>,
    last: u8,
}

impl ProgressTracker {
    pub fn new(duration_ms: Option<u64>) -> Self {
        Self {
            duration_ms,
            last: 0,
        }
    }

    /// Feed the latest known position.
    pub fn update(&mut self, position_ms: Option<u64>) -> Option<u8> {
        let percent = ratio(position_ms, self.duration_ms);
        if percent == self.last {
            return None;
        }
        self.last = percent;
        Some(percent)
    }

    /// The most recent percentage reported by [`update`](Self::update).
    pub fn last(&self) -> u8 {
        self.last
    }
}
