use crate::model::SubtitleRecord;

/// Index of the first record, in sequence order, whose interval contains `t`.
///
/// Overlapping cues resolve to whichever comes first in the sequence, which
/// after a manual reorder is not necessarily the earliest one.
pub fn active_index(t: f64, records: &[SubtitleRecord]) -> Option<usize> {
    records.iter().position(|r| r.contains(t))
}

/// Clamps a seek request into `[0, duration]`; an unknown duration only clamps at zero.
pub fn seek_target(t: f64, duration: Option<f64>) -> f64 {
    let upper = match duration {
        Some(d) if d > 0.0 && d.is_finite() => t.min(d),
        _ => t,
    };
    upper.max(0.0)
}

/// An A-B loop over part of the media.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopWindow {
    pub start: f64,
    pub end: f64,
}

impl LoopWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn from_record(r: &SubtitleRecord) -> Self {
        Self::new(r.start, r.end)
    }

    /// Where playback should jump to when polled at `t`, if anywhere.
    ///
    /// `epsilon` absorbs the polling granularity so the boundary is not missed.
    pub fn rewind_target(&self, t: f64, epsilon: f64) -> Option<f64> {
        (self.end > self.start && t > self.end - epsilon).then_some(self.start)
    }
}
