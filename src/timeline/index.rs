use crate::timeline::model::{LyricSegment, Timeline, VisualAsset};

/// Index of the last asset whose `time_index <= t`.
///
/// Returns `None` when `t` precedes the first asset or the list is empty. Assumes `assets` is
/// sorted by `time_index`.
pub fn resolve_active_asset(assets: &[VisualAsset], t: f64) -> Option<usize> {
    let mut active = None;
    for (i, a) in assets.iter().enumerate() {
        if a.time_index <= t {
            active = Some(i);
        } else {
            break;
        }
    }
    active
}

/// Index of the segment with `start_time <= t < end_time`.
///
/// Overlapping segments resolve to the first match in list order.
pub fn resolve_active_segment(segments: &[LyricSegment], t: f64) -> Option<usize> {
    for (i, s) in segments.iter().enumerate() {
        if s.start_time > t {
            break;
        }
        if s.contains(t) {
            return Some(i);
        }
    }
    None
}

/// Active entries for one playback time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ActiveEntries {
    /// Active lyric segment.
    pub segment: Option<usize>,
    /// Active visual asset.
    pub asset: Option<usize>,
}

/// Monotonic scan cursor over a [`Timeline`].
///
/// Produces the same answers as [`resolve_active_asset`] and [`resolve_active_segment`], but
/// resumes scanning from where the previous query left off. A query time lower than the previous
/// one (a seek) resets the cursor.
#[derive(Clone, Debug, Default)]
pub struct TimelineCursor {
    last_t: Option<f64>,
    asset: Option<usize>,
    // All segments before this index ended at or before `last_t`.
    segment_floor: usize,
}

impl TimelineCursor {
    /// Create a cursor positioned before the start of the timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all scan state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Resolve the active asset and segment at `t`.
    pub fn resolve(&mut self, timeline: &Timeline, t: f64) -> ActiveEntries {
        if t.is_nan() {
            return ActiveEntries::default();
        }
        if let Some(last) = self.last_t
            && t < last
        {
            tracing::debug!(from = last, to = t, "timeline cursor reset on seek");
            self.reset();
        }
        self.last_t = Some(t);

        let assets = timeline.assets();
        let mut next = self.asset.map_or(0, |i| i + 1);
        while next < assets.len() && assets[next].time_index <= t {
            self.asset = Some(next);
            next += 1;
        }

        let segments = timeline.segments();
        while self.segment_floor < segments.len() && segments[self.segment_floor].end_time <= t {
            self.segment_floor += 1;
        }
        let segment = resolve_active_segment(&segments[self.segment_floor..], t)
            .map(|i| i + self.segment_floor);

        ActiveEntries {
            segment,
            asset: self.asset,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/index.rs"]
mod tests;
