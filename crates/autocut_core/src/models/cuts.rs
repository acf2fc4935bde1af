//! Millisecond-accurate precision cuts derived from coarse analysis.

use serde::{Deserialize, Serialize};

use super::enums::ActionClass;

/// One action-classified sub-span of a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutEntry {
    pub start_ms: u64,
    pub end_ms: u64,
    pub action: ActionClass,
    /// Suggested playback factor from the detector's policy table.
    /// Clamped to the active speed-ramp range at plan time.
    pub suggested_speed: f64,
}

impl CutEntry {
    /// Source-side span length in milliseconds.
    pub fn source_duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Output length after applying the suggested speed.
    pub fn output_duration_ms(&self) -> u64 {
        if self.suggested_speed <= 0.0 {
            return self.source_duration_ms();
        }
        (self.source_duration_ms() as f64 / self.suggested_speed).round() as u64
    }
}

/// Ordered, non-overlapping precision cuts for one clip.
///
/// Invariants: `0 <= start < end <= clip duration` for each entry, and
/// `entries[i].end_ms <= entries[i+1].start_ms`. Produced by the detector;
/// immutable afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionCut {
    pub clip_id: String,
    pub entries: Vec<CutEntry>,
}

impl PrecisionCut {
    pub fn new(clip_id: impl Into<String>, entries: Vec<CutEntry>) -> Self {
        Self {
            clip_id: clip_id.into(),
            entries,
        }
    }

    /// A clip with no usable footage yields zero entries and is excluded
    /// from plan selection.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total source-side footage across all entries.
    pub fn total_source_ms(&self) -> u64 {
        self.entries.iter().map(|e| e.source_duration_ms()).sum()
    }

    /// Check the ordering and bounds invariants against a clip duration.
    pub fn validate(&self, clip_duration_ms: u64) -> Result<(), String> {
        let mut previous_end = 0u64;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.start_ms >= entry.end_ms {
                return Err(format!(
                    "entry {} has inverted span {}..{}",
                    i, entry.start_ms, entry.end_ms
                ));
            }
            if entry.end_ms > clip_duration_ms {
                return Err(format!(
                    "entry {} ends at {}ms beyond clip duration {}ms",
                    i, entry.end_ms, clip_duration_ms
                ));
            }
            if entry.start_ms < previous_end {
                return Err(format!(
                    "entry {} starts at {}ms before previous end {}ms",
                    i, entry.start_ms, previous_end
                ));
            }
            previous_end = entry.end_ms;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: u64, end: u64, speed: f64) -> CutEntry {
        CutEntry {
            start_ms: start,
            end_ms: end,
            action: ActionClass::Neutral,
            suggested_speed: speed,
        }
    }

    #[test]
    fn output_duration_accounts_for_speed() {
        let e = entry(1000, 3000, 2.0);
        assert_eq!(e.source_duration_ms(), 2000);
        assert_eq!(e.output_duration_ms(), 1000);
    }

    #[test]
    fn validate_accepts_ordered_entries() {
        let cut = PrecisionCut::new("c", vec![entry(0, 1000, 1.0), entry(1000, 2500, 1.0)]);
        assert!(cut.validate(3000).is_ok());
    }

    #[test]
    fn validate_rejects_overlap_and_overrun() {
        let overlapping = PrecisionCut::new("c", vec![entry(0, 1500, 1.0), entry(1000, 2500, 1.0)]);
        assert!(overlapping.validate(3000).is_err());

        let overrun = PrecisionCut::new("c", vec![entry(0, 4000, 1.0)]);
        assert!(overrun.validate(3000).is_err());
    }
}
