//! Trace progress tracking
//!
//! Progress is the fraction of guide points that have at least one pointer
//! sample within tolerance. It never goes down during an attempt; only
//! [`TraceTracker::clear`] resets it.
//!
//! Finishing a stroke after tracing for at least the minimum duration floors
//! progress at the guide's completion threshold, even if raw coverage is lower.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{
    CONFIRM_MIN_PROGRESS, DEFAULT_COMPLETION_THRESHOLD, TRACE_MIN_DURATION_MS, TRACE_TOLERANCE,
};
use crate::error::CatalogError;

/// One guide stroke, points in normalized [0, 1] space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceStroke {
    pub points: Vec<Vec2>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawGuide {
    strokes: Vec<TraceStroke>,
    #[serde(default = "default_threshold")]
    completion_threshold: f32,
}

fn default_threshold() -> f32 {
    DEFAULT_COMPLETION_THRESHOLD
}

/// Strokes to trace plus the fraction that counts as complete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGuide")]
pub struct TraceGuide {
    strokes: Vec<TraceStroke>,
    completion_threshold: f32,
}

impl TryFrom<RawGuide> for TraceGuide {
    type Error = CatalogError;

    fn try_from(raw: RawGuide) -> Result<Self, Self::Error> {
        Self::new(raw.strokes, raw.completion_threshold)
    }
}

impl TraceGuide {
    pub fn new(strokes: Vec<TraceStroke>, completion_threshold: f32) -> Result<Self, CatalogError> {
        if strokes.iter().all(|s| s.points.is_empty()) {
            return Err(CatalogError::EmptyGuide);
        }
        if !(completion_threshold > 0.0 && completion_threshold <= 1.0) {
            return Err(CatalogError::InvalidThreshold(completion_threshold));
        }
        Ok(Self {
            strokes,
            completion_threshold,
        })
    }

    /// Build a guide from point tuples, one slice per stroke
    pub fn from_points(strokes: &[&[(f32, f32)]], completion_threshold: f32) -> Result<Self, CatalogError> {
        let strokes = strokes
            .iter()
            .map(|points| TraceStroke {
                points: points.iter().map(|&(x, y)| Vec2::new(x, y)).collect(),
            })
            .collect();
        Self::new(strokes, completion_threshold)
    }

    pub fn strokes(&self) -> &[TraceStroke] {
        &self.strokes
    }

    pub fn completion_threshold(&self) -> f32 {
        self.completion_threshold
    }

    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(|s| s.points.len()).sum()
    }

    /// Fraction of guide points with a sample within `tolerance`
    pub fn coverage(&self, samples: &[Vec2], tolerance: f32) -> f32 {
        let total = self.point_count();
        if samples.is_empty() || total == 0 {
            return 0.0;
        }
        let covered = self
            .strokes
            .iter()
            .flat_map(|s| s.points.iter())
            .filter(|guide_point| samples.iter().any(|s| s.distance(**guide_point) <= tolerance))
            .count();
        (covered as f32 / total as f32).min(1.0)
    }
}

/// Per-attempt tracing state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceTracker {
    progress: f32,
    completed: bool,
    first_sample_at: Option<Duration>,
    tolerance: f32,
    min_duration: Duration,
}

impl Default for TraceTracker {
    fn default() -> Self {
        Self::new(TRACE_TOLERANCE, Duration::from_millis(TRACE_MIN_DURATION_MS))
    }
}

impl TraceTracker {
    pub fn new(tolerance: f32, min_duration: Duration) -> Self {
        Self {
            progress: 0.0,
            completed: false,
            first_sample_at: None,
            tolerance,
            min_duration,
        }
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Feed the samples drawn so far in this attempt
    pub fn update(&mut self, samples: &[Vec2], stroke_ended: bool, guide: &TraceGuide, now: Duration) -> f32 {
        if !samples.is_empty() && self.first_sample_at.is_none() {
            self.first_sample_at = Some(now);
        }

        let coverage = guide.coverage(samples, self.tolerance);
        self.progress = self.progress.max(coverage);

        if stroke_ended {
            let dwelled = self
                .first_sample_at
                .is_some_and(|start| now.saturating_sub(start) >= self.min_duration);
            if dwelled {
                self.progress = self.progress.max(guide.completion_threshold());
            }
        }

        self.progress
    }

    /// Mark complete once progress reaches the guide threshold
    ///
    /// Returns true only on the transition.
    pub fn complete_at_threshold(&mut self, guide: &TraceGuide) -> bool {
        if self.completed || self.progress < guide.completion_threshold() {
            return false;
        }
        self.completed = true;
        true
    }

    /// Explicit confirmation; ignored until some tracing has happened
    ///
    /// Returns true only on the transition.
    pub fn confirm(&mut self) -> bool {
        if self.completed || self.progress <= CONFIRM_MIN_PROGRESS {
            return false;
        }
        self.completed = true;
        true
    }

    /// Start a fresh attempt
    pub fn clear(&mut self) {
        self.progress = 0.0;
        self.completed = false;
        self.first_sample_at = None;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn person() -> TraceGuide {
        TraceGuide::from_points(
            &[
                &[(0.48, 0.22), (0.40, 0.46), (0.34, 0.74)],
                &[(0.50, 0.22), (0.58, 0.50), (0.68, 0.76)],
            ],
            0.62,
        )
        .expect("valid guide")
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_coverage_counts_points_within_tolerance() {
        let guide = person();
        // (0.48, 0.22) and (0.50, 0.22) are both within 0.08 of this sample
        let samples = [Vec2::new(0.49, 0.22)];
        assert!((guide.coverage(&samples, 0.08) - 2.0 / 6.0).abs() < 1e-5);
        assert_eq!(guide.coverage(&[], 0.08), 0.0);
        assert_eq!(guide.coverage(&[Vec2::new(0.95, 0.95)], 0.08), 0.0);
    }

    #[test]
    fn test_progress_never_decreases() {
        let guide = person();
        let mut tracker = TraceTracker::default();
        let full: Vec<Vec2> = guide.strokes().iter().flat_map(|s| s.points.clone()).collect();

        let p1 = tracker.update(&full, false, &guide, ms(0));
        assert!((p1 - 1.0).abs() < 1e-5);
        let p2 = tracker.update(&[Vec2::new(0.9, 0.9)], false, &guide, ms(100));
        assert!((p2 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_grace_floor_after_min_duration() {
        let guide = person();
        let mut tracker = TraceTracker::default();
        let sparse = [Vec2::new(0.49, 0.22)];

        tracker.update(&sparse, false, &guide, ms(1000));
        // Too soon: no floor
        let early = tracker.update(&sparse, true, &guide, ms(1500));
        assert!(early < guide.completion_threshold());

        let late = tracker.update(&sparse, true, &guide, ms(2200));
        assert!((late - 0.62).abs() < 1e-5);
    }

    #[test]
    fn test_grace_needs_stroke_end() {
        let guide = person();
        let mut tracker = TraceTracker::default();
        let sparse = [Vec2::new(0.49, 0.22)];
        tracker.update(&sparse, false, &guide, ms(0));
        let p = tracker.update(&sparse, false, &guide, ms(5000));
        assert!(p < guide.completion_threshold());
    }

    #[test]
    fn test_confirm_requires_some_progress() {
        let guide = person();
        let mut tracker = TraceTracker::default();
        assert!(!tracker.confirm());
        assert!(!tracker.is_completed());

        tracker.update(&[Vec2::new(0.49, 0.22)], false, &guide, ms(0));
        assert!(tracker.confirm());
        assert!(tracker.is_completed());
        // Second confirm is not a new transition
        assert!(!tracker.confirm());
    }

    #[test]
    fn test_complete_at_threshold() {
        let guide = person();
        let mut tracker = TraceTracker::default();
        tracker.update(&[Vec2::new(0.49, 0.22)], false, &guide, ms(0));
        assert!(!tracker.complete_at_threshold(&guide));

        let full: Vec<Vec2> = guide.strokes().iter().flat_map(|s| s.points.clone()).collect();
        tracker.update(&full, false, &guide, ms(50));
        assert!(tracker.complete_at_threshold(&guide));
        assert!(!tracker.complete_at_threshold(&guide));
    }

    #[test]
    fn test_clear_resets_attempt() {
        let guide = person();
        let mut tracker = TraceTracker::default();
        tracker.update(&[Vec2::new(0.49, 0.22)], false, &guide, ms(0));
        tracker.confirm();
        tracker.clear();
        assert_eq!(tracker.progress(), 0.0);
        assert!(!tracker.is_completed());

        // Dwell timer restarts with the new attempt
        let p = tracker.update(&[Vec2::new(0.49, 0.22)], true, &guide, ms(1300));
        assert!(p < guide.completion_threshold());
    }

    #[test]
    fn test_invalid_guides_rejected() {
        assert!(matches!(
            TraceGuide::from_points(&[&[]], 0.5),
            Err(CatalogError::EmptyGuide)
        ));
        assert!(matches!(
            TraceGuide::from_points(&[&[(0.1, 0.1)]], 0.0),
            Err(CatalogError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_guide_json_defaults_threshold() {
        let guide: TraceGuide =
            serde_json::from_str(r#"{ "strokes": [[[0.5, 0.2], [0.5, 0.8]]] }"#).expect("valid guide");
        assert_eq!(guide.point_count(), 2);
        assert!((guide.completion_threshold() - DEFAULT_COMPLETION_THRESHOLD).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn progress_is_monotonic(
            steps in prop::collection::vec(
                (prop::collection::vec((0.0f32..1.0, 0.0f32..1.0), 0..12), any::<bool>(), 0u64..400),
                1..24,
            )
        ) {
            let guide = person();
            let mut tracker = TraceTracker::default();
            let mut now = Duration::ZERO;
            let mut last = 0.0f32;
            for (points, ended, dt) in steps {
                now += Duration::from_millis(dt);
                let samples: Vec<Vec2> = points.into_iter().map(|(x, y)| Vec2::new(x, y)).collect();
                let progress = tracker.update(&samples, ended, &guide, now);
                prop_assert!(progress >= last);
                prop_assert!((0.0..=1.0).contains(&progress));
                last = progress;
            }
        }
    }
}
