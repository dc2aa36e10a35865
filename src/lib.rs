//! Glyph Journey - character formation core
//!
//! Core modules:
//! - `engine`: Deterministic rules (recipes, spatial classification, tracing, flow)
//! - `journey`: State-owning service that drives one player's journey
//! - `settings`: Data-driven timing and thresholds
//! - `error`: Load-time and action errors

pub mod engine;
pub mod error;
pub mod journey;
pub mod settings;

pub use error::{ActionError, CatalogError, SettingsError};
pub use journey::{Journey, JourneyEvent, PendingMerge};
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Workspace side length (the drop zone is square)
    pub const WORKSPACE_SIZE: f32 = 350.0;
    /// Half a tile; dropped pieces are clamped so the whole tile stays visible
    pub const TILE_MARGIN: f32 = 44.0;

    /// Max pairwise distance for a pair to combine in free mode
    pub const PAIR_PROXIMITY: f32 = 150.0;
    /// Max pairwise distance for a triple to combine
    pub const TRIPLE_PROXIMITY: f32 = 175.0;
    /// Three-piece stacks only read as vertical when ySpan > xSpan * this
    pub const STACKED_RATIO: f32 = 0.9;
    /// More pieces than this on a failed guided attempt gets the "too many" message
    pub const TOO_MANY_PIECES: usize = 3;

    /// Guide point counts as covered within this distance (normalized space)
    pub const TRACE_TOLERANCE: f32 = 0.08;
    /// Dwell time after which a finished stroke is floored at the threshold
    pub const TRACE_MIN_DURATION_MS: u64 = 1200;
    /// Confirm is ignored at or below this progress
    pub const CONFIRM_MIN_PROGRESS: f32 = 0.01;
    /// Default fraction of guide points that completes a trace
    pub const DEFAULT_COMPLETION_THRESHOLD: f32 = 0.62;

    /// Separator used in canonical recipe keys
    pub const KEY_SEPARATOR: &str = "|";
}

/// Clamp a drop location so the tile stays inside the workspace
#[inline]
pub fn clamp_to_workspace(pos: Vec2) -> Vec2 {
    use consts::{TILE_MARGIN, WORKSPACE_SIZE};
    pos.clamp(
        Vec2::splat(TILE_MARGIN),
        Vec2::splat(WORKSPACE_SIZE - TILE_MARGIN),
    )
}

/// Width and height of the bounding box around a set of points
#[inline]
pub fn bounding_spans(points: &[Vec2]) -> Vec2 {
    let Some(first) = points.first() else {
        return Vec2::ZERO;
    };
    let (min, max) = points
        .iter()
        .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
    max - min
}

/// Largest distance between any two points
#[inline]
pub fn max_pairwise_distance(points: &[Vec2]) -> f32 {
    let mut max = 0.0_f32;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            max = max.max(a.distance(*b));
        }
    }
    max
}
