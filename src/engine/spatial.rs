//! Spatial classifier
//!
//! Decides which of several recipes sharing an ingredient multiset matches
//! the physical layout of the placed pieces.
//!
//! - Orientation: `xSpan >= ySpan` reads as horizontal
//! - Three-piece stacks need `ySpan > xSpan * 0.9`, so diagonals don't read as stacked
//! - Tie-breaks: only when two recipes agree on ingredients and orientation
//!   does the journey-wide [`TieBreakTable`] say which ingredient must come first

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::catalog::{Recipe, SpatialRule};
use super::piece::{PieceId, PlacedPiece};
use crate::bounding_spans;
use crate::consts::STACKED_RATIO;
use crate::error::CatalogError;

/// Axis along which a tie-break orders two ingredients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// `first` must be left of `second`
    Horizontal,
    /// `first` must be above `second`
    Vertical,
}

/// Ordering constraint between two ingredients of one recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieBreak {
    /// Recipe result this rule applies to
    pub result: PieceId,
    pub first: PieceId,
    pub second: PieceId,
    pub axis: Axis,
}

impl TieBreak {
    /// Check the ordering against placed pieces
    ///
    /// Rules whose ingredients aren't both present don't constrain anything.
    fn holds(&self, placed: &[&PlacedPiece]) -> bool {
        let find = |id: &PieceId| placed.iter().find(|p| p.piece.id == *id);
        match (find(&self.first), find(&self.second)) {
            (Some(first), Some(second)) => match self.axis {
                Axis::Horizontal => first.position.x < second.position.x,
                Axis::Vertical => first.position.y < second.position.y,
            },
            _ => true,
        }
    }
}

/// Journey-wide tie-break data, shared by every level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<TieBreak>", into = "Vec<TieBreak>")]
pub struct TieBreakTable {
    rules: Vec<TieBreak>,
}

impl TryFrom<Vec<TieBreak>> for TieBreakTable {
    type Error = CatalogError;

    fn try_from(rules: Vec<TieBreak>) -> Result<Self, Self::Error> {
        Self::new(rules)
    }
}

impl From<TieBreakTable> for Vec<TieBreak> {
    fn from(table: TieBreakTable) -> Self {
        table.rules
    }
}

impl TieBreakTable {
    pub fn new(rules: Vec<TieBreak>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if rule.first == rule.second {
                return Err(CatalogError::DegenerateTieBreak {
                    result: rule.result.clone(),
                    piece: rule.first.clone(),
                });
            }
            if !seen.insert(rule.result.clone()) {
                return Err(CatalogError::DuplicateTieBreak(rule.result.clone()));
            }
        }
        Ok(Self { rules })
    }

    pub fn rule_for(&self, result: &PieceId) -> Option<&TieBreak> {
        self.rules.iter().find(|r| r.result == *result)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Bounding-box summary of a group of placed pieces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub x_span: f32,
    pub y_span: f32,
    pub count: usize,
}

impl Layout {
    /// Classify at least two positions
    pub fn of(positions: &[Vec2]) -> Option<Self> {
        if positions.len() < 2 {
            return None;
        }
        let spans = bounding_spans(positions);
        Some(Self {
            x_span: spans.x,
            y_span: spans.y,
            count: positions.len(),
        })
    }

    #[inline]
    pub fn is_horizontal(&self) -> bool {
        self.x_span >= self.y_span
    }

    /// Whether this layout satisfies a recipe's spatial rule
    pub fn satisfies(&self, rule: SpatialRule) -> bool {
        match rule {
            SpatialRule::Any => true,
            SpatialRule::LeftRight => self.is_horizontal(),
            SpatialRule::TopBottom => !self.is_horizontal(),
            SpatialRule::Stacked => {
                if self.count == 3 {
                    self.y_span > self.x_span * STACKED_RATIO
                } else {
                    !self.is_horizontal()
                }
            }
        }
    }
}

/// Pick the first candidate consistent with the layout
///
/// Tie-breaks only decide between several candidates that all fit the
/// layout; a lone fitting candidate always matches.
pub fn select<'a>(
    candidates: &[&'a Recipe],
    placed: &[&PlacedPiece],
    tie_breaks: &TieBreakTable,
) -> Option<&'a Recipe> {
    let positions: Vec<Vec2> = placed.iter().map(|p| p.position).collect();
    let layout = Layout::of(&positions)?;

    let fitting: Vec<&'a Recipe> = candidates
        .iter()
        .copied()
        .filter(|recipe| layout.satisfies(recipe.spatial))
        .collect();
    if let [only] = fitting.as_slice() {
        return Some(*only);
    }

    fitting.into_iter().find(|recipe| {
        tie_breaks
            .rule_for(&recipe.result.id)
            .is_none_or(|rule| rule.holds(placed))
    })
}

/// Order ingredients the way the merge animation lays them out
pub fn order_ingredients(rule: SpatialRule, placed: &[&PlacedPiece]) -> Vec<PlacedPiece> {
    let mut ordered: Vec<PlacedPiece> = placed.iter().map(|p| (*p).clone()).collect();
    match rule {
        SpatialRule::LeftRight => {
            ordered.sort_by(|a, b| a.position.x.total_cmp(&b.position.x));
        }
        SpatialRule::TopBottom | SpatialRule::Stacked => {
            ordered.sort_by(|a, b| {
                if (a.position.y - b.position.y).abs() < 1.0 {
                    a.position.x.total_cmp(&b.position.x)
                } else {
                    a.position.y.total_cmp(&b.position.y)
                }
            });
        }
        SpatialRule::Any => {}
    }
    ordered
}
