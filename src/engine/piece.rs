//! Pieces, the workspace they are placed on, and the level inventory

use std::borrow::Borrow;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::clamp_to_workspace;

/// Identifier of a catalog piece (e.g. `"ren"`, `"mu"`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceId(String);

impl PieceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PieceId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl AsRef<str> for PieceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PieceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Immutable catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub glyph: String,
    pub label: String,
}

impl Piece {
    pub fn new(id: impl Into<String>, glyph: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: PieceId::new(id),
            glyph: glyph.into(),
            label: label.into(),
        }
    }
}

/// Lifecycle of a placed piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PieceStatus {
    /// Resting; eligible for resolution
    #[default]
    Idle,
    /// Being absorbed into a result
    Merging,
    /// Pushed away after a wrong orientation
    Repelling,
    /// Sent back to the inventory after an invalid combination
    Returning,
    /// Fading out
    Destroying,
}

/// Handle of one placement, unique within a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlacementId(pub u32);

/// A piece sitting on the workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedPiece {
    pub id: PlacementId,
    pub piece: Piece,
    pub position: Vec2,
    pub status: PieceStatus,
}

/// Pieces placed for the current attempt, in placement order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pieces: Vec<PlacedPiece>,
    next_id: u32,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            pieces: Vec::new(),
            next_id: 1,
        }
    }

    /// Place a piece; the position is clamped into the workspace
    pub fn place(&mut self, piece: Piece, position: Vec2) -> PlacementId {
        let id = PlacementId(self.next_id);
        self.next_id += 1;
        self.pieces.push(PlacedPiece {
            id,
            piece,
            position: clamp_to_workspace(position),
            status: PieceStatus::Idle,
        });
        id
    }

    pub fn pieces(&self) -> &[PlacedPiece] {
        &self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn get(&self, id: PlacementId) -> Option<&PlacedPiece> {
        self.pieces.iter().find(|p| p.id == id)
    }

    /// True when nothing on the workspace is mid-animation
    pub fn all_idle(&self) -> bool {
        self.pieces.iter().all(|p| p.status == PieceStatus::Idle)
    }

    /// Set the status of the given placements
    pub fn mark(&mut self, ids: &[PlacementId], status: PieceStatus) {
        for piece in self.pieces.iter_mut().filter(|p| ids.contains(&p.id)) {
            piece.status = status;
        }
    }

    /// Remove the given placements, returning how many were removed
    pub fn remove(&mut self, ids: &[PlacementId]) -> usize {
        let before = self.pieces.len();
        self.pieces.retain(|p| !ids.contains(&p.id));
        before - self.pieces.len()
    }

    /// Undo the most recent placement
    pub fn pop(&mut self) -> Option<PlacedPiece> {
        self.pieces.pop()
    }

    pub fn clear(&mut self) {
        self.pieces.clear();
    }
}

/// Pieces available to place: the level's base set plus results created so far
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    base: Vec<Piece>,
    created: Vec<Piece>,
}

impl Inventory {
    pub fn new(base: Vec<Piece>) -> Self {
        Self {
            base,
            created: Vec::new(),
        }
    }

    pub fn base(&self) -> &[Piece] {
        &self.base
    }

    pub fn created(&self) -> &[Piece] {
        &self.created
    }

    /// Look a piece up by id, base pieces first
    pub fn get(&self, id: &str) -> Option<&Piece> {
        self.base
            .iter()
            .chain(self.created.iter())
            .find(|p| p.id.as_str() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Add a newly formed result; returns false if it was already held
    pub fn add_created(&mut self, piece: Piece) -> bool {
        if self.contains(piece.id.as_str()) {
            return false;
        }
        self.created.push(piece);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ren() -> Piece {
        Piece::new("ren", "人", "person")
    }

    #[test]
    fn test_place_assigns_unique_ids_and_clamps() {
        let mut ws = Workspace::new();
        let a = ws.place(ren(), Vec2::new(10.0, 10.0));
        let b = ws.place(ren(), Vec2::new(200.0, 200.0));
        assert_ne!(a, b);
        assert_eq!(ws.get(a).map(|p| p.position), Some(Vec2::new(44.0, 44.0)));
        assert_eq!(ws.len(), 2);
    }

    #[test]
    fn test_mark_and_remove() {
        let mut ws = Workspace::new();
        let a = ws.place(ren(), Vec2::new(100.0, 100.0));
        let b = ws.place(ren(), Vec2::new(200.0, 100.0));
        assert!(ws.all_idle());

        ws.mark(&[a], PieceStatus::Returning);
        assert!(!ws.all_idle());

        assert_eq!(ws.remove(&[a]), 1);
        assert!(ws.all_idle());
        assert_eq!(ws.pieces()[0].id, b);
    }

    #[test]
    fn test_ids_not_reused_after_clear() {
        let mut ws = Workspace::new();
        let a = ws.place(ren(), Vec2::new(100.0, 100.0));
        ws.clear();
        let b = ws.place(ren(), Vec2::new(100.0, 100.0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_inventory_created_is_deduplicated() {
        let mut inv = Inventory::new(vec![ren()]);
        assert!(!inv.add_created(ren()));
        assert!(inv.add_created(Piece::new("xiu", "休", "rest")));
        assert!(!inv.add_created(Piece::new("xiu", "休", "rest")));
        assert_eq!(inv.created().len(), 1);
        assert!(inv.contains("xiu"));
        assert!(!inv.contains("ming"));
    }
}
