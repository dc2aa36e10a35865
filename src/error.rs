//! Error types
//!
//! Authoring data is validated once at load ([`CatalogError`]); player actions
//! that don't apply to the current state are rejected with [`ActionError`] and
//! leave the journey untouched.

use thiserror::Error;

use crate::engine::PieceId;

/// Malformed authoring data, reported when a journey or level is loaded
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("journey has no levels")]
    EmptyJourney,

    #[error("recipe for '{result}' needs at least two ingredients, found {count}")]
    TooFewIngredients { result: PieceId, count: usize },

    #[error("recipe for '{result}' references undefined ingredient '{ingredient}'")]
    UndefinedIngredient { result: PieceId, ingredient: PieceId },

    #[error("distractor references undefined ingredient '{0}'")]
    UndefinedDistractorIngredient(PieceId),

    #[error("guard references undefined ingredient '{0}'")]
    UndefinedGuardIngredient(PieceId),

    #[error("guard prerequisite '{0}' is not produced by any recipe")]
    UnknownPrerequisite(PieceId),

    #[error("inventory lists piece '{0}' more than once")]
    DuplicateInventoryPiece(PieceId),

    #[error("tie-break for '{result}' orders '{piece}' against itself")]
    DegenerateTieBreak { result: PieceId, piece: PieceId },

    #[error("tie-break for '{0}' is defined more than once")]
    DuplicateTieBreak(PieceId),

    #[error("trace guide has no points")]
    EmptyGuide,

    #[error("trace completion threshold {0} must be in (0, 1]")]
    InvalidThreshold(f32),

    #[error("free level target count {target} exceeds its {available} recipes")]
    UnreachableTarget { target: usize, available: usize },

    #[error("level target '{0}' is not produced by any of its recipes")]
    UnknownTarget(String),

    #[error("free level target count must be at least 1")]
    ZeroTarget,

    #[error("quiz '{0}' has no correct option")]
    NoCorrectOption(String),

    #[error("failed to parse journey data: {0}")]
    Json(#[from] serde_json::Error),
}

/// A player action that does not apply to the current journey state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("the journey is not in the playing state")]
    NotPlaying,

    #[error("the journey has already started")]
    AlreadyStarted,

    #[error("current level is not a {expected} level")]
    WrongActivity { expected: &'static str },

    #[error("piece '{0}' is not in the inventory")]
    UnknownPiece(PieceId),

    #[error("a merge is still in progress")]
    MergePending,

    #[error("level {index} is out of range (journey has {count} levels)")]
    LevelOutOfRange { index: usize, count: usize },

    #[error("option '{0}' does not exist")]
    UnknownOption(String),

    #[error("the level is not finished yet")]
    FinishLocked,
}

/// Settings that failed to parse or validate
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{field} must be positive")]
    NonPositive { field: &'static str },

    #[error("trace tolerance {0} must be in (0, 1)")]
    InvalidTolerance(f32),

    #[error("failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),
}
