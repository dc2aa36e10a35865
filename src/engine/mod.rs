//! Deterministic journey rules
//!
//! Everything here is pure data and logic. It must stay free of rendering and
//! platform concerns:
//! - Time only arrives as `Duration`s from an injected [`Clock`]
//! - Stable iteration order (placement order, catalog order)
//! - Authoring data is validated once, at load

pub mod catalog;
pub mod discovery;
pub mod flow;
pub mod level;
pub mod piece;
pub mod resolver;
pub mod spatial;
pub mod timer;
pub mod trace;

pub use catalog::{DistractorRule, GuardRule, Recipe, RecipeCatalog, RecipeKey, SpatialRule};
pub use discovery::{DiscoveryOutcome, DiscoveryTracker};
pub use flow::{FlowController, FlowState, LevelToken};
pub use level::{
    Activity, CombinationLevel, FreeLevel, JourneyData, Level, ObserveLevel, QuizLevel,
    QuizOption, TracingLevel,
};
pub use piece::{Inventory, Piece, PieceId, PieceStatus, PlacedPiece, PlacementId, Workspace};
pub use resolver::{Resolution, ResolutionEffect, ResolveMode, Resolver};
pub use spatial::{Axis, Layout, TieBreak, TieBreakTable};
pub use timer::{Clock, ManualClock, MonotonicClock, Timer, TimerClass, TimerId, TimerQueue};
pub use trace::{TraceGuide, TraceStroke, TraceTracker};
