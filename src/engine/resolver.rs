//! Combination resolver
//!
//! Matches workspace contents against a level's catalog. The resolver only
//! decides; the journey applies the reported effect (merge, repel, return).
//!
//! Evaluation order:
//! 1. Narrative guards for the candidate set
//! 2. With three or more pieces, any mutually-close triple whose key matches a
//!    three-ingredient recipe wins over pair matches. Guided levels check the
//!    triple's layout; free levels take the first such recipe as laid out
//! 3. Guided levels evaluate the whole workspace; free levels evaluate the
//!    first pair (placement order) that is close enough

use serde::{Deserialize, Serialize};

use super::catalog::{Recipe, RecipeCatalog, RecipeKey};
use super::piece::{Inventory, PlacedPiece, PlacementId, Workspace};
use super::spatial::{self, TieBreakTable};
use crate::consts::{PAIR_PROXIMITY, TOO_MANY_PIECES, TRIPLE_PROXIMITY};
use crate::max_pairwise_distance;

const INVALID_PREFIX: &str = "Invalid combination: ";
const GUIDED_NO_MATCH: &str = "Invalid combination: no matching character found.";
const FREE_NO_MATCH: &str = "Invalid combination: these pieces cannot form a character.";
const TOO_MANY: &str = "Invalid combination: too many pieces on canvas.";
const GUIDED_WRONG_DIRECTION: &str = "Wrong direction: piece orientation does not match.";
const FREE_WRONG_DIRECTION: &str = "Wrong direction: adjust piece orientation.";

/// Which matching rules apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolveMode {
    /// One target; the whole workspace is the candidate set
    Guided,
    /// Open discovery; close-enough pairs combine on their own
    Free,
}

/// What the workspace should do with the resolved pieces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionEffect {
    /// Remove the pieces and hold a pending result
    Merge,
    /// Mark repelling, remove after the repel delay
    Repel,
    /// Mark returning, remove after the return delay
    Return,
}

/// Outcome of evaluating the workspace
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Ingredients and layout agree with a recipe
    Match {
        recipe: Recipe,
        /// Ingredients in layout order (left-to-right or top-to-bottom)
        ingredients: Vec<PlacedPiece>,
        targets: Vec<PlacementId>,
    },
    /// Right ingredients, wrong geometry
    WrongOrientation {
        message: String,
        targets: Vec<PlacementId>,
    },
    /// Recognised wrong combination with a targeted message
    InvalidDistractor {
        message: String,
        targets: Vec<PlacementId>,
    },
    /// Nothing recognised
    InvalidGeneric {
        message: String,
        targets: Vec<PlacementId>,
        too_many: bool,
    },
    /// A narrative guard blocked an otherwise-valid set
    GuardRejected {
        message: String,
        targets: Vec<PlacementId>,
    },
}

impl Resolution {
    pub fn targets(&self) -> &[PlacementId] {
        match self {
            Resolution::Match { targets, .. }
            | Resolution::WrongOrientation { targets, .. }
            | Resolution::InvalidDistractor { targets, .. }
            | Resolution::InvalidGeneric { targets, .. }
            | Resolution::GuardRejected { targets, .. } => targets,
        }
    }

    /// Feedback text for rejections; `None` for a match
    pub fn message(&self) -> Option<&str> {
        match self {
            Resolution::Match { .. } => None,
            Resolution::WrongOrientation { message, .. }
            | Resolution::InvalidDistractor { message, .. }
            | Resolution::InvalidGeneric { message, .. }
            | Resolution::GuardRejected { message, .. } => Some(message),
        }
    }

    pub fn effect(&self) -> ResolutionEffect {
        match self {
            Resolution::Match { .. } => ResolutionEffect::Merge,
            Resolution::WrongOrientation { .. } => ResolutionEffect::Repel,
            Resolution::InvalidDistractor { .. }
            | Resolution::InvalidGeneric { .. }
            | Resolution::GuardRejected { .. } => ResolutionEffect::Return,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Match { .. })
    }
}

/// Evaluates a workspace against one level's rules
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    catalog: &'a RecipeCatalog,
    tie_breaks: &'a TieBreakTable,
    mode: ResolveMode,
    pair_proximity: f32,
    triple_proximity: f32,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a RecipeCatalog, tie_breaks: &'a TieBreakTable, mode: ResolveMode) -> Self {
        Self {
            catalog,
            tie_breaks,
            mode,
            pair_proximity: PAIR_PROXIMITY,
            triple_proximity: TRIPLE_PROXIMITY,
        }
    }

    pub fn with_proximity(mut self, pair: f32, triple: f32) -> Self {
        self.pair_proximity = pair;
        self.triple_proximity = triple;
        self
    }

    /// Resolve the workspace
    ///
    /// Returns `None` while pieces are animating, with fewer than two pieces,
    /// or in free mode when no pair is close enough to combine.
    pub fn resolve(&self, workspace: &Workspace, inventory: &Inventory) -> Option<Resolution> {
        if workspace.len() < 2 || !workspace.all_idle() {
            return None;
        }
        let pieces: Vec<&PlacedPiece> = workspace.pieces().iter().collect();

        if self.mode == ResolveMode::Guided {
            if let Some(rejected) = self.check_guard(&pieces, inventory) {
                return Some(rejected);
            }
        }

        if pieces.len() >= 3 {
            if let Some(resolution) = self.resolve_triples(&pieces, inventory) {
                return Some(resolution);
            }
        }

        match self.mode {
            ResolveMode::Guided => Some(self.evaluate(&pieces, inventory)),
            ResolveMode::Free => {
                for (i, a) in pieces.iter().enumerate() {
                    for b in &pieces[i + 1..] {
                        if a.position.distance(b.position) <= self.pair_proximity {
                            return Some(self.evaluate(&[*a, *b], inventory));
                        }
                    }
                }
                None
            }
        }
    }

    fn resolve_triples(&self, pieces: &[&PlacedPiece], inventory: &Inventory) -> Option<Resolution> {
        let n = pieces.len();
        for i in 0..n - 2 {
            for j in i + 1..n - 1 {
                for k in j + 1..n {
                    let triple = [pieces[i], pieces[j], pieces[k]];
                    let positions = triple.map(|p| p.position);
                    if max_pairwise_distance(&positions) > self.triple_proximity {
                        continue;
                    }
                    let key = RecipeKey::of(triple.iter().map(|p| &p.piece.id));
                    let candidates = self.catalog.triple_candidates(&key);
                    if candidates.is_empty() {
                        continue;
                    }
                    if let Some(rejected) = self.check_guard(&triple, inventory) {
                        return Some(rejected);
                    }
                    return Some(match self.mode {
                        ResolveMode::Guided => self.classify(&candidates, &triple),
                        ResolveMode::Free => matched(candidates[0], &triple),
                    });
                }
            }
        }
        None
    }

    fn evaluate(&self, group: &[&PlacedPiece], inventory: &Inventory) -> Resolution {
        if let Some(rejected) = self.check_guard(group, inventory) {
            return rejected;
        }

        let key = RecipeKey::of(group.iter().map(|p| &p.piece.id));
        let candidates = self.catalog.candidates(&key);
        if !candidates.is_empty() {
            return self.classify(&candidates, group);
        }

        let targets = ids(group);
        if let Some(distractor) = self.catalog.distractor(&key) {
            return Resolution::InvalidDistractor {
                message: format!("{INVALID_PREFIX}{}", distractor.message),
                targets,
            };
        }

        let too_many = group.len() > TOO_MANY_PIECES;
        let message = if too_many {
            TOO_MANY
        } else {
            match self.mode {
                ResolveMode::Guided => GUIDED_NO_MATCH,
                ResolveMode::Free => FREE_NO_MATCH,
            }
        };
        Resolution::InvalidGeneric {
            message: message.to_owned(),
            targets,
            too_many,
        }
    }

    fn classify(&self, candidates: &[&Recipe], group: &[&PlacedPiece]) -> Resolution {
        match spatial::select(candidates, group, self.tie_breaks) {
            Some(recipe) => matched(recipe, group),
            None => Resolution::WrongOrientation {
                message: match self.mode {
                    ResolveMode::Guided => GUIDED_WRONG_DIRECTION,
                    ResolveMode::Free => FREE_WRONG_DIRECTION,
                }
                .to_owned(),
                targets: ids(group),
            },
        }
    }

    fn check_guard(&self, group: &[&PlacedPiece], inventory: &Inventory) -> Option<Resolution> {
        let key = RecipeKey::of(group.iter().map(|p| &p.piece.id));
        self.catalog
            .blocking_guard(&key, inventory)
            .map(|guard| Resolution::GuardRejected {
                message: format!("{INVALID_PREFIX}{}", guard.message),
                targets: ids(group),
            })
    }
}

fn matched(recipe: &Recipe, group: &[&PlacedPiece]) -> Resolution {
    Resolution::Match {
        recipe: recipe.clone(),
        ingredients: spatial::order_ingredients(recipe.spatial, group),
        targets: ids(group),
    }
}

fn ids(group: &[&PlacedPiece]) -> Vec<PlacementId> {
    group.iter().map(|p| p.id).collect()
}
