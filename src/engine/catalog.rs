//! Recipe catalog
//!
//! Recipes are looked up by a canonical key: the ingredient ids sorted and
//! joined with `|`. Order is irrelevant, duplicates are significant, so
//! `["mu", "mu"]` and `["mu"]` are different keys. Several recipes may share a
//! key; the spatial classifier picks between them.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::piece::{Inventory, Piece, PieceId};
use crate::consts::KEY_SEPARATOR;
use crate::error::CatalogError;

/// Sorted, joined ingredient multiset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipeKey(String);

impl RecipeKey {
    pub fn of<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids: Vec<String> = ids.into_iter().map(|s| s.as_ref().to_owned()).collect();
        ids.sort();
        Self(ids.join(KEY_SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the ingredients must be laid out for a recipe to match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialRule {
    LeftRight,
    TopBottom,
    Stacked,
    Any,
}

/// Ingredient multiset + layout -> result piece
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub ingredients: Vec<PieceId>,
    pub result: Piece,
    pub spatial: SpatialRule,
    #[serde(default)]
    pub explanation: String,
}

impl Recipe {
    pub fn key(&self) -> RecipeKey {
        RecipeKey::of(&self.ingredients)
    }
}

/// A plausible but wrong combination with a targeted message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistractorRule {
    pub ingredients: Vec<PieceId>,
    pub message: String,
}

/// Blocks a combination until a prerequisite result has been formed
///
/// Without a prerequisite the combination is always blocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardRule {
    pub ingredients: Vec<PieceId>,
    #[serde(default)]
    pub unless_created: Option<PieceId>,
    pub message: String,
}

impl GuardRule {
    fn blocks(&self, inventory: &Inventory) -> bool {
        match &self.unless_created {
            Some(prerequisite) => !inventory.contains(prerequisite.as_str()),
            None => true,
        }
    }
}

/// Authoring form of a catalog, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCatalog {
    pub inventory: Vec<Piece>,
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub distractors: Vec<DistractorRule>,
    #[serde(default)]
    pub guards: Vec<GuardRule>,
}

/// Validated per-level rule set
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawCatalog")]
pub struct RecipeCatalog {
    inventory: Vec<Piece>,
    recipes: Vec<Recipe>,
    distractors: Vec<DistractorRule>,
    guards: Vec<GuardRule>,
    by_key: HashMap<RecipeKey, Vec<usize>>,
}

impl TryFrom<RawCatalog> for RecipeCatalog {
    type Error = CatalogError;

    fn try_from(raw: RawCatalog) -> Result<Self, Self::Error> {
        Self::new(raw.inventory, raw.recipes, raw.distractors, raw.guards)
    }
}

impl RecipeCatalog {
    /// Build and validate a catalog
    ///
    /// Every ingredient must be either a base inventory piece or the result
    /// of some recipe in the same catalog (so results can feed later steps).
    pub fn new(
        inventory: Vec<Piece>,
        recipes: Vec<Recipe>,
        distractors: Vec<DistractorRule>,
        guards: Vec<GuardRule>,
    ) -> Result<Self, CatalogError> {
        let mut defined: HashSet<&str> = HashSet::new();
        for piece in &inventory {
            if !defined.insert(piece.id.as_str()) {
                return Err(CatalogError::DuplicateInventoryPiece(piece.id.clone()));
            }
        }
        let results: HashSet<&str> = recipes.iter().map(|r| r.result.id.as_str()).collect();
        defined.extend(results.iter().copied());

        for recipe in &recipes {
            if recipe.ingredients.len() < 2 {
                return Err(CatalogError::TooFewIngredients {
                    result: recipe.result.id.clone(),
                    count: recipe.ingredients.len(),
                });
            }
            if let Some(missing) = recipe
                .ingredients
                .iter()
                .find(|id| !defined.contains(id.as_str()))
            {
                return Err(CatalogError::UndefinedIngredient {
                    result: recipe.result.id.clone(),
                    ingredient: missing.clone(),
                });
            }
        }

        for distractor in &distractors {
            if let Some(missing) = distractor
                .ingredients
                .iter()
                .find(|id| !defined.contains(id.as_str()))
            {
                return Err(CatalogError::UndefinedDistractorIngredient(missing.clone()));
            }
        }

        for guard in &guards {
            if let Some(missing) = guard
                .ingredients
                .iter()
                .find(|id| !defined.contains(id.as_str()))
            {
                return Err(CatalogError::UndefinedGuardIngredient(missing.clone()));
            }
            if let Some(prerequisite) = &guard.unless_created {
                if !results.contains(prerequisite.as_str()) {
                    return Err(CatalogError::UnknownPrerequisite(prerequisite.clone()));
                }
            }
        }

        let mut by_key: HashMap<RecipeKey, Vec<usize>> = HashMap::new();
        for (i, recipe) in recipes.iter().enumerate() {
            by_key.entry(recipe.key()).or_default().push(i);
        }

        Ok(Self {
            inventory,
            recipes,
            distractors,
            guards,
            by_key,
        })
    }

    /// Base pieces the level starts with
    pub fn inventory(&self) -> &[Piece] {
        &self.inventory
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Recipes sharing `key`, in authoring order
    pub fn candidates(&self, key: &RecipeKey) -> Vec<&Recipe> {
        self.by_key
            .get(key)
            .map(|indices| indices.iter().map(|&i| &self.recipes[i]).collect())
            .unwrap_or_default()
    }

    /// Recipes with exactly three ingredients sharing `key`
    pub fn triple_candidates(&self, key: &RecipeKey) -> Vec<&Recipe> {
        self.candidates(key)
            .into_iter()
            .filter(|r| r.ingredients.len() == 3)
            .collect()
    }

    pub fn distractor(&self, key: &RecipeKey) -> Option<&DistractorRule> {
        self.distractors
            .iter()
            .find(|d| RecipeKey::of(&d.ingredients) == *key)
    }

    /// First guard that blocks `key` given what has been created so far
    pub fn blocking_guard(&self, key: &RecipeKey, inventory: &Inventory) -> Option<&GuardRule> {
        self.guards
            .iter()
            .find(|g| RecipeKey::of(&g.ingredients) == *key && g.blocks(inventory))
    }

    /// Number of distinct results this catalog can produce
    pub fn distinct_results(&self) -> usize {
        self.recipes
            .iter()
            .map(|r| r.result.glyph.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}
