//! Level authoring data
//!
//! A journey is a list of [`Level`]s plus the tie-break table shared by all of
//! them. Each level carries one [`Activity`]; consumers match on it.

use serde::Deserialize;

use super::catalog::RecipeCatalog;
use super::resolver::ResolveMode;
use super::spatial::TieBreakTable;
use super::trace::TraceGuide;
use crate::error::CatalogError;

const DEFAULT_JOURNEY: &str = include_str!("../../data/journey.json");

/// Look at a glyph; no interaction
#[derive(Debug, Clone, Deserialize)]
pub struct ObserveLevel {
    pub glyph: String,
    pub caption: String,
}

/// Trace a glyph over a guide
#[derive(Debug, Clone, Deserialize)]
pub struct TracingLevel {
    pub glyph: String,
    pub meaning: String,
    pub guide: TraceGuide,
    /// Complete as soon as progress reaches the threshold, without confirming
    #[serde(default)]
    pub auto_complete: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub correct: bool,
    /// Shown when this option is chosen and wrong
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizLevel {
    pub prompt: String,
    pub options: Vec<QuizOption>,
    /// Revealed after a correct answer
    pub explanation: String,
}

impl QuizLevel {
    pub fn option(&self, id: &str) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.id == id)
    }
}

/// Guided combination toward one target glyph
#[derive(Debug, Clone, Deserialize)]
pub struct CombinationLevel {
    pub instruction: String,
    pub target_glyph: String,
    pub target_meaning: String,
    pub catalog: RecipeCatalog,
}

/// Open discovery until `target_count` distinct results are formed
#[derive(Debug, Clone, Deserialize)]
pub struct FreeLevel {
    pub instruction: String,
    pub target_count: usize,
    pub final_message: String,
    pub catalog: RecipeCatalog,
}

/// What the player does in a level
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    Observe(ObserveLevel),
    Tracing(TracingLevel),
    Quiz(QuizLevel),
    Combination(CombinationLevel),
    Free(FreeLevel),
}

impl Activity {
    pub fn name(&self) -> &'static str {
        match self {
            Activity::Observe(_) => "observe",
            Activity::Tracing(_) => "tracing",
            Activity::Quiz(_) => "quiz",
            Activity::Combination(_) => "combination",
            Activity::Free(_) => "free",
        }
    }

    /// Catalog and matching mode for levels that combine pieces
    pub fn catalog(&self) -> Option<(&RecipeCatalog, ResolveMode)> {
        match self {
            Activity::Combination(level) => Some((&level.catalog, ResolveMode::Guided)),
            Activity::Free(level) => Some((&level.catalog, ResolveMode::Free)),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), CatalogError> {
        match self {
            Activity::Quiz(quiz) => {
                if !quiz.options.iter().any(|o| o.correct) {
                    return Err(CatalogError::NoCorrectOption(quiz.prompt.clone()));
                }
            }
            Activity::Combination(level) => {
                let reachable = level
                    .catalog
                    .recipes()
                    .iter()
                    .any(|r| r.result.glyph == level.target_glyph);
                if !reachable {
                    return Err(CatalogError::UnknownTarget(level.target_glyph.clone()));
                }
            }
            Activity::Free(level) => {
                if level.target_count == 0 {
                    return Err(CatalogError::ZeroTarget);
                }
                let available = level.catalog.distinct_results();
                if level.target_count > available {
                    return Err(CatalogError::UnreachableTarget {
                        target: level.target_count,
                        available,
                    });
                }
            }
            Activity::Observe(_) | Activity::Tracing(_) => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Level {
    pub id: String,
    pub title: String,
    /// Pause after the level's payoff before the next step unlocks
    #[serde(default)]
    pub wow_pause_ms: u64,
    pub activity: Activity,
}

#[derive(Debug, Deserialize)]
struct RawJourney {
    #[serde(default)]
    tie_breaks: TieBreakTable,
    levels: Vec<Level>,
}

/// Validated journey
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawJourney")]
pub struct JourneyData {
    tie_breaks: TieBreakTable,
    levels: Vec<Level>,
}

impl TryFrom<RawJourney> for JourneyData {
    type Error = CatalogError;

    fn try_from(raw: RawJourney) -> Result<Self, Self::Error> {
        Self::new(raw.tie_breaks, raw.levels)
    }
}

impl JourneyData {
    pub fn new(tie_breaks: TieBreakTable, levels: Vec<Level>) -> Result<Self, CatalogError> {
        if levels.is_empty() {
            return Err(CatalogError::EmptyJourney);
        }
        for level in &levels {
            level.activity.validate()?;
        }
        Ok(Self { tie_breaks, levels })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: Self = serde_json::from_str(json)?;
        log::info!(
            "Loaded journey: {} levels, {} tie-breaks",
            data.levels.len(),
            data.tie_breaks.len()
        );
        Ok(data)
    }

    /// The journey bundled with the crate
    pub fn default_journey() -> Result<Self, CatalogError> {
        Self::from_json(DEFAULT_JOURNEY)
    }

    pub fn tie_breaks(&self) -> &TieBreakTable {
        &self.tie_breaks
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
