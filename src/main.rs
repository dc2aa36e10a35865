//! Glyph Journey entry point
//!
//! Plays a scripted session through a journey and logs every event.
//!
//! Usage: `glyph-journey [--realtime] [journey.json] [settings.json]`
//!
//! Without `--realtime` the session runs on a manual clock and finishes
//! instantly; with it, delays are waited out on the wall clock.

use std::error::Error;
use std::time::Duration;

use glam::Vec2;

use glyph_journey::engine::{
    Activity, Clock, JourneyData, ManualClock, MonotonicClock, Recipe, SpatialRule, TieBreakTable,
};
use glyph_journey::{Journey, JourneyEvent, Settings};

/// Step the clock moves between ticks
const TICK: Duration = Duration::from_millis(100);
/// Give up on a wait after this long
const WAIT_LIMIT: Duration = Duration::from_secs(10);
/// Recipe attempts per combination level before moving on
const MAX_ATTEMPTS: usize = 16;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Glyph Journey starting...");

    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The core is a library; there is no browser runner
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut realtime = false;
    let mut paths = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--realtime" => realtime = true,
            _ => paths.push(arg),
        }
    }

    let data = match paths.first() {
        Some(path) => JourneyData::from_json(&std::fs::read_to_string(path)?)?,
        None => JourneyData::default_journey()?,
    };
    let settings = match paths.get(1) {
        Some(path) => Settings::from_json(&std::fs::read_to_string(path)?)?,
        None => Settings::default(),
    };

    if realtime {
        let mut journey = Journey::new(data, settings, MonotonicClock::new());
        play(&mut journey, std::thread::sleep)
    } else {
        let clock = ManualClock::new();
        let mut journey = Journey::new(data, settings, clock.clone());
        play(&mut journey, |d| clock.advance(d))
    }
}

/// Run every level with a scripted solution
fn play<C: Clock>(journey: &mut Journey<C>, mut wait: impl FnMut(Duration)) -> Result<(), Box<dyn Error>> {
    journey.begin_journey()?;

    while let Some(level) = journey.current_level() {
        let index = journey.current_level_index();
        log::info!("Level {}: {} ({})", index, level.title, level.activity.name());

        match level.activity.clone() {
            Activity::Observe(observe) => {
                log::info!("{} - {}", observe.glyph, observe.caption);
                journey.advance_level()?;
            }
            Activity::Tracing(tracing) => {
                let samples: Vec<Vec2> = tracing
                    .guide
                    .strokes()
                    .iter()
                    .flat_map(|s| s.points.iter().copied())
                    .collect();
                let progress = journey.update_trace(&samples, true)?;
                log::info!("Traced {} at {:.0}%", tracing.glyph, progress * 100.0);
                if !tracing.auto_complete {
                    journey.confirm_trace()?;
                }
                settle(journey, &mut wait, |j| j.current_level_index() != index);
            }
            Activity::Quiz(quiz) => {
                log::info!("{}", quiz.prompt);
                if let Some(option) = quiz.options.iter().find(|o| o.correct) {
                    journey.choose_option(&option.id)?;
                }
                log_feedback(journey);
                journey.advance_level()?;
            }
            Activity::Combination(guided) => {
                log::info!("{}", guided.instruction);
                for _ in 0..MAX_ATTEMPTS {
                    let Some(recipe) = next_recipe(journey, guided.catalog.recipes(), &guided.target_glyph)
                    else {
                        break;
                    };
                    attempt(journey, &mut wait, &recipe)?;
                    if journey.is_level_complete() {
                        break;
                    }
                }
                if journey.is_level_complete() {
                    settle(journey, &mut wait, |j| j.current_level_index() != index);
                } else {
                    log::warn!("No scripted solution for '{}', skipping", level_id(journey));
                    journey.advance_level()?;
                }
            }
            Activity::Free(free) => {
                log::info!("{}", free.instruction);
                for _ in 0..MAX_ATTEMPTS {
                    if journey.is_level_complete() {
                        break;
                    }
                    let Some(recipe) = next_recipe(journey, free.catalog.recipes(), "") else {
                        break;
                    };
                    attempt(journey, &mut wait, &recipe)?;
                }
                settle(journey, &mut wait, |j| j.is_finish_unlocked());
                if journey.is_finish_unlocked() {
                    journey.finish_journey()?;
                } else {
                    journey.advance_level()?;
                }
            }
        }
    }

    log::info!("Journey complete");
    Ok(())
}

fn level_id<C: Clock>(journey: &Journey<C>) -> String {
    journey
        .current_level()
        .map(|l| l.id.clone())
        .unwrap_or_default()
}

/// Pick the next recipe worth trying: the target if its ingredients are
/// available, otherwise anything that makes something new
fn next_recipe<C: Clock>(journey: &Journey<C>, recipes: &[Recipe], target_glyph: &str) -> Option<Recipe> {
    let inventory = journey.inventory();
    let available = |r: &&Recipe| r.ingredients.iter().all(|id| inventory.contains(id.as_str()));

    recipes
        .iter()
        .filter(available)
        .find(|r| r.result.glyph == target_glyph)
        .or_else(|| {
            recipes
                .iter()
                .filter(available)
                .find(|r| !inventory.contains(r.result.id.as_str()))
        })
        .cloned()
}

/// Place a recipe's ingredients in a layout it accepts, then resolve
fn attempt<C: Clock>(
    journey: &mut Journey<C>,
    wait: &mut impl FnMut(Duration),
    recipe: &Recipe,
) -> Result<(), Box<dyn Error>> {
    journey.clear_workspace()?;
    let ingredients = ordered_ingredients(recipe, journey.data().tie_breaks());
    for (id, position) in ingredients.iter().zip(layout(recipe.spatial, ingredients.len())) {
        journey.place_piece(id, position)?;
    }

    match journey.resolve()? {
        Some(resolution) if resolution.is_match() => {
            settle(journey, wait, |j| j.pending_merge().is_none());
        }
        Some(resolution) => {
            log::info!("{}", resolution.message().unwrap_or_default());
            settle(journey, wait, |j| j.workspace().is_empty());
        }
        None => log::warn!("Nothing to resolve for '{}'", recipe.result.id),
    }
    Ok(())
}

/// Ingredient ids with any tie-break pair in its required order
fn ordered_ingredients(recipe: &Recipe, tie_breaks: &TieBreakTable) -> Vec<String> {
    let mut ids: Vec<String> = recipe.ingredients.iter().map(|id| id.to_string()).collect();
    if let Some(rule) = tie_breaks.rule_for(&recipe.result.id) {
        let first = ids.iter().position(|id| id == rule.first.as_str());
        let second = ids.iter().position(|id| id == rule.second.as_str());
        if let (Some(first), Some(second)) = (first, second) {
            if first > second {
                ids.swap(first, second);
            }
        }
    }
    ids
}

/// Drop positions for `count` pieces satisfying `rule`
fn layout(rule: SpatialRule, count: usize) -> Vec<Vec2> {
    match (rule, count) {
        (SpatialRule::Stacked, 3) => vec![
            Vec2::new(175.0, 105.0),
            Vec2::new(115.0, 215.0),
            Vec2::new(235.0, 215.0),
        ],
        (SpatialRule::TopBottom | SpatialRule::Stacked, _) => (0..count)
            .map(|i| Vec2::new(175.0, 100.0 + 120.0 * i as f32))
            .collect(),
        (SpatialRule::LeftRight | SpatialRule::Any, _) => (0..count)
            .map(|i| Vec2::new(100.0 + 100.0 * i as f32, 175.0))
            .collect(),
    }
}

/// Let time pass until `done` holds, logging whatever fires
fn settle<C: Clock>(
    journey: &mut Journey<C>,
    wait: &mut impl FnMut(Duration),
    done: impl Fn(&Journey<C>) -> bool,
) {
    let mut waited = Duration::ZERO;
    while !done(journey) && waited < WAIT_LIMIT {
        wait(TICK);
        waited += TICK;
        for event in journey.tick() {
            log_event(journey, &event);
        }
    }
}

fn log_event<C: Clock>(journey: &Journey<C>, event: &JourneyEvent) {
    match event {
        JourneyEvent::MergeCompleted { result, explanation, is_target } => {
            log::info!(
                "Formed {} ({}){}",
                result.glyph,
                result.label,
                if *is_target { " - target" } else { "" }
            );
            if !explanation.is_empty() {
                log::info!("  {explanation}");
            }
            log_feedback(journey);
        }
        JourneyEvent::Discovered { result, count, reached_goal } => {
            log::info!(
                "Discovered {} ({}/{})",
                result.glyph,
                count,
                journey.discovery().target_count()
            );
            if *reached_goal {
                log_feedback(journey);
            }
        }
        other => log::debug!("{other:?}"),
    }
}

fn log_feedback<C: Clock>(journey: &Journey<C>) {
    if let Some(feedback) = journey.feedback() {
        log::info!("> {feedback}");
    }
}
