//! Journey service
//!
//! [`Journey`] owns everything that changes while a player works through the
//! levels: flow state, the active level's workspace and inventory, feedback,
//! and every pending timer. Callers drive it with discrete actions and call
//! [`Journey::tick`] regularly so deferred effects fire.
//!
//! Rejected actions return an [`ActionError`] and change nothing.

use std::time::Duration;

use glam::Vec2;

use crate::engine::{
    Activity, Clock, DiscoveryTracker, FlowController, FlowState, Inventory, JourneyData, Level,
    LevelToken, Piece, PieceId, PieceStatus, PlacedPiece, PlacementId, Recipe, Resolution,
    ResolutionEffect, Resolver, TimerClass, TimerId, TimerQueue, TraceTracker, Workspace,
};
use crate::error::{ActionError, CatalogError};
use crate::settings::Settings;

const WRONG_ANSWER: &str = "Not quite. Look again.";

/// Something the presentation layer should react to
#[derive(Debug, Clone, PartialEq)]
pub enum JourneyEvent {
    LevelEntered { index: usize },
    JourneyEnded,
    FeedbackCleared,
    /// Repelled or returned pieces left the workspace
    PiecesRemoved(Vec<PlacementId>),
    MergeCompleted {
        result: Piece,
        explanation: String,
        /// The result is the guided level's target
        is_target: bool,
    },
    Discovered {
        result: Piece,
        count: usize,
        reached_goal: bool,
    },
    ResultHidden(PieceId),
    FinishUnlocked,
}

#[derive(Debug, Clone)]
enum Deferred {
    ClearFeedback { generation: u64 },
    RemovePieces(Vec<PlacementId>),
    CompleteMerge,
    HideResult,
    UnlockFinish,
    Advance,
}

/// A matched recipe waiting for its evolution to finish
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMerge {
    pub recipe: Recipe,
    /// Consumed pieces in layout order
    pub ingredients: Vec<PlacedPiece>,
}

/// Transient state of the active level; rebuilt on every level change
#[derive(Debug, Clone)]
struct LevelState {
    workspace: Workspace,
    inventory: Inventory,
    trace: TraceTracker,
    feedback: Option<String>,
    feedback_generation: u64,
    pending_merge: Option<PendingMerge>,
    shown_result: Option<Piece>,
    discovery: DiscoveryTracker,
    quiz_choice: Option<String>,
    completed: bool,
    finish_unlocked: bool,
}

impl LevelState {
    fn for_level(level: Option<&Level>, settings: &Settings) -> Self {
        let (inventory, target_count) = match level.map(|l| &l.activity) {
            Some(Activity::Combination(guided)) => {
                (Inventory::new(guided.catalog.inventory().to_vec()), 0)
            }
            Some(Activity::Free(free)) => (
                Inventory::new(free.catalog.inventory().to_vec()),
                free.target_count,
            ),
            _ => (Inventory::default(), 0),
        };

        Self {
            workspace: Workspace::new(),
            inventory,
            trace: TraceTracker::new(settings.trace_tolerance, settings.trace_min_duration()),
            feedback: None,
            feedback_generation: 0,
            pending_merge: None,
            shown_result: None,
            discovery: DiscoveryTracker::new(target_count),
            quiz_choice: None,
            completed: false,
            finish_unlocked: false,
        }
    }
}

fn rejected(err: ActionError) -> ActionError {
    log::warn!("Rejected action: {err}");
    err
}

/// The active level, if a level is being played
fn level_in_play<'a>(data: &'a JourneyData, flow: &FlowController) -> Result<&'a Level, ActionError> {
    if flow.state() != FlowState::Playing {
        return Err(rejected(ActionError::NotPlaying));
    }
    data.level(flow.index())
        .ok_or_else(|| rejected(ActionError::NotPlaying))
}

/// One player's journey through a set of levels
pub struct Journey<C: Clock> {
    data: JourneyData,
    settings: Settings,
    clock: C,
    flow: FlowController,
    timers: TimerQueue<Deferred>,
    level: LevelState,
}

impl<C: Clock> Journey<C> {
    pub fn new(data: JourneyData, settings: Settings, clock: C) -> Self {
        let flow = FlowController::new(data.len());
        let level = LevelState::for_level(data.level(0), &settings);
        Self {
            data,
            settings,
            clock,
            flow,
            timers: TimerQueue::new(),
            level,
        }
    }

    /// The bundled journey with default settings
    pub fn with_default_journey(clock: C) -> Result<Self, CatalogError> {
        Ok(Self::new(JourneyData::default_journey()?, Settings::default(), clock))
    }

    // --- Read-only state ---

    pub fn data(&self) -> &JourneyData {
        &self.data
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The level being shown; `None` once the journey has ended
    pub fn current_level(&self) -> Option<&Level> {
        match self.flow.state() {
            FlowState::Ending => None,
            FlowState::Intro | FlowState::Playing => self.data.level(self.flow.index()),
        }
    }

    pub fn current_level_index(&self) -> usize {
        self.flow.index()
    }

    pub fn flow_state(&self) -> FlowState {
        self.flow.state()
    }

    pub fn level_token(&self) -> LevelToken {
        self.flow.token()
    }

    /// Result glyphs discovered in the current free level, in order
    pub fn discovered(&self) -> &[String] {
        self.level.discovery.discovered()
    }

    pub fn discovery(&self) -> &DiscoveryTracker {
        &self.level.discovery
    }

    pub fn feedback(&self) -> Option<&str> {
        self.level.feedback.as_deref()
    }

    pub fn trace_progress(&self) -> f32 {
        self.level.trace.progress()
    }

    pub fn workspace(&self) -> &Workspace {
        &self.level.workspace
    }

    pub fn inventory(&self) -> &Inventory {
        &self.level.inventory
    }

    pub fn pending_merge(&self) -> Option<&PendingMerge> {
        self.level.pending_merge.as_ref()
    }

    /// Most recent merge result still on display
    pub fn shown_result(&self) -> Option<&Piece> {
        self.level.shown_result.as_ref()
    }

    pub fn quiz_choice(&self) -> Option<&str> {
        self.level.quiz_choice.as_deref()
    }

    pub fn is_level_complete(&self) -> bool {
        self.level.completed
    }

    pub fn is_finish_unlocked(&self) -> bool {
        self.level.finish_unlocked
    }

    // --- Flow ---

    /// Intro -> first level
    pub fn begin_journey(&mut self) -> Result<(), ActionError> {
        if !self.flow.begin() {
            return Err(rejected(ActionError::AlreadyStarted));
        }
        self.timers.cancel_all();
        self.enter_level();
        Ok(())
    }

    /// Move on to the next level
    ///
    /// Returns the new index, or `None` when the journey has ended.
    pub fn advance_level(&mut self) -> Result<Option<usize>, ActionError> {
        if self.flow.state() != FlowState::Playing {
            return Err(rejected(ActionError::NotPlaying));
        }
        self.timers.cancel_all();
        let next = self.flow.advance();
        self.enter_level();
        Ok(next)
    }

    pub fn jump_to_level(&mut self, index: usize) -> Result<(), ActionError> {
        self.flow.jump_to(index).map_err(rejected)?;
        self.timers.cancel_all();
        self.enter_level();
        Ok(())
    }

    pub fn restart_journey(&mut self) {
        self.timers.cancel_all();
        self.flow.restart();
        self.enter_level();
    }

    /// Advance after `delay`, unless the level changes first
    ///
    /// Replaces any advance already pending.
    pub fn schedule_advance(&mut self, delay: Duration) -> Result<TimerId, ActionError> {
        level_in_play(&self.data, &self.flow)?;
        Ok(self.schedule(TimerClass::AutoAdvance, delay, Deferred::Advance))
    }

    /// Leave a free level once its goal is reached and the pause has passed
    pub fn finish_journey(&mut self) -> Result<Option<usize>, ActionError> {
        let level = level_in_play(&self.data, &self.flow)?;
        if !matches!(level.activity, Activity::Free(_)) {
            return Err(rejected(ActionError::WrongActivity { expected: "free" }));
        }
        if !self.level.finish_unlocked {
            return Err(rejected(ActionError::FinishLocked));
        }
        self.advance_level()
    }

    fn enter_level(&mut self) {
        self.level = LevelState::for_level(self.current_level(), &self.settings);
        if let Some(level) = self.current_level() {
            log::debug!(
                "Entered level {} '{}' ({})",
                self.flow.index(),
                level.id,
                level.activity.name()
            );
        }
    }

    // --- Combination ---

    /// Drop an inventory piece onto the workspace
    pub fn place_piece(&mut self, piece: &str, position: Vec2) -> Result<PlacementId, ActionError> {
        let level = level_in_play(&self.data, &self.flow)?;
        if level.activity.catalog().is_none() {
            return Err(rejected(ActionError::WrongActivity {
                expected: "combination",
            }));
        }
        if self.level.pending_merge.is_some() {
            return Err(rejected(ActionError::MergePending));
        }
        let piece = self
            .level
            .inventory
            .get(piece)
            .cloned()
            .ok_or_else(|| rejected(ActionError::UnknownPiece(PieceId::from(piece))))?;
        Ok(self.level.workspace.place(piece, position))
    }

    /// Evaluate the workspace and apply the outcome
    ///
    /// `Ok(None)` means nothing happened: pieces are still moving, there are
    /// fewer than two, or (free levels) nothing is close enough.
    pub fn resolve(&mut self) -> Result<Option<Resolution>, ActionError> {
        let level = level_in_play(&self.data, &self.flow)?;
        let Some((catalog, mode)) = level.activity.catalog() else {
            return Err(rejected(ActionError::WrongActivity {
                expected: "combination",
            }));
        };
        if self.level.pending_merge.is_some() {
            return Err(rejected(ActionError::MergePending));
        }

        let resolution = Resolver::new(catalog, self.data.tie_breaks(), mode)
            .with_proximity(self.settings.pair_proximity, self.settings.triple_proximity)
            .resolve(&self.level.workspace, &self.level.inventory);

        let Some(resolution) = resolution else {
            return Ok(None);
        };
        log::debug!(
            "Resolved {:?} -> {:?}",
            resolution.targets(),
            resolution.effect()
        );
        self.apply_resolution(&resolution);
        Ok(Some(resolution))
    }

    fn apply_resolution(&mut self, resolution: &Resolution) {
        if let Resolution::Match {
            recipe,
            ingredients,
            targets,
        } = resolution
        {
            self.level.workspace.remove(targets);
            self.level.pending_merge = Some(PendingMerge {
                recipe: recipe.clone(),
                ingredients: ingredients.clone(),
            });
            self.schedule(
                TimerClass::Evolution,
                self.settings.evolution(),
                Deferred::CompleteMerge,
            );
            return;
        }

        let (status, delay) = match resolution.effect() {
            ResolutionEffect::Repel => (PieceStatus::Repelling, self.settings.repel_clear()),
            ResolutionEffect::Return | ResolutionEffect::Merge => {
                (PieceStatus::Returning, self.settings.return_clear())
            }
        };
        let targets = resolution.targets().to_vec();
        self.level.workspace.mark(&targets, status);
        self.schedule(TimerClass::WorkspaceClear, delay, Deferred::RemovePieces(targets));

        if let Some(message) = resolution.message() {
            self.set_feedback(message.to_owned(), Some(self.settings.feedback_clear()));
        }
    }

    /// Finish the pending merge now
    ///
    /// Normally fired by the evolution timer; call directly when the merge
    /// animation ends early. Does nothing without a pending merge.
    pub fn complete_merge(&mut self) -> Vec<JourneyEvent> {
        let Some(merge) = self.level.pending_merge.take() else {
            return Vec::new();
        };
        self.timers.cancel_class(TimerClass::Evolution);

        let result = merge.recipe.result;
        self.level.inventory.add_created(result.clone());
        self.level.shown_result = Some(result.clone());
        log::info!("Formed {} ({})", result.glyph, result.id);

        let (target_glyph, final_message, wow_pause) = match self.current_level() {
            Some(level) => match &level.activity {
                Activity::Combination(guided) => (Some(guided.target_glyph.clone()), None, 0),
                Activity::Free(free) => (None, Some(free.final_message.clone()), level.wow_pause_ms),
                _ => (None, None, 0),
            },
            None => (None, None, 0),
        };

        let is_target = target_glyph.as_deref() == Some(result.glyph.as_str());
        let mut events = vec![JourneyEvent::MergeCompleted {
            result: result.clone(),
            explanation: merge.recipe.explanation,
            is_target,
        }];

        if let Some(final_message) = final_message {
            let outcome = self.level.discovery.record(&result.glyph);
            if outcome.newly_discovered {
                events.push(JourneyEvent::Discovered {
                    result: result.clone(),
                    count: self.level.discovery.count(),
                    reached_goal: self.level.discovery.reached_goal(),
                });
            }
            if outcome.reached_goal {
                self.level.completed = true;
                self.schedule(
                    TimerClass::FinishUnlock,
                    Duration::from_millis(wow_pause),
                    Deferred::UnlockFinish,
                );
            }
            if self.level.discovery.reached_goal() {
                self.set_feedback(final_message, None);
            } else {
                self.set_feedback(
                    format!("Created {}!", result.label),
                    Some(self.settings.transient_feedback_clear()),
                );
            }
            self.schedule(
                TimerClass::ResultHold,
                self.settings.secondary_result_hold(),
                Deferred::HideResult,
            );
            return events;
        }

        self.set_feedback(
            format!("Formed {}", result.glyph),
            Some(self.settings.transient_feedback_clear()),
        );
        if is_target {
            self.level.completed = true;
            self.schedule(
                TimerClass::AutoAdvance,
                self.settings.combination_advance(),
                Deferred::Advance,
            );
        } else {
            self.schedule(
                TimerClass::ResultHold,
                self.settings.secondary_result_hold(),
                Deferred::HideResult,
            );
        }
        events
    }

    /// Take back the most recent placement
    pub fn undo_placement(&mut self) -> Result<Option<PlacedPiece>, ActionError> {
        self.require_catalog_level()?;
        Ok(self.level.workspace.pop())
    }

    pub fn clear_workspace(&mut self) -> Result<(), ActionError> {
        self.require_catalog_level()?;
        self.level.workspace.clear();
        self.timers.cancel_class(TimerClass::WorkspaceClear);
        Ok(())
    }

    fn require_catalog_level(&self) -> Result<(), ActionError> {
        let level = level_in_play(&self.data, &self.flow)?;
        match level.activity.catalog() {
            Some(_) => Ok(()),
            None => Err(rejected(ActionError::WrongActivity {
                expected: "combination",
            })),
        }
    }

    // --- Tracing ---

    /// Feed the samples drawn so far in the current attempt
    pub fn update_trace(&mut self, samples: &[Vec2], stroke_ended: bool) -> Result<f32, ActionError> {
        let level = level_in_play(&self.data, &self.flow)?;
        let Activity::Tracing(tracing) = &level.activity else {
            return Err(rejected(ActionError::WrongActivity { expected: "tracing" }));
        };

        let now = self.clock.now();
        let progress = self
            .level
            .trace
            .update(samples, stroke_ended, &tracing.guide, now);
        let auto_completed =
            tracing.auto_complete && self.level.trace.complete_at_threshold(&tracing.guide);

        if auto_completed {
            self.on_trace_completed();
        }
        Ok(progress)
    }

    /// Returns true if this confirmation completed the trace
    pub fn confirm_trace(&mut self) -> Result<bool, ActionError> {
        self.require_tracing_level()?;
        if !self.level.trace.confirm() {
            return Ok(false);
        }
        self.on_trace_completed();
        Ok(true)
    }

    /// Start the trace over; ignored once the trace is complete
    pub fn clear_trace(&mut self) -> Result<(), ActionError> {
        self.require_tracing_level()?;
        if !self.level.trace.is_completed() {
            self.level.trace.clear();
        }
        Ok(())
    }

    fn require_tracing_level(&self) -> Result<(), ActionError> {
        let level = level_in_play(&self.data, &self.flow)?;
        match level.activity {
            Activity::Tracing(_) => Ok(()),
            _ => Err(rejected(ActionError::WrongActivity { expected: "tracing" })),
        }
    }

    fn on_trace_completed(&mut self) {
        log::info!(
            "Trace complete at {:.0}%",
            self.level.trace.progress() * 100.0
        );
        self.level.completed = true;
        self.schedule(
            TimerClass::AutoAdvance,
            self.settings.trace_advance(),
            Deferred::Advance,
        );
    }

    // --- Quiz ---

    /// Answer the quiz; returns whether the option is correct
    ///
    /// Once answered correctly, further choices change nothing.
    pub fn choose_option(&mut self, option: &str) -> Result<bool, ActionError> {
        let level = level_in_play(&self.data, &self.flow)?;
        let Activity::Quiz(quiz) = &level.activity else {
            return Err(rejected(ActionError::WrongActivity { expected: "quiz" }));
        };
        let chosen = quiz
            .option(option)
            .ok_or_else(|| rejected(ActionError::UnknownOption(option.to_owned())))?;

        let correct = chosen.correct;
        if self.level.completed {
            return Ok(correct);
        }
        let text = if correct {
            quiz.explanation.clone()
        } else {
            chosen
                .feedback
                .clone()
                .unwrap_or_else(|| WRONG_ANSWER.to_owned())
        };

        self.level.quiz_choice = Some(option.to_owned());
        if correct {
            self.level.completed = true;
            self.set_feedback(text, None);
        } else {
            self.set_feedback(text, Some(self.settings.feedback_clear()));
        }
        Ok(correct)
    }

    // --- Timers ---

    /// Fire every timer that is due
    ///
    /// Timers scheduled for a level that is no longer current are dropped.
    pub fn tick(&mut self) -> Vec<JourneyEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();

        for timer in self.timers.drain_due(now) {
            if !self.flow.is_current(timer.token) {
                log::debug!("Dropped stale {:?} timer", timer.class);
                continue;
            }
            log::debug!("Fired {:?} timer", timer.class);

            match timer.effect {
                Deferred::ClearFeedback { generation } => {
                    if generation == self.level.feedback_generation
                        && self.level.feedback.take().is_some()
                    {
                        events.push(JourneyEvent::FeedbackCleared);
                    }
                }
                Deferred::RemovePieces(ids) => {
                    if self.level.workspace.remove(&ids) > 0 {
                        events.push(JourneyEvent::PiecesRemoved(ids));
                    }
                }
                Deferred::CompleteMerge => events.extend(self.complete_merge()),
                Deferred::HideResult => {
                    if let Some(piece) = self.level.shown_result.take() {
                        events.push(JourneyEvent::ResultHidden(piece.id));
                    }
                }
                Deferred::UnlockFinish => {
                    self.level.finish_unlocked = true;
                    events.push(JourneyEvent::FinishUnlocked);
                }
                Deferred::Advance => match self.advance_level() {
                    Ok(Some(index)) => events.push(JourneyEvent::LevelEntered { index }),
                    Ok(None) => events.push(JourneyEvent::JourneyEnded),
                    Err(_) => {}
                },
            }
        }

        events
    }

    fn schedule(&mut self, class: TimerClass, delay: Duration, effect: Deferred) -> TimerId {
        let due = self.clock.now() + delay;
        self.timers.schedule(class, due, self.flow.token(), effect)
    }

    /// Show a message; `clear_after` of `None` keeps it until replaced
    fn set_feedback(&mut self, text: String, clear_after: Option<Duration>) {
        self.level.feedback_generation += 1;
        self.level.feedback = Some(text);
        match clear_after {
            Some(delay) => {
                let generation = self.level.feedback_generation;
                self.schedule(
                    TimerClass::FeedbackClear,
                    delay,
                    Deferred::ClearFeedback { generation },
                );
            }
            None => self.timers.cancel_class(TimerClass::FeedbackClear),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ManualClock;

    fn journey() -> (Journey<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let journey = Journey::with_default_journey(clock.clone()).expect("bundled journey");
        (journey, clock)
    }

    fn at(journey: &mut Journey<ManualClock>, index: usize) {
        journey.jump_to_level(index).expect("level exists");
    }

    fn place(journey: &mut Journey<ManualClock>, piece: &str, x: f32, y: f32) -> PlacementId {
        journey.place_piece(piece, Vec2::new(x, y)).expect("placeable")
    }

    /// Place two pieces side by side, resolve, and let the merge finish
    fn combine(journey: &mut Journey<ManualClock>, clock: &ManualClock, a: &str, b: &str) -> Vec<JourneyEvent> {
        place(journey, a, 100.0, 150.0);
        place(journey, b, 200.0, 150.0);
        let resolution = journey.resolve().expect("combination level");
        assert!(resolution.is_some_and(|r| r.is_match()), "{a} + {b} should match");
        clock.advance_ms(1800);
        journey.tick()
    }

    fn merged(events: &[JourneyEvent]) -> Option<(&str, bool)> {
        events.iter().find_map(|e| match e {
            JourneyEvent::MergeCompleted { result, is_target, .. } => {
                Some((result.id.as_str(), *is_target))
            }
            _ => None,
        })
    }

    #[test]
    fn test_begin_enters_first_level() {
        let (mut journey, _) = journey();
        assert_eq!(journey.flow_state(), FlowState::Intro);
        assert_eq!(
            journey.place_piece("ren", Vec2::ZERO),
            Err(ActionError::NotPlaying)
        );

        journey.begin_journey().unwrap();
        assert_eq!(journey.flow_state(), FlowState::Playing);
        assert_eq!(journey.current_level_index(), 0);
        assert_eq!(journey.begin_journey(), Err(ActionError::AlreadyStarted));
    }

    #[test]
    fn test_stale_advance_is_dropped() {
        let (mut journey, clock) = journey();
        at(&mut journey, 3);
        journey.schedule_advance(Duration::from_millis(1000)).unwrap();

        clock.advance_ms(200);
        at(&mut journey, 5);

        clock.advance_ms(1000);
        assert!(journey.tick().is_empty());
        assert_eq!(journey.current_level_index(), 5);
    }

    #[test]
    fn test_new_advance_replaces_pending_one() {
        let (mut journey, clock) = journey();
        at(&mut journey, 3);
        journey.schedule_advance(Duration::from_millis(1000)).unwrap();
        journey.schedule_advance(Duration::from_millis(500)).unwrap();

        clock.advance_ms(500);
        assert_eq!(journey.tick(), vec![JourneyEvent::LevelEntered { index: 4 }]);
        clock.advance_ms(1000);
        assert!(journey.tick().is_empty());
        assert_eq!(journey.current_level_index(), 4);
    }

    #[test]
    fn test_guided_target_completes_and_advances() {
        let (mut journey, clock) = journey();
        at(&mut journey, 3);

        place(&mut journey, "ren", 100.0, 150.0);
        place(&mut journey, "mu", 200.0, 150.0);
        let resolution = journey.resolve().unwrap().unwrap();
        assert!(resolution.is_match());
        assert!(journey.workspace().is_empty());
        assert!(journey.pending_merge().is_some());
        assert_eq!(
            journey.place_piece("kou", Vec2::new(150.0, 150.0)),
            Err(ActionError::MergePending)
        );

        clock.advance_ms(1800);
        let events = journey.tick();
        assert_eq!(merged(&events), Some(("xiu", true)));
        assert_eq!(journey.feedback(), Some("Formed 休"));
        assert!(journey.inventory().contains("xiu"));
        assert!(journey.is_level_complete());

        clock.advance_ms(1400);
        assert_eq!(journey.tick(), vec![JourneyEvent::LevelEntered { index: 4 }]);
        assert!(!journey.is_level_complete());
        assert!(journey.feedback().is_none());
    }

    #[test]
    fn test_side_by_side_rests_in_either_order() {
        let (mut journey, _) = journey();
        at(&mut journey, 3);

        place(&mut journey, "mu", 100.0, 150.0);
        place(&mut journey, "ren", 200.0, 150.0);
        let Some(Resolution::Match { recipe, ingredients, .. }) = journey.resolve().unwrap() else {
            panic!("expected rest");
        };
        assert_eq!(recipe.result.glyph, "休");
        let order: Vec<&str> = ingredients.iter().map(|p| p.piece.id.as_str()).collect();
        assert_eq!(order, vec!["mu", "ren"]);
    }

    #[test]
    fn test_wrong_orientation_repels() {
        let (mut journey, clock) = journey();
        at(&mut journey, 3);

        // 休 wants the pieces side by side
        let mu = place(&mut journey, "mu", 175.0, 100.0);
        let ren = place(&mut journey, "ren", 175.0, 240.0);
        let resolution = journey.resolve().unwrap().unwrap();
        assert!(matches!(resolution, Resolution::WrongOrientation { .. }));
        assert!(
            journey
                .workspace()
                .pieces()
                .iter()
                .all(|p| p.status == PieceStatus::Repelling)
        );
        assert_eq!(
            journey.feedback(),
            Some("Wrong direction: piece orientation does not match.")
        );
        // Still animating
        assert_eq!(journey.resolve(), Ok(None));

        clock.advance_ms(350);
        assert_eq!(journey.tick(), vec![JourneyEvent::PiecesRemoved(vec![mu, ren])]);
        assert!(journey.workspace().is_empty());
    }

    #[test]
    fn test_feedback_clear_respects_newer_message() {
        let (mut journey, clock) = journey();
        at(&mut journey, 3);

        place(&mut journey, "ren", 100.0, 150.0);
        place(&mut journey, "kou", 200.0, 150.0);
        let first = journey.resolve().unwrap().unwrap();
        assert!(matches!(first, Resolution::InvalidDistractor { .. }));
        assert_eq!(
            journey.feedback(),
            Some("Invalid combination: a person and a mouth do not make rest.")
        );

        clock.advance_ms(600);
        let events = journey.tick();
        assert!(matches!(events.as_slice(), [JourneyEvent::PiecesRemoved(_)]));

        clock.advance_ms(400);
        place(&mut journey, "kou", 100.0, 150.0);
        place(&mut journey, "mu", 200.0, 150.0);
        journey.resolve().unwrap();
        let second = Some("Invalid combination: a mouth cannot lean against a tree.");
        assert_eq!(journey.feedback(), second);

        // The first message's clear time passes without touching the second
        clock.advance_ms(400);
        journey.tick();
        assert_eq!(journey.feedback(), second);

        clock.advance_ms(1000);
        let events = journey.tick();
        assert!(events.contains(&JourneyEvent::FeedbackCleared));
        assert!(journey.feedback().is_none());
    }

    #[test]
    fn test_non_target_result_is_held_then_hidden() {
        let (mut journey, clock) = journey();
        at(&mut journey, 5);

        // Mark above the tree reads as the tip
        place(&mut journey, "yi", 175.0, 100.0);
        place(&mut journey, "mu", 175.0, 220.0);
        journey.resolve().unwrap();
        clock.advance_ms(1800);
        let events = journey.tick();
        assert_eq!(merged(&events), Some(("mo", false)));
        assert_eq!(journey.shown_result().map(|p| p.glyph.as_str()), Some("末"));
        assert!(!journey.is_level_complete());

        clock.advance_ms(1200);
        assert_eq!(journey.tick(), vec![JourneyEvent::ResultHidden("mo".into())]);
        assert!(journey.shown_result().is_none());
    }

    #[test]
    fn test_guard_lifts_once_prerequisite_is_created() {
        let (mut journey, clock) = journey();
        at(&mut journey, 6);

        place(&mut journey, "ren", 100.0, 150.0);
        place(&mut journey, "kou", 200.0, 150.0);
        let guarded = journey.resolve().unwrap().unwrap();
        assert!(matches!(guarded, Resolution::GuardRejected { .. }));
        assert_eq!(
            journey.feedback(),
            Some("Invalid combination: form speech first, then combine with person.")
        );
        clock.advance_ms(600);
        journey.tick();

        place(&mut journey, "er", 175.0, 100.0);
        place(&mut journey, "kou", 175.0, 220.0);
        journey.resolve().unwrap();
        clock.advance_ms(1800);
        assert_eq!(merged(&journey.tick()), Some(("yan", false)));
        assert!(journey.inventory().contains("yan"));

        let events = combine(&mut journey, &clock, "ren", "yan");
        assert_eq!(merged(&events), Some(("xin", true)));
        assert!(journey.is_level_complete());
    }

    #[test]
    fn test_triple_forms_crowd() {
        let (mut journey, clock) = journey();
        at(&mut journey, 8);

        place(&mut journey, "ren", 175.0, 105.0);
        place(&mut journey, "ren", 115.0, 215.0);
        place(&mut journey, "ren", 235.0, 215.0);
        let resolution = journey.resolve().unwrap().unwrap();
        match &resolution {
            Resolution::Match { recipe, ingredients, .. } => {
                assert_eq!(recipe.result.glyph, "众");
                assert_eq!(ingredients.len(), 3);
            }
            other => panic!("expected a match, got {other:?}"),
        }

        clock.advance_ms(1800);
        assert_eq!(merged(&journey.tick()), Some(("zhong", true)));
    }

    #[test]
    fn test_free_discovery_counts_distinct_results() {
        let (mut journey, clock) = journey();
        at(&mut journey, 10);

        combine(&mut journey, &clock, "ren", "mu");
        assert_eq!(journey.discovered().len(), 1);
        assert_eq!(journey.feedback(), Some("Created rest!"));

        // Repeats don't count
        let events = combine(&mut journey, &clock, "ren", "mu");
        assert!(!events.iter().any(|e| matches!(e, JourneyEvent::Discovered { .. })));
        assert_eq!(journey.discovered().len(), 1);

        combine(&mut journey, &clock, "ri", "yue");
        let events = combine(&mut journey, &clock, "mu", "mu");
        assert!(events.iter().any(|e| matches!(
            e,
            JourneyEvent::Discovered { count: 3, reached_goal: true, .. }
        )));
        assert_eq!(journey.discovered(), &["休", "明", "林"]);
        assert_eq!(
            journey.feedback(),
            Some("You have learned to build meaning from pieces.")
        );
        assert_eq!(journey.finish_journey(), Err(ActionError::FinishLocked));

        clock.advance_ms(1500);
        assert!(journey.tick().contains(&JourneyEvent::FinishUnlocked));
        assert_eq!(journey.finish_journey(), Ok(None));
        assert_eq!(journey.flow_state(), FlowState::Ending);
        assert!(journey.current_level().is_none());
    }

    #[test]
    fn test_final_message_stays_after_goal() {
        let (mut journey, clock) = journey();
        at(&mut journey, 10);
        combine(&mut journey, &clock, "ren", "mu");
        combine(&mut journey, &clock, "ri", "yue");
        combine(&mut journey, &clock, "mu", "mu");
        let final_message = Some("You have learned to build meaning from pieces.");
        assert_eq!(journey.feedback(), final_message);

        let events = combine(&mut journey, &clock, "nv", "zi");
        assert!(events.iter().any(|e| matches!(
            e,
            JourneyEvent::Discovered { count: 4, reached_goal: true, .. }
        )));
        assert_eq!(journey.feedback(), final_message);
        assert!(journey.is_finish_unlocked());

        clock.advance_ms(5000);
        journey.tick();
        assert_eq!(journey.feedback(), final_message);
    }

    #[test]
    fn test_free_mode_created_results_are_ingredients() {
        let (mut journey, clock) = journey();
        at(&mut journey, 10);
        combine(&mut journey, &clock, "ren", "mu");
        assert!(journey.place_piece("xiu", Vec2::new(150.0, 150.0)).is_ok());
    }

    #[test]
    fn test_trace_confirm_needs_progress() {
        let (mut journey, clock) = journey();
        at(&mut journey, 0);

        assert_eq!(journey.confirm_trace(), Ok(false));
        assert!(!journey.is_level_complete());

        let progress = journey
            .update_trace(&[Vec2::new(0.49, 0.22)], false)
            .unwrap();
        assert!(progress > 0.0);
        assert!(!journey.is_level_complete());
        assert_eq!(journey.confirm_trace(), Ok(true));
        assert!(journey.is_level_complete());

        clock.advance_ms(1200);
        assert_eq!(journey.tick(), vec![JourneyEvent::LevelEntered { index: 1 }]);
    }

    #[test]
    fn test_trace_auto_completes_at_threshold() {
        let (mut journey, clock) = journey();
        at(&mut journey, 1);

        let samples: Vec<Vec2> = match &journey.current_level().unwrap().activity {
            Activity::Tracing(tracing) => tracing
                .guide
                .strokes()
                .iter()
                .flat_map(|s| s.points.iter().copied())
                .collect(),
            other => panic!("expected tracing, got {}", other.name()),
        };
        journey.update_trace(&samples, false).unwrap();
        assert!(journey.is_level_complete());

        clock.advance_ms(1200);
        assert_eq!(journey.tick(), vec![JourneyEvent::LevelEntered { index: 2 }]);
    }

    #[test]
    fn test_clear_trace_restarts_attempt() {
        let (mut journey, _) = journey();
        at(&mut journey, 0);
        journey.update_trace(&[Vec2::new(0.49, 0.22)], false).unwrap();
        journey.clear_trace().unwrap();
        assert_eq!(journey.trace_progress(), 0.0);
        assert_eq!(journey.confirm_trace(), Ok(false));
    }

    #[test]
    fn test_quiz_answers() {
        let (mut journey, clock) = journey();
        at(&mut journey, 2);

        assert_eq!(journey.choose_option("ren"), Ok(false));
        assert_eq!(
            journey.feedback(),
            Some("That is a person walking, not a tree.")
        );
        assert_eq!(
            journey.choose_option("huo"),
            Err(ActionError::UnknownOption("huo".into()))
        );

        assert_eq!(journey.choose_option("mu"), Ok(true));
        assert!(journey.is_level_complete());
        assert_eq!(journey.quiz_choice(), Some("mu"));

        // The explanation stays up
        clock.advance_ms(5000);
        journey.tick();
        assert!(journey.feedback().is_some_and(|f| f.starts_with("木")));

        assert_eq!(journey.advance_level(), Ok(Some(3)));
    }

    #[test]
    fn test_actions_checked_against_activity() {
        let (mut journey, _) = journey();
        at(&mut journey, 0);
        assert_eq!(
            journey.place_piece("ren", Vec2::ZERO),
            Err(ActionError::WrongActivity { expected: "combination" })
        );

        at(&mut journey, 3);
        assert_eq!(
            journey.confirm_trace(),
            Err(ActionError::WrongActivity { expected: "tracing" })
        );
        assert_eq!(
            journey.place_piece("huo", Vec2::ZERO),
            Err(ActionError::UnknownPiece("huo".into()))
        );
        assert_eq!(
            journey.finish_journey(),
            Err(ActionError::WrongActivity { expected: "free" })
        );
        assert!(matches!(
            journey.jump_to_level(99),
            Err(ActionError::LevelOutOfRange { index: 99, .. })
        ));
        assert_eq!(journey.current_level_index(), 3);
    }

    #[test]
    fn test_undo_and_clear() {
        let (mut journey, _) = journey();
        at(&mut journey, 3);
        place(&mut journey, "ren", 100.0, 150.0);
        let mu = place(&mut journey, "mu", 200.0, 150.0);

        let undone = journey.undo_placement().unwrap();
        assert_eq!(undone.map(|p| p.id), Some(mu));
        assert_eq!(journey.workspace().len(), 1);

        journey.clear_workspace().unwrap();
        assert!(journey.workspace().is_empty());
        assert_eq!(journey.undo_placement(), Ok(None));
    }

    #[test]
    fn test_restart_drops_everything() {
        let (mut journey, clock) = journey();
        at(&mut journey, 10);
        place(&mut journey, "ren", 100.0, 150.0);
        place(&mut journey, "mu", 200.0, 150.0);
        journey.resolve().unwrap();

        journey.restart_journey();
        assert_eq!(journey.flow_state(), FlowState::Intro);
        assert_eq!(journey.current_level_index(), 0);
        assert!(journey.pending_merge().is_none());
        assert!(journey.discovered().is_empty());

        clock.advance_ms(10_000);
        assert!(journey.tick().is_empty());
    }

    #[test]
    fn test_advancing_past_last_level_ends() {
        let (mut journey, _) = journey();
        let last = journey.data().len() - 1;
        at(&mut journey, last);
        assert_eq!(journey.advance_level(), Ok(None));
        assert_eq!(journey.flow_state(), FlowState::Ending);
        assert_eq!(journey.advance_level(), Err(ActionError::NotPlaying));
    }
}
