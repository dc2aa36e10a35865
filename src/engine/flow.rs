//! Level flow state machine
//!
//! Intro -> Playing -> Ending, with restart back to Intro. Every level change
//! bumps the epoch, so a [`LevelToken`] captured earlier stops matching even
//! when the index comes back around.

use serde::{Deserialize, Serialize};

use crate::error::ActionError;

/// Top-level phase of a journey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlowState {
    /// Title screen, nothing running yet
    #[default]
    Intro,
    /// A level is active
    Playing,
    /// Past the last level
    Ending,
}

/// Identity of one visit to a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelToken {
    pub index: usize,
    pub epoch: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowController {
    state: FlowState,
    index: usize,
    epoch: u64,
    level_count: usize,
}

impl FlowController {
    pub fn new(level_count: usize) -> Self {
        Self {
            state: FlowState::Intro,
            index: 0,
            epoch: 0,
            level_count,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn level_count(&self) -> usize {
        self.level_count
    }

    pub fn token(&self) -> LevelToken {
        LevelToken {
            index: self.index,
            epoch: self.epoch,
        }
    }

    /// Whether a token captured earlier still refers to the active level
    pub fn is_current(&self, token: LevelToken) -> bool {
        self.state == FlowState::Playing && token == self.token()
    }

    /// Intro -> Playing; returns false from any other state
    pub fn begin(&mut self) -> bool {
        if self.state != FlowState::Intro {
            return false;
        }
        self.state = FlowState::Playing;
        self.epoch += 1;
        log::info!("Journey started at level {}", self.index);
        true
    }

    /// Move to the next level, or to Ending after the last one
    ///
    /// Returns the new index, or `None` once the journey has ended.
    pub fn advance(&mut self) -> Option<usize> {
        self.epoch += 1;
        if self.index + 1 < self.level_count {
            self.index += 1;
            self.state = FlowState::Playing;
            log::info!("Advanced to level {}", self.index);
            Some(self.index)
        } else {
            self.state = FlowState::Ending;
            log::info!("Journey complete");
            None
        }
    }

    pub fn jump_to(&mut self, index: usize) -> Result<(), ActionError> {
        if index >= self.level_count {
            return Err(ActionError::LevelOutOfRange {
                index,
                count: self.level_count,
            });
        }
        self.index = index;
        self.state = FlowState::Playing;
        self.epoch += 1;
        log::info!("Jumped to level {}", index);
        Ok(())
    }

    pub fn restart(&mut self) {
        self.index = 0;
        self.state = FlowState::Intro;
        self.epoch += 1;
        log::info!("Journey restarted");
    }
}
