//! Free-discovery tracking
//!
//! Counts distinct result glyphs formed in a free level. Repeats never
//! count twice.

use serde::{Deserialize, Serialize};

/// What a single [`DiscoveryTracker::record`] changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiscoveryOutcome {
    /// First time this result was formed
    pub newly_discovered: bool,
    /// This record crossed the target count
    pub reached_goal: bool,
}

/// Distinct results discovered so far, in discovery order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryTracker {
    target_count: usize,
    discovered: Vec<String>,
}

impl DiscoveryTracker {
    pub fn new(target_count: usize) -> Self {
        Self {
            target_count,
            discovered: Vec::new(),
        }
    }

    /// Record a formed result by its glyph
    pub fn record(&mut self, glyph: &str) -> DiscoveryOutcome {
        if self.discovered.iter().any(|g| g == glyph) {
            return DiscoveryOutcome::default();
        }

        let was_reached = self.reached_goal();
        self.discovered.push(glyph.to_owned());
        log::info!(
            "Discovered '{}' ({}/{})",
            glyph,
            self.discovered.len(),
            self.target_count
        );

        DiscoveryOutcome {
            newly_discovered: true,
            reached_goal: !was_reached && self.reached_goal(),
        }
    }

    pub fn count(&self) -> usize {
        self.discovered.len()
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    pub fn discovered(&self) -> &[String] {
        &self.discovered
    }

    pub fn reached_goal(&self) -> bool {
        self.discovered.len() >= self.target_count
    }
}
