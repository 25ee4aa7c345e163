//! The coalescing, level-based invalidation mask (`spec.md` §4.5).

use std::collections::HashMap;

use strum_macros::Display;

/// Coarse rank of how much redraw is required. Declaration order is ascending so a derived
/// `Ord` gives `None < Cursor < Light < Full` directly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Display)]
pub enum InvalidationLevel {
    #[default]
    None,
    Cursor,
    Light,
    Full,
}

/// A time-scale mutation enqueued onto a mask. The "replacing" variants (`FitContent`,
/// `ApplyRange`, `Reset`) dominate earlier mutations in the same mask: setting one of them
/// clears whatever was queued before it. `ApplyBarSpacing`/`ApplyRightOffset` append instead.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeScaleInvalidation {
    FitContent,
    ApplyRange { from: f64, to: f64 },
    ApplyBarSpacing(f64),
    ApplyRightOffset(f64),
    Reset,
}

/// Per-pane invalidation entry: a level plus whether autoscale was requested for this pane.
#[derive(Clone, Copy, Debug, Default)]
pub struct PaneInvalidation {
    pub level: InvalidationLevel,
    pub autoscale: bool,
}

/// Coalesces per-pane and global invalidation levels and an ordered list of time-scale
/// mutations, so a burst of mutations in one tick collapses into one paint pass.
#[derive(Clone, Debug, Default)]
pub struct InvalidateMask {
    global_level: InvalidationLevel,
    panes: HashMap<usize, PaneInvalidation>,
    time_scale_invalidations: Vec<TimeScaleInvalidation>,
}

impl InvalidateMask {
    pub fn new(global_level: InvalidationLevel) -> Self {
        InvalidateMask {
            global_level,
            panes: HashMap::new(),
            time_scale_invalidations: Vec::new(),
        }
    }

    pub fn global_level(&self) -> InvalidationLevel {
        self.global_level
    }

    pub fn set_global_level(&mut self, level: InvalidationLevel) {
        self.global_level = self.global_level.max(level);
    }

    /// Merges `level`/`autoscale` into the per-pane entry by `max(level)` and
    /// `autoscale₁ || autoscale₂`.
    pub fn invalidate_pane(&mut self, pane: usize, level: InvalidationLevel, autoscale: bool) {
        let entry = self.panes.entry(pane).or_default();
        entry.level = entry.level.max(level);
        entry.autoscale |= autoscale;
    }

    /// The effective level for `pane`: `max(globalLevel, entry.level)`, with `autoscale`
    /// taken from the entry (`false` if there is no entry).
    pub fn invalidate_for_pane(&self, pane: usize) -> PaneInvalidation {
        let entry = self.panes.get(&pane);
        PaneInvalidation {
            level: self.global_level.max(entry.map(|e| e.level).unwrap_or_default()),
            autoscale: entry.map(|e| e.autoscale).unwrap_or(false),
        }
    }

    pub fn set_fit_content(&mut self) {
        self.time_scale_invalidations = vec![TimeScaleInvalidation::FitContent];
    }

    pub fn apply_range(&mut self, from: f64, to: f64) {
        self.time_scale_invalidations = vec![TimeScaleInvalidation::ApplyRange { from, to }];
    }

    pub fn reset_time_scale(&mut self) {
        self.time_scale_invalidations = vec![TimeScaleInvalidation::Reset];
    }

    pub fn set_bar_spacing(&mut self, spacing: f64) {
        self.time_scale_invalidations.push(TimeScaleInvalidation::ApplyBarSpacing(spacing));
    }

    pub fn set_right_offset(&mut self, offset: f64) {
        self.time_scale_invalidations.push(TimeScaleInvalidation::ApplyRightOffset(offset));
    }

    /// Replays `other`'s time-scale invalidations through the same setters (so dominance
    /// rules still apply), takes `max(globalLevel)`, and merges pane entries.
    pub fn merge(&mut self, other: &InvalidateMask) {
        for invalidation in &other.time_scale_invalidations {
            match *invalidation {
                TimeScaleInvalidation::FitContent => self.set_fit_content(),
                TimeScaleInvalidation::Reset => self.reset_time_scale(),
                TimeScaleInvalidation::ApplyRange { from, to } => self.apply_range(from, to),
                TimeScaleInvalidation::ApplyBarSpacing(n) => self.set_bar_spacing(n),
                TimeScaleInvalidation::ApplyRightOffset(n) => self.set_right_offset(n),
            }
        }
        self.set_global_level(other.global_level);
        for (&pane, entry) in &other.panes {
            self.invalidate_pane(pane, entry.level, entry.autoscale);
        }
    }

    pub fn full_invalidation(&self) -> InvalidationLevel {
        self.global_level
    }

    pub fn is_empty(&self) -> bool {
        self.global_level == InvalidationLevel::None && self.panes.is_empty() && self.time_scale_invalidations.is_empty()
    }

    pub fn time_scale_invalidations(&self) -> &[TimeScaleInvalidation] {
        &self.time_scale_invalidations
    }

    pub fn panes(&self) -> impl Iterator<Item = (&usize, &PaneInvalidation)> {
        self.panes.iter()
    }
}
