//! The coalescing paint scheduler (`spec.md` §4.6): merge successive masks, request one
//! frame, apply time-scale mutations, trigger auto-scale, then paint.

use std::time::Duration;

use log::{debug, trace};
use tokio::sync::Mutex;
use tokio::time::interval;

use crate::invalidation::{InvalidateMask, InvalidationLevel, TimeScaleInvalidation};

/// The opaque renderer surface the scheduler drives. Pixel-exact rendering is out of scope
/// (`spec.md` §1); this only names the calls the scheduler must make and in what order.
pub trait Renderer {
    fn pane_count(&self) -> usize;
    /// Rebuilds the pane topology from the data model. Called once per frame, only when the
    /// frame's level is `Full`.
    fn sync_panes(&mut self);
    fn apply_time_scale(&mut self, invalidation: &TimeScaleInvalidation);
    fn autoscale_pane(&mut self, pane: usize);
    fn update_axis_widgets(&mut self);
    fn paint_pane(&mut self, pane: usize, level: InvalidationLevel, autoscale: bool);
    fn paint_time_axis(&mut self);
}

/// A single-threaded cooperative scheduler: one pending mask, at most one frame request in
/// flight at a time.
#[derive(Default)]
pub struct PaintScheduler {
    pending: Option<InvalidateMask>,
    frame_requested: bool,
}

impl PaintScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `mask` into the pending mask. Returns `true` the first time this causes a
    /// frame request to become necessary (the host should schedule one); returns `false` if
    /// a frame is already pending, since multiple `invalidate` calls in one tick must
    /// collapse into a single paint.
    pub fn invalidate(&mut self, mask: InvalidateMask) -> bool {
        match &mut self.pending {
            Some(pending) => pending.merge(&mask),
            None => self.pending = Some(mask),
        }
        if self.frame_requested {
            false
        } else {
            self.frame_requested = true;
            true
        }
    }

    pub fn has_pending_frame(&self) -> bool {
        self.frame_requested
    }

    /// Drains the pending mask and runs one draw pass against `renderer`. A no-op if nothing
    /// is pending.
    pub fn on_frame<R: Renderer>(&mut self, renderer: &mut R) {
        self.frame_requested = false;
        let Some(mask) = self.pending.take() else {
            return;
        };
        debug!("paint scheduler draining frame, level={}", mask.full_invalidation());
        self.draw(mask, renderer);
    }

    fn draw<R: Renderer>(&mut self, mut mask: InvalidateMask, renderer: &mut R) {
        let level = mask.full_invalidation();

        if level == InvalidationLevel::Full {
            renderer.sync_panes();
        }

        if level >= InvalidationLevel::Light {
            Self::apply_time_scale_and_autoscale(&mask, renderer);
            renderer.update_axis_widgets();

            // Single-level re-entry guard: if a new Full mask accumulated while we were
            // applying the time scale above, fold it in and re-run once before painting.
            if let Some(reentrant) = self.pending.take() {
                if reentrant.full_invalidation() == InvalidationLevel::Full {
                    trace!("paint scheduler re-entry guard fired");
                    mask.merge(&reentrant);
                    Self::apply_time_scale_and_autoscale(&mask, renderer);
                    renderer.update_axis_widgets();
                } else {
                    self.pending = Some(reentrant);
                }
            }
        }

        for pane in 0..renderer.pane_count() {
            let entry = mask.invalidate_for_pane(pane);
            renderer.paint_pane(pane, entry.level, entry.autoscale);
        }

        if level == InvalidationLevel::Full {
            renderer.paint_time_axis();
        }
    }

    fn apply_time_scale_and_autoscale<R: Renderer>(mask: &InvalidateMask, renderer: &mut R) {
        for invalidation in mask.time_scale_invalidations() {
            renderer.apply_time_scale(invalidation);
        }
        for (&pane, entry) in mask.panes() {
            if entry.autoscale {
                renderer.autoscale_pane(pane);
            }
        }
    }
}

/// Drives `scheduler` off a fixed-interval ticker instead of a host "request-animation-frame"
/// primitive, for hosts with no native frame clock. Grounded in this codebase's
/// `tokio::task` + interval drain pattern for background handlers; runs until `frame_interval`
/// consumers stop polling (never returns on its own).
pub async fn run_frame_pump<R: Renderer>(scheduler: &Mutex<PaintScheduler>, renderer: &Mutex<R>, frame_interval: Duration) {
    let mut ticker = interval(frame_interval);
    loop {
        ticker.tick().await;
        let mut scheduler = scheduler.lock().await;
        let mut renderer = renderer.lock().await;
        scheduler.on_frame(&mut *renderer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingRenderer {
        pane_count: usize,
        synced: bool,
        applied: Vec<TimeScaleInvalidation>,
        autoscaled: Vec<usize>,
        axis_updates: u32,
        painted: Vec<(usize, InvalidationLevel, bool)>,
        time_axis_paints: u32,
    }

    impl Renderer for RecordingRenderer {
        fn pane_count(&self) -> usize {
            self.pane_count
        }
        fn sync_panes(&mut self) {
            self.synced = true;
        }
        fn apply_time_scale(&mut self, invalidation: &TimeScaleInvalidation) {
            self.applied.push(*invalidation);
        }
        fn autoscale_pane(&mut self, pane: usize) {
            self.autoscaled.push(pane);
        }
        fn update_axis_widgets(&mut self) {
            self.axis_updates += 1;
        }
        fn paint_pane(&mut self, pane: usize, level: InvalidationLevel, autoscale: bool) {
            self.painted.push((pane, level, autoscale));
        }
        fn paint_time_axis(&mut self) {
            self.time_axis_paints += 1;
        }
    }

    #[test]
    fn second_invalidate_in_same_tick_does_not_request_another_frame() {
        let mut scheduler = PaintScheduler::new();
        assert!(scheduler.invalidate(InvalidateMask::new(InvalidationLevel::Cursor)));
        assert!(!scheduler.invalidate(InvalidateMask::new(InvalidationLevel::Full)));
    }

    #[test]
    fn full_frame_syncs_panes_and_paints_time_axis() {
        let mut scheduler = PaintScheduler::new();
        let mut renderer = RecordingRenderer { pane_count: 2, ..Default::default() };
        let mut mask = InvalidateMask::new(InvalidationLevel::Full);
        mask.invalidate_pane(0, InvalidationLevel::Full, true);
        scheduler.invalidate(mask);
        scheduler.on_frame(&mut renderer);

        assert!(renderer.synced);
        assert_eq!(renderer.time_axis_paints, 1);
        assert_eq!(renderer.painted.len(), 2);
        assert_eq!(renderer.autoscaled, vec![0]);
    }

    #[test]
    fn cursor_only_frame_skips_sync_and_time_axis() {
        let mut scheduler = PaintScheduler::new();
        let mut renderer = RecordingRenderer { pane_count: 1, ..Default::default() };
        scheduler.invalidate(InvalidateMask::new(InvalidationLevel::Cursor));
        scheduler.on_frame(&mut renderer);

        assert!(!renderer.synced);
        assert_eq!(renderer.time_axis_paints, 0);
        assert_eq!(renderer.axis_updates, 0);
        assert_eq!(renderer.painted, vec![(0, InvalidationLevel::Cursor, false)]);
    }

    #[test]
    fn time_scale_mutations_apply_in_enqueued_order() {
        let mut scheduler = PaintScheduler::new();
        let mut renderer = RecordingRenderer { pane_count: 0, ..Default::default() };
        let mut mask = InvalidateMask::new(InvalidationLevel::Light);
        mask.set_fit_content();
        mask.set_bar_spacing(7.0);
        scheduler.invalidate(mask);
        scheduler.on_frame(&mut renderer);

        assert_eq!(
            renderer.applied,
            vec![TimeScaleInvalidation::FitContent, TimeScaleInvalidation::ApplyBarSpacing(7.0)]
        );
    }

    #[test]
    fn no_pending_mask_is_a_no_op() {
        let mut scheduler = PaintScheduler::new();
        let mut renderer = RecordingRenderer::default();
        scheduler.on_frame(&mut renderer);
        assert!(!renderer.synced);
        assert!(renderer.painted.is_empty());
    }
}
