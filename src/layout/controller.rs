use egui::{CursorIcon, Pos2, Rect, Vec2};

use super::capture::InputCapture;
use super::collision::{find_dock_position, push_out};
use super::geometry::{clamp_into, container_rect, overlaps};
use super::options::LayoutOptions;
use super::scheduler::{FrameScheduler, FrameToken};
use super::session::{
    DragSession, Gesture, GesturePhase, ResizeEdge, ResizeSession, SettleAnimation, resized_rect,
};
use super::snap::{SnapGuides, find_guides};
use super::types::{SizeConstraints, WidgetId};

/// What the controller needs from whoever owns widget geometry.
///
/// [`super::LayoutStore`] implements it; `publish_rect` is the update callback through which
/// every computed rect flows back to the owner.
pub trait WidgetGeometry {
    fn container_size(&self) -> Vec2;

    fn widget_rect(&self, id: &WidgetId) -> Option<Rect>;

    fn size_constraints(&self, id: &WidgetId) -> SizeConstraints;

    /// Every other widget on the canvas, in layout order.
    fn occupants(&self, exclude: &WidgetId) -> Vec<(WidgetId, Rect)>;

    fn publish_rect(&mut self, id: &WidgetId, rect: Rect);
}

/// Reasons a gesture can end without a pointer-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowEvent {
    /// The window lost focus.
    Blur,
    /// The tab or window became hidden.
    Hidden,
    /// The pointer-up was never delivered (e.g. released outside the window).
    PointerLost,
}

/// Drives one pointer gesture at a time: drag, resize, and the dock settle animation.
///
/// Pointer moves are only recorded; the geometry is recomputed once per frame in
/// [`Self::on_frame`], always from the latest pointer position.
#[derive(Debug)]
pub struct DragController<S, C> {
    options: LayoutOptions,
    scheduler: S,
    capture: C,
    gesture: Gesture,
    pending_frame: Option<FrameToken>,
    guides: SnapGuides,
    next_session_id: u64,
}

impl<S: FrameScheduler, C: InputCapture> DragController<S, C> {
    pub fn new(options: LayoutOptions, scheduler: S, capture: C) -> Self {
        Self {
            options,
            scheduler,
            capture,
            gesture: Gesture::Idle,
            pending_frame: None,
            guides: SnapGuides::default(),
            next_session_id: 0,
        }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn phase(&self) -> GesturePhase {
        self.gesture.phase()
    }

    pub fn active_widget(&self) -> Option<&WidgetId> {
        self.gesture.widget()
    }

    /// Snap guides found by the latest drag frame, for drawing alignment lines.
    pub fn guides(&self) -> SnapGuides {
        self.guides
    }

    pub fn pending_frame(&self) -> Option<FrameToken> {
        self.pending_frame
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn begin_drag(
        &mut self,
        target: &mut impl WidgetGeometry,
        id: &WidgetId,
        pointer: Pos2,
    ) -> bool {
        if target.widget_rect(id).is_none() {
            log::debug!("begin_drag: widget {id} has no rect");
            return false;
        }
        // A settle in progress may still move this widget; land it first.
        self.finish_current(target);
        let Some(rect) = target.widget_rect(id) else {
            return false;
        };

        let session_id = self.allocate_session_id();
        log::debug!("drag START id={session_id} widget={id}");
        self.gesture = Gesture::Dragging(DragSession {
            id: session_id,
            widget: id.clone(),
            pointer_origin: pointer,
            latest_pointer: pointer,
            start_rect: rect,
            proposed: rect,
        });
        self.capture.begin_capture(CursorIcon::Grabbing);
        true
    }

    pub fn begin_resize(
        &mut self,
        target: &mut impl WidgetGeometry,
        id: &WidgetId,
        edge: ResizeEdge,
        pointer: Pos2,
    ) -> bool {
        if target.widget_rect(id).is_none() {
            log::debug!("begin_resize: widget {id} has no rect");
            return false;
        }
        // A settle in progress may still move this widget; land it first.
        self.finish_current(target);
        let Some(rect) = target.widget_rect(id) else {
            return false;
        };

        let session_id = self.allocate_session_id();
        log::debug!("resize START id={session_id} widget={id} edge={edge:?}");
        self.gesture = Gesture::Resizing(ResizeSession {
            id: session_id,
            widget: id.clone(),
            edge,
            constraints: target.size_constraints(id),
            pointer_origin: pointer,
            latest_pointer: pointer,
            start_rect: rect,
            proposed: rect,
        });
        self.capture.begin_capture(edge.cursor());
        true
    }

    /// Record a raw pointer position. The geometry update happens on the next frame.
    pub fn pointer_moved(&mut self, pointer: Pos2) {
        match &mut self.gesture {
            Gesture::Dragging(s) => s.latest_pointer = pointer,
            Gesture::Resizing(s) => s.latest_pointer = pointer,
            Gesture::Idle | Gesture::Settling(_) => return,
        }
        self.reschedule();
    }

    /// Frame callback. Tokens other than the one currently awaited are ignored.
    pub fn on_frame(&mut self, token: FrameToken, now: f64, target: &mut impl WidgetGeometry) {
        if self.pending_frame != Some(token) {
            log::trace!("ignoring stale frame {token:?}");
            return;
        }
        self.pending_frame = None;

        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => {}
            Gesture::Dragging(mut session) => {
                self.drag_frame(&mut session, target);
                self.gesture = Gesture::Dragging(session);
            }
            Gesture::Resizing(mut session) => {
                Self::resize_frame(&mut session, target);
                self.gesture = Gesture::Resizing(session);
            }
            Gesture::Settling(mut anim) => {
                let (rect, done) = anim.sample(now);
                target.publish_rect(&anim.widget, rect);
                if done {
                    log::debug!("settle END id={} widget={}", anim.id, anim.widget);
                } else {
                    self.gesture = Gesture::Settling(anim);
                    self.reschedule();
                }
            }
        }
    }

    /// Pointer released.
    pub fn end_gesture(&mut self, target: &mut impl WidgetGeometry) {
        self.flush_pending(target);

        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => {}
            Gesture::Dragging(session) => {
                self.capture.end_capture();
                self.guides = SnapGuides::default();
                let bounds = container_rect(target.container_size());
                let rect = clamp_into(session.proposed, bounds);
                target.publish_rect(&session.widget, rect);

                let dock = self.options.effective_dock_tolerance().map(|tolerance| {
                    let occupants: Vec<Rect> = target
                        .occupants(&session.widget)
                        .into_iter()
                        .map(|(_, r)| r)
                        .collect();
                    find_dock_position(rect, &occupants, bounds, self.options.dock_gap, tolerance)
                });

                match dock {
                    Some(to) if to != rect.min => {
                        log::debug!(
                            "drag END id={} widget={} settling to {to:?}",
                            session.id,
                            session.widget
                        );
                        self.gesture = Gesture::Settling(SettleAnimation {
                            id: session.id,
                            widget: session.widget,
                            from: rect.min,
                            to,
                            size: rect.size(),
                            duration: self.options.settle_duration,
                            started_at: None,
                        });
                        self.reschedule();
                    }
                    _ => {
                        log::debug!("drag END id={} widget={}", session.id, session.widget);
                    }
                }
            }
            Gesture::Resizing(session) => {
                self.capture.end_capture();
                log::debug!("resize END id={} widget={}", session.id, session.widget);
            }
            Gesture::Settling(anim) => {
                // A second pointer-up during the animation: jump to the end.
                target.publish_rect(&anim.widget, anim.final_rect());
            }
        }
    }

    pub fn handle_window_event(&mut self, event: WindowEvent, target: &mut impl WidgetGeometry) {
        if self.phase() != GesturePhase::Idle {
            log::debug!("aborting gesture on {event:?}");
            self.abort(target);
        }
    }

    /// Force the controller back to idle, releasing every global side effect.
    ///
    /// The current rect is clamped into the container and published, and a settle animation
    /// jumps to its end.
    pub fn abort(&mut self, target: &mut impl WidgetGeometry) {
        if let Some(token) = self.pending_frame.take() {
            self.scheduler.cancel_frame(token);
        }
        let bounds = container_rect(target.container_size());
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => {}
            Gesture::Dragging(session) => {
                target.publish_rect(&session.widget, clamp_into(session.proposed, bounds));
                self.capture.end_capture();
            }
            Gesture::Resizing(session) => {
                target.publish_rect(&session.widget, clamp_into(session.proposed, bounds));
                self.capture.end_capture();
            }
            Gesture::Settling(anim) => {
                target.publish_rect(&anim.widget, anim.final_rect());
            }
        }
        self.guides = SnapGuides::default();
    }

    fn drag_frame(&mut self, session: &mut DragSession, target: &mut impl WidgetGeometry) {
        let bounds = container_rect(target.container_size());
        let mut rect = clamp_into(session.start_rect.translate(session.delta()), bounds);

        let occupants = target.occupants(&session.widget);
        let rects: Vec<Rect> = occupants.iter().map(|(_, r)| *r).collect();

        self.guides = match self.options.effective_snap_tolerance() {
            Some(tolerance) => find_guides(rect, &rects, tolerance),
            None => SnapGuides::default(),
        };
        if !self.guides.is_empty() {
            rect = clamp_into(self.guides.apply(rect), bounds);
        }

        if self.options.push_on_collision {
            for (id, other) in &occupants {
                if overlaps(rect, *other) {
                    let pushed = push_out(rect, *other, bounds);
                    log::trace!("push {id}: {other:?} -> {pushed:?}");
                    target.publish_rect(id, pushed);
                }
            }
        }

        log::trace!("drag frame id={} rect={rect:?}", session.id);
        session.proposed = rect;
        target.publish_rect(&session.widget, rect);
    }

    fn resize_frame(session: &mut ResizeSession, target: &mut impl WidgetGeometry) {
        let bounds = container_rect(target.container_size());
        let rect = resized_rect(
            session.start_rect,
            session.edge,
            session.delta(),
            &session.constraints,
            bounds,
        );
        session.proposed = rect;
        target.publish_rect(&session.widget, rect);
    }

    /// Cancel the outstanding request, then schedule a fresh one.
    fn reschedule(&mut self) {
        if let Some(token) = self.pending_frame.take() {
            self.scheduler.cancel_frame(token);
        }
        self.pending_frame = Some(self.scheduler.request_frame());
    }

    /// Apply the latest pointer position right away instead of waiting for the frame.
    fn flush_pending(&mut self, target: &mut impl WidgetGeometry) {
        if !matches!(self.gesture, Gesture::Dragging(_) | Gesture::Resizing(_)) {
            return;
        }
        if let Some(token) = self.pending_frame {
            self.scheduler.cancel_frame(token);
            // `now` is irrelevant for drag and resize frames.
            self.on_frame(token, 0.0, target);
        }
    }

    fn finish_current(&mut self, target: &mut impl WidgetGeometry) {
        if self.phase() != GesturePhase::Idle {
            log::debug!(
                "finishing gesture {:?} before starting a new one",
                self.gesture.session_id()
            );
            self.abort(target);
        }
    }

    fn allocate_session_id(&mut self) -> u64 {
        self.next_session_id = self.next_session_id.saturating_add(1);
        self.next_session_id
    }
}
