use egui::{CursorIcon, Rect, pos2, vec2};

use super::integrity;
use super::*;

type Controller = DragController<ManualFrameScheduler, CaptureState>;

fn controller() -> Controller {
    controller_with(LayoutOptions::default())
}

fn controller_with(options: LayoutOptions) -> Controller {
    DragController::new(
        options,
        ManualFrameScheduler::default(),
        CaptureState::default(),
    )
}

fn store_with(widgets: &[(&str, Rect)]) -> LayoutStore<()> {
    let mut store = LayoutStore::new(vec2(800.0, 600.0));
    for (id, rect) in widgets {
        store
            .add_widget(
                WidgetDescriptor::new("chart", *id, ())
                    .with_id(*id)
                    .with_default_size(rect.size()),
                Some(rect.min),
            )
            .unwrap();
    }
    store
}

fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
    Rect::from_min_size(pos2(x, y), vec2(w, h))
}

fn id(s: &str) -> WidgetId {
    WidgetId::new(s)
}

/// Deliver every frame the controller has asked for so far.
fn run_frames(ctrl: &mut Controller, store: &mut LayoutStore<()>, now: f64) {
    for token in ctrl.scheduler_mut().take_pending() {
        ctrl.on_frame(token, now, store);
    }
}

#[test]
fn drag_next_to_neighbour_snaps_and_pushes_it_out_of_the_way() {
    let mut store = store_with(&[
        ("a", rect(0.0, 0.0, 200.0, 150.0)),
        ("b", rect(210.0, 0.0, 200.0, 150.0)),
    ]);
    let mut ctrl = controller();

    assert!(ctrl.begin_drag(&mut store, &id("a"), pos2(100.0, 75.0)));
    ctrl.pointer_moved(pos2(305.0, 75.0));
    run_frames(&mut ctrl, &mut store, 0.0);
    ctrl.end_gesture(&mut store);
    run_frames(&mut ctrl, &mut store, 1.0);

    let a = store.rect(&id("a")).unwrap();
    let b = store.rect(&id("b")).unwrap();
    assert_eq!(a.min.y, 0.0);
    assert_eq!(a.width(), 200.0);
    assert!(!overlaps(a, b), "a={a:?} b={b:?}");
    // Left edges snap together, then b moves down along the smaller overlap.
    assert_eq!(a, rect(210.0, 0.0, 200.0, 150.0));
    assert_eq!(b, rect(210.0, 150.0, 200.0, 150.0));
    assert!(integrity::overlapping_pairs(&store).is_empty());
    assert!(integrity::layout_integrity_issues(&store).is_empty());
    assert_eq!(ctrl.phase(), GesturePhase::Idle);
}

#[test]
fn drag_is_clamped_to_the_container() {
    let mut store = store_with(&[("a", rect(100.0, 100.0, 200.0, 150.0))]);
    let mut ctrl = controller();

    ctrl.begin_drag(&mut store, &id("a"), pos2(150.0, 150.0));
    ctrl.pointer_moved(pos2(5000.0, -5000.0));
    run_frames(&mut ctrl, &mut store, 0.0);
    assert_eq!(store.rect(&id("a")).unwrap().min, pos2(600.0, 0.0));

    ctrl.end_gesture(&mut store);
    assert_eq!(store.rect(&id("a")).unwrap(), rect(600.0, 0.0, 200.0, 150.0));
}

#[test]
fn pointer_moves_coalesce_into_one_frame() {
    let mut store = store_with(&[("a", rect(0.0, 0.0, 100.0, 100.0))]);
    let mut ctrl = controller();

    ctrl.begin_drag(&mut store, &id("a"), pos2(10.0, 10.0));
    assert!(ctrl.pending_frame().is_none());

    ctrl.pointer_moved(pos2(20.0, 10.0));
    let first = ctrl.pending_frame().unwrap();
    ctrl.pointer_moved(pos2(30.0, 10.0));
    ctrl.pointer_moved(pos2(110.0, 210.0));

    // Moves only record the pointer.
    assert_eq!(store.rect(&id("a")).unwrap().min, pos2(0.0, 0.0));
    assert_eq!(ctrl.scheduler().pending().len(), 1);
    assert_eq!(ctrl.scheduler().cancelled_count(), 2);

    let revision = store.revision();
    ctrl.on_frame(first, 0.0, &mut store);
    assert_eq!(store.revision(), revision, "stale token must be ignored");

    run_frames(&mut ctrl, &mut store, 0.0);
    assert_eq!(store.rect(&id("a")).unwrap().min, pos2(100.0, 200.0));
    assert!(ctrl.pending_frame().is_none());
}

#[test]
fn release_applies_the_latest_pointer_without_waiting_for_a_frame() {
    let mut store = store_with(&[("a", rect(0.0, 0.0, 100.0, 100.0))]);
    let mut ctrl = controller();

    ctrl.begin_drag(&mut store, &id("a"), pos2(10.0, 10.0));
    ctrl.pointer_moved(pos2(310.0, 210.0));
    ctrl.end_gesture(&mut store);

    assert_eq!(store.rect(&id("a")).unwrap().min, pos2(300.0, 200.0));
    assert!(ctrl.scheduler().pending().is_empty());
    assert_eq!(ctrl.phase(), GesturePhase::Idle);
}

#[test]
fn drop_near_a_slot_settles_into_it() {
    let mut store = store_with(&[
        ("a", rect(0.0, 0.0, 200.0, 150.0)),
        ("b", rect(400.0, 200.0, 200.0, 150.0)),
    ]);
    let mut ctrl = controller();

    ctrl.begin_drag(&mut store, &id("a"), pos2(10.0, 10.0));
    ctrl.pointer_moved(pos2(195.0, 205.0));
    ctrl.end_gesture(&mut store);

    // y snapped onto b's top edge, x left 5pt short of the slot left of b.
    assert_eq!(store.rect(&id("a")).unwrap().min, pos2(185.0, 200.0));
    assert_eq!(ctrl.phase(), GesturePhase::Settling);
    assert!(!ctrl.capture().is_capturing());
    assert_eq!(ctrl.capture().release_count(), 1);

    run_frames(&mut ctrl, &mut store, 1.0);
    assert_eq!(ctrl.phase(), GesturePhase::Settling);
    run_frames(&mut ctrl, &mut store, 1.1);
    let mid = store.rect(&id("a")).unwrap().min.x;
    assert!(mid > 185.0 && mid < 190.0, "mid={mid}");
    run_frames(&mut ctrl, &mut store, 1.5);

    assert_eq!(ctrl.phase(), GesturePhase::Idle);
    assert_eq!(store.rect(&id("a")).unwrap(), rect(190.0, 200.0, 200.0, 150.0));
    assert!(ctrl.scheduler().pending().is_empty());
}

#[test]
fn docking_disabled_leaves_the_drop_position() {
    let mut store = store_with(&[
        ("a", rect(0.0, 0.0, 200.0, 150.0)),
        ("b", rect(400.0, 200.0, 200.0, 150.0)),
    ]);
    let mut ctrl = controller_with(LayoutOptions {
        docking: false,
        ..Default::default()
    });

    ctrl.begin_drag(&mut store, &id("a"), pos2(10.0, 10.0));
    ctrl.pointer_moved(pos2(195.0, 205.0));
    ctrl.end_gesture(&mut store);

    assert_eq!(ctrl.phase(), GesturePhase::Idle);
    assert_eq!(store.rect(&id("a")).unwrap().min, pos2(185.0, 200.0));
}

#[test]
fn snap_guides_are_exposed_while_dragging_and_cleared_after() {
    let mut store = store_with(&[
        ("a", rect(0.0, 300.0, 100.0, 100.0)),
        ("b", rect(400.0, 0.0, 100.0, 100.0)),
    ]);
    let mut ctrl = controller();

    ctrl.begin_drag(&mut store, &id("a"), pos2(0.0, 0.0));
    ctrl.pointer_moved(pos2(396.0, 0.0));
    run_frames(&mut ctrl, &mut store, 0.0);
    assert_eq!(ctrl.guides().x_guide, Some(400.0));
    assert_eq!(store.rect(&id("a")).unwrap().min.x, 400.0);

    ctrl.end_gesture(&mut store);
    assert!(ctrl.guides().is_empty());
}

#[test]
fn blur_aborts_and_releases_capture() {
    let mut store = store_with(&[("a", rect(0.0, 0.0, 100.0, 100.0))]);
    let mut ctrl = controller();

    ctrl.begin_drag(&mut store, &id("a"), pos2(10.0, 10.0));
    assert_eq!(ctrl.capture().cursor(), Some(CursorIcon::Grabbing));
    ctrl.pointer_moved(pos2(60.0, 10.0));
    run_frames(&mut ctrl, &mut store, 0.0);
    ctrl.pointer_moved(pos2(90.0, 10.0));
    assert!(ctrl.pending_frame().is_some());

    ctrl.handle_window_event(WindowEvent::Blur, &mut store);

    assert_eq!(ctrl.phase(), GesturePhase::Idle);
    assert!(ctrl.pending_frame().is_none());
    assert!(ctrl.scheduler().pending().is_empty());
    assert!(!ctrl.capture().is_capturing());
    assert_eq!(ctrl.capture().cursor(), None);
    assert_eq!(ctrl.capture().release_count(), 1);
    // Last applied frame wins; the unapplied move is dropped.
    assert_eq!(store.rect(&id("a")).unwrap().min, pos2(50.0, 0.0));

    // Nothing left to abort.
    ctrl.handle_window_event(WindowEvent::Hidden, &mut store);
    assert_eq!(ctrl.capture().release_count(), 1);
}

#[test]
fn abort_during_settle_jumps_to_the_slot() {
    let mut store = store_with(&[
        ("a", rect(0.0, 0.0, 200.0, 150.0)),
        ("b", rect(400.0, 200.0, 200.0, 150.0)),
    ]);
    let mut ctrl = controller();

    ctrl.begin_drag(&mut store, &id("a"), pos2(10.0, 10.0));
    ctrl.pointer_moved(pos2(195.0, 205.0));
    ctrl.end_gesture(&mut store);
    assert_eq!(ctrl.phase(), GesturePhase::Settling);

    ctrl.handle_window_event(WindowEvent::PointerLost, &mut store);
    assert_eq!(ctrl.phase(), GesturePhase::Idle);
    assert_eq!(store.rect(&id("a")).unwrap().min, pos2(190.0, 200.0));
    assert_eq!(ctrl.capture().release_count(), 1);
}

#[test]
fn new_drag_lands_a_running_settle_first() {
    let mut store = store_with(&[
        ("a", rect(0.0, 0.0, 200.0, 150.0)),
        ("b", rect(400.0, 200.0, 200.0, 150.0)),
    ]);
    let mut ctrl = controller();

    ctrl.begin_drag(&mut store, &id("a"), pos2(10.0, 10.0));
    ctrl.pointer_moved(pos2(195.0, 205.0));
    ctrl.end_gesture(&mut store);

    assert!(ctrl.begin_drag(&mut store, &id("a"), pos2(0.0, 0.0)));
    assert_eq!(ctrl.phase(), GesturePhase::Dragging);
    assert_eq!(store.rect(&id("a")).unwrap().min, pos2(190.0, 200.0));
    ctrl.end_gesture(&mut store);
}

#[test]
fn unknown_widget_does_not_start_a_gesture() {
    let mut store = store_with(&[("a", rect(0.0, 0.0, 100.0, 100.0))]);
    let mut ctrl = controller();
    assert!(!ctrl.begin_drag(&mut store, &id("missing"), pos2(0.0, 0.0)));
    assert_eq!(ctrl.phase(), GesturePhase::Idle);
    assert!(!ctrl.capture().is_capturing());
}

#[test]
fn resize_is_clamped_to_min_size() {
    let mut store: LayoutStore<()> = LayoutStore::new(vec2(800.0, 600.0));
    store
        .add_widget(
            WidgetDescriptor::new("chart", "A", ())
                .with_id("a")
                .with_default_size(vec2(400.0, 300.0))
                .with_min_size(vec2(200.0, 150.0)),
            Some(pos2(100.0, 100.0)),
        )
        .unwrap();
    let mut ctrl = controller();

    assert!(ctrl.begin_resize(&mut store, &id("a"), ResizeEdge::BottomRight, pos2(500.0, 400.0)));
    assert_eq!(ctrl.capture().cursor(), Some(CursorIcon::ResizeNwSe));
    ctrl.pointer_moved(pos2(-1000.0, -1000.0));
    run_frames(&mut ctrl, &mut store, 0.0);
    ctrl.end_gesture(&mut store);

    assert_eq!(store.rect(&id("a")).unwrap(), rect(100.0, 100.0, 200.0, 150.0));
    assert_eq!(ctrl.phase(), GesturePhase::Idle);
    assert_eq!(ctrl.capture().release_count(), 1);
}

#[test]
fn resize_grows_up_to_the_container_edge() {
    let mut store = store_with(&[("a", rect(500.0, 300.0, 200.0, 200.0))]);
    let mut ctrl = controller();

    ctrl.begin_resize(&mut store, &id("a"), ResizeEdge::Right, pos2(700.0, 400.0));
    ctrl.pointer_moved(pos2(2000.0, 900.0));
    ctrl.end_gesture(&mut store);

    assert_eq!(store.rect(&id("a")).unwrap(), rect(500.0, 300.0, 300.0, 200.0));
}

#[test]
fn popped_out_widgets_are_not_on_the_canvas() {
    let mut store = store_with(&[
        ("a", rect(0.0, 0.0, 200.0, 150.0)),
        ("b", rect(300.0, 0.0, 200.0, 150.0)),
    ]);
    store.set_popped_out(&id("b"), true);
    let mut ctrl = controller();

    assert!(!ctrl.begin_drag(&mut store, &id("b"), pos2(350.0, 50.0)));
    assert!(!ctrl.begin_resize(
        &mut store,
        &id("b"),
        ResizeEdge::BottomRight,
        pos2(500.0, 150.0)
    ));
    assert_eq!(ctrl.phase(), GesturePhase::Idle);
    assert!(!ctrl.capture().is_capturing());

    // Dragging a over b's old spot leaves b's item alone.
    assert!(ctrl.begin_drag(&mut store, &id("a"), pos2(0.0, 0.0)));
    ctrl.pointer_moved(pos2(300.0, 0.0));
    run_frames(&mut ctrl, &mut store, 0.0);
    assert_eq!(store.rect(&id("a")).unwrap().min, pos2(300.0, 0.0));
    assert_eq!(store.rect(&id("b")).unwrap(), rect(300.0, 0.0, 200.0, 150.0));
}
