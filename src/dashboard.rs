use egui::{Pos2, Vec2};

use crate::layout::{
    AutoSaveStatus, AutoSaver, DragController, FrameScheduler, GesturePhase, InputCapture,
    LayoutError, LayoutOptions, LayoutPersistence, LayoutStore, PersistenceError, ResizeEdge,
    SnapGuides, WidgetDescriptor, WidgetFactory, WidgetId, WindowEvent, debug_check,
};
use crate::sync::{Inbound, PopoutError, PopoutSpawner, WindowSync, pop_out_widget};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MountOutcome {
    /// A saved layout was restored with this many widgets.
    Restored { widgets: usize },
    /// Nothing saved (or nothing readable): starting empty.
    Fresh,
}

/// One window's dashboard: the widget canvas, its gesture controller, and debounced
/// persistence, wired together.
///
/// Collaborators are injected; nothing is global. Call [`Self::mount`] once, [`Self::tick`]
/// every frame, and [`Self::unmount`] when the window goes away.
pub struct Dashboard<Content, S, C> {
    store: LayoutStore<Content>,
    controller: DragController<S, C>,
    autosaver: AutoSaver,
    persistence: Box<dyn LayoutPersistence>,
    /// Local-only copy written when the primary backend fails.
    fallback: Option<Box<dyn LayoutPersistence>>,
    factory: Box<dyn WidgetFactory<Content>>,
    mounted: bool,
}

impl<Content, S, C> std::fmt::Debug for Dashboard<Content, S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("widgets", &self.store.len())
            .field("revision", &self.store.revision())
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

impl<Content, S: FrameScheduler, C: InputCapture> Dashboard<Content, S, C> {
    pub fn new(
        options: LayoutOptions,
        scheduler: S,
        capture: C,
        persistence: impl LayoutPersistence + 'static,
        factory: impl WidgetFactory<Content> + 'static,
    ) -> Self {
        let store = LayoutStore::with_options(&options);
        let autosaver = AutoSaver::new(options.autosave_delay, store.revision());
        Self {
            store,
            controller: DragController::new(options, scheduler, capture),
            autosaver,
            persistence: Box::new(persistence),
            fallback: None,
            factory: Box::new(factory),
            mounted: false,
        }
    }

    pub fn with_fallback(mut self, fallback: impl LayoutPersistence + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn store(&self) -> &LayoutStore<Content> {
        &self.store
    }

    /// Direct store access for operations without a dedicated method here.
    pub fn store_mut(&mut self) -> &mut LayoutStore<Content> {
        &mut self.store
    }

    pub fn controller(&self) -> &DragController<S, C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut DragController<S, C> {
        &mut self.controller
    }

    pub fn autosaver(&self) -> &AutoSaver {
        &self.autosaver
    }

    /// Load the saved layout (falling back to the local copy if the backend fails) and
    /// rebuild widget content through the factory.
    pub fn mount(&mut self) -> MountOutcome {
        let loaded = match self.persistence.load_layout() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log::warn!("mount: loading layout failed: {err}");
                self.fallback.as_mut().and_then(|fallback| {
                    fallback
                        .load_layout()
                        .inspect_err(|err| log::warn!("mount: fallback load failed: {err}"))
                        .ok()
                        .flatten()
                })
            }
        };

        let outcome = match loaded {
            Some(snapshot) => match self.store.restore(snapshot, self.factory.as_mut()) {
                Ok(()) => MountOutcome::Restored {
                    widgets: self.store.len(),
                },
                Err(err) => {
                    log::warn!("mount: ignoring saved layout: {err}");
                    MountOutcome::Fresh
                }
            },
            None => MountOutcome::Fresh,
        };

        self.autosaver.reset(self.store.revision());
        self.mounted = true;
        log::debug!("mount: {outcome:?}");
        outcome
    }

    /// Per-frame work: deliver the awaited gesture frame and run the auto-save.
    pub fn tick(&mut self, now: f64) -> AutoSaveStatus {
        if let Some(token) = self.controller.pending_frame() {
            self.controller.on_frame(token, now, &mut self.store);
        }

        let Self {
            store,
            autosaver,
            persistence,
            fallback,
            ..
        } = self;
        autosaver.poll(now, store, |store| {
            save_snapshot(store, persistence.as_mut(), fallback.as_mut())
        })
    }

    /// Abort any gesture and write pending layout changes.
    pub fn unmount(&mut self, now: f64) -> AutoSaveStatus {
        self.controller.abort(&mut self.store);
        let Self {
            store,
            autosaver,
            persistence,
            fallback,
            ..
        } = self;
        let status = autosaver.flush(now, store, |store| {
            save_snapshot(store, persistence.as_mut(), fallback.as_mut())
        });
        self.mounted = false;
        status
    }

    /// Explicit user reset: the only path that erases the saved layout.
    pub fn clear_layout(&mut self) -> Result<(), PersistenceError> {
        self.controller.abort(&mut self.store);
        self.store.clear();
        self.autosaver.reset(self.store.revision());
        if let Some(fallback) = &mut self.fallback {
            fallback.clear_layout()?;
        }
        self.persistence.clear_layout()
    }

    pub fn set_container_size(&mut self, size: Vec2) {
        self.store.set_container_size(size);
    }

    pub fn add_widget(
        &mut self,
        descriptor: WidgetDescriptor<Content>,
        position: Option<Pos2>,
    ) -> Result<WidgetId, LayoutError> {
        self.store.add_widget(descriptor, position)
    }

    pub fn remove_widget(&mut self, id: &WidgetId) -> bool {
        if self.controller.active_widget() == Some(id) {
            self.controller.abort(&mut self.store);
        }
        self.store.remove_widget(id).is_some()
    }

    pub fn begin_drag(&mut self, id: &WidgetId, pointer: Pos2) -> bool {
        let started = self.controller.begin_drag(&mut self.store, id, pointer);
        if started {
            self.store.bring_to_front(id);
        }
        started
    }

    pub fn begin_resize(&mut self, id: &WidgetId, edge: ResizeEdge, pointer: Pos2) -> bool {
        let started = self.controller.begin_resize(&mut self.store, id, edge, pointer);
        if started {
            self.store.bring_to_front(id);
        }
        started
    }

    pub fn pointer_moved(&mut self, pointer: Pos2) {
        self.controller.pointer_moved(pointer);
    }

    pub fn end_gesture(&mut self) {
        self.controller.end_gesture(&mut self.store);
        if cfg!(debug_assertions) {
            debug_check(&self.store, "end_gesture");
        }
    }

    pub fn handle_window_event(&mut self, event: WindowEvent) {
        self.controller.handle_window_event(event, &mut self.store);
    }

    pub fn phase(&self) -> GesturePhase {
        self.controller.phase()
    }

    pub fn guides(&self) -> SnapGuides {
        self.controller.guides()
    }

    /// Open `id` in its own window. Main windows only.
    pub fn pop_out(
        &mut self,
        id: &WidgetId,
        sync: &mut WindowSync,
        spawner: &mut dyn PopoutSpawner,
    ) -> Result<(), PopoutError> {
        let Some(registry) = sync.registry_mut() else {
            log::warn!("pop_out: {id} requested from a popout window");
            return Err(PopoutError::SpawnFailed {
                widget_id: id.clone(),
                reason: "not the main window".to_owned(),
            });
        };
        if self.controller.active_widget() == Some(id) {
            self.controller.abort(&mut self.store);
        }
        pop_out_widget(&mut self.store, registry, spawner, id)
    }

    /// Layout side effects of an inbound sync message: a closing popout returns its widget.
    pub fn apply_inbound(&mut self, inbound: &Inbound) {
        if let Inbound::PopoutClosing(id) = inbound {
            self.store.set_popped_out(id, false);
        }
    }

    /// Return widgets whose popout windows were closed without notice.
    pub fn reconcile_popouts(&mut self, sync: &mut WindowSync) -> Vec<WidgetId> {
        let Some(registry) = sync.registry_mut() else {
            return Vec::new();
        };
        crate::sync::reconcile_closed_popouts(&mut self.store, registry)
    }
}

fn save_snapshot<Content>(
    store: &LayoutStore<Content>,
    persistence: &mut dyn LayoutPersistence,
    fallback: Option<&mut Box<dyn LayoutPersistence>>,
) -> Result<(), PersistenceError> {
    let snapshot = store.snapshot();
    let Err(err) = persistence.save_layout(&snapshot) else {
        return Ok(());
    };
    if let Some(fallback) = fallback {
        match fallback.save_layout(&snapshot) {
            Ok(()) => log::debug!("autosave: kept a local copy after: {err}"),
            Err(fallback_err) => log::warn!("autosave: local copy failed too: {fallback_err}"),
        }
    }
    Err(err)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use egui::{pos2, vec2};

    use super::*;
    use crate::layout::{
        CaptureState, KnownKindsFactory, LayoutSnapshot, ManualFrameScheduler,
        MemoryLayoutPersistence,
    };

    #[derive(Default)]
    struct Offline {
        attempts: usize,
    }

    impl LayoutPersistence for Offline {
        fn save_layout(&mut self, _: &LayoutSnapshot) -> Result<(), PersistenceError> {
            self.attempts += 1;
            Err(PersistenceError::Backend("offline".to_owned()))
        }

        fn load_layout(&mut self) -> Result<Option<LayoutSnapshot>, PersistenceError> {
            Err(PersistenceError::Backend("offline".to_owned()))
        }

        fn clear_layout(&mut self) -> Result<(), PersistenceError> {
            Ok(())
        }
    }

    type TestDashboard = Dashboard<String, ManualFrameScheduler, CaptureState>;

    fn factory() -> KnownKindsFactory<fn(&str, &WidgetId) -> String> {
        fn create(kind: &str, id: &WidgetId) -> String {
            format!("{kind}:{id}")
        }
        KnownKindsFactory::new(["chart", "files"], create as fn(&str, &WidgetId) -> String)
    }

    fn dashboard(persistence: impl LayoutPersistence + 'static) -> TestDashboard {
        Dashboard::new(
            LayoutOptions {
                default_container_size: vec2(800.0, 600.0),
                ..Default::default()
            },
            ManualFrameScheduler::default(),
            CaptureState::default(),
            persistence,
            factory(),
        )
    }

    fn chart(id: &str) -> WidgetDescriptor<String> {
        WidgetDescriptor::new("chart", id, String::new())
            .with_id(id)
            .with_default_size(vec2(200.0, 150.0))
    }

    #[test]
    fn edits_are_saved_after_the_quiet_period_and_restored_on_mount() {
        let memory = Rc::new(RefCell::new(MemoryLayoutPersistence::default()));
        let mut first = dashboard(Rc::clone(&memory));
        assert_eq!(first.mount(), MountOutcome::Fresh);

        first.add_widget(chart("a"), Some(pos2(0.0, 0.0))).unwrap();
        first.add_widget(chart("b"), Some(pos2(300.0, 0.0))).unwrap();
        assert_eq!(first.tick(0.0), AutoSaveStatus::Waiting);
        assert_eq!(first.tick(1.0), AutoSaveStatus::Waiting);
        assert_eq!(first.tick(2.0), AutoSaveStatus::Saved);
        assert_eq!(memory.borrow().save_count(), 1);

        let mut second = dashboard(Rc::clone(&memory));
        assert_eq!(second.mount(), MountOutcome::Restored { widgets: 2 });
        let a = second.store().widget(&"a".into()).unwrap();
        assert_eq!(a.content, "chart:a");
        assert_eq!(
            second.store().rect(&"b".into()),
            first.store().rect(&"b".into())
        );
        // Restoring is not an edit.
        assert_eq!(second.tick(10.0), AutoSaveStatus::Idle);
    }

    #[test]
    fn failed_saves_go_to_the_fallback_and_are_retried() {
        let offline = Rc::new(RefCell::new(Offline::default()));
        let local = Rc::new(RefCell::new(MemoryLayoutPersistence::default()));
        let mut dash = dashboard(Rc::clone(&offline)).with_fallback(Rc::clone(&local));
        assert_eq!(dash.mount(), MountOutcome::Fresh);

        dash.add_widget(chart("a"), Some(pos2(0.0, 0.0))).unwrap();
        dash.tick(0.0);
        assert_eq!(dash.tick(2.0), AutoSaveStatus::Failed);
        assert_eq!(local.borrow().save_count(), 1);
        assert_eq!(dash.tick(3.0), AutoSaveStatus::Waiting);
        assert_eq!(dash.tick(4.0), AutoSaveStatus::Failed);
        assert_eq!(offline.borrow().attempts, 2);

        // A later mount with the backend still down uses the local copy.
        let mut next = dashboard(Rc::clone(&offline)).with_fallback(Rc::clone(&local));
        assert_eq!(next.mount(), MountOutcome::Restored { widgets: 1 });
    }

    #[test]
    fn gestures_run_through_tick() {
        let mut dash = dashboard(MemoryLayoutPersistence::default());
        dash.mount();
        dash.add_widget(chart("a"), Some(pos2(0.0, 0.0))).unwrap();
        dash.add_widget(chart("b"), Some(pos2(300.0, 300.0))).unwrap();

        assert!(dash.begin_drag(&"a".into(), pos2(10.0, 10.0)));
        assert_eq!(dash.store().layout().z_order.last(), Some(&WidgetId::new("a")));
        dash.pointer_moved(pos2(110.0, 60.0));
        dash.tick(0.0);
        assert_eq!(dash.store().rect(&"a".into()).unwrap().min, pos2(100.0, 50.0));

        dash.end_gesture();
        assert_eq!(dash.phase(), GesturePhase::Idle);
        assert!(!dash.controller().capture().is_capturing());
    }

    #[test]
    fn unmount_aborts_the_gesture_and_flushes() {
        let memory = Rc::new(RefCell::new(MemoryLayoutPersistence::default()));
        let mut dash = dashboard(Rc::clone(&memory));
        dash.mount();
        dash.add_widget(chart("a"), Some(pos2(0.0, 0.0))).unwrap();
        dash.begin_drag(&"a".into(), pos2(0.0, 0.0));
        dash.pointer_moved(pos2(50.0, 0.0));

        assert_eq!(dash.unmount(0.1), AutoSaveStatus::Saved);
        assert!(!dash.is_mounted());
        assert_eq!(dash.phase(), GesturePhase::Idle);
        assert!(!dash.controller().capture().is_capturing());
        assert_eq!(memory.borrow().save_count(), 1);
    }

    #[test]
    fn clear_layout_erases_saved_state_without_autosaving_empty() {
        let memory = Rc::new(RefCell::new(MemoryLayoutPersistence::default()));
        let mut dash = dashboard(Rc::clone(&memory));
        dash.mount();
        dash.add_widget(chart("a"), Some(pos2(0.0, 0.0))).unwrap();
        dash.tick(0.0);
        dash.tick(2.0);
        assert!(memory.borrow().snapshot().is_some());

        dash.clear_layout().unwrap();
        assert!(memory.borrow().snapshot().is_none());
        assert_eq!(dash.tick(10.0), AutoSaveStatus::Idle);
        assert!(dash.store().is_empty());
    }
}
