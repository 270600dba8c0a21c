//! Drives a dashboard and one popped-out widget window without a GUI.
//!
//! Run with `RUST_LOG=debug cargo run --example headless_dashboard`.

use std::rc::Rc;

use egui::{pos2, vec2};
use serde_json::json;

use egui_dashboard::Dashboard;
use egui_dashboard::layout::{
    CaptureState, LayoutOptions, ManualFrameScheduler, MemoryLayoutPersistence,
    SimpleWidgetFactory, WidgetDescriptor, WidgetId,
};
use egui_dashboard::sync::{
    ActionDescriptor, BroadcastHub, Inbound, JsonStateStore, LocalWindow, OpenerLink, PeerWindow,
    PopoutError, PopoutRequest, PopoutSpawner, SharedStorage, StateStore as _, SyncOptions,
    WindowSync,
};

const ORIGIN: &str = "app://dashboard";

struct Spawner {
    main: LocalWindow,
    opened: Vec<(WidgetId, LocalWindow)>,
}

impl PopoutSpawner for Spawner {
    fn spawn(&mut self, request: &PopoutRequest) -> Result<Rc<dyn PeerWindow>, PopoutError> {
        let window = LocalWindow::new(ORIGIN);
        let handle = window.handle_from(&self.main);
        self.opened.push((request.widget_id.clone(), window));
        Ok(handle)
    }
}

fn main() {
    env_logger::init();

    let mut dashboard = Dashboard::new(
        LayoutOptions::default(),
        ManualFrameScheduler::default(),
        CaptureState::default(),
        MemoryLayoutPersistence::default(),
        SimpleWidgetFactory::new(|kind: &str, id: &WidgetId| format!("{kind} ({id})")),
    );
    log::info!("mounted: {:?}", dashboard.mount());
    dashboard.set_container_size(vec2(1200.0, 800.0));

    for (kind, title) in [("timeSeries", "EEG"), ("fileBrowser", "Files")] {
        let descriptor =
            WidgetDescriptor::new(kind, title, String::new()).with_default_size(vec2(400.0, 300.0));
        if let Err(err) = dashboard.add_widget(descriptor, Some(pos2(0.0, 0.0))) {
            log::error!("add_widget failed: {err}");
        }
    }

    // Drag the second widget next to the first one; docking glides it into place.
    let files = WidgetId::new("fileBrowser-2");
    let mut now = 0.0;
    if dashboard.begin_drag(&files, pos2(500.0, 100.0)) {
        for x in [520.0, 480.0, 460.0] {
            dashboard.pointer_moved(pos2(x, 100.0));
            now += 1.0 / 60.0;
            dashboard.tick(now);
        }
        dashboard.end_gesture();
        while dashboard.controller().pending_frame().is_some() {
            now += 1.0 / 60.0;
            dashboard.tick(now);
        }
    }
    for widget in dashboard.store().widgets() {
        log::info!("{} at {:?}", widget.id, dashboard.store().rect(&widget.id));
    }

    // Pop the EEG widget out and sync state both ways.
    let main_window = LocalWindow::new(ORIGIN);
    let mut main_sync = WindowSync::main(SyncOptions::default(), ORIGIN);
    let mut main_state = JsonStateStore::from_slices([
        ("plots".to_owned(), json!({ "chunkStart": 0 })),
        ("loading".to_owned(), json!({ "isServerReady": true, "operations": {} })),
    ]);
    let mut spawner = Spawner {
        main: main_window.clone(),
        opened: Vec::new(),
    };
    let eeg = WidgetId::new("timeSeries-1");
    if let Err(err) = dashboard.pop_out(&eeg, &mut main_sync, &mut spawner) {
        log::error!("pop out failed: {err}");
        return;
    }
    let Some((_, popout_window)) = spawner.opened.pop() else {
        return;
    };

    let mut popout_sync = WindowSync::popout(
        SyncOptions::default(),
        eeg.clone(),
        OpenerLink::new(Some(main_window.handle_from(&popout_window))),
    );
    let mut popout_state = JsonStateStore::default();
    popout_sync.start(now);

    for envelope in main_window.take_messages() {
        let inbound = main_sync.handle(&envelope, &mut main_state, now);
        log::info!("main: {inbound:?}");
    }
    for envelope in popout_window.take_messages() {
        let inbound = popout_sync.handle(&envelope, &mut popout_state, now);
        log::info!("popout: {inbound:?}");
    }
    log::info!("popout state after handshake: {:?}", popout_state.slices());

    now += 1.0;
    let action = ActionDescriptor::new("plots/setChunkStart", json!({ "chunkStart": 2048 }));
    popout_state.dispatch(action.clone());
    let outcome = popout_sync.action_dispatched(&action, &popout_state, now);
    log::info!("popout sent: {outcome:?}");
    for envelope in main_window.take_messages() {
        let inbound = main_sync.handle(&envelope, &mut main_state, now);
        dashboard.apply_inbound(&inbound);
    }
    log::info!("main plots: {:?}", main_state.slice("plots"));

    // View settings of the widget follow it between windows without going through the store.
    let hub = BroadcastHub::default();
    let storage = SharedStorage::default();
    let mut main_view = main_sync.widget_channel(eeg.clone(), Some(&hub), storage.view());
    let mut popout_view = popout_sync.widget_channel(eeg.clone(), Some(&hub), storage.view());
    popout_view.publish(&json!({ "zoom": 4, "channels": ["Fp1", "Fp2"] }));
    log::info!("main view update: {:?}", main_view.poll());

    // The popout closes: its widget comes back to the canvas.
    if let Some(opener) = popout_sync.opener()
        && let Err(err) = egui_dashboard::sync::announce_closing(opener, &eeg, now)
    {
        log::warn!("could not announce closing: {err}");
    }
    popout_window.close();
    for envelope in main_window.take_messages() {
        let inbound = main_sync.handle(&envelope, &mut main_state, now);
        if let Inbound::PopoutClosing(id) = &inbound {
            log::info!("{id} returned");
        }
        dashboard.apply_inbound(&inbound);
    }
    dashboard.reconcile_popouts(&mut main_sync);
    log::info!("restored view settings: {:?}", main_view.restore());

    log::info!("unmount: {:?}", dashboard.unmount(now));
}
