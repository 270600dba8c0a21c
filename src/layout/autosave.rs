use super::persistence::PersistenceError;
use super::store::LayoutStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoSaveStatus {
    /// Nothing changed since the last save.
    Idle,
    /// A change is waiting for the quiet period to elapse.
    Waiting,
    Saved,
    /// The save failed; another attempt is scheduled.
    Failed,
    /// The layout became empty; the write was skipped.
    SkippedEmpty,
}

/// Debounces layout persistence: the timer restarts on every new store revision, and the
/// save only runs once the layout has been quiet for `delay` seconds.
///
/// An empty layout is never written, so an accidental clear can't wipe the saved one.
#[derive(Clone, Debug)]
pub struct AutoSaver {
    delay: f64,
    observed_revision: u64,
    deadline: Option<f64>,
}

impl AutoSaver {
    /// `revision` is the store revision that is already persisted (or freshly loaded).
    pub fn new(delay: f64, revision: u64) -> Self {
        Self {
            delay,
            observed_revision: revision,
            deadline: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// Forget pending work and treat `revision` as saved.
    pub fn reset(&mut self, revision: u64) {
        self.observed_revision = revision;
        self.deadline = None;
    }

    pub fn poll<Content>(
        &mut self,
        now: f64,
        store: &LayoutStore<Content>,
        save: impl FnOnce(&LayoutStore<Content>) -> Result<(), PersistenceError>,
    ) -> AutoSaveStatus {
        if store.revision() != self.observed_revision {
            self.observed_revision = store.revision();
            if store.is_empty() {
                log::debug!("autosave: layout is empty, skipping");
                self.deadline = None;
                return AutoSaveStatus::SkippedEmpty;
            }
            self.deadline = Some(now + self.delay);
        }

        match self.deadline {
            None => AutoSaveStatus::Idle,
            Some(deadline) if now < deadline => AutoSaveStatus::Waiting,
            Some(_) => self.run(now, store, save),
        }
    }

    /// Save right away if anything is pending (e.g. on unmount).
    pub fn flush<Content>(
        &mut self,
        now: f64,
        store: &LayoutStore<Content>,
        save: impl FnOnce(&LayoutStore<Content>) -> Result<(), PersistenceError>,
    ) -> AutoSaveStatus {
        let changed = store.revision() != self.observed_revision;
        if !changed && self.deadline.is_none() {
            return AutoSaveStatus::Idle;
        }
        self.observed_revision = store.revision();
        if store.is_empty() {
            self.deadline = None;
            return AutoSaveStatus::SkippedEmpty;
        }
        self.run(now, store, save)
    }

    fn run<Content>(
        &mut self,
        now: f64,
        store: &LayoutStore<Content>,
        save: impl FnOnce(&LayoutStore<Content>) -> Result<(), PersistenceError>,
    ) -> AutoSaveStatus {
        match save(store) {
            Ok(()) => {
                self.deadline = None;
                log::debug!("autosave: saved revision {}", self.observed_revision);
                AutoSaveStatus::Saved
            }
            Err(err) => {
                log::warn!("autosave failed, retrying in {:.1}s: {err}", self.delay);
                self.deadline = Some(now + self.delay);
                AutoSaveStatus::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use egui::{pos2, vec2};

    use super::*;
    use crate::layout::types::WidgetDescriptor;

    fn store_with_widget() -> LayoutStore<()> {
        let mut store = LayoutStore::new(vec2(800.0, 600.0));
        store
            .add_widget(WidgetDescriptor::new("chart", "Chart", ()), Some(pos2(0.0, 0.0)))
            .unwrap();
        store
    }

    #[test]
    fn debounce_restarts_on_each_change() {
        let mut store = store_with_widget();
        let mut saver = AutoSaver::new(2.0, 0);
        let mut saves = 0;

        assert_eq!(saver.poll(0.0, &store, |_| Ok(())), AutoSaveStatus::Waiting);
        store.set_rect(
            &"chart-1".into(),
            egui::Rect::from_min_size(pos2(5.0, 5.0), vec2(100.0, 100.0)),
        );
        assert_eq!(saver.poll(1.5, &store, |_| Ok(())), AutoSaveStatus::Waiting);
        // 2s after the first change, but only 1s after the second one.
        assert_eq!(saver.poll(2.5, &store, |_| Ok(())), AutoSaveStatus::Waiting);
        let status = saver.poll(3.5, &store, |_| {
            saves += 1;
            Ok(())
        });
        assert_eq!(status, AutoSaveStatus::Saved);
        assert_eq!(saves, 1);
        assert_eq!(saver.poll(10.0, &store, |_| Ok(())), AutoSaveStatus::Idle);
    }

    #[test]
    fn empty_layout_is_never_written() {
        let mut store = store_with_widget();
        let mut saver = AutoSaver::new(2.0, store.revision());
        store.clear();
        assert_eq!(
            saver.poll(0.0, &store, |_| panic!("must not save an empty layout")),
            AutoSaveStatus::SkippedEmpty
        );
        assert_eq!(
            saver.poll(5.0, &store, |_| panic!("must not save an empty layout")),
            AutoSaveStatus::Idle
        );
    }

    #[test]
    fn failure_schedules_a_retry() {
        let store = store_with_widget();
        let mut saver = AutoSaver::new(2.0, 0);
        saver.poll(0.0, &store, |_| Ok(()));
        let status = saver.poll(2.0, &store, |_| {
            Err(PersistenceError::Backend("offline".to_owned()))
        });
        assert_eq!(status, AutoSaveStatus::Failed);
        assert_eq!(saver.deadline(), Some(4.0));
        assert_eq!(saver.poll(4.0, &store, |_| Ok(())), AutoSaveStatus::Saved);
    }
}
