use egui::Vec2;
use serde::{Deserialize, Serialize};

use super::types::{Layout, SizeConstraints, WidgetId};

pub const LAYOUT_SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("unsupported layout snapshot version: {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("ron serialize error: {0}")]
    RonSerialize(#[from] ron::Error),

    #[error("ron deserialize error: {0}")]
    RonDeserialize(#[from] ron::error::SpannedError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A remote or host-provided backend refused the operation.
    #[error("layout backend error: {0}")]
    Backend(String),
}

/// Everything about a widget that survives a reload, except its content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WidgetRecord {
    pub id: WidgetId,
    pub title: String,
    pub kind: String,
    pub default_size: Vec2,
    pub constraints: SizeConstraints,
    pub popped_out: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub version: u32,
    pub layout: Layout,
    pub widgets: Vec<WidgetRecord>,
}

impl LayoutSnapshot {
    pub fn new(layout: Layout, widgets: Vec<WidgetRecord>) -> Self {
        Self {
            version: LAYOUT_SNAPSHOT_VERSION,
            layout,
            widgets,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty() && self.layout.is_empty()
    }

    pub fn check_version(&self) -> Result<(), PersistenceError> {
        if self.version == LAYOUT_SNAPSHOT_VERSION {
            Ok(())
        } else {
            Err(PersistenceError::UnsupportedVersion {
                found: self.version,
                expected: LAYOUT_SNAPSHOT_VERSION,
            })
        }
    }

    pub fn to_ron_string(&self) -> Result<String, PersistenceError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    pub fn from_ron_str(ron: &str) -> Result<Self, PersistenceError> {
        let snapshot: Self = ron::from_str(ron)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }
}

/// Where layouts are stored: local disk, a server, browser storage…
///
/// Failures are never fatal for the engine; the dashboard logs them and retries on the
/// next auto-save cycle.
pub trait LayoutPersistence {
    fn save_layout(&mut self, snapshot: &LayoutSnapshot) -> Result<(), PersistenceError>;

    fn load_layout(&mut self) -> Result<Option<LayoutSnapshot>, PersistenceError>;

    fn clear_layout(&mut self) -> Result<(), PersistenceError>;
}

/// Shared backend, e.g. one the host also inspects.
impl<P: LayoutPersistence> LayoutPersistence for std::rc::Rc<std::cell::RefCell<P>> {
    fn save_layout(&mut self, snapshot: &LayoutSnapshot) -> Result<(), PersistenceError> {
        self.borrow_mut().save_layout(snapshot)
    }

    fn load_layout(&mut self) -> Result<Option<LayoutSnapshot>, PersistenceError> {
        self.borrow_mut().load_layout()
    }

    fn clear_layout(&mut self) -> Result<(), PersistenceError> {
        self.borrow_mut().clear_layout()
    }
}

/// Keeps the last snapshot in memory. Used as the local-only fallback and in tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryLayoutPersistence {
    snapshot: Option<LayoutSnapshot>,
    save_count: usize,
}

impl MemoryLayoutPersistence {
    pub fn with_snapshot(snapshot: LayoutSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            save_count: 0,
        }
    }

    pub fn snapshot(&self) -> Option<&LayoutSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl LayoutPersistence for MemoryLayoutPersistence {
    fn save_layout(&mut self, snapshot: &LayoutSnapshot) -> Result<(), PersistenceError> {
        self.snapshot = Some(snapshot.clone());
        self.save_count += 1;
        Ok(())
    }

    fn load_layout(&mut self) -> Result<Option<LayoutSnapshot>, PersistenceError> {
        Ok(self.snapshot.clone())
    }

    fn clear_layout(&mut self) -> Result<(), PersistenceError> {
        self.snapshot = None;
        Ok(())
    }
}

/// Stores the layout as a RON file.
#[cfg(feature = "persistence")]
#[derive(Clone, Debug)]
pub struct RonFilePersistence {
    path: std::path::PathBuf,
}

#[cfg(feature = "persistence")]
impl RonFilePersistence {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(feature = "persistence")]
impl LayoutPersistence for RonFilePersistence {
    fn save_layout(&mut self, snapshot: &LayoutSnapshot) -> Result<(), PersistenceError> {
        let ron = snapshot.to_ron_string()?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash never leaves a truncated layout behind.
        let tmp = self.path.with_extension("ron.tmp");
        std::fs::write(&tmp, ron)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn load_layout(&mut self) -> Result<Option<LayoutSnapshot>, PersistenceError> {
        match std::fs::read_to_string(&self.path) {
            Ok(ron) => LayoutSnapshot::from_ron_str(&ron).map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn clear_layout(&mut self) -> Result<(), PersistenceError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
