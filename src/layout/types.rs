use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Stable widget identifier, unique within a dashboard and across sessions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WidgetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WidgetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for WidgetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeConstraints {
    pub min: Option<Vec2>,
    pub max: Option<Vec2>,
}

impl SizeConstraints {
    /// Truncate to `max`, then floor at `min`. The minimum wins when they conflict.
    pub fn clamp(&self, size: Vec2) -> Vec2 {
        let mut size = size;
        if let Some(max) = self.max {
            size = size.min(max);
        }
        if let Some(min) = self.min {
            size = size.max(min);
        }
        size
    }

    pub fn min_or_zero(&self) -> Vec2 {
        self.min.unwrap_or(Vec2::ZERO)
    }

    pub fn is_satisfied_by(&self, size: Vec2) -> bool {
        self.min.is_none_or(|min| size.x >= min.x && size.y >= min.y)
    }
}

/// What the owner hands the layout engine to create a widget.
///
/// `content` is opaque to the engine; `kind` is only used to rebuild content through a
/// [`super::WidgetFactory`] when a layout is restored.
#[derive(Clone, Debug)]
pub struct WidgetDescriptor<Content> {
    pub id: Option<WidgetId>,
    pub title: String,
    pub kind: String,
    pub content: Content,
    pub default_size: Option<Vec2>,
    pub constraints: SizeConstraints,
}

impl<Content> WidgetDescriptor<Content> {
    pub fn new(kind: impl Into<String>, title: impl Into<String>, content: Content) -> Self {
        Self {
            id: None,
            title: title.into(),
            kind: kind.into(),
            content,
            default_size: None,
            constraints: SizeConstraints::default(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<WidgetId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_default_size(mut self, size: Vec2) -> Self {
        self.default_size = Some(size);
        self
    }

    #[must_use]
    pub fn with_min_size(mut self, size: Vec2) -> Self {
        self.constraints.min = Some(size);
        self
    }

    #[must_use]
    pub fn with_max_size(mut self, size: Vec2) -> Self {
        self.constraints.max = Some(size);
        self
    }
}

#[derive(Clone, Debug)]
pub struct Widget<Content> {
    pub id: WidgetId,
    pub title: String,
    pub kind: String,
    pub content: Content,
    pub default_size: Vec2,
    pub constraints: SizeConstraints,
    /// Shown in a separate window rather than on the canvas.
    pub popped_out: bool,
}

/// Geometry of one widget on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutItem {
    pub id: WidgetId,
    pub rect: Rect,
}

/// The arrangement: one item per placed widget plus the render order (back to front).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub items: Vec<LayoutItem>,
    pub z_order: Vec<WidgetId>,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, id: &WidgetId) -> Option<&LayoutItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn get_mut(&mut self, id: &WidgetId) -> Option<&mut LayoutItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    pub fn contains(&self, id: &WidgetId) -> bool {
        self.get(id).is_some()
    }

    pub fn rect(&self, id: &WidgetId) -> Option<Rect> {
        self.get(id).map(|item| item.rect)
    }

    pub fn bring_to_front(&mut self, id: &WidgetId) {
        self.z_order.retain(|x| x != id);
        self.z_order.push(id.clone());
    }

    /// Drop z-order entries without an item, and append items missing from the z-order.
    pub fn normalize_z_order(&mut self) {
        let items = &self.items;
        self.z_order
            .retain(|id| items.iter().any(|item| &item.id == id));
        let mut seen = Vec::with_capacity(self.z_order.len());
        self.z_order.retain(|id| {
            if seen.contains(id) {
                false
            } else {
                seen.push(id.clone());
                true
            }
        });
        for item in &self.items {
            if !self.z_order.contains(&item.id) {
                self.z_order.push(item.id.clone());
            }
        }
    }
}

/// Shallow update for [`super::LayoutStore::update_widget`]; `None` leaves a field alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WidgetPatch {
    pub title: Option<String>,
    pub constraints: Option<SizeConstraints>,
    pub popped_out: Option<bool>,
    pub rect: Option<Rect>,
}

/// Every mutation the layout store understands.
#[derive(Clone, Debug)]
pub enum LayoutOp<Content> {
    Add {
        descriptor: WidgetDescriptor<Content>,
        position: Option<Pos2>,
    },
    Remove(WidgetId),
    Update {
        id: WidgetId,
        patch: WidgetPatch,
    },
    ReplaceLayout(Layout),
    BringToFront(WidgetId),
    Clear,
}
