use ahash::HashMap;
use egui::{Pos2, Rect, Vec2};

use super::controller::WidgetGeometry;
use super::geometry::{clamp_into, container_rect};
use super::options::LayoutOptions;
use super::persistence::{LayoutSnapshot, PersistenceError, WidgetRecord};
use super::types::{
    Layout, LayoutItem, LayoutOp, SizeConstraints, Widget, WidgetDescriptor, WidgetId, WidgetPatch,
};
use super::widget_factory::WidgetFactory;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// The caller is expected to keep ids unique; this is a contract violation.
    #[error("widget {0} already exists")]
    DuplicateWidget(WidgetId),

    #[error("unknown widget {0}")]
    UnknownWidget(WidgetId),
}

/// The authoritative set of widgets and their arrangement for one window.
///
/// Every mutation bumps [`Self::revision`]; [`super::AutoSaver`] watches it to debounce
/// persistence.
#[derive(Debug)]
pub struct LayoutStore<Content> {
    widgets: Vec<Widget<Content>>,
    index: HashMap<WidgetId, usize>,
    layout: Layout,
    container: Vec2,
    default_size: Vec2,
    revision: u64,
}

impl<Content> LayoutStore<Content> {
    pub fn new(container: Vec2) -> Self {
        Self::with_options(&LayoutOptions {
            default_container_size: container,
            ..Default::default()
        })
    }

    pub fn with_options(options: &LayoutOptions) -> Self {
        Self {
            widgets: Vec::new(),
            index: HashMap::default(),
            layout: Layout::default(),
            container: options.default_container_size,
            default_size: options.default_widget_size,
            revision: 0,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn container_size(&self) -> Vec2 {
        self.container
    }

    pub fn bounds(&self) -> Rect {
        container_rect(self.container)
    }

    /// The host canvas was resized: pull every item back inside.
    pub fn set_container_size(&mut self, size: Vec2) {
        if size == self.container {
            return;
        }
        self.container = size;
        let bounds = self.bounds();
        for item in &mut self.layout.items {
            item.rect = clamp_into(item.rect, bounds);
        }
        self.touch();
    }

    /// No widgets and no arrangement.
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty() && self.layout.is_empty()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn widgets(&self) -> impl Iterator<Item = &Widget<Content>> {
        self.widgets.iter()
    }

    pub fn widget(&self, id: &WidgetId) -> Option<&Widget<Content>> {
        self.index.get(id).map(|&i| &self.widgets[i])
    }

    /// Content belongs to the UI layer; touching it does not count as a layout change.
    pub fn content_mut(&mut self, id: &WidgetId) -> Option<&mut Content> {
        let i = *self.index.get(id)?;
        Some(&mut self.widgets[i].content)
    }

    pub fn contains(&self, id: &WidgetId) -> bool {
        self.index.contains_key(id)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn rect(&self, id: &WidgetId) -> Option<Rect> {
        self.layout.rect(id)
    }

    /// Rects of the widgets currently on the canvas (placed and not popped out),
    /// in layout order.
    pub fn placed_rects(&self) -> Vec<(WidgetId, Rect)> {
        self.layout
            .items
            .iter()
            .filter(|item| self.widget(&item.id).is_some_and(|w| !w.popped_out))
            .map(|item| (item.id.clone(), item.rect))
            .collect()
    }

    pub fn add_widget(
        &mut self,
        descriptor: WidgetDescriptor<Content>,
        position: Option<Pos2>,
    ) -> Result<WidgetId, LayoutError> {
        let WidgetDescriptor {
            id,
            title,
            kind,
            content,
            default_size,
            constraints,
        } = descriptor;

        let id = match id {
            Some(id) => id,
            None => self.allocate_id(&kind),
        };
        if self.index.contains_key(&id) {
            log::error!("add_widget: duplicate widget id {id}");
            return Err(LayoutError::DuplicateWidget(id));
        }

        let default_size = default_size.unwrap_or(self.default_size);
        if let Some(pos) = position {
            let rect = self.fit(Rect::from_min_size(pos, default_size), &constraints);
            self.layout.items.push(LayoutItem {
                id: id.clone(),
                rect,
            });
            self.layout.bring_to_front(&id);
        }

        self.index.insert(id.clone(), self.widgets.len());
        self.widgets.push(Widget {
            id: id.clone(),
            title,
            kind,
            content,
            default_size,
            constraints,
            popped_out: false,
        });
        self.touch();
        log::debug!("added widget {id}");
        Ok(id)
    }

    /// Idempotent: removing an unknown id does nothing.
    pub fn remove_widget(&mut self, id: &WidgetId) -> Option<Widget<Content>> {
        let i = self.index.remove(id)?;
        let widget = self.widgets.remove(i);
        self.rebuild_index();
        self.layout.items.retain(|item| &item.id != id);
        self.layout.z_order.retain(|x| x != id);
        self.touch();
        Some(widget)
    }

    /// Shallow merge; returns `false` (and changes nothing) for unknown ids.
    pub fn update_widget(&mut self, id: &WidgetId, patch: WidgetPatch) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };

        let WidgetPatch {
            title,
            constraints,
            popped_out,
            rect,
        } = patch;

        let widget = &mut self.widgets[i];
        if let Some(title) = title {
            widget.title = title;
        }
        if let Some(popped_out) = popped_out {
            widget.popped_out = popped_out;
        }
        if let Some(constraints) = constraints {
            widget.constraints = constraints;
        }
        let constraints = widget.constraints;

        let target = rect.or_else(|| self.layout.rect(id));
        if let Some(target) = target {
            let fitted = self.fit(target, &constraints);
            match self.layout.get_mut(id) {
                Some(item) => item.rect = fitted,
                None => {
                    self.layout.items.push(LayoutItem {
                        id: id.clone(),
                        rect: fitted,
                    });
                    self.layout.bring_to_front(id);
                }
            }
        }

        self.touch();
        true
    }

    /// Wholesale replacement of the arrangement.
    ///
    /// Items for unknown widgets and repeated ids are dropped; sizes are brought back
    /// within constraints and rects back inside the container.
    pub fn update_layout(&mut self, layout: Layout) {
        let Layout { items, z_order } = layout;
        let mut kept: Vec<LayoutItem> = Vec::with_capacity(items.len());
        for item in items {
            let Some(widget) = self.widget(&item.id) else {
                log::warn!("update_layout: dropping item for unknown widget {}", item.id);
                continue;
            };
            if kept.iter().any(|k| k.id == item.id) {
                log::warn!("update_layout: dropping duplicate item {}", item.id);
                continue;
            }
            let rect = self.fit(item.rect, &widget.constraints);
            kept.push(LayoutItem { id: item.id, rect });
        }

        self.layout = Layout {
            items: kept,
            z_order,
        };
        self.layout.normalize_z_order();
        self.touch();
    }

    /// Direct geometry write used while a gesture is in flight; no constraint fitting.
    pub fn set_rect(&mut self, id: &WidgetId, rect: Rect) -> bool {
        let Some(item) = self.layout.get_mut(id) else {
            return false;
        };
        if item.rect != rect {
            item.rect = rect;
            self.touch();
        }
        true
    }

    pub fn bring_to_front(&mut self, id: &WidgetId) {
        if !self.layout.contains(id) || self.layout.z_order.last() == Some(id) {
            return;
        }
        self.layout.bring_to_front(id);
        self.touch();
    }

    pub fn set_popped_out(&mut self, id: &WidgetId, popped_out: bool) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        if self.widgets[i].popped_out != popped_out {
            self.widgets[i].popped_out = popped_out;
            self.touch();
        }
        true
    }

    /// Explicit user reset: forget every widget.
    pub fn clear(&mut self) {
        self.widgets.clear();
        self.index.clear();
        self.layout = Layout::default();
        self.touch();
    }

    pub fn apply(&mut self, op: LayoutOp<Content>) -> Result<(), LayoutError> {
        match op {
            LayoutOp::Add {
                descriptor,
                position,
            } => {
                self.add_widget(descriptor, position)?;
            }
            LayoutOp::Remove(id) => {
                self.remove_widget(&id);
            }
            LayoutOp::Update { id, patch } => {
                self.update_widget(&id, patch);
            }
            LayoutOp::ReplaceLayout(layout) => self.update_layout(layout),
            LayoutOp::BringToFront(id) => self.bring_to_front(&id),
            LayoutOp::Clear => self.clear(),
        }
        Ok(())
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        let widgets = self
            .widgets
            .iter()
            .map(|w| WidgetRecord {
                id: w.id.clone(),
                title: w.title.clone(),
                kind: w.kind.clone(),
                default_size: w.default_size,
                constraints: w.constraints,
                popped_out: w.popped_out,
            })
            .collect();
        LayoutSnapshot::new(self.layout.clone(), widgets)
    }

    /// Replace the whole store with a snapshot, rebuilding content through `factory`.
    ///
    /// Widgets the factory refuses are dropped together with their layout items.
    pub fn restore(
        &mut self,
        snapshot: LayoutSnapshot,
        factory: &mut dyn WidgetFactory<Content>,
    ) -> Result<(), PersistenceError> {
        snapshot.check_version()?;
        let LayoutSnapshot {
            layout, widgets, ..
        } = snapshot;

        self.widgets.clear();
        self.index.clear();
        for record in widgets {
            if self.index.contains_key(&record.id) {
                log::warn!("restore: skipping duplicate widget {}", record.id);
                continue;
            }
            let Some(content) = factory.try_create(&record.kind, &record.id) else {
                continue;
            };
            self.index.insert(record.id.clone(), self.widgets.len());
            self.widgets.push(Widget {
                id: record.id,
                title: record.title,
                kind: record.kind,
                content,
                default_size: record.default_size,
                constraints: record.constraints,
                popped_out: record.popped_out,
            });
        }

        self.update_layout(layout);
        Ok(())
    }

    fn fit(&self, rect: Rect, constraints: &SizeConstraints) -> Rect {
        let size = constraints.clamp(rect.size()).max(Vec2::ZERO);
        clamp_into(Rect::from_min_size(rect.min, size), self.bounds())
    }

    fn allocate_id(&self, kind: &str) -> WidgetId {
        let kind = if kind.is_empty() { "widget" } else { kind };
        let mut n = self.widgets.len() + 1;
        loop {
            let id = WidgetId::new(format!("{kind}-{n}"));
            if !self.index.contains_key(&id) {
                return id;
            }
            n += 1;
        }
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .widgets
            .iter()
            .enumerate()
            .map(|(i, w)| (w.id.clone(), i))
            .collect();
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl<Content> WidgetGeometry for LayoutStore<Content> {
    fn container_size(&self) -> Vec2 {
        self.container
    }

    /// Popped-out widgets keep their item but are not on the canvas.
    fn widget_rect(&self, id: &WidgetId) -> Option<Rect> {
        self.widget(id)
            .filter(|w| !w.popped_out)
            .and_then(|_| self.rect(id))
    }

    fn size_constraints(&self, id: &WidgetId) -> SizeConstraints {
        self.widget(id).map(|w| w.constraints).unwrap_or_default()
    }

    fn occupants(&self, exclude: &WidgetId) -> Vec<(WidgetId, Rect)> {
        let mut rects = self.placed_rects();
        rects.retain(|(id, _)| id != exclude);
        rects
    }

    fn publish_rect(&mut self, id: &WidgetId, rect: Rect) {
        if !self.set_rect(id, rect) {
            log::trace!("publish_rect: widget {id} has no layout item");
        }
    }
}
