use super::types::WidgetId;

/// Rebuilds widget content from its type tag when a layout is restored.
///
/// Design goals:
/// - Layout snapshots store only the widget's `kind`, never the content itself.
/// - The app decides how to restore content (lazy loading, placeholders, migrations, etc).
pub trait WidgetFactory<Content> {
    fn create(&mut self, kind: &str, id: &WidgetId) -> Content;

    /// Optional restoration path: return `None` to drop widgets whose kind no longer exists.
    ///
    /// The default implementation always succeeds by delegating to [`Self::create`].
    fn try_create(&mut self, kind: &str, id: &WidgetId) -> Option<Content> {
        Some(self.create(kind, id))
    }
}

/// Convenience helper: build a [`WidgetFactory`] from a closure.
pub struct SimpleWidgetFactory<F> {
    pub create: F,
}

impl<F> SimpleWidgetFactory<F> {
    pub fn new(create: F) -> Self {
        Self { create }
    }
}

impl<Content, F> WidgetFactory<Content> for SimpleWidgetFactory<F>
where
    F: FnMut(&str, &WidgetId) -> Content,
{
    fn create(&mut self, kind: &str, id: &WidgetId) -> Content {
        (self.create)(kind, id)
    }
}

/// A factory that only knows a fixed set of kinds and drops everything else.
pub struct KnownKindsFactory<F> {
    kinds: Vec<String>,
    create: F,
}

impl<F> KnownKindsFactory<F> {
    pub fn new(kinds: impl IntoIterator<Item = impl Into<String>>, create: F) -> Self {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
            create,
        }
    }
}

impl<Content, F> WidgetFactory<Content> for KnownKindsFactory<F>
where
    F: FnMut(&str, &WidgetId) -> Content,
{
    fn create(&mut self, kind: &str, id: &WidgetId) -> Content {
        (self.create)(kind, id)
    }

    fn try_create(&mut self, kind: &str, id: &WidgetId) -> Option<Content> {
        if self.kinds.iter().any(|k| k == kind) {
            Some((self.create)(kind, id))
        } else {
            log::debug!("dropping widget {id}: unknown kind {kind:?}");
            None
        }
    }
}
