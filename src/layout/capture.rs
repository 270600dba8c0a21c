use egui::CursorIcon;

/// Global input side effects held for the duration of a gesture: the forced cursor and
/// text-selection suppression.
///
/// The controller always pairs [`Self::begin_capture`] with [`Self::end_capture`], including
/// on abnormal termination.
pub trait InputCapture {
    fn begin_capture(&mut self, cursor: CursorIcon);

    fn end_capture(&mut self);
}

/// Tracks capture state in memory. egui hosts read [`Self::cursor`] each frame and call
/// `ctx.set_cursor_icon`; it is also what tests assert against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureState {
    cursor: Option<CursorIcon>,
    selection_suppressed: bool,
    releases: usize,
}

impl CaptureState {
    pub fn cursor(&self) -> Option<CursorIcon> {
        self.cursor
    }

    pub fn is_capturing(&self) -> bool {
        self.selection_suppressed
    }

    pub fn release_count(&self) -> usize {
        self.releases
    }
}

impl InputCapture for CaptureState {
    fn begin_capture(&mut self, cursor: CursorIcon) {
        self.cursor = Some(cursor);
        self.selection_suppressed = true;
    }

    fn end_capture(&mut self) {
        if self.selection_suppressed {
            self.releases += 1;
        }
        self.cursor = None;
        self.selection_suppressed = false;
    }
}
