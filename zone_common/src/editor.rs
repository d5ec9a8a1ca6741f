//! Pointer-driven zone drawing, independent of any UI toolkit.
//!
//! The toolkit feeds pointer positions in display units; the editor converts them into
//! canvas-native pixels, tracks the drag, and hands finished rectangles to the zone form.
//!
//! ```text
//! Idle --down--> Dragging --up(big enough)--> Configuring --save--> Idle
//!                    |                             |
//!                    +--up(too small)--> Idle      +--cancel--> Idle
//! ```

use crate::geometry::{CanvasGeometry, DragRect, Point, Rect, ScreenRect, Size};
use crate::overlay::{render_overlay, OverlaySurface};
use crate::zone::{Zone, ZoneError, ZoneForm, ZoneRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragRect),
    /// A finished drag waiting for the configuration form to be submitted.
    Configuring(Rect),
}

/// What a pointer release did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    /// No drag was in progress.
    Ignored,
    /// The drag was at or under the minimum extent and was thrown away.
    Discarded,
    /// The drag became a candidate zone; the form should be shown.
    Configure(Rect),
}

#[derive(Debug, Default)]
pub struct ZoneEditor {
    canvas: CanvasGeometry,
    registry: ZoneRegistry,
    form: ZoneForm,
    state: DragState,
    drawing_mode: bool,
    dirty: bool,
}

impl ZoneEditor {
    pub fn new() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    pub fn with_registry(registry: ZoneRegistry) -> Self {
        Self {
            registry,
            dirty: true,
            ..Self::default()
        }
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    pub fn canvas(&self) -> &CanvasGeometry {
        &self.canvas
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn form(&self) -> &ZoneForm {
        &self.form
    }

    /// Form edits restyle the in-progress preview, so they mark the overlay dirty too.
    pub fn form_mut(&mut self) -> &mut ZoneForm {
        self.dirty = true;
        &mut self.form
    }

    pub fn drawing_mode(&self) -> bool {
        self.drawing_mode
    }

    pub fn is_configuring(&self) -> bool {
        matches!(self.state, DragState::Configuring(_))
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty
    }

    /// Media metadata arrived (or was lost): the canvas takes the media's native size.
    pub fn set_native_size(&mut self, native: Option<Size>) {
        self.canvas.set_native(native);
        self.dirty = true;
    }

    /// Layout moved or resized the displayed canvas.
    pub fn set_display_bounds(&mut self, bounds: ScreenRect) {
        if self.canvas.bounds() != bounds {
            self.canvas.set_bounds(bounds);
            self.dirty = true;
        }
    }

    pub fn set_drawing_mode(&mut self, on: bool) {
        self.drawing_mode = on;
        if !on {
            if let DragState::Dragging(_) = self.state {
                self.state = DragState::Idle;
                self.dirty = true;
            }
        }
    }

    pub fn toggle_drawing_mode(&mut self) -> bool {
        self.set_drawing_mode(!self.drawing_mode);
        self.drawing_mode
    }

    /// Starts a drag. Returns `false` when drawing is off, the canvas has no native size
    /// yet, the form is open, or the pointer is outside the canvas.
    pub fn pointer_down(&mut self, pointer: Point) -> bool {
        if !self.drawing_mode || self.state != DragState::Idle {
            return false;
        }
        if !self.canvas.bounds().contains(pointer) {
            return false;
        }
        let Some(at) = self.canvas.to_native(pointer) else {
            tracing::debug!("pointer down ignored: canvas has no native size");
            return false;
        };
        self.state = DragState::Dragging(DragRect::start(at));
        self.dirty = true;
        true
    }

    /// Resizes the drag. Positions past the canvas edge are pinned to it.
    pub fn pointer_move(&mut self, pointer: Point) {
        let DragState::Dragging(ref mut drag) = self.state else {
            return;
        };
        if let Some(to) = self.canvas.to_native_clamped(pointer) {
            drag.resize_to(to);
            self.dirty = true;
        }
    }

    /// Finishes the drag at the last known position.
    pub fn pointer_up(&mut self) -> DragOutcome {
        let DragState::Dragging(drag) = self.state else {
            return DragOutcome::Ignored;
        };
        self.dirty = true;
        match drag.finish() {
            Some(rect) => {
                self.state = DragState::Configuring(rect);
                DragOutcome::Configure(rect)
            }
            None => {
                self.state = DragState::Idle;
                DragOutcome::Discarded
            }
        }
    }

    /// Submits the form for the pending rectangle. On a validation error the form stays
    /// open with the rectangle still pending.
    pub fn save_zone(&mut self) -> Result<Zone, ZoneError> {
        let DragState::Configuring(rect) = self.state else {
            return Err(ZoneError::NoPendingRect);
        };
        let zone = self.registry.add(rect, &self.form)?.clone();
        self.state = DragState::Idle;
        self.form = ZoneForm::default();
        self.dirty = true;
        Ok(zone)
    }

    /// Closes the form (or abandons a drag) without saving.
    pub fn cancel(&mut self) {
        if self.state != DragState::Idle {
            self.state = DragState::Idle;
            self.dirty = true;
        }
    }

    pub fn delete_zone(&mut self, index: usize) -> Result<Zone, ZoneError> {
        let zone = self.registry.delete(index)?;
        self.dirty = true;
        Ok(zone)
    }

    /// Drops every zone and any pending drag; used when media is replaced or cleared.
    pub fn clear(&mut self) {
        self.registry.clear();
        self.state = DragState::Idle;
        self.form = ZoneForm::default();
        self.drawing_mode = false;
        self.dirty = true;
    }

    /// Rectangle to preview on top of the finished zones, normalized for painting.
    pub fn in_progress(&self) -> Option<Rect> {
        match self.state {
            DragState::Idle => None,
            DragState::Dragging(drag) => Some(drag.normalized()),
            DragState::Configuring(rect) => Some(rect),
        }
    }

    /// Paints the overlay and clears the dirty flag.
    pub fn render<S: OverlaySurface>(&mut self, surface: &mut S) {
        render_overlay(
            surface,
            self.registry.zones(),
            self.in_progress().map(|rect| (rect, &self.form)),
        );
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{DisplayList, DrawOp};

    fn ready_editor() -> ZoneEditor {
        let mut editor = ZoneEditor::new();
        editor.set_native_size(Some(Size::new(1280, 720)));
        editor.set_display_bounds(ScreenRect::new(0.0, 0.0, 640.0, 360.0));
        editor.set_drawing_mode(true);
        editor
    }

    fn drag(editor: &mut ZoneEditor, from: (f64, f64), to: (f64, f64)) -> DragOutcome {
        assert!(editor.pointer_down(Point::new(from.0, from.1)));
        editor.pointer_move(Point::new(to.0, to.1));
        editor.pointer_up()
    }

    #[test]
    fn test_backward_drag_becomes_normalized_zone() {
        let mut editor = ready_editor();
        let outcome = drag(&mut editor, (200.0, 150.0), (100.0, 50.0));
        // 2x scale on both axes.
        assert_eq!(outcome, DragOutcome::Configure(Rect::new(200.0, 100.0, 200.0, 200.0)));
        assert!(editor.is_configuring());

        editor.form_mut().name = "Aisle".into();
        let zone = editor.save_zone().unwrap();
        assert_eq!(zone.rect, Rect::new(200.0, 100.0, 200.0, 200.0));
        assert_eq!(editor.registry().len(), 1);
        assert_eq!(editor.state(), DragState::Idle);
        assert_eq!(editor.form(), &ZoneForm::default());
    }

    #[test]
    fn test_small_drag_discarded_drawing_stays_on() {
        let mut editor = ready_editor();
        // 5 display units = 10 native px: not strictly greater than the minimum.
        assert_eq!(drag(&mut editor, (10.0, 10.0), (15.0, 100.0)), DragOutcome::Discarded);
        assert!(editor.registry().is_empty());
        assert!(editor.drawing_mode());
        assert_eq!(editor.state(), DragState::Idle);

        // Another attempt is accepted.
        assert!(matches!(
            drag(&mut editor, (10.0, 10.0), (100.0, 100.0)),
            DragOutcome::Configure(_)
        ));
    }

    #[test]
    fn test_drag_past_canvas_edge_pinned_to_media() {
        let mut editor = ready_editor();
        let outcome = drag(&mut editor, (400.0, 200.0), (900.0, 800.0));
        // 1280x720 media: the far corner stops at the media edge.
        assert_eq!(outcome, DragOutcome::Configure(Rect::new(800.0, 400.0, 480.0, 320.0)));

        editor.cancel();
        let outcome = drag(&mut editor, (100.0, 100.0), (-50.0, -20.0));
        assert_eq!(outcome, DragOutcome::Configure(Rect::new(0.0, 0.0, 200.0, 200.0)));
    }

    #[test]
    fn test_no_drawing_without_native_size() {
        let mut editor = ZoneEditor::new();
        editor.set_display_bounds(ScreenRect::new(0.0, 0.0, 640.0, 360.0));
        editor.set_drawing_mode(true);
        assert!(!editor.pointer_down(Point::new(10.0, 10.0)));
        assert_eq!(editor.pointer_up(), DragOutcome::Ignored);
        assert!(editor.in_progress().is_none());
    }

    #[test]
    fn test_pointer_ignored_when_drawing_off_or_outside() {
        let mut editor = ready_editor();
        assert!(!editor.pointer_down(Point::new(700.0, 10.0)));
        editor.set_drawing_mode(false);
        assert!(!editor.pointer_down(Point::new(10.0, 10.0)));
    }

    #[test]
    fn test_empty_name_keeps_form_open() {
        let mut editor = ready_editor();
        drag(&mut editor, (0.0, 0.0), (50.0, 50.0));
        assert_eq!(editor.save_zone().unwrap_err(), ZoneError::EmptyName);
        assert!(editor.is_configuring());
        assert!(editor.registry().is_empty());

        editor.cancel();
        assert_eq!(editor.state(), DragState::Idle);
        assert_eq!(editor.save_zone().unwrap_err(), ZoneError::NoPendingRect);
    }

    #[test]
    fn test_no_new_drag_while_configuring() {
        let mut editor = ready_editor();
        drag(&mut editor, (0.0, 0.0), (50.0, 50.0));
        assert!(!editor.pointer_down(Point::new(100.0, 100.0)));
    }

    #[test]
    fn test_mutations_mark_dirty_and_render_clears() {
        let mut editor = ready_editor();
        let mut list = DisplayList::default();
        editor.render(&mut list);
        assert!(!editor.needs_redraw());

        assert!(editor.pointer_down(Point::new(10.0, 10.0)));
        assert!(editor.needs_redraw());
        editor.pointer_move(Point::new(60.0, 60.0));
        editor.render(&mut list);
        // Live preview of the in-progress rectangle in native coordinates.
        assert!(list.ops().contains(&DrawOp::StrokeRect {
            rect: Rect::new(20.0, 20.0, 100.0, 100.0),
            color: "#3B82F6".into(),
            thickness: 3,
        }));

        editor.pointer_up();
        editor.form_mut().name = "A".into();
        editor.save_zone().unwrap();
        assert!(editor.needs_redraw());
        editor.render(&mut list);

        editor.delete_zone(0).unwrap();
        assert!(editor.needs_redraw());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut editor = ready_editor();
        drag(&mut editor, (0.0, 0.0), (50.0, 50.0));
        editor.form_mut().name = "A".into();
        editor.save_zone().unwrap();
        assert!(editor.pointer_down(Point::new(1.0, 1.0)));

        editor.clear();
        assert!(editor.registry().is_empty());
        assert!(editor.in_progress().is_none());
        assert!(!editor.drawing_mode());
    }
}
