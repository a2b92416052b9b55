//! One canvas and everything drawn on it.
//!
//! The [`Session`] owns the drawing log, the toolbar settings, the gesture in
//! progress and the pixel surface. All mutation goes through its methods, in
//! event order, so the log and the surface never disagree.

use egui::Pos2;

use crate::error::{SessionError, SessionResult};
use crate::event::{CanvasEvent, Repaint};
use crate::history::DrawingLog;
use crate::persistence::{self, CanvasData, DrawingMetadata, SaveRequest};
use crate::renderer::{Renderer, Surface};
use crate::stroke::{MutableStroke, Stroke, StrokeRef};
use crate::tools::ToolState;

#[derive(Debug, Clone)]
pub struct Session {
    log: DrawingLog,
    tools: ToolState,
    active: Option<MutableStroke>,
    surface: Surface,
    renderer: Renderer,
    /// Set whenever the surface pixels changed since the last `take_dirty`
    dirty: bool,
}

impl Session {
    pub fn new(surface: Surface, tools: ToolState) -> Self {
        Self {
            log: DrawingLog::new(),
            tools,
            active: None,
            surface,
            renderer: Renderer::new(),
            dirty: true,
        }
    }

    /// Dispatch one event to the operation it stands for.
    pub fn handle_event(&mut self, event: CanvasEvent) -> Repaint {
        log::trace!("Canvas event: {event:?}");
        let result = match event {
            CanvasEvent::GestureStart(pos) => self.begin_stroke(pos).map(|()| Repaint::None),
            CanvasEvent::GestureMove(pos) => self.extend_stroke(pos).map(|()| Repaint::Segment),
            CanvasEvent::GestureEnd => self.end_stroke().map(|committed| {
                if committed.is_some() {
                    Repaint::Full
                } else {
                    Repaint::None
                }
            }),
            CanvasEvent::SelectTool(tool) => {
                self.tools.set_tool(tool);
                Ok(Repaint::None)
            }
            CanvasEvent::SetColor(color) => {
                self.tools.set_color(color);
                Ok(Repaint::None)
            }
            CanvasEvent::SetWidth(width) => {
                self.tools.set_width(width);
                Ok(Repaint::None)
            }
            CanvasEvent::Undo => Ok(if self.undo() { Repaint::Full } else { Repaint::None }),
            CanvasEvent::Redo => Ok(if self.redo() { Repaint::Full } else { Repaint::None }),
            CanvasEvent::Clear => {
                self.clear_all();
                Ok(Repaint::Full)
            }
        };

        result.unwrap_or_else(|err| {
            log::debug!("Ignored canvas event: {err}");
            Repaint::None
        })
    }

    /// Start a gesture with the current tool settings.
    pub fn begin_stroke(&mut self, pos: Pos2) -> SessionResult<()> {
        if self.active.is_some() {
            return Err(SessionError::GestureInProgress);
        }
        let style = self.tools.stroke_style(self.surface.background());
        self.active = Some(MutableStroke::begin(pos, style));
        Ok(())
    }

    /// Add a point to the gesture and draw just the new segment.
    pub fn extend_stroke(&mut self, pos: Pos2) -> SessionResult<()> {
        let stroke = self.active.as_mut().ok_or(SessionError::NoGestureInProgress)?;
        stroke.extend(pos);
        self.renderer.paint_live_segment(&mut self.surface, stroke);
        self.dirty = true;
        Ok(())
    }

    /// Finish the gesture. Returns the committed stroke, or `None` for a tap.
    pub fn end_stroke(&mut self) -> SessionResult<Option<StrokeRef>> {
        let stroke = self.active.take().ok_or(SessionError::NoGestureInProgress)?;
        match stroke.finalize() {
            Some(stroke) => {
                let committed = self.log.commit(stroke);
                log::debug!(
                    "Committed stroke #{} ({} points)",
                    self.log.committed().len(),
                    committed.points().len()
                );
                self.repaint();
                Ok(Some(committed))
            }
            None => {
                log::debug!("Dropped gesture with fewer than two points");
                Ok(None)
            }
        }
    }

    pub fn undo(&mut self) -> bool {
        let changed = self.log.undo();
        if changed {
            self.repaint();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.log.redo();
        if changed {
            self.repaint();
        }
        changed
    }

    /// Wipe the drawing, including any gesture in progress. Not undoable.
    pub fn clear_all(&mut self) {
        self.active = None;
        self.log.clear_all();
        self.repaint();
        log::info!("Canvas cleared");
    }

    /// Replace the drawing with loaded strokes.
    pub fn replace(&mut self, strokes: Vec<Stroke>) {
        log::info!("Loaded drawing with {} strokes", strokes.len());
        self.log.replace(strokes);
        self.repaint();
    }

    /// Apply a load response. Returns false when it held no usable drawing,
    /// in which case nothing changes.
    pub fn load_canvas_data(&mut self, canvas_data: Option<&serde_json::Value>) -> bool {
        match canvas_data.and_then(persistence::decode_canvas_data) {
            Some(strokes) => {
                self.replace(strokes);
                true
            }
            None => {
                log::info!("No saved drawing to load");
                false
            }
        }
    }

    /// Build the save payload for the committed strokes.
    pub fn save_request(&self, is_completed: bool) -> SaveRequest {
        persistence::encode_save_request(
            self.log.committed(),
            self.surface.width(),
            self.surface.height(),
            is_completed,
        )
    }

    pub fn canvas_data(&self) -> CanvasData {
        persistence::encode_canvas_data(self.log.committed())
    }

    pub fn metadata(&self) -> DrawingMetadata {
        DrawingMetadata::derive(self.log.committed())
    }

    /// Full replay of the log, with the live gesture (if any) on top.
    pub fn repaint(&mut self) {
        self.renderer.render(&mut self.surface, self.log.committed());
        if let Some(active) = &self.active {
            self.renderer.paint_preview(&mut self.surface, active);
        }
        self.dirty = true;
    }

    /// Whether the pixels changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn log(&self) -> &DrawingLog {
        &self.log
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn active_stroke(&self) -> Option<&MutableStroke> {
        self.active.as_ref()
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, WHITE};
    use crate::tools::ToolKind;
    use egui::pos2;
    use image::Rgba;

    fn session() -> Session {
        Session::new(Surface::new(32, 32, WHITE), ToolState::default())
    }

    #[test]
    fn second_gesture_start_leaves_the_first_alone() {
        let mut session = session();
        session.begin_stroke(pos2(1.0, 1.0)).unwrap();
        session.extend_stroke(pos2(2.0, 2.0)).unwrap();

        assert_eq!(session.begin_stroke(pos2(9.0, 9.0)), Err(SessionError::GestureInProgress));
        assert_eq!(
            session.active_stroke().unwrap().points(),
            &[pos2(1.0, 1.0), pos2(2.0, 2.0)]
        );
    }

    #[test]
    fn move_without_gesture_is_ignored() {
        let mut session = session();
        assert_eq!(session.handle_event(CanvasEvent::GestureMove(pos2(3.0, 3.0))), Repaint::None);
        assert_eq!(session.handle_event(CanvasEvent::GestureEnd), Repaint::None);
        assert!(session.log().is_empty());
    }

    #[test]
    fn tool_change_mid_gesture_keeps_the_started_style() {
        let mut session = session();
        session.handle_event(CanvasEvent::SetColor(Rgba([200, 0, 0, 255])));
        session.handle_event(CanvasEvent::GestureStart(pos2(0.0, 0.0)));
        session.handle_event(CanvasEvent::SelectTool(ToolKind::Eraser));
        session.handle_event(CanvasEvent::GestureMove(pos2(10.0, 0.0)));
        session.handle_event(CanvasEvent::GestureEnd);

        let stroke = &session.log().committed()[0];
        assert!(!stroke.is_eraser());
        assert_eq!(stroke.color(), Rgba([200, 0, 0, 255]));
        assert_eq!(session.tools().tool(), ToolKind::Eraser);
    }

    #[test]
    fn clear_during_gesture_drops_it() {
        let mut session = session();
        session.handle_event(CanvasEvent::GestureStart(pos2(0.0, 5.0)));
        session.handle_event(CanvasEvent::GestureMove(pos2(20.0, 5.0)));
        assert_eq!(session.handle_event(CanvasEvent::Clear), Repaint::Full);

        assert!(!session.is_drawing());
        assert_eq!(session.handle_event(CanvasEvent::GestureEnd), Repaint::None);
        assert!(session.log().is_empty());
        assert!(session.surface().pixels().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn undo_mid_gesture_keeps_the_live_stroke_visible() {
        let mut session = session();
        session.begin_stroke(pos2(0.0, 2.0)).unwrap();
        session.extend_stroke(pos2(31.0, 2.0)).unwrap();
        session.end_stroke().unwrap();

        session.begin_stroke(pos2(0.0, 20.0)).unwrap();
        session.extend_stroke(pos2(31.0, 20.0)).unwrap();
        assert!(session.undo());

        assert_eq!(session.surface().pixel(10, 2), Some(WHITE));
        assert_eq!(session.surface().pixel(10, 20), Some(BLACK));
        assert!(session.is_drawing());
    }

    #[test]
    fn dirty_flag_tracks_surface_changes() {
        let mut session = session();
        assert!(session.take_dirty());
        assert!(!session.take_dirty());
        assert!(!session.undo());
        assert!(!session.take_dirty());
        session.handle_event(CanvasEvent::GestureStart(pos2(1.0, 1.0)));
        session.handle_event(CanvasEvent::GestureMove(pos2(5.0, 5.0)));
        assert!(session.take_dirty());
    }
}
