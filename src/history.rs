use crate::stroke::{Stroke, StrokeRef};
use std::sync::Arc;

/// The committed strokes of a drawing plus the strokes undone from its tail.
///
/// A stroke lives in exactly one of the two stacks. It moves only through
/// `undo` (committed tail to undone) and `redo` (undone tail to committed).
#[derive(Debug, Clone, Default)]
pub struct DrawingLog {
    /// Strokes in paint order
    committed: Vec<StrokeRef>,
    /// Strokes that can be redone, most recently undone last
    undone: Vec<StrokeRef>,
}

impl DrawingLog {
    /// Creates a new empty drawing log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished stroke. Any redo history is discarded.
    pub fn commit(&mut self, stroke: Stroke) -> StrokeRef {
        let stroke = Arc::new(stroke);
        self.committed.push(Arc::clone(&stroke));
        self.undone.clear();
        stroke
    }

    /// Move the newest committed stroke onto the undone stack.
    /// Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.committed.pop() {
            Some(stroke) => {
                self.undone.push(stroke);
                true
            }
            None => false,
        }
    }

    /// Move the most recently undone stroke back to the end of the log.
    /// Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.undone.pop() {
            Some(stroke) => {
                self.committed.push(stroke);
                true
            }
            None => false,
        }
    }

    /// Drop everything. There is no way back.
    pub fn clear_all(&mut self) {
        self.committed.clear();
        self.undone.clear();
    }

    /// Swap in a loaded drawing.
    pub fn replace(&mut self, strokes: Vec<Stroke>) {
        self.committed = strokes.into_iter().map(Arc::new).collect();
        self.undone.clear();
    }

    pub fn committed(&self) -> &[StrokeRef] {
        &self.committed
    }

    pub fn undone(&self) -> &[StrokeRef] {
        &self.undone
    }

    pub fn can_undo(&self) -> bool {
        !self.committed.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::StrokeStyle;
    use egui::pos2;
    use image::Rgba;

    fn line(x0: f32, y0: f32, x1: f32, y1: f32) -> Stroke {
        Stroke::new(
            StrokeStyle::brush(Rgba([0, 0, 0, 255]), 2),
            vec![pos2(x0, y0), pos2(x1, y1)],
        )
        .unwrap()
    }

    #[test]
    fn undo_and_redo_on_empty_log_are_noops() {
        let mut log = DrawingLog::new();
        assert!(!log.undo());
        assert!(!log.redo());
        assert!(log.committed().is_empty());
        assert!(log.undone().is_empty());
    }

    #[test]
    fn undo_then_redo_restores_order() {
        let mut log = DrawingLog::new();
        let a = log.commit(line(0.0, 0.0, 10.0, 10.0));
        let b = log.commit(line(5.0, 5.0, 15.0, 15.0));

        assert!(log.undo());
        assert_eq!(log.committed(), &[a.clone()]);
        assert_eq!(log.undone(), &[b.clone()]);

        assert!(log.redo());
        assert_eq!(log.committed(), &[a, b]);
        assert!(log.undone().is_empty());
    }

    #[test]
    fn commit_after_undo_discards_redo_branch() {
        let mut log = DrawingLog::new();
        let a = log.commit(line(0.0, 0.0, 1.0, 1.0));
        log.commit(line(1.0, 1.0, 2.0, 2.0));
        assert!(log.undo());
        let c = log.commit(line(2.0, 2.0, 3.0, 3.0));

        assert_eq!(log.committed(), &[a, c]);
        assert!(log.undone().is_empty());
        assert!(!log.redo());
    }

    #[test]
    fn replace_empties_the_undone_stack() {
        let mut log = DrawingLog::new();
        log.commit(line(0.0, 0.0, 1.0, 1.0));
        log.undo();
        log.replace(vec![line(3.0, 3.0, 4.0, 4.0), line(4.0, 4.0, 5.0, 5.0)]);
        assert_eq!(log.committed().len(), 2);
        assert!(!log.can_redo());
    }

    #[test]
    fn clear_all_is_not_undoable() {
        let mut log = DrawingLog::new();
        log.commit(line(0.0, 0.0, 1.0, 1.0));
        log.commit(line(1.0, 1.0, 2.0, 2.0));
        log.undo();
        log.clear_all();
        assert!(log.is_empty());
        assert!(!log.undo());
        assert!(!log.redo());
    }
}
