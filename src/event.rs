use egui::Pos2;
use image::Rgba;

use crate::tools::ToolKind;

/// Everything that can happen to a canvas session, from the pointer or the
/// toolbar. Positions are canvas-local pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    GestureStart(Pos2),
    GestureMove(Pos2),
    GestureEnd,
    SelectTool(ToolKind),
    SetColor(Rgba<u8>),
    SetWidth(u32),
    Undo,
    Redo,
    Clear,
}

/// What the surface needs after an event was handled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Repaint {
    #[default]
    None,
    /// Only the newest gesture segment was drawn on top
    Segment,
    /// The whole log was replayed
    Full,
}
