use egui::Pos2;
use image::Rgba;
use std::sync::Arc;

/// Fewest points a gesture needs before it can be committed.
pub const MIN_STROKE_POINTS: usize = 2;

/// How a stroke is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrokeStyle {
    pub color: Rgba<u8>,
    /// Line width in whole pixels, always at least 1.
    pub width: u32,
    pub is_eraser: bool,
}

impl StrokeStyle {
    pub fn brush(color: Rgba<u8>, width: u32) -> Self {
        Self {
            color,
            width: width.max(1),
            is_eraser: false,
        }
    }

    /// Eraser strokes carry the background color they paint with.
    pub fn eraser(background: Rgba<u8>, width: u32) -> Self {
        Self {
            color: background,
            width: width.max(1),
            is_eraser: true,
        }
    }
}

// Immutable stroke, committed to the drawing log
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    points: Vec<Pos2>,
    style: StrokeStyle,
}

// Mutable stroke for the gesture in progress
#[derive(Debug, Clone)]
pub struct MutableStroke {
    points: Vec<Pos2>,
    style: StrokeStyle,
}

// Committed strokes are shared between the log, the undo stack and the renderer
pub type StrokeRef = Arc<Stroke>;

impl Stroke {
    /// Build a committed stroke directly, e.g. when decoding a saved drawing.
    /// Returns `None` for degenerate point lists.
    pub fn new(style: StrokeStyle, points: Vec<Pos2>) -> Option<Self> {
        (points.len() >= MIN_STROKE_POINTS).then_some(Self { points, style })
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn style(&self) -> StrokeStyle {
        self.style
    }

    pub fn color(&self) -> Rgba<u8> {
        self.style.color
    }

    pub fn width(&self) -> u32 {
        self.style.width
    }

    pub fn is_eraser(&self) -> bool {
        self.style.is_eraser
    }
}

impl MutableStroke {
    /// Start a gesture with a single point.
    pub fn begin(start: Pos2, style: StrokeStyle) -> Self {
        Self {
            points: vec![start],
            style,
        }
    }

    /// Append a point. Coincident points are kept.
    pub fn extend(&mut self, point: Pos2) {
        self.points.push(point);
    }

    /// Freeze the gesture. Taps with fewer than two points produce nothing.
    pub fn finalize(self) -> Option<Stroke> {
        Stroke::new(self.style, self.points)
    }

    /// The newest segment, once the gesture has one.
    pub fn last_segment(&self) -> Option<[Pos2; 2]> {
        match self.points.as_slice() {
            [.., a, b] => Some([*a, *b]),
            _ => None,
        }
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn style(&self) -> StrokeStyle {
        self.style
    }
}
