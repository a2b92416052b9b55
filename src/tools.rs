use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::color;
use crate::stroke::StrokeStyle;

pub const MIN_BRUSH_WIDTH: u32 = 1;
pub const MAX_BRUSH_WIDTH: u32 = 50;

#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Brush,
    Eraser,
}

impl ToolKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Brush => "brush",
            Self::Eraser => "eraser",
        }
    }

    pub fn all() -> [ToolKind; 2] {
        [Self::Brush, Self::Eraser]
    }
}

/// Toolbar settings that decide the style of the next stroke.
///
/// Changing them never touches a stroke that is already in progress; the
/// style is captured when the gesture begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolState {
    tool: ToolKind,
    #[serde(with = "hex_color")]
    color: Rgba<u8>,
    width: u32,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            tool: ToolKind::Brush,
            color: color::BLACK,
            width: 2,
        }
    }
}

impl ToolState {
    pub fn new(tool: ToolKind, color: Rgba<u8>, width: u32) -> Self {
        let mut state = Self {
            tool,
            color,
            width: MIN_BRUSH_WIDTH,
        };
        state.set_width(width);
        state
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        if self.tool != tool {
            log::info!("Tool changed: {} -> {}", self.tool.name(), tool.name());
        }
        self.tool = tool;
    }

    pub fn color(&self) -> Rgba<u8> {
        self.color
    }

    pub fn set_color(&mut self, color: Rgba<u8>) {
        self.color = color;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Widths outside the slider range are clamped into it.
    pub fn set_width(&mut self, width: u32) {
        self.width = width.clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH);
    }

    /// Style for a stroke starting now on a canvas with `background`.
    pub fn stroke_style(&self, background: Rgba<u8>) -> StrokeStyle {
        match self.tool {
            ToolKind::Brush => StrokeStyle::brush(self.color, self.width),
            ToolKind::Eraser => StrokeStyle::eraser(background, self.width),
        }
    }
}

mod hex_color {
    use image::Rgba;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(color: &Rgba<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&crate::color::to_hex(*color))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Rgba<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        crate::color::parse_hex(&text)
            .ok_or_else(|| D::Error::custom(format!("invalid color: {text}")))
    }
}
