//! Wire format of a drawing and the boundary to wherever it is stored.
//!
//! Only committed strokes are serialized. Tool settings, the gesture in
//! progress and the undone stack never leave the session.

mod client;
mod store;

pub use client::{ClientError, PendingRequest, PersistenceClient};
pub use store::{DrawingId, DrawingRecord, DrawingStore, FileStore, StoreError, StoreResult};

use egui::Pos2;
use serde::{Deserialize, Serialize};

use crate::color;
use crate::stroke::{Stroke, StrokeRef, StrokeStyle};
use crate::tools::ToolKind;

/// One stroke as stored. Points are flattened to `[x0, y0, x1, y1, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeData {
    pub color: String,
    #[serde(alias = "size")]
    pub width: u32,
    pub points: Vec<f32>,
    #[serde(rename = "isEraser", alias = "erasing", default)]
    pub is_eraser: bool,
}

/// The `canvas_data` object of save and load messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasData {
    pub strokes: Vec<StrokeData>,
}

/// Summary recomputed from the log on every save. Never read back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawingMetadata {
    pub strokes_count: usize,
    /// Distinct colors in first-use order
    pub colors_used: Vec<String>,
    /// Distinct tools in first-use order
    pub tools_used: Vec<ToolKind>,
}

impl DrawingMetadata {
    pub fn derive(strokes: &[StrokeRef]) -> Self {
        let mut colors_used = Vec::new();
        let mut tools_used = Vec::new();
        for stroke in strokes {
            let color = color::to_hex(stroke.color());
            if !colors_used.contains(&color) {
                colors_used.push(color);
            }
            let tool = if stroke.is_eraser() {
                ToolKind::Eraser
            } else {
                ToolKind::Brush
            };
            if !tools_used.contains(&tool) {
                tools_used.push(tool);
            }
        }
        Self {
            strokes_count: strokes.len(),
            colors_used,
            tools_used,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub canvas_data: CanvasData,
    pub width: u32,
    pub height: u32,
    pub is_completed: bool,
    #[serde(flatten)]
    pub metadata: DrawingMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `canvas_data` stays untyped here; a malformed one means "nothing to load".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadResponse {
    #[serde(default)]
    pub canvas_data: Option<serde_json::Value>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub success: bool,
    #[serde(default)]
    pub new_drawing_id: Option<DrawingId>,
}

impl From<&Stroke> for StrokeData {
    fn from(stroke: &Stroke) -> Self {
        Self {
            color: color::to_hex(stroke.color()),
            width: stroke.width(),
            points: stroke.points().iter().flat_map(|p| [p.x, p.y]).collect(),
            is_eraser: stroke.is_eraser(),
        }
    }
}

impl StrokeData {
    /// Decode one stored stroke. `None` if it could never have been committed.
    pub fn to_stroke(&self) -> Option<Stroke> {
        if self.width == 0 || self.points.len() % 2 != 0 {
            return None;
        }
        let color = color::parse_hex(&self.color)?;
        let style = StrokeStyle {
            color,
            width: self.width,
            is_eraser: self.is_eraser,
        };
        let points = self
            .points
            .chunks_exact(2)
            .map(|xy| Pos2::new(xy[0], xy[1]))
            .collect();
        Stroke::new(style, points)
    }
}

pub fn encode_canvas_data(strokes: &[StrokeRef]) -> CanvasData {
    CanvasData {
        strokes: strokes.iter().map(|s| StrokeData::from(s.as_ref())).collect(),
    }
}

pub fn encode_save_request(strokes: &[StrokeRef], width: u32, height: u32, is_completed: bool) -> SaveRequest {
    SaveRequest {
        canvas_data: encode_canvas_data(strokes),
        width,
        height,
        is_completed,
        metadata: DrawingMetadata::derive(strokes),
    }
}

/// Decode a stored `canvas_data` value into strokes ready for `replace`.
///
/// A missing or malformed `strokes` field gives `None`. Individual entries
/// that are degenerate or unreadable are skipped.
pub fn decode_canvas_data(canvas_data: &serde_json::Value) -> Option<Vec<Stroke>> {
    let entries = canvas_data.get("strokes")?.as_array()?;

    let mut strokes = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let decoded = serde_json::from_value::<StrokeData>(entry.clone())
            .ok()
            .and_then(|data| data.to_stroke());
        match decoded {
            Some(stroke) => strokes.push(stroke),
            None => log::warn!("Skipping unreadable stroke #{index} in saved drawing"),
        }
    }
    Some(strokes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;
    use image::Rgba;
    use serde_json::json;
    use std::sync::Arc;

    fn stroke(color: Rgba<u8>, eraser: bool, points: &[(f32, f32)]) -> StrokeRef {
        let style = StrokeStyle {
            color,
            width: 4,
            is_eraser: eraser,
        };
        Arc::new(Stroke::new(style, points.iter().map(|&(x, y)| pos2(x, y)).collect()).unwrap())
    }

    #[test]
    fn stroke_wire_shape() {
        let data = StrokeData::from(stroke(Rgba([255, 0, 0, 255]), false, &[(0.0, 0.5), (10.0, 10.25)]).as_ref());
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({"color": "#ff0000", "width": 4, "points": [0.0, 0.5, 10.0, 10.25], "isEraser": false})
        );
    }

    #[test]
    fn legacy_field_names_decode() {
        let payload = json!({
            "strokes": [{"color": "#fff", "size": 12, "points": [1, 2, 3, 4], "erasing": true}]
        });
        let strokes = decode_canvas_data(&payload).unwrap();
        assert_eq!(strokes.len(), 1);
        assert!(strokes[0].is_eraser());
        assert_eq!(strokes[0].width(), 12);
        assert_eq!(strokes[0].points(), &[pos2(1.0, 2.0), pos2(3.0, 4.0)]);
    }

    #[test]
    fn missing_or_malformed_strokes_load_nothing() {
        assert!(decode_canvas_data(&json!({})).is_none());
        assert!(decode_canvas_data(&json!({"strokes": "nope"})).is_none());
        assert!(decode_canvas_data(&json!(null)).is_none());
        assert_eq!(decode_canvas_data(&json!({"strokes": []})), Some(vec![]));
    }

    #[test]
    fn degenerate_entries_are_skipped() {
        let payload = json!({"strokes": [
            {"color": "#000000", "width": 2, "points": [1, 1]},
            {"color": "#000000", "width": 2, "points": [1, 1, 2]},
            {"color": "#000000", "width": 0, "points": [1, 1, 2, 2]},
            {"color": "blue", "width": 2, "points": [1, 1, 2, 2]},
            {"color": "#000000", "points": [1, 1, 2, 2]},
            {"color": "#000000", "width": 2, "points": [1, 1, 2, 2]}
        ]});
        let strokes = decode_canvas_data(&payload).unwrap();
        assert_eq!(strokes.len(), 1);
    }

    #[test]
    fn width_given_under_both_names_is_skipped() {
        let payload = json!({"strokes": [
            {"color": "#ff0000", "width": 2, "size": 4, "points": [1, 1, 2, 2]},
            {"color": "#000000", "width": 3, "points": [5, 5, 6, 6]}
        ]});
        let strokes = decode_canvas_data(&payload).unwrap();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].width(), 3);
        assert_eq!(strokes[0].color(), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn metadata_is_distinct_in_first_use_order() {
        let red = Rgba([255, 0, 0, 255]);
        let white = Rgba([255, 255, 255, 255]);
        let strokes = vec![
            stroke(red, false, &[(0.0, 0.0), (1.0, 1.0)]),
            stroke(white, true, &[(0.0, 0.0), (1.0, 1.0)]),
            stroke(red, false, &[(0.0, 0.0), (1.0, 1.0)]),
        ];
        let metadata = DrawingMetadata::derive(&strokes);
        assert_eq!(metadata.strokes_count, 3);
        assert_eq!(metadata.colors_used, vec!["#ff0000", "#ffffff"]);
        assert_eq!(metadata.tools_used, vec![ToolKind::Brush, ToolKind::Eraser]);
    }

    #[test]
    fn save_request_flattens_metadata() {
        let strokes = vec![stroke(Rgba([0, 0, 0, 255]), false, &[(0.0, 0.0), (1.0, 1.0)])];
        let value = serde_json::to_value(encode_save_request(&strokes, 800, 600, false)).unwrap();
        assert_eq!(value["strokes_count"], 1);
        assert_eq!(value["tools_used"], json!(["brush"]));
        assert_eq!(value["width"], 800);
        assert_eq!(value["canvas_data"]["strokes"][0]["width"], 4);
    }
}
