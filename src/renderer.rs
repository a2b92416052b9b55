use egui::{Pos2, Vec2};
use image::{Rgba, RgbaImage};

use crate::stroke::{MutableStroke, Stroke, StrokeRef, StrokeStyle};

/// The pixel buffer the drawing is painted onto.
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
    background: Rgba<u8>,
}

impl Surface {
    /// Creates a surface already cleared to `background`
    pub fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, background),
            background,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn background(&self) -> Rgba<u8> {
        self.background
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        (x < self.width() && y < self.height()).then(|| *self.pixels.get_pixel(x, y))
    }

    pub fn clear(&mut self) {
        let background = self.background;
        for pixel in self.pixels.pixels_mut() {
            *pixel = background;
        }
    }

    /// Copy of the pixels as an egui image, for uploading to a texture
    pub fn to_color_image(&self) -> egui::ColorImage {
        egui::ColorImage::from_rgba_unmultiplied(
            [self.width() as usize, self.height() as usize],
            self.pixels.as_raw(),
        )
    }
}

/// Paints strokes onto a [`Surface`].
///
/// Every repaint is a full replay: the surface is cleared and every committed
/// stroke is drawn again in log order, so later strokes cover earlier ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Clear the surface and paint `strokes` in order.
    pub fn render(&self, surface: &mut Surface, strokes: &[StrokeRef]) {
        surface.clear();
        for stroke in strokes {
            self.paint_stroke(surface, stroke);
        }
        log::debug!(
            "Rendered {} strokes onto {}x{} surface",
            strokes.len(),
            surface.width(),
            surface.height()
        );
    }

    pub fn paint_stroke(&self, surface: &mut Surface, stroke: &Stroke) {
        paint_polyline(surface, stroke.points(), stroke.style());
    }

    /// Paint the whole in-progress stroke, used after a full replay mid-gesture.
    pub fn paint_preview(&self, surface: &mut Surface, stroke: &MutableStroke) {
        if stroke.points().len() >= 2 {
            paint_polyline(surface, stroke.points(), stroke.style());
        }
    }

    /// Paint only the newest segment of a gesture on top of what is there.
    pub fn paint_live_segment(&self, surface: &mut Surface, stroke: &MutableStroke) {
        if let Some(segment) = stroke.last_segment() {
            paint_polyline(surface, &segment, stroke.style());
        }
    }
}

fn paint_polyline(surface: &mut Surface, points: &[Pos2], style: StrokeStyle) {
    let color = if style.is_eraser {
        surface.background()
    } else {
        style.color
    };
    let radius = style.width as f32 / 2.0;

    let Some(mut mask) = CoverageMask::around(points, radius, surface.width(), surface.height())
    else {
        return;
    };

    for pair in points.windows(2) {
        mask.cover_segment(pair[0], pair[1], radius);
    }

    for (x, y) in mask.covered() {
        let pixel = surface.pixels.get_pixel_mut(x, y);
        *pixel = blend(*pixel, color);
    }
}

/// Pixels touched by one stroke, so each pixel is blended at most once.
struct CoverageMask {
    min_x: u32,
    min_y: u32,
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl CoverageMask {
    fn around(points: &[Pos2], radius: f32, surface_width: u32, surface_height: u32) -> Option<Self> {
        let (min_x, min_y, max_x, max_y) =
            pixel_bounds(points, radius, surface_width, surface_height)?;
        let width = max_x - min_x + 1;
        let height = max_y - min_y + 1;
        Some(Self {
            min_x,
            min_y,
            width,
            height,
            bits: vec![false; (width * height) as usize],
        })
    }

    fn cover_segment(&mut self, start: Pos2, end: Pos2, radius: f32) {
        let Some((x0, y0, x1, y1)) = pixel_bounds(
            &[start, end],
            radius,
            self.min_x + self.width,
            self.min_y + self.height,
        ) else {
            return;
        };

        for y in y0.max(self.min_y)..=y1 {
            for x in x0.max(self.min_x)..=x1 {
                let center = Pos2::new(x as f32 + 0.5, y as f32 + 0.5);
                if distance_to_line_segment(center, start, end) <= radius {
                    let index = ((y - self.min_y) * self.width + (x - self.min_x)) as usize;
                    self.bits[index] = true;
                }
            }
        }
    }

    fn covered(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, covered)| **covered)
            .map(|(index, _)| {
                let index = index as u32;
                (self.min_x + index % self.width, self.min_y + index / self.width)
            })
    }
}

/// Inclusive pixel box around `points` padded by `radius`, clipped to
/// `0..limit_x` by `0..limit_y`. `None` when nothing is on the surface.
fn pixel_bounds(points: &[Pos2], radius: f32, limit_x: u32, limit_y: u32) -> Option<(u32, u32, u32, u32)> {
    if points.is_empty() || limit_x == 0 || limit_y == 0 {
        return None;
    }

    let mut min = Pos2::new(f32::INFINITY, f32::INFINITY);
    let mut max = Pos2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
    for point in points {
        min = min.min(*point);
        max = max.max(*point);
    }

    let lo_x = (min.x - radius).floor();
    let lo_y = (min.y - radius).floor();
    let hi_x = (max.x + radius).ceil();
    let hi_y = (max.y + radius).ceil();

    if !(lo_x.is_finite() && lo_y.is_finite() && hi_x.is_finite() && hi_y.is_finite()) {
        return None;
    }
    if hi_x < 0.0 || hi_y < 0.0 || lo_x >= limit_x as f32 || lo_y >= limit_y as f32 {
        return None;
    }

    Some((
        lo_x.max(0.0) as u32,
        lo_y.max(0.0) as u32,
        (hi_x as u32).min(limit_x - 1),
        (hi_y as u32).min(limit_y - 1),
    ))
}

/// Calculate distance from a point to a line segment
pub(crate) fn distance_to_line_segment(point: Pos2, line_start: Pos2, line_end: Pos2) -> f32 {
    let line_vec: Vec2 = line_end - line_start;
    let point_vec: Vec2 = point - line_start;

    let line_len = line_vec.length();
    if line_len == 0.0 {
        return point_vec.length();
    }

    let t = ((point_vec.x * line_vec.x + point_vec.y * line_vec.y) / line_len).clamp(0.0, line_len);
    let projection = line_start + (line_vec * t / line_len);
    (point - projection).length()
}

/// Source-over compositing with straight alpha, in integer arithmetic.
fn blend(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let src_a = src.0[3] as u32;
    if src_a == 255 {
        return src;
    }
    if src_a == 0 {
        return dst;
    }

    let dst_a = dst.0[3] as u32;
    // Output alpha scaled by 255
    let out_a = src_a * 255 + dst_a * (255 - src_a);
    if out_a == 0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for channel in 0..3 {
        let s = src.0[channel] as u32 * src_a * 255;
        let d = dst.0[channel] as u32 * dst_a * (255 - src_a);
        out[channel] = ((s + d + out_a / 2) / out_a) as u8;
    }
    out[3] = ((out_a + 127) / 255) as u8;
    Rgba(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, WHITE};
    use egui::pos2;
    use std::sync::Arc;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn stroke(style: StrokeStyle, points: &[(f32, f32)]) -> StrokeRef {
        let points = points.iter().map(|&(x, y)| pos2(x, y)).collect();
        Arc::new(Stroke::new(style, points).unwrap())
    }

    #[test]
    fn empty_log_renders_blank_surface() {
        let mut surface = Surface::new(8, 8, WHITE);
        Renderer::new().render(&mut surface, &[]);
        assert!(surface.pixels().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn horizontal_line_covers_its_row() {
        let mut surface = Surface::new(20, 10, WHITE);
        let line = stroke(StrokeStyle::brush(BLACK, 2), &[(2.0, 5.0), (17.0, 5.0)]);
        Renderer::new().render(&mut surface, &[line]);

        assert_eq!(surface.pixel(10, 4), Some(BLACK));
        assert_eq!(surface.pixel(10, 5), Some(BLACK));
        assert_eq!(surface.pixel(10, 0), Some(WHITE));
        assert_eq!(surface.pixel(10, 9), Some(WHITE));
    }

    #[test]
    fn later_strokes_paint_over_earlier_ones() {
        let mut surface = Surface::new(20, 20, WHITE);
        let red = stroke(StrokeStyle::brush(RED, 4), &[(0.0, 10.0), (20.0, 10.0)]);
        let black = stroke(StrokeStyle::brush(BLACK, 4), &[(10.0, 0.0), (10.0, 20.0)]);

        Renderer::new().render(&mut surface, &[red.clone(), black.clone()]);
        assert_eq!(surface.pixel(10, 10), Some(BLACK));

        Renderer::new().render(&mut surface, &[black, red]);
        assert_eq!(surface.pixel(10, 10), Some(RED));
    }

    #[test]
    fn eraser_paints_background_color() {
        let mut surface = Surface::new(20, 20, WHITE);
        let ink = stroke(StrokeStyle::brush(RED, 6), &[(0.0, 10.0), (20.0, 10.0)]);
        let eraser = stroke(StrokeStyle::eraser(BLACK, 6), &[(10.0, 0.0), (10.0, 20.0)]);
        Renderer::new().render(&mut surface, &[ink, eraser]);

        assert_eq!(surface.pixel(10, 10), Some(WHITE));
        assert_eq!(surface.pixel(2, 10), Some(RED));
    }

    #[test]
    fn translucent_stroke_blends_once_where_segments_overlap() {
        let translucent = Rgba([0, 0, 0, 128]);
        let mut surface = Surface::new(20, 20, WHITE);
        let zigzag = stroke(
            StrokeStyle::brush(translucent, 4),
            &[(2.0, 10.0), (10.0, 10.0), (2.0, 10.0), (18.0, 10.0)],
        );
        Renderer::new().render(&mut surface, &[zigzag]);

        let once = blend(WHITE, translucent);
        assert_eq!(surface.pixel(6, 10), Some(once));
        assert_eq!(surface.pixel(14, 10), Some(once));
    }

    #[test]
    fn rendering_twice_is_pixel_identical() {
        let strokes = vec![
            stroke(StrokeStyle::brush(RED, 3), &[(1.0, 1.0), (30.0, 12.5), (4.0, 28.0)]),
            stroke(StrokeStyle::eraser(WHITE, 5), &[(0.0, 15.0), (31.0, 15.0)]),
        ];
        let mut first = Surface::new(32, 32, WHITE);
        let mut second = Surface::new(32, 32, WHITE);
        Renderer::new().render(&mut first, &strokes);
        Renderer::new().render(&mut second, &strokes);
        Renderer::new().render(&mut second, &strokes);
        assert_eq!(first.pixels(), second.pixels());
    }

    #[test]
    fn live_segments_match_full_replay_for_opaque_ink() {
        let style = StrokeStyle::brush(RED, 3);
        let path = [(2.0, 2.0), (12.0, 4.0), (12.0, 4.0), (20.0, 18.0), (5.0, 25.0)];

        let mut live = Surface::new(30, 30, WHITE);
        let mut gesture = MutableStroke::begin(pos2(path[0].0, path[0].1), style);
        for &(x, y) in &path[1..] {
            gesture.extend(pos2(x, y));
            Renderer::new().paint_live_segment(&mut live, &gesture);
        }

        let mut replay = Surface::new(30, 30, WHITE);
        let committed = Arc::new(gesture.finalize().unwrap());
        Renderer::new().render(&mut replay, &[committed]);

        assert_eq!(live.pixels(), replay.pixels());
    }

    #[test]
    fn strokes_off_the_surface_are_clipped() {
        let mut surface = Surface::new(10, 10, WHITE);
        let outside = stroke(StrokeStyle::brush(BLACK, 2), &[(-50.0, -50.0), (-20.0, -40.0)]);
        let crossing = stroke(StrokeStyle::brush(BLACK, 2), &[(-5.0, 5.0), (50.0, 5.0)]);
        Renderer::new().render(&mut surface, &[outside, crossing]);
        assert_eq!(surface.pixel(0, 5), Some(BLACK));
        assert_eq!(surface.pixel(9, 5), Some(BLACK));
        assert_eq!(surface.pixel(0, 0), Some(WHITE));
    }

    #[test]
    fn coincident_points_leave_a_round_dot() {
        let mut surface = Surface::new(10, 10, WHITE);
        let dot = stroke(StrokeStyle::brush(BLACK, 4), &[(5.0, 5.0), (5.0, 5.0)]);
        Renderer::new().render(&mut surface, &[dot]);
        assert_eq!(surface.pixel(5, 5), Some(BLACK));
        assert_eq!(surface.pixel(0, 0), Some(WHITE));
    }
}
