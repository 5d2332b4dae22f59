//! The drawable context the renderer paints into.
//!
//! [`Canvas`] is the small subset of a 2D immediate-mode API the surface needs. All
//! coordinates are logical pixels; implementations map them onto their own backing store.
//! [`PixelCanvas`] is the software implementation: an RGBA8 buffer sized
//! `logical size × pixel ratio`, filled with scanline rasterization and source-over blending.

use crate::{
    projector::Viewport,
    types::{ScreenPoint, Value},
};

/// Straight (non-premultiplied) colour with a fractional alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: Value,
}

impl Rgba {
    pub const fn rgb(rgb: [u8; 3]) -> Self {
        Self {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a: 1.0,
        }
    }

    pub const fn with_alpha(self, a: Value) -> Self {
        Self { a, ..self }
    }

    pub fn rgb_triple(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
}

/// A text run requested by the painter.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    /// Anchor in logical pixels.
    pub position: ScreenPoint,
    pub color: Rgba,
    /// Font size in logical pixels.
    pub size: Value,
    pub align: TextAlign,
}

pub trait Canvas {
    /// Replaces every pixel with `color` and forgets previously drawn text.
    fn clear(&mut self, color: Rgba);

    /// Fills a simple polygon (even-odd rule).
    fn fill_polygon(&mut self, points: &[ScreenPoint], color: Rgba);

    /// Outlines a closed polygon.
    fn stroke_polygon(&mut self, points: &[ScreenPoint], color: Rgba, width: Value) {
        for (i, from) in points.iter().enumerate() {
            let to = &points[(i + 1) % points.len()];
            self.line(from, to, color, width);
        }
    }

    fn line(&mut self, from: &ScreenPoint, to: &ScreenPoint, color: Rgba, width: Value);

    fn fill_circle(&mut self, center: &ScreenPoint, radius: Value, color: Rgba);

    fn fill_text(&mut self, label: Label);
}

/// Software [`Canvas`] over an RGBA8 buffer.
///
/// Text cannot be rasterized here; [`fill_text`](Canvas::fill_text) records [`Label`]s
/// that the host composites on top of the pixels.
#[derive(Debug, Clone)]
pub struct PixelCanvas {
    viewport: Viewport,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    labels: Vec<Label>,
}

impl PixelCanvas {
    pub fn new(viewport: Viewport) -> Self {
        let (width, height) = viewport.backing_size();
        Self {
            viewport,
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            labels: Vec::new(),
        }
    }

    /// Adopts a new viewport, reallocating the backing store when its pixel size changes.
    ///
    /// Returns `true` if the buffer was reallocated.
    pub fn set_viewport(&mut self, viewport: Viewport) -> bool {
        self.viewport = viewport;
        let (width, height) = viewport.backing_size();
        if (width, height) == (self.width, self.height) {
            return false;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width as usize * height as usize * 4];
        self.labels.clear();
        true
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Backing-store width in device pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Backing-store height in device pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major RGBA8 pixels.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Text recorded since the last [`clear`](Canvas::clear).
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// RGBA of device pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    #[inline]
    fn to_device(&self, p: &ScreenPoint) -> (Value, Value) {
        (p.x * self.viewport.pixel_ratio, p.y * self.viewport.pixel_ratio)
    }

    /// Source-over blend of `color` onto device pixel `(x, y)`; out-of-range pixels are ignored.
    fn blend(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let a = color.a.clamp(0.0, 1.0);
        if !(a > 0.0) {
            return;
        }
        let i = self.offset(x as u32, y as u32);
        let dst = &mut self.pixels[i..i + 4];
        for (channel, src) in dst.iter_mut().zip(color.rgb_triple()) {
            *channel = (src as Value * a + *channel as Value * (1.0 - a)).round() as u8;
        }
        dst[3] = (255.0 * a + dst[3] as Value * (1.0 - a)).round() as u8;
    }

    /// Blends every pixel whose centre lies within `half_width` of `(cx, cy)` on both axes.
    fn stamp(&mut self, cx: Value, cy: Value, half_width: Value, color: Rgba) {
        let x0 = (cx - half_width).round() as i64;
        let x1 = ((cx + half_width).round() as i64).max(x0 + 1);
        let y0 = (cy - half_width).round() as i64;
        let y1 = ((cy + half_width).round() as i64).max(y0 + 1);
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, color);
            }
        }
    }
}

impl Canvas for PixelCanvas {
    fn clear(&mut self, color: Rgba) {
        let alpha = (color.a.clamp(0.0, 1.0) * 255.0).round() as u8;
        let rgba = [color.r, color.g, color.b, alpha];
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
        self.labels.clear();
    }

    fn fill_polygon(&mut self, points: &[ScreenPoint], color: Rgba) {
        if points.len() < 3 || !(color.a > 0.0) {
            return;
        }
        let device: Vec<(Value, Value)> = points.iter().map(|p| self.to_device(p)).collect();
        if device.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return;
        }

        let (min_y, max_y) = device
            .iter()
            .fold((Value::INFINITY, Value::NEG_INFINITY), |(lo, hi), &(_, y)| {
                (lo.min(y), hi.max(y))
            });
        let y_start = ((min_y - 0.5).ceil() as i64).max(0);
        let y_end = ((max_y - 0.5).floor() as i64).min(self.height as i64 - 1);

        // pixel (x, y) is covered when its centre (x + 0.5, y + 0.5) is inside; shared
        // edges between neighbouring polygons are therefore covered exactly once
        let mut crossings: Vec<Value> = Vec::with_capacity(device.len());
        for y in y_start..=y_end {
            let sy = y as Value + 0.5;
            crossings.clear();
            for (i, &(x0, y0)) in device.iter().enumerate() {
                let (x1, y1) = device[(i + 1) % device.len()];
                if (y0 <= sy && y1 > sy) || (y1 <= sy && y0 > sy) {
                    crossings.push(x0 + (sy - y0) / (y1 - y0) * (x1 - x0));
                }
            }
            crossings.sort_by(Value::total_cmp);
            for span in crossings.chunks_exact(2) {
                let x_start = ((span[0] - 0.5).ceil() as i64).max(0);
                let x_end = ((span[1] - 0.5).ceil() as i64).min(self.width as i64);
                for x in x_start..x_end {
                    self.blend(x, y, color);
                }
            }
        }
    }

    fn line(&mut self, from: &ScreenPoint, to: &ScreenPoint, color: Rgba, width: Value) {
        let (x0, y0) = self.to_device(from);
        let (x1, y1) = self.to_device(to);
        if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
            return;
        }
        let half_width = (width * self.viewport.pixel_ratio * 0.5).max(0.5);
        let bounds = (self.width as Value, self.height as Value);
        let Some((t0, t1)) = clip_segment((x0, y0), (x1, y1), bounds, half_width + 1.0) else {
            return;
        };
        let (dx, dy) = (x1 - x0, y1 - y0);
        let (x0, y0, x1, y1) = (x0 + dx * t0, y0 + dy * t0, x0 + dx * t1, y0 + dy * t1);
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;
        for step in 0..=steps {
            let t = step as Value / steps as Value;
            self.stamp(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t, half_width, color);
        }
    }

    fn fill_circle(&mut self, center: &ScreenPoint, radius: Value, color: Rgba) {
        let (cx, cy) = self.to_device(center);
        let r = radius * self.viewport.pixel_ratio;
        if !(cx.is_finite() && cy.is_finite() && r > 0.0) {
            return;
        }
        let x0 = ((cx - r).floor() as i64).max(0);
        let x1 = ((cx + r).ceil() as i64).min(self.width as i64);
        let y0 = ((cy - r).floor() as i64).max(0);
        let y1 = ((cy + r).ceil() as i64).min(self.height as i64);
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as Value + 0.5 - cx;
                let dy = y as Value + 0.5 - cy;
                if dx * dx + dy * dy <= r * r {
                    self.blend(x, y, color);
                }
            }
        }
    }

    fn fill_text(&mut self, label: Label) {
        self.labels.push(label);
    }
}

/// Liang–Barsky clip of a device-space segment against the canvas grown by `margin`.
///
/// Returns the parameter range `[t0, t1]` of the visible part, or `None` if it misses.
fn clip_segment(
    from: (Value, Value),
    to: (Value, Value),
    bounds: (Value, Value),
    margin: Value,
) -> Option<(Value, Value)> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let mut t0: Value = 0.0;
    let mut t1: Value = 1.0;
    for (p, q) in [
        (-dx, from.0 + margin),
        (dx, bounds.0 + margin - from.0),
        (-dy, from.1 + margin),
        (dy, bounds.1 + margin - from.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else if p < 0.0 {
            t0 = t0.max(q / p);
        } else {
            t1 = t1.min(q / p);
        }
    }
    (t0 <= t1).then_some((t0, t1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba = Rgba::rgb([255, 255, 255]);
    const BLACK: Rgba = Rgba::rgb([0, 0, 0]);

    fn canvas(width: f32, height: f32, ratio: f32) -> PixelCanvas {
        let mut canvas = PixelCanvas::new(Viewport::new(width, height, ratio).unwrap());
        canvas.clear(BLACK);
        canvas
    }

    fn square(x0: f32, y0: f32, x1: f32, y1: f32) -> [ScreenPoint; 4] {
        [
            ScreenPoint::new(x0, y0),
            ScreenPoint::new(x1, y0),
            ScreenPoint::new(x1, y1),
            ScreenPoint::new(x0, y1),
        ]
    }

    fn lit(canvas: &PixelCanvas) -> usize {
        canvas.pixels().chunks_exact(4).filter(|px| px[0] > 0).count()
    }

    #[test]
    fn backing_store_follows_pixel_ratio() {
        let mut canvas = canvas(10.0, 5.0, 2.0);
        assert_eq!((canvas.width(), canvas.height()), (20, 10));
        assert_eq!(canvas.pixels().len(), 20 * 10 * 4);

        assert!(canvas.set_viewport(Viewport::new(10.0, 5.0, 3.0).unwrap()));
        assert_eq!((canvas.width(), canvas.height()), (30, 15));
        assert!(!canvas.set_viewport(Viewport::new(10.0, 5.0, 3.0).unwrap()));
    }

    #[test]
    fn fills_axis_aligned_square_exactly() {
        let mut canvas = canvas(10.0, 10.0, 1.0);
        canvas.fill_polygon(&square(2.0, 3.0, 6.0, 5.0), WHITE);
        assert_eq!(lit(&canvas), 4 * 2);
        assert_eq!(canvas.pixel(2, 3), [255, 255, 255, 255]);
        assert_eq!(canvas.pixel(5, 4), [255, 255, 255, 255]);
        assert_eq!(canvas.pixel(6, 4)[0], 0);
        assert_eq!(canvas.pixel(2, 5)[0], 0);
    }

    #[test]
    fn logical_coordinates_scale_with_ratio() {
        let mut canvas = canvas(10.0, 10.0, 2.0);
        canvas.fill_polygon(&square(2.0, 3.0, 6.0, 5.0), WHITE);
        assert_eq!(lit(&canvas), 8 * 4);
    }

    #[test]
    fn shared_edges_are_blended_once() {
        let mut canvas = canvas(10.0, 10.0, 1.0);
        let half = WHITE.with_alpha(0.5);
        canvas.fill_polygon(&square(0.0, 0.0, 4.0, 4.0), half);
        canvas.fill_polygon(&square(4.0, 0.0, 8.0, 4.0), half);
        let values: Vec<u8> = (0..8).map(|x| canvas.pixel(x, 1)[0]).collect();
        assert!(values.iter().all(|&v| v == values[0]), "{values:?}");
        assert_eq!(values[0], 128);
    }

    #[test]
    fn alpha_blends_over_existing_pixels() {
        let mut canvas = canvas(4.0, 4.0, 1.0);
        canvas.fill_polygon(&square(0.0, 0.0, 4.0, 4.0), Rgba::rgb([200, 100, 0]).with_alpha(0.25));
        assert_eq!(canvas.pixel(1, 1), [50, 25, 0, 255]);
        canvas.fill_polygon(&square(0.0, 0.0, 4.0, 4.0), Rgba::rgb([200, 100, 0]).with_alpha(0.0));
        assert_eq!(canvas.pixel(1, 1), [50, 25, 0, 255]);
    }

    #[test]
    fn skips_non_finite_geometry() {
        let mut canvas = canvas(4.0, 4.0, 1.0);
        let mut poly = square(0.0, 0.0, 4.0, 4.0);
        poly[1].x = f32::NAN;
        canvas.fill_polygon(&poly, WHITE);
        canvas.fill_circle(&ScreenPoint::new(f32::INFINITY, 1.0), 2.0, WHITE);
        canvas.fill_polygon(&square(0.0, 0.0, 4.0, 4.0), WHITE.with_alpha(f32::NAN));
        assert_eq!(lit(&canvas), 0);
    }

    #[test]
    fn circle_covers_its_center_only() {
        let mut canvas = canvas(20.0, 20.0, 1.0);
        canvas.fill_circle(&ScreenPoint::new(10.0, 10.0), 2.0, WHITE);
        assert_eq!(canvas.pixel(10, 10)[0], 255);
        assert_eq!(canvas.pixel(9, 9)[0], 255);
        assert_eq!(canvas.pixel(13, 10)[0], 0);
        assert_eq!(canvas.pixel(0, 0)[0], 0);
        let count = lit(&canvas);
        assert!((10..=16).contains(&count), "{count}");
    }

    #[test]
    fn line_draws_continuous_run() {
        let mut canvas = canvas(20.0, 5.0, 1.0);
        canvas.line(&ScreenPoint::new(2.0, 2.5), &ScreenPoint::new(12.0, 2.5), WHITE, 1.0);
        for x in 2..12 {
            assert_eq!(canvas.pixel(x, 2)[0], 255, "gap at {x}");
        }
        assert_eq!(canvas.pixel(15, 2)[0], 0);
    }

    #[test]
    fn huge_lines_are_clipped_to_the_canvas() {
        let mut canvas = canvas(20.0, 5.0, 1.0);
        canvas.line(&ScreenPoint::new(-1e9, 2.5), &ScreenPoint::new(1e9, 2.5), WHITE, 1.0);
        for x in 0..20 {
            assert_eq!(canvas.pixel(x, 2)[0], 255, "gap at {x}");
        }
        canvas.line(&ScreenPoint::new(-1e9, -1e9), &ScreenPoint::new(-1e9, 1e9), WHITE, 1.0);
        canvas.fill_circle(&ScreenPoint::new(10.0, 2.0), 1e9, WHITE);
        assert_eq!(lit(&canvas), 20 * 5);
    }

    #[test]
    fn text_is_recorded_until_clear() {
        let mut canvas = canvas(4.0, 4.0, 1.0);
        canvas.fill_text(Label {
            text: "peak".into(),
            position: ScreenPoint::new(1.0, 1.0),
            color: WHITE,
            size: 12.0,
            align: TextAlign::Center,
        });
        assert_eq!(canvas.labels().len(), 1);
        canvas.clear(BLACK);
        assert!(canvas.labels().is_empty());
    }
}
