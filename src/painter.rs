//! Painter's-algorithm drawing of the surface and its overlays.
//!
//! Occlusion comes purely from paint order: faces are sorted farthest first and each one
//! paints over whatever lies behind it. This is only correct because a height-mapped
//! surface of a well-behaved (unimodal) field never overlaps itself along a view ray in a
//! way that the average-depth order gets wrong. Nothing checks that precondition.
//!
//! Paint order per frame:
//! ```text
//! background → floor reference lines → faces (far → near) → scatter points → labels
//! ```
//! Reference lines and scatter points sit at height ≈ 0, below the whole surface, so they
//! are layered before/after the mesh instead of being depth-sorted against it.

use crate::{
    canvas::{Canvas, Label, Rgba, TextAlign},
    field::ScalarField,
    interp::{lerp, mix_rgb},
    mesh::Face,
    projector::Projector,
    scatter::ScatterPoint,
    theme::Palette,
    types::{Point, ScreenPoint, Value},
};

/// Text drawn on top of the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceLabels {
    pub axis_x: String,
    pub axis_z: String,
    /// Prefix of the peak annotation; the peak density is appended.
    pub peak: String,
    /// Shown only while the camera is idle.
    pub hint: String,
    pub font_size: Value,
}

impl Default for SurfaceLabels {
    fn default() -> Self {
        Self {
            axis_x: "x".into(),
            axis_z: "y".into(),
            peak: "peak density".into(),
            hint: "drag to rotate".into(),
            font_size: 13.0,
        }
    }
}

/// Sorts faces farthest first. Stable, so equal depths keep grid order.
pub fn sort_faces(faces: &mut [Face]) {
    faces.sort_by(|a, b| b.depth.total_cmp(&a.depth));
}

/// Fill colour of a face: both alpha and brightness rise with normalized density.
pub fn face_fill(density: Value, palette: &Palette) -> Rgba {
    let dim = palette.accent.map(|c| (c as Value * 0.45).round() as u8);
    let bright = mix_rgb(palette.accent, [255, 255, 255], 0.4);
    Rgba::rgb(mix_rgb(dim, bright, density)).with_alpha(lerp(0.18, 0.92, density))
}

/// Faint wireframe outline drawn around every face.
pub fn face_stroke(palette: &Palette) -> Rgba {
    let alpha = if palette.dark { 0.14 } else { 0.22 };
    Rgba::rgb(palette.accent).with_alpha(alpha)
}

/// Domain grid at height 0, `divisions` steps per axis.
pub fn paint_reference_lines<C: Canvas + ?Sized>(
    canvas: &mut C,
    radius: Value,
    divisions: usize,
    projector: &Projector,
    palette: &Palette,
) {
    let color = Rgba::rgb(palette.accent).with_alpha(0.1);
    let divisions = divisions.max(1);
    let step = 2.0 * radius / divisions as Value;
    for i in 0..=divisions {
        let t = -radius + i as Value * step;
        let segments = [
            (Point::new(t, 0.0, -radius), Point::new(t, 0.0, radius)),
            (Point::new(-radius, 0.0, t), Point::new(radius, 0.0, t)),
        ];
        for (from, to) in segments {
            let from = projector.project(&from).screen;
            let to = projector.project(&to).screen;
            canvas.line(&from, &to, color, 1.0);
        }
    }
}

/// Paints faces in slice order; call [`sort_faces`] first.
pub fn paint_faces<C: Canvas + ?Sized>(canvas: &mut C, faces: &[Face], palette: &Palette) {
    let stroke = face_stroke(palette);
    for face in faces {
        canvas.fill_polygon(&face.screen, face_fill(face.density, palette));
        canvas.stroke_polygon(&face.screen, stroke, 0.6);
    }
}

pub fn paint_scatter<C: Canvas + ?Sized>(
    canvas: &mut C,
    points: &[ScatterPoint],
    projector: &Projector,
    palette: &Palette,
) {
    let color = Rgba::rgb(mix_rgb(palette.accent, palette.foreground(), 0.35)).with_alpha(0.6);
    for point in points {
        let projected = projector.project(&point.position());
        canvas.fill_circle(&projected.screen, 1.8, color);
    }
}

/// World-space anchors of the x-axis tag, the z-axis tag and the peak annotation.
pub fn label_anchors(field: &ScalarField) -> [Point; 3] {
    let reach = field.radius * 1.12;
    let peak_height = field.max_density * field.height_scale;
    [
        Point::new(reach, 0.0, 0.0),
        Point::new(0.0, 0.0, reach),
        Point::new(field.peak.0, peak_height + 0.3, field.peak.1),
    ]
}

/// Axis tags, the peak annotation, and (while idle) the interaction hint.
pub fn paint_labels<C: Canvas + ?Sized>(
    canvas: &mut C,
    labels: &SurfaceLabels,
    field: &ScalarField,
    projector: &Projector,
    palette: &Palette,
    show_hint: bool,
) {
    let strong = Rgba::rgb(palette.foreground());
    let muted = strong.with_alpha(0.55);
    let [axis_x, axis_z, above_peak] = label_anchors(field).map(|p| projector.project(&p).screen);

    let mut label = |text: &str, position: ScreenPoint, color: Rgba| {
        canvas.fill_text(Label {
            text: text.to_owned(),
            position,
            color,
            size: labels.font_size,
            align: TextAlign::Center,
        });
    };

    label(&labels.axis_x, axis_x, muted);
    label(&labels.axis_z, axis_z, muted);
    label(
        &format!("{} {:.3}", labels.peak, field.max_density),
        above_peak,
        strong,
    );

    if show_hint {
        let viewport = projector.viewport();
        label(
            &labels.hint,
            ScreenPoint::new(viewport.width * 0.5, viewport.height - 2.0 * labels.font_size),
            muted,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        field::Grid,
        mesh::build_faces,
        projector::{ProjectionParams, Viewport},
        theme::Theme,
    };

    #[derive(Debug, PartialEq)]
    enum Op {
        Fill(Vec<ScreenPoint>),
        Line,
        Circle,
        Text(String),
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
    }

    impl Canvas for Recorder {
        fn clear(&mut self, _color: Rgba) {
            self.ops.clear();
        }
        fn fill_polygon(&mut self, points: &[ScreenPoint], _color: Rgba) {
            self.ops.push(Op::Fill(points.to_vec()));
        }
        fn line(&mut self, _from: &ScreenPoint, _to: &ScreenPoint, _color: Rgba, _width: Value) {
            self.ops.push(Op::Line);
        }
        fn fill_circle(&mut self, _center: &ScreenPoint, _radius: Value, _color: Rgba) {
            self.ops.push(Op::Circle);
        }
        fn fill_text(&mut self, label: Label) {
            self.ops.push(Op::Text(label.text));
        }
    }

    fn scene() -> (ScalarField, Grid) {
        let field = ScalarField::bivariate_normal(0.72, 2.8, 1.7).unwrap();
        let grid = Grid::build(&field, 10).unwrap();
        (field, grid)
    }

    #[test]
    fn faces_sort_farthest_first_for_every_yaw() {
        let (_, grid) = scene();
        for i in 0..24 {
            let yaw = i as Value * 0.27;
            let projector = Projector::new(yaw, Viewport::default(), ProjectionParams::default());
            let mut faces = build_faces(&grid, &projector);
            sort_faces(&mut faces);
            for pair in faces.windows(2) {
                assert!(pair[0].depth >= pair[1].depth, "yaw {yaw}");
            }
        }
    }

    #[test]
    fn sort_is_stable_for_equal_depths() {
        let (_, grid) = scene();
        let projector = Projector::new(0.0, Viewport::default(), ProjectionParams::default());
        let mut faces = build_faces(&grid, &projector);
        for face in &mut faces {
            face.depth = 1.0;
        }
        let before: Vec<_> = faces.iter().map(|f| f.cell).collect();
        sort_faces(&mut faces);
        let after: Vec<_> = faces.iter().map(|f| f.cell).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn fill_rises_with_density() {
        for theme in [Theme::Dark, Theme::Light] {
            let palette = theme.palette();
            let mut previous = face_fill(0.0, &palette);
            for step in 1..=10 {
                let fill = face_fill(step as Value / 10.0, &palette);
                assert!(fill.a > previous.a);
                assert!(sum_channels(fill) >= sum_channels(previous));
                previous = fill;
            }
            assert!(sum_channels(face_fill(1.0, &palette)) > sum_channels(face_fill(0.0, &palette)));
        }
    }

    fn sum_channels(c: Rgba) -> u32 {
        c.r as u32 + c.g as u32 + c.b as u32
    }

    #[test]
    fn faces_are_painted_in_slice_order_with_outlines() {
        let (_, grid) = scene();
        let projector = Projector::new(0.8, Viewport::default(), ProjectionParams::default());
        let mut faces = build_faces(&grid, &projector);
        sort_faces(&mut faces);
        let mut recorder = Recorder::default();
        paint_faces(&mut recorder, &faces, &Theme::Dark.palette());

        let fills: Vec<&Vec<ScreenPoint>> = recorder
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Fill(points) => Some(points),
                _ => None,
            })
            .collect();
        assert_eq!(fills.len(), faces.len());
        for (fill, face) in fills.iter().zip(&faces) {
            assert_eq!(fill.as_slice(), face.screen.as_slice());
        }
        let lines = recorder.ops.iter().filter(|op| **op == Op::Line).count();
        assert_eq!(lines, faces.len() * 4);
    }

    #[test]
    fn labels_include_hint_only_when_idle() {
        let (field, _) = scene();
        let projector = Projector::new(0.0, Viewport::default(), ProjectionParams::default());
        let labels = SurfaceLabels::default();
        let palette = Theme::Light.palette();

        let mut idle = Recorder::default();
        paint_labels(&mut idle, &labels, &field, &projector, &palette, true);
        let mut dragging = Recorder::default();
        paint_labels(&mut dragging, &labels, &field, &projector, &palette, false);

        assert!(idle.ops.contains(&Op::Text("drag to rotate".into())));
        assert!(!dragging.ops.contains(&Op::Text("drag to rotate".into())));
        assert_eq!(idle.ops.len(), dragging.ops.len() + 1);
        assert!(dragging.ops.contains(&Op::Text(format!("peak density {:.3}", field.max_density))));
    }

    #[test]
    fn reference_grid_has_two_lines_per_division() {
        let projector = Projector::new(0.0, Viewport::default(), ProjectionParams::default());
        let mut recorder = Recorder::default();
        paint_reference_lines(&mut recorder, 2.8, 8, &projector, &Theme::Dark.palette());
        assert_eq!(recorder.ops.len(), 2 * 9);
        assert!(recorder.ops.iter().all(|op| *op == Op::Line));
    }
}
