//! Shape drawing shared by the on-screen canvas and the export compositor.
//!
//! Both targets implement [`Surface`] in world coordinates; each applies its
//! own transform (pan/zoom for the canvas, identity for export), so the
//! per-variant geometry below is written once.

use std::f32::consts::FRAC_PI_6;

use egui::{Pos2, Rect, Vec2};

use crate::hit_test::TextMeasure;
use crate::shape::{Color, Shape, ShapeKind, HIGHLIGHT_ALPHA};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f32,
}

impl StrokeStyle {
    pub fn new(color: Color, width: f32) -> Self {
        Self { color, width }
    }
}

/// Outline drawn around a blur region while it is being dragged out.
pub const BLUR_DRAFT_OUTLINE: StrokeStyle = StrokeStyle {
    color: Color::SELECTION,
    width: 1.0,
};
pub const BLUR_DRAFT_DASH: f32 = 5.0;

/// A 2D drawing target addressed in world coordinates.
pub trait Surface: TextMeasure {
    /// Blits the base image with its top-left corner at the world origin.
    fn draw_base_image(&mut self, size: Vec2);
    /// Draws the blurred copy of the base image, clipped to `clip`.
    fn draw_blurred_image(&mut self, clip: Rect);
    fn stroke_rect(&mut self, rect: Rect, stroke: StrokeStyle);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn stroke_ellipse(&mut self, center: Pos2, radii: Vec2, stroke: StrokeStyle);
    fn stroke_polyline(&mut self, points: &[Pos2], stroke: StrokeStyle);
    fn fill_polygon(&mut self, points: &[Pos2], color: Color);
    /// Fills `text` with its top edge at `pos.y`.
    fn fill_text(&mut self, pos: Pos2, text: &str, font_size: f32, color: Color);
    fn dashed_rect(&mut self, rect: Rect, stroke: StrokeStyle, dash: f32);
}

/// Everything needed to paint one frame.
#[derive(Clone, Copy)]
pub struct Scene<'a> {
    pub image_size: Option<Vec2>,
    pub shapes: &'a [Shape],
    pub draft: Option<&'a Shape>,
}

/// Base image, blur regions, the remaining shapes in z-order, then the draft.
pub fn render_scene(surface: &mut dyn Surface, scene: Scene<'_>) {
    if let Some(size) = scene.image_size {
        surface.draw_base_image(size);
        for shape in scene.shapes.iter().filter(|s| s.is_blur()) {
            surface.draw_blurred_image(shape.bounds());
        }
    }

    for shape in scene.shapes.iter().filter(|s| !s.is_blur()) {
        draw_shape(surface, shape);
    }

    match scene.draft {
        Some(draft) if draft.is_blur() => {
            if scene.image_size.is_some() {
                surface.draw_blurred_image(draft.bounds());
                surface.dashed_rect(draft.bounds(), BLUR_DRAFT_OUTLINE, BLUR_DRAFT_DASH);
            }
        }
        Some(draft) => draw_shape(surface, draft),
        None => {}
    }
}

pub fn draw_shape(surface: &mut dyn Surface, shape: &Shape) {
    let stroke = StrokeStyle::new(shape.color, shape.stroke_width);
    match &shape.kind {
        ShapeKind::Rect => surface.stroke_rect(shape.bounds(), stroke),
        ShapeKind::Highlight => {
            surface.fill_rect(shape.bounds(), shape.color.with_alpha(HIGHLIGHT_ALPHA))
        }
        ShapeKind::Circle => {
            let radii = shape.size / 2.0;
            surface.stroke_ellipse(shape.origin + radii, radii.abs(), stroke);
        }
        ShapeKind::Arrow => {
            let end = shape.end();
            surface.stroke_polyline(&[shape.origin, end], stroke);
            surface.fill_polygon(&arrow_head(shape.origin, end, shape.stroke_width), shape.color);
        }
        ShapeKind::Freehand { points } => {
            if !points.is_empty() {
                surface.stroke_polyline(points, stroke);
            }
        }
        ShapeKind::Text { content } => {
            surface.fill_text(shape.origin, content, shape.font_size(), shape.color)
        }
        // Blur regions are composited from the base image, never stroked.
        ShapeKind::Blur => {}
    }
}

/// Triangle at `end`: length `4 * stroke_width`, 30° either side of the shaft.
pub fn arrow_head(start: Pos2, end: Pos2, stroke_width: f32) -> [Pos2; 3] {
    let angle = (end.y - start.y).atan2(end.x - start.x);
    let len = stroke_width * 4.0;
    let wing = |a: f32| Pos2::new(end.x - len * a.cos(), end.y - len * a.sin());
    [end, wing(angle - FRAC_PI_6), wing(angle + FRAC_PI_6)]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::hit_test::ApproxTextMeasure;
    use crate::shape::{Brush, Tool};

    /// Surface that records calls instead of drawing.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub calls: Vec<String>,
    }

    impl TextMeasure for Recorder {
        fn text_width(&self, text: &str, font_size: f32) -> f32 {
            ApproxTextMeasure.text_width(text, font_size)
        }
    }

    impl Surface for Recorder {
        fn draw_base_image(&mut self, _size: Vec2) {
            self.calls.push("image".into());
        }
        fn draw_blurred_image(&mut self, _clip: Rect) {
            self.calls.push("blur".into());
        }
        fn stroke_rect(&mut self, _rect: Rect, _stroke: StrokeStyle) {
            self.calls.push("stroke_rect".into());
        }
        fn fill_rect(&mut self, _rect: Rect, color: Color) {
            self.calls.push(format!("fill_rect {}", color.a));
        }
        fn stroke_ellipse(&mut self, center: Pos2, radii: Vec2, _stroke: StrokeStyle) {
            self.calls
                .push(format!("ellipse {} {} {} {}", center.x, center.y, radii.x, radii.y));
        }
        fn stroke_polyline(&mut self, points: &[Pos2], _stroke: StrokeStyle) {
            self.calls.push(format!("polyline {}", points.len()));
        }
        fn fill_polygon(&mut self, _points: &[Pos2], _color: Color) {
            self.calls.push("polygon".into());
        }
        fn fill_text(&mut self, _pos: Pos2, text: &str, font_size: f32, _color: Color) {
            self.calls.push(format!("text {text} {font_size}"));
        }
        fn dashed_rect(&mut self, _rect: Rect, _stroke: StrokeStyle, _dash: f32) {
            self.calls.push("dashed".into());
        }
    }

    fn shape(id: u64, tool: Tool, to: (f32, f32)) -> Shape {
        let brush = Brush {
            color: Color::RED,
            stroke_width: 2.0,
            highlight_color: Color::HIGHLIGHT,
        };
        let mut s = Shape::draft(id, tool, Pos2::new(10.0, 10.0), &brush).expect("draft");
        s.extend_to(Pos2::new(to.0, to.1));
        s
    }

    #[test]
    fn blur_regions_are_drawn_before_other_shapes() {
        let shapes = vec![
            shape(1, Tool::Rect, (50.0, 50.0)),
            shape(2, Tool::Blur, (40.0, 40.0)),
            shape(3, Tool::Highlight, (30.0, 30.0)),
        ];
        let mut recorder = Recorder::default();
        render_scene(
            &mut recorder,
            Scene {
                image_size: Some(Vec2::new(100.0, 100.0)),
                shapes: &shapes,
                draft: None,
            },
        );
        assert_eq!(recorder.calls, vec!["image", "blur", "stroke_rect", "fill_rect 102"]);
    }

    #[test]
    fn blur_needs_an_image() {
        let shapes = vec![shape(1, Tool::Blur, (40.0, 40.0))];
        let draft = shape(2, Tool::Blur, (20.0, 20.0));
        let mut recorder = Recorder::default();
        render_scene(
            &mut recorder,
            Scene {
                image_size: None,
                shapes: &shapes,
                draft: Some(&draft),
            },
        );
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn blur_draft_gets_dashed_outline() {
        let draft = shape(1, Tool::Blur, (40.0, 40.0));
        let arrow = shape(2, Tool::Arrow, (40.0, 40.0));
        let mut recorder = Recorder::default();
        render_scene(
            &mut recorder,
            Scene {
                image_size: Some(Vec2::new(100.0, 100.0)),
                shapes: std::slice::from_ref(&arrow),
                draft: Some(&draft),
            },
        );
        assert_eq!(recorder.calls, vec!["image", "polyline 2", "polygon", "blur", "dashed"]);
    }

    #[test]
    fn circle_centered_with_absolute_radii() {
        let circle = shape(1, Tool::Circle, (-30.0, 50.0));
        let mut recorder = Recorder::default();
        draw_shape(&mut recorder, &circle);
        assert_eq!(recorder.calls, vec!["ellipse -10 30 20 20"]);
    }

    #[test]
    fn text_uses_derived_font_size() {
        let brush = Brush {
            color: Color::RED,
            stroke_width: 2.0,
            highlight_color: Color::HIGHLIGHT,
        };
        let text = Shape::text(1, Pos2::ZERO, "hi", &brush);
        let mut recorder = Recorder::default();
        draw_shape(&mut recorder, &text);
        assert_eq!(recorder.calls, vec!["text hi 20"]);
    }

    #[test]
    fn arrow_head_geometry() {
        let head = arrow_head(Pos2::ZERO, Pos2::new(100.0, 0.0), 5.0);
        assert_eq!(head[0], Pos2::new(100.0, 0.0));
        let half_width = 20.0 * FRAC_PI_6.sin();
        let back = 100.0 - 20.0 * FRAC_PI_6.cos();
        assert!((head[1] - Pos2::new(back, half_width)).length() < 1e-4);
        assert!((head[2] - Pos2::new(back, -half_width)).length() < 1e-4);
    }
}
