use egui::{Pos2, Rect, Vec2};

use crate::shape::{points_bounds, Shape, ShapeKind};

/// Extra tolerance around thin shapes (arrows and freehand strokes).
pub const THIN_SHAPE_MARGIN: f32 = 10.0;

/// Advance-width measurement for text at a given pixel size.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

/// Font-independent estimate used when no real font metrics are available.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApproxTextMeasure;

impl TextMeasure for ApproxTextMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * 0.6
    }
}

/// Box occupied by a text shape: measured width, font-size height.
pub fn text_bounds(shape: &Shape, content: &str, measure: &dyn TextMeasure) -> Rect {
    let size = shape.font_size();
    Rect::from_min_size(
        shape.origin,
        Vec2::new(measure.text_width(content, size), size),
    )
}

/// Whether `point` (world space) lies on `shape`.
pub fn contains(shape: &Shape, point: Pos2, measure: &dyn TextMeasure) -> bool {
    match &shape.kind {
        ShapeKind::Rect | ShapeKind::Highlight | ShapeKind::Blur => shape.bounds().contains(point),
        ShapeKind::Arrow => shape.bounds().expand(THIN_SHAPE_MARGIN).contains(point),
        ShapeKind::Circle => {
            let radii = shape.size / 2.0;
            if radii.x == 0.0 || radii.y == 0.0 {
                return false;
            }
            let center = shape.origin + radii;
            let nx = (point.x - center.x) / radii.x;
            let ny = (point.y - center.y) / radii.y;
            nx * nx + ny * ny <= 1.0
        }
        ShapeKind::Freehand { points } => points_bounds(points)
            .map(|r| r.expand(THIN_SHAPE_MARGIN).contains(point))
            .unwrap_or(false),
        ShapeKind::Text { content } => text_bounds(shape, content, measure).contains(point),
    }
}

/// Index of the frontmost shape under `point`, searching back to front.
pub fn hit_test(shapes: &[Shape], point: Pos2, measure: &dyn TextMeasure) -> Option<usize> {
    shapes
        .iter()
        .rposition(|shape| contains(shape, point, measure))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Brush, Color, Tool};

    fn brush() -> Brush {
        Brush {
            color: Color::RED,
            stroke_width: 4.0,
            highlight_color: Color::HIGHLIGHT,
        }
    }

    fn shape(id: u64, tool: Tool, at: (f32, f32), to: (f32, f32)) -> Shape {
        let mut s = Shape::draft(id, tool, Pos2::new(at.0, at.1), &brush()).expect("draft");
        s.extend_to(Pos2::new(to.0, to.1));
        s
    }

    #[test]
    fn rect_inside_and_outside() {
        let shapes = vec![shape(1, Tool::Rect, (10.0, 10.0), (60.0, 60.0))];
        assert_eq!(hit_test(&shapes, Pos2::new(30.0, 30.0), &ApproxTextMeasure), Some(0));
        assert_eq!(hit_test(&shapes, Pos2::new(70.0, 30.0), &ApproxTextMeasure), None);
    }

    #[test]
    fn negative_extent_is_normalized() {
        let shapes = vec![shape(1, Tool::Blur, (60.0, 60.0), (10.0, 10.0))];
        assert_eq!(hit_test(&shapes, Pos2::new(30.0, 30.0), &ApproxTextMeasure), Some(0));
    }

    #[test]
    fn topmost_shape_wins() {
        let shapes = vec![
            shape(1, Tool::Rect, (0.0, 0.0), (100.0, 100.0)),
            shape(2, Tool::Highlight, (50.0, 50.0), (150.0, 150.0)),
        ];
        assert_eq!(hit_test(&shapes, Pos2::new(75.0, 75.0), &ApproxTextMeasure), Some(1));
        assert_eq!(hit_test(&shapes, Pos2::new(25.0, 25.0), &ApproxTextMeasure), Some(0));
    }

    #[test]
    fn arrow_has_margin() {
        let arrow = shape(1, Tool::Arrow, (0.0, 0.0), (100.0, 0.0));
        assert!(contains(&arrow, Pos2::new(50.0, 9.0), &ApproxTextMeasure));
        assert!(contains(&arrow, Pos2::new(-10.0, -10.0), &ApproxTextMeasure));
        assert!(!contains(&arrow, Pos2::new(50.0, 11.0), &ApproxTextMeasure));
    }

    #[test]
    fn circle_uses_ellipse_equation() {
        let circle = shape(1, Tool::Circle, (0.0, 0.0), (100.0, 50.0));
        assert!(contains(&circle, Pos2::new(50.0, 25.0), &ApproxTextMeasure));
        assert!(contains(&circle, Pos2::new(99.0, 25.0), &ApproxTextMeasure));
        // bounding-box corner lies outside the ellipse
        assert!(!contains(&circle, Pos2::new(3.0, 3.0), &ApproxTextMeasure));
    }

    #[test]
    fn flat_circle_never_hits() {
        let circle = shape(1, Tool::Circle, (0.0, 0.0), (100.0, 0.0));
        assert!(!contains(&circle, Pos2::new(50.0, 0.0), &ApproxTextMeasure));
    }

    #[test]
    fn freehand_bounds_with_margin() {
        let mut stroke = shape(1, Tool::Freehand, (0.0, 0.0), (10.0, 0.0));
        stroke.extend_to(Pos2::new(10.0, 10.0));
        assert!(contains(&stroke, Pos2::new(18.0, 18.0), &ApproxTextMeasure));
        assert!(!contains(&stroke, Pos2::new(21.0, 5.0), &ApproxTextMeasure));
    }

    #[test]
    fn text_uses_measured_width() {
        struct Fixed;
        impl TextMeasure for Fixed {
            fn text_width(&self, _text: &str, _font_size: f32) -> f32 {
                100.0
            }
        }
        let text = Shape::text(1, Pos2::new(10.0, 10.0), "hello", &brush());
        // font size 30 with stroke width 4
        assert!(contains(&text, Pos2::new(105.0, 35.0), &Fixed));
        assert!(!contains(&text, Pos2::new(111.0, 35.0), &Fixed));
        assert!(!contains(&text, Pos2::new(50.0, 41.0), &Fixed));
    }
}
