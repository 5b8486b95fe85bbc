use std::fmt;

use egui::{Color32, Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::geometry::normalized_rect;

pub type ShapeId = u64;

/// Drafts whose extent stays below this on both axes are treated as clicks.
pub const MIN_EXTENT: f32 = 5.0;
pub const HIGHLIGHT_ALPHA: f32 = 0.4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Select,
    Rect,
    Circle,
    Arrow,
    Highlight,
    Blur,
    Freehand,
    Text,
}

impl Tool {
    pub const ALL: [Tool; 8] = [
        Tool::Select,
        Tool::Rect,
        Tool::Circle,
        Tool::Arrow,
        Tool::Highlight,
        Tool::Blur,
        Tool::Freehand,
        Tool::Text,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::Rect => "Rectangle",
            Tool::Circle => "Circle",
            Tool::Arrow => "Arrow",
            Tool::Highlight => "Highlight",
            Tool::Blur => "Blur",
            Tool::Freehand => "Pen",
            Tool::Text => "Text",
        }
    }
}

/// Straight (non-premultiplied) RGBA color, written as `#rrggbb` or
/// `#rrggbbaa` in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const RED: Self = Self::rgb(0xef, 0x44, 0x44);
    pub const HIGHLIGHT: Self = Self::rgb(0xfd, 0xe0, 0x47);
    pub const SELECTION: Self = Self::rgb(0x3b, 0x82, 0xf6);

    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.strip_prefix('#').unwrap_or(value);
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => None,
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: (self.a as f32 * alpha.clamp(0.0, 1.0)).round() as u8,
            ..self
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_color32(self) -> Color32 {
        Color32::from_rgba_unmultiplied(self.r, self.g, self.b, self.a)
    }

    pub fn from_color32(value: Color32) -> Self {
        let [r, g, b, a] = value.to_srgba_unmultiplied();
        Self { r, g, b, a }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or_else(|| format!("invalid color '{value}', expected #rrggbb"))
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

/// Style applied to newly created shapes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Brush {
    pub color: Color,
    pub stroke_width: f32,
    pub highlight_color: Color,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ShapeKind {
    Rect,
    Circle,
    Arrow,
    Highlight,
    Blur,
    Freehand { points: Vec<Pos2> },
    Text { content: String },
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Rect => "rect",
            ShapeKind::Circle => "circle",
            ShapeKind::Arrow => "arrow",
            ShapeKind::Highlight => "highlight",
            ShapeKind::Blur => "blur",
            ShapeKind::Freehand { .. } => "freehand",
            ShapeKind::Text { .. } => "text",
        }
    }
}

/// A committed or in-progress annotation, in world coordinates.
///
/// `size` may be negative when the shape was dragged up or left; consumers
/// normalize through [`Shape::bounds`].
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub origin: Pos2,
    pub size: Vec2,
    pub color: Color,
    pub stroke_width: f32,
}

impl Shape {
    /// Starts a zero-extent draft for a drawing tool. Returns `None` for
    /// tools that do not draw (selection, text).
    pub fn draft(id: ShapeId, tool: Tool, at: Pos2, brush: &Brush) -> Option<Self> {
        let kind = match tool {
            Tool::Select | Tool::Text => return None,
            Tool::Rect => ShapeKind::Rect,
            Tool::Circle => ShapeKind::Circle,
            Tool::Arrow => ShapeKind::Arrow,
            Tool::Highlight => ShapeKind::Highlight,
            Tool::Blur => ShapeKind::Blur,
            Tool::Freehand => ShapeKind::Freehand { points: vec![at] },
        };
        let (color, stroke_width) = match kind {
            ShapeKind::Highlight => (brush.highlight_color, 0.0),
            _ => (brush.color, brush.stroke_width),
        };
        Some(Self {
            id,
            kind,
            origin: at,
            size: Vec2::ZERO,
            color,
            stroke_width,
        })
    }

    pub fn text(id: ShapeId, at: Pos2, content: impl Into<String>, brush: &Brush) -> Self {
        Self {
            id,
            kind: ShapeKind::Text {
                content: content.into(),
            },
            origin: at,
            size: Vec2::ZERO,
            color: brush.color,
            stroke_width: brush.stroke_width,
        }
    }

    /// Extends the draft towards the pointer: freehand strokes grow by one
    /// point, every other kind spans from the anchor to `world`.
    pub fn extend_to(&mut self, world: Pos2) {
        match &mut self.kind {
            ShapeKind::Freehand { points } => points.push(world),
            _ => self.size = world - self.origin,
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.origin += delta;
        if let ShapeKind::Freehand { points } = &mut self.kind {
            for p in points.iter_mut() {
                *p += delta;
            }
        }
    }

    /// Accidental clicks produce drafts that should not be committed.
    /// Freehand strokes are never degenerate.
    pub fn is_degenerate(&self) -> bool {
        match self.kind {
            ShapeKind::Freehand { .. } => false,
            _ => self.size.x.abs() < MIN_EXTENT && self.size.y.abs() < MIN_EXTENT,
        }
    }

    pub fn is_blur(&self) -> bool {
        matches!(self.kind, ShapeKind::Blur)
    }

    /// Normalized box spanned by anchor and size.
    pub fn bounds(&self) -> Rect {
        normalized_rect(self.origin, self.size)
    }

    pub fn end(&self) -> Pos2 {
        self.origin + self.size
    }

    pub fn font_size(&self) -> f32 {
        font_size_for(self.stroke_width)
    }

    /// Short description used by the layer list.
    pub fn label(&self) -> String {
        match &self.kind {
            ShapeKind::Text { content } => format!("text \"{content}\""),
            kind => kind.name().to_owned(),
        }
    }
}

pub fn font_size_for(stroke_width: f32) -> f32 {
    stroke_width * 5.0 + 10.0
}

/// Bounding box of a point cloud, `None` when empty.
pub fn points_bounds(points: &[Pos2]) -> Option<Rect> {
    let first = *points.first()?;
    Some(
        points
            .iter()
            .fold(Rect::from_min_max(first, first), |r, p| r.union(Rect::from_min_max(*p, *p))),
    )
}
