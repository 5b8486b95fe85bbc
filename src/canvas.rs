use egui::{
    Align2, Color32, ColorImage, Context, FontId, Painter, Pos2, Rect, Shape as EguiShape,
    Stroke, StrokeKind, TextureHandle, TextureOptions, Vec2,
};
use image::{imageops, RgbaImage};

use crate::geometry::ViewTransform;
use crate::hit_test::TextMeasure;
use crate::render::{StrokeStyle, Surface};
use crate::session::BaseImage;
use crate::shape::Color;

/// GPU copies of the base image: the plain one and the blurred one used by
/// blur regions. Rebuilt whenever the session loads a new image.
#[derive(Default)]
pub struct ImageTextures {
    generation: Option<u64>,
    plain: Option<TextureHandle>,
    blurred: Option<TextureHandle>,
}

fn color_image(pixels: &RgbaImage) -> ColorImage {
    let size = [pixels.width() as usize, pixels.height() as usize];
    ColorImage::from_rgba_unmultiplied(size, pixels.as_raw())
}

impl ImageTextures {
    pub fn sync(&mut self, ctx: &Context, image: Option<&BaseImage>, blur_radius: f32) {
        let Some(image) = image else {
            *self = Self::default();
            return;
        };
        if self.generation == Some(image.generation) {
            return;
        }
        let blurred = imageops::blur(&image.pixels, blur_radius);
        self.plain = Some(ctx.load_texture(
            "base-image",
            color_image(&image.pixels),
            TextureOptions::LINEAR,
        ));
        self.blurred = Some(ctx.load_texture(
            "base-image-blurred",
            color_image(&blurred),
            TextureOptions::LINEAR,
        ));
        self.generation = Some(image.generation);
    }
}

/// Text measurement through egui's font system.
pub struct EguiTextMeasure<'a>(pub &'a Context);

impl TextMeasure for EguiTextMeasure<'_> {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.0.fonts(|fonts| {
            fonts
                .layout_no_wrap(text.to_owned(), FontId::proportional(font_size), Color32::WHITE)
                .size()
                .x
        })
    }
}

/// On-screen surface: world coordinates go through the view transform and
/// are offset by the canvas position inside the window.
pub struct CanvasSurface<'a> {
    painter: &'a Painter,
    view: ViewTransform,
    origin: Vec2,
    textures: &'a ImageTextures,
}

const FULL_UV: Rect = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));

impl<'a> CanvasSurface<'a> {
    pub fn new(
        painter: &'a Painter,
        view: ViewTransform,
        canvas_rect: Rect,
        textures: &'a ImageTextures,
    ) -> Self {
        Self {
            painter,
            view,
            origin: canvas_rect.min.to_vec2(),
            textures,
        }
    }

    fn pos(&self, world: Pos2) -> Pos2 {
        self.view.to_screen(world) + self.origin
    }

    fn rect(&self, world: Rect) -> Rect {
        self.view.rect_to_screen(world).translate(self.origin)
    }

    fn stroke(&self, style: StrokeStyle) -> Stroke {
        Stroke::new(style.width * self.view.scale, style.color.to_color32())
    }
}

impl TextMeasure for CanvasSurface<'_> {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.painter
            .layout_no_wrap(text.to_owned(), FontId::proportional(font_size), Color32::WHITE)
            .size()
            .x
    }
}

impl Surface for CanvasSurface<'_> {
    fn draw_base_image(&mut self, size: Vec2) {
        let Some(texture) = &self.textures.plain else {
            return;
        };
        let rect = self.rect(Rect::from_min_size(Pos2::ZERO, size));
        // soft drop shadow
        for (spread, alpha) in [(20.0, 8), (12.0, 14), (5.0, 22)] {
            self.painter.rect_filled(
                rect.expand(spread * self.view.scale.min(1.0)),
                spread,
                Color32::from_black_alpha(alpha),
            );
        }
        self.painter
            .image(texture.id(), rect, FULL_UV, Color32::WHITE);
    }

    fn draw_blurred_image(&mut self, clip: Rect) {
        let Some(texture) = &self.textures.blurred else {
            return;
        };
        let Some(size) = self.textures.plain.as_ref().map(|t| t.size_vec2()) else {
            return;
        };
        let clip = self.rect(clip).intersect(self.painter.clip_rect());
        if !clip.is_positive() {
            return;
        }
        let rect = self.rect(Rect::from_min_size(Pos2::ZERO, size));
        self.painter
            .with_clip_rect(clip)
            .image(texture.id(), rect, FULL_UV, Color32::WHITE);
    }

    fn stroke_rect(&mut self, rect: Rect, stroke: StrokeStyle) {
        self.painter
            .rect_stroke(self.rect(rect), 0.0, self.stroke(stroke), StrokeKind::Middle);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.painter
            .rect_filled(self.rect(rect), 0.0, color.to_color32());
    }

    fn stroke_ellipse(&mut self, center: Pos2, radii: Vec2, stroke: StrokeStyle) {
        self.painter.add(EguiShape::ellipse_stroke(
            self.pos(center),
            radii * self.view.scale,
            self.stroke(stroke),
        ));
    }

    fn stroke_polyline(&mut self, points: &[Pos2], stroke: StrokeStyle) {
        let stroke = self.stroke(stroke);
        let screen: Vec<Pos2> = points.iter().map(|p| self.pos(*p)).collect();
        if let [single] = screen.as_slice() {
            self.painter
                .circle_filled(*single, stroke.width / 2.0, stroke.color);
            return;
        }
        // Round joins: egui strokes polylines with mitred corners.
        for p in &screen {
            self.painter.circle_filled(*p, stroke.width / 2.0, stroke.color);
        }
        self.painter.add(EguiShape::line(screen, stroke));
    }

    fn fill_polygon(&mut self, points: &[Pos2], color: Color) {
        let screen = points.iter().map(|p| self.pos(*p)).collect();
        self.painter.add(EguiShape::convex_polygon(
            screen,
            color.to_color32(),
            Stroke::NONE,
        ));
    }

    fn fill_text(&mut self, pos: Pos2, text: &str, font_size: f32, color: Color) {
        self.painter.text(
            self.pos(pos),
            Align2::LEFT_TOP,
            text,
            FontId::proportional(font_size * self.view.scale),
            color.to_color32(),
        );
    }

    fn dashed_rect(&mut self, rect: Rect, stroke: StrokeStyle, dash: f32) {
        let r = self.rect(rect);
        let outline = [
            r.left_top(),
            r.right_top(),
            r.right_bottom(),
            r.left_bottom(),
            r.left_top(),
        ];
        // Outline stays one screen pixel wide regardless of zoom.
        let stroke = Stroke::new(stroke.width, stroke.color.to_color32());
        self.painter
            .extend(EguiShape::dashed_line(&outline, stroke, dash, dash));
    }
}
