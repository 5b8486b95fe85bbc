use std::path::Path;

use ab_glyph::{Font, FontArc, GlyphId, OutlineCurve, PxScale, ScaleFont};
use anyhow::{anyhow, Context, Result};
use egui::{Pos2, Rect as WorldRect, Vec2};
use image::{imageops, DynamicImage, ImageFormat, RgbaImage};
use tiny_skia::{
    ColorU8, FillRule, LineCap, LineJoin, Paint, Path as SkPath, PathBuilder, Pixmap, Rect,
    Stroke, StrokeDash, Transform,
};

use crate::hit_test::{ApproxTextMeasure, TextMeasure};
use crate::render::{render_scene, Scene, StrokeStyle, Surface};
use crate::session::Session;
use crate::shape::{Color, Shape};

/// Full-resolution compositor: draws onto a pixmap sized to the base image
/// with no pan or zoom applied.
pub struct ExportSurface<'a> {
    pixmap: Pixmap,
    base: &'a RgbaImage,
    blur_radius: f32,
    font: Option<FontArc>,
}

impl<'a> ExportSurface<'a> {
    /// Text falls back to egui's bundled font when `font` is `None`.
    pub fn new(base: &'a RgbaImage, blur_radius: f32, font: Option<&FontArc>) -> Result<Self> {
        let pixmap = Pixmap::new(base.width(), base.height())
            .ok_or_else(|| anyhow!("cannot allocate {}x{} pixmap", base.width(), base.height()))?;
        let font = match font {
            Some(font) => Some(font.clone()),
            None => bundled_font()
                .map_err(|err| log::warn!("{err:#}"))
                .ok(),
        };
        Ok(Self {
            pixmap,
            base,
            blur_radius,
            font,
        })
    }

    /// Converts the premultiplied pixmap back to a straight-alpha image.
    pub fn into_image(self) -> Result<RgbaImage> {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let mut data = Vec::with_capacity(self.pixmap.pixels().len() * 4);
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        RgbaImage::from_raw(width, height, data)
            .ok_or_else(|| anyhow!("cannot construct output image"))
    }

    /// Overwrites the pixels of `patch` placed at `(x, y)`.
    fn blit(&mut self, patch: &RgbaImage, x: u32, y: u32) {
        let width = self.pixmap.width();
        let pixels = self.pixmap.pixels_mut();
        for (px, py, p) in patch.enumerate_pixels() {
            let index = ((y + py) * width + (x + px)) as usize;
            if let Some(slot) = pixels.get_mut(index) {
                *slot = ColorU8::from_rgba(p[0], p[1], p[2], p[3]).premultiply();
            }
        }
    }

    fn paint(color: Color) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;
        paint
    }

    fn stroke(style: StrokeStyle) -> Stroke {
        Stroke {
            width: style.width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Default::default()
        }
    }

    fn stroke_path(&mut self, path: Option<SkPath>, style: StrokeStyle, dash: Option<StrokeDash>) {
        if style.width <= 0.0 {
            return;
        }
        let Some(path) = path else {
            return;
        };
        let mut stroke = Self::stroke(style);
        stroke.dash = dash;
        self.pixmap.stroke_path(
            &path,
            &Self::paint(style.color),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    fn fill_path(&mut self, path: Option<SkPath>, color: Color) {
        if let Some(path) = path {
            self.pixmap.fill_path(
                &path,
                &Self::paint(color),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }
}

fn sk_rect(rect: WorldRect) -> Option<Rect> {
    Rect::from_ltrb(rect.min.x, rect.min.y, rect.max.x, rect.max.y)
}

fn polyline_path(points: &[Pos2], close: bool) -> Option<SkPath> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    if rest.is_empty() {
        // A single point still leaves a round dot under a round cap.
        pb.line_to(first.x, first.y);
    }
    for p in rest {
        pb.line_to(p.x, p.y);
    }
    if close {
        pb.close();
    }
    pb.finish()
}

impl TextMeasure for ExportSurface<'_> {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        match &self.font {
            Some(font) => FontMeasure(font).text_width(text, font_size),
            None => ApproxTextMeasure.text_width(text, font_size),
        }
    }
}

impl Surface for ExportSurface<'_> {
    fn draw_base_image(&mut self, _size: Vec2) {
        let base = self.base;
        self.blit(base, 0, 0);
    }

    fn draw_blurred_image(&mut self, clip: WorldRect) {
        let (w, h) = (self.base.width() as f32, self.base.height() as f32);
        let clip = clip.intersect(WorldRect::from_min_size(Pos2::ZERO, Vec2::new(w, h)));
        if !clip.is_positive() {
            return;
        }
        let x0 = clip.min.x.floor() as u32;
        let y0 = clip.min.y.floor() as u32;
        let x1 = (clip.max.x.ceil() as u32).min(self.base.width());
        let y1 = (clip.max.y.ceil() as u32).min(self.base.height());

        // Blur a padded crop so pixels near the clip edge still see their
        // neighbours outside it.
        let pad = (self.blur_radius * 3.0).ceil() as u32;
        let px0 = x0.saturating_sub(pad);
        let py0 = y0.saturating_sub(pad);
        let px1 = (x1 + pad).min(self.base.width());
        let py1 = (y1 + pad).min(self.base.height());
        let crop = imageops::crop_imm(self.base, px0, py0, px1 - px0, py1 - py0).to_image();
        let blurred = imageops::blur(&crop, self.blur_radius);
        let patch =
            imageops::crop_imm(&blurred, x0 - px0, y0 - py0, x1 - x0, y1 - y0).to_image();
        self.blit(&patch, x0, y0);
    }

    fn stroke_rect(&mut self, rect: WorldRect, stroke: StrokeStyle) {
        let path = sk_rect(rect).map(PathBuilder::from_rect);
        self.stroke_path(path, stroke, None);
    }

    fn fill_rect(&mut self, rect: WorldRect, color: Color) {
        let path = sk_rect(rect).map(PathBuilder::from_rect);
        self.fill_path(path, color);
    }

    fn stroke_ellipse(&mut self, center: Pos2, radii: Vec2, stroke: StrokeStyle) {
        let oval = WorldRect::from_center_size(center, radii * 2.0);
        let path = sk_rect(oval).and_then(PathBuilder::from_oval);
        self.stroke_path(path, stroke, None);
    }

    fn stroke_polyline(&mut self, points: &[Pos2], stroke: StrokeStyle) {
        self.stroke_path(polyline_path(points, false), stroke, None);
    }

    fn fill_polygon(&mut self, points: &[Pos2], color: Color) {
        self.fill_path(polyline_path(points, true), color);
    }

    fn fill_text(&mut self, pos: Pos2, text: &str, font_size: f32, color: Color) {
        let Some(font) = &self.font else {
            log::debug!("no font loaded, skipping exported text {text:?}");
            return;
        };
        let path = text_path(font, pos, text, font_size);
        self.fill_path(path, color);
    }

    fn dashed_rect(&mut self, rect: WorldRect, stroke: StrokeStyle, dash: f32) {
        let path = sk_rect(rect).map(PathBuilder::from_rect);
        self.stroke_path(path, stroke, StrokeDash::new(vec![dash, dash], 0.0));
    }
}

/// Builds glyph outlines for `text`, top-aligned at `pos`.
fn text_path(font: &FontArc, pos: Pos2, text: &str, font_size: f32) -> Option<SkPath> {
    let scaled = font.as_scaled(PxScale::from(font_size));
    let (sx, sy) = (scaled.h_scale_factor(), scaled.v_scale_factor());
    let baseline = pos.y + scaled.ascent();
    let mut caret = pos.x;
    let mut previous: Option<GlyphId> = None;
    let mut pb = PathBuilder::new();

    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        if let Some(outline) = font.outline(id) {
            let map = |p: ab_glyph::Point| (caret + p.x * sx, baseline - p.y * sy);
            let mut last: Option<(f32, f32)> = None;
            for curve in &outline.curves {
                let (start, end) = match curve {
                    OutlineCurve::Line(a, b) => (map(*a), map(*b)),
                    OutlineCurve::Quad(a, _, c) => (map(*a), map(*c)),
                    OutlineCurve::Cubic(a, _, _, d) => (map(*a), map(*d)),
                };
                if last != Some(start) {
                    if last.is_some() {
                        pb.close();
                    }
                    pb.move_to(start.0, start.1);
                }
                match curve {
                    OutlineCurve::Line(..) => pb.line_to(end.0, end.1),
                    OutlineCurve::Quad(_, b, _) => {
                        let b = map(*b);
                        pb.quad_to(b.0, b.1, end.0, end.1);
                    }
                    OutlineCurve::Cubic(_, b, c, _) => {
                        let (b, c) = (map(*b), map(*c));
                        pb.cubic_to(b.0, b.1, c.0, c.1, end.0, end.1);
                    }
                }
                last = Some(end);
            }
            if last.is_some() {
                pb.close();
            }
        }
        caret += scaled.h_advance(id);
        previous = Some(id);
    }
    pb.finish()
}

/// Advance-width measurement from a TrueType font.
pub struct FontMeasure<'a>(pub &'a FontArc);

impl TextMeasure for FontMeasure<'_> {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let scaled = self.0.as_scaled(PxScale::from(font_size));
        let mut width = 0.0;
        let mut previous: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = self.0.glyph_id(ch);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }
        width
    }
}

pub fn load_font(path: &Path) -> Result<FontArc> {
    let bytes =
        std::fs::read(path).with_context(|| format!("cannot read font {}", path.display()))?;
    FontArc::try_from_vec(bytes).with_context(|| format!("invalid font {}", path.display()))
}

/// The proportional font egui paints the canvas with.
pub fn bundled_font() -> Result<FontArc> {
    let defs = egui::FontDefinitions::default();
    let name = defs
        .families
        .get(&egui::FontFamily::Proportional)
        .and_then(|names| names.first())
        .ok_or_else(|| anyhow!("egui ships no proportional font"))?;
    let data = defs
        .font_data
        .get(name)
        .ok_or_else(|| anyhow!("no font data for {name}"))?;
    FontArc::try_from_vec(data.font.to_vec()).with_context(|| format!("invalid bundled font {name}"))
}

/// Loads the configured font, falling back to egui's bundled one so exported
/// text measures the same as on the canvas.
pub fn find_font(configured: Option<&Path>) -> Option<FontArc> {
    if let Some(path) = configured {
        match load_font(path) {
            Ok(font) => return Some(font),
            Err(err) => log::warn!("{err:#}, using the bundled font"),
        }
    }
    match bundled_font() {
        Ok(font) => Some(font),
        Err(err) => {
            log::warn!("{err:#}, text will be missing from exports");
            None
        }
    }
}

/// Composites `shapes` over `base` at native resolution.
pub fn render_export(
    base: &RgbaImage,
    shapes: &[Shape],
    blur_radius: f32,
    font: Option<&FontArc>,
) -> Result<RgbaImage> {
    let mut surface = ExportSurface::new(base, blur_radius, font)?;
    let size = Vec2::new(base.width() as f32, base.height() as f32);
    render_scene(
        &mut surface,
        Scene {
            image_size: Some(size),
            shapes,
            draft: None,
        },
    );
    surface.into_image()
}

/// Exports the session's image and annotations; `None` without an image.
pub fn export_session(session: &Session, font: Option<&FontArc>) -> Result<Option<RgbaImage>> {
    let Some(image) = session.image() else {
        return Ok(None);
    };
    let output = render_export(
        &image.pixels,
        session.shapes(),
        session.config().blur_radius,
        font,
    )?;
    Ok(Some(output))
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut buffer, ImageFormat::Png)
        .context("cannot encode PNG")?;
    Ok(buffer.into_inner())
}

pub fn save_png(image: &RgbaImage, path: &Path) -> Result<()> {
    let bytes = encode_png(image)?;
    std::fs::write(path, bytes).with_context(|| format!("cannot write {}", path.display()))?;
    log::info!("exported {}", path.display());
    Ok(())
}
