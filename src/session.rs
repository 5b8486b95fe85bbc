use egui::{Pos2, Vec2};
use image::RgbaImage;

use crate::config::{EditorConfig, MAX_STROKE_WIDTH, MIN_STROKE_WIDTH};
use crate::geometry::ViewTransform;
use crate::history::{History, LayerEntry};
use crate::shape::{Brush, Color, Shape, ShapeId, Tool};

/// The decoded bitmap being annotated.
pub struct BaseImage {
    pub pixels: RgbaImage,
    /// Bumped on every load so the UI can tell when to rebuild textures.
    pub generation: u64,
}

impl BaseImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.pixels.width() as f32, self.pixels.height() as f32)
    }
}

/// The whole editing session: base image, shapes, view and active style.
///
/// Every mutation bumps [`Session::revision`], which observers (canvas,
/// layer list, undo/redo buttons) compare to know when to refresh.
pub struct Session {
    history: History,
    image: Option<BaseImage>,
    view: ViewTransform,
    viewport: Vec2,
    tool: Tool,
    brush: Brush,
    config: EditorConfig,
    revision: u64,
    /// A loaded image still waiting for a usable viewport to fit into.
    pending_fit: bool,
    next_id: ShapeId,
    next_generation: u64,
}

impl Session {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            history: History::default(),
            image: None,
            view: ViewTransform::default(),
            viewport: Vec2::ZERO,
            tool: config.tool,
            brush: Brush {
                color: config.color,
                stroke_width: config.stroke_width,
                highlight_color: config.highlight_color,
            },
            config,
            revision: 0,
            pending_fit: false,
            next_id: 1,
            next_generation: 1,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn shapes(&self) -> &[Shape] {
        self.history.shapes()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn layer_entries(&self) -> Vec<LayerEntry> {
        self.history.layer_entries()
    }

    pub fn image(&self) -> Option<&BaseImage> {
        self.image.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn brush(&self) -> Brush {
        self.brush
    }

    pub fn allocate_id(&mut self) -> ShapeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool != tool {
            self.tool = tool;
            self.touch();
        }
    }

    pub fn set_color(&mut self, color: Color) {
        self.brush.color = color;
    }

    pub fn set_stroke_width(&mut self, width: f32) {
        self.brush.stroke_width = width.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH);
    }

    pub fn commit(&mut self, shape: Shape) {
        log::debug!("commit {} #{}", shape.kind.name(), shape.id);
        self.history.commit(shape);
        self.touch();
    }

    pub fn undo(&mut self) -> bool {
        let changed = self.history.undo();
        if changed {
            self.touch();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.history.redo();
        if changed {
            self.touch();
        }
        changed
    }

    pub fn delete_at(&mut self, index: usize) -> Option<Shape> {
        let removed = self.history.delete_at(index)?;
        self.touch();
        Some(removed)
    }

    pub fn clear_annotations(&mut self) {
        self.history.clear();
        self.touch();
    }

    pub fn reset_all(&mut self) {
        self.history.clear();
        self.image = None;
        self.view = ViewTransform::default();
        self.pending_fit = false;
        self.touch();
    }

    /// Replaces the base image, drops every shape and fits the new image.
    pub fn load_image(&mut self, pixels: RgbaImage) {
        log::info!("loaded {}x{} image", pixels.width(), pixels.height());
        self.history.clear();
        self.image = Some(BaseImage {
            pixels,
            generation: self.next_generation,
        });
        self.next_generation += 1;
        self.pending_fit = true;
        self.fit_to_screen();
        self.touch();
    }

    pub(crate) fn translate_shape(&mut self, id: ShapeId, delta: Vec2) -> bool {
        match self.history.get_mut(id) {
            Some(shape) => {
                shape.translate(delta);
                self.touch();
                true
            }
            None => false,
        }
    }

    pub fn set_viewport(&mut self, size: Vec2) {
        if self.viewport != size {
            self.viewport = size;
            if self.pending_fit {
                self.fit_to_screen();
            }
            self.touch();
        }
    }

    pub fn pan_by(&mut self, screen_delta: Vec2) {
        self.view.pan_by(screen_delta);
        self.touch();
    }

    /// Zooms by `delta` around `pivot`, or around the viewport center.
    pub fn zoom_by(&mut self, delta: f32, pivot: Option<Pos2>) {
        let pivot = pivot.unwrap_or_else(|| (self.viewport / 2.0).to_pos2());
        self.view.zoom_by(delta, pivot);
        self.touch();
    }

    pub fn fit_to_screen(&mut self) {
        let Some(size) = self.image.as_ref().map(BaseImage::size) else {
            return;
        };
        if self.view.fit(self.viewport, size, self.config.fit_padding) {
            self.pending_fit = false;
        }
        self.touch();
    }
}

/// Remembers the last [`Session::revision`] an observer caught up with.
#[derive(Clone, Copy, Debug, Default)]
pub struct RevisionWatch {
    seen: Option<u64>,
}

impl RevisionWatch {
    /// Marks `session` as seen; true when it changed since the last call.
    pub fn refresh(&mut self, session: &Session) -> bool {
        let current = Some(session.revision());
        if self.seen == current {
            return false;
        }
        self.seen = current;
        true
    }

    pub fn is_stale(&self, session: &Session) -> bool {
        self.seen != Some(session.revision())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
