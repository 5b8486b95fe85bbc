use egui::{Pos2, Rect, Vec2};

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 5.0;

/// Pan/zoom state of the canvas viewport.
///
/// Screen coordinates are relative to the top-left corner of the canvas
/// viewport: `screen = world * scale + pan`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub pan: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan: Vec2::ZERO,
        }
    }
}

impl ViewTransform {
    pub fn new(scale: f32, pan: Vec2) -> Self {
        Self {
            scale: scale.clamp(MIN_SCALE, MAX_SCALE),
            pan,
        }
    }

    pub fn to_world(&self, screen: Pos2) -> Pos2 {
        ((screen - self.pan).to_vec2() / self.scale).to_pos2()
    }

    pub fn to_screen(&self, world: Pos2) -> Pos2 {
        (world.to_vec2() * self.scale + self.pan).to_pos2()
    }

    /// Converts a screen-space displacement into world units.
    pub fn to_world_delta(&self, screen_delta: Vec2) -> Vec2 {
        screen_delta / self.scale
    }

    pub fn rect_to_screen(&self, world: Rect) -> Rect {
        Rect::from_min_max(self.to_screen(world.min), self.to_screen(world.max))
    }

    pub fn pan_by(&mut self, screen_delta: Vec2) {
        self.pan += screen_delta;
    }

    /// Sets a new scale while keeping `pivot` (screen space) stationary.
    pub fn zoom_to(&mut self, scale: f32, pivot: Pos2) {
        let old = self.scale;
        let new = scale.clamp(MIN_SCALE, MAX_SCALE);
        let pivot = pivot.to_vec2();
        self.pan = pivot - (pivot - self.pan) * (new / old);
        self.scale = new;
    }

    pub fn zoom_by(&mut self, delta: f32, pivot: Pos2) {
        self.zoom_to(self.scale + delta, pivot);
    }

    /// Scales `image_size` to fit `viewport` minus `padding` and centers it.
    /// Returns false, leaving the view untouched, when nothing fits.
    pub fn fit(&mut self, viewport: Vec2, image_size: Vec2, padding: f32) -> bool {
        if image_size.x <= 0.0 || image_size.y <= 0.0 {
            return false;
        }
        let wr = (viewport.x - padding) / image_size.x;
        let hr = (viewport.y - padding) / image_size.y;
        let scale = wr.min(hr);
        // Degenerate viewports (minimised window) would yield a non-positive scale.
        if !scale.is_finite() || scale <= 0.0 {
            return false;
        }
        let scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        self.scale = scale;
        self.pan = (viewport - image_size * scale) / 2.0;
        true
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }
}

/// Min-corner/absolute-extent box for an anchor and a possibly negative size.
pub fn normalized_rect(origin: Pos2, size: Vec2) -> Rect {
    Rect::from_two_pos(origin, origin + size)
}
