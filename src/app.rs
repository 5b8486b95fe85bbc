use ab_glyph::FontArc;
use eframe::egui;
use image::RgbaImage;

use crate::canvas::{CanvasSurface, EguiTextMeasure, ImageTextures};
use crate::clipboard::{CopyOutcome, SystemClipboard};
use crate::config::{EditorConfig, MAX_STROKE_WIDTH, MIN_STROKE_WIDTH};
use crate::export::{export_session, find_font, save_png};
use crate::ingest::{is_image_mime, ImageSource, Ingest};
use crate::interaction::{CursorHint, Interaction, PointerButton, PointerPress, Release};
use crate::render::{render_scene, Scene};
use crate::history::LayerEntry;
use crate::session::{RevisionWatch, Session};
use crate::shape::{Color, Tool};

const TOAST_SECONDS: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
enum ConfirmAction {
    ClearAnnotations,
    ResetAll,
}

impl ConfirmAction {
    fn title(self) -> &'static str {
        match self {
            ConfirmAction::ClearAnnotations => "Clear Annotations?",
            ConfirmAction::ResetAll => "Reset Application?",
        }
    }

    fn description(self) -> &'static str {
        match self {
            ConfirmAction::ClearAnnotations => "This will remove all drawings but keep the image.",
            ConfirmAction::ResetAll => {
                "This will remove the image and all annotations. Start fresh?"
            }
        }
    }

    fn button(self) -> &'static str {
        match self {
            ConfirmAction::ClearAnnotations => "Clear Annotations",
            ConfirmAction::ResetAll => "Reset Everything",
        }
    }
}

struct Toast {
    message: String,
    until: f64,
}

/// Export the clipboard refused, shown so the user can save it instead.
struct ManualCopy {
    image: RgbaImage,
    texture: Option<egui::TextureHandle>,
}

enum TextBoxOutcome {
    Editing,
    Commit,
    Cancel,
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct AnnotateApp {
    session: Session,
    interaction: Interaction,
    ingest: Ingest,
    clipboard: SystemClipboard,
    textures: ImageTextures,
    font: Option<FontArc>,
    toast: Option<Toast>,
    confirm: Option<ConfirmAction>,
    manual_copy: Option<ManualCopy>,
    cursor: CursorHint,
    canvas_origin: egui::Vec2,
    layers: Vec<LayerEntry>,
    layers_watch: RevisionWatch,
    paint_watch: RevisionWatch,
}

impl AnnotateApp {
    pub fn new(config: EditorConfig, initial: Option<ImageSource>) -> Self {
        let font = find_font(config.font_path.as_deref());
        let session = Session::new(config);
        let mut ingest = Ingest::default();
        if let Some(source) = initial {
            ingest.start(source);
        }
        Self {
            cursor: CursorHint::for_tool(session.tool()),
            session,
            interaction: Interaction::default(),
            ingest,
            clipboard: SystemClipboard::default(),
            textures: ImageTextures::default(),
            font,
            toast: None,
            confirm: None,
            manual_copy: None,
            canvas_origin: egui::Vec2::ZERO,
            layers: Vec::new(),
            layers_watch: RevisionWatch::default(),
            paint_watch: RevisionWatch::default(),
        }
    }

    fn show_toast(&mut self, ctx: &egui::Context, message: impl Into<String>) {
        let now = ctx.input(|i| i.time);
        self.toast = Some(Toast {
            message: message.into(),
            until: now + TOAST_SECONDS,
        });
    }

    fn undo(&mut self, ctx: &egui::Context) {
        if self.session.undo() {
            self.show_toast(ctx, "Undo");
        }
    }

    fn redo(&mut self, ctx: &egui::Context) {
        if self.session.redo() {
            self.show_toast(ctx, "Redo");
        }
    }

    fn set_tool(&mut self, tool: Tool) {
        self.interaction.set_tool(&mut self.session, tool);
        self.cursor = CursorHint::for_tool(tool);
    }

    fn open_file_dialog(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff"])
            .pick_file();
        if let Some(path) = picked {
            self.ingest.start(ImageSource::Path(path));
        }
    }

    fn paste_image(&mut self, ctx: &egui::Context) {
        match self.clipboard.read_image() {
            Ok(pixels) => {
                self.interaction.cancel(&mut self.session);
                self.session.load_image(pixels);
                self.show_toast(ctx, "Image pasted!");
            }
            Err(err) => log::debug!("paste ignored: {err:#}"),
        }
    }

    fn export_image(&mut self) -> Option<RgbaImage> {
        match export_session(&self.session, self.font.as_ref()) {
            Ok(image) => image,
            Err(err) => {
                log::warn!("export failed: {err:#}");
                None
            }
        }
    }

    fn export_to_file(&mut self, ctx: &egui::Context) {
        let Some(image) = self.export_image() else {
            self.show_toast(ctx, "No image to export!");
            return;
        };
        self.save_with_dialog(ctx, &image);
    }

    fn save_with_dialog(&mut self, ctx: &egui::Context, image: &RgbaImage) {
        let target = rfd::FileDialog::new()
            .set_file_name(&self.session.config().export_file_name)
            .add_filter("PNG", &["png"])
            .save_file();
        let Some(path) = target else {
            return;
        };
        match save_png(image, &path) {
            Ok(()) => self.show_toast(ctx, "Image exported!"),
            Err(err) => {
                log::warn!("{err:#}");
                self.show_toast(ctx, "Export failed");
            }
        }
    }

    fn copy_to_clipboard(&mut self, ctx: &egui::Context) {
        let Some(image) = self.export_image() else {
            self.show_toast(ctx, "No image to copy!");
            return;
        };
        match self.clipboard.copy_or_fallback(image) {
            CopyOutcome::Copied => self.show_toast(ctx, "Copied to clipboard!"),
            CopyOutcome::ManualCopy(image) => {
                self.manual_copy = Some(ManualCopy {
                    image,
                    texture: None,
                });
                self.show_toast(ctx, "Manual copy required");
            }
        }
    }

    fn run_confirmed(&mut self, action: ConfirmAction) {
        self.interaction.cancel(&mut self.session);
        self.interaction.cancel_text(&mut self.session);
        match action {
            ConfirmAction::ClearAnnotations => self.session.clear_annotations(),
            ConfirmAction::ResetAll => self.session.reset_all(),
        }
    }

    // ── input outside the canvas ────────────────────────────────────────────

    fn poll_ingest(&mut self, ctx: &egui::Context) {
        match self.ingest.poll(&mut self.session) {
            Some(Ok(())) => {
                self.interaction.cancel(&mut self.session);
                self.interaction.cancel_text(&mut self.session);
            }
            Some(Err(_)) => self.show_toast(ctx, "Could not load that file"),
            None => {}
        }
        if self.ingest.is_busy() {
            ctx.request_repaint();
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        // Native drops often carry no MIME type; the decoder sniffs those.
        let Some(file) = dropped
            .into_iter()
            .find(|f| f.mime.is_empty() || is_image_mime(&f.mime))
        else {
            return;
        };
        if let Some(bytes) = file.bytes {
            self.ingest.start(ImageSource::Bytes {
                name: file.name,
                bytes: bytes.to_vec(),
            });
        } else if let Some(path) = file.path {
            self.ingest.start(ImageSource::Path(path));
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (undo, redo, paste) = ctx.input(|i| {
            let command = i.modifiers.command;
            let undo = command && !i.modifiers.shift && i.key_pressed(egui::Key::Z);
            let redo = command
                && (i.key_pressed(egui::Key::Y) || (i.modifiers.shift && i.key_pressed(egui::Key::Z)));
            let paste = i.events.iter().any(|e| match e {
                egui::Event::Paste(_) => true,
                egui::Event::Key {
                    key: egui::Key::V,
                    pressed: true,
                    modifiers,
                    ..
                } => modifiers.command,
                _ => false,
            });
            (undo, redo, paste)
        });
        if undo {
            self.undo(ctx);
        }
        if redo {
            self.redo(ctx);
        }
        if paste {
            self.paste_image(ctx);
        }
    }

    // ── panels ──────────────────────────────────────────────────────────────

    fn toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                let active = self.session.tool();
                for tool in Tool::ALL {
                    if ui.selectable_label(active == tool, tool.label()).clicked() {
                        self.set_tool(tool);
                    }
                }
                ui.separator();

                ui.label("Color:");
                let mut color = self.session.brush().color.to_color32();
                if ui.color_edit_button_srgba(&mut color).changed() {
                    self.session.set_color(Color::from_color32(color));
                }
                ui.label("Width:");
                let mut width = self.session.brush().stroke_width;
                let slider = egui::Slider::new(&mut width, MIN_STROKE_WIDTH..=MAX_STROKE_WIDTH)
                    .step_by(1.0)
                    .suffix("px");
                if ui.add(slider).changed() {
                    self.session.set_stroke_width(width);
                }
                ui.separator();

                let history = self.session.history();
                let (can_undo, can_redo) = (history.can_undo(), history.can_redo());
                if ui.add_enabled(can_undo, egui::Button::new("Undo")).clicked() {
                    self.undo(ctx);
                }
                if ui.add_enabled(can_redo, egui::Button::new("Redo")).clicked() {
                    self.redo(ctx);
                }
                ui.separator();

                let step = self.session.config().zoom_step;
                if ui.button("−").clicked() {
                    self.session.zoom_by(-step, None);
                }
                ui.label(format!("{}%", self.session.view().zoom_percent()));
                if ui.button("+").clicked() {
                    self.session.zoom_by(step, None);
                }
                if ui.button("Fit").clicked() {
                    self.session.fit_to_screen();
                }
                ui.separator();

                if ui.button("Open…").clicked() {
                    self.open_file_dialog();
                }
                if ui.button("Paste").clicked() {
                    self.paste_image(ctx);
                }
                if ui.button("Export").clicked() {
                    self.export_to_file(ctx);
                }
                if ui.button("Copy").clicked() {
                    self.copy_to_clipboard(ctx);
                }
                if ui.button("Reset").clicked() {
                    self.confirm = Some(ConfirmAction::ResetAll);
                }
            });
        });
    }

    fn layer_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("layers")
            .resizable(false)
            .default_width(200.0)
            .show(ctx, |ui| {
                if self.layers_watch.refresh(&self.session) {
                    self.layers = self.session.layer_entries();
                }
                ui.horizontal(|ui| {
                    ui.heading("Layers");
                    ui.label(self.layers.len().to_string());
                });
                ui.separator();

                let mut delete = None;
                let layers = &self.layers;
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for entry in layers {
                        ui.push_id(entry.id, |ui| {
                            ui.horizontal(|ui| {
                                ui.label(layer_icon(entry.kind));
                                ui.label(&entry.label);
                                let right = egui::Layout::right_to_left(egui::Align::Center);
                                ui.with_layout(right, |ui| {
                                    if ui.small_button("✕").clicked() {
                                        delete = Some(entry.index);
                                    }
                                });
                            });
                        });
                    }
                });
                if let Some(index) = delete {
                    self.session.delete_at(index);
                }

                ui.separator();
                let has_shapes = !self.session.shapes().is_empty();
                if ui
                    .add_enabled(has_shapes, egui::Button::new("Clear Annotations"))
                    .clicked()
                {
                    self.confirm = Some(ConfirmAction::ClearAnnotations);
                }
            });
    }

    // ── canvas ──────────────────────────────────────────────────────────────

    fn canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;
            self.canvas_origin = canvas_rect.min.to_vec2();
            self.session.set_viewport(canvas_rect.size());
            self.textures.sync(
                ctx,
                self.session.image(),
                self.session.config().blur_radius,
            );

            painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));
            if !self.session.has_image() {
                painter.text(
                    canvas_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Open, drop or paste an image to start",
                    egui::FontId::proportional(18.0),
                    egui::Color32::from_gray(160),
                );
            }

            self.handle_pointer(ctx, &response, canvas_rect);

            let mut surface =
                CanvasSurface::new(&painter, self.session.view(), canvas_rect, &self.textures);
            render_scene(
                &mut surface,
                Scene {
                    image_size: self.session.image().map(|i| i.size()),
                    shapes: self.session.shapes(),
                    draft: self.interaction.draft(),
                },
            );
            self.paint_watch.refresh(&self.session);

            if response.hovered() || !self.interaction.is_idle() {
                ctx.set_cursor_icon(cursor_icon(self.cursor));
            }
        });
        self.text_box(ctx);
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, response: &egui::Response, canvas: egui::Rect) {
        let typing = ctx.wants_keyboard_input();
        let (events, space, scroll, hover) = ctx.input(|i| {
            (
                i.events.clone(),
                i.key_down(egui::Key::Space),
                i.raw_scroll_delta.y,
                i.pointer.hover_pos(),
            )
        });
        let pan_modifier = space && !typing;
        let origin = canvas.min.to_vec2();
        let measure = EguiTextMeasure(ctx);

        for event in events {
            match event {
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed: true,
                    ..
                } if response.hovered() && canvas.contains(pos) => {
                    let Some(button) = map_button(button) else {
                        continue;
                    };
                    let press = PointerPress {
                        pos: pos - origin,
                        button,
                        pan_modifier,
                    };
                    self.cursor = self.interaction.pointer_down(&mut self.session, press, &measure);
                }
                egui::Event::PointerButton { pressed: false, .. } => {
                    if let Release::Committed(id) = self.interaction.pointer_up(&mut self.session) {
                        log::debug!("gesture committed shape #{id}");
                    }
                    self.cursor = CursorHint::for_tool(self.session.tool());
                }
                egui::Event::PointerMoved(pos) => {
                    self.cursor =
                        self.interaction
                            .pointer_move(&mut self.session, pos - origin, &measure);
                }
                _ => {}
            }
        }

        if pan_modifier && self.interaction.is_idle() {
            self.cursor = CursorHint::Grab;
        }

        if scroll != 0.0 && response.hovered() {
            let step = self.session.config().zoom_step;
            let delta = if scroll > 0.0 { step } else { -step };
            let pivot = hover.map(|p| p - origin);
            self.session.zoom_by(delta, pivot);
        }
    }

    fn text_box(&mut self, ctx: &egui::Context) {
        let view = self.session.view();
        let Some(pending) = self.interaction.pending_text_mut() else {
            return;
        };
        let screen = view.to_screen(pending.world) + self.canvas_origin;
        let font = egui::FontId::proportional(pending.font_size * view.scale);
        let color = pending.color.to_color32();

        let outcome = egui::Area::new(egui::Id::new("text_input"))
            .fixed_pos(screen)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                let edit = egui::TextEdit::singleline(&mut pending.buffer)
                    .font(font)
                    .text_color(color)
                    .desired_width(240.0);
                let te = ui.add(edit);
                if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                    TextBoxOutcome::Cancel
                } else if te.lost_focus() {
                    TextBoxOutcome::Commit
                } else {
                    te.request_focus();
                    TextBoxOutcome::Editing
                }
            })
            .inner;

        match outcome {
            TextBoxOutcome::Editing => {}
            TextBoxOutcome::Commit => {
                self.interaction.finalize_text(&mut self.session);
            }
            TextBoxOutcome::Cancel => self.interaction.cancel_text(&mut self.session),
        }
    }

    // ── overlays ────────────────────────────────────────────────────────────

    fn confirm_dialog(&mut self, ctx: &egui::Context) {
        let Some(action) = self.confirm else {
            return;
        };
        let mut decision = None;
        egui::Window::new(action.title())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(action.description());
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        decision = Some(false);
                    }
                    if ui.button(action.button()).clicked() {
                        decision = Some(true);
                    }
                });
            });
        match decision {
            Some(true) => {
                self.run_confirmed(action);
                self.confirm = None;
            }
            Some(false) => self.confirm = None,
            None => {}
        }
    }

    fn manual_copy_window(&mut self, ctx: &egui::Context) {
        let Some(manual) = self.manual_copy.as_mut() else {
            return;
        };
        let texture = manual.texture.get_or_insert_with(|| {
            let size = [manual.image.width() as usize, manual.image.height() as usize];
            let pixels = egui::ColorImage::from_rgba_unmultiplied(size, manual.image.as_raw());
            ctx.load_texture("manual-copy", pixels, egui::TextureOptions::LINEAR)
        });
        let texture_id = texture.id();
        let image_size = texture.size_vec2();

        let mut open = true;
        let mut save = false;
        egui::Window::new("Copy manually")
            .open(&mut open)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.label("The clipboard is unavailable here. Save the image instead:");
                let scale = (480.0 / image_size.x).min(1.0);
                ui.image((texture_id, image_size * scale));
                save = ui.button("Save as…").clicked();
            });

        if save {
            let image = manual.image.clone();
            self.save_with_dialog(ctx, &image);
        }
        if !open {
            self.manual_copy = None;
        }
    }

    fn toast_overlay(&mut self, ctx: &egui::Context) {
        let now = ctx.input(|i| i.time);
        let Some(toast) = &self.toast else {
            return;
        };
        if now > toast.until {
            self.toast = None;
            return;
        }
        egui::Area::new(egui::Id::new("toast"))
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -24.0))
            .order(egui::Order::Tooltip)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(&toast.message);
                });
            });
        ctx.request_repaint_after(std::time::Duration::from_secs_f64(toast.until - now));
    }
}

fn map_button(button: egui::PointerButton) -> Option<PointerButton> {
    match button {
        egui::PointerButton::Primary => Some(PointerButton::Primary),
        egui::PointerButton::Middle => Some(PointerButton::Middle),
        egui::PointerButton::Secondary => Some(PointerButton::Secondary),
        _ => None,
    }
}

fn layer_icon(kind: &str) -> &'static str {
    match kind {
        "rect" => "▭",
        "circle" => "◯",
        "arrow" => "➡",
        "highlight" => "🖍",
        "blur" => "💧",
        "freehand" => "✏",
        "text" => "T",
        _ => "•",
    }
}

fn cursor_icon(hint: CursorHint) -> egui::CursorIcon {
    match hint {
        CursorHint::Default => egui::CursorIcon::Default,
        CursorHint::Move => egui::CursorIcon::Move,
        CursorHint::Grab => egui::CursorIcon::Grab,
        CursorHint::Grabbing => egui::CursorIcon::Grabbing,
        CursorHint::Crosshair => egui::CursorIcon::Crosshair,
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for AnnotateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_ingest(ctx);
        self.handle_dropped_files(ctx);
        self.handle_shortcuts(ctx);

        self.toolbar(ctx);
        self.layer_panel(ctx);
        self.canvas(ctx);

        self.confirm_dialog(ctx);
        self.manual_copy_window(ctx);
        self.toast_overlay(ctx);

        // Dialogs and overlays run after the canvas painted this frame.
        if self.paint_watch.is_stale(&self.session) {
            ctx.request_repaint();
        }
    }
}
