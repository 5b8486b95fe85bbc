use egui::Pos2;

use crate::hit_test::{hit_test, TextMeasure};
use crate::session::Session;
use crate::shape::{font_size_for, Color, Shape, ShapeId, Tool};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// A button press on the canvas, in viewport-relative screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerPress {
    pub pos: Pos2,
    pub button: PointerButton,
    /// Whether the pan modifier (Space) is held.
    pub pan_modifier: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    Move,
    Grab,
    Grabbing,
    Crosshair,
}

impl CursorHint {
    pub fn for_tool(tool: Tool) -> Self {
        match tool {
            Tool::Select => CursorHint::Default,
            _ => CursorHint::Crosshair,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Gesture {
    Idle,
    Panning { last: Pos2 },
    DraggingShape { id: ShapeId, last: Pos2 },
    Drawing { draft: Shape },
}

/// How a gesture ended on pointer release.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    Nothing,
    Panned,
    Moved(ShapeId),
    Committed(ShapeId),
    Discarded,
}

/// Inline text box opened by a click with the text tool. The shell places
/// it at `world` through the current view, so it follows pans and zooms.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingText {
    pub world: Pos2,
    pub font_size: f32,
    pub color: Color,
    pub buffer: String,
}

/// Pointer state machine driving the session.
#[derive(Debug)]
pub struct Interaction {
    gesture: Gesture,
    pending_text: Option<PendingText>,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            gesture: Gesture::Idle,
            pending_text: None,
        }
    }
}

impl Interaction {
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    pub fn draft(&self) -> Option<&Shape> {
        match &self.gesture {
            Gesture::Drawing { draft } => Some(draft),
            _ => None,
        }
    }

    pub fn pending_text(&self) -> Option<&PendingText> {
        self.pending_text.as_ref()
    }

    pub fn pending_text_mut(&mut self) -> Option<&mut PendingText> {
        self.pending_text.as_mut()
    }

    pub fn pointer_down(
        &mut self,
        session: &mut Session,
        press: PointerPress,
        measure: &dyn TextMeasure,
    ) -> CursorHint {
        // A press elsewhere takes focus away from an open text box.
        if self.pending_text.is_some() {
            self.finalize_text(session);
        }

        let view = session.view();
        let world = view.to_world(press.pos);
        let tool = session.tool();
        let primary = press.button == PointerButton::Primary;

        if tool == Tool::Select && primary {
            if let Some(index) = hit_test(session.shapes(), world, measure) {
                let id = session.shapes()[index].id;
                self.gesture = Gesture::DraggingShape {
                    id,
                    last: press.pos,
                };
                return CursorHint::Move;
            }
        }

        if press.button == PointerButton::Middle
            || (primary && tool == Tool::Select)
            || press.pan_modifier
        {
            self.gesture = Gesture::Panning { last: press.pos };
            return CursorHint::Grabbing;
        }

        if primary && session.has_image() {
            if tool == Tool::Text {
                let brush = session.brush();
                self.pending_text = Some(PendingText {
                    world,
                    font_size: font_size_for(brush.stroke_width),
                    color: brush.color,
                    buffer: String::new(),
                });
                self.gesture = Gesture::Idle;
                return CursorHint::for_tool(tool);
            }
            let id = session.allocate_id();
            if let Some(draft) = Shape::draft(id, tool, world, &session.brush()) {
                self.gesture = Gesture::Drawing { draft };
                session.touch();
            }
        }
        CursorHint::for_tool(tool)
    }

    pub fn pointer_move(
        &mut self,
        session: &mut Session,
        pos: Pos2,
        measure: &dyn TextMeasure,
    ) -> CursorHint {
        let view = session.view();
        match &mut self.gesture {
            Gesture::DraggingShape { id, last } => {
                let delta = view.to_world_delta(pos - *last);
                *last = pos;
                let id = *id;
                if !session.translate_shape(id, delta) {
                    // The captured shape is gone (undone or deleted mid-drag).
                    self.gesture = Gesture::Idle;
                    return CursorHint::for_tool(session.tool());
                }
                CursorHint::Move
            }
            Gesture::Panning { last } => {
                let delta = pos - *last;
                *last = pos;
                session.pan_by(delta);
                CursorHint::Grabbing
            }
            Gesture::Drawing { draft } => {
                draft.extend_to(view.to_world(pos));
                session.touch();
                CursorHint::Crosshair
            }
            Gesture::Idle => match session.tool() {
                Tool::Select => {
                    let world = view.to_world(pos);
                    if hit_test(session.shapes(), world, measure).is_some() {
                        CursorHint::Move
                    } else {
                        CursorHint::Default
                    }
                }
                tool => CursorHint::for_tool(tool),
            },
        }
    }

    pub fn pointer_up(&mut self, session: &mut Session) -> Release {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => Release::Nothing,
            Gesture::Panning { .. } => Release::Panned,
            Gesture::DraggingShape { id, .. } => Release::Moved(id),
            Gesture::Drawing { draft } => {
                if draft.is_degenerate() {
                    session.touch();
                    return Release::Discarded;
                }
                let id = draft.id;
                session.commit(draft);
                Release::Committed(id)
            }
        }
    }

    /// Drops any gesture in progress; drafts are discarded.
    pub fn cancel(&mut self, session: &mut Session) {
        if !self.is_idle() {
            self.gesture = Gesture::Idle;
            session.touch();
        }
    }

    /// Switches tools, abandoning whatever gesture was active.
    pub fn set_tool(&mut self, session: &mut Session, tool: Tool) {
        self.cancel(session);
        session.set_tool(tool);
    }

    /// Commits the open text box when it holds non-blank text. The box is
    /// closed either way.
    pub fn finalize_text(&mut self, session: &mut Session) -> Option<ShapeId> {
        let pending = self.pending_text.take()?;
        let content = pending.buffer.trim();
        if content.is_empty() {
            session.touch();
            return None;
        }
        let id = session.allocate_id();
        let shape = Shape::text(id, pending.world, content, &session.brush());
        session.commit(shape);
        Some(id)
    }

    pub fn cancel_text(&mut self, session: &mut Session) {
        if self.pending_text.take().is_some() {
            session.touch();
        }
    }
}
