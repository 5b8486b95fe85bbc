use egui::{Pos2, Vec2};
use image::RgbaImage;
use proptest::prelude::*;

use annotate_canvas::geometry::{ViewTransform, MAX_SCALE, MIN_SCALE};
use annotate_canvas::hit_test::{hit_test, ApproxTextMeasure};
use annotate_canvas::interaction::{Interaction, PointerButton, PointerPress, Release};
use annotate_canvas::session::Session;
use annotate_canvas::shape::{Shape, ShapeId, Tool, MIN_EXTENT};

fn session_with_image() -> Session {
    let mut session = Session::default();
    session.set_viewport(Vec2::new(800.0, 600.0));
    session.load_image(RgbaImage::new(200, 100));
    session
}

fn commit_rect(session: &mut Session, at: f32) -> ShapeId {
    let id = session.allocate_id();
    let mut shape = Shape::draft(id, Tool::Rect, Pos2::new(at, at), &session.brush())
        .expect("rect draft");
    shape.extend_to(Pos2::new(at + 20.0, at + 20.0));
    session.commit(shape);
    id
}

fn ids(session: &Session) -> Vec<ShapeId> {
    session.shapes().iter().map(|s| s.id).collect()
}

fn press(pos: Pos2) -> PointerPress {
    PointerPress {
        pos,
        button: PointerButton::Primary,
        pan_modifier: false,
    }
}

proptest! {
    #[test]
    fn screen_world_round_trip(
        scale in MIN_SCALE..MAX_SCALE,
        pan_x in -2000.0f32..2000.0,
        pan_y in -2000.0f32..2000.0,
        x in -1000.0f32..1000.0,
        y in -1000.0f32..1000.0,
    ) {
        let view = ViewTransform::new(scale, Vec2::new(pan_x, pan_y));
        let world = Pos2::new(x, y);
        let back = view.to_world(view.to_screen(world));
        prop_assert!((back - world).length() < 1e-2, "{world:?} -> {back:?}");
    }

    #[test]
    fn zoom_keeps_pivot_fixed(
        scale in MIN_SCALE..MAX_SCALE,
        target in MIN_SCALE..MAX_SCALE,
        px in 0.0f32..800.0,
        py in 0.0f32..600.0,
    ) {
        let mut view = ViewTransform::new(scale, Vec2::new(37.0, -12.0));
        let pivot = Pos2::new(px, py);
        let before = view.to_world(pivot);
        view.zoom_to(target, pivot);
        let after = view.to_world(pivot);
        prop_assert!((before - after).length() < 5e-2, "{before:?} vs {after:?}");
    }

    #[test]
    fn zoom_stays_within_bounds(deltas in prop::collection::vec(-1.0f32..1.0, 1..40)) {
        let mut view = ViewTransform::default();
        for delta in deltas {
            view.zoom_by(delta, Pos2::new(400.0, 300.0));
            prop_assert!((MIN_SCALE..=MAX_SCALE).contains(&view.scale));
        }
    }

    #[test]
    fn undo_then_redo_restores_order(total in 1usize..12, undone in 0usize..12) {
        let mut session = session_with_image();
        for i in 0..total {
            commit_rect(&mut session, i as f32);
        }
        let original = ids(&session);
        let undone = undone.min(total);

        for _ in 0..undone {
            prop_assert!(session.undo());
        }
        prop_assert_eq!(session.shapes().len(), total - undone);
        prop_assert_eq!(session.history().redo_len(), undone);

        for _ in 0..undone {
            prop_assert!(session.redo());
        }
        prop_assert!(!session.redo());
        prop_assert_eq!(ids(&session), original);
    }

    #[test]
    fn commit_after_undo_discards_redo(total in 1usize..8, undone in 1usize..8) {
        let mut session = session_with_image();
        for i in 0..total {
            commit_rect(&mut session, i as f32);
        }
        for _ in 0..undone.min(total) {
            session.undo();
        }
        let fresh = commit_rect(&mut session, 99.0);
        prop_assert_eq!(session.history().redo_len(), 0);
        prop_assert!(!session.history().can_redo());
        prop_assert_eq!(session.shapes().last().map(|s| s.id), Some(fresh));
    }

    #[test]
    fn rect_drag_commits_unless_degenerate(
        sx in 100.0f32..700.0,
        sy in 100.0f32..500.0,
        dx in -80.0f32..80.0,
        dy in -80.0f32..80.0,
    ) {
        let mut session = session_with_image();
        let mut interaction = Interaction::default();
        interaction.set_tool(&mut session, Tool::Rect);

        let scale = session.view().scale;
        let (wx, wy) = (dx / scale, dy / scale);
        prop_assume!((wx.abs() - MIN_EXTENT).abs() > 0.01 && (wy.abs() - MIN_EXTENT).abs() > 0.01);

        let start = Pos2::new(sx, sy);
        interaction.pointer_down(&mut session, press(start), &ApproxTextMeasure);
        interaction.pointer_move(&mut session, start + Vec2::new(dx, dy), &ApproxTextMeasure);
        let release = interaction.pointer_up(&mut session);

        if wx.abs() < MIN_EXTENT && wy.abs() < MIN_EXTENT {
            prop_assert_eq!(release, Release::Discarded);
            prop_assert!(session.shapes().is_empty());
        } else {
            prop_assert!(matches!(release, Release::Committed(_)));
            let bounds = session.shapes()[0].bounds();
            prop_assert!((bounds.width() - wx.abs()).abs() < 1e-2);
            prop_assert!((bounds.height() - wy.abs()).abs() < 1e-2);
            prop_assert!(bounds.width() >= 0.0 && bounds.height() >= 0.0);
        }
        prop_assert!(interaction.is_idle());
    }

    #[test]
    fn panning_moves_view_not_shapes(dx in -300.0f32..300.0, dy in -300.0f32..300.0) {
        let mut session = session_with_image();
        commit_rect(&mut session, 150.0);
        let mut interaction = Interaction::default();
        interaction.set_tool(&mut session, Tool::Select);

        let before_view = session.view();
        let before_shape = session.shapes()[0].clone();
        // Top-left of the canvas lies outside the fitted image and its shapes.
        let start = Pos2::new(2.0, 2.0);
        interaction.pointer_down(&mut session, press(start), &ApproxTextMeasure);
        interaction.pointer_move(&mut session, start + Vec2::new(dx, dy), &ApproxTextMeasure);
        prop_assert_eq!(interaction.pointer_up(&mut session), Release::Panned);

        let pan = session.view().pan - before_view.pan;
        prop_assert!((pan - Vec2::new(dx, dy)).length() < 1e-3);
        prop_assert_eq!(&session.shapes()[0], &before_shape);
    }
}

#[test]
fn shape_stays_hittable_at_its_world_point_after_pan() {
    let mut session = Session::default();
    session.set_viewport(Vec2::new(800.0, 600.0));
    let id = session.allocate_id();
    let mut rect = Shape::draft(id, Tool::Rect, Pos2::new(10.0, 10.0), &session.brush())
        .expect("rect draft");
    rect.extend_to(Pos2::new(60.0, 60.0));
    session.commit(rect);

    let mut interaction = Interaction::default();
    interaction.set_tool(&mut session, Tool::Select);
    let start = Pos2::new(300.0, 300.0);
    interaction.pointer_down(&mut session, press(start), &ApproxTextMeasure);
    interaction.pointer_move(&mut session, start + Vec2::new(20.0, 20.0), &ApproxTextMeasure);
    assert_eq!(interaction.pointer_up(&mut session), Release::Panned);
    assert_eq!(session.view().pan, Vec2::new(20.0, 20.0));

    let world = Pos2::new(30.0, 30.0);
    assert_eq!(hit_test(session.shapes(), world, &ApproxTextMeasure), Some(0));
    // The same point is now found under the panned screen position.
    let under_pointer = session.view().to_world(Pos2::new(50.0, 50.0));
    assert_eq!(under_pointer, world);
    assert_eq!(hit_test(session.shapes(), under_pointer, &ApproxTextMeasure), Some(0));
    // And the old screen position no longer reaches the shape's corner.
    let old_corner = session.view().to_world(Pos2::new(12.0, 12.0));
    assert_eq!(hit_test(session.shapes(), old_corner, &ApproxTextMeasure), None);
}
