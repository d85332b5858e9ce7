use bevy::prelude::*;
use zonemap_camera::PointerCapture;
use zonemap_catalog::{ModelDerivatives, Targets};

use crate::{
    controller::OverlayController,
    events::OverlayRedraw,
    picking::{SurfacePicker, SurfaceResolver},
};

/// Spawns the pointer observers for `model` and returns their entities so
/// they can be despawned when another model is activated.
pub(crate) fn subscribe(commands: &mut Commands, model: Entity) -> Vec<Entity> {
    vec![
        commands
            .spawn(Observer::new(on_pointer_press).with_entity(model))
            .id(),
        commands
            .spawn(Observer::new(on_pointer_drag).with_entity(model))
            .id(),
        commands
            .spawn(Observer::new(on_pointer_release).with_entity(model))
            .id(),
        commands
            .spawn(Observer::new(on_pointer_drag_end).with_entity(model))
            .id(),
    ]
}

fn on_pointer_press(
    mut press: On<Pointer<Press>>,
    mut controller: ResMut<OverlayController>,
    mut resolver: SurfaceResolver,
    mut capture: ResMut<PointerCapture>,
    models: Query<(&Targets, Option<&ModelDerivatives>)>,
    mut redraw: MessageWriter<OverlayRedraw>,
) {
    if press.button != PointerButton::Primary {
        return;
    }
    let Some(model) = controller.model_entity() else {
        return;
    };
    let Ok((targets, derivatives)) = models.get(model) else {
        return;
    };
    if !controller.accepts_strokes(targets) {
        return;
    }

    match_tier_resolution(&mut controller, derivatives);

    press.propagate(false);
    capture.captured = true;
    resolver.arm(model);
    let uv = resolver.resolve(press.pointer_location.position, Some(press.hit.camera));
    if controller.begin_stroke(uv, targets) {
        redraw.write(OverlayRedraw);
    }
}

fn on_pointer_drag(
    mut drag: On<Pointer<Drag>>,
    mut controller: ResMut<OverlayController>,
    mut resolver: SurfaceResolver,
    models: Query<&ModelDerivatives>,
    mut redraw: MessageWriter<OverlayRedraw>,
) {
    if drag.button != PointerButton::Primary || !controller.is_painting() {
        return;
    }
    drag.propagate(false);

    // The tier can change mid-gesture.
    let derivatives = controller.model_entity().and_then(|model| models.get(model).ok());
    let resized = match_tier_resolution(&mut controller, derivatives);

    let uv = resolver.resolve(drag.pointer_location.position, None);
    if (uv.is_some() && controller.continue_stroke(uv)) || resized {
        redraw.write(OverlayRedraw);
    }
}

/// Resamples the raster to the active tier before it is stamped. Returns
/// whether a resize happened.
fn match_tier_resolution(
    controller: &mut OverlayController,
    derivatives: Option<&ModelDerivatives>,
) -> bool {
    derivatives
        .and_then(ModelDerivatives::active_image_size)
        .is_some_and(|side| controller.ensure_resolution(side))
}

fn on_pointer_release(
    mut release: On<Pointer<Release>>,
    mut controller: ResMut<OverlayController>,
    mut picker: ResMut<SurfacePicker>,
    mut capture: ResMut<PointerCapture>,
) {
    if release.button != PointerButton::Primary {
        return;
    }
    if finish_gesture(&mut controller, &mut picker, &mut capture) {
        release.propagate(false);
    }
}

fn on_pointer_drag_end(
    mut drag_end: On<Pointer<DragEnd>>,
    mut controller: ResMut<OverlayController>,
    mut picker: ResMut<SurfacePicker>,
    mut capture: ResMut<PointerCapture>,
) {
    if drag_end.button != PointerButton::Primary {
        return;
    }
    if finish_gesture(&mut controller, &mut picker, &mut capture) {
        drag_end.propagate(false);
    }
}

/// Ends a gesture whose release happened off the model, where no pointer
/// observer sees it.
pub(crate) fn end_stroke_on_mouse_release(
    mouse: Res<ButtonInput<MouseButton>>,
    mut controller: ResMut<OverlayController>,
    mut picker: ResMut<SurfacePicker>,
    mut capture: ResMut<PointerCapture>,
) {
    if mouse.just_released(MouseButton::Left) || (capture.captured && !controller.is_painting()) {
        finish_gesture(&mut controller, &mut picker, &mut capture);
    }
}

fn finish_gesture(
    controller: &mut OverlayController,
    picker: &mut SurfacePicker,
    capture: &mut PointerCapture,
) -> bool {
    let was_painting = controller.end_stroke();
    if was_painting || capture.captured {
        picker.disarm();
        capture.captured = false;
    }
    was_painting
}
