use bevy::prelude::*;
use zonemap_catalog::Targets;
use zonemap_raster::ZoneColor;

use crate::{
    controller::OverlayController,
    events::{
        ClearOverlay, CreateOverlay, DeleteOverlay, FillOverlay, OverlayRedraw, SelectOverlayTarget,
        SetBrushCap, SetBrushSize, SetOverlayColor, SetOverlayTitle, SetPaintMode,
    },
};

pub(crate) fn on_create_overlay(
    _: On<CreateOverlay>,
    mut controller: ResMut<OverlayController>,
    mut targets: Query<&mut Targets>,
    mut redraw: MessageWriter<OverlayRedraw>,
) {
    let Some(mut targets) = controller.model_entity().and_then(|m| targets.get_mut(m).ok()) else {
        debug!("No active model to add an overlay to");
        return;
    };
    let index = controller.create_overlay(&mut targets);
    info!("Created overlay '{}' at {index}", controller.title());
    redraw.write(OverlayRedraw);
}

pub(crate) fn on_delete_overlay(
    _: On<DeleteOverlay>,
    mut controller: ResMut<OverlayController>,
    mut targets: Query<&mut Targets>,
    mut redraw: MessageWriter<OverlayRedraw>,
) {
    let Some(mut targets) = controller.model_entity().and_then(|m| targets.get_mut(m).ok()) else {
        return;
    };
    if let Some(removed) = controller.delete_overlay(&mut targets) {
        info!("Deleted overlay '{}'", removed.title);
        redraw.write(OverlayRedraw);
    }
}

pub(crate) fn on_select_target(
    event: On<SelectOverlayTarget>,
    mut controller: ResMut<OverlayController>,
    mut targets: Query<&mut Targets>,
    mut redraw: MessageWriter<OverlayRedraw>,
) {
    let Some(mut targets) = controller.model_entity().and_then(|m| targets.get_mut(m).ok()) else {
        return;
    };
    targets.select(event.0);
    if controller.sync_selection(&targets) {
        redraw.write(OverlayRedraw);
    }
}

/// Picks up selection changes made directly on the catalog component.
pub(crate) fn sync_target_selection(
    mut controller: ResMut<OverlayController>,
    targets: Query<&Targets, Changed<Targets>>,
    mut redraw: MessageWriter<OverlayRedraw>,
) {
    let Some(targets) = controller.model_entity().and_then(|m| targets.get(m).ok()) else {
        return;
    };
    if controller.sync_selection(targets) {
        redraw.write(OverlayRedraw);
    }
}

pub(crate) fn on_set_mode(event: On<SetPaintMode>, mut controller: ResMut<OverlayController>) {
    controller.set_mode(event.0);
}

pub(crate) fn on_set_color(
    event: On<SetOverlayColor>,
    mut controller: ResMut<OverlayController>,
    mut targets: Query<&mut Targets>,
) {
    let color = ZoneColor::from(event.0);
    match controller.model_entity().and_then(|m| targets.get_mut(m).ok()) {
        Some(mut targets) => {
            controller.set_color(color, &mut targets);
        }
        None => {
            controller.set_color(color, &mut Targets::default());
        }
    }
}

pub(crate) fn on_set_brush_size(event: On<SetBrushSize>, mut controller: ResMut<OverlayController>) {
    controller.set_brush_size(event.0);
}

pub(crate) fn on_set_brush_cap(event: On<SetBrushCap>, mut controller: ResMut<OverlayController>) {
    controller.set_brush_cap(event.0);
}

pub(crate) fn on_set_title(
    event: On<SetOverlayTitle>,
    mut controller: ResMut<OverlayController>,
    mut targets: Query<&mut Targets>,
) {
    let Some(mut targets) = controller.model_entity().and_then(|m| targets.get_mut(m).ok()) else {
        return;
    };
    if !controller.set_title(&event.0, &mut targets) {
        debug!("No overlay selected to rename");
    }
}

pub(crate) fn on_fill_overlay(
    _: On<FillOverlay>,
    mut controller: ResMut<OverlayController>,
    targets: Query<&Targets>,
    mut redraw: MessageWriter<OverlayRedraw>,
) {
    let Some(targets) = controller.model_entity().and_then(|m| targets.get(m).ok()) else {
        return;
    };
    if controller.fill(targets) {
        redraw.write(OverlayRedraw);
    }
}

pub(crate) fn on_clear_overlay(
    _: On<ClearOverlay>,
    mut controller: ResMut<OverlayController>,
    mut redraw: MessageWriter<OverlayRedraw>,
) {
    if controller.clear() {
        redraw.write(OverlayRedraw);
    }
}
