//! Commands accepted by the overlay engine. Host UIs trigger these with
//! `commands.trigger(..)`.

use bevy::prelude::*;
use zonemap_raster::{BrushCap, PaintMode};

/// Makes `model` the model being painted. Its zone map raster is created or
/// reused and pointer input on it is routed to the paint surface.
#[derive(Event, Clone, Copy, Debug)]
pub struct ActivateOverlayModel {
    pub model: Entity,
}

/// Appends a new overlay target to the active model and selects it.
#[derive(Event, Clone, Copy, Debug, Default)]
pub struct CreateOverlay;

/// Removes the selected target.
#[derive(Event, Clone, Copy, Debug, Default)]
pub struct DeleteOverlay;

/// Encodes the active raster at each configured quality tier and uploads it.
#[derive(Event, Clone, Copy, Debug, Default)]
pub struct SaveOverlays;

#[derive(Event, Clone, Copy, Debug, Default)]
pub struct FillOverlay;

#[derive(Event, Clone, Copy, Debug, Default)]
pub struct ClearOverlay;

#[derive(Event, Clone, Debug)]
pub struct SetOverlayTitle(pub String);

#[derive(Event, Clone, Copy, Debug)]
pub struct SetOverlayColor(pub Srgba);

#[derive(Event, Clone, Copy, Debug)]
pub struct SetBrushSize(pub u32);

#[derive(Event, Clone, Copy, Debug)]
pub struct SetBrushCap(pub BrushCap);

#[derive(Event, Clone, Copy, Debug)]
pub struct SetPaintMode(pub PaintMode);

/// Selects a target of the active model by index; `None` deselects.
#[derive(Event, Clone, Copy, Debug)]
pub struct SelectOverlayTarget(pub Option<usize>);

/// Written whenever the zone raster changed and its texture must be
/// re-uploaded.
#[derive(Message, Clone, Copy, Debug, Default)]
pub struct OverlayRedraw;
