use std::sync::Arc;

use bevy::prelude::*;
use zonemap_catalog::{OverlayTarget, Targets};
use zonemap_raster::{
    BrushCap, DrawStyle, PaintMode, PaintSurface, RgbaImage, ZoneColor, clamp_brush_size,
};

use crate::settings::OverlaySettings;

/// Observable state of the overlay controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    NoTarget,
    TargetSelected { index: usize, mode: PaintMode },
}

/// The model whose zone map is being edited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveModel {
    pub entity: Entity,
    pub name: String,
}

/// Owns the paint surface of the active (model, target) pair and the live
/// draw style, and applies target/mode/pointer transitions to them.
///
/// Every method that takes `&Targets` reads the active model's catalog; the
/// controller never holds on to it.
#[derive(Resource, Debug)]
pub struct OverlayController {
    model: Option<ActiveModel>,
    surface: Option<PaintSurface>,
    underlay: Option<RgbaImage>,
    /// Catalog index the surface was last built for.
    selected: Option<usize>,
    /// Catalog entry the style was last loaded from.
    loaded: Option<OverlayTarget>,
    style: DrawStyle,
    mode: PaintMode,
    title: String,
    painting: bool,
    created: u32,
    default_color: ZoneColor,
}

impl OverlayController {
    pub fn new(settings: &OverlaySettings) -> Self {
        Self {
            model: None,
            surface: None,
            underlay: None,
            selected: None,
            loaded: None,
            style: DrawStyle::new(settings.default_color.opaque(), settings.default_brush_size)
                .with_cap(settings.brush_cap),
            mode: PaintMode::Interact,
            title: String::new(),
            painting: false,
            created: 0,
            default_color: settings.default_color.opaque(),
        }
    }

    pub fn state(&self) -> ControllerState {
        match (self.selected, &self.surface) {
            (Some(index), Some(_)) => ControllerState::TargetSelected {
                index,
                mode: self.mode,
            },
            _ => ControllerState::NoTarget,
        }
    }

    pub fn model(&self) -> Option<&ActiveModel> {
        self.model.as_ref()
    }

    pub fn model_entity(&self) -> Option<Entity> {
        self.model.as_ref().map(|m| m.entity)
    }

    pub fn surface(&self) -> Option<&PaintSurface> {
        self.surface.as_ref()
    }

    /// Read-only copy of the model's base color texture, in raster
    /// orientation.
    pub fn underlay(&self) -> Option<&RgbaImage> {
        self.underlay.as_ref()
    }

    pub fn style(&self) -> DrawStyle {
        self.style
    }

    pub fn mode(&self) -> PaintMode {
        self.mode
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_painting(&self) -> bool {
        self.painting
    }

    // -----------------------------------------------------------------------
    // Model lifecycle
    // -----------------------------------------------------------------------

    /// Starts editing `model`. The surface is seeded from `raster` (an
    /// existing zone map) when given, stretched to `side`.
    pub fn attach_model(
        &mut self,
        model: ActiveModel,
        raster: Option<RgbaImage>,
        side: u32,
        targets: &Targets,
    ) {
        let mut surface = match raster {
            Some(raster) => PaintSurface::from_raster(raster, self.style),
            None => PaintSurface::new(side, self.style),
        };
        surface.resample(side);

        self.model = Some(model);
        self.surface = Some(surface);
        self.select_active(targets);
    }

    /// Stops editing the current model and hands back its raster so it can
    /// be written to the model's zone map texture.
    pub fn detach_model(&mut self) -> Option<(Entity, RgbaImage)> {
        self.painting = false;
        self.selected = None;
        self.loaded = None;
        self.mode = PaintMode::Interact;
        self.underlay = None;
        let model = self.model.take()?;
        let raster = self.surface.take()?.into_raster();
        Some((model.entity, raster))
    }

    pub fn set_underlay(&mut self, underlay: Option<RgbaImage>) {
        self.underlay = underlay;
    }

    // -----------------------------------------------------------------------
    // Targets
    // -----------------------------------------------------------------------

    /// Picks up a change of the catalog's active index, or of the entry it
    /// points at. Returns whether the selection was reloaded.
    pub fn sync_selection(&mut self, targets: &Targets) -> bool {
        if self.model.is_none()
            || (targets.active_index == self.selected && targets.active() == self.loaded.as_ref())
        {
            return false;
        }
        self.select_active(targets);
        true
    }

    /// Appends a new overlay target with a generated color and selects it.
    pub fn create_overlay(&mut self, targets: &mut Targets) -> usize {
        let color = ZoneColor::generated(self.created);
        let title = format!("New Overlay {}", self.created);
        self.created += 1;

        let index = targets.push_active(OverlayTarget::overlay(title, color.to_string()));
        self.select_active(targets);
        index
    }

    /// Removes the active target. Nothing is selected afterwards.
    pub fn delete_overlay(&mut self, targets: &mut Targets) -> Option<OverlayTarget> {
        let removed = targets.remove_active()?;
        self.select_active(targets);
        Some(removed)
    }

    fn select_active(&mut self, targets: &Targets) {
        self.selected = targets.active_index;
        self.loaded = targets.active().cloned();
        self.mode = PaintMode::Interact;
        self.painting = false;

        if let Some(target) = targets.active_overlay() {
            // Stored alpha is ignored; paint colors are always opaque.
            self.style.color = match target.color.parse::<ZoneColor>() {
                Ok(color) => color.opaque(),
                Err(err) => {
                    warn!("Overlay '{}' has an invalid color: {err}", target.title);
                    self.default_color
                }
            };
            self.title = target.title.clone();
        } else {
            self.title.clear();
        }

        // Each target gets a fresh surface over the model's shared raster.
        if let Some(surface) = self.surface.take() {
            self.surface = Some(PaintSurface::from_raster(surface.into_raster(), self.style));
        }
        self.apply_style();
    }

    fn apply_style(&mut self) {
        if let Some(surface) = &mut self.surface {
            surface.set_draw_style(self.style.color, self.style.brush_size, self.mode);
            surface.set_cap(self.style.cap);
        }
    }

    // -----------------------------------------------------------------------
    // Style
    // -----------------------------------------------------------------------

    pub fn set_mode(&mut self, mode: PaintMode) {
        self.mode = mode;
        if mode == PaintMode::Interact {
            self.painting = false;
        }
        self.apply_style();
    }

    /// Updates the live color and, when an overlay is selected, its stored
    /// color. User colors are always opaque.
    pub fn set_color(&mut self, color: ZoneColor, targets: &mut Targets) -> bool {
        let color = color.opaque();
        self.style.color = color;
        self.apply_style();

        match targets.active_mut().filter(|t| t.is_overlay()) {
            Some(target) => {
                target.color = color.to_string();
                self.loaded = Some(target.clone());
                true
            }
            None => false,
        }
    }

    /// Live style only; brush size is not stored per target.
    pub fn set_brush_size(&mut self, size: u32) {
        self.style.brush_size = clamp_brush_size(size);
        self.apply_style();
    }

    pub fn set_brush_cap(&mut self, cap: BrushCap) {
        self.style.cap = cap;
        self.apply_style();
    }

    pub fn set_title(&mut self, title: &str, targets: &mut Targets) -> bool {
        match targets.active_mut().filter(|t| t.is_overlay()) {
            Some(target) => {
                target.title = title.to_string();
                self.title = title.to_string();
                self.loaded = Some(target.clone());
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Raster operations
    // -----------------------------------------------------------------------

    /// Fills the whole raster with the current stroke color.
    pub fn fill(&mut self, targets: &Targets) -> bool {
        if !self.has_active_overlay(targets) {
            return false;
        }
        let color = self.style.stroke_color(self.mode);
        match &mut self.surface {
            Some(surface) => {
                surface.fill(color);
                true
            }
            None => false,
        }
    }

    /// Resets the raster to the background. The draw color is kept.
    pub fn clear(&mut self) -> bool {
        match &mut self.surface {
            Some(surface) => {
                surface.clear();
                true
            }
            None => false,
        }
    }

    /// Resamples the raster to the tier size `side`. Returns whether a
    /// resize happened.
    pub fn ensure_resolution(&mut self, side: u32) -> bool {
        self.surface
            .as_mut()
            .is_some_and(|surface| surface.resample(side))
    }

    /// Whether a primary-button gesture should paint rather than navigate.
    pub fn accepts_strokes(&self, targets: &Targets) -> bool {
        self.mode != PaintMode::Interact && self.has_active_overlay(targets)
    }

    fn has_active_overlay(&self, targets: &Targets) -> bool {
        self.surface.is_some()
            && self.selected.is_some()
            && targets.active_index == self.selected
            && targets.active_overlay().is_some()
    }

    /// Starts a paint gesture and stamps at `uv` if the pointer hit the
    /// model. Returns `false` when the gesture is ignored.
    pub fn begin_stroke(&mut self, uv: Option<Vec2>, targets: &Targets) -> bool {
        if !self.accepts_strokes(targets) {
            return false;
        }
        self.painting = true;
        if let Some(uv) = uv {
            self.stamp(uv);
        }
        true
    }

    /// Continues the current gesture. A miss skips the stamp but keeps the
    /// gesture alive.
    pub fn continue_stroke(&mut self, uv: Option<Vec2>) -> bool {
        if !self.painting {
            return false;
        }
        if let Some(uv) = uv {
            self.stamp(uv);
        }
        true
    }

    /// Ends the gesture. Returns whether one was in progress.
    pub fn end_stroke(&mut self) -> bool {
        std::mem::replace(&mut self.painting, false)
    }

    fn stamp(&mut self, uv: Vec2) {
        let color = self.style.stroke_color(self.mode);
        let brush_size = self.style.brush_size;
        if let Some(surface) = &mut self.surface {
            surface.stroke_at(uv, color, brush_size);
        }
    }

    /// Copy of the raster for background export.
    pub fn snapshot(&self) -> Option<Arc<RgbaImage>> {
        self.surface.as_ref().map(|s| Arc::new(s.raster().clone()))
    }
}
