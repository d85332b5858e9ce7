pub mod activation;
pub mod controller;
pub mod display;
pub mod events;
pub mod export;
pub mod input;
pub mod notify;
pub mod overlay;
pub mod picking;
pub mod quality;
pub mod settings;

use bevy::{picking::mesh_picking::MeshPickingPlugin, prelude::*};
use zonemap_camera::{OrbitCameraSystems, PointerCapture};
use zonemap_catalog::CatalogPlugin;

pub use activation::ModelSubscriptions;
pub use controller::{ActiveModel, ControllerState, OverlayController};
pub use display::ZoneMapTexture;
pub use events::*;
pub use export::{ExportError, HttpUploader, OverlayUploader, PendingExports, Uploader};
pub use notify::{Notification, NotificationLevel};
pub use picking::{SurfacePicker, SurfaceResolver};
pub use settings::{ExportFormat, OverlaySettings};

/// Zone map painting on 3D models.
///
/// Inserts [`OverlaySettings`] from `zonemap.json` unless the app already
/// has them.
pub struct ZoneMapPlugin;

impl Plugin for ZoneMapPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<MeshPickingPlugin>() {
            app.add_plugins(MeshPickingPlugin);
        }
        if !app.is_plugin_added::<CatalogPlugin>() {
            app.add_plugins(CatalogPlugin);
        }

        let settings = match app.world().get_resource::<OverlaySettings>() {
            Some(settings) => settings.clone(),
            None => OverlaySettings::load(),
        };

        app.insert_resource(OverlayController::new(&settings))
            .insert_resource(settings)
            .init_resource::<SurfacePicker>()
            .init_resource::<PointerCapture>()
            .init_resource::<ModelSubscriptions>()
            .init_resource::<PendingExports>()
            .init_resource::<Uploader>()
            .add_message::<OverlayRedraw>()
            .add_message::<Notification>()
            .add_systems(
                Update,
                (
                    input::end_stroke_on_mouse_release.before(OrbitCameraSystems),
                    (
                        overlay::sync_target_selection,
                        quality::resample_on_quality_change,
                        display::create_overlay_materials,
                        display::attach_overlay_layers,
                        display::refresh_overlay_texture,
                    )
                        .chain(),
                    export::poll_exports,
                    notify::log_notifications,
                )
                    .chain(),
            )
            .add_observer(activation::on_activate_model)
            .add_observer(overlay::on_create_overlay)
            .add_observer(overlay::on_delete_overlay)
            .add_observer(overlay::on_select_target)
            .add_observer(overlay::on_set_mode)
            .add_observer(overlay::on_set_color)
            .add_observer(overlay::on_set_brush_size)
            .add_observer(overlay::on_set_brush_cap)
            .add_observer(overlay::on_set_title)
            .add_observer(overlay::on_fill_overlay)
            .add_observer(overlay::on_clear_overlay)
            .add_observer(export::on_save_overlays);
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::message::Messages;
    use zonemap_catalog::Targets;
    use zonemap_raster::{PaintMode, ZoneColor};

    use super::*;

    /// World with the engine's resources and observers, without rendering.
    fn world() -> World {
        let mut world = World::new();
        world.insert_resource(OverlayController::new(&OverlaySettings::default()));
        world.init_resource::<Messages<OverlayRedraw>>();
        world.add_observer(overlay::on_create_overlay);
        world.add_observer(overlay::on_delete_overlay);
        world.add_observer(overlay::on_set_mode);
        world.add_observer(overlay::on_set_color);
        world.add_observer(overlay::on_fill_overlay);
        world.add_observer(overlay::on_clear_overlay);
        world
    }

    fn activate(world: &mut World) -> Entity {
        let model = world.spawn((Name::new("statue"), Targets::default())).id();
        let targets = Targets::default();
        world.resource_mut::<OverlayController>().attach_model(
            ActiveModel {
                entity: model,
                name: "statue".to_string(),
            },
            None,
            64,
            &targets,
        );
        model
    }

    #[test]
    fn observers_drive_the_controller() {
        let mut world = world();
        let model = activate(&mut world);

        world.trigger(CreateOverlay);
        world.trigger(SetOverlayColor(Srgba::rgb(0.0, 0.0, 1.0)));
        world.trigger(SetPaintMode(PaintMode::Paint));
        world.trigger(FillOverlay);

        let targets = world.get::<Targets>(model).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets.active().unwrap().color, "#0000FFFF");

        let controller = world.resource::<OverlayController>();
        assert_eq!(
            controller.state(),
            ControllerState::TargetSelected {
                index: 0,
                mode: PaintMode::Paint
            }
        );
        let blue = ZoneColor::rgb(0, 0, 255);
        assert_eq!(controller.surface().unwrap().pixel(0, 0), Some(blue));
        assert!(!world.resource::<Messages<OverlayRedraw>>().is_empty());

        world.trigger(DeleteOverlay);
        assert_eq!(
            world.resource::<OverlayController>().state(),
            ControllerState::NoTarget
        );
        assert!(world.get::<Targets>(model).unwrap().is_empty());
    }

    #[test]
    fn commands_without_a_model_are_ignored() {
        let mut world = world();
        world.trigger(CreateOverlay);
        world.trigger(FillOverlay);
        world.trigger(ClearOverlay);

        let controller = world.resource::<OverlayController>();
        assert_eq!(controller.state(), ControllerState::NoTarget);
        assert!(controller.surface().is_none());
    }
}
