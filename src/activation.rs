use bevy::prelude::*;
use zonemap_camera::PointerCapture;
use zonemap_catalog::{ModelDerivatives, OverlayMapOptions, Targets};
use zonemap_raster::{
    RgbaImage, ZoneColor,
    texture::{image_to_raster, raster_to_image, write_raster},
};

use crate::{
    controller::{ActiveModel, OverlayController},
    display::{BaseTextureLookup, ZoneMapTexture},
    events::{ActivateOverlayModel, OverlayRedraw},
    input,
    picking::SurfacePicker,
    settings::OverlaySettings,
};

/// Observer entities listening to pointer events on the active model.
#[derive(Resource, Default, Debug)]
pub struct ModelSubscriptions {
    pub observers: Vec<Entity>,
}

impl ModelSubscriptions {
    fn unsubscribe(&mut self, commands: &mut Commands) {
        for observer in self.observers.drain(..) {
            if let Ok(mut ec) = commands.get_entity(observer) {
                ec.despawn();
            }
        }
    }
}

/// Side of the raster for a model: its active tier size, else its base
/// texture width, else the configured fallback.
pub fn initial_raster_side(
    tier_size: Option<u32>,
    base_width: Option<u32>,
    settings: &OverlaySettings,
) -> u32 {
    tier_size
        .or(base_width)
        .filter(|&side| side > 0)
        .unwrap_or(settings.fallback_raster_size)
}

pub(crate) fn on_activate_model(
    event: On<ActivateOverlayModel>,
    mut commands: Commands,
    mut controller: ResMut<OverlayController>,
    mut subscriptions: ResMut<ModelSubscriptions>,
    mut picker: ResMut<SurfacePicker>,
    mut capture: ResMut<PointerCapture>,
    settings: Res<OverlaySettings>,
    mut images: ResMut<Assets<Image>>,
    base_textures: BaseTextureLookup,
    models: Query<(
        Option<&Name>,
        &Targets,
        Option<&ModelDerivatives>,
        Option<&ZoneMapTexture>,
    )>,
    zone_maps: Query<&ZoneMapTexture>,
    mut redraw: MessageWriter<OverlayRedraw>,
) {
    let model = event.model;
    let Ok((name, targets, derivatives, zone_map)) = models.get(model) else {
        warn!("Cannot activate overlay painting on {model}: it has no targets");
        return;
    };

    subscriptions.unsubscribe(&mut commands);
    picker.disarm();
    capture.captured = false;

    if let Some((previous, raster)) = controller.detach_model() {
        match zone_maps.get(previous) {
            Ok(texture) => {
                if let Some(image) = images.get_mut(&texture.0) {
                    write_raster(image, &raster);
                }
            }
            Err(_) => debug!("Previous model {previous} is gone, dropping its zone map"),
        }
    }

    let base = base_textures
        .base_texture(model)
        .and_then(|handle| images.get(&handle))
        .and_then(|image| {
            let raster = image_to_raster(image);
            if raster.is_none() {
                warn!("Base texture of {model} cannot be read back");
            }
            raster
        });
    let side = initial_raster_side(
        derivatives.and_then(ModelDerivatives::active_image_size),
        base.as_ref().map(|raster| raster.width()),
        &settings,
    );

    let seed = zone_map
        .and_then(|texture| images.get(&texture.0))
        .and_then(image_to_raster);
    if zone_map.is_none() {
        let blank = RgbaImage::from_pixel(side, side, ZoneColor::BACKGROUND.into());
        let handle = images.add(raster_to_image(&blank));
        commands.entity(model).insert(ZoneMapTexture(handle));
    }
    commands
        .entity(model)
        .insert_if_new(OverlayMapOptions::default());

    let name = name.map_or_else(|| format!("model-{model}"), |n| n.as_str().to_string());
    info!("Overlay painting on '{name}' ({side}x{side})");
    controller.attach_model(ActiveModel { entity: model, name }, seed, side, targets);
    controller.set_underlay(base);

    subscriptions.observers = input::subscribe(&mut commands, model);
    redraw.write(OverlayRedraw);
}
