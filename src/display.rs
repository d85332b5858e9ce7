use bevy::{ecs::system::SystemParam, prelude::*};
use zonemap_raster::texture::write_raster;

use crate::{controller::OverlayController, events::OverlayRedraw};

/// Zone map image of a model, in GPU orientation. Written back from the
/// paint surface on every redraw and when the model is deactivated.
#[derive(Component, Clone, Debug)]
pub struct ZoneMapTexture(pub Handle<Image>);

/// Material drawing a model's zone map over its meshes.
#[derive(Component, Clone, Debug)]
pub struct OverlayMaterial(pub Handle<StandardMaterial>);

/// Mesh entity drawing the zone map on top of its parent mesh.
#[derive(Component)]
pub struct OverlayLayer;

/// Marks a mesh that already got its overlay layer.
#[derive(Component)]
pub struct HasOverlayLayer;

/// Finds the base-color texture of a model's first textured mesh.
#[derive(SystemParam)]
pub struct BaseTextureLookup<'w, 's> {
    children: Query<'w, 's, &'static Children>,
    mesh_materials:
        Query<'w, 's, &'static MeshMaterial3d<StandardMaterial>, Without<OverlayLayer>>,
    materials: Res<'w, Assets<StandardMaterial>>,
}

impl BaseTextureLookup<'_, '_> {
    pub fn base_texture(&self, model: Entity) -> Option<Handle<Image>> {
        std::iter::once(model)
            .chain(self.children.iter_descendants(model))
            .filter_map(|entity| self.mesh_materials.get(entity).ok())
            .filter_map(|material| self.materials.get(&material.0))
            .find_map(|material| material.base_color_texture.clone())
    }
}

pub(crate) fn overlay_material(zone_map: Handle<Image>) -> StandardMaterial {
    StandardMaterial {
        base_color_texture: Some(zone_map),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        // Drawn over the base mesh without z-fighting.
        depth_bias: 1.0,
        ..default()
    }
}

pub(crate) fn create_overlay_materials(
    mut commands: Commands,
    models: Query<(Entity, &ZoneMapTexture), Without<OverlayMaterial>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (model, texture) in &models {
        let material = materials.add(overlay_material(texture.0.clone()));
        commands.entity(model).insert(OverlayMaterial(material));
    }
}

/// Gives every mesh under a zone-mapped model a child overlay mesh. Runs each
/// frame so meshes spawned later by a scene still get one.
pub(crate) fn attach_overlay_layers(
    mut commands: Commands,
    models: Query<(Entity, &OverlayMaterial)>,
    children: Query<&Children>,
    meshes: Query<&Mesh3d, (Without<OverlayLayer>, Without<HasOverlayLayer>)>,
) {
    for (model, material) in &models {
        for entity in std::iter::once(model).chain(children.iter_descendants(model)) {
            let Ok(mesh) = meshes.get(entity) else {
                continue;
            };
            commands.entity(entity).insert(HasOverlayLayer);
            commands.spawn((
                Name::new("Zone Map Layer"),
                OverlayLayer,
                Mesh3d(mesh.0.clone()),
                MeshMaterial3d(material.0.clone()),
                Transform::default(),
                ChildOf(entity),
            ));
        }
    }
}

/// Uploads the active raster to the model's zone map texture.
pub(crate) fn refresh_overlay_texture(
    mut redraws: MessageReader<OverlayRedraw>,
    controller: Res<OverlayController>,
    models: Query<(&ZoneMapTexture, Option<&OverlayMaterial>)>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if redraws.read().count() == 0 {
        return;
    }
    let (Some(model), Some(surface)) = (controller.model_entity(), controller.surface()) else {
        return;
    };
    let Ok((texture, material)) = models.get(model) else {
        debug!("Active model has no zone map texture");
        return;
    };
    let Some(image) = images.get_mut(&texture.0) else {
        return;
    };
    write_raster(image, surface.raster());

    // Touch the material so its bind group picks up the new image.
    if let Some(material) = material {
        materials.get_mut(&material.0);
    }
}
