use bevy::{
    ecs::system::SystemParam,
    picking::mesh_picking::ray_cast::{MeshRayCast, MeshRayCastSettings, RayCastVisibility},
    prelude::*,
};

/// Picking state: which model strokes may hit, and the camera bound to the
/// current gesture.
#[derive(Resource, Default, Debug)]
pub struct SurfacePicker {
    armed: Option<Entity>,
    camera: Option<Entity>,
}

impl SurfacePicker {
    /// Restricts picking to `model` and its descendants.
    pub fn arm(&mut self, model: Entity) {
        if self.armed != Some(model) {
            self.camera = None;
        }
        self.armed = Some(model);
    }

    pub fn disarm(&mut self) {
        self.armed = None;
        self.camera = None;
    }

    pub fn armed(&self) -> Option<Entity> {
        self.armed
    }
}

/// Resolves pointer positions to UV coordinates on the armed model.
#[derive(SystemParam)]
pub struct SurfaceResolver<'w, 's> {
    picker: ResMut<'w, SurfacePicker>,
    cameras: Query<'w, 's, (Entity, &'static Camera, &'static GlobalTransform), With<Camera3d>>,
    parents: Query<'w, 's, &'static ChildOf>,
    ray_cast: MeshRayCast<'w, 's>,
}

impl SurfaceResolver<'_, '_> {
    pub fn arm(&mut self, model: Entity) {
        self.picker.arm(model);
    }

    pub fn disarm(&mut self) {
        self.picker.disarm();
    }

    /// UV under `pointer` (viewport logical pixels) in zone-raster
    /// orientation, or `None` when the ray misses the armed model.
    ///
    /// The camera is bound lazily on the first call of a gesture: the hinted
    /// camera if it is a 3D camera, otherwise the first active one.
    pub fn resolve(&mut self, pointer: Vec2, camera_hint: Option<Entity>) -> Option<Vec2> {
        let model = self.picker.armed?;

        let bound = self.picker.camera.filter(|&c| self.cameras.contains(c));
        let camera_entity = match bound {
            Some(camera) => camera,
            None => {
                let camera = camera_hint
                    .filter(|&c| self.cameras.contains(c))
                    .or_else(|| {
                        self.cameras
                            .iter()
                            .find(|(_, camera, _)| camera.is_active)
                            .map(|(entity, _, _)| entity)
                    })?;
                self.picker.camera = Some(camera);
                camera
            }
        };

        let Ok((_, camera, camera_transform)) = self.cameras.get(camera_entity) else {
            return None;
        };
        let ray = camera.viewport_to_world(camera_transform, pointer).ok()?;

        let parents = &self.parents;
        let filter = |entity: Entity| is_part_of(entity, model, parents);
        let settings = MeshRayCastSettings::default()
            .with_visibility(RayCastVisibility::Any)
            .with_filter(&filter)
            .always_early_exit();

        let (_, hit) = self.ray_cast.cast_ray(ray, &settings).first()?;
        hit.uv.map(to_raster_uv)
    }
}

/// Converts a mesh UV (top-down, as authored in glTF) to zone-raster UV
/// (bottom-up), clamped to the unit square.
pub fn to_raster_uv(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x, 1.0 - uv.y).clamp(Vec2::ZERO, Vec2::ONE)
}

fn is_part_of(entity: Entity, model: Entity, parents: &Query<&ChildOf>) -> bool {
    let mut current = entity;
    loop {
        if current == model {
            return true;
        }
        match parents.get(current) {
            Ok(&ChildOf(parent)) => current = parent,
            Err(_) => return false,
        }
    }
}
