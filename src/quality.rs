use bevy::prelude::*;
use zonemap_catalog::ModelDerivatives;

use crate::{controller::OverlayController, events::OverlayRedraw};

/// Resamples the active raster when the model switches LOD tier.
pub(crate) fn resample_on_quality_change(
    mut controller: ResMut<OverlayController>,
    derivatives: Query<&ModelDerivatives, Changed<ModelDerivatives>>,
    mut redraw: MessageWriter<OverlayRedraw>,
) {
    let Some(model) = controller.model_entity() else {
        return;
    };
    let Some(side) = derivatives
        .get(model)
        .ok()
        .and_then(ModelDerivatives::active_image_size)
    else {
        return;
    };
    if controller.ensure_resolution(side) {
        info!("Zone map resampled to {side}x{side}");
        redraw.write(OverlayRedraw);
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::message::Messages;
    use zonemap_catalog::{AssetType, Derivative, DerivativeUsage, Quality, Targets};

    use super::*;
    use crate::{controller::ActiveModel, settings::OverlaySettings};

    fn tier(quality: Quality, size: u32) -> Derivative {
        let mut derivative = Derivative::new(DerivativeUsage::Web3D, quality);
        derivative.create_asset(AssetType::Model, "model.glb").image_size = Some(size);
        derivative
    }

    #[test]
    fn switching_tier_resamples_active_raster() {
        let mut world = World::new();
        world.init_resource::<Messages<OverlayRedraw>>();
        let model = world
            .spawn(ModelDerivatives {
                derivatives: vec![tier(Quality::Low, 512), tier(Quality::High, 2048)],
                active_quality: Quality::Low,
            })
            .id();

        let mut controller = OverlayController::new(&OverlaySettings::default());
        controller.attach_model(
            ActiveModel {
                entity: model,
                name: "m".to_string(),
            },
            None,
            512,
            &Targets::default(),
        );
        world.insert_resource(controller);

        world.run_system_cached(resample_on_quality_change).unwrap();
        assert_eq!(world.resource::<OverlayController>().surface().unwrap().side(), 512);

        world.get_mut::<ModelDerivatives>(model).unwrap().active_quality = Quality::High;
        world.run_system_cached(resample_on_quality_change).unwrap();
        assert_eq!(world.resource::<OverlayController>().surface().unwrap().side(), 2048);
    }
}
