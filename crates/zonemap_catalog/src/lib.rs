pub mod derivatives;
pub mod format;
pub mod targets;

use bevy::prelude::*;

pub use derivatives::{
    AssetType, Derivative, DerivativeAsset, DerivativeUsage, MapType, ModelDerivatives,
    OverlayMapOptions, Quality,
};
pub use format::{DocumentError, ZoneDocument};
pub use targets::{OverlayTarget, TargetKind, Targets};

pub struct CatalogPlugin;

impl Plugin for CatalogPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<Targets>()
            .register_type::<OverlayTarget>()
            .register_type::<TargetKind>()
            .register_type::<ModelDerivatives>()
            .register_type::<Derivative>()
            .register_type::<DerivativeAsset>()
            .register_type::<OverlayMapOptions>();
    }
}
