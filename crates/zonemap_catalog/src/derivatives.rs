use bevy::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Quality tier of a model derivative, ordered from lowest to highest.
#[derive(
    Reflect, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Quality {
    Thumb,
    Low,
    #[default]
    Medium,
    High,
    Highest,
}

impl Quality {
    pub const ALL: [Quality; 5] = [
        Quality::Thumb,
        Quality::Low,
        Quality::Medium,
        Quality::High,
        Quality::Highest,
    ];

    /// Lowercase name used in exported file names.
    pub fn name(self) -> &'static str {
        match self {
            Self::Thumb => "thumb",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Highest => "highest",
        }
    }

    fn rank(self) -> i32 {
        self as i32
    }
}

#[derive(Reflect, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DerivativeUsage {
    Web2D,
    #[default]
    Web3D,
    App3D,
    Print3D,
    Editorial3D,
}

#[derive(Reflect, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetType {
    Model,
    Geometry,
    Image,
    Texture,
    Points,
    Volume,
}

#[derive(Reflect, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapType {
    Color,
    Normal,
    Occlusion,
    Emissive,
    MetallicRoughness,
    /// Painted overlay zone map.
    Zone,
}

// ---------------------------------------------------------------------------
// Derivative + assets
// ---------------------------------------------------------------------------

#[derive(Reflect, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DerivativeAsset {
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: AssetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_type: Option<MapType>,
    /// Side length of the textures of a `Model` asset, in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<u32>,
}

impl DerivativeAsset {
    pub fn new(kind: AssetType, uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            kind,
            map_type: None,
            image_size: None,
        }
    }
}

/// One quality tier of a model for one usage.
#[derive(Reflect, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Derivative {
    #[serde(default)]
    pub usage: DerivativeUsage,
    pub quality: Quality,
    #[serde(default)]
    pub assets: Vec<DerivativeAsset>,
}

impl Derivative {
    pub fn new(usage: DerivativeUsage, quality: Quality) -> Self {
        Self {
            usage,
            quality,
            assets: Vec::new(),
        }
    }

    pub fn find_asset(&self, kind: AssetType) -> Option<&DerivativeAsset> {
        self.assets.iter().find(|a| a.kind == kind)
    }

    pub fn find_assets(&self, kind: AssetType) -> impl Iterator<Item = &DerivativeAsset> {
        self.assets.iter().filter(move |a| a.kind == kind)
    }

    pub fn create_asset(&mut self, kind: AssetType, uri: impl Into<String>) -> &mut DerivativeAsset {
        self.assets.push(DerivativeAsset::new(kind, uri));
        let last = self.assets.len() - 1;
        &mut self.assets[last]
    }

    /// Texture size of this tier, read from its model asset.
    pub fn image_size(&self) -> Option<u32> {
        self.find_asset(AssetType::Model)
            .and_then(|a| a.image_size)
            .filter(|&s| s > 0)
    }

    pub fn has_zone_map(&self) -> bool {
        self.find_assets(AssetType::Image)
            .any(|a| a.map_type == Some(MapType::Zone))
    }

    /// Registers a zone map image unless the tier already has one. Returns
    /// whether an asset was added.
    pub fn register_zone_map(&mut self, uri: impl Into<String>) -> bool {
        if self.has_zone_map() {
            return false;
        }
        self.create_asset(AssetType::Image, uri).map_type = Some(MapType::Zone);
        true
    }
}

// ---------------------------------------------------------------------------
// ModelDerivatives component
// ---------------------------------------------------------------------------

/// LOD catalog of a model plus the quality currently displayed.
#[derive(Component, Reflect, Serialize, Deserialize, Clone, Debug, Default)]
#[reflect(Component, Default)]
pub struct ModelDerivatives {
    #[serde(default)]
    pub derivatives: Vec<Derivative>,
    #[serde(default)]
    pub active_quality: Quality,
}

impl ModelDerivatives {
    /// Best derivative for `quality`: the exact tier if present, otherwise the
    /// closest lower tier, otherwise the closest higher one.
    pub fn select(&self, usage: DerivativeUsage, quality: Quality) -> Option<&Derivative> {
        let candidates = self.derivatives.iter().filter(|d| d.usage == usage);
        let lower = candidates
            .clone()
            .filter(|d| d.quality <= quality)
            .max_by_key(|d| d.quality.rank());
        lower.or_else(|| {
            candidates
                .filter(|d| d.quality > quality)
                .min_by_key(|d| d.quality.rank())
        })
    }

    pub fn select_exact(&self, usage: DerivativeUsage, quality: Quality) -> Option<&Derivative> {
        self.derivatives
            .iter()
            .find(|d| d.usage == usage && d.quality == quality)
    }

    pub fn select_exact_mut(
        &mut self,
        usage: DerivativeUsage,
        quality: Quality,
    ) -> Option<&mut Derivative> {
        self.derivatives
            .iter_mut()
            .find(|d| d.usage == usage && d.quality == quality)
    }

    /// The derivative currently displayed for interactive 3D.
    pub fn active(&self) -> Option<&Derivative> {
        self.select(DerivativeUsage::Web3D, self.active_quality)
    }

    /// Texture size of the displayed tier.
    pub fn active_image_size(&self) -> Option<u32> {
        self.active().and_then(Derivative::image_size)
    }

    /// Qualities available for `usage`, ascending.
    pub fn qualities(&self, usage: DerivativeUsage) -> Vec<Quality> {
        let mut qualities: Vec<_> = self
            .derivatives
            .iter()
            .filter(|d| d.usage == usage)
            .map(|d| d.quality)
            .collect();
        qualities.sort();
        qualities.dedup();
        qualities
    }
}

// ---------------------------------------------------------------------------
// Overlay map options
// ---------------------------------------------------------------------------

/// Zone map images the model can display, as offered to the UI.
#[derive(Component, Reflect, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[reflect(Component, Default)]
pub struct OverlayMapOptions {
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<usize>,
}

impl OverlayMapOptions {
    /// Adds `name` unless already offered. Returns whether it was added.
    pub fn add_option(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.options.contains(&name) {
            return false;
        }
        self.options.push(name);
        true
    }
}
