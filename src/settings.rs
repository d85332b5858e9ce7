use std::path::{Path, PathBuf};

use bevy::prelude::*;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use zonemap_catalog::Quality;
use zonemap_raster::{BrushCap, DEFAULT_BRUSH_SIZE, ZoneColor};

/// Encoding of exported zone maps.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// Lossless and keeps the transparent background.
    #[default]
    Png,
    /// Smaller, but the background becomes black.
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Overlay painting configuration, read from `zonemap.json`.
#[derive(Resource, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct OverlaySettings {
    /// Base URL uploaded zone maps are PUT under.
    pub asset_base_url: String,
    /// Tiers written on save, each as its own image.
    pub export_qualities: Vec<Quality>,
    pub export_format: ExportFormat,
    /// Paint color used until a target supplies one, and for targets whose
    /// stored color cannot be parsed.
    pub default_color: ZoneColor,
    pub default_brush_size: u32,
    pub brush_cap: BrushCap,
    /// Raster side used when neither the LOD catalog nor a base texture
    /// gives a size.
    pub fallback_raster_size: u32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            asset_base_url: "http://localhost:8000/".to_string(),
            export_qualities: vec![Quality::Low, Quality::Medium, Quality::High],
            export_format: ExportFormat::Png,
            default_color: ZoneColor::RED,
            default_brush_size: DEFAULT_BRUSH_SIZE,
            brush_cap: BrushCap::Square,
            fallback_raster_size: 4096,
        }
    }
}

impl OverlaySettings {
    pub const FILE_NAME: &'static str = "zonemap.json";
    /// Environment variable overriding the settings file location.
    pub const PATH_ENV: &'static str = "ZONEMAP_SETTINGS";

    /// Parses settings. The default color is made opaque.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.default_color = settings.default_color.opaque();
        Ok(settings)
    }

    /// Loads from `$ZONEMAP_SETTINGS` or `./zonemap.json`, falling back to
    /// defaults.
    pub fn load() -> Self {
        let path = std::env::var_os(Self::PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(Self::FILE_NAME));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No overlay settings at '{}', using defaults", path.display());
                return Self::default();
            }
            Err(err) => {
                warn!("Failed to read overlay settings '{}': {err}", path.display());
                return Self::default();
            }
        };
        match Self::from_json(&json) {
            Ok(settings) => {
                info!("Overlay settings loaded from {}", path.display());
                settings
            }
            Err(err) => {
                warn!("Invalid overlay settings '{}': {err}", path.display());
                Self::default()
            }
        }
    }

    /// Upload URL for an exported file.
    pub fn asset_url(&self, file_name: &str) -> String {
        let base = self.asset_base_url.trim_end_matches('/');
        if base.is_empty() {
            file_name.to_string()
        } else {
            format!("{base}/{file_name}")
        }
    }
}
