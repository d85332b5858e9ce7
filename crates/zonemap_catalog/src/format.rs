use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ModelDerivatives, OverlayMapOptions, Targets};

/// On-disk description of an annotated model: where its geometry lives,
/// its LOD catalog and its overlay targets.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ZoneDocument {
    /// Model name; exported zone maps are named after it.
    pub name: String,
    /// Asset path of the glTF scene to display.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub derivatives: ModelDerivatives,
    #[serde(default)]
    pub targets: Targets,
    #[serde(default)]
    pub overlay_maps: OverlayMapOptions,
}

#[derive(thiserror::Error, Debug)]
pub enum DocumentError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid zone document: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ZoneDocument {
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}
