//! Zone-map rasters: the paint surface, brush and fill primitives, and the
//! resampling used when a model changes quality tier or is exported.

mod color;
mod resample;
mod surface;
pub mod texture;

pub use color::{ColorParseError, ZoneColor};
pub use resample::{painted_fraction, render_flipped, stretch_copy};
pub use surface::{
    BrushCap, DEFAULT_BRUSH_SIZE, DrawStyle, MAX_BRUSH_SIZE, MIN_BRUSH_SIZE, PaintMode,
    PaintSurface, clamp_brush_size,
};

// Re-exported so downstream crates name the same raster type.
pub use image::RgbaImage;
