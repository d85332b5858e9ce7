//! Conversions between zone rasters and Bevy `Image` assets.
//!
//! GPU images are top-down while zone rasters are bottom-up, so every
//! conversion flips rows.

use bevy::asset::RenderAssetUsages;
use bevy::image::Image;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use image::RgbaImage;
use image::imageops;

/// Builds a display texture for `raster`.
pub fn raster_to_image(raster: &RgbaImage) -> Image {
    let flipped = imageops::flip_vertical(raster);
    Image::new(
        extent(raster.width(), raster.height()),
        TextureDimension::D2,
        flipped.into_raw(),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    )
}

/// Overwrites `image` with `raster`, resizing the texture if the tier size
/// changed. Rows are flipped straight into the existing pixel buffer.
pub fn write_raster(image: &mut Image, raster: &RgbaImage) {
    if image.width() != raster.width() || image.height() != raster.height() {
        image.resize(extent(raster.width(), raster.height()));
    }
    let src = raster.as_raw();
    let data = image.data.get_or_insert_with(Vec::new);
    data.resize(src.len(), 0);

    let row = raster.width() as usize * 4;
    if row == 0 {
        return;
    }
    for (dst, src) in data.chunks_exact_mut(row).zip(src.chunks_exact(row).rev()) {
        dst.copy_from_slice(src);
    }
}

/// Reads any decodable texture back into raster row order. Compressed or
/// exotic formats that cannot be converted yield `None`.
pub fn image_to_raster(image: &Image) -> Option<RgbaImage> {
    let dynamic = image.clone().try_into_dynamic().ok()?;
    let mut raster = dynamic.to_rgba8();
    imageops::flip_vertical_in_place(&mut raster);
    Some(raster)
}

fn extent(width: u32, height: u32) -> Extent3d {
    Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}
