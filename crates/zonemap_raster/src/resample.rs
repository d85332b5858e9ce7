use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::color::ZoneColor;
use crate::surface::PaintSurface;

/// Stretches the whole of `src` onto a `side`×`side` raster.
///
/// Nearest-neighbour sampling keeps every output pixel equal to some input
/// pixel, so flat target colors survive any number of tier changes.
pub fn stretch_copy(src: &RgbaImage, side: u32) -> RgbaImage {
    let side = side.max(1);
    if src.dimensions() == (side, side) {
        return src.clone();
    }
    imageops::resize(src, side, side, FilterType::Nearest)
}

/// Export rendering of a raster: stretched to `side` and flipped to top-down
/// row order.
pub fn render_flipped(src: &RgbaImage, side: u32) -> RgbaImage {
    let mut out = stretch_copy(src, side);
    imageops::flip_vertical_in_place(&mut out);
    out
}

/// Fraction of pixels that are not background.
pub fn painted_fraction(raster: &RgbaImage) -> f64 {
    let total = raster.width() as u64 * raster.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let painted = raster
        .pixels()
        .filter(|p| !ZoneColor::from(**p).is_background())
        .count() as u64;
    painted as f64 / total as f64
}

impl PaintSurface {
    /// Resizes the raster to `side`×`side` keeping its full content and the
    /// current draw style. Returns `false` when no resize was needed.
    pub fn resample(&mut self, side: u32) -> bool {
        let side = side.max(1);
        if self.raster().dimensions() == (side, side) {
            return false;
        }
        let resized = stretch_copy(self.raster(), side);
        assert_eq!(
            resized.dimensions(),
            (side, side),
            "stretch copy produced a raster of the wrong size"
        );
        *self.raster_mut() = resized;
        true
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::Vec2;

    use super::*;
    use crate::surface::{DrawStyle, PaintMode};

    fn painted_surface() -> PaintSurface {
        let mut surface = PaintSurface::new(1024, DrawStyle::new(ZoneColor::RED, 40));
        surface.set_draw_style(ZoneColor::RED, 40, PaintMode::Paint);
        for i in 0..10 {
            let t = 0.1 + i as f32 * 0.05;
            surface.stroke(Vec2::new(t, 0.3));
            surface.stroke(Vec2::new(0.7, t));
        }
        surface
    }

    #[test]
    fn downsampling_preserves_coverage() {
        let mut surface = painted_surface();
        let before = painted_fraction(surface.raster());

        assert!(surface.resample(512));
        assert_eq!(surface.raster().dimensions(), (512, 512));
        let after = painted_fraction(surface.raster());
        assert!((before - after).abs() < 0.01, "{before} vs {after}");
    }

    #[test]
    fn round_trip_through_tiers_preserves_coverage() {
        let mut surface = painted_surface();
        let before = painted_fraction(surface.raster());

        surface.resample(2048);
        surface.resample(256);
        surface.resample(1024);
        let after = painted_fraction(surface.raster());
        assert!((before - after).abs() < 0.01, "{before} vs {after}");
    }

    #[test]
    fn resample_keeps_style_and_colors() {
        let mut surface = painted_surface();
        surface.resample(300);

        assert_eq!(surface.style().color, ZoneColor::RED);
        assert_eq!(surface.style().brush_size, 40);
        assert_eq!(surface.mode(), PaintMode::Paint);
        assert!(
            surface
                .raster()
                .pixels()
                .all(|p| matches!(ZoneColor::from(*p), ZoneColor::RED | ZoneColor::BACKGROUND))
        );
    }

    #[test]
    fn resample_to_same_size_is_a_no_op() {
        let mut surface = painted_surface();
        assert!(!surface.resample(1024));
    }

    #[test]
    fn render_flipped_inverts_rows() {
        let mut surface = PaintSurface::new(100, DrawStyle::new(ZoneColor::RED, 10));
        surface.set_draw_style(ZoneColor::RED, 10, PaintMode::Paint);
        surface.stroke(Vec2::new(0.5, 0.05));

        let out = render_flipped(surface.raster(), 50);
        assert_eq!(out.dimensions(), (50, 50));
        assert_eq!(ZoneColor::from(*out.get_pixel(25, 48)), ZoneColor::RED);
        assert!(ZoneColor::from(*out.get_pixel(25, 1)).is_background());
    }
}
