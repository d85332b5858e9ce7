use bevy::math::Vec2;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::color::ZoneColor;

pub const MIN_BRUSH_SIZE: u32 = 1;
pub const MAX_BRUSH_SIZE: u32 = 100;
pub const DEFAULT_BRUSH_SIZE: u32 = 10;

/// What a primary-button gesture on the model does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaintMode {
    /// Pointer input goes to scene navigation.
    #[default]
    Interact,
    Paint,
    Erase,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrushCap {
    #[default]
    Square,
    /// Disc inscribed in the square footprint.
    Round,
}

pub fn clamp_brush_size(size: u32) -> u32 {
    size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE)
}

/// Live stroke parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawStyle {
    pub color: ZoneColor,
    pub brush_size: u32,
    pub cap: BrushCap,
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            color: ZoneColor::RED,
            brush_size: DEFAULT_BRUSH_SIZE,
            cap: BrushCap::Square,
        }
    }
}

impl DrawStyle {
    pub fn new(color: ZoneColor, brush_size: u32) -> Self {
        Self {
            color,
            brush_size: clamp_brush_size(brush_size),
            cap: BrushCap::default(),
        }
    }

    pub fn with_cap(mut self, cap: BrushCap) -> Self {
        self.cap = cap;
        self
    }

    /// Color actually written by a stroke in `mode`.
    pub fn stroke_color(&self, mode: PaintMode) -> ZoneColor {
        match mode {
            PaintMode::Erase => ZoneColor::BACKGROUND,
            PaintMode::Paint | PaintMode::Interact => self.color,
        }
    }
}

/// Square RGBA raster in zone-map UV space plus the draw state used on it.
///
/// Rows are stored bottom-up relative to on-disk images: UV `(0, 0)` is the
/// first pixel of the buffer. Exports and GPU uploads flip vertically.
#[derive(Clone, Debug)]
pub struct PaintSurface {
    pixels: RgbaImage,
    style: DrawStyle,
    mode: PaintMode,
}

impl PaintSurface {
    /// Blank surface filled with the background color.
    pub fn new(side: u32, style: DrawStyle) -> Self {
        let side = side.max(1);
        Self {
            pixels: RgbaImage::from_pixel(side, side, ZoneColor::BACKGROUND.into()),
            style,
            mode: PaintMode::Interact,
        }
    }

    /// Wraps an existing raster. Non-square input is stretched to a square of
    /// its larger side so the raster always matches a tier size.
    pub fn from_raster(pixels: RgbaImage, style: DrawStyle) -> Self {
        let (width, height) = pixels.dimensions();
        let mut surface = Self {
            pixels,
            style,
            mode: PaintMode::Interact,
        };
        if width != height || width == 0 {
            surface.resample(width.max(height).max(1));
        }
        surface
    }

    /// Consumes the surface and hands back its raster, e.g. to rebuild it for
    /// another target or to write it back to the model.
    pub fn into_raster(self) -> RgbaImage {
        self.pixels
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.pixels
    }

    pub(crate) fn raster_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    pub fn side(&self) -> u32 {
        self.pixels.width()
    }

    pub fn style(&self) -> DrawStyle {
        self.style
    }

    pub fn mode(&self) -> PaintMode {
        self.mode
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<ZoneColor> {
        self.pixels.get_pixel_checked(x, y).copied().map(ZoneColor::from)
    }

    pub fn set_draw_style(&mut self, color: ZoneColor, brush_size: u32, mode: PaintMode) {
        self.style.color = color;
        self.style.brush_size = clamp_brush_size(brush_size);
        self.mode = mode;
    }

    pub fn set_cap(&mut self, cap: BrushCap) {
        self.style.cap = cap;
    }

    /// Color the current style and mode would stroke with.
    pub fn effective_color(&self) -> ZoneColor {
        self.style.stroke_color(self.mode)
    }

    /// Stamps one brush footprint centred on the pixel under `uv`.
    ///
    /// The centre pixel is `floor(uv * side)`, clamped to the raster. The
    /// footprint is a `brush_size` square starting `brush_size / 2` pixels
    /// before the centre, clipped at the raster edges.
    pub fn stroke_at(&mut self, uv: Vec2, color: ZoneColor, brush_size: u32) {
        let (width, height) = self.pixels.dimensions();
        let size = clamp_brush_size(brush_size) as i64;
        let cx = pixel_index(uv.x, width);
        let cy = pixel_index(uv.y, height);
        let x0 = cx - size / 2;
        let y0 = cy - size / 2;

        let radius = size as f32 / 2.0;
        let centre = Vec2::new(x0 as f32 + radius, y0 as f32 + radius);
        let pixel: Rgba<u8> = color.into();

        for y in y0.max(0)..(y0 + size).min(height as i64) {
            for x in x0.max(0)..(x0 + size).min(width as i64) {
                if self.style.cap == BrushCap::Round {
                    let offset = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - centre;
                    if offset.length_squared() > radius * radius {
                        continue;
                    }
                }
                self.pixels.put_pixel(x as u32, y as u32, pixel);
            }
        }
    }

    /// Stroke with the surface's own style and mode.
    pub fn stroke(&mut self, uv: Vec2) {
        let color = self.effective_color();
        self.stroke_at(uv, color, self.style.brush_size);
    }

    pub fn fill(&mut self, color: ZoneColor) {
        let pixel: Rgba<u8> = color.into();
        for p in self.pixels.pixels_mut() {
            *p = pixel;
        }
    }

    /// Resets every pixel to the background. The draw style is untouched, so
    /// later strokes keep using the configured color.
    pub fn clear(&mut self) {
        self.fill(ZoneColor::BACKGROUND);
    }
}

fn pixel_index(t: f32, extent: u32) -> i64 {
    let last = extent.saturating_sub(1) as i64;
    ((t * extent as f32).floor() as i64).clamp(0, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_surface(side: u32) -> PaintSurface {
        let mut surface = PaintSurface::new(side, DrawStyle::new(ZoneColor::RED, 10));
        surface.set_draw_style(ZoneColor::RED, 10, PaintMode::Paint);
        surface
    }

    #[test]
    fn stroke_fills_square_around_centre_pixel() {
        let mut surface = red_surface(1024);
        surface.stroke(Vec2::new(0.5, 0.5));

        assert_eq!(surface.pixel(512, 512), Some(ZoneColor::RED));
        assert_eq!(surface.pixel(512, 512).unwrap().to_string(), "#FF0000FF");
        // Footprint spans 507..517 on both axes.
        assert_eq!(surface.pixel(507, 507), Some(ZoneColor::RED));
        assert_eq!(surface.pixel(516, 516), Some(ZoneColor::RED));
        assert_eq!(surface.pixel(506, 512), Some(ZoneColor::BACKGROUND));
        assert_eq!(surface.pixel(517, 512), Some(ZoneColor::BACKGROUND));
        assert_eq!(surface.pixel(512, 506), Some(ZoneColor::BACKGROUND));
        assert_eq!(surface.pixel(512, 517), Some(ZoneColor::BACKGROUND));

        let painted = surface
            .raster()
            .pixels()
            .filter(|p| ZoneColor::from(**p) == ZoneColor::RED)
            .count();
        assert_eq!(painted, 100);
    }

    #[test]
    fn stroke_is_clipped_at_raster_edges() {
        let mut surface = red_surface(64);
        surface.stroke(Vec2::new(0.0, 0.0));
        surface.stroke(Vec2::new(1.0, 1.0));

        assert_eq!(surface.pixel(0, 0), Some(ZoneColor::RED));
        assert_eq!(surface.pixel(4, 4), Some(ZoneColor::RED));
        assert_eq!(surface.pixel(5, 5), Some(ZoneColor::BACKGROUND));
        assert_eq!(surface.pixel(63, 63), Some(ZoneColor::RED));
        assert_eq!(surface.pixel(58, 58), Some(ZoneColor::RED));
    }

    #[test]
    fn round_cap_leaves_corners_untouched() {
        let mut surface = red_surface(256);
        surface.set_cap(BrushCap::Round);
        surface.stroke(Vec2::new(0.5, 0.5));

        assert_eq!(surface.pixel(128, 128), Some(ZoneColor::RED));
        assert_eq!(surface.pixel(123, 123), Some(ZoneColor::BACKGROUND));
        assert_eq!(surface.pixel(132, 132), Some(ZoneColor::BACKGROUND));
        assert_eq!(surface.pixel(123, 128), Some(ZoneColor::RED));
    }

    #[test]
    fn erase_mode_writes_background() {
        let mut surface = red_surface(32);
        surface.fill(ZoneColor::RED);
        surface.set_draw_style(ZoneColor::RED, 4, PaintMode::Erase);
        assert_eq!(surface.effective_color(), ZoneColor::BACKGROUND);

        surface.stroke(Vec2::new(0.5, 0.5));
        assert_eq!(surface.pixel(16, 16), Some(ZoneColor::BACKGROUND));
        assert_eq!(surface.pixel(0, 0), Some(ZoneColor::RED));
    }

    #[test]
    fn clear_keeps_draw_style() {
        let mut surface = red_surface(16);
        surface.fill(ZoneColor::RED);
        surface.clear();

        assert!(surface.raster().pixels().all(|p| ZoneColor::from(*p).is_background()));
        assert_eq!(surface.effective_color(), ZoneColor::RED);
    }

    #[test]
    fn brush_size_is_clamped() {
        assert_eq!(clamp_brush_size(0), 1);
        assert_eq!(clamp_brush_size(250), 100);
        assert_eq!(DrawStyle::new(ZoneColor::RED, 0).brush_size, 1);
    }

    #[test]
    fn non_square_raster_is_squared() {
        let surface = PaintSurface::from_raster(RgbaImage::new(32, 16), DrawStyle::default());
        assert_eq!(surface.raster().dimensions(), (32, 32));
    }
}
