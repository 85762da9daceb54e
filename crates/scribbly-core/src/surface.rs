//! Rendering surface abstraction.
//!
//! The engine never rasterizes strokes itself in a browser; it drives
//! whatever 2D surface the host provides through [`Surface`]. [`RasterSurface`]
//! is a small in-memory RGBA implementation used by headless peers and tests.

use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// How new strokes combine with existing pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CompositeMode {
    /// Ink is painted over whatever is there.
    #[default]
    PaintOver,
    /// Stroked pixels become fully transparent.
    Erase,
}

/// Raw RGBA pixels of a surface, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageData {
    /// A fully transparent image of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// RGBA value at a pixel, if inside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// True if every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }
}

/// A 2D raster surface the engine can draw on.
///
/// Mirrors the subset of an HTML canvas 2D context the drawing protocol
/// needs: path building, stroking, clearing, pixel read-back and write.
pub trait Surface {
    /// Pixel dimensions `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Select how subsequent strokes combine with existing pixels.
    fn set_composite_mode(&mut self, mode: CompositeMode);

    /// Set the width used by subsequent strokes.
    fn set_line_width(&mut self, width: f64);

    /// Discard the current path and start a new one.
    fn begin_path(&mut self);

    /// Move the pen without drawing.
    fn move_to(&mut self, point: Point);

    /// Add a line segment from the pen to `point`.
    fn line_to(&mut self, point: Point);

    /// Paint the current path.
    fn stroke(&mut self);

    /// Reset every pixel to transparent.
    fn clear(&mut self);

    /// Copy out the full surface.
    fn get_image_data(&self) -> ImageData;

    /// Write `image` at the origin, clipped to the surface bounds.
    fn put_image_data(&mut self, image: &ImageData);

    /// Pixel dimensions as a [`Size`].
    fn size(&self) -> Size {
        let (w, h) = self.dimensions();
        Size::new(w as f64, h as f64)
    }
}

/// Default ink: opaque black.
pub const DEFAULT_INK: [u8; 4] = [0, 0, 0, 255];

/// In-memory RGBA surface.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    image: ImageData,
    ink: [u8; 4],
    mode: CompositeMode,
    line_width: f64,
    /// Points of the current path.
    path: Vec<Point>,
    /// Index of the first path segment not yet stroked.
    stroked: usize,
}

impl RasterSurface {
    /// Create a transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: ImageData::blank(width, height),
            ink: DEFAULT_INK,
            mode: CompositeMode::PaintOver,
            line_width: 1.0,
            path: Vec::new(),
            stroked: 0,
        }
    }

    /// Use a different ink colour for painted strokes.
    pub fn with_ink(mut self, ink: [u8; 4]) -> Self {
        self.ink = ink;
        self
    }

    /// Current composite mode.
    pub fn composite_mode(&self) -> CompositeMode {
        self.mode
    }

    /// Current stroke width.
    pub fn line_width(&self) -> f64 {
        self.line_width
    }

    /// Borrow the pixel buffer.
    pub fn image(&self) -> &ImageData {
        &self.image
    }

    /// Resize the surface. Like a canvas element, resizing wipes it.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.image = ImageData::blank(width, height);
        self.path.clear();
        self.stroked = 0;
    }

    fn paint_segment(&mut self, a: Point, b: Point) {
        let radius = (self.line_width / 2.0).max(0.5);
        let color = match self.mode {
            CompositeMode::PaintOver => self.ink,
            CompositeMode::Erase => [0, 0, 0, 0],
        };

        let (w, h) = (self.image.width as i64, self.image.height as i64);
        let min_x = ((a.x.min(b.x) - radius).floor() as i64).max(0);
        let max_x = ((a.x.max(b.x) + radius).ceil() as i64).min(w - 1);
        let min_y = ((a.y.min(b.y) - radius).floor() as i64).max(0);
        let max_y = ((a.y.max(b.y) + radius).ceil() as i64).min(h - 1);

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let center = Point::new(px as f64 + 0.5, py as f64 + 0.5);
                if distance_to_segment(center, a, b) <= radius {
                    let i = (py as usize * self.image.width as usize + px as usize) * 4;
                    self.image.data[i..i + 4].copy_from_slice(&color);
                }
            }
        }
    }
}

impl Surface for RasterSurface {
    fn dimensions(&self) -> (u32, u32) {
        (self.image.width, self.image.height)
    }

    fn set_composite_mode(&mut self, mode: CompositeMode) {
        self.mode = mode;
    }

    fn set_line_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.line_width = width;
        }
    }

    fn begin_path(&mut self) {
        self.path.clear();
        self.stroked = 0;
    }

    fn move_to(&mut self, point: Point) {
        self.path.clear();
        self.path.push(point);
        self.stroked = 0;
    }

    fn line_to(&mut self, point: Point) {
        if self.path.is_empty() {
            // Canvas semantics: lineTo on an empty path acts as moveTo.
            self.path.push(point);
            return;
        }
        self.path.push(point);
    }

    fn stroke(&mut self) {
        let end = self.path.len().saturating_sub(1);
        for i in self.stroked..end {
            let (a, b) = (self.path[i], self.path[i + 1]);
            self.paint_segment(a, b);
        }
        self.stroked = end;
    }

    fn clear(&mut self) {
        self.image.data.fill(0);
    }

    fn get_image_data(&self) -> ImageData {
        self.image.clone()
    }

    fn put_image_data(&mut self, image: &ImageData) {
        let rows = image.height.min(self.image.height) as usize;
        let cols = image.width.min(self.image.width) as usize;
        for y in 0..rows {
            let src = y * image.width as usize * 4;
            let dst = y * self.image.width as usize * 4;
            self.image.data[dst..dst + cols * 4].copy_from_slice(&image.data[src..src + cols * 4]);
        }
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq == 0.0 {
        return (p - a).hypot();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).hypot()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_surface_is_blank() {
        let surface = RasterSurface::new(8, 4);
        assert_eq!(surface.dimensions(), (8, 4));
        assert!(surface.get_image_data().is_blank());
    }

    #[test]
    fn test_stroke_paints_segment() {
        let mut surface = RasterSurface::new(20, 20);
        surface.set_line_width(2.0);
        surface.begin_path();
        surface.move_to(Point::new(2.0, 10.0));
        surface.line_to(Point::new(18.0, 10.0));
        surface.stroke();

        let image = surface.get_image_data();
        assert_eq!(image.pixel(10, 9), Some(DEFAULT_INK));
        assert_eq!(image.pixel(10, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_erase_clears_pixels() {
        let mut surface = RasterSurface::new(20, 20);
        surface.set_line_width(6.0);
        surface.move_to(Point::new(0.0, 10.0));
        surface.line_to(Point::new(20.0, 10.0));
        surface.stroke();
        assert_eq!(surface.image().pixel(5, 10), Some(DEFAULT_INK));

        surface.set_composite_mode(CompositeMode::Erase);
        surface.begin_path();
        surface.move_to(Point::new(5.0, 0.0));
        surface.line_to(Point::new(5.0, 20.0));
        surface.stroke();
        assert_eq!(surface.image().pixel(5, 10), Some([0, 0, 0, 0]));
        assert_eq!(surface.image().pixel(15, 10), Some(DEFAULT_INK));
    }

    #[test]
    fn test_put_image_data_clips() {
        let mut small = RasterSurface::new(4, 4).with_ink([255, 0, 0, 255]);
        small.set_line_width(10.0);
        small.move_to(Point::new(0.0, 0.0));
        small.line_to(Point::new(4.0, 4.0));
        small.stroke();

        let mut big = RasterSurface::new(8, 2);
        big.put_image_data(&small.get_image_data());
        assert_eq!(big.image().pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(big.image().pixel(3, 1), Some([255, 0, 0, 255]));
        assert_eq!(big.image().pixel(6, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_clear() {
        let mut surface = RasterSurface::new(10, 10);
        surface.set_line_width(4.0);
        surface.move_to(Point::new(1.0, 1.0));
        surface.line_to(Point::new(9.0, 9.0));
        surface.stroke();
        assert!(!surface.image().is_blank());
        surface.clear();
        assert!(surface.image().is_blank());
    }
}
