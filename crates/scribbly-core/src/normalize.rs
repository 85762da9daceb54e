//! Coordinate normalization between surfaces of different pixel sizes.
//!
//! Peers draw on viewports of whatever size their window happens to be.
//! Positions are remapped per axis so a stroke lands at the same relative
//! place, while stroke width uses the smaller of the two axis ratios so a
//! non-uniform resize never stretches a line into an ellipse.

use kurbo::{Point, Size};

/// Result of remapping a point from a source surface to a target surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    /// Remapped position in target pixels.
    pub point: Point,
    /// Uniform scale to apply to stroke widths.
    pub scale: f64,
}

impl Normalized {
    /// Scale a line width by the uniform factor.
    pub fn line_width(&self, line_size: f64) -> f64 {
        line_size * self.scale
    }
}

/// Remap `point` from `source` pixel dimensions to `target` pixel dimensions.
///
/// `source` must have strictly positive width and height. Incoming operations
/// are validated before they reach this function, so a zero-sized source is a
/// caller bug rather than a runtime case.
pub fn normalize(point: Point, source: Size, target: Size) -> Normalized {
    debug_assert!(
        source.width > 0.0 && source.height > 0.0,
        "source surface must have positive dimensions"
    );

    let ratio_x = target.width / source.width;
    let ratio_y = target.height / source.height;

    Normalized {
        point: Point::new(point.x * ratio_x, point.y * ratio_y),
        scale: ratio_x.min(ratio_y),
    }
}

/// Tuple form of [`normalize`], returning `(x', y', scale)`.
pub fn normalize_xy(
    x: f64,
    y: f64,
    source_width: f64,
    source_height: f64,
    target_width: f64,
    target_height: f64,
) -> (f64, f64, f64) {
    let n = normalize(
        Point::new(x, y),
        Size::new(source_width, source_height),
        Size::new(target_width, target_height),
    );
    (n.point.x, n.point.y, n.scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_sizes_match() {
        for &(w, h) in &[(800.0, 600.0), (1.0, 1.0), (1920.0, 1080.0), (333.0, 777.0)] {
            for &(x, y) in &[(0.0, 0.0), (12.5, 99.0), (w, h), (w / 3.0, h / 7.0)] {
                let n = normalize(Point::new(x, y), Size::new(w, h), Size::new(w, h));
                assert_eq!(n.point, Point::new(x, y));
                assert_eq!(n.scale, 1.0);
            }
        }
    }

    #[test]
    fn test_uniform_upscale() {
        let (x, y, scale) = normalize_xy(100.0, 50.0, 400.0, 300.0, 800.0, 600.0);
        assert_eq!((x, y, scale), (200.0, 100.0, 2.0));
    }

    #[test]
    fn test_non_uniform_uses_smaller_ratio_for_width() {
        // x doubles, y halves
        let n = normalize(
            Point::new(100.0, 100.0),
            Size::new(400.0, 400.0),
            Size::new(800.0, 200.0),
        );
        assert_eq!(n.point, Point::new(200.0, 50.0));
        assert_eq!(n.scale, 0.5);
        assert_eq!(n.line_width(10.0), 5.0);
    }

    #[test]
    fn test_relative_position_preserved() {
        let n = normalize(
            Point::new(300.0, 150.0),
            Size::new(600.0, 300.0),
            Size::new(1000.0, 900.0),
        );
        assert!((n.point.x / 1000.0 - 0.5).abs() < 1e-12);
        assert!((n.point.y / 900.0 - 0.5).abs() < 1e-12);
    }
}
