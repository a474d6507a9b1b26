//! Geometry: the drawing-unit to SVG-pixel transform and polar conversion

use glam::{DVec2, dvec2};

use super::defaults;

/// Maps drawing units (origin centered, y up) to SVG pixels (origin top
/// left, y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            scale: defaults::SCALE,
            offset_x: defaults::CANVAS_WIDTH as f64 / 2.0,
            offset_y: defaults::CANVAS_HEIGHT as f64 / 2.0,
        }
    }
}

impl Transform {
    pub fn new(scale: f64, offset_x: f64, offset_y: f64) -> Self {
        Transform {
            scale,
            offset_x,
            offset_y,
        }
    }

    /// Map a point. The y axis flips here and nowhere else.
    pub fn to_svg(&self, x: f64, y: f64) -> DVec2 {
        dvec2(
            x * self.scale + self.offset_x,
            -y * self.scale + self.offset_y,
        )
    }

    /// Map a displacement: scaled and y-flipped, but not offset.
    pub fn delta_to_svg(&self, dx: f64, dy: f64) -> DVec2 {
        dvec2(dx * self.scale, -dy * self.scale)
    }

    /// The drawing origin in SVG pixels.
    pub fn origin(&self) -> DVec2 {
        self.to_svg(0.0, 0.0)
    }
}

/// Polar (degrees, drawing units) to cartesian drawing units.
pub fn polar_to_cartesian(angle_deg: f64, radius: f64) -> DVec2 {
    let rad = angle_deg.to_radians();
    dvec2(radius * rad.cos(), radius * rad.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_canvas_center() {
        let t = Transform::default();
        assert_eq!(t.origin(), dvec2(250.0, 250.0));
    }

    #[test]
    fn y_axis_flips() {
        let t = Transform::default();
        let p = t.to_svg(1.0, 1.0);
        assert!((p.x - 278.35).abs() < 1e-9);
        assert!((p.y - 221.65).abs() < 1e-9);
    }

    #[test]
    fn delta_ignores_offset() {
        let t = Transform::default();
        let d = t.delta_to_svg(1.0, 0.0);
        assert!((d.x - 28.35).abs() < 1e-9);
        assert_eq!(d.y, 0.0);
    }

    #[test]
    fn mapping_inverts_cleanly_at_any_scale() {
        for scale in [0.5, 1.0, 28.35, 100.0] {
            let t = Transform::new(scale, 250.0, 250.0);
            for (x, y) in [(0.0, 0.0), (1.25, -3.5), (-7.0, 7.0)] {
                let p = t.to_svg(x, y);
                let back_x = (p.x - t.offset_x) / t.scale;
                let back_y = -(p.y - t.offset_y) / t.scale;
                assert!((back_x - x).abs() < 1e-9);
                assert!((back_y - y).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn polar_conversion() {
        let p = polar_to_cartesian(90.0, 1.5);
        assert!(p.x.abs() < 1e-12);
        assert!((p.y - 1.5).abs() < 1e-12);

        let p = polar_to_cartesian(0.0, 2.0);
        assert!((p.x - 2.0).abs() < 1e-12);
        assert!(p.y.abs() < 1e-12);
    }
}
