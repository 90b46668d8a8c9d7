use geo_types::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

/// A closed ring of vertices. The closing edge from the last vertex back to
/// the first is implicit.
pub type Ring = Vec<[f64; 2]>;

/// Vector outlines traced from one mask, in display coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracedOutline {
    /// Separate foreground regions found in the mask
    pub shapes: Vec<ComplexShape>,
    /// Dimensions of the mask grid the outline was traced from
    pub mask_width: u32,
    pub mask_height: u32,
    /// Factor applied to mask-grid vertices to reach display pixels
    pub display_scale: f64,
}

impl TracedOutline {
    pub fn empty(mask_width: u32, mask_height: u32, display_scale: f64) -> Self {
        Self {
            shapes: Vec::new(),
            mask_width,
            mask_height,
            display_scale,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Every ring, exteriors and holes alike, for even-odd filling.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        self.shapes
            .iter()
            .flat_map(|shape| std::iter::once(&shape.exterior).chain(shape.holes.iter()))
    }

    pub fn point_count(&self) -> usize {
        self.rings().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexShape {
    /// The exterior boundary of the shape (outer contour)
    pub exterior: Ring,
    /// Interior boundaries (holes within the shape)
    pub holes: Vec<Ring>,
}

fn to_line_string(ring: &[[f64; 2]]) -> LineString<f64> {
    LineString::new(ring.iter().map(|&[x, y]| Coord { x, y }).collect())
}

fn ring_length(ring: &[[f64; 2]]) -> f64 {
    if ring.len() < 2 {
        return 0.0;
    }
    let closing = std::iter::once((ring[ring.len() - 1], ring[0]));
    ring.windows(2)
        .map(|w| (w[0], w[1]))
        .chain(closing)
        .map(|(a, b)| (b[0] - a[0]).hypot(b[1] - a[1]))
        .sum()
}

impl ComplexShape {
    pub fn new(exterior: Ring) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    /// Convert to geo-types Polygon for geometric operations
    pub fn to_geo_polygon(&self) -> Polygon<f64> {
        Polygon::new(
            to_line_string(&self.exterior),
            self.holes.iter().map(|hole| to_line_string(hole)).collect(),
        )
    }

    /// Area of the shape (exterior minus holes)
    pub fn area(&self) -> f64 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }

    pub fn has_holes(&self) -> bool {
        !self.holes.is_empty()
    }

    /// Axis-aligned bounds of the exterior as `(min, max)`
    pub fn bounding_box(&self) -> ([f64; 2], [f64; 2]) {
        let mut min = [f64::INFINITY; 2];
        let mut max = [f64::NEG_INFINITY; 2];
        for &[x, y] in &self.exterior {
            min = [min[0].min(x), min[1].min(y)];
            max = [max[0].max(x), max[1].max(y)];
        }
        (min, max)
    }

    /// Perimeter including the closing edge of every ring
    pub fn perimeter(&self) -> f64 {
        ring_length(&self.exterior) + self.holes.iter().map(|h| ring_length(h)).sum::<f64>()
    }

    /// Multiply every vertex by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for ring in std::iter::once(&mut self.exterior).chain(self.holes.iter_mut()) {
            for point in ring.iter_mut() {
                point[0] *= factor;
                point[1] *= factor;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(origin: f64, side: f64) -> Ring {
        vec![
            [origin, origin],
            [origin + side, origin],
            [origin + side, origin + side],
            [origin, origin + side],
        ]
    }

    #[test]
    fn test_area_subtracts_holes() {
        let mut shape = ComplexShape::new(square(0.0, 10.0));
        assert_eq!(shape.area(), 100.0);

        shape.holes.push(square(2.0, 4.0));
        assert_eq!(shape.area(), 84.0);
        assert!(shape.has_holes());
    }

    #[test]
    fn test_perimeter_closes_rings() {
        let shape = ComplexShape::new(square(0.0, 3.0));
        assert_eq!(shape.perimeter(), 12.0);
    }

    #[test]
    fn test_scale_and_bounds() {
        let mut shape = ComplexShape::new(square(1.0, 2.0));
        shape.scale(2.5);
        assert_eq!(shape.bounding_box(), ([2.5, 2.5], [7.5, 7.5]));
    }

    #[test]
    fn test_rings_include_holes() {
        let mut shape = ComplexShape::new(square(0.0, 10.0));
        shape.holes.push(square(2.0, 2.0));
        let outline = TracedOutline {
            shapes: vec![shape, ComplexShape::new(square(20.0, 1.0))],
            mask_width: 32,
            mask_height: 32,
            display_scale: 1.0,
        };
        assert_eq!(outline.rings().count(), 3);
        assert_eq!(outline.point_count(), 12);
    }
}
