use geo::Simplify;
use geo_types::{Coord, LineString};
use crate::{error::Result, traits::ShapePostProcessor, types::{ComplexShape, Ring}};

/// Douglas-Peucker simplification using the geo crate's implementation.
/// Tolerance is in mask-grid cells.
#[derive(Debug, Clone)]
pub struct DouglasPeuckerSimplifier {
    pub tolerance: f64,
}

impl Default for DouglasPeuckerSimplifier {
    fn default() -> Self {
        Self { tolerance: 1.0 }
    }
}

impl DouglasPeuckerSimplifier {
    fn simplify_ring(&self, ring: &Ring) -> Ring {
        // Close the ring so the seam vertex can be dropped too
        let mut coords: Vec<Coord<f64>> = ring.iter().map(|&[x, y]| Coord { x, y }).collect();
        if let Some(&first) = coords.first() {
            coords.push(first);
        }
        let simplified = LineString::new(coords).simplify(&self.tolerance);
        let mut points: Ring = simplified.coords().map(|c| [c.x, c.y]).collect();
        points.pop();
        points
    }
}

impl ShapePostProcessor for DouglasPeuckerSimplifier {
    fn process(&self, shapes: &mut [ComplexShape]) -> Result<()> {
        for shape in shapes {
            shape.exterior = self.simplify_ring(&shape.exterior);
            for hole in &mut shape.holes {
                *hole = self.simplify_ring(hole);
            }
        }
        Ok(())
    }
}

/// Drops shapes smaller than `min_area` square cells
#[derive(Debug, Clone)]
pub struct MinimumAreaFilter {
    pub min_area: f64,
}

impl Default for MinimumAreaFilter {
    fn default() -> Self {
        Self { min_area: 4.0 }
    }
}

impl ShapePostProcessor for MinimumAreaFilter {
    fn process(&self, shapes: &mut [ComplexShape]) -> Result<()> {
        for shape in shapes {
            if shape.area() < self.min_area {
                shape.exterior.clear();
                shape.holes.clear();
            }
        }
        Ok(())
    }
}

/// Clears degenerate rings and shapes with non-finite coordinates
#[derive(Debug, Clone, Default)]
pub struct GeometryValidator;

impl ShapePostProcessor for GeometryValidator {
    fn process(&self, shapes: &mut [ComplexShape]) -> Result<()> {
        for shape in shapes {
            let has_invalid_coords = shape
                .exterior
                .iter()
                .chain(shape.holes.iter().flatten())
                .any(|&[x, y]| !x.is_finite() || !y.is_finite());

            if shape.exterior.len() < 3 || has_invalid_coords {
                shape.exterior.clear();
                shape.holes.clear();
                continue;
            }

            shape.holes.retain(|hole| hole.len() >= 3);
        }
        Ok(())
    }
}
