use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Number, Value as Json};
use crate::{
    error::{MaskError, Result},
    types::{ComplexShape, Ring, TracedOutline},
};

fn ring_to_positions(ring: &Ring) -> Vec<Vec<f64>> {
    // GeoJSON rings repeat the first position at the end
    ring.iter()
        .chain(ring.first())
        .map(|&[x, y]| vec![x, y])
        .collect()
}

fn positions_to_ring(positions: &[Vec<f64>]) -> Ring {
    let mut ring: Ring = positions
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| [p[0], p[1]])
        .collect();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

fn number(value: f64) -> Json {
    Number::from_f64(value).map(Json::Number).unwrap_or(Json::Null)
}

impl TracedOutline {
    pub fn to_geojson(&self) -> Result<FeatureCollection> {
        let mut features = Vec::new();

        for (i, shape) in self.shapes.iter().enumerate() {
            let mut rings = vec![ring_to_positions(&shape.exterior)];
            rings.extend(shape.holes.iter().map(ring_to_positions));
            let geometry = Geometry::new(Value::Polygon(rings));

            let mut properties = Map::new();
            properties.insert("id".to_string(), Json::Number(Number::from(i)));
            properties.insert("area".to_string(), number(shape.area()));
            properties.insert("has_holes".to_string(), Json::Bool(shape.has_holes()));
            properties.insert("hole_count".to_string(), Json::Number(Number::from(shape.holes.len())));
            properties.insert("perimeter".to_string(), number(shape.perimeter()));

            features.push(Feature {
                bbox: None,
                geometry: Some(geometry),
                id: Some(geojson::feature::Id::Number(Number::from(i))),
                properties: Some(properties),
                foreign_members: None,
            });
        }

        let mut foreign_members = Map::new();
        foreign_members.insert("mask_width".to_string(), Json::Number(Number::from(self.mask_width)));
        foreign_members.insert("mask_height".to_string(), Json::Number(Number::from(self.mask_height)));
        foreign_members.insert("display_scale".to_string(), number(self.display_scale));
        foreign_members.insert("shape_count".to_string(), Json::Number(Number::from(self.shapes.len())));

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        })
    }

    /// Export to GeoJSON and serialize to JSON string
    pub fn to_geojson_string(&self) -> Result<String> {
        let geojson = self.to_geojson()?;
        Ok(serde_json::to_string_pretty(&geojson)?)
    }

    pub fn save_geojson(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        std::fs::write(path, self.to_geojson_string()?)?;
        Ok(())
    }

    pub fn from_geojson_string(geojson_str: &str) -> Result<Self> {
        let geojson: FeatureCollection = geojson_str.parse()?;

        let foreign_members = geojson
            .foreign_members
            .as_ref()
            .ok_or_else(|| MaskError::GeometricComputation("Missing metadata in GeoJSON".to_string()))?;

        let dimension = |key: &str| {
            foreign_members
                .get(key)
                .and_then(Json::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| MaskError::GeometricComputation(format!("Missing or invalid {key}")))
        };
        let mask_width = dimension("mask_width")?;
        let mask_height = dimension("mask_height")?;
        let display_scale = foreign_members
            .get("display_scale")
            .and_then(Json::as_f64)
            .ok_or_else(|| MaskError::GeometricComputation("Missing or invalid display_scale".to_string()))?;

        let shapes = geojson
            .features
            .into_iter()
            .filter_map(|feature| match feature.geometry.map(|g| g.value) {
                Some(Value::Polygon(rings)) if !rings.is_empty() => Some(ComplexShape {
                    exterior: positions_to_ring(&rings[0]),
                    holes: rings[1..].iter().map(|r| positions_to_ring(r)).collect(),
                }),
                _ => None,
            })
            .collect();

        Ok(TracedOutline {
            shapes,
            mask_width,
            mask_height,
            display_scale,
        })
    }
}
