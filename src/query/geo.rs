//! Geospatial predicate building. Three entry points (`within`, `near`,
//! `intersects`) each await a concrete shape; the compiled predicate lands in
//! the conditions document like any other operator entry, so it composes with
//! logical combinators. The containment operator name is resolved from the
//! process-wide toggle at commit time, not at call time.

use crate::config;
use crate::errors::QueryError;
use crate::query::Query;
use bson::{Bson, Document as BsonDocument};

/// A GeoJSON-shaped value: a type tag plus coordinates.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub kind: String,
    pub coordinates: Bson,
}

impl Geometry {
    #[must_use]
    pub fn new(kind: impl Into<String>, coordinates: impl Into<Bson>) -> Self {
        Self { kind: kind.into(), coordinates: coordinates.into() }
    }

    #[must_use]
    pub fn point(x: f64, y: f64) -> Self {
        Self::new("Point", Bson::Array(vec![Bson::Double(x), Bson::Double(y)]))
    }

    #[must_use]
    pub fn polygon(rings: Vec<Vec<[f64; 2]>>) -> Self {
        let rings: Vec<Bson> = rings
            .into_iter()
            .map(|ring| Bson::Array(ring.into_iter().map(point_bson).collect()))
            .collect();
        Self::new("Polygon", Bson::Array(rings))
    }

    pub(crate) fn to_document(&self) -> BsonDocument {
        let mut doc = BsonDocument::new();
        doc.insert("type", self.kind.clone());
        doc.insert("coordinates", self.coordinates.clone());
        doc
    }
}

/// Containment circle. Both center and radius are required; `spherical`
/// selects `$centerSphere` over `$center`.
#[derive(Debug, Clone, Default)]
pub struct Circle {
    pub center: Option<[f64; 2]>,
    pub radius: Option<f64>,
    pub spherical: bool,
}

#[derive(Debug, Clone)]
pub enum NearCenter {
    Coords([f64; 2]),
    Shape(Geometry),
}

/// Nearest-first predicate. Without a center it only begins the predicate
/// and a following `geometry()` call completes it.
#[derive(Debug, Clone, Default)]
pub struct Near {
    pub center: Option<NearCenter>,
    pub min_distance: Option<f64>,
    pub max_distance: Option<f64>,
    pub spherical: bool,
}

impl Near {
    #[must_use]
    pub fn at(center: [f64; 2]) -> Self {
        Self { center: Some(NearCenter::Coords(center)), ..Self::default() }
    }

    #[must_use]
    pub fn shape(geometry: Geometry) -> Self {
        Self { center: Some(NearCenter::Shape(geometry)), ..Self::default() }
    }

    #[must_use]
    pub fn max_distance(mut self, d: f64) -> Self {
        self.max_distance = Some(d);
        self
    }

    #[must_use]
    pub fn min_distance(mut self, d: f64) -> Self {
        self.min_distance = Some(d);
        self
    }

    #[must_use]
    pub fn spherical(mut self) -> Self {
        self.spherical = true;
        self
    }
}

/// Which geo comparison is awaiting its shape.
#[derive(Debug, Clone)]
pub(crate) enum PendingGeo {
    Within,
    Intersects,
    Near { min_distance: Option<f64>, max_distance: Option<f64>, spherical: bool },
}

impl Query {
    /// Begin a containment predicate at the current path; complete it with
    /// `box_`, `circle`, `polygon`, or `geometry`.
    #[must_use]
    pub fn within(mut self) -> Self {
        self.pending_geo = Some(PendingGeo::Within);
        self
    }

    /// Begin an intersection predicate; complete it with `geometry`.
    #[must_use]
    pub fn intersects(mut self) -> Self {
        self.pending_geo = Some(PendingGeo::Intersects);
        self
    }

    /// Nearest-first predicate. With a center the predicate commits
    /// immediately; without one it awaits a `geometry` call, carrying the
    /// distance bounds along.
    #[must_use]
    pub fn near(mut self, spec: Near) -> Self {
        match spec.center {
            Some(center) => {
                self.commit_near(center, spec.min_distance, spec.max_distance, spec.spherical)
            }
            None => {
                self.pending_geo = Some(PendingGeo::Near {
                    min_distance: spec.min_distance,
                    max_distance: spec.max_distance,
                    spherical: spec.spherical,
                });
                self
            }
        }
    }

    /// Axis-aligned box, lower-left then upper-right corner. Containment
    /// only.
    #[must_use]
    pub fn box_(self, lower_left: [f64; 2], upper_right: [f64; 2]) -> Self {
        let shape = Bson::Array(vec![point_bson(lower_left), point_bson(upper_right)]);
        self.commit_containment("box_", "$box", shape)
    }

    /// Closed polygon from planar points. Containment only.
    #[must_use]
    pub fn polygon(self, points: Vec<[f64; 2]>) -> Self {
        if points.len() < 3 {
            return self.latch(QueryError::argument(
                "polygon",
                format!("a polygon needs at least 3 points, got {}", points.len()),
            ));
        }
        let shape = Bson::Array(points.into_iter().map(point_bson).collect());
        self.commit_containment("polygon", "$polygon", shape)
    }

    /// Circle with required center and radius. Containment only.
    #[must_use]
    pub fn circle(self, circle: Circle) -> Self {
        let Some(center) = circle.center else {
            return self.latch(QueryError::argument("circle", "center is required"));
        };
        let Some(radius) = circle.radius else {
            return self.latch(QueryError::argument("circle", "radius is required"));
        };
        let key = if circle.spherical { "$centerSphere" } else { "$center" };
        let shape = Bson::Array(vec![point_bson(center), Bson::Double(radius)]);
        self.commit_containment("circle", key, shape)
    }

    /// Supply a GeoJSON shape for whichever geo predicate was begun.
    /// Calling this with no pending `within`/`near`/`intersects` fails fast.
    #[must_use]
    pub fn geometry(mut self, geometry: Geometry) -> Self {
        match self.pending_geo.take() {
            Some(PendingGeo::Within) => {
                let mut inner = BsonDocument::new();
                inner.insert("$geometry", geometry.to_document());
                self.apply_operator("geometry", config::within_operator(), Bson::Document(inner))
            }
            Some(PendingGeo::Intersects) => {
                let mut inner = BsonDocument::new();
                inner.insert("$geometry", geometry.to_document());
                self.apply_operator("geometry", "$geoIntersects", Bson::Document(inner))
            }
            Some(PendingGeo::Near { min_distance, max_distance, spherical }) => self.commit_near(
                NearCenter::Shape(geometry),
                min_distance,
                max_distance,
                spherical,
            ),
            None => self.latch(QueryError::state(
                "geometry",
                "must directly follow within(), near(), or intersects()",
            )),
        }
    }

    fn commit_containment(mut self, call: &'static str, key: &str, shape: Bson) -> Self {
        match self.pending_geo.take() {
            Some(PendingGeo::Within) => {
                let mut inner = BsonDocument::new();
                inner.insert(key, shape);
                self.apply_operator(call, config::within_operator(), Bson::Document(inner))
            }
            Some(_) => self.latch(QueryError::state(
                call,
                "only a within() containment accepts box/circle/polygon shapes",
            )),
            None => self.latch(QueryError::state(call, "must directly follow within()")),
        }
    }

    fn commit_near(
        mut self,
        center: NearCenter,
        min_distance: Option<f64>,
        max_distance: Option<f64>,
        spherical: bool,
    ) -> Self {
        self.pending_geo = None;
        let op = if spherical { "$nearSphere" } else { "$near" };
        match center {
            // Legacy coordinate pair: distance bounds sit alongside $near.
            NearCenter::Coords(c) => {
                let mut q = self.apply_operator("near", op, point_bson(c));
                if let Some(d) = max_distance {
                    q = q.apply_operator("near", "$maxDistance", Bson::Double(d));
                }
                if let Some(d) = min_distance {
                    q = q.apply_operator("near", "$minDistance", Bson::Double(d));
                }
                q
            }
            // GeoJSON center: bounds nest inside the $near document.
            NearCenter::Shape(geometry) => {
                let mut inner = BsonDocument::new();
                inner.insert("$geometry", geometry.to_document());
                if let Some(d) = max_distance {
                    inner.insert("$maxDistance", Bson::Double(d));
                }
                if let Some(d) = min_distance {
                    inner.insert("$minDistance", Bson::Double(d));
                }
                self.apply_operator("near", op, Bson::Document(inner))
            }
        }
    }
}

fn point_bson(p: [f64; 2]) -> Bson {
    Bson::Array(vec![Bson::Double(p[0]), Bson::Double(p[1])])
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn box_compiles_under_configured_operator() {
        let q = Query::new("places").field("loc").within().box_([0.0, 0.0], [1.0, 1.0]);
        assert_eq!(
            q.conditions(),
            &doc! { "loc": { "$geoWithin": { "$box": [[0.0, 0.0], [1.0, 1.0]] } } }
        );
    }

    #[test]
    fn geometry_without_entry_point_fails_fast() {
        let q = Query::new("places").field("loc").geometry(Geometry::point(1.0, 2.0));
        assert!(matches!(q.chain_error(), Some(QueryError::State { call: "geometry", .. })));
    }

    #[test]
    fn circle_requires_center_and_radius() {
        let q = Query::new("places")
            .field("loc")
            .within()
            .circle(Circle { center: Some([0.0, 0.0]), ..Circle::default() });
        assert!(matches!(
            q.chain_error(),
            Some(QueryError::ArgumentShape { call: "circle", .. })
        ));
    }

    #[test]
    fn near_with_coords_writes_sibling_bounds() {
        let q = Query::new("places").field("loc").near(Near::at([1.0, 2.0]).max_distance(5.0));
        assert_eq!(
            q.conditions(),
            &doc! { "loc": { "$near": [1.0, 2.0], "$maxDistance": 5.0 } }
        );
    }

    #[test]
    fn near_with_geometry_nests_bounds() {
        let q = Query::new("places")
            .field("loc")
            .near(Near::shape(Geometry::point(1.0, 2.0)).max_distance(5.0).min_distance(1.0));
        assert_eq!(
            q.conditions(),
            &doc! { "loc": { "$near": {
                "$geometry": { "type": "Point", "coordinates": [1.0, 2.0] },
                "$maxDistance": 5.0,
                "$minDistance": 1.0,
            } } }
        );
    }

    #[test]
    fn pending_near_completed_by_geometry() {
        let q = Query::new("places")
            .field("loc")
            .near(Near::default().max_distance(9.0))
            .geometry(Geometry::point(3.0, 4.0));
        assert_eq!(
            q.conditions(),
            &doc! { "loc": { "$near": {
                "$geometry": { "type": "Point", "coordinates": [3.0, 4.0] },
                "$maxDistance": 9.0,
            } } }
        );
    }
}
