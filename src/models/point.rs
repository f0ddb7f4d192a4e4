//! Geographic point types.

use geo_types::{Coord, MultiPoint, Point};
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};

/// Geographic point in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// True when the point lies inside [-180, 180] x [-90, 90].
    pub fn is_in_range(&self) -> bool {
        (-180.0..=180.0).contains(&self.lon) && (-90.0..=90.0).contains(&self.lat)
    }

    /// `[lon_rad, lat_rad]`
    pub fn to_radians(&self) -> [f64; 2] {
        [self.lon.to_radians(), self.lat.to_radians()]
    }
}

impl From<Point<f64>> for GeoPoint {
    fn from(p: Point<f64>) -> Self {
        Self::new(p.x(), p.y())
    }
}

impl From<Coord<f64>> for GeoPoint {
    fn from(c: Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

impl From<GeoPoint> for Point<f64> {
    fn from(p: GeoPoint) -> Self {
        Point::new(p.lon, p.lat)
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self::new(lon, lat)
    }
}

/// Ordered collection of points. Index `i` is the caller's row `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointSet {
    points: Vec<GeoPoint>,
}

impl PointSet {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    /// Build from raw numeric rows, each of which must be exactly `[lon, lat]`.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        rows.iter()
            .enumerate()
            .map(|(row, r)| match r.as_ref() {
                [lon, lat] => Ok(GeoPoint::new(*lon, *lat)),
                other => Err(MatchError::DimensionMismatch {
                    row,
                    len: other.len(),
                }),
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&GeoPoint> {
        self.points.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeoPoint> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Fail on the first point outside the valid degree ranges.
    pub fn validate_range(&self) -> Result<()> {
        match self
            .points
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_in_range())
        {
            Some((index, p)) => Err(MatchError::CoordinateRange {
                index,
                lon: p.lon,
                lat: p.lat,
            }),
            None => Ok(()),
        }
    }
}

impl From<Vec<GeoPoint>> for PointSet {
    fn from(points: Vec<GeoPoint>) -> Self {
        Self::new(points)
    }
}

impl From<&MultiPoint<f64>> for PointSet {
    fn from(mp: &MultiPoint<f64>) -> Self {
        mp.iter().map(|p| GeoPoint::from(*p)).collect()
    }
}

impl FromIterator<GeoPoint> for PointSet {
    fn from_iter<I: IntoIterator<Item = GeoPoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl std::ops::Index<usize> for PointSet {
    type Output = GeoPoint;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a GeoPoint;
    type IntoIter = std::slice::Iter<'a, GeoPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
