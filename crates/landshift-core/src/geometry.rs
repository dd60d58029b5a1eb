use geo::{BoundingRect, Contains, Intersects, LineString, Point, Polygon, Rect};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::raster::{build_grid, GeoTransform};

/// Area of interest. All spatial filtering and aggregation is clipped to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RegionRing", into = "RegionRing")]
pub struct Region {
    polygon: Polygon<f64>,
}

#[derive(Serialize, Deserialize)]
struct RegionRing {
    ring: Vec<[f64; 2]>,
}

impl From<RegionRing> for Region {
    fn from(value: RegionRing) -> Self {
        Region::from_ring(value.ring)
    }
}

impl From<Region> for RegionRing {
    fn from(value: Region) -> Self {
        RegionRing { ring: value.ring() }
    }
}

impl Region {
    /// Polygon from its exterior ring. The ring is closed automatically.
    pub fn from_ring(ring: Vec<[f64; 2]>) -> Self {
        Self {
            polygon: ring_polygon(&ring),
        }
    }

    /// Axis-aligned rectangle.
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::from_ring(vec![
            [min_x, min_y],
            [max_x, min_y],
            [max_x, max_y],
            [min_x, max_y],
        ])
    }

    /// Closed exterior ring as `[x, y]` pairs.
    pub fn ring(&self) -> Vec<[f64; 2]> {
        self.polygon
            .exterior()
            .coords()
            .map(|c| [c.x, c.y])
            .collect()
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.polygon.contains(&Point::new(x, y))
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.polygon.bounding_rect()
    }

    pub fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
        self.polygon.intersects(rect)
    }

    /// Per-pixel flag: pixel centre lies inside the region.
    pub fn pixel_mask(&self, transform: &GeoTransform, dim: (usize, usize)) -> Array2<bool> {
        let bounds = self.bounding_rect();
        build_grid(dim, |row, col| {
            let (x, y) = transform.pixel_center(row, col);
            match bounds {
                Some(r) if x < r.min().x || x > r.max().x || y < r.min().y || y > r.max().y => {
                    false
                }
                Some(_) => self.contains(x, y),
                None => false,
            }
        })
    }
}

/// Geometry of a ground-truth label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum LabelGeometry {
    Point([f64; 2]),
    /// Exterior ring.
    Polygon(Vec<[f64; 2]>),
}

impl LabelGeometry {
    pub fn intersects_region(&self, region: &Region) -> bool {
        match self {
            Self::Point([x, y]) => region.contains(*x, *y),
            Self::Polygon(ring) => ring_polygon(ring).intersects(region.polygon()),
        }
    }

    /// Pixels covered by this geometry on a grid of `dim`.
    ///
    /// A point covers the pixel containing it. A polygon covers every pixel
    /// whose centre lies inside it.
    pub fn pixels(&self, transform: &GeoTransform, dim: (usize, usize)) -> Vec<(usize, usize)> {
        match self {
            Self::Point([x, y]) => transform.map_to_pixel(*x, *y, dim).into_iter().collect(),
            Self::Polygon(ring) => pixels_inside(&ring_polygon(ring), transform, dim),
        }
    }
}

/// A ground-truth geometry tagged with its class code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledFeature {
    pub class: u8,
    pub geometry: LabelGeometry,
}

impl LabeledFeature {
    pub fn point(class: u8, x: f64, y: f64) -> Self {
        Self {
            class,
            geometry: LabelGeometry::Point([x, y]),
        }
    }

    pub fn polygon(class: u8, ring: Vec<[f64; 2]>) -> Self {
        Self {
            class,
            geometry: LabelGeometry::Polygon(ring),
        }
    }
}

fn ring_polygon(ring: &[[f64; 2]]) -> Polygon<f64> {
    let coords: Vec<(f64, f64)> = ring.iter().map(|&[x, y]| (x, y)).collect();
    Polygon::new(LineString::from(coords), vec![])
}

fn pixels_inside(
    polygon: &Polygon<f64>,
    transform: &GeoTransform,
    dim: (usize, usize),
) -> Vec<(usize, usize)> {
    let Some(rect) = polygon.bounding_rect() else {
        return Vec::new();
    };
    let (h, w) = dim;
    let col_lo = ((rect.min().x - transform.origin_x) / transform.pixel_width).floor();
    let col_hi = ((rect.max().x - transform.origin_x) / transform.pixel_width).ceil();
    let row_lo = ((transform.origin_y - rect.max().y) / transform.pixel_height).floor();
    let row_hi = ((transform.origin_y - rect.min().y) / transform.pixel_height).ceil();

    let col_lo = col_lo.max(0.0) as usize;
    let row_lo = row_lo.max(0.0) as usize;
    let col_hi = (col_hi.max(0.0) as usize).min(w);
    let row_hi = (row_hi.max(0.0) as usize).min(h);

    let mut pixels = Vec::new();
    for row in row_lo..row_hi {
        for col in col_lo..col_hi {
            let (x, y) = transform.pixel_center(row, col);
            if polygon.contains(&Point::new(x, y)) {
                pixels.push((row, col));
            }
        }
    }
    pixels
}
