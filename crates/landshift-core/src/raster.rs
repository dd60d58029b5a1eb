use chrono::NaiveDate;
use geo::Rect;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::{CLASS_NODATA, DEFAULT_PIXEL_SIZE_M, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{LandshiftError, Result};

/// Affine placement of a north-up raster grid in map coordinates (metres).
///
/// `origin_x`/`origin_y` is the top-left corner of the top-left pixel.
/// Rows advance southwards by `pixel_height`, columns eastwards by `pixel_width`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, DEFAULT_PIXEL_SIZE_M)
    }
}

impl GeoTransform {
    /// Square pixels of `pixel_size` metres anchored at (`origin_x`, `origin_y`).
    pub fn new(origin_x: f64, origin_y: f64, pixel_size: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width: pixel_size,
            pixel_height: pixel_size,
        }
    }

    /// Map coordinates of the centre of pixel (`row`, `col`).
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Pixel (`row`, `col`) containing map point (`x`, `y`), if inside a grid of `dim`.
    pub fn map_to_pixel(&self, x: f64, y: f64, dim: (usize, usize)) -> Option<(usize, usize)> {
        let col = ((x - self.origin_x) / self.pixel_width).floor();
        let row = ((self.origin_y - y) / self.pixel_height).floor();
        if row < 0.0 || col < 0.0 || row >= dim.0 as f64 || col >= dim.1 as f64 {
            return None;
        }
        Some((row as usize, col as usize))
    }

    /// Ground area of one pixel in square metres.
    pub fn pixel_area_m2(&self) -> f64 {
        (self.pixel_width * self.pixel_height).abs()
    }

    /// Bounding rectangle of a grid of `dim` pixels.
    pub fn footprint(&self, dim: (usize, usize)) -> Rect<f64> {
        Rect::new(
            (self.origin_x, self.origin_y - dim.0 as f64 * self.pixel_height),
            (self.origin_x + dim.1 as f64 * self.pixel_width, self.origin_y),
        )
    }
}

/// One named band of a raster. No-data pixels are `NaN`.
#[derive(Clone, Debug)]
pub struct Band {
    pub name: String,
    pub data: Array2<f32>,
}

impl Band {
    pub fn new(name: impl Into<String>, data: Array2<f32>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A multi-band raster where every band shares one grid.
#[derive(Clone, Debug)]
pub struct RasterImage {
    bands: Vec<Band>,
    pub transform: GeoTransform,
}

impl RasterImage {
    /// An image with no bands yet.
    pub fn new(transform: GeoTransform) -> Self {
        Self {
            bands: Vec::new(),
            transform,
        }
    }

    pub fn from_bands(bands: Vec<Band>, transform: GeoTransform) -> Result<Self> {
        let mut image = Self::new(transform);
        for band in bands {
            image = image.with_band(band.name, band.data)?;
        }
        Ok(image)
    }

    /// Append a band, replacing any existing band of the same name.
    pub fn with_band(mut self, name: impl Into<String>, data: Array2<f32>) -> Result<Self> {
        let name = name.into();
        if let Some(first) = self.bands.first() {
            check_same_dim(first.data.dim(), data.dim())?;
        }
        match self.bands.iter_mut().find(|b| b.name == name) {
            Some(existing) => existing.data = data,
            None => self.bands.push(Band { name, data }),
        }
        Ok(self)
    }

    pub fn band(&self, name: &str) -> Result<&Array2<f32>> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.data)
            .ok_or_else(|| LandshiftError::MissingBand {
                band: name.to_string(),
            })
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.iter().any(|b| b.name == name)
    }

    /// Fail with `MissingBand` naming the first absent band.
    pub fn require_bands<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        for name in names {
            self.band(name.as_ref())?;
        }
        Ok(())
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<String> {
        self.bands.iter().map(|b| b.name.clone()).collect()
    }

    /// Copy of this image keeping only `names`, in that order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<RasterImage> {
        let mut bands = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            bands.push(Band::new(name, self.band(name)?.clone()));
        }
        Ok(Self {
            bands,
            transform: self.transform,
        })
    }

    /// Apply `f` to every band, keeping names and grid.
    pub fn map_bands<F>(&self, f: F) -> RasterImage
    where
        F: Fn(&Array2<f32>) -> Array2<f32>,
    {
        Self {
            bands: self
                .bands
                .iter()
                .map(|b| Band::new(b.name.clone(), f(&b.data)))
                .collect(),
            transform: self.transform,
        }
    }

    /// (height, width); (0, 0) for an image without bands.
    pub fn dim(&self) -> (usize, usize) {
        self.bands.first().map(|b| b.data.dim()).unwrap_or((0, 0))
    }

    pub fn height(&self) -> usize {
        self.dim().0
    }

    pub fn width(&self) -> usize {
        self.dim().1
    }

    pub fn pixel_count(&self) -> usize {
        let (h, w) = self.dim();
        h * w
    }

    pub fn footprint(&self) -> Rect<f64> {
        self.transform.footprint(self.dim())
    }
}

/// Acquisition metadata attached to a scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneMetadata {
    pub id: String,
    pub date: NaiveDate,
    /// Scene-level cloudy pixel percentage (0-100).
    pub cloud_fraction: f32,
}

/// One acquisition: raw bands plus metadata.
#[derive(Clone, Debug)]
pub struct Scene {
    pub image: RasterImage,
    pub metadata: SceneMetadata,
}

/// Scenes covering the same nominal region. Order is not significant.
#[derive(Clone, Debug, Default)]
pub struct ImageSequence {
    pub scenes: Vec<Scene>,
}

impl ImageSequence {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self { scenes }
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter()
    }
}

impl FromIterator<Scene> for ImageSequence {
    fn from_iter<I: IntoIterator<Item = Scene>>(iter: I) -> Self {
        Self {
            scenes: iter.into_iter().collect(),
        }
    }
}

/// A land-cover category. Codes start at 1; 0 is reserved for no-data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandClass {
    pub code: u8,
    pub name: String,
    /// Display colour (hex), carried for downstream renderers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl LandClass {
    pub fn new(code: u8, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Single-band raster of class codes; [`CLASS_NODATA`] marks unclassified pixels.
#[derive(Clone, Debug)]
pub struct ClassifiedImage {
    pub data: Array2<u8>,
    pub transform: GeoTransform,
}

impl ClassifiedImage {
    pub fn new(data: Array2<u8>, transform: GeoTransform) -> Self {
        Self { data, transform }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    /// Class at (`row`, `col`), `None` for no-data.
    pub fn class_at(&self, row: usize, col: usize) -> Option<u8> {
        match self.data[[row, col]] {
            CLASS_NODATA => None,
            code => Some(code),
        }
    }

    pub fn classified_pixel_count(&self) -> usize {
        self.data.iter().filter(|&&c| c != CLASS_NODATA).count()
    }
}

pub(crate) fn check_same_dim(expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected != actual {
        return Err(LandshiftError::DimensionMismatch {
            expected_h: expected.0,
            expected_w: expected.1,
            actual_h: actual.0,
            actual_w: actual.1,
        });
    }
    Ok(())
}

/// Both images must cover the same pixels: equal dimensions and transform.
pub(crate) fn check_same_grid(expected: &RasterImage, actual: &RasterImage) -> Result<()> {
    check_same_dim(expected.dim(), actual.dim())?;
    if expected.transform != actual.transform {
        return Err(LandshiftError::GridMismatch {
            expected_x: expected.transform.origin_x,
            expected_y: expected.transform.origin_y,
            actual_x: actual.transform.origin_x,
            actual_y: actual.transform.origin_y,
        });
    }
    Ok(())
}

/// Build an `(h, w)` grid by evaluating `f(row, col)` for every pixel.
///
/// Parallelizes at the row level for grids >= [`PARALLEL_PIXEL_THRESHOLD`] pixels.
pub(crate) fn build_grid<T, F>(dim: (usize, usize), f: F) -> Array2<T>
where
    T: Send,
    F: Fn(usize, usize) -> T + Sync,
{
    let (h, w) = dim;
    let values: Vec<T> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<T>> = (0..h)
            .into_par_iter()
            .map(|row| (0..w).map(|col| f(row, col)).collect())
            .collect();
        rows.into_iter().flatten().collect()
    } else {
        (0..h)
            .flat_map(|row| (0..w).map(move |col| (row, col)))
            .map(|(row, col)| f(row, col))
            .collect()
    };
    Array2::from_shape_vec((h, w), values).expect("grid size matches dimensions")
}
