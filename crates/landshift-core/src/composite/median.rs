use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::{NODATA, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{LandshiftError, Result};
use crate::raster::{check_same_grid, Band, RasterImage};

/// Composite images by taking the per-band, per-pixel median of valid values.
///
/// No-data (`NaN`) values are skipped; a pixel with no valid value in any
/// image stays no-data. Every image must carry the bands of the first one on
/// the same grid. Parallelizes at the row level for images >= 256x256.
pub fn median_composite(images: &[RasterImage]) -> Result<RasterImage> {
    let Some(first) = images.first() else {
        return Err(LandshiftError::EmptySequence);
    };
    let dim = first.dim();
    for image in &images[1..] {
        check_same_grid(first, image)?;
    }

    let mut bands = Vec::with_capacity(first.bands().len());
    for name in first.band_names() {
        let layers = images
            .iter()
            .map(|img| img.band(&name))
            .collect::<Result<Vec<_>>>()?;
        bands.push(Band::new(name, median_band(&layers, dim)));
    }
    RasterImage::from_bands(bands, first.transform)
}

fn median_band(layers: &[&Array2<f32>], (h, w): (usize, usize)) -> Array2<f32> {
    let n = layers.len();

    if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        // Row-parallel: each row allocates its own pixel_values
        let rows: Vec<Vec<f32>> = (0..h)
            .into_par_iter()
            .map(|row| {
                let mut pixel_values = Vec::with_capacity(n);
                let mut row_result = vec![NODATA; w];
                for (col, result) in row_result.iter_mut().enumerate() {
                    gather_valid(layers, row, col, &mut pixel_values);
                    *result = nan_median(&mut pixel_values);
                }
                row_result
            })
            .collect();

        let mut result = Array2::<f32>::from_elem((h, w), NODATA);
        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
        result
    } else {
        let mut result = Array2::<f32>::from_elem((h, w), NODATA);
        let mut pixel_values = Vec::with_capacity(n);

        for row in 0..h {
            for col in 0..w {
                gather_valid(layers, row, col, &mut pixel_values);
                result[[row, col]] = nan_median(&mut pixel_values);
            }
        }
        result
    }
}

fn gather_valid(layers: &[&Array2<f32>], row: usize, col: usize, out: &mut Vec<f32>) {
    out.clear();
    out.extend(
        layers
            .iter()
            .map(|layer| layer[[row, col]])
            .filter(|v| !v.is_nan()),
    );
}

/// Median of `values`, which must not contain `NaN`. Empty input yields no-data.
///
/// Uses `select_nth_unstable` for O(n) median without full sort.
pub fn nan_median(values: &mut [f32]) -> f32 {
    let n = values.len();
    if n == 0 {
        NODATA
    } else if n == 1 {
        values[0]
    } else if n % 2 == 1 {
        let mid = n / 2;
        *values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b)).1
    } else {
        let mid = n / 2;
        values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        let upper = values[mid];
        let lower = *values[..mid]
            .select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b))
            .1;
        (lower + upper) / 2.0
    }
}
