pub mod median;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::archive::{scene_matches, DateRange, SceneFilter};
use crate::consts::{
    DEFAULT_MAX_PIXELS, DEFAULT_REFLECTANCE_SCALE, NODATA, PARALLEL_SCENE_THRESHOLD,
};
use crate::error::{LandshiftError, Result};
use crate::geometry::Region;
use crate::mask::{mask_clouds, CloudMaskParams};
use crate::raster::{check_same_grid, ImageSequence, RasterImage, Scene};

pub use median::{median_composite, nan_median};

/// Sentinel-2 L2A reflectance bands used by the 10-band composite.
pub const SENTINEL2_BANDS: [&str; 10] = [
    "B2", "B3", "B4", "B5", "B6", "B7", "B8", "B8A", "B11", "B12",
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeParams {
    /// Reflectance bands kept in the composite, in order.
    pub bands: Vec<String>,
    /// Multiplier from raw digital number to reflectance.
    pub scale: f32,
    /// Composites larger than this many pixels are rejected.
    pub max_pixels: usize,
    /// Void pixels whose centre lies outside the region.
    pub clip_to_region: bool,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            bands: SENTINEL2_BANDS.iter().map(|b| b.to_string()).collect(),
            scale: DEFAULT_REFLECTANCE_SCALE,
            max_pixels: DEFAULT_MAX_PIXELS,
            clip_to_region: true,
        }
    }
}

/// What to composite: one period of one region.
#[derive(Clone, Copy, Debug)]
pub struct CompositeRequest<'a> {
    /// Period label used in errors and logs.
    pub period: &'a str,
    pub dates: &'a DateRange,
    pub region: &'a Region,
    pub filter: &'a SceneFilter,
    pub cloud_mask: &'a CloudMaskParams,
}

/// Cloud-mask one scene, keep the composite bands and convert to reflectance.
pub fn prepare_scene(
    scene: &Scene,
    cloud_mask: &CloudMaskParams,
    params: &CompositeParams,
) -> Result<RasterImage> {
    let masked = mask_clouds(&scene.image, cloud_mask)?;
    let selected = masked.select(&params.bands)?;
    let scale = params.scale;
    Ok(selected.map_bands(|data| data.mapv(|v| v * scale)))
}

/// Build the median composite of every scene in `sequence` that falls in the
/// requested period.
///
/// Scenes outside the date range, above the cloud limit or not touching the
/// region are skipped. Fails with `DataUnavailable` when none remain.
pub fn build_composite(
    sequence: &ImageSequence,
    request: &CompositeRequest<'_>,
    params: &CompositeParams,
) -> Result<RasterImage> {
    let scenes: Vec<&Scene> = sequence
        .iter()
        .filter(|s| scene_matches(s, request.dates, request.region, request.filter))
        .collect();
    if scenes.is_empty() {
        return Err(LandshiftError::DataUnavailable {
            period: request.period.to_string(),
        });
    }
    if scenes.len() < sequence.len() {
        debug!(
            period = request.period,
            kept = scenes.len(),
            offered = sequence.len(),
            "Dropped scenes outside the period filter"
        );
    }

    let dim = scenes[0].image.dim();
    for scene in &scenes[1..] {
        check_same_grid(&scenes[0].image, &scene.image)?;
    }
    let pixels = dim.0 * dim.1;
    if pixels > params.max_pixels {
        return Err(LandshiftError::RasterTooLarge {
            pixels,
            max_pixels: params.max_pixels,
        });
    }

    let prepared: Vec<RasterImage> = if scenes.len() >= PARALLEL_SCENE_THRESHOLD {
        scenes
            .par_iter()
            .map(|s| prepare_scene(s, request.cloud_mask, params))
            .collect::<Result<_>>()?
    } else {
        scenes
            .iter()
            .map(|s| prepare_scene(s, request.cloud_mask, params))
            .collect::<Result<_>>()?
    };

    let mut composite = median_composite(&prepared)?;
    if params.clip_to_region {
        composite = clip_to_region(&composite, request.region);
    }

    let valid = valid_fraction(&composite);
    if valid == 0.0 {
        warn!(period = request.period, "Composite has no valid pixels");
    }
    info!(
        period = request.period,
        scenes = scenes.len(),
        valid_fraction = valid,
        "Composite built"
    );
    Ok(composite)
}

/// Void every pixel whose centre lies outside `region`.
pub fn clip_to_region(image: &RasterImage, region: &Region) -> RasterImage {
    let inside = region.pixel_mask(&image.transform, image.dim());
    image.map_bands(|data| {
        let mut out = data.clone();
        out.zip_mut_with(&inside, |v, &keep| {
            if !keep {
                *v = NODATA;
            }
        });
        out
    })
}

/// Fraction of pixels whose first band holds a value.
fn valid_fraction(image: &RasterImage) -> f64 {
    let Some(band) = image.bands().first() else {
        return 0.0;
    };
    let total = band.data.len();
    if total == 0 {
        return 0.0;
    }
    let valid = band.data.iter().filter(|v| !v.is_nan()).count();
    valid as f64 / total as f64
}
