//! Spectral indices derived from surface reflectance bands.
//!
//! Every index is a pure per-pixel function. A zero denominator or a no-data
//! input yields [`NODATA`] for that pixel rather than an error.

use serde::{Deserialize, Serialize};

use crate::consts::NODATA;
use crate::error::Result;
use crate::raster::{build_grid, RasterImage};

/// Supported spectral indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index: (NIR - RED) / (NIR + RED)
    Ndvi,
    /// Enhanced Vegetation Index: 2.5 (NIR - RED) / (NIR + 6 RED - 7.5 BLUE + 1)
    Evi,
    /// Normalized Difference Water Index: (GREEN - NIR) / (GREEN + NIR)
    Ndwi,
    /// Normalized Difference Built-up Index: (SWIR - NIR) / (SWIR + NIR)
    Ndbi,
}

impl std::fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.band_name())
    }
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 4] = [Self::Ndvi, Self::Evi, Self::Ndwi, Self::Ndbi];

    /// Name of the band appended to the image.
    pub fn band_name(&self) -> &'static str {
        match self {
            Self::Ndvi => "NDVI",
            Self::Evi => "EVI",
            Self::Ndwi => "NDWI",
            Self::Ndbi => "NDBI",
        }
    }

    /// Input bands, resolved through `roles`.
    pub fn inputs<'a>(&self, roles: &'a IndexBands) -> Vec<&'a str> {
        match self {
            Self::Ndvi => vec![roles.nir.as_str(), roles.red.as_str()],
            Self::Evi => vec![roles.nir.as_str(), roles.red.as_str(), roles.blue.as_str()],
            Self::Ndwi => vec![roles.green.as_str(), roles.nir.as_str()],
            Self::Ndbi => vec![roles.swir.as_str(), roles.nir.as_str()],
        }
    }

    /// Evaluate on input values ordered as [`Self::inputs`].
    fn evaluate(&self, v: &[f32]) -> f32 {
        match self {
            Self::Ndvi | Self::Ndwi | Self::Ndbi => normalized_difference(v[0], v[1]),
            Self::Evi => enhanced_vegetation_index(v[0], v[1], v[2]),
        }
    }
}

/// Mapping from spectral role to band name. Defaults follow Sentinel-2.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexBands {
    pub blue: String,
    pub green: String,
    pub red: String,
    pub nir: String,
    pub swir: String,
}

impl Default for IndexBands {
    fn default() -> Self {
        Self {
            blue: "B2".into(),
            green: "B3".into(),
            red: "B4".into(),
            nir: "B8".into(),
            swir: "B11".into(),
        }
    }
}

/// `(a - b) / (a + b)`; no-data when either input is no-data or the sum is exactly zero.
pub fn normalized_difference(a: f32, b: f32) -> f32 {
    let sum = a + b;
    if a.is_nan() || b.is_nan() || sum == 0.0 {
        return NODATA;
    }
    (a - b) / sum
}

/// `2.5 (nir - red) / (nir + 6 red - 7.5 blue + 1)`; no-data on a zero denominator.
pub fn enhanced_vegetation_index(nir: f32, red: f32, blue: f32) -> f32 {
    let denominator = nir + 6.0 * red - 7.5 * blue + 1.0;
    if denominator.is_nan() || denominator == 0.0 {
        return NODATA;
    }
    2.5 * (nir - red) / denominator
}

/// Append the requested index bands to a copy of `image`.
///
/// All input bands are checked before any index is computed.
pub fn add_indices(
    image: &RasterImage,
    indices: &[SpectralIndex],
    roles: &IndexBands,
) -> Result<RasterImage> {
    for index in indices {
        image.require_bands(&index.inputs(roles))?;
    }

    let mut out = image.clone();
    for index in indices {
        let inputs = index
            .inputs(roles)
            .into_iter()
            .map(|name| image.band(name))
            .collect::<Result<Vec<_>>>()?;
        let data = build_grid(image.dim(), |row, col| {
            let mut values = [0.0f32; 3];
            for (slot, band) in values.iter_mut().zip(&inputs) {
                *slot = band[[row, col]];
            }
            index.evaluate(&values[..inputs.len()])
        });
        out = out.with_band(index.band_name(), data)?;
    }
    Ok(out)
}
