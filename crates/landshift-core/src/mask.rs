use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_CLEAR_SCENE_CLASSES, DEFAULT_CLOUD_PROBABILITY_THRESHOLD, NODATA, QA_CIRRUS_BIT,
    QA_CLOUD_BIT,
};
use crate::error::Result;
use crate::raster::{build_grid, check_same_dim, RasterImage};

/// Per-pixel cloud mask policy.
///
/// A pixel is clear only when all three tests pass: cloud probability below
/// the threshold, none of the QA bits set, and a scene classification in the
/// allow-set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudMaskParams {
    pub probability_band: String,
    /// Pixels with probability >= threshold are masked.
    pub probability_threshold: f32,
    pub qa_band: String,
    /// QA bit positions that must be unset.
    pub qa_bits: Vec<u8>,
    pub scene_class_band: String,
    pub clear_scene_classes: Vec<u8>,
}

impl Default for CloudMaskParams {
    fn default() -> Self {
        Self {
            probability_band: "MSK_CLDPRB".into(),
            probability_threshold: DEFAULT_CLOUD_PROBABILITY_THRESHOLD,
            qa_band: "QA60".into(),
            qa_bits: vec![QA_CLOUD_BIT, QA_CIRRUS_BIT],
            scene_class_band: "SCL".into(),
            clear_scene_classes: DEFAULT_CLEAR_SCENE_CLASSES.to_vec(),
        }
    }
}

impl CloudMaskParams {
    /// Bands the mask reads.
    pub fn mask_bands(&self) -> [&str; 3] {
        [
            self.probability_band.as_str(),
            self.qa_band.as_str(),
            self.scene_class_band.as_str(),
        ]
    }

    pub fn passes_probability(&self, probability: f32) -> bool {
        !probability.is_nan() && probability < self.probability_threshold
    }

    pub fn passes_qa(&self, qa: f32) -> bool {
        if qa.is_nan() || qa < 0.0 {
            return false;
        }
        let bits = qa as u32;
        self.qa_bits.iter().all(|&bit| bits & (1u32 << bit) == 0)
    }

    pub fn passes_scene_class(&self, scene_class: f32) -> bool {
        if scene_class.is_nan() || scene_class < 0.0 {
            return false;
        }
        let value = scene_class as u32;
        self.clear_scene_classes
            .iter()
            .any(|&allowed| allowed as u32 == value)
    }

    pub fn is_clear(&self, probability: f32, qa: f32, scene_class: f32) -> bool {
        self.passes_probability(probability)
            && self.passes_qa(qa)
            && self.passes_scene_class(scene_class)
    }
}

/// Compute the validity mask of `image`: `true` where the pixel is clear.
///
/// Fails with `MissingBand` if any of the three mask bands is absent.
pub fn cloud_mask(image: &RasterImage, params: &CloudMaskParams) -> Result<Array2<bool>> {
    let probability = image.band(&params.probability_band)?;
    let qa = image.band(&params.qa_band)?;
    let scene_class = image.band(&params.scene_class_band)?;

    Ok(build_grid(image.dim(), |row, col| {
        params.is_clear(
            probability[[row, col]],
            qa[[row, col]],
            scene_class[[row, col]],
        )
    }))
}

/// Void every band at pixels where `mask` is false. The grid is kept.
pub fn apply_mask(image: &RasterImage, mask: &Array2<bool>) -> Result<RasterImage> {
    check_same_dim(image.dim(), mask.dim())?;
    Ok(image.map_bands(|data| {
        let mut out = data.clone();
        out.zip_mut_with(mask, |v, &keep| {
            if !keep {
                *v = NODATA;
            }
        });
        out
    }))
}

/// Mask `image` with its own quality bands.
pub fn mask_clouds(image: &RasterImage, params: &CloudMaskParams) -> Result<RasterImage> {
    let mask = cloud_mask(image, params)?;
    apply_mask(image, &mask)
}
