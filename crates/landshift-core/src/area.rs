//! Per-class area aggregation and pre/post percentage change.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::consts::{CLASS_NODATA, PARALLEL_PIXEL_THRESHOLD, SQUARE_METERS_PER_HECTARE};
use crate::error::{LandshiftError, Result};
use crate::geometry::Region;
use crate::raster::{ClassifiedImage, LandClass};

/// Area of one class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassArea {
    pub code: u8,
    pub name: String,
    pub pixels: u64,
    pub hectares: f64,
}

/// Per-class area in hectares, in class order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaReport {
    pub entries: Vec<ClassArea>,
}

impl AreaReport {
    pub fn get(&self, name: &str) -> Option<&ClassArea> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn hectares(&self, name: &str) -> Option<f64> {
        self.get(name).map(|e| e.hectares)
    }

    pub fn total_hectares(&self) -> f64 {
        self.entries.iter().map(|e| e.hectares).sum()
    }

    pub fn total_pixels(&self) -> u64 {
        self.entries.iter().map(|e| e.pixels).sum()
    }
}

/// Sum the area of each class over the pixels whose centre lies in `region`.
///
/// `pixel_area_m2` overrides the pixel area implied by the image transform.
pub fn class_areas(
    classified: &ClassifiedImage,
    classes: &[LandClass],
    region: &Region,
    pixel_area_m2: Option<f64>,
) -> Result<AreaReport> {
    let pixel_area = pixel_area_m2.unwrap_or_else(|| classified.transform.pixel_area_m2());
    if !(pixel_area.is_finite() && pixel_area > 0.0) {
        return Err(LandshiftError::InvalidConfig(format!(
            "pixel area {pixel_area} m² is not positive"
        )));
    }

    let inside = region.pixel_mask(&classified.transform, classified.dim());
    let (h, w) = classified.dim();

    let count_row = |row: usize| -> [u64; 256] {
        let mut counts = [0u64; 256];
        for col in 0..w {
            if inside[[row, col]] {
                counts[classified.data[[row, col]] as usize] += 1;
            }
        }
        counts
    };
    let merge = |mut a: [u64; 256], b: [u64; 256]| {
        for (x, y) in a.iter_mut().zip(b) {
            *x += y;
        }
        a
    };
    let counts = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h)
            .into_par_iter()
            .map(count_row)
            .reduce(|| [0u64; 256], merge)
    } else {
        (0..h).map(count_row).fold([0u64; 256], merge)
    };

    let entries: Vec<ClassArea> = classes
        .iter()
        .map(|class| {
            let pixels = if class.code == CLASS_NODATA {
                0
            } else {
                counts[class.code as usize]
            };
            ClassArea {
                code: class.code,
                name: class.name.clone(),
                pixels,
                hectares: pixels as f64 * pixel_area / SQUARE_METERS_PER_HECTARE,
            }
        })
        .collect();

    let report = AreaReport { entries };
    info!(
        classes = report.entries.len(),
        total_ha = report.total_hectares(),
        pixel_area_m2 = pixel_area,
        "Class areas computed"
    );
    Ok(report)
}

/// Relative change of one class between two periods.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum PercentChange {
    /// Percentage, unrounded.
    Finite(f64),
    /// The class had no area in the first period.
    Undefined,
}

impl From<Option<f64>> for PercentChange {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Undefined, Self::Finite)
    }
}

impl From<PercentChange> for Option<f64> {
    fn from(value: PercentChange) -> Self {
        value.value()
    }
}

impl PercentChange {
    /// `(post - pre) / pre * 100`, undefined when `pre` is zero.
    pub fn compute(pre: f64, post: f64) -> Self {
        if pre == 0.0 {
            Self::Undefined
        } else {
            Self::Finite((post - pre) / pre * 100.0)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Finite(v) => Some(*v),
            Self::Undefined => None,
        }
    }

    /// Rounded to two decimals.
    pub fn rounded(&self) -> Option<f64> {
        self.value().map(|v| (v * 100.0).round() / 100.0)
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Finite(_))
    }
}

impl std::fmt::Display for PercentChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finite(v) => write!(f, "{v:+.2}%"),
            Self::Undefined => write!(f, "undefined"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassChange {
    pub code: u8,
    pub name: String,
    pub pre_hectares: f64,
    pub post_hectares: f64,
    pub change: PercentChange,
}

/// Per-class change between two area reports, in class order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub entries: Vec<ClassChange>,
}

impl ChangeReport {
    pub fn get(&self, name: &str) -> Option<&ClassChange> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn change(&self, name: &str) -> Option<PercentChange> {
        self.get(name).map(|e| e.change)
    }
}

/// Percentage change per class from `pre` to `post`.
///
/// Both reports must list the same classes in the same order.
pub fn percent_change(pre: &AreaReport, post: &AreaReport) -> Result<ChangeReport> {
    if pre.entries.len() != post.entries.len() {
        return Err(LandshiftError::InvalidConfig(format!(
            "area reports list {} and {} classes",
            pre.entries.len(),
            post.entries.len()
        )));
    }

    let mut entries = Vec::with_capacity(pre.entries.len());
    for (a, b) in pre.entries.iter().zip(&post.entries) {
        if a.code != b.code {
            return Err(LandshiftError::InvalidConfig(format!(
                "area reports disagree on class order: {} vs {}",
                a.name, b.name
            )));
        }
        let change = PercentChange::compute(a.hectares, b.hectares);
        if !change.is_defined() {
            warn!(
                class = %a.name,
                post_ha = b.hectares,
                "Class absent before the event; change is undefined"
            );
        }
        entries.push(ClassChange {
            code: a.code,
            name: a.name.clone(),
            pre_hectares: a.hectares,
            post_hectares: b.hectares,
            change,
        });
    }
    Ok(ChangeReport { entries })
}
