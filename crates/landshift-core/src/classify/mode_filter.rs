use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::CLASS_NODATA;
use crate::raster::{build_grid, ClassifiedImage};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeFilterParams {
    /// Kernel radius in pixels; the kernel is the disc `dr² + dc² <= radius²`.
    pub radius: usize,
    pub iterations: usize,
}

impl Default for ModeFilterParams {
    fn default() -> Self {
        Self {
            radius: 1,
            iterations: 1,
        }
    }
}

/// Focal majority filter over a circular kernel.
///
/// Each classified pixel takes the most frequent class among the classified
/// pixels of its neighbourhood. Ties keep the centre class when it is among
/// the tied, otherwise the smallest code wins. No-data pixels stay no-data
/// and are never counted.
pub fn mode_filter(image: &ClassifiedImage, params: &ModeFilterParams) -> ClassifiedImage {
    let offsets = disc_offsets(params.radius);
    let mut data = image.data.clone();
    for _ in 0..params.iterations {
        data = mode_pass(&data, &offsets);
    }

    let changed = data
        .iter()
        .zip(image.data.iter())
        .filter(|(a, b)| a != b)
        .count();
    debug!(
        radius = params.radius,
        iterations = params.iterations,
        changed,
        "Mode filter applied"
    );
    ClassifiedImage::new(data, image.transform)
}

fn disc_offsets(radius: usize) -> Vec<(isize, isize)> {
    let r = radius as isize;
    let mut offsets = Vec::new();
    for dr in -r..=r {
        for dc in -r..=r {
            if dr * dr + dc * dc <= r * r {
                offsets.push((dr, dc));
            }
        }
    }
    offsets
}

fn mode_pass(data: &Array2<u8>, offsets: &[(isize, isize)]) -> Array2<u8> {
    let (h, w) = data.dim();
    build_grid((h, w), |row, col| {
        let centre = data[[row, col]];
        if centre == CLASS_NODATA {
            return CLASS_NODATA;
        }

        let mut counts = [0u16; 256];
        for &(dr, dc) in offsets {
            let nr = row as isize + dr;
            let nc = col as isize + dc;
            if nr < 0 || nr >= h as isize || nc < 0 || nc >= w as isize {
                continue;
            }
            let code = data[[nr as usize, nc as usize]];
            if code != CLASS_NODATA {
                counts[code as usize] += 1;
            }
        }

        let top = counts.iter().copied().max().unwrap_or(0);
        if counts[centre as usize] == top {
            return centre;
        }
        counts
            .iter()
            .position(|&c| c == top)
            .map(|i| i as u8)
            .unwrap_or(centre)
    })
}
