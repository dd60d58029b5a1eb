use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use image::{ImageBuffer, Luma};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{BAND_FILE_EXTENSION, NODATA, SCENE_MANIFEST_FILE};
use crate::error::{LandshiftError, Result};
use crate::geometry::Region;
use crate::raster::{Band, GeoTransform, ImageSequence, RasterImage, Scene, SceneMetadata};

use super::{DateRange, RasterArchive, SceneFilter};

/// Contents of `scene.toml`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct SceneManifest {
    id: String,
    date: NaiveDate,
    cloud_fraction: f32,
    bands: Vec<String>,
    /// Digital number treated as no-data when reading bands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nodata: Option<u16>,
    transform: GeoTransform,
}

impl SceneManifest {
    fn metadata(&self) -> SceneMetadata {
        SceneMetadata {
            id: self.id.clone(),
            date: self.date,
            cloud_fraction: self.cloud_fraction,
        }
    }
}

/// Scene archive laid out on disk as
/// `<root>/<collection>/<scene>/{scene.toml, <band>.tif, ...}`.
///
/// Bands are 16-bit grayscale TIFFs of raw digital numbers.
#[derive(Clone, Debug)]
pub struct DirectoryArchive {
    root: PathBuf,
}

impl DirectoryArchive {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(LandshiftError::InvalidArchive(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Metadata of every scene in `collection`, without reading any band.
    pub fn list(&self, collection: &str) -> Result<Vec<SceneMetadata>> {
        let mut scenes = Vec::new();
        for dir in self.scene_dirs(collection)? {
            scenes.push(read_manifest(&dir)?.metadata());
        }
        scenes.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(scenes)
    }

    fn scene_dirs(&self, collection: &str) -> Result<Vec<PathBuf>> {
        let collection_dir = self.root.join(collection);
        if !collection_dir.is_dir() {
            return Err(LandshiftError::InvalidArchive(format!(
                "collection '{collection}' not found under {}",
                self.root.display()
            )));
        }
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&collection_dir)? {
            let path = entry?.path();
            if path.join(SCENE_MANIFEST_FILE).is_file() {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }
}

impl RasterArchive for DirectoryArchive {
    fn name(&self) -> &str {
        "directory"
    }

    fn query(
        &self,
        collection: &str,
        dates: &DateRange,
        region: &Region,
        filter: &SceneFilter,
    ) -> Result<ImageSequence> {
        let mut scenes = Vec::new();
        for dir in self.scene_dirs(collection)? {
            let manifest = read_manifest(&dir)?;
            let metadata = manifest.metadata();
            if !dates.contains(metadata.date) || !filter.accepts(&metadata) {
                continue;
            }
            let dim = grid_dim(&dir, &manifest)?;
            if !region.intersects_rect(&manifest.transform.footprint(dim)) {
                debug!(scene = %metadata.id, "Scene outside region");
                continue;
            }
            let image = read_bands(&dir, &manifest)?;
            scenes.push(Scene { image, metadata });
        }
        info!(
            collection,
            root = %self.root.display(),
            matched = scenes.len(),
            "Queried directory archive"
        );
        Ok(ImageSequence::new(scenes))
    }
}

fn read_manifest(dir: &Path) -> Result<SceneManifest> {
    let path = dir.join(SCENE_MANIFEST_FILE);
    let contents = std::fs::read_to_string(&path)?;
    Ok(toml::from_str(&contents)?)
}

/// Grid size from the header of the first band file.
fn grid_dim(dir: &Path, manifest: &SceneManifest) -> Result<(usize, usize)> {
    let first = manifest.bands.first().ok_or_else(|| {
        LandshiftError::InvalidArchive(format!("scene '{}' lists no bands", manifest.id))
    })?;
    let path = band_path(dir, first);
    if !path.is_file() {
        return Err(LandshiftError::MissingBand {
            band: first.clone(),
        });
    }
    let (w, h) = image::image_dimensions(&path)?;
    Ok((h as usize, w as usize))
}

fn read_bands(dir: &Path, manifest: &SceneManifest) -> Result<RasterImage> {
    let mut bands = Vec::with_capacity(manifest.bands.len());
    for name in &manifest.bands {
        let path = band_path(dir, name);
        if !path.is_file() {
            return Err(LandshiftError::MissingBand { band: name.clone() });
        }
        let img = image::open(&path)?.into_luma16();
        let (w, h) = img.dimensions();
        let data: Vec<f32> = img
            .into_raw()
            .into_iter()
            .map(|dn| match manifest.nodata {
                Some(nodata) if dn == nodata => NODATA,
                _ => dn as f32,
            })
            .collect();
        let data = Array2::from_shape_vec((h as usize, w as usize), data).map_err(|e| {
            LandshiftError::InvalidArchive(format!("{}: {e}", path.display()))
        })?;
        bands.push(Band::new(name.clone(), data));
    }
    RasterImage::from_bands(bands, manifest.transform)
}

fn band_path(dir: &Path, band: &str) -> PathBuf {
    dir.join(format!("{band}.{BAND_FILE_EXTENSION}"))
}

/// Write a scene into `<root>/<collection>/<scene id>/`, returning that directory.
///
/// Values are rounded and clamped to 16 bits after multiplying by `gain`.
/// No-data pixels are written as `nodata`, or 0 when no sentinel is given.
pub fn write_scene(
    root: &Path,
    collection: &str,
    image: &RasterImage,
    metadata: &SceneMetadata,
    gain: f32,
    nodata: Option<u16>,
) -> Result<PathBuf> {
    let dir = root.join(collection).join(&metadata.id);
    std::fs::create_dir_all(&dir)?;

    let (h, w) = image.dim();
    for band in image.bands() {
        let pixels: Vec<u16> = band
            .data
            .iter()
            .map(|&v| {
                if v.is_nan() {
                    nodata.unwrap_or(0)
                } else {
                    (v * gain).round().clamp(0.0, u16::MAX as f32) as u16
                }
            })
            .collect();
        let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
            .ok_or_else(|| {
                LandshiftError::InvalidArchive(format!("band '{}' has a bad shape", band.name))
            })?;
        img.save(band_path(&dir, &band.name))?;
    }

    let manifest = SceneManifest {
        id: metadata.id.clone(),
        date: metadata.date,
        cloud_fraction: metadata.cloud_fraction,
        bands: image.band_names(),
        nodata,
        transform: image.transform,
    };
    std::fs::write(dir.join(SCENE_MANIFEST_FILE), toml::to_string_pretty(&manifest)?)?;
    Ok(dir)
}
