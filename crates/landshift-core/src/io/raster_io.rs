use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat};
use ndarray::Array2;

use crate::archive::write_scene;
use crate::error::{LandshiftError, Result};
use crate::raster::{ClassifiedImage, GeoTransform, RasterImage, SceneMetadata};

/// Save class codes as an 8-bit grayscale TIFF (0 = no-data).
pub fn save_classified_tiff(image: &ClassifiedImage, path: &Path) -> Result<()> {
    to_gray(image)?.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save class codes as an 8-bit grayscale PNG (0 = no-data).
pub fn save_classified_png(image: &ClassifiedImage, path: &Path) -> Result<()> {
    to_gray(image)?.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a classified image, choosing format from file extension.
pub fn save_classified(image: &ClassifiedImage, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("tiff" | "tif") => save_classified_tiff(image, path),
        Some("png") => save_classified_png(image, path),
        _ => save_classified_tiff(image, path),
    }
}

/// Load a class-code raster. Image files carry no georeferencing, so the
/// caller supplies the transform.
pub fn load_classified(path: &Path, transform: GeoTransform) -> Result<ClassifiedImage> {
    let gray = image::open(path)?.into_luma8();
    let (w, h) = gray.dimensions();
    let data = Array2::from_shape_vec((h as usize, w as usize), gray.into_raw())
        .map_err(|e| LandshiftError::InvalidArchive(format!("{}: {e}", path.display())))?;
    Ok(ClassifiedImage::new(data, transform))
}

/// Save composite reflectance bands as 16-bit digital numbers in the
/// directory archive layout, so the composite can be re-read as a scene.
///
/// Values are divided by `scale`; no-data is written as 0.
pub fn save_composite(
    image: &RasterImage,
    root: &Path,
    collection: &str,
    metadata: &SceneMetadata,
    scale: f32,
) -> Result<PathBuf> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(LandshiftError::InvalidConfig(format!(
            "reflectance scale {scale} is not positive"
        )));
    }
    write_scene(root, collection, image, metadata, 1.0 / scale, Some(0))
}

fn to_gray(image: &ClassifiedImage) -> Result<GrayImage> {
    let (h, w) = image.dim();
    let pixels: Vec<u8> = image.data.iter().copied().collect();
    GrayImage::from_raw(w as u32, h as u32, pixels).ok_or_else(|| {
        LandshiftError::InvalidConfig("classified image has a bad shape".into())
    })
}
