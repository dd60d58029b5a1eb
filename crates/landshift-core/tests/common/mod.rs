use chrono::NaiveDate;
use ndarray::Array2;

use landshift_core::composite::SENTINEL2_BANDS;
use landshift_core::geometry::{LabeledFeature, Region};
use landshift_core::raster::{Band, GeoTransform, LandClass, RasterImage, Scene, SceneMetadata};

pub const PIXEL_SIZE: f64 = 10.0;

pub const FOREST: u8 = 1;
pub const BARREN: u8 = 2;
pub const BUILT_UP: u8 = 3;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 10 m grid whose top-left corner sits at (0, h * 10).
pub fn grid_transform(h: usize) -> GeoTransform {
    GeoTransform::new(0.0, h as f64 * PIXEL_SIZE, PIXEL_SIZE)
}

/// Region covering exactly an `h` x `w` grid from [`grid_transform`].
pub fn grid_region(h: usize, w: usize) -> Region {
    Region::rectangle(0.0, 0.0, w as f64 * PIXEL_SIZE, h as f64 * PIXEL_SIZE)
}

/// Map coordinates of the centre of pixel (`row`, `col`) on an `h`-row grid.
pub fn center(h: usize, row: usize, col: usize) -> (f64, f64) {
    grid_transform(h).pixel_center(row, col)
}

pub fn make_band(h: usize, w: usize, fill: f32) -> Array2<f32> {
    Array2::from_elem((h, w), fill)
}

pub fn make_image(h: usize, w: usize, bands: &[(&str, f32)]) -> RasterImage {
    let bands = bands
        .iter()
        .map(|&(name, fill)| Band::new(name, make_band(h, w, fill)))
        .collect();
    RasterImage::from_bands(bands, grid_transform(h)).unwrap()
}

pub fn classes() -> Vec<LandClass> {
    vec![
        LandClass::new(FOREST, "Forest"),
        LandClass::new(BARREN, "Barren"),
        LandClass::new(BUILT_UP, "Built-up"),
    ]
}

/// Raw Sentinel-2 digital numbers of one land-cover class, in
/// [`SENTINEL2_BANDS`] order.
pub fn signature(class: u8) -> [f32; 10] {
    match class {
        FOREST => [300., 500., 300., 900., 2500., 3000., 3500., 3600., 1500., 800.],
        BARREN => [1200., 1400., 1600., 1800., 2000., 2100., 2000., 2100., 2800., 2400.],
        _ => [1800., 1900., 2000., 2100., 2150., 2200., 2200., 2250., 3200., 3000.],
    }
}

/// A clear scene whose pixels carry the signature of `class_at(row, col)`.
pub fn landscape_scene<F>(id: &str, date: NaiveDate, h: usize, w: usize, class_at: F) -> Scene
where
    F: Fn(usize, usize) -> u8,
{
    let mut bands = Vec::new();
    for (i, name) in SENTINEL2_BANDS.iter().enumerate() {
        let data = Array2::from_shape_fn((h, w), |(r, c)| signature(class_at(r, c))[i]);
        bands.push(Band::new(*name, data));
    }
    bands.push(Band::new("MSK_CLDPRB", make_band(h, w, 0.0)));
    bands.push(Band::new("QA60", make_band(h, w, 0.0)));
    bands.push(Band::new("SCL", make_band(h, w, 4.0)));

    Scene {
        image: RasterImage::from_bands(bands, grid_transform(h)).unwrap(),
        metadata: SceneMetadata {
            id: id.to_string(),
            date,
            cloud_fraction: 1.0,
        },
    }
}

/// Mark pixel (`row`, `col`) of `scene` as a thick cloud with saturated values.
pub fn add_cloud(scene: &mut Scene, row: usize, col: usize) {
    let mut image = RasterImage::new(scene.image.transform);
    for band in scene.image.bands() {
        let mut data = band.data.clone();
        data[[row, col]] = match band.name.as_str() {
            "MSK_CLDPRB" => 95.0,
            "QA60" => 1024.0,
            "SCL" => 9.0,
            _ => 9000.0,
        };
        image = image.with_band(band.name.clone(), data).unwrap();
    }
    scene.image = image;
}

/// Three vertical stripes: forest below `forest_end`, barren below
/// `barren_end`, built-up after.
pub fn stripes(forest_end: usize, barren_end: usize) -> impl Fn(usize, usize) -> u8 {
    move |_, col| {
        if col < forest_end {
            FOREST
        } else if col < barren_end {
            BARREN
        } else {
            BUILT_UP
        }
    }
}

/// Point labels down column `col` at every other row.
pub fn column_labels(h: usize, col: usize, class: u8) -> Vec<LabeledFeature> {
    (0..h)
        .step_by(2)
        .map(|row| {
            let (x, y) = center(h, row, col);
            LabeledFeature::point(class, x, y)
        })
        .collect()
}
