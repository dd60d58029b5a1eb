/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum scene count to use scene-level Rayon parallelism.
pub const PARALLEL_SCENE_THRESHOLD: usize = 4;

/// No-data sentinel for floating-point bands.
pub const NODATA: f32 = f32::NAN;

/// Class code marking an unclassified (no-data) pixel.
pub const CLASS_NODATA: u8 = 0;

/// Sentinel-2 L2A digital number to surface reflectance factor.
pub const DEFAULT_REFLECTANCE_SCALE: f32 = 1e-4;

/// Square metres in one hectare.
pub const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Sentinel-2 ground sample distance of the 10 m bands.
pub const DEFAULT_PIXEL_SIZE_M: f64 = 10.0;

/// QA60 bit flagging opaque clouds.
pub const QA_CLOUD_BIT: u8 = 10;

/// QA60 bit flagging cirrus.
pub const QA_CIRRUS_BIT: u8 = 11;

/// Scene classification values kept by the cloud mask:
/// vegetation, not vegetated, water, unclassified.
pub const DEFAULT_CLEAR_SCENE_CLASSES: [u8; 4] = [4, 5, 6, 7];

/// Default per-pixel cloud probability threshold (percent).
pub const DEFAULT_CLOUD_PROBABILITY_THRESHOLD: f32 = 10.0;

/// Default scene-level cloudy pixel percentage limit.
pub const DEFAULT_MAX_CLOUD_FRACTION: f32 = 5.0;

/// Default number of trees in the random forest.
pub const DEFAULT_TREE_COUNT: usize = 100;

/// Default fraction of the training set drawn (with replacement) per tree.
pub const DEFAULT_BAG_FRACTION: f32 = 0.5;

/// Upper bound on the pixel count of a single composite or reduction.
pub const DEFAULT_MAX_PIXELS: usize = 1_000_000_000;

/// Manifest file describing one scene in a directory archive.
pub const SCENE_MANIFEST_FILE: &str = "scene.toml";

/// Extension of per-band raster files in a directory archive.
pub const BAND_FILE_EXTENSION: &str = "tif";
