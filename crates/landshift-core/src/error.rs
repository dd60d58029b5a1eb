use thiserror::Error;

#[derive(Error, Debug)]
pub enum LandshiftError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid config: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("No images available for period '{period}' after date and cloud filtering")]
    DataUnavailable { period: String },

    #[error("Missing band '{band}'")]
    MissingBand { band: String },

    #[error("Class '{class}' has no valid training samples")]
    EmptyTrainingClass { class: String },

    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Raster dimensions differ: expected {expected_h}x{expected_w}, got {actual_h}x{actual_w}")]
    DimensionMismatch {
        expected_h: usize,
        expected_w: usize,
        actual_h: usize,
        actual_w: usize,
    },

    #[error("Raster grids differ: expected origin ({expected_x}, {expected_y}), got ({actual_x}, {actual_y})")]
    GridMismatch {
        expected_x: f64,
        expected_y: f64,
        actual_x: f64,
        actual_y: f64,
    },

    #[error("Raster of {pixels} pixels exceeds the limit of {max_pixels}")]
    RasterTooLarge { pixels: usize, max_pixels: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Empty image sequence")]
    EmptySequence,
}

pub type Result<T> = std::result::Result<T, LandshiftError>;
