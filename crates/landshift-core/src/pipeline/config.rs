use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::accuracy::ValidationSource;
use crate::archive::{DateRange, SceneFilter};
use crate::classify::{ClassifierMethod, ModeFilterParams, RandomForestParams};
use crate::composite::{CompositeParams, SENTINEL2_BANDS};
use crate::error::{LandshiftError, Result};
use crate::geometry::Region;
use crate::indices::{IndexBands, SpectralIndex};
use crate::mask::CloudMaskParams;
use crate::raster::LandClass;
use crate::sampling::{SamplingMode, SamplingParams};

/// Scene collection of Sentinel-2 surface reflectance.
pub const DEFAULT_COLLECTION: &str = "S2_SR_HARMONIZED";

/// Full description of one pre/post land-cover comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Root of a directory archive.
    pub archive: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Ground-truth labels (JSON).
    pub labels: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub training_period: TrainingPeriod,
    /// Overrides the pixel area implied by the raster transform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_area_m2: Option<f64>,
    pub region: Region,
    pub pre: PeriodConfig,
    pub post: PeriodConfig,
    #[serde(default)]
    pub scenes: SceneFilter,
    #[serde(default)]
    pub cloud_mask: CloudMaskParams,
    #[serde(default)]
    pub composite: CompositeParams,
    #[serde(default)]
    pub indices: IndexConfig,
    #[serde(default)]
    pub sampling: SamplingParams,
    #[serde(default)]
    pub classifier: ClassifierMethod,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub validation: ValidationSource,
    pub classes: Vec<LandClass>,
}

fn default_name() -> String {
    "analysis".into()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.into()
}

fn default_output() -> PathBuf {
    PathBuf::from("output")
}

impl Default for AnalysisConfig {
    /// A template to edit: the region is a 10 km square at the origin.
    fn default() -> Self {
        Self {
            name: default_name(),
            archive: PathBuf::from("archive"),
            collection: default_collection(),
            labels: PathBuf::from("labels.json"),
            output: default_output(),
            training_period: TrainingPeriod::default(),
            pixel_area_m2: None,
            region: Region::rectangle(0.0, 0.0, 10_000.0, 10_000.0),
            pre: PeriodConfig::new("pre", ymd(2020, 1, 1), ymd(2020, 8, 4)),
            post: PeriodConfig::new("post", ymd(2020, 8, 10), ymd(2020, 12, 31)),
            scenes: SceneFilter::default(),
            cloud_mask: CloudMaskParams::default(),
            composite: CompositeParams::default(),
            indices: IndexConfig::default(),
            sampling: SamplingParams::default(),
            classifier: ClassifierMethod::default(),
            smoothing: SmoothingConfig::default(),
            validation: ValidationSource::default(),
            classes: vec![
                LandClass::new(1, "Forest"),
                LandClass::new(2, "Barren"),
                LandClass::new(3, "Built-up"),
            ],
        }
    }
}

impl AnalysisConfig {
    /// Load a TOML config and check it.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Settings of a study site, over `region`.
    pub fn preset(preset: Preset, region: Region) -> Self {
        match preset {
            Preset::Idukki => Self {
                name: "idukki".into(),
                training_period: TrainingPeriod::Both,
                region,
                pre: PeriodConfig::new("pre-landslide", ymd(2020, 1, 1), ymd(2020, 8, 4)),
                post: PeriodConfig::new("post-landslide", ymd(2020, 8, 10), ymd(2020, 12, 31)),
                scenes: SceneFilter {
                    max_cloud_fraction: 5.0,
                },
                cloud_mask: CloudMaskParams {
                    probability_threshold: 10.0,
                    ..CloudMaskParams::default()
                },
                sampling: SamplingParams {
                    mode: SamplingMode::RegionMean,
                    feature_bands: Vec::new(),
                },
                classifier: ClassifierMethod::RandomForest(RandomForestParams {
                    trees: 100,
                    ..RandomForestParams::default()
                }),
                classes: vec![
                    LandClass::new(1, "Forest").with_color("#1c8637"),
                    LandClass::new(2, "Barren Land").with_color("#ffff07"),
                    LandClass::new(3, "Tea Plantation").with_color("#8a0b9c"),
                    LandClass::new(4, "Built-up Area").with_color("#ff0000"),
                ],
                ..Self::default()
            },
            Preset::Wayanad => {
                let mut bands = vec!["B1".to_string()];
                bands.extend(SENTINEL2_BANDS.iter().map(|b| b.to_string()));
                Self {
                    name: "wayanad".into(),
                    training_period: TrainingPeriod::Pre,
                    region,
                    pre: PeriodConfig::new("pre-landslide", ymd(2024, 1, 1), ymd(2024, 7, 30)),
                    post: PeriodConfig::new(
                        "post-landslide",
                        ymd(2024, 7, 31),
                        ymd(2024, 12, 31),
                    ),
                    scenes: SceneFilter {
                        max_cloud_fraction: 10.0,
                    },
                    cloud_mask: CloudMaskParams {
                        probability_threshold: 20.0,
                        ..CloudMaskParams::default()
                    },
                    composite: CompositeParams {
                        bands,
                        ..CompositeParams::default()
                    },
                    sampling: SamplingParams {
                        mode: SamplingMode::EveryPixel,
                        feature_bands: Vec::new(),
                    },
                    classifier: ClassifierMethod::RandomForest(RandomForestParams {
                        trees: 200,
                        ..RandomForestParams::default()
                    }),
                    classes: vec![
                        LandClass::new(1, "Forest").with_color("#2d6906"),
                        LandClass::new(2, "Barren").with_color("#ffef4c"),
                        LandClass::new(3, "Built-up").with_color("#f00a0a"),
                    ],
                    ..Self::default()
                }
            }
        }
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        DateRange::new(self.pre.dates.start, self.pre.dates.end)?;
        DateRange::new(self.post.dates.start, self.post.dates.end)?;
        if self.classes.is_empty() {
            return Err(LandshiftError::InvalidConfig("no classes configured".into()));
        }
        let mut codes: Vec<u8> = self.classes.iter().map(|c| c.code).collect();
        codes.sort_unstable();
        codes.dedup();
        if codes.len() != self.classes.len() {
            return Err(LandshiftError::InvalidConfig("duplicate class codes".into()));
        }
        if codes.first() == Some(&crate::consts::CLASS_NODATA) {
            return Err(LandshiftError::InvalidConfig(
                "class code 0 is reserved for no-data".into(),
            ));
        }
        if self.composite.bands.is_empty() {
            return Err(LandshiftError::InvalidConfig("no composite bands".into()));
        }
        if self.region.bounding_rect().is_none() {
            return Err(LandshiftError::InvalidConfig("region is empty".into()));
        }
        Ok(())
    }

    pub fn period(&self, period: Period) -> &PeriodConfig {
        match period {
            Period::Pre => &self.pre,
            Period::Post => &self.post,
        }
    }

    /// Feature bands the classifier is trained on.
    pub fn feature_bands(&self) -> Vec<String> {
        if !self.sampling.feature_bands.is_empty() {
            return self.sampling.feature_bands.clone();
        }
        let mut bands = self.composite.bands.clone();
        bands.extend(self.indices.indices.iter().map(|i| i.band_name().to_string()));
        bands
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// One side of the comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodConfig {
    pub name: String,
    pub dates: DateRange,
}

impl PeriodConfig {
    pub fn new(name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            name: name.into(),
            dates: DateRange { start, end },
        }
    }
}

/// Side of the comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    Pre,
    Post,
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pre => write!(f, "pre"),
            Self::Post => write!(f, "post"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub indices: Vec<SpectralIndex>,
    pub bands: IndexBands,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            indices: SpectralIndex::ALL.to_vec(),
            bands: IndexBands::default(),
        }
    }
}

/// Which composite supplies the training samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingPeriod {
    #[default]
    Pre,
    Post,
    /// Sample the labels against both composites and train on the union.
    Both,
}

impl std::fmt::Display for TrainingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pre => write!(f, "Pre"),
            Self::Post => write!(f, "Post"),
            Self::Both => write!(f, "Both"),
        }
    }
}

/// Optional mode filtering of each classified image.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre: Option<ModeFilterParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<ModeFilterParams>,
}

/// Study sites with known settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    Idukki,
    Wayanad,
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idukki => write!(f, "Idukki (2020)"),
            Self::Wayanad => write!(f, "Wayanad (2024)"),
        }
    }
}

impl std::str::FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "idukki" => Ok(Self::Idukki),
            "wayanad" => Ok(Self::Wayanad),
            other => Err(format!("unknown preset '{other}' (expected idukki or wayanad)")),
        }
    }
}
