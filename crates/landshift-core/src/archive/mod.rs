mod directory;

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::DEFAULT_MAX_CLOUD_FRACTION;
use crate::error::{LandshiftError, Result};
use crate::geometry::Region;
use crate::raster::{ImageSequence, Scene, SceneMetadata};

pub use directory::{write_scene, DirectoryArchive};

/// Half-open date interval `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(LandshiftError::InvalidConfig(format!(
                "date range start {start} is not before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

/// Scene-level metadata filter applied before any pixel is read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneFilter {
    /// Scenes with a cloudy pixel percentage >= this value are rejected.
    pub max_cloud_fraction: f32,
}

impl Default for SceneFilter {
    fn default() -> Self {
        Self {
            max_cloud_fraction: DEFAULT_MAX_CLOUD_FRACTION,
        }
    }
}

impl SceneFilter {
    pub fn accepts(&self, metadata: &SceneMetadata) -> bool {
        metadata.cloud_fraction < self.max_cloud_fraction
    }
}

/// True when `scene` passes the date, cloud and footprint filters.
pub fn scene_matches(scene: &Scene, dates: &DateRange, region: &Region, filter: &SceneFilter) -> bool {
    dates.contains(scene.metadata.date)
        && filter.accepts(&scene.metadata)
        && region.intersects_rect(&scene.image.footprint())
}

/// A source of satellite scenes.
pub trait RasterArchive: Send + Sync {
    /// Human-readable name of this archive (for logging).
    fn name(&self) -> &str;

    /// Scenes of `collection` acquired within `dates`, intersecting `region`
    /// and accepted by `filter`.
    fn query(
        &self,
        collection: &str,
        dates: &DateRange,
        region: &Region,
        filter: &SceneFilter,
    ) -> Result<ImageSequence>;
}

/// Archive held entirely in memory, keyed by collection name.
#[derive(Clone, Debug, Default)]
pub struct InMemoryArchive {
    collections: HashMap<String, Vec<Scene>>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: impl Into<String>, scene: Scene) {
        self.collections
            .entry(collection.into())
            .or_default()
            .push(scene);
    }

    pub fn scene_count(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, Vec::len)
    }
}

impl RasterArchive for InMemoryArchive {
    fn name(&self) -> &str {
        "memory"
    }

    fn query(
        &self,
        collection: &str,
        dates: &DateRange,
        region: &Region,
        filter: &SceneFilter,
    ) -> Result<ImageSequence> {
        let Some(scenes) = self.collections.get(collection) else {
            return Ok(ImageSequence::default());
        };
        let matched: ImageSequence = scenes
            .iter()
            .filter(|s| scene_matches(s, dates, region, filter))
            .cloned()
            .collect();
        debug!(
            collection,
            matched = matched.len(),
            total = scenes.len(),
            "Queried in-memory archive"
        );
        Ok(matched)
    }
}
