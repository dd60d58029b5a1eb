pub mod labels;
pub mod raster_io;
pub mod report;

pub use labels::{load_labels, save_labels};
pub use raster_io::{load_classified, save_classified, save_composite};
pub use report::{write_csv, write_json, AnalysisReport};
