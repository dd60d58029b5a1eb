pub mod error;
pub mod consts;
pub mod raster;
pub mod geometry;
pub mod mask;
pub mod indices;
pub mod archive;
pub mod composite;
pub mod sampling;
pub mod classify;
pub mod area;
pub mod accuracy;
pub mod io;
pub mod pipeline;
