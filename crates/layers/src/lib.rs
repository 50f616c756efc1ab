pub mod control;
pub mod html;
pub mod layer;
pub mod legend;
pub mod raster;
pub mod symbology;
pub mod vector;

pub use layer::*;
