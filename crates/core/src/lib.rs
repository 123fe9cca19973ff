//! # glacis core
//!
//! Core types and I/O shared by every glacis study.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `Region`: The fixed circular study area
//! - `LayerStack`: Aligned feature and auxiliary layers of one study
//! - `SampleTable`: Bounded tabular sample drawn from a layer stack
//! - Algorithm trait for a consistent operator API
//! - GeoTIFF and CSV I/O

pub mod error;
pub mod io;
pub mod raster;
pub mod region;
pub mod stack;
pub mod table;

pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use region::Region;
pub use stack::{Layer, LayerRole, LayerStack};
pub use table::{Sample, SampleTable};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::region::Region;
    pub use crate::stack::{Layer, LayerRole, LayerStack};
    pub use crate::table::{Sample, SampleTable};
    pub use crate::Algorithm;
}

/// Core trait for raster operators.
///
/// Operators are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
