pub mod algorithms;
pub mod basis;
pub mod errors;
pub mod grids;
pub mod index;
pub mod interpolator;
pub mod surrogate;
pub mod target;
pub mod utilities;
