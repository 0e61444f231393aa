pub mod base;
pub mod equidistant;
