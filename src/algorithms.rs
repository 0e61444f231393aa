pub mod active;
pub mod global;
pub mod local;
pub mod priority;
pub mod strategy;
pub mod support;
