// src/spatial/mod.rs
pub mod boxes;

pub use boxes::{Boxes, Neighbourhood};
