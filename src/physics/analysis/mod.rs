// src/physics/analysis/mod.rs
pub mod clusters;
pub mod defects;
pub mod neighbours;
pub mod picker;
pub mod rdf;
