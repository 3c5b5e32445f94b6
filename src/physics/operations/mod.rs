// src/physics/operations/mod.rs
pub mod fcc;
