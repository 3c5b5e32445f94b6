// src/io/mod.rs
pub mod lattice;

use crate::error::Result;
use crate::model::Lattice;

/// Loads a lattice file. Every axis is taken as periodic unless `pbc` says
/// otherwise.
pub fn load_lattice(path: &str, pbc: [bool; 3]) -> Result<Lattice> {
    lattice::parse(path, pbc)
}

pub fn save_lattice(path: &str, lat: &Lattice) -> Result<()> {
    lattice::write(path, lat, None)
}
