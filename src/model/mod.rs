//src/model/mod.rs
pub mod cell;
pub mod elements;
pub mod lattice;
pub mod species;

// Re-exports for cleaner imports
pub use cell::Cell;
pub use lattice::{Lattice, Sites};
pub use species::SpeciesTable;
