// src/model/lattice.rs

use crate::error::{check_len, with_threads, AnalysisError, Result};
use crate::model::cell::Cell;
use crate::model::species::SpeciesTable;
use crate::utils::geometry::{self, point_at};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A configuration of atoms in an orthogonal cell.
///
/// Positions are stored flat (`[x0, y0, z0, x1, ...]`) and an atom's index
/// is its identity for the lifetime of an analysis session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lattice {
    pub cell: Cell,
    pub pos: Vec<f64>,
    /// Species id of each atom, indexing `species`.
    pub specie: Vec<usize>,
    pub charge: Vec<f64>,
    pub species: SpeciesTable,
}

impl Lattice {
    /// Empty lattice in the given cell.
    pub fn new(cell: Cell) -> Self {
        Self {
            cell,
            pos: Vec::new(),
            specie: Vec::new(),
            charge: Vec::new(),
            species: SpeciesTable::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.specie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specie.is_empty()
    }

    /// Appends an atom and returns its index.
    pub fn add_atom(&mut self, sym: &str, pos: [f64; 3], charge: f64) -> usize {
        let sid = self.species.increment(sym);
        self.pos.extend_from_slice(&pos);
        self.specie.push(sid);
        self.charge.push(charge);
        self.specie.len() - 1
    }

    /// Removes atom `index`, shifting later atoms down by one.
    pub fn remove_atom(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        let sid = self.specie.remove(index);
        self.pos.drain(3 * index..3 * index + 3);
        self.charge.remove(index);
        self.species.decrement(sid);
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(AnalysisError::InvalidParameter {
                name: "atom index",
                value: index as f64,
            });
        }
        Ok(())
    }

    pub fn atom_pos(&self, index: usize) -> [f64; 3] {
        point_at(&self.pos, index)
    }

    pub fn atom_symbol(&self, index: usize) -> Option<&str> {
        self.specie
            .get(index)
            .and_then(|&s| self.species.symbol(s))
    }

    /// Minimum-image separation between two atoms.
    pub fn atom_separation(&self, a: usize, b: usize) -> Result<f64> {
        self.check_index(a)?;
        self.check_index(b)?;
        Ok(geometry::separation(
            self.atom_pos(a),
            self.atom_pos(b),
            &self.cell,
        ))
    }

    pub fn volume(&self) -> f64 {
        self.cell.volume()
    }

    /// Atoms per Å³.
    pub fn density(&self) -> f64 {
        self.len() as f64 / self.volume()
    }

    /// Smallest coordinate along each axis (zeros when empty).
    pub fn min_pos(&self) -> [f64; 3] {
        self.fold_pos(f64::INFINITY, f64::min)
    }

    /// Largest coordinate along each axis (zeros when empty).
    pub fn max_pos(&self) -> [f64; 3] {
        self.fold_pos(f64::NEG_INFINITY, f64::max)
    }

    fn fold_pos(&self, init: f64, f: fn(f64, f64) -> f64) -> [f64; 3] {
        if self.is_empty() {
            return [0.0; 3];
        }
        let mut out = [init; 3];
        for p in self.pos.chunks_exact(3) {
            for axis in 0..3 {
                out[axis] = f(out[axis], p[axis]);
            }
        }
        out
    }

    /// Checks that every per-atom array matches the atom count and that each
    /// species id exists in the table.
    pub fn validate(&self) -> Result<()> {
        self.cell.validate()?;
        check_len("charges", self.specie.len(), self.charge.len())?;
        self.sites().validate()
    }

    /// Borrowed view used by the analysis routines.
    pub fn sites(&self) -> Sites<'_> {
        Sites {
            pos: &self.pos,
            specie: &self.specie,
            species: &self.species,
        }
    }

    /// Folds atoms that left the cell back in along periodic axes.
    pub fn wrap_atoms(&mut self, threads: usize) -> Result<()> {
        let cell = self.cell;
        if !cell.is_periodic() {
            return Ok(());
        }
        let pos = &mut self.pos;
        with_threads(threads, || {
            pos.par_chunks_exact_mut(3).for_each(|p| {
                let w = cell.wrap_point([p[0], p[1], p[2]]);
                p.copy_from_slice(&w);
            });
        })
    }
}

/// Positions and species of a point set, borrowed from whoever owns them.
#[derive(Clone, Copy, Debug)]
pub struct Sites<'a> {
    pub pos: &'a [f64],
    pub specie: &'a [usize],
    pub species: &'a SpeciesTable,
}

impl<'a> Sites<'a> {
    /// Checks array lengths and species ids before wrapping them.
    pub fn new(pos: &'a [f64], specie: &'a [usize], species: &'a SpeciesTable) -> Result<Self> {
        let sites = Self {
            pos,
            specie,
            species,
        };
        sites.validate()?;
        Ok(sites)
    }

    pub fn validate(&self) -> Result<()> {
        check_len("positions", 3 * self.specie.len(), self.pos.len())?;
        if let Some(&bad) = self.specie.iter().find(|&&s| s >= self.species.len()) {
            return Err(AnalysisError::InvalidParameter {
                name: "species id",
                value: bad as f64,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.specie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specie.is_empty()
    }

    #[inline]
    pub fn point(&self, index: usize) -> [f64; 3] {
        point_at(self.pos, index)
    }

    pub fn symbol(&self, index: usize) -> Option<&'a str> {
        let species: &'a SpeciesTable = self.species;
        self.specie.get(index).and_then(|&s| species.symbol(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_species() -> Lattice {
        let mut lat = Lattice::new(Cell::cubic(10.0).unwrap());
        lat.add_atom("Fe", [1.0, 1.0, 1.0], 0.0);
        lat.add_atom("Cr", [2.0, 1.0, 1.0], 0.5);
        lat.add_atom("Fe", [9.5, 1.0, 1.0], 0.0);
        lat
    }

    #[test]
    fn test_add_atom_tracks_species() {
        let lat = two_species();
        assert_eq!(lat.len(), 3);
        assert_eq!(lat.specie, vec![0, 1, 0]);
        assert_eq!(lat.species.count(0), 2);
        assert_eq!(lat.atom_symbol(1), Some("Cr"));
        assert!(lat.validate().is_ok());
    }

    #[test]
    fn test_remove_atom() {
        let mut lat = two_species();
        lat.remove_atom(1).unwrap();
        assert_eq!(lat.len(), 2);
        assert_eq!(lat.species.count(1), 0);
        assert_eq!(lat.atom_pos(1), [9.5, 1.0, 1.0]);
        assert!(lat.validate().is_ok());
    }

    #[test]
    fn test_remove_out_of_range_atom() {
        let mut lat = two_species();
        assert!(matches!(
            lat.remove_atom(3),
            Err(AnalysisError::InvalidParameter { name: "atom index", .. })
        ));
        assert_eq!(lat.len(), 3);
        assert_eq!(lat.species.count(0), 2);
    }

    #[test]
    fn test_wrap_skips_free_cell() {
        let cell = Cell::new([10.0; 3], [false; 3]).unwrap();
        let mut lat = Lattice::new(cell);
        lat.add_atom("Fe", [-1.0, 12.0, 5.0], 0.0);
        lat.wrap_atoms(1).unwrap();
        assert_eq!(lat.atom_pos(0), [-1.0, 12.0, 5.0]);

        let mut lat = Lattice::new(Cell::new([10.0; 3], [true, false, false]).unwrap());
        lat.add_atom("Fe", [-1.0, 12.0, 5.0], 0.0);
        lat.wrap_atoms(1).unwrap();
        assert!((lat.atom_pos(0)[0] - 9.0).abs() < 1e-12);
        assert_eq!(lat.atom_pos(0)[1], 12.0);
    }

    #[test]
    fn test_separation_uses_min_image() {
        let lat = two_species();
        assert!((lat.atom_separation(0, 2).unwrap() - 1.5).abs() < 1e-12);
        assert!(lat.atom_separation(0, 7).is_err());
    }

    #[test]
    fn test_validate_catches_bad_shape() {
        let mut lat = two_species();
        lat.pos.pop();
        assert!(matches!(lat.validate(), Err(AnalysisError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_wrap_atoms() {
        let mut lat = Lattice::new(Cell::new([5.0; 3], [true, true, false]).unwrap());
        lat.add_atom("Au", [-1.0, 6.0, 7.0], 0.0);
        lat.wrap_atoms(1).unwrap();
        let p = lat.atom_pos(0);
        assert!((p[0] - 4.0).abs() < 1e-12);
        assert!((p[1] - 1.0).abs() < 1e-12);
        assert!((p[2] - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_sites_view() {
        let lat = two_species();
        let sites = lat.sites();
        assert_eq!(sites.len(), 3);
        assert_eq!(sites.point(2), [9.5, 1.0, 1.0]);
        assert_eq!(sites.symbol(1), Some("Cr"));

        let bad = [5usize];
        assert!(Sites::new(&[0.0, 0.0, 0.0], &bad, &lat.species).is_err());
    }

    #[test]
    fn test_bounds_and_density() {
        let lat = two_species();
        assert_eq!(lat.min_pos(), [1.0, 1.0, 1.0]);
        assert_eq!(lat.max_pos(), [9.5, 1.0, 1.0]);
        assert!((lat.density() - 3.0 / 1000.0).abs() < 1e-15);
    }
}
