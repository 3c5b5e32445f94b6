// src/physics/analysis/neighbours.rs

use crate::error::{check_len, check_positive, with_threads, Result, CURRENT_POOL};
use crate::model::Cell;
use crate::spatial::Boxes;
use crate::utils::geometry::{point_at, separation2};
use rayon::prelude::*;

/// A neighbour of some point: its index and separation (Å).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbour {
    pub index: usize,
    pub distance: f64,
}

/// Per-point neighbours within a cutoff, each list sorted by distance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NeighbourList {
    pub cutoff: f64,
    lists: Vec<Vec<Neighbour>>,
}

impl NeighbourList {
    /// Finds, for every point, all other points closer than `cutoff`.
    pub fn build(pos: &[f64], cell: &Cell, cutoff: f64, threads: usize) -> Result<Self> {
        check_positive("neighbour cutoff", cutoff)?;
        check_len("positions", 3 * (pos.len() / 3), pos.len())?;

        let n = pos.len() / 3;
        let c2 = cutoff * cutoff;

        let lists = with_threads(threads, || -> Result<Vec<Vec<Neighbour>>> {
            let boxes = Boxes::build(pos, cell, cutoff, CURRENT_POOL)?;
            Ok((0..n)
                .into_par_iter()
                .map(|i| {
                    let p = point_at(pos, i);
                    let mut found = Vec::new();
                    for &b in &boxes.neighbourhood_of(p).dedup() {
                        for &j in boxes.box_atoms(b) {
                            if j == i {
                                continue;
                            }
                            let r2 = separation2(p, point_at(pos, j), cell);
                            if r2 < c2 {
                                found.push(Neighbour {
                                    index: j,
                                    distance: r2.sqrt(),
                                });
                            }
                        }
                    }
                    found.sort_by(|a, b| {
                        a.distance
                            .total_cmp(&b.distance)
                            .then(a.index.cmp(&b.index))
                    });
                    found
                })
                .collect())
        })??;

        let total: usize = lists.iter().map(Vec::len).sum();
        log::debug!(
            "Neighbour list: {} points, {} bonds within {:.3} Å",
            n,
            total / 2,
            cutoff
        );

        Ok(Self { cutoff, lists })
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Neighbours of point `i`, nearest first.
    pub fn neighbours(&self, i: usize) -> &[Neighbour] {
        self.lists.get(i).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Coordination number of point `i`.
    pub fn count(&self, i: usize) -> usize {
        self.neighbours(i).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_cubic_coordination() {
        let mut pos = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    pos.extend_from_slice(&[2.0 * i as f64, 2.0 * j as f64, 2.0 * k as f64]);
                }
            }
        }
        let cell = Cell::cubic(8.0).unwrap();
        let nl = NeighbourList::build(&pos, &cell, 2.1, 2).unwrap();
        assert_eq!(nl.len(), 64);
        assert!((0..64).all(|i| nl.count(i) == 6));
        assert!((nl.neighbours(0)[0].distance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_small_free_cell_finds_pair() {
        // cutoff 4 in a free 10 Å cell: two boxes per axis
        let pos = [3.2, 5.0, 5.0, 6.9, 5.0, 5.0];
        let cell = Cell::new([10.0; 3], [false; 3]).unwrap();
        let nl = NeighbourList::build(&pos, &cell, 4.0, 1).unwrap();
        assert_eq!(nl.count(0), 1);
        assert_eq!(nl.neighbours(1)[0].index, 0);
        assert!((nl.neighbours(1)[0].distance - 3.7).abs() < 1e-12);
    }

    #[test]
    fn test_free_surface_and_ordering() {
        let pos = [0.5, 1.0, 1.0, 1.5, 1.0, 1.0, 3.0, 1.0, 1.0];
        let cell = Cell::new([10.0; 3], [false; 3]).unwrap();
        let nl = NeighbourList::build(&pos, &cell, 2.0, 1).unwrap();
        let n1: Vec<usize> = nl.neighbours(1).iter().map(|n| n.index).collect();
        assert_eq!(n1, vec![0, 2]);
        assert_eq!(nl.count(0), 1);
        assert!(nl.neighbours(9).is_empty());
    }
}
