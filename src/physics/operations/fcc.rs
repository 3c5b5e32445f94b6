// src/physics/operations/fcc.rs

use crate::error::{check_positive, AnalysisError, Result};
use crate::model::{Cell, Lattice};

/// Conventional FCC basis in units of a0.
const FCC_BASIS: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [0.0, 0.5, 0.5],
    [0.5, 0.0, 0.5],
    [0.5, 0.5, 0.0],
];

/// Atoms further than this past the cell edge are dropped.
const EDGE_TOLERANCE: f64 = 1e-4;

/// Builds an `nx × ny × nz` block of conventional FCC cells.
///
/// On a non-periodic axis one extra layer of cells is generated and clipped to
/// the cell extent, so the free surface is complete.
pub fn generate_fcc(sym: &str, cells: [usize; 3], a0: f64, pbc: [bool; 3]) -> Result<Lattice> {
    check_positive("lattice constant", a0)?;
    if let Some(&n) = cells.iter().find(|&&n| n == 0) {
        return Err(AnalysisError::InvalidParameter {
            name: "unit cell count",
            value: n as f64,
        });
    }

    let dims = [
        a0 * cells[0] as f64,
        a0 * cells[1] as f64,
        a0 * cells[2] as f64,
    ];
    let cell = Cell::new(dims, pbc)?;

    let mut stop = cells;
    for axis in 0..3 {
        if !pbc[axis] {
            stop[axis] += 1;
        }
    }

    let mut lattice = Lattice::new(cell);
    for i in 0..stop[0] {
        for j in 0..stop[1] {
            for k in 0..stop[2] {
                for b in &FCC_BASIS {
                    let p = [
                        (b[0] + i as f64) * a0,
                        (b[1] + j as f64) * a0,
                        (b[2] + k as f64) * a0,
                    ];
                    if (0..3).any(|axis| p[axis] > dims[axis] + EDGE_TOLERANCE) {
                        continue;
                    }
                    lattice.add_atom(sym, p, 0.0);
                }
            }
        }
    }

    log::info!(
        "Generated FCC {}: {} atoms in {:.3} x {:.3} x {:.3} Å",
        sym,
        lattice.len(),
        dims[0],
        dims[1],
        dims[2]
    );
    Ok(lattice)
}
