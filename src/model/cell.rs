// src/model/cell.rs

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Orthogonal simulation box with independent periodicity per axis.
///
/// The origin is fixed at (0, 0, 0); coordinates on a periodic axis are
/// expected to lie in `[0, dims[axis])` once wrapped.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub dims: [f64; 3],
    pub pbc: [bool; 3],
}

impl Cell {
    /// Builds a cell, rejecting zero, negative or non-finite extents.
    pub fn new(dims: [f64; 3], pbc: [bool; 3]) -> Result<Self> {
        let cell = Self { dims, pbc };
        cell.validate()?;
        Ok(cell)
    }

    /// Fully periodic cubic cell, handy for tests and generated lattices.
    pub fn cubic(side: f64) -> Result<Self> {
        Self::new([side; 3], [true; 3])
    }

    pub fn validate(&self) -> Result<()> {
        for (axis, &extent) in self.dims.iter().enumerate() {
            if !(extent.is_finite() && extent > 0.0) {
                return Err(AnalysisError::DegenerateCell { axis, extent });
            }
        }
        Ok(())
    }

    pub fn volume(&self) -> f64 {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    pub fn is_periodic(&self) -> bool {
        self.pbc.iter().any(|&p| p)
    }

    /// Folds a point back into the cell along periodic axes.
    /// Non-periodic components are returned untouched.
    pub fn wrap_point(&self, p: [f64; 3]) -> [f64; 3] {
        let mut out = p;
        for axis in 0..3 {
            if self.pbc[axis] {
                let l = self.dims[axis];
                out[axis] = p[axis] - (p[axis] / l).floor() * l;
            }
        }
        out
    }
}
