// src/spatial/boxes.rs

use crate::error::{check_len, check_positive, try_filled, with_threads, AnalysisError, Result};
use crate::model::cell::Cell;
use rayon::prelude::*;

/// Number of boxes in a 3×3×3 stencil.
pub const STENCIL: usize = 27;

/// Minimum boxes on a periodic axis; with three or more boxes a neighbour
/// offset can wrap across the boundary at most once.
pub const MIN_PERIODIC_BOXES: usize = 3;

/// Uniform grid over an orthogonal cell for neighbour candidate lookup.
///
/// Points are stored box-by-box in one flat array (`box_start[b]..box_start[b + 1]`
/// indexes into `box_atoms`), so the grid is immutable once built. Rebuild it to
/// change the box width or the point set.
#[derive(Clone, Debug)]
pub struct Boxes {
    cell: Cell,
    n_boxes: [usize; 3],
    box_width: [f64; 3],
    box_start: Vec<usize>,
    box_atoms: Vec<usize>,
}

/// Box ids visited around one box. Always 27 entries from
/// [`Boxes::neighbourhood`], fewer after [`Neighbourhood::dedup`].
#[derive(Clone, Copy, Debug)]
pub struct Neighbourhood {
    ids: [usize; STENCIL],
    len: usize,
}

impl Neighbourhood {
    pub fn as_slice(&self) -> &[usize] {
        &self.ids[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops repeated ids. On a free (non-periodic) axis the stencil of an edge
    /// box is clamped onto itself, so callers that *count* things must visit
    /// each box once.
    pub fn dedup(mut self) -> Self {
        let slice = &mut self.ids[..self.len];
        slice.sort_unstable();
        let mut write = 0;
        for read in 0..slice.len() {
            if read == 0 || slice[read] != slice[write - 1] {
                slice[write] = slice[read];
                write += 1;
            }
        }
        self.len = write;
        self
    }
}

impl<'a> IntoIterator for &'a Neighbourhood {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl Boxes {
    /// Boxes the points of a flat `[x0, y0, z0, x1, ...]` array.
    ///
    /// Box counts per axis are `floor(extent / approx_width)`, raised to 3 on
    /// periodic axes and to 1 on free ones, so a free axis never gets boxes
    /// narrower than `approx_width`. Locating
    /// points runs on `threads` workers (0 = global pool); filling the shared
    /// box lists is done afterwards on the calling thread.
    pub fn build(pos: &[f64], cell: &Cell, approx_width: f64, threads: usize) -> Result<Self> {
        cell.validate()?;
        check_positive("box width", approx_width)?;
        check_len("positions", 3 * (pos.len() / 3), pos.len())?;

        let mut n_boxes = [0usize; 3];
        let mut box_width = [0.0f64; 3];
        for axis in 0..3 {
            let fit = (cell.dims[axis] / approx_width).floor();
            let min = if cell.pbc[axis] { MIN_PERIODIC_BOXES } else { 1 };
            let n = if fit.is_finite() && fit >= min as f64 {
                fit as usize
            } else {
                // Narrower periodic boxes still see the whole axis through the
                // wrapped stencil; a free axis never goes below the width.
                log::debug!(
                    "Axis {} holds only {} boxes of width {:.3}; using {}",
                    axis,
                    fit,
                    approx_width,
                    min
                );
                min
            };
            n_boxes[axis] = n;
            box_width[axis] = cell.dims[axis] / n as f64;
            if !(box_width[axis] > 0.0) {
                return Err(AnalysisError::DegenerateCell {
                    axis,
                    extent: cell.dims[axis],
                });
            }
        }

        let total = n_boxes[0]
            .checked_mul(n_boxes[1])
            .and_then(|n| n.checked_mul(n_boxes[2]))
            .ok_or(AnalysisError::Allocation { what: "box grid" })?;

        log::debug!(
            "Boxes: {} x {} x {} (width {:.3}, {:.3}, {:.3}) for {} points",
            n_boxes[0],
            n_boxes[1],
            n_boxes[2],
            box_width[0],
            box_width[1],
            box_width[2],
            pos.len() / 3
        );

        let mut grid = Self {
            cell: *cell,
            n_boxes,
            box_width,
            box_start: Vec::new(),
            box_atoms: Vec::new(),
        };

        // Locating is read-only and independent per point.
        let n_points = pos.len() / 3;
        let mut owner = try_filled("box owner list", n_points, 0usize)?;
        {
            let g = &grid;
            with_threads(threads, || {
                owner
                    .par_iter_mut()
                    .zip(pos.par_chunks_exact(3))
                    .for_each(|(slot, p)| *slot = g.box_index_of([p[0], p[1], p[2]]));
            })?;
        }

        // Counting sort into the flat per-box layout.
        let mut box_start = try_filled("box offsets", total + 1, 0usize)?;
        for &b in &owner {
            box_start[b + 1] += 1;
        }
        for b in 0..total {
            box_start[b + 1] += box_start[b];
        }
        let mut fill = try_filled("box fill cursor", total, 0usize)?;
        fill.copy_from_slice(&box_start[..total]);
        let mut box_atoms = try_filled("box atom list", n_points, 0usize)?;
        for (i, &b) in owner.iter().enumerate() {
            box_atoms[fill[b]] = i;
            fill[b] += 1;
        }

        grid.box_start = box_start;
        grid.box_atoms = box_atoms;
        Ok(grid)
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    /// Boxes along each axis.
    pub fn dims(&self) -> [usize; 3] {
        self.n_boxes
    }

    /// Actual box width along each axis (`extent / count`).
    pub fn box_width(&self) -> [f64; 3] {
        self.box_width
    }

    pub fn total_boxes(&self) -> usize {
        self.n_boxes[0] * self.n_boxes[1] * self.n_boxes[2]
    }

    /// Number of boxed points.
    pub fn len(&self) -> usize {
        self.box_atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.box_atoms.is_empty()
    }

    /// Box containing `p`.
    ///
    /// Each coordinate maps to `floor(x / width)` clamped into the grid. Points
    /// outside the cell are clamped, not wrapped, even on periodic axes: wrap
    /// them first (see [`Cell::wrap_point`]) if that is what you want.
    #[inline]
    pub fn box_index_of(&self, p: [f64; 3]) -> usize {
        let mut c = [0usize; 3];
        for axis in 0..3 {
            let raw = (p[axis] / self.box_width[axis]).floor();
            let max = (self.n_boxes[axis] - 1) as f64;
            // NaN falls through both comparisons and lands in box 0
            c[axis] = if raw >= max {
                self.n_boxes[axis] - 1
            } else if raw > 0.0 {
                raw as usize
            } else {
                0
            };
        }
        self.box_id(c)
    }

    #[inline]
    fn box_id(&self, c: [usize; 3]) -> usize {
        c[0] + self.n_boxes[0] * (c[1] + self.n_boxes[1] * c[2])
    }

    /// Grid coordinates of a box id.
    pub fn box_coords(&self, id: usize) -> [usize; 3] {
        let nx = self.n_boxes[0];
        let ny = self.n_boxes[1];
        [id % nx, (id / nx) % ny, id / (nx * ny)]
    }

    /// The 3×3×3 stencil around box `id`, self included.
    ///
    /// Periodic axes wrap; on free axes an out-of-range offset is clamped back
    /// onto the edge box, so edge stencils contain repeated ids.
    pub fn neighbourhood(&self, id: usize) -> Neighbourhood {
        let c = self.box_coords(id);
        let mut per_axis = [[0usize; 3]; 3];
        for axis in 0..3 {
            let n = self.n_boxes[axis] as isize;
            for (slot, off) in (-1isize..=1).enumerate() {
                let raw = c[axis] as isize + off;
                per_axis[axis][slot] = if self.cell.pbc[axis] {
                    raw.rem_euclid(n) as usize
                } else {
                    raw.clamp(0, n - 1) as usize
                };
            }
        }

        let mut ids = [0usize; STENCIL];
        let mut k = 0;
        for &z in &per_axis[2] {
            for &y in &per_axis[1] {
                for &x in &per_axis[0] {
                    ids[k] = self.box_id([x, y, z]);
                    k += 1;
                }
            }
        }
        Neighbourhood { ids, len: STENCIL }
    }

    /// Stencil around the box containing `p`.
    pub fn neighbourhood_of(&self, p: [f64; 3]) -> Neighbourhood {
        self.neighbourhood(self.box_index_of(p))
    }

    /// Indices of the points assigned to box `id`.
    #[inline]
    pub fn box_atoms(&self, id: usize) -> &[usize] {
        &self.box_atoms[self.box_start[id]..self.box_start[id + 1]]
    }
}
