// src/physics/analysis/rdf.rs

use crate::error::{check_positive, try_filled, with_threads, AnalysisError, Result, CURRENT_POOL};
use crate::model::{Cell, Sites};
use crate::spatial::Boxes;
use crate::utils::geometry::separation2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// --- 1. SETTINGS ---

/// How raw pair counts become g(r).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RdfNormalisation {
    /// Divide by shell volume, then by the mean over non-empty shells.
    ShellAverage,
    /// Divide by shell volume times the ideal-gas pair density
    /// `n_centres * n_neighbours / V`.
    Density,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RdfOptions {
    pub start: f64,
    pub finish: f64,
    pub bins: usize,
    /// Only these atoms act as centres, e.g. the ones currently visible
    /// (`None` = all). Combined with `centre_species`.
    pub centre_atoms: Option<Vec<usize>>,
    /// Only atoms of this species act as centres (`None` = all).
    pub centre_species: Option<String>,
    /// Only atoms of this species are counted around a centre (`None` = all).
    pub neighbour_species: Option<String>,
    /// Count each unordered pair once.
    pub unique_pairs: bool,
    pub normalisation: RdfNormalisation,
    pub threads: usize,
}

impl Default for RdfOptions {
    fn default() -> Self {
        Self {
            start: 0.0,
            finish: 10.0,
            bins: 100,
            centre_atoms: None,
            centre_species: None,
            neighbour_species: None,
            unique_pairs: false,
            normalisation: RdfNormalisation::ShellAverage,
            threads: 0,
        }
    }
}

impl RdfOptions {
    pub fn interval(&self) -> f64 {
        (self.finish - self.start) / self.bins as f64
    }

    fn validate(&self) -> Result<()> {
        if self.bins == 0 {
            return Err(AnalysisError::InvalidParameter {
                name: "rdf bins",
                value: 0.0,
            });
        }
        if !(self.start >= 0.0) {
            return Err(AnalysisError::InvalidParameter {
                name: "rdf start",
                value: self.start,
            });
        }
        check_positive("rdf finish", self.finish)?;
        check_positive("rdf bin width", self.finish - self.start)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rdf {
    /// Bin centres (Å).
    pub radii: Vec<f64>,
    /// Raw pair counts per bin.
    pub counts: Vec<u64>,
    pub g: Vec<f64>,
}

// --- 2. COUNTING ---

/// Species filter resolved against a table: `None` accepts everything,
/// `Some(None)` names a species the table doesn't have.
fn resolve(sites: &Sites, sym: &Option<String>) -> Option<Option<usize>> {
    sym.as_ref().map(|s| sites.species.index_of(s))
}

fn accepts(filter: Option<Option<usize>>, specie: usize) -> bool {
    match filter {
        None => true,
        Some(id) => id == Some(specie),
    }
}

/// Marks the atoms that act as centres: listed in `centre_atoms` (if given)
/// and of the centre species.
fn centre_mask(atoms: &Sites, opts: &RdfOptions) -> Result<Vec<bool>> {
    let species = resolve(atoms, &opts.centre_species);
    let mut mask = try_filled("rdf centre mask", atoms.len(), opts.centre_atoms.is_none())?;
    if let Some(subset) = &opts.centre_atoms {
        for &i in subset {
            if i >= atoms.len() {
                return Err(AnalysisError::InvalidParameter {
                    name: "rdf centre atom",
                    value: i as f64,
                });
            }
            mask[i] = true;
        }
    }
    for (m, &s) in mask.iter_mut().zip(atoms.specie) {
        *m = *m && accepts(species, s);
    }
    Ok(mask)
}

/// Pair counts per bin for every centre/neighbour pair with
/// `start <= r < finish`.
///
/// With `unique_pairs`, a pair whose neighbour is also a centre is only
/// counted from its lower-indexed end. Centres are processed in parallel,
/// each worker filling its own histogram.
pub fn pair_histogram(atoms: &Sites, cell: &Cell, opts: &RdfOptions) -> Result<Vec<u64>> {
    opts.validate()?;
    atoms.validate()?;

    let is_centre = centre_mask(atoms, opts)?;
    let neighbour = resolve(atoms, &opts.neighbour_species);
    let interval = opts.interval();
    let (start2, finish2) = (opts.start * opts.start, opts.finish * opts.finish);
    let n_bins = opts.bins;

    let hist = with_threads(opts.threads, || -> Result<Vec<u64>> {
        let boxes = Boxes::build(atoms.pos, cell, opts.finish, CURRENT_POOL)?;
        Ok((0..atoms.len())
            .into_par_iter()
            .filter(|&i| is_centre[i])
            .fold(
                || vec![0u64; n_bins],
                |mut hist, i| {
                    let p = atoms.point(i);
                    for &b in &boxes.neighbourhood_of(p).dedup() {
                        for &j in boxes.box_atoms(b) {
                            if j == i || !accepts(neighbour, atoms.specie[j]) {
                                continue;
                            }
                            if opts.unique_pairs && j < i && is_centre[j] {
                                continue;
                            }
                            let r2 = separation2(p, atoms.point(j), cell);
                            if r2 < start2 || r2 >= finish2 {
                                continue;
                            }
                            let bin = ((r2.sqrt() - opts.start) / interval) as usize;
                            hist[bin.min(n_bins - 1)] += 1;
                        }
                    }
                    hist
                },
            )
            .reduce(
                || vec![0u64; n_bins],
                |mut a, b| {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += y;
                    }
                    a
                },
            ))
    })??;

    log::debug!(
        "RDF: {} pairs binned into {} bins",
        hist.iter().sum::<u64>(),
        n_bins
    );
    Ok(hist)
}

// --- 3. NORMALISATION ---

fn shell_volume(opts: &RdfOptions, bin: usize) -> f64 {
    let interval = opts.interval();
    let ini = opts.start + bin as f64 * interval;
    let fin = ini + interval;
    4.0 / 3.0 * PI * (fin.powi(3) - ini.powi(3))
}

/// Turns raw counts into g(r) with the selected normalisation.
///
/// `n_centres` and `n_neighbours` are only used by
/// [`RdfNormalisation::Density`].
pub fn normalise(
    counts: &[u64],
    opts: &RdfOptions,
    n_centres: usize,
    n_neighbours: usize,
    volume: f64,
) -> Vec<f64> {
    let per_shell: Vec<f64> = counts
        .iter()
        .enumerate()
        .map(|(bin, &c)| c as f64 / shell_volume(opts, bin))
        .collect();

    match opts.normalisation {
        RdfNormalisation::ShellAverage => {
            let filled: Vec<f64> = per_shell.iter().copied().filter(|&x| x > 0.0).collect();
            if filled.is_empty() {
                return per_shell;
            }
            let mean = filled.iter().sum::<f64>() / filled.len() as f64;
            per_shell.iter().map(|x| x / mean).collect()
        }
        RdfNormalisation::Density => {
            let pair_density = n_centres as f64 * n_neighbours as f64 / volume;
            if !(pair_density > 0.0) {
                return vec![0.0; counts.len()];
            }
            let same_sets = opts.centre_species == opts.neighbour_species;
            let scale = if opts.unique_pairs && same_sets { 2.0 } else { 1.0 };
            per_shell.iter().map(|x| scale * x / pair_density).collect()
        }
    }
}

/// Counts and normalises in one go.
pub fn compute_rdf(atoms: &Sites, cell: &Cell, opts: &RdfOptions) -> Result<Rdf> {
    let counts = pair_histogram(atoms, cell, opts)?;

    let n_centres = centre_mask(atoms, opts)?.into_iter().filter(|&c| c).count();
    let neighbour = resolve(atoms, &opts.neighbour_species);
    let n_neighbours = atoms.specie.iter().filter(|&&s| accepts(neighbour, s)).count();

    let g = normalise(&counts, opts, n_centres, n_neighbours, cell.volume());
    let interval = opts.interval();
    let radii = (0..opts.bins)
        .map(|b| opts.start + (b as f64 + 0.5) * interval)
        .collect();

    Ok(Rdf { radii, counts, g })
}
