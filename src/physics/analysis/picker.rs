// src/physics/analysis/picker.rs

use crate::error::{check_positive, try_with_capacity, AnalysisError, Result};
use crate::model::elements::{covalent_radius, DEFAULT_COVALENT_RADIUS};
use crate::model::{Cell, Sites};
use crate::physics::analysis::defects::{Antisite, SplitInterstitial};
use crate::spatial::Boxes;
use crate::utils::geometry::{point_at, separation2};
use serde::{Deserialize, Serialize};

/// What a picked point stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickCategory {
    Atom,
    Vacancy,
    Interstitial,
    Antisite,
    SplitInterstitial,
}

/// Result of a pick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub category: PickCategory,
    /// Position in the source list the point came from (for splits, the
    /// split's index, whichever of its three points was hit).
    pub index: usize,
    /// Distance from the query to the point's surface, never negative.
    pub distance: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PickOptions {
    /// Approximate grid box width (Å).
    pub box_width: f64,
    /// Vacancies are drawn larger than the atom they replace.
    pub vacancy_radius_scale: f64,
    pub threads: usize,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            box_width: 4.0,
            vacancy_radius_scale: 1.2,
            threads: 0,
        }
    }
}

/// Candidate points with covering radii, concatenated from one or more
/// sources. `sections` records where each source starts so a hit can be traced
/// back to its category and local index.
#[derive(Clone, Debug, Default)]
pub struct Candidates {
    pos: Vec<f64>,
    radius: Vec<f64>,
    /// (first candidate, category, points per item)
    sections: Vec<(usize, PickCategory, usize)>,
}

impl Candidates {
    pub fn len(&self) -> usize {
        self.radius.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radius.is_empty()
    }

    fn begin(&mut self, category: PickCategory, stride: usize) {
        self.sections.push((self.len(), category, stride));
    }

    fn push(&mut self, p: [f64; 3], radius: f64) {
        self.pos.extend_from_slice(&p);
        self.radius.push(radius);
    }

    /// Visible atoms, each covered by its species' covalent radius.
    pub fn from_atoms(visible: &[usize], atoms: &Sites) -> Result<Self> {
        let mut c = Self::with_capacity(visible.len())?;
        c.begin(PickCategory::Atom, 1);
        for &i in visible {
            check_index("visible atom", atoms, i)?;
            c.push(atoms.point(i), radius_of(atoms, i));
        }
        Ok(c)
    }

    /// Defect sources in the fixed order vacancies, interstitials, antisite
    /// occupants, split interstitials (three points each).
    pub fn from_defects(
        vacancies: &[usize],
        interstitials: &[usize],
        antisites: &[Antisite],
        splits: &[SplitInterstitial],
        input: &Sites,
        reference: &Sites,
        opts: &PickOptions,
    ) -> Result<Self> {
        for &v in vacancies {
            check_index("vacancy", reference, v)?;
        }
        for &i in interstitials {
            check_index("interstitial", input, i)?;
        }
        for a in antisites {
            check_index("antisite occupant", input, a.occupant)?;
        }
        for s in splits {
            check_index("split vacancy", reference, s.vacancy)?;
            check_index("split interstitial", input, s.first)?;
            check_index("split interstitial", input, s.second)?;
        }

        let n = vacancies.len() + interstitials.len() + antisites.len() + 3 * splits.len();
        let mut c = Self::with_capacity(n)?;

        c.begin(PickCategory::Vacancy, 1);
        for &v in vacancies {
            c.push(reference.point(v), radius_of(reference, v) * opts.vacancy_radius_scale);
        }
        c.begin(PickCategory::Interstitial, 1);
        for &i in interstitials {
            c.push(input.point(i), radius_of(input, i));
        }
        c.begin(PickCategory::Antisite, 1);
        for a in antisites {
            c.push(input.point(a.occupant), radius_of(input, a.occupant));
        }
        c.begin(PickCategory::SplitInterstitial, 3);
        for s in splits {
            c.push(reference.point(s.vacancy), radius_of(reference, s.vacancy));
            c.push(input.point(s.first), radius_of(input, s.first));
            c.push(input.point(s.second), radius_of(input, s.second));
        }
        Ok(c)
    }

    fn with_capacity(n: usize) -> Result<Self> {
        Ok(Self {
            pos: try_with_capacity("pick positions", 3 * n)?,
            radius: try_with_capacity("pick radii", n)?,
            sections: Vec::new(),
        })
    }

    /// Category and source-local index of candidate `k`.
    pub fn decode(&self, k: usize) -> Option<(PickCategory, usize)> {
        if k >= self.len() {
            return None;
        }
        // Last section starting at or before k; empty sections share a start
        // with the next one, so search from the back.
        self.sections
            .iter()
            .rev()
            .find(|(start, _, _)| *start <= k)
            .map(|&(start, category, stride)| (category, (k - start) / stride))
    }
}

fn check_index(name: &'static str, sites: &Sites, index: usize) -> Result<()> {
    if index >= sites.len() {
        return Err(AnalysisError::InvalidParameter {
            name,
            value: index as f64,
        });
    }
    Ok(())
}

fn radius_of(sites: &Sites, index: usize) -> f64 {
    sites.symbol(index).map_or(DEFAULT_COVALENT_RADIUS, covalent_radius)
}

/// Finds the candidate nearest to `query`.
///
/// Only the boxes around the query are searched, so `Ok(None)` means nothing
/// is within roughly one box width. Candidates are compared by raw distance;
/// the covering radius is subtracted from the winner's distance afterwards.
pub fn pick(query: [f64; 3], candidates: &Candidates, cell: &Cell, opts: &PickOptions) -> Result<Option<Pick>> {
    if candidates.is_empty() {
        return Err(AnalysisError::EmptyCandidates);
    }
    check_positive("pick box width", opts.box_width)?;

    let boxes = Boxes::build(&candidates.pos, cell, opts.box_width, opts.threads)?;

    let mut best: Option<(usize, f64)> = None;
    for &b in &boxes.neighbourhood_of(query) {
        for &k in boxes.box_atoms(b) {
            let r2 = separation2(query, point_at(&candidates.pos, k), cell);
            if best.map_or(true, |(_, min)| r2 < min) {
                best = Some((k, r2));
            }
        }
    }

    let Some((k, r2)) = best else {
        log::debug!("Pick at {:?}: nothing nearby", query);
        return Ok(None);
    };
    let Some((category, index)) = candidates.decode(k) else {
        return Ok(None);
    };
    let distance = (r2.sqrt() - candidates.radius[k]).max(0.0);
    log::debug!(
        "Pick at {:?}: {:?} {} at {:.3} Å",
        query,
        category,
        index,
        distance
    );

    Ok(Some(Pick {
        category,
        index,
        distance,
    }))
}
