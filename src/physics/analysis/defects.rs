// src/physics/analysis/defects.rs

use crate::error::{check_positive, try_filled, try_with_capacity, with_threads, Result, CURRENT_POOL};
use crate::model::{Cell, Sites};
use crate::physics::analysis::clusters::find_clusters;
use crate::spatial::Boxes;
use crate::utils::geometry::{point_at, separation2};
use serde::{Deserialize, Serialize};

/// Reference boxes are this much wider than the capture radius.
pub const CAPTURE_BOX_SCALE: f64 = 1.1;

/// Interstitials within this multiple of the capture radius of a vacancy are
/// split-interstitial candidates.
pub const SPLIT_RADIUS_SCALE: f64 = 2.0;

// --- 1. RECORDS ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefectKind {
    Vacancy,
    Interstitial,
    Antisite,
    SplitInterstitial,
}

/// Reference site `site` holding input atom `occupant` of another species.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Antisite {
    pub site: usize,
    pub occupant: usize,
}

/// Vacant reference site flanked by exactly two interstitials.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitInterstitial {
    /// Reference index of the empty site.
    pub vacancy: usize,
    /// Input indices of the two interstitials, `first < second`.
    pub first: usize,
    pub second: usize,
}

/// Cluster id of every surviving defect, aligned with the lists of
/// [`DefectResult`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub n_clusters: usize,
    pub vacancies: Vec<usize>,
    pub interstitials: Vec<usize>,
    pub antisites: Vec<usize>,
    pub splits: Vec<usize>,
}

/// Per-category totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectCounts {
    /// Vacancies + interstitials + antisites + splits (a split counts once).
    pub defects: usize,
    pub vacancies: usize,
    pub interstitials: usize,
    pub antisites: usize,
    pub clusters: usize,
    pub splits: usize,
}

impl DefectCounts {
    /// `[NDefects, NVacancies, NInterstitials, NAntisites, NClusters, NSplit]`
    pub fn as_array(&self) -> [usize; 6] {
        [
            self.defects,
            self.vacancies,
            self.interstitials,
            self.antisites,
            self.clusters,
            self.splits,
        ]
    }
}

/// Occupancy counters by species.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCounts {
    /// Indexed by reference species.
    pub vacancies: Vec<usize>,
    /// Indexed by input species.
    pub interstitials: Vec<usize>,
    /// Indexed by reference species (the species that should be there).
    pub antisites: Vec<usize>,
    /// `[reference species][input species]` of each antisite and its occupant.
    pub on_antisites: Vec<Vec<usize>>,
    /// `[input species of first][input species of second]` per split.
    pub splits: Vec<Vec<usize>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DefectResult {
    /// Reference indices.
    pub vacancies: Vec<usize>,
    /// Input indices.
    pub interstitials: Vec<usize>,
    pub antisites: Vec<Antisite>,
    pub splits: Vec<SplitInterstitial>,
    pub clusters: Option<ClusterAssignment>,
    pub species_counts: SpeciesCounts,
}

impl DefectResult {
    pub fn counts(&self) -> DefectCounts {
        let vacancies = self.vacancies.len();
        let interstitials = self.interstitials.len();
        let antisites = self.antisites.len();
        let splits = self.splits.len();
        DefectCounts {
            defects: vacancies + interstitials + antisites + splits,
            vacancies,
            interstitials,
            antisites,
            clusters: self.clusters.as_ref().map_or(0, |c| c.n_clusters),
            splits,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts().defects == 0
    }
}

// --- 2. OPTIONS ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterOptions {
    pub radius: f64,
    pub min_size: usize,
    pub max_size: usize,
}

impl ClusterOptions {
    /// Both size bounds are ignored when `max_size < min_size`.
    pub fn accepts(&self, size: usize) -> bool {
        self.max_size < self.min_size || (self.min_size..=self.max_size).contains(&size)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DefectOptions {
    pub capture_radius: f64,
    pub include_vacancies: bool,
    pub include_interstitials: bool,
    pub include_antisites: bool,
    pub include_splits: bool,
    /// Input species symbols never reported as interstitials.
    pub exclude_interstitial_species: Vec<String>,
    /// Reference species symbols never reported as vacancies.
    pub exclude_vacancy_species: Vec<String>,
    pub identify_splits: bool,
    pub cluster: Option<ClusterOptions>,
    /// Worker threads for the whole session (0 = rayon's global pool).
    pub threads: usize,
}

impl Default for DefectOptions {
    fn default() -> Self {
        Self {
            capture_radius: 0.6,
            include_vacancies: true,
            include_interstitials: true,
            include_antisites: true,
            include_splits: true,
            exclude_interstitial_species: Vec::new(),
            exclude_vacancy_species: Vec::new(),
            identify_splits: true,
            cluster: None,
            threads: 0,
        }
    }
}

// --- 3. SITE MATCHING ---

/// Who sits where after the capture pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiteMatching {
    /// Input atom captured by each reference site.
    pub site_occupant: Vec<Option<usize>>,
    /// Reference site that captured each input atom.
    pub atom_site: Vec<Option<usize>>,
}

/// Pairs input atoms with reference sites.
///
/// Each input atom claims the first unclaimed reference site found within
/// `radius` while walking its box neighbourhood. This is first-match, not
/// nearest-match: an atom sitting between two sites takes whichever is scanned
/// first.
pub fn match_sites(
    input: &Sites,
    reference: &Sites,
    cell: &Cell,
    radius: f64,
    threads: usize,
) -> Result<SiteMatching> {
    check_positive("capture radius", radius)?;
    input.validate()?;
    reference.validate()?;

    let boxes = Boxes::build(reference.pos, cell, CAPTURE_BOX_SCALE * radius, threads)?;
    let r2 = radius * radius;

    let mut site_occupant = try_filled("site claims", reference.len(), None)?;
    let mut atom_site = try_filled("atom claims", input.len(), None)?;

    for (i, claim) in atom_site.iter_mut().enumerate() {
        let p = input.point(i);
        'search: for &b in &boxes.neighbourhood_of(p) {
            for &j in boxes.box_atoms(b) {
                if site_occupant[j].is_some() {
                    continue;
                }
                if separation2(p, reference.point(j), cell) < r2 {
                    site_occupant[j] = Some(i);
                    *claim = Some(j);
                    break 'search;
                }
            }
        }
    }

    Ok(SiteMatching {
        site_occupant,
        atom_site,
    })
}

// --- 4. CLASSIFICATION ---

/// Classifies `input` against `reference` as vacancies, interstitials,
/// antisites and split interstitials, then filters and optionally clusters.
///
/// Coordinates on periodic axes should already be wrapped into the cell.
pub fn find_defects(
    input: &Sites,
    reference: &Sites,
    cell: &Cell,
    opts: &DefectOptions,
) -> Result<DefectResult> {
    cell.validate()?;
    check_positive("capture radius", opts.capture_radius)?;
    if let Some(c) = &opts.cluster {
        check_positive("cluster radius", c.radius)?;
    }

    // One pool for every grid of the session.
    with_threads(opts.threads, || classify_session(input, reference, cell, opts))?
}

fn classify_session(
    input: &Sites,
    reference: &Sites,
    cell: &Cell,
    opts: &DefectOptions,
) -> Result<DefectResult> {
    let matching = match_sites(input, reference, cell, opts.capture_radius, CURRENT_POOL)?;

    // Input species id -> reference species id, by symbol.
    let ref_species_of: Vec<Option<usize>> = input
        .species
        .iter()
        .map(|(sym, _)| reference.species.index_of(sym))
        .collect();

    let mut result = DefectResult::default();
    for (j, occupant) in matching.site_occupant.iter().enumerate() {
        match *occupant {
            None => result.vacancies.push(j),
            Some(i) if ref_species_of[input.specie[i]] != Some(reference.specie[j]) => {
                result.antisites.push(Antisite { site: j, occupant: i })
            }
            Some(_) => {}
        }
    }
    result.interstitials = matching
        .atom_site
        .iter()
        .enumerate()
        .filter(|(_, site)| site.is_none())
        .map(|(i, _)| i)
        .collect();

    log::debug!(
        "Capture pass: {} vacancies, {} interstitials, {} antisites",
        result.vacancies.len(),
        result.interstitials.len(),
        result.antisites.len()
    );

    if opts.identify_splits && !result.vacancies.is_empty() && result.interstitials.len() >= 2 {
        pair_splits(&mut result, input, reference, cell, opts)?;
    }

    apply_filters(&mut result, input, reference, opts);

    if let Some(c) = &opts.cluster {
        cluster_defects(&mut result, input, reference, cell, c)?;
    }

    result.species_counts = count_species(&result, input, reference);

    let counts = result.counts();
    log::info!(
        "Found {} defects: {} vacancies, {} interstitials, {} antisites, {} split interstitials, {} clusters",
        counts.defects,
        counts.vacancies,
        counts.interstitials,
        counts.antisites,
        counts.splits,
        counts.clusters
    );

    Ok(result)
}

/// Turns each vacancy with exactly two free interstitials nearby into a split
/// interstitial. Interstitials already used by an earlier split are not seen
/// by later vacancies.
fn pair_splits(
    result: &mut DefectResult,
    input: &Sites,
    reference: &Sites,
    cell: &Cell,
    opts: &DefectOptions,
) -> Result<()> {
    let ints = &result.interstitials;
    let mut int_pos = try_with_capacity("interstitial positions", 3 * ints.len())?;
    for &i in ints {
        int_pos.extend_from_slice(&input.point(i));
    }

    let search = SPLIT_RADIUS_SCALE * opts.capture_radius;
    let boxes = Boxes::build(&int_pos, cell, search, CURRENT_POOL)?;
    let r2 = search * search;

    let mut used = try_filled("split interstitial claims", ints.len(), false)?;
    let mut paired = try_filled("split vacancy claims", result.vacancies.len(), false)?;
    let mut splits = Vec::new();

    for (v, &site) in result.vacancies.iter().enumerate() {
        let p = reference.point(site);
        let mut found = [0usize; 2];
        let mut n_found = 0;
        for &b in &boxes.neighbourhood_of(p).dedup() {
            for &k in boxes.box_atoms(b) {
                if used[k] {
                    continue;
                }
                if separation2(p, point_at(&int_pos, k), cell) < r2 {
                    if n_found < 2 {
                        found[n_found] = k;
                    }
                    n_found += 1;
                }
            }
        }

        if n_found == 2 {
            used[found[0]] = true;
            used[found[1]] = true;
            paired[v] = true;
            let (a, b) = (ints[found[0]], ints[found[1]]);
            splits.push(SplitInterstitial {
                vacancy: site,
                first: a.min(b),
                second: a.max(b),
            });
        }
    }

    let mut k = 0;
    result.interstitials.retain(|_| {
        k += 1;
        !used[k - 1]
    });
    let mut k = 0;
    result.vacancies.retain(|_| {
        k += 1;
        !paired[k - 1]
    });
    log::debug!("Split pass: {} split interstitials", splits.len());
    result.splits = splits;
    Ok(())
}

fn apply_filters(result: &mut DefectResult, input: &Sites, reference: &Sites, opts: &DefectOptions) {
    if opts.include_vacancies {
        let excluded = reference.species.indices_of(&opts.exclude_vacancy_species);
        result
            .vacancies
            .retain(|&j| !excluded.contains(&reference.specie[j]));
    } else {
        result.vacancies.clear();
    }

    if opts.include_interstitials {
        let excluded = input.species.indices_of(&opts.exclude_interstitial_species);
        result
            .interstitials
            .retain(|&i| !excluded.contains(&input.specie[i]));
    } else {
        result.interstitials.clear();
    }

    if !opts.include_antisites {
        result.antisites.clear();
    }
    if !opts.include_splits {
        result.splits.clear();
    }
}

/// Clusters the surviving defects, drops those in clusters of rejected size
/// and records the renumbered cluster ids.
///
/// Vacancies, antisites and splits are placed at their reference site,
/// interstitials at their own position.
fn cluster_defects(
    result: &mut DefectResult,
    input: &Sites,
    reference: &Sites,
    cell: &Cell,
    opts: &ClusterOptions,
) -> Result<()> {
    let total = result.counts().defects;
    let mut pos = try_with_capacity("defect positions", 3 * total)?;
    for &v in &result.vacancies {
        pos.extend_from_slice(&reference.point(v));
    }
    for &i in &result.interstitials {
        pos.extend_from_slice(&input.point(i));
    }
    for a in &result.antisites {
        pos.extend_from_slice(&reference.point(a.site));
    }
    for s in &result.splits {
        pos.extend_from_slice(&reference.point(s.vacancy));
    }

    let clustering = find_clusters(&pos, cell, opts.radius, CURRENT_POOL)?;
    let (ids, n_clusters) = clustering.retain_sizes(|size| opts.accepts(size));

    let mut assign = ClusterAssignment {
        n_clusters,
        ..Default::default()
    };
    let mut ids = ids.into_iter();
    result.vacancies = keep_clustered(&result.vacancies, &mut ids, &mut assign.vacancies);
    result.interstitials = keep_clustered(&result.interstitials, &mut ids, &mut assign.interstitials);
    result.antisites = keep_clustered(&result.antisites, &mut ids, &mut assign.antisites);
    result.splits = keep_clustered(&result.splits, &mut ids, &mut assign.splits);

    log::debug!(
        "Cluster pass: {} of {} clusters kept",
        n_clusters,
        clustering.n_clusters()
    );
    result.clusters = Some(assign);
    Ok(())
}

/// Takes the next `items.len()` ids and keeps the items whose cluster survived.
fn keep_clustered<T: Copy, I: Iterator<Item = Option<usize>>>(
    items: &[T],
    ids: &mut I,
    cluster_ids: &mut Vec<usize>,
) -> Vec<T> {
    let mut kept = Vec::with_capacity(items.len());
    for &item in items {
        if let Some(id) = ids.next().flatten() {
            kept.push(item);
            cluster_ids.push(id);
        }
    }
    kept
}

fn count_species(result: &DefectResult, input: &Sites, reference: &Sites) -> SpeciesCounts {
    let n_ref = reference.species.len();
    let n_in = input.species.len();
    let mut counts = SpeciesCounts {
        vacancies: vec![0; n_ref],
        interstitials: vec![0; n_in],
        antisites: vec![0; n_ref],
        on_antisites: vec![vec![0; n_in]; n_ref],
        splits: vec![vec![0; n_in]; n_in],
    };

    for &v in &result.vacancies {
        counts.vacancies[reference.specie[v]] += 1;
    }
    for &i in &result.interstitials {
        counts.interstitials[input.specie[i]] += 1;
    }
    for a in &result.antisites {
        let s_ref = reference.specie[a.site];
        counts.antisites[s_ref] += 1;
        counts.on_antisites[s_ref][input.specie[a.occupant]] += 1;
    }
    for s in &result.splits {
        counts.splits[input.specie[s.first]][input.specie[s.second]] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Lattice;
    use proptest::prelude::*;

    /// Simple cubic Fe, spacing 2, in a periodic 10 Å box (125 sites).
    fn simple_cubic() -> Lattice {
        simple_cubic_in(Cell::cubic(10.0).unwrap())
    }

    fn simple_cubic_in(cell: Cell) -> Lattice {
        let mut lat = Lattice::new(cell);
        for i in 0..5 {
            for j in 0..5 {
                for k in 0..5 {
                    lat.add_atom("Fe", [2.0 * i as f64, 2.0 * j as f64, 2.0 * k as f64], 0.0);
                }
            }
        }
        lat
    }

    fn site_index(lat: &Lattice, p: [f64; 3]) -> usize {
        (0..lat.len())
            .find(|&i| lat.atom_pos(i) == p)
            .unwrap()
    }

    fn classify(input: &Lattice, reference: &Lattice, opts: &DefectOptions) -> DefectResult {
        find_defects(&input.sites(), &reference.sites(), &reference.cell, opts).unwrap()
    }

    #[test]
    fn test_missing_atom_is_a_vacancy() {
        let cell = Cell::cubic(10.0).unwrap();
        let mut reference = Lattice::new(cell);
        reference.add_atom("Fe", [1.0, 1.0, 1.0], 0.0);
        reference.add_atom("Fe", [3.0, 1.0, 1.0], 0.0);
        let mut input = Lattice::new(cell);
        input.add_atom("Fe", [1.0, 1.0, 1.0], 0.0);

        let r = classify(&input, &reference, &DefectOptions::default());
        let c = r.counts();
        assert_eq!(c.vacancies, 1);
        assert_eq!(c.interstitials, 0);
        assert_eq!(c.antisites, 0);
        assert_eq!(r.vacancies, vec![1]);
    }

    #[test]
    fn test_antisite_and_interstitial() {
        let reference = simple_cubic();
        let mut input = Lattice::new(reference.cell);
        for i in 0..reference.len() {
            let p = reference.atom_pos(i);
            let sym = if p == [4.0, 4.0, 4.0] { "Cr" } else { "Fe" };
            input.add_atom(sym, [p[0] + 0.1, p[1], p[2]], 0.0);
        }
        let extra = input.add_atom("Fe", [5.0, 5.0, 5.0], 0.0);

        let r = classify(&input, &reference, &DefectOptions::default());
        let site = site_index(&reference, [4.0, 4.0, 4.0]);
        assert_eq!(r.vacancies.len(), 0);
        assert_eq!(r.interstitials, vec![extra]);
        assert_eq!(r.antisites.len(), 1);
        assert_eq!(r.antisites[0].site, site);
        assert_eq!(input.atom_symbol(r.antisites[0].occupant), Some("Cr"));

        let sc = &r.species_counts;
        assert_eq!(sc.antisites, vec![1]);
        // input species: Fe = 0, Cr = 1
        assert_eq!(sc.on_antisites[0][1], 1);
        assert_eq!(sc.interstitials, vec![1, 0]);
    }

    /// Reference minus the (4,4,4) site, plus the given extra atoms.
    fn vacancy_with(extra: &[[f64; 3]]) -> (Lattice, Lattice) {
        let reference = simple_cubic();
        let mut input = Lattice::new(reference.cell);
        for i in 0..reference.len() {
            let p = reference.atom_pos(i);
            if p != [4.0, 4.0, 4.0] {
                input.add_atom("Fe", p, 0.0);
            }
        }
        for &p in extra {
            input.add_atom("Fe", p, 0.0);
        }
        (input, reference)
    }

    #[test]
    fn test_dumbbell_becomes_split_interstitial() {
        let (input, reference) = vacancy_with(&[[4.0, 4.0, 3.1], [4.0, 4.0, 4.9]]);
        let n = input.len();

        let plain = classify(
            &input,
            &reference,
            &DefectOptions {
                identify_splits: false,
                ..Default::default()
            },
        );
        let split = classify(&input, &reference, &DefectOptions::default());

        let before = plain.counts();
        let after = split.counts();
        assert_eq!((before.vacancies, before.interstitials, before.splits), (1, 2, 0));
        assert_eq!((after.vacancies, after.interstitials, after.splits), (0, 0, 1));
        assert_eq!(before.defects - after.defects, 2);

        let s = split.splits[0];
        assert_eq!(s.vacancy, site_index(&reference, [4.0, 4.0, 4.0]));
        assert_eq!((s.first, s.second), (n - 2, n - 1));
        assert_eq!(split.species_counts.splits[0][0], 1);
    }

    #[test]
    fn test_three_neighbours_stay_plain() {
        let (input, reference) = vacancy_with(&[[4.0, 4.0, 3.1], [4.0, 4.0, 4.9], [4.9, 4.0, 4.0]]);
        let r = classify(&input, &reference, &DefectOptions::default());
        let c = r.counts();
        assert_eq!((c.vacancies, c.interstitials, c.splits), (1, 3, 0));
    }

    #[test]
    fn test_include_and_exclude_filters() {
        let (mut input, reference) = vacancy_with(&[]);
        input.add_atom("He", [5.0, 5.0, 5.0], 0.0);
        input.add_atom("Fe", [1.0, 1.0, 1.0], 0.0);

        let all = classify(&input, &reference, &DefectOptions::default());
        assert_eq!(all.counts().interstitials, 2);

        let no_he = classify(
            &input,
            &reference,
            &DefectOptions {
                exclude_interstitial_species: vec!["He".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(no_he.counts().interstitials, 1);
        assert_eq!(input.atom_symbol(no_he.interstitials[0]), Some("Fe"));

        let no_fe_vac = classify(
            &input,
            &reference,
            &DefectOptions {
                exclude_vacancy_species: vec!["Fe".to_string()],
                include_interstitials: false,
                ..Default::default()
            },
        );
        assert_eq!(no_fe_vac.counts().defects, 0);
        assert!(no_fe_vac.is_empty());
    }

    #[test]
    fn test_cluster_size_filter() {
        let reference = simple_cubic();
        let missing = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [6.0, 6.0, 6.0]];
        let mut input = Lattice::new(reference.cell);
        for i in 0..reference.len() {
            let p = reference.atom_pos(i);
            if !missing.contains(&p) {
                input.add_atom("Fe", p, 0.0);
            }
        }

        let mut opts = DefectOptions {
            cluster: Some(ClusterOptions {
                radius: 2.1,
                min_size: 2,
                max_size: 10,
            }),
            ..Default::default()
        };
        let r = classify(&input, &reference, &opts);
        assert_eq!(r.counts().clusters, 1);
        assert_eq!(r.vacancies.len(), 2);
        assert_eq!(r.clusters.as_ref().unwrap().vacancies, vec![0, 0]);

        // max < min disables the bounds
        opts.cluster = Some(ClusterOptions {
            radius: 2.1,
            min_size: 5,
            max_size: 1,
        });
        let r = classify(&input, &reference, &opts);
        assert_eq!(r.counts().clusters, 2);
        assert_eq!(r.counts().vacancies, 3);
    }

    /// Slab with the (0,0,0), (0,0,8) and (4,4,8) sites empty and a dumbbell
    /// around the last one.
    fn damaged_slab(z_periodic: bool) -> (Lattice, Lattice) {
        let cell = Cell::new([10.0; 3], [true, true, z_periodic]).unwrap();
        let reference = simple_cubic_in(cell);
        let empty = [[0.0, 0.0, 0.0], [0.0, 0.0, 8.0], [4.0, 4.0, 8.0]];
        let mut input = Lattice::new(cell);
        for i in 0..reference.len() {
            let p = reference.atom_pos(i);
            if !empty.contains(&p) {
                input.add_atom("Fe", p, 0.0);
            }
        }
        input.add_atom("Fe", [4.0, 4.0, 7.1], 0.0);
        input.add_atom("Fe", [4.0, 4.0, 8.9], 0.0);
        (input, reference)
    }

    #[test]
    fn test_free_surface_slab() {
        let opts = DefectOptions {
            cluster: Some(ClusterOptions {
                radius: 2.1,
                min_size: 1,
                max_size: 0,
            }),
            ..Default::default()
        };

        let (input, reference) = damaged_slab(false);
        let r = classify(&input, &reference, &opts);
        let c = r.counts();
        assert_eq!((c.vacancies, c.interstitials, c.splits), (2, 0, 1));
        assert_eq!(r.splits[0].vacancy, site_index(&reference, [4.0, 4.0, 8.0]));
        // the two vacancies are 8 Å apart through the slab
        assert_eq!(c.clusters, 3);

        // periodic along z they are 2 Å apart through the boundary
        let (input, reference) = damaged_slab(true);
        let r = classify(&input, &reference, &opts);
        assert_eq!(r.counts().splits, 1);
        assert_eq!(r.counts().clusters, 2);
    }

    #[test]
    fn test_cluster_radius_large_against_free_axis() {
        // cluster boxes: 3 periodic along x/y, 2 of 5 Å along the free z
        let cell = Cell::new([10.0; 3], [true, true, false]).unwrap();
        let reference = simple_cubic_in(cell);
        let mut input = Lattice::new(cell);
        for i in 0..reference.len() {
            input.add_atom("Fe", reference.atom_pos(i), 0.0);
        }
        input.add_atom("Fe", [5.0, 5.0, 3.2], 0.0);
        input.add_atom("Fe", [5.0, 5.0, 6.8], 0.0);

        let opts = DefectOptions {
            cluster: Some(ClusterOptions {
                radius: 4.0,
                min_size: 1,
                max_size: 0,
            }),
            ..Default::default()
        };
        let r = classify(&input, &reference, &opts);
        assert_eq!(r.counts().interstitials, 2);
        assert_eq!(r.counts().clusters, 1);
    }

    #[test]
    fn test_counts_array_layout() {
        let c = DefectCounts {
            defects: 6,
            vacancies: 1,
            interstitials: 2,
            antisites: 3,
            clusters: 4,
            splits: 0,
        };
        assert_eq!(c.as_array(), [6, 1, 2, 3, 4, 0]);
    }

    #[test]
    fn test_rejects_bad_radius() {
        let lat = simple_cubic();
        let opts = DefectOptions {
            capture_radius: -1.0,
            ..Default::default()
        };
        assert!(find_defects(&lat.sites(), &lat.sites(), &lat.cell, &opts).is_err());
    }

    proptest! {
        #[test]
        fn sites_and_atoms_are_partitioned(
            moves in proptest::collection::vec((0usize..125, -0.9f64..0.9, -0.9f64..0.9, -0.9f64..0.9, any::<bool>()), 0..40),
        ) {
            let reference = simple_cubic();
            let mut input = Lattice::new(reference.cell);
            let mut pos: Vec<[f64; 3]> = (0..reference.len()).map(|i| reference.atom_pos(i)).collect();
            let mut swap = vec![false; reference.len()];
            for &(i, dx, dy, dz, s) in &moves {
                pos[i] = reference.cell.wrap_point([pos[i][0] + dx, pos[i][1] + dy, pos[i][2] + dz]);
                swap[i] = s;
            }
            for (i, p) in pos.iter().enumerate() {
                input.add_atom(if swap[i] { "Cr" } else { "Fe" }, *p, 0.0);
            }

            let m = match_sites(&input.sites(), &reference.sites(), &reference.cell, 0.6, 1).unwrap();
            let r = classify(&input, &reference, &DefectOptions { identify_splits: false, ..Default::default() });

            // each reference site: vacancy xor antisite xor perfectly occupied
            for j in 0..reference.len() {
                let vac = r.vacancies.contains(&j);
                let ant = r.antisites.iter().any(|a| a.site == j);
                let perfect = m.site_occupant[j].is_some() && !ant;
                prop_assert_eq!(vac as u8 + ant as u8 + perfect as u8, 1);
            }
            // each input atom: interstitial xor occupant
            for i in 0..input.len() {
                let int = r.interstitials.contains(&i);
                let occ = m.atom_site[i].is_some();
                prop_assert!(int != occ);
            }
            // claims are mutual
            for (j, occ) in m.site_occupant.iter().enumerate() {
                if let Some(i) = occ {
                    prop_assert_eq!(m.atom_site[*i], Some(j));
                }
            }
        }
    }
}
