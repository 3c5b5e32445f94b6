// src/physics/analysis/clusters.rs

use crate::error::{check_len, check_positive, try_filled, Result};
use crate::model::{Cell, Sites};
use crate::physics::analysis::defects::{Antisite, DefectKind, DefectResult, SplitInterstitial};
use crate::spatial::Boxes;
use crate::utils::geometry::{point_at, separation2, separation2_pbc_check, separation_vector};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

const UNASSIGNED: usize = usize::MAX;

// --- 1. CONNECTED COMPONENTS ---

/// Partition of a point set into groups linked by chains of short separations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clustering {
    /// Cluster id of every point.
    pub cluster_of: Vec<usize>,
    /// Member count of every cluster.
    pub sizes: Vec<usize>,
}

impl Clustering {
    pub fn n_clusters(&self) -> usize {
        self.sizes.len()
    }

    /// Drops clusters rejected by `keep(size)` and renumbers the rest densely,
    /// preserving their relative order.
    ///
    /// Returns the new id of every point (`None` for points in a dropped
    /// cluster) and the number of surviving clusters.
    pub fn retain_sizes<F: Fn(usize) -> bool>(&self, keep: F) -> (Vec<Option<usize>>, usize) {
        let mut renumbered = Vec::with_capacity(self.sizes.len());
        let mut n_kept = 0;
        for &size in &self.sizes {
            if keep(size) {
                renumbered.push(Some(n_kept));
                n_kept += 1;
            } else {
                renumbered.push(None);
            }
        }
        let per_point = self.cluster_of.iter().map(|&c| renumbered[c]).collect();
        (per_point, n_kept)
    }
}

/// Groups the points of a flat position array into clusters: two points share
/// a cluster when a chain of separations below `radius` connects them.
///
/// Cluster ids are handed out in order of each cluster's lowest point index,
/// so identical input always yields identical ids.
pub fn find_clusters(pos: &[f64], cell: &Cell, radius: f64, threads: usize) -> Result<Clustering> {
    check_positive("cluster radius", radius)?;
    check_len("positions", 3 * (pos.len() / 3), pos.len())?;

    let boxes = Boxes::build(pos, cell, radius, threads)?;
    let n = pos.len() / 3;
    let r2 = radius * radius;

    let mut cluster_of = try_filled("cluster ids", n, UNASSIGNED)?;
    let mut sizes = Vec::new();
    let mut stack = Vec::new();

    for seed in 0..n {
        if cluster_of[seed] != UNASSIGNED {
            continue;
        }
        let id = sizes.len();
        cluster_of[seed] = id;
        let mut size = 1;
        stack.push(seed);

        // Depth-first walk with an explicit stack; large clusters can be
        // hundreds of thousands of points deep.
        while let Some(i) = stack.pop() {
            let p = point_at(pos, i);
            for &b in &boxes.neighbourhood_of(p) {
                for &j in boxes.box_atoms(b) {
                    if cluster_of[j] != UNASSIGNED {
                        continue;
                    }
                    if separation2(p, point_at(pos, j), cell) < r2 {
                        cluster_of[j] = id;
                        size += 1;
                        stack.push(j);
                    }
                }
            }
        }
        sizes.push(size);
    }

    log::debug!(
        "Clustering: {} clusters among {} points (radius {:.3})",
        sizes.len(),
        n,
        radius
    );

    Ok(Clustering { cluster_of, sizes })
}

// --- 2. DEFECT CLUSTER RECORDS ---

/// The defects that share one cluster id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DefectCluster {
    pub id: usize,
    pub vacancies: Vec<usize>,
    pub interstitials: Vec<usize>,
    pub antisites: Vec<Antisite>,
    pub splits: Vec<SplitInterstitial>,
}

impl DefectCluster {
    /// Splits one classification result into per-cluster records, ordered by
    /// cluster id. Empty when the result was not clustered.
    pub fn group(result: &DefectResult) -> Vec<DefectCluster> {
        let Some(assign) = &result.clusters else {
            return Vec::new();
        };
        let mut out: Vec<DefectCluster> = (0..assign.n_clusters)
            .map(|id| DefectCluster {
                id,
                ..Default::default()
            })
            .collect();

        for (&v, &c) in result.vacancies.iter().zip(&assign.vacancies) {
            out[c].vacancies.push(v);
        }
        for (&i, &c) in result.interstitials.iter().zip(&assign.interstitials) {
            out[c].interstitials.push(i);
        }
        for (&a, &c) in result.antisites.iter().zip(&assign.antisites) {
            out[c].antisites.push(a);
        }
        for (&s, &c) in result.splits.iter().zip(&assign.splits) {
            out[c].splits.push(s);
        }
        out
    }

    /// Defect count with each split interstitial counted once.
    pub fn n_defects(&self) -> usize {
        self.vacancies.len() + self.interstitials.len() + self.antisites.len() + self.splits.len()
    }

    /// Defect count with each split interstitial counted as its three parts.
    pub fn n_defects_full(&self) -> usize {
        self.vacancies.len() + self.interstitials.len() + self.antisites.len() + 3 * self.splits.len()
    }

    /// Vacancies, antisites and splits are looked up by reference site index,
    /// interstitials by input atom index.
    pub fn contains(&self, kind: DefectKind, index: usize) -> bool {
        match kind {
            DefectKind::Vacancy => self.vacancies.contains(&index),
            DefectKind::Interstitial => self.interstitials.contains(&index),
            DefectKind::Antisite => self.antisites.iter().any(|a| a.site == index),
            DefectKind::SplitInterstitial => self.splits.iter().any(|s| s.vacancy == index),
        }
    }

    /// Member coordinates: vacancy sites, interstitials, antisite sites, then
    /// each split as vacancy site followed by its two interstitials.
    pub fn points(&self, input: &Sites, reference: &Sites) -> Vec<[f64; 3]> {
        let mut pts = Vec::with_capacity(self.n_defects_full());
        pts.extend(self.vacancies.iter().map(|&v| reference.point(v)));
        pts.extend(self.interstitials.iter().map(|&i| input.point(i)));
        pts.extend(self.antisites.iter().map(|a| reference.point(a.site)));
        for s in &self.splits {
            pts.push(reference.point(s.vacancy));
            pts.push(input.point(s.first));
            pts.push(input.point(s.second));
        }
        pts
    }

    /// Member coordinates made contiguous across periodic boundaries.
    ///
    /// Every point is moved to its minimum image relative to the first member,
    /// which is exact as long as the cluster spans less than half the cell.
    /// Also reports which axes had a boundary crossing.
    pub fn unwrapped_positions(
        &self,
        input: &Sites,
        reference: &Sites,
        cell: &Cell,
    ) -> (Vec<f64>, [bool; 3]) {
        let pts = self.points(input, reference);
        let mut crossed = [false; 3];
        let mut flat = Vec::with_capacity(3 * pts.len());
        let Some(&origin) = pts.first() else {
            return (flat, crossed);
        };

        for &p in &pts {
            let (_, hit) = separation2_pbc_check(origin, p, cell);
            for axis in 0..3 {
                crossed[axis] |= hit[axis];
            }
            let v = Vector3::from(origin) + separation_vector(origin, p, cell);
            flat.extend_from_slice(v.as_slice());
        }
        (flat, crossed)
    }

    /// Mean of the unwrapped member positions.
    pub fn centroid(&self, input: &Sites, reference: &Sites, cell: &Cell) -> Option<Vector3<f64>> {
        let (flat, _) = self.unwrapped_positions(input, reference, cell);
        let n = flat.len() / 3;
        if n == 0 {
            return None;
        }
        let sum = flat
            .chunks_exact(3)
            .fold(Vector3::zeros(), |acc, p| acc + Vector3::new(p[0], p[1], p[2]));
        Some(sum / n as f64)
    }
}
