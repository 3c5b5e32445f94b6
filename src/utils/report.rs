// src/utils/report.rs

use crate::model::{Lattice, SpeciesTable};
use crate::physics::analysis::clusters::DefectCluster;
use crate::physics::analysis::defects::DefectResult;
use crate::physics::analysis::rdf::Rdf;

/// Formula in first-seen species order, e.g. "Pu95 Ga5".
pub fn formula(species: &SpeciesTable) -> String {
    species
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(sym, n)| format!("{}{}", sym, n))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Header plus the first few atoms of a lattice.
pub fn lattice_summary(lattice: &Lattice, filename: &str) -> String {
    let d = lattice.cell.dims;
    let pbc = lattice.cell.pbc;

    let mut out = String::new();
    out.push_str(&format!("File: {}\n", filename));
    out.push_str(&format!("Formula: {}\n", formula(&lattice.species)));
    out.push_str(&format!(
        "Cell: {:.4} x {:.4} x {:.4} Å (PBC {} {} {})\n",
        d[0], d[1], d[2], pbc[0] as u8, pbc[1] as u8, pbc[2] as u8
    ));
    out.push_str("--------------------------------------------------\n");
    out.push_str(&format!(
        "{:<8} {:<8} {:<10} {:<10} {:<10}\n",
        "Index", "Element", "X", "Y", "Z"
    ));
    out.push_str("--------------------------------------------------\n");

    for i in 0..lattice.len().min(20) {
        let p = lattice.atom_pos(i);
        out.push_str(&format!(
            "{:<8} {:<8} {:<10.4} {:<10.4} {:<10.4}\n",
            i,
            lattice.atom_symbol(i).unwrap_or("?"),
            p[0],
            p[1],
            p[2]
        ));
    }

    if lattice.len() > 20 {
        out.push_str(&format!("... and {} more atoms.\n", lattice.len() - 20));
    }

    out
}

fn species_line(label: &str, table: &SpeciesTable, counts: &[usize]) -> String {
    let parts: Vec<String> = counts
        .iter()
        .enumerate()
        .filter(|(_, &n)| n > 0)
        .map(|(s, n)| format!("{} {}", table.symbol(s).unwrap_or("?"), n))
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!("  {:<14} {}\n", label, parts.join(", "))
    }
}

/// Counts, per-species breakdown and cluster sizes of a classification.
pub fn defect_summary(result: &DefectResult, input: &SpeciesTable, reference: &SpeciesTable) -> String {
    let c = result.counts();
    let sc = &result.species_counts;

    let mut out = String::new();
    out.push_str(&format!("Defects: {}\n", c.defects));
    out.push_str(&format!("  Vacancies:     {}\n", c.vacancies));
    out.push_str(&species_line("", reference, &sc.vacancies));
    out.push_str(&format!("  Interstitials: {}\n", c.interstitials));
    out.push_str(&species_line("", input, &sc.interstitials));
    out.push_str(&format!("  Antisites:     {}\n", c.antisites));
    for (s_ref, row) in sc.on_antisites.iter().enumerate() {
        let sym = reference.symbol(s_ref).unwrap_or("?");
        out.push_str(&species_line(&format!("{} site:", sym), input, row));
    }
    out.push_str(&format!("  Split ints:    {}\n", c.splits));

    let clusters = DefectCluster::group(result);
    if result.clusters.is_some() {
        out.push_str(&format!("Clusters: {}\n", c.clusters));
        for cl in &clusters {
            out.push_str(&format!(
                "  #{:<4} {} defects ({} vac, {} int, {} ant, {} split)\n",
                cl.id,
                cl.n_defects(),
                cl.vacancies.len(),
                cl.interstitials.len(),
                cl.antisites.len(),
                cl.splits.len()
            ));
        }
    }
    out
}

/// Two-column r / g(r) table.
pub fn rdf_table(rdf: &Rdf) -> String {
    let mut out = String::from("# r (Å)      g(r)\n");
    for (r, g) in rdf.radii.iter().zip(&rdf.g) {
        out.push_str(&format!("{:<12.5} {:.6}\n", r, g));
    }
    out
}
