// src/model/elements.rs

/// Radius used for symbols missing from the table (Å).
pub const DEFAULT_COVALENT_RADIUS: f64 = 1.0;

/// (symbol, covalent radius in Å)
const ELEMENTS: &[(&str, f64)] = &[
    // --- Period 1 ---
    ("H", 0.37),
    ("He", 0.32),
    // --- Period 2 ---
    ("Li", 1.34),
    ("Be", 0.90),
    ("B", 0.82),
    ("C", 0.77),
    ("N", 0.75),
    ("O", 0.73),
    ("F", 0.71),
    ("Ne", 0.69),
    // --- Period 3 ---
    ("Na", 1.54),
    ("Mg", 1.30),
    ("Al", 1.18),
    ("Si", 1.11),
    ("P", 1.06),
    ("S", 1.02),
    ("Cl", 0.99),
    ("Ar", 0.97),
    // --- Period 4 ---
    ("K", 1.96),
    ("Ca", 1.74),
    ("Ti", 1.36),
    ("V", 1.25),
    ("Cr", 1.27),
    ("Mn", 1.39),
    ("Fe", 1.25),
    ("Co", 1.26),
    ("Ni", 1.21),
    ("Cu", 1.38),
    ("Zn", 1.31),
    ("Ga", 1.26),
    ("Ge", 1.22),
    ("As", 1.19),
    ("Se", 1.16),
    ("Br", 1.14),
    ("Kr", 1.10),
    // --- Period 5 ---
    ("Zr", 1.48),
    ("Mo", 1.45),
    ("Ag", 1.53),
    // --- Period 6 ---
    ("W", 1.46),
    ("Pt", 1.28),
    ("Au", 1.44),
    // --- Actinides ---
    ("U", 1.42),
    ("Pu", 1.87),
];

fn lookup(symbol: &str) -> Option<&'static (&'static str, f64)> {
    ELEMENTS.iter().find(|(s, _)| *s == symbol)
}

/// Covalent radius in Å; unknown symbols get [`DEFAULT_COVALENT_RADIUS`].
pub fn covalent_radius(symbol: &str) -> f64 {
    lookup(symbol).map_or(DEFAULT_COVALENT_RADIUS, |e| e.1)
}
