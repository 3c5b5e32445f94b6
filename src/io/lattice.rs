// src/io/lattice.rs
//
// Plain lattice format:
//   N
//   xdim ydim zdim
//   sym x y z charge      (N lines)

use crate::error::{AnalysisError, Result};
use crate::model::{Cell, Lattice};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

fn malformed(line: usize, reason: impl Into<String>) -> AnalysisError {
    AnalysisError::MalformedData {
        line,
        reason: reason.into(),
    }
}

fn parse_f64(tok: &str, what: &str, line: usize) -> Result<f64> {
    tok.parse()
        .map_err(|_| malformed(line, format!("invalid {} '{}'", what, tok)))
}

pub fn parse(path: &str, pbc: [bool; 3]) -> Result<Lattice> {
    let file = File::open(path)?;
    read(BufReader::new(file), pbc)
}

/// Reads a lattice; species are numbered in order of first appearance.
pub fn read<R: BufRead>(reader: R, pbc: [bool; 3]) -> Result<Lattice> {
    let mut lines = reader.lines().enumerate().map(|(i, l)| (i + 1, l));

    // 1. Number of atoms
    let (ln, first) = lines.next().ok_or_else(|| malformed(1, "empty file"))?;
    let first = first?;
    let n_atoms: usize = first
        .trim()
        .parse()
        .map_err(|_| malformed(ln, format!("invalid atom count '{}'", first.trim())))?;

    // 2. Cell extents
    let (ln, dims_line) = lines
        .next()
        .ok_or_else(|| malformed(2, "missing cell dimensions"))?;
    let dims_line = dims_line?;
    let toks: Vec<&str> = dims_line.split_whitespace().collect();
    if toks.len() != 3 {
        return Err(malformed(
            ln,
            format!("expected 3 cell dimensions, found {}", toks.len()),
        ));
    }
    let mut dims = [0.0; 3];
    for (axis, tok) in toks.iter().enumerate() {
        dims[axis] = parse_f64(tok, "cell dimension", ln)?;
    }
    let cell = Cell::new(dims, pbc).map_err(|e| malformed(ln, e.to_string()))?;

    // 3. Atoms
    let mut lattice = Lattice::new(cell);
    let mut last = 2;
    for (ln, line) in lines {
        let line = line?;
        last = ln;
        if lattice.len() == n_atoms {
            if line.trim().is_empty() {
                continue;
            }
            return Err(malformed(ln, format!("more than the declared {} atoms", n_atoms)));
        }
        let toks: Vec<&str> = line.split_whitespace().collect();
        if toks.len() != 5 {
            return Err(malformed(
                ln,
                format!("expected 'sym x y z charge', found {} fields", toks.len()),
            ));
        }
        let x = parse_f64(toks[1], "x", ln)?;
        let y = parse_f64(toks[2], "y", ln)?;
        let z = parse_f64(toks[3], "z", ln)?;
        let q = parse_f64(toks[4], "charge", ln)?;
        lattice.add_atom(toks[0], [x, y, z], q);
    }

    if lattice.len() != n_atoms {
        return Err(malformed(
            last + 1,
            format!("expected {} atoms, found {}", n_atoms, lattice.len()),
        ));
    }

    log::debug!(
        "Read lattice: {} atoms, {} species",
        lattice.len(),
        lattice.species.len()
    );
    Ok(lattice)
}

pub fn write(path: &str, lattice: &Lattice, subset: Option<&[usize]>) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    write_to(&mut w, lattice, subset)?;
    w.flush()?;
    Ok(())
}

/// Writes all atoms, or only those listed in `subset`.
pub fn write_to<W: Write>(w: &mut W, lattice: &Lattice, subset: Option<&[usize]>) -> Result<()> {
    let all: Vec<usize>;
    let indices = match subset {
        Some(s) => s,
        None => {
            all = (0..lattice.len()).collect();
            &all
        }
    };

    writeln!(w, "{}", indices.len())?;
    let d = lattice.cell.dims;
    writeln!(w, "{:.6} {:.6} {:.6}", d[0], d[1], d[2])?;
    for &i in indices {
        let sym = lattice.atom_symbol(i).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("no atom {}", i))
        })?;
        let p = lattice.atom_pos(i);
        writeln!(
            w,
            "{} {:.6} {:.6} {:.6} {:.6}",
            sym, p[0], p[1], p[2], lattice.charge[i]
        )?;
    }
    Ok(())
}
