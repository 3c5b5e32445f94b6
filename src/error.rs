// src/error.rs

use std::fmt;
use std::io;

/// Everything that can stop an analysis session.
///
/// Any error means the session produced no usable output: the analysis
/// routines validate their inputs before touching any buffers and never
/// hand back partially filled results.
#[derive(Debug)]
pub enum AnalysisError {
    /// A grid or scratch buffer could not be reserved.
    Allocation { what: &'static str },
    /// An input array does not have the documented length.
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// A cell extent is zero, negative or not finite.
    DegenerateCell { axis: usize, extent: f64 },
    /// A scalar parameter is out of its legal range.
    InvalidParameter { name: &'static str, value: f64 },
    /// Picking was asked to choose from an empty candidate set.
    EmptyCandidates,
    /// A structured input (lattice or settings file) could not be parsed.
    MalformedData { line: usize, reason: String },
    Io(io::Error),
    ThreadPool(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnalysisError::Allocation { what } => write!(f, "Could not allocate {}", what),
            AnalysisError::ShapeMismatch {
                what,
                expected,
                found,
            } => write!(
                f,
                "Array '{}' has length {}, expected {}",
                what, found, expected
            ),
            AnalysisError::DegenerateCell { axis, extent } => write!(
                f,
                "Cell extent along axis {} must be positive, got {}",
                axis, extent
            ),
            AnalysisError::InvalidParameter { name, value } => {
                write!(f, "Invalid value for '{}': {}", name, value)
            }
            AnalysisError::EmptyCandidates => write!(f, "Nothing to pick from"),
            AnalysisError::MalformedData { line, reason } => {
                write!(f, "Malformed input at line {}: {}", line, reason)
            }
            AnalysisError::Io(e) => write!(f, "I/O error: {}", e),
            AnalysisError::ThreadPool(msg) => write!(f, "Could not start worker threads: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for AnalysisError {
    fn from(e: io::Error) -> Self {
        AnalysisError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Checks that `found` matches the documented length of an input array.
pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(AnalysisError::ShapeMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

/// Checks that a length/radius style parameter is strictly positive and finite.
pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(AnalysisError::InvalidParameter { name, value });
    }
    Ok(())
}

/// Builds a vector of `len` copies of `value`, reporting allocation failure
/// instead of aborting.
pub(crate) fn try_filled<T: Clone>(what: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| AnalysisError::Allocation { what })?;
    v.resize(len, value);
    Ok(v)
}

/// Empty vector with room for `cap` items.
pub(crate) fn try_with_capacity<T>(what: &'static str, cap: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(cap)
        .map_err(|_| AnalysisError::Allocation { what })?;
    Ok(v)
}

/// Thread count that keeps work on whatever pool is already running it.
pub(crate) const CURRENT_POOL: usize = 0;

/// Runs `op` on a dedicated pool of `threads` workers. With
/// [`CURRENT_POOL`] it runs in place: on rayon's global pool, or on the pool
/// of an enclosing `with_threads` call. Multi-pass operations build their pool
/// once at the top and pass `CURRENT_POOL` down.
pub(crate) fn with_threads<R, F>(threads: usize, op: F) -> Result<R>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    if threads == CURRENT_POOL {
        return Ok(op());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| AnalysisError::ThreadPool(e.to_string()))?;
    Ok(pool.install(op))
}
