// src/lib.rs
pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod physics;
pub mod spatial;
pub mod utils;

pub use error::{AnalysisError, Result};
