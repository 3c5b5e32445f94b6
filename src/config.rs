// src/config.rs

use crate::error::{AnalysisError, Result};
use crate::physics::analysis::defects::{ClusterOptions, DefectOptions};
use crate::physics::analysis::picker::PickOptions;
use crate::physics::analysis::rdf::{RdfNormalisation, RdfOptions};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

// --- Defects ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefectSettings {
  pub capture_radius: f64,
  pub include_vacancies: bool,
  pub include_interstitials: bool,
  pub include_antisites: bool,
  pub include_splits: bool,
  pub exclude_interstitial_species: Vec<String>,
  pub exclude_vacancy_species: Vec<String>,
  pub identify_splits: bool,

  pub find_clusters: bool,
  pub cluster_radius: f64,
  pub min_cluster_size: usize,
  pub max_cluster_size: usize,
}

impl Default for DefectSettings {
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
      find_clusters: false,
      cluster_radius: 3.5,
      min_cluster_size: 1,
      max_cluster_size: 0, // < min: no upper bound
    }
  }
}

// --- RDF ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RdfSettings {
  pub start: f64,
  pub finish: f64,
  pub bins: usize,
  pub centre_species: Option<String>,
  pub neighbour_species: Option<String>,
  pub unique_pairs: bool,
  pub normalisation: RdfNormalisation,
}

impl Default for RdfSettings {
  fn default() -> Self {
    Self {
      start: 0.0,
      finish: 10.0,
      bins: 100,
      centre_species: None,
      neighbour_species: None,
      unique_pairs: false,
      normalisation: RdfNormalisation::ShellAverage,
    }
  }
}

// --- Picking ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickSettings {
  pub box_width: f64,
  pub vacancy_radius_scale: f64,
}

impl Default for PickSettings {
  fn default() -> Self {
    Self {
      box_width: 4.0,
      vacancy_radius_scale: 1.2,
    }
  }
}

// --- Main Config Struct ---

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub defects: DefectSettings,

  #[serde(default)]
  pub rdf: RdfSettings,

  #[serde(default)]
  pub pick: PickSettings,

  /// Worker threads for parallel passes (0 = one per core).
  #[serde(default)]
  pub threads: usize,
}

impl Config {
  /// Loads `path`, or the per-user settings file (e.g. ~/.config/dview/settings.json)
  /// when no path is given. A missing file yields the defaults.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path(),
    };

    let file = match File::open(&path) {
      Ok(f) => f,
      Err(e) if e.kind() == ErrorKind::NotFound => {
        log::info!("No config at {:?}. Using defaults.", path);
        return Ok(Self::default());
      }
      Err(e) => return Err(e.into()),
    };

    let cfg = Self::from_reader(BufReader::new(file))?;
    log::info!("Config loaded from {:?}", path);
    Ok(cfg)
  }

  pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
    serde_json::from_reader(reader).map_err(|e| AnalysisError::MalformedData {
      line: e.line(),
      reason: e.to_string(),
    })
  }

  /// Writes pretty JSON to `path`, or to the per-user settings file.
  pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path(),
    };
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, self).map_err(std::io::Error::from)?;
    writer.flush()?;
    log::info!("Config saved to {:?}", path);
    Ok(path)
  }

  pub fn default_path() -> PathBuf {
    if let Some(proj) = ProjectDirs::from("com", "example", "dview") {
      proj.config_dir().join("settings.json")
    } else {
      PathBuf::from("settings.json")
    }
  }

  pub fn defect_options(&self) -> DefectOptions {
    let d = &self.defects;
    DefectOptions {
      capture_radius: d.capture_radius,
      include_vacancies: d.include_vacancies,
      include_interstitials: d.include_interstitials,
      include_antisites: d.include_antisites,
      include_splits: d.include_splits,
      exclude_interstitial_species: d.exclude_interstitial_species.clone(),
      exclude_vacancy_species: d.exclude_vacancy_species.clone(),
      identify_splits: d.identify_splits,
      cluster: d.find_clusters.then(|| ClusterOptions {
        radius: d.cluster_radius,
        min_size: d.min_cluster_size,
        max_size: d.max_cluster_size,
      }),
      threads: self.threads,
    }
  }

  pub fn rdf_options(&self) -> RdfOptions {
    let r = &self.rdf;
    RdfOptions {
      start: r.start,
      finish: r.finish,
      bins: r.bins,
      centre_atoms: None,
      centre_species: r.centre_species.clone(),
      neighbour_species: r.neighbour_species.clone(),
      unique_pairs: r.unique_pairs,
      normalisation: r.normalisation,
      threads: self.threads,
    }
  }

  pub fn pick_options(&self) -> PickOptions {
    PickOptions {
      box_width: self.pick.box_width,
      vacancy_radius_scale: self.pick.vacancy_radius_scale,
      threads: self.threads,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_file_keeps_defaults() {
    let json = r#"{ "defects": { "capture_radius": 0.8, "find_clusters": true }, "threads": 2 }"#;
    let cfg = Config::from_reader(json.as_bytes()).unwrap();
    assert_eq!(cfg.defects.capture_radius, 0.8);
    assert!(cfg.defects.include_vacancies);
    assert_eq!(cfg.rdf, RdfSettings::default());

    let opts = cfg.defect_options();
    assert_eq!(opts.threads, 2);
    let cluster = opts.cluster.unwrap();
    assert_eq!(cluster.radius, 3.5);
    // default bounds disable the size filter
    assert!(cluster.accepts(1_000_000));
  }

  #[test]
  fn test_bad_json_is_malformed() {
    let err = Config::from_reader("{\n \"threads\": \"many\"\n}".as_bytes()).unwrap_err();
    match err {
      AnalysisError::MalformedData { line, .. } => assert_eq!(line, 2),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    assert_eq!(Config::load(Some(&path)).unwrap(), Config::default());
  }

  #[test]
  fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dview").join("settings.json");
    let mut cfg = Config::default();
    cfg.rdf.normalisation = RdfNormalisation::Density;
    cfg.defects.exclude_vacancy_species = vec!["Ga".to_string()];
    assert_eq!(cfg.save(Some(&path)).unwrap(), path);

    let back = Config::load(Some(&path)).unwrap();
    assert_eq!(back, cfg);
    assert_eq!(back.rdf_options().normalisation, RdfNormalisation::Density);
  }
}
