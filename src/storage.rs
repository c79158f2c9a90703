//! Participant data store.
//!
//! Everything a session produces lives under `<data_root>/<participant_id>/`:
//!
//! ```text
//! demographics.json
//! calibration_<type>.json      level -> raw beta
//! polynomial_<type>.json       fitted gain polynomial
//! staircase_<block>.json       staircase history and estimates
//! <block>/<trial_id>.json      one file per trial
//! ```
//!
//! Files are pretty-printed JSON and written once; nothing is appended.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationTarget, Polynomial};
use crate::error::{ConfigError, StorageError};
use crate::staircase::StaircaseReport;
use crate::trial::TrialRecord;

/// Participant demographics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "id")]
    pub sbj_id: String,
    pub age: String,
    pub gender: String,
    pub handedness: String,
}

impl Participant {
    /// Build a participant, rejecting non-numeric ages
    pub fn new(
        sbj_id: impl Into<String>,
        age: impl Into<String>,
        gender: impl Into<String>,
        handedness: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let participant = Self {
            sbj_id: sbj_id.into(),
            age: age.into(),
            gender: gender.into(),
            handedness: handedness.into(),
        };
        participant.validate()?;
        Ok(participant)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sbj_id.trim().is_empty() {
            return Err(ConfigError::invalid_parameter("participant id", "''"));
        }
        if self.age.trim().parse::<u32>().is_err() {
            return Err(ConfigError::invalid_parameter("age", &self.age));
        }
        Ok(())
    }
}

/// Filesystem store rooted at one participant directory
#[derive(Debug, Clone)]
pub struct ParticipantStore {
    root: PathBuf,
}

impl ParticipantStore {
    /// Create (if needed) `<data_root>/<participant_id>/`
    pub fn create(data_root: impl AsRef<Path>, participant_id: &str) -> Result<Self, StorageError> {
        let root = data_root.as_ref().join(participant_id);
        fs::create_dir_all(&root).map_err(|err| StorageError::io(&root, err))?;
        log::info!("[ParticipantStore] Using participant directory {:?}", root);
        Ok(Self { root })
    }

    /// Open an existing participant directory without creating it
    pub fn open(data_root: impl AsRef<Path>, participant_id: &str) -> Result<Self, StorageError> {
        let root = data_root.as_ref().join(participant_id);
        if !root.is_dir() {
            return Err(StorageError::NotFound {
                path: root.display().to_string(),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn demographics_path(&self) -> PathBuf {
        self.root.join("demographics.json")
    }

    pub fn calibration_path(&self, target: CalibrationTarget) -> PathBuf {
        self.root
            .join(format!("calibration_{}.json", target.file_stem()))
    }

    pub fn polynomial_path(&self, target: CalibrationTarget) -> PathBuf {
        self.root
            .join(format!("polynomial_{}.json", target.file_stem()))
    }

    pub fn staircase_path(&self, block: &str) -> PathBuf {
        self.root.join(format!("staircase_{}.json", block))
    }

    pub fn trial_path(&self, block: &str, trial_id: &str) -> PathBuf {
        self.root.join(block).join(format!("{}.json", trial_id))
    }

    pub fn save_demographics(&self, participant: &Participant) -> Result<PathBuf, StorageError> {
        let path = self.demographics_path();
        write_json(&path, participant)?;
        Ok(path)
    }

    pub fn load_demographics(&self) -> Result<Participant, StorageError> {
        read_json(&self.demographics_path())
    }

    pub fn save_trial(&self, block: &str, record: &TrialRecord) -> Result<PathBuf, StorageError> {
        let path = self.trial_path(block, &record.trial_id);
        write_json(&path, record)?;
        Ok(path)
    }

    pub fn load_trial(&self, block: &str, trial_id: &str) -> Result<TrialRecord, StorageError> {
        read_json(&self.trial_path(block, trial_id))
    }

    pub fn save_calibration(
        &self,
        target: CalibrationTarget,
        raw_betas: &BTreeMap<usize, f64>,
        polynomial: &Polynomial,
    ) -> Result<(), StorageError> {
        write_json(&self.calibration_path(target), raw_betas)?;
        write_json(&self.polynomial_path(target), polynomial)?;
        log::info!(
            "[ParticipantStore] Saved {} calibration ({} levels)",
            target,
            raw_betas.len()
        );
        Ok(())
    }

    pub fn load_calibration_table(
        &self,
        target: CalibrationTarget,
    ) -> Result<BTreeMap<usize, f64>, StorageError> {
        read_json(&self.calibration_path(target))
    }

    pub fn load_polynomial(&self, target: CalibrationTarget) -> Result<Polynomial, StorageError> {
        read_json(&self.polynomial_path(target))
    }

    pub fn save_staircase(
        &self,
        block: &str,
        report: &StaircaseReport,
    ) -> Result<PathBuf, StorageError> {
        let path = self.staircase_path(block);
        write_json(&path, report)?;
        Ok(path)
    }

    pub fn load_staircase(&self, block: &str) -> Result<StaircaseReport, StorageError> {
        read_json(&self.staircase_path(block))
    }
}

/// Pretty-print `value` into `path`, creating parent directories
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| StorageError::io(parent, err))?;
    }
    let json =
        serde_json::to_string_pretty(value).map_err(|err| StorageError::serialization(path, err))?;
    fs::write(path, json).map_err(|err| StorageError::io(path, err))?;
    log::debug!("[ParticipantStore] Wrote {:?}", path);
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let contents = fs::read_to_string(path).map_err(|err| StorageError::io(path, err))?;
    serde_json::from_str(&contents).map_err(|err| StorageError::serialization(path, err))
}
