// SPDX-License-Identifier: AGPL-3.0-only

//! On-disk cache of evolved ensembles.
//!
//! Parameter scans re-evolve the same ensembles many times; evolving an
//! ensemble dominates the wall time, so evolved profiles are persisted as
//! JSON keyed by cosmology, model parameters, and the history source.
//! A corrupt or stale-format cache file is treated as a miss, never an
//! error; writes go through a sibling temp file and rename so a crashed
//! run cannot leave a truncated record behind.

use crate::cosmology::Cosmology;
use crate::error::NthPressError;
use crate::integrator::{EvolutionParams, FnthProfile};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Bumped whenever FnthProfile's serialized layout changes.
const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CacheRecord {
    version: u32,
    key: String,
    profiles: Vec<FnthProfile>,
}

/// Directory-backed profile cache.
#[derive(Debug, Clone)]
pub struct EvolvedCache {
    dir: PathBuf,
}

impl EvolvedCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, NthPressError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| NthPressError::Cache(e.to_string()))?;
        Ok(Self { dir })
    }

    /// Stable cache key for one evolved ensemble. `source_tag` identifies
    /// the history provider and its seed.
    pub fn key(cosmo: &Cosmology, params: &EvolutionParams, source_tag: &str) -> String {
        let raw = format!(
            "{}_b{}_e{}_zi{}_s{}_{}",
            cosmo.name, params.beta, params.eta, params.z_init, params.stride, source_tag
        );
        // keys become file names
        raw.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '.' { c } else { '-' })
            .collect()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Look up an ensemble. Missing, unreadable, corrupt, or wrong-version
    /// records all miss.
    pub fn load(&self, key: &str) -> Option<Vec<FnthProfile>> {
        let bytes = fs::read(self.path_for(key)).ok()?;
        let record: CacheRecord = serde_json::from_slice(&bytes).ok()?;
        if record.version != CACHE_FORMAT_VERSION || record.key != key {
            return None;
        }
        Some(record.profiles)
    }

    /// Persist an ensemble under `key`.
    pub fn store(&self, key: &str, profiles: &[FnthProfile]) -> Result<(), NthPressError> {
        let record = CacheRecord {
            version: CACHE_FORMAT_VERSION,
            key: key.to_string(),
            profiles: profiles.to_vec(),
        };
        let bytes =
            serde_json::to_vec(&record).map_err(|e| NthPressError::Cache(e.to_string()))?;
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, bytes).map_err(|e| NthPressError::Cache(e.to_string()))?;
        fs::rename(&tmp, self.path_for(key)).map_err(|e| NthPressError::Cache(e.to_string()))
    }
}
