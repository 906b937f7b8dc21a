//! Read-through cache for parsed configuration documents.
//!
//! Each document is parsed once per path and shared as an immutable `Arc`.
//! Missing files and parse failures degrade to defaults; they never fail a run.

use crate::config::PreflightConfig;
use crate::health::{BandTable, Calibration, CalibrationModel};
use crate::rules::ContractRules;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

/// Where configuration documents are read from.
pub trait ConfigSource: Send + Sync {
    /// `Ok(None)` when nothing exists at `path`.
    fn read(&self, path: &Path) -> Result<Option<String>, io::Error>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsConfigSource;

impl ConfigSource for FsConfigSource {
    fn read(&self, path: &Path) -> Result<Option<String>, io::Error> {
        match fs::read_to_string(path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Fixed documents keyed by path, for tests and embedded callers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigSource {
    files: HashMap<PathBuf, String>,
}

impl InMemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl ConfigSource for InMemoryConfigSource {
    fn read(&self, path: &Path) -> Result<Option<String>, io::Error> {
        Ok(self.files.get(path).cloned())
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

type Slot<T> = RwLock<HashMap<PathBuf, Arc<T>>>;

/// Parsed rules, calibrator and band documents keyed by path.
pub struct ConfigCache {
    source: Box<dyn ConfigSource>,
    rules: Slot<ContractRules>,
    bundled_rules: OnceLock<Arc<ContractRules>>,
    models: Slot<CalibrationModel>,
    bands: Slot<BandTable>,
}

impl fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigCache").finish_non_exhaustive()
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new(FsConfigSource)
    }
}

impl ConfigCache {
    pub fn new(source: impl ConfigSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            rules: RwLock::new(HashMap::new()),
            bundled_rules: OnceLock::new(),
            models: RwLock::new(HashMap::new()),
            bands: RwLock::new(HashMap::new()),
        }
    }

    /// Process-wide cache over the filesystem.
    pub fn global() -> &'static ConfigCache {
        static GLOBAL: OnceLock<ConfigCache> = OnceLock::new();
        GLOBAL.get_or_init(ConfigCache::default)
    }

    /// The rules document at `path`, or the bundled one when `path` is `None`.
    pub fn contract_rules(&self, path: Option<&Path>) -> Arc<ContractRules> {
        match path {
            Some(path) => self.load(&self.rules, path, "contract rules", ContractRules::from_json),
            None => Arc::clone(self.bundled_rules.get_or_init(|| {
                Arc::new(ContractRules::bundled().unwrap_or_else(|err| {
                    warn!(error = %err, "bundled contract rules unreadable; classification disabled");
                    ContractRules::default()
                }))
            })),
        }
    }

    pub fn calibration_model(&self, path: &Path) -> Arc<CalibrationModel> {
        self.load(&self.models, path, "calibration model", CalibrationModel::from_json)
    }

    pub fn band_table(&self, path: &Path) -> Arc<BandTable> {
        self.load(&self.bands, path, "band table", BandTable::from_json)
    }

    pub fn calibration(&self, config: &PreflightConfig) -> Calibration {
        let model = self.calibration_model(&config.calibrator_path);
        let bands = self.band_table(&config.bands_path);
        Calibration::new((*model).clone(), (*bands).clone())
            .with_fallback_version(config.calibration_version.clone())
    }

    /// Drops every cached document; the next read goes back to the source.
    pub fn reset(&self) {
        clear(&self.rules);
        clear(&self.models);
        clear(&self.bands);
    }

    fn load<T, F>(&self, slot: &Slot<T>, path: &Path, kind: &'static str, parse: F) -> Arc<T>
    where
        T: Default,
        F: Fn(&str) -> Result<T, serde_json::Error>,
    {
        if let Some(hit) = slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Arc::clone(hit);
        }

        let value = match self.read_document(path, parse) {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(path = %path.display(), kind, "config document absent; using default");
                T::default()
            }
            Err(err) => {
                warn!(error = %err, kind, "config document unusable; using default");
                T::default()
            }
        };

        let value = Arc::new(value);
        slot.write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), Arc::clone(&value));
        value
    }

    fn read_document<T, F>(&self, path: &Path, parse: F) -> Result<Option<T>, ConfigLoadError>
    where
        F: Fn(&str) -> Result<T, serde_json::Error>,
    {
        let Some(raw) = self.source.read(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?
        else {
            return Ok(None);
        };
        parse(&raw).map(Some).map_err(|source| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn clear<T>(slot: &Slot<T>) {
    slot.write().unwrap_or_else(PoisonError::into_inner).clear();
}
