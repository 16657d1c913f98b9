//! Keyed artifact storage for computed tables.
//!
//! The cache is presence-based: if something is stored under a key, it is
//! returned as is. There is no invalidation, versioning, or TTL; callers
//! pick keys that change when their inputs do (dataset identity plus
//! category subset, for example).

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Artifact name of a fingerprint table.
pub const FINGERPRINT_ARTIFACT: &str = "fingerprints";

/// Artifact name of a specialization table.
pub const SPECIALIZATION_ARTIFACT: &str = "specialization";

/// Storage key of `artifact` under a caller-chosen `key`.
pub fn artifact_key(key: &str, artifact: &str) -> String {
    format!("{key}_{artifact}")
}

/// Keyed get/put of serializable artifacts.
pub trait ArtifactStore {
    /// Stored value under `key`, or `None` if nothing is stored.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()>;

    /// Whether anything is stored under `key`.
    fn contains(&self, key: &str) -> bool;
}

/// In-process store; values are kept JSON-encoded.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ArtifactStore for MemoryStore {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.entries
            .get(key)
            .map(|json| serde_json::from_str(json).map_err(Error::from))
            .transpose()
    }

    fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.entries.insert(key.to_string(), serde_json::to_string(value)?);
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

/// On-disk encoding used by [`DirStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Json,
    /// Requires the `binary` feature.
    Bincode,
}

impl Encoding {
    pub fn extension(self) -> &'static str {
        match self {
            Encoding::Json => "json",
            Encoding::Bincode => "bin",
        }
    }
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
    encoding: Encoding,
}

impl DirStore {
    /// Store under `dir` (created on first write).
    ///
    /// Fails when [`Encoding::Bincode`] is requested without the `binary` feature.
    pub fn new(dir: impl Into<PathBuf>, encoding: Encoding) -> Result<Self> {
        if encoding == Encoding::Bincode && !cfg!(feature = "binary") {
            return Err(Error::InvalidConfig(
                "bincode encoding requires the `binary` feature".into(),
            ));
        }
        Ok(Self {
            dir: dir.into(),
            encoding,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{}", self.encoding.extension()))
    }

    fn read<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let reader = BufReader::new(File::open(path)?);
        match self.encoding {
            Encoding::Json => Ok(serde_json::from_reader(reader)?),
            #[cfg(feature = "binary")]
            Encoding::Bincode => {
                bincode::deserialize_from(reader).map_err(|e| Error::Binary(e.to_string()))
            }
            #[cfg(not(feature = "binary"))]
            Encoding::Bincode => Err(Error::InvalidConfig(
                "bincode encoding requires the `binary` feature".into(),
            )),
        }
    }

    fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        match self.encoding {
            Encoding::Json => serde_json::to_writer(&mut writer, value)?,
            #[cfg(feature = "binary")]
            Encoding::Bincode => bincode::serialize_into(&mut writer, value)
                .map_err(|e| Error::Binary(e.to_string()))?,
            #[cfg(not(feature = "binary"))]
            Encoding::Bincode => {
                return Err(Error::InvalidConfig(
                    "bincode encoding requires the `binary` feature".into(),
                ))
            }
        }
        writer.flush()?;
        Ok(())
    }
}

impl ArtifactStore for DirStore {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path(key);
        if !path.is_file() {
            return Ok(None);
        }
        tracing::debug!(path = %path.display(), "reading cached artifact");
        self.read(&path).map(Some)
    }

    fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        self.write(&path, value)?;
        tracing::debug!(path = %path.display(), "stored artifact");
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.path(key).is_file()
    }
}
