// Where a model comes from, and decoding it at most once.

use crate::error::{FarmError, Result};
use crate::FarmModel;
use log::{debug, info};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A database directory keeps its FARM file at otf/farm.dat; any other path is used as is.
pub fn resolve_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if path.is_dir() {
        let resolved = path.join("otf").join("farm.dat");
        debug!("{} is a directory; using {}", path.display(), resolved.display());
        resolved
    } else {
        PathBuf::from(path)
    }
}

/// The bytes of a FARM file: either a file on disk or a buffer already in memory.
#[derive(Clone, Debug)]
pub enum FarmSource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

impl FarmSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> FarmSource {
        FarmSource::File(resolve_path(path))
    }

    /// The file path, if the source is a file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            FarmSource::File(path) => Some(path),
            FarmSource::Bytes(_) => None,
        }
    }

    pub fn load(&self) -> Result<Cow<[u8]>> {
        match self {
            FarmSource::File(path) => {
                let data = fs::read(path).map_err(|source| FarmError::Io {
                    path: path.clone(),
                    source,
                })?;
                info!("Read {} bytes from {}", data.len(), path.display());
                Ok(Cow::Owned(data))
            }
            FarmSource::Bytes(data) => Ok(Cow::Borrowed(data)),
        }
    }
}

/// Decodes one source, once.
///
/// The first successful decode() is kept; later calls return the same model without reading
/// the source again. A failed decode leaves the session empty so it can be retried.
#[derive(Debug)]
pub struct FarmSession {
    source: FarmSource,
    model: Option<Arc<FarmModel>>,
}

impl FarmSession {
    pub fn new(source: FarmSource) -> FarmSession {
        FarmSession {
            source,
            model: None,
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> FarmSession {
        FarmSession::new(FarmSource::from_path(path))
    }

    pub fn source(&self) -> &FarmSource {
        &self.source
    }

    pub fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    /// Returns the decoded model, if decode() has succeeded.
    pub fn model(&self) -> Option<Arc<FarmModel>> {
        self.model.clone()
    }

    pub fn decode(&mut self) -> Result<Arc<FarmModel>> {
        if let Some(model) = &self.model {
            debug!("FARM already decoded; reusing it");
            return Ok(Arc::clone(model));
        }
        let data = self.source.load()?;
        let model = Arc::new(FarmModel::from_bytes(&data)?);
        self.model = Some(Arc::clone(&model));
        Ok(model)
    }
}

/// Sessions keyed by the resolved file path, so each FARM file is decoded at most once.
#[derive(Debug, Default)]
pub struct FarmCache {
    sessions: HashMap<PathBuf, FarmSession>,
}

impl FarmCache {
    pub fn get_or_decode<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<FarmModel>> {
        let resolved = resolve_path(path);
        let key = fs::canonicalize(&resolved).unwrap_or(resolved);
        self.sessions
            .entry(key.clone())
            .or_insert_with(|| FarmSession::new(FarmSource::File(key)))
            .decode()
    }

    /// Number of sources seen, decoded or not.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
