//! Model registry boundary.
//!
//! The registry tracks [`ModelArtifact`] rows and answers the one query the
//! gate pipeline needs: "which model is currently serving?" — the most
//! recently created BLESSED artifact. The backing store is an implementation
//! detail behind [`ModelRegistry`]; this crate ships a file-backed index
//! (one JSON document per artifact under a root directory) and an in-memory
//! store for tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use mdk_schemas::{AlreadyDecided, BlessingStatus, ModelArtifact};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RegistryError {
    /// Filesystem failure while reading or writing the index.
    Io { path: PathBuf, source: std::io::Error },
    /// An artifact document could not be (de)serialized.
    Codec { path: PathBuf, message: String },
    /// The requested artifact does not exist.
    NotFound(Uuid),
    /// Decide-once guard tripped against the persisted copy.
    AlreadyDecided(AlreadyDecided),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Io { path, source } => {
                write!(f, "registry io error at {}: {source}", path.display())
            }
            RegistryError::Codec { path, message } => {
                write!(f, "registry codec error at {}: {message}", path.display())
            }
            RegistryError::NotFound(id) => write!(f, "model {id} not found in registry"),
            RegistryError::AlreadyDecided(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::Io { source, .. } => Some(source),
            RegistryError::AlreadyDecided(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AlreadyDecided> for RegistryError {
    fn from(e: AlreadyDecided) -> Self {
        RegistryError::AlreadyDecided(e)
    }
}

// ---------------------------------------------------------------------------
// Registry trait
// ---------------------------------------------------------------------------

/// Narrow model-registry contract consumed by the pipeline.
///
/// Implementations must be object-safe so callers can hold a
/// `Box<dyn ModelRegistry>` without knowing the concrete store.
pub trait ModelRegistry {
    /// Persist a new artifact row (or overwrite the row for the same id).
    fn store(&self, artifact: &ModelArtifact) -> Result<(), RegistryError>;

    /// Fetch one artifact by id.
    fn get(&self, id: Uuid) -> Result<Option<ModelArtifact>, RegistryError>;

    /// Apply a gate decision to the persisted artifact. Decide-once: errors
    /// with [`RegistryError::AlreadyDecided`] and mutates nothing when the
    /// stored copy is no longer UNBLESSED. Returns the updated artifact.
    fn record_decision(&self, id: Uuid, blessed: bool) -> Result<ModelArtifact, RegistryError>;

    /// The currently serving model of the named type: most recent
    /// `created_at` among BLESSED artifacts with that name, ties broken on
    /// the lexicographically greatest id. `None` is the expected cold-start
    /// answer, not an error.
    fn find_latest_blessed(&self, name: &str) -> Result<Option<ModelArtifact>, RegistryError>;
}

/// Pick the winner between two blessed artifacts per the lookup contract.
fn more_recent(a: ModelArtifact, b: ModelArtifact) -> ModelArtifact {
    match a.created_at.cmp(&b.created_at) {
        std::cmp::Ordering::Greater => a,
        std::cmp::Ordering::Less => b,
        std::cmp::Ordering::Equal => {
            if a.id.to_string() >= b.id.to_string() {
                a
            } else {
                b
            }
        }
    }
}

fn latest_blessed_of(
    iter: impl Iterator<Item = ModelArtifact>,
    name: &str,
) -> Option<ModelArtifact> {
    iter.filter(|a| a.blessing == BlessingStatus::Blessed && a.name == name)
        .fold(None, |best, a| match best {
            None => Some(a),
            Some(b) => Some(more_recent(a, b)),
        })
}

// ---------------------------------------------------------------------------
// File-backed registry
// ---------------------------------------------------------------------------

/// One JSON document per artifact under `root/`, named `<id>.json`.
/// Lookups scan the directory; registries hold at most a few thousand rows,
/// so the scan stays cheap and the layout stays debuggable with `cat`.
pub struct FileRegistry {
    root: PathBuf,
}

impl FileRegistry {
    /// Open (and create if needed) a registry rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| RegistryError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    fn write_artifact(&self, artifact: &ModelArtifact) -> Result<(), RegistryError> {
        let path = self.path_for(artifact.id);
        let json = serde_json::to_string_pretty(artifact).map_err(|e| RegistryError::Codec {
            path: path.clone(),
            message: e.to_string(),
        })?;
        fs::write(&path, format!("{json}\n")).map_err(|source| RegistryError::Io { path, source })
    }

    fn read_artifact(&self, path: &Path) -> Result<ModelArtifact, RegistryError> {
        let raw = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|e| RegistryError::Codec {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn scan(&self) -> Result<Vec<ModelArtifact>, RegistryError> {
        let mut artifacts = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(|source| RegistryError::Io {
            path: self.root.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| RegistryError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                artifacts.push(self.read_artifact(&path)?);
            }
        }
        Ok(artifacts)
    }
}

impl ModelRegistry for FileRegistry {
    fn store(&self, artifact: &ModelArtifact) -> Result<(), RegistryError> {
        self.write_artifact(artifact)
    }

    fn get(&self, id: Uuid) -> Result<Option<ModelArtifact>, RegistryError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        self.read_artifact(&path).map(Some)
    }

    fn record_decision(&self, id: Uuid, blessed: bool) -> Result<ModelArtifact, RegistryError> {
        let mut artifact = self.get(id)?.ok_or(RegistryError::NotFound(id))?;
        artifact.decide(blessed)?;
        self.write_artifact(&artifact)?;
        Ok(artifact)
    }

    fn find_latest_blessed(&self, name: &str) -> Result<Option<ModelArtifact>, RegistryError> {
        Ok(latest_blessed_of(self.scan()?.into_iter(), name))
    }
}

// ---------------------------------------------------------------------------
// In-memory registry (tests, dry runs)
// ---------------------------------------------------------------------------

/// Keeps artifacts in a map. Single-threaded by design: one pipeline run
/// owns its registry handle for the duration of the run.
#[derive(Default)]
pub struct MemoryRegistry {
    rows: RefCell<BTreeMap<Uuid, ModelArtifact>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelRegistry for MemoryRegistry {
    fn store(&self, artifact: &ModelArtifact) -> Result<(), RegistryError> {
        self.rows.borrow_mut().insert(artifact.id, artifact.clone());
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<ModelArtifact>, RegistryError> {
        Ok(self.rows.borrow().get(&id).cloned())
    }

    fn record_decision(&self, id: Uuid, blessed: bool) -> Result<ModelArtifact, RegistryError> {
        let mut rows = self.rows.borrow_mut();
        let artifact = rows.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        artifact.decide(blessed)?;
        Ok(artifact.clone())
    }

    fn find_latest_blessed(&self, name: &str) -> Result<Option<ModelArtifact>, RegistryError> {
        Ok(latest_blessed_of(self.rows.borrow().values().cloned(), name))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
