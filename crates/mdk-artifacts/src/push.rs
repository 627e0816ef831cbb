//! Serving push boundary.
//!
//! The gate never copies bytes itself: on bless, the pipeline hands
//! `{model id, storage uri, destination}` to a [`Pusher`] and records the
//! returned [`PushRecord`]. [`FilesystemPusher`] is the shipping
//! implementation — it exports the model tree to
//! `<serving_dir>/<model_id>/`, matching a filesystem push destination.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use mdk_schemas::{ModelArtifact, PushRecord};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum PushError {
    /// The artifact's storage location does not exist.
    SourceMissing(PathBuf),
    /// Filesystem failure during the export.
    Io { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::SourceMissing(p) => {
                write!(f, "model storage location missing: {}", p.display())
            }
            PushError::Io { path, source } => {
                write!(f, "push io error at {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for PushError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PushError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pusher trait
// ---------------------------------------------------------------------------

/// Export collaborator invoked only for blessed models.
///
/// Object-safe so the runner can hold a `Box<dyn Pusher>`.
pub trait Pusher {
    fn push(&self, model: &ModelArtifact, destination: &str) -> Result<PushRecord, PushError>;
}

// ---------------------------------------------------------------------------
// Filesystem pusher
// ---------------------------------------------------------------------------

/// Copies the model's storage tree to `<destination>/<model_id>/`.
pub struct FilesystemPusher;

impl Pusher for FilesystemPusher {
    fn push(&self, model: &ModelArtifact, destination: &str) -> Result<PushRecord, PushError> {
        let source = PathBuf::from(&model.storage_uri);
        if !source.exists() {
            return Err(PushError::SourceMissing(source));
        }

        let target = Path::new(destination).join(model.id.to_string());
        fs::create_dir_all(&target).map_err(|e| PushError::Io {
            path: target.clone(),
            source: e,
        })?;

        if source.is_dir() {
            copy_tree(&source, &target)?;
        } else {
            let file_name = source
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("model"));
            fs::copy(&source, target.join(&file_name)).map_err(|e| PushError::Io {
                path: source.clone(),
                source: e,
            })?;
        }

        Ok(PushRecord {
            model_id: model.id,
            storage_uri: model.storage_uri.clone(),
            destination: target.to_string_lossy().into_owned(),
            pushed_at: Utc::now(),
        })
    }
}

fn copy_tree(src: &Path, dst: &Path) -> Result<(), PushError> {
    let entries = fs::read_dir(src).map_err(|e| PushError::Io {
        path: src.to_path_buf(),
        source: e,
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| PushError::Io {
            path: src.to_path_buf(),
            source: e,
        })?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() {
            fs::create_dir_all(&to).map_err(|e| PushError::Io {
                path: to.clone(),
                source: e,
            })?;
            copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| PushError::Io {
                path: from.clone(),
                source: e,
            })?;
        }
    }
    Ok(())
}
