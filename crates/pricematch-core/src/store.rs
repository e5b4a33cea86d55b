use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Ids of form submissions that have already been turned into invoice lines.
///
/// Persisted as a JSON array of integers. A form is only recorded once its
/// invoice update succeeded, so a failed cycle retries it next time.
pub struct ProcessedForms {
    path: Option<PathBuf>,
    ids: Mutex<BTreeSet<i64>>,
}

impl ProcessedForms {
    /// Load from `path`. A missing file is an empty set; a corrupt one is
    /// logged and treated as empty.
    pub async fn load(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let ids = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<i64>>(&bytes) {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    tracing::warn!("Ignoring corrupt processed forms file {}: {}", path.display(), e);
                    BTreeSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        tracing::debug!("Loaded {} processed form ids", ids.len());
        Ok(Self {
            path: Some(path),
            ids: Mutex::new(ids),
        })
    }

    /// A set that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            ids: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn contains(&self, form_id: i64) -> bool {
        self.ids.lock().await.contains(&form_id)
    }

    pub async fn len(&self) -> usize {
        self.ids.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ids.lock().await.is_empty()
    }

    /// Record `form_id` and persist. Returns false if it was already present.
    ///
    /// The id is only added in memory once the file has been written.
    pub async fn mark(&self, form_id: i64) -> StoreResult<bool> {
        let mut ids = self.ids.lock().await;
        if ids.contains(&form_id) {
            return Ok(false);
        }

        let mut updated = ids.clone();
        updated.insert(form_id);
        self.save(&updated).await?;
        *ids = updated;
        Ok(true)
    }

    async fn save(&self, ids: &BTreeSet<i64>) -> StoreResult<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let json = serde_json::to_vec(&ids.iter().collect::<Vec<_>>())?;
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
        Ok(())
    }
}
