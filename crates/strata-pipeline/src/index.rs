//! Vector index construction, persistence and lookup.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use strata_parse::{AiItem, ItemType, Lang};

use crate::BoxFuture;
use crate::error::CollaboratorError;

pub trait IndexBuilder: Send + Sync {
    fn initialize(&self, dimension: usize) -> BoxFuture<'_, Result<(), CollaboratorError>>;

    /// Append `vectors` at ordinals `start..start + vectors.len()`.
    fn add_vectors<'a>(
        &'a self,
        vectors: &'a [Vec<f32>],
        start: usize,
    ) -> BoxFuture<'a, Result<(), CollaboratorError>>;

    fn optimize(&self) -> BoxFuture<'_, Result<(), CollaboratorError>>;

    /// Persist the index and return its location.
    fn save(&self) -> BoxFuture<'_, Result<PathBuf, CollaboratorError>>;
}

/// Maps a vector ordinal back to the item it was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub vector_ordinal: usize,
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub language: Lang,
    pub file_path: String,
}

impl IndexEntry {
    #[must_use]
    pub fn new(vector_ordinal: usize, item: &AiItem) -> Self {
        Self {
            vector_ordinal,
            id: item.id.clone(),
            item_type: item.item_type,
            language: item.language,
            file_path: item.file_path.clone(),
        }
    }
}

/// Side-table file stored next to `index_path`.
#[must_use]
pub fn entries_path(index_path: &Path) -> PathBuf {
    let stem = index_path
        .file_stem()
        .map_or_else(|| "index".into(), |s| s.to_string_lossy().into_owned());
    index_path.with_file_name(format!("{stem}.entries.json"))
}

/// Read a side-table written by the indexing stage.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub async fn load_entries(path: &Path) -> Result<Vec<IndexEntry>, CollaboratorError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// On-disk form of a flat index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatIndex {
    pub dimension: usize,
    pub normalized: bool,
    pub vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a flat index.
    pub async fn load(path: &Path) -> Result<Self, CollaboratorError> {
        let bytes = tokio::fs::read(path).await?;
        let index: Self = serde_json::from_slice(&bytes)?;
        if let Some(bad) = index.vectors.iter().find(|v| v.len() != index.dimension) {
            return Err(CollaboratorError::DimensionMismatch {
                expected: index.dimension,
                actual: bad.len(),
            });
        }
        Ok(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Top `k` `(ordinal, score)` pairs by cosine similarity, best first.
    /// Ties keep the lower ordinal first.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::DimensionMismatch`] for a query of the wrong length.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, CollaboratorError> {
        if query.len() != self.dimension {
            return Err(CollaboratorError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(query, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }
}

#[derive(Debug, Default)]
struct FlatState {
    dimension: Option<usize>,
    vectors: Vec<Vec<f32>>,
    normalized: bool,
}

/// Brute-force in-memory index saved as a single JSON file.
#[derive(Debug)]
pub struct FlatIndexBuilder {
    path: PathBuf,
    state: Mutex<FlatState>,
}

impl FlatIndexBuilder {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(FlatState::default()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut FlatState) -> Result<T, CollaboratorError>,
    ) -> Result<T, CollaboratorError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| CollaboratorError::Index(format!("index state poisoned: {e}")))?;
        f(&mut state)
    }
}

impl IndexBuilder for FlatIndexBuilder {
    fn initialize(&self, dimension: usize) -> BoxFuture<'_, Result<(), CollaboratorError>> {
        Box::pin(async move {
            if dimension == 0 {
                return Err(CollaboratorError::Index("dimension must be non-zero".into()));
            }
            self.with_state(|state| {
                *state = FlatState {
                    dimension: Some(dimension),
                    ..FlatState::default()
                };
                Ok(())
            })
        })
    }

    fn add_vectors<'a>(
        &'a self,
        vectors: &'a [Vec<f32>],
        start: usize,
    ) -> BoxFuture<'a, Result<(), CollaboratorError>> {
        Box::pin(async move {
            self.with_state(|state| {
                let dimension = state
                    .dimension
                    .ok_or_else(|| CollaboratorError::Index("index not initialized".into()))?;
                if start != state.vectors.len() {
                    return Err(CollaboratorError::Index(format!(
                        "non-contiguous insert at {start}, index holds {}",
                        state.vectors.len()
                    )));
                }
                if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
                    return Err(CollaboratorError::DimensionMismatch {
                        expected: dimension,
                        actual: bad.len(),
                    });
                }
                state.vectors.extend_from_slice(vectors);
                state.normalized = false;
                Ok(())
            })
        })
    }

    fn optimize(&self) -> BoxFuture<'_, Result<(), CollaboratorError>> {
        Box::pin(async move {
            self.with_state(|state| {
                for v in &mut state.vectors {
                    normalize(v);
                }
                state.normalized = true;
                Ok(())
            })
        })
    }

    fn save(&self) -> BoxFuture<'_, Result<PathBuf, CollaboratorError>> {
        Box::pin(async move {
            let bytes = self.with_state(|state| {
                let dimension = state
                    .dimension
                    .ok_or_else(|| CollaboratorError::Index("index not initialized".into()))?;
                let index = FlatIndex {
                    dimension,
                    normalized: state.normalized,
                    vectors: state.vectors.clone(),
                };
                Ok(serde_json::to_vec(&index)?)
            })?;
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&self.path, bytes).await?;
            tracing::debug!(path = %self.path.display(), "saved flat index");
            Ok(self.path.clone())
        })
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
