use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::Deserialize;
use thiserror::Error;

use crate::detection::domain::bovw::Codebook;
use crate::detection::domain::face_verifier::LinearClassifier;
use crate::shared::constants::{CLASSIFIER_FILENAME, CODEBOOK_FILENAME};

#[derive(Error, Debug)]
pub enum ModelStoreError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed artifact {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("could not determine a models directory")]
    NoModelsDir,
}

/// On-disk codebook document: `k` cluster centroids, one row each.
#[derive(Deserialize)]
struct CodebookArtifact {
    k: usize,
    centroids: Vec<Vec<f32>>,
}

/// On-disk decision boundary: linear weights over the k histogram bins,
/// a bias term, and optional per-bin feature scale factors.
#[derive(Deserialize)]
struct ClassifierArtifact {
    weights: Vec<f32>,
    bias: f32,
    #[serde(default)]
    scale: Option<Vec<f32>>,
}

/// The verification models as loaded from disk, ready for injection.
pub struct VerifierArtifacts {
    pub codebook: Codebook,
    pub classifier: LinearClassifier,
}

/// Loads the fitted codebook and decision boundary from a directory.
///
/// Both artifacts are JSON documents produced by the offline training
/// tool. Any missing or inconsistent piece fails the whole load; the
/// caller decides whether that disables verification or aborts.
pub fn load(dir: &Path) -> Result<VerifierArtifacts, ModelStoreError> {
    let codebook = load_codebook(&dir.join(CODEBOOK_FILENAME))?;
    let classifier = load_classifier(&dir.join(CLASSIFIER_FILENAME), codebook.k())?;
    Ok(VerifierArtifacts {
        codebook,
        classifier,
    })
}

/// Default artifacts directory in the user's data dir.
pub fn default_models_dir() -> Result<PathBuf, ModelStoreError> {
    dirs::data_dir()
        .map(|d| d.join("facerelay").join("models"))
        .ok_or(ModelStoreError::NoModelsDir)
}

fn load_codebook(path: &Path) -> Result<Codebook, ModelStoreError> {
    let artifact: CodebookArtifact = read_json(path)?;

    if artifact.centroids.is_empty() || artifact.centroids.len() != artifact.k {
        return Err(ModelStoreError::Malformed {
            path: path.to_path_buf(),
            reason: format!(
                "expected {} centroids, found {}",
                artifact.k,
                artifact.centroids.len()
            ),
        });
    }
    let dim = artifact.centroids[0].len();
    if dim == 0 || artifact.centroids.iter().any(|c| c.len() != dim) {
        return Err(ModelStoreError::Malformed {
            path: path.to_path_buf(),
            reason: "centroid rows must be non-empty and uniform".to_string(),
        });
    }

    let flat: Vec<f32> = artifact.centroids.into_iter().flatten().collect();
    let centroids =
        Array2::from_shape_vec((artifact.k, dim), flat).map_err(|e| ModelStoreError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(Codebook::new(centroids))
}

fn load_classifier(path: &Path, k: usize) -> Result<LinearClassifier, ModelStoreError> {
    let artifact: ClassifierArtifact = read_json(path)?;

    if artifact.weights.len() != k {
        return Err(ModelStoreError::Malformed {
            path: path.to_path_buf(),
            reason: format!("expected {k} weights, found {}", artifact.weights.len()),
        });
    }
    if let Some(scale) = &artifact.scale {
        if scale.len() != k {
            return Err(ModelStoreError::Malformed {
                path: path.to_path_buf(),
                reason: format!("expected {k} scale factors, found {}", scale.len()),
            });
        }
        if scale.iter().any(|s| *s == 0.0) {
            return Err(ModelStoreError::Malformed {
                path: path.to_path_buf(),
                reason: "scale factors must be non-zero".to_string(),
            });
        }
    }
    Ok(LinearClassifier::new(
        artifact.weights,
        artifact.bias,
        artifact.scale,
    ))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ModelStoreError> {
    if !path.exists() {
        return Err(ModelStoreError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|e| ModelStoreError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ModelStoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}
