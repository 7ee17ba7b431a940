//! Artifact store trait and filesystem implementation

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during artifact store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Artifact not found: {key}")]
    NotFound { key: String },

    #[error("Invalid artifact key: {reason}")]
    InvalidKey { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Deterministic storage key for a compiled prompt artifact.
///
/// Keys have the shape `<template_id>/<subject_id>/<content_hash>.txt`.
/// The content hash covers the template text, the variables, and the template
/// version, so identical inputs always map to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub template_id: String,
    pub subject_id: String,
    pub content_hash: String,
}

impl ArtifactKey {
    pub fn new(
        template_id: impl Into<String>,
        subject_id: impl Into<String>,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            template_id: template_id.into(),
            subject_id: subject_id.into(),
            content_hash: content_hash.into(),
        }
    }

    /// Relative storage path for this key
    pub fn path(&self) -> String {
        format!("{}/{}/{}.txt", self.template_id, self.subject_id, self.content_hash)
    }

    /// Reject keys whose segments would escape the store root
    fn validate(&self) -> Result<(), StoreError> {
        for segment in [&self.template_id, &self.subject_id, &self.content_hash] {
            if segment.is_empty() {
                return Err(StoreError::InvalidKey {
                    reason: "empty key segment".to_string(),
                });
            }
            if segment.contains('/') || segment.contains("..") {
                return Err(StoreError::InvalidKey {
                    reason: format!("segment '{}' contains path separators", segment),
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Storage backend for compiled prompt artifacts.
///
/// Implementations must make `upload` idempotent: writing the same key twice
/// is allowed and must leave the first content in place (identical key means
/// identical content by construction).
pub trait ArtifactStore: Send + Sync {
    /// Check whether an artifact already exists
    fn exists(&self, key: &ArtifactKey) -> Result<bool, StoreError>;

    /// Download artifact or template text by raw path
    fn download(&self, path: &str) -> Result<String, StoreError>;

    /// Upload an immutable artifact. Returns true if this call created it,
    /// false if it was already present.
    fn upload(&self, key: &ArtifactKey, content: &str) -> Result<bool, StoreError>;
}

/// Filesystem-backed artifact store
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Open or create a store rooted at the given directory
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "Opened artifact store");
        Ok(Self { root })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        if path.contains("..") || path.starts_with('/') {
            return Err(StoreError::InvalidKey {
                reason: format!("path '{}' escapes store root", path),
            });
        }
        Ok(self.root.join(path))
    }

    /// Seed raw template text at a path (used by tooling and tests; uploads
    /// of compiled artifacts go through [`ArtifactStore::upload`]).
    pub fn put_raw(&self, path: &str, content: &str) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, content)?;
        Ok(())
    }
}

impl ArtifactStore for FsArtifactStore {
    fn exists(&self, key: &ArtifactKey) -> Result<bool, StoreError> {
        key.validate()?;
        Ok(self.resolve(&key.path())?.exists())
    }

    fn download(&self, path: &str) -> Result<String, StoreError> {
        let full = self.resolve(path)?;
        if !full.exists() {
            return Err(StoreError::NotFound { key: path.to_string() });
        }
        Ok(fs::read_to_string(&full)?)
    }

    fn upload(&self, key: &ArtifactKey, content: &str) -> Result<bool, StoreError> {
        key.validate()?;
        let full = self.resolve(&key.path())?;

        if full.exists() {
            // Content-addressed: an existing key already holds this content.
            debug!(key = %key, "Artifact already present, skipping write");
            return Ok(false);
        }

        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to a temp name then rename so concurrent duplicate uploads
        // never expose a partially written artifact.
        let tmp = full.with_extension("txt.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &full)?;

        info!(key = %key, bytes = content.len(), "Stored artifact");
        Ok(true)
    }
}
