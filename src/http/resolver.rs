//! Maps request paths onto files below the document root.

use std::path::{Component, Path, PathBuf};

use anyhow::Context;

use crate::http::response::StatusCode;

/// File served when a directory is requested with a trailing slash.
pub const INDEX_FILE: &str = "index.html";

/// Classification of a request driving the response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    NotFound,
    BadRequest,
    MethodNotAllowed,
}

impl From<Outcome> for StatusCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Ok => StatusCode::Ok,
            Outcome::NotFound => StatusCode::NotFound,
            Outcome::BadRequest => StatusCode::BadRequest,
            Outcome::MethodNotAllowed => StatusCode::MethodNotAllowed,
        }
    }
}

/// Result of resolving a request path.
///
/// `path` is only set for [`Outcome::Ok`], and then names a regular file
/// whose canonical path lies inside the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub path: Option<PathBuf>,
    pub outcome: Outcome,
}

impl ResolvedTarget {
    pub fn found(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            outcome: Outcome::Ok,
        }
    }

    /// A target without a file, for every outcome other than `Ok`.
    pub fn rejected(outcome: Outcome) -> Self {
        Self {
            path: None,
            outcome,
        }
    }
}

/// The canonicalized directory files are served from.
#[derive(Debug, Clone)]
pub struct DocRoot {
    root: PathBuf,
}

impl DocRoot {
    /// Canonicalizes `path`, which must name an existing directory.
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let root = std::fs::canonicalize(path)
            .with_context(|| format!("document root {} is not accessible", path.display()))?;

        if !root.is_dir() {
            anyhow::bail!("document root {} is not a directory", root.display());
        }

        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolves a decoded request path.
    ///
    /// Paths climbing above the root, either lexically or through a
    /// symlink, are `BadRequest`. A path ending in `/` is served only
    /// through its `index.html`.
    pub async fn resolve(&self, request_path: &str) -> ResolvedTarget {
        if request_path.contains('\0') {
            return ResolvedTarget::rejected(Outcome::BadRequest);
        }

        let Some(candidate) = self.confine(request_path.trim_start_matches('/')) else {
            tracing::debug!(path = %request_path, "Path escapes document root");
            return ResolvedTarget::rejected(Outcome::BadRequest);
        };

        // A trailing separator names a directory, never a file.
        let file = if request_path.ends_with('/') {
            candidate.join(INDEX_FILE)
        } else {
            candidate
        };

        if is_file(&file).await {
            return self.accept(&file).await;
        }

        ResolvedTarget::rejected(Outcome::NotFound)
    }

    /// Joins `relative` onto the root, folding `.` and `..` lexically.
    ///
    /// Returns `None` once a `..` would leave the root.
    fn confine(&self, relative: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        let mut depth = 0usize;

        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return None;
                    }
                    path.pop();
                    depth -= 1;
                }
                Component::RootDir | Component::Prefix(_) => return None,
            }
        }

        Some(path)
    }

    async fn accept(&self, file: &Path) -> ResolvedTarget {
        match tokio::fs::canonicalize(file).await {
            Ok(real) if real.starts_with(&self.root) => ResolvedTarget::found(real),
            Ok(real) => {
                tracing::warn!(path = %real.display(), "Symlink points outside document root");
                ResolvedTarget::rejected(Outcome::BadRequest)
            }
            Err(e) => {
                tracing::debug!(path = %file.display(), error = %e, "Failed to canonicalize");
                ResolvedTarget::rejected(Outcome::NotFound)
            }
        }
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
