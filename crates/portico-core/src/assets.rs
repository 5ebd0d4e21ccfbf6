//! Asset access seam.
//!
//! Embedded-asset pipelines live outside this crate; the framework only
//! needs a narrow read interface. The static-asset middleware and the
//! server consume [`AssetReader`]; applications provide whatever backing
//! store they build with. [`FsAssetReader`] ships for development use.

use std::io;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;

/// Read access to a tree of static assets.
pub trait AssetReader: Send + Sync + 'static {
    /// Reads the asset at `path` (relative, `/`-separated).
    fn read(&self, path: &str) -> io::Result<Bytes>;

    /// Returns `true` when an asset exists at `path`.
    fn exists(&self, path: &str) -> bool;
}

/// Filesystem-backed [`AssetReader`] rooted at a directory.
///
/// Rejects path traversal: any `..` component resolves to "not found".
#[derive(Debug, Clone)]
pub struct FsAssetReader {
    root: PathBuf,
}

impl FsAssetReader {
    /// Creates a reader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => return None,
            }
        }
        Some(self.root.join(relative))
    }
}

impl AssetReader for FsAssetReader {
    fn read(&self, path: &str) -> io::Result<Bytes> {
        let full = self
            .resolve(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid asset path"))?;
        std::fs::read(full).map(Bytes::from)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|p| p.is_file())
    }
}

/// An [`AssetReader`] with no assets. Useful as a default and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssets;

impl AssetReader for NoAssets {
    fn read(&self, _path: &str) -> io::Result<Bytes> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no assets configured"))
    }

    fn exists(&self, _path: &str) -> bool {
        false
    }
}

/// Guesses a MIME type from a path's extension.
///
/// Unknown extensions map to `application/octet-stream`.
#[must_use]
pub fn mime_for_path(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "map" => "application/json",
        _ => "application/octet-stream",
    }
}
