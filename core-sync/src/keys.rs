//! # Asset Key Mapping
//!
//! Converts local file paths into the URI-encoded asset keys the remote API
//! expects.
//!
//! ## Overview
//!
//! A theme asset is addressed remotely by its path relative to the theme
//! root, with forward slashes and URI encoding: the local file
//! `<base>/assets/site.css` becomes the key `assets/site.css`. Keys
//! conventionally live under the six standard theme directories (`assets`,
//! `layout`, `config`, `snippets`, `templates`, `locales`); the mapper does
//! not enforce membership, the backend validates it.
//!
//! The base directory is resolved exactly once at construction: an explicit
//! non-empty base is made absolute, otherwise the process working directory
//! is used. Mapping is deterministic after that point, so the same input
//! path always yields the same key.
//!
//! ## Usage
//!
//! ```ignore
//! use core_sync::keys::AssetKeyMapper;
//! use std::path::Path;
//!
//! let mapper = AssetKeyMapper::new(Some(Path::new("shop/theme")))?;
//! let key = mapper.asset_key(Path::new("shop/theme/assets/site.css"))?;
//! assert_eq!(key.as_str(), "assets/site.css");
//! ```

use bridge_traits::AssetKey;
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, SyncError};

/// Maps local file paths to remote asset keys.
///
/// Pure path math over a base directory resolved at construction; no
/// filesystem access after `new`.
#[derive(Debug, Clone)]
pub struct AssetKeyMapper {
    base: PathBuf,
}

impl AssetKeyMapper {
    /// Create a mapper over the given base directory.
    ///
    /// An explicit non-empty base is resolved to absolute form (relative
    /// bases are joined onto the working directory). `None` or an empty base
    /// falls back to the working directory itself.
    pub fn new(base: Option<&Path>) -> Result<Self> {
        let base = match base {
            Some(p) if !p.as_os_str().is_empty() => {
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    current_dir()?.join(p)
                }
            }
            _ => current_dir()?,
        };

        Ok(Self { base })
    }

    /// The resolved absolute base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Compute the path relative to the base, with forward slashes.
    ///
    /// Relative inputs are interpreted against the base directory. Paths
    /// outside the base, non-UTF-8 paths, and paths containing `..` are
    /// rejected rather than mapped to keys the backend would refuse anyway.
    pub fn to_relative(&self, path: &Path) -> Result<String> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        };

        let relative =
            absolute
                .strip_prefix(&self.base)
                .map_err(|_| SyncError::KeyMapping {
                    path: path.display().to_string(),
                    reason: format!("not under base path {}", self.base.display()),
                })?;

        let mut segments: Vec<String> = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str().ok_or_else(|| SyncError::KeyMapping {
                        path: path.display().to_string(),
                        reason: "path is not valid UTF-8".to_string(),
                    })?;
                    // Backslashes never survive into keys: they separate on
                    // Windows and are normalized to '/' everywhere else.
                    for piece in part.split('\\') {
                        if !piece.is_empty() {
                            segments.push(piece.to_string());
                        }
                    }
                }
                Component::CurDir => {}
                other => {
                    return Err(SyncError::KeyMapping {
                        path: path.display().to_string(),
                        reason: format!("unsupported path component {:?}", other),
                    });
                }
            }
        }

        if segments.is_empty() {
            return Err(SyncError::KeyMapping {
                path: path.display().to_string(),
                reason: "path resolves to the base directory itself".to_string(),
            });
        }

        Ok(segments.join("/"))
    }

    /// Derive the URI-encoded asset key for a local path.
    ///
    /// Each path segment is percent-encoded individually, so the `/`
    /// separators themselves stay literal. Deterministic and idempotent:
    /// the same input always produces the same key, and encoding happens
    /// exactly once.
    pub fn asset_key(&self, path: &Path) -> Result<AssetKey> {
        let relative = self.to_relative(path)?;
        let encoded = relative
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        Ok(AssetKey::new(encoded))
    }
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir()
        .map_err(|e| SyncError::Config(format!("Cannot resolve working directory: {}", e)))
}
