use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::assets::decode::{DecodedImage, decode_image};
use crate::assets::media::{VideoSourceInfo, probe_video};
use crate::foundation::error::{LyrisyncError, LyrisyncResult};
use crate::timeline::model::{MediaKind, MediaRef};

/// A loaded, drawable media resource.
#[derive(Clone, Debug)]
pub enum LoadedMedia {
    /// Decoded still image.
    Image(Arc<DecodedImage>),
    /// Probed video clip; frames are decoded on demand by the renderer.
    Video(Arc<VideoSourceInfo>),
}

impl LoadedMedia {
    /// Intrinsic pixel size.
    pub fn size(&self) -> (u32, u32) {
        match self {
            Self::Image(img) => (img.width, img.height),
            Self::Video(v) => (v.width, v.height),
        }
    }

    /// Media kind of this resource.
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Image(_) => MediaKind::Image,
            Self::Video(_) => MediaKind::Video,
        }
    }
}

/// Resolves and loads media behind a [`MediaRef`].
///
/// Loaders run on background threads, so implementations must be shareable.
pub trait MediaLoader: Send + Sync {
    /// Load `media` as `kind`. Blocking.
    fn load(&self, media: &MediaRef, kind: MediaKind) -> LyrisyncResult<LoadedMedia>;
}

/// Loads project-relative files from a root directory.
#[derive(Clone, Debug)]
pub struct FsMediaLoader {
    root: PathBuf,
}

impl FsMediaLoader {
    /// Create a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory media paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for `media`, rejecting absolute and parent-escaping references.
    pub fn resolve(&self, media: &MediaRef) -> LyrisyncResult<PathBuf> {
        let rel = normalize_rel_path(media.as_str())?;
        Ok(self.root.join(rel))
    }
}

impl MediaLoader for FsMediaLoader {
    fn load(&self, media: &MediaRef, kind: MediaKind) -> LyrisyncResult<LoadedMedia> {
        let path = self.resolve(media)?;
        match kind {
            MediaKind::Image => {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("read image '{}'", path.display()))?;
                Ok(LoadedMedia::Image(Arc::new(decode_image(&bytes)?)))
            }
            MediaKind::Video => {
                if !path.is_file() {
                    return Err(LyrisyncError::asset(format!(
                        "video '{}' does not exist",
                        path.display()
                    )));
                }
                Ok(LoadedMedia::Video(Arc::new(probe_video(&path)?)))
            }
        }
    }
}

/// Normalize a relative media path to forward slashes without `.` segments.
pub(crate) fn normalize_rel_path(source: &str) -> LyrisyncResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(LyrisyncError::validation("media paths must be relative"));
    }
    if s.is_empty() {
        return Err(LyrisyncError::validation("media path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(LyrisyncError::validation("media paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(LyrisyncError::validation(
            "media path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
