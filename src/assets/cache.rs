use std::collections::HashMap;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use crate::assets::decode::DecodedImage;
use crate::assets::loader::{LoadedMedia, MediaLoader};
use crate::assets::media::VideoSourceInfo;
use crate::foundation::error::LyrisyncResult;
use crate::timeline::model::{MediaKind, MediaRef, VisualAsset};

/// Readiness of one cached resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// Load requested, not finished yet.
    Pending,
    /// Drawable.
    Ready,
    /// Load failed; drawn as a solid fill until retried.
    Failed(String),
}

/// Cached state for one distinct [`MediaRef`].
#[derive(Clone, Debug)]
pub struct CacheEntry {
    /// Kind requested on first reference.
    pub kind: MediaKind,
    /// Current readiness.
    pub state: LoadState,
    /// Loaded resource, present once `state` is [`LoadState::Ready`].
    pub media: Option<LoadedMedia>,
    /// Whether this video is the one currently playing. Always `false` for images.
    pub playing: bool,
    generation: u64,
}

impl CacheEntry {
    /// Return `true` when the resource can be drawn.
    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    /// Intrinsic pixel size once ready.
    pub fn intrinsic_size(&self) -> Option<(u32, u32)> {
        self.media.as_ref().map(LoadedMedia::size)
    }
}

struct Completion {
    media: MediaRef,
    generation: u64,
    result: LyrisyncResult<LoadedMedia>,
}

/// Per-session cache of visual media keyed by [`MediaRef`].
///
/// Loads run on background threads; completions are applied on the owning thread by
/// [`AssetCache::poll`], so the frame path never waits on IO. Entries live until
/// [`AssetCache::teardown`].
pub struct AssetCache {
    loader: Arc<dyn MediaLoader>,
    entries: HashMap<MediaRef, CacheEntry>,
    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
    in_flight: usize,
    next_generation: u64,
}

impl AssetCache {
    /// Create an empty cache backed by `loader`.
    pub fn new(loader: Arc<dyn MediaLoader>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            loader,
            entries: HashMap::new(),
            tx,
            rx,
            in_flight: 0,
            next_generation: 0,
        }
    }

    /// Look up `asset`, starting a background load on first reference.
    ///
    /// Idempotent: later calls for the same media return the existing entry without reloading.
    pub fn ensure(&mut self, asset: &VisualAsset) -> &CacheEntry {
        if !self.entries.contains_key(&asset.media) {
            let generation = self.bump_generation();
            self.entries.insert(
                asset.media.clone(),
                CacheEntry {
                    kind: asset.kind,
                    state: LoadState::Pending,
                    media: None,
                    playing: false,
                    generation,
                },
            );
            self.spawn_load(asset.media.clone(), asset.kind, generation);
        }
        &self.entries[&asset.media]
    }

    /// Re-request a failed entry. Returns `true` when a new load was started.
    pub fn retry(&mut self, media: &MediaRef) -> bool {
        let generation = self.bump_generation();
        let Some(entry) = self.entries.get_mut(media) else {
            return false;
        };
        if !matches!(entry.state, LoadState::Failed(_)) {
            return false;
        }
        entry.state = LoadState::Pending;
        entry.generation = generation;
        let kind = entry.kind;
        tracing::debug!(media = %media, "retrying media load");
        self.spawn_load(media.clone(), kind, generation);
        true
    }

    /// Apply finished loads. Returns how many entries changed state.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(done) = self.rx.try_recv() {
            if self.apply(done) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until no loads are in flight or `timeout` elapses.
    ///
    /// Returns `true` when the cache went idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.poll();
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(done) => {
                    self.apply(done);
                }
                Err(_) => return false,
            }
        }
        true
    }

    /// Make `media` the only playing video; `None` pauses every video.
    pub fn set_active_video(&mut self, media: Option<&MediaRef>) {
        for (key, entry) in &mut self.entries {
            let playing = entry.kind == MediaKind::Video && Some(key) == media;
            if entry.playing != playing {
                tracing::debug!(media = %key, playing, "video playback toggled");
                entry.playing = playing;
            }
        }
    }

    /// The currently playing video, if any.
    pub fn playing_video(&self) -> Option<&MediaRef> {
        self.entries
            .iter()
            .find_map(|(key, entry)| entry.playing.then_some(key))
    }

    /// Pause and release every entry. Loads still in flight are discarded when they finish.
    pub fn teardown(&mut self) {
        self.set_active_video(None);
        let released = self.entries.len();
        self.entries.clear();
        self.poll();
        tracing::debug!(released, "asset cache torn down");
    }

    /// Entry for `media`, if it was ever referenced.
    pub fn get(&self, media: &MediaRef) -> Option<&CacheEntry> {
        self.entries.get(media)
    }

    /// Return `true` when `media` is loaded and drawable.
    pub fn is_ready(&self, media: &MediaRef) -> bool {
        self.entries.get(media).is_some_and(CacheEntry::is_ready)
    }

    /// Decoded image for `media`, once ready.
    pub fn image(&self, media: &MediaRef) -> Option<&Arc<DecodedImage>> {
        match self.entries.get(media)?.media.as_ref()? {
            LoadedMedia::Image(img) => Some(img),
            LoadedMedia::Video(_) => None,
        }
    }

    /// Probed video info for `media`, once ready.
    pub fn video(&self, media: &MediaRef) -> Option<&Arc<VideoSourceInfo>> {
        match self.entries.get(media)?.media.as_ref()? {
            LoadedMedia::Video(v) => Some(v),
            LoadedMedia::Image(_) => None,
        }
    }

    /// Number of distinct media referenced.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when nothing has been referenced.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads started but not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn spawn_load(&mut self, media: MediaRef, kind: MediaKind, generation: u64) {
        let loader = Arc::clone(&self.loader);
        let tx = self.tx.clone();
        let job_media = media.clone();
        let spawned = thread::Builder::new()
            .name("lyrisync-media-load".to_owned())
            .spawn(move || {
                let result = loader.load(&job_media, kind);
                // The cache may be gone; nothing to report to.
                let _ = tx.send(Completion {
                    media: job_media,
                    generation,
                    result,
                });
            });
        match spawned {
            Ok(_) => self.in_flight += 1,
            Err(e) => {
                tracing::warn!(media = %media, error = %e, "failed to start media load");
                if let Some(entry) = self.entries.get_mut(&media) {
                    entry.state = LoadState::Failed(format!("spawn loader thread: {e}"));
                }
            }
        }
    }

    fn apply(&mut self, done: Completion) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        let Some(entry) = self.entries.get_mut(&done.media) else {
            return false;
        };
        if entry.generation != done.generation {
            return false;
        }
        match done.result {
            Ok(media) if media.kind() == entry.kind => {
                tracing::debug!(media = %done.media, "media ready");
                entry.media = Some(media);
                entry.state = LoadState::Ready;
            }
            Ok(media) => {
                let msg = format!("expected {:?}, loaded {:?}", entry.kind, media.kind());
                tracing::warn!(media = %done.media, error = %msg, "media load failed");
                entry.state = LoadState::Failed(msg);
            }
            Err(e) => {
                tracing::warn!(media = %done.media, error = %e, "media load failed");
                entry.state = LoadState::Failed(e.to_string());
            }
        }
        true
    }
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("entries", &self.entries.len())
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
