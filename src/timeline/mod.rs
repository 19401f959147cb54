//! Timed lyric segments, timed visuals, and active-entry resolution.

/// Active-entry lookup.
pub mod index;
/// Timeline data model.
pub mod model;
