//! Text measurement, line wrapping and glyph layout.

/// Parley-backed layout engine.
pub mod engine;
/// Font specs and the measurement seam.
pub mod measure;
/// Greedy word wrapping.
pub mod wrap;
