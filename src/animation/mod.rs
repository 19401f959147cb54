//! Easing curves and per-style animation math.

/// Easing curves.
pub mod ease;
/// Style timing functions and tuning constants.
pub mod style;
