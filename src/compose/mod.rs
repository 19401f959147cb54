/// Per-frame compositor.
pub mod compositor;
/// Draw-command plans.
pub mod plan;
/// Animation style renderers.
pub mod styles;
/// Text sizes and colors.
pub mod typography;
