//! Export capture: codec selection and the recording state machine.

/// Codec variants and encoder capability probing.
pub mod codec;
/// Export state machine.
pub mod pipeline;
