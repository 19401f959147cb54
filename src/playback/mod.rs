/// Playback clocks.
pub mod clock;
/// Cancellable frame scheduling.
pub mod frame_loop;
/// Playback sessions.
pub mod player;
