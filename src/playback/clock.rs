/// External source of playback time (usually the audio player).
///
/// The render path only reads `current_time`; transport methods are for the session host.
pub trait PlaybackClock {
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;
    /// Whether time is advancing.
    fn is_playing(&self) -> bool;
    /// Start or resume.
    fn play(&mut self);
    /// Pause at the current position.
    fn pause(&mut self);
    /// Jump to `t` seconds.
    fn seek(&mut self, t: f64);
    /// Return `true` once after playback reaches its end.
    fn take_ended(&mut self) -> bool;
}

/// Clock advanced explicitly by the host, for offline capture and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct ManualClock {
    time: f64,
    duration: f64,
    playing: bool,
    ended: bool,
}

impl ManualClock {
    /// Paused clock at zero for media `duration` seconds long.
    pub fn new(duration: f64) -> Self {
        let duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
        Self {
            time: 0.0,
            duration,
            playing: false,
            ended: false,
        }
    }

    /// Media length in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Advance by `dt` seconds while playing. Reaching the end pauses and raises the ended flag.
    pub fn advance(&mut self, dt: f64) -> f64 {
        if self.playing && dt.is_finite() && dt > 0.0 {
            self.time = (self.time + dt).min(self.duration);
        }
        if self.playing && self.time >= self.duration {
            self.playing = false;
            self.ended = true;
        }
        self.time
    }
}

impl PlaybackClock for ManualClock {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, t: f64) {
        self.time = if t.is_finite() {
            t.clamp(0.0, self.duration)
        } else {
            0.0
        };
        self.ended = false;
    }

    fn take_ended(&mut self) -> bool {
        std::mem::take(&mut self.ended)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/clock.rs"]
mod tests;
