use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

/// Frames counted per wall-clock second.
#[derive(Clone, Copy, Debug, Default)]
pub struct FpsCounter {
    window_start: Option<Instant>,
    frames: u32,
    fps: u32,
}

impl FpsCounter {
    /// Create a counter reporting 0 until the first window closes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame at `now`. Returns the new rate when a window closes.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;
        if now.saturating_duration_since(start) >= WINDOW {
            self.fps = self.frames;
            self.frames = 0;
            self.window_start = Some(now);
            return Some(self.fps);
        }
        None
    }

    /// Rate from the last closed window.
    pub fn fps(&self) -> u32 {
        self.fps
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/fps.rs"]
mod tests;
