use std::time::{Duration, Instant};

/// Smallest delta a tick reports.
pub const DEFAULT_DT_MIN: Duration = Duration::from_micros(100);
/// Largest delta a tick reports. Longer stalls (debugger, minimized window)
/// are reported as this.
pub const DEFAULT_DT_MAX: Duration = Duration::from_millis(250);

/// Timing of one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// When the tick happened.
    pub now: Instant,

    /// Zero for the first frame after the clock was created.
    pub frame_index: u64,
}

/// Produces a [`FrameTime`] per render-loop iteration.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(DEFAULT_DT_MIN, DEFAULT_DT_MAX)
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Restarts the delta baseline without touching the frame index.
    ///
    /// Called when the window is (re)created so initialization time does not
    /// show up as the first frame's delta.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`. A `now` earlier than the previous tick
    /// counts as zero elapsed time.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let time = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
