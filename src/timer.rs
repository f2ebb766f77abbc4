use std::time::{Duration, Instant};

pub struct Timer {
    start_time: Instant,
    last_reset: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            last_reset: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        self.last_reset = Instant::now();
    }

    pub fn elapsed_start(&self) -> f32 {
        self.start_time.elapsed().as_secs_f32()
    }

    pub fn elapsed_reset(&self) -> f32 {
        self.last_reset.elapsed().as_secs_f32()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-frame delta time and frame pacing
///
/// The delta is clamped to `max_delta` so a stall (window drag, debugger)
/// does not teleport the sprite. Frames are spaced at least `interval` apart.
pub struct FrameClock {
    timer: Timer,
    last_tick: Instant,
    max_delta: f32,
    interval: Duration,
}

impl FrameClock {
    pub fn new(max_delta: f32, interval: Duration) -> Self {
        Self {
            timer: Timer::new(),
            last_tick: Instant::now(),
            max_delta,
            interval,
        }
    }

    /// Returns the clamped number of seconds since the previous tick
    pub fn tick(&mut self) -> f32 {
        let delta = self.timer.elapsed_reset();
        self.timer.reset();
        self.last_tick = Instant::now();
        clamp_delta(delta, self.max_delta)
    }

    /// Earliest instant the next frame should start at
    pub fn next_deadline(&self) -> Instant {
        self.last_tick + self.interval
    }

    /// Whether enough time has passed since the last tick to start a frame
    pub fn frame_due(&self, now: Instant) -> bool {
        now >= self.next_deadline()
    }

    /// Seconds since the clock was created
    pub fn uptime(&self) -> f32 {
        self.timer.elapsed_start()
    }
}

pub fn clamp_delta(delta: f32, max_delta: f32) -> f32 {
    delta.clamp(0., max_delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_clamped_to_max() {
        assert_eq!(clamp_delta(0.2, 0.05), 0.05);
        assert_eq!(clamp_delta(0.016, 0.05), 0.016);
        assert_eq!(clamp_delta(-1., 0.05), 0.);
    }

    #[test]
    fn tick_never_exceeds_max_delta() {
        let mut clock = FrameClock::new(0.05, Duration::from_millis(16));
        std::thread::sleep(Duration::from_millis(70));
        let delta = clock.tick();
        assert!(delta <= 0.05);
        assert!(delta > 0.);
    }

    #[test]
    fn deadline_is_one_interval_after_tick() {
        let mut clock = FrameClock::new(0.05, Duration::from_millis(16));
        clock.tick();
        let tick = clock.last_tick;
        assert_eq!(clock.next_deadline(), tick + Duration::from_millis(16));
        assert!(!clock.frame_due(tick));
        assert!(clock.frame_due(tick + Duration::from_millis(16)));
    }
}
