use std::time::{Duration, Instant};

pub const SIXTY_FPS: u64 = 16_666_666;
pub const ONE_FPS: u64 = 1_000_000_000;

/// Default spiral-of-death guard: a single frame's measured delta is never allowed to push
/// more than a quarter second of simulation time into the fixed-step accumulator.
pub const DEFAULT_MAX_DELTA_TIME_SEC: f64 = 0.25;
/// Default per-iteration wall-clock budget, matching [`SIXTY_FPS`].
pub const DEFAULT_TARGET_FRAME_TIME_MS: u64 = 16;
/// Below this much slack, `Engine::update` does not bother yielding to the host.
pub const DEFAULT_YIELD_THRESHOLD_MS: u64 = 1;

/// A TimeFrame represents a specific amount of time elapsed within the engine for a single
/// simulation frame. Each frame captures total elapsed time as well as the delta time since
/// the last frame. New frames are intended to be generated from a previous frame using the
/// `next()` method. Generally this can be invoked on each iteration of a game loop.
#[derive(Debug, Copy, Clone)]
pub struct Time {
    // The current instant when this frame was created
    instant: Instant,
    pub fixed_time_step: u64,
    /// The time delta since the last frame
    pub delta: Duration,
    /// The total elapsed time since the first frame
    pub time: Duration,
    /// The total elapsed time since the first frame but incremented by the fixed time step
    pub fixed_time: Duration,
    /// An accumulator for fixed time step calculations
    accumulator: u64,
    /// Hard cap, in seconds, on how much of a single frame's measured delta is fed into the
    /// fixed-step accumulator - bounds how many fixed ticks one slow frame (a debugger pause,
    /// a GC hiccup) can trigger, avoiding the classic "spiral of death".
    pub max_delta_time_sec: f64,
    /// Target wall-clock budget for one outer loop iteration, in milliseconds.
    pub target_frame_time_ms: u64,
    /// If the remaining budget within `target_frame_time_ms` exceeds this many milliseconds,
    /// the engine yields to the host instead of immediately starting the next iteration.
    pub yield_threshold_ms: u64,
}

impl Time {
    /// Construct a new `Frame` with delta and time set to `0`, using the default spiral-of-death
    /// budget. Caller must provide a fixed time step in nano seconds.
    pub fn new(fixed_time_step: u64) -> Self {
        Self::with_budget(
            fixed_time_step,
            DEFAULT_MAX_DELTA_TIME_SEC,
            DEFAULT_TARGET_FRAME_TIME_MS,
            DEFAULT_YIELD_THRESHOLD_MS,
        )
    }

    /// Construct a new `Frame` with an explicit frame-budget configuration.
    pub fn with_budget(
        fixed_time_step: u64,
        max_delta_time_sec: f64,
        target_frame_time_ms: u64,
        yield_threshold_ms: u64,
    ) -> Self {
        Self {
            fixed_time_step,
            instant: Instant::now(),
            delta: Duration::ZERO,
            time: Duration::ZERO,
            fixed_time: Duration::ZERO,
            accumulator: 0,
            max_delta_time_sec,
            target_frame_time_ms,
            yield_threshold_ms,
        }
    }

    /// Increment the fixed frame time accumulation
    pub fn increment_fixed(&mut self) {
        self.fixed_time += Duration::from_nanos(self.fixed_time_step);
        self.accumulator -= self.fixed_time_step;
    }

    /// Create the next frame from an existing frame. This will capture the delta from the last
    /// frame and update the cumulative time. The measured delta is clamped by
    /// `max_delta_time_sec` before it is folded into `time`/the fixed-step accumulator, so a
    /// single abnormally long frame cannot demand an unbounded run of catch-up fixed ticks.
    pub fn next(self) -> Self {
        let raw_delta = self.instant.elapsed();
        let max_delta = Duration::from_secs_f64(self.max_delta_time_sec.max(0.0));
        let delta = raw_delta.min(max_delta);
        Self {
            fixed_time_step: self.fixed_time_step,
            instant: Instant::now(),
            delta,
            time: self.time + delta,
            fixed_time: self.fixed_time,
            accumulator: self.accumulator + delta.as_nanos() as u64,
            max_delta_time_sec: self.max_delta_time_sec,
            target_frame_time_ms: self.target_frame_time_ms,
            yield_threshold_ms: self.yield_threshold_ms,
        }
    }

    /// Determine whether this frame has accumulated enough delta for a fixed frame.
    pub fn has_fixed(&self) -> bool {
        self.accumulator >= self.fixed_time_step
    }

    /// Reset the time frame to now with zeroed accumulator. This is useful for situations where
    /// the engine is paused and resumed.
    pub fn reset_now(&mut self) {
        self.instant = Instant::now();
        self.accumulator = 0;
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new(SIXTY_FPS)
    }
}
