use std::time::{Duration, Instant};

/// High-level behaviour requested by the caller.
///
/// The render policy decides whether frames animate continuously or are
/// evaluated once at a fixed timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderPolicy {
    /// Run the render loop continuously, optionally clamping the frame rate.
    Animate {
        /// Optional requested frames-per-second cap.
        target_fps: Option<f32>,
    },
    /// Render a single still frame at an optional timestamp.
    Still {
        /// Specific timestamp to evaluate the gradient at (seconds).
        time: Option<f32>,
    },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate { target_fps: None }
    }
}

/// Snapshot of the animation clock for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in seconds.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    /// Creates a new time sample.
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    /// Creates a system time source initialised to `Instant::now()`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed();
        let sample = TimeSample::new(elapsed.as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports a fixed timestamp.
///
/// The frame counter still advances so consecutive frames stay distinguishable.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f32,
    frame: u64,
}

impl FixedTimeSource {
    /// Constructs a fixed time source that always returns the provided time.
    pub fn new(time: f32) -> Self {
        Self { time, frame: 0 }
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.time, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Builds a time source suited to the requested render policy.
pub fn time_source_for_policy(policy: &RenderPolicy) -> BoxedTimeSource {
    match policy {
        RenderPolicy::Animate { .. } => Box::new(SystemTimeSource::new()),
        RenderPolicy::Still { time } => Box::new(FixedTimeSource::new(time.unwrap_or(0.0))),
    }
}

/// Decides when the event loop should request the next redraw.
#[derive(Debug, Clone)]
pub struct FramePacer {
    policy: RenderPolicy,
    interval: Option<Duration>,
    last_frame: Option<Instant>,
    still_rendered: bool,
}

impl FramePacer {
    pub fn new(policy: RenderPolicy) -> Self {
        let interval = match policy {
            RenderPolicy::Animate {
                target_fps: Some(fps),
            } if fps.is_finite() && fps > 0.0 => Some(Duration::from_secs_f32(1.0 / fps)),
            _ => None,
        };
        Self {
            policy,
            interval,
            last_frame: None,
            still_rendered: false,
        }
    }

    pub fn policy(&self) -> RenderPolicy {
        self.policy
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match self.policy {
            RenderPolicy::Still { .. } => !self.still_rendered,
            RenderPolicy::Animate { .. } => match (self.interval, self.last_frame) {
                (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
                _ => true,
            },
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_frame = Some(now);
        self.still_rendered = true;
    }

    /// Forces one more frame even under a still policy, e.g. after input.
    pub fn invalidate(&mut self) {
        self.still_rendered = false;
        self.last_frame = None;
    }

    /// Earliest instant the next frame is due, if one is scheduled.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.policy {
            RenderPolicy::Still { .. } => None,
            RenderPolicy::Animate { .. } => {
                let interval = self.interval?;
                self.last_frame.map(|last| last + interval)
            }
        }
    }
}

/// Couples a [`FramePacer`] with the time source its policy calls for.
pub struct RenderPolicyDriver {
    pacer: FramePacer,
    time_source: BoxedTimeSource,
}

impl RenderPolicyDriver {
    pub fn new(policy: RenderPolicy) -> Self {
        Self {
            pacer: FramePacer::new(policy),
            time_source: time_source_for_policy(&policy),
        }
    }

    pub fn sample(&mut self) -> TimeSample {
        self.time_source.sample()
    }

    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    pub fn pacer_mut(&mut self) -> &mut FramePacer {
        &mut self.pacer
    }
}
