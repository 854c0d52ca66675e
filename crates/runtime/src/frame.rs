/// Stamp for one render-loop tick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based tick number.
    pub index: u64,
    /// Session time at the start of the tick (seconds).
    pub time_s: f64,
}

/// Hands out frames at a fixed step, so replaying the same ticks stamps
/// events identically regardless of wall-clock time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameClock {
    step_s: f64,
    ticks: u64,
}

impl FrameClock {
    pub fn new(step_s: f64) -> Self {
        Self { step_s, ticks: 0 }
    }

    pub fn tick(&mut self) -> Frame {
        let frame = Frame {
            index: self.ticks,
            time_s: self.ticks as f64 * self.step_s,
        };
        self.ticks += 1;
        frame
    }

    /// Frames handed out so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
