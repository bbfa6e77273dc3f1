/// Monotonic simulation clock. Only advances through [`SimClock::advance`],
/// so a paused simulation keeps its time frozen.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_ms: u64,
    tick: u64,
    /// Sub-millisecond remainder carried between ticks.
    fractional_ms: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward by `dt_ms` (negative or NaN deltas are ignored) and
    /// returns the whole milliseconds actually added.
    pub fn advance(&mut self, dt_ms: f64) -> u64 {
        self.tick += 1;
        if !(dt_ms > 0.0) {
            return 0;
        }
        self.fractional_ms += dt_ms;
        let whole = self.fractional_ms.floor();
        self.fractional_ms -= whole;
        let whole = whole as u64;
        self.now_ms += whole;
        whole
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.now_ms as f32 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_steps_accumulate() {
        let mut clock = SimClock::new();
        for _ in 0..3 {
            clock.advance(16.5);
        }
        // 49.5 ms elapsed, 49 whole
        assert_eq!(clock.now_ms(), 49);
        assert_eq!(clock.tick(), 3);
        clock.advance(0.5);
        assert_eq!(clock.now_ms(), 50);
    }

    #[test]
    fn negative_delta_does_not_rewind() {
        let mut clock = SimClock::new();
        clock.advance(100.0);
        assert_eq!(clock.advance(-50.0), 0);
        assert_eq!(clock.advance(f64::NAN), 0);
        assert_eq!(clock.now_ms(), 100);
    }
}
