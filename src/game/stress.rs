use std::collections::VecDeque;

use tracing::{debug, info};

use crate::config::StressConfig;
use crate::events::EventBus;
use crate::protocol::{GameEvent, StressBand, StressSource, Tick, Tier};

pub const MAX_STRESS: f32 = 100.0;

/// Continuous changes smaller than this are folded into the next report.
const REPORT_STEP: f32 = 0.1;

/// The stress gauge: accumulation from outstanding work, instant hits,
/// passive decay, band tracking and the one-shot max trigger.
#[derive(Debug, Clone)]
pub struct StressEngine {
    config: StressConfig,
    current: f32,
    peak: f32,
    band: StressBand,
    expiry_log: VecDeque<(u64, f32)>,
    maxed_at: Option<Tick>,
    last_reported: f32,
}

impl StressEngine {
    pub fn new(config: StressConfig) -> Self {
        Self {
            config,
            current: 0.0,
            peak: 0.0,
            band: StressBand::None,
            expiry_log: VecDeque::new(),
            maxed_at: None,
            last_reported: 0.0,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    pub fn band(&self) -> StressBand {
        self.band
    }

    /// True once `stress-max` has fired. It never fires twice.
    pub fn is_maxed(&self) -> bool {
        self.maxed_at.is_some()
    }

    pub fn band_for(&self, stress: f32) -> StressBand {
        if stress >= self.config.red {
            StressBand::Red
        } else if stress >= self.config.orange {
            StressBand::Orange
        } else if stress >= self.config.yellow {
            StressBand::Yellow
        } else {
            StressBand::None
        }
    }

    /// Per-tick accumulation and decay. `units` is tasks on the map plus
    /// stops still owed on carried tasks.
    pub fn update(&mut self, dt_ms: f32, units: u32, tier: Tier, stress_ball: bool, bus: &mut EventBus) {
        let dt = dt_ms / 1000.0;
        let rate = self.config.rates[tier.index()];
        self.current = (self.current + rate * units as f32 * dt).clamp(0.0, MAX_STRESS);
        self.check_max(bus);

        let maxed_this_tick = self.maxed_at == Some(bus.tick());
        if !maxed_this_tick && self.current > self.config.decay_threshold {
            let bonus = if stress_ball { self.config.stress_ball_bonus } else { 0.0 };
            self.current = (self.current - (self.config.decay_rate + bonus) * dt).max(0.0);
        }

        self.peak = self.peak.max(self.current);
        self.update_band(bus);
        self.report_drift(bus);
    }

    /// Adds a one-off amount. Expiry penalties are capped per rolling
    /// window; the returned value is what was actually added.
    pub fn add_instant(&mut self, amount: f32, source: StressSource, bus: &mut EventBus) -> f32 {
        let mut amount = amount.max(0.0);
        if source == StressSource::TaskExpiry {
            let now = bus.now_ms();
            let window = self.config.expiry_window_ms;
            while self.expiry_log.front().is_some_and(|(at, _)| at + window <= now) {
                self.expiry_log.pop_front();
            }
            let used: f32 = self.expiry_log.iter().map(|(_, a)| a).sum();
            let headroom = (self.config.expiry_cap - used).max(0.0);
            if amount > headroom {
                debug!("Expiry stress capped: {:.2} -> {:.2}", amount, headroom);
                amount = headroom;
            }
            if amount > 0.0 {
                self.expiry_log.push_back((now, amount));
            }
        }
        if amount > 0.0 {
            self.apply(amount, source, bus);
        }
        amount
    }

    pub fn relieve(&mut self, amount: f32, source: StressSource, bus: &mut EventBus) {
        if amount > 0.0 {
            self.apply(-amount, source, bus);
        }
    }

    /// Continuous contribution (agent auras and hovering). Reported in
    /// aggregate rather than per call.
    pub fn add_continuous(&mut self, amount: f32, bus: &mut EventBus) {
        if amount <= 0.0 {
            return;
        }
        self.current = (self.current + amount).min(MAX_STRESS);
        self.peak = self.peak.max(self.current);
        self.check_max(bus);
        self.update_band(bus);
    }

    pub fn set(&mut self, value: f32, bus: &mut EventBus) {
        let target = value.clamp(0.0, MAX_STRESS);
        self.apply(target - self.current, StressSource::Debug, bus);
    }

    fn apply(&mut self, delta: f32, source: StressSource, bus: &mut EventBus) {
        let before = self.current;
        self.current = (self.current + delta).clamp(0.0, MAX_STRESS);
        self.peak = self.peak.max(self.current);
        self.last_reported = self.current;
        bus.publish(GameEvent::StressChanged {
            stress: self.current,
            delta: self.current - before,
            source: Some(source),
        });
        self.check_max(bus);
        self.update_band(bus);
    }

    fn check_max(&mut self, bus: &mut EventBus) {
        if self.current >= MAX_STRESS && self.maxed_at.is_none() {
            self.maxed_at = Some(bus.tick());
            bus.publish(GameEvent::StressMax { stress: self.current });
            info!("Stress maxed out");
        }
    }

    fn update_band(&mut self, bus: &mut EventBus) {
        let band = self.band_for(self.current);
        if band != self.band {
            self.band = band;
            bus.publish(GameEvent::StressThreshold { level: band });
        }
    }

    fn report_drift(&mut self, bus: &mut EventBus) {
        let delta = self.current - self.last_reported;
        if delta.abs() >= REPORT_STEP {
            self.last_reported = self.current;
            bus.publish(GameEvent::StressChanged {
                stress: self.current,
                delta,
                source: None,
            });
        }
    }
}
