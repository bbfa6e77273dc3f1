use std::collections::BTreeMap;

use crate::config::PressureConfig;
use crate::protocol::{DepartmentId, PressureReason, Vec2};

/// Conditions sampled at the moment a delivery completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PressureInputs {
    pub agent_nearby: bool,
    pub stress: f32,
    pub hot_zone: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PressureBonus {
    pub bonus: f32,
    pub multiplier: f32,
    pub reasons: Vec<PressureReason>,
}

impl PressureBonus {
    pub fn none() -> Self {
        PressureBonus {
            bonus: 0.0,
            multiplier: 1.0,
            reasons: Vec::new(),
        }
    }
}

/// Sums the triggered contributors and caps the multiplier.
pub fn evaluate(cfg: &PressureConfig, inputs: PressureInputs) -> PressureBonus {
    let mut bonus = 0.0;
    let mut reasons = Vec::new();

    if inputs.agent_nearby {
        bonus += cfg.agent_bonus;
        reasons.push(PressureReason::UnderPressure);
    }
    if inputs.stress >= cfg.stress_threshold {
        bonus += cfg.stress_bonus;
        reasons.push(PressureReason::ClutchDelivery);
    }
    if inputs.hot_zone {
        bonus += cfg.hot_zone_bonus;
        reasons.push(PressureReason::HotZone);
    }

    PressureBonus {
        bonus,
        multiplier: (1.0 + bonus).min(cfg.max_multiplier),
        reasons,
    }
}

/// True if any of `agents` stands within the pressure radius of the player.
pub fn agent_within(cfg: &PressureConfig, player: Vec2, agents: impl IntoIterator<Item = Vec2>) -> bool {
    agents.into_iter().any(|a| a.distance(player) <= cfg.agent_radius)
}

/// Departments recently released from a meeting, with the time their bonus
/// window closes.
#[derive(Debug, Clone, Default)]
pub struct HotZones {
    until: BTreeMap<DepartmentId, u64>,
}

impl HotZones {
    pub fn record(&mut self, dept: DepartmentId, at_ms: u64, window_ms: u64) {
        self.until.insert(dept, at_ms + window_ms);
    }

    pub fn is_hot(&self, dept: DepartmentId, now_ms: u64) -> bool {
        self.until.get(&dept).is_some_and(|&until| now_ms <= until)
    }

    pub fn prune(&mut self, now_ms: u64) {
        self.until.retain(|_, until| *until >= now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_contributors_stack() {
        let cfg = PressureConfig::default();
        let result = evaluate(
            &cfg,
            PressureInputs {
                agent_nearby: true,
                stress: 70.0,
                hot_zone: true,
            },
        );
        assert_eq!(result.multiplier, 2.5);
        assert_eq!(
            result.reasons,
            vec![
                PressureReason::UnderPressure,
                PressureReason::ClutchDelivery,
                PressureReason::HotZone
            ]
        );
    }

    #[test]
    fn multiplier_is_capped() {
        let cfg = PressureConfig {
            agent_bonus: 1.5,
            stress_bonus: 0.5,
            hot_zone_bonus: 0.5,
            ..PressureConfig::default()
        };
        let result = evaluate(
            &cfg,
            PressureInputs {
                agent_nearby: true,
                stress: 90.0,
                hot_zone: true,
            },
        );
        assert_eq!(result.bonus, 2.5);
        assert_eq!(result.multiplier, 3.0);
    }

    #[test]
    fn calm_delivery_has_no_bonus() {
        let result = evaluate(&PressureConfig::default(), PressureInputs::default());
        assert_eq!(result, PressureBonus::none());
    }

    #[test]
    fn hot_zone_window_closes() {
        let mut zones = HotZones::default();
        zones.record(DepartmentId::Marketing, 300_000, 30_000);
        assert!(zones.is_hot(DepartmentId::Marketing, 305_000));
        assert!(zones.is_hot(DepartmentId::Marketing, 330_000));
        assert!(!zones.is_hot(DepartmentId::Marketing, 330_001));
        assert!(!zones.is_hot(DepartmentId::Hr, 305_000));
        zones.prune(400_000);
        assert!(!zones.is_hot(DepartmentId::Marketing, 305_000));
    }

    #[test]
    fn agent_radius_is_inclusive() {
        let cfg = PressureConfig::default();
        let player = Vec2::new(0.0, 0.0);
        assert!(agent_within(&cfg, player, [Vec2::new(100.0, 0.0)]));
        assert!(agent_within(&cfg, player, [Vec2::new(128.0, 0.0)]));
        assert!(!agent_within(&cfg, player, [Vec2::new(129.0, 0.0)]));
    }
}
