use tracing::info;

use crate::config::ProgressionConfig;
use crate::events::{EventBus, SubscriberId, SubscriptionId};
use crate::protocol::{GameEvent, Tier, Topic};

/// What one batch of XP unlocked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressionReport {
    pub level_ups: u32,
    pub milestones: u32,
}

/// Level and tier ladder, plus post-CEO milestones.
#[derive(Debug)]
pub struct Progression {
    config: ProgressionConfig,
    owner: SubscriberId,
    deliveries: SubscriptionId,
    level: u32,
    tier: Tier,
    total_xp: u64,
    current_xp: u32,
    post_ceo_xp: u32,
    milestone_count: u32,
}

impl Progression {
    /// Subscribes to deliveries; XP is collected from the bus each tick.
    pub fn new(config: ProgressionConfig, bus: &mut EventBus) -> Self {
        let owner = bus.register("progression");
        let deliveries = bus.subscribe(owner, &[Topic::TaskDelivered]);
        Self {
            config,
            owner,
            deliveries,
            level: 1,
            tier: Tier::Intern,
            total_xp: 0,
            current_xp: 0,
            post_ceo_xp: 0,
            milestone_count: 0,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn total_xp(&self) -> u64 {
        self.total_xp
    }

    pub fn milestone_count(&self) -> u32 {
        self.milestone_count
    }

    pub fn at_cap(&self) -> bool {
        self.level >= self.config.max_level
    }

    /// Cumulative XP multiplier bonus from milestones.
    pub fn milestone_bonus(&self) -> f32 {
        (self.milestone_count as f32 * self.config.milestone_bonus).min(self.config.milestone_bonus_cap)
    }

    pub fn milestone_threshold(&self) -> u32 {
        self.config.milestone_base + self.milestone_count * self.config.milestone_step
    }

    /// XP needed for the next level, or the next milestone at the cap.
    pub fn next_threshold(&self) -> u32 {
        if self.at_cap() {
            self.milestone_threshold()
        } else {
            self.config
                .xp_costs
                .get((self.level - 1) as usize)
                .copied()
                .unwrap_or(u32::MAX)
        }
    }

    pub fn progress(&self) -> u32 {
        if self.at_cap() {
            self.post_ceo_xp
        } else {
            self.current_xp
        }
    }

    /// Credits XP from every delivery published since the last call.
    pub fn consume_deliveries(&mut self, bus: &mut EventBus) -> ProgressionReport {
        let mut report = ProgressionReport::default();
        for envelope in bus.drain(self.deliveries) {
            if let GameEvent::TaskDelivered { xp, .. } = envelope.event {
                let r = self.add_xp(xp, bus);
                report.level_ups += r.level_ups;
                report.milestones += r.milestones;
            }
        }
        report
    }

    /// Adds XP, resolving every level-up and milestone it unlocks before
    /// reporting the new progress.
    pub fn add_xp(&mut self, amount: u32, bus: &mut EventBus) -> ProgressionReport {
        let mut report = ProgressionReport::default();
        self.total_xp += amount as u64;

        if self.at_cap() {
            self.post_ceo_xp += amount;
        } else {
            self.current_xp += amount;
            while !self.at_cap() && self.current_xp >= self.next_threshold() {
                self.current_xp -= self.next_threshold();
                self.level_up(bus);
                report.level_ups += 1;
            }
            if self.at_cap() {
                self.post_ceo_xp += std::mem::take(&mut self.current_xp);
            }
        }

        if self.at_cap() {
            while self.post_ceo_xp >= self.milestone_threshold() {
                self.post_ceo_xp -= self.milestone_threshold();
                self.milestone_count += 1;
                report.milestones += 1;
                bus.publish(GameEvent::CeoMilestone {
                    milestone_count: self.milestone_count,
                });
                bus.publish(GameEvent::MilestoneBonus {
                    xp_multiplier_bonus: self.milestone_bonus(),
                });
                info!("CEO milestone {} reached", self.milestone_count);
            }
        }

        bus.publish(GameEvent::XpGained {
            amount,
            total_xp: self.total_xp,
            progress: self.progress(),
            threshold: self.next_threshold(),
            level: self.level,
            at_cap: self.at_cap(),
        });
        report
    }

    fn level_up(&mut self, bus: &mut EventBus) {
        let previous_tier = self.tier;
        self.level += 1;
        self.tier = Tier::for_level(self.level);
        let is_promotion = self.tier != previous_tier;
        bus.publish(GameEvent::LevelUp {
            level: self.level,
            tier: self.tier,
            previous_tier,
            is_promotion,
        });
        if is_promotion {
            info!("Promoted to {} (level {})", self.tier.name(), self.level);
        } else {
            info!("Level up: {}", self.level);
        }
    }

    pub fn teardown(&mut self, bus: &mut EventBus) {
        bus.sweep(self.owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> (Progression, EventBus) {
        let mut bus = EventBus::new();
        let progression = Progression::new(ProgressionConfig::default(), &mut bus);
        (progression, bus)
    }

    #[test]
    fn level_up_precedes_xp_gained() {
        let (mut p, mut bus) = fresh();
        let report = p.add_xp(85, &mut bus);
        assert_eq!(report.level_ups, 1);
        assert_eq!(p.level(), 2);
        assert_eq!(p.progress(), 5);

        let topics: Vec<Topic> = bus.take_outbound().iter().map(|e| e.event.topic()).collect();
        assert_eq!(topics, vec![Topic::LevelUp, Topic::XpGained]);
    }

    #[test]
    fn promotions_follow_the_tier_ladder() {
        let (mut p, mut bus) = fresh();
        // 80 + 120 reaches level 3.
        p.add_xp(200, &mut bus);
        let level_ups: Vec<GameEvent> = bus
            .take_outbound()
            .into_iter()
            .map(|e| e.event)
            .filter(|e| e.topic() == Topic::LevelUp)
            .collect();
        assert_eq!(
            level_ups,
            vec![
                GameEvent::LevelUp {
                    level: 2,
                    tier: Tier::Intern,
                    previous_tier: Tier::Intern,
                    is_promotion: false
                },
                GameEvent::LevelUp {
                    level: 3,
                    tier: Tier::Associate,
                    previous_tier: Tier::Intern,
                    is_promotion: true
                },
            ]
        );
    }

    #[test]
    fn overflow_past_ceo_feeds_milestones() {
        let (mut p, mut bus) = fresh();
        let to_ceo: u32 = ProgressionConfig::default().xp_costs.iter().sum();
        let report = p.add_xp(to_ceo + 499, &mut bus);
        assert_eq!(report.level_ups, 8);
        assert_eq!(p.tier(), Tier::Ceo);
        assert_eq!(p.milestone_count(), 0);
        assert_eq!(p.progress(), 499);

        let report = p.add_xp(1 + 700 + 900, &mut bus);
        assert_eq!(report.milestones, 3);
        assert_eq!(p.milestone_count(), 3);
        assert_eq!(p.progress(), 0);
        assert_eq!(p.next_threshold(), 1100);
    }

    #[test]
    fn milestone_bonus_is_capped() {
        let (mut p, mut bus) = fresh();
        p.add_xp(100_000, &mut bus);
        assert!(p.milestone_count() > 3);
        assert!((p.milestone_bonus() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn deliveries_are_credited_from_the_bus() {
        let (mut p, mut bus) = fresh();
        bus.publish(GameEvent::TaskDelivered {
            task_id: 0,
            name: "Coffee Order".into(),
            department: crate::protocol::DepartmentId::Marketing,
            total_stops: 1,
            xp: 20,
            stress_relief: 5.0,
            carrier: crate::protocol::Carrier::Player,
            forced: false,
            is_junk: false,
        });
        p.consume_deliveries(&mut bus);
        assert_eq!(p.total_xp(), 20);
        p.consume_deliveries(&mut bus);
        assert_eq!(p.total_xp(), 20);
    }
}
