use tracing::debug;

use super::wander::Wander;
use super::{AgentContext, Body, PlayerEffect};
use crate::protocol::Disruption;

/// Chatty Colleague: wanders until it bumps into the player, then talks
/// their ear off.
#[derive(Debug, Clone, Default)]
pub struct Freezer {
    wander: Wander,
    cooldown_ms: f32,
}

impl Freezer {
    pub fn tick(&mut self, body: &mut Body<'_>, ctx: &mut AgentContext<'_>) {
        let cfg = ctx.config.agents.chatty.clone();
        body.wander_step(&mut self.wander, cfg.speed, ctx);
        self.cooldown_ms = (self.cooldown_ms - ctx.dt_ms).max(0.0);

        if self.cooldown_ms > 0.0
            || ctx.player_frozen
            || ctx.player_immune
            || body.distance_to_player(ctx) > cfg.trigger_range
        {
            return;
        }

        let (base_ms, cooldown_ms) = if body.agent.enraged {
            (cfg.enraged_freeze_ms, cfg.enraged_cooldown_ms)
        } else {
            (cfg.freeze_ms, cfg.cooldown_ms)
        };
        self.cooldown_ms = cooldown_ms;

        let duration_ms = (base_ms as f32 * (1.0 - ctx.resistance.freeze_reduction)).max(0.0) as u64;
        if duration_ms < cfg.min_freeze_ms {
            debug!("Chatty Colleague {} shrugged off", body.agent.id);
            return;
        }

        ctx.effects.push(PlayerEffect::Freeze {
            duration_ms,
            immunity_ms: cfg.immunity_ms,
        });
        ctx.player_frozen = true;
        body.disrupt(Disruption::Frozen { duration_ms }, ctx);
    }

    pub fn state_label(&self) -> &'static str {
        if self.cooldown_ms > 0.0 {
            "cooldown"
        } else {
            "wandering"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::steering::Steering;
    use crate::ai::test_support::{agent, Harness};
    use crate::ecs::components::ChaosAgent;
    use crate::game::upgrades::AirPodsResistance;
    use crate::protocol::{AgentKind, Vec2};

    fn bump(h: &mut Harness, freezer: &mut Freezer, me: &ChaosAgent, reduction: f32, frozen: bool) -> Vec<PlayerEffect> {
        let mut steering = Steering::default();
        let mut body = Body {
            agent: me,
            steering: &mut steering,
            pos: h.player_pos,
            vel: Vec2::ZERO,
        };
        let mut ctx = h.ctx(16.0);
        ctx.player_frozen = frozen;
        ctx.resistance = AirPodsResistance {
            freeze_reduction: reduction,
            slow_resistance: 0.0,
        };
        freezer.tick(&mut body, &mut ctx);
        ctx.effects
    }

    #[test]
    fn contact_freezes_then_cools_down() {
        let mut h = Harness::new();
        let me = agent(8, AgentKind::ChattyColleague);
        let mut freezer = Freezer::default();
        assert_eq!(
            bump(&mut h, &mut freezer, &me, 0.0, false),
            vec![PlayerEffect::Freeze {
                duration_ms: 2500,
                immunity_ms: 2000
            }]
        );
        assert_eq!(freezer.state_label(), "cooldown");
        assert!(bump(&mut h, &mut freezer, &me, 0.0, false).is_empty());
    }

    #[test]
    fn airpods_shorten_the_chat() {
        let mut h = Harness::new();
        let mut me = agent(8, AgentKind::ChattyColleague);
        me.enraged = true;
        let mut freezer = Freezer::default();
        assert_eq!(
            bump(&mut h, &mut freezer, &me, 0.5, false),
            vec![PlayerEffect::Freeze {
                duration_ms: 1750,
                immunity_ms: 2000
            }]
        );
    }

    #[test]
    fn near_total_reduction_skips_the_freeze() {
        let mut h = Harness::new();
        let me = agent(8, AgentKind::ChattyColleague);
        let mut freezer = Freezer::default();
        assert!(bump(&mut h, &mut freezer, &me, 0.97, false).is_empty());
    }

    #[test]
    fn already_frozen_player_is_left_alone() {
        let mut h = Harness::new();
        let me = agent(8, AgentKind::ChattyColleague);
        let mut freezer = Freezer::default();
        assert!(bump(&mut h, &mut freezer, &me, 0.0, true).is_empty());
        assert_eq!(freezer.state_label(), "wandering");
    }
}
