use tracing::debug;

use super::wander::Wander;
use super::{AgentContext, Body};
use crate::protocol::Disruption;

/// Slack Pinger: wanders, drops decoy tasks on a timer and radiates stress
/// around itself. Do Not Disturb silences both.
#[derive(Debug, Clone, Default)]
pub struct Pinger {
    wander: Wander,
    since_decoy_ms: f32,
}

impl Pinger {
    pub fn tick(&mut self, body: &mut Body<'_>, ctx: &mut AgentContext<'_>) {
        let cfg = ctx.config.agents.slack.clone();
        body.wander_step(&mut self.wander, cfg.speed, ctx);

        if ctx.do_not_disturb {
            self.since_decoy_ms = 0.0;
            return;
        }

        let (interval, range) = if body.agent.enraged {
            (cfg.enraged_decoy_interval_ms, cfg.enraged_aura_range)
        } else {
            (cfg.decoy_interval_ms, cfg.aura_range)
        };

        self.since_decoy_ms += ctx.dt_ms;
        if self.since_decoy_ms >= interval {
            self.since_decoy_ms = 0.0;
            match ctx.tasks.spawn_decoy(ctx.now_ms, &mut *ctx.rng, ctx.bus) {
                Some(task_id) => body.disrupt(Disruption::DecoySpawned { task_id }, ctx),
                None => debug!("Slack Pinger {} found no room for a decoy", body.agent.id),
            }
        }

        if body.distance_to_player(ctx) <= range {
            ctx.stress
                .add_continuous(cfg.aura_stress_per_sec * ctx.dt_ms / 1000.0, ctx.bus);
        }
    }

    pub fn state_label(&self) -> &'static str {
        "wandering"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::steering::Steering;
    use crate::ai::test_support::{agent, Harness};
    use crate::protocol::{AgentKind, GameEvent, Vec2};

    /// Runs the pinger at a fixed offset from the player and returns how many
    /// decoys it dropped.
    fn run(h: &mut Harness, pinger: &mut Pinger, ms: u32, dnd: bool, offset: Vec2) -> usize {
        let me = agent(9, AgentKind::SlackPinger);
        let mut steering = Steering::default();
        for _ in 0..ms / 100 {
            let mut body = Body {
                agent: &me,
                steering: &mut steering,
                pos: h.player_pos + offset,
                vel: Vec2::ZERO,
            };
            let mut ctx = h.ctx(100.0);
            ctx.do_not_disturb = dnd;
            pinger.tick(&mut body, &mut ctx);
        }
        h.bus
            .take_outbound()
            .iter()
            .filter(|e| matches!(&e.event, GameEvent::TaskSpawned { task } if task.is_decoy))
            .count()
    }

    #[test]
    fn drops_a_decoy_every_interval() {
        let mut h = Harness::new();
        let mut pinger = Pinger::default();
        assert_eq!(run(&mut h, &mut pinger, 10_000, false, Vec2::new(400.0, 0.0)), 2);
    }

    #[test]
    fn aura_adds_stress_nearby() {
        let mut h = Harness::new();
        let mut pinger = Pinger::default();
        run(&mut h, &mut pinger, 1000, false, Vec2::new(20.0, 0.0));
        assert!((h.stress.current() - 0.8).abs() < 1e-3);
    }

    #[test]
    fn do_not_disturb_silences_everything() {
        let mut h = Harness::new();
        let mut pinger = Pinger::default();
        assert_eq!(run(&mut h, &mut pinger, 10_000, true, Vec2::new(20.0, 0.0)), 0);
        assert_eq!(h.stress.current(), 0.0);
    }
}
