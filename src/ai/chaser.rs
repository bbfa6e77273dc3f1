use tracing::debug;

use super::steering::SteerOutcome;
use super::{AgentContext, Body, PlayerEffect};
use crate::ecs::components::ChaosAgent;
use crate::protocol::Disruption;

/// Micromanager: follows the player and hovers, slowing them and adding
/// stress while close.
#[derive(Debug, Clone, Default)]
pub struct Chaser {
    slowing: bool,
}

pub fn slow_key(agent: &ChaosAgent) -> String {
    format!("micromanager-{}", agent.id)
}

impl Chaser {
    pub fn tick(&mut self, body: &mut Body<'_>, ctx: &mut AgentContext<'_>) {
        let cfg = &ctx.config.agents.micromanager;
        let (speed, base_range, enraged_range, slow_factor) = (cfg.speed, cfg.range, cfg.enraged_range, cfg.slow_factor);
        let stress_rate = if body.agent.enraged {
            cfg.enraged_stress_per_sec
        } else {
            cfg.stress_per_sec
        };

        body.steering.retarget(ctx.player_pos);
        if body.seek_step(speed, ctx) == SteerOutcome::Stuck {
            body.steering.seek(ctx.player_pos);
        }

        let range = if body.agent.enraged { enraged_range } else { base_range };
        let resistance = ctx.resistance.slow_resistance;
        let hovering = body.distance_to_player(ctx) <= range && resistance < 1.0;

        if hovering {
            let factor = slow_factor + resistance * (1.0 - slow_factor);
            ctx.effects.push(PlayerEffect::SetSlow {
                key: slow_key(body.agent),
                factor,
            });
            ctx.stress.add_continuous(stress_rate * ctx.dt_ms / 1000.0, ctx.bus);
            if !self.slowing {
                self.slowing = true;
                debug!("Micromanager {} is hovering", body.agent.id);
                body.disrupt(Disruption::Slowed { factor }, ctx);
            }
        } else if self.slowing {
            self.slowing = false;
            ctx.effects.push(PlayerEffect::ClearSlow {
                key: slow_key(body.agent),
            });
        }
    }

    pub fn state_label(&self) -> &'static str {
        if self.slowing {
            "hovering"
        } else {
            "chasing"
        }
    }

    pub fn release(&mut self, agent: &ChaosAgent) -> Option<PlayerEffect> {
        std::mem::take(&mut self.slowing).then(|| PlayerEffect::ClearSlow { key: slow_key(agent) })
    }
}
