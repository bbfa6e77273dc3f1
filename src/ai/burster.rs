use rand::seq::SliceRandom;
use tracing::debug;

use super::steering::SteerOutcome;
use super::{AgentContext, Body};
use crate::protocol::Disruption;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum BursterState {
    #[default]
    Picking,
    Traveling,
    Pausing { remaining_ms: f32 },
    Cooldown { remaining_ms: f32 },
}

/// Reply-All Guy: walks to furniture near the player, pauses, then floods
/// the floor with junk tasks.
#[derive(Debug, Clone, Default)]
pub struct Burster {
    pub state: BursterState,
}

impl Burster {
    pub fn tick(&mut self, body: &mut Body<'_>, ctx: &mut AgentContext<'_>) {
        let cfg = ctx.config.agents.reply_all.clone();
        match self.state {
            BursterState::Picking => {
                let candidates = ctx.map.nearest_obstacles(ctx.player_pos, cfg.obstacle_candidates);
                match candidates.choose(&mut *ctx.rng) {
                    Some(obstacle) => {
                        body.steering.seek(ctx.map.standing_point(obstacle));
                        self.state = BursterState::Traveling;
                    }
                    None => {
                        self.state = BursterState::Pausing {
                            remaining_ms: cfg.pause_ms,
                        }
                    }
                }
                body.halt();
            }
            BursterState::Traveling => match body.seek_step(cfg.speed, ctx) {
                SteerOutcome::Arrived | SteerOutcome::NoTarget => {
                    self.state = BursterState::Pausing {
                        remaining_ms: cfg.pause_ms,
                    };
                }
                SteerOutcome::Stuck => {
                    debug!("Reply-All Guy {} stuck; picking another desk", body.agent.id);
                    self.state = BursterState::Picking;
                }
                _ => {}
            },
            BursterState::Pausing { remaining_ms } => {
                body.halt();
                let remaining_ms = remaining_ms - ctx.dt_ms;
                if remaining_ms > 0.0 {
                    self.state = BursterState::Pausing { remaining_ms };
                } else {
                    self.burst(body, ctx);
                    self.state = BursterState::Cooldown {
                        remaining_ms: cfg.cooldown_ms,
                    };
                }
            }
            BursterState::Cooldown { remaining_ms } => {
                body.halt();
                let remaining_ms = remaining_ms - ctx.dt_ms;
                self.state = if remaining_ms > 0.0 {
                    BursterState::Cooldown { remaining_ms }
                } else {
                    BursterState::Picking
                };
            }
        }
    }

    fn burst(&mut self, body: &Body<'_>, ctx: &mut AgentContext<'_>) {
        let cfg = &ctx.config.agents.reply_all;
        let count = if body.agent.enraged {
            cfg.enraged_burst_count
        } else {
            cfg.burst_count
        };
        let min_distance = cfg.min_player_distance;

        let mut spawned = 0;
        for _ in 0..count {
            let id = ctx.tasks.spawn_junk(
                ctx.now_ms,
                ctx.player_tier,
                ctx.player_pos,
                min_distance,
                &mut *ctx.rng,
                ctx.bus,
            );
            if id.is_some() {
                spawned += 1;
            }
        }
        debug!("Reply-All burst: {}/{} junk tasks", spawned, count);
        body.disrupt(Disruption::Burst { count: spawned }, ctx);
    }

    pub fn state_label(&self) -> &'static str {
        match self.state {
            BursterState::Picking => "picking",
            BursterState::Traveling => "traveling",
            BursterState::Pausing { .. } => "pausing",
            BursterState::Cooldown { .. } => "cooldown",
        }
    }
}
