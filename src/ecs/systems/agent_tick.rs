use hecs::World;
use tracing::info;

use crate::ai::steering::Steering;
use crate::ai::{AgentBrain, AgentContext, Body, PlayerEffect};
use crate::ecs::components::{ChaosAgent, Position, Velocity};
use crate::protocol::{AgentSnapshot, GameEvent, Vec2};

/// Result of the agent tick system -- what the agents want done to the player.
pub struct AgentTickResult {
    pub effects: Vec<PlayerEffect>,
    pub enraged: u32,
}

/// Tick every chaos agent: flip enrage flags whose time has come, then run
/// each brain once.
pub fn agent_tick_system(world: &mut World, ctx: &mut AgentContext<'_>) -> AgentTickResult {
    let mut enraged = 0;

    // Phase 1: Enrage agents whose delay has elapsed
    for (_id, agent) in world.query_mut::<&mut ChaosAgent>() {
        if !agent.enraged && ctx.now_ms >= agent.enrage_at_ms {
            agent.enraged = true;
            enraged += 1;
            ctx.bus.publish(GameEvent::AgentEnraged {
                agent_id: agent.id,
                kind: agent.kind,
            });
            info!("{} {} is enraged", agent.kind.name(), agent.id);
        }
    }

    // Phase 2: Run each brain against its body
    for (_id, (agent, pos, vel, steering, brain)) in
        world.query_mut::<(&ChaosAgent, &mut Position, &mut Velocity, &mut Steering, &mut AgentBrain)>()
    {
        let mut body = Body {
            agent,
            steering,
            pos: pos.vec(),
            vel: vel.vec(),
        };
        brain.tick(&mut body, ctx);
        pos.set(body.pos);
        vel.set(body.vel);
    }

    AgentTickResult {
        effects: std::mem::take(&mut ctx.effects),
        enraged,
    }
}

/// Lingering player effects of every agent, for teardown.
pub fn release_all(world: &mut World) -> Vec<PlayerEffect> {
    world
        .query_mut::<(&ChaosAgent, &mut AgentBrain)>()
        .into_iter()
        .filter_map(|(_id, (agent, brain))| brain.release(agent))
        .collect()
}

pub fn agent_snapshots(world: &World) -> Vec<AgentSnapshot> {
    let mut agents: Vec<AgentSnapshot> = world
        .query::<(&ChaosAgent, &Position, &AgentBrain)>()
        .iter()
        .map(|(_id, (agent, pos, brain))| AgentSnapshot {
            id: agent.id,
            kind: agent.kind,
            position: pos.vec(),
            state: brain.state_label().to_string(),
            enraged: agent.enraged,
        })
        .collect();
    agents.sort_by_key(|a| a.id);
    agents
}

pub fn agent_positions(world: &World) -> Vec<Vec2> {
    world
        .query::<(&ChaosAgent, &Position)>()
        .iter()
        .map(|(_id, (_agent, pos))| pos.vec())
        .collect()
}
