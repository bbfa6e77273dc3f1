//! Chaos-agent controllers and the assistant.
//!
//! Every chaos agent is an entity carrying a [`ChaosAgent`], a [`Steering`]
//! and an [`AgentBrain`]. The brain is a closed set of state machines, one
//! per archetype; the shared movement helpers live in [`steering`] and
//! [`wander`].

pub mod assistant;
pub mod blocker;
pub mod burster;
pub mod chaser;
pub mod freezer;
pub mod pinger;
pub mod steering;
pub mod wander;

use rand::rngs::StdRng;

use crate::config::GameConfig;
use crate::ecs::components::ChaosAgent;
use crate::events::EventBus;
use crate::game::departments::Departments;
use crate::game::stress::StressEngine;
use crate::game::task_manager::TaskManager;
use crate::game::tilemap::OfficeMap;
use crate::game::upgrades::AirPodsResistance;
use crate::protocol::{AgentKind, Disruption, GameEvent, Tier, Vec2};

use self::blocker::Blocker;
use self::burster::Burster;
use self::chaser::Chaser;
use self::freezer::Freezer;
use self::pinger::Pinger;
use self::steering::{effective_speed, steer, SteerOutcome, Steering};

/// A change an agent wants made to the player. Collected during the agent
/// pass and applied afterwards, once the agents' borrows are released.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEffect {
    SetSlow { key: String, factor: f32 },
    ClearSlow { key: String },
    Freeze { duration_ms: u64, immunity_ms: u64 },
}

/// Everything an agent may read or write during its tick.
pub struct AgentContext<'a> {
    pub now_ms: u64,
    pub dt_ms: f32,
    pub player_pos: Vec2,
    pub player_tier: Tier,
    pub player_frozen: bool,
    pub player_immune: bool,
    pub resistance: AirPodsResistance,
    pub meeting_blocker: bool,
    pub do_not_disturb: bool,
    pub executive_presence: bool,
    pub config: &'a GameConfig,
    pub map: &'a OfficeMap,
    pub rng: &'a mut StdRng,
    pub bus: &'a mut EventBus,
    pub tasks: &'a mut TaskManager,
    pub departments: &'a mut Departments,
    pub stress: &'a mut StressEngine,
    pub effects: Vec<PlayerEffect>,
}

/// One agent's mutable body for the duration of its tick.
pub struct Body<'b> {
    pub agent: &'b ChaosAgent,
    pub steering: &'b mut Steering,
    pub pos: Vec2,
    pub vel: Vec2,
}

impl Body<'_> {
    pub fn speed(&self, base: f32, ctx: &AgentContext<'_>) -> f32 {
        effective_speed(
            base,
            ctx.executive_presence,
            ctx.config.upgrades.executive_presence_factor,
        )
    }

    /// One step toward the steering target.
    pub fn seek_step(&mut self, base_speed: f32, ctx: &mut AgentContext<'_>) -> SteerOutcome {
        let speed = self.speed(base_speed, ctx);
        steer(
            self.steering,
            &mut self.pos,
            &mut self.vel,
            speed,
            ctx.dt_ms,
            ctx.map,
            &ctx.config.agents.steering,
            &mut *ctx.rng,
        )
    }

    pub fn wander_step(&mut self, wander: &mut wander::Wander, base_speed: f32, ctx: &mut AgentContext<'_>) {
        let speed = self.speed(base_speed, ctx);
        self.vel = wander.step(
            &mut self.pos,
            ctx.player_pos,
            speed,
            ctx.dt_ms,
            ctx.map,
            &ctx.config.agents.steering,
            &mut *ctx.rng,
        );
    }

    pub fn halt(&mut self) {
        self.vel = Vec2::ZERO;
    }

    pub fn distance_to_player(&self, ctx: &AgentContext<'_>) -> f32 {
        self.pos.distance(ctx.player_pos)
    }

    pub fn disrupt(&self, disruption: Disruption, ctx: &mut AgentContext<'_>) {
        ctx.bus.publish(GameEvent::AgentDisruption {
            agent_id: self.agent.id,
            kind: self.agent.kind,
            disruption,
        });
    }
}

/// Per-archetype state machine.
#[derive(Debug, Clone)]
pub enum AgentBrain {
    Chaser(Chaser),
    Burster(Burster),
    Blocker(Blocker),
    Freezer(Freezer),
    Pinger(Pinger),
}

impl AgentBrain {
    pub fn for_kind(kind: AgentKind) -> Self {
        match kind {
            AgentKind::Micromanager => AgentBrain::Chaser(Chaser::default()),
            AgentKind::ReplyAllGuy => AgentBrain::Burster(Burster::default()),
            AgentKind::MeetingScheduler => AgentBrain::Blocker(Blocker::default()),
            AgentKind::ChattyColleague => AgentBrain::Freezer(Freezer::default()),
            AgentKind::SlackPinger => AgentBrain::Pinger(Pinger::default()),
        }
    }

    pub fn tick(&mut self, body: &mut Body<'_>, ctx: &mut AgentContext<'_>) {
        match self {
            AgentBrain::Chaser(b) => b.tick(body, ctx),
            AgentBrain::Burster(b) => b.tick(body, ctx),
            AgentBrain::Blocker(b) => b.tick(body, ctx),
            AgentBrain::Freezer(b) => b.tick(body, ctx),
            AgentBrain::Pinger(b) => b.tick(body, ctx),
        }
    }

    pub fn state_label(&self) -> &'static str {
        match self {
            AgentBrain::Chaser(b) => b.state_label(),
            AgentBrain::Burster(b) => b.state_label(),
            AgentBrain::Blocker(b) => b.state_label(),
            AgentBrain::Freezer(b) => b.state_label(),
            AgentBrain::Pinger(b) => b.state_label(),
        }
    }

    /// Undoes any lingering effect on the player; used on teardown.
    pub fn release(&mut self, agent: &ChaosAgent) -> Option<PlayerEffect> {
        match self {
            AgentBrain::Chaser(b) => b.release(agent),
            _ => None,
        }
    }
}
