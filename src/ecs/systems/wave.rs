use std::collections::BTreeSet;

use hecs::World;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::ai::steering::Steering;
use crate::ai::AgentBrain;
use crate::config::{GameConfig, ScheduleEntry};
use crate::ecs::components::{ChaosAgent, Position, Velocity};
use crate::events::EventBus;
use crate::protocol::{AgentId, AgentKind, GameEvent, Vec2};

/// Conditions the schedule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct WaveInputs {
    pub now_ms: u64,
    pub elapsed_secs: f32,
    pub level: u32,
    pub player_pos: Vec2,
}

/// Introduces chaos agents as their time and level gates open, and tops
/// each type up to its maximum count once its scale-up time arrives.
#[derive(Debug)]
pub struct WaveManager {
    schedule: Vec<ScheduleEntry>,
    spawn_points: Vec<Vec2>,
    min_player_distance: f32,
    introduced: BTreeSet<AgentKind>,
    scaled: BTreeSet<AgentKind>,
    next_id: AgentId,
}

impl WaveManager {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            schedule: config.agents.schedule.clone(),
            spawn_points: config.map.spawn_points.clone(),
            min_player_distance: config.agents.spawn_min_player_distance,
            introduced: BTreeSet::new(),
            scaled: BTreeSet::new(),
            next_id: 1,
        }
    }

    pub fn is_introduced(&self, kind: AgentKind) -> bool {
        self.introduced.contains(&kind)
    }

    /// Evaluates the schedule. Returns the kinds spawned this call, once per
    /// agent.
    pub fn update(&mut self, world: &mut World, inputs: WaveInputs, rng: &mut StdRng, bus: &mut EventBus) -> Vec<AgentKind> {
        let mut spawned = Vec::new();
        let schedule = self.schedule.clone();

        for entry in &schedule {
            if !self.introduced.contains(&entry.kind) {
                if inputs.elapsed_secs >= entry.time_gate_secs && inputs.level >= entry.level_gate {
                    self.introduced.insert(entry.kind);
                    info!("Wave: introducing {}", entry.kind.name());
                    for _ in 0..entry.initial_count {
                        self.spawn_agent(world, entry, inputs, rng, bus);
                        spawned.push(entry.kind);
                    }
                }
                continue;
            }

            let Some(scale_at) = entry.max_count_time_secs else {
                continue;
            };
            if self.scaled.contains(&entry.kind) || inputs.elapsed_secs < scale_at {
                continue;
            }
            self.scaled.insert(entry.kind);
            let active = count_of(world, entry.kind);
            for _ in active..entry.max_count {
                self.spawn_agent(world, entry, inputs, rng, bus);
                spawned.push(entry.kind);
            }
            info!("Wave: {} scaled to {}", entry.kind.name(), entry.max_count.max(active));
        }
        spawned
    }

    /// Spawns one agent of `kind` outside the schedule. Unscheduled kinds are
    /// refused. The kind's scheduled introduction still happens later.
    pub fn force_spawn(
        &mut self,
        world: &mut World,
        kind: AgentKind,
        inputs: WaveInputs,
        rng: &mut StdRng,
        bus: &mut EventBus,
    ) -> Option<AgentId> {
        let Some(entry) = self.schedule.iter().find(|e| e.kind == kind).cloned() else {
            warn!("Schedule has no entry for {}; spawn ignored", kind.name());
            return None;
        };
        Some(self.spawn_agent(world, &entry, inputs, rng, bus))
    }

    fn spawn_point(&self, player: Vec2, rng: &mut StdRng) -> Vec2 {
        let far: Vec<Vec2> = self
            .spawn_points
            .iter()
            .copied()
            .filter(|p| p.distance(player) >= self.min_player_distance)
            .collect();
        if let Some(p) = far.choose(rng) {
            return *p;
        }
        // Every point is close; take the farthest.
        self.spawn_points
            .iter()
            .copied()
            .max_by(|a, b| a.distance(player).total_cmp(&b.distance(player)))
            .unwrap_or(player)
    }

    fn spawn_agent(
        &mut self,
        world: &mut World,
        entry: &ScheduleEntry,
        inputs: WaveInputs,
        rng: &mut StdRng,
        bus: &mut EventBus,
    ) -> AgentId {
        let id = self.next_id;
        self.next_id += 1;
        let at = self.spawn_point(inputs.player_pos, rng);

        world.spawn((
            ChaosAgent {
                id,
                kind: entry.kind,
                spawned_at_ms: inputs.now_ms,
                enrage_at_ms: inputs.now_ms + (entry.enrage_delay_secs * 1000.0) as u64,
                enraged: false,
            },
            Position::from(at),
            Velocity::default(),
            Steering::default(),
            AgentBrain::for_kind(entry.kind),
        ));
        bus.publish(GameEvent::AgentSpawned {
            agent_id: id,
            kind: entry.kind,
            position: at,
        });
        info!("Spawned {} #{} at ({:.0}, {:.0})", entry.kind.name(), id, at.x, at.y);
        id
    }
}

pub fn count_of(world: &World, kind: AgentKind) -> u32 {
    world
        .query::<&ChaosAgent>()
        .iter()
        .filter(|(_id, a)| a.kind == kind)
        .count() as u32
}

/// Distinct agent types currently on the floor, in declaration order.
pub fn active_kinds(world: &World) -> Vec<AgentKind> {
    let present: BTreeSet<AgentKind> = world.query::<&ChaosAgent>().iter().map(|(_id, a)| a.kind).collect();
    present.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn inputs(elapsed_secs: f32, level: u32) -> WaveInputs {
        WaveInputs {
            now_ms: (elapsed_secs * 1000.0) as u64,
            elapsed_secs,
            level,
            player_pos: Vec2::new(640.0, 480.0),
        }
    }

    #[test]
    fn both_gates_must_open() {
        let config = GameConfig::default();
        let mut waves = WaveManager::new(&config);
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut bus = EventBus::new();

        assert!(waves.update(&mut world, inputs(61.0, 1), &mut rng, &mut bus).is_empty());
        assert!(waves.update(&mut world, inputs(30.0, 2), &mut rng, &mut bus).is_empty());
        assert_eq!(
            waves.update(&mut world, inputs(61.0, 2), &mut rng, &mut bus),
            vec![AgentKind::Micromanager]
        );
        assert!(waves.update(&mut world, inputs(62.0, 2), &mut rng, &mut bus).is_empty());
        assert_eq!(count_of(&world, AgentKind::Micromanager), 1);
    }

    #[test]
    fn scale_up_happens_once() {
        let config = GameConfig::default();
        let mut waves = WaveManager::new(&config);
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(2);
        let mut bus = EventBus::new();

        waves.update(&mut world, inputs(61.0, 2), &mut rng, &mut bus);
        let spawned = waves.update(&mut world, inputs(360.0, 2), &mut rng, &mut bus);
        assert_eq!(spawned, vec![AgentKind::Micromanager]);
        assert_eq!(count_of(&world, AgentKind::Micromanager), 2);
        assert!(waves.update(&mut world, inputs(400.0, 2), &mut rng, &mut bus).is_empty());
    }

    #[test]
    fn agents_spawn_away_from_the_player_with_enrage_time() {
        let config = GameConfig::default();
        let mut waves = WaveManager::new(&config);
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut bus = EventBus::new();

        waves.update(&mut world, inputs(130.0, 3), &mut rng, &mut bus);
        for (_id, (agent, pos)) in world.query::<(&ChaosAgent, &Position)>().iter() {
            assert!(pos.vec().distance(Vec2::new(640.0, 480.0)) >= 160.0);
            let delay = config.schedule_entry(agent.kind).unwrap().enrage_delay_secs;
            assert_eq!(agent.enrage_at_ms, 130_000 + (delay * 1000.0) as u64);
        }
        assert_eq!(active_kinds(&world), vec![AgentKind::Micromanager, AgentKind::ReplyAllGuy]);
        let spawned = bus
            .take_outbound()
            .iter()
            .filter(|e| matches!(e.event, GameEvent::AgentSpawned { .. }))
            .count();
        assert_eq!(spawned, 2);
    }

    #[test]
    fn forced_spawn_keeps_the_scheduled_introduction() {
        let config = GameConfig::default();
        let mut waves = WaveManager::new(&config);
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(5);
        let mut bus = EventBus::new();

        assert!(waves
            .force_spawn(&mut world, AgentKind::Micromanager, inputs(0.0, 1), &mut rng, &mut bus)
            .is_some());
        assert!(!waves.is_introduced(AgentKind::Micromanager));

        assert_eq!(
            waves.update(&mut world, inputs(61.0, 2), &mut rng, &mut bus),
            vec![AgentKind::Micromanager]
        );
        assert!(waves.is_introduced(AgentKind::Micromanager));
        assert_eq!(count_of(&world, AgentKind::Micromanager), 2);
    }

    #[test]
    fn unscheduled_kind_is_a_no_op() {
        let mut config = GameConfig::default();
        config.agents.schedule.retain(|e| e.kind != AgentKind::SlackPinger);
        let mut waves = WaveManager::new(&config);
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(4);
        let mut bus = EventBus::new();

        assert!(waves
            .force_spawn(&mut world, AgentKind::SlackPinger, inputs(0.0, 1), &mut rng, &mut bus)
            .is_none());
        assert_eq!(world.len(), 0);
        assert!(waves
            .force_spawn(&mut world, AgentKind::ChattyColleague, inputs(0.0, 1), &mut rng, &mut bus)
            .is_some());
        assert_eq!(count_of(&world, AgentKind::ChattyColleague), 1);
    }
}
