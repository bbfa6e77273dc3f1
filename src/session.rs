//! The simulation core: owns every engine and the ECS world, and drives them
//! through one fixed-order pipeline per tick.

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::ai::assistant::AssistantContext;
use crate::ai::AgentContext;
use crate::clock::SimClock;
use crate::config::GameConfig;
use crate::ecs::components::{FreezeState, Inventory, Movement, Position};
use crate::ecs::systems::agent_tick::{agent_positions, agent_snapshots, agent_tick_system, release_all};
use crate::ecs::systems::assistant::{assistant_holding, assistant_position, assistant_system, spawn_assistant};
use crate::ecs::systems::player::{
    apply_player_effects, carried, player_movement_system, player_position, player_snapshot, PlayerRef,
};
use crate::ecs::systems::wave::{active_kinds, count_of, WaveInputs, WaveManager};
use crate::ecs::world::create_world;
use crate::error::{CommandError, ConfigError};
use crate::events::EventBus;
use crate::game::departments::Departments;
use crate::game::pressure;
use crate::game::progression::{Progression, ProgressionReport};
use crate::game::stress::StressEngine;
use crate::game::task_manager::{DeliveryModifiers, DeliveryReport, StopOutcome, TaskManager};
use crate::game::tilemap::OfficeMap;
use crate::game::upgrades::{ApplyContext, FollowUp, OfferContext, PendingOffer, UpgradeEngine, UpgradeId};
use crate::hooks::{AnalyticsSink, LogAnalytics, MemoryPreferences, Preferences};
use crate::protocol::{
    AgentKind, Carrier, DepartmentId, Envelope, FrameSnapshot, GameEvent, OfferReason, Outcome, PlayerCommand,
    PlayerSnapshot, StatsSnapshot, StressSource, TaskId, TaskSnapshot, Vec2,
};

/// Where the assistant appears relative to the player when hired.
const ASSISTANT_OFFSET: Vec2 = Vec2 { x: 32.0, y: 0.0 };

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunState {
    pub paused: bool,
    pub over: bool,
    pub outcome: Option<Outcome>,
}

pub struct Simulation {
    config: GameConfig,
    map: OfficeMap,
    rng: StdRng,
    clock: SimClock,
    bus: EventBus,
    world: World,
    player: Entity,
    tasks: TaskManager,
    departments: Departments,
    stress: StressEngine,
    progression: Progression,
    upgrades: UpgradeEngine,
    waves: WaveManager,
    run: RunState,
    last_timer_second: u32,
    preferences: Box<dyn Preferences>,
    analytics: Box<dyn AnalyticsSink>,
}

impl Simulation {
    /// Validates the configuration and sets up a fresh run with the opening
    /// tasks already on the floor.
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_hooks(config, seed, Box::new(MemoryPreferences::default()), Box::new(LogAnalytics))
    }

    pub fn with_hooks(
        config: GameConfig,
        seed: u64,
        preferences: Box<dyn Preferences>,
        analytics: Box<dyn AnalyticsSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut bus = EventBus::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let (world, player) = create_world(&config);
        let mut tasks = TaskManager::new(&config, &mut bus);
        let progression = Progression::new(config.progression.clone(), &mut bus);
        let upgrades = UpgradeEngine::new(&mut bus);

        tasks.spawn_initial(0, progression.level(), progression.tier(), &mut rng, &mut bus);
        info!(
            "Run started: {} s, seed {}, {} task records",
            config.run.duration_secs, seed, config.tasks.pool_size
        );

        Ok(Self {
            map: OfficeMap::from_config(&config.map),
            departments: Departments::from_config(&config.map),
            stress: StressEngine::new(config.stress.clone()),
            waves: WaveManager::new(&config),
            clock: SimClock::new(),
            run: RunState::default(),
            last_timer_second: 0,
            config,
            rng,
            bus,
            world,
            player,
            tasks,
            progression,
            upgrades,
            preferences,
            analytics,
        })
    }

    // ── Tick pipeline ────────────────────────────────────────────────

    /// Advances the simulation by `dt_ms`. Does nothing while paused, while
    /// an upgrade choice holds the run, or once the run is over.
    pub fn tick(&mut self, dt_ms: f64) {
        if self.run.over || self.run.paused {
            return;
        }
        if self.config.run.pause_on_offer && self.upgrades.has_pending_offer() {
            return;
        }

        let dt = self.clock.advance(dt_ms) as f32;
        let now = self.clock.now_ms();
        self.bus.set_time(self.clock.tick(), now);

        // Player
        player_movement_system(&mut self.world, self.player, dt, now, &self.map, &self.config.player);
        self.deliver_on_arrival();

        // Tasks
        self.tasks.update(
            now,
            self.progression.level(),
            self.progression.tier(),
            &mut self.rng,
            &mut self.bus,
            &mut self.stress,
        );
        for id in self.tasks.decoys_due(&carried(&self.world, self.player), now) {
            self.tasks.vanish_decoy(id, &mut self.bus, &mut self.stress);
            self.drop_from_inventory(id);
        }

        // Stress
        let mut holding = carried(&self.world, self.player);
        holding.extend(assistant_holding(&self.world));
        let units = self.tasks.stress_units(&holding);
        let stress_ball = self.upgrades.is_active(UpgradeId::StressBall);
        self.stress
            .update(dt, units, self.progression.tier(), stress_ball, &mut self.bus);

        // Progression
        let report = self.progression.consume_deliveries(&mut self.bus);
        self.queue_offers(report);

        // Upgrades
        let mut player = PlayerRef {
            world: &self.world,
            entity: self.player,
        };
        self.upgrades
            .tick(dt, &self.config.upgrades, &mut player, &mut self.bus);

        // Waves
        let inputs = self.wave_inputs();
        let spawned = self
            .waves
            .update(&mut self.world, inputs, &mut self.rng, &mut self.bus);
        for kind in spawned {
            self.upgrades.note_agent_spawned(kind);
        }

        // Agents
        self.departments.tick(now, &mut self.bus);
        self.tick_agents(dt, now);

        // Assistant
        self.tick_assistant(dt, now);

        self.check_game_over(now);
        self.publish_timer(now);
        self.check_invariants();
    }

    fn tick_agents(&mut self, dt: f32, now: u64) {
        let (frozen, immune) = self
            .world
            .get::<&FreezeState>(self.player)
            .map(|f| (f.is_frozen(now), f.is_immune(now)))
            .unwrap_or((false, false));
        let mut ctx = AgentContext {
            now_ms: now,
            dt_ms: dt,
            player_pos: player_position(&self.world, self.player),
            player_tier: self.progression.tier(),
            player_frozen: frozen,
            player_immune: immune,
            resistance: self.upgrades.airpods_resistance(&self.config.upgrades),
            meeting_blocker: self.upgrades.is_active(UpgradeId::MeetingBlocker),
            do_not_disturb: self.upgrades.is_active(UpgradeId::DoNotDisturb),
            executive_presence: self.upgrades.executive_presence_active(now),
            config: &self.config,
            map: &self.map,
            rng: &mut self.rng,
            bus: &mut self.bus,
            tasks: &mut self.tasks,
            departments: &mut self.departments,
            stress: &mut self.stress,
            effects: Vec::new(),
        };
        let result = agent_tick_system(&mut self.world, &mut ctx);
        apply_player_effects(&mut self.world, self.player, result.effects, now);
    }

    fn tick_assistant(&mut self, dt: f32, now: u64) {
        let mut ctx = AssistantContext {
            now_ms: now,
            dt_ms: dt,
            config: &self.config,
            map: &self.map,
            rng: &mut self.rng,
            bus: &mut self.bus,
            tasks: &mut self.tasks,
            departments: &self.departments,
        };
        for id in assistant_system(&mut self.world, &mut ctx) {
            self.resolve_delivery(id, Carrier::Assistant, None);
        }
    }

    /// Completes the current stop of every carried task whose department the
    /// player is standing in, unless that department is in a meeting.
    fn deliver_on_arrival(&mut self) {
        let pos = player_position(&self.world, self.player);
        for id in carried(&self.world, self.player) {
            let Some(dept) = self.tasks.get(id).and_then(|t| t.current_department()) else {
                continue;
            };
            if !self.departments.zone_contains(dept, pos) || self.departments.is_blocked(dept) {
                continue;
            }
            if self.tasks.advance_stop(id, &mut self.bus) == Some(StopOutcome::Final) {
                self.resolve_delivery(id, Carrier::Player, None);
            }
        }
    }

    /// Pays out a finished task and takes it off its carrier.
    fn resolve_delivery(&mut self, id: TaskId, carrier: Carrier, forced_factor: Option<f32>) -> Option<DeliveryReport> {
        let player_pos = player_position(&self.world, self.player);
        let mods = DeliveryModifiers {
            linkedin: self.upgrades.is_active(UpgradeId::LinkedinPremium),
            favorite: self.upgrades.favorite_dept(),
            junk_filter: self.upgrades.is_active(UpgradeId::ReplyAllFilter),
            milestone_bonus: self.progression.milestone_bonus(),
            agent_nearby: pressure::agent_within(&self.config.pressure, player_pos, agent_positions(&self.world)),
            stress: self.stress.current(),
            forced_factor,
        };
        let report = self
            .tasks
            .finish_delivery(id, carrier, &mods, self.clock.now_ms(), &mut self.bus)?;
        self.stress
            .relieve(report.stress_relief, StressSource::Delivery, &mut self.bus);
        if carrier == Carrier::Player {
            self.drop_from_inventory(id);
        }
        debug!(
            "Task {} delivered to {} for {} XP",
            id,
            report.department.name(),
            report.xp
        );
        Some(report)
    }

    fn drop_from_inventory(&mut self, id: TaskId) {
        if let Ok(mut inventory) = self.world.get::<&mut Inventory>(self.player) {
            inventory.remove(id);
        }
    }

    fn queue_offers(&mut self, report: ProgressionReport) {
        let ctx = OfferContext {
            level: self.progression.level(),
            elapsed_secs: self.clock.elapsed_secs(),
        };
        let reasons = std::iter::repeat(OfferReason::LevelUp)
            .take(report.level_ups as usize)
            .chain(std::iter::repeat(OfferReason::Milestone).take(report.milestones as usize));
        for reason in reasons {
            self.upgrades
                .queue_offer(reason, ctx, &self.config, &mut self.rng, &mut self.bus);
        }
    }

    fn wave_inputs(&self) -> WaveInputs {
        WaveInputs {
            now_ms: self.clock.now_ms(),
            elapsed_secs: self.clock.elapsed_secs(),
            level: self.progression.level(),
            player_pos: player_position(&self.world, self.player),
        }
    }

    fn check_game_over(&mut self, now: u64) {
        let outcome = if self.stress.is_maxed() {
            Outcome::Lose
        } else if now >= self.config.duration_ms() {
            Outcome::Win
        } else {
            return;
        };
        self.end_run(outcome);
    }

    fn end_run(&mut self, outcome: Outcome) {
        let stats = self.get_stats();
        self.bus.publish(GameEvent::GameOver {
            outcome,
            stats: stats.clone(),
        });
        self.run.over = true;
        self.run.outcome = Some(outcome);
        info!(
            "Game over: {:?} at level {} with {} deliveries",
            outcome, stats.level, stats.delivered_count
        );

        let effects = release_all(&mut self.world);
        apply_player_effects(&mut self.world, self.player, effects, self.clock.now_ms());
        self.tasks.teardown(&mut self.bus);
        self.progression.teardown(&mut self.bus);
        self.upgrades.teardown(&mut self.bus);

        let payload = json!({
            "outcome": outcome,
            "stats": stats,
        });
        self.analytics.track("game_over", payload);
    }

    fn publish_timer(&mut self, now: u64) {
        let second = (now / 1000) as u32;
        if second <= self.last_timer_second {
            return;
        }
        self.last_timer_second = second;
        let total = self.config.run.duration_secs as u32;
        self.bus.publish(GameEvent::GameTimerTick {
            elapsed_seconds: second.min(total),
            remaining_seconds: total.saturating_sub(second),
        });
    }

    /// Every record is idle, on the map or in exactly one pair of hands.
    fn check_invariants(&mut self) {
        let repaired = self.tasks.repair_active();
        if repaired > 0 {
            warn!("Dropped {} stale map reference(s)", repaired);
        }
        debug_assert_eq!(repaired, 0, "task on the map list was not on the map");

        let in_hands = carried(&self.world, self.player).len() + usize::from(assistant_holding(&self.world).is_some());
        let pool = self.tasks.pool();
        let accounted = pool.idle_count() + self.tasks.active().len() + in_hands;
        if accounted != pool.size() {
            warn!("Task records unaccounted: {} of {}", accounted, pool.size());
        }
        debug_assert_eq!(accounted, pool.size());

        if let Ok(inventory) = self.world.get::<&Inventory>(self.player) {
            debug_assert!(inventory.tasks.len() as u32 <= inventory.capacity);
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn pause(&mut self) {
        if !self.run.paused {
            self.run.paused = true;
            debug!("Paused");
        }
    }

    pub fn resume(&mut self) {
        if self.run.paused {
            self.run.paused = false;
            debug!("Resumed");
        }
    }

    pub fn set_movement(&mut self, x: f32, y: f32) {
        if let Ok(mut movement) = self.world.get::<&mut Movement>(self.player) {
            movement.input = Vec2::new(x, y);
        }
    }

    pub fn set_sprint(&mut self, active: bool) {
        if let Ok(mut movement) = self.world.get::<&mut Movement>(self.player) {
            movement.sprinting = active;
        }
    }

    /// Picks a task up off the floor. A Fast Tracker charge trims the last
    /// stop from a multi-stop task.
    pub fn pickup_attempt(&mut self, id: TaskId) -> Result<(), CommandError> {
        if self.run.over {
            return Err(CommandError::RunOver);
        }
        let now = self.clock.now_ms();
        let frozen = self
            .world
            .get::<&FreezeState>(self.player)
            .is_ok_and(|f| f.is_frozen(now));
        if frozen {
            return Err(CommandError::Frozen);
        }
        let Some(at) = self
            .tasks
            .get(id)
            .and_then(|t| t.position)
            .filter(|_| self.tasks.is_on_map(id))
        else {
            return Err(CommandError::NotOnMap(id));
        };
        if player_position(&self.world, self.player).distance(at) > self.config.player.pickup_range {
            return Err(CommandError::OutOfRange(id));
        }
        let capacity = {
            let inventory = self
                .world
                .get::<&Inventory>(self.player)
                .map_err(|_| CommandError::NotOnMap(id))?;
            if inventory.is_full() {
                return Err(CommandError::Capacity {
                    capacity: inventory.capacity,
                });
            }
            inventory.capacity
        };

        let fast_track = self.upgrades.charges(UpgradeId::FastTracker) > 0
            && self.tasks.get(id).is_some_and(|t| t.total_stops > 1 && !t.is_decoy());
        if fast_track && self.tasks.fast_track(id) {
            self.upgrades
                .consume_charge(UpgradeId::FastTracker, &mut self.bus);
            self.stress.relieve(
                self.config.upgrades.fast_tracker_relief,
                StressSource::FastTracker,
                &mut self.bus,
            );
            debug!("Fast-tracked task {}", id);
        }

        self.tasks.take(id, Carrier::Player, now, &mut self.bus)?;
        if let Ok(mut inventory) = self.world.get::<&mut Inventory>(self.player) {
            inventory.tasks.push(id);
        }
        debug!("Picked up task {} ({} slots)", id, capacity);
        Ok(())
    }

    /// Pushes one carried task through a meeting. Only allowed while a
    /// Meeting Scheduler is on the floor and every carried task is headed for
    /// a blocked department.
    pub fn force_delivery_attempt(&mut self) -> Result<TaskId, CommandError> {
        if self.run.over {
            return Err(CommandError::RunOver);
        }
        if count_of(&self.world, AgentKind::MeetingScheduler) == 0 {
            return Err(CommandError::NoBlocker);
        }
        let work: Vec<(TaskId, Option<DepartmentId>)> = carried(&self.world, self.player)
            .into_iter()
            .filter_map(|id| self.tasks.get(id).filter(|t| !t.is_decoy()).map(|t| (id, t.current_department())))
            .collect();
        let soft_locked = !work.is_empty()
            && work
                .iter()
                .all(|(_, dept)| dept.is_some_and(|d| self.departments.is_blocked(d)));
        if !soft_locked {
            return Err(CommandError::NotSoftLocked);
        }

        let factor = if self.upgrades.is_active(UpgradeId::MeetingBlocker) {
            self.config.upgrades.force_delivery_factor_meeting_blocker
        } else {
            self.config.upgrades.force_delivery_factor
        };
        let (id, _) = work[0];
        self.resolve_delivery(id, Carrier::Player, Some(factor))
            .ok_or(CommandError::NotSoftLocked)?;
        info!("Forced delivery of task {} at {:.2}x XP", id, factor);
        Ok(id)
    }

    /// Resolves the pending offer with `id` and applies its effect.
    pub fn select_upgrade(&mut self, id: UpgradeId) -> Result<(), CommandError> {
        if self.run.over {
            return Err(CommandError::RunOver);
        }
        self.upgrades.take_choice(id)?;
        self.apply_upgrade(id);
        Ok(())
    }

    fn apply_upgrade(&mut self, id: UpgradeId) {
        let mut player = PlayerRef {
            world: &self.world,
            entity: self.player,
        };
        let mut ctx = ApplyContext {
            config: &self.config.upgrades,
            bus: &mut self.bus,
            rng: &mut self.rng,
            player: &mut player,
            departments: &mut self.departments,
            deliveries: self.tasks.deliveries(),
            stress: &mut self.stress,
        };
        let follow_up = self.upgrades.apply(id, &mut ctx);

        match follow_up {
            Some(FollowUp::SpawnAssistant) => {
                let at = player_position(&self.world, self.player) + ASSISTANT_OFFSET;
                spawn_assistant(&mut self.world, at, &mut self.bus);
            }
            Some(FollowUp::DeliverAllCarried) => {
                for task in carried(&self.world, self.player) {
                    self.resolve_delivery(task, Carrier::Player, None);
                }
            }
            None => {}
        }
        self.upgrades
            .refresh_pending(&self.config, &mut self.rng, &mut self.bus);
    }

    pub fn mark_tutorial_seen(&mut self) {
        self.preferences.set_seen_tutorial(true);
    }

    pub fn has_seen_tutorial(&self) -> bool {
        self.preferences.has_seen_tutorial()
    }

    /// Dispatches a client command.
    pub fn apply(&mut self, command: PlayerCommand) -> Result<(), CommandError> {
        match command {
            PlayerCommand::Move { x, y } => self.set_movement(x, y),
            PlayerCommand::Sprint { active } => self.set_sprint(active),
            PlayerCommand::Pickup { task_id } => self.pickup_attempt(task_id)?,
            PlayerCommand::ForceDelivery => {
                self.force_delivery_attempt()?;
            }
            PlayerCommand::SelectUpgrade { id } => self.select_upgrade(id)?,
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::Resume => self.resume(),
            PlayerCommand::MarkTutorialSeen => self.mark_tutorial_seen(),
            PlayerCommand::DebugSpawnAgent { kind } => {
                self.debug_spawn_agent(kind);
            }
            PlayerCommand::DebugAddXp { amount } => self.debug_add_xp(amount),
            PlayerCommand::DebugSetStress { value } => self.debug_set_stress(value),
        }
        Ok(())
    }

    // ── Debug actions ────────────────────────────────────────────────

    /// Spawns an agent of a scheduled type right away.
    pub fn debug_spawn_agent(&mut self, kind: AgentKind) -> bool {
        let inputs = self.wave_inputs();
        let spawned = self
            .waves
            .force_spawn(&mut self.world, kind, inputs, &mut self.rng, &mut self.bus);
        if spawned.is_some() {
            self.upgrades.note_agent_spawned(kind);
        }
        spawned.is_some()
    }

    /// Applies an upgrade without an offer.
    pub fn debug_grant_upgrade(&mut self, id: UpgradeId) {
        if !self.run.over {
            self.apply_upgrade(id);
        }
    }

    pub fn debug_add_xp(&mut self, amount: u32) {
        let report = self.progression.add_xp(amount, &mut self.bus);
        self.queue_offers(report);
    }

    pub fn debug_set_stress(&mut self, value: f32) {
        self.stress.set(value, &mut self.bus);
    }

    /// Places a task from the catalogue by name, optionally at an exact spot.
    pub fn debug_spawn_task(&mut self, name: &str, at: Option<Vec2>) -> Option<TaskId> {
        self.tasks
            .spawn_named(name, at, self.clock.now_ms(), &mut self.rng, &mut self.bus)
    }

    pub fn debug_teleport(&mut self, to: Vec2) {
        if let Ok(mut pos) = self.world.get::<&mut Position>(self.player) {
            pos.set(self.map.clamp(to));
        }
    }

    /// Calls a meeting in `dept` without an agent walking there.
    pub fn debug_block_department(&mut self, dept: DepartmentId, duration_ms: u64) -> bool {
        self.departments
            .block(dept, self.clock.now_ms(), duration_ms, 0, &mut self.bus)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn get_active_tasks(&self) -> Vec<TaskSnapshot> {
        self.tasks
            .active()
            .iter()
            .filter_map(|id| self.tasks.get(*id))
            .map(|t| t.snapshot())
            .collect()
    }

    pub fn get_stats(&self) -> StatsSnapshot {
        let elapsed = self.clock.elapsed_secs().min(self.config.run.duration_secs);
        StatsSnapshot {
            level: self.progression.level(),
            tier: self.progression.tier(),
            total_xp: self.progression.total_xp(),
            stress: self.stress.current(),
            peak_stress: self.stress.peak(),
            stress_band: self.stress.band(),
            elapsed_seconds: elapsed,
            remaining_seconds: self.config.run.duration_secs - elapsed,
            delivered_count: self.tasks.delivered_count(),
            milestone_count: self.progression.milestone_count(),
            active_agent_types: active_kinds(&self.world),
        }
    }

    pub fn is_dept_blocked(&self, id: DepartmentId) -> bool {
        self.departments.is_blocked(id)
    }

    pub fn is_upgrade_active(&self, id: UpgradeId) -> bool {
        self.upgrades.is_active(id)
    }

    pub fn upgrade_charges(&self, id: UpgradeId) -> u32 {
        self.upgrades.charges(id)
    }

    pub fn pending_offer(&self) -> Option<&PendingOffer> {
        self.upgrades.pending_offer()
    }

    pub fn task(&self, id: TaskId) -> Option<TaskSnapshot> {
        self.tasks.get(id).map(|t| t.snapshot())
    }

    pub fn delivery_count(&self, dept: DepartmentId) -> u32 {
        self.tasks.deliveries().get(dept)
    }

    pub fn carried(&self) -> Vec<TaskId> {
        carried(&self.world, self.player)
    }

    pub fn player(&self) -> Option<PlayerSnapshot> {
        player_snapshot(&self.world, self.player, self.clock.now_ms())
    }

    pub fn player_position(&self) -> Vec2 {
        player_position(&self.world, self.player)
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn run_state(&self) -> RunState {
        self.run
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Everything published since the last call, in publication order.
    pub fn take_events(&mut self) -> Vec<Envelope> {
        self.bus.take_outbound()
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        let now = self.clock.now_ms();
        let player = player_snapshot(&self.world, self.player, now).unwrap_or(PlayerSnapshot {
            position: self.config.map.player_start,
            stamina: 0.0,
            frozen: false,
            capacity: self.config.player.capacity,
            carrying: Vec::new(),
        });
        FrameSnapshot {
            tick: self.clock.tick(),
            stats: self.get_stats(),
            player,
            tasks: self.get_active_tasks(),
            agents: agent_snapshots(&self.world),
            assistant: assistant_position(&self.world),
            blocked_departments: self.departments.blocked(),
            pending_offer: self.upgrades.pending_offer().map(|o| o.choices.clone()),
            paused: self.run.paused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::RecordingAnalytics;
    use crate::protocol::Topic;

    fn sim() -> Simulation {
        let mut config = GameConfig::default();
        config.run.pause_on_offer = false;
        config.tasks.initial_tasks = 0;
        Simulation::new(config, 7).unwrap()
    }

    #[test]
    fn opening_tasks_are_spawned() {
        let sim = Simulation::new(GameConfig::default(), 1).unwrap();
        assert_eq!(sim.get_active_tasks().len(), 2);
    }

    #[test]
    fn pause_freezes_time() {
        let mut sim = sim();
        sim.tick(100.0);
        sim.pause();
        sim.tick(100.0);
        assert_eq!(sim.now_ms(), 100);
        sim.resume();
        sim.tick(100.0);
        assert_eq!(sim.now_ms(), 200);
    }

    #[test]
    fn pickup_checks_range_then_capacity() {
        let mut sim = sim();
        let start = sim.player_position();
        let far = sim.debug_spawn_task("Coffee Order", Some(Vec2::new(200.0, 480.0))).unwrap();
        assert_eq!(sim.pickup_attempt(far), Err(CommandError::OutOfRange(far)));

        let near: Vec<TaskId> = (0..4)
            .map(|i| {
                sim.debug_spawn_task("Coffee Order", Some(start + Vec2::new(10.0 * i as f32, 0.0)))
                    .unwrap()
            })
            .collect();
        for id in &near[..3] {
            sim.pickup_attempt(*id).unwrap();
        }
        assert_eq!(sim.pickup_attempt(near[3]), Err(CommandError::Capacity { capacity: 3 }));
        assert_eq!(sim.pickup_attempt(near[0]), Err(CommandError::NotOnMap(near[0])));
    }

    #[test]
    fn walking_into_the_zone_delivers() {
        let mut sim = sim();
        let id = sim.debug_spawn_task("Coffee Order", Some(sim.player_position())).unwrap();
        sim.pickup_attempt(id).unwrap();
        sim.debug_teleport(Vec2::new(160.0, 120.0));
        sim.tick(16.0);
        assert!(sim.carried().is_empty());
        assert_eq!(sim.delivery_count(DepartmentId::Marketing), 1);
    }

    #[test]
    fn blocked_department_holds_the_delivery() {
        let mut sim = sim();
        let id = sim.debug_spawn_task("Coffee Order", Some(sim.player_position())).unwrap();
        sim.pickup_attempt(id).unwrap();
        assert!(sim.debug_block_department(DepartmentId::Marketing, 1000));
        sim.debug_teleport(Vec2::new(160.0, 120.0));
        sim.tick(16.0);
        assert_eq!(sim.carried(), vec![id]);
        for _ in 0..70 {
            sim.tick(16.0);
        }
        assert!(sim.carried().is_empty());
    }

    #[test]
    fn force_delivery_needs_a_scheduler() {
        let mut sim = sim();
        assert_eq!(sim.force_delivery_attempt(), Err(CommandError::NoBlocker));
        assert!(sim.debug_spawn_agent(AgentKind::MeetingScheduler));
        assert_eq!(sim.force_delivery_attempt(), Err(CommandError::NotSoftLocked));
    }

    #[test]
    fn stress_max_loses_and_reports() {
        let analytics = RecordingAnalytics::default();
        let mut config = GameConfig::default();
        config.tasks.initial_tasks = 0;
        let mut sim = Simulation::with_hooks(
            config,
            3,
            Box::new(MemoryPreferences::default()),
            Box::new(analytics.clone()),
        )
        .unwrap();
        sim.debug_set_stress(100.0);
        sim.tick(16.0);
        assert_eq!(sim.run_state().outcome, Some(Outcome::Lose));
        assert_eq!(sim.pickup_attempt(0), Err(CommandError::RunOver));
        assert_eq!(analytics.events().len(), 1);

        let overs = sim
            .take_events()
            .iter()
            .filter(|e| e.event.topic() == Topic::GameOver)
            .count();
        assert_eq!(overs, 1);
        sim.tick(16.0);
        assert!(sim.take_events().is_empty());
    }

    #[test]
    fn timer_ticks_once_per_second() {
        let mut sim = sim();
        for _ in 0..100 {
            sim.tick(16.0);
        }
        let ticks: Vec<u32> = sim
            .take_events()
            .iter()
            .filter_map(|e| match e.event {
                GameEvent::GameTimerTick { elapsed_seconds, .. } => Some(elapsed_seconds),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![1]);
    }

    #[test]
    fn tutorial_flag_goes_through_preferences() {
        let mut sim = sim();
        assert!(!sim.has_seen_tutorial());
        sim.apply(PlayerCommand::MarkTutorialSeen).unwrap();
        assert!(sim.has_seen_tutorial());
    }
}
