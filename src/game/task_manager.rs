use std::collections::{BTreeMap, VecDeque};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::config::{GameConfig, PressureConfig, TaskConfig, TaskTemplate, TemplateTarget, TierWeights, XpConfig};
use crate::error::CommandError;
use crate::events::{EventBus, SubscriberId, SubscriptionId};
use crate::game::pressure::{self, HotZones, PressureBonus, PressureInputs};
use crate::game::stress::StressEngine;
use crate::game::tasks::{Lifetime, Task, TaskPool};
use crate::game::tilemap::OfficeMap;
use crate::protocol::{
    Carrier, DepartmentId, ExpiryReason, GameEvent, StressSource, TaskId, TaskState, Tier, Topic, Vec2,
};

const JUNK_NAME: &str = "Reply-All Thread";
const DECOY_NAME: &str = "Slack Ping";

// ── Delivery history ────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct DeliveryCounts {
    counts: BTreeMap<DepartmentId, u32>,
}

impl DeliveryCounts {
    pub fn record(&mut self, dept: DepartmentId) {
        *self.counts.entry(dept).or_insert(0) += 1;
    }

    pub fn get(&self, dept: DepartmentId) -> u32 {
        self.counts.get(&dept).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Departments with at least one delivery, busiest first. Ties keep
    /// department order.
    fn ranked(&self) -> Vec<DepartmentId> {
        let mut ranked: Vec<(DepartmentId, u32)> =
            self.counts.iter().filter(|(_, n)| **n > 0).map(|(d, n)| (*d, *n)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().map(|(d, _)| d).collect()
    }

    pub fn most_delivered_dept(&self) -> Option<DepartmentId> {
        self.ranked().first().copied()
    }

    /// Busiest department other than `excluding`.
    pub fn second_most_delivered_dept(&self, excluding: DepartmentId) -> Option<DepartmentId> {
        self.ranked().into_iter().find(|d| *d != excluding)
    }
}

// ── XP and relief ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct XpInputs {
    pub total_stops: u8,
    pub tier: Tier,
    pub is_junk: bool,
    pub junk_chain: bool,
    pub junk_filter: bool,
    pub linkedin: bool,
    pub favorite_match: bool,
    pub milestone_bonus: f32,
    pub pressure_multiplier: f32,
    pub forced_factor: Option<f32>,
}

fn round_step(xp: f64, factor: f64) -> f64 {
    (xp * factor).round()
}

/// Base XP by stop count and tier, then each multiplier in turn, rounding
/// after every step.
pub fn compute_xp(cfg: &XpConfig, milestone_cap: f32, inputs: &XpInputs) -> u32 {
    let tier = inputs.tier.index() as u32;
    let base = match inputs.total_stops {
        0 | 1 => cfg.single_base + cfg.single_per_tier * tier,
        2 => cfg.double_base + cfg.double_per_tier * tier.saturating_sub(cfg.double_tier_offset),
        _ => cfg.triple_base + cfg.triple_per_tier * tier.saturating_sub(cfg.triple_tier_offset),
    };

    let mut xp = base as f64;
    if inputs.is_junk && !inputs.junk_filter && !inputs.junk_chain {
        xp = round_step(xp, cfg.junk_factor as f64);
    }
    if inputs.linkedin {
        xp = round_step(xp, cfg.linkedin_factor as f64);
    }
    if inputs.favorite_match {
        xp = round_step(xp, cfg.favorite_factor as f64);
    }
    let bonus = inputs.milestone_bonus.clamp(0.0, milestone_cap) as f64;
    xp = round_step(xp, 1.0 + bonus);
    xp = round_step(xp, inputs.pressure_multiplier.max(0.0) as f64);
    if let Some(factor) = inputs.forced_factor {
        xp = round_step(xp, factor as f64);
    }
    xp.max(0.0) as u32
}

pub fn compute_relief(cfg: &TaskConfig, total_stops: u8, favorite_match: bool) -> f32 {
    let relief = match total_stops {
        0 | 1 => cfg.relief.single,
        2 => cfg.relief.double,
        _ => cfg.relief.triple,
    };
    if favorite_match {
        relief * cfg.relief.favorite_factor
    } else {
        relief
    }
}

/// Draws a tier around the player's. Missing neighbours (below Intern,
/// above CEO) give their weight to the current tier.
pub fn pick_tier(rng: &mut StdRng, current: Tier, weights: &TierWeights) -> Tier {
    let mut options = vec![(current, weights.current)];
    match current.lower() {
        Some(lower) => options.push((lower, weights.lower)),
        None => options[0].1 += weights.lower,
    }
    match current.higher() {
        Some(higher) => options.push((higher, weights.higher)),
        None => options[0].1 += weights.higher,
    }

    let total: f32 = options.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return current;
    }
    let mut roll = rng.gen_range(0.0..total);
    for (tier, weight) in options {
        let weight = weight.max(0.0);
        if roll < weight {
            return tier;
        }
        roll -= weight;
    }
    current
}

fn nearest_of<'a>(tasks: impl Iterator<Item = &'a Task>, from: Vec2) -> Option<TaskId> {
    tasks
        .filter_map(|t| t.position.map(|p| (t.id, p.distance(from))))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

// ── Task manager ────────────────────────────────────────────────────

/// Player-side conditions that shape a delivery's reward.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryModifiers {
    pub linkedin: bool,
    pub favorite: Option<DepartmentId>,
    pub junk_filter: bool,
    pub milestone_bonus: f32,
    pub agent_nearby: bool,
    pub stress: f32,
    pub forced_factor: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReport {
    pub task_id: TaskId,
    pub department: DepartmentId,
    pub xp: u32,
    pub stress_relief: f32,
    pub pressure: PressureBonus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Partial { next: DepartmentId },
    Final,
}

/// Owns the task pool and everything that writes to it: pacing, spawn
/// point choice, expiry, pickup, routing and delivery rewards.
#[derive(Debug)]
pub struct TaskManager {
    config: TaskConfig,
    pressure: PressureConfig,
    milestone_cap: f32,
    map: OfficeMap,
    spawn_points: Vec<Vec2>,
    run_ms: u64,
    pool: TaskPool,
    active: Vec<TaskId>,
    last_spawn_ms: u64,
    deliveries: DeliveryCounts,
    junk_deliveries: VecDeque<u64>,
    hot_zones: HotZones,
    owner: SubscriberId,
    unblocks: SubscriptionId,
}

impl TaskManager {
    pub fn new(config: &GameConfig, bus: &mut EventBus) -> Self {
        let owner = bus.register("tasks");
        let unblocks = bus.subscribe(owner, &[Topic::DepartmentUnblocked]);
        Self {
            config: config.tasks.clone(),
            pressure: config.pressure.clone(),
            milestone_cap: config.progression.milestone_bonus_cap,
            map: OfficeMap::from_config(&config.map),
            spawn_points: config.map.spawn_points.clone(),
            run_ms: config.duration_ms(),
            pool: TaskPool::new(config.tasks.pool_size),
            active: Vec::new(),
            last_spawn_ms: 0,
            deliveries: DeliveryCounts::default(),
            junk_deliveries: VecDeque::new(),
            hot_zones: HotZones::default(),
            owner,
            unblocks,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn pool(&self) -> &TaskPool {
        &self.pool
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.pool.get(id)
    }

    /// Ids of tasks lying on the map, oldest first.
    pub fn active(&self) -> &[TaskId] {
        &self.active
    }

    pub fn is_on_map(&self, id: TaskId) -> bool {
        self.active.contains(&id)
    }

    pub fn deliveries(&self) -> &DeliveryCounts {
        &self.deliveries
    }

    pub fn delivered_count(&self) -> u32 {
        self.deliveries.total()
    }

    pub fn is_hot(&self, dept: DepartmentId, now_ms: u64) -> bool {
        self.hot_zones.is_hot(dept, now_ms)
    }

    /// Units of outstanding work: tasks on the map plus stops still owed on
    /// the given carried tasks. Decoys are not work.
    pub fn stress_units(&self, carried: &[TaskId]) -> u32 {
        let on_map = self
            .active
            .iter()
            .filter_map(|id| self.pool.get(*id))
            .filter(|t| !t.is_decoy())
            .count() as u32;
        let owed: u32 = carried
            .iter()
            .filter_map(|id| self.pool.get(*id))
            .filter(|t| !t.is_decoy())
            .map(|t| t.remaining_stops() as u32)
            .sum();
        on_map + owed
    }

    /// Nearest real task on the map, single-stop ones first.
    pub fn nearest_for_pickup(&self, from: Vec2) -> Option<TaskId> {
        let candidates: Vec<&Task> = self
            .active
            .iter()
            .filter_map(|id| self.pool.get(*id))
            .filter(|t| !t.is_decoy() && t.position.is_some())
            .collect();
        nearest_of(candidates.iter().copied().filter(|t| t.total_stops == 1), from)
            .or_else(|| nearest_of(candidates.iter().copied(), from))
    }

    // ── Per-tick work ────────────────────────────────────────────────

    /// Records hot zones from unblocks, paces regular spawns and expires
    /// tasks left on the map too long.
    pub fn update(
        &mut self,
        now_ms: u64,
        level: u32,
        tier: Tier,
        rng: &mut StdRng,
        bus: &mut EventBus,
        stress: &mut StressEngine,
    ) {
        for envelope in bus.drain(self.unblocks) {
            if let GameEvent::DepartmentUnblocked { department } = envelope.event {
                self.hot_zones.record(department, envelope.at_ms, self.config.hot_zone_ms);
            }
        }
        self.hot_zones.prune(now_ms);

        if now_ms.saturating_sub(self.last_spawn_ms) >= self.spawn_interval_ms(now_ms)
            && self.active.len() < self.config.max_active
            && self.spawn_regular(now_ms, level, tier, rng, bus).is_some()
        {
            self.last_spawn_ms = now_ms;
        }

        self.expire(now_ms, bus, stress);
    }

    /// Linear ramp from the base interval down to the minimum over the run.
    pub fn spawn_interval_ms(&self, now_ms: u64) -> u64 {
        let base = self.config.spawn_interval_base_ms;
        let min = self.config.spawn_interval_min_ms.min(base);
        let frac = if self.run_ms == 0 {
            1.0
        } else {
            (now_ms as f64 / self.run_ms as f64).clamp(0.0, 1.0)
        };
        base - ((base - min) as f64 * frac) as u64
    }

    pub fn spawn_initial(&mut self, now_ms: u64, level: u32, tier: Tier, rng: &mut StdRng, bus: &mut EventBus) {
        for _ in 0..self.config.initial_tasks {
            self.spawn_regular(now_ms, level, tier, rng, bus);
        }
        self.last_spawn_ms = now_ms;
    }

    fn expire(&mut self, now_ms: u64, bus: &mut EventBus, stress: &mut StressEngine) {
        let due: Vec<TaskId> = self
            .active
            .iter()
            .copied()
            .filter(|id| {
                self.pool
                    .get(*id)
                    .is_some_and(|t| now_ms >= t.spawned_at_ms + self.lifetime_ms(t.lifetime))
            })
            .collect();

        for id in due {
            self.active.retain(|a| *a != id);
            let Some(task) = self.pool.get_mut(id) else {
                continue;
            };
            task.state = TaskState::Done;
            let (is_junk, is_decoy) = (task.is_junk(), task.is_decoy());
            let penalty = if is_decoy {
                0.0
            } else if is_junk {
                self.config.junk_expiry_stress
            } else {
                self.config.expiry_stress
            };
            let applied = if penalty > 0.0 {
                stress.add_instant(penalty, StressSource::TaskExpiry, bus)
            } else {
                0.0
            };
            bus.publish(GameEvent::TaskExpired {
                task_id: id,
                reason: ExpiryReason::Lifetime,
                stress_penalty: applied,
                is_junk,
                is_decoy,
            });
            self.pool.release(id);
        }
    }

    fn lifetime_ms(&self, lifetime: Lifetime) -> u64 {
        match lifetime {
            Lifetime::Standard => self.config.lifetime_ms,
            Lifetime::Junk => self.config.junk_lifetime_ms,
            Lifetime::Decoy => self.config.decoy_lifetime_ms,
        }
    }

    // ── Spawning ─────────────────────────────────────────────────────

    /// Uniform choice among spawn points not within one tile of a task on
    /// the map, optionally also far enough from the player.
    fn pick_spawn_point(&self, rng: &mut StdRng, away_from: Option<(Vec2, f32)>) -> Option<(usize, Vec2)> {
        let occupied: Vec<Vec2> = self
            .active
            .iter()
            .filter_map(|id| self.pool.get(*id).and_then(|t| t.position))
            .collect();
        let candidates: Vec<(usize, Vec2)> = self
            .spawn_points
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| occupied.iter().all(|o| self.map.tile_distance(*o, *p) > 1))
            .filter(|(_, p)| away_from.map_or(true, |(player, min)| p.distance(player) >= min))
            .collect();
        candidates.choose(rng).copied()
    }

    /// Templates of one tier; an empty tier falls back to the lowest.
    fn templates_of(&self, tier: Tier) -> Vec<&TaskTemplate> {
        let pool: Vec<&TaskTemplate> = self.config.templates.iter().filter(|t| t.tier == tier).collect();
        if pool.is_empty() {
            self.config.templates.iter().filter(|t| t.tier == Tier::Intern).collect()
        } else {
            pool
        }
    }

    fn single_stop_templates_of(&self, tier: Tier) -> Vec<&TaskTemplate> {
        self.config
            .templates
            .iter()
            .filter(|t| t.tier == tier && t.stops() == 1)
            .collect()
    }

    fn choose_template(&self, level: u32, tier: Tier, rng: &mut StdRng) -> Option<TaskTemplate> {
        let allow_multi = level >= self.config.multi_stop_min_level;
        for _ in 0..self.config.reroll_attempts.max(1) {
            let drawn = pick_tier(rng, tier, &self.config.tier_weights);
            let Some(candidate) = self.templates_of(drawn).choose(rng).copied() else {
                continue;
            };
            if candidate.stops() > 1 && !allow_multi {
                continue;
            }
            return Some(candidate.clone());
        }

        let mut fallback = self.single_stop_templates_of(tier);
        if fallback.is_empty() {
            fallback = self.single_stop_templates_of(Tier::Intern);
        }
        fallback.choose(rng).map(|t| (*t).clone())
    }

    pub fn spawn_regular(
        &mut self,
        now_ms: u64,
        level: u32,
        tier: Tier,
        rng: &mut StdRng,
        bus: &mut EventBus,
    ) -> Option<TaskId> {
        let Some(template) = self.choose_template(level, tier, rng) else {
            debug!("No task template available for tier {:?}", tier);
            return None;
        };
        let Some(point) = self.pick_spawn_point(rng, None) else {
            debug!("No free spawn point; spawn skipped");
            return None;
        };
        self.publish(&template, Lifetime::Standard, point, now_ms, rng, bus)
    }

    /// Junk from a reply-all burst, placed away from the player. May exceed
    /// the regular cap by the over-cap allowance.
    pub fn spawn_junk(
        &mut self,
        now_ms: u64,
        tier: Tier,
        player: Vec2,
        min_distance: f32,
        rng: &mut StdRng,
        bus: &mut EventBus,
    ) -> Option<TaskId> {
        if self.active.len() >= self.config.max_active + self.config.over_cap_allowance {
            debug!("Junk spawn over cap; skipped");
            return None;
        }
        let point = self.pick_spawn_point(rng, Some((player, min_distance)))?;
        let template = TaskTemplate {
            name: JUNK_NAME.to_string(),
            tier,
            target: TemplateTarget::Random,
        };
        self.publish(&template, Lifetime::Junk, point, now_ms, rng, bus)
    }

    pub fn spawn_decoy(&mut self, now_ms: u64, rng: &mut StdRng, bus: &mut EventBus) -> Option<TaskId> {
        if self.active.len() >= self.config.max_active + self.config.over_cap_allowance {
            debug!("Decoy spawn over cap; skipped");
            return None;
        }
        let point = self.pick_spawn_point(rng, None)?;
        let template = TaskTemplate {
            name: DECOY_NAME.to_string(),
            tier: Tier::Intern,
            target: TemplateTarget::Random,
        };
        self.publish(&template, Lifetime::Decoy, point, now_ms, rng, bus)
    }

    /// Places the named template at `position` (or a free spawn point).
    pub fn spawn_named(
        &mut self,
        name: &str,
        position: Option<Vec2>,
        now_ms: u64,
        rng: &mut StdRng,
        bus: &mut EventBus,
    ) -> Option<TaskId> {
        let template = self.config.templates.iter().find(|t| t.name == name)?.clone();
        let point = match position {
            Some(p) => (usize::MAX, p),
            None => self.pick_spawn_point(rng, None)?,
        };
        self.publish(&template, Lifetime::Standard, point, now_ms, rng, bus)
    }

    fn publish(
        &mut self,
        template: &TaskTemplate,
        lifetime: Lifetime,
        (spawn_point, position): (usize, Vec2),
        now_ms: u64,
        rng: &mut StdRng,
        bus: &mut EventBus,
    ) -> Option<TaskId> {
        let route = match &template.target {
            TemplateTarget::Department(dept) => vec![*dept],
            TemplateTarget::Random => vec![*DepartmentId::ALL.choose(rng)?],
            TemplateTarget::Route(route) => route.clone(),
        };
        let Some(id) = self.pool.acquire() else {
            debug!("Task pool exhausted; spawn skipped");
            return None;
        };

        let task = self.pool.get_mut(id)?;
        task.name = template.name.clone();
        task.tier = template.tier;
        task.state = TaskState::Spawned;
        task.total_stops = route.len() as u8;
        task.route = route;
        task.current_stop = 0;
        task.position = Some(position);
        task.spawn_point = (spawn_point != usize::MAX).then_some(spawn_point);
        task.spawned_at_ms = now_ms;
        task.lifetime = lifetime;
        let snapshot = task.snapshot();

        self.active.push(id);
        bus.publish(GameEvent::TaskSpawned { task: snapshot });
        Some(id)
    }

    // ── Carrying ─────────────────────────────────────────────────────

    /// Moves a task from the map to a carrier.
    pub fn take(&mut self, id: TaskId, carrier: Carrier, now_ms: u64, bus: &mut EventBus) -> Result<(), CommandError> {
        if !self.is_on_map(id) {
            return Err(CommandError::NotOnMap(id));
        }
        let task = self.pool.get_mut(id).ok_or(CommandError::NotOnMap(id))?;
        task.state = TaskState::Carried;
        task.carrier = Some(carrier);
        task.picked_up_at_ms = Some(now_ms);
        task.position = None;
        let snapshot = task.snapshot();
        self.active.retain(|a| *a != id);
        bus.publish(GameEvent::TaskPickedUp {
            task_id: id,
            carrier,
            task: snapshot,
        });
        Ok(())
    }

    /// Drops the last stop of a multi-stop task. Returns false for
    /// single-stop tasks.
    pub fn fast_track(&mut self, id: TaskId) -> bool {
        let Some(task) = self.pool.get_mut(id) else {
            return false;
        };
        if task.total_stops <= 1 || task.is_decoy() {
            return false;
        }
        task.route.pop();
        task.total_stops -= 1;
        true
    }

    /// Carried decoys whose time in the inventory is up.
    pub fn decoys_due(&self, carried: &[TaskId], now_ms: u64) -> Vec<TaskId> {
        carried
            .iter()
            .copied()
            .filter(|id| {
                self.pool.get(*id).is_some_and(|t| {
                    t.is_decoy() && t.picked_up_at_ms.is_some_and(|at| now_ms >= at + self.config.decoy_carry_ms)
                })
            })
            .collect()
    }

    /// Removes a carried decoy and charges its stress. The caller drops it
    /// from the inventory.
    pub fn vanish_decoy(&mut self, id: TaskId, bus: &mut EventBus, stress: &mut StressEngine) {
        if !self.pool.get(id).is_some_and(|t| t.is_decoy() && t.is_carried()) {
            return;
        }
        let applied = stress.add_instant(self.config.decoy_vanish_stress, StressSource::DecoyPickup, bus);
        bus.publish(GameEvent::TaskExpired {
            task_id: id,
            reason: ExpiryReason::DecoyVanished,
            stress_penalty: applied,
            is_junk: false,
            is_decoy: true,
        });
        self.pool.release(id);
    }

    // ── Delivery ─────────────────────────────────────────────────────

    /// Completes the current stop of a carried task.
    pub fn advance_stop(&mut self, id: TaskId, bus: &mut EventBus) -> Option<StopOutcome> {
        let task = self.pool.get_mut(id)?;
        if !task.is_carried() || task.is_decoy() {
            return None;
        }
        let department = task.current_department()?;
        task.current_stop += 1;
        match task.current_department() {
            Some(next) => {
                bus.publish(GameEvent::TaskPartialDelivery {
                    task_id: id,
                    department,
                    stop: task.current_stop,
                    total_stops: task.total_stops,
                    next_department: Some(next),
                });
                Some(StopOutcome::Partial { next })
            }
            None => {
                task.state = TaskState::Delivering;
                Some(StopOutcome::Final)
            }
        }
    }

    /// Resolves a finished task: XP, relief, pressure, history. Publishes
    /// `pressure-bonus` (when earned) then `task-delivered`, and returns the
    /// record to the pool. The caller applies the relief.
    pub fn finish_delivery(
        &mut self,
        id: TaskId,
        carrier: Carrier,
        mods: &DeliveryModifiers,
        now_ms: u64,
        bus: &mut EventBus,
    ) -> Option<DeliveryReport> {
        let task = self.pool.get(id)?;
        if !task.is_carried() || task.is_decoy() {
            return None;
        }
        let department = task.final_department()?;
        let name = task.name.clone();
        let total_stops = task.total_stops;
        let tier = task.tier;
        let is_junk = task.is_junk();

        let junk_chain = if is_junk {
            let window = self.config.junk_chain_window_ms;
            while self
                .junk_deliveries
                .front()
                .is_some_and(|at| now_ms.saturating_sub(*at) > window)
            {
                self.junk_deliveries.pop_front();
            }
            let chained = !self.junk_deliveries.is_empty();
            self.junk_deliveries.push_back(now_ms);
            chained
        } else {
            false
        };

        let favorite_match = mods.favorite == Some(department);
        let pressure = pressure::evaluate(
            &self.pressure,
            PressureInputs {
                agent_nearby: mods.agent_nearby,
                stress: mods.stress,
                hot_zone: self.hot_zones.is_hot(department, now_ms),
            },
        );
        let xp = compute_xp(
            &self.config.xp,
            self.milestone_cap,
            &XpInputs {
                total_stops,
                tier,
                is_junk,
                junk_chain,
                junk_filter: mods.junk_filter,
                linkedin: mods.linkedin,
                favorite_match,
                milestone_bonus: mods.milestone_bonus,
                pressure_multiplier: pressure.multiplier,
                forced_factor: mods.forced_factor,
            },
        );
        let stress_relief = compute_relief(&self.config, total_stops, favorite_match);

        if pressure.bonus > 0.0 {
            bus.publish(GameEvent::PressureBonus {
                multiplier: pressure.multiplier,
                reasons: pressure.reasons.clone(),
                department,
            });
        }
        bus.publish(GameEvent::TaskDelivered {
            task_id: id,
            name,
            department,
            total_stops,
            xp,
            stress_relief,
            carrier,
            forced: mods.forced_factor.is_some(),
            is_junk,
        });

        self.deliveries.record(department);
        if let Some(task) = self.pool.get_mut(id) {
            task.state = TaskState::Done;
        }
        self.pool.release(id);

        Some(DeliveryReport {
            task_id: id,
            department,
            xp,
            stress_relief,
            pressure,
        })
    }

    /// Drops map references to tasks that are no longer on the map.
    /// Returns how many were dropped.
    pub fn repair_active(&mut self) -> usize {
        let before = self.active.len();
        let pool = &self.pool;
        self.active
            .retain(|id| pool.get(*id).is_some_and(|t| t.state == TaskState::Spawned));
        let mut seen = Vec::with_capacity(self.active.len());
        self.active.retain(|id| {
            if seen.contains(id) {
                false
            } else {
                seen.push(*id);
                true
            }
        });
        before - self.active.len()
    }

    pub fn teardown(&mut self, bus: &mut EventBus) {
        bus.sweep(self.owner);
    }
}
