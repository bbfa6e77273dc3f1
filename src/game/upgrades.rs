use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{GameConfig, UpgradeConfig};
use crate::error::CommandError;
use crate::events::{EventBus, SubscriberId, SubscriptionId};
use crate::game::departments::Departments;
use crate::game::stress::StressEngine;
use crate::game::task_manager::DeliveryCounts;
use crate::protocol::{AgentKind, DepartmentId, GameEvent, OfferReason, StressSource, TaskId, Topic};

// ── Upgrade identifiers ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeId {
    CoffeeBoost,
    StressBall,
    TaskNavigation,
    ExtraHands,
    VacationDay,
    LinkedinPremium,
    DepartmentalFavorite,
    Airpods,
    ReplyAllFilter,
    MeetingBlocker,
    DoNotDisturb,
    CornerOffice,
    InboxZero,
    FastTracker,
    ExecutivePresence,
    PersonalAssistant,
}

/// Lifecycle of an upgrade once chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    Permanent,
    Timed,
    Instant,
    Charges,
}

// ── Upgrade definition ──────────────────────────────────────────────

pub struct UpgradeDef {
    pub id: UpgradeId,
    pub name: &'static str,
    pub available_from_level: u32,
    pub kind: UpgradeKind,
    /// Only offered once this agent type has appeared.
    pub requires_agent: Option<AgentKind>,
    /// Only offered once this many distinct agent types have appeared.
    pub requires_agent_count: Option<usize>,
    /// Agent types this upgrade counters.
    pub counters: &'static [AgentKind],
    pub description: &'static str,
}

impl UpgradeDef {
    pub fn is_anti_agent(&self) -> bool {
        !self.counters.is_empty()
    }
}

/// Returns the full catalogue of upgrades.
pub fn all_upgrades() -> &'static [UpgradeDef] {
    use AgentKind::*;
    use UpgradeId::*;
    use UpgradeKind::*;

    static UPGRADES: &[UpgradeDef] = &[
        UpgradeDef {
            id: CoffeeBoost,
            name: "Coffee Boost",
            available_from_level: 1,
            kind: Timed,
            requires_agent: None,
            requires_agent_count: None,
            counters: &[],
            description: "Move 30% faster for a while",
        },
        UpgradeDef {
            id: StressBall,
            name: "Stress Ball",
            available_from_level: 1,
            kind: Permanent,
            requires_agent: None,
            requires_agent_count: None,
            counters: &[],
            description: "Stress drains faster once it runs high",
        },
        UpgradeDef {
            id: TaskNavigation,
            name: "Task Navigation",
            available_from_level: 1,
            kind: Permanent,
            requires_agent: None,
            requires_agent_count: None,
            counters: &[],
            description: "Arrows point at carried task destinations",
        },
        UpgradeDef {
            id: ExtraHands,
            name: "Extra Hands",
            available_from_level: 2,
            kind: Permanent,
            requires_agent: None,
            requires_agent_count: None,
            counters: &[],
            description: "Carry one more task",
        },
        UpgradeDef {
            id: VacationDay,
            name: "Vacation Day",
            available_from_level: 2,
            kind: Instant,
            requires_agent: None,
            requires_agent_count: None,
            counters: &[],
            description: "Shed a quarter of your stress",
        },
        UpgradeDef {
            id: LinkedinPremium,
            name: "LinkedIn Premium",
            available_from_level: 3,
            kind: Timed,
            requires_agent: None,
            requires_agent_count: None,
            counters: &[],
            description: "Double XP for a while",
        },
        UpgradeDef {
            id: DepartmentalFavorite,
            name: "Departmental Favorite",
            available_from_level: 3,
            kind: Permanent,
            requires_agent: None,
            requires_agent_count: None,
            counters: &[],
            description: "Double XP and relief at one department",
        },
        UpgradeDef {
            id: Airpods,
            name: "AirPods",
            available_from_level: 1,
            kind: Permanent,
            requires_agent: Some(Micromanager),
            requires_agent_count: None,
            counters: &[Micromanager, ChattyColleague],
            description: "Shrug off hovering and small talk",
        },
        UpgradeDef {
            id: ReplyAllFilter,
            name: "Reply-All Filter",
            available_from_level: 1,
            kind: Permanent,
            requires_agent: Some(ReplyAllGuy),
            requires_agent_count: None,
            counters: &[ReplyAllGuy],
            description: "Junk tasks pay full XP",
        },
        UpgradeDef {
            id: MeetingBlocker,
            name: "Meeting Blocker",
            available_from_level: 1,
            kind: Permanent,
            requires_agent: Some(MeetingScheduler),
            requires_agent_count: None,
            counters: &[MeetingScheduler],
            description: "Meetings end twice as fast",
        },
        UpgradeDef {
            id: DoNotDisturb,
            name: "Do Not Disturb",
            available_from_level: 1,
            kind: Timed,
            requires_agent: Some(SlackPinger),
            requires_agent_count: None,
            counters: &[SlackPinger],
            description: "Silence pings for a while",
        },
        UpgradeDef {
            id: CornerOffice,
            name: "Corner Office",
            available_from_level: 4,
            kind: Permanent,
            requires_agent: None,
            requires_agent_count: None,
            counters: &[],
            description: "Your busiest department gets a bigger door",
        },
        UpgradeDef {
            id: InboxZero,
            name: "Inbox Zero",
            available_from_level: 5,
            kind: Instant,
            requires_agent: None,
            requires_agent_count: None,
            counters: &[],
            description: "Everything you carry is delivered",
        },
        UpgradeDef {
            id: FastTracker,
            name: "Fast Tracker",
            available_from_level: 5,
            kind: Charges,
            requires_agent: None,
            requires_agent_count: None,
            counters: &[],
            description: "Skip the last stop of multi-stop tasks",
        },
        UpgradeDef {
            id: ExecutivePresence,
            name: "Executive Presence",
            available_from_level: 4,
            kind: Permanent,
            requires_agent: None,
            requires_agent_count: Some(2),
            counters: &[],
            description: "Deliveries make agents hesitate",
        },
        UpgradeDef {
            id: PersonalAssistant,
            name: "Personal Assistant",
            available_from_level: 6,
            kind: Permanent,
            requires_agent: None,
            requires_agent_count: None,
            counters: &[],
            description: "Hire help that fetches and delivers",
        },
    ];

    UPGRADES
}

/// Looks up a single upgrade definition by id.
pub fn get_upgrade(id: UpgradeId) -> &'static UpgradeDef {
    // The catalogue holds every variant; the index search cannot miss.
    let all = all_upgrades();
    all.iter().find(|u| u.id == id).unwrap_or(&all[0])
}

// ── Player capabilities ─────────────────────────────────────────────

/// The slice of player state upgrades are allowed to touch.
pub trait PlayerCapabilities {
    fn set_speed_modifier(&mut self, key: &str, factor: f32);
    fn clear_speed_modifier(&mut self, key: &str);
    fn capacity(&self) -> u32;
    fn set_capacity(&mut self, capacity: u32);
    fn carried(&self) -> Vec<TaskId>;
}

pub const COFFEE_MODIFIER: &str = "coffee_boost";

/// Work left for the caller after an upgrade is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    SpawnAssistant,
    DeliverAllCarried,
}

pub struct ApplyContext<'a> {
    pub config: &'a UpgradeConfig,
    pub bus: &'a mut EventBus,
    pub rng: &'a mut StdRng,
    pub player: &'a mut dyn PlayerCapabilities,
    pub departments: &'a mut Departments,
    pub deliveries: &'a DeliveryCounts,
    pub stress: &'a mut StressEngine,
}

/// Conditions an offer is drawn under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfferContext {
    pub level: u32,
    pub elapsed_secs: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingOffer {
    pub reason: OfferReason,
    pub choices: Vec<UpgradeId>,
    pub context: OfferContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AirPodsResistance {
    pub freeze_reduction: f32,
    pub slow_resistance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveUpgrade {
    pub id: UpgradeId,
    pub kind: UpgradeKind,
    pub remaining_ms: Option<f32>,
    pub charges: Option<u32>,
}

#[derive(Debug, Clone)]
struct TimedRecord {
    id: UpgradeId,
    remaining_ms: f32,
    total_ms: f32,
}

// ── Player upgrade state ────────────────────────────────────────────

#[derive(Debug)]
pub struct UpgradeEngine {
    owner: SubscriberId,
    granted: BTreeSet<UpgradeId>,
    timed: Vec<TimedRecord>,
    charges: BTreeMap<UpgradeId, u32>,
    corner_office_dept: Option<DepartmentId>,
    favorite_dept: Option<DepartmentId>,
    delivery_sub: Option<SubscriptionId>,
    executive_presence_until: Option<u64>,
    spawned_agents: BTreeSet<AgentKind>,
    new_agents_since_offer: BTreeSet<AgentKind>,
    pending: VecDeque<PendingOffer>,
}

impl UpgradeEngine {
    pub fn new(bus: &mut EventBus) -> Self {
        Self {
            owner: bus.register("upgrades"),
            granted: BTreeSet::new(),
            timed: Vec::new(),
            charges: BTreeMap::new(),
            corner_office_dept: None,
            favorite_dept: None,
            delivery_sub: None,
            executive_presence_until: None,
            spawned_agents: BTreeSet::new(),
            new_agents_since_offer: BTreeSet::new(),
            pending: VecDeque::new(),
        }
    }

    // ── Agent history ────────────────────────────────────────────────

    /// Records that an agent type has appeared. Only the first appearance of
    /// a type counts as new.
    pub fn note_agent_spawned(&mut self, kind: AgentKind) {
        if self.spawned_agents.insert(kind) {
            self.new_agents_since_offer.insert(kind);
        }
    }

    pub fn spawned_agent_types(&self) -> Vec<AgentKind> {
        self.spawned_agents.iter().copied().collect()
    }

    // ── Offers ───────────────────────────────────────────────────────

    /// Permanent and instant upgrades are used up once granted.
    fn is_spent(&self, id: UpgradeId) -> bool {
        matches!(get_upgrade(id).kind, UpgradeKind::Permanent | UpgradeKind::Instant) && self.granted.contains(&id)
    }

    fn is_eligible(&self, def: &UpgradeDef, ctx: OfferContext, config: &GameConfig) -> bool {
        if def.available_from_level > ctx.level {
            return false;
        }
        if self.is_spent(def.id) {
            return false;
        }
        if let Some(kind) = def.requires_agent {
            if !self.spawned_agents.contains(&kind) {
                let overridden = config.schedule_entry(kind).is_some_and(|entry| {
                    ctx.level >= entry.level_gate + config.upgrades.agent_gate_override_levels
                        && ctx.elapsed_secs >= entry.time_gate_secs
                });
                if !overridden {
                    return false;
                }
            }
        }
        if let Some(count) = def.requires_agent_count {
            if self.spawned_agents.len() < count {
                return false;
            }
        }
        true
    }

    /// Draws an offer from the eligible catalogue. If new agent types have
    /// appeared since the last offer and an eligible upgrade counters one of
    /// them, that upgrade is guaranteed a slot.
    pub fn generate_offer(&mut self, ctx: OfferContext, config: &GameConfig, rng: &mut StdRng) -> Vec<UpgradeId> {
        let mut eligible: Vec<UpgradeId> = all_upgrades()
            .iter()
            .filter(|def| self.is_eligible(def, ctx, config))
            .map(|def| def.id)
            .collect();

        let guaranteed = eligible.iter().copied().find(|id| {
            get_upgrade(*id)
                .counters
                .iter()
                .any(|kind| self.new_agents_since_offer.contains(kind))
        });

        eligible.shuffle(rng);
        let mut offer: Vec<UpgradeId> = eligible.into_iter().take(config.upgrades.offer_size).collect();

        if let Some(id) = guaranteed {
            if !offer.contains(&id) {
                if offer.len() < config.upgrades.offer_size {
                    offer.push(id);
                } else if let Some(last) = offer.last_mut() {
                    *last = id;
                }
            }
        }

        self.new_agents_since_offer.clear();
        offer
    }

    /// Generates an offer and queues it. Empty offers are dropped.
    pub fn queue_offer(
        &mut self,
        reason: OfferReason,
        ctx: OfferContext,
        config: &GameConfig,
        rng: &mut StdRng,
        bus: &mut EventBus,
    ) {
        let choices = self.generate_offer(ctx, config, rng);
        if choices.is_empty() {
            debug!("No eligible upgrades at level {}; offer skipped", ctx.level);
            return;
        }
        bus.publish(GameEvent::UpgradeOffered {
            reason,
            choices: choices.clone(),
        });
        self.pending.push_back(PendingOffer {
            reason,
            choices,
            context: ctx,
        });
    }

    /// Drops used-up upgrades from every queued offer and tops the offer
    /// back up from what is still eligible under its own context. Changed
    /// offers are republished; offers left empty are discarded.
    pub fn refresh_pending(&mut self, config: &GameConfig, rng: &mut StdRng, bus: &mut EventBus) {
        let queued = std::mem::take(&mut self.pending);
        for mut offer in queued {
            let before = offer.choices.len();
            offer.choices.retain(|id| !self.is_spent(*id));
            if offer.choices.len() == before {
                self.pending.push_back(offer);
                continue;
            }

            let mut spare: Vec<UpgradeId> = all_upgrades()
                .iter()
                .filter(|def| !offer.choices.contains(&def.id) && self.is_eligible(def, offer.context, config))
                .map(|def| def.id)
                .collect();
            spare.shuffle(rng);
            let room = config.upgrades.offer_size.saturating_sub(offer.choices.len());
            offer.choices.extend(spare.into_iter().take(room));

            if offer.choices.is_empty() {
                debug!("Queued offer emptied by earlier picks; dropped");
                continue;
            }
            bus.publish(GameEvent::UpgradeOffered {
                reason: offer.reason,
                choices: offer.choices.clone(),
            });
            self.pending.push_back(offer);
        }
    }

    pub fn pending_offer(&self) -> Option<&PendingOffer> {
        self.pending.front()
    }

    pub fn has_pending_offer(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Resolves the front offer in favour of `id`.
    pub fn take_choice(&mut self, id: UpgradeId) -> Result<(), CommandError> {
        let offer = self.pending.front().ok_or(CommandError::NoPendingOffer)?;
        if !offer.choices.contains(&id) {
            return Err(CommandError::NotOffered(id));
        }
        if self.is_spent(id) {
            return Err(CommandError::AlreadyGranted(id));
        }
        self.pending.pop_front();
        Ok(())
    }

    // ── Application ──────────────────────────────────────────────────

    /// Applies an upgrade's effect. `upgrade-activated` is published before
    /// any event the effect itself causes.
    /// A used-up permanent or instant upgrade is ignored.
    pub fn apply(&mut self, id: UpgradeId, ctx: &mut ApplyContext<'_>) -> Option<FollowUp> {
        let def = get_upgrade(id);
        if self.is_spent(id) {
            debug!("{} already granted; ignored", def.name);
            return None;
        }
        self.granted.insert(id);

        let department = match id {
            UpgradeId::CornerOffice => {
                let dept = self.pick_distinct_department(self.favorite_dept, ctx);
                self.corner_office_dept = Some(dept);
                Some(dept)
            }
            UpgradeId::DepartmentalFavorite => {
                let dept = self.pick_distinct_department(self.corner_office_dept, ctx);
                self.favorite_dept = Some(dept);
                Some(dept)
            }
            _ => None,
        };

        ctx.bus.publish(GameEvent::UpgradeActivated {
            id,
            kind: def.kind,
            department,
        });
        info!("Upgrade activated: {}", def.name);

        let cfg = ctx.config;
        match id {
            UpgradeId::CoffeeBoost => {
                ctx.player.set_speed_modifier(COFFEE_MODIFIER, cfg.coffee_speed_factor);
                self.start_timer(id, cfg.coffee_ms);
            }
            UpgradeId::LinkedinPremium => self.start_timer(id, cfg.linkedin_ms),
            UpgradeId::DoNotDisturb => self.start_timer(id, cfg.do_not_disturb_ms),
            UpgradeId::ExtraHands => {
                let capacity = ctx.player.capacity() + cfg.extra_hands_capacity;
                ctx.player.set_capacity(capacity);
                ctx.bus.publish(GameEvent::UpgradeCapacityChanged { capacity });
            }
            UpgradeId::VacationDay => {
                ctx.stress.relieve(cfg.vacation_relief, StressSource::Upgrade, ctx.bus);
            }
            UpgradeId::CornerOffice => {
                if let Some(dept) = department {
                    ctx.departments.expand_zone(dept, cfg.corner_office_expand_px);
                }
            }
            UpgradeId::FastTracker => {
                self.charges.insert(id, cfg.fast_tracker_charges);
            }
            UpgradeId::ExecutivePresence => {
                if self.delivery_sub.is_none() {
                    self.delivery_sub = Some(ctx.bus.subscribe(self.owner, &[Topic::TaskDelivered]));
                }
            }
            UpgradeId::InboxZero => return Some(FollowUp::DeliverAllCarried),
            UpgradeId::PersonalAssistant => return Some(FollowUp::SpawnAssistant),
            UpgradeId::StressBall
            | UpgradeId::TaskNavigation
            | UpgradeId::DepartmentalFavorite
            | UpgradeId::Airpods
            | UpgradeId::ReplyAllFilter
            | UpgradeId::MeetingBlocker => {}
        }
        None
    }

    /// Corner Office and Departmental Favorite never share a department.
    fn pick_distinct_department(&self, other: Option<DepartmentId>, ctx: &mut ApplyContext<'_>) -> DepartmentId {
        let ranked = match other {
            None => ctx.deliveries.most_delivered_dept(),
            Some(first) => ctx.deliveries.second_most_delivered_dept(first),
        };
        if let Some(dept) = ranked {
            return dept;
        }
        let choices: Vec<DepartmentId> = DepartmentId::ALL
            .iter()
            .copied()
            .filter(|d| Some(*d) != other)
            .collect();
        choices.choose(&mut *ctx.rng).copied().unwrap_or(DepartmentId::Marketing)
    }

    fn start_timer(&mut self, id: UpgradeId, duration_ms: u64) {
        let total_ms = duration_ms as f32;
        match self.timed.iter_mut().find(|t| t.id == id) {
            Some(record) => record.remaining_ms = record.total_ms,
            None => self.timed.push(TimedRecord {
                id,
                remaining_ms: total_ms,
                total_ms,
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Counts down timed upgrades and refreshes the executive presence
    /// window from deliveries published since the last tick.
    pub fn tick(
        &mut self,
        dt_ms: f32,
        config: &UpgradeConfig,
        player: &mut dyn PlayerCapabilities,
        bus: &mut EventBus,
    ) {
        if let Some(sub) = self.delivery_sub {
            if let Some(last) = bus.drain(sub).last() {
                self.executive_presence_until = Some(last.at_ms + config.executive_presence_ms);
            }
        }

        let mut expired = Vec::new();
        for record in &mut self.timed {
            record.remaining_ms -= dt_ms;
            if record.remaining_ms <= 0.0 {
                expired.push(record.id);
            }
        }
        self.timed.retain(|t| t.remaining_ms > 0.0);

        for id in expired {
            if id == UpgradeId::CoffeeBoost {
                player.clear_speed_modifier(COFFEE_MODIFIER);
            }
            bus.publish(GameEvent::UpgradeExpired { id });
            info!("Upgrade expired: {}", get_upgrade(id).name);
        }
    }

    /// Uses one charge. Returns false if none were left.
    pub fn consume_charge(&mut self, id: UpgradeId, bus: &mut EventBus) -> bool {
        let Some(left) = self.charges.get_mut(&id) else {
            return false;
        };
        *left = left.saturating_sub(1);
        if *left == 0 {
            self.charges.remove(&id);
            bus.publish(GameEvent::UpgradeExpired { id });
            info!("Upgrade used up: {}", get_upgrade(id).name);
        }
        true
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_active(&self, id: UpgradeId) -> bool {
        match get_upgrade(id).kind {
            UpgradeKind::Permanent => self.granted.contains(&id),
            UpgradeKind::Timed => self.timed.iter().any(|t| t.id == id),
            UpgradeKind::Charges => self.charges.get(&id).is_some_and(|n| *n > 0),
            UpgradeKind::Instant => false,
        }
    }

    pub fn charges(&self, id: UpgradeId) -> u32 {
        self.charges.get(&id).copied().unwrap_or(0)
    }

    pub fn get_active_upgrades_list(&self) -> Vec<ActiveUpgrade> {
        let mut list: Vec<ActiveUpgrade> = self
            .granted
            .iter()
            .filter(|id| get_upgrade(**id).kind == UpgradeKind::Permanent)
            .map(|&id| ActiveUpgrade {
                id,
                kind: UpgradeKind::Permanent,
                remaining_ms: None,
                charges: None,
            })
            .collect();
        list.extend(self.timed.iter().map(|t| ActiveUpgrade {
            id: t.id,
            kind: UpgradeKind::Timed,
            remaining_ms: Some(t.remaining_ms),
            charges: None,
        }));
        list.extend(self.charges.iter().map(|(&id, &n)| ActiveUpgrade {
            id,
            kind: UpgradeKind::Charges,
            remaining_ms: None,
            charges: Some(n),
        }));
        list
    }

    pub fn airpods_resistance(&self, config: &UpgradeConfig) -> AirPodsResistance {
        if self.is_active(UpgradeId::Airpods) {
            AirPodsResistance {
                freeze_reduction: config.airpods_freeze_reduction,
                slow_resistance: config.airpods_slow_resistance,
            }
        } else {
            AirPodsResistance::default()
        }
    }

    pub fn corner_office_dept(&self) -> Option<DepartmentId> {
        self.corner_office_dept
    }

    pub fn favorite_dept(&self) -> Option<DepartmentId> {
        self.favorite_dept
    }

    pub fn task_navigation_active(&self) -> bool {
        self.is_active(UpgradeId::TaskNavigation)
    }

    pub fn executive_presence_active(&self, now_ms: u64) -> bool {
        self.executive_presence_until.is_some_and(|until| now_ms < until)
    }

    /// Drops the engine's bus subscriptions.
    pub fn teardown(&mut self, bus: &mut EventBus) {
        bus.sweep(self.owner);
        self.delivery_sub = None;
    }
}
