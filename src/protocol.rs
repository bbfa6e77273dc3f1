use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::game::upgrades::{UpgradeId, UpgradeKind};

// ── Core type aliases ──────────────────────────────────────────────

pub type TaskId = u32;
pub type AgentId = u32;
pub type Tick = u64;

// ── Geometry ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Unit vector in the same direction, or zero for a degenerate vector.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len < 1e-4 {
            Vec2::ZERO
        } else {
            Vec2::new(self.x / len, self.y / len)
        }
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Counter-clockwise perpendicular.
    pub fn perpendicular(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    pub fn scale(self, s: f32) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned rectangle in world pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Grows the rectangle by `px` on every side.
    pub fn expanded(&self, px: f32) -> Rect {
        Rect::new(self.x - px, self.y - px, self.w + px * 2.0, self.h + px * 2.0)
    }

    /// Distance from `p` to the closest point of the rectangle (0 inside).
    pub fn distance_to(&self, p: Vec2) -> f32 {
        let cx = p.x.clamp(self.x, self.x + self.w);
        let cy = p.y.clamp(self.y, self.y + self.h);
        p.distance(Vec2::new(cx, cy))
    }
}

// ── Departments ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DepartmentId {
    #[serde(rename = "CEO")]
    Ceo,
    Marketing,
    Engineering,
    Finance,
    #[serde(rename = "HR")]
    Hr,
}

impl DepartmentId {
    pub const ALL: [DepartmentId; 5] = [
        DepartmentId::Ceo,
        DepartmentId::Marketing,
        DepartmentId::Engineering,
        DepartmentId::Finance,
        DepartmentId::Hr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DepartmentId::Ceo => "CEO",
            DepartmentId::Marketing => "Marketing",
            DepartmentId::Engineering => "Engineering",
            DepartmentId::Finance => "Finance",
            DepartmentId::Hr => "HR",
        }
    }
}

// ── Career tiers ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    #[default]
    Intern,
    Associate,
    Manager,
    Director,
    #[serde(rename = "CEO")]
    Ceo,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Intern,
        Tier::Associate,
        Tier::Manager,
        Tier::Director,
        Tier::Ceo,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Tier> {
        Tier::ALL.get(idx).copied()
    }

    /// Levels 1-2 Intern, 3-4 Associate, 5-6 Manager, 7-8 Director, 9 CEO.
    pub fn for_level(level: u32) -> Tier {
        match level {
            0..=2 => Tier::Intern,
            3..=4 => Tier::Associate,
            5..=6 => Tier::Manager,
            7..=8 => Tier::Director,
            _ => Tier::Ceo,
        }
    }

    pub fn lower(self) -> Option<Tier> {
        self.index().checked_sub(1).and_then(Tier::from_index)
    }

    pub fn higher(self) -> Option<Tier> {
        Tier::from_index(self.index() + 1)
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Intern => "Intern",
            Tier::Associate => "Associate",
            Tier::Manager => "Manager",
            Tier::Director => "Director",
            Tier::Ceo => "CEO",
        }
    }
}

// ── Chaos agents ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Micromanager,
    ReplyAllGuy,
    MeetingScheduler,
    ChattyColleague,
    SlackPinger,
}

impl AgentKind {
    pub const ALL: [AgentKind; 5] = [
        AgentKind::Micromanager,
        AgentKind::ReplyAllGuy,
        AgentKind::MeetingScheduler,
        AgentKind::ChattyColleague,
        AgentKind::SlackPinger,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AgentKind::Micromanager => "Micromanager",
            AgentKind::ReplyAllGuy => "Reply-All Guy",
            AgentKind::MeetingScheduler => "Meeting Scheduler",
            AgentKind::ChattyColleague => "Chatty Colleague",
            AgentKind::SlackPinger => "Slack Pinger",
        }
    }
}

// ── Stress ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StressBand {
    None,
    Yellow,
    Orange,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StressSource {
    TaskExpiry,
    Delivery,
    DecoyPickup,
    MeetingBlock,
    Agent,
    FastTracker,
    Upgrade,
    Debug,
}

// ── Tasks ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Idle,
    Spawned,
    Carried,
    Delivering,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Carrier {
    Player,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpiryReason {
    Lifetime,
    DecoyVanished,
}

/// Immutable copy of a task, sufficient to render it without reading back
/// into the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub state: TaskState,
    pub route: Vec<DepartmentId>,
    pub current_stop: u8,
    pub total_stops: u8,
    pub current_department: Option<DepartmentId>,
    pub position: Option<Vec2>,
    pub spawned_at_ms: u64,
    pub is_decoy: bool,
    pub is_junk: bool,
}

// ── Pressure ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureReason {
    UnderPressure,
    ClutchDelivery,
    HotZone,
}

impl PressureReason {
    pub fn label(self) -> &'static str {
        match self {
            PressureReason::UnderPressure => "UNDER PRESSURE",
            PressureReason::ClutchDelivery => "CLUTCH DELIVERY",
            PressureReason::HotZone => "HOT ZONE",
        }
    }
}

// ── Disruptions ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Disruption {
    Slowed { factor: f32 },
    Frozen { duration_ms: u64 },
    Burst { count: u32 },
    DecoySpawned { task_id: TaskId },
    MeetingCalled { department: DepartmentId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Lose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferReason {
    LevelUp,
    Milestone,
}

// ── Events (core → collaborators) ──────────────────────────────────

/// Topic strings for the event bus. Every [`GameEvent`] maps to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    TaskSpawned,
    TaskPickedUp,
    TaskPartialDelivery,
    TaskDelivered,
    TaskExpired,
    LevelUp,
    CeoMilestone,
    MilestoneBonus,
    XpGained,
    StressChanged,
    StressThreshold,
    StressMax,
    UpgradeOffered,
    UpgradeActivated,
    UpgradeExpired,
    UpgradeCapacityChanged,
    AgentSpawned,
    AgentEnraged,
    AgentDisruption,
    AssistantSpawned,
    DepartmentBlocked,
    DepartmentUnblocked,
    PressureBonus,
    GameTimerTick,
    GameOver,
}

impl Topic {
    pub const ALL: [Topic; 25] = [
        Topic::TaskSpawned,
        Topic::TaskPickedUp,
        Topic::TaskPartialDelivery,
        Topic::TaskDelivered,
        Topic::TaskExpired,
        Topic::LevelUp,
        Topic::CeoMilestone,
        Topic::MilestoneBonus,
        Topic::XpGained,
        Topic::StressChanged,
        Topic::StressThreshold,
        Topic::StressMax,
        Topic::UpgradeOffered,
        Topic::UpgradeActivated,
        Topic::UpgradeExpired,
        Topic::UpgradeCapacityChanged,
        Topic::AgentSpawned,
        Topic::AgentEnraged,
        Topic::AgentDisruption,
        Topic::AssistantSpawned,
        Topic::DepartmentBlocked,
        Topic::DepartmentUnblocked,
        Topic::PressureBonus,
        Topic::GameTimerTick,
        Topic::GameOver,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::TaskSpawned => "task-spawned",
            Topic::TaskPickedUp => "task-picked-up",
            Topic::TaskPartialDelivery => "task-partial-delivery",
            Topic::TaskDelivered => "task-delivered",
            Topic::TaskExpired => "task-expired",
            Topic::LevelUp => "level-up",
            Topic::CeoMilestone => "ceo-milestone",
            Topic::MilestoneBonus => "milestone-bonus",
            Topic::XpGained => "xp-gained",
            Topic::StressChanged => "stress-changed",
            Topic::StressThreshold => "stress-threshold",
            Topic::StressMax => "stress-max",
            Topic::UpgradeOffered => "upgrade-offered",
            Topic::UpgradeActivated => "upgrade-activated",
            Topic::UpgradeExpired => "upgrade-expired",
            Topic::UpgradeCapacityChanged => "upgrade-capacity-changed",
            Topic::AgentSpawned => "agent-spawned",
            Topic::AgentEnraged => "agent-enraged",
            Topic::AgentDisruption => "agent-disruption",
            Topic::AssistantSpawned => "assistant-spawned",
            Topic::DepartmentBlocked => "department-blocked",
            Topic::DepartmentUnblocked => "department-unblocked",
            Topic::PressureBonus => "pressure-bonus",
            Topic::GameTimerTick => "game-timer-tick",
            Topic::GameOver => "game-over",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    TaskSpawned {
        task: TaskSnapshot,
    },
    TaskPickedUp {
        task_id: TaskId,
        carrier: Carrier,
        task: TaskSnapshot,
    },
    TaskPartialDelivery {
        task_id: TaskId,
        department: DepartmentId,
        stop: u8,
        total_stops: u8,
        next_department: Option<DepartmentId>,
    },
    TaskDelivered {
        task_id: TaskId,
        name: String,
        department: DepartmentId,
        total_stops: u8,
        xp: u32,
        stress_relief: f32,
        carrier: Carrier,
        forced: bool,
        is_junk: bool,
    },
    TaskExpired {
        task_id: TaskId,
        reason: ExpiryReason,
        stress_penalty: f32,
        is_junk: bool,
        is_decoy: bool,
    },
    LevelUp {
        level: u32,
        tier: Tier,
        previous_tier: Tier,
        is_promotion: bool,
    },
    CeoMilestone {
        milestone_count: u32,
    },
    MilestoneBonus {
        xp_multiplier_bonus: f32,
    },
    XpGained {
        amount: u32,
        total_xp: u64,
        progress: u32,
        threshold: u32,
        level: u32,
        at_cap: bool,
    },
    StressChanged {
        stress: f32,
        delta: f32,
        source: Option<StressSource>,
    },
    StressThreshold {
        level: StressBand,
    },
    StressMax {
        stress: f32,
    },
    UpgradeOffered {
        reason: OfferReason,
        choices: Vec<UpgradeId>,
    },
    UpgradeActivated {
        id: UpgradeId,
        kind: UpgradeKind,
        department: Option<DepartmentId>,
    },
    UpgradeExpired {
        id: UpgradeId,
    },
    UpgradeCapacityChanged {
        capacity: u32,
    },
    AgentSpawned {
        agent_id: AgentId,
        kind: AgentKind,
        position: Vec2,
    },
    AgentEnraged {
        agent_id: AgentId,
        kind: AgentKind,
    },
    AgentDisruption {
        agent_id: AgentId,
        kind: AgentKind,
        disruption: Disruption,
    },
    AssistantSpawned {
        position: Vec2,
    },
    DepartmentBlocked {
        department: DepartmentId,
        duration_ms: u64,
        agent_id: AgentId,
    },
    DepartmentUnblocked {
        department: DepartmentId,
    },
    PressureBonus {
        multiplier: f32,
        reasons: Vec<PressureReason>,
        department: DepartmentId,
    },
    GameTimerTick {
        elapsed_seconds: u32,
        remaining_seconds: u32,
    },
    GameOver {
        outcome: Outcome,
        stats: StatsSnapshot,
    },
}

impl GameEvent {
    pub fn topic(&self) -> Topic {
        match self {
            GameEvent::TaskSpawned { .. } => Topic::TaskSpawned,
            GameEvent::TaskPickedUp { .. } => Topic::TaskPickedUp,
            GameEvent::TaskPartialDelivery { .. } => Topic::TaskPartialDelivery,
            GameEvent::TaskDelivered { .. } => Topic::TaskDelivered,
            GameEvent::TaskExpired { .. } => Topic::TaskExpired,
            GameEvent::LevelUp { .. } => Topic::LevelUp,
            GameEvent::CeoMilestone { .. } => Topic::CeoMilestone,
            GameEvent::MilestoneBonus { .. } => Topic::MilestoneBonus,
            GameEvent::XpGained { .. } => Topic::XpGained,
            GameEvent::StressChanged { .. } => Topic::StressChanged,
            GameEvent::StressThreshold { .. } => Topic::StressThreshold,
            GameEvent::StressMax { .. } => Topic::StressMax,
            GameEvent::UpgradeOffered { .. } => Topic::UpgradeOffered,
            GameEvent::UpgradeActivated { .. } => Topic::UpgradeActivated,
            GameEvent::UpgradeExpired { .. } => Topic::UpgradeExpired,
            GameEvent::UpgradeCapacityChanged { .. } => Topic::UpgradeCapacityChanged,
            GameEvent::AgentSpawned { .. } => Topic::AgentSpawned,
            GameEvent::AgentEnraged { .. } => Topic::AgentEnraged,
            GameEvent::AgentDisruption { .. } => Topic::AgentDisruption,
            GameEvent::AssistantSpawned { .. } => Topic::AssistantSpawned,
            GameEvent::DepartmentBlocked { .. } => Topic::DepartmentBlocked,
            GameEvent::DepartmentUnblocked { .. } => Topic::DepartmentUnblocked,
            GameEvent::PressureBonus { .. } => Topic::PressureBonus,
            GameEvent::GameTimerTick { .. } => Topic::GameTimerTick,
            GameEvent::GameOver { .. } => Topic::GameOver,
        }
    }
}

/// An event stamped with the tick and simulation time it was published at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub tick: Tick,
    pub at_ms: u64,
    pub event: GameEvent,
}

// ── Snapshots ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub level: u32,
    pub tier: Tier,
    pub total_xp: u64,
    pub stress: f32,
    pub peak_stress: f32,
    pub stress_band: StressBand,
    pub elapsed_seconds: f32,
    pub remaining_seconds: f32,
    pub delivered_count: u32,
    pub milestone_count: u32,
    pub active_agent_types: Vec<AgentKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub position: Vec2,
    pub stamina: f32,
    pub frozen: bool,
    pub capacity: u32,
    pub carrying: Vec<TaskId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub kind: AgentKind,
    pub position: Vec2,
    pub state: String,
    pub enraged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub tick: Tick,
    pub stats: StatsSnapshot,
    pub player: PlayerSnapshot,
    pub tasks: Vec<TaskSnapshot>,
    pub agents: Vec<AgentSnapshot>,
    pub assistant: Option<Vec2>,
    pub blocked_departments: Vec<DepartmentId>,
    pub pending_offer: Option<Vec<UpgradeId>>,
    pub paused: bool,
}

// ── Client → Server messages ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerCommand {
    Move { x: f32, y: f32 },
    Sprint { active: bool },
    Pickup { task_id: TaskId },
    ForceDelivery,
    SelectUpgrade { id: UpgradeId },
    Pause,
    Resume,
    MarkTutorialSeen,

    // Debug actions
    DebugSpawnAgent { kind: AgentKind },
    DebugAddXp { amount: u32 },
    DebugSetStress { value: f32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInput {
    pub tick: Tick,
    pub commands: Vec<PlayerCommand>,
}

/// Server-to-client message wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    /// One simulation tick: the events it published and the resulting state.
    Frame {
        events: Vec<Envelope>,
        snapshot: FrameSnapshot,
    },
    /// A command from the client was refused.
    CommandRejected { command: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ladder_matches_levels() {
        assert_eq!(Tier::for_level(1), Tier::Intern);
        assert_eq!(Tier::for_level(2), Tier::Intern);
        assert_eq!(Tier::for_level(3), Tier::Associate);
        assert_eq!(Tier::for_level(6), Tier::Manager);
        assert_eq!(Tier::for_level(8), Tier::Director);
        assert_eq!(Tier::for_level(9), Tier::Ceo);
        assert_eq!(Tier::Intern.lower(), None);
        assert_eq!(Tier::Ceo.higher(), None);
        assert_eq!(Tier::Manager.lower(), Some(Tier::Associate));
    }

    #[test]
    fn rect_distance_is_zero_inside() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(r.distance_to(Vec2::new(5.0, 5.0)), 0.0);
        assert_eq!(r.distance_to(Vec2::new(13.0, 5.0)), 3.0);
        assert!(r.expanded(2.0).contains(Vec2::new(11.5, -1.5)));
    }

    #[test]
    fn every_event_topic_has_a_kebab_name() {
        for topic in Topic::ALL {
            let name = topic.as_str();
            assert!(!name.is_empty());
            assert_eq!(name, name.to_lowercase());
            assert!(!name.contains(' '));
        }
    }

    #[test]
    fn department_names_round_trip_through_json() {
        let json = serde_json::to_string(&DepartmentId::Hr).unwrap();
        assert_eq!(json, "\"HR\"");
        let back: DepartmentId = serde_json::from_str("\"CEO\"").unwrap();
        assert_eq!(back, DepartmentId::Ceo);
        assert!(serde_json::from_str::<DepartmentId>("\"Legal\"").is_err());
    }
}
