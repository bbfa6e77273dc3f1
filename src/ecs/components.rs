use std::collections::BTreeMap;

use crate::protocol::{AgentId, AgentKind, TaskId, Vec2};

// ── Marker Components ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Player;

#[derive(Debug, Clone)]
pub struct Assistant;

// ── Spatial ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn vec(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn set(&mut self, p: Vec2) {
        self.x = p.x;
        self.y = p.y;
    }
}

impl From<Vec2> for Position {
    fn from(p: Vec2) -> Self {
        Self { x: p.x, y: p.y }
    }
}

#[derive(Debug, Clone)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl Velocity {
    pub fn vec(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn set(&mut self, v: Vec2) {
        self.x = v.x;
        self.y = v.y;
    }
}

impl Default for Velocity {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

// ── Player Components ────────────────────────────────────────────────

/// Latest movement intent from input: a direction (normalized on use) and
/// whether sprint is held.
#[derive(Debug, Clone, Default)]
pub struct Movement {
    pub input: Vec2,
    pub sprinting: bool,
}

#[derive(Debug, Clone)]
pub struct Stamina {
    pub current: f32,
    pub max: f32,
}

/// Base speed plus named multiplicative factors. Each source owns its key,
/// so two micromanagers slow independently and coffee never clobbers them.
#[derive(Debug, Clone)]
pub struct SpeedModifiers {
    pub base_speed: f32,
    pub factors: BTreeMap<String, f32>,
}

impl SpeedModifiers {
    pub fn new(base_speed: f32) -> Self {
        Self {
            base_speed,
            factors: BTreeMap::new(),
        }
    }

    pub fn speed(&self) -> f32 {
        self.factors.values().fold(self.base_speed, |s, f| s * f)
    }
}

#[derive(Debug, Clone)]
pub struct Inventory {
    pub tasks: Vec<TaskId>,
    pub capacity: u32,
}

impl Inventory {
    pub fn is_full(&self) -> bool {
        self.tasks.len() as u32 >= self.capacity
    }

    pub fn remove(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| *t != id);
        self.tasks.len() != before
    }
}

#[derive(Debug, Clone, Default)]
pub struct FreezeState {
    pub frozen_until_ms: u64,
    pub immune_until_ms: u64,
}

impl FreezeState {
    pub fn is_frozen(&self, now_ms: u64) -> bool {
        now_ms < self.frozen_until_ms
    }

    pub fn is_immune(&self, now_ms: u64) -> bool {
        now_ms < self.immune_until_ms
    }
}

// ── Chaos Agent Components ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ChaosAgent {
    pub id: AgentId,
    pub kind: AgentKind,
    pub spawned_at_ms: u64,
    pub enrage_at_ms: u64,
    pub enraged: bool,
}
