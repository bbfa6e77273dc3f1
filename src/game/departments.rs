use std::collections::BTreeMap;

use tracing::info;

use crate::config::{DoorWaypoints, MapConfig};
use crate::events::EventBus;
use crate::protocol::{AgentId, DepartmentId, GameEvent, Rect, Vec2};

#[derive(Debug, Clone, Copy)]
struct Block {
    until_ms: u64,
    agent_id: AgentId,
}

/// Delivery zones, their doors, and which of them a meeting currently holds.
#[derive(Debug, Clone)]
pub struct Departments {
    zones: BTreeMap<DepartmentId, Rect>,
    doors: BTreeMap<DepartmentId, DoorWaypoints>,
    blocks: BTreeMap<DepartmentId, Block>,
}

impl Departments {
    pub fn from_config(map: &MapConfig) -> Self {
        Self {
            zones: map.departments.iter().map(|d| (d.id, d.zone)).collect(),
            doors: map.departments.iter().map(|d| (d.id, d.door.clone())).collect(),
            blocks: BTreeMap::new(),
        }
    }

    pub fn zone(&self, id: DepartmentId) -> Option<Rect> {
        self.zones.get(&id).copied()
    }

    pub fn door(&self, id: DepartmentId) -> Option<&DoorWaypoints> {
        self.doors.get(&id)
    }

    pub fn zone_contains(&self, id: DepartmentId, p: Vec2) -> bool {
        self.zones.get(&id).is_some_and(|z| z.contains(p))
    }

    /// Grows a zone on every side.
    pub fn expand_zone(&mut self, id: DepartmentId, px: f32) {
        if let Some(zone) = self.zones.get_mut(&id) {
            *zone = zone.expanded(px);
        }
    }

    pub fn is_blocked(&self, id: DepartmentId) -> bool {
        self.blocks.contains_key(&id)
    }

    pub fn blocked(&self) -> Vec<DepartmentId> {
        self.blocks.keys().copied().collect()
    }

    /// Number of blocks currently held by one agent.
    pub fn blocks_held_by(&self, agent_id: AgentId) -> usize {
        self.blocks.values().filter(|b| b.agent_id == agent_id).count()
    }

    /// Marks a department un-deliverable. A department holds at most one
    /// block; returns false if it is already blocked.
    pub fn block(
        &mut self,
        id: DepartmentId,
        now_ms: u64,
        duration_ms: u64,
        agent_id: AgentId,
        bus: &mut EventBus,
    ) -> bool {
        if self.is_blocked(id) {
            return false;
        }
        self.blocks.insert(
            id,
            Block {
                until_ms: now_ms + duration_ms,
                agent_id,
            },
        );
        bus.publish(GameEvent::DepartmentBlocked {
            department: id,
            duration_ms,
            agent_id,
        });
        info!("{} blocked by a meeting for {} ms", id.name(), duration_ms);
        true
    }

    /// Lifts every block whose time is up. Returns the released departments.
    pub fn tick(&mut self, now_ms: u64, bus: &mut EventBus) -> Vec<DepartmentId> {
        let expired: Vec<DepartmentId> = self
            .blocks
            .iter()
            .filter(|(_, b)| now_ms >= b.until_ms)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            self.blocks.remove(id);
            bus.publish(GameEvent::DepartmentUnblocked { department: *id });
            info!("{} unblocked", id.name());
        }
        expired
    }
}
