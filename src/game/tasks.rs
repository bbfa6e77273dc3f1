use crate::protocol::{Carrier, DepartmentId, TaskId, TaskSnapshot, TaskState, Tier, Vec2};

/// How long a task may sit on the map before it expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    Standard,
    Junk,
    Decoy,
}

/// One reusable task record. Records never leave the pool; they cycle
/// Idle → Spawned → Carried → (Delivering) → Done → Idle.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub tier: Tier,
    pub state: TaskState,
    pub route: Vec<DepartmentId>,
    pub current_stop: u8,
    pub total_stops: u8,
    pub position: Option<Vec2>,
    pub spawn_point: Option<usize>,
    pub spawned_at_ms: u64,
    pub lifetime: Lifetime,
    pub carrier: Option<Carrier>,
    pub picked_up_at_ms: Option<u64>,
}

impl Task {
    fn idle(id: TaskId) -> Self {
        Task {
            id,
            name: String::new(),
            tier: Tier::Intern,
            state: TaskState::Idle,
            route: Vec::new(),
            current_stop: 0,
            total_stops: 0,
            position: None,
            spawn_point: None,
            spawned_at_ms: 0,
            lifetime: Lifetime::Standard,
            carrier: None,
            picked_up_at_ms: None,
        }
    }

    fn reset(&mut self) {
        *self = Task::idle(self.id);
    }

    pub fn is_junk(&self) -> bool {
        self.lifetime == Lifetime::Junk
    }

    pub fn is_decoy(&self) -> bool {
        self.lifetime == Lifetime::Decoy
    }

    /// Department the next stop is at, if any stops remain.
    pub fn current_department(&self) -> Option<DepartmentId> {
        if self.current_stop >= self.total_stops {
            return None;
        }
        self.route.get(self.current_stop as usize).copied()
    }

    pub fn final_department(&self) -> Option<DepartmentId> {
        self.route.last().copied()
    }

    pub fn remaining_stops(&self) -> u8 {
        self.total_stops.saturating_sub(self.current_stop)
    }

    pub fn is_carried(&self) -> bool {
        matches!(self.state, TaskState::Carried | TaskState::Delivering)
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            name: self.name.clone(),
            state: self.state,
            route: self.route.clone(),
            current_stop: self.current_stop,
            total_stops: self.total_stops,
            current_department: self.current_department(),
            position: self.position,
            spawned_at_ms: self.spawned_at_ms,
            is_decoy: self.is_decoy(),
            is_junk: self.is_junk(),
        }
    }
}

/// Fixed-size store of task records plus a free list of Idle ids.
#[derive(Debug, Clone)]
pub struct TaskPool {
    records: Vec<Task>,
    free: Vec<TaskId>,
}

impl TaskPool {
    pub fn new(size: usize) -> Self {
        let records: Vec<Task> = (0..size as TaskId).map(Task::idle).collect();
        // Lowest ids are handed out first.
        let free = (0..size as TaskId).rev().collect();
        TaskPool { records, free }
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn idle_count(&self) -> usize {
        self.free.len()
    }

    /// Takes an Idle record, or `None` when the pool is exhausted.
    pub fn acquire(&mut self) -> Option<TaskId> {
        self.free.pop()
    }

    /// Resets a record to Idle and returns it to the free list. Releasing an
    /// id that is already free is ignored.
    pub fn release(&mut self, id: TaskId) {
        let Some(task) = self.records.get_mut(id as usize) else {
            return;
        };
        if task.state == TaskState::Idle && self.free.contains(&id) {
            return;
        }
        task.reset();
        self.free.push(id);
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.records.get(id as usize)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.records.get_mut(id as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.records.iter()
    }
}
