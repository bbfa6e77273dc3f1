//! The personal assistant: a friendly NPC that fetches tasks off the floor
//! and runs them to their final department in one trip.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use super::steering::{steer, SteerOutcome, Steering};
use crate::config::GameConfig;
use crate::events::EventBus;
use crate::game::departments::Departments;
use crate::game::task_manager::TaskManager;
use crate::game::tilemap::OfficeMap;
use crate::protocol::{Carrier, TaskId, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AssistantState {
    #[default]
    Wandering,
    Fetching { task_id: TaskId, elapsed_ms: f32 },
    Delivering { task_id: TaskId, waypoint: usize, elapsed_ms: f32 },
}

pub struct AssistantContext<'a> {
    pub now_ms: u64,
    pub dt_ms: f32,
    pub config: &'a GameConfig,
    pub map: &'a OfficeMap,
    pub rng: &'a mut StdRng,
    pub bus: &'a mut EventBus,
    pub tasks: &'a mut TaskManager,
    pub departments: &'a Departments,
}

#[derive(Debug, Clone, Default)]
pub struct AssistantBrain {
    pub state: AssistantState,
    steering: Steering,
    seek_ms: f32,
}

impl AssistantBrain {
    /// The task currently in the assistant's hands.
    pub fn holding(&self) -> Option<TaskId> {
        match self.state {
            AssistantState::Delivering { task_id, .. } => Some(task_id),
            _ => None,
        }
    }

    pub fn state_label(&self) -> &'static str {
        match self.state {
            AssistantState::Wandering => "wandering",
            AssistantState::Fetching { .. } => "fetching",
            AssistantState::Delivering { .. } => "delivering",
        }
    }

    /// Advances the assistant. Returns a held task that is ready to be
    /// delivered; the caller resolves the delivery.
    pub fn tick(&mut self, pos: &mut Vec2, vel: &mut Vec2, ctx: &mut AssistantContext<'_>) -> Option<TaskId> {
        match self.state {
            AssistantState::Wandering => {
                self.wander(pos, vel, ctx);
                None
            }
            AssistantState::Fetching { task_id, elapsed_ms } => {
                self.fetch(task_id, elapsed_ms + ctx.dt_ms, pos, vel, ctx);
                None
            }
            AssistantState::Delivering {
                task_id,
                waypoint,
                elapsed_ms,
            } => self.deliver(task_id, waypoint, elapsed_ms + ctx.dt_ms, pos, vel, ctx),
        }
    }

    fn step(&mut self, pos: &mut Vec2, vel: &mut Vec2, ctx: &mut AssistantContext<'_>) -> SteerOutcome {
        steer(
            &mut self.steering,
            pos,
            vel,
            ctx.config.assistant.speed,
            ctx.dt_ms,
            ctx.map,
            &ctx.config.agents.steering,
            &mut *ctx.rng,
        )
    }

    fn random_point(ctx: &mut AssistantContext<'_>) -> Vec2 {
        let margin = ctx.config.assistant.wander_margin;
        let (w, h) = (ctx.map.width, ctx.map.height);
        for _ in 0..8 {
            let p = Vec2::new(
                ctx.rng.gen_range(margin..(w - margin).max(margin + 1.0)),
                ctx.rng.gen_range(margin..(h - margin).max(margin + 1.0)),
            );
            if !ctx.map.is_blocked(p) {
                return p;
            }
        }
        Vec2::new(w / 2.0, h / 2.0)
    }

    fn wander(&mut self, pos: &mut Vec2, vel: &mut Vec2, ctx: &mut AssistantContext<'_>) {
        let cfg = &ctx.config.assistant;
        let (arrival, interval) = (cfg.wander_arrival, cfg.seek_interval_ms);

        let reached = self.steering.target.map_or(true, |t| pos.distance(t) < arrival);
        if reached {
            let next = Self::random_point(ctx);
            self.steering.seek(next);
        }
        if self.step(pos, vel, ctx) == SteerOutcome::Stuck {
            self.steering.clear();
        }

        self.seek_ms += ctx.dt_ms;
        if self.seek_ms >= interval {
            self.seek_ms = 0.0;
            if let Some(task_id) = ctx.tasks.nearest_for_pickup(*pos) {
                debug!("Assistant going for task {}", task_id);
                self.steering.clear();
                self.state = AssistantState::Fetching {
                    task_id,
                    elapsed_ms: 0.0,
                };
            }
        }
    }

    fn fetch(&mut self, task_id: TaskId, elapsed_ms: f32, pos: &mut Vec2, vel: &mut Vec2, ctx: &mut AssistantContext<'_>) {
        let target = ctx
            .tasks
            .get(task_id)
            .and_then(|t| t.position)
            .filter(|_| ctx.tasks.is_on_map(task_id));
        let Some(target) = target else {
            debug!("Task {} gone before the assistant reached it", task_id);
            self.back_to_wander(vel);
            return;
        };
        if elapsed_ms >= ctx.config.assistant.fetch_timeout_ms {
            debug!("Assistant gave up fetching task {}", task_id);
            self.back_to_wander(vel);
            return;
        }

        if pos.distance(target) <= ctx.config.assistant.pickup_range {
            if ctx.tasks.take(task_id, Carrier::Assistant, ctx.now_ms, ctx.bus).is_ok() {
                *vel = Vec2::ZERO;
                self.steering.clear();
                self.state = AssistantState::Delivering {
                    task_id,
                    waypoint: 0,
                    elapsed_ms: 0.0,
                };
            } else {
                self.back_to_wander(vel);
            }
            return;
        }

        self.steering.retarget(target);
        if self.step(pos, vel, ctx) == SteerOutcome::Stuck {
            self.steering.seek(target);
        }
        self.state = AssistantState::Fetching { task_id, elapsed_ms };
    }

    fn deliver(
        &mut self,
        task_id: TaskId,
        waypoint: usize,
        elapsed_ms: f32,
        pos: &mut Vec2,
        vel: &mut Vec2,
        ctx: &mut AssistantContext<'_>,
    ) -> Option<TaskId> {
        let door = ctx
            .tasks
            .get(task_id)
            .and_then(|t| t.final_department())
            .and_then(|d| ctx.departments.door(d))
            .cloned();
        let Some(door) = door else {
            self.back_to_wander(vel);
            return Some(task_id);
        };
        let path = [door.approach, door.entry];

        if elapsed_ms >= ctx.config.assistant.deliver_timeout_ms {
            debug!("Assistant delivery of task {} timed out; delivering anyway", task_id);
            self.back_to_wander(vel);
            return Some(task_id);
        }
        if waypoint + 1 >= path.len() && pos.distance(path[path.len() - 1]) < ctx.config.assistant.deliver_arrival {
            self.back_to_wander(vel);
            return Some(task_id);
        }

        let waypoint = waypoint.min(path.len() - 1);
        if self.steering.target != Some(path[waypoint]) {
            self.steering.seek(path[waypoint]);
        }
        let next = match self.step(pos, vel, ctx) {
            SteerOutcome::Arrived if waypoint + 1 < path.len() => waypoint + 1,
            SteerOutcome::Arrived => {
                self.back_to_wander(vel);
                return Some(task_id);
            }
            SteerOutcome::Stuck => {
                self.steering.seek(path[waypoint]);
                waypoint
            }
            _ => waypoint,
        };
        self.state = AssistantState::Delivering {
            task_id,
            waypoint: next,
            elapsed_ms,
        };
        None
    }

    fn back_to_wander(&mut self, vel: &mut Vec2) {
        *vel = Vec2::ZERO;
        self.steering.clear();
        self.seek_ms = 0.0;
        self.state = AssistantState::Wandering;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::protocol::{DepartmentId, TaskState};

    struct Rig {
        config: GameConfig,
        map: OfficeMap,
        rng: StdRng,
        bus: EventBus,
        tasks: TaskManager,
        departments: Departments,
        now_ms: u64,
    }

    impl Rig {
        fn new() -> Self {
            let config = GameConfig::default();
            let mut bus = EventBus::new();
            let tasks = TaskManager::new(&config, &mut bus);
            Self {
                map: OfficeMap::from_config(&config.map),
                departments: Departments::from_config(&config.map),
                rng: StdRng::seed_from_u64(21),
                now_ms: 0,
                config,
                bus,
                tasks,
            }
        }

        fn run(&mut self, brain: &mut AssistantBrain, pos: &mut Vec2, ms: u32) -> Option<TaskId> {
            let mut vel = Vec2::ZERO;
            for _ in 0..ms / 16 {
                self.now_ms += 16;
                self.bus.set_time(self.now_ms / 16, self.now_ms);
                let mut ctx = AssistantContext {
                    now_ms: self.now_ms,
                    dt_ms: 16.0,
                    config: &self.config,
                    map: &self.map,
                    rng: &mut self.rng,
                    bus: &mut self.bus,
                    tasks: &mut self.tasks,
                    departments: &self.departments,
                };
                if let Some(id) = brain.tick(pos, &mut vel, &mut ctx) {
                    return Some(id);
                }
            }
            None
        }
    }

    #[test]
    fn fetches_and_walks_a_task_to_its_department() {
        let mut rig = Rig::new();
        let mut pos = Vec2::new(640.0, 480.0);
        let id = rig
            .tasks
            .spawn_named("Coffee Order", Some(Vec2::new(560.0, 480.0)), 0, &mut rig.rng, &mut rig.bus)
            .unwrap();
        let mut brain = AssistantBrain::default();

        // Seeks on the first interval, then picks up and delivers.
        let delivered = rig.run(&mut brain, &mut pos, 60_000);
        assert_eq!(delivered, Some(id));
        let task = rig.tasks.get(id).unwrap();
        assert_eq!(task.state, TaskState::Carried);
        assert_eq!(task.carrier, Some(Carrier::Assistant));
        assert!(!rig.tasks.is_on_map(id));
        assert_eq!(task.final_department(), Some(DepartmentId::Marketing));
        assert_eq!(brain.state, AssistantState::Wandering);
    }

    #[test]
    fn vanished_task_sends_it_back_to_wandering() {
        let mut rig = Rig::new();
        let mut pos = Vec2::new(640.0, 480.0);
        let id = rig
            .tasks
            .spawn_named("Coffee Order", Some(Vec2::new(200.0, 480.0)), 0, &mut rig.rng, &mut rig.bus)
            .unwrap();
        let mut brain = AssistantBrain {
            state: AssistantState::Fetching {
                task_id: id,
                elapsed_ms: 0.0,
            },
            ..AssistantBrain::default()
        };
        rig.tasks.take(id, Carrier::Player, 0, &mut rig.bus).unwrap();
        rig.run(&mut brain, &mut pos, 32);
        assert_eq!(brain.state, AssistantState::Wandering);
    }

    #[test]
    fn slow_delivery_is_forced_at_the_timeout() {
        let mut rig = Rig::new();
        rig.config.assistant.speed = 0.0;
        let mut pos = Vec2::new(640.0, 480.0);
        let id = rig
            .tasks
            .spawn_named("Coffee Order", Some(pos), 0, &mut rig.rng, &mut rig.bus)
            .unwrap();
        rig.tasks.take(id, Carrier::Assistant, 0, &mut rig.bus).unwrap();
        let mut brain = AssistantBrain {
            state: AssistantState::Delivering {
                task_id: id,
                waypoint: 0,
                elapsed_ms: 0.0,
            },
            ..AssistantBrain::default()
        };
        assert_eq!(rig.run(&mut brain, &mut pos, 19_000), None);
        assert_eq!(rig.run(&mut brain, &mut pos, 2_000), Some(id));
    }
}
