use rand::seq::SliceRandom;
use tracing::debug;

use super::steering::SteerOutcome;
use super::{AgentContext, Body};
use crate::protocol::{DepartmentId, Disruption, StressSource, Tier};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum BlockerState {
    #[default]
    Picking,
    Traveling { department: DepartmentId },
    Cooldown { remaining_ms: f32 },
}

/// Meeting Scheduler: walks into a department and books it, making it
/// undeliverable for a while.
#[derive(Debug, Clone, Default)]
pub struct Blocker {
    pub state: BlockerState,
    last_blocked: Option<DepartmentId>,
}

impl Blocker {
    /// Departments worth walking to right now.
    pub fn candidates(&self, ctx: &AgentContext<'_>) -> Vec<DepartmentId> {
        DepartmentId::ALL
            .into_iter()
            .filter(|d| Some(*d) != self.last_blocked)
            .filter(|d| !ctx.departments.is_blocked(*d))
            .filter(|d| !(*d == DepartmentId::Ceo && ctx.player_tier == Tier::Ceo))
            .collect()
    }

    pub fn tick(&mut self, body: &mut Body<'_>, ctx: &mut AgentContext<'_>) {
        let cfg = ctx.config.agents.meeting.clone();
        match self.state {
            BlockerState::Picking => {
                body.halt();
                let candidates = self.candidates(ctx);
                let Some(department) = candidates.choose(&mut *ctx.rng).copied() else {
                    self.state = BlockerState::Cooldown {
                        remaining_ms: cfg.enraged_repick_ms,
                    };
                    return;
                };
                match ctx.departments.door(department) {
                    Some(door) => {
                        body.steering.seek(door.entry);
                        self.state = BlockerState::Traveling { department };
                        debug!("Meeting Scheduler {} heading to {}", body.agent.id, department.name());
                    }
                    None => {
                        self.state = BlockerState::Cooldown {
                            remaining_ms: cfg.enraged_repick_ms,
                        }
                    }
                }
            }
            BlockerState::Traveling { department } => {
                let arrived = ctx.departments.zone_contains(department, body.pos);
                let outcome = if arrived {
                    body.halt();
                    SteerOutcome::Arrived
                } else {
                    body.seek_step(cfg.speed, ctx)
                };
                match outcome {
                    SteerOutcome::Arrived | SteerOutcome::NoTarget => {
                        self.state = if self.call_meeting(department, body, ctx) {
                            BlockerState::Cooldown {
                                remaining_ms: self.cooldown_after_block(body, ctx),
                            }
                        } else {
                            BlockerState::Picking
                        };
                    }
                    SteerOutcome::Stuck => self.state = BlockerState::Picking,
                    _ => {}
                }
            }
            BlockerState::Cooldown { remaining_ms } => {
                body.halt();
                let remaining_ms = remaining_ms - ctx.dt_ms;
                self.state = if remaining_ms > 0.0 {
                    BlockerState::Cooldown { remaining_ms }
                } else {
                    BlockerState::Picking
                };
            }
        }
    }

    fn call_meeting(&mut self, department: DepartmentId, body: &Body<'_>, ctx: &mut AgentContext<'_>) -> bool {
        let cfg = &ctx.config.agents.meeting;
        let duration_ms = if ctx.meeting_blocker {
            (cfg.block_ms as f32 * ctx.config.upgrades.meeting_blocker_duration_factor) as u64
        } else {
            cfg.block_ms
        };
        let block_stress = cfg.block_stress;

        if !ctx.departments.block(department, ctx.now_ms, duration_ms, body.agent.id, ctx.bus) {
            return false;
        }
        self.last_blocked = Some(department);
        ctx.stress.add_instant(block_stress, StressSource::MeetingBlock, ctx.bus);
        body.disrupt(Disruption::MeetingCalled { department }, ctx);
        true
    }

    /// Enraged schedulers re-pick quickly until they hold their maximum
    /// number of meetings.
    fn cooldown_after_block(&self, body: &Body<'_>, ctx: &AgentContext<'_>) -> f32 {
        let cfg = &ctx.config.agents.meeting;
        if body.agent.enraged && ctx.departments.blocks_held_by(body.agent.id) < cfg.enraged_max_blocks {
            cfg.enraged_repick_ms
        } else {
            cfg.cooldown_ms
        }
    }

    pub fn state_label(&self) -> &'static str {
        match self.state {
            BlockerState::Picking => "picking",
            BlockerState::Traveling { .. } => "traveling",
            BlockerState::Cooldown { .. } => "cooldown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::steering::Steering;
    use crate::ai::test_support::{agent, Harness};
    use crate::ecs::components::ChaosAgent;
    use crate::protocol::{AgentKind, GameEvent, Topic, Vec2};

    fn arrive(h: &mut Harness, blocker: &mut Blocker, me: &ChaosAgent, dept: DepartmentId, meeting_blocker: bool) {
        let inside = h.departments.zone(dept).unwrap().center();
        let mut steering = Steering::default();
        let mut body = Body {
            agent: me,
            steering: &mut steering,
            pos: inside,
            vel: Vec2::ZERO,
        };
        blocker.state = BlockerState::Traveling { department: dept };
        let mut ctx = h.ctx(16.0);
        ctx.meeting_blocker = meeting_blocker;
        blocker.tick(&mut body, &mut ctx);
    }

    #[test]
    fn arriving_books_the_department() {
        let mut h = Harness::new();
        let me = agent(5, AgentKind::MeetingScheduler);
        let mut blocker = Blocker::default();
        arrive(&mut h, &mut blocker, &me, DepartmentId::Finance, false);

        assert!(h.departments.is_blocked(DepartmentId::Finance));
        assert!((h.stress.current() - 3.0).abs() < 1e-5);
        assert_eq!(blocker.state, BlockerState::Cooldown { remaining_ms: 20_000.0 });

        let blocked = h
            .bus
            .take_outbound()
            .into_iter()
            .find_map(|e| match e.event {
                GameEvent::DepartmentBlocked { duration_ms, .. } => Some(duration_ms),
                _ => None,
            });
        assert_eq!(blocked, Some(12_000));
    }

    #[test]
    fn meeting_blocker_halves_the_meeting() {
        let mut h = Harness::new();
        let me = agent(5, AgentKind::MeetingScheduler);
        let mut blocker = Blocker::default();
        arrive(&mut h, &mut blocker, &me, DepartmentId::Hr, true);
        let blocked = h
            .bus
            .take_outbound()
            .into_iter()
            .find_map(|e| match e.event {
                GameEvent::DepartmentBlocked { duration_ms, .. } => Some(duration_ms),
                _ => None,
            });
        assert_eq!(blocked, Some(6000));
    }

    #[test]
    fn never_repeats_or_targets_blocked_or_own_ceo_office() {
        let mut h = Harness::new();
        let me = agent(5, AgentKind::MeetingScheduler);
        let mut blocker = Blocker::default();
        arrive(&mut h, &mut blocker, &me, DepartmentId::Marketing, false);
        h.departments.block(DepartmentId::Hr, 0, 60_000, 99, &mut h.bus);
        h.player_tier = Tier::Ceo;

        let ctx = h.ctx(16.0);
        let candidates = blocker.candidates(&ctx);
        assert_eq!(candidates, vec![DepartmentId::Engineering, DepartmentId::Finance]);
    }

    #[test]
    fn enraged_scheduler_holds_two_meetings() {
        let mut h = Harness::new();
        let mut me = agent(6, AgentKind::MeetingScheduler);
        me.enraged = true;
        let mut blocker = Blocker::default();

        arrive(&mut h, &mut blocker, &me, DepartmentId::Marketing, false);
        assert_eq!(blocker.state, BlockerState::Cooldown { remaining_ms: 2000.0 });
        arrive(&mut h, &mut blocker, &me, DepartmentId::Engineering, false);
        assert_eq!(blocker.state, BlockerState::Cooldown { remaining_ms: 20_000.0 });

        let count = h
            .bus
            .take_outbound()
            .iter()
            .filter(|e| e.event.topic() == Topic::DepartmentBlocked)
            .count();
        assert_eq!(count, 2);
    }
}
