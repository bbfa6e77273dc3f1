//! Target seeking with stuck recovery, shared by every chaos agent and the
//! assistant.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::config::SteeringConfig;
use crate::game::collision::move_with_collision;
use crate::game::tilemap::OfficeMap;
use crate::protocol::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteerOutcome {
    Idle,
    Nudging,
    Moving,
    Arrived,
    /// Every nudge failed; the caller should choose a new target.
    Stuck,
    NoTarget,
}

/// Movement state of one seeking body.
#[derive(Debug, Clone, Default)]
pub struct Steering {
    pub target: Option<Vec2>,
    idle_ms: f32,
    nudge_dir: Vec2,
    nudge_ms: f32,
    check_ms: f32,
    check_pos: Option<Vec2>,
    retries: u32,
}

impl Steering {
    /// Sets a new target and forgets stuck history.
    pub fn seek(&mut self, target: Vec2) {
        self.target = Some(target);
        self.reset_stuck();
    }

    /// Moves the target without touching stuck history, for chasing a
    /// moving point.
    pub fn retarget(&mut self, target: Vec2) {
        self.target = Some(target);
    }

    pub fn clear(&mut self) {
        self.target = None;
        self.nudge_ms = 0.0;
        self.reset_stuck();
    }

    pub fn idle_for(&mut self, ms: f32) {
        self.idle_ms = ms;
    }

    pub fn is_idle(&self) -> bool {
        self.idle_ms > 0.0
    }

    pub fn is_nudging(&self) -> bool {
        self.nudge_ms > 0.0
    }

    fn reset_stuck(&mut self) {
        self.check_ms = 0.0;
        self.check_pos = None;
        self.retries = 0;
    }
}

/// Speed after the executive presence slowdown.
pub fn effective_speed(base: f32, executive_presence: bool, factor: f32) -> f32 {
    if executive_presence {
        base * factor
    } else {
        base
    }
}

/// Velocity toward `delta`: full speed on the dominant axis, reduced on the
/// other, neither overshooting the target within one step.
fn seek_velocity(delta: Vec2, speed: f32, secondary: f32, dt_s: f32) -> Vec2 {
    let limit = |d: f32, s: f32| -> f32 {
        if dt_s <= 0.0 {
            return 0.0;
        }
        d.signum() * s.min(d.abs() / dt_s)
    };
    if delta.x.abs() >= delta.y.abs() {
        Vec2::new(limit(delta.x, speed), limit(delta.y, speed * secondary))
    } else {
        Vec2::new(limit(delta.x, speed * secondary), limit(delta.y, speed))
    }
}

/// Advances one body by `dt_ms`.
pub fn steer(
    steering: &mut Steering,
    pos: &mut Vec2,
    vel: &mut Vec2,
    speed: f32,
    dt_ms: f32,
    map: &OfficeMap,
    cfg: &SteeringConfig,
    rng: &mut StdRng,
) -> SteerOutcome {
    if steering.idle_ms > 0.0 {
        steering.idle_ms -= dt_ms;
        *vel = Vec2::ZERO;
        return SteerOutcome::Idle;
    }

    if steering.nudge_ms > 0.0 {
        steering.nudge_ms -= dt_ms;
        *vel = steering.nudge_dir.scale(speed);
        *pos = move_with_collision(map, *pos, *vel, dt_ms);
        return SteerOutcome::Nudging;
    }

    let Some(target) = steering.target else {
        *vel = Vec2::ZERO;
        return SteerOutcome::NoTarget;
    };

    let delta = target - *pos;
    if delta.length() < cfg.arrival_threshold {
        *vel = Vec2::ZERO;
        steering.target = None;
        steering.reset_stuck();
        return SteerOutcome::Arrived;
    }

    *vel = seek_velocity(delta, speed, cfg.secondary_axis_factor, dt_ms / 1000.0);
    *pos = move_with_collision(map, *pos, *vel, dt_ms);

    let anchor = *steering.check_pos.get_or_insert(*pos);
    steering.check_ms += dt_ms;
    if steering.check_ms >= cfg.stuck_check_interval_ms {
        let moved = pos.distance(anchor);
        steering.check_ms = 0.0;
        steering.check_pos = Some(*pos);
        if moved < cfg.stuck_threshold {
            steering.retries += 1;
            if steering.retries > cfg.max_retries {
                debug!("Gave up on target after {} nudges", cfg.max_retries);
                steering.reset_stuck();
                *vel = Vec2::ZERO;
                return SteerOutcome::Stuck;
            }
            let side = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            steering.nudge_dir = delta.normalized().perpendicular().scale(side);
            steering.nudge_ms = cfg.nudge_ms;
            // Measure the next attempt from where the nudge leaves us.
            steering.check_pos = None;
        } else {
            steering.retries = 0;
        }
    }
    SteerOutcome::Moving
}
