use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::config::SteeringConfig;
use crate::game::collision::move_with_collision;
use crate::game::tilemap::OfficeMap;
use crate::protocol::Vec2;

const DIAGONAL: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// The eight compass directions, clockwise from north.
pub const DIRECTIONS: [Vec2; 8] = [
    Vec2::new(0.0, -1.0),
    Vec2::new(DIAGONAL, -DIAGONAL),
    Vec2::new(1.0, 0.0),
    Vec2::new(DIAGONAL, DIAGONAL),
    Vec2::new(0.0, 1.0),
    Vec2::new(-DIAGONAL, DIAGONAL),
    Vec2::new(-1.0, 0.0),
    Vec2::new(-DIAGONAL, -DIAGONAL),
];

/// Compass-direction wandering with a bias toward the player.
#[derive(Debug, Clone, Default)]
pub struct Wander {
    direction: Option<usize>,
    hold_ms: f32,
    stall_ms: f32,
}

impl Wander {
    pub fn direction(&self) -> Option<Vec2> {
        self.direction.map(|i| DIRECTIONS[i])
    }

    /// Picks the next heading. With probability `seek_bias` it is the
    /// direction pointing most toward the player; otherwise any direction
    /// other than the current one.
    pub fn pick(&mut self, pos: Vec2, player: Vec2, cfg: &SteeringConfig, rng: &mut StdRng) {
        let toward = player - pos;
        let seek = (0..DIRECTIONS.len())
            .max_by(|a, b| DIRECTIONS[*a].dot(toward).total_cmp(&DIRECTIONS[*b].dot(toward)))
            .unwrap_or(0);

        let next = if rng.gen::<f32>() < cfg.wander_seek_bias {
            seek
        } else {
            let others: Vec<usize> = (0..DIRECTIONS.len()).filter(|i| Some(*i) != self.direction).collect();
            others[rng.gen_range(0..others.len())]
        };

        self.direction = Some(next);
        self.hold_ms = rng.gen_range(cfg.wander_min_hold_ms..=cfg.wander_max_hold_ms);
        self.stall_ms = 0.0;
    }

    /// Moves one frame along the current heading and returns the velocity
    /// used. A body that barely moves for long enough gets a new heading.
    pub fn step(
        &mut self,
        pos: &mut Vec2,
        player: Vec2,
        speed: f32,
        dt_ms: f32,
        map: &OfficeMap,
        cfg: &SteeringConfig,
        rng: &mut StdRng,
    ) -> Vec2 {
        self.hold_ms -= dt_ms;
        if self.direction.is_none() || self.hold_ms <= 0.0 {
            self.pick(*pos, player, cfg, rng);
        }
        let Some(dir) = self.direction() else {
            return Vec2::ZERO;
        };

        let vel = dir.scale(speed);
        let next = move_with_collision(map, *pos, vel, dt_ms);
        let moved = next.distance(*pos);
        *pos = next;

        let expected = speed * dt_ms / 1000.0;
        let threshold = (cfg.wander_stall_px * dt_ms / 16.667).min(expected * 0.5);
        if moved < threshold {
            self.stall_ms += dt_ms;
            if self.stall_ms >= cfg.wander_stall_ms {
                debug!("Wander stalled; turning");
                self.pick(*pos, player, cfg, rng);
            }
        } else {
            self.stall_ms = 0.0;
        }
        vel
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::config::MapConfig;

    #[test]
    fn directions_are_unit_length() {
        for d in DIRECTIONS {
            assert!((d.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn full_bias_always_heads_for_the_player() {
        let cfg = SteeringConfig {
            wander_seek_bias: 1.0,
            ..SteeringConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut wander = Wander::default();
        for _ in 0..10 {
            wander.pick(Vec2::new(100.0, 100.0), Vec2::new(400.0, 100.0), &cfg, &mut rng);
            assert_eq!(wander.direction(), Some(Vec2::new(1.0, 0.0)));
        }
    }

    #[test]
    fn zero_bias_never_repeats_the_heading() {
        let cfg = SteeringConfig {
            wander_seek_bias: 0.0,
            ..SteeringConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let mut wander = Wander::default();
        wander.pick(Vec2::ZERO, Vec2::ZERO, &cfg, &mut rng);
        for _ in 0..50 {
            let before = wander.direction();
            wander.pick(Vec2::ZERO, Vec2::ZERO, &cfg, &mut rng);
            assert_ne!(wander.direction(), before);
        }
    }

    #[test]
    fn stalled_body_turns_away() {
        let map = OfficeMap::from_config(&MapConfig::default());
        let cfg = SteeringConfig {
            wander_seek_bias: 1.0,
            wander_min_hold_ms: 60_000.0,
            wander_max_hold_ms: 60_000.0,
            ..SteeringConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut wander = Wander::default();
        // Pinned against the top edge with the player straight above.
        let mut pos = Vec2::new(640.0, 0.5);
        let player = Vec2::new(640.0, -500.0);
        wander.pick(pos, player, &cfg, &mut rng);
        assert_eq!(wander.direction(), Some(Vec2::new(0.0, -1.0)));

        let mut turned = false;
        for _ in 0..30 {
            wander.step(&mut pos, Vec2::new(640.0, 900.0), 80.0, 16.0, &map, &cfg, &mut rng);
            if wander.direction() != Some(Vec2::new(0.0, -1.0)) {
                turned = true;
                break;
            }
        }
        assert!(turned);
    }
}
