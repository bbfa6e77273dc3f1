use crate::config::MapConfig;
use crate::protocol::{Rect, Vec2};

/// Static office floor: bounds plus solid furniture. Department zones are
/// open floor and never block movement.
#[derive(Debug, Clone)]
pub struct OfficeMap {
    pub width: f32,
    pub height: f32,
    pub tile_size: f32,
    pub obstacles: Vec<Rect>,
}

impl OfficeMap {
    pub fn from_config(map: &MapConfig) -> Self {
        OfficeMap {
            width: map.width,
            height: map.height,
            tile_size: map.tile_size,
            obstacles: map.obstacles.clone(),
        }
    }

    /// True if `p` is outside the floor or inside a piece of furniture.
    pub fn is_blocked(&self, p: Vec2) -> bool {
        if p.x < 0.0 || p.y < 0.0 || p.x > self.width || p.y > self.height {
            return true;
        }
        self.obstacles.iter().any(|r| r.contains(p))
    }

    /// Convert a pixel position to tile coordinates.
    pub fn pixel_to_tile(&self, p: Vec2) -> (i32, i32) {
        (
            (p.x / self.tile_size).floor() as i32,
            (p.y / self.tile_size).floor() as i32,
        )
    }

    /// Chebyshev distance in tiles between two pixel positions.
    pub fn tile_distance(&self, a: Vec2, b: Vec2) -> i32 {
        let (ax, ay) = self.pixel_to_tile(a);
        let (bx, by) = self.pixel_to_tile(b);
        (ax - bx).abs().max((ay - by).abs())
    }

    /// The `n` obstacles closest to `p`, nearest first.
    pub fn nearest_obstacles(&self, p: Vec2, n: usize) -> Vec<Rect> {
        let mut sorted: Vec<(f32, Rect)> = self
            .obstacles
            .iter()
            .map(|r| (r.distance_to(p), *r))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        sorted.into_iter().take(n).map(|(_, r)| r).collect()
    }

    /// A walkable point just below an obstacle, where an agent can stand
    /// next to it.
    pub fn standing_point(&self, obstacle: &Rect) -> Vec2 {
        let below = Vec2::new(obstacle.x + obstacle.w / 2.0, obstacle.y + obstacle.h + self.tile_size / 2.0);
        if !self.is_blocked(below) {
            return below;
        }
        Vec2::new(obstacle.x + obstacle.w / 2.0, obstacle.y - self.tile_size / 2.0)
    }

    pub fn clamp(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(0.0, self.width), p.y.clamp(0.0, self.height))
    }
}
