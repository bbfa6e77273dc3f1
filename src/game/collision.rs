//! Server-side movement against the office floor.
//!
//! Movement is resolved one axis at a time so a body pressed against a desk
//! slides along it instead of sticking.

use crate::game::tilemap::OfficeMap;
use crate::protocol::Vec2;

/// Moves `pos` by `vel` (px/s) over `dt_ms`, refusing any axis step that
/// would land inside furniture or off the floor. Returns the new position.
pub fn move_with_collision(map: &OfficeMap, pos: Vec2, vel: Vec2, dt_ms: f32) -> Vec2 {
    let dt = dt_ms / 1000.0;
    let mut next = pos;

    let try_x = Vec2::new(pos.x + vel.x * dt, next.y);
    if !map.is_blocked(try_x) {
        next = try_x;
    }
    let try_y = Vec2::new(next.x, pos.y + vel.y * dt);
    if !map.is_blocked(try_y) {
        next = try_y;
    }
    next
}
