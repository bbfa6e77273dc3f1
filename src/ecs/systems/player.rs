use hecs::{Entity, World};
use tracing::debug;

use crate::ai::PlayerEffect;
use crate::config::PlayerConfig;
use crate::ecs::components::{FreezeState, Inventory, Movement, Position, SpeedModifiers, Stamina, Velocity};
use crate::game::collision::move_with_collision;
use crate::game::tilemap::OfficeMap;
use crate::game::upgrades::PlayerCapabilities;
use crate::protocol::{PlayerSnapshot, TaskId, Vec2};

/// Moves the player from its latest input. A frozen player stands still;
/// sprinting burns stamina, anything else regenerates it.
pub fn player_movement_system(
    world: &mut World,
    player: Entity,
    dt_ms: f32,
    now_ms: u64,
    map: &OfficeMap,
    cfg: &PlayerConfig,
) {
    let Ok((pos, vel, movement, stamina, speed, freeze)) = world.query_one_mut::<(
        &mut Position,
        &mut Velocity,
        &Movement,
        &mut Stamina,
        &SpeedModifiers,
        &FreezeState,
    )>(player) else {
        return;
    };
    let dt = dt_ms / 1000.0;

    if freeze.is_frozen(now_ms) {
        vel.set(Vec2::ZERO);
        stamina.current = (stamina.current + cfg.stamina_regen * dt).min(stamina.max);
        return;
    }

    let dir = movement.input.normalized();
    let moving = dir.length() > 0.0;
    let sprinting = movement.sprinting && moving && stamina.current > 0.0;

    let mut speed = speed.speed();
    if sprinting {
        speed *= cfg.sprint_multiplier;
        stamina.current = (stamina.current - cfg.stamina_drain * dt).max(0.0);
    } else {
        stamina.current = (stamina.current + cfg.stamina_regen * dt).min(stamina.max);
    }

    let velocity = dir.scale(speed);
    vel.set(velocity);
    let next = move_with_collision(map, pos.vec(), velocity, dt_ms);
    pos.set(next);
}

/// Applies what the agents asked for this tick.
pub fn apply_player_effects(world: &mut World, player: Entity, effects: Vec<PlayerEffect>, now_ms: u64) {
    let Ok((speed, freeze)) = world.query_one_mut::<(&mut SpeedModifiers, &mut FreezeState)>(player) else {
        return;
    };
    for effect in effects {
        match effect {
            PlayerEffect::SetSlow { key, factor } => {
                speed.factors.insert(key, factor);
            }
            PlayerEffect::ClearSlow { key } => {
                speed.factors.remove(&key);
            }
            PlayerEffect::Freeze {
                duration_ms,
                immunity_ms,
            } => {
                if freeze.is_frozen(now_ms) || freeze.is_immune(now_ms) {
                    continue;
                }
                freeze.frozen_until_ms = now_ms + duration_ms;
                freeze.immune_until_ms = freeze.frozen_until_ms + immunity_ms;
                debug!("Player frozen until {}", freeze.frozen_until_ms);
            }
        }
    }
}

pub fn player_position(world: &World, player: Entity) -> Vec2 {
    world
        .get::<&Position>(player)
        .map(|p| p.vec())
        .unwrap_or(Vec2::ZERO)
}

pub fn carried(world: &World, player: Entity) -> Vec<TaskId> {
    world
        .get::<&Inventory>(player)
        .map(|inv| inv.tasks.clone())
        .unwrap_or_default()
}

pub fn player_snapshot(world: &World, player: Entity, now_ms: u64) -> Option<PlayerSnapshot> {
    let mut query = world
        .query_one::<(&Position, &Stamina, &FreezeState, &Inventory)>(player)
        .ok()?;
    let (pos, stamina, freeze, inventory) = query.get()?;
    Some(PlayerSnapshot {
        position: pos.vec(),
        stamina: stamina.current,
        frozen: freeze.is_frozen(now_ms),
        capacity: inventory.capacity,
        carrying: inventory.tasks.clone(),
    })
}

/// The player entity seen through the interface upgrades act on.
pub struct PlayerRef<'w> {
    pub world: &'w World,
    pub entity: Entity,
}

impl PlayerCapabilities for PlayerRef<'_> {
    fn set_speed_modifier(&mut self, key: &str, factor: f32) {
        if let Ok(mut speed) = self.world.get::<&mut SpeedModifiers>(self.entity) {
            speed.factors.insert(key.to_string(), factor);
        }
    }

    fn clear_speed_modifier(&mut self, key: &str) {
        if let Ok(mut speed) = self.world.get::<&mut SpeedModifiers>(self.entity) {
            speed.factors.remove(key);
        }
    }

    fn capacity(&self) -> u32 {
        self.world
            .get::<&Inventory>(self.entity)
            .map(|inv| inv.capacity)
            .unwrap_or(0)
    }

    fn set_capacity(&mut self, capacity: u32) {
        if let Ok(mut inv) = self.world.get::<&mut Inventory>(self.entity) {
            inv.capacity = capacity;
        }
    }

    fn carried(&self) -> Vec<TaskId> {
        carried(self.world, self.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::ecs::world::create_world;

    fn setup() -> (GameConfig, OfficeMap, World, Entity) {
        let config = GameConfig::default();
        let map = OfficeMap::from_config(&config.map);
        let (world, player) = create_world(&config);
        (config, map, world, player)
    }

    fn steer(world: &mut World, player: Entity, input: Vec2, sprinting: bool) {
        let mut movement = world.get::<&mut Movement>(player).unwrap();
        movement.input = input;
        movement.sprinting = sprinting;
    }

    #[test]
    fn walks_at_base_speed() {
        let (config, map, mut world, player) = setup();
        let start = player_position(&world, player);
        steer(&mut world, player, Vec2::new(1.0, 0.0), false);
        player_movement_system(&mut world, player, 1000.0, 0, &map, &config.player);
        let moved = player_position(&world, player).distance(start);
        assert!((moved - 160.0).abs() < 1.0, "moved {moved}");
    }

    #[test]
    fn sprint_is_faster_and_drains_stamina() {
        let (config, map, mut world, player) = setup();
        let start = player_position(&world, player);
        steer(&mut world, player, Vec2::new(-1.0, 0.0), true);
        player_movement_system(&mut world, player, 500.0, 0, &map, &config.player);
        let moved = player_position(&world, player).distance(start);
        assert!((moved - 120.0).abs() < 1.0, "moved {moved}");
        let stamina = world.get::<&Stamina>(player).unwrap().current;
        assert!((stamina - 87.5).abs() < 1e-3);
    }

    #[test]
    fn frozen_player_stays_put() {
        let (config, map, mut world, player) = setup();
        let start = player_position(&world, player);
        apply_player_effects(
            &mut world,
            player,
            vec![PlayerEffect::Freeze {
                duration_ms: 2000,
                immunity_ms: 2000,
            }],
            0,
        );
        steer(&mut world, player, Vec2::new(1.0, 0.0), false);
        player_movement_system(&mut world, player, 100.0, 1000, &map, &config.player);
        assert_eq!(player_position(&world, player), start);
        player_movement_system(&mut world, player, 100.0, 2100, &map, &config.player);
        assert!(player_position(&world, player).distance(start) > 1.0);
    }

    #[test]
    fn freeze_respects_immunity() {
        let (_config, _map, mut world, player) = setup();
        let freeze = PlayerEffect::Freeze {
            duration_ms: 1000,
            immunity_ms: 2000,
        };
        apply_player_effects(&mut world, player, vec![freeze.clone()], 0);
        apply_player_effects(&mut world, player, vec![freeze.clone()], 1500);
        assert_eq!(world.get::<&FreezeState>(player).unwrap().frozen_until_ms, 1000);
        apply_player_effects(&mut world, player, vec![freeze], 3000);
        assert_eq!(world.get::<&FreezeState>(player).unwrap().frozen_until_ms, 4000);
    }

    #[test]
    fn slow_factors_stack_by_key() {
        let (_config, _map, mut world, player) = setup();
        apply_player_effects(
            &mut world,
            player,
            vec![
                PlayerEffect::SetSlow {
                    key: "micromanager-1".into(),
                    factor: 0.5,
                },
                PlayerEffect::SetSlow {
                    key: "micromanager-2".into(),
                    factor: 0.5,
                },
            ],
            0,
        );
        let mut player_ref = PlayerRef { world: &world, entity: player };
        player_ref.set_speed_modifier("coffee_boost", 2.0);
        assert!((world.get::<&SpeedModifiers>(player).unwrap().speed() - 80.0).abs() < 1e-3);

        apply_player_effects(
            &mut world,
            player,
            vec![PlayerEffect::ClearSlow {
                key: "micromanager-1".into(),
            }],
            0,
        );
        assert!((world.get::<&SpeedModifiers>(player).unwrap().speed() - 160.0).abs() < 1e-3);
    }
}
