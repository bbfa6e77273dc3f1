use hecs::{Entity, World};

use crate::config::GameConfig;

use super::components::{FreezeState, Inventory, Movement, Player, Position, SpeedModifiers, Stamina, Velocity};

/// Creates a new ECS world holding only the player, standing at the
/// configured start point with a full stamina bar and empty hands.
pub fn create_world(config: &GameConfig) -> (World, Entity) {
    let mut world = World::new();
    let cfg = &config.player;

    let player = world.spawn((
        Player,
        Position::from(config.map.player_start),
        Velocity::default(),
        Movement::default(),
        Stamina {
            current: cfg.max_stamina,
            max: cfg.max_stamina,
        },
        SpeedModifiers::new(cfg.base_speed),
        Inventory {
            tasks: Vec::new(),
            capacity: cfg.capacity,
        },
        FreezeState::default(),
    ));

    (world, player)
}
