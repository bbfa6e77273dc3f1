use hecs::{Entity, World};
use tracing::info;

use crate::ai::assistant::{AssistantBrain, AssistantContext};
use crate::ecs::components::{Assistant, Position, Velocity};
use crate::events::EventBus;
use crate::protocol::{GameEvent, TaskId, Vec2};

/// Puts the assistant on the floor beside the player. At most one exists.
pub fn spawn_assistant(world: &mut World, at: Vec2, bus: &mut EventBus) -> Entity {
    if let Some((entity, _)) = world.query::<&Assistant>().iter().next() {
        return entity;
    }
    let entity = world.spawn((Assistant, Position::from(at), Velocity::default(), AssistantBrain::default()));
    bus.publish(GameEvent::AssistantSpawned { position: at });
    info!("Personal assistant hired");
    entity
}

/// Ticks the assistant if one exists. Returns tasks it has finished walking
/// to their department; the caller resolves them.
pub fn assistant_system(world: &mut World, ctx: &mut AssistantContext<'_>) -> Vec<TaskId> {
    let mut ready = Vec::new();
    for (_id, (_tag, pos, vel, brain)) in
        world.query_mut::<(&Assistant, &mut Position, &mut Velocity, &mut AssistantBrain)>()
    {
        let (mut p, mut v) = (pos.vec(), vel.vec());
        if let Some(task_id) = brain.tick(&mut p, &mut v, ctx) {
            ready.push(task_id);
        }
        pos.set(p);
        vel.set(v);
    }
    ready
}

/// Task the assistant is carrying, if any.
pub fn assistant_holding(world: &World) -> Option<TaskId> {
    world
        .query::<(&Assistant, &AssistantBrain)>()
        .iter()
        .find_map(|(_id, (_tag, brain))| brain.holding())
}

pub fn assistant_position(world: &World) -> Option<Vec2> {
    world
        .query::<(&Assistant, &Position)>()
        .iter()
        .next()
        .map(|(_id, (_tag, pos))| pos.vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_assistant_is_hired() {
        let mut world = World::new();
        let mut bus = EventBus::new();
        let first = spawn_assistant(&mut world, Vec2::new(100.0, 100.0), &mut bus);
        let second = spawn_assistant(&mut world, Vec2::new(300.0, 300.0), &mut bus);
        assert_eq!(first, second);
        assert_eq!(assistant_position(&world), Some(Vec2::new(100.0, 100.0)));
        assert_eq!(assistant_holding(&world), None);
        let hired = bus
            .take_outbound()
            .iter()
            .filter(|e| matches!(e.event, GameEvent::AssistantSpawned { .. }))
            .count();
        assert_eq!(hired, 1);
    }
}
