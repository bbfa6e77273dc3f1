pub mod agent_tick;
pub mod assistant;
pub mod player;
pub mod wave;
