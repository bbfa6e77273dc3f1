pub mod collision;
pub mod departments;
pub mod pressure;
pub mod progression;
pub mod stress;
pub mod task_manager;
pub mod tasks;
pub mod tilemap;
pub mod upgrades;
