//! Office Rush: a headless office survival simulation.
//!
//! [`session::Simulation`] owns the tick pipeline; the binary hosts it over
//! a websocket.

pub mod ai;
pub mod clock;
pub mod config;
pub mod ecs;
pub mod error;
pub mod events;
pub mod game;
pub mod hooks;
pub mod network;
pub mod protocol;
pub mod session;
