use thiserror::Error;

use crate::game::upgrades::UpgradeId;
use crate::protocol::{AgentKind, DepartmentId, TaskId, Tier};

/// Problems detected while loading or validating a [`crate::config::GameConfig`].
/// All of them are fatal: the simulation refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("run duration must be positive")]
    ZeroDuration,

    #[error("no spawn points configured")]
    NoSpawnPoints,

    #[error("department {0:?} has no zone")]
    MissingDepartment(DepartmentId),

    #[error("department {0:?} is configured more than once")]
    DuplicateDepartment(DepartmentId),

    #[error("task pool of {0} records is below the minimum of 30")]
    PoolTooSmall(usize),

    #[error("max active tasks {max_active} exceeds pool size {pool_size}")]
    CapExceedsPool { max_active: usize, pool_size: usize },

    #[error("XP cost table has {found} entries, expected {expected}")]
    XpTable { expected: usize, found: usize },

    #[error("tier {0:?} has no single-stop template")]
    NoSingleStopTemplate(Tier),

    #[error("template {name:?} has an invalid route: {reason}")]
    InvalidRoute { name: String, reason: &'static str },

    #[error("agent {0:?} is missing from the schedule")]
    MissingSchedule(AgentKind),

    #[error("agent {0:?} is scheduled more than once")]
    DuplicateSchedule(AgentKind),

    #[error("{field}: lower bound {min} exceeds upper bound {max}")]
    InvertedRange { field: &'static str, min: f64, max: f64 },

    #[error("agent {kind:?} has max count {max} below initial count {initial}")]
    ScheduleCounts {
        kind: AgentKind,
        initial: u32,
        max: u32,
    },
}

/// Reasons an inbound command is refused. The simulation state is unchanged
/// whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("inventory full ({capacity} tasks)")]
    Capacity { capacity: u32 },

    #[error("task {0} is out of range")]
    OutOfRange(TaskId),

    #[error("task {0} is not on the map")]
    NotOnMap(TaskId),

    #[error("player is frozen")]
    Frozen,

    #[error("no meeting scheduler is active")]
    NoBlocker,

    #[error("carried tasks are not all headed to blocked departments")]
    NotSoftLocked,

    #[error("no upgrade choice is pending")]
    NoPendingOffer,

    #[error("upgrade {0:?} was not offered")]
    NotOffered(UpgradeId),

    #[error("upgrade {0:?} was already granted")]
    AlreadyGranted(UpgradeId),

    #[error("the run is over")]
    RunOver,
}

/// Failures bringing up the websocket host.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind or accept: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),
}
