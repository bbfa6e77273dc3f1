use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::protocol::{AgentKind, DepartmentId, Rect, Tier, Vec2};

/// Every tuning value of a run. Loaded once, validated, then shared
/// read-only by the whole simulation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub run: RunConfig,
    pub map: MapConfig,
    pub player: PlayerConfig,
    pub tasks: TaskConfig,
    pub stress: StressConfig,
    pub progression: ProgressionConfig,
    pub pressure: PressureConfig,
    pub agents: AgentConfig,
    pub assistant: AssistantConfig,
    pub upgrades: UpgradeConfig,
}

impl GameConfig {
    /// Parses a (possibly partial) JSON document; missing fields keep their
    /// defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&raw)?;
        info!("Loaded game config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.duration_secs <= 0.0 {
            return Err(ConfigError::ZeroDuration);
        }
        if self.map.spawn_points.is_empty() {
            return Err(ConfigError::NoSpawnPoints);
        }

        let mut seen = HashSet::new();
        for dept in &self.map.departments {
            if !seen.insert(dept.id) {
                return Err(ConfigError::DuplicateDepartment(dept.id));
            }
        }
        for id in DepartmentId::ALL {
            if !seen.contains(&id) {
                return Err(ConfigError::MissingDepartment(id));
            }
        }

        if self.tasks.pool_size < 30 {
            return Err(ConfigError::PoolTooSmall(self.tasks.pool_size));
        }
        if self.tasks.max_active + self.tasks.over_cap_allowance > self.tasks.pool_size {
            return Err(ConfigError::CapExceedsPool {
                max_active: self.tasks.max_active + self.tasks.over_cap_allowance,
                pool_size: self.tasks.pool_size,
            });
        }

        let expected = self.progression.max_level.saturating_sub(1) as usize;
        if self.progression.xp_costs.len() != expected {
            return Err(ConfigError::XpTable {
                expected,
                found: self.progression.xp_costs.len(),
            });
        }

        let steering = &self.agents.steering;
        let ranges = [
            (
                "agents.steering.wander_min_hold_ms..wander_max_hold_ms",
                steering.wander_min_hold_ms as f64,
                steering.wander_max_hold_ms as f64,
            ),
            (
                "tasks.spawn_interval_min_ms..spawn_interval_base_ms",
                self.tasks.spawn_interval_min_ms as f64,
                self.tasks.spawn_interval_base_ms as f64,
            ),
        ];
        for (field, min, max) in ranges {
            // NaN bounds fail this check too.
            if !(min <= max) {
                return Err(ConfigError::InvertedRange { field, min, max });
            }
        }

        for template in &self.tasks.templates {
            if let TemplateTarget::Route(route) = &template.target {
                if !(2..=3).contains(&route.len()) {
                    return Err(ConfigError::InvalidRoute {
                        name: template.name.clone(),
                        reason: "routes must have two or three stops",
                    });
                }
                if route.windows(2).any(|w| w[0] == w[1]) {
                    return Err(ConfigError::InvalidRoute {
                        name: template.name.clone(),
                        reason: "consecutive stops repeat a department",
                    });
                }
            }
        }
        // The lowest tier is the fallback pool for every failed draw.
        let floor_has_single = self
            .tasks
            .templates
            .iter()
            .any(|t| t.tier == Tier::Intern && t.stops() == 1);
        if !floor_has_single {
            return Err(ConfigError::NoSingleStopTemplate(Tier::Intern));
        }

        let mut scheduled = HashSet::new();
        for entry in &self.agents.schedule {
            if !scheduled.insert(entry.kind) {
                return Err(ConfigError::DuplicateSchedule(entry.kind));
            }
            if entry.max_count < entry.initial_count {
                return Err(ConfigError::ScheduleCounts {
                    kind: entry.kind,
                    initial: entry.initial_count,
                    max: entry.max_count,
                });
            }
        }
        for kind in AgentKind::ALL {
            if !scheduled.contains(&kind) {
                return Err(ConfigError::MissingSchedule(kind));
            }
        }

        Ok(())
    }

    pub fn department(&self, id: DepartmentId) -> Option<&DepartmentConfig> {
        self.map.departments.iter().find(|d| d.id == id)
    }

    pub fn schedule_entry(&self, kind: AgentKind) -> Option<&ScheduleEntry> {
        self.agents.schedule.iter().find(|e| e.kind == kind)
    }

    pub fn duration_ms(&self) -> u64 {
        (self.run.duration_secs * 1000.0) as u64
    }
}

// ── Run ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub duration_secs: f32,
    /// Hold the tick pipeline while a level-up choice is pending.
    pub pause_on_offer: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_secs: 600.0,
            pause_on_offer: true,
        }
    }
}

// ── Map ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorWaypoints {
    /// Corridor point just outside the department's door gap.
    pub approach: Vec2,
    /// Point inside the department zone, past the door.
    pub entry: Vec2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentConfig {
    pub id: DepartmentId,
    pub zone: Rect,
    pub color: String,
    pub door: DoorWaypoints,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub width: f32,
    pub height: f32,
    pub tile_size: f32,
    pub player_start: Vec2,
    pub obstacles: Vec<Rect>,
    pub spawn_points: Vec<Vec2>,
    pub departments: Vec<DepartmentConfig>,
}

fn department(id: DepartmentId, zone: Rect, color: &str, approach: Vec2, entry: Vec2) -> DepartmentConfig {
    DepartmentConfig {
        id,
        zone,
        color: color.to_string(),
        door: DoorWaypoints { approach, entry },
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 960.0,
            tile_size: 32.0,
            player_start: Vec2::new(640.0, 480.0),
            obstacles: vec![
                // Desk rows
                Rect::new(320.0, 320.0, 128.0, 48.0),
                Rect::new(576.0, 320.0, 128.0, 48.0),
                Rect::new(832.0, 320.0, 128.0, 48.0),
                Rect::new(320.0, 592.0, 128.0, 48.0),
                Rect::new(576.0, 592.0, 128.0, 48.0),
                Rect::new(832.0, 592.0, 128.0, 48.0),
                // Water cooler, printer
                Rect::new(96.0, 448.0, 64.0, 64.0),
                Rect::new(1120.0, 448.0, 64.0, 64.0),
            ],
            spawn_points: vec![
                Vec2::new(224.0, 288.0),
                Vec2::new(512.0, 288.0),
                Vec2::new(768.0, 288.0),
                Vec2::new(1056.0, 288.0),
                Vec2::new(224.0, 480.0),
                Vec2::new(416.0, 480.0),
                Vec2::new(864.0, 480.0),
                Vec2::new(1056.0, 480.0),
                Vec2::new(224.0, 672.0),
                Vec2::new(512.0, 672.0),
                Vec2::new(768.0, 672.0),
                Vec2::new(1056.0, 672.0),
                Vec2::new(384.0, 416.0),
                Vec2::new(896.0, 416.0),
                Vec2::new(384.0, 544.0),
                Vec2::new(896.0, 544.0),
            ],
            departments: vec![
                department(
                    DepartmentId::Marketing,
                    Rect::new(32.0, 32.0, 256.0, 160.0),
                    "#e67e22",
                    Vec2::new(160.0, 232.0),
                    Vec2::new(160.0, 150.0),
                ),
                department(
                    DepartmentId::Hr,
                    Rect::new(512.0, 32.0, 256.0, 160.0),
                    "#9b59b6",
                    Vec2::new(640.0, 232.0),
                    Vec2::new(640.0, 150.0),
                ),
                department(
                    DepartmentId::Ceo,
                    Rect::new(992.0, 32.0, 256.0, 160.0),
                    "#f1c40f",
                    Vec2::new(1120.0, 232.0),
                    Vec2::new(1120.0, 150.0),
                ),
                department(
                    DepartmentId::Engineering,
                    Rect::new(32.0, 768.0, 256.0, 160.0),
                    "#3498db",
                    Vec2::new(160.0, 728.0),
                    Vec2::new(160.0, 810.0),
                ),
                department(
                    DepartmentId::Finance,
                    Rect::new(992.0, 768.0, 256.0, 160.0),
                    "#2ecc71",
                    Vec2::new(1120.0, 728.0),
                    Vec2::new(1120.0, 810.0),
                ),
            ],
        }
    }
}

// ── Player ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Pixels per second.
    pub base_speed: f32,
    pub capacity: u32,
    pub pickup_range: f32,
    pub sprint_multiplier: f32,
    pub max_stamina: f32,
    /// Stamina per second while sprinting.
    pub stamina_drain: f32,
    /// Stamina per second while not sprinting.
    pub stamina_regen: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            base_speed: 160.0,
            capacity: 3,
            pickup_range: 48.0,
            sprint_multiplier: 1.5,
            max_stamina: 100.0,
            stamina_drain: 25.0,
            stamina_regen: 15.0,
        }
    }
}

// ── Tasks ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateTarget {
    Department(DepartmentId),
    /// One department drawn uniformly at publication time.
    Random,
    Route(Vec<DepartmentId>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub name: String,
    pub tier: Tier,
    pub target: TemplateTarget,
}

impl TaskTemplate {
    pub fn stops(&self) -> u8 {
        match &self.target {
            TemplateTarget::Route(route) => route.len() as u8,
            _ => 1,
        }
    }

    fn single(name: &str, tier: Tier, dept: DepartmentId) -> Self {
        Self {
            name: name.to_string(),
            tier,
            target: TemplateTarget::Department(dept),
        }
    }

    fn random(name: &str, tier: Tier) -> Self {
        Self {
            name: name.to_string(),
            tier,
            target: TemplateTarget::Random,
        }
    }

    fn route(name: &str, tier: Tier, route: &[DepartmentId]) -> Self {
        Self {
            name: name.to_string(),
            tier,
            target: TemplateTarget::Route(route.to_vec()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XpConfig {
    pub single_base: u32,
    pub single_per_tier: u32,
    pub double_base: u32,
    pub double_per_tier: u32,
    pub double_tier_offset: u32,
    pub triple_base: u32,
    pub triple_per_tier: u32,
    pub triple_tier_offset: u32,
    pub junk_factor: f32,
    pub linkedin_factor: f32,
    pub favorite_factor: f32,
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            single_base: 20,
            single_per_tier: 5,
            double_base: 45,
            double_per_tier: 10,
            double_tier_offset: 2,
            triple_base: 80,
            triple_per_tier: 10,
            triple_tier_offset: 3,
            junk_factor: 0.5,
            linkedin_factor: 2.0,
            favorite_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliefConfig {
    pub single: f32,
    pub double: f32,
    pub triple: f32,
    pub favorite_factor: f32,
}

impl Default for ReliefConfig {
    fn default() -> Self {
        Self {
            single: 5.0,
            double: 8.0,
            triple: 12.0,
            favorite_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierWeights {
    pub current: f32,
    pub lower: f32,
    pub higher: f32,
}

impl Default for TierWeights {
    fn default() -> Self {
        Self {
            current: 0.6,
            lower: 0.3,
            higher: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub pool_size: usize,
    pub max_active: usize,
    /// Extra map slots the Burster and Decoy Spawner may use beyond the cap.
    pub over_cap_allowance: usize,
    pub initial_tasks: usize,
    pub spawn_interval_base_ms: u64,
    pub spawn_interval_min_ms: u64,
    pub lifetime_ms: u64,
    pub junk_lifetime_ms: u64,
    pub decoy_lifetime_ms: u64,
    pub decoy_carry_ms: u64,
    pub expiry_stress: f32,
    pub junk_expiry_stress: f32,
    pub decoy_vanish_stress: f32,
    pub junk_chain_window_ms: u64,
    pub hot_zone_ms: u64,
    pub multi_stop_min_level: u32,
    pub reroll_attempts: u32,
    pub tier_weights: TierWeights,
    pub xp: XpConfig,
    pub relief: ReliefConfig,
    pub templates: Vec<TaskTemplate>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        use DepartmentId::*;
        Self {
            pool_size: 40,
            max_active: 15,
            over_cap_allowance: 2,
            initial_tasks: 2,
            spawn_interval_base_ms: 6000,
            spawn_interval_min_ms: 2500,
            lifetime_ms: 60_000,
            junk_lifetime_ms: 20_000,
            decoy_lifetime_ms: 6000,
            decoy_carry_ms: 3000,
            expiry_stress: 2.0,
            junk_expiry_stress: 6.0,
            decoy_vanish_stress: 4.0,
            junk_chain_window_ms: 10_000,
            hot_zone_ms: 30_000,
            multi_stop_min_level: 5,
            reroll_attempts: 10,
            tier_weights: TierWeights::default(),
            xp: XpConfig::default(),
            relief: ReliefConfig::default(),
            templates: vec![
                TaskTemplate::single("Coffee Order", Tier::Intern, Marketing),
                TaskTemplate::random("Photocopies", Tier::Intern),
                TaskTemplate::single("Mail Sorting", Tier::Intern, Hr),
                TaskTemplate::single("Stapler Refill", Tier::Intern, Engineering),
                TaskTemplate::single("Expense Receipt", Tier::Intern, Finance),
                TaskTemplate::random("Lunch Order", Tier::Intern),
                TaskTemplate::single("Quarterly Report", Tier::Associate, Finance),
                TaskTemplate::single("Bug Report", Tier::Associate, Engineering),
                TaskTemplate::single("Press Release", Tier::Associate, Marketing),
                TaskTemplate::single("Onboarding Packet", Tier::Associate, Hr),
                TaskTemplate::random("Meeting Notes", Tier::Associate),
                TaskTemplate::route("Budget Draft", Tier::Associate, &[Finance, Ceo]),
                TaskTemplate::route("Product Spec", Tier::Manager, &[Engineering, Marketing]),
                TaskTemplate::route("Hiring Plan", Tier::Manager, &[Hr, Finance]),
                TaskTemplate::single("Roadmap Review", Tier::Manager, Engineering),
                TaskTemplate::single("Campaign Brief", Tier::Manager, Marketing),
                TaskTemplate::random("Vendor Contract", Tier::Manager),
                TaskTemplate::route("Board Deck", Tier::Director, &[Finance, Marketing, Ceo]),
                TaskTemplate::route("Reorg Proposal", Tier::Director, &[Hr, Ceo]),
                TaskTemplate::route("Launch Plan", Tier::Director, &[Engineering, Marketing]),
                TaskTemplate::single("Audit File", Tier::Director, Finance),
                TaskTemplate::random("Strategy Memo", Tier::Director),
                TaskTemplate::route("Merger Terms", Tier::Ceo, &[Finance, Hr, Ceo]),
                TaskTemplate::route("Investor Update", Tier::Ceo, &[Marketing, Finance]),
                TaskTemplate::route("All-Hands Script", Tier::Ceo, &[Hr, Marketing, Engineering]),
                TaskTemplate::single("Press Statement", Tier::Ceo, Ceo),
                TaskTemplate::random("Annual Report", Tier::Ceo),
            ],
        }
    }
}

// ── Stress ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// %/s per outstanding unit, indexed by tier.
    pub rates: [f32; 5],
    pub decay_threshold: f32,
    /// %/s removed above the threshold.
    pub decay_rate: f32,
    pub stress_ball_bonus: f32,
    pub expiry_cap: f32,
    pub expiry_window_ms: u64,
    pub yellow: f32,
    pub orange: f32,
    pub red: f32,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            rates: [0.02, 0.035, 0.065, 0.10, 0.14],
            decay_threshold: 50.0,
            decay_rate: 0.40,
            stress_ball_bonus: 0.25,
            expiry_cap: 20.0,
            expiry_window_ms: 5000,
            yellow: 40.0,
            orange: 65.0,
            red: 85.0,
        }
    }
}

// ── Progression ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    pub max_level: u32,
    /// Cost of each transition, 1→2 first.
    pub xp_costs: Vec<u32>,
    pub milestone_base: u32,
    pub milestone_step: u32,
    pub milestone_bonus: f32,
    pub milestone_bonus_cap: f32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            max_level: 9,
            xp_costs: vec![80, 120, 180, 240, 340, 520, 680, 840],
            milestone_base: 500,
            milestone_step: 200,
            milestone_bonus: 0.1,
            milestone_bonus_cap: 0.3,
        }
    }
}

// ── Pressure ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureConfig {
    pub agent_radius: f32,
    pub agent_bonus: f32,
    pub stress_threshold: f32,
    pub stress_bonus: f32,
    pub hot_zone_bonus: f32,
    pub max_multiplier: f32,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            agent_radius: 128.0,
            agent_bonus: 0.5,
            stress_threshold: 65.0,
            stress_bonus: 0.25,
            hot_zone_bonus: 0.75,
            max_multiplier: 3.0,
        }
    }
}

// ── Chaos agents ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub kind: AgentKind,
    pub time_gate_secs: f32,
    pub level_gate: u32,
    pub initial_count: u32,
    pub max_count: u32,
    pub max_count_time_secs: Option<f32>,
    /// Delay after an individual agent spawns before it enrages.
    pub enrage_delay_secs: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    pub arrival_threshold: f32,
    pub stuck_threshold: f32,
    pub stuck_check_interval_ms: f32,
    pub max_retries: u32,
    pub nudge_ms: f32,
    pub secondary_axis_factor: f32,
    pub wander_min_hold_ms: f32,
    pub wander_max_hold_ms: f32,
    pub wander_seek_bias: f32,
    pub wander_stall_px: f32,
    pub wander_stall_ms: f32,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            arrival_threshold: 8.0,
            stuck_threshold: 4.0,
            stuck_check_interval_ms: 1000.0,
            max_retries: 3,
            nudge_ms: 1200.0,
            secondary_axis_factor: 0.5,
            wander_min_hold_ms: 2000.0,
            wander_max_hold_ms: 4000.0,
            wander_seek_bias: 0.35,
            wander_stall_px: 1.5,
            wander_stall_ms: 300.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MicromanagerConfig {
    pub speed: f32,
    pub range: f32,
    pub enraged_range: f32,
    pub slow_factor: f32,
    pub stress_per_sec: f32,
    pub enraged_stress_per_sec: f32,
}

impl Default for MicromanagerConfig {
    fn default() -> Self {
        Self {
            speed: 70.0,
            range: 96.0,
            enraged_range: 128.0,
            slow_factor: 0.6,
            stress_per_sec: 0.3,
            enraged_stress_per_sec: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyAllConfig {
    pub speed: f32,
    pub obstacle_candidates: usize,
    pub pause_ms: f32,
    pub burst_count: u32,
    pub enraged_burst_count: u32,
    pub cooldown_ms: f32,
    /// Junk tasks land at least this far from the player.
    pub min_player_distance: f32,
}

impl Default for ReplyAllConfig {
    fn default() -> Self {
        Self {
            speed: 90.0,
            obstacle_candidates: 3,
            pause_ms: 1000.0,
            burst_count: 4,
            enraged_burst_count: 6,
            cooldown_ms: 8000.0,
            min_player_distance: 160.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingConfig {
    pub speed: f32,
    pub block_ms: u64,
    pub cooldown_ms: f32,
    pub block_stress: f32,
    pub enraged_max_blocks: usize,
    pub enraged_repick_ms: f32,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            speed: 80.0,
            block_ms: 12_000,
            cooldown_ms: 20_000.0,
            block_stress: 3.0,
            enraged_max_blocks: 2,
            enraged_repick_ms: 2000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChattyConfig {
    pub speed: f32,
    pub trigger_range: f32,
    pub freeze_ms: u64,
    pub enraged_freeze_ms: u64,
    pub cooldown_ms: f32,
    pub enraged_cooldown_ms: f32,
    pub immunity_ms: u64,
    pub min_freeze_ms: u64,
}

impl Default for ChattyConfig {
    fn default() -> Self {
        Self {
            speed: 60.0,
            trigger_range: 24.0,
            freeze_ms: 2500,
            enraged_freeze_ms: 3500,
            cooldown_ms: 6000.0,
            enraged_cooldown_ms: 4000.0,
            immunity_ms: 2000,
            min_freeze_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub speed: f32,
    pub decoy_interval_ms: f32,
    pub enraged_decoy_interval_ms: f32,
    pub aura_range: f32,
    pub enraged_aura_range: f32,
    pub aura_stress_per_sec: f32,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            speed: 70.0,
            decoy_interval_ms: 5000.0,
            enraged_decoy_interval_ms: 3000.0,
            aura_range: 120.0,
            enraged_aura_range: 160.0,
            aura_stress_per_sec: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub schedule: Vec<ScheduleEntry>,
    /// Agents spawn at least this far from the player.
    pub spawn_min_player_distance: f32,
    pub steering: SteeringConfig,
    pub micromanager: MicromanagerConfig,
    pub reply_all: ReplyAllConfig,
    pub meeting: MeetingConfig,
    pub chatty: ChattyConfig,
    pub slack: SlackConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            schedule: vec![
                ScheduleEntry {
                    kind: AgentKind::Micromanager,
                    time_gate_secs: 60.0,
                    level_gate: 2,
                    initial_count: 1,
                    max_count: 2,
                    max_count_time_secs: Some(360.0),
                    enrage_delay_secs: 180.0,
                },
                ScheduleEntry {
                    kind: AgentKind::ReplyAllGuy,
                    time_gate_secs: 120.0,
                    level_gate: 3,
                    initial_count: 1,
                    max_count: 1,
                    max_count_time_secs: None,
                    enrage_delay_secs: 150.0,
                },
                ScheduleEntry {
                    kind: AgentKind::ChattyColleague,
                    time_gate_secs: 180.0,
                    level_gate: 3,
                    initial_count: 1,
                    max_count: 2,
                    max_count_time_secs: Some(420.0),
                    enrage_delay_secs: 150.0,
                },
                ScheduleEntry {
                    kind: AgentKind::MeetingScheduler,
                    time_gate_secs: 240.0,
                    level_gate: 4,
                    initial_count: 1,
                    max_count: 1,
                    max_count_time_secs: None,
                    enrage_delay_secs: 120.0,
                },
                ScheduleEntry {
                    kind: AgentKind::SlackPinger,
                    time_gate_secs: 300.0,
                    level_gate: 5,
                    initial_count: 1,
                    max_count: 1,
                    max_count_time_secs: None,
                    enrage_delay_secs: 120.0,
                },
            ],
            spawn_min_player_distance: 160.0,
            steering: SteeringConfig::default(),
            micromanager: MicromanagerConfig::default(),
            reply_all: ReplyAllConfig::default(),
            meeting: MeetingConfig::default(),
            chatty: ChattyConfig::default(),
            slack: SlackConfig::default(),
        }
    }
}

// ── Assistant ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub speed: f32,
    /// Wander points stay this far inside the map edges.
    pub wander_margin: f32,
    pub wander_arrival: f32,
    pub seek_interval_ms: f32,
    pub pickup_range: f32,
    pub fetch_timeout_ms: f32,
    pub deliver_arrival: f32,
    pub deliver_timeout_ms: f32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            speed: 140.0,
            wander_margin: 96.0,
            wander_arrival: 16.0,
            seek_interval_ms: 5000.0,
            pickup_range: 28.0,
            fetch_timeout_ms: 15_000.0,
            deliver_arrival: 20.0,
            deliver_timeout_ms: 20_000.0,
        }
    }
}

// ── Upgrades ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    pub offer_size: usize,
    /// Levels past an agent's level gate after which its counter-upgrade may
    /// be offered before the agent has appeared.
    pub agent_gate_override_levels: u32,
    pub coffee_speed_factor: f32,
    pub coffee_ms: u64,
    pub linkedin_ms: u64,
    pub do_not_disturb_ms: u64,
    pub airpods_freeze_reduction: f32,
    pub airpods_slow_resistance: f32,
    pub meeting_blocker_duration_factor: f32,
    pub force_delivery_factor: f32,
    pub force_delivery_factor_meeting_blocker: f32,
    pub corner_office_expand_px: f32,
    pub extra_hands_capacity: u32,
    pub vacation_relief: f32,
    pub fast_tracker_charges: u32,
    pub fast_tracker_relief: f32,
    pub executive_presence_factor: f32,
    pub executive_presence_ms: u64,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            offer_size: 3,
            agent_gate_override_levels: 3,
            coffee_speed_factor: 1.3,
            coffee_ms: 30_000,
            linkedin_ms: 45_000,
            do_not_disturb_ms: 30_000,
            airpods_freeze_reduction: 0.5,
            airpods_slow_resistance: 0.5,
            meeting_blocker_duration_factor: 0.5,
            force_delivery_factor: 0.5,
            force_delivery_factor_meeting_blocker: 0.75,
            corner_office_expand_px: 32.0,
            extra_hands_capacity: 1,
            vacation_relief: 25.0,
            fast_tracker_charges: 3,
            fast_tracker_relief: 3.0,
            executive_presence_factor: 0.6,
            executive_presence_ms: 8000,
        }
    }
}
