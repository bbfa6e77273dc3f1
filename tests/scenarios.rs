use std::collections::BTreeSet;

use office_rush::config::GameConfig;
use office_rush::error::CommandError;
use office_rush::game::upgrades::{all_upgrades, UpgradeId, UpgradeKind};
use office_rush::protocol::{
    AgentKind, Carrier, DepartmentId, Envelope, GameEvent, Outcome, PressureReason, TaskState, Tier, Topic, Vec2,
};
use office_rush::session::Simulation;

const MARKETING: Vec2 = Vec2 { x: 160.0, y: 120.0 };
const ENGINEERING: Vec2 = Vec2 { x: 160.0, y: 850.0 };

fn quiet_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.run.pause_on_offer = false;
    config.tasks.initial_tasks = 0;
    config
}

fn quiet_sim() -> Simulation {
    Simulation::new(quiet_config(), 42).unwrap()
}

/// Ticks in 100 ms steps up to `until_ms`, clearing stress every second so
/// long stretches never end the run.
fn advance_calm(sim: &mut Simulation, until_ms: u64, events: &mut Vec<Envelope>) {
    while sim.now_ms() < until_ms {
        sim.tick(100.0);
        if sim.now_ms() % 1000 == 0 {
            sim.debug_set_stress(0.0);
        }
        events.extend(sim.take_events());
    }
}

fn delivered(events: &[Envelope]) -> Vec<(u32, f32, bool)> {
    events
        .iter()
        .filter_map(|e| match e.event {
            GameEvent::TaskDelivered {
                xp,
                stress_relief,
                forced,
                ..
            } => Some((xp, stress_relief, forced)),
            _ => None,
        })
        .collect()
}

#[test]
fn first_single_stop_delivery() {
    let mut sim = quiet_sim();
    sim.tick(1000.0);
    let id = sim.debug_spawn_task("Coffee Order", Some(sim.player_position())).unwrap();
    sim.pickup_attempt(id).unwrap();
    sim.debug_teleport(MARKETING);
    sim.tick(4000.0);
    assert_eq!(sim.now_ms(), 5000);

    let events = sim.take_events();
    let picked = events
        .iter()
        .position(|e| matches!(e.event, GameEvent::TaskPickedUp { task_id, .. } if task_id == id))
        .unwrap();
    let done = events
        .iter()
        .position(|e| matches!(e.event, GameEvent::TaskDelivered { task_id, .. } if task_id == id))
        .unwrap();
    assert!(picked < done);
    assert_eq!(events[done].at_ms, 5000);
    assert_eq!(delivered(&events), vec![(20, 5.0, false)]);

    assert_eq!(sim.task(id).unwrap().state, TaskState::Idle);
    assert_eq!(sim.delivery_count(DepartmentId::Marketing), 1);
    assert!(sim.carried().is_empty());
}

#[test]
fn fast_tracker_trims_a_two_stop_task() {
    let mut sim = quiet_sim();
    sim.debug_add_xp(80 + 120 + 180 + 240);
    assert_eq!(sim.get_stats().tier, Tier::Manager);
    sim.debug_grant_upgrade(UpgradeId::FastTracker);
    assert_eq!(sim.upgrade_charges(UpgradeId::FastTracker), 3);
    sim.debug_set_stress(10.0);

    let id = sim.debug_spawn_task("Product Spec", Some(sim.player_position())).unwrap();
    sim.pickup_attempt(id).unwrap();
    let task = sim.task(id).unwrap();
    assert_eq!(task.total_stops, 1);
    assert_eq!(task.route, vec![DepartmentId::Engineering]);
    assert!((sim.get_stats().stress - 7.0).abs() < 1e-4);
    assert_eq!(sim.upgrade_charges(UpgradeId::FastTracker), 2);

    sim.take_events();
    sim.debug_teleport(ENGINEERING);
    sim.tick(16.0);
    let events = sim.take_events();
    assert_eq!(delivered(&events).first().map(|d| d.0), Some(30));
}

#[test]
fn stress_max_fires_before_decay() {
    let mut sim = quiet_sim();
    sim.debug_spawn_task("Coffee Order", Some(Vec2::new(900.0, 800.0))).unwrap();
    sim.debug_set_stress(99.99);
    sim.take_events();
    sim.tick(1000.0);

    let events = sim.take_events();
    let maxes = events.iter().filter(|e| e.event.topic() == Topic::StressMax).count();
    assert_eq!(maxes, 1);
    assert_eq!(sim.get_stats().stress, 100.0);
    assert_eq!(sim.run_state().outcome, Some(Outcome::Lose));
}

#[test]
fn smart_offer_counters_the_newest_agent() {
    let mut sim = quiet_sim();
    let mut events = Vec::new();

    sim.debug_add_xp(80);
    advance_calm(&mut sim, 61_000, &mut events);
    assert!(sim.get_stats().active_agent_types.contains(&AgentKind::Micromanager));
    advance_calm(&mut sim, 70_000, &mut events);
    sim.debug_add_xp(120);
    assert_eq!(sim.get_stats().level, 3);

    advance_calm(&mut sim, 121_000, &mut events);
    assert!(sim.get_stats().active_agent_types.contains(&AgentKind::ReplyAllGuy));
    advance_calm(&mut sim, 130_000, &mut events);
    sim.debug_add_xp(180);
    events.extend(sim.take_events());

    let last_offer = events
        .iter()
        .rev()
        .find_map(|e| match &e.event {
            GameEvent::UpgradeOffered { choices, .. } => Some(choices.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        last_offer.iter().filter(|id| **id == UpgradeId::ReplyAllFilter).count(),
        1
    );
}

#[test]
fn hot_zone_clutch_delivery_stacks_pressure() {
    let mut config = quiet_config();
    config.map.spawn_points = vec![Vec2::new(224.0, 330.0)];
    let mut sim = Simulation::new(config, 5).unwrap();

    let spot = Vec2::new(224.0, 150.0);
    sim.debug_teleport(spot);
    assert!(sim.debug_block_department(DepartmentId::Marketing, 1000));
    assert!(sim.debug_spawn_agent(AgentKind::Micromanager));
    for _ in 0..50 {
        sim.tick(100.0);
    }
    assert!(!sim.is_dept_blocked(DepartmentId::Marketing));
    let player = sim.player_position();
    let nearest = sim
        .snapshot()
        .agents
        .iter()
        .map(|a| a.position.distance(player))
        .fold(f32::MAX, f32::min);
    assert!(nearest < 128.0, "micromanager still {nearest} px away");

    sim.debug_set_stress(70.0);
    let id = sim.debug_spawn_task("Coffee Order", Some(player)).unwrap();
    sim.pickup_attempt(id).unwrap();
    sim.take_events();
    sim.tick(16.0);

    let events = sim.take_events();
    let (multiplier, reasons) = events
        .iter()
        .find_map(|e| match &e.event {
            GameEvent::PressureBonus { multiplier, reasons, .. } => Some((*multiplier, reasons.clone())),
            _ => None,
        })
        .unwrap();
    assert!((multiplier - 2.5).abs() < 1e-5);
    assert_eq!(
        reasons,
        vec![
            PressureReason::UnderPressure,
            PressureReason::ClutchDelivery,
            PressureReason::HotZone
        ]
    );
    assert_eq!(delivered(&events).first().map(|d| d.0), Some(50));
}

fn soft_locked_sim() -> (Simulation, Vec<u32>) {
    let mut sim = quiet_sim();
    assert!(sim.debug_spawn_agent(AgentKind::MeetingScheduler));
    let here = sim.player_position();
    let ids = vec![
        sim.debug_spawn_task("Coffee Order", Some(here)).unwrap(),
        sim.debug_spawn_task("Stapler Refill", Some(here)).unwrap(),
    ];
    for id in &ids {
        sim.pickup_attempt(*id).unwrap();
    }
    (sim, ids)
}

#[test]
fn soft_lock_override_delivers_at_half_xp() {
    let (mut sim, ids) = soft_locked_sim();
    assert!(sim.debug_block_department(DepartmentId::Marketing, 60_000));
    assert_eq!(sim.force_delivery_attempt(), Err(CommandError::NotSoftLocked));

    assert!(sim.debug_block_department(DepartmentId::Engineering, 60_000));
    sim.take_events();
    assert_eq!(sim.force_delivery_attempt(), Ok(ids[0]));
    assert_eq!(sim.carried(), vec![ids[1]]);
    assert_eq!(delivered(&sim.take_events()), vec![(10, 5.0, true)]);
}

#[test]
fn meeting_blocker_softens_the_override() {
    let (mut sim, ids) = soft_locked_sim();
    sim.debug_grant_upgrade(UpgradeId::MeetingBlocker);
    assert!(sim.debug_block_department(DepartmentId::Marketing, 60_000));
    assert!(sim.debug_block_department(DepartmentId::Engineering, 60_000));
    sim.take_events();
    assert_eq!(sim.force_delivery_attempt(), Ok(ids[0]));
    assert_eq!(delivered(&sim.take_events()), vec![(15, 5.0, true)]);
}

#[test]
fn inbox_zero_clears_the_inventory() {
    let (mut sim, _ids) = soft_locked_sim();
    sim.take_events();
    sim.debug_grant_upgrade(UpgradeId::InboxZero);
    assert!(sim.carried().is_empty());
    assert_eq!(delivered(&sim.take_events()).len(), 2);
}

fn one_shot(id: UpgradeId) -> bool {
    all_upgrades()
        .iter()
        .any(|def| def.id == id && matches!(def.kind, UpgradeKind::Permanent | UpgradeKind::Instant))
}

#[test]
fn stacked_offers_never_grant_a_permanent_twice() {
    for seed in 0..40 {
        let mut sim = Simulation::new(quiet_config(), seed).unwrap();
        // Well past CEO: eight level-ups plus several milestones at once.
        sim.debug_add_xp(20_000);
        let queued = sim
            .take_events()
            .iter()
            .filter(|e| e.event.topic() == Topic::UpgradeOffered)
            .count();
        assert!(queued >= 10, "seed {seed}: only {queued} offers");

        let mut granted = BTreeSet::new();
        let mut picks = 0;
        while let Some(offer) = sim.pending_offer() {
            assert!(
                offer.choices.iter().all(|id| !granted.contains(id)),
                "seed {seed}: spent upgrade still offered in {:?}",
                offer.choices
            );
            let choice = offer
                .choices
                .iter()
                .copied()
                .find(|id| one_shot(*id))
                .or_else(|| offer.choices.first().copied())
                .unwrap();
            sim.select_upgrade(choice).unwrap();
            picks += 1;
            assert!(picks < 100);

            for envelope in sim.take_events() {
                if let GameEvent::UpgradeActivated { id, kind, .. } = envelope.event {
                    if matches!(kind, UpgradeKind::Permanent | UpgradeKind::Instant) {
                        assert!(granted.insert(id), "seed {seed}: {id:?} granted twice");
                    }
                }
            }
        }

        let capacity = sim.player().unwrap().capacity;
        assert!(capacity <= 4, "seed {seed}: capacity {capacity}");
    }
}

#[test]
fn personal_assistant_runs_tasks() {
    let mut sim = quiet_sim();
    sim.debug_grant_upgrade(UpgradeId::PersonalAssistant);
    assert!(sim.snapshot().assistant.is_some());
    sim.debug_spawn_task("Mail Sorting", Some(Vec2::new(700.0, 480.0))).unwrap();

    let mut events = Vec::new();
    advance_calm(&mut sim, 50_000, &mut events);
    let by_assistant = events
        .iter()
        .filter(|e| {
            matches!(
                e.event,
                GameEvent::TaskDelivered {
                    carrier: Carrier::Assistant,
                    ..
                }
            )
        })
        .count();
    assert!(by_assistant >= 1);
}

#[test]
fn timed_upgrade_expires_and_refreshes() {
    let mut sim = quiet_sim();
    sim.debug_grant_upgrade(UpgradeId::CoffeeBoost);
    let mut events = Vec::new();
    advance_calm(&mut sim, 20_000, &mut events);
    sim.debug_grant_upgrade(UpgradeId::CoffeeBoost);
    advance_calm(&mut sim, 45_000, &mut events);
    assert!(sim.is_upgrade_active(UpgradeId::CoffeeBoost));
    advance_calm(&mut sim, 51_000, &mut events);
    assert!(!sim.is_upgrade_active(UpgradeId::CoffeeBoost));
    let expiries = events
        .iter()
        .filter(|e| matches!(e.event, GameEvent::UpgradeExpired { id: UpgradeId::CoffeeBoost }))
        .count();
    assert_eq!(expiries, 1);
}

#[test]
fn schedule_must_cover_every_agent() {
    let mut config = quiet_config();
    config.agents.schedule.retain(|e| e.kind != AgentKind::SlackPinger);
    assert!(Simulation::new(config, 1).is_err());

    let mut sim = quiet_sim();
    assert!(sim.debug_spawn_agent(AgentKind::SlackPinger));
    assert_eq!(sim.snapshot().agents.len(), 1);
}

/// Drives a whole run with a greedy bot and checks the invariants that must
/// hold in every reachable state.
#[test]
fn invariants_hold_across_a_full_run() {
    let mut config = GameConfig::default();
    config.run.pause_on_offer = true;
    let mut sim = Simulation::new(config, 2024).unwrap();
    sim.debug_grant_upgrade(UpgradeId::PersonalAssistant);

    let zones: Vec<(DepartmentId, Vec2)> = sim
        .config()
        .map
        .departments
        .iter()
        .map(|d| (d.id, d.zone.center()))
        .collect();

    let mut held: BTreeSet<u32> = BTreeSet::new();
    let mut blocked: BTreeSet<DepartmentId> = BTreeSet::new();
    let mut stress_maxes = 0;

    for step in 0..13_000u32 {
        if let Some(offer) = sim.pending_offer() {
            let choice = offer.choices[0];
            sim.select_upgrade(choice).unwrap();
        }
        if step % 200 == 0 {
            sim.debug_add_xp(150);
        }
        if step % 20 == 0 && sim.get_stats().stress > 80.0 {
            sim.debug_set_stress(40.0);
        }

        let me = sim.player_position();
        let carrying = sim.carried();
        let capacity = sim.player().map(|p| p.capacity).unwrap_or(3);
        let tasks = sim.get_active_tasks();
        for task in &tasks {
            if task.position.is_some_and(|p| p.distance(me) <= 48.0) {
                let _ = sim.pickup_attempt(task.id);
            }
        }
        let heading = if (carrying.len() as u32) < capacity && !tasks.is_empty() {
            tasks
                .iter()
                .filter_map(|t| t.position)
                .min_by(|a, b| a.distance(me).total_cmp(&b.distance(me)))
        } else {
            carrying
                .first()
                .and_then(|id| sim.task(*id))
                .and_then(|t| t.current_department)
                .and_then(|d| zones.iter().find(|(id, _)| *id == d).map(|(_, c)| *c))
        };
        match heading {
            Some(target) => {
                let dir = target - me;
                sim.set_movement(dir.x, dir.y);
            }
            None => sim.set_movement(0.0, 0.0),
        }
        sim.set_sprint(step % 3 == 0);

        sim.tick(50.0);

        for envelope in sim.take_events() {
            match envelope.event {
                GameEvent::TaskPickedUp { task_id, .. } => {
                    held.insert(task_id);
                }
                GameEvent::TaskDelivered { task_id, .. } => {
                    assert!(held.remove(&task_id), "task {task_id} delivered without a pickup");
                }
                GameEvent::TaskExpired { task_id, .. } => {
                    held.remove(&task_id);
                }
                GameEvent::LevelUp {
                    level,
                    tier,
                    previous_tier,
                    is_promotion,
                } => {
                    assert_eq!(tier, Tier::for_level(level));
                    assert_eq!(is_promotion, tier != previous_tier);
                }
                GameEvent::MilestoneBonus { xp_multiplier_bonus } => {
                    assert!(xp_multiplier_bonus <= 0.3 + 1e-6);
                }
                GameEvent::StressMax { .. } => stress_maxes += 1,
                GameEvent::DepartmentBlocked { department, .. } => {
                    assert!(blocked.insert(department), "{department:?} blocked twice");
                }
                GameEvent::DepartmentUnblocked { department } => {
                    blocked.remove(&department);
                }
                _ => {}
            }
        }

        let stats = sim.get_stats();
        assert!((0.0..=100.0).contains(&stats.stress));
        assert!(stress_maxes <= 1);
        if let Some(player) = sim.player() {
            assert!(player.carrying.len() as u32 <= player.capacity);
        }
        if sim.run_state().over {
            break;
        }
    }

    assert!(sim.run_state().over);
    assert!(sim.get_stats().delivered_count > 0);
}
