//! Tests for ship behavior, combat and the running world.

use std::sync::Arc;
use std::time::Duration;

use glam::DVec2;
use tokio::sync::mpsc;

use spaceships_core::constants::*;
use spaceships_core::enums::ShipStatus;
use spaceships_core::events::ShipMessage;
use spaceships_core::state::ShipState;
use spaceships_core::types::{Aabb, Millis, ShipId};

use crate::config::{SimConfig, SupervisorConfig};
use crate::context::{ManualClock, SimContext};
use crate::error::ShipError;
use crate::ship::{Ship, TickOutcome};
use crate::world::World;

fn context(config: SimConfig) -> (Arc<SimContext>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let ctx = SimContext::new(config, clock.clone()).unwrap();
    (Arc::new(ctx), clock)
}

fn place(
    ctx: &Arc<SimContext>,
    id: u32,
    (x, y): (f64, f64),
    (vx, vy): (f64, f64),
) -> (Ship, mpsc::Receiver<ShipMessage>) {
    let state = ShipState::new(ShipId(id), DVec2::new(x, y), DVec2::new(vx, vy), ctx.now());
    Ship::place(Arc::clone(ctx), ShipId(id), state, 7)
}

fn drain(rx: &mut mpsc::Receiver<ShipMessage>) -> Vec<ShipMessage> {
    let mut out = Vec::new();
    while let Ok(m) = rx.try_recv() {
        out.push(m);
    }
    out
}

fn shot_from(x: f64, y: f64) -> ShipMessage {
    ShipMessage::Shot {
        from: DVec2::new(x, y),
    }
}

// ---- Combat ----

#[test]
fn test_shot_accumulation_and_single_blast() {
    let (ctx, clock) = context(SimConfig::default());
    let (mut a, _a_rx) = place(&ctx, 0, (0.0, 0.0), (10.0, 0.0));
    let (_b, mut b_rx) = place(&ctx, 1, (50.0, 0.0), (0.0, 0.0));
    let (_c, mut c_rx) = place(&ctx, 2, (0.0, -150.0), (0.0, 0.0));
    let (_d, mut d_rx) = place(&ctx, 3, (500.0, 0.0), (0.0, 0.0));

    for _ in 0..TIMES_HIT_TO_BLOW - 1 {
        a.handle_message(shot_from(100.0, 100.0), ctx.now()).unwrap();
    }
    assert_eq!(a.status(), ShipStatus::Alive);
    assert_eq!(a.pending_actions(), 0);
    assert!(drain(&mut b_rx).is_empty());

    clock.set(100);
    a.handle_message(shot_from(100.0, 100.0), 100).unwrap();
    assert_eq!(a.status(), ShipStatus::BlowingUp);
    assert_eq!(a.pending_actions(), 1);
    assert_eq!(ctx.metrics.snapshot().explosions, 1);

    let expected = ShipMessage::Blast {
        time: 100,
        center: DVec2::ZERO,
    };
    assert_eq!(drain(&mut b_rx), vec![expected]);
    assert_eq!(drain(&mut c_rx), vec![expected]);
    assert!(drain(&mut d_rx).is_empty(), "outside the blast range");

    // More hits on a dying ship change nothing but the counter.
    a.handle_message(shot_from(100.0, 100.0), 120).unwrap();
    assert_eq!(a.times_hit(), TIMES_HIT_TO_BLOW + 1);
    assert_eq!(a.pending_actions(), 1);
    assert!(drain(&mut b_rx).is_empty());
    assert_eq!(ctx.metrics.snapshot().explosions, 1);
}

#[test]
fn test_full_mailbox_does_not_cut_the_blast_short() {
    let (ctx, _clock) = context(SimConfig {
        mailbox_capacity: 1,
        ..Default::default()
    });
    let (mut a, _a_rx) = place(&ctx, 0, (0.0, 0.0), (10.0, 0.0));
    let (b, _b_rx) = place(&ctx, 1, (50.0, 0.0), (0.0, 0.0));
    let (_c, mut c_rx) = place(&ctx, 2, (60.0, 0.0), (0.0, 0.0));

    // B comes before C in token order and cannot take another message.
    let mailbox = ctx.index.read_element(b.token()).unwrap().record.mailbox;
    mailbox.send(shot_from(0.0, 0.0)).unwrap();

    for _ in 0..TIMES_HIT_TO_BLOW - 1 {
        a.handle_message(shot_from(100.0, 100.0), 0).unwrap();
    }
    let result = a.handle_message(shot_from(100.0, 100.0), 0);

    assert!(matches!(result, Err(ShipError::MailboxFull { target: ShipId(1) })));
    assert_eq!(a.status(), ShipStatus::BlowingUp);
    assert_eq!(
        drain(&mut c_rx),
        vec![ShipMessage::Blast {
            time: 0,
            center: DVec2::ZERO,
        }]
    );
}

#[test]
fn test_blow_up_is_published_then_ship_vanishes() {
    let (ctx, clock) = context(SimConfig::default());
    let (mut a, _rx) = place(&ctx, 0, (0.0, 0.0), (10.0, 0.0));
    let (_b, mut b_rx) = place(&ctx, 1, (50.0, 0.0), (0.0, 0.0));
    let token = a.token();

    for _ in 0..TIMES_HIT_TO_BLOW {
        a.handle_message(shot_from(30.0, 0.0), 0).unwrap();
    }
    assert_eq!(
        ctx.index.read_element(token).unwrap().record.state.status,
        ShipStatus::Alive
    );

    clock.set(MIN_PERIOD_MILLIS);
    assert_eq!(a.tick(MIN_PERIOD_MILLIS).unwrap(), TickOutcome::Continue);
    let published = ctx.index.read_element(token).unwrap().record.state;
    assert_eq!(published.status, ShipStatus::BlowingUp);
    assert_eq!(published.velocity, DVec2::ZERO);
    assert_eq!(published.ex_velocity, DVec2::ZERO);
    assert_eq!(published.blow_time, Some(0));
    assert_eq!(published.times_hit, TIMES_HIT_TO_BLOW);

    assert_eq!(a.next_deadline(), 2 * MIN_PERIOD_MILLIS);
    assert_eq!(a.tick(980).unwrap(), TickOutcome::Continue);
    assert_eq!(a.next_deadline(), BLOW_TILL_DELETE_DURATION);
    assert_eq!(a.tick(BLOW_TILL_DELETE_DURATION).unwrap(), TickOutcome::Gone);
    assert_eq!(a.status(), ShipStatus::Gone);
    assert_eq!(a.pending_actions(), 0);

    // A gone ship ignores further hits.
    assert_eq!(drain(&mut b_rx).len(), 1);
    a.handle_message(shot_from(30.0, 0.0), BLOW_TILL_DELETE_DURATION)
        .unwrap();
    assert_eq!(a.status(), ShipStatus::Gone);
    assert_eq!(a.pending_actions(), 0);
    assert!(drain(&mut b_rx).is_empty());
    assert_eq!(ctx.metrics.snapshot().explosions, 1);

    drop(a);
    assert!(ctx.index.read_element(token).is_none());
}

#[test]
fn test_hit_recoil_is_published_on_next_tick() {
    let (ctx, _clock) = context(SimConfig::default());
    let (mut a, _rx) = place(&ctx, 0, (0.0, 0.0), (10.0, 0.0));

    a.handle_message(shot_from(0.0, 50.0), 0).unwrap();
    assert_eq!(a.status(), ShipStatus::Alive);
    assert_eq!(a.times_hit(), 1);

    a.tick(MIN_PERIOD_MILLIS).unwrap();
    let committed = *a.committed();
    assert!((committed.ex_velocity - DVec2::new(0.0, -HIT_RECOIL_VELOCITY)).length() < 1e-9);
    assert_eq!(committed.times_hit, 1);
    assert_eq!(committed.time_hit, Some(0));
    // The interval before the hit moved with the old external velocity.
    assert!((committed.position - DVec2::new(0.3, 0.0)).length() < 1e-12);
}

#[test]
fn test_blast_pushes_away_from_center() {
    let (ctx, _clock) = context(SimConfig::default());
    let (mut a, _rx) = place(&ctx, 0, (0.0, 0.0), (10.0, 0.0));

    a.handle_message(
        ShipMessage::Blast {
            time: 0,
            center: DVec2::new(100.0, 0.0),
        },
        0,
    )
    .unwrap();
    a.tick(MIN_PERIOD_MILLIS).unwrap();
    assert!((a.committed().ex_velocity - DVec2::new(-175.0, 0.0)).length() < 1e-9);
}

// ---- Targeting ----

#[test]
fn test_search_picks_nearest_outside_exclusion_radius() {
    let (ctx, _clock) = context(SimConfig::default());
    let (mut a, _a_rx) = place(&ctx, 0, (0.0, 0.0), (50.0, 0.0));
    let (_too_close, _r1) = place(&ctx, 1, (5.0, 0.0), (0.0, 0.0));
    let (b, _r2) = place(&ctx, 2, (100.0, 10.0), (0.0, 0.0));
    let (_far, _r3) = place(&ctx, 3, (300.0, 0.0), (0.0, 0.0));
    let (_behind, _r4) = place(&ctx, 4, (-50.0, 0.0), (0.0, 0.0));

    a.search_for_targets();
    assert_eq!(a.locked_on(), Some(b.token()));
}

#[test]
fn test_search_with_nobody_in_cone_stays_unlocked() {
    let (ctx, _clock) = context(SimConfig::default());
    let (mut a, _a_rx) = place(&ctx, 0, (0.0, 0.0), (0.0, 50.0));
    let (_side, _r1) = place(&ctx, 1, (100.0, 0.0), (0.0, 0.0));
    let (_out_of_range, _r2) = place(&ctx, 2, (0.0, 450.0), (0.0, 0.0));

    a.search_for_targets();
    assert_eq!(a.locked_on(), None);
}

#[test]
fn test_vanished_target_clears_lock() {
    let (ctx, _clock) = context(SimConfig::default());
    let (mut a, _a_rx) = place(&ctx, 0, (0.0, 0.0), (50.0, 0.0));
    let (b, _b_rx) = place(&ctx, 1, (100.0, 0.0), (0.0, 0.0));

    a.search_for_targets();
    assert_eq!(a.locked_on(), Some(b.token()));

    // B is removed before A's next chase step.
    drop(b);
    assert_eq!(a.tick(MIN_PERIOD_MILLIS).unwrap(), TickOutcome::Continue);
    assert_eq!(a.locked_on(), None);
    assert_eq!(a.committed().acceleration, DVec2::ZERO);
}

#[test]
fn test_locked_ship_chases_and_fires() {
    let (ctx, clock) = context(SimConfig::default());
    let (mut a, _a_rx) = place(&ctx, 0, (0.0, 0.0), (10.0, 0.0));
    let (b, mut b_rx) = place(&ctx, 1, (150.0, 0.0), (0.0, 0.0));

    a.search_for_targets();
    assert_eq!(a.locked_on(), Some(b.token()));

    let mut fired_at: Option<Millis> = None;
    for i in 1..=20 {
        let now = i * MIN_PERIOD_MILLIS;
        clock.set(now);
        a.tick(now).unwrap();
        assert_eq!(a.locked_on(), Some(b.token()));
        // Nothing within the interaction range, so only the chase remains.
        let acc = a.committed().acceleration;
        assert!((acc - DVec2::new(CHASE_ACCELERATION, 0.0)).length() < 1e-9);
        if let Some(shot) = drain(&mut b_rx).first() {
            let ShipMessage::Shot { from } = *shot else {
                panic!("expected a shot, got {shot:?}");
            };
            assert!(from.x >= 0.0 && from.x < 150.0);
            fired_at = Some(now);
            break;
        }
    }
    let fired_at = fired_at.expect("a ship in the line of fire is eventually shot");
    assert_eq!(a.committed().time_fired, Some(fired_at));
    assert!(a.committed().shot_length > 100.0);
}

#[test]
fn test_full_target_mailbox_fails_the_shooter() {
    let (ctx, clock) = context(SimConfig {
        mailbox_capacity: 1,
        ..Default::default()
    });
    let (mut a, _a_rx) = place(&ctx, 0, (0.0, 0.0), (10.0, 0.0));
    let (b, _b_rx) = place(&ctx, 1, (150.0, 0.0), (0.0, 0.0));

    // Fill B's mailbox.
    let mailbox = ctx.index.read_element(b.token()).unwrap().record.mailbox;
    mailbox.send(shot_from(0.0, 0.0)).unwrap();

    a.search_for_targets();
    let error = (1..=20).find_map(|i| {
        let now = i * MIN_PERIOD_MILLIS;
        clock.set(now);
        a.tick(now).err()
    });
    assert!(matches!(error, Some(ShipError::MailboxFull { target: ShipId(1) })));
}

// ---- Motion ----

#[test]
fn test_neighbors_within_range_repel() {
    let (ctx, _clock) = context(SimConfig::default());
    let (mut a, _a_rx) = place(&ctx, 0, (0.0, 0.0), (0.0, 0.0));
    let (_b, _b_rx) = place(&ctx, 1, (2.0, 0.0), (0.0, 0.0));

    a.tick(MIN_PERIOD_MILLIS).unwrap();
    let acc = a.committed().acceleration;
    // d = 2 is treated as MIN_PROXIMITY, so the push is the capped value.
    assert!((acc - DVec2::new(-REJECTION_CAP, 0.0)).length() < 1e-9);
    assert!(acc.is_finite());
}

#[test]
fn test_tick_lands_on_extrapolated_position() {
    let (ctx, _clock) = context(SimConfig::default());
    let mut state = ShipState::new(ShipId(0), DVec2::new(100.0, 200.0), DVec2::new(30.0, -40.0), 0);
    state.acceleration = DVec2::new(12.0, 5.0);
    state.ex_velocity = DVec2::new(-3.0, 1.5);
    let (mut a, _rx) = Ship::place(Arc::clone(&ctx), ShipId(0), state, 1);

    let at = 47;
    let predicted = a.committed().position_at(at);
    a.tick(at).unwrap();
    assert_eq!(a.committed().position, predicted);
    assert_eq!(a.committed().last_moved, at);
}

#[test]
fn test_spawn_respects_bounds_and_speed_limit() {
    let config = SimConfig {
        world_length: 1000.0,
        speed_variance: 50.0,
        ..Default::default()
    };
    let (ctx, _clock) = context(config);
    let bounds = ctx.bounds;
    let ships: Vec<_> = (0..200).map(|i| Ship::spawn(Arc::clone(&ctx), ShipId(i), 0)).collect();
    assert_eq!(ctx.index.len(), 200);
    for (ship, _) in &ships {
        let s = ship.committed();
        assert!(bounds.contains_point(s.position));
        assert!(s.velocity.length() <= SPEED_LIMIT + 1e-9);
        assert_eq!(s.status, ShipStatus::Alive);
    }

    // Same seed, slot and incarnation: same ship.
    let (again, _) = Ship::spawn(Arc::clone(&ctx), ShipId(3), 0);
    assert_eq!(again.committed().position, ships[3].0.committed().position);
    let (other, _) = Ship::spawn(Arc::clone(&ctx), ShipId(3), 1);
    assert_ne!(other.committed().position, ships[3].0.committed().position);
}

// ---- World ----

#[test]
fn test_snapshot_viewport_and_extrapolation() {
    let clock = Arc::new(ManualClock::new(0));
    let world = World::with_clock(SimConfig::default(), clock.clone()).unwrap();
    let ctx = Arc::clone(world.context());
    let (_a, _ra) = place(&ctx, 0, (0.0, 0.0), (50.0, 0.0));
    let (_b, _rb) = place(&ctx, 1, (500.0, 500.0), (0.0, 0.0));

    clock.set(1000);
    let snap = world.snapshot(Aabb::new(-10.0, 10.0, -10.0, 10.0), 5.0);
    assert_eq!(snap.time, 1000);
    assert_eq!(snap.ships.len(), 1);
    assert_eq!(snap.ships[0].id, ShipId(0));
    assert!((snap.ships[0].display_position.x - 50.0).abs() < 1e-9);

    let frozen = World::with_clock(
        SimConfig {
            extrapolate: false,
            ..Default::default()
        },
        clock.clone(),
    )
    .unwrap();
    let (_c, _rc) = place(frozen.context(), 0, (0.0, 0.0), (50.0, 0.0));
    let snap = frozen.snapshot(Aabb::point(DVec2::ZERO), 1.0);
    assert_eq!(snap.ships[0].display_position, DVec2::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_world_runs_within_invariants() {
    let config = SimConfig {
        seed: 7,
        ships: 40,
        world_length: 1500.0,
        ..Default::default()
    };
    let mut world = World::new(config).unwrap();
    world.start();

    let bounds = world.context().bounds;
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let snap = world.snapshot(bounds, 1.0);
        assert!(!snap.ships.is_empty());
        assert!(snap.ships.len() <= 40);
        for ship in &snap.ships {
            assert!(bounds.contains_point(ship.position), "{:?} out of bounds", ship.id);
            assert!(ship.velocity.length() <= SPEED_LIMIT + 1e-9);
            assert!(ship.position.is_finite());
        }
    }

    // The reporter drained the counter at 1 s and 2 s.
    let rate = world.sample_rate(Duration::from_millis(500));
    assert!(rate > 10.0, "rate {rate}");
    assert_eq!(world.metrics().failures, 0);
    assert_eq!(world.live_slots(), 40);

    world.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_removes_every_record() {
    let mut world = World::new(SimConfig {
        ships: 25,
        world_length: 2000.0,
        supervisor: SupervisorConfig::default(),
        ..Default::default()
    })
    .unwrap();
    world.start();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(world.ship_count(), 25);

    let ctx = Arc::clone(world.context());
    world.shutdown().await;
    assert!(ctx.index.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rate_rows_written_to_metrics_dir() {
    let dir = std::env::temp_dir().join(format!("spaceships-world-{}", std::process::id()));
    let mut world = World::new(SimConfig {
        ships: 10,
        world_length: 1000.0,
        metrics_dir: Some(dir.clone()),
        ..Default::default()
    })
    .unwrap();
    world.start();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    world.shutdown().await;

    let times = std::fs::read_to_string(dir.join(crate::report::TIMES_FILE)).unwrap();
    let rows: Vec<_> = times.lines().filter(|l| !l.starts_with('#')).collect();
    assert!(rows.len() >= 2, "{times}");
    assert!(rows[0].starts_with("0,"));
    assert!(rows[1].starts_with("1,"));
    assert!(dir.join(crate::report::CONFIG_FILE).is_file());

    let _ = std::fs::remove_dir_all(&dir);
}
