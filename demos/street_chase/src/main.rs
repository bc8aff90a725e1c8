//! street_chase — a handful of officers chasing one suspect down a street.
//!
//! The suspect runs east for a while, then stops.  Officers are recruited
//! into a single pursuit, run them down, tase and cuff them; the simulation
//! closes the pursuit on its own once the suspect is in custody.
//!
//! ```text
//! cargo run -p street_chase                       # built-in scenario
//! cargo run -p street_chase -- street_chase.toml  # overrides from TOML
//! RUST_LOG=npc_pursuit=debug cargo run -p street_chase
//! ```

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use npc_core::{ActionPriority, AgentId, ControllerId, SimConfig, Tick, TravelMode, Vec3, VehicleId};
use npc_pursuit::{Blackboard, PursuitConfig};
use npc_sim::{SimBuilder, SimObserver, TickSummary};
use npc_world::{EntityQuery, PursuitEvent, SandboxWorld, Topic, WorldCommand};

// ── Constants ─────────────────────────────────────────────────────────────────

const SUSPECT:         AgentId   = AgentId(100);
const PATROL_CAR:      VehicleId = VehicleId(1);
const DISPATCH_RADIUS: f32       = 150.0;
const SNAPSHOT_SECS:   u64       = 5;

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default)]
struct DemoConfig {
    sim:      SimConfig,
    pursuit:  PursuitConfig,
    scenario: Scenario,
}

#[derive(Deserialize)]
#[serde(default)]
struct Scenario {
    /// Officers on foot, lined up west of the origin.
    officers:         usize,
    officer_spacing:  f32,
    /// Where the suspect starts, metres east of the origin.
    suspect_distance: f32,
    /// Metres per second while fleeing.
    suspect_speed:    f32,
    flee_secs:        f32,
    /// Seat the last officer in a car.
    patrol_car:       bool,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            officers:         4,
            officer_spacing:  12.0,
            suspect_distance: 45.0,
            suspect_speed:    4.5,
            flee_secs:        15.0,
            patrol_car:       true,
        }
    }
}

impl DemoConfig {
    fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

fn officer_id(i: usize) -> AgentId {
    AgentId(1 + i as u32)
}

fn build_world(s: &Scenario) -> Result<SandboxWorld> {
    let mut world = SandboxWorld::new();
    for i in 0..s.officers {
        world.add_agent(officer_id(i), Vec3::new(-(i as f32) * s.officer_spacing, 0.0, 0.0))?;
    }
    world.add_agent(SUSPECT, Vec3::new(s.suspect_distance, 0.0, 0.0))?;

    if s.patrol_car && s.officers > 0 {
        let driver = officer_id(s.officers - 1);
        let parked = world.position(driver).unwrap_or_default();
        world.add_vehicle(PATROL_CAR, TravelMode::Car, parked)?;
        world.seat(driver, PATROL_CAR)?;
    }
    Ok(world)
}

// ── Observer ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ChaseLog {
    ticks:    u64,
    released: usize,
    closed:   Vec<(ControllerId, AgentId, Tick)>,
}

impl SimObserver<SandboxWorld> for ChaseLog {
    fn on_tick_end(&mut self, _tick: Tick, summary: &TickSummary) {
        self.ticks += 1;
        self.released += summary.released;
    }

    fn on_pursuit_ended(&mut self, tick: Tick, pursuit: ControllerId, suspect: AgentId) {
        info!(%tick, %pursuit, %suspect, "pursuit closed");
        self.closed.push((pursuit, suspect, tick));
    }

    fn on_snapshot(&mut self, tick: Tick, env: &Blackboard<SandboxWorld>) {
        let Some(target) = env.resources.get(SUSPECT) else { return };
        let counts = target.counters().counts();
        let suspect_x = env.world.position(SUSPECT).map_or(0.0, |p| p.x);
        info!(
            %tick,
            chasing  = counts.chasing,
            on_foot  = counts.chasing_on_foot,
            tasing   = counts.tasing,
            visual   = counts.visual,
            searching = counts.searching_on_foot + counts.searching_in_vehicle,
            suspect_x,
            "snapshot"
        );
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => DemoConfig::load(Path::new(&path))?,
        None => DemoConfig::default(),
    };
    let scenario = &config.scenario;

    println!("=== street_chase ===");
    println!(
        "Officers: {}  |  Ticks: {} x {} ms  |  Seed: {}",
        scenario.officers, config.sim.total_ticks, config.sim.tick_duration_ms, config.sim.seed
    );
    println!();

    // 1. World and suspect movement.
    let world = build_world(scenario)?;
    let speed = scenario.suspect_speed;
    let flee_secs = scenario.flee_secs;
    let mut elapsed = 0.0_f32;
    let host_step = move |w: &mut SandboxWorld, dt: f32| {
        elapsed += dt;
        let fleeing = elapsed <= flee_secs && !w.suspect_status(SUSPECT).surrendering;
        if let Some(p) = w.position(SUSPECT).filter(|_| fleeing) {
            // The suspect is always present here; ignore a failed move.
            let _ = w.set_position(SUSPECT, p + Vec3::X * speed * dt);
        }
        w.step(dt);
    };

    // 2. Simulation.
    let snapshot_ticks = (SNAPSHOT_SECS * 1_000 / u64::from(config.sim.tick_duration_ms.max(1))).max(1);
    let mut sim = SimBuilder::new(config.sim.clone(), world)
        .pursuit_config(config.pursuit)
        .officers((0..scenario.officers).map(officer_id))
        .with_patrol()
        .snapshot_interval(snapshot_ticks)
        .host_step(host_step)
        .build()?;
    let events = sim.env.bus.subscribe(Topic::All);

    // 3. Open the pursuit and call for backup.
    let pursuit = sim.start_pursuit(SUSPECT, ActionPriority::RequiredByScript)?;
    let joined = sim.dispatch(pursuit, DISPATCH_RADIUS, scenario.officers)?;
    println!("Pursuit {pursuit}: {} officers dispatched", joined.len());

    // 4. Run.
    let mut log = ChaseLog::default();
    let t0 = Instant::now();
    sim.run(&mut log)?;
    let elapsed_wall = t0.elapsed();

    // 5. Summary.
    let status = sim.env.world.suspect_status(SUSPECT);
    let world = &sim.env.world;
    let count = |pred: fn(&WorldCommand) -> bool| world.commands().iter().filter(|c| pred(c)).count();

    println!();
    println!("=== Results ===");
    println!("  Ticks run:         {}", log.ticks);
    println!("  Wall time:         {:.3} s", elapsed_wall.as_secs_f64());
    println!("  Suspect arrested:  {}", status.arrested);
    println!("  Officers released: {}", log.released);
    for (id, suspect, tick) in &log.closed {
        println!("  Pursuit {id} on {suspect} closed at {tick}");
    }
    println!("  Follow orders:     {}", count(|c| matches!(c, WorldCommand::Follow { .. })));
    println!("  Taser shots:       {}", count(|c| matches!(c, WorldCommand::FireTaser { .. })));
    println!("  Cuffings:          {}", count(|c| matches!(c, WorldCommand::Cuff { .. })));
    println!("  Lines spoken:      {}", count(|c| matches!(c, WorldCommand::Say { .. })));

    println!();
    println!("=== Events ===");
    for event in events.drain() {
        match event {
            PursuitEvent::CriminalFleeing { position, .. } => println!("  fleeing from {position}"),
            PursuitEvent::PedBeingArrested { officer, .. } => println!("  {officer} is cuffing"),
            PursuitEvent::PedArrested { officer, .. } => println!("  arrested by {officer}"),
            PursuitEvent::PedSurrendered { .. } => println!("  surrendered"),
            PursuitEvent::VisualLost { last_known, .. } => println!("  lost near {last_known}"),
            PursuitEvent::VehicleRequested { officer, .. } => println!("  {officer} asked for a car"),
        }
    }
    Ok(())
}
