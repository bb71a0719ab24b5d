use std::path::PathBuf;

use anyhow::{bail, Context};
use sentinel::kernel::perception::{Observation, SelfPose, Vec3};
use sentinel::kernel::reactor::Event;
use sentinel::kernel::scheduler::LogActuator;
use sentinel::{AgentId, KernelConfig, Reactor};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging/tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    tracing::info!("Sentinel Kernel Booting...");

    let config = match config_path()? {
        Some(path) => KernelConfig::from_file(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => KernelConfig::default(),
    };
    let tick_ms = config.driver.tick_ms;

    let (tx, mut reactor) = Reactor::channel(config);
    reactor.set_pose(SelfPose {
        position: Vec3::ZERO,
        forward: Vec3::new(1.0, 0.0, 0.0),
    });

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, stopping");
            on_signal.cancel();
        }
    });

    let source = tokio::spawn(scripted_source(tx, tick_ms));

    let mut actuator = LogActuator::default();
    reactor.run(&mut actuator, cancel).await;
    source.abort();

    let snap = reactor.telemetry.snapshot();
    tracing::info!(
        transitions = snap.transition_stats.total,
        retreats = snap.transition_stats.into_retreat,
        approaches = snap.transition_stats.into_approach,
        departed = snap.agent_stats.departed,
        commands = actuator.issued,
        remembered = reactor.memory.len(),
        "Scenario finished"
    );
    Ok(())
}

fn config_path() -> anyhow::Result<Option<PathBuf>> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None => Ok(None),
        Some("--config") => match args.next() {
            Some(path) => Ok(Some(PathBuf::from(path))),
            None => bail!("--config requires a path"),
        },
        Some(other) => bail!("unknown argument '{other}' (usage: sentinel [--config <file.json>])"),
    }
}

/// Stands in for the host's sensing: a passer-by, a charging stranger,
/// then a friendly visitor who lingers.
async fn scripted_source(tx: mpsc::Sender<Event>, tick_ms: u64) {
    let dt = tick_ms as f32 / 1000.0;
    let mut cadence = interval(Duration::from_millis(tick_ms));
    cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let passer_by = AgentId::new();
    let stranger = AgentId::new();
    let visitor = AgentId::new();

    let mut stranger_x = 10.0_f32;
    let mut visitor_x = 6.0_f32;

    for frame in 0..150u32 {
        cadence.tick().await;
        let mut batch: Vec<Event> = Vec::with_capacity(2);

        if frame < 40 {
            batch.push(Event::Observed(Observation {
                agent: passer_by,
                position: Vec3::new(6.0, 0.0, -4.0 + frame as f32 * 0.2),
                velocity: Vec3::new(0.0, 0.0, 2.0),
                gaze: Vec3::new(0.0, 0.0, 1.0),
            }));
        } else if frame == 40 {
            batch.push(Event::Departed(passer_by));
        }

        if (30..70).contains(&frame) {
            stranger_x = (stranger_x - 4.0 * dt).max(0.8);
            batch.push(Event::Observed(Observation {
                agent: stranger,
                position: Vec3::new(stranger_x, 0.0, 0.0),
                velocity: Vec3::new(-4.0, 0.0, 0.0),
                gaze: Vec3::new(-1.0, 0.0, 0.0),
            }));
        } else if frame == 70 {
            batch.push(Event::Departed(stranger));
        }

        if frame >= 80 {
            let speed = if visitor_x > 3.5 { 0.5 } else { 0.0 };
            visitor_x = (visitor_x - speed * dt).max(3.5);
            batch.push(Event::Observed(Observation {
                agent: visitor,
                position: Vec3::new(visitor_x, 0.0, 0.0),
                velocity: Vec3::new(-speed, 0.0, 0.0),
                gaze: Vec3::new(-1.0, 0.0, 0.0),
            }));
        }

        for event in batch {
            if tx.send(event).await.is_err() {
                return;
            }
        }
    }
    // Dropping the sender ends the driver loop.
}
