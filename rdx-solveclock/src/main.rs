use anyhow::Result;
use solveclock::prelude::*;
use solveclock::time::ManualClock;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Simulated solve times, in centiseconds, fed to the manual clock in turn.
const SCRIPTED_TIMES: [u64; 5] = [1234, 987, 1502, 6550, 1111];
const TICKS_PER_SOLVE: u64 = 4;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // 2. Load the round from a config file, or fall back to a built-in one.
    let config = match std::env::args().nth(1) {
        Some(path) => SolveclockConfig::load(Some(Path::new(&path)))?,
        None => demo_config(),
    };

    // 3. Create the engine over a clock we move by hand.
    let clock = Arc::new(ManualClock::new());
    let engine = SolveclockEngine::new(config, clock.clone(), None);

    // 4. Log everything that crosses the bus.
    spawn_event_listeners(&engine);

    // 5. Time every scramble of every competition event.
    let event_ids: Vec<CompetitionEventId> =
        engine.book().events().iter().map(|event| event.id).collect();
    let mut script = SCRIPTED_TIMES.iter().cycle();
    for event_id in event_ids {
        if let Advance::Exhausted = engine.begin_round(event_id) {
            warn!("[ROUND] => {} has nothing left to time.", event_id);
            continue;
        }
        while engine.timer().state() == RunState::Idle {
            let Some(&centis) = script.next() else { break };
            solve(&engine, &clock, centis);
        }
    }

    // 6. Summarize the cards.
    for card in engine.cards().cards() {
        info!(
            "[CARD] => {} #{}: {}",
            card.competition_event_id,
            card.index + 1,
            card.time_text.as_deref().unwrap_or("-")
        );
    }
    tokio::task::yield_now().await;
    Ok(())
}

/// Runs one scripted solve: start, a few interval ticks, stop.
fn solve(engine: &SolveclockEngine, clock: &ManualClock, centis: u64) {
    engine.timer().start();
    for _ in 0..TICKS_PER_SOLVE {
        clock.advance_centis(centis / TICKS_PER_SOLVE);
        engine.timer().tick();
    }
    clock.advance_centis(centis % TICKS_PER_SOLVE);
    engine.timer().stop();
}

/// Subscribes loggers to the diagnostics stream and to every event kind.
fn spawn_event_listeners(engine: &SolveclockEngine) {
    let mut system_rx = engine.bus().subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            debug!("[SYSTEM] => {:?}", event);
        }
    });

    for kind in EventKind::ALL {
        engine.bus().register(kind, move |event| match event {
            TimerEvent::Interval { display: shown, .. } => debug!("[{}] => {}", kind, shown),
            TimerEvent::Stopped(payload) => {
                info!("[{}] => {} in {}", kind, payload.scramble_id, payload.display)
            }
            TimerEvent::ScrambleAttached { scramble } => {
                info!("[{}] => #{} {}", kind, scramble.index + 1, scramble.text)
            }
            other => info!("[{}] => {:?}", kind, other),
        });
    }
}

fn demo_config() -> SolveclockConfig {
    let scrambles = [
        "R U R' U' R' F R2 U' R' U' R U R' F'",
        "F2 D' L2 U R2 B2 D2 F' U' L' R2",
        "B' U2 R2 F2 D' B2 U L2 B' L D2",
    ];
    let event_id = CompetitionEventId(1);
    SolveclockConfig {
        competition_events: vec![CompetitionEvent {
            id: event_id,
            name: "3x3x3 Cube".to_string(),
            scrambles: scrambles
                .iter()
                .enumerate()
                .map(|(index, text)| Scramble {
                    id: ScrambleId(index as u64 + 1),
                    competition_event_id: event_id,
                    index: index as u32,
                    text: text.to_string(),
                    complete: false,
                })
                .collect(),
        }],
        ..Default::default()
    }
}
