use anyhow::Result;
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use solveclock::prelude::*;
use solveclock::{ENGINE_NAME, VERSION as LIB_VERSION};
use std::borrow::Cow;
use std::env;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct MyHighlighter;

impl Highlighter for MyHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            let colored_command = command.yellow().bold();
            let colored_rest = rest.yellow();
            Cow::Owned(format!("{} {}", colored_command, colored_rest))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

/// Draws the timer face and scramble panel straight to the terminal.
///
/// Running times are only printed while `watching` is set; finished times and
/// scramble changes always are.
struct TerminalSurface {
    watching: Arc<AtomicBool>,
}

impl Surface for TerminalSurface {
    fn render_timer(&self, view: &TimerView) {
        match view.phase {
            TimerPhase::Running if self.watching.load(Ordering::Relaxed) => {
                println!("<-- [TIMER] {}", view.text().dimmed());
            }
            TimerPhase::Finished => println!("<-- [TIMER] {}", view.text().green().bold()),
            TimerPhase::Exhausted => println!("<-- [TIMER] {}", view.text().dimmed()),
            _ => {}
        }
    }

    fn render_scramble(&self, view: &ScrambleView) {
        match view {
            ScrambleView::Showing { index, text, .. } => {
                println!("<-- [SCRAMBLE #{}] {}", index + 1, text.cyan())
            }
            ScrambleView::Exhausted => {
                println!("<-- [SCRAMBLE] {}", "all scrambles solved".dimmed())
            }
            ScrambleView::Waiting => {}
        }
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    println!("{}", ENGINE_NAME.cyan().bold());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    let license_blurb = "
    This software is provided 'as is', without warranty of any kind.
    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.
    ";

    println!("{}", "-".repeat(64).dimmed());
    println!("{}", version_string);
    println!("{}", license_blurb.dimmed());
    println!("{}", "-".repeat(64).dimmed());
}

/// Prints diagnostics from the bus, e.g. a `start` typed while already running.
fn spawn_event_listeners(engine: &SolveclockEngine) {
    let mut system_rx = engine.bus().subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            if let SystemEvent::TransitionRejected { operation, state } = event {
                println!("<-- [IGNORED] {:?} while {}", operation, state);
            }
        }
    });
}

fn load_config() -> Result<SolveclockConfig> {
    let path = env::args().nth(1);
    let mut config = SolveclockConfig::load(path.as_deref().map(Path::new))?;
    if config.competition_events.is_empty() {
        config.competition_events.push(practice_event());
    }
    Ok(config)
}

/// A single practice event for running the shell without a config file.
fn practice_event() -> CompetitionEvent {
    let id = CompetitionEventId(1);
    let texts = [
        "R U R' U' R' F R2 U' R' U' R U R' F'",
        "F2 D' L2 U R2 B2 D2 F' U' L' R2",
        "B' U2 R2 F2 D' B2 U L2 B' L D2",
        "L2 F2 U' B2 D R2 U2 F' R D' B",
        "U F2 L2 D' R2 B2 U' L' F R' D2",
    ];
    CompetitionEvent {
        id,
        name: "3x3x3 Practice".to_string(),
        scrambles: texts
            .iter()
            .enumerate()
            .map(|(index, text)| Scramble {
                id: ScrambleId(index as u64 + 1),
                competition_event_id: id,
                index: index as u32,
                text: text.to_string(),
                complete: false,
            })
            .collect(),
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  events                - Lists competition events.");
    println!("  begin <EVENT>         - Attaches the first incomplete scramble of an event.");
    println!("  start                 - Starts the timer.");
    println!("  stop                  - Stops the timer and records the solve.");
    println!("  enter <TIME> [PEN]    - Records a typed time (12.34, 1:05.50, 10550).");
    println!("                          PEN is an optional +2 or dnf.");
    println!("  cards                 - Shows the solve cards.");
    println!("  scramble              - Shows the current scramble.");
    println!("  status                - Shows the timer state.");
    println!("  watch on|off          - Toggles printing of the running time.");
    println!("  exit                  - Quits the shell.");
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let config = load_config()?;
    let watching = Arc::new(AtomicBool::new(false));
    let surface = Arc::new(TerminalSurface {
        watching: watching.clone(),
    });
    let engine = Arc::new(SolveclockEngine::new(
        config,
        Arc::new(SystemClock::new()),
        Some(surface),
    ));
    spawn_event_listeners(&engine);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let runner = engine.clone();
    info!("Spawning {} in the background...", ENGINE_NAME.cyan());
    let driver = tokio::spawn(async move {
        if let Err(e) = runner.run(shutdown_rx).await {
            eprintln!("\nEngine stopped with an error: {}", e);
        }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut rl = Editor::new()?;
    rl.set_helper(Some(MyHighlighter));

    println!("{} is running. Type 'help' for commands or 'exit' to quit.", ENGINE_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let args = line.split_whitespace().collect::<Vec<_>>();
                let Some(command) = args.first() else {
                    continue;
                };
                match *command {
                    "events" => {
                        for event in engine.book().events() {
                            let left = event.scrambles.iter().filter(|s| !s.complete).count();
                            let total = event.scrambles.len();
                            let name = &event.name;
                            println!("  {} {} ({} of {} left)", event.id.0, name, left, total);
                        }
                    }
                    "begin" => match args.get(1).map(|s| s.parse::<u64>()) {
                        Some(Ok(id)) => {
                            let event_id = CompetitionEventId(id);
                            if engine.book().event(event_id).is_none() {
                                println!("Error: no competition event {}.", id);
                                continue;
                            }
                            let outcome = match engine.begin_round(event_id) {
                                Advance::Attached(_) => format!("Round started for {}.", event_id),
                                Advance::Exhausted => {
                                    format!("{} has nothing left to time.", event_id)
                                }
                                Advance::Rejected => {
                                    "Stop the timer before changing rounds.".to_string()
                                }
                            };
                            println!("--> {}", outcome);
                        }
                        Some(Err(_)) => println!("Error: event id must be a number."),
                        None => println!("Usage: begin <EVENT>"),
                    },
                    "start" => {
                        if engine.timer().start() {
                            println!("--> Timing {}...", "started".green());
                        }
                    }
                    "stop" => {
                        engine.timer().stop();
                    }
                    "enter" => {
                        let Some(text) = args.get(1) else {
                            println!("Usage: enter <TIME> [+2|dnf]");
                            continue;
                        };
                        let penalty = match args.get(2).copied().unwrap_or("").parse::<Penalty>() {
                            Ok(penalty) => penalty,
                            Err(e) => {
                                println!("Error: {}", e);
                                continue;
                            }
                        };
                        if engine.timer().state() == RunState::Running {
                            println!("Error: stop the timer before entering a time.");
                            continue;
                        }
                        let Some(binding) = engine.timer().binding() else {
                            println!("Error: no scramble attached. Try 'begin <EVENT>'.");
                            continue;
                        };
                        match engine.recorder().record_manual(
                            binding.scramble_id,
                            binding.competition_event_id,
                            text,
                            penalty,
                        ) {
                            Ok(record) => {
                                println!("--> Entered {}.", record.display_text().green())
                            }
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    "cards" => {
                        for card in engine.cards().cards() {
                            let marker = if card.active { ">" } else { " " };
                            let time = card.time_text.as_deref().unwrap_or("-");
                            let number = card.index + 1;
                            let event_id = card.competition_event_id;
                            println!("  {} {} #{:<3} {}", marker, event_id, number, time);
                        }
                    }
                    "scramble" => match engine.scramble_display().view() {
                        ScrambleView::Showing { index, text, .. } => {
                            println!("  #{} {}", index + 1, text.cyan())
                        }
                        ScrambleView::Exhausted => println!("  All scrambles solved."),
                        ScrambleView::Waiting => println!("  No scramble attached."),
                    },
                    "status" => {
                        let snapshot = engine.timer().snapshot();
                        let bound = snapshot
                            .binding
                            .map(|b| b.scramble_id.to_string())
                            .unwrap_or_else(|| "nothing".to_string());
                        println!(
                            "  {} on {} showing {}",
                            snapshot.state,
                            bound,
                            engine.timer_display().view().text()
                        );
                    }
                    "watch" => match args.get(1) {
                        Some(&"on") => {
                            watching.store(true, Ordering::Relaxed);
                            println!("--> Printing the running time.");
                        }
                        Some(&"off") => {
                            watching.store(false, Ordering::Relaxed);
                            println!("--> Stopped printing the running time.");
                        }
                        _ => println!("Usage: watch on|off"),
                    },
                    "help" => print_help(),
                    "exit" => break,
                    _ => println!("Unknown command: '{}'. Type 'help'.", line),
                }
            }
            Err(_) => {
                println!("Exiting solveshell...");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(());
    driver.await?;
    Ok(())
}
