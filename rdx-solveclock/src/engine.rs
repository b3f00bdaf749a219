//! The engine that assembles a complete timing session.

use crate::bus::EventBus;
use crate::common::CompetitionEventId;
use crate::components::advancement::{Advance, ScrambleAdvancementManager};
use crate::components::display::{ScrambleDisplaySync, Surface, TimerDisplaySync};
use crate::components::recorder::SolveRecorder;
use crate::components::solve_card::SolveCardSyncManager;
use crate::components::timer::TimerController;
use crate::config::SolveclockConfig;
use crate::scramble::ScrambleBook;
use crate::time::Clock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// The main Solveclock engine.
///
/// Builds one bus and hands a clone of it to every component, so nothing is
/// looked up globally. Components are created in a fixed order, and that is
/// also the order their listeners run in: the solve card manager first, then
/// the recorder, the advancement manager, and the two displays last so that a
/// finished time stays on the timer face after the next scramble is attached.
pub struct SolveclockEngine {
    config: Arc<SolveclockConfig>,
    bus: EventBus,
    timer: TimerController,
    book: ScrambleBook,
    cards: SolveCardSyncManager,
    recorder: SolveRecorder,
    advancement: ScrambleAdvancementManager,
    timer_display: TimerDisplaySync,
    scramble_display: ScrambleDisplaySync,
}

impl SolveclockEngine {
    /// Creates an engine over the competition events in `config`.
    pub fn new(
        config: SolveclockConfig,
        clock: Arc<dyn Clock>,
        surface: Option<Arc<dyn Surface>>,
    ) -> Self {
        let bus = EventBus::new();
        let book = ScrambleBook::from_events(config.competition_events.iter().cloned());
        let timer = TimerController::new(bus.clone(), clock);

        let cards = SolveCardSyncManager::new(bus.clone(), book.scrambles());
        let recorder = SolveRecorder::new(bus.clone(), Arc::new(book.clone()));
        let advancement = ScrambleAdvancementManager::new(
            bus.clone(),
            timer.clone(),
            Arc::new(book.clone()),
            config.advance_on,
        );
        let timer_display = TimerDisplaySync::new(bus.clone(), surface.clone());
        let scramble_display = ScrambleDisplaySync::new(bus.clone(), surface);

        info!(
            events = config.competition_events.len(),
            advance_on = ?config.advance_on,
            "SolveclockEngine assembled."
        );
        Self {
            config: Arc::new(config),
            bus,
            timer,
            book,
            cards,
            recorder,
            advancement,
            timer_display,
            scramble_display,
        }
    }

    /// Attaches the timer to the first incomplete scramble of a competition event.
    pub fn begin_round(&self, competition_event_id: CompetitionEventId) -> Advance {
        self.advancement.attach_first(competition_event_id)
    }

    /// Drives interval ticks at the configured resolution until `shutdown_rx` fires.
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let period = self.config.resolution.interval();
        info!(resolution = ?self.config.resolution, ?period, "SolveclockEngine running.");
        let driver = tokio::spawn(self.timer.clone().run_interval_driver(period, shutdown_rx));
        driver.await?;
        info!("SolveclockEngine has shut down.");
        Ok(())
    }

    pub fn config(&self) -> &SolveclockConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn timer(&self) -> &TimerController {
        &self.timer
    }

    pub fn book(&self) -> &ScrambleBook {
        &self.book
    }

    pub fn cards(&self) -> &SolveCardSyncManager {
        &self.cards
    }

    pub fn recorder(&self) -> &SolveRecorder {
        &self.recorder
    }

    pub fn advancement(&self) -> &ScrambleAdvancementManager {
        &self.advancement
    }

    pub fn timer_display(&self) -> &TimerDisplaySync {
        &self.timer_display
    }

    pub fn scramble_display(&self) -> &ScrambleDisplaySync {
        &self.scramble_display
    }
}
