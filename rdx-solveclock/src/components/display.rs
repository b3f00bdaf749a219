//! Projects timer and scramble events onto a visible surface.
//!
//! Both sync managers keep nothing but the last view they produced. The view
//! is plain data; drawing it is the job of a [`Surface`], which is optional so
//! the projections can be exercised without any rendering at all.

use crate::bus::EventBus;
use crate::common::{ListenerId, ScrambleId};
use crate::events::{EventKind, TimerEvent};
use crate::time::TimeDisplay;
use parking_lot::RwLock;
use std::sync::Arc;

/// Something that can draw views, e.g. a terminal or a window.
pub trait Surface: Send + Sync {
    fn render_timer(&self, _view: &TimerView) {}
    fn render_scramble(&self, _view: &ScrambleView) {}
}

/// What the timer face is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    /// Zeroed and bound to a scramble, waiting for the solver.
    Ready,
    Running,
    /// Showing a final time.
    Finished,
    /// Zeroed because there is nothing left to time.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerView {
    pub seconds: String,
    pub centiseconds: String,
    pub phase: TimerPhase,
}

impl TimerView {
    fn zeroed(phase: TimerPhase) -> Self {
        Self {
            seconds: "0".to_string(),
            centiseconds: "00".to_string(),
            phase,
        }
    }

    fn showing(display: &TimeDisplay, phase: TimerPhase) -> Self {
        Self {
            seconds: display.whole_text(),
            centiseconds: display.fraction_text(),
            phase,
        }
    }

    pub fn text(&self) -> String {
        format!("{}.{}", self.seconds, self.centiseconds)
    }
}

/// What the scramble panel is currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrambleView {
    Waiting,
    Showing {
        scramble_id: ScrambleId,
        index: u32,
        text: String,
    },
    Exhausted,
}

struct Projection<V> {
    bus: EventBus,
    view: Arc<RwLock<V>>,
    listeners: Vec<(EventKind, ListenerId)>,
}

impl<V: Clone + Send + Sync + 'static> Projection<V> {
    fn follow(
        bus: EventBus,
        initial: V,
        kinds: &[EventKind],
        surface: Option<Arc<dyn Surface>>,
        project: fn(&V, &TimerEvent) -> Option<V>,
        render: fn(&dyn Surface, &V),
    ) -> Self {
        let view = Arc::new(RwLock::new(initial));
        let listeners = kinds
            .iter()
            .map(|&kind| {
                let view = Arc::clone(&view);
                let surface = surface.clone();
                let id = bus.register(kind, move |event| {
                    let Some(next) = project(&view.read(), event) else {
                        return;
                    };
                    *view.write() = next.clone();
                    if let Some(surface) = &surface {
                        render(surface.as_ref(), &next);
                    }
                });
                (kind, id)
            })
            .collect();
        Self {
            bus,
            view,
            listeners,
        }
    }

    fn view(&self) -> V {
        self.view.read().clone()
    }

    fn detach(&self) {
        for (kind, id) in &self.listeners {
            self.bus.unregister(*kind, *id);
        }
    }
}

/// Mirrors the running time onto the timer face.
pub struct TimerDisplaySync {
    projection: Projection<TimerView>,
}

impl TimerDisplaySync {
    pub fn new(bus: EventBus, surface: Option<Arc<dyn Surface>>) -> Self {
        let projection = Projection::follow(
            bus,
            TimerView::zeroed(TimerPhase::Ready),
            &[
                EventKind::Started,
                EventKind::Interval,
                EventKind::Stopped,
                EventKind::ScrambleAttached,
                EventKind::NothingToAttach,
            ],
            surface,
            project_timer,
            |surface, view| surface.render_timer(view),
        );
        Self { projection }
    }

    /// The last rendered view.
    pub fn view(&self) -> TimerView {
        self.projection.view()
    }

    pub fn detach(&self) {
        self.projection.detach();
    }
}

fn project_timer(current: &TimerView, event: &TimerEvent) -> Option<TimerView> {
    match event {
        // An exhausted round stays zeroed until the next scramble is attached.
        TimerEvent::Stopped(_) if current.phase == TimerPhase::Exhausted => None,
        TimerEvent::Started { .. } => Some(TimerView::zeroed(TimerPhase::Running)),
        // A tick sampled before a concurrent stop may arrive after it.
        TimerEvent::Interval { display, .. } if current.phase == TimerPhase::Running => {
            Some(TimerView::showing(display, TimerPhase::Running))
        }
        TimerEvent::Interval { .. } => None,
        TimerEvent::Stopped(payload) => {
            Some(TimerView::showing(&payload.display, TimerPhase::Finished))
        }
        TimerEvent::ScrambleAttached { .. } => Some(TimerView::zeroed(TimerPhase::Ready)),
        TimerEvent::NothingToAttach { .. } => Some(TimerView::zeroed(TimerPhase::Exhausted)),
        TimerEvent::SolveRecorded(_) => None,
    }
}

/// Shows the scramble the timer is bound to.
pub struct ScrambleDisplaySync {
    projection: Projection<ScrambleView>,
}

impl ScrambleDisplaySync {
    pub fn new(bus: EventBus, surface: Option<Arc<dyn Surface>>) -> Self {
        let projection = Projection::follow(
            bus,
            ScrambleView::Waiting,
            &[EventKind::ScrambleAttached, EventKind::NothingToAttach],
            surface,
            project_scramble,
            |surface, view| surface.render_scramble(view),
        );
        Self { projection }
    }

    pub fn view(&self) -> ScrambleView {
        self.projection.view()
    }

    pub fn detach(&self) {
        self.projection.detach();
    }
}

fn project_scramble(_current: &ScrambleView, event: &TimerEvent) -> Option<ScrambleView> {
    match event {
        TimerEvent::ScrambleAttached { scramble } => Some(ScrambleView::Showing {
            scramble_id: scramble.id,
            index: scramble.index,
            text: scramble.text.clone(),
        }),
        TimerEvent::NothingToAttach { .. } => Some(ScrambleView::Exhausted),
        _ => None,
    }
}
