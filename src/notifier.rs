use std::fmt;
use std::time::{Duration, Instant};

pub const AUTO_CLEAR_DELAY: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LoadFailure,
}

impl ErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::LoadFailure => "Unable to load todos",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierState {
    Idle,
    Showing(ErrorKind),
}

#[derive(Debug, Clone, Copy)]
struct Notice {
    kind: ErrorKind,
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    generation: u64,
    fires_at: Instant,
}

/// Transient error banner state.
///
/// Every `notify` bumps a generation and arms a timer tagged with it. A timer
/// only clears the notice it was armed for, so an older timer firing after a
/// newer `notify` (or after `dismiss`) changes nothing.
#[derive(Debug, Default)]
pub struct Notifier {
    current: Option<Notice>,
    generation: u64,
    timers: Vec<Timer>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&mut self, kind: ErrorKind, now: Instant) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        self.current = Some(Notice { kind, generation });
        self.timers.push(Timer {
            generation,
            fires_at: now + AUTO_CLEAR_DELAY,
        });
        tracing::debug!(%kind, generation, "error notice shown");
        generation
    }

    pub fn dismiss(&mut self) {
        if let Some(notice) = self.current.take() {
            tracing::debug!(generation = notice.generation, "error notice dismissed");
        }
        // Nothing is showing, so no armed timer can change state any more.
        self.timers.clear();
    }

    /// Runs every timer due at `now`. Returns true if the visible state changed.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        let mut changed = false;
        let mut pending = Vec::with_capacity(self.timers.len());
        for timer in self.timers.drain(..) {
            if timer.fires_at > now {
                pending.push(timer);
                continue;
            }
            if let Some(notice) = self.current {
                if notice.generation == timer.generation {
                    self.current = None;
                    changed = true;
                    tracing::debug!(generation = timer.generation, "error notice expired");
                }
            }
        }
        self.timers = pending;
        changed
    }

    pub fn state(&self) -> NotifierState {
        match self.current {
            Some(notice) => NotifierState::Showing(notice.kind),
            None => NotifierState::Idle,
        }
    }

    pub fn message(&self) -> Option<&'static str> {
        match self.state() {
            NotifierState::Showing(kind) => Some(kind.message()),
            NotifierState::Idle => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.fires_at).min()
    }
}
