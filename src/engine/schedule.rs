use crate::config::GameConfig;
use crate::types::GameMode;

// A timer that lags further behind than this many periods skips the excess.
const MAX_BACKLOG_PERIODS: u64 = 64;

/// Periodic activity driven by the scheduler. The declaration order breaks
/// ties between ticks that fall due at the same instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TickKind {
    Spawn,
    Physics,
    Ghost,
}

#[derive(Clone, Copy, Debug)]
struct Timer {
    kind: TickKind,
    period_ms: u64,
    due_at_ms: u64,
}

#[derive(Clone, Debug, Default)]
pub(super) struct TickSchedule {
    timers: Vec<Timer>,
}

impl TickSchedule {
    pub(super) fn arm(&mut self, config: &GameConfig, now_ms: u64) {
        let periods = match config.mode {
            GameMode::Maze => Vec::new(),
            GameMode::MazeGhosts => vec![(TickKind::Ghost, config.ghost_tick_ms)],
            GameMode::Falling => vec![
                (TickKind::Spawn, config.falling.spawn_tick_ms),
                (TickKind::Physics, config.falling.physics_tick_ms),
            ],
        };
        self.timers = periods
            .into_iter()
            .filter(|(_, period_ms)| *period_ms > 0)
            .map(|(kind, period_ms)| Timer {
                kind,
                period_ms,
                due_at_ms: now_ms.saturating_add(period_ms),
            })
            .collect();
    }

    pub(super) fn disarm(&mut self) {
        self.timers.clear();
    }

    pub(super) fn is_armed(&self) -> bool {
        !self.timers.is_empty()
    }

    /// Pops the earliest tick due at or before `now_ms` and reschedules it.
    pub(super) fn pop_due(&mut self, now_ms: u64) -> Option<TickKind> {
        for timer in &mut self.timers {
            let max_lag = timer.period_ms.saturating_mul(MAX_BACKLOG_PERIODS);
            if now_ms.saturating_sub(timer.due_at_ms) > max_lag {
                log::warn!(
                    "{:?} tick fell {}ms behind; skipping missed periods",
                    timer.kind,
                    now_ms - timer.due_at_ms
                );
                timer.due_at_ms = now_ms - max_lag;
            }
        }

        let (idx, timer) = self
            .timers
            .iter_mut()
            .enumerate()
            .filter(|(_, timer)| timer.due_at_ms <= now_ms)
            .min_by_key(|(_, timer)| (timer.due_at_ms, timer.kind))?;
        let kind = timer.kind;
        match timer.due_at_ms.checked_add(timer.period_ms) {
            Some(next) => timer.due_at_ms = next,
            None => {
                // The clock cannot move past u64::MAX, so this timer is spent.
                self.timers.remove(idx);
            }
        }
        Some(kind)
    }
}
