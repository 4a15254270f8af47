use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::{GameEngine, GameEvent};
use crate::rng::RandomSource;
use crate::types::{Direction, GameSummary, PointerInput, Snapshot};

pub const COMMAND_QUEUE_CAPACITY: usize = 64;
pub const UPDATE_QUEUE_CAPACITY: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SessionCommand {
    Direction(Direction),
    Pointer(PointerInput),
    Reset,
    Shutdown,
}

#[derive(Clone, Debug)]
pub enum SessionUpdate {
    State(Snapshot),
    GameOver(GameSummary),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("game session has stopped")]
    Closed,
}

/// Caller side of a running session.
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub async fn direction(&self, dir: Direction) -> Result<(), SessionError> {
        self.send(SessionCommand::Direction(dir)).await
    }

    pub async fn pointer(&self, input: PointerInput) -> Result<(), SessionError> {
        self.send(SessionCommand::Pointer(input)).await
    }

    pub async fn reset(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Reset).await
    }

    /// Stops the loop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.tx.send(SessionCommand::Shutdown).await;
        let _ = self.task.await;
    }

    /// Resolves once the session loop has exited.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

/// Owns one engine and serialises every event into it: commands from the
/// handle and frame ticks from a timer. After each handled event a state
/// snapshot is published.
pub struct GameSession<R: RandomSource> {
    engine: GameEngine<R>,
    frame_ms: u64,
    updates: mpsc::Sender<SessionUpdate>,
    game_over_sent: bool,
}

impl<R: RandomSource + Send + 'static> GameSession<R> {
    pub fn spawn(
        engine: GameEngine<R>,
        frame_ms: u64,
    ) -> (SessionHandle, mpsc::Receiver<SessionUpdate>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (update_tx, update_rx) = mpsc::channel(UPDATE_QUEUE_CAPACITY);
        let session = Self {
            engine,
            frame_ms: frame_ms.max(1),
            updates: update_tx,
            game_over_sent: false,
        };
        let task = tokio::spawn(session.run(command_rx));
        (
            SessionHandle {
                tx: command_tx,
                task,
            },
            update_rx,
        )
    }

    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        log::debug!(
            "session started: mode={} frame_ms={}",
            self.engine.mode().key(),
            self.frame_ms
        );
        let mut interval = tokio::time::interval(Duration::from_millis(self.frame_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        if !self.publish().await {
            return;
        }

        loop {
            let running = !self.engine.is_over();
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        None | Some(SessionCommand::Shutdown) => break,
                        Some(SessionCommand::Direction(dir)) => {
                            self.engine.apply(GameEvent::Direction(dir));
                        }
                        Some(SessionCommand::Pointer(input)) => {
                            self.engine.apply(GameEvent::Pointer(input));
                        }
                        Some(SessionCommand::Reset) => {
                            self.engine.apply(GameEvent::Reset);
                            self.game_over_sent = false;
                            interval.reset();
                        }
                    }
                }
                _ = interval.tick(), if running => {
                    self.engine.advance(self.frame_ms);
                }
            }

            if !self.publish().await {
                break;
            }
        }
        log::debug!("session stopped: mode={}", self.engine.mode().key());
    }

    /// Returns false once nobody is listening any more.
    async fn publish(&mut self) -> bool {
        let snapshot = self.engine.build_snapshot(true);
        match self.updates.try_send(SessionUpdate::State(snapshot)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::trace!("update queue full, state frame dropped"),
            Err(TrySendError::Closed(_)) => return false,
        }

        if self.engine.is_over() && !self.game_over_sent {
            if let Some(summary) = self.engine.build_summary() {
                self.game_over_sent = true;
                if self
                    .updates
                    .send(SessionUpdate::GameOver(summary))
                    .await
                    .is_err()
                {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::constants::TICK_MS;
    use crate::types::{GameMode, GameOverReason, GameStatus, Position, Vec2};

    fn corridor_config() -> GameConfig {
        GameConfig {
            layout: vec!["####".to_string(), "#P #".to_string(), "####".to_string()],
            width: 4,
            height: 3,
            initial_lives: 1,
            ghost_starts: vec![Vec2::new(2, 1)],
            ..GameConfig::for_mode(GameMode::MazeGhosts)
        }
    }

    async fn next_state(rx: &mut mpsc::Receiver<SessionUpdate>) -> Snapshot {
        loop {
            match rx.recv().await.expect("session is alive") {
                SessionUpdate::State(snapshot) => return snapshot,
                SessionUpdate::GameOver(_) => {}
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn direction_command_moves_player() {
        let engine = GameEngine::new(GameConfig::for_mode(GameMode::Maze), 1).expect("valid");
        let (handle, mut rx) = GameSession::spawn(engine, TICK_MS);

        let first = next_state(&mut rx).await;
        assert_eq!(first.player, Position::Cell(Vec2::new(1, 1)));

        handle.direction(Direction::Right).await.expect("session is alive");
        loop {
            let snapshot = next_state(&mut rx).await;
            if snapshot.score == 10 {
                assert_eq!(snapshot.player, Position::Cell(Vec2::new(2, 1)));
                break;
            }
        }
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn game_over_is_reported_once_and_reset_resumes() {
        let engine = GameEngine::new(corridor_config(), 1).expect("valid");
        let (handle, mut rx) = GameSession::spawn(engine, TICK_MS);

        let summary = loop {
            if let SessionUpdate::GameOver(summary) = rx.recv().await.expect("session is alive") {
                break summary;
            }
        };
        assert_eq!(summary.reason, GameOverReason::OutOfLives);
        assert_eq!(summary.lives_lost, 1);

        handle.reset().await.expect("session is alive");
        loop {
            match rx.recv().await.expect("session is alive") {
                SessionUpdate::State(snapshot) if snapshot.status == GameStatus::Playing => {
                    assert_eq!(snapshot.lives, 1);
                    break;
                }
                SessionUpdate::State(_) => {}
                SessionUpdate::GameOver(_) => panic!("stale game over after reset"),
            }
        }
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_update_stream() {
        let engine = GameEngine::new(GameConfig::for_mode(GameMode::Falling), 9).expect("valid");
        let (handle, mut rx) = GameSession::spawn(engine, TICK_MS);
        handle.shutdown().await;
        while rx.recv().await.is_some() {}
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_receiver_stops_session() {
        let engine = GameEngine::new(GameConfig::for_mode(GameMode::MazeGhosts), 4).expect("valid");
        let (handle, rx) = GameSession::spawn(engine, TICK_MS);
        drop(rx);
        handle.closed().await;
        assert!(matches!(handle.reset().await, Err(SessionError::Closed)));
    }
}
