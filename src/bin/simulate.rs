use anyhow::Context;
use clap::Parser;
use pacman_frame_server::config::{ConfigError, GameConfig};
use pacman_frame_server::engine::{Board, GameEngine};
use pacman_frame_server::rng::{RandomSource, Rng};
use pacman_frame_server::server_utils::normalize_seed;
use pacman_frame_server::types::{
    Direction, GameMode, GameOverReason, GameStatus, Outcome, PointerInput, Position, Snapshot,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_MAX_TICKS: u64 = 20 * 60 * 5;
const POINTER_JUMP_CHANCE: f32 = 0.1;
const FALLING_REACTION_CHANCE: f32 = 0.6;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// maze, maze_ghosts or falling; all three when omitted
    #[arg(long)]
    mode: Option<String>,
    #[arg(long)]
    seed: Option<i64>,
    #[arg(long, default_value_t = 1)]
    episodes: u32,
    #[arg(long)]
    max_ticks: Option<u64>,
    /// JSON file with GameConfig overrides
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    mode: GameMode,
    seed: u32,
    #[serde(rename = "maxTicks")]
    max_ticks: u64,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    mode: GameMode,
    seed: u32,
    reason: Option<GameOverReason>,
    outcome: Option<Outcome>,
    score: u32,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "dotsEaten")]
    dots_eaten: u32,
    #[serde(rename = "collectiblesCollected")]
    collectibles_collected: u32,
    #[serde(rename = "collectiblesMissed")]
    collectibles_missed: u32,
    #[serde(rename = "livesLost")]
    lives_lost: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenario_count: usize,
    anomaly_count: usize,
    average_duration_ms: u64,
    reason_counts: BTreeMap<&'static str, usize>,
    outcome_counts: BTreeMap<&'static str, usize>,
    best_scores: BTreeMap<&'static str, u32>,
    scenarios: Vec<ScenarioResultLine>,
    #[serde(skip)]
    total_duration_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredLogLine<'a> {
    timestamp_ms: u64,
    level: &'a str,
    event: &'a str,
    match_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let base_config = match cli.config.as_ref() {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("failed to load game config {}", path.display()))?,
        None => GameConfig::default(),
    };
    let scenarios = resolve_scenarios(&cli)?;
    let started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let log = RunLog {
        match_id: cli
            .match_id
            .clone()
            .unwrap_or_else(|| format!("sim-{seed_hint}-{started_at_ms}")),
    };
    let mut summary = RunSummary::new(log.match_id.clone(), started_at_ms);

    for scenario in scenarios {
        log.emit(
            "info",
            "scenario_started",
            Some(&scenario),
            None,
            json!({ "mode": scenario.mode, "maxTicks": scenario.max_ticks }),
        );
        let config = GameConfig {
            mode: scenario.mode,
            ..base_config.clone()
        };
        let run = run_scenario(&scenario, config)
            .with_context(|| format!("failed to start scenario {}", scenario.name))?;

        for anomaly in &run.anomaly_records {
            log.emit(
                "warn",
                "anomaly_detected",
                Some(&scenario),
                Some(anomaly.tick),
                json!({ "message": anomaly.message }),
            );
        }
        log.emit(
            "info",
            "scenario_finished",
            Some(&scenario),
            Some(run.finished_tick),
            json!({
                "reason": reason_key(run.result.reason),
                "outcome": outcome_key(run.result.outcome),
                "score": run.result.score,
                "durationMs": run.result.duration_ms,
                "anomalyCount": run.anomaly_records.len(),
            }),
        );
        println!(
            "{}",
            serde_json::to_string(&run.result).context("failed to encode scenario result")?
        );
        summary.record(run.result, run.anomaly_records.len());
    }
    summary.finished_at_ms = now_ms();

    let mut summary_out = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = summary.write_to(path) {
            log.emit(
                "error",
                "summary_write_failed",
                None,
                None,
                json!({ "path": path.to_string_lossy(), "error": format!("{error:#}") }),
            );
            std::process::exit(2);
        }
        summary_out = Some(path.to_string_lossy().to_string());
    }

    log.emit(
        "info",
        "run_finished",
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageDurationMs": summary.average_duration_ms,
            "reasonCounts": summary.reason_counts,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out,
        }),
    );

    if summary.anomaly_count > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_scenario(
    scenario: &Scenario,
    config: GameConfig,
) -> Result<ScenarioRunResult, ConfigError> {
    let frame_ms = config.frame_ms;
    let initial_lives = config.initial_lives;
    let mut engine = GameEngine::new(config, scenario.seed)?;
    let bounds = PlayBounds::from_engine(&engine);
    let mut bot = Rng::new(scenario.seed ^ 0x9e37_79b9);

    let mut anomalies = AnomalyLog::default();
    let mut previous = engine.build_snapshot(true);
    let mut last_tick = 0u64;

    while !engine.is_over() {
        drive_bot(&mut engine, &mut bot, &previous);
        engine.advance(frame_ms);
        let snapshot = engine.build_snapshot(true);
        last_tick = snapshot.tick;
        for message in collect_snapshot_anomalies(&previous, &snapshot, &bounds, initial_lives) {
            anomalies.push(snapshot.tick, message);
        }
        previous = snapshot;
        if last_tick >= scenario.max_ticks {
            break;
        }
    }

    let summary = engine.build_summary();
    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            mode: scenario.mode,
            seed: scenario.seed,
            reason: summary.as_ref().map(|summary| summary.reason),
            outcome: summary.as_ref().map(|summary| summary.outcome),
            score: engine.score(),
            duration_ms: summary
                .as_ref()
                .map(|summary| summary.duration_ms)
                .unwrap_or_else(|| engine.elapsed_ms()),
            dots_eaten: summary.as_ref().map(|s| s.dots_eaten).unwrap_or(0),
            collectibles_collected: summary.as_ref().map(|s| s.collectibles_collected).unwrap_or(0),
            collectibles_missed: summary.as_ref().map(|s| s.collectibles_missed).unwrap_or(0),
            lives_lost: summary.as_ref().map(|s| s.lives_lost).unwrap_or(0),
            anomalies: anomalies.messages,
        },
        anomaly_records: anomalies.records,
        finished_tick: last_tick,
    })
}

/// One input per frame: maze bots walk onto a random neighbouring dot and
/// sometimes tap a remaining dot; falling bots chase the nearest collectible.
fn drive_bot(engine: &mut GameEngine, bot: &mut Rng, previous: &Snapshot) {
    match engine.board() {
        Board::Maze(board) => {
            if !previous.dots.is_empty() && bot.bool(POINTER_JUMP_CHANCE) {
                let target = previous.dots[bot.pick_index(previous.dots.len())];
                let cell_size = engine.config().cell_size as f32;
                engine.on_pointer(PointerInput::Absolute {
                    x: (target.x as f32 + 0.5) * cell_size,
                    y: (target.y as f32 + 0.5) * cell_size,
                });
                return;
            }
            let player = board.player();
            let options = board.legal_neighbors(player);
            if options.is_empty() {
                let dir = Direction::ALL[bot.pick_index(Direction::ALL.len())];
                engine.on_direction(dir.delta().0, dir.delta().1);
            } else {
                let next = options[bot.pick_index(options.len())];
                engine.on_direction(next.x - player.x, next.y - player.y);
            }
        }
        Board::Falling(board) => {
            if !bot.bool(FALLING_REACTION_CHANCE) {
                return;
            }
            let player = board.player();
            let nearest = board.collectibles().iter().min_by(|a, b| {
                (a.pos.x - player.x)
                    .abs()
                    .total_cmp(&(b.pos.x - player.x).abs())
            });
            let Some(target_x) = nearest.map(|item| item.pos.x) else {
                return;
            };
            let dx = target_x - player.x;
            if dx.abs() > engine.config().falling.key_step {
                engine.on_direction(dx.signum() as i32, 0);
            } else {
                engine.on_pointer(PointerInput::Absolute {
                    x: target_x,
                    y: player.y,
                });
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct PlayBounds {
    width: i32,
    height: i32,
    board_size: f32,
}

impl PlayBounds {
    fn from_engine(engine: &GameEngine) -> Self {
        let init = engine.board_init();
        Self {
            width: init.width,
            height: init.height,
            board_size: init.board_size,
        }
    }

    fn contains(&self, position: Position) -> bool {
        match position {
            Position::Cell(cell) => {
                (0..self.width).contains(&cell.x) && (0..self.height).contains(&cell.y)
            }
            Position::Free(point) => {
                (0.0..=self.board_size).contains(&point.x)
                    && (0.0..=self.board_size).contains(&point.y)
            }
        }
    }
}

fn collect_snapshot_anomalies(
    previous: &Snapshot,
    snapshot: &Snapshot,
    bounds: &PlayBounds,
    initial_lives: u32,
) -> Vec<String> {
    let mut anomalies = Vec::new();
    if snapshot.score < previous.score {
        anomalies.push(format!(
            "score decreased: {} -> {}",
            previous.score, snapshot.score
        ));
    }
    if snapshot.lives > previous.lives || snapshot.lives > initial_lives {
        anomalies.push(format!(
            "lives increased: {} -> {}",
            previous.lives, snapshot.lives
        ));
    }
    if !bounds.contains(snapshot.player) {
        anomalies.push(format!("player out of bounds: {:?}", snapshot.player));
    }
    if previous.status == GameStatus::GameOver && snapshot.status == GameStatus::Playing {
        anomalies.push("game resumed without reset".to_string());
    }
    if snapshot.dots.len() > previous.dots.len() {
        anomalies.push(format!(
            "dot count increased: {} -> {}",
            previous.dots.len(),
            snapshot.dots.len()
        ));
    }
    for ghost in &snapshot.ghosts {
        if !(0..bounds.width).contains(&ghost.x) || !(0..bounds.height).contains(&ghost.y) {
            anomalies.push(format!("ghost out of bounds: {}", ghost.id));
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> anyhow::Result<Vec<Scenario>> {
    let seed = normalize_seed(cli.seed, now_ms() as u32);
    let modes = match cli.mode.as_deref() {
        Some(raw) => vec![GameMode::parse(raw)
            .with_context(|| format!("unknown mode {raw:?}"))?],
        None => vec![GameMode::Maze, GameMode::MazeGhosts, GameMode::Falling],
    };
    let max_ticks = cli.max_ticks.unwrap_or(DEFAULT_MAX_TICKS).max(1);
    let episodes = cli.episodes.max(1);

    let mut scenarios = Vec::new();
    for mode in modes {
        for episode in 0..episodes {
            scenarios.push(Scenario {
                name: format!("{}-{}", mode.key(), episode + 1),
                mode,
                seed: seed.wrapping_add(scenarios.len() as u32),
                max_ticks,
            });
        }
    }
    Ok(scenarios)
}

// Every occurrence is kept with its tick; the result line lists each message once.
#[derive(Debug, Default)]
struct AnomalyLog {
    messages: Vec<String>,
    records: Vec<AnomalyRecord>,
    seen: HashSet<String>,
}

impl AnomalyLog {
    fn push(&mut self, tick: u64, message: String) {
        if self.seen.insert(message.clone()) {
            self.messages.push(message.clone());
        }
        self.records.push(AnomalyRecord { tick, message });
    }
}

fn reason_key(reason: Option<GameOverReason>) -> &'static str {
    match reason {
        Some(GameOverReason::Cleared) => "cleared",
        Some(GameOverReason::OutOfLives) => "out_of_lives",
        None => "tick_limit",
    }
}

fn outcome_key(outcome: Option<Outcome>) -> &'static str {
    match outcome {
        Some(Outcome::Won) => "won",
        Some(Outcome::Lost) => "lost",
        None => "unfinished",
    }
}

impl RunSummary {
    fn new(match_id: String, started_at_ms: u64) -> Self {
        Self {
            match_id,
            started_at_ms,
            ..Self::default()
        }
    }

    fn record(&mut self, result: ScenarioResultLine, anomaly_count: usize) {
        *self.reason_counts.entry(reason_key(result.reason)).or_insert(0) += 1;
        *self.outcome_counts.entry(outcome_key(result.outcome)).or_insert(0) += 1;
        let best = self.best_scores.entry(result.mode.key()).or_insert(0);
        *best = (*best).max(result.score);

        self.anomaly_count += anomaly_count;
        self.total_duration_ms = self.total_duration_ms.saturating_add(result.duration_ms);
        self.scenarios.push(result);
        self.scenario_count = self.scenarios.len();
        self.average_duration_ms = self.total_duration_ms / self.scenario_count as u64;
    }

    fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(self).context("failed to encode run summary")?;
        std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

// JSON lines on stderr; stdout carries only scenario results.
struct RunLog {
    match_id: String,
}

impl RunLog {
    fn emit(
        &self,
        level: &str,
        event: &str,
        scenario: Option<&Scenario>,
        tick: Option<u64>,
        details: Value,
    ) {
        let line = StructuredLogLine {
            timestamp_ms: now_ms(),
            level,
            event,
            match_id: &self.match_id,
            scenario: scenario.map(|scenario| scenario.name.as_str()),
            seed: scenario.map(|scenario| scenario.seed),
            tick,
            details,
        };
        match serde_json::to_string(&line) {
            Ok(line) => eprintln!("{line}"),
            Err(error) => eprintln!("failed to encode log line {event}: {error}"),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacman_frame_server::types::Vec2;

    fn finished(
        mode: GameMode,
        reason: Option<GameOverReason>,
        outcome: Option<Outcome>,
        score: u32,
        duration_ms: u64,
    ) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: format!("{}-1", mode.key()),
            mode,
            seed: 42,
            reason,
            outcome,
            score,
            duration_ms,
            dots_eaten: 0,
            collectibles_collected: 0,
            collectibles_missed: 0,
            lives_lost: 0,
            anomalies: Vec::new(),
        }
    }

    fn scenario(mode: GameMode, seed: u32, max_ticks: u64) -> Scenario {
        Scenario {
            name: format!("{}-test", mode.key()),
            mode,
            seed,
            max_ticks,
        }
    }

    #[test]
    fn summary_tallies_reasons_and_outcomes() {
        let mut summary = RunSummary::new("sim-42-1".to_string(), 1);
        // A cleared default maze scores 990, below the win threshold.
        let cleared = Some(GameOverReason::Cleared);
        let out_of_lives = Some(GameOverReason::OutOfLives);
        summary.record(finished(GameMode::Maze, cleared, Some(Outcome::Lost), 990, 60_000), 0);
        summary.record(finished(GameMode::Falling, cleared, Some(Outcome::Won), 2_000, 30_000), 0);
        summary.record(
            finished(GameMode::MazeGhosts, out_of_lives, Some(Outcome::Lost), 120, 45_000),
            2,
        );
        summary.record(finished(GameMode::Maze, None, None, 300, 5_000), 0);

        assert_eq!(
            summary.reason_counts,
            BTreeMap::from([("cleared", 2), ("out_of_lives", 1), ("tick_limit", 1)])
        );
        assert_eq!(
            summary.outcome_counts,
            BTreeMap::from([("lost", 2), ("unfinished", 1), ("won", 1)])
        );
        assert_eq!(
            summary.best_scores,
            BTreeMap::from([("falling", 2_000), ("maze", 990), ("maze_ghosts", 120)])
        );
        assert_eq!(summary.scenario_count, 4);
        assert_eq!(summary.anomaly_count, 2);
        assert_eq!(summary.average_duration_ms, 35_000);
    }

    #[test]
    fn tick_limited_run_is_tallied_as_unfinished() {
        let run = run_scenario(
            &scenario(GameMode::MazeGhosts, 3, 1),
            GameConfig::for_mode(GameMode::MazeGhosts),
        )
        .expect("default config is valid");
        assert_eq!(run.result.reason, None);
        assert_eq!(run.result.outcome, None);

        let mut summary = RunSummary::new("sim-3-1".to_string(), 1);
        summary.record(run.result, run.anomaly_records.len());
        assert_eq!(summary.reason_counts.get("tick_limit"), Some(&1));
        assert_eq!(summary.outcome_counts.get("unfinished"), Some(&1));

        let encoded = serde_json::to_value(&summary).expect("summary encodes");
        assert_eq!(encoded["reasonCounts"]["tick_limit"], 1);
        assert_eq!(encoded["outcomeCounts"]["unfinished"], 1);
        assert!(encoded.get("totalDurationMs").is_none());
    }

    #[test]
    fn anomaly_log_lists_each_message_once() {
        let mut log = AnomalyLog::default();
        log.push(10, "score decreased: 20 -> 10".to_string());
        log.push(11, "score decreased: 20 -> 10".to_string());
        log.push(12, "ghost out of bounds: 0".to_string());

        assert_eq!(log.messages.len(), 2);
        let ticks: Vec<u64> = log.records.iter().map(|record| record.tick).collect();
        assert_eq!(ticks, vec![10, 11, 12]);
    }

    #[test]
    fn snapshot_checks_flag_regressions() {
        let mut engine =
            GameEngine::new(GameConfig::for_mode(GameMode::Maze), 1).expect("valid config");
        let bounds = PlayBounds::from_engine(&engine);
        let mut previous = engine.build_snapshot(false);
        previous.score = 50;
        previous.dots.truncate(10);
        previous.status = GameStatus::GameOver;
        let mut current = engine.build_snapshot(false);
        current.player = Position::Cell(Vec2::new(15, 0));

        let anomalies = collect_snapshot_anomalies(&previous, &current, &bounds, 3);
        assert_eq!(anomalies.len(), 4);
    }

    #[test]
    fn every_mode_runs_without_anomalies() {
        for mode in [GameMode::Maze, GameMode::MazeGhosts, GameMode::Falling] {
            for seed in [1u32, 7, 99] {
                let run = run_scenario(&scenario(mode, seed, 2_000), GameConfig::for_mode(mode))
                    .expect("default config is valid");
                assert!(
                    run.result.anomalies.is_empty(),
                    "{mode:?}/{seed}: {:?}",
                    run.result.anomalies
                );
                assert!(run.finished_tick <= 2_000);
            }
        }
    }

    #[test]
    fn resolve_scenarios_expands_modes_and_episodes() {
        let cli = Cli::parse_from(["simulate", "--seed", "10", "--episodes", "2"]);
        let scenarios = resolve_scenarios(&cli).expect("valid flags");
        assert_eq!(scenarios.len(), 6);
        assert_eq!(scenarios[0].name, "maze-1");
        assert_eq!(scenarios[5].seed, 15);

        let cli = Cli::parse_from(["simulate", "--mode", "falling"]);
        let scenarios = resolve_scenarios(&cli).expect("valid flags");
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].mode, GameMode::Falling);

        let cli = Cli::parse_from(["simulate", "--mode", "falling", "--seed", "4294967297"]);
        let scenarios = resolve_scenarios(&cli).expect("valid flags");
        assert_eq!(scenarios[0].seed, 1);

        let cli = Cli::parse_from(["simulate", "--mode", "pinball"]);
        assert!(resolve_scenarios(&cli).is_err());
    }
}
