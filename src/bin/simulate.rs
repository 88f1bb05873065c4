use clap::Parser;
use robot_rescue::config::SimulationConfig;
use robot_rescue::constants::{DEFAULT_HEURISTIC_WEIGHT_HUNDREDTHS, SAFETY_RADIUS, TICK_MS};
use robot_rescue::engine::Simulation;
use robot_rescue::leaderboard::Leaderboard;
use robot_rescue::types::{GameOverReason, Mover, RuntimeEvent, SessionSummary, Snapshot};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs the rescue robot headless on autopilot")]
struct Cli {
    #[arg(long)]
    seed: Option<u32>,
    /// Stop once this many levels have been cleared.
    #[arg(long, default_value_t = 3)]
    levels: u32,
    #[arg(long, default_value_t = 60 * 60 * 10)]
    max_ticks: u64,
    /// Heuristic weight; runs a single scenario when given.
    #[arg(long)]
    weight: Option<f32>,
    #[arg(long)]
    safety_radius: Option<i32>,
    #[arg(long, default_value = "autopilot")]
    name: String,
    #[arg(long)]
    leaderboard: Option<PathBuf>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    seed: u32,
    #[serde(rename = "weightHundredths")]
    weight_hundredths: u32,
    #[serde(rename = "safetyRadius")]
    safety_radius: i32,
    levels: u32,
    #[serde(rename = "maxTicks")]
    max_ticks: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum RunOutcome {
    LevelTarget,
    OutOfLives,
    Quit,
    TickLimit,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    #[serde(rename = "heuristicWeight")]
    heuristic_weight: f32,
    outcome: RunOutcome,
    #[serde(rename = "levelReached")]
    level_reached: u32,
    #[serde(rename = "durationSeconds")]
    duration_seconds: u64,
    #[serde(rename = "peopleRescued")]
    people_rescued: u32,
    #[serde(rename = "livesLost")]
    lives_lost: u32,
    #[serde(rename = "livesLostToMines")]
    lives_lost_to_mines: u32,
    #[serde(rename = "spawnFailures")]
    spawn_failures: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct ScenarioRunResult {
    result: ScenarioResultLine,
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
    summary: SessionSummary,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageLevelReached")]
    average_level_reached: f32,
    #[serde(rename = "peopleRescued")]
    people_rescued: u32,
    #[serde(rename = "livesLost")]
    lives_lost: u32,
    #[serde(rename = "livesLostToMines")]
    lives_lost_to_mines: u32,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));
    let mut leaderboard = cli.leaderboard.clone().map(Leaderboard::new);
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "weightHundredths": scenario.weight_hundredths,
                "safetyRadius": scenario.safety_radius,
                "levels": scenario.levels,
                "maxTicks": scenario.max_ticks,
            }),
        );
        let scenario_run = run_scenario(&scenario);

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *outcome_counts
            .entry(outcome_key(scenario_run.result.outcome))
            .or_insert(0) += 1;

        if let Some(board) = leaderboard.as_mut() {
            if let Err(error) = board.record(&cli.name, &scenario_run.summary) {
                emit_log(
                    "error",
                    "leaderboard_write_failed",
                    &match_id,
                    Some(&scenario.name),
                    Some(scenario.seed),
                    None,
                    json!({ "error": error.to_string() }),
                );
            }
        }

        emit_log(
            "info",
            "scenario_finished",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.finished_tick),
            json!({
                "outcome": scenario_run.result.outcome,
                "levelReached": scenario_run.result.level_reached,
                "durationSeconds": scenario_run.result.duration_seconds,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => eprintln!("[simulate] failed to serialize scenario result: {error}"),
        }
        scenario_results.push(scenario_run.result);
    }

    let run_finished_at_ms = now_ms();
    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        run_finished_at_ms,
        scenario_results,
        outcome_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageLevelReached": summary.average_level_reached,
            "peopleRescued": summary.people_rescued,
            "livesLost": summary.lives_lost,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario) -> ScenarioRunResult {
    let config = SimulationConfig {
        seed: scenario.seed,
        heuristic_weight_hundredths: scenario.weight_hundredths,
        safety_radius: scenario.safety_radius,
        pause_on_level_start: false,
        ai_enabled: true,
        ..SimulationConfig::default()
    };
    let max_lives = config.max_lives;
    let mut simulation = Simulation::new(config);

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut lives_lost = 0;
    let mut lives_lost_to_mines = 0;
    let mut spawn_failures = 0;
    let mut last_tick = 0u64;
    let mut outcome = RunOutcome::TickLimit;

    if let Err(error) = simulation.start_game() {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            0,
            format!("failed to start: {error}"),
        );
    }

    for _ in 0..scenario.max_ticks {
        if let Err(error) = simulation.step(TICK_MS) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                last_tick,
                format!("step failed: {error}"),
            );
            simulation.end_session();
        }
        let snapshot = simulation.build_snapshot(true);
        last_tick = snapshot.tick;

        let mut messages = collect_snapshot_anomalies(&snapshot, max_lives);
        messages.extend(simulation.occupancy_violations());
        for message in messages {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }

        for event in &snapshot.events {
            match event {
                RuntimeEvent::LifeLost { by, .. } => {
                    lives_lost += 1;
                    if *by == Mover::Mine {
                        lives_lost_to_mines += 1;
                    }
                }
                RuntimeEvent::SpawnFailed { .. } => spawn_failures += 1,
                _ => {}
            }
        }

        if simulation.is_ended() {
            outcome = match simulation.build_summary().reason {
                Some(GameOverReason::Quit) => RunOutcome::Quit,
                _ => RunOutcome::OutOfLives,
            };
            break;
        }
        if simulation.level() > scenario.levels {
            outcome = RunOutcome::LevelTarget;
            break;
        }
        if simulation.is_paused() {
            simulation.set_paused(false);
        }
    }

    let summary = simulation.build_summary();
    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            heuristic_weight: scenario.weight_hundredths as f32 / 100.0,
            outcome,
            level_reached: summary.level,
            duration_seconds: summary.duration_seconds,
            people_rescued: summary.people_rescued,
            lives_lost,
            lives_lost_to_mines,
            spawn_failures,
            anomalies,
        },
        anomaly_records,
        finished_tick: last_tick,
        summary,
    }
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, max_lives: i32) -> Vec<String> {
    let mut anomalies = Vec::new();
    if snapshot.lives_remaining < 0 || snapshot.lives_remaining > max_lives {
        anomalies.push(format!(
            "lives out of range: {}/{max_lives}",
            snapshot.lives_remaining
        ));
    }
    if snapshot.people_remaining < 0 {
        anomalies.push(format!(
            "negative people remaining: {}",
            snapshot.people_remaining
        ));
    }
    if snapshot.people_remaining as usize != snapshot.people.len() {
        anomalies.push(format!(
            "people counter {} disagrees with {} active people",
            snapshot.people_remaining,
            snapshot.people.len()
        ));
    }
    if snapshot.tiles.len() != snapshot.height as usize {
        anomalies.push("tile rows do not match grid height".to_string());
    }
    for window in snapshot.path.windows(2) {
        let step = (window[0].x - window[1].x).abs() + (window[0].y - window[1].y).abs();
        if step != 1 {
            anomalies.push(format!(
                "path jumps from ({},{}) to ({},{})",
                window[0].x, window[0].y, window[1].x, window[1].y
            ));
            break;
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli.seed.unwrap_or_else(rand::random);
    let safety_radius = cli.safety_radius.unwrap_or(SAFETY_RADIUS).clamp(0, 30);
    let levels = cli.levels.max(1);

    if let Some(weight) = cli.weight {
        let weight_hundredths = weight_to_hundredths(weight);
        return vec![Scenario {
            name: format!("custom-w{weight_hundredths}"),
            seed,
            weight_hundredths,
            safety_radius,
            levels,
            max_ticks: cli.max_ticks,
        }];
    }

    vec![
        Scenario {
            name: "weighted-default".to_string(),
            seed,
            weight_hundredths: DEFAULT_HEURISTIC_WEIGHT_HUNDREDTHS,
            safety_radius,
            levels,
            max_ticks: cli.max_ticks,
        },
        Scenario {
            name: "admissible-w100".to_string(),
            seed,
            weight_hundredths: 100,
            safety_radius,
            levels,
            max_ticks: cli.max_ticks,
        },
    ]
}

fn weight_to_hundredths(weight: f32) -> u32 {
    if !weight.is_finite() || weight <= 0.0 {
        return 0;
    }
    (weight * 100.0).round().min(1_000.0) as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("rescue-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_level_reached = if scenario_count == 0 {
        0.0
    } else {
        scenarios.iter().map(|s| s.level_reached as f32).sum::<f32>() / scenario_count as f32
    };
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_level_reached,
        people_rescued: scenarios.iter().map(|s| s.people_rescued).sum(),
        lives_lost: scenarios.iter().map(|s| s.lives_lost).sum(),
        lives_lost_to_mines: scenarios.iter().map(|s| s.lives_lost_to_mines).sum(),
        outcome_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        match_id: match_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    match serde_json::to_string(&log_line) {
        Ok(line) => eprintln!("{line}"),
        Err(error) => eprintln!("[simulate] failed to serialize log line: {error}"),
    }
}

fn outcome_key(outcome: RunOutcome) -> String {
    match outcome {
        RunOutcome::LevelTarget => "level_target",
        RunOutcome::OutOfLives => "out_of_lives",
        RunOutcome::Quit => "quit",
        RunOutcome::TickLimit => "tick_limit",
    }
    .to_string()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use robot_rescue::types::Vec2;

    fn make_scenario_result(
        outcome: RunOutcome,
        level_reached: u32,
        people_rescued: u32,
        lives_lost: u32,
    ) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 42,
            heuristic_weight: 1.5,
            outcome,
            level_reached,
            duration_seconds: 30,
            people_rescued,
            lives_lost,
            lives_lost_to_mines: lives_lost / 2,
            spawn_failures: 0,
            anomalies: Vec::new(),
        }
    }

    fn scenario(seed: u32, max_ticks: u64) -> Scenario {
        Scenario {
            name: "test".to_string(),
            seed,
            weight_hundredths: 150,
            safety_radius: 4,
            levels: 2,
            max_ticks,
        }
    }

    #[test]
    fn run_summary_totals_rescues_and_lost_lives() {
        let summary = build_run_summary(
            "rescue-42-1".to_string(),
            1,
            2,
            vec![
                make_scenario_result(RunOutcome::OutOfLives, 2, 7, 5),
                make_scenario_result(RunOutcome::LevelTarget, 5, 20, 2),
            ],
            BTreeMap::from([
                ("out_of_lives".to_string(), 1usize),
                ("level_target".to_string(), 1usize),
            ]),
            0,
        );
        assert!((summary.average_level_reached - 3.5).abs() < 1e-6);
        assert_eq!(summary.people_rescued, 27);
        assert_eq!(summary.lives_lost, 7);
        assert_eq!(summary.lives_lost_to_mines, 3);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("robot-rescue-missing-{}", rand::random::<u32>()))
            .join("summary.json");
        let summary = build_run_summary(
            "rescue-1-1".to_string(),
            1,
            2,
            vec![make_scenario_result(RunOutcome::TickLimit, 1, 0, 0)],
            BTreeMap::from([("tick_limit".to_string(), 1usize)]),
            0,
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn snapshot_checks_flag_counter_drift_and_broken_paths() {
        let mut simulation = Simulation::new(SimulationConfig::default());
        simulation.start_game().expect("level allocates");
        let mut snapshot = simulation.build_snapshot(false);
        assert!(collect_snapshot_anomalies(&snapshot, 5).is_empty());

        snapshot.people_remaining = -1;
        snapshot.lives_remaining = 6;
        snapshot.path = vec![Vec2::new(0, 0), Vec2::new(2, 0)];
        let messages = collect_snapshot_anomalies(&snapshot, 5);
        assert!(messages.iter().any(|m| m.starts_with("lives out of range")));
        assert!(messages.iter().any(|m| m.starts_with("negative people")));
        assert!(messages.iter().any(|m| m.contains("disagrees")));
        assert!(messages.iter().any(|m| m.starts_with("path jumps")));
    }

    #[test]
    fn weight_conversion_clamps_and_rounds() {
        assert_eq!(weight_to_hundredths(1.5), 150);
        assert_eq!(weight_to_hundredths(-2.0), 0);
        assert_eq!(weight_to_hundredths(f32::NAN), 0);
        assert_eq!(weight_to_hundredths(50.0), 1_000);
    }

    #[test]
    fn short_run_is_reproducible_and_clean() {
        let a = run_scenario(&scenario(7, 2_000));
        let b = run_scenario(&scenario(7, 2_000));
        assert!(a.result.anomalies.is_empty(), "{:?}", a.result.anomalies);
        assert_eq!(a.result.level_reached, b.result.level_reached);
        assert_eq!(a.result.people_rescued, b.result.people_rescued);
        assert_eq!(a.finished_tick, b.finished_tick);
    }

    #[test]
    fn zero_tick_budget_ends_at_tick_limit() {
        let run = run_scenario(&scenario(1, 0));
        assert_eq!(run.result.outcome, RunOutcome::TickLimit);
        assert_eq!(run.result.level_reached, 1);
    }
}
