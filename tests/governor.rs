// PIPEGOV GOVERNOR TESTS
// CONTROL LOOP OUTCOMES, BEST-CANDIDATE TRACKING, STAGNATION, ITERATION CAP
//
// ALL TESTS USE THE PUBLIC pipegov API WITH HAND-BUILT MEASUREMENTS.
// NO BOARD, NO SCRIPTS. RUN OFFLINE.

use pipegov::trace::{Decision, HoldReason, Objective};
use pipegov::tuning::{GovernorTuning, STAGNATION_STREAK};
use pipegov::{CpuClass, Measurement, PidGovernor, PipelineConfig, PowerModel, StepOutcome};

const TARGET_FPS: f64 = 10.0;
const TARGET_LAT: f64 = 200.0;

fn gov(max_iterations: u32) -> PidGovernor {
    PidGovernor::new(TARGET_FPS, TARGET_LAT, max_iterations)
}

fn meas(fps: f64, latency: f64) -> Measurement {
    Measurement::new(fps, latency, [40.0, 35.0, 25.0])
}

fn saturated() -> PipelineConfig {
    PipelineConfig {
        partition_point1: 8,
        partition_point2: 8,
        big_frequency: CpuClass::Big.max_khz(),
        little_frequency: CpuClass::Little.max_khz(),
        ..PipelineConfig::ROOT
    }
}

// === TERMINAL OUTCOMES ===

#[test]
fn zero_margins_converge_immediately() {
    // EXACTLY ON TARGET: NOTHING TO TRADE FOR POWER
    let mut g = gov(20);
    let mut c = PipelineConfig::ROOT;
    let r = g.step(&mut c, &meas(TARGET_FPS, TARGET_LAT));
    assert_eq!(r.outcome, StepOutcome::Converged);
    assert!(g.is_converged());
    assert_eq!(c, PipelineConfig::ROOT);
    assert_eq!(g.iteration(), 1);
}

#[test]
fn converged_step_reports_model_power() {
    let mut g = gov(20);
    let mut c = PipelineConfig::ROOT;
    let r = g.step(&mut c, &meas(TARGET_FPS, TARGET_LAT));
    let expected = PowerModel::default().estimate_power(&PipelineConfig::ROOT);
    assert!((r.estimated_power - expected).abs() < 1e-12);
    assert!((g.estimated_power() - expected).abs() < 1e-12);
}

#[test]
fn max_iterations_at_cap_plus_one() {
    // CONSTANT 50% FPS DEFICIT: FREQUENCIES CLIMB, THEN FORCED PARTITION
    // MOVES. THE CONFIG CHANGES EVERY STEP, SO ONLY THE CAP CAN STOP IT.
    let max = 5;
    let mut g = gov(max);
    let mut c = PipelineConfig::ROOT;
    let m = meas(5.0, 150.0);
    for i in 1..=max {
        let r = g.step(&mut c, &m);
        assert_eq!(r.outcome, StepOutcome::Continue, "iteration {i}");
    }
    let r = g.step(&mut c, &m);
    assert_eq!(r.outcome, StepOutcome::MaxIterations);
    assert_eq!(g.iteration(), max + 1);

    // RESTORED TO THE BEST CANDIDATE
    let best = g.best().unwrap();
    assert_eq!(c, best.config);
    assert!((r.estimated_power - best.estimated_power).abs() < 1e-12);
    assert!(!best.meets_targets);
}

#[test]
fn terminal_within_cap_for_any_fixed_measurement() {
    let cases = [(5.0, 150.0), (9.9, 201.0), (30.0, 900.0), (1.0, 10.0), (20.0, 50.0)];
    for (fps, lat) in cases {
        let max = 8;
        let mut g = gov(max);
        let mut c = PipelineConfig::ROOT;
        let m = meas(fps, lat);
        let mut calls = 0;
        loop {
            calls += 1;
            if g.step(&mut c, &m).outcome.is_terminal() {
                break;
            }
            assert!(calls <= max, "fps={fps} lat={lat} did not terminate");
        }
        assert!(calls <= max + 1);
    }
}

// === STAGNATION ===

#[test]
fn stagnation_after_four_identical_configs() {
    // EVERYTHING SATURATED: THE GOVERNOR HAS NO MOVE LEFT
    let mut g = gov(20);
    let mut c = saturated();
    let m = meas(5.0, 400.0);
    for i in 1..STAGNATION_STREAK {
        let r = g.step(&mut c, &m);
        assert_eq!(r.outcome, StepOutcome::Continue, "iteration {i}");
        assert_eq!(c, saturated());
    }
    let r = g.step(&mut c, &m);
    assert_eq!(r.outcome, StepOutcome::Converged);
    assert!(r.trace.iter().any(|d| matches!(d, Decision::Stagnated { streak: 4 })));
    assert!(g.is_converged());
}

#[test]
fn stagnation_restores_best() {
    let mut g = gov(20);
    // FIRST CALL: A BETTER MEASUREMENT ON ROOT
    let mut c = PipelineConfig::ROOT;
    g.step(&mut c, &meas(9.0, 150.0));
    // THEN THE CALLER PINS A DIFFERENT CONFIG THAT MEASURES WORSE
    let pinned = PipelineConfig { big_frequency: 1_000_000, ..PipelineConfig::ROOT };
    let mut last = None;
    for _ in 0..STAGNATION_STREAK {
        let mut c = pinned;
        let r = g.step(&mut c, &meas(7.0, 150.0));
        last = Some((r.outcome, c));
    }
    let (outcome, c) = last.unwrap();
    assert_eq!(outcome, StepOutcome::Converged);
    assert_eq!(c, PipelineConfig::ROOT);
}

#[test]
fn changing_config_resets_streak() {
    let mut g = gov(20);
    let m = meas(9.5, 150.0);
    let alt = PipelineConfig { little_frequency: 1_000_000, ..PipelineConfig::ROOT };
    for i in 0..8 {
        let mut c = if i % 2 == 0 { PipelineConfig::ROOT } else { alt };
        let r = g.step(&mut c, &m);
        assert_eq!(r.outcome, StepOutcome::Continue);
    }
}

// === TARGETS UNMET ===

#[test]
fn fps_deficit_raises_both_frequencies() {
    // 50% SHORT: PID OUTPUT 2*0.5 + 0.5*0.5 = 1.25 -> ONE TABLE STEP EACH
    let mut g = gov(20);
    let mut c = PipelineConfig::ROOT;
    let r = g.step(&mut c, &meas(5.0, 150.0));
    assert_eq!(r.outcome, StepOutcome::Continue);
    assert_eq!(c.big_frequency, 1_908_000);
    assert_eq!(c.little_frequency, 1_398_000);
    // 50% DEFICIT ALSO CLEARS THE 0.2 PARTITION THRESHOLD
    assert!(c.partition_point1 > PipelineConfig::ROOT.partition_point1);
}

#[test]
fn small_deficit_leaves_partition_alone() {
    // 5% SHORT: BELOW EVERY PARTITION THRESHOLD
    let mut g = gov(20);
    let mut c = PipelineConfig::ROOT;
    g.step(&mut c, &meas(9.5, 150.0));
    assert_eq!((c.partition_point1, c.partition_point2), (4, 6));
}

#[test]
fn medium_deficit_moves_only_pp2() {
    // 12% SHORT: ABOVE 0.1, BELOW 0.15
    let mut g = gov(20);
    let mut c = PipelineConfig::ROOT;
    g.step(&mut c, &meas(8.8, 150.0));
    assert_eq!(c.partition_point1, 4);
    assert!(c.partition_point2 > 6);
}

#[test]
fn latency_deficit_raises_big_only() {
    let mut g = gov(20);
    let mut c = PipelineConfig::ROOT;
    // LATENCY 50% OVER, FPS MET: 2*0.5 + 0.3*0.5 = 1.15 -> ONE STEP ON BIG
    g.step(&mut c, &meas(12.0, 300.0));
    assert_eq!(c.big_frequency, 1_908_000);
    assert_eq!(c.little_frequency, PipelineConfig::ROOT.little_frequency);
}

#[test]
fn latency_worsened_holds_frequency() {
    let mut g = gov(20);
    let mut c = PipelineConfig::ROOT;
    g.step(&mut c, &meas(5.0, 250.0));
    let after_first = c;
    // LATENCY ROSE BY MORE THAN THE 1MS NOISE MARGIN
    let r = g.step(&mut c, &meas(5.0, 260.0));
    assert_eq!(c.big_frequency, after_first.big_frequency);
    assert_eq!(c.little_frequency, after_first.little_frequency);
    assert!(r.trace.iter().any(|d| matches!(
        d,
        Decision::FrequencyHeld { reason: HoldReason::LatencyWorsened }
    )));
}

#[test]
fn latency_within_noise_is_not_worsened() {
    let mut g = gov(20);
    let mut c = PipelineConfig::ROOT;
    g.step(&mut c, &meas(5.0, 250.0));
    let r = g.step(&mut c, &meas(5.0, 250.5));
    assert!(!r.trace.iter().any(|d| matches!(d, Decision::LatencyWorsened { .. })));
}

#[test]
fn saturated_frequencies_are_held() {
    let mut g = gov(20);
    let mut c = saturated();
    c.partition_point1 = 4;
    c.partition_point2 = 6;
    let r = g.step(&mut c, &meas(5.0, 150.0));
    assert!(r.trace.iter().any(|d| matches!(
        d,
        Decision::FrequencyHeld { reason: HoldReason::BothAtMax }
    )));
    // FORCED PARTITION MOVE STILL HAPPENS
    assert_ne!((c.partition_point1, c.partition_point2), (4, 6));
}

// === TARGETS MET ===

#[test]
fn spare_margin_lowers_power() {
    let mut g = gov(20);
    let mut c = PipelineConfig::ROOT;
    let before = PowerModel::default().estimate_power(&c);
    let r = g.step(&mut c, &meas(12.0, 150.0));
    assert_eq!(r.outcome, StepOutcome::Continue);
    assert!(r.estimated_power < before);
    assert!(c.big_frequency < PipelineConfig::ROOT.big_frequency);
}

#[test]
fn met_targets_reset_pids() {
    let mut g = gov(20);
    let mut c = PipelineConfig::ROOT;
    let r = g.step(&mut c, &meas(12.0, 150.0));
    assert!(r.trace.contains(&Decision::PidReset { objective: Objective::Fps }));
    assert!(r.trace.contains(&Decision::PidReset { objective: Objective::Latency }));
}

// === BEST CANDIDATE ===

#[test]
fn best_prefers_lower_violation() {
    let mut g = gov(20);
    let mut c = PipelineConfig::ROOT;
    g.step(&mut c, &meas(5.0, 150.0));
    assert!((g.best().unwrap().violation - 0.5).abs() < 1e-12);
    let mut c2 = c;
    g.step(&mut c2, &meas(8.0, 150.0));
    let best = g.best().unwrap();
    assert!((best.violation - 0.2).abs() < 1e-12);
    assert_eq!(best.config, c);
    // A WORSE MEASUREMENT NEVER REPLACES IT
    let mut c3 = c2;
    g.step(&mut c3, &meas(2.0, 150.0));
    assert_eq!(g.best().unwrap().config, c);
}

#[test]
fn best_ties_break_on_power() {
    let mut g = gov(20);
    let cheap = PipelineConfig { big_frequency: 1_000_000, ..PipelineConfig::ROOT };
    let mut c = PipelineConfig::ROOT;
    g.step(&mut c, &meas(5.0, 150.0));
    let mut c = cheap;
    g.step(&mut c, &meas(5.0, 150.0));
    assert_eq!(g.best().unwrap().config, cheap);
}

#[test]
fn reset_best_clears_record() {
    let mut g = gov(20);
    let mut c = PipelineConfig::ROOT;
    g.step(&mut c, &meas(5.0, 150.0));
    assert!(g.best().is_some());
    g.reset_best();
    assert!(g.best().is_none());
}

// === TUNING ===

#[test]
fn zero_reduction_rate_cannot_cut_frequency() {
    let tuning = GovernorTuning { power_reduction_rate: 0.0, ..GovernorTuning::default() };
    let mut g = PidGovernor::with_tuning(TARGET_FPS, TARGET_LAT, 20, tuning);
    let mut c = PipelineConfig::ROOT;
    g.step(&mut c, &meas(10.8, 184.0));
    assert_eq!(c.big_frequency, PipelineConfig::ROOT.big_frequency);
    assert_eq!(c.little_frequency, PipelineConfig::ROOT.little_frequency);
}

#[test]
fn refit_model_drives_reported_power() {
    // HOTTER GPU: 0.75 OF THE WEIGHT AT +2W
    let refit = PowerModel { gpu_power: 5.0, ..PowerModel::default() };
    let mut g = gov(20).with_model(refit);
    let mut c = PipelineConfig::ROOT;
    let r = g.step(&mut c, &meas(TARGET_FPS, TARGET_LAT));
    assert_eq!(r.outcome, StepOutcome::Converged);

    let expected = refit.estimate_power(&PipelineConfig::ROOT);
    let stock = PowerModel::default().estimate_power(&PipelineConfig::ROOT);
    assert!((r.estimated_power - expected).abs() < 1e-12);
    assert!((r.estimated_power - stock - 1.5).abs() < 1e-9);
    assert!((g.best().unwrap().estimated_power - expected).abs() < 1e-12);
    assert_eq!(g.model().gpu_power, 5.0);
}

#[test]
fn invalid_incoming_partition_is_fixed() {
    let mut g = gov(20);
    let mut c = PipelineConfig { partition_point1: 1, partition_point2: 2, ..PipelineConfig::ROOT };
    let r = g.step(&mut c, &meas(TARGET_FPS, TARGET_LAT));
    assert!(c.stage_sizes().iter().all(|&s| s != 1));
    assert!(matches!(r.trace.first(), Some(Decision::PartitionFixed { .. })));
}
