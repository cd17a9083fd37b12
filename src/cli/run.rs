use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use pipegov::runner::ScriptRunner;
use pipegov::session::{Session, SessionOutcome, StopReason};
use pipegov::tuning::GovernorTuning;
use pipegov::{log_info, log_warn, MeasurementGrid, PidGovernor, PowerModel};

use super::{print_config, validate_targets};

pub struct RunOptions {
    pub graph: String,
    pub frames: u32,
    pub target_fps: f64,
    pub target_latency: f64,
    pub max_iterations: u32,
    pub work_dir: PathBuf,
    pub power_reduction_rate: f64,
    pub board_setup: bool,
    pub approximation: bool,
    pub dump_log: bool,
}

pub fn run_governor(opts: RunOptions, shutdown: &AtomicBool) -> Result<()> {
    validate_targets(opts.target_fps, opts.target_latency)?;

    let tuning = GovernorTuning {
        power_reduction_rate: opts.power_reduction_rate,
        ..GovernorTuning::default()
    };
    let governor = PidGovernor::with_tuning(opts.target_fps, opts.target_latency, opts.max_iterations, tuning);
    let runner = ScriptRunner::new(opts.work_dir.clone(), opts.graph.clone(), opts.frames);

    println!("PIPEGOV v{}", env!("CARGO_PKG_VERSION"));
    println!("GRAPH:           {} ({} frames)", opts.graph, opts.frames);
    println!("TARGETS:         fps >= {}  latency <= {}ms", opts.target_fps, opts.target_latency);
    println!("MAX ITERATIONS:  {}", opts.max_iterations);
    println!("WORK DIR:        {}", opts.work_dir.display());
    println!();

    if opts.board_setup {
        runner.prepare_board()?;
    }

    let mut session = Session::new(governor, runner);
    if opts.approximation {
        session = session.with_grid(MeasurementGrid::embedded());
    }
    log_info!("SMOKE TEST: ROOT CONFIG ESTIMATED AT {:.3}W",
        PowerModel::default().estimate_power(session.config()));

    println!("PIPEGOV IS ACTIVE (CTRL+C TO EXIT)");
    let result = session.run(shutdown);

    // FAN OFF EVEN WHEN THE LOOP FAILED
    if opts.board_setup {
        if let Err(e) = session.runner().release_board() {
            log_warn!("RELEASING BOARD FAILED: {}", e);
        }
    }
    let outcome = result?;

    if opts.dump_log {
        session.log.dump();
    }
    session.log.summary();
    report(&outcome);

    println!("PIPEGOV OUT.");
    Ok(())
}

fn report(outcome: &SessionOutcome) {
    println!("\n{}", "=".repeat(50));
    println!("PIPEGOV RESULT: {} AFTER {} ITERATIONS", outcome.reason, outcome.iterations);
    println!("{}", "=".repeat(50));
    print_config("FINAL CONFIG:", &outcome.final_config);
    println!("{:<18} {:.3} W", "EST. POWER:", outcome.estimated_power);
    match &outcome.best {
        Some(b) => {
            print_config("BEST CONFIG:", &b.config);
            println!("{:<18} {:.3} W (violation {:.4}, meets targets: {})",
                "BEST POWER:", b.estimated_power, b.violation,
                if b.meets_targets { "YES" } else { "NO" });
        }
        None => println!("NO BEST CANDIDATE CACHED"),
    }
    if matches!(outcome.reason, StopReason::Interrupted | StopReason::Shutdown) {
        println!("(STOPPED EARLY -- FINAL CONFIG IS THE BEST CANDIDATE)");
    }
}
