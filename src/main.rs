// PIPEGOV v1.0.0 -- HETEROGENEOUS PIPELINE GOVERNOR
// PICKS PARTITION POINTS AND BIG/LITTLE FREQUENCIES FOR A GPU -> BIG -> LITTLE
// INFERENCE PIPELINE SO FPS AND LATENCY TARGETS HOLD AT MINIMUM POWER.
//
// DECISIONS HAPPEN IN THE LIBRARY (OFFLINE, TESTABLE).
// THIS BINARY HANDLES: ARGUMENTS, BOARD SETUP, THE RUN LOOP, REPORTING.

mod cli;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::{Parser, Subcommand};

use pipegov::log::init_tracing;
use pipegov::tuning::{DEFAULT_MAX_ITERATIONS, POWER_REDUCTION_RATE};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "pipegov")]
#[command(about = "PIPEGOV -- PID GOVERNOR FOR HETEROGENEOUS INFERENCE PIPELINES")]
struct Cli {
    // PRINT EVERY GOVERNOR DECISION (RUST_LOG OVERRIDES)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    // DRIVE THE BOARD UNTIL CONVERGED, CAPPED OR INTERRUPTED
    Run {
        // GRAPH NAME PASSED TO run_inference.sh
        graph: String,

        // FRAMES PER ITERATION
        frames: u32,

        // TARGET THROUGHPUT (FRAMES/SEC, LOWER BOUND)
        target_fps: f64,

        // TARGET LATENCY (MS, UPPER BOUND)
        target_latency: f64,

        #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
        max_iterations: u32,

        // DIRECTORY HOLDING set_freq.sh, run_inference.sh, set_fan.sh
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,

        // FRACTION OF CURRENT FREQUENCY CUT PER POWER-REDUCTION STEP
        #[arg(long, default_value_t = POWER_REDUCTION_RATE)]
        power_reduction_rate: f64,

        // SKIP adb ROOT, CPUFREQ GOVERNOR AND FAN SETUP
        #[arg(long)]
        no_board_setup: bool,

        // START FROM THE ROOT CONFIG INSTEAD OF THE GRID APPROXIMATION
        #[arg(long)]
        skip_approximation: bool,

        // DUMP FULL ITERATION LOG ON EXIT
        #[arg(long)]
        dump_log: bool,
    },

    // OFFLINE: STARTING FREQUENCIES THE MEASUREMENT GRID PICKS FOR TARGETS
    Approximate {
        target_fps: f64,
        target_latency: f64,
    },

    // OFFLINE: MODEL POWER / LATENCY / FPS FOR ONE CONFIG
    Estimate {
        #[arg(long, default_value_t = 4)]
        pp1: u32,
        #[arg(long, default_value_t = 6)]
        pp2: u32,
        #[arg(long, default_value_t = 1_800_000)]
        big: u32,
        #[arg(long, default_value_t = 1_200_000)]
        little: u32,
        #[arg(long, default_value = "G-B-L")]
        order: String,

        // ALSO INVERT THE MODEL FOR THESE TARGETS
        #[arg(long, requires = "target_latency")]
        target_fps: Option<f64>,
        #[arg(long, requires = "target_fps")]
        target_latency: Option<f64>,

        // ALSO INVERT THE POWER FIT AT THIS BUDGET (WATTS)
        #[arg(long)]
        watts: Option<f64>,
    },

    // VERIFY HELPER SCRIPTS, adb AND THE BOARD
    Check {
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run {
            graph, frames, target_fps, target_latency, max_iterations, work_dir,
            power_reduction_rate, no_board_setup, skip_approximation, dump_log,
        } => {
            ctrlc::set_handler(move || {
                SHUTDOWN.store(true, Ordering::Relaxed);
            })?;

            cli::run::run_governor(
                cli::run::RunOptions {
                    graph,
                    frames,
                    target_fps,
                    target_latency,
                    max_iterations,
                    work_dir,
                    power_reduction_rate,
                    board_setup: !no_board_setup,
                    approximation: !skip_approximation,
                    dump_log,
                },
                &SHUTDOWN,
            )
        }
        Command::Approximate { target_fps, target_latency } => {
            cli::approximate::run_approximate(target_fps, target_latency)
        }
        Command::Estimate { pp1, pp2, big, little, order, target_fps, target_latency, watts } => {
            cli::estimate::run_estimate(pp1, pp2, big, little, &order)?;
            if let (Some(fps), Some(lat)) = (target_fps, target_latency) {
                println!();
                cli::validate_targets(fps, lat)?;
                cli::estimate::run_inverse(fps, lat, watts)?;
            }
            Ok(())
        }
        Command::Check { work_dir } => cli::check::run_check(&work_dir),
    }
}
